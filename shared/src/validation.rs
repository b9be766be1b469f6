//! Input validation for stock operations
//!
//! These checks run before any transaction is opened, so malformed requests
//! never reach the database.

use crate::error::{DomainError, DomainResult};
use crate::models::{LineRequest, MovementReason};

/// Upper bound for a single line or movement quantity
pub const MAX_LINE_QUANTITY: i32 = 100_000;

// ============================================================================
// Ledger Validations
// ============================================================================

/// Validate a purchase receipt: positive quantity and a complete supplier document
pub fn validate_purchase(
    quantity: i32,
    document_type: Option<&str>,
    document_number: Option<&str>,
) -> DomainResult<()> {
    validate_quantity("quantity", quantity)?;

    if document_type.map_or(true, |s| s.trim().is_empty()) {
        return Err(DomainError::validation(
            "document_type",
            "Document type is required for purchases",
        ));
    }
    if document_number.map_or(true, |s| s.trim().is_empty()) {
        return Err(DomainError::validation(
            "document_number",
            "Document number is required for purchases",
        ));
    }
    Ok(())
}

/// Validate a manual adjustment: non-zero delta and a manual reason
pub fn validate_adjustment(delta: i32, reason: MovementReason) -> DomainResult<()> {
    if reason.is_automatic() {
        return Err(DomainError::validation(
            "reason",
            "Adjustments cannot use the purchase or sale reasons",
        ));
    }
    if delta == 0 {
        return Err(DomainError::validation(
            "quantity",
            "Adjustment quantity cannot be zero",
        ));
    }
    if delta.unsigned_abs() > MAX_LINE_QUANTITY as u32 {
        return Err(DomainError::validation(
            "quantity",
            "Adjustment quantity is out of range",
        ));
    }
    Ok(())
}

/// Validate a positive line quantity
pub fn validate_quantity(field: &str, quantity: i32) -> DomainResult<()> {
    if quantity < 1 {
        return Err(DomainError::validation(field, "Quantity must be at least 1"));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(DomainError::validation(field, "Quantity is out of range"));
    }
    Ok(())
}

// ============================================================================
// Sale and Order Validations
// ============================================================================

/// Validate requested lines of a sale or web order
pub fn validate_lines(lines: &[LineRequest]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::validation("items", "At least one item is required"));
    }
    for (index, line) in lines.iter().enumerate() {
        validate_quantity(&format!("items[{index}].quantity"), line.quantity)?;
    }
    Ok(())
}

/// Validate web order customer contact fields
pub fn validate_customer(name: &str, phone: &str, email: Option<&str>) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation(
            "customer_name",
            "Customer name is required",
        ));
    }
    if phone.trim().is_empty() {
        return Err(DomainError::validation(
            "customer_phone",
            "Customer phone is required",
        ));
    }

    if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
        validate_email(email).map_err(|msg| DomainError::validation("customer_email", msg))?;
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}
