//! Domain models for the Minimarket stock core

mod local_sale;
mod movement;
mod order_line;
mod payment;
mod reservation;
mod stock;
mod web_order;

pub use local_sale::*;
pub use movement::*;
pub use order_line::*;
pub use payment::*;
pub use reservation::*;
pub use stock::*;
pub use web_order::*;
