mod cents;

pub mod op;
mod rounding;

pub use cents::{Cents, CentsConversionError};
pub use rounding::round_half_up;
