pub mod alert;
pub mod price;

pub use alert::{Alert, AlertFields};
pub use price::{NewObservation, PriceObservation, UNKNOWN_PRODUCT};
