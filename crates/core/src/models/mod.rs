//! Shared domain models.

mod kind;
mod vehicle;

pub use kind::VehicleKind;
pub use vehicle::{parse_rental_date, RentalStatus, Vehicle, DEALER_NAME_KEY};
