//! Failure classes reported by the dealership engine.

use thiserror::Error;

/// Result alias used by every engine operation.
pub type EngineResult<T> = Result<T, EngineError>;

/// Caller supplied a value that can never be valid.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A required identifier or text field was blank.
    #[error("{0} is required")]
    EmptyField(&'static str),

    /// Prices must be finite and strictly positive.
    #[error("price must be greater than 0 (got {0})")]
    NonPositivePrice(f64),

    /// A price string was not a number.
    #[error("invalid price '{0}'")]
    MalformedPrice(String),

    /// The kind tag did not name a known vehicle kind.
    #[error("unknown vehicle type '{0}'")]
    UnknownKind(String),

    /// A date string could not be parsed.
    #[error("invalid date '{0}', expected MM/DD/YYYY or YYYY-MM-DD")]
    MalformedDate(String),

    /// The rental would end before it starts.
    #[error("rental end date precedes start date")]
    RentalEndsBeforeStart,

    /// Export and clear must never target the canonical inventory document.
    #[error("'{0}' is the inventory document, choose a separate export path")]
    ExportTargetIsInventory(String),

    /// Source and target dealer of a transfer are the same.
    #[error("cannot transfer vehicle to its current dealer '{0}'")]
    SameDealer(String),
}

/// A well-formed request that the current inventory state does not allow.
#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("dealer '{0}' has vehicle acquisition disabled")]
    AcquisitionDisabled(String),

    #[error("vehicle '{vehicle_id}' not found for dealer '{dealer_id}'")]
    VehicleNotFound {
        dealer_id: String,
        vehicle_id: String,
    },

    #[error("dealer '{dealer_id}' already holds a vehicle with id '{vehicle_id}'")]
    DuplicateVehicle {
        dealer_id: String,
        vehicle_id: String,
    },

    #[error("vehicle '{vehicle_id}' is owned by dealer '{owner}', not '{dealer_id}'")]
    WrongOwner {
        dealer_id: String,
        vehicle_id: String,
        owner: String,
    },

    #[error("vehicle '{0}' does not match the supplied manufacturer, model and price")]
    RecordMismatch(String),

    #[error("vehicle '{0}' is currently rented")]
    CurrentlyRented(String),

    #[error("vehicle '{0}' is not currently rented")]
    NotRented(String),

    #[error("vehicle '{0}' is a sports car and cannot be rented")]
    NotRentable(String),

    #[error("inventory is empty, nothing to export")]
    EmptyInventory,
}

/// Error returned by [`crate::DealershipManager`] operations.
///
/// Only `Persistence` originates outside the engine; the other two variants
/// leave both the in-memory inventory and the document on disk untouched.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Rejected(#[from] RuleViolation),

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl EngineError {
    /// The rule violation carried by this error, if any.
    pub fn violation(&self) -> Option<&RuleViolation> {
        match self {
            Self::Rejected(violation) => Some(violation),
            _ => None,
        }
    }

    /// The validation failure carried by this error, if any.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Invalid(error) => Some(error),
            _ => None,
        }
    }
}

/// Reject blank identifiers before they reach the engine.
pub(crate) fn require_non_empty(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(())
    }
}

/// Reject zero, negative, NaN and infinite prices.
pub(crate) fn require_positive_price(price: f64) -> Result<(), ValidationError> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositivePrice(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_rejected() {
        assert_eq!(
            require_non_empty("  ", "dealer id"),
            Err(ValidationError::EmptyField("dealer id"))
        );
        assert!(require_non_empty("D1", "dealer id").is_ok());
    }

    #[test]
    fn prices_must_be_positive_and_finite() {
        assert!(require_positive_price(0.01).is_ok());
        assert!(require_positive_price(0.0).is_err());
        assert!(require_positive_price(-5.0).is_err());
        assert!(require_positive_price(f64::NAN).is_err());
        assert!(require_positive_price(f64::INFINITY).is_err());
    }

    #[test]
    fn engine_error_exposes_its_class() {
        let err = EngineError::from(RuleViolation::EmptyInventory);
        assert_eq!(err.violation(), Some(&RuleViolation::EmptyInventory));
        assert!(err.validation().is_none());

        let err = EngineError::from(ValidationError::RentalEndsBeforeStart);
        assert_eq!(
            err.validation(),
            Some(&ValidationError::RentalEndsBeforeStart)
        );
    }
}
