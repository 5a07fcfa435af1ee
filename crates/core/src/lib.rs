#![warn(clippy::all, missing_docs)]

//! Core domain logic for the dealership inventory.
//!
//! This crate hosts the vehicle models, the per-dealer acquisition
//! registry, the JSON/XML document codecs, and the rule engine that every
//! inventory mutation flows through. Frontends call into
//! [`DealershipManager`] and render what it returns.

pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod query;
pub mod registry;
pub mod store;

pub use config::AppConfig;
pub use error::{EngineError, EngineResult, RuleViolation, ValidationError};
pub use manager::{DealershipManager, ImportReport};
pub use models::{parse_rental_date, RentalStatus, Vehicle, VehicleKind};
pub use query::{DealerStats, InventorySummary, SearchField};
pub use registry::DealerRegistry;
pub use store::{Inventory, InventoryStore, KindResolution, LoadOutcome};
