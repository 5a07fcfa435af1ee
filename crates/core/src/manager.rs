//! The dealership rule engine.
//!
//! Every mutation is validated against the registry and the live inventory,
//! applied to a staged copy, written to the canonical document and only then
//! made live. A rejected or failed operation changes nothing.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    error::{
        require_non_empty, require_positive_price, EngineError, EngineResult, RuleViolation,
        ValidationError,
    },
    models::Vehicle,
    query::{self, InventorySummary, SearchField},
    registry::DealerRegistry,
    store::{json, xml, ImportRecord, Inventory, InventoryStore, KindResolution, LoadOutcome},
};

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Distinct vehicles written, new or replacing stored stock.
    pub imported: usize,
    /// Records overridden by a later record for the same dealer and id.
    pub superseded: usize,
    /// Records that could not be mapped onto a vehicle or that collide with
    /// a vehicle out on rental.
    pub skipped: usize,
}

/// Enforces the legal state transitions of the inventory.
#[derive(Debug)]
pub struct DealershipManager {
    store: InventoryStore,
    registry: DealerRegistry,
}

impl DealershipManager {
    /// Wrap an already opened store.
    pub fn new(store: InventoryStore) -> Self {
        Self {
            store,
            registry: DealerRegistry::new(),
        }
    }

    /// Open the canonical document at `path`.
    pub fn open(path: impl Into<PathBuf>, resolution: KindResolution) -> (Self, LoadOutcome) {
        let (store, outcome) = InventoryStore::open(path, resolution);
        (Self::new(store), outcome)
    }

    /// Open the canonical document named by the configuration.
    pub fn from_config(config: &AppConfig) -> (Self, LoadOutcome) {
        Self::open(config.inventory_path.clone(), config.kind_resolution)
    }

    /// Discard the live inventory and re-read the canonical document.
    pub fn reload(&mut self) -> LoadOutcome {
        self.store.reload()
    }

    /// The backing store.
    pub fn store(&self) -> &InventoryStore {
        &self.store
    }

    /// Acquisition switches.
    pub fn registry(&self) -> &DealerRegistry {
        &self.registry
    }

    /// Whether `dealer_id` may take on brand-new stock.
    pub fn is_acquisition_enabled(&self, dealer_id: &str) -> bool {
        self.registry.is_acquisition_enabled(dealer_id)
    }

    /// Allow `dealer_id` to acquire new vehicles.
    pub fn enable_acquisition(&mut self, dealer_id: &str) {
        self.registry.set_acquisition_enabled(dealer_id, true);
    }

    /// Block `dealer_id` from acquiring new vehicles.
    pub fn disable_acquisition(&mut self, dealer_id: &str) {
        self.registry.set_acquisition_enabled(dealer_id, false);
    }

    /// Add a brand-new vehicle, subject to its dealer's acquisition switch.
    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> EngineResult<()> {
        let dealer_id = vehicle.dealer_id().to_string();
        if !self.registry.is_acquisition_enabled(&dealer_id) {
            info!("Rejected vehicle {} for dealer {dealer_id}: acquisition disabled", vehicle.vehicle_id());
            return Err(RuleViolation::AcquisitionDisabled(dealer_id).into());
        }

        self.apply(|inventory| {
            if inventory.contains(vehicle.dealer_id(), vehicle.vehicle_id()) {
                return Err(RuleViolation::DuplicateVehicle {
                    dealer_id: vehicle.dealer_id().to_string(),
                    vehicle_id: vehicle.vehicle_id().to_string(),
                }
                .into());
            }
            info!("Added {} {} to dealer {}", vehicle.kind(), vehicle.vehicle_id(), vehicle.dealer_id());
            inventory.upsert(vehicle);
            Ok(())
        })
    }

    /// Remove a vehicle after checking it matches the supplied details.
    pub fn remove_vehicle(
        &mut self,
        dealer_id: &str,
        vehicle_id: &str,
        manufacturer: &str,
        model: &str,
        price: f64,
    ) -> EngineResult<Vehicle> {
        let (dealer_id, vehicle_id) = (dealer_id.trim(), vehicle_id.trim());
        require_non_empty(dealer_id, "dealer id")?;
        require_non_empty(vehicle_id, "vehicle id")?;
        require_positive_price(price)?;

        self.apply(|inventory| {
            let vehicle = locate(inventory, dealer_id, vehicle_id)?;
            if !vehicle.matches_record(manufacturer, model, price) {
                return Err(RuleViolation::RecordMismatch(vehicle_id.to_string()).into());
            }
            if vehicle.is_rented() {
                return Err(RuleViolation::CurrentlyRented(vehicle_id.to_string()).into());
            }
            let removed = inventory
                .remove(dealer_id, vehicle_id)
                .ok_or_else(|| not_found(dealer_id, vehicle_id))?;
            info!("Removed vehicle {vehicle_id} from dealer {dealer_id}");
            Ok(removed)
        })
    }

    /// Move an available, rentable vehicle into the rented state.
    pub fn rent_vehicle(
        &mut self,
        dealer_id: &str,
        vehicle_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<()> {
        let (dealer_id, vehicle_id) = (dealer_id.trim(), vehicle_id.trim());
        require_non_empty(dealer_id, "dealer id")?;
        require_non_empty(vehicle_id, "vehicle id")?;
        if end < start {
            return Err(ValidationError::RentalEndsBeforeStart.into());
        }

        self.apply(|inventory| {
            let vehicle = locate(inventory, dealer_id, vehicle_id)?;
            if !vehicle.is_rentable() {
                return Err(RuleViolation::NotRentable(vehicle_id.to_string()).into());
            }
            if vehicle.is_rented() {
                return Err(RuleViolation::CurrentlyRented(vehicle_id.to_string()).into());
            }
            let vehicle = inventory
                .get_mut(dealer_id, vehicle_id)
                .ok_or_else(|| not_found(dealer_id, vehicle_id))?;
            vehicle.start_rental(start, end);
            info!(
                "Rented vehicle {vehicle_id} of dealer {dealer_id} from {} to {}",
                start.date_naive(),
                end.date_naive()
            );
            Ok(())
        })
    }

    /// Bring a rented vehicle back to the available state.
    pub fn return_vehicle(&mut self, dealer_id: &str, vehicle_id: &str) -> EngineResult<()> {
        let (dealer_id, vehicle_id) = (dealer_id.trim(), vehicle_id.trim());
        require_non_empty(dealer_id, "dealer id")?;
        require_non_empty(vehicle_id, "vehicle id")?;

        self.apply(|inventory| {
            let vehicle = locate(inventory, dealer_id, vehicle_id)?;
            if !vehicle.is_rentable() {
                return Err(RuleViolation::NotRentable(vehicle_id.to_string()).into());
            }
            if !vehicle.is_rented() {
                return Err(RuleViolation::NotRented(vehicle_id.to_string()).into());
            }
            let vehicle = inventory
                .get_mut(dealer_id, vehicle_id)
                .ok_or_else(|| not_found(dealer_id, vehicle_id))?;
            vehicle.end_rental();
            info!("Returned vehicle {vehicle_id} to dealer {dealer_id}");
            Ok(())
        })
    }

    /// Reassign an available vehicle to another dealer.
    ///
    /// The target dealer's acquisition switch is not consulted: it only
    /// gates brand-new stock.
    pub fn transfer_vehicle(
        &mut self,
        source_dealer_id: &str,
        target_dealer_id: &str,
        vehicle_id: &str,
    ) -> EngineResult<()> {
        let source_dealer_id = source_dealer_id.trim();
        let target_dealer_id = target_dealer_id.trim();
        let vehicle_id = vehicle_id.trim();
        require_non_empty(source_dealer_id, "source dealer id")?;
        require_non_empty(target_dealer_id, "target dealer id")?;
        require_non_empty(vehicle_id, "vehicle id")?;
        if source_dealer_id == target_dealer_id {
            return Err(ValidationError::SameDealer(source_dealer_id.to_string()).into());
        }

        self.apply(|inventory| {
            let vehicle = inventory
                .find_by_dealer_and_id(source_dealer_id, vehicle_id)
                .ok_or_else(|| not_found(source_dealer_id, vehicle_id))?;
            if vehicle.is_rented() {
                return Err(RuleViolation::CurrentlyRented(vehicle_id.to_string()).into());
            }
            if inventory.contains(target_dealer_id, vehicle_id) {
                return Err(RuleViolation::DuplicateVehicle {
                    dealer_id: target_dealer_id.to_string(),
                    vehicle_id: vehicle_id.to_string(),
                }
                .into());
            }

            let mut vehicle = inventory
                .remove(source_dealer_id, vehicle_id)
                .ok_or_else(|| not_found(source_dealer_id, vehicle_id))?;
            vehicle.set_dealer_id(target_dealer_id);
            inventory.upsert(vehicle);
            info!("Transferred vehicle {vehicle_id} from dealer {source_dealer_id} to {target_dealer_id}");
            Ok(())
        })
    }

    /// Insert externally supplied records without consulting acquisition switches.
    ///
    /// Records that do not map onto a valid vehicle are skipped, as are
    /// records colliding with a vehicle out on rental. Other records sharing
    /// a dealer and id with stored stock replace it, and a later record in
    /// the batch supersedes an earlier one. The document is written once for
    /// the whole batch.
    pub fn import_records(
        &mut self,
        records: impl IntoIterator<Item = ImportRecord>,
    ) -> EngineResult<ImportReport> {
        let acquired_at = Utc::now();
        let mut report = ImportReport::default();
        let mut staged = self.store.inventory().clone();
        let mut written = HashSet::new();

        for record in records {
            let label = format!("{}/{}", record.dealer_id, record.vehicle_id);
            let vehicle = match record.into_vehicle(acquired_at) {
                Ok(vehicle) => vehicle,
                Err(err) => {
                    warn!("Skipping import record {label}: {err}");
                    report.skipped += 1;
                    continue;
                }
            };

            let rented = staged
                .find_by_dealer_and_id(vehicle.dealer_id(), vehicle.vehicle_id())
                .is_some_and(|stored| stored.is_rented());
            if rented {
                warn!("Skipping import record {label}: vehicle is out on rental");
                report.skipped += 1;
                continue;
            }

            let key = (vehicle.dealer_id().to_string(), vehicle.vehicle_id().to_string());
            staged.upsert(vehicle);
            if written.insert(key) {
                report.imported += 1;
            } else {
                report.superseded += 1;
            }
        }

        if report.imported > 0 {
            self.store.commit(staged)?;
        }
        info!(
            "Imported {} vehicles ({} superseded, {} skipped)",
            report.imported, report.superseded, report.skipped
        );
        Ok(report)
    }

    /// Parse an XML import document and import its records.
    ///
    /// A document that cannot be read or parsed imports nothing.
    pub fn import_xml_file(&mut self, path: impl AsRef<Path>) -> EngineResult<ImportReport> {
        let records = xml::read_import_file(path)?;
        self.import_records(records)
    }

    /// Write the full inventory to `destination`, returning the vehicle count.
    pub fn export_inventory(&self, destination: impl AsRef<Path>) -> EngineResult<usize> {
        let destination = destination.as_ref();
        self.ensure_distinct_from_inventory(destination)?;
        let inventory = self.store.inventory();
        if inventory.is_empty() {
            return Err(RuleViolation::EmptyInventory.into());
        }
        json::write_inventory(destination, inventory.iter())?;
        info!("Exported {} vehicles to {}", inventory.len(), destination.display());
        Ok(inventory.len())
    }

    /// Reset `destination` to an empty document.
    pub fn clear_export_document(&self, destination: impl AsRef<Path>) -> EngineResult<()> {
        let destination = destination.as_ref();
        self.ensure_distinct_from_inventory(destination)?;
        json::write_inventory(destination, std::iter::empty::<&Vehicle>())?;
        info!("Cleared export document {}", destination.display());
        Ok(())
    }

    /// Snapshot of every vehicle for presentation.
    ///
    /// The returned vehicles are copies; changing them does not affect the
    /// inventory.
    pub fn list_for_display(&self) -> Vec<Vehicle> {
        self.store.find_all()
    }

    /// Vehicles matching `query` in the chosen field.
    pub fn search(&self, field: SearchField, query: &str) -> Vec<Vehicle> {
        query::search(self.store.inventory(), field, query)
    }

    /// Headline counts for the dashboard.
    pub fn summary(&self) -> InventorySummary {
        query::summarize(self.store.inventory())
    }

    /// Distinct dealers currently holding stock.
    pub fn dealer_ids(&self) -> Vec<String> {
        query::dealer_ids(self.store.inventory())
    }

    /// Vehicles of `dealer_id` that can be rented right now.
    pub fn available_for_rent(&self, dealer_id: &str) -> Vec<Vehicle> {
        query::available_for_rent(self.store.inventory(), dealer_id.trim())
    }

    /// Vehicles of `dealer_id` currently out on rental.
    pub fn rented_by(&self, dealer_id: &str) -> Vec<Vehicle> {
        query::rented_by(self.store.inventory(), dealer_id.trim())
    }

    fn apply<T>(
        &mut self,
        mutate: impl FnOnce(&mut Inventory) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut staged = self.store.inventory().clone();
        let value = mutate(&mut staged)?;
        self.store.commit(staged)?;
        Ok(value)
    }

    fn ensure_distinct_from_inventory(&self, destination: &Path) -> Result<(), ValidationError> {
        if same_location(destination, self.store.path()) {
            Err(ValidationError::ExportTargetIsInventory(
                destination.display().to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn not_found(dealer_id: &str, vehicle_id: &str) -> EngineError {
    RuleViolation::VehicleNotFound {
        dealer_id: dealer_id.to_string(),
        vehicle_id: vehicle_id.to_string(),
    }
    .into()
}

/// Find a vehicle owned by `dealer_id`, telling a wrong owner apart from a missing one.
fn locate<'a>(inventory: &'a Inventory, dealer_id: &str, vehicle_id: &str) -> EngineResult<&'a Vehicle> {
    if let Some(vehicle) = inventory.find_by_dealer_and_id(dealer_id, vehicle_id) {
        return Ok(vehicle);
    }
    match inventory.owners_of(vehicle_id).first() {
        Some(owner) => Err(RuleViolation::WrongOwner {
            dealer_id: dealer_id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            owner: owner.to_string(),
        }
        .into()),
        None => Err(not_found(dealer_id, vehicle_id)),
    }
}
