//! In-memory inventory and its persisted document.

/// JSON inventory/export document codec.
pub mod json;
/// XML import document codec.
pub mod xml;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Result;
use tracing::{info, warn};

use crate::models::Vehicle;

pub use json::{DecodedInventory, KindResolution, VehicleRecord};
pub use xml::ImportRecord;

/// Dealer-scoped identity of a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleKey {
    /// Owning dealer.
    pub dealer_id: String,
    /// Identifier unique within that dealer.
    pub vehicle_id: String,
}

impl VehicleKey {
    /// Build a key from its two parts.
    pub fn new(dealer_id: impl Into<String>, vehicle_id: impl Into<String>) -> Self {
        Self {
            dealer_id: dealer_id.into(),
            vehicle_id: vehicle_id.into(),
        }
    }

    /// Key under which `vehicle` is currently stored.
    pub fn of(vehicle: &Vehicle) -> Self {
        Self::new(vehicle.dealer_id(), vehicle.vehicle_id())
    }
}

/// Vehicles keyed by (dealer id, vehicle id).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    vehicles: BTreeMap<VehicleKey, Vehicle>,
}

impl Inventory {
    /// Build an inventory from a list; later duplicates replace earlier ones.
    pub fn from_vehicles(vehicles: impl IntoIterator<Item = Vehicle>) -> Self {
        let mut inventory = Self::default();
        for vehicle in vehicles {
            if let Some(previous) = inventory.upsert(vehicle) {
                warn!(
                    "Duplicate vehicle {} for dealer {}, keeping the later record",
                    previous.vehicle_id(),
                    previous.dealer_id()
                );
            }
        }
        inventory
    }

    /// Number of vehicles held.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Whether no vehicles are held.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Whether `dealer_id` holds a vehicle called `vehicle_id`.
    pub fn contains(&self, dealer_id: &str, vehicle_id: &str) -> bool {
        self.vehicles
            .contains_key(&VehicleKey::new(dealer_id, vehicle_id))
    }

    /// Look up a vehicle by its dealer-scoped identity.
    pub fn find_by_dealer_and_id(&self, dealer_id: &str, vehicle_id: &str) -> Option<&Vehicle> {
        self.vehicles.get(&VehicleKey::new(dealer_id, vehicle_id))
    }

    /// Every dealer holding a vehicle called `vehicle_id`.
    pub fn owners_of(&self, vehicle_id: &str) -> Vec<&str> {
        self.vehicles
            .values()
            .filter(|vehicle| vehicle.vehicle_id() == vehicle_id)
            .map(Vehicle::dealer_id)
            .collect()
    }

    /// Iterate all vehicles. Callers must not rely on the order.
    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Clone of every vehicle held.
    pub fn find_all(&self) -> Vec<Vehicle> {
        self.vehicles.values().cloned().collect()
    }

    pub(crate) fn get_mut(&mut self, dealer_id: &str, vehicle_id: &str) -> Option<&mut Vehicle> {
        self.vehicles
            .get_mut(&VehicleKey::new(dealer_id, vehicle_id))
    }

    /// Insert or replace, returning any vehicle previously stored under the same key.
    pub(crate) fn upsert(&mut self, vehicle: Vehicle) -> Option<Vehicle> {
        self.vehicles.insert(VehicleKey::of(&vehicle), vehicle)
    }

    pub(crate) fn remove(&mut self, dealer_id: &str, vehicle_id: &str) -> Option<Vehicle> {
        self.vehicles
            .remove(&VehicleKey::new(dealer_id, vehicle_id))
    }
}

/// Result of reading the canonical document at startup.
#[derive(Debug)]
pub enum LoadOutcome {
    /// No document exists yet.
    Missing,
    /// The document was read; it may hold zero vehicles.
    Loaded(DecodedInventory),
    /// The document exists but could not be read or parsed.
    Unreadable(anyhow::Error),
}

impl LoadOutcome {
    /// Vehicles to start from; failures degrade to an empty inventory.
    pub fn into_vehicles(self) -> Vec<Vehicle> {
        match self {
            LoadOutcome::Loaded(decoded) => decoded.vehicles,
            LoadOutcome::Missing | LoadOutcome::Unreadable(_) => Vec::new(),
        }
    }
}

/// Owns the live inventory and the canonical document backing it.
#[derive(Debug)]
pub struct InventoryStore {
    path: PathBuf,
    resolution: KindResolution,
    inventory: Inventory,
}

impl InventoryStore {
    /// Create a store for `path` with an empty in-memory inventory.
    pub fn new(path: impl Into<PathBuf>, resolution: KindResolution) -> Self {
        Self {
            path: path.into(),
            resolution,
            inventory: Inventory::default(),
        }
    }

    /// Create a store and populate it from the document on disk.
    pub fn open(path: impl Into<PathBuf>, resolution: KindResolution) -> (Self, LoadOutcome) {
        let mut store = Self::new(path, resolution);
        let outcome = store.reload();
        (store, outcome)
    }

    /// Path of the canonical document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the canonical document without touching the live inventory.
    ///
    /// Never fails; the outcome records whether the file was absent or broken.
    pub fn load(&self) -> LoadOutcome {
        match json::read_inventory(&self.path, self.resolution) {
            Ok(Some(decoded)) => {
                info!(
                    "Loaded {} vehicles from {} ({} skipped)",
                    decoded.vehicles.len(),
                    self.path.display(),
                    decoded.skipped
                );
                LoadOutcome::Loaded(decoded)
            }
            Ok(None) => {
                info!("No inventory at {}, starting empty", self.path.display());
                LoadOutcome::Missing
            }
            Err(err) => {
                warn!("Inventory {} unreadable, starting empty: {err:#}", self.path.display());
                LoadOutcome::Unreadable(err)
            }
        }
    }

    /// Replace the live inventory with the document's content.
    pub fn reload(&mut self) -> LoadOutcome {
        let outcome = self.load();
        let vehicles = match &outcome {
            LoadOutcome::Loaded(decoded) => decoded.vehicles.clone(),
            _ => Vec::new(),
        };
        self.inventory = Inventory::from_vehicles(vehicles);
        outcome
    }

    /// Overwrite the canonical document with `vehicles`.
    pub fn save<'a>(&self, vehicles: impl IntoIterator<Item = &'a Vehicle>) -> Result<()> {
        json::write_inventory(&self.path, vehicles)
    }

    /// Persist `staged` and, only once the write succeeded, make it live.
    pub fn commit(&mut self, staged: Inventory) -> Result<()> {
        self.save(staged.iter())?;
        self.inventory = staged;
        Ok(())
    }

    /// The live inventory.
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Look up a live vehicle by its dealer-scoped identity.
    pub fn find_by_dealer_and_id(&self, dealer_id: &str, vehicle_id: &str) -> Option<&Vehicle> {
        self.inventory.find_by_dealer_and_id(dealer_id, vehicle_id)
    }

    /// Clone of every live vehicle.
    pub fn find_all(&self) -> Vec<Vehicle> {
        self.inventory.find_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleKind;
    use std::fs;
    use tempfile::tempdir;

    fn vehicle(dealer: &str, id: &str, model: &str) -> Vehicle {
        Vehicle::new(VehicleKind::Suv, id, "Ford", model, 30_000.0, dealer).expect("valid vehicle")
    }

    #[test]
    fn same_id_under_two_dealers_are_distinct() {
        let inventory = Inventory::from_vehicles([
            vehicle("D1", "V1", "Explorer"),
            vehicle("D2", "V1", "Explorer"),
        ]);
        assert_eq!(inventory.len(), 2);
        assert!(inventory.contains("D1", "V1"));
        assert!(inventory.contains("D2", "V1"));
        assert!(inventory.find_by_dealer_and_id("D3", "V1").is_none());
        assert_eq!(inventory.owners_of("V1"), vec!["D1", "D2"]);
    }

    #[test]
    fn duplicate_keys_keep_the_later_record() {
        let inventory = Inventory::from_vehicles([
            vehicle("D1", "V1", "Explorer"),
            vehicle("D1", "V1", "Explorer Sport"),
        ]);
        assert_eq!(inventory.len(), 1);
        let kept = inventory.find_by_dealer_and_id("D1", "V1").expect("kept");
        assert_eq!(kept.model(), "Explorer Sport");
    }

    #[test]
    fn open_distinguishes_missing_from_unreadable() -> Result<()> {
        let dir = tempdir()?;

        let (store, outcome) = InventoryStore::open(dir.path().join("none.json"), KindResolution::default());
        assert!(matches!(outcome, LoadOutcome::Missing));
        assert!(store.inventory().is_empty());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json")?;
        let (store, outcome) = InventoryStore::open(&broken, KindResolution::default());
        assert!(matches!(outcome, LoadOutcome::Unreadable(_)));
        assert!(store.inventory().is_empty());

        let empty = dir.path().join("empty.json");
        fs::write(&empty, r#"{"car_inventory": []}"#)?;
        let (_, outcome) = InventoryStore::open(&empty, KindResolution::default());
        match outcome {
            LoadOutcome::Loaded(decoded) => assert!(decoded.vehicles.is_empty()),
            other => panic!("expected loaded outcome, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn commit_persists_before_swapping() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("inventory.json");
        let mut store = InventoryStore::new(&path, KindResolution::default());

        let mut staged = store.inventory().clone();
        staged.upsert(vehicle("D1", "V1", "Explorer"));
        store.commit(staged)?;
        assert_eq!(store.find_all().len(), 1);

        let (reopened, _) = InventoryStore::open(&path, KindResolution::default());
        assert_eq!(reopened.inventory(), store.inventory());
        Ok(())
    }

    #[test]
    fn failed_commit_leaves_inventory_untouched() -> Result<()> {
        let dir = tempdir()?;
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory")?;
        let mut store = InventoryStore::new(blocker.join("inventory.json"), KindResolution::default());

        let mut staged = store.inventory().clone();
        staged.upsert(vehicle("D1", "V1", "Explorer"));
        assert!(store.commit(staged).is_err());
        assert!(store.inventory().is_empty());
        Ok(())
    }
}
