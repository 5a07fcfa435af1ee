//! Read-only views over the inventory: search, listings and statistics.

use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::{
    models::{Vehicle, VehicleKind},
    store::Inventory,
};

/// Field a search query is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchField {
    /// Vehicle identifier.
    Id,
    /// Manufacturer name.
    Manufacturer,
    /// Model name.
    Model,
    /// Owning dealer identifier.
    DealerId,
    /// Kind label.
    Type,
    /// Any of the above.
    #[default]
    All,
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "id" => Ok(SearchField::Id),
            "manufacturer" | "make" => Ok(SearchField::Manufacturer),
            "model" => Ok(SearchField::Model),
            "dealer" | "dealerid" => Ok(SearchField::DealerId),
            "type" | "kind" => Ok(SearchField::Type),
            "all" | "allfields" => Ok(SearchField::All),
            _ => Err(format!("unknown search field '{raw}'")),
        }
    }
}

impl SearchField {
    fn matches(self, vehicle: &Vehicle, needle: &str) -> bool {
        let contains = |value: &str| value.to_lowercase().contains(needle);
        match self {
            SearchField::Id => contains(vehicle.vehicle_id()),
            SearchField::Manufacturer => contains(vehicle.manufacturer()),
            SearchField::Model => contains(vehicle.model()),
            SearchField::DealerId => contains(vehicle.dealer_id()),
            SearchField::Type => contains(vehicle.kind().label()),
            SearchField::All => [
                SearchField::Id,
                SearchField::Manufacturer,
                SearchField::Model,
                SearchField::DealerId,
                SearchField::Type,
            ]
            .into_iter()
            .any(|field| field.matches(vehicle, needle)),
        }
    }
}

/// Case-insensitive substring search; an empty query matches everything.
pub fn search(inventory: &Inventory, field: SearchField, query: &str) -> Vec<Vehicle> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return inventory.find_all();
    }
    inventory
        .iter()
        .filter(|vehicle| field.matches(vehicle, &needle))
        .cloned()
        .collect()
}

/// Number of vehicles held by one dealer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealerStats {
    /// Dealer identifier.
    pub dealer_id: String,
    /// Vehicles currently owned.
    pub vehicle_count: usize,
}

impl fmt::Display for DealerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dealer ID: {}     Vehicle Count: {}",
            self.dealer_id, self.vehicle_count
        )
    }
}

/// Dashboard figures for the whole inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySummary {
    /// Vehicles held.
    pub total: usize,
    /// Vehicles currently rented.
    pub rented: usize,
    /// Vehicles not currently rented.
    pub available: usize,
    /// Vehicle count per kind; kinds without stock are omitted.
    pub by_kind: BTreeMap<VehicleKind, usize>,
    /// Vehicle count per dealer, sorted by dealer id.
    pub by_dealer: Vec<DealerStats>,
}

/// Compute dashboard figures.
pub fn summarize(inventory: &Inventory) -> InventorySummary {
    let mut by_kind = BTreeMap::new();
    let mut by_dealer: BTreeMap<&str, usize> = BTreeMap::new();
    let mut rented = 0;

    for vehicle in inventory.iter() {
        *by_kind.entry(vehicle.kind()).or_insert(0) += 1;
        *by_dealer.entry(vehicle.dealer_id()).or_insert(0) += 1;
        if vehicle.is_rented() {
            rented += 1;
        }
    }

    let total = inventory.len();
    InventorySummary {
        total,
        rented,
        available: total - rented,
        by_kind,
        by_dealer: by_dealer
            .into_iter()
            .map(|(dealer_id, vehicle_count)| DealerStats {
                dealer_id: dealer_id.to_string(),
                vehicle_count,
            })
            .collect(),
    }
}

/// Distinct owning dealers, sorted.
pub fn dealer_ids(inventory: &Inventory) -> Vec<String> {
    let mut ids: Vec<String> = inventory
        .iter()
        .map(|vehicle| vehicle.dealer_id().to_string())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Rentable, not-yet-rented vehicles of `dealer_id`.
pub fn available_for_rent(inventory: &Inventory, dealer_id: &str) -> Vec<Vehicle> {
    inventory
        .iter()
        .filter(|vehicle| vehicle.dealer_id() == dealer_id)
        .filter(|vehicle| vehicle.is_rentable() && !vehicle.is_rented())
        .cloned()
        .collect()
}

/// Rented vehicles of `dealer_id`.
pub fn rented_by(inventory: &Inventory, dealer_id: &str) -> Vec<Vehicle> {
    inventory
        .iter()
        .filter(|vehicle| vehicle.dealer_id() == dealer_id && vehicle.is_rented())
        .cloned()
        .collect()
}
