use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Closed set of vehicle kinds stocked by the network.
///
/// The only behaviour that differs between kinds is whether a unit may be
/// rented out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VehicleKind {
    /// Sport utility vehicle.
    #[serde(rename = "suv")]
    Suv,
    /// Four-door saloon.
    #[serde(rename = "sedan")]
    Sedan,
    /// Pickup truck.
    #[serde(rename = "pickup")]
    Pickup,
    /// Sports car, sale stock only.
    #[serde(rename = "sports car")]
    SportsCar,
}

/// Model-name fragments used to recover a kind from a stored record.
const MODEL_HINTS: &[(&str, VehicleKind)] = &[
    ("cr-v", VehicleKind::Suv),
    ("explorer", VehicleKind::Suv),
    ("range rover", VehicleKind::Suv),
    ("model 3", VehicleKind::Sedan),
    ("g70", VehicleKind::Sedan),
    ("silverado", VehicleKind::Pickup),
    ("tundra", VehicleKind::Pickup),
    ("supra", VehicleKind::SportsCar),
    ("miata", VehicleKind::SportsCar),
];

impl VehicleKind {
    /// Every kind, in display order.
    pub const ALL: [VehicleKind; 4] = [
        VehicleKind::Suv,
        VehicleKind::Sedan,
        VehicleKind::Pickup,
        VehicleKind::SportsCar,
    ];

    /// Whether vehicles of this kind may enter the rented state.
    pub fn is_rentable(self) -> bool {
        !matches!(self, VehicleKind::SportsCar)
    }

    /// Tag written to the `vehicle_type` field of inventory documents.
    pub fn tag(self) -> &'static str {
        match self {
            VehicleKind::Suv => "suv",
            VehicleKind::Sedan => "sedan",
            VehicleKind::Pickup => "pickup",
            VehicleKind::SportsCar => "sports car",
        }
    }

    /// Short label used when presenting inventory.
    pub fn label(self) -> &'static str {
        match self {
            VehicleKind::Suv => "SUV",
            VehicleKind::Sedan => "Sedan",
            VehicleKind::Pickup => "Pickup",
            VehicleKind::SportsCar => "SportsCar",
        }
    }

    /// Guess the kind from a model name using the known model table.
    ///
    /// Matching is a case-insensitive substring search; unrecognised models
    /// fall back to [`VehicleKind::Suv`].
    pub fn infer_from_model(model: &str) -> Self {
        let needle = model.to_lowercase();
        MODEL_HINTS
            .iter()
            .find(|(fragment, _)| needle.contains(fragment))
            .map(|(_, kind)| *kind)
            .unwrap_or(VehicleKind::Suv)
    }
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VehicleKind {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "suv" => Ok(VehicleKind::Suv),
            "sedan" => Ok(VehicleKind::Sedan),
            "pickup" => Ok(VehicleKind::Pickup),
            "sports car" | "sportscar" | "sports_car" => Ok(VehicleKind::SportsCar),
            _ => Err(ValidationError::UnknownKind(raw.to_string())),
        }
    }
}
