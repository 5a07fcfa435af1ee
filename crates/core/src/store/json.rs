//! Reader and writer for `car_inventory` JSON documents.

use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::{
    error::ValidationError,
    models::{Vehicle, VehicleKind, DEALER_NAME_KEY},
};

/// How the kind of a stored record is determined on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindResolution {
    /// Derive the kind from the model name, ignoring `vehicle_type`.
    #[default]
    InferFromModel,
    /// Use `vehicle_type` when it names a known kind, inferring otherwise.
    TrustTypeTag,
}

/// Top-level shape of inventory and export documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryDocument {
    /// Every vehicle record in the document.
    #[serde(default)]
    pub car_inventory: Vec<Value>,
}

/// A single vehicle as laid out in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Dealer-scoped vehicle identifier.
    pub vehicle_id: String,
    /// Manufacturer name.
    pub vehicle_manufacturer: String,
    /// Model name.
    pub vehicle_model: String,
    /// Acquisition time in epoch milliseconds.
    pub acquisition_date: i64,
    /// Price in dollars.
    pub price: f64,
    /// Owning dealer.
    pub dealership_id: String,
    /// Kind tag, see [`VehicleKind::tag`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    /// Rental flag.
    #[serde(default)]
    pub is_rented: bool,
    /// Rental start in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rental_start_date: Option<i64>,
    /// Rental end in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rental_end_date: Option<i64>,
    /// Dealer display name carried through import/export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dealer_name: Option<String>,
}

impl VehicleRecord {
    /// Flatten a vehicle into its document form.
    pub fn from_vehicle(vehicle: &Vehicle) -> Self {
        Self {
            vehicle_id: vehicle.vehicle_id().to_string(),
            vehicle_manufacturer: vehicle.manufacturer().to_string(),
            vehicle_model: vehicle.model().to_string(),
            acquisition_date: vehicle.acquisition_date().timestamp_millis(),
            price: vehicle.price(),
            dealership_id: vehicle.dealer_id().to_string(),
            vehicle_type: Some(vehicle.kind().tag().to_string()),
            is_rented: vehicle.is_rented(),
            rental_start_date: vehicle.rental_start_date().map(|date| date.timestamp_millis()),
            rental_end_date: vehicle.rental_end_date().map(|date| date.timestamp_millis()),
            dealer_name: vehicle.dealer_name().map(str::to_string),
        }
    }

    /// Rebuild a vehicle, resolving its kind according to `resolution`.
    pub fn into_vehicle(self, resolution: KindResolution) -> Result<Vehicle, ValidationError> {
        let kind = self.resolve_kind(resolution);
        let mut vehicle = Vehicle::new(
            kind,
            self.vehicle_id,
            self.vehicle_manufacturer,
            self.vehicle_model,
            self.price,
            self.dealership_id,
        )?
        .with_acquisition_date(from_millis(self.acquisition_date)?);

        vehicle.set_rental_state(
            self.is_rented,
            self.rental_start_date.map(from_millis).transpose()?,
            self.rental_end_date.map(from_millis).transpose()?,
        );
        if let Some(name) = self.dealer_name {
            vehicle.metadata_mut().insert(DEALER_NAME_KEY.to_string(), name);
        }
        Ok(vehicle)
    }

    fn resolve_kind(&self, resolution: KindResolution) -> VehicleKind {
        match resolution {
            KindResolution::InferFromModel => VehicleKind::infer_from_model(&self.vehicle_model),
            KindResolution::TrustTypeTag => self
                .vehicle_type
                .as_deref()
                .and_then(|tag| tag.parse().ok())
                .unwrap_or_else(|| VehicleKind::infer_from_model(&self.vehicle_model)),
        }
    }
}

/// Vehicles decoded from a document plus the number of records dropped.
#[derive(Debug, Clone, Default)]
pub struct DecodedInventory {
    /// Records that decoded into valid vehicles.
    pub vehicles: Vec<Vehicle>,
    /// Records that were malformed and skipped.
    pub skipped: usize,
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, ValidationError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ValidationError::MalformedDate(millis.to_string()))
}

/// Decode a document body, skipping records that fail to map to a vehicle.
pub fn decode_inventory(content: &str, resolution: KindResolution) -> Result<DecodedInventory> {
    let document: InventoryDocument =
        serde_json::from_str(content).context("inventory document is not valid JSON")?;

    let mut decoded = DecodedInventory::default();
    for (index, raw) in document.car_inventory.into_iter().enumerate() {
        let record = match serde_json::from_value::<VehicleRecord>(raw) {
            Ok(record) => record,
            Err(err) => {
                warn!("Skipping inventory record {index}: {err}");
                decoded.skipped += 1;
                continue;
            }
        };
        match record.into_vehicle(resolution) {
            Ok(vehicle) => decoded.vehicles.push(vehicle),
            Err(err) => {
                warn!("Skipping inventory record {index}: {err}");
                decoded.skipped += 1;
            }
        }
    }
    Ok(decoded)
}

/// Encode vehicles into a pretty-printed document body.
pub fn encode_inventory<'a>(vehicles: impl IntoIterator<Item = &'a Vehicle>) -> Result<Vec<u8>> {
    let records = vehicles
        .into_iter()
        .map(|vehicle| serde_json::to_value(VehicleRecord::from_vehicle(vehicle)))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to serialize vehicle record")?;
    let document = InventoryDocument {
        car_inventory: records,
    };
    serde_json::to_vec_pretty(&document).context("failed to serialize inventory document")
}

/// Read a document from disk, returning `None` if the file does not exist.
pub fn read_inventory(
    path: impl AsRef<Path>,
    resolution: KindResolution,
) -> Result<Option<DecodedInventory>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let decoded = decode_inventory(&content, resolution)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(decoded))
}

/// Replace the document at `path` with the given vehicles.
///
/// The body is written to a sibling temporary file which is then renamed over
/// `path`, so a failure at any point leaves the previous document in place.
pub fn write_inventory<'a>(
    path: impl AsRef<Path>,
    vehicles: impl IntoIterator<Item = &'a Vehicle>,
) -> Result<()> {
    let path = path.as_ref();
    let body = encode_inventory(vehicles)?;
    write_atomic(path, &body)
}

fn write_atomic(path: &Path, body: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let mut staged = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to stage write in {}", parent.display()))?;
    staged
        .write_all(body)
        .with_context(|| format!("failed to write staged copy of {}", path.display()))?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| format!("failed to flush staged copy of {}", path.display()))?;
    staged
        .persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_fleet() -> Vec<Vehicle> {
        let mut rented = Vehicle::new(VehicleKind::Pickup, "P1", "Chevrolet", "Silverado", 41_000.0, "D2")
            .expect("valid pickup")
            .with_metadata(DEALER_NAME_KEY, "Northside Motors");
        rented.start_rental(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
        );
        vec![
            Vehicle::new(VehicleKind::Suv, "V1", "Honda", "CR-V", 25_000.0, "D1")
                .expect("valid suv"),
            Vehicle::new(VehicleKind::SportsCar, "S1", "Toyota", "Supra", 52_000.0, "D1")
                .expect("valid sports car"),
            rented,
        ]
    }

    #[test]
    fn write_then_read_preserves_vehicles() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("inventory.json");
        let fleet = sample_fleet();

        write_inventory(&path, &fleet)?;
        let decoded = read_inventory(&path, KindResolution::InferFromModel)?
            .expect("document exists");

        assert_eq!(decoded.skipped, 0);
        assert_eq!(decoded.vehicles, fleet);
        Ok(())
    }

    #[test]
    fn missing_file_reads_as_none() -> Result<()> {
        let dir = tempdir()?;
        let decoded = read_inventory(dir.path().join("absent.json"), KindResolution::default())?;
        assert!(decoded.is_none());
        Ok(())
    }

    #[test]
    fn writes_expected_field_names() -> Result<()> {
        let fleet = sample_fleet();
        let body = encode_inventory(&fleet[2..])?;
        let value: Value = serde_json::from_slice(&body)?;
        let record = &value["car_inventory"][0];

        assert_eq!(record["vehicle_id"], json!("P1"));
        assert_eq!(record["vehicle_manufacturer"], json!("Chevrolet"));
        assert_eq!(record["dealership_id"], json!("D2"));
        assert_eq!(record["vehicle_type"], json!("pickup"));
        assert_eq!(record["is_rented"], json!(true));
        assert_eq!(record["rental_start_date"], json!(1_704_067_200_000_i64));
        assert_eq!(record["dealer_name"], json!("Northside Motors"));
        Ok(())
    }

    #[test]
    fn available_vehicles_omit_rental_dates() -> Result<()> {
        let fleet = sample_fleet();
        let body = encode_inventory(&fleet[..1])?;
        let value: Value = serde_json::from_slice(&body)?;
        let record = &value["car_inventory"][0];
        assert_eq!(record["is_rented"], json!(false));
        assert!(record.get("rental_start_date").is_none());
        assert!(record.get("dealer_name").is_none());
        Ok(())
    }

    #[test]
    fn kind_resolution_controls_the_type_tag() -> Result<()> {
        let content = json!({
            "car_inventory": [{
                "vehicle_id": "X1",
                "vehicle_manufacturer": "Honda",
                "vehicle_model": "Civic",
                "acquisition_date": 1_700_000_000_000_i64,
                "price": 21000,
                "dealership_id": "D1",
                "vehicle_type": "sedan",
                "is_rented": false
            }]
        })
        .to_string();

        let inferred = decode_inventory(&content, KindResolution::InferFromModel)?;
        assert_eq!(inferred.vehicles[0].kind(), VehicleKind::Suv);

        let trusted = decode_inventory(&content, KindResolution::TrustTypeTag)?;
        assert_eq!(trusted.vehicles[0].kind(), VehicleKind::Sedan);
        Ok(())
    }

    #[test]
    fn malformed_records_are_skipped() -> Result<()> {
        let content = json!({
            "car_inventory": [
                { "vehicle_id": "bad" },
                {
                    "vehicle_id": "neg",
                    "vehicle_manufacturer": "Ford",
                    "vehicle_model": "Explorer",
                    "acquisition_date": 0,
                    "price": -3.0,
                    "dealership_id": "D1"
                },
                {
                    "vehicle_id": "ok",
                    "vehicle_manufacturer": "Ford",
                    "vehicle_model": "Explorer",
                    "acquisition_date": 0,
                    "price": 30000.0,
                    "dealership_id": "D1",
                    "unexpected": "ignored"
                }
            ]
        })
        .to_string();

        let decoded = decode_inventory(&content, KindResolution::default())?;
        assert_eq!(decoded.skipped, 2);
        assert_eq!(decoded.vehicles.len(), 1);
        assert_eq!(decoded.vehicles[0].vehicle_id(), "ok");
        assert!(!decoded.vehicles[0].is_rented());
        Ok(())
    }

    #[test]
    fn missing_inventory_key_decodes_empty() -> Result<()> {
        let decoded = decode_inventory("{}", KindResolution::default())?;
        assert!(decoded.vehicles.is_empty());
        assert!(decode_inventory("not json", KindResolution::default()).is_err());
        Ok(())
    }

    #[test]
    fn rewrite_replaces_previous_content() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("inventory.json");
        let fleet = sample_fleet();

        write_inventory(&path, &fleet)?;
        write_inventory(&path, &fleet[..1])?;
        let decoded = read_inventory(&path, KindResolution::default())?.expect("exists");
        assert_eq!(decoded.vehicles.len(), 1);
        Ok(())
    }
}
