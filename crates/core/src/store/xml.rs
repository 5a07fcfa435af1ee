//! Parser for third-party dealer XML import documents.
//!
//! Expected layout:
//!
//! ```xml
//! <Dealers>
//!   <Dealer id="485">
//!     <Name>Wacky Bob's Automall</Name>
//!     <Vehicle type="suv" id="848432">
//!       <Make>Land Rover</Make>
//!       <Model>Range Rover</Model>
//!       <Price unit="pounds">20000</Price>
//!     </Vehicle>
//!   </Dealer>
//! </Dealers>
//! ```

use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};
use tracing::warn;

use crate::{
    error::ValidationError,
    models::{Vehicle, VehicleKind, DEALER_NAME_KEY},
};

/// Conversion applied to prices quoted with `unit="pounds"`.
pub const POUNDS_TO_DOLLARS: f64 = 1.25;

/// One `Vehicle` element together with its enclosing dealer details.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    /// `id` attribute of the enclosing `Dealer`.
    pub dealer_id: String,
    /// Text of the dealer's `Name` element, empty when absent.
    pub dealer_name: String,
    /// `type` attribute of the `Vehicle`.
    pub vehicle_type: String,
    /// `id` attribute of the `Vehicle`.
    pub vehicle_id: String,
    /// Text of `Make`.
    pub make: String,
    /// Text of `Model`.
    pub model: String,
    /// Raw text of `Price`.
    pub price: String,
    /// `unit` attribute of `Price`, if any.
    pub price_unit: Option<String>,
}

impl ImportRecord {
    /// Price in dollars, converting from pounds when flagged.
    pub fn price_in_dollars(&self) -> Result<f64, ValidationError> {
        let amount: f64 = self
            .price
            .trim()
            .parse()
            .map_err(|_| ValidationError::MalformedPrice(self.price.clone()))?;
        Ok(match self.price_unit.as_deref() {
            Some(unit) if unit.trim().eq_ignore_ascii_case("pounds") => amount * POUNDS_TO_DOLLARS,
            _ => amount,
        })
    }

    /// Map the record onto a vehicle acquired at `acquired_at`.
    ///
    /// Unrecognised type attributes fall back to SUV.
    pub fn into_vehicle(self, acquired_at: DateTime<Utc>) -> Result<Vehicle, ValidationError> {
        let kind = self.vehicle_type.parse().unwrap_or(VehicleKind::Suv);
        let price = self.price_in_dollars()?;
        let mut vehicle = Vehicle::new(
            kind,
            self.vehicle_id,
            self.make,
            self.model,
            price,
            self.dealer_id,
        )?
        .with_acquisition_date(acquired_at);

        let dealer_name = self.dealer_name.trim();
        if !dealer_name.is_empty() {
            vehicle
                .metadata_mut()
                .insert(DEALER_NAME_KEY.to_string(), dealer_name.to_string());
        }
        Ok(vehicle)
    }
}

/// Parse an import document body into raw records.
pub fn parse_import_document(content: &str) -> Result<Vec<ImportRecord>> {
    let document = Document::parse(content).context("import document is not well-formed XML")?;

    let mut records = Vec::new();
    for dealer in document
        .descendants()
        .filter(|node| node.has_tag_name("Dealer"))
    {
        let dealer_id = dealer.attribute("id").unwrap_or_default().trim().to_string();
        let dealer_name = element_text(dealer, "Name");

        for vehicle in dealer
            .descendants()
            .filter(|node| node.has_tag_name("Vehicle"))
        {
            let price = first_element(vehicle, "Price");
            if price.is_none() {
                warn!(
                    "Vehicle {:?} under dealer {dealer_id} has no Price element",
                    vehicle.attribute("id")
                );
            }
            records.push(ImportRecord {
                dealer_id: dealer_id.clone(),
                dealer_name: dealer_name.clone(),
                vehicle_type: vehicle.attribute("type").unwrap_or_default().to_string(),
                vehicle_id: vehicle.attribute("id").unwrap_or_default().trim().to_string(),
                make: element_text(vehicle, "Make"),
                model: element_text(vehicle, "Model"),
                price: price
                    .and_then(|node| node.text())
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                price_unit: price
                    .and_then(|node| node.attribute("unit"))
                    .map(str::to_string),
            });
        }
    }
    Ok(records)
}

/// Read and parse an import document from disk.
pub fn read_import_file(path: impl AsRef<Path>) -> Result<Vec<ImportRecord>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_import_document(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn first_element<'a, 'input>(parent: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    parent.descendants().find(|node| node.has_tag_name(tag))
}

fn element_text(parent: Node<'_, '_>, tag: &str) -> String {
    first_element(parent, tag)
        .and_then(|node| node.text())
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Dealers>
  <Dealer id="485">
    <Name>Wacky Bob's Automall</Name>
    <Vehicle type="suv" id="848432">
      <Make>Land Rover</Make>
      <Model>Range Rover</Model>
      <Price unit="pounds">20000</Price>
    </Vehicle>
    <Vehicle type="Sports Car" id="111">
      <Make>Toyota</Make>
      <Model>Supra</Model>
      <Price unit="dollars">48000</Price>
    </Vehicle>
  </Dealer>
  <Dealer id="12">
    <Name>Harbor Autos</Name>
    <Vehicle type="pickup" id="9">
      <Make>Toyota</Make>
      <Model>Tundra</Model>
      <Price>abc</Price>
    </Vehicle>
  </Dealer>
</Dealers>"#;

    #[test]
    fn parses_dealers_and_vehicles() -> Result<()> {
        let records = parse_import_document(SAMPLE)?;
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.dealer_id, "485");
        assert_eq!(first.dealer_name, "Wacky Bob's Automall");
        assert_eq!(first.vehicle_id, "848432");
        assert_eq!(first.make, "Land Rover");
        assert_eq!(first.price_unit.as_deref(), Some("pounds"));
        assert_eq!(records[2].dealer_id, "12");
        Ok(())
    }

    #[test]
    fn converts_pounds_and_keeps_dollars() -> Result<()> {
        let records = parse_import_document(SAMPLE)?;
        assert_eq!(records[0].price_in_dollars(), Ok(25_000.0));
        assert_eq!(records[1].price_in_dollars(), Ok(48_000.0));
        assert_eq!(
            records[2].price_in_dollars(),
            Err(ValidationError::MalformedPrice("abc".to_string()))
        );
        Ok(())
    }

    #[test]
    fn maps_records_onto_vehicles() -> Result<()> {
        let now = Utc::now();
        let mut records = parse_import_document(SAMPLE)?.into_iter();

        let suv = records.next().expect("first record").into_vehicle(now)?;
        assert_eq!(suv.kind(), VehicleKind::Suv);
        assert_eq!(suv.price(), 25_000.0);
        assert_eq!(suv.dealer_id(), "485");
        assert_eq!(suv.dealer_name(), Some("Wacky Bob's Automall"));

        let sports = records.next().expect("second record").into_vehicle(now)?;
        assert_eq!(sports.kind(), VehicleKind::SportsCar);

        let broken = records.next().expect("third record").into_vehicle(now);
        assert!(broken.is_err());
        Ok(())
    }

    #[test]
    fn unknown_type_defaults_to_suv() {
        let record = ImportRecord {
            dealer_id: "1".into(),
            dealer_name: String::new(),
            vehicle_type: "hovercraft".into(),
            vehicle_id: "H1".into(),
            make: "Acme".into(),
            model: "Glide".into(),
            price: "100".into(),
            price_unit: None,
        };
        let vehicle = record.into_vehicle(Utc::now()).expect("valid record");
        assert_eq!(vehicle.kind(), VehicleKind::Suv);
        assert!(vehicle.dealer_name().is_none());
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(parse_import_document("<Dealers><Dealer>").is_err());
    }
}
