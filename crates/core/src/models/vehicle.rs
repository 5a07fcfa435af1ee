use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};

use crate::error::{require_non_empty, require_positive_price, ValidationError};

use super::VehicleKind;

/// Metadata key carrying the owning dealer's display name.
pub const DEALER_NAME_KEY: &str = "dealer_name";

/// Date layouts accepted at the rental boundary.
const RENTAL_DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

/// Rental state as presented to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentalStatus {
    /// Rentable and not currently out.
    Available,
    /// Currently out on rental.
    Rented,
    /// Sale stock that can never be rented.
    NotRentable,
}

impl RentalStatus {
    /// Upper-case label used in listings.
    pub fn label(self) -> &'static str {
        match self {
            RentalStatus::Available => "AVAILABLE",
            RentalStatus::Rented => "RENTED",
            RentalStatus::NotRentable => "NOT RENTABLE",
        }
    }
}

/// One physical unit of stock held by a dealer.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    vehicle_id: String,
    kind: VehicleKind,
    manufacturer: String,
    model: String,
    price: f64,
    dealer_id: String,
    acquisition_date: DateTime<Utc>,
    is_rented: bool,
    rental_start_date: Option<DateTime<Utc>>,
    rental_end_date: Option<DateTime<Utc>>,
    metadata: BTreeMap<String, String>,
}

impl Vehicle {
    /// Build a validated vehicle acquired now.
    pub fn new(
        kind: VehicleKind,
        vehicle_id: impl Into<String>,
        manufacturer: impl Into<String>,
        model: impl Into<String>,
        price: f64,
        dealer_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let vehicle_id = vehicle_id.into();
        let manufacturer = manufacturer.into();
        let model = model.into();
        let dealer_id = dealer_id.into();

        require_non_empty(&vehicle_id, "vehicle id")?;
        require_non_empty(&dealer_id, "dealer id")?;
        require_non_empty(&manufacturer, "manufacturer")?;
        require_non_empty(&model, "model")?;
        require_positive_price(price)?;

        Ok(Self {
            vehicle_id: vehicle_id.trim().to_string(),
            kind,
            manufacturer: manufacturer.trim().to_string(),
            model: model.trim().to_string(),
            price,
            dealer_id: dealer_id.trim().to_string(),
            acquisition_date: Utc::now().trunc_subsecs(3),
            is_rented: false,
            rental_start_date: None,
            rental_end_date: None,
            metadata: BTreeMap::new(),
        })
    }

    /// Factory keyed on a kind tag such as `"suv"` or `"Sports Car"`.
    pub fn from_tag(
        tag: &str,
        vehicle_id: impl Into<String>,
        manufacturer: impl Into<String>,
        model: impl Into<String>,
        price: f64,
        dealer_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let kind = tag.parse::<VehicleKind>()?;
        Self::new(kind, vehicle_id, manufacturer, model, price, dealer_id)
    }

    /// Replace the acquisition timestamp; used when rebuilding stored records.
    pub fn with_acquisition_date(mut self, acquired_at: DateTime<Utc>) -> Self {
        self.acquisition_date = acquired_at.trunc_subsecs(3);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Identifier, unique within the owning dealer.
    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    /// Kind fixed at creation.
    pub fn kind(&self) -> VehicleKind {
        self.kind
    }

    /// Manufacturer name.
    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    /// Model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Price in dollars.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Identifier of the owning dealer.
    pub fn dealer_id(&self) -> &str {
        &self.dealer_id
    }

    /// When the unit entered the inventory.
    pub fn acquisition_date(&self) -> DateTime<Utc> {
        self.acquisition_date
    }

    /// Whether the unit is currently out on rental.
    pub fn is_rented(&self) -> bool {
        self.is_rented
    }

    /// Rental start, populated while rented.
    pub fn rental_start_date(&self) -> Option<DateTime<Utc>> {
        self.rental_start_date
    }

    /// Planned rental end, populated while rented.
    pub fn rental_end_date(&self) -> Option<DateTime<Utc>> {
        self.rental_end_date
    }

    /// Free-form key/value metadata.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Mutable access to the metadata bag.
    pub fn metadata_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.metadata
    }

    /// Display name of the owning dealer, when known.
    pub fn dealer_name(&self) -> Option<&str> {
        self.metadata.get(DEALER_NAME_KEY).map(String::as_str)
    }

    /// Whether this unit's kind may ever be rented.
    pub fn is_rentable(&self) -> bool {
        self.kind.is_rentable()
    }

    /// Presentation status; sports cars are never reported as available.
    pub fn rental_status(&self) -> RentalStatus {
        if !self.is_rentable() {
            RentalStatus::NotRentable
        } else if self.is_rented {
            RentalStatus::Rented
        } else {
            RentalStatus::Available
        }
    }

    /// Update the manufacturer name.
    pub fn set_manufacturer(&mut self, manufacturer: impl Into<String>) -> Result<(), ValidationError> {
        let manufacturer = manufacturer.into();
        require_non_empty(&manufacturer, "manufacturer")?;
        self.manufacturer = manufacturer.trim().to_string();
        Ok(())
    }

    /// Update the model name.
    pub fn set_model(&mut self, model: impl Into<String>) -> Result<(), ValidationError> {
        let model = model.into();
        require_non_empty(&model, "model")?;
        self.model = model.trim().to_string();
        Ok(())
    }

    /// Update the price.
    pub fn set_price(&mut self, price: f64) -> Result<(), ValidationError> {
        require_positive_price(price)?;
        self.price = price;
        Ok(())
    }

    /// True when manufacturer, model and price all equal the supplied values.
    pub fn matches_record(&self, manufacturer: &str, model: &str, price: f64) -> bool {
        self.manufacturer == manufacturer.trim() && self.model == model.trim() && self.price == price
    }

    pub(crate) fn set_dealer_id(&mut self, dealer_id: &str) {
        self.dealer_id = dealer_id.trim().to_string();
    }

    pub(crate) fn set_rental_state(
        &mut self,
        is_rented: bool,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) {
        self.is_rented = is_rented;
        self.rental_start_date = start.map(|date| date.trunc_subsecs(3));
        self.rental_end_date = end.map(|date| date.trunc_subsecs(3));
    }

    pub(crate) fn start_rental(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.set_rental_state(true, Some(start), Some(end));
    }

    pub(crate) fn end_rental(&mut self) {
        self.set_rental_state(false, None, None);
    }
}

/// Parse a rental date entered as `MM/DD/YYYY` or `YYYY-MM-DD` (UTC midnight).
pub fn parse_rental_date(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = raw.trim();
    RENTAL_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::MalformedDate(raw.to_string()))
}
