//! Text rendering of engine results.

use dealership_core::{EngineError, ImportReport, InventorySummary, RuleViolation, Vehicle};

/// One listing line for a vehicle.
pub fn vehicle_line(vehicle: &Vehicle) -> String {
    let dealer = match vehicle.dealer_name() {
        Some(name) => format!("{} ({name})", vehicle.dealer_id()),
        None => vehicle.dealer_id().to_string(),
    };
    format!(
        "Type: {}, ID: {}, Manufacturer: {}, Model: {}, Price: ${:.2}, Dealer: {}, Status: {}",
        vehicle.kind(),
        vehicle.vehicle_id(),
        vehicle.manufacturer(),
        vehicle.model(),
        vehicle.price(),
        dealer,
        vehicle.rental_status().label()
    )
}

/// Short `id - make model` label used when picking a vehicle.
pub fn vehicle_choice(vehicle: &Vehicle) -> String {
    format!(
        "{} - {} {}",
        vehicle.vehicle_id(),
        vehicle.manufacturer(),
        vehicle.model()
    )
}

/// Titled listing, with `empty` printed when there is nothing to show.
pub fn listing(title: &str, vehicles: &[Vehicle], empty: &str) -> String {
    let mut out = format!("{title}:\n\n");
    if vehicles.is_empty() {
        out.push_str(empty);
        out.push('\n');
    }
    for vehicle in vehicles {
        out.push_str(&vehicle_line(vehicle));
        out.push('\n');
    }
    out
}

/// Dashboard figures as plain text.
pub fn summary(summary: &InventorySummary) -> String {
    let mut out = format!(
        "Inventory Summary\nTotal Vehicles: {}\nCurrently Rented: {}\nAvailable for Sale: {}\n",
        summary.total, summary.rented, summary.available
    );

    out.push_str("\nVehicles by Type\n");
    for (kind, count) in &summary.by_kind {
        out.push_str(&format!("{kind}: {count}\n"));
    }

    out.push_str("\nVehicles by Dealer\n");
    for dealer in &summary.by_dealer {
        out.push_str(&format!("{dealer}\n"));
    }
    out
}

/// Import outcome message.
pub fn import_report(report: &ImportReport) -> String {
    let mut out = if report.imported == 0 {
        format!("No vehicles imported ({} records skipped)", report.skipped)
    } else {
        format!(
            "Successfully imported {} vehicles ({} skipped)",
            report.imported, report.skipped
        )
    };
    if report.superseded > 0 {
        out.push_str(&format!(
            "\n{} repeated records overrode earlier ones",
            report.superseded
        ));
    }
    out
}

/// Dealers with acquisition switched off.
pub fn acquisition_status(disabled: &[String]) -> String {
    if disabled.is_empty() {
        "Acquisition enabled for all dealers".to_string()
    } else {
        format!("Acquisition disabled for: {}", disabled.join(", "))
    }
}

/// User-facing explanation of a failed operation.
pub fn failure(error: &EngineError) -> String {
    match error {
        EngineError::Invalid(err) => format!("Validation error: {err}"),
        EngineError::Rejected(RuleViolation::AcquisitionDisabled(dealer)) => {
            format!("Vehicle acquisition is disabled for dealer {dealer}")
        }
        EngineError::Rejected(violation) => format!("Operation refused: {violation}"),
        EngineError::Persistence(err) => format!("Could not update files: {err:#}"),
    }
}
