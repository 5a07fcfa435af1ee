//! Per-dealer acquisition switches.

use std::collections::HashMap;

use tracing::debug;

/// Tracks which dealers may take on brand-new stock.
///
/// Dealers never seen before are enabled.
#[derive(Debug, Clone, Default)]
pub struct DealerRegistry {
    acquisition: HashMap<String, bool>,
}

impl DealerRegistry {
    /// Create an empty registry where every dealer is enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `dealer_id` may acquire new vehicles.
    pub fn is_acquisition_enabled(&self, dealer_id: &str) -> bool {
        self.acquisition
            .get(dealer_id.trim())
            .copied()
            .unwrap_or(true)
    }

    /// Set the acquisition switch for `dealer_id`.
    pub fn set_acquisition_enabled(&mut self, dealer_id: &str, enabled: bool) {
        let dealer_id = dealer_id.trim();
        debug!(dealer_id, enabled, "acquisition toggled");
        self.acquisition.insert(dealer_id.to_string(), enabled);
    }

    /// Dealers whose acquisition is currently switched off, sorted.
    pub fn disabled_dealers(&self) -> Vec<String> {
        let mut dealers: Vec<String> = self
            .acquisition
            .iter()
            .filter(|(_, enabled)| !**enabled)
            .map(|(dealer, _)| dealer.clone())
            .collect();
        dealers.sort();
        dealers
    }
}
