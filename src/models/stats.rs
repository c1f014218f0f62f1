// Fleet-wide projection of the current snapshot set

use serde::{Deserialize, Serialize};

/// Recomputed from scratch every successful tick; carries no identity of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub total_co2: f64,
    pub total_saved: f64,
    pub total_fuel: f64,
    pub alert_count: usize,
    pub deviation_count: usize,
    pub avg_efficiency: f64,
    pub vehicle_count: usize,
    pub on_time_count: usize,
    pub delayed_count: usize,
    pub at_risk_count: usize,
}
