// ETA board rows and the combined feed returned by a telemetry source

use serde::{Deserialize, Serialize};

use super::{EtaStatus, VehicleSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtaEntry {
    pub vehicle_id: String,
    pub eta_hours: f64,
    pub eta_status: EtaStatus,
    #[serde(default)]
    pub remaining_km: f64,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub avg_speed_kmph: f64,
    #[serde(default)]
    pub cargo_type: String,
    #[serde(default)]
    pub route_id: String,
    /// Fraction of the route covered, 0..=1.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub promised_eta: String,
}

/// Result of one fetch. `eta_vehicles` is `None` when the source has no ETA board
/// (plain fleet feed); the aggregator then keeps the previous board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetFeed {
    pub vehicles: Vec<VehicleSnapshot>,
    pub eta_vehicles: Option<Vec<EtaEntry>>,
}

impl FleetFeed {
    pub fn from_vehicles(vehicles: Vec<VehicleSnapshot>) -> Self {
        Self {
            vehicles,
            eta_vehicles: None,
        }
    }
}
