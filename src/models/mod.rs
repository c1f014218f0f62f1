// Domain models: vehicle snapshots, anomalies, stats, published state

mod anomaly;
mod eta;
mod state;
mod stats;
mod vehicle;

pub use anomaly::{AnomalyEntry, AnomalyKind, Severity, anomaly_id};
pub use eta::{EtaEntry, FleetFeed};
pub use state::{FleetState, FleetSummary, SelectionState};
pub use stats::FleetStats;
pub use vehicle::{EtaStatus, VehicleExtensions, VehicleSnapshot, VehicleStatus};
