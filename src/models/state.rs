// Published aggregator state: one immutable value per tick or command

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use super::{AnomalyEntry, EtaEntry, FleetStats, VehicleSnapshot};

/// Operator focus. Not validated against the current vehicle set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub selected_vehicle_id: Option<String>,
    pub chat_open: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetState {
    /// Successful ticks applied so far.
    pub tick: u64,
    /// Unix ms of the last successful poll; `None` until the first one lands.
    pub last_poll_ok_at: Option<u64>,
    pub vehicles: Vec<VehicleSnapshot>,
    /// Snapshots are shared between published states; cloning a state copies pointers.
    pub history: BTreeMap<String, VecDeque<Arc<VehicleSnapshot>>>,
    pub anomalies: Vec<AnomalyEntry>,
    pub resolved_anomalies: Vec<AnomalyEntry>,
    pub stats: FleetStats,
    pub eta_vehicles: Vec<EtaEntry>,
    pub selection: SelectionState,
}

impl FleetState {
    pub fn vehicle(&self, vehicle_id: &str) -> Option<&VehicleSnapshot> {
        self.vehicles.iter().find(|v| v.vehicle_id == vehicle_id)
    }

    /// Selected vehicle if it is in the current snapshot set. A selection that points at
    /// a vehicle which stopped reporting yields `None` ("not currently visible").
    pub fn selected_vehicle(&self) -> Option<&VehicleSnapshot> {
        self.selection
            .selected_vehicle_id
            .as_deref()
            .and_then(|id| self.vehicle(id))
    }

    pub fn history_of(&self, vehicle_id: &str) -> Option<&VecDeque<Arc<VehicleSnapshot>>> {
        self.history.get(vehicle_id)
    }

    pub fn eta_of(&self, vehicle_id: &str) -> Option<&EtaEntry> {
        self.eta_vehicles.iter().find(|e| e.vehicle_id == vehicle_id)
    }

    /// Active anomalies for one vehicle, most recent first.
    pub fn anomalies_for<'a>(
        &'a self,
        vehicle_id: &'a str,
    ) -> impl Iterator<Item = &'a AnomalyEntry> + 'a {
        self.anomalies
            .iter()
            .filter(move |a| a.vehicle_id == vehicle_id)
    }

    /// The state without per-vehicle history, for push updates.
    pub fn summary(&self) -> FleetSummary<'_> {
        FleetSummary {
            tick: self.tick,
            last_poll_ok_at: self.last_poll_ok_at,
            vehicles: &self.vehicles,
            anomalies: &self.anomalies,
            resolved_anomalies: &self.resolved_anomalies,
            stats: &self.stats,
            eta_vehicles: &self.eta_vehicles,
            selection: &self.selection,
        }
    }

    /// Milliseconds since the last successful poll, if any.
    pub fn staleness_ms(&self, now_ms: u64) -> Option<u64> {
        self.last_poll_ok_at.map(|t| now_ms.saturating_sub(t))
    }
}

/// Borrowed view of a `FleetState` without history. History is served per vehicle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary<'a> {
    pub tick: u64,
    pub last_poll_ok_at: Option<u64>,
    pub vehicles: &'a [VehicleSnapshot],
    pub anomalies: &'a [AnomalyEntry],
    pub resolved_anomalies: &'a [AnomalyEntry],
    pub stats: &'a FleetStats,
    pub eta_vehicles: &'a [EtaEntry],
    pub selection: &'a SelectionState,
}
