// Fleet aggregator: current snapshots, bounded per-vehicle history, derived anomaly feed.
// Pure state machine; the poll worker owns one instance and drives it tick by tick.

pub mod rules;
pub mod stats;

use crate::models::{FleetFeed, FleetState, VehicleSnapshot};
use rules::RuleThresholds;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// 24 hours of history at the 2 s poll cadence.
pub const DEFAULT_MAX_HISTORY: usize = 720;
pub const DEFAULT_MAX_ACTIVE_ANOMALIES: usize = 25;
pub const DEFAULT_MAX_RESOLVED_ANOMALIES: usize = 50;

/// Size bounds for the history buffers and anomaly lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorLimits {
    pub max_history: usize,
    pub max_active_anomalies: usize,
    pub max_resolved_anomalies: usize,
}

impl Default for AggregatorLimits {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            max_active_anomalies: DEFAULT_MAX_ACTIVE_ANOMALIES,
            max_resolved_anomalies: DEFAULT_MAX_RESOLVED_ANOMALIES,
        }
    }
}

/// What one feed did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Feed had no vehicles; state untouched.
    Empty,
    Applied {
        vehicles: usize,
        new_anomalies: usize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct FleetAggregator {
    limits: AggregatorLimits,
    thresholds: RuleThresholds,
    state: FleetState,
}

impl FleetAggregator {
    pub fn new(limits: AggregatorLimits, thresholds: RuleThresholds) -> Self {
        Self {
            limits,
            thresholds,
            state: FleetState::default(),
        }
    }

    pub fn state(&self) -> &FleetState {
        &self.state
    }

    pub fn limits(&self) -> AggregatorLimits {
        self.limits
    }

    /// Applies one successful fetch. An empty feed leaves every part of the state as it was.
    pub fn apply_feed(&mut self, feed: FleetFeed, now_ms: u64) -> TickOutcome {
        if feed.vehicles.is_empty() {
            return TickOutcome::Empty;
        }
        let vehicles = dedup_by_vehicle(feed.vehicles);

        for v in &vehicles {
            let buf = self
                .state
                .history
                .entry(v.vehicle_id.clone())
                .or_insert_with(VecDeque::new);
            buf.push_back(Arc::new(v.clone()));
            while buf.len() > self.limits.max_history {
                buf.pop_front();
            }
        }

        let stats = stats::derive_stats(&vehicles);

        let mut anomalies: Vec<_> = vehicles
            .iter()
            .flat_map(|v| rules::evaluate(v, &self.thresholds))
            .collect();
        let new_anomalies = anomalies.len();
        anomalies.append(&mut self.state.anomalies);
        anomalies.truncate(self.limits.max_active_anomalies);

        let vehicle_count = vehicles.len();
        self.state.vehicles = vehicles;
        self.state.stats = stats;
        self.state.anomalies = anomalies;
        if let Some(eta) = feed.eta_vehicles {
            self.state.eta_vehicles = eta;
        }
        self.state.tick += 1;
        self.state.last_poll_ok_at = Some(now_ms);

        TickOutcome::Applied {
            vehicles: vehicle_count,
            new_anomalies,
        }
    }

    /// Moves an active anomaly to the head of the resolved list. Unknown ids (already
    /// resolved, aged out, never derived) are ignored. Returns whether anything moved.
    pub fn resolve(&mut self, anomaly_id: &str) -> bool {
        let Some(pos) = self
            .state
            .anomalies
            .iter()
            .position(|a| a.id == anomaly_id)
        else {
            return false;
        };
        let entry = self.state.anomalies.remove(pos);
        // Same id from a re-derived snapshot is the same event.
        self.state.anomalies.retain(|a| a.id != anomaly_id);
        self.state.resolved_anomalies.insert(0, entry);
        self.state
            .resolved_anomalies
            .truncate(self.limits.max_resolved_anomalies);
        true
    }

    pub fn select(&mut self, vehicle_id: Option<String>) {
        self.state.selection.selected_vehicle_id = vehicle_id;
    }

    pub fn set_chat_open(&mut self, open: bool) {
        self.state.selection.chat_open = open;
    }
}

/// One snapshot per vehicle id: later records win, first-seen position is kept.
fn dedup_by_vehicle(vehicles: Vec<VehicleSnapshot>) -> Vec<VehicleSnapshot> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(vehicles.len());
    let mut out: Vec<VehicleSnapshot> = Vec::with_capacity(vehicles.len());
    for v in vehicles {
        match index.get(&v.vehicle_id) {
            Some(&i) => out[i] = v,
            None => {
                index.insert(v.vehicle_id.clone(), out.len());
                out.push(v);
            }
        }
    }
    out
}
