// Shared test helpers: snapshot builders and a scripted telemetry source
#![allow(dead_code)]

use async_trait::async_trait;
use fleetwatch::models::*;
use fleetwatch::telemetry::{TelemetryError, TelemetrySource};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A NORMAL, on-route vehicle with no extension fields.
pub fn vehicle(id: &str, timestamp: f64) -> VehicleSnapshot {
    VehicleSnapshot {
        vehicle_id: id.into(),
        timestamp,
        latitude: 22.31,
        longitude: 73.18,
        fuel_consumed_liters: 2.0,
        speed_kmph: 60.0,
        route_id: "delhi_mumbai".into(),
        co2_kg: 5.36,
        status: VehicleStatus::Normal,
        deviation_status: Some("OK".into()),
        co2_saved_kg: 0.5,
        ext: VehicleExtensions::default(),
    }
}

pub fn high_emission(id: &str, timestamp: f64, co2_kg: f64) -> VehicleSnapshot {
    VehicleSnapshot {
        status: VehicleStatus::HighEmissionAlert,
        co2_kg,
        ..vehicle(id, timestamp)
    }
}

pub fn feed(vehicles: Vec<VehicleSnapshot>) -> FleetFeed {
    FleetFeed::from_vehicles(vehicles)
}

/// One scripted response from `ScriptedSource::fetch_snapshots`.
pub enum Step {
    Feed(FleetFeed),
    Fail,
    /// Answers after a delay, to overlap the next poll interval.
    Slow(Duration, FleetFeed),
    /// Never completes; used to test shutdown and fetch timeouts.
    Hang,
}

/// Replays steps in order; once exhausted, returns empty feeds.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    pub synthetic_events: Mutex<Vec<(String, String)>>,
    pub reject_synthetic: bool,
    in_flight: AtomicUsize,
    /// Highest number of fetches observed running at once.
    pub peak_in_flight: AtomicUsize,
}

/// Counts a fetch as in flight until it completes or is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            synthetic_events: Mutex::new(Vec::new()),
            reject_synthetic: false,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn rejecting_synthetic() -> Self {
        Self {
            reject_synthetic: true,
            ..Self::new(vec![])
        }
    }
}

fn unavailable() -> TelemetryError {
    TelemetryError::Status {
        url: "scripted://fleet".into(),
        status: 503,
    }
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    async fn fetch_snapshots(&self) -> Result<FleetFeed, TelemetryError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Feed(feed)) => Ok(feed),
            Some(Step::Fail) => Err(unavailable()),
            Some(Step::Slow(delay, feed)) => {
                tokio::time::sleep(delay).await;
                Ok(feed)
            }
            Some(Step::Hang) => std::future::pending().await,
            None => Ok(FleetFeed::default()),
        }
    }

    async fn submit_synthetic_event(
        &self,
        vehicle_id: &str,
        kind: &str,
    ) -> Result<(), TelemetryError> {
        if self.reject_synthetic {
            return Err(unavailable());
        }
        self.synthetic_events
            .lock()
            .unwrap()
            .push((vehicle_id.to_string(), kind.to_string()));
        Ok(())
    }
}
