// Telemetry source boundary: where vehicle snapshots come from and where demo events go.

mod http;

pub use http::{HttpTelemetryConfig, HttpTelemetrySource};

use crate::models::FleetFeed;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("telemetry request timed out after {0} ms")]
    Timeout(u64),
}

/// Producer of fleet snapshots. Swappable so tests can feed fixed sequences.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Current fleet state as seen by the source. At most one snapshot per vehicle id
    /// is expected; order is not significant.
    async fn fetch_snapshots(&self) -> Result<FleetFeed, TelemetryError>;

    /// Ask the source to inject a demo condition for one vehicle. Fire-and-forget:
    /// the effect, if any, shows up in a later `fetch_snapshots`.
    async fn submit_synthetic_event(&self, vehicle_id: &str, kind: &str)
    -> Result<(), TelemetryError>;
}
