// HTTP telemetry source: dashboard fleet-intel endpoint with fallback to the plain fleet feed

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{TelemetryError, TelemetrySource};
use crate::models::{EtaEntry, FleetFeed, VehicleSnapshot};

#[derive(Debug, Clone)]
pub struct HttpTelemetryConfig {
    pub base_url: String,
    pub fleet_intel_path: String,
    pub fleet_path: String,
    pub spike_path: String,
    pub request_timeout: Duration,
}

/// Body of the fleet-intel endpoint. Missing keys mean "nothing there", not an error.
#[derive(Debug, Deserialize)]
struct FleetIntelResponse {
    #[serde(default)]
    vehicles: Vec<serde_json::Value>,
    #[serde(default)]
    eta_vehicles: Option<Vec<EtaEntry>>,
}

pub struct HttpTelemetrySource {
    client: reqwest::Client,
    fleet_intel_url: String,
    fleet_url: String,
    spike_url: String,
}

impl HttpTelemetrySource {
    pub fn new(config: HttpTelemetryConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            fleet_intel_url: format!("{}{}", base, config.fleet_intel_path),
            fleet_url: format!("{}{}", base, config.fleet_path),
            spike_url: format!("{}{}", base, config.spike_path),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TelemetryError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|source| TelemetryError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|source| TelemetryError::Decode {
                url: url.to_string(),
                source,
            })
    }
}

/// Decodes vehicles one record at a time; a malformed record is skipped, not the tick.
fn decode_records(url: &str, records: Vec<serde_json::Value>) -> Vec<VehicleSnapshot> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<VehicleSnapshot>(record) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(
                    error = %e,
                    operation = "decode_vehicle",
                    url,
                    "skipping malformed vehicle record"
                );
                None
            }
        })
        .collect()
}

#[async_trait]
impl TelemetrySource for HttpTelemetrySource {
    #[instrument(skip(self), fields(source = "http", operation = "fetch_snapshots"))]
    async fn fetch_snapshots(&self) -> Result<FleetFeed, TelemetryError> {
        match self.get_json::<FleetIntelResponse>(&self.fleet_intel_url).await {
            Ok(intel) => {
                let vehicles = decode_records(&self.fleet_intel_url, intel.vehicles);
                if !vehicles.is_empty() {
                    return Ok(FleetFeed {
                        vehicles,
                        eta_vehicles: intel.eta_vehicles,
                    });
                }
                debug!("fleet-intel returned no vehicles; falling back to fleet feed");
            }
            Err(e) => debug!(error = %e, "fleet-intel failed; falling back to fleet feed"),
        }
        let records: Vec<serde_json::Value> = self.get_json(&self.fleet_url).await?;
        Ok(FleetFeed::from_vehicles(decode_records(
            &self.fleet_url,
            records,
        )))
    }

    #[instrument(skip(self), fields(source = "http", operation = "submit_synthetic_event"))]
    async fn submit_synthetic_event(
        &self,
        vehicle_id: &str,
        kind: &str,
    ) -> Result<(), TelemetryError> {
        let body = serde_json::json!({ "vehicle_id": vehicle_id, "kind": kind });
        let response = self
            .client
            .post(&self.spike_url)
            .json(&body)
            .send()
            .await
            .map_err(|source| TelemetryError::Transport {
                url: self.spike_url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Status {
                url: self.spike_url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
