// Vehicle telemetry snapshot as delivered by the fleet feed

use serde::{Deserialize, Deserializer, Serialize};

/// Coarse emission status; serializes to SCREAMING_SNAKE_CASE (e.g. "HIGH_EMISSION_ALERT").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    #[default]
    Normal,
    Warning,
    HighEmissionAlert,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EtaStatus {
    OnTime,
    AtRisk,
    Delayed,
    #[serde(other)]
    Unknown,
}

/// One reading for one vehicle at one poll tick. Never mutated after decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub vehicle_id: String,
    /// Seconds since epoch (fractional).
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fuel_consumed_liters: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub speed_kmph: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub route_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub co2_kg: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: VehicleStatus,
    /// "OK", "OK|reason" or a pipe-delimited deviation description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deviation_status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub co2_saved_kg: f64,
    #[serde(flatten)]
    pub ext: VehicleExtensions,
}

/// Optional fields that vary by feed version. Unrecognised keys are kept in `other`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleExtensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_temp_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tyre_pressure_psi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cargo_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_severity: Option<String>,

    // cold chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_breach: Option<bool>,

    // load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_size_ft: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overload_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cargo_condition: Option<String>,

    // ETA merge from fleet-intel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_status: Option<EtaStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Feeds send `null` for readings a sensor did not report; treat it like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl VehicleSnapshot {
    /// True when the feed reports a deviation: present, non-empty and not "OK"-prefixed.
    pub fn is_deviating(&self) -> bool {
        self.deviation_status
            .as_deref()
            .is_some_and(|s| !s.is_empty() && !s.starts_with("OK"))
    }

    /// Distance proxy over fuel (2-minute segment at current speed); 0 when no fuel was burned.
    pub fn efficiency(&self) -> f64 {
        if self.fuel_consumed_liters > 0.0 {
            (self.speed_kmph * (2.0 / 60.0)) / self.fuel_consumed_liters
        } else {
            0.0
        }
    }
}
