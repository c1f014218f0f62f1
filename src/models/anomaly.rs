// Derived operator alerts

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Critical,
}

/// Closed set of anomaly kinds, one per derivation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    HighEmissionAlert,
    RouteDeviationAlert,
    TemperatureBreach,
    OverloadViolation,
    EtaCriticalDelay,
    CargoDamageSuspected,
    AccidentRisk,
}

impl AnomalyKind {
    /// Short tag used in anomaly ids.
    pub fn tag(self) -> &'static str {
        match self {
            AnomalyKind::HighEmissionAlert => "emission",
            AnomalyKind::RouteDeviationAlert => "dev",
            AnomalyKind::TemperatureBreach => "temp",
            AnomalyKind::OverloadViolation => "overload",
            AnomalyKind::EtaCriticalDelay => "delay",
            AnomalyKind::CargoDamageSuspected => "dmg",
            AnomalyKind::AccidentRisk => "acc",
        }
    }
}

/// One alert instance. Resolving moves it between lists; the entry itself never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEntry {
    pub id: String,
    pub timestamp: f64,
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub detail: String,
    pub action_required: String,
}

/// Deterministic id: same vehicle, kind and timestamp always yield the same id.
pub fn anomaly_id(vehicle_id: &str, kind: AnomalyKind, timestamp: f64) -> String {
    format!("{}-{}-{}", vehicle_id, kind.tag(), timestamp)
}
