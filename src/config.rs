use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::aggregator::AggregatorLimits;
use crate::aggregator::rules::{ACCIDENT_RISK_SPEED_KMPH, OVERLOAD_CRITICAL_PCT, RuleThresholds};
use crate::telemetry::HttpTelemetryConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    pub monitoring: MonitoringConfig,
    /// Vehicle id -> driver name, shown on the vehicle detail view.
    #[serde(default)]
    pub drivers: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub base_url: String,
    #[serde(default = "default_fleet_intel_path")]
    pub fleet_intel_path: String,
    #[serde(default = "default_fleet_path")]
    pub fleet_path: String,
    #[serde(default = "default_spike_path")]
    pub spike_path: String,
    /// Upper bound on one fetch; a hung source must not stall the tick loop.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_fleet_intel_path() -> String {
    "/api/fleet-intel".into()
}

fn default_fleet_path() -> String {
    "/api/fleet".into()
}

fn default_spike_path() -> String {
    "/api/spike".into()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_max_active_anomalies")]
    pub max_active_anomalies: usize,
    #[serde(default = "default_max_resolved_anomalies")]
    pub max_resolved_anomalies: usize,
    /// Pending operator commands (resolve/select) before senders wait.
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_history: default_max_history(),
            max_active_anomalies: default_max_active_anomalies(),
            max_resolved_anomalies: default_max_resolved_anomalies(),
            command_capacity: default_command_capacity(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_history() -> usize {
    crate::aggregator::DEFAULT_MAX_HISTORY
}

fn default_max_active_anomalies() -> usize {
    crate::aggregator::DEFAULT_MAX_ACTIVE_ANOMALIES
}

fn default_max_resolved_anomalies() -> usize {
    crate::aggregator::DEFAULT_MAX_RESOLVED_ANOMALIES
}

fn default_command_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_overload_critical_pct")]
    pub overload_critical_pct: f64,
    #[serde(default = "default_accident_risk_speed_kmph")]
    pub accident_risk_speed_kmph: f64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            overload_critical_pct: OVERLOAD_CRITICAL_PCT,
            accident_risk_speed_kmph: ACCIDENT_RISK_SPEED_KMPH,
        }
    }
}

fn default_overload_critical_pct() -> f64 {
    OVERLOAD_CRITICAL_PCT
}

fn default_accident_risk_speed_kmph() -> f64 {
    ACCIDENT_RISK_SPEED_KMPH
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log a fleet summary (vehicles, active anomalies, staleness) at INFO level.
    pub stats_log_interval_secs: u64,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.telemetry.base_url.is_empty(),
            "telemetry.base_url must be non-empty"
        );
        anyhow::ensure!(
            self.telemetry.request_timeout_ms > 0,
            "telemetry.request_timeout_ms must be > 0, got {}",
            self.telemetry.request_timeout_ms
        );
        anyhow::ensure!(
            self.aggregator.poll_interval_ms > 0,
            "aggregator.poll_interval_ms must be > 0, got {}",
            self.aggregator.poll_interval_ms
        );
        anyhow::ensure!(
            self.aggregator.max_history > 0,
            "aggregator.max_history must be > 0, got {}",
            self.aggregator.max_history
        );
        anyhow::ensure!(
            self.aggregator.max_active_anomalies > 0,
            "aggregator.max_active_anomalies must be > 0, got {}",
            self.aggregator.max_active_anomalies
        );
        anyhow::ensure!(
            self.aggregator.max_resolved_anomalies > 0,
            "aggregator.max_resolved_anomalies must be > 0, got {}",
            self.aggregator.max_resolved_anomalies
        );
        anyhow::ensure!(
            self.aggregator.command_capacity > 0,
            "aggregator.command_capacity must be > 0, got {}",
            self.aggregator.command_capacity
        );
        anyhow::ensure!(
            self.rules.overload_critical_pct >= 0.0,
            "rules.overload_critical_pct must be >= 0, got {}",
            self.rules.overload_critical_pct
        );
        anyhow::ensure!(
            self.rules.accident_risk_speed_kmph >= 0.0,
            "rules.accident_risk_speed_kmph must be >= 0, got {}",
            self.rules.accident_risk_speed_kmph
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }

    pub fn limits(&self) -> AggregatorLimits {
        AggregatorLimits {
            max_history: self.aggregator.max_history,
            max_active_anomalies: self.aggregator.max_active_anomalies,
            max_resolved_anomalies: self.aggregator.max_resolved_anomalies,
        }
    }

    pub fn thresholds(&self) -> RuleThresholds {
        RuleThresholds {
            overload_critical_pct: self.rules.overload_critical_pct,
            accident_risk_speed_kmph: self.rules.accident_risk_speed_kmph,
        }
    }

    pub fn http_telemetry(&self) -> HttpTelemetryConfig {
        HttpTelemetryConfig {
            base_url: self.telemetry.base_url.clone(),
            fleet_intel_path: self.telemetry.fleet_intel_path.clone(),
            fleet_path: self.telemetry.fleet_path.clone(),
            spike_path: self.telemetry.spike_path.clone(),
            request_timeout: Duration::from_millis(self.telemetry.request_timeout_ms),
        }
    }

    pub fn driver_name(&self, vehicle_id: &str) -> &str {
        self.drivers
            .get(vehicle_id)
            .map(String::as_str)
            .unwrap_or("Unknown Driver")
    }
}
