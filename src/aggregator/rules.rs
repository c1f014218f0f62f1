// Anomaly derivation rules. Each rule is a pure predicate over one snapshot;
// rules are independent, so one snapshot can raise several anomalies in the same tick.

use crate::models::{
    AnomalyEntry, AnomalyKind, EtaStatus, Severity, VehicleSnapshot, VehicleStatus, anomaly_id,
};

/// Overload above this percentage is CRITICAL, at or below it WARNING.
pub const OVERLOAD_CRITICAL_PCT: f64 = 10.0;
/// Speed above which heavy rain raises an accident-risk anomaly.
pub const ACCIDENT_RISK_SPEED_KMPH: f64 = 60.0;

const HEAVY_RAIN: &str = "HEAVY_RAIN";
const SUSPECTED_DAMAGE: &str = "SUSPECTED_DAMAGE";
const OVERLOAD_FINE_NOTE: &str = "Fine risk: ~₹8,000 (MV Act Sec 194).";

/// Tunable rule thresholds ([rules] in config).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleThresholds {
    pub overload_critical_pct: f64,
    pub accident_risk_speed_kmph: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            overload_critical_pct: OVERLOAD_CRITICAL_PCT,
            accident_risk_speed_kmph: ACCIDENT_RISK_SPEED_KMPH,
        }
    }
}

struct Finding {
    severity: Severity,
    detail: String,
    action: &'static str,
}

struct Rule {
    kind: AnomalyKind,
    check: fn(&VehicleSnapshot, &RuleThresholds) -> Option<Finding>,
}

/// Evaluation order; also the order entries appear in within one vehicle's tick output.
const RULES: [Rule; 7] = [
    Rule {
        kind: AnomalyKind::HighEmissionAlert,
        check: high_emission,
    },
    Rule {
        kind: AnomalyKind::RouteDeviationAlert,
        check: route_deviation,
    },
    Rule {
        kind: AnomalyKind::TemperatureBreach,
        check: temperature_breach,
    },
    Rule {
        kind: AnomalyKind::OverloadViolation,
        check: overload,
    },
    Rule {
        kind: AnomalyKind::EtaCriticalDelay,
        check: eta_delay,
    },
    Rule {
        kind: AnomalyKind::CargoDamageSuspected,
        check: cargo_damage,
    },
    Rule {
        kind: AnomalyKind::AccidentRisk,
        check: accident_risk,
    },
];

/// Runs every rule against one snapshot.
pub fn evaluate(snapshot: &VehicleSnapshot, thresholds: &RuleThresholds) -> Vec<AnomalyEntry> {
    RULES
        .iter()
        .filter_map(|rule| {
            (rule.check)(snapshot, thresholds).map(|f| AnomalyEntry {
                id: anomaly_id(&snapshot.vehicle_id, rule.kind, snapshot.timestamp),
                timestamp: snapshot.timestamp,
                vehicle_id: snapshot.vehicle_id.clone(),
                kind: rule.kind,
                severity: f.severity,
                detail: f.detail,
                action_required: f.action.to_string(),
            })
        })
        .collect()
}

fn high_emission(v: &VehicleSnapshot, _: &RuleThresholds) -> Option<Finding> {
    (v.status == VehicleStatus::HighEmissionAlert).then(|| Finding {
        severity: Severity::Warning,
        detail: format!(
            "CO₂: {:.2} kg | Fuel: {:.2} L",
            v.co2_kg, v.fuel_consumed_liters
        ),
        action: "Review route efficiency and driver behavior.",
    })
}

fn route_deviation(v: &VehicleSnapshot, _: &RuleThresholds) -> Option<Finding> {
    if !v.is_deviating() {
        return None;
    }
    let status = v.deviation_status.as_deref().unwrap_or_default();
    Some(Finding {
        severity: Severity::Warning,
        detail: deviation_detail(status),
        action: "Contact driver to verify detour reason.",
    })
}

/// "DEVIATED|12 km off NH48|stopped 40 min" -> "12 km off NH48 | stopped 40 min".
/// A status without reasons is reported as-is.
fn deviation_detail(status: &str) -> String {
    let reasons: Vec<&str> = status.split('|').skip(1).collect();
    if reasons.is_empty() {
        status.to_string()
    } else {
        reasons.join(" | ")
    }
}

fn temperature_breach(v: &VehicleSnapshot, _: &RuleThresholds) -> Option<Finding> {
    if v.ext.temperature_breach != Some(true) {
        return None;
    }
    let temp = v.ext.temperature_c?;
    Some(Finding {
        severity: Severity::Critical,
        detail: format!(
            "Cargo temp {}°C outside SLA band. Risk: product spoilage / rejection.",
            temp
        ),
        action: "Notify driver to check refrigeration unit. Alert consignee.",
    })
}

fn overload(v: &VehicleSnapshot, t: &RuleThresholds) -> Option<Finding> {
    let pct = v.ext.overload_pct.filter(|p| *p > 0.0)?;
    let severity = if pct > t.overload_critical_pct {
        Severity::Critical
    } else {
        Severity::Warning
    };
    let detail = match (v.ext.load_weight_kg, v.ext.container_size_ft) {
        (Some(load), Some(size)) => {
            format!(
                "Load {}kg exceeds {}ft capacity by {:.1}%. {}",
                load, size, pct, OVERLOAD_FINE_NOTE
            )
        }
        _ => format!(
            "Load exceeds rated capacity by {:.1}%. {}",
            pct, OVERLOAD_FINE_NOTE
        ),
    };
    Some(Finding {
        severity,
        detail,
        action: "Halt at next weighbridge. Redistribute or offload cargo.",
    })
}

fn eta_delay(v: &VehicleSnapshot, _: &RuleThresholds) -> Option<Finding> {
    if v.ext.eta_status != Some(EtaStatus::Delayed) {
        return None;
    }
    let detail = match v.ext.eta_hours {
        Some(h) => format!("Shipment ETA delayed by {:.1} hrs past promised delivery.", h),
        None => "Shipment ETA is past promised delivery.".to_string(),
    };
    Some(Finding {
        severity: Severity::Critical,
        detail,
        action: "Notify Consignee. Escalate to Logistics Manager.",
    })
}

fn cargo_damage(v: &VehicleSnapshot, _: &RuleThresholds) -> Option<Finding> {
    (v.ext.cargo_condition.as_deref() == Some(SUSPECTED_DAMAGE)).then(|| Finding {
        severity: Severity::Warning,
        detail: "Sensor telemetry suggests cargo shift or damage.".to_string(),
        action: "Instruct driver to inspect cargo hold safely.",
    })
}

fn accident_risk(v: &VehicleSnapshot, t: &RuleThresholds) -> Option<Finding> {
    let raining = v.ext.weather_severity.as_deref() == Some(HEAVY_RAIN);
    (raining && v.speed_kmph > t.accident_risk_speed_kmph).then(|| Finding {
        severity: Severity::Critical,
        detail: format!("High speed ({} km/h) in HEAVY_RAIN conditions.", v.speed_kmph),
        action: "Issue immediate slow-down automated call to driver.",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deviation_detail_joins_reasons() {
        assert_eq!(
            deviation_detail("DEVIATED|12 km off NH48|stopped 40 min"),
            "12 km off NH48 | stopped 40 min"
        );
    }

    #[test]
    fn deviation_detail_without_reasons_keeps_status() {
        assert_eq!(deviation_detail("DEVIATED"), "DEVIATED");
    }

    #[test]
    fn rule_table_covers_every_kind_once() {
        let kinds: std::collections::HashSet<AnomalyKind> = RULES.iter().map(|r| r.kind).collect();
        assert_eq!(kinds.len(), RULES.len());
    }
}
