// Fleet stats: full aggregation over the current snapshot set

use crate::models::{EtaStatus, FleetStats, VehicleSnapshot, VehicleStatus};

pub fn derive_stats(vehicles: &[VehicleSnapshot]) -> FleetStats {
    let count_eta = |status: EtaStatus| {
        vehicles
            .iter()
            .filter(|v| v.ext.eta_status == Some(status))
            .count()
    };
    let avg_efficiency = if vehicles.is_empty() {
        0.0
    } else {
        vehicles.iter().map(VehicleSnapshot::efficiency).sum::<f64>() / vehicles.len() as f64
    };

    FleetStats {
        total_co2: vehicles.iter().map(|v| v.co2_kg).sum(),
        total_saved: vehicles.iter().map(|v| v.co2_saved_kg).sum(),
        total_fuel: vehicles.iter().map(|v| v.fuel_consumed_liters).sum(),
        alert_count: vehicles
            .iter()
            .filter(|v| v.status == VehicleStatus::HighEmissionAlert)
            .count(),
        deviation_count: vehicles.iter().filter(|v| v.is_deviating()).count(),
        avg_efficiency,
        vehicle_count: vehicles.len(),
        on_time_count: count_eta(EtaStatus::OnTime),
        delayed_count: count_eta(EtaStatus::Delayed),
        at_risk_count: count_eta(EtaStatus::AtRisk),
    }
}
