// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::{ScriptedSource, feed, high_emission, vehicle};
use fleetwatch::aggregator::FleetAggregator;
use fleetwatch::config::AppConfig;
use fleetwatch::models::{EtaEntry, EtaStatus, FleetFeed, FleetState};
use fleetwatch::routes;
use fleetwatch::worker::{AggregatorCommand, FleetHandle};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{mpsc, watch};

const TEST_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[telemetry]
base_url = "http://localhost:3000"

[monitoring]
stats_log_interval_secs = 60

[drivers]
"TRK-DL-004" = "Dinesh Verma"
"#;

struct Harness {
    state_tx: watch::Sender<Arc<FleetState>>,
    commands_rx: mpsc::Receiver<AggregatorCommand>,
    source: Arc<ScriptedSource>,
}

fn seeded_state() -> FleetState {
    let mut agg = FleetAggregator::default();
    agg.apply_feed(feed(vec![vehicle("TRK-DL-004", 1.0)]), 1);
    agg.apply_feed(
        FleetFeed {
            vehicles: vec![high_emission("TRK-DL-004", 2.0, 10.74), vehicle("TRK-CH-001", 2.0)],
            eta_vehicles: Some(vec![EtaEntry {
                vehicle_id: "TRK-CH-001".into(),
                eta_hours: 4.5,
                eta_status: EtaStatus::AtRisk,
                remaining_km: 210.0,
                order_id: "ORD-3321".into(),
                customer: "Apollo Pharma".into(),
                destination: "Chennai Port".into(),
                avg_speed_kmph: 46.0,
                cargo_type: "Pharma".into(),
                route_id: "chennai_bangalore".into(),
                progress: 0.4,
                promised_eta: "2026-02-26T18:00:00".into(),
            }]),
        },
        2,
    );
    agg.state().clone()
}

fn test_app_with(source: ScriptedSource) -> (axum::Router, Harness) {
    let config = AppConfig::load_from_str(TEST_CONFIG).unwrap();
    let (state_tx, state_rx) = watch::channel(Arc::new(seeded_state()));
    let (commands_tx, commands_rx) = mpsc::channel(8);
    let source = Arc::new(source);
    let app = routes::app(
        FleetHandle::new(commands_tx, state_rx),
        source.clone(),
        Arc::new(AtomicUsize::new(0)),
        config,
    );
    (
        app,
        Harness {
            state_tx,
            commands_rx,
            source,
        },
    )
}

fn test_app() -> (axum::Router, Harness) {
    test_app_with(ScriptedSource::new(vec![]))
}

#[tokio::test]
async fn test_root_endpoint() {
    let (app, _h) = test_app();
    let server = TestServer::new(app).unwrap();
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("fleetwatch: fleet telemetry aggregator");
}

#[tokio::test]
async fn test_version_endpoint() {
    let (app, _h) = test_app();
    let server = TestServer::new(app).unwrap();
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("fleetwatch")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_state_endpoint() {
    let (app, _h) = test_app();
    let server = TestServer::new(app).unwrap();
    let json: serde_json::Value = server.get("/api/state").await.json();
    assert_eq!(json["tick"], 2);
    assert_eq!(json["vehicles"].as_array().unwrap().len(), 2);
    assert_eq!(json["stats"]["alertCount"], 1);
    assert_eq!(json["history"]["TRK-DL-004"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_vehicles_endpoint() {
    let (app, _h) = test_app();
    let server = TestServer::new(app).unwrap();
    let json: serde_json::Value = server.get("/api/vehicles").await.json();
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["vehicle_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["TRK-DL-004", "TRK-CH-001"]);
}

#[tokio::test]
async fn test_vehicle_detail_includes_driver_history_and_anomalies() {
    let (app, _h) = test_app();
    let server = TestServer::new(app).unwrap();
    let response = server.get("/api/vehicles/TRK-DL-004").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["vehicleId"], "TRK-DL-004");
    assert_eq!(json["driverName"], "Dinesh Verma");
    assert_eq!(json["current"]["status"], "HIGH_EMISSION_ALERT");
    assert_eq!(json["history"].as_array().unwrap().len(), 2);
    assert_eq!(json["anomalies"][0]["type"], "HIGH_EMISSION_ALERT");

    let json: serde_json::Value = server.get("/api/vehicles/TRK-CH-001").await.json();
    assert_eq!(json["driverName"], "Unknown Driver");
}

#[tokio::test]
async fn test_vehicle_detail_unknown_is_404() {
    let (app, _h) = test_app();
    let server = TestServer::new(app).unwrap();
    let response = server.get("/api/vehicles/GHOST-ID").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let json: serde_json::Value = response.json();
    assert_eq!(json["vehicleId"], "GHOST-ID");
}

#[tokio::test]
async fn test_anomalies_endpoint() {
    let (app, _h) = test_app();
    let server = TestServer::new(app).unwrap();
    let json: serde_json::Value = server.get("/api/anomalies").await.json();
    assert_eq!(json["active"].as_array().unwrap().len(), 1);
    assert_eq!(json["active"][0]["vehicle_id"], "TRK-DL-004");
    assert!(json["resolved"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_eta_endpoint() {
    let (app, _h) = test_app();
    let server = TestServer::new(app).unwrap();
    let json: serde_json::Value = server.get("/api/eta").await.json();
    assert_eq!(json[0]["vehicle_id"], "TRK-CH-001");
    assert_eq!(json[0]["eta_status"], "AT_RISK");
}

#[tokio::test]
async fn test_command_endpoints_queue_commands() {
    let (app, mut h) = test_app();
    let server = TestServer::new(app).unwrap();

    server
        .post("/api/anomalies/TRK-DL-004-emission-2/resolve")
        .await
        .assert_status(StatusCode::ACCEPTED);
    server
        .put("/api/selection")
        .json(&serde_json::json!({ "vehicleId": "GHOST-ID" }))
        .await
        .assert_status(StatusCode::ACCEPTED);
    server
        .put("/api/selection")
        .json(&serde_json::json!({}))
        .await
        .assert_status(StatusCode::ACCEPTED);
    server
        .put("/api/chat")
        .json(&serde_json::json!({ "open": true }))
        .await
        .assert_status(StatusCode::ACCEPTED);

    assert_eq!(
        h.commands_rx.recv().await,
        Some(AggregatorCommand::Resolve("TRK-DL-004-emission-2".into()))
    );
    assert_eq!(
        h.commands_rx.recv().await,
        Some(AggregatorCommand::Select(Some("GHOST-ID".into())))
    );
    assert_eq!(
        h.commands_rx.recv().await,
        Some(AggregatorCommand::Select(None))
    );
    assert_eq!(
        h.commands_rx.recv().await,
        Some(AggregatorCommand::SetChatOpen(true))
    );
}

#[tokio::test]
async fn test_commands_after_worker_stopped_are_503() {
    let (app, h) = test_app();
    drop(h.commands_rx);
    let server = TestServer::new(app).unwrap();
    let response = server.post("/api/anomalies/x/resolve").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("stopped"));
}

#[tokio::test]
async fn test_spike_forwards_to_source() {
    let (app, h) = test_app();
    let server = TestServer::new(app).unwrap();

    let response = server
        .post("/api/spike")
        .json(&serde_json::json!({ "vehicleId": "TRK-DL-001" }))
        .await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["kind"], "emission_spike");

    server
        .post("/api/spike")
        .json(&serde_json::json!({ "vehicleId": "TRK-DL-002", "kind": "overload" }))
        .await
        .assert_status_ok();

    let events = h.source.synthetic_events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            ("TRK-DL-001".to_string(), "emission_spike".to_string()),
            ("TRK-DL-002".to_string(), "overload".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_spike_rejected_by_source_is_502() {
    let (app, _h) = test_app_with(ScriptedSource::rejecting_synthetic());
    let server = TestServer::new(app).unwrap();
    let response = server
        .post("/api/spike")
        .json(&serde_json::json!({ "vehicleId": "TRK-DL-001" }))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "error");
}

// --- WebSocket tests (require http_transport + ws feature) ---
// Receive until we get valid JSON (server may send Ping first).

async fn receive_first_json_text(ws: &mut axum_test::TestWebSocket) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(&text) {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for JSON"
        );
    }
}

#[tokio::test]
async fn test_ws_fleet_sends_current_then_published_state() {
    let (app, h) = test_app();
    let server = TestServer::builder().http_transport().build(app).unwrap();
    let mut ws = server
        .get_websocket("/ws/fleet")
        .await
        .into_websocket()
        .await;

    let initial = receive_first_json_text(&mut ws).await;
    assert_eq!(initial["tick"], 2);
    assert!(initial.get("history").is_none());
    assert_eq!(initial["anomalies"].as_array().unwrap().len(), 1);

    let mut next = seeded_state();
    next.tick = 3;
    next.selection.chat_open = true;
    let state_tx = h.state_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        state_tx.send_replace(Arc::new(next));
    });

    let received = receive_first_json_text(&mut ws).await;
    assert_eq!(received["tick"], 3);
    assert_eq!(received["selection"]["chatOpen"], true);
    assert!(received.get("history").is_none());
}
