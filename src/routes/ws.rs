// WebSocket stream of published fleet states

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::FleetState;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements ws_fleet connection count on drop (connect = +1, drop = -1).
struct WsFleetGuard(Arc<AtomicUsize>);

impl Drop for WsFleetGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub(super) async fn ws_fleet(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let rx = state.fleet.subscribe();
    let conn_count = state.ws_fleet_connections.clone();
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_fleet(socket, rx, conn_count).await {
            tracing::info!("Fleet stream error: {}", e);
        }
    })
}

/// Returns false when the client is gone or too slow to take the message.
async fn send_within_timeout(socket: &mut WebSocket, message: Message) -> bool {
    matches!(timeout(WS_SEND_TIMEOUT, socket.send(message)).await, Ok(Ok(())))
}

/// Sends the current state on connect, then every newly published state. History is
/// left out of the push; clients fetch it from `/api/vehicles/{id}`.
async fn stream_fleet(
    mut socket: WebSocket,
    mut rx: watch::Receiver<Arc<FleetState>>,
    conn_count: Arc<AtomicUsize>,
) -> anyhow::Result<()> {
    conn_count.fetch_add(1, Ordering::Relaxed);
    let _guard = WsFleetGuard(conn_count);
    tracing::info!("Client connected to fleet stream");

    let initial = rx.borrow_and_update().clone();
    let json = serde_json::to_string(&initial.summary())?;
    if !send_within_timeout(&mut socket, Message::Text(json.into())).await {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ping_interval.reset();
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    // Worker stopped; nothing more will be published.
                    break;
                }
                let latest = rx.borrow_and_update().clone();
                let json = serde_json::to_string(&latest.summary())?;
                if !send_within_timeout(&mut socket, Message::Text(json.into())).await {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if !send_within_timeout(&mut socket, Message::Ping(Bytes::new())).await {
                    break;
                }
            }
        }
    }
    Ok(())
}
