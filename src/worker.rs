// Poll worker: one task owns the aggregator, polls the telemetry source on a fixed
// interval, applies operator commands, and publishes an immutable state after each change.
// Ticks and commands share one select loop, so state is never touched concurrently.

use crate::aggregator::{FleetAggregator, TickOutcome};
use crate::models::FleetState;
use crate::telemetry::{TelemetryError, TelemetrySource};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Duration, interval, timeout};
use tracing::{Instrument, debug, info, warn};

/// Operator commands, serialised with poll ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatorCommand {
    Resolve(String),
    Select(Option<String>),
    SetChatOpen(bool),
}

/// Source, aggregator, channels, and shutdown for the worker.
pub struct WorkerDeps {
    pub source: Arc<dyn TelemetrySource>,
    pub aggregator: FleetAggregator,
    pub state_tx: watch::Sender<Arc<FleetState>>,
    pub commands_rx: mpsc::Receiver<AggregatorCommand>,
    pub ws_fleet_connections: Arc<AtomicUsize>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// Worker timing config. Zero periods and capacities are raised to 1.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval_ms: u64,
    /// Bound on one fetch; a timed-out fetch counts as a failed poll.
    pub request_timeout_ms: u64,
    /// How often to log fleet stats (real seconds).
    pub stats_log_interval_secs: u64,
    pub command_capacity: usize,
}

/// Read side and command side of a running aggregator. Cheap to clone.
#[derive(Clone)]
pub struct FleetHandle {
    commands: mpsc::Sender<AggregatorCommand>,
    state: watch::Receiver<Arc<FleetState>>,
}

impl FleetHandle {
    pub fn new(
        commands: mpsc::Sender<AggregatorCommand>,
        state: watch::Receiver<Arc<FleetState>>,
    ) -> Self {
        Self { commands, state }
    }

    /// Latest published state.
    pub fn state(&self) -> Arc<FleetState> {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every newly published state.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FleetState>> {
        self.state.clone()
    }

    pub async fn resolve(&self, anomaly_id: impl Into<String>) -> anyhow::Result<()> {
        self.send(AggregatorCommand::Resolve(anomaly_id.into()))
            .await
    }

    pub async fn select(&self, vehicle_id: Option<String>) -> anyhow::Result<()> {
        self.send(AggregatorCommand::Select(vehicle_id)).await
    }

    pub async fn set_chat_open(&self, open: bool) -> anyhow::Result<()> {
        self.send(AggregatorCommand::SetChatOpen(open)).await
    }

    async fn send(&self, command: AggregatorCommand) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("fleet worker has stopped"))
    }
}

/// A running poll worker. Dropping it without `stop` also ends the loop (the shutdown
/// sender is dropped), but does not wait for it.
pub struct Poller {
    handle: FleetHandle,
    shutdown_tx: oneshot::Sender<()>,
    join: tokio::task::JoinHandle<()>,
}

impl Poller {
    pub fn handle(&self) -> FleetHandle {
        self.handle.clone()
    }

    /// Cancels the timer and waits for the worker to exit. A fetch still in flight is
    /// dropped and its result discarded.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.join.await {
            warn!(error = %e, "fleet worker task failed");
        }
    }
}

/// Builds the channels, spawns the worker, and polls once immediately.
pub fn start_polling(
    source: Arc<dyn TelemetrySource>,
    aggregator: FleetAggregator,
    ws_fleet_connections: Arc<AtomicUsize>,
    config: WorkerConfig,
) -> Poller {
    let (state_tx, state_rx) = watch::channel(Arc::new(aggregator.state().clone()));
    let (commands_tx, commands_rx) = mpsc::channel(config.command_capacity.max(1));
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = spawn(
        WorkerDeps {
            source,
            aggregator,
            state_tx,
            commands_rx,
            ws_fleet_connections,
            shutdown_rx,
        },
        config,
    );
    Poller {
        handle: FleetHandle::new(commands_tx, state_rx),
        shutdown_tx,
        join,
    }
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        source,
        mut aggregator,
        state_tx,
        mut commands_rx,
        ws_fleet_connections,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        poll_interval_ms,
        request_timeout_ms,
        stats_log_interval_secs,
        command_capacity: _,
    } = config;

    // `interval` panics on a zero period.
    let poll_interval_ms = poll_interval_ms.max(1);
    let request_timeout_ms = request_timeout_ms.max(1);
    let fetch_timeout = Duration::from_millis(request_timeout_ms);
    let stats_log_interval = Duration::from_secs(stats_log_interval_secs.max(1));
    let worker_span = tracing::span!(tracing::Level::DEBUG, "fleet_worker", poll_interval_ms);

    tokio::spawn(
        async move {
            // First tick completes immediately: one poll at start, then one per interval.
            let mut tick = interval(Duration::from_millis(poll_interval_ms));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut stats_log_tick = interval(stats_log_interval);
            stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            stats_log_tick.reset();

            let mut polls_failed_total: u64 = 0;

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let fetched = tokio::select! {
                            r = timeout(fetch_timeout, source.fetch_snapshots()) => r,
                            _ = &mut shutdown_rx => {
                                debug!("Worker shutting down; in-flight poll discarded");
                                break;
                            }
                        };
                        let feed = match fetched {
                            Ok(Ok(feed)) => feed,
                            Ok(Err(e)) => {
                                polls_failed_total += 1;
                                warn!(
                                    error = %e,
                                    operation = "fetch_snapshots",
                                    "telemetry fetch failed; keeping last known state"
                                );
                                continue;
                            }
                            Err(_) => {
                                polls_failed_total += 1;
                                warn!(
                                    error = %TelemetryError::Timeout(request_timeout_ms),
                                    operation = "fetch_snapshots",
                                    "telemetry fetch failed; keeping last known state"
                                );
                                continue;
                            }
                        };
                        match aggregator.apply_feed(feed, now_ms()) {
                            TickOutcome::Empty => {
                                debug!(
                                    operation = "apply_feed",
                                    "telemetry returned no vehicles; keeping last known state"
                                );
                            }
                            TickOutcome::Applied { vehicles, new_anomalies } => {
                                debug!(
                                    operation = "apply_feed",
                                    vehicles,
                                    new_anomalies,
                                    tick = aggregator.state().tick,
                                    "tick applied"
                                );
                                publish(&state_tx, &aggregator);
                            }
                        }
                    }
                    Some(command) = commands_rx.recv() => {
                        if apply_command(&mut aggregator, command) {
                            publish(&state_tx, &aggregator);
                        }
                    }
                    _ = &mut shutdown_rx => {
                        debug!("Worker shutting down");
                        break;
                    }
                    _ = stats_log_tick.tick() => {
                        let state = aggregator.state();
                        info!(
                            ws_fleet_clients = ws_fleet_connections.load(Ordering::Relaxed),
                            vehicles = state.vehicles.len(),
                            active_anomalies = state.anomalies.len(),
                            resolved_anomalies = state.resolved_anomalies.len(),
                            staleness_ms = ?state.staleness_ms(now_ms()),
                            polls_failed_total,
                            "fleet stats"
                        );
                    }
                }
            }
        }
        .instrument(worker_span),
    )
}

/// Applies one command; returns whether the state changed.
fn apply_command(aggregator: &mut FleetAggregator, command: AggregatorCommand) -> bool {
    match command {
        AggregatorCommand::Resolve(id) => {
            let moved = aggregator.resolve(&id);
            if !moved {
                debug!(anomaly_id = %id, "resolve ignored; anomaly not active");
            }
            moved
        }
        AggregatorCommand::Select(vehicle_id) => {
            aggregator.select(vehicle_id);
            true
        }
        AggregatorCommand::SetChatOpen(open) => {
            aggregator.set_chat_open(open);
            true
        }
    }
}

fn publish(state_tx: &watch::Sender<Arc<FleetState>>, aggregator: &FleetAggregator) {
    state_tx.send_replace(Arc::new(aggregator.state().clone()));
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            warn!(
                error = %e,
                operation = "get_timestamp",
                "system time error"
            );
            0
        })
}
