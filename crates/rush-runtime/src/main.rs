//! # Puzzle-Rush Runtime
//!
//! Hosts the match engine in a single process.
//!
//! ## Wiring
//!
//! ```text
//! transport ──commands──→ RushEngineService ──MatchUpdate──→ EventBusNotifier
//!                               ↑                                  │
//!                    CompletionSweeper (tick)                      ↓
//!                                                           InMemoryEventBus
//!                                                                  │
//!                                                                  ↓
//!                                                   per-viewer subscribers, log drain
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry
//! 2. Load configuration from `RUSH_*` variables
//! 3. Wire adapters and seed the level pool
//! 4. Start the completion sweeper and the bus drain
//! 5. Run until Ctrl+C, then shut down gracefully

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::RuntimeConfig;
use rush_engine::adapters::{
    EventBusNotifier, InMemoryLevelStore, InMemoryMatchRepository, InMemoryRatingStore,
    OpenInvites, SokobanSolver, SystemClock,
};
use rush_engine::{CompletionSweeper, EloRatingUpdater, EnginePorts, RushEngineService};
use rush_telemetry::{init_telemetry, TelemetryConfig};
use shared_bus::{EventFilter, InMemoryEventBus, RushEvent};

/// Boards seeded into the level pool at startup.
const DEMO_LEVELS: [(&str, &str); 14] = [
    ("push-right", "4203"),
    ("long-push", "40203"),
    ("corridor", "1111\n4203\n1111"),
    ("open-field", "0000\n4203\n0000"),
    ("push-down", "4\n2\n0\n3"),
    ("short-drop", "40\n20\n30"),
    ("push-left", "3024"),
    ("push-up", "3\n0\n2\n4"),
    ("one-way", "4803"),
    ("elevator", "4\nJ\n3"),
    ("sliding-door", "4I03"),
    ("no-reverse", "4E03"),
    ("corner-block", "4C03"),
    ("fill-the-hole", "42523"),
];

/// The runtime hosting the engine and its background tasks.
struct RushRuntime {
    config: RuntimeConfig,
    engine: Arc<RushEngineService>,
    bus: Arc<InMemoryEventBus>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RushRuntime {
    /// Wire the in-process adapters and seed the level pool.
    fn new(config: RuntimeConfig) -> Result<Self> {
        info!("Creating Puzzle-Rush runtime");

        let levels = Arc::new(InMemoryLevelStore::new());
        for (id, data) in DEMO_LEVELS {
            levels
                .insert_data(id, data)
                .with_context(|| format!("Failed to parse demo level {id}"))?;
        }

        let bus = Arc::new(InMemoryEventBus::with_capacity(config.bus_capacity));
        let ports = EnginePorts {
            repository: Arc::new(InMemoryMatchRepository::new()),
            levels,
            solver: Arc::new(SokobanSolver),
            ratings: Arc::new(InMemoryRatingStore::new()),
            rating_updater: Arc::new(EloRatingUpdater),
            invites: Arc::new(OpenInvites),
            notifier: Arc::new(EventBusNotifier::new(Arc::clone(&bus))),
            clock: Arc::new(SystemClock),
        };
        let engine = Arc::new(RushEngineService::new(config.engine.clone(), ports));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            engine,
            bus,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Start the background tasks.
    fn start(&self) -> Vec<JoinHandle<()>> {
        info!("===========================================");
        info!("  Puzzle-Rush Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let sweeper = CompletionSweeper::new(Arc::clone(&self.engine), self.config.sweep_interval());
        let sweeper = tokio::spawn(sweeper.run(self.shutdown_rx.clone()));
        let drain = tokio::spawn(drain_bus(Arc::clone(&self.bus), self.shutdown_rx.clone()));

        info!(
            service = %self.config.telemetry.service_name,
            sweep_interval_ms = self.config.sweep_interval_ms,
            bus_capacity = self.bus.capacity(),
            countdown_ms = self.config.engine.start_countdown_ms,
            "Runtime started"
        );
        vec![sweeper, drain]
    }

    /// Signal shutdown and wait for the background tasks.
    async fn shutdown(&self, tasks: Vec<JoinHandle<()>>) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        for task in tasks {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Background task panicked"),
                Err(_) => error!("Background task did not stop in time"),
            }
        }

        info!("Shutdown complete");
    }
}

/// Log every bus event until shutdown.
async fn drain_bus(bus: Arc<InMemoryEventBus>, mut shutdown: watch::Receiver<bool>) {
    let mut subscription = bus.subscribe(EventFilter::all());
    loop {
        tokio::select! {
            event = subscription.recv() => match event {
                Some(RushEvent::MatchUpdated(update)) => {
                    let span = rush_telemetry::match_span!("deliver", match_id = %update.match_id);
                    let _entered = span.enter();
                    debug!(kind = ?update.kind, recipient = ?update.recipient, "Match update");
                }
                Some(RushEvent::EngineFault { match_id, reason }) => {
                    error!(match_id = %match_id, reason = %reason, "Engine fault");
                }
                None => return,
            },
            _ = shutdown.changed() => {
                info!(
                    lagged = subscription.lagged(),
                    undelivered = bus.undelivered(),
                    "Bus drain shutting down"
                );
                return;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(&TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env();
    let runtime = RushRuntime::new(config)?;
    let tasks = runtime.start();

    info!("Engine is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown(tasks).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rush_engine::domain::{Direction, Level, SolutionProof};
    use rush_engine::ports::outbound::Solver;
    use rush_engine::{CreateMatch, RushEngineApi};
    use shared_bus::EventPublisher;
    use shared_types::{LevelId, MatchType, PlayerId};

    #[test]
    fn test_demo_levels_are_solvable() {
        let solutions = [
            ("push-right", vec![Direction::Right; 2]),
            ("long-push", vec![Direction::Right; 3]),
            ("push-down", vec![Direction::Down; 2]),
            ("push-left", vec![Direction::Left; 2]),
            ("elevator", vec![Direction::Down]),
            ("fill-the-hole", vec![Direction::Right; 3]),
        ];
        for (id, moves) in solutions {
            let (_, data) = DEMO_LEVELS.iter().find(|(name, _)| *name == id).unwrap();
            let level = Level::parse(LevelId::from(id), data).unwrap();
            assert!(
                SokobanSolver.validate(&level, &SolutionProof::new(moves)),
                "{id} should be solvable"
            );
        }
    }

    #[tokio::test]
    async fn test_runtime_wiring() {
        let runtime = RushRuntime::new(RuntimeConfig::default()).unwrap();
        let tasks = runtime.start();

        let engine = Arc::clone(&runtime.engine);
        let view = engine
            .create_match(&PlayerId::from("alice"), CreateMatch::rated(MatchType::Classical))
            .await
            .unwrap();
        engine
            .join(&view.match_id, &PlayerId::from("bob"))
            .await
            .unwrap();
        assert!(runtime.bus.events_published() > 0);

        runtime.shutdown(tasks).await;
    }
}
