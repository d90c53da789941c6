//! Shared bootstrap for the three feeder binaries (§6, §5 of the expanded
//! spec): logging, configuration loading, and shutdown-signal wiring. Each
//! binary in `src/bin` wires this together with its own `Feeder` impl and a
//! concrete `TimeSeriesStore`/`EventBus` pair.

use std::env;
use std::path::PathBuf;

use model::config::SimulationConfig;
use public_transport::route_catalog::RouteCatalog;
use tokio_util::sync::CancellationToken;

pub mod bus_position;
pub mod people_count;
pub mod sensor_data;

/// `RUST_LOG`-driven logging, matching every other binary in the workspace.
/// Idempotent so tests that spin up more than one feeder don't panic on a
/// second `env_logger::init()`.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Loads and validates the simulation configuration from `CONFIG_PATH`
/// (default `simulation.toml`), aborting the process on failure — a bad
/// configuration is a validation error (§7 kind 1), not something a feeder
/// can recover from at runtime.
pub fn load_config() -> SimulationConfig {
    let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "simulation.toml".to_owned());
    SimulationConfig::from_toml_file(&PathBuf::from(&path))
        .unwrap_or_else(|why| panic!("invalid simulation configuration at {path}:\n{why}"))
}

/// Builds the read-only route catalog shared by every task within this
/// feeder process (§5: "loaded at init and then read-only").
pub fn build_catalog(config: &SimulationConfig) -> RouteCatalog {
    RouteCatalog::new(config.routes.clone())
}

/// A token that cancels when the process receives SIGINT/ctrl-c. `feeder::run`
/// only checks it between ticks, so an in-flight tick always drains to
/// completion before the process exits (§5: "drains the current tick").
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("shutdown signal received, draining in-flight tick");
            child.cancel();
        }
    });
    token
}

/// Connection settings for the NATS event bus, read from the single
/// `NATS_URL` env var (default `nats://localhost:4222`), matching the
/// `DATABASE_*` env-var convention `database::DatabaseConnectionInfo` uses.
pub fn nats_url() -> String {
    env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_owned())
}
