//! Entry point for the Bus-Position feeder process (§4.5): advances every
//! bus, writes its new position, and publishes position/arrival events.

use std::sync::Arc;
use std::time::Duration;

use database::{DatabaseConnectionInfo, PgTimeSeriesStore};
use eventbus::NatsEventBus;
use public_transport::feeder;
use rand::rngs::StdRng;
use rand::SeedableRng;
use simulator::bus_position::BusPositionFeeder;

#[tokio::main]
async fn main() {
    simulator::init_logging();

    let config = simulator::load_config();
    let buses = config.buses.clone();
    let catalog = simulator::build_catalog(&config);

    let database_connection_info =
        DatabaseConnectionInfo::from_env().expect("missing DATABASE_* environment variables");
    let store = Arc::new(
        PgTimeSeriesStore::connect(database_connection_info)
            .await
            .expect("could not connect to store"),
    );

    let event_bus = Arc::new(
        NatsEventBus::connect(&simulator::nats_url())
            .await
            .expect("could not connect to event bus"),
    );

    let feeder = BusPositionFeeder::new(
        catalog,
        store,
        event_bus,
        buses,
        Duration::from_secs(30),
        StdRng::from_entropy(),
    );

    let shutdown = simulator::shutdown_on_ctrl_c();
    feeder::run(feeder, shutdown).await;
}
