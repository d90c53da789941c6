//! Entry point for the Sensor-Data feeder process (§4.5): one `SensorReading`
//! per stop and per bus, each tick.

use std::sync::Arc;
use std::time::Duration;

use database::{DatabaseConnectionInfo, PgTimeSeriesStore};
use public_transport::feeder;
use rand::rngs::StdRng;
use rand::SeedableRng;
use simulator::sensor_data::SensorDataFeeder;

#[tokio::main]
async fn main() {
    simulator::init_logging();

    let config = simulator::load_config();
    let bus_ids: Vec<String> = config.buses.iter().map(|bus| bus.bus_id.clone()).collect();
    let catalog = simulator::build_catalog(&config);

    let database_connection_info =
        DatabaseConnectionInfo::from_env().expect("missing DATABASE_* environment variables");
    let store = Arc::new(
        PgTimeSeriesStore::connect(database_connection_info)
            .await
            .expect("could not connect to store"),
    );

    let feeder = SensorDataFeeder::new(
        catalog,
        store,
        bus_ids,
        Duration::from_secs(30),
        StdRng::from_entropy(),
    );

    let shutdown = simulator::shutdown_on_ctrl_c();
    feeder::run(feeder, shutdown).await;
}
