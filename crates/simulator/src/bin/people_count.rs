//! Entry point for the People-Count feeder process (§4.5, §5): samples
//! waiting counts at every stop and drains boarding counts reported by the
//! Bus-Position feeder's `bus.arrival` events into the same `StopCountState`.

use std::sync::Arc;
use std::time::Duration;

use database::{DatabaseConnectionInfo, PgTimeSeriesStore};
use eventbus::{IncomingEnvelope, NatsEventBus};
use futures::StreamExt;
use model::bus::StopCountState;
use model::observation::BusArrival;
use public_transport::arrival_drain::{ArrivalDrainActor, ArrivalOccurred};
use public_transport::feeder;
use rand::rngs::StdRng;
use rand::SeedableRng;
use simulator::people_count::PeopleCountFeeder;
use tokio::sync::Mutex;

#[tokio::main]
async fn main() {
    simulator::init_logging();

    let config = simulator::load_config();
    let catalog = simulator::build_catalog(&config);

    let database_connection_info =
        DatabaseConnectionInfo::from_env().expect("missing DATABASE_* environment variables");
    let store = Arc::new(
        PgTimeSeriesStore::connect(database_connection_info)
            .await
            .expect("could not connect to store"),
    );

    let event_bus = NatsEventBus::connect(&simulator::nats_url())
        .await
        .expect("could not connect to event bus");

    let stop_counts = Arc::new(Mutex::new(StopCountState::new()));

    let arrival_actor = actors::run({
        let stop_counts = stop_counts.clone();
        move || ArrivalDrainActor::new(stop_counts.clone())
    });
    let mut arrivals = event_bus
        .subscribe_arrivals()
        .await
        .expect("could not subscribe to bus.arrival");
    tokio::spawn(async move {
        while let Some(message) = arrivals.next().await {
            match serde_json::from_slice::<IncomingEnvelope<BusArrival>>(&message.payload) {
                Ok(envelope) => {
                    if let Err(why) = arrival_actor.tell(ArrivalOccurred(envelope.data)).await {
                        log::error!("people-count: failed to forward arrival to drain actor: {why:?}");
                    }
                }
                Err(why) => log::error!("people-count: malformed arrival event: {why}"),
            }
        }
    });

    let feeder = PeopleCountFeeder::new(
        catalog,
        store,
        stop_counts,
        Duration::from_secs(30),
        StdRng::from_entropy(),
    );

    let shutdown = simulator::shutdown_on_ctrl_c();
    feeder::run(feeder, shutdown).await;
}
