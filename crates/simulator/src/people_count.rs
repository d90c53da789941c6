//! People-Count feeder (§4.5): samples a new waiting count at every stop
//! each tick. Boarding counts are not gathered locally — this feeder's
//! buses are the Bus-Position feeder's, running in a separate process, so
//! the coupling the open question in §9 asks for is resolved by draining
//! `bus.arrival` events into the shared `StopCountState` out-of-band, via
//! `public_transport::arrival_drain::ArrivalDrainActor`, *before* this tick
//! runs. `tick` itself only ever adds natural arrivals.

use std::collections::HashMap;
use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Timelike, Utc};
use model::bus::StopCountState;
use model::observation::{PeopleCount, Table};
use public_transport::feeder::{write_batch_with_retry, Continuation, Feeder};
use public_transport::route_catalog::RouteCatalog;
use public_transport::store::{Row, TimeSeriesStore};
use rand::Rng;
use simcore::passengers::generate_stop_count;
use tokio::sync::Mutex;

pub struct PeopleCountFeeder<S, R> {
    catalog: RouteCatalog,
    store: Arc<S>,
    stop_counts: Arc<Mutex<StopCountState>>,
    interval: Duration,
    rng: R,
}

impl<S, R> PeopleCountFeeder<S, R>
where
    S: TimeSeriesStore + 'static,
    R: Rng + Send + 'static,
{
    pub fn new(
        catalog: RouteCatalog,
        store: Arc<S>,
        stop_counts: Arc<Mutex<StopCountState>>,
        interval: Duration,
        rng: R,
    ) -> Self {
        Self {
            catalog,
            store,
            stop_counts,
            interval,
            rng,
        }
    }
}

#[async_trait]
impl<S, R> Feeder for PeopleCountFeeder<S, R>
where
    S: TimeSeriesStore + 'static,
    R: Rng + Send + 'static,
{
    type Error = Infallible;

    fn name(&self) -> &'static str {
        "people-count"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&mut self) -> Result<Continuation, Self::Error> {
        let now = Utc::now();
        let hour = now.hour();
        let interval_minutes = self.interval.as_secs_f64() / 60.0;

        let mut rows = Vec::new();
        let mut seen_stops = HashSet::new();
        let mut counts = self.stop_counts.lock().await;

        for route in self.catalog.routes() {
            for stop in &route.stops {
                if !seen_stops.insert(stop.stop_id.clone()) {
                    continue;
                }

                let prev_count = counts.get(&stop.stop_id);
                let new_count = match generate_stop_count(
                    prev_count,
                    hour,
                    stop.base_arrival_rate,
                    interval_minutes,
                    0,
                    &mut self.rng,
                ) {
                    Ok(count) => count,
                    Err(why) => {
                        log::error!("people-count: stop {}: {why}", stop.stop_id);
                        continue;
                    }
                };
                counts.set(&stop.stop_id, new_count);

                let line_ids = self.catalog.lines_serving(&stop.stop_id).to_vec();
                let observation = PeopleCount {
                    stop_id: stop.stop_id.clone(),
                    time: now,
                    count: new_count,
                    line_ids,
                };
                if let Err(why) = observation.validate() {
                    log::error!("people-count: invalid observation for {}: {why}", stop.stop_id);
                    continue;
                }

                let payload = serde_json::to_value(&observation)
                    .expect("PeopleCount always serializes to JSON");
                rows.push(Row {
                    table: Table::PeopleCount,
                    time: now,
                    dimensions: HashMap::from([("stop_id".to_owned(), stop.stop_id.clone())]),
                    payload,
                });
            }
        }
        drop(counts);

        if let Err(why) = write_batch_with_retry(self.store.as_ref(), rows).await {
            log::error!("people-count: store write failed after retries, dropping tick's batch: {why}");
        }

        Ok(Continuation::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::route::Route;
    use model::stop::Stop;
    use public_transport::store::testing::MemoryStore;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn route() -> Route {
        Route::new(
            "L1".to_owned(),
            "Line 1".to_owned(),
            vec![
                Stop {
                    stop_id: "A".to_owned(),
                    name: "A".to_owned(),
                    latitude: 40.0,
                    longitude: -3.0,
                    is_terminal: true,
                    base_arrival_rate: 2.0,
                },
                Stop {
                    stop_id: "B".to_owned(),
                    name: "B".to_owned(),
                    latitude: 40.1,
                    longitude: -3.1,
                    is_terminal: true,
                    base_arrival_rate: 2.0,
                },
            ],
        )
    }

    #[tokio::test]
    async fn tick_writes_one_row_per_stop() {
        let catalog = RouteCatalog::new(vec![route()]);
        let store = Arc::new(MemoryStore::new());
        let stop_counts = Arc::new(Mutex::new(StopCountState::new()));
        let rng = ChaCha8Rng::seed_from_u64(42);
        let mut feeder =
            PeopleCountFeeder::new(catalog, store.clone(), stop_counts, Duration::from_secs(30), rng);

        feeder.tick().await.unwrap();

        assert_eq!(store.all().await.len(), 2);
    }

    #[tokio::test]
    async fn tick_never_double_counts_a_stop_shared_by_two_lines() {
        let shared_a = Stop {
            stop_id: "A".to_owned(),
            name: "A".to_owned(),
            latitude: 40.0,
            longitude: -3.0,
            is_terminal: true,
            base_arrival_rate: 2.0,
        };
        let shared_b = Stop {
            stop_id: "B".to_owned(),
            name: "B".to_owned(),
            latitude: 40.1,
            longitude: -3.1,
            is_terminal: true,
            base_arrival_rate: 2.0,
        };
        let route_one = Route::new("L1".to_owned(), "Line 1".to_owned(), vec![shared_a.clone(), shared_b.clone()]);
        let route_two = Route::new("L2".to_owned(), "Line 2".to_owned(), vec![shared_a, shared_b]);
        let catalog = RouteCatalog::new(vec![route_one, route_two]);
        let store = Arc::new(MemoryStore::new());
        let stop_counts = Arc::new(Mutex::new(StopCountState::new()));
        let rng = ChaCha8Rng::seed_from_u64(7);
        let mut feeder =
            PeopleCountFeeder::new(catalog, store.clone(), stop_counts, Duration::from_secs(30), rng);

        feeder.tick().await.unwrap();

        assert_eq!(store.all().await.len(), 2);
    }
}
