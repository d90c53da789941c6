//! Bus-Position feeder (§4.5): the concurrency and correctness hotspot —
//! advances every bus, detects stops crossed this tick, runs alight/board
//! (with terminal reversal truncating the remainder of the tick's motion),
//! and writes/publishes the result.
//!
//! `waiting_at_stop` isn't this feeder's to own (§3, §5: `StopCountState`
//! belongs to the People-Count feeder, in its own process) — it's read back
//! via `queryLatest` against the `people_count` table (X1), the same
//! cross-feeder-read pattern the Sensor-Data feeder uses for bus state. The
//! boarding this computes is reported to the People-Count feeder
//! asynchronously through the published `BusArrival` event, consumed by
//! `public_transport::arrival_drain::ArrivalDrainActor` before that feeder's
//! next tick.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::bus::BusState;
use model::observation::{BusArrival, BusPosition, PeopleCount, Table};
use model::route::Route;
use public_transport::event_bus::EventBus;
use public_transport::feeder::{
    publish_arrival_with_retry, publish_position_with_retry, write_batch_with_retry, Continuation,
    Feeder,
};
use public_transport::route_catalog::RouteCatalog;
use public_transport::store::{Row, TimeSeriesStore};
use rand::Rng;
use simcore::{geometry, passengers};

pub struct BusPositionFeeder<S, E, R> {
    catalog: RouteCatalog,
    store: Arc<S>,
    event_bus: Arc<E>,
    buses: Vec<BusState>,
    interval: Duration,
    rng: R,
}

impl<S, E, R> BusPositionFeeder<S, E, R>
where
    S: TimeSeriesStore + 'static,
    E: EventBus + 'static,
    R: Rng + Send + 'static,
{
    pub fn new(
        catalog: RouteCatalog,
        store: Arc<S>,
        event_bus: Arc<E>,
        buses: Vec<BusState>,
        interval: Duration,
        rng: R,
    ) -> Self {
        Self {
            catalog,
            store,
            event_bus,
            buses,
            interval,
            rng,
        }
    }
}

async fn current_waiting_count<S: TimeSeriesStore>(store: &S, stop_id: &str) -> u32 {
    let dims = HashMap::from([("stop_id".to_owned(), stop_id.to_owned())]);
    match store.query_latest(Table::PeopleCount, &dims).await {
        Ok(Some(row)) => match serde_json::from_value::<PeopleCount>(row.payload) {
            Ok(count) => count.count,
            Err(why) => {
                log::error!("bus-position: stop {stop_id}: malformed stored people count: {why}");
                0
            }
        },
        Ok(None) => 0,
        Err(why) => {
            log::error!("bus-position: stop {stop_id}: failed to query waiting count: {why}");
            0
        }
    }
}

/// Advances one bus by this tick's motion, runs alight/board at every stop
/// crossed (§4.5 step 1), and returns the resulting position observation
/// plus the arrivals produced, in the order the stops were passed.
async fn process_bus<S: TimeSeriesStore>(
    bus: &mut BusState,
    route: &Route,
    delta_seconds: f64,
    store: &S,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> (BusPosition, Vec<BusArrival>) {
    let distance_m = bus.speed * 1000.0 / 3600.0 * delta_seconds;
    let old_p = bus.position_on_route;
    let mut new_p = geometry::advance(route, old_p, distance_m, bus.direction);
    let passed = geometry::stops_between(route, old_p, new_p, bus.direction);

    let mut arrivals = Vec::with_capacity(passed.len());
    let mut reached_a_stop = false;

    for stop in passed {
        let waiting_at_stop = current_waiting_count(store, &stop.stop_id).await;

        let alighting = passengers::alighting(bus.passenger_count, stop.is_terminal, rng);
        bus.passenger_count -= alighting;
        let boarding = passengers::boarding(waiting_at_stop, bus.available_capacity());
        bus.passenger_count += boarding;

        arrivals.push(BusArrival {
            bus_id: bus.bus_id.clone(),
            line_id: bus.line_id.clone(),
            stop_id: stop.stop_id.clone(),
            time: now,
            passengers_boarding: boarding,
            passengers_alighting: alighting,
            bus_passenger_count_after: bus.passenger_count,
            stop_people_count_after: waiting_at_stop.saturating_sub(boarding),
        });

        reached_a_stop = true;

        if stop.is_terminal {
            // Terminal reversal (§4.5 step 1.d): toggle direction, reset
            // position, and truncate the rest of this tick's motion — any
            // further stop in `passed` (a second terminal, say) is not
            // processed this tick.
            bus.direction = bus.direction.toggle();
            new_p = 0.0;
            break;
        }
    }

    bus.position_on_route = new_p;
    bus.at_stop = reached_a_stop;

    let (latitude, longitude) = geometry::coordinates(route, new_p, bus.direction);
    let next = geometry::next_stop(route, new_p, bus.direction);
    let (next_stop_id, distance_to_next_stop_m) = match next {
        Some(stop) => {
            let distance =
                geometry::distance_to_stop(route, new_p, &stop.stop_id, bus.direction).unwrap_or(0.0);
            (Some(stop.stop_id.clone()), distance)
        }
        None => (None, 0.0),
    };

    let position = BusPosition {
        bus_id: bus.bus_id.clone(),
        line_id: bus.line_id.clone(),
        time: now,
        latitude,
        longitude,
        passenger_count: bus.passenger_count,
        next_stop_id,
        distance_to_next_stop_m,
        speed: bus.speed,
        direction: bus.direction,
        at_stop: bus.at_stop,
    };

    (position, arrivals)
}

#[async_trait]
impl<S, E, R> Feeder for BusPositionFeeder<S, E, R>
where
    S: TimeSeriesStore + 'static,
    E: EventBus + 'static,
    R: Rng + Send + 'static,
{
    type Error = Infallible;

    fn name(&self) -> &'static str {
        "bus-position"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&mut self) -> Result<Continuation, Self::Error> {
        let now = Utc::now();
        let delta_seconds = self.interval.as_secs_f64();

        let mut rows = Vec::new();
        let mut per_bus_events: Vec<(BusPosition, Vec<BusArrival>)> = Vec::new();

        for bus in &mut self.buses {
            let route = match self.catalog.route(&bus.line_id) {
                Some(route) => route,
                None => {
                    log::error!(
                        "bus-position: bus {} references unknown line {}, skipping",
                        bus.bus_id,
                        bus.line_id
                    );
                    continue;
                }
            };

            let (position, arrivals) =
                process_bus(bus, route, delta_seconds, self.store.as_ref(), &mut self.rng, now).await;

            if let Err(why) = position.validate() {
                log::error!("bus-position: invalid position for bus {}: {why}", bus.bus_id);
                continue;
            }

            rows.push(Row {
                table: Table::BusPosition,
                time: now,
                dimensions: HashMap::from([("bus_id".to_owned(), bus.bus_id.clone())]),
                payload: serde_json::to_value(&position).expect("BusPosition always serializes to JSON"),
            });
            per_bus_events.push((position, arrivals));
        }

        if let Err(why) = write_batch_with_retry(self.store.as_ref(), rows).await {
            log::error!("bus-position: store write failed after retries, dropping tick's batch: {why}");
        }

        for (position, arrivals) in per_bus_events {
            for arrival in arrivals {
                if let Err(why) = publish_arrival_with_retry(self.event_bus.as_ref(), arrival).await {
                    log::warn!("bus-position: arrival publish failed after retries: {why}");
                }
            }
            if let Err(why) = publish_position_with_retry(self.event_bus.as_ref(), position).await {
                log::warn!("bus-position: position publish failed after retries: {why}");
            }
        }

        Ok(Continuation::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::bus::Direction;
    use model::stop::Stop;
    use public_transport::event_bus::testing::{MemoryEventBus, PublishedEvent};
    use public_transport::store::testing::MemoryStore;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn two_terminal_route() -> Route {
        Route::new(
            "L1".to_owned(),
            "Line 1".to_owned(),
            vec![
                Stop {
                    stop_id: "A".to_owned(),
                    name: "A".to_owned(),
                    latitude: 40.00,
                    longitude: -3.00,
                    is_terminal: true,
                    base_arrival_rate: 1.0,
                },
                Stop {
                    stop_id: "B".to_owned(),
                    name: "B".to_owned(),
                    latitude: 40.10,
                    longitude: -3.10,
                    is_terminal: true,
                    base_arrival_rate: 1.0,
                },
            ],
        )
    }

    fn three_stop_route() -> Route {
        Route::new(
            "L1".to_owned(),
            "Line 1".to_owned(),
            vec![
                Stop {
                    stop_id: "A".to_owned(),
                    name: "A".to_owned(),
                    latitude: 40.00,
                    longitude: -3.00,
                    is_terminal: true,
                    base_arrival_rate: 1.0,
                },
                Stop {
                    stop_id: "MID".to_owned(),
                    name: "Middle".to_owned(),
                    latitude: 40.05,
                    longitude: -3.05,
                    is_terminal: false,
                    base_arrival_rate: 1.0,
                },
                Stop {
                    stop_id: "B".to_owned(),
                    name: "B".to_owned(),
                    latitude: 40.10,
                    longitude: -3.10,
                    is_terminal: true,
                    base_arrival_rate: 1.0,
                },
            ],
        )
    }

    // S1: single tick, not enough movement to reach any stop.
    #[tokio::test]
    async fn single_tick_no_stop_reached_keeps_passenger_count() {
        let route = two_terminal_route();
        let catalog = RouteCatalog::new(vec![route]);
        let store = Arc::new(MemoryStore::new());
        let event_bus = Arc::new(MemoryEventBus::new());
        let mut bus = BusState::new("BUS1".to_owned(), "L1".to_owned(), 40, 0.15);
        bus.passenger_count = 25;
        bus.speed = 30.0;
        let rng = ChaCha8Rng::seed_from_u64(1);
        let mut feeder = BusPositionFeeder::new(
            catalog,
            store.clone(),
            event_bus.clone(),
            vec![bus],
            Duration::from_secs(30),
            rng,
        );

        feeder.tick().await.unwrap();

        assert_eq!(store.all().await.len(), 1);
        assert!(event_bus
            .events()
            .await
            .iter()
            .all(|event| matches!(event, PublishedEvent::Position(_))));
        let position: BusPosition =
            serde_json::from_value(store.all().await[0].payload.clone()).unwrap();
        assert_eq!(position.passenger_count, 25);
        assert!(position.next_stop_id.is_some());
    }

    // S2: bus crosses a non-terminal stop mid-route.
    #[tokio::test]
    async fn crossing_a_non_terminal_stop_produces_one_arrival() {
        let route = three_stop_route();
        let total = route.total_distance();
        let seg0 = route.segment_distances()[0];
        let p_start = (seg0 * 0.96) / total;

        let catalog = RouteCatalog::new(vec![route]);
        let store = Arc::new(MemoryStore::new());
        store
            .write(vec![Row {
                table: Table::PeopleCount,
                time: Utc::now(),
                dimensions: HashMap::from([("stop_id".to_owned(), "MID".to_owned())]),
                payload: serde_json::json!({"stopId": "MID", "time": Utc::now(), "count": 5, "lineIds": ["L1"]}),
            }])
            .await
            .unwrap();
        let event_bus = Arc::new(MemoryEventBus::new());

        let mut bus = BusState::new("BUS1".to_owned(), "L1".to_owned(), 40, p_start);
        bus.passenger_count = 25;
        bus.speed = 300.0; // fast enough to cross the segment within one tick
        let rng = ChaCha8Rng::seed_from_u64(2);
        let mut feeder = BusPositionFeeder::new(
            catalog,
            store.clone(),
            event_bus.clone(),
            vec![bus],
            Duration::from_secs(30),
            rng,
        );

        feeder.tick().await.unwrap();

        let events = event_bus.events().await;
        let arrivals: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                PublishedEvent::Arrival(arrival) => Some(arrival),
                _ => None,
            })
            .collect();
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].stop_id, "MID");
        assert!(arrivals[0].passengers_alighting >= 5 && arrivals[0].passengers_alighting <= 10);
        assert!(arrivals[0].passengers_boarding <= 5);
    }

    // S3: bus reaches a terminal — full alight, direction toggles, position resets.
    #[tokio::test]
    async fn reaching_a_terminal_toggles_direction_and_fully_drains() {
        let route = two_terminal_route();
        let catalog = RouteCatalog::new(vec![route]);
        let store = Arc::new(MemoryStore::new());
        let event_bus = Arc::new(MemoryEventBus::new());

        let mut bus = BusState::new("BUS1".to_owned(), "L1".to_owned(), 40, 0.95);
        bus.passenger_count = 25;
        bus.speed = 3000.0;
        bus.direction = Direction::Outbound;
        let rng = ChaCha8Rng::seed_from_u64(3);
        let mut feeder = BusPositionFeeder::new(
            catalog,
            store.clone(),
            event_bus.clone(),
            vec![bus],
            Duration::from_secs(30),
            rng,
        );

        feeder.tick().await.unwrap();

        let events = event_bus.events().await;
        let arrivals: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                PublishedEvent::Arrival(arrival) => Some(arrival),
                _ => None,
            })
            .collect();
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].stop_id, "B");
        assert_eq!(arrivals[0].passengers_alighting, 25);

        let position: BusPosition =
            serde_json::from_value(store.all().await[0].payload.clone()).unwrap();
        assert_eq!(position.direction, Direction::Inbound);
        assert_eq!(position.passenger_count, arrivals[0].bus_passenger_count_after);
    }
}
