//! Sensor-Data feeder (§4.5): one `SensorReading` per stop and per bus, each
//! tick. Bus readings need the bus's current `passenger_count` and whether
//! it's `at_stop` (§4.5: "require the current BusState") — this feeder does
//! not own that state (the Bus-Position feeder does, in its own process), so
//! it reads both back via `queryLatest` against the `bus_position` table
//! (X1, §4.6). `at_stop` is read straight off the stored `BusPosition` row
//! rather than re-derived from `distance_to_next_stop_m`: after a tick that
//! crosses a stop, `next_stop_id` already points past it, so the distance
//! column alone can't tell a just-arrived bus from one mid-segment. A bus
//! with no recorded position yet is treated as empty and not at a stop, the
//! same "log and continue" posture §4.5/§7 prescribe for a per-bus
//! generation problem.

use std::collections::HashMap;
use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Timelike, Utc};
use model::observation::{BusPosition, DoorStatus, SensorEntity, SensorReading as SensorObservation, Table};
use public_transport::feeder::{write_batch_with_retry, Continuation, Feeder};
use public_transport::route_catalog::RouteCatalog;
use public_transport::store::{Row, TimeSeriesStore};
use rand::Rng;

pub struct SensorDataFeeder<S, R> {
    catalog: RouteCatalog,
    store: Arc<S>,
    bus_ids: Vec<String>,
    interval: Duration,
    rng: R,
}

impl<S, R> SensorDataFeeder<S, R>
where
    S: TimeSeriesStore + 'static,
    R: Rng + Send + 'static,
{
    pub fn new(
        catalog: RouteCatalog,
        store: Arc<S>,
        bus_ids: Vec<String>,
        interval: Duration,
        rng: R,
    ) -> Self {
        Self {
            catalog,
            store,
            bus_ids,
            interval,
            rng,
        }
    }

    async fn current_bus_state(&self, bus_id: &str) -> (u32, bool) {
        let dims = HashMap::from([("bus_id".to_owned(), bus_id.to_owned())]);
        match self.store.query_latest(Table::BusPosition, &dims).await {
            Ok(Some(row)) => match serde_json::from_value::<BusPosition>(row.payload) {
                Ok(position) => (position.passenger_count, position.at_stop),
                Err(why) => {
                    log::error!("sensor-data: bus {bus_id}: malformed stored position: {why}");
                    (0, false)
                }
            },
            Ok(None) => (0, false),
            Err(why) => {
                log::error!("sensor-data: bus {bus_id}: failed to query latest position: {why}");
                (0, false)
            }
        }
    }
}

#[async_trait]
impl<S, R> Feeder for SensorDataFeeder<S, R>
where
    S: TimeSeriesStore + 'static,
    R: Rng + Send + 'static,
{
    type Error = Infallible;

    fn name(&self) -> &'static str {
        "sensor-data"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&mut self) -> Result<Continuation, Self::Error> {
        let now = Utc::now();
        let hour_with_minutes = now.hour() as f64 + now.minute() as f64 / 60.0;
        let mut rows = Vec::new();

        let mut seen_stops = HashSet::new();
        for route in self.catalog.routes() {
            for stop in &route.stops {
                if !seen_stops.insert(stop.stop_id.clone()) {
                    continue;
                }
                let reading = simcore::sensors::stop_reading(hour_with_minutes, &mut self.rng);
                let observation = SensorObservation {
                    entity_id: stop.stop_id.clone(),
                    time: now,
                    temperature_c: reading.temperature_c,
                    humidity_percent: reading.humidity_pct,
                    entity: SensorEntity::Stop,
                };
                if let Err(why) = observation.validate() {
                    log::error!("sensor-data: invalid stop reading for {}: {why}", stop.stop_id);
                    continue;
                }
                rows.push(Row {
                    table: Table::SensorData,
                    time: now,
                    dimensions: HashMap::from([
                        ("entity_id".to_owned(), stop.stop_id.clone()),
                        ("entity_type".to_owned(), "stop".to_owned()),
                    ]),
                    payload: serde_json::to_value(&observation)
                        .expect("SensorReading always serializes to JSON"),
                });
            }
        }

        for bus_id in self.bus_ids.clone() {
            let (passenger_count, at_stop) = self.current_bus_state(&bus_id).await;
            let reading =
                simcore::sensors::bus_reading(hour_with_minutes, passenger_count, at_stop, &mut self.rng);
            let observation = SensorObservation {
                entity_id: bus_id.clone(),
                time: now,
                temperature_c: reading.temperature_c,
                humidity_percent: reading.humidity_pct,
                entity: SensorEntity::Bus {
                    co2_ppm: reading.co2_ppm.expect("bus_reading always sets co2_ppm"),
                    door_status: DoorStatus::from(at_stop),
                },
            };
            if let Err(why) = observation.validate() {
                log::error!("sensor-data: invalid bus reading for {bus_id}: {why}");
                continue;
            }
            rows.push(Row {
                table: Table::SensorData,
                time: now,
                dimensions: HashMap::from([
                    ("entity_id".to_owned(), bus_id.clone()),
                    ("entity_type".to_owned(), "bus".to_owned()),
                ]),
                payload: serde_json::to_value(&observation)
                    .expect("SensorReading always serializes to JSON"),
            });
        }

        if let Err(why) = write_batch_with_retry(self.store.as_ref(), rows).await {
            log::error!("sensor-data: store write failed after retries, dropping tick's batch: {why}");
        }

        Ok(Continuation::Continue)
    }
}
