//! NATS-backed `EventBus` (X2): publishes the stable `{source, detail_type,
//! time, data}` envelope (§6) to `bus.position.updated` and `bus.arrival`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::observation::{BusArrival, BusPosition};
use public_transport::event_bus::{EventBus, EventBusError, EventBusResult};
use serde::{Deserialize, Serialize};

const SOURCE: &str = "bus-simulator";

pub const POSITION_SUBJECT: &str = "bus.position.updated";
pub const ARRIVAL_SUBJECT: &str = "bus.arrival";

#[derive(Debug, Serialize)]
struct Envelope<'a, T> {
    source: &'static str,
    detail_type: &'static str,
    time: DateTime<Utc>,
    data: &'a T,
}

/// Decodes an envelope published by `NatsEventBus`. Used by subscribers (the
/// People-Count feeder's arrival drain) rather than by the bus itself, which
/// only ever publishes.
#[derive(Debug, Deserialize)]
pub struct IncomingEnvelope<T> {
    pub source: String,
    pub detail_type: String,
    pub time: DateTime<Utc>,
    pub data: T,
}

pub struct NatsEventBus {
    client: async_nats::Client,
}

impl NatsEventBus {
    pub async fn connect(url: &str) -> Result<Self, async_nats::ConnectError> {
        let client = async_nats::connect(url).await?;
        Ok(Self { client })
    }

    async fn publish<T: Serialize>(
        &self,
        subject: &'static str,
        detail_type: &'static str,
        time: DateTime<Utc>,
        data: &T,
    ) -> EventBusResult<()> {
        let envelope = Envelope {
            source: SOURCE,
            detail_type,
            time,
            data,
        };
        let payload = serde_json::to_vec(&envelope)
            .map_err(|why| EventBusError::Unavailable(Box::new(why)))?;
        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|why| EventBusError::Unavailable(Box::new(why)))
    }

    /// Subscribes to the `bus.arrival` subject. Subscription isn't part of
    /// the `EventBus` trait (X2, §6, only defines the two publish calls) —
    /// this is bespoke plumbing for the arrival-drain coupling (§9 Open
    /// Question), used directly by the People-Count feeder's bootstrap.
    pub async fn subscribe_arrivals(
        &self,
    ) -> Result<async_nats::Subscriber, async_nats::SubscribeError> {
        self.client.subscribe(ARRIVAL_SUBJECT).await
    }
}

#[async_trait]
impl EventBus for NatsEventBus {
    async fn publish_position_update(&self, position: BusPosition) -> EventBusResult<()> {
        let time = position.time;
        self.publish(POSITION_SUBJECT, POSITION_SUBJECT, time, &position)
            .await
    }

    async fn publish_arrival(&self, arrival: BusArrival) -> EventBusResult<()> {
        let time = arrival.time;
        self.publish(ARRIVAL_SUBJECT, ARRIVAL_SUBJECT, time, &arrival)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use model::bus::Direction;

    #[test]
    fn envelope_serializes_stable_wire_shape() {
        let position = BusPosition {
            bus_id: "B1".to_owned(),
            line_id: "L1".to_owned(),
            time: Utc.with_ymd_and_hms(2026, 7, 26, 8, 0, 0).unwrap(),
            latitude: 40.0,
            longitude: -3.0,
            passenger_count: 5,
            next_stop_id: Some("S2".to_owned()),
            distance_to_next_stop_m: 120.0,
            speed: 30.0,
            direction: Direction::Outbound,
            at_stop: false,
        };
        let envelope = Envelope {
            source: SOURCE,
            detail_type: "bus.position.updated",
            time: position.time,
            data: &position,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["source"], "bus-simulator");
        assert_eq!(json["detail_type"], "bus.position.updated");
        assert_eq!(json["data"]["busId"], "B1");
    }
}
