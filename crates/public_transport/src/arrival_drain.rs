//! Couples the Bus-Position and People-Count feeders (resolves the open
//! question in §9: stop counts must not grow unboundedly just because the
//! two feeders run as independent processes). An `ArrivalDrainActor`
//! subscribes to `BusArrival` events and drains the boarding count from the
//! shared `StopCountState` before the People-Count feeder's next tick.

use std::sync::Arc;

use actors::actor::Actor;
use actors::handler::{Handler, Message};
use async_trait::async_trait;
use model::bus::StopCountState;
use model::observation::BusArrival;
use tokio::sync::Mutex;

/// Wraps `BusArrival` for the mailbox: `Message` can't be implemented
/// directly on a type from another crate (orphan rules), and a local
/// wrapper also leaves room for this actor to handle other message kinds
/// later without touching the wire type.
#[derive(Debug, Clone)]
pub struct ArrivalOccurred(pub BusArrival);

impl Message for ArrivalOccurred {
    type Response = ();
}

pub struct ArrivalDrainActor {
    stop_counts: Arc<Mutex<StopCountState>>,
}

impl ArrivalDrainActor {
    pub fn new(stop_counts: Arc<Mutex<StopCountState>>) -> Self {
        Self { stop_counts }
    }
}

impl Actor for ArrivalDrainActor {}

#[async_trait]
impl Handler<ArrivalOccurred> for ArrivalDrainActor {
    async fn handle(&mut self, arrival: ArrivalOccurred) {
        let mut counts = self.stop_counts.lock().await;
        counts.drain(&arrival.0.stop_id, arrival.0.passengers_boarding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn arrival(stop_id: &str, boarding: u32) -> ArrivalOccurred {
        ArrivalOccurred(BusArrival {
            bus_id: "B1".to_owned(),
            line_id: "L1".to_owned(),
            stop_id: stop_id.to_owned(),
            time: Utc::now(),
            passengers_boarding: boarding,
            passengers_alighting: 0,
            bus_passenger_count_after: boarding,
            stop_people_count_after: 0,
        })
    }

    #[tokio::test]
    async fn drains_boarding_count_from_stop() {
        let stop_counts = Arc::new(Mutex::new(StopCountState::new()));
        stop_counts.lock().await.set("S1", 10);

        let actor_ref = actors::run({
            let stop_counts = stop_counts.clone();
            move || ArrivalDrainActor::new(stop_counts.clone())
        });
        actor_ref.tell(arrival("S1", 4)).await.unwrap();
        actor_ref.ask(arrival("S1", 0)).await.unwrap();

        assert_eq!(stop_counts.lock().await.get("S1"), 6);
    }

    #[tokio::test]
    async fn never_drains_below_zero() {
        let stop_counts = Arc::new(Mutex::new(StopCountState::new()));
        stop_counts.lock().await.set("S1", 2);

        let actor_ref = actors::run({
            let stop_counts = stop_counts.clone();
            move || ArrivalDrainActor::new(stop_counts.clone())
        });
        actor_ref.tell(arrival("S1", 10)).await.unwrap();
        actor_ref.ask(arrival("S1", 0)).await.unwrap();

        assert_eq!(stop_counts.lock().await.get("S1"), 0);
    }
}
