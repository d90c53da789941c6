use std::error;
use std::fmt;

use async_trait::async_trait;
use model::observation::{BusArrival, BusPosition};

#[derive(Debug)]
pub enum EventBusError {
    Unavailable(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for EventBusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventBusError::Unavailable(why) => write!(f, "event bus unavailable: {why}"),
        }
    }
}

impl error::Error for EventBusError {}

pub type EventBusResult<T> = Result<T, EventBusError>;

/// Best-effort pub/sub side channel (X2, §6): publish failures after retry
/// exhaustion are a soft failure, never rolled back against the store.
/// `BusPosition`/`BusArrival` already carry every field the wire payload
/// needs (§6), so they double as the event bodies.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish_position_update(&self, position: BusPosition) -> EventBusResult<()>;
    async fn publish_arrival(&self, arrival: BusArrival) -> EventBusResult<()>;
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone)]
    pub enum PublishedEvent {
        Position(BusPosition),
        Arrival(BusArrival),
    }

    /// Records every published event in order, for assertions in tests.
    #[derive(Default)]
    pub struct MemoryEventBus {
        events: Mutex<Vec<PublishedEvent>>,
    }

    impl MemoryEventBus {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn events(&self) -> Vec<PublishedEvent> {
            self.events.lock().await.clone()
        }
    }

    #[async_trait]
    impl EventBus for MemoryEventBus {
        async fn publish_position_update(&self, position: BusPosition) -> EventBusResult<()> {
            self.events
                .lock()
                .await
                .push(PublishedEvent::Position(position));
            Ok(())
        }

        async fn publish_arrival(&self, arrival: BusArrival) -> EventBusResult<()> {
            self.events
                .lock()
                .await
                .push(PublishedEvent::Arrival(arrival));
            Ok(())
        }
    }
}
