use std::any::Any;
use std::fmt::Debug;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::time::{self, sleep};
use tokio_util::sync::CancellationToken;

use crate::event_bus::{EventBus, EventBusError, EventBusResult};
use crate::store::{Row, StoreError, StoreResult, TimeSeriesStore};

/// Default per-call timeout and retry budget for store writes and event
/// publishes within a tick (§4.5, §7: "retried with exponential backoff up
/// to max_retries").
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Outcome of one `Feeder::tick`, mirroring the teacher's `Collector`
/// continuation but without the database-backed restart path: a feeder
/// owns its state in-process for the life of the run, it is never
/// reloaded from persisted state between ticks.
#[derive(Clone, Copy, Debug)]
pub enum Continuation {
    Continue,
    Exit,
}

#[derive(Clone, Copy, Debug)]
pub enum SupervisionStrategy {
    Restart,
    Resume,
    Stop,
}

/// One of the three simulation workers (People-Count, Sensor-Data,
/// Bus-Position; C5, §4.5). `tick` does all of one cycle's work — gathering
/// state, writing observations, publishing events — and reports whether the
/// loop should keep going.
#[async_trait]
pub trait Feeder: Send + 'static {
    type Error: Debug + Send;

    fn name(&self) -> &'static str;

    /// Time between ticks (nominally 30-60s, §4.5).
    fn interval(&self) -> Duration {
        Duration::from_secs(30)
    }

    async fn tick(&mut self) -> Result<Continuation, Self::Error>;

    /// Backoff after a failed tick: `2^attempt` seconds by default (§4.5).
    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(2u64.saturating_pow(attempt))
    }

    fn on_error(&self, _error: &Self::Error) -> SupervisionStrategy {
        SupervisionStrategy::Resume
    }

    fn on_panic(&self, _error: &(dyn Any + Send)) -> SupervisionStrategy {
        SupervisionStrategy::Resume
    }
}

/// Runs `feeder` until it reports `Continuation::Exit`, `shutdown` fires, or
/// a supervision strategy says to stop. Panics inside `tick` are caught so
/// one bad cycle never takes the whole process down (grounded in the
/// teacher's `catch_unwind`-based collector loop).
pub async fn run<F: Feeder>(mut feeder: F, shutdown: CancellationToken) {
    let mut interval = time::interval(feeder.interval());
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                log::info!("{}: shutting down", feeder.name());
                return;
            }
            _ = interval.tick() => {}
        }

        let outcome = AssertUnwindSafe(feeder.tick()).catch_unwind().await;

        let strategy = match outcome {
            Ok(Ok(Continuation::Continue)) => {
                attempt = 0;
                continue;
            }
            Ok(Ok(Continuation::Exit)) => {
                log::info!("{}: exiting", feeder.name());
                return;
            }
            Ok(Err(why)) => {
                log::error!("{}: tick failed: {:?}", feeder.name(), why);
                feeder.on_error(&why)
            }
            Err(panic) => {
                log::error!("{}: tick panicked", feeder.name());
                feeder.on_panic(&*panic)
            }
        };

        match strategy {
            SupervisionStrategy::Resume => {
                attempt = 0;
            }
            SupervisionStrategy::Restart => {
                attempt += 1;
                sleep(feeder.backoff(attempt)).await;
            }
            SupervisionStrategy::Stop => {
                log::error!("{}: stopping after unrecoverable error", feeder.name());
                return;
            }
        }
    }
}

/// Retries `operation` with `2^k` second backoff for `k` in `0..max_attempts-1`,
/// up to `max_attempts` total tries (§4.6: "retries transient failures with
/// `2^k` second backoff for `k ∈ {0,1,…,max_retries−1}`"). Used around
/// individual store writes and event publishes within a tick (§4.5): the
/// tick as a whole never rolls back simulation state on exhaustion, it just
/// logs and moves on.
pub async fn retry_with_backoff<T, E, Fut>(
    max_attempts: u32,
    mut operation: impl FnMut() -> Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(why) => {
                if attempt + 1 >= max_attempts {
                    return Err(why);
                }
                sleep(Duration::from_secs(2u64.saturating_pow(attempt))).await;
                attempt += 1;
            }
        }
    }
}

/// Writes a tick's batch to the store, timing out and retrying transient
/// failures (§4.5): "Store write failures: retry with exponential backoff
/// ... if still failing, log and skip this tick's batch."
pub async fn write_batch_with_retry<S: TimeSeriesStore>(
    store: &S,
    rows: Vec<Row>,
) -> StoreResult<()> {
    retry_with_backoff(DEFAULT_MAX_RETRIES, || async {
        match time::timeout(DEFAULT_CALL_TIMEOUT, store.write(rows.clone())).await {
            Ok(result) => result,
            Err(elapsed) => Err(StoreError::Unavailable(Box::new(elapsed))),
        }
    })
    .await
}

/// Publishes a position update, timing out and retrying transient failures;
/// exhaustion is a soft failure the caller logs and moves past (§4.5, §7).
pub async fn publish_position_with_retry<E: EventBus>(
    event_bus: &E,
    position: model::observation::BusPosition,
) -> EventBusResult<()> {
    retry_with_backoff(DEFAULT_MAX_RETRIES, || async {
        match time::timeout(
            DEFAULT_CALL_TIMEOUT,
            event_bus.publish_position_update(position.clone()),
        )
        .await
        {
            Ok(result) => result,
            Err(elapsed) => Err(EventBusError::Unavailable(Box::new(elapsed))),
        }
    })
    .await
}

/// Publishes an arrival event, with the same timeout/retry/soft-failure
/// behavior as `publish_position_with_retry`.
pub async fn publish_arrival_with_retry<E: EventBus>(
    event_bus: &E,
    arrival: model::observation::BusArrival,
) -> EventBusResult<()> {
    retry_with_backoff(DEFAULT_MAX_RETRIES, || async {
        match time::timeout(
            DEFAULT_CALL_TIMEOUT,
            event_bus.publish_arrival(arrival.clone()),
        )
        .await
        {
            Ok(result) => result,
            Err(elapsed) => Err(EventBusError::Unavailable(Box::new(elapsed))),
        }
    })
    .await
}
