use std::sync::Arc;

use crate::event_bus::EventBus;
use crate::route_catalog::RouteCatalog;
use crate::store::TimeSeriesStore;

/// Everything a feeder needs to do its job: the shared, read-only route
/// catalog plus handles to the two external systems (X1, X2). Mirrors the
/// teacher's `Client<D>` — a thin, cheaply-cloneable bundle handed to every
/// worker rather than each worker wiring up its own dependencies.
#[derive(Clone)]
pub struct SimClient<S, E>
where
    S: TimeSeriesStore + 'static,
    E: EventBus + 'static,
{
    pub catalog: RouteCatalog,
    pub store: Arc<S>,
    pub event_bus: Arc<E>,
}

impl<S, E> SimClient<S, E>
where
    S: TimeSeriesStore + 'static,
    E: EventBus + 'static,
{
    pub fn new(catalog: RouteCatalog, store: Arc<S>, event_bus: Arc<E>) -> Self {
        Self {
            catalog,
            store,
            event_bus,
        }
    }
}
