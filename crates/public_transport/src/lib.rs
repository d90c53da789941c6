//! The simulator's service layer: the external-system contracts (X1 store,
//! X2 event bus), the route catalog every feeder shares, and the generic
//! tick-loop runner feeders are built on (C5).

pub mod arrival_drain;
pub mod client;
pub mod event_bus;
pub mod feeder;
pub mod route_catalog;
pub mod store;
