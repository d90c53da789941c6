//! Pure, synchronous simulation functions (C1–C4): route geometry, the daily
//! arrival pattern, passenger dynamics and sensor synthesis. No I/O, no async
//! — mirrors how the teacher keeps GTFS parsing free of database concerns.

pub mod daily_pattern;
pub mod geometry;
pub mod passengers;
pub mod sensors;
