//! Scene consistency verification engine for a distributed world simulation.
//!
//! Provides log scanning for embedded scene dumps and flagged error lines,
//! reconstruction of the dumped scene forest, lockstep forest diffing with
//! positional or uuid-keyed matching, and verification reporting.

pub mod diff;
pub mod report;
pub mod scan;
pub mod scene;
