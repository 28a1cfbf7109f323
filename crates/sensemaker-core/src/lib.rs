//! # Sensemaker Core
//!
//! Pure, I/O-free logic for Sensemaker: the survey data model, tag
//! resolution, response aggregation, inline citations, view pointers,
//! filter state, and the record-store abstraction.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! native-only dependencies. Every function here is a pure transformation
//! of its inputs, so callers may recompute on every keystroke without
//! coordination.

pub mod aggregate;
pub mod citation;
pub mod filter;
pub mod models;
pub mod pointer;
pub mod snapshot;
pub mod store;
pub mod tags;
pub mod tally;
