//! # Sensemaker
//!
//! A survey-exploration engine for labor-union bargaining surveys.
//!
//! Sensemaker reads survey rows, free-text comments, tags, questions, and
//! analyst insights from an Airtable-style record store, normalizes them
//! into one typed snapshot, and serves the dashboard views: per-question
//! rating heatmaps, sentiment themes over comments, priorities and stipend
//! tallies, and insights whose inline `[[text|id]]` citations resolve back
//! to live comments. View pointers save the filters behind a view so an
//! insight can link straight back to it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌──────────────────────┐
//! │ RecordStore  │──▶│  Ingest  │──▶│  Snapshot (core)     │
//! │ REST / file  │   │ + issues │   │ filter · aggregate   │
//! └──────▲───────┘   └──────────┘   │ citations · pointers │
//!        │                          └──────────┬───────────┘
//!        │  tag edits, insight saves           ▼
//!        └──────────────────────────────  ┌──────────┐
//!                                         │   CLI    │
//!                                         │ (sense)  │
//!                                         └──────────┘
//! ```
//!
//! The pure logic lives in `sensemaker-core`; this crate adds the store
//! backends, configuration, ingestion, persistence of edits, and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`store`] | Store selection from config |
//! | [`store_rest`] | Airtable-compatible REST backend |
//! | [`store_file`] | JSON-file backend |
//! | [`ingest`] | Record normalization and ingest issues |
//! | [`snapshot`] | Concurrent table fetch |
//! | [`annotate`] | Tag edits with rollback |
//! | [`insight`] | Insight saves and citations |
//! | [`report`] | Terminal rendering |
//! | [`commands`] | CLI command implementations |
//! | [`progress`] | Fetch progress on stderr |
//! | [`logging`] | Tracing subscriber setup |

pub mod annotate;
pub mod commands;
pub mod config;
pub mod ingest;
pub mod insight;
pub mod logging;
pub mod progress;
pub mod report;
pub mod snapshot;
pub mod store;
pub mod store_file;
pub mod store_rest;
