//! Core types and pipeline for eventsync.
//!
//! This crate provides everything between the scrapers and the calendar:
//! - `normalize` turns raw scraper rows into typed `EventRecord`s
//! - `dedup`, `filter` and `diff` make up the reconciliation pipeline
//! - `remote` and `sync` drive the calendar provider

pub mod calendar_event;
pub mod config;
pub mod constants;
pub mod dedup;
pub mod diff;
pub mod error;
pub mod event;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod remote;
pub mod snapshot;
pub mod summary;
pub mod sync;

pub use event::*;
