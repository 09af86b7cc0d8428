//! Pushing the reconciled event set into the calendar.

mod driver;

pub use driver::{SyncDriver, SyncFailure, SyncPolicy, SyncReport, SyncStats};
