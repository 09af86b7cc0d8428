/// Days after today that are still considered actionable.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Subjects more similar than this are treated as the same event.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// City of the synthetic per-run summary record; never matches a real city.
pub const SUMMARY_CITY: &str = "nowhere";

pub const DEFAULT_TIME_ZONE: &str = "Europe/Berlin";

/// Operations between two rate-limit pauses.
pub const DEFAULT_BATCH_SIZE: usize = 580;

pub const DEFAULT_MAX_ROUNDS: usize = 3;

pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

pub const DEFAULT_SNAPSHOT_RETENTION: usize = 14;

/// Assumed duration of a timed event without an end time.
pub const DEFAULT_EVENT_DURATION_MINUTES: i64 = 60;
