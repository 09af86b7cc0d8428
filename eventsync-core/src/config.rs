//! Global eventsync configuration.
//!
//! Read from `~/.config/eventsync/config.toml`, with every key overridable
//! through `EVENTSYNC__SECTION__KEY` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_COOLDOWN_SECS, DEFAULT_MAX_ROUNDS, DEFAULT_SIMILARITY_THRESHOLD,
    DEFAULT_SNAPSHOT_RETENTION, DEFAULT_TIME_ZONE, DEFAULT_WINDOW_DAYS, SUMMARY_CITY,
};
use crate::diff::MatchMode;
use crate::error::{EventsyncError, EventsyncResult};
use crate::filter::FilterPolicy;
use crate::pipeline::PipelineSettings;
use crate::remote::Remote;
use crate::sync::SyncPolicy;

static DEFAULT_INPUT_DIR: &str = "~/eventsync/scraped";
static DEFAULT_DATA_DIR: &str = "~/eventsync/data";

fn default_input_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_DIR)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_time_zone() -> String {
    DEFAULT_TIME_ZONE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub window_days: i64,
    pub policy: FilterPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            window_days: DEFAULT_WINDOW_DAYS,
            policy: FilterPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub fuzzy_subjects: bool,
    pub similarity_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig {
            fuzzy_subjects: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub match_mode: MatchMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub max_rounds: usize,
    pub batch_size: usize,
    /// Humantime duration, e.g. "60s"
    pub cooldown: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_rounds: DEFAULT_MAX_ROUNDS,
            batch_size: DEFAULT_BATCH_SIZE,
            cooldown: format!("{DEFAULT_COOLDOWN_SECS}s"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub retention: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        SnapshotConfig {
            retention: DEFAULT_SNAPSHOT_RETENTION,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub city: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        SummaryConfig {
            city: SUMMARY_CITY.to_string(),
        }
    }
}

/// Configuration at ~/.config/eventsync/config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsyncConfig {
    /// Where scrapers drop their CSV/JSON files
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Snapshots and the run lock live here
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Target calendar; required by `run` and `purge`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<Remote>,

    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

impl EventsyncConfig {
    pub fn config_path() -> EventsyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| EventsyncError::Config("Could not determine config directory".into()))?
            .join("eventsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the global config, creating a commented default on first use.
    pub fn load() -> EventsyncResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> EventsyncResult<Self> {
        let config: EventsyncConfig = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("EVENTSYNC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| EventsyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| EventsyncError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> EventsyncResult<()> {
        self.tz()?;
        self.cooldown()?;

        if !(0.0..=1.0).contains(&self.dedup.similarity_threshold) {
            return Err(EventsyncError::Config(format!(
                "dedup.similarity_threshold must be between 0 and 1, got {}",
                self.dedup.similarity_threshold
            )));
        }
        if self.filter.window_days < 0 {
            return Err(EventsyncError::Config(
                "filter.window_days must not be negative".into(),
            ));
        }
        if self.sync.max_rounds == 0 || self.sync.batch_size == 0 {
            return Err(EventsyncError::Config(
                "sync.max_rounds and sync.batch_size must be at least 1".into(),
            ));
        }

        Ok(())
    }

    pub fn input_path(&self) -> PathBuf {
        expand(&self.input_dir)
    }

    pub fn data_path(&self) -> PathBuf {
        expand(&self.data_dir)
    }

    pub fn tz(&self) -> EventsyncResult<Tz> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|e| EventsyncError::Config(format!("Invalid time_zone: {e}")))
    }

    fn cooldown(&self) -> EventsyncResult<Duration> {
        humantime::parse_duration(&self.sync.cooldown).map_err(|e| {
            EventsyncError::Config(format!("Invalid sync.cooldown '{}': {e}", self.sync.cooldown))
        })
    }

    pub fn calendar(&self) -> EventsyncResult<&Remote> {
        self.calendar.as_ref().ok_or_else(|| {
            EventsyncError::Config(
                "No [calendar] section configured. Add provider and calendar_id to config.toml"
                    .into(),
            )
        })
    }

    pub fn pipeline_settings(&self, today: NaiveDate) -> PipelineSettings {
        PipelineSettings {
            today,
            window_days: self.filter.window_days,
            policy: self.filter.policy,
            fuzzy_subjects: self.dedup.fuzzy_subjects,
            similarity_threshold: self.dedup.similarity_threshold,
            match_mode: self.diff.match_mode,
            summary_city: self.summary.city.clone(),
        }
    }

    pub fn sync_policy(&self) -> EventsyncResult<SyncPolicy> {
        Ok(SyncPolicy {
            max_rounds: self.sync.max_rounds,
            batch_size: self.sync.batch_size,
            cooldown: self.cooldown()?,
        })
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> EventsyncResult<()> {
        let contents = format!(
            "\
# eventsync configuration

# Where the scrapers write their CSV/JSON files:
# input_dir = \"{DEFAULT_INPUT_DIR}\"

# Where snapshots of previous runs are kept:
# data_dir = \"{DEFAULT_DATA_DIR}\"

# time_zone = \"{DEFAULT_TIME_ZONE}\"

# Target calendar. Keys besides provider and calendar_id go to the provider.
# [calendar]
# provider = \"google\"
# calendar_id = \"primary\"
# google_account = \"me@example.com\"

# [filter]
# window_days = {DEFAULT_WINDOW_DAYS}
# policy = \"flagged\"        # or \"permissive\"

# [dedup]
# fuzzy_subjects = true
# similarity_threshold = {DEFAULT_SIMILARITY_THRESHOLD}

# [diff]
# match_mode = \"ranked\"     # or \"exact\"

# [sync]
# max_rounds = {DEFAULT_MAX_ROUNDS}
# batch_size = {DEFAULT_BATCH_SIZE}
# cooldown = \"{DEFAULT_COOLDOWN_SECS}s\"

# [snapshot]
# retention = {DEFAULT_SNAPSHOT_RETENTION}

# [summary]
# city = \"{SUMMARY_CITY}\"
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EventsyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| EventsyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
