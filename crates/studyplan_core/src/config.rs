//! Runtime configuration with an environment overlay.
//!
//! All settings have defaults; `STUDYPLAN_*` variables override them. The
//! overlay reads through a lookup function so tests never touch the real
//! process environment.

use crate::integrity::DeletePolicy;
use crate::logging::{default_log_level, normalize_level};
use crate::service::planner::PlannerOptions;
use crate::timer::{minutes_to_secs, TimerSettings};
use crate::views::filters::DEFAULT_UPCOMING_LIMIT;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_DATA_DIR: &str = "STUDYPLAN_DATA_DIR";
pub const ENV_LOG_LEVEL: &str = "STUDYPLAN_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STUDYPLAN_LOG_DIR";
pub const ENV_DELETE_POLICY: &str = "STUDYPLAN_DELETE_POLICY";
pub const ENV_UPCOMING_LIMIT: &str = "STUDYPLAN_UPCOMING_LIMIT";
pub const ENV_WORK_MINUTES: &str = "STUDYPLAN_WORK_MINUTES";
pub const ENV_BREAK_MINUTES: &str = "STUDYPLAN_BREAK_MINUTES";
pub const ENV_LONG_BREAK_MINUTES: &str = "STUDYPLAN_LONG_BREAK_MINUTES";
pub const ENV_LONG_BREAK_EVERY: &str = "STUDYPLAN_LONG_BREAK_EVERY";

const DEFAULT_DATA_DIR: &str = "./studyplan-data";
const DATABASE_FILE_NAME: &str = "planner.sqlite3";

/// Invalid value for one configuration variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub variable: &'static str,
    pub value: String,
    pub reason: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid {} `{}`: {}",
            self.variable, self.value, self.reason
        )
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    pub data_dir: PathBuf,
    pub log_level: &'static str,
    /// `None` means `<data_dir>/logs`.
    pub log_dir: Option<PathBuf>,
    pub delete_policy: DeletePolicy,
    pub upcoming_limit: usize,
    pub timer: TimerSettings,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_level: default_log_level(),
            log_dir: None,
            delete_policy: DeletePolicy::default(),
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
            timer: TimerSettings::default(),
        }
    }
}

impl PlannerConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns per variable.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            config.log_level = normalize_level(&level).map_err(|err| ConfigError {
                variable: ENV_LOG_LEVEL,
                value: level.clone(),
                reason: err.to_string(),
            })?;
        }
        if let Some(dir) = get(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(policy) = get(ENV_DELETE_POLICY) {
            config.delete_policy = parse_var(ENV_DELETE_POLICY, &policy)?;
        }
        if let Some(limit) = get(ENV_UPCOMING_LIMIT) {
            config.upcoming_limit = positive(ENV_UPCOMING_LIMIT, &limit)?;
        }

        let minutes = |name: &'static str, default_secs: u64| -> Result<u64, ConfigError> {
            match get(name) {
                Some(value) => {
                    let minutes = positive::<u64>(name, &value)?;
                    minutes_to_secs(minutes).ok_or_else(|| ConfigError {
                        variable: name,
                        value: value.clone(),
                        reason: "too many minutes".to_string(),
                    })
                }
                None => Ok(default_secs),
            }
        };
        let defaults = TimerSettings::default();
        config.timer = TimerSettings {
            work_secs: minutes(ENV_WORK_MINUTES, defaults.work_secs)?,
            short_break_secs: minutes(ENV_BREAK_MINUTES, defaults.short_break_secs)?,
            long_break_secs: minutes(ENV_LONG_BREAK_MINUTES, defaults.long_break_secs)?,
            long_break_every: match get(ENV_LONG_BREAK_EVERY) {
                Some(value) => positive(ENV_LONG_BREAK_EVERY, &value)?,
                None => defaults.long_break_every,
            },
        };

        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("logs"))
    }

    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            delete_policy: self.delete_policy,
            upcoming_limit: self.upcoming_limit,
        }
    }
}

fn parse_var<T>(variable: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|err: T::Err| ConfigError {
        variable,
        value: value.to_string(),
        reason: err.to_string(),
    })
}

fn positive<T>(variable: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialOrd,
    T::Err: Display,
{
    let parsed: T = parse_var(variable, value)?;
    if parsed <= T::default() {
        return Err(ConfigError {
            variable,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}
