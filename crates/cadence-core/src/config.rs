use anyhow::Result;
use chrono::TimeDelta;
use config::{Config, ConfigBuilder, builder::DefaultState};
use serde::Deserialize;

use crate::calendar::Exclusion;
use crate::error::{CoreError, CoreResult};

pub const DEFAULT_HORIZON_DAYS: u32 = 730;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub recurrence: RecurrenceConfig,
    pub logging: LoggingConfig,
}

/// Knobs that drive expansion and generation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecurrenceConfig {
    /// How far past `event_start` an unbounded rule is expanded.
    pub default_horizon_days: u32,
    /// When false, two generators of one event never produce the same span.
    pub allow_clashing_occurrences: bool,
    /// Calendar dates skipped when a rule is expanded from frequency and
    /// params. Good Friday and Christmas Day unless configured otherwise.
    #[serde(default = "default_exclusions")]
    pub exclusions: Vec<Exclusion>,
}

fn default_exclusions() -> Vec<Exclusion> {
    vec![Exclusion::good_friday(), Exclusion::christmas_day()]
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            default_horizon_days: DEFAULT_HORIZON_DAYS,
            allow_clashing_occurrences: false,
            exclusions: default_exclusions(),
        }
    }
}

impl RecurrenceConfig {
    #[must_use]
    pub fn default_horizon(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.default_horizon_days))
    }

    /// Replaces the excluded calendar dates.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: impl IntoIterator<Item = Exclusion>) -> Self {
        self.exclusions = exclusions.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_clashing_occurrences(mut self, allow: bool) -> Self {
        self.allow_clashing_occurrences = allow;
        self
    }

    /// ## Summary
    /// Checks that the configuration can bound expansion.
    ///
    /// ## Errors
    /// Returns `InvalidConfiguration` for a zero horizon.
    pub fn validate(&self) -> CoreResult<()> {
        if self.default_horizon_days == 0 {
            return Err(CoreError::InvalidConfiguration(
                "recurrence.default_horizon_days must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and `cadence.toml`.
    /// Environment variables (prefixed `CADENCE__`) take precedence over the file.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::with_name("cadence.toml").required(false))
            .add_source(
                config::Environment::with_prefix("CADENCE")
                    .prefix_separator("__")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Self>()?;
        settings.recurrence.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Builds settings from an in-memory TOML document layered over the defaults.
    ///
    /// ## Errors
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Self>()?;
        settings.recurrence.validate()?;
        Ok(settings)
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default(
                "recurrence.default_horizon_days",
                i64::from(DEFAULT_HORIZON_DAYS),
            )?
            .set_default("recurrence.allow_clashing_occurrences", false)?
            .set_default("logging.level", "info")?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
