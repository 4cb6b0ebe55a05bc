//! Engine configuration loaded from a JSON file.
//!
//! Lookup order: the path in `MOMENTUM_CONFIG`, then
//! `<config_dir>/momentum/config.json`. A missing file yields defaults; every
//! field is optional in the file.

mod timeouts;

pub use timeouts::TimeoutConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use momentum_domain::badge::BadgeDefinition;
use momentum_domain::freeze::{FreezePolicy, DEFAULT_FREEZE_VALIDITY_DAYS, DEFAULT_MAX_UNUSED_FREEZES};
use momentum_domain::reward::{SurprisePolicy, DEFAULT_MILESTONE_STEP};

pub const CONFIG_ENV_VAR: &str = "MOMENTUM_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub database_path: PathBuf,
    pub max_unused_freezes: u32,
    /// `None` disables freeze expiry
    pub freeze_validity_days: Option<i64>,
    pub milestone_step: u32,
    pub surprise: SurprisePolicy,
    pub sweep_enabled: bool,
    pub sweep_hour: u32,
    pub sweep_minute: u32,
    /// Offset applied to UTC when deciding which calendar day "today" is
    pub utc_offset_minutes: i32,
    /// Share of at-risk streaks that triggers an operator alert
    pub at_risk_alert_threshold: f64,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub expose_internal_errors: bool,
    pub alert_webhook_url: Option<Url>,
    pub custom_badges: Vec<BadgeDefinition>,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("momentum");

        Self {
            database_path: data_dir.join("momentum.db"),
            max_unused_freezes: DEFAULT_MAX_UNUSED_FREEZES,
            freeze_validity_days: Some(DEFAULT_FREEZE_VALIDITY_DAYS),
            milestone_step: DEFAULT_MILESTONE_STEP,
            surprise: SurprisePolicy::default(),
            sweep_enabled: true,
            sweep_hour: 3,
            sweep_minute: 30,
            utc_offset_minutes: 0,
            at_risk_alert_threshold: 0.25,
            log_dir: data_dir.join("logs"),
            log_level: "info".to_string(),
            expose_internal_errors: false,
            alert_webhook_url: None,
            custom_badges: Vec::new(),
        }
    }
}

impl EngagementConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// `$MOMENTUM_CONFIG` or `<config_dir>/momentum/config.json`
    pub fn default_path() -> Option<PathBuf> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => dirs::config_dir().map(|dir| dir.join("momentum").join("config.json")),
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::warn!("[config] No config directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!(
                "[config] {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        log::info!("[config] Loaded {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_unused_freezes == 0 {
            return Err(ConfigError::Invalid(
                "max_unused_freezes must be at least 1".to_string(),
            ));
        }
        if matches!(self.freeze_validity_days, Some(days) if days <= 0) {
            return Err(ConfigError::Invalid(
                "freeze_validity_days must be positive".to_string(),
            ));
        }
        if self.milestone_step == 0 {
            return Err(ConfigError::Invalid(
                "milestone_step must be positive".to_string(),
            ));
        }
        if self.sweep_hour > 23 || self.sweep_minute > 59 {
            return Err(ConfigError::Invalid(format!(
                "Invalid sweep time {:02}:{:02}",
                self.sweep_hour, self.sweep_minute
            )));
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_minutes {} is out of range",
                self.utc_offset_minutes
            )));
        }
        if !(0.0..=1.0).contains(&self.at_risk_alert_threshold) {
            return Err(ConfigError::Invalid(
                "at_risk_alert_threshold must be within [0, 1]".to_string(),
            ));
        }
        let surprise = &self.surprise;
        if surprise.points_min <= 0 || surprise.points_min > surprise.points_max {
            return Err(ConfigError::Invalid(format!(
                "Invalid surprise points range {}..={}",
                surprise.points_min, surprise.points_max
            )));
        }
        if !surprise.multiplier_factor.is_finite()
            || surprise.multiplier_factor < 1.0
            || surprise.multiplier_hours <= 0
        {
            return Err(ConfigError::Invalid(
                "Surprise multiplier needs a factor >= 1 and a positive duration".to_string(),
            ));
        }
        for badge in &self.custom_badges {
            badge.criterion().validate().map_err(|e| {
                ConfigError::Invalid(format!("Badge {}: {}", badge.badge_id(), e.message()))
            })?;
        }
        Ok(())
    }

    pub fn freeze_policy(&self) -> FreezePolicy {
        FreezePolicy {
            max_unused: self.max_unused_freezes,
            validity_days: self.freeze_validity_days,
        }
    }

    pub fn database_url_path(&self) -> String {
        self.database_path.to_string_lossy().into_owned()
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_max_unused_freezes(mut self, max: u32) -> Self {
        self.max_unused_freezes = max;
        self
    }

    pub fn with_freeze_validity_days(mut self, days: Option<i64>) -> Self {
        self.freeze_validity_days = days;
        self
    }

    pub fn with_milestone_step(mut self, step: u32) -> Self {
        self.milestone_step = step;
        self
    }

    pub fn with_surprise(mut self, surprise: SurprisePolicy) -> Self {
        self.surprise = surprise;
        self
    }

    pub fn with_sweep_time(mut self, hour: u32, minute: u32) -> Self {
        self.sweep_hour = hour;
        self.sweep_minute = minute;
        self
    }

    pub fn with_sweep_enabled(mut self, enabled: bool) -> Self {
        self.sweep_enabled = enabled;
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn with_at_risk_alert_threshold(mut self, threshold: f64) -> Self {
        self.at_risk_alert_threshold = threshold;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    pub fn with_alert_webhook_url(mut self, url: Option<Url>) -> Self {
        self.alert_webhook_url = url;
        self
    }

    pub fn with_custom_badges(mut self, badges: Vec<BadgeDefinition>) -> Self {
        self.custom_badges = badges;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngagementConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.freeze_policy(), FreezePolicy::default());
        assert_eq!((config.sweep_hour, config.sweep_minute), (3, 30));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngagementConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.max_unused_freezes, DEFAULT_MAX_UNUSED_FREEZES);
    }

    #[test]
    fn test_partial_file_overrides_selected_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "max_unused_freezes": 5,
                "freeze_validity_days": null,
                "alert_webhook_url": "https://hooks.example.com/momentum",
                "surprise": {{"points_min": 5, "points_max": 15, "badge_pool": [], "multiplier_factor": 3.0, "multiplier_hours": 12}}
            }}"#
        )
        .unwrap();

        let config = EngagementConfig::load_from(file.path()).unwrap();
        assert_eq!(config.max_unused_freezes, 5);
        assert_eq!(config.freeze_validity_days, None);
        assert_eq!(config.surprise.points_max, 15);
        assert_eq!(
            config.alert_webhook_url.unwrap().host_str(),
            Some("hooks.example.com")
        );
        assert_eq!(config.milestone_step, DEFAULT_MILESTONE_STEP);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sweep_hour": 24}}"#).unwrap();
        assert!(matches!(
            EngagementConfig::load_from(file.path()),
            Err(ConfigError::Invalid(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            EngagementConfig::load_from(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_builders() {
        let config = EngagementConfig::new()
            .with_max_unused_freezes(1)
            .with_sweep_time(22, 15)
            .with_expose_internal_errors(true);
        assert_eq!(config.freeze_policy().max_unused, 1);
        assert_eq!(config.sweep_hour, 22);
        assert!(config.expose_internal_errors);
        assert!(config.validate().is_ok());
    }
}
