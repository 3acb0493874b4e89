//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analytics::keywords::DEFAULT_KEYWORDS;
use crate::core::errors::{Result, TutorError};
use crate::core::paths::resolve_absolute_path;

/// Full tutor configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub model: ModelConfig,
    pub retry: RetryConfig,
    pub analytics: AnalyticsConfig,
    pub chart: ChartConfig,
}

/// Files read and written by the tutor. Relative paths resolve against the
/// working directory, matching where the session is started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub history_log: PathBuf,
    pub report_image: PathBuf,
    pub knowledge_base: PathBuf,
    /// Directory receiving `*_cleaned` copies. `None` means the working directory.
    pub repair_dir: Option<PathBuf>,
}

/// Hosted model settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    pub model_id: String,
    /// Name of the environment variable holding the API key (never the key itself).
    pub api_key_env: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub request_timeout_secs: u64,
}

/// Backoff for rate-limited model calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: f64,
}

/// Aggregation knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Tracked concept vocabulary, matched case-insensitively as whole words.
    pub keywords: Vec<String>,
    pub top_keywords: usize,
    pub recent_window: usize,
}

/// Chart output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChartConfig {
    pub dpi: u32,
    /// TrueType/OpenType font used for chart text. Probed from common system
    /// locations when unset.
    pub font_path: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                tracing::warn!("HOME not set, falling back to /tmp for the config path");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir
                .join(".config")
                .join("python-tutor")
                .join("config.toml"),
            history_log: PathBuf::from("query_history.jsonl"),
            report_image: PathBuf::from("tutor_analytics_report.png"),
            knowledge_base: PathBuf::from("python_basics.txt"),
            repair_dir: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            max_output_tokens: 2048,
            request_timeout_secs: 120,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 5_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(ToString::to_string).collect(),
            top_keywords: 5,
            recent_window: 5,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            font_path: None,
        }
    }
}

impl PathsConfig {
    /// Absolute directory for repaired logs, defaulting to the working directory.
    pub fn effective_repair_dir(&self) -> Result<PathBuf> {
        match &self.repair_dir {
            Some(dir) => Ok(resolve_absolute_path(dir)),
            None => env::current_dir().map_err(|source| TutorError::io(".", source)),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| TutorError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(TutorError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("TUTOR_HISTORY_LOG") {
            self.paths.history_log = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("TUTOR_REPORT_IMAGE") {
            self.paths.report_image = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("TUTOR_KNOWLEDGE_BASE") {
            self.paths.knowledge_base = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("TUTOR_REPAIR_DIR") {
            self.paths.repair_dir = Some(PathBuf::from(raw));
        }

        if let Some(raw) = lookup("TUTOR_MODEL_ID") {
            self.model.model_id = raw;
        }
        if let Some(raw) = lookup("TUTOR_MAX_OUTPUT_TOKENS") {
            self.model.max_output_tokens = parse_env("TUTOR_MAX_OUTPUT_TOKENS", &raw)?;
        }
        if let Some(raw) = lookup("TUTOR_REQUEST_TIMEOUT_SECS") {
            self.model.request_timeout_secs = parse_env("TUTOR_REQUEST_TIMEOUT_SECS", &raw)?;
        }

        if let Some(raw) = lookup("TUTOR_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_env("TUTOR_RETRY_MAX_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = lookup("TUTOR_RETRY_INITIAL_DELAY_MS") {
            self.retry.initial_delay_ms = parse_env("TUTOR_RETRY_INITIAL_DELAY_MS", &raw)?;
        }

        if let Some(raw) = lookup("TUTOR_TOP_KEYWORDS") {
            self.analytics.top_keywords = parse_env("TUTOR_TOP_KEYWORDS", &raw)?;
        }
        if let Some(raw) = lookup("TUTOR_RECENT_WINDOW") {
            self.analytics.recent_window = parse_env("TUTOR_RECENT_WINDOW", &raw)?;
        }

        if let Some(raw) = lookup("TUTOR_CHART_DPI") {
            self.chart.dpi = parse_env("TUTOR_CHART_DPI", &raw)?;
        }
        if let Some(raw) = lookup("TUTOR_CHART_FONT") {
            self.chart.font_path = Some(PathBuf::from(raw));
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.model.model_id.trim().is_empty() {
            return Err(invalid("model.model_id must not be empty"));
        }
        if self.model.api_key_env.trim().is_empty() {
            return Err(invalid("model.api_key_env must not be empty"));
        }
        if self.model.max_output_tokens == 0 {
            return Err(invalid("model.max_output_tokens must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts must be >= 1"));
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(TutorError::InvalidConfig {
                details: format!(
                    "retry.multiplier must be a finite value >= 1.0, got {}",
                    self.retry.multiplier
                ),
            });
        }
        if self.analytics.top_keywords == 0 {
            return Err(invalid("analytics.top_keywords must be >= 1"));
        }
        if self.analytics.recent_window == 0 {
            return Err(invalid("analytics.recent_window must be >= 1"));
        }
        if let Some(blank) = self
            .analytics
            .keywords
            .iter()
            .position(|k| k.trim().is_empty())
        {
            return Err(TutorError::InvalidConfig {
                details: format!("analytics.keywords[{blank}] is blank"),
            });
        }
        if !(72..=1200).contains(&self.chart.dpi) {
            return Err(TutorError::InvalidConfig {
                details: format!("chart.dpi must be in [72, 1200], got {}", self.chart.dpi),
            });
        }
        Ok(())
    }
}

fn invalid(details: &str) -> TutorError {
    TutorError::InvalidConfig {
        details: details.to_string(),
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| TutorError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

#[cfg(test)]
mod tests {
    use super::{Config, TutorError};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.paths.history_log, PathBuf::from("query_history.jsonl"));
        assert_eq!(
            cfg.paths.report_image,
            PathBuf::from("tutor_analytics_report.png")
        );
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.initial_delay_ms, 5_000);
        assert!(cfg.analytics.keywords.iter().any(|k| k == "tuple"));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = Config::default();
        let env = vars(&[
            ("TUTOR_HISTORY_LOG", "/tmp/h.jsonl"),
            ("TUTOR_MODEL_ID", "gemini-test"),
            ("TUTOR_RETRY_MAX_ATTEMPTS", "3"),
            ("TUTOR_TOP_KEYWORDS", "10"),
            ("TUTOR_CHART_DPI", "150"),
        ]);
        cfg.apply_env_overrides_from(|name| env.get(name).cloned())
            .expect("overrides should apply");

        assert_eq!(cfg.paths.history_log, PathBuf::from("/tmp/h.jsonl"));
        assert_eq!(cfg.model.model_id, "gemini-test");
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.analytics.top_keywords, 10);
        assert_eq!(cfg.chart.dpi, 150);
    }

    #[test]
    fn env_override_with_bad_number_is_parse_error() {
        let mut cfg = Config::default();
        let env = vars(&[("TUTOR_RECENT_WINDOW", "five")]);
        let err = cfg
            .apply_env_overrides_from(|name| env.get(name).cloned())
            .expect_err("expected parse failure");
        match err {
            TutorError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("TUTOR_RECENT_WINDOW"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut cfg = Config::default();
        cfg.retry.max_attempts = 0;
        assert!(matches!(
            cfg.validate(),
            Err(TutorError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn shrinking_multiplier_rejected() {
        let mut cfg = Config::default();
        cfg.retry.multiplier = 0.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn blank_keyword_rejected() {
        let mut cfg = Config::default();
        cfg.analytics.keywords.push("   ".to_string());
        let err = cfg.validate().expect_err("blank keyword");
        assert!(err.to_string().contains("analytics.keywords"));
    }

    #[test]
    fn dpi_out_of_range_rejected() {
        let mut cfg = Config::default();
        cfg.chart.dpi = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_section_defaults() {
        let raw = r#"
            [analytics]
            keywords = ["ownership", "borrow"]

            [chart]
            dpi = 150
        "#;
        let cfg: Config = toml::from_str(raw).expect("parse");
        assert_eq!(cfg.analytics.keywords, vec!["ownership", "borrow"]);
        assert_eq!(cfg.analytics.top_keywords, 5);
        assert_eq!(cfg.chart.dpi, 150);
        assert_eq!(cfg.model.model_id, "gemini-2.0-flash");
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutor.toml");
        std::fs::write(&path, "[retry]\nmax_attempts = 2\n").unwrap();

        let cfg = Config::load(Some(&path)).expect("load");
        assert_eq!(cfg.retry.max_attempts, 2);
        assert_eq!(cfg.paths.config_file, path);
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let result = Config::load(Some(Path::new("/nonexistent/tutor/config.toml")));
        assert!(matches!(result, Err(TutorError::MissingConfig { .. })));
    }

    #[test]
    fn repair_dir_resolves_to_absolute() {
        let mut cfg = Config::default();
        assert_eq!(
            cfg.paths.effective_repair_dir().unwrap(),
            std::env::current_dir().unwrap()
        );

        cfg.paths.repair_dir = Some(PathBuf::from("repaired/../out"));
        let dir = cfg.paths.effective_repair_dir().unwrap();
        assert!(dir.is_absolute());
        assert!(dir.ends_with("out"));
    }

    #[test]
    fn toml_rendering_round_trips() {
        let cfg = Config::default();
        let rendered = cfg.to_toml().expect("render");
        let parsed: Config = toml::from_str(&rendered).expect("reparse");
        assert_eq!(parsed, cfg);
    }
}
