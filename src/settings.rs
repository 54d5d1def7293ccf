use std::ops::RangeInclusive;
use std::sync::LazyLock;
use std::time::Duration;

use clap::ValueEnum;
use config::{Config, Environment};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::crawler::CrawlOptions;
use crate::extract::normalize::ScriptFilter;
use crate::loader::{OpenTiming, PauseRange, ScrollPolicy};

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const ENV_PREFIX: &str = "YT";

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[Uu]\+)?([0-9A-Fa-f]{1,6})-(?:[Uu]\+)?([0-9A-Fa-f]{1,6})$").unwrap()
});

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--use test requires --n <int>")]
    MissingTestCount,
    #[error("invalid script range '{0}' (expected FROM-TO hex code points, e.g. AC00-D7A3)")]
    BadScriptRange(String),
    #[error("invalid {name}: {value} (seconds must be finite and non-negative)")]
    BadSeconds { name: &'static str, value: f64 },
    #[error("pause range is inverted: min {min}s > max {max}s")]
    InvertedPause { min: f64, max: f64 },
    #[error("max idle must be at least 1")]
    ZeroMaxIdle,
    #[error(transparent)]
    Source(#[from] config::ConfigError),
}

/// Full extraction, or the first N comments in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    Fulldata,
    Test,
}

/// Resolve the row limit. Test mode without a positive N is rejected here,
/// before any browser session exists.
pub fn resolve_limit(mode: RunMode, n: Option<usize>) -> Result<Option<usize>, ConfigError> {
    match mode {
        RunMode::Fulldata => Ok(None),
        RunMode::Test => match n {
            Some(n) if n > 0 => Ok(Some(n)),
            _ => Err(ConfigError::MissingTestCount),
        },
    }
}

/// Knobs read from the environment (`YT_*`), below the CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub webdriver_url: String,
    pub pause_min_secs: f64,
    pub pause_max_secs: f64,
    pub max_idle: usize,
    pub open_settle_secs: f64,
    pub lazy_load_secs: f64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_env(env: Environment) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("webdriver_url", DEFAULT_WEBDRIVER_URL)?
            .set_default("pause_min_secs", 1.5)?
            .set_default("pause_max_secs", 3.0)?
            .set_default("max_idle", 2_i64)?
            .set_default("open_settle_secs", 2.0)?
            .set_default("lazy_load_secs", 6.0)?
            .add_source(env)
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Combine these settings with the per-run CLI values.
    pub fn crawl_options(
        &self,
        limit: Option<usize>,
        max_scroll: Option<usize>,
        max_idle: Option<usize>,
        script_ranges: &[String],
    ) -> Result<CrawlOptions, ConfigError> {
        let max_idle = max_idle.unwrap_or(self.max_idle);
        if max_idle == 0 {
            return Err(ConfigError::ZeroMaxIdle);
        }

        let pauses = PauseRange::new(
            secs("pause_min_secs", self.pause_min_secs)?,
            secs("pause_max_secs", self.pause_max_secs)?,
        )
        .ok_or(ConfigError::InvertedPause {
            min: self.pause_min_secs,
            max: self.pause_max_secs,
        })?;

        let filter = if script_ranges.is_empty() {
            ScriptFilter::default()
        } else {
            let ranges = script_ranges
                .iter()
                .map(|s| parse_script_range(s))
                .collect::<Result<Vec<_>, _>>()?;
            ScriptFilter::new(ranges)
        };

        Ok(CrawlOptions {
            limit,
            policy: ScrollPolicy { max_idle, max_scroll },
            pauses,
            timing: OpenTiming {
                settle: secs("open_settle_secs", self.open_settle_secs)?,
                lazy_load: secs("lazy_load_secs", self.lazy_load_secs)?,
            },
            filter,
        })
    }
}

fn secs(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::BadSeconds { name, value })
}

/// Parse `AC00-D7A3` (optionally `U+AC00-U+D7A3`) into a char range.
pub fn parse_script_range(s: &str) -> Result<RangeInclusive<char>, ConfigError> {
    let bad = || ConfigError::BadScriptRange(s.to_string());
    let caps = RANGE_RE.captures(s.trim()).ok_or_else(bad)?;
    let point = |hex: &str| {
        u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(bad)
    };
    let (from, to) = (point(&caps[1])?, point(&caps[2])?);
    if from > to {
        return Err(bad());
    }
    Ok(from..=to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn test_mode_requires_n() {
        assert!(matches!(
            resolve_limit(RunMode::Test, None),
            Err(ConfigError::MissingTestCount)
        ));
        assert!(matches!(
            resolve_limit(RunMode::Test, Some(0)),
            Err(ConfigError::MissingTestCount)
        ));
        assert_eq!(resolve_limit(RunMode::Test, Some(10)).unwrap(), Some(10));
    }

    #[test]
    fn fulldata_ignores_n() {
        assert_eq!(resolve_limit(RunMode::Fulldata, Some(10)).unwrap(), None);
        assert_eq!(resolve_limit(RunMode::Fulldata, None).unwrap(), None);
    }

    #[test]
    fn defaults_without_env() {
        let s = Settings::from_env(env(&[])).unwrap();
        assert_eq!(s.webdriver_url, DEFAULT_WEBDRIVER_URL);
        assert_eq!(s.max_idle, 2);
        assert_eq!(s.pause_min_secs, 1.5);
        assert_eq!(s.pause_max_secs, 3.0);
        assert_eq!(s.lazy_load_secs, 6.0);
    }

    #[test]
    fn env_overrides_defaults() {
        let s = Settings::from_env(env(&[
            ("YT_WEBDRIVER_URL", "http://grid:4444"),
            ("YT_MAX_IDLE", "3"),
            ("YT_PAUSE_MAX_SECS", "4.5"),
        ]))
        .unwrap();
        assert_eq!(s.webdriver_url, "http://grid:4444");
        assert_eq!(s.max_idle, 3);
        assert_eq!(s.pause_max_secs, 4.5);
    }

    #[test]
    fn cli_values_win_over_settings() {
        let s = Settings::from_env(env(&[])).unwrap();
        let opts = s.crawl_options(Some(5), Some(20), Some(1), &[]).unwrap();
        assert_eq!(opts.limit, Some(5));
        assert_eq!(opts.policy, ScrollPolicy { max_idle: 1, max_scroll: Some(20) });
        assert_eq!(opts.timing.settle, Duration::from_secs(2));
        assert!(opts.filter.allows('한'));
    }

    #[test]
    fn zero_max_idle_rejected() {
        let s = Settings::from_env(env(&[])).unwrap();
        assert!(matches!(
            s.crawl_options(None, None, Some(0), &[]),
            Err(ConfigError::ZeroMaxIdle)
        ));
    }

    #[test]
    fn inverted_or_negative_pauses_rejected() {
        let mut s = Settings::from_env(env(&[])).unwrap();
        s.pause_min_secs = 5.0;
        assert!(matches!(
            s.crawl_options(None, None, None, &[]),
            Err(ConfigError::InvertedPause { .. })
        ));
        s.pause_min_secs = -1.0;
        assert!(matches!(
            s.crawl_options(None, None, None, &[]),
            Err(ConfigError::BadSeconds { name: "pause_min_secs", .. })
        ));
    }

    #[test]
    fn script_ranges_replace_default_filter() {
        let s = Settings::from_env(env(&[])).unwrap();
        let ranges = vec!["3040-309F".to_string(), "U+30A0-U+30FF".to_string()];
        let opts = s.crawl_options(None, None, None, &ranges).unwrap();
        assert!(opts.filter.allows('ひ'));
        assert!(opts.filter.allows('カ'));
        assert!(!opts.filter.allows('한'));
    }

    #[test]
    fn parses_script_ranges() {
        assert_eq!(parse_script_range("AC00-D7A3").unwrap(), '가'..='힣');
        assert_eq!(parse_script_range(" u+0041-u+005a ").unwrap(), 'A'..='Z');
        assert!(parse_script_range("D7A3-AC00").is_err());
        assert!(parse_script_range("D800-DFFF").is_err());
        assert!(parse_script_range("hangul").is_err());
    }
}
