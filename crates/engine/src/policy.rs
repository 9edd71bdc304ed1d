use serde::Deserialize;

use common::{Config, Error, Result};

/// Which runs count as "in window" for an IPO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum WindowRule {
    /// Only the day before close.
    SingleDay,
    /// The day before close and the close day itself.
    DualDay,
    /// Readings accumulate while the close is at most `max_days_ahead`
    /// calendar days away and at least `min_working_days` weekdays remain
    /// (both ends inclusive). Decisions happen on the dual-day rule.
    Accumulation {
        max_days_ahead: i64,
        min_working_days: u32,
    },
}

/// How the recorded GMP history turns into a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionRule {
    /// Proceed iff the latest reading exceeds the threshold.
    LatestReading,
    /// Proceed iff the mean of all readings exceeds the threshold.
    HistoryAverage,
}

impl std::fmt::Display for DecisionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionRule::LatestReading => write!(f, "latest-reading"),
            DecisionRule::HistoryAverage => write!(f, "history-average"),
        }
    }
}

/// Decision policy, either one of the named presets or a TOML file.
///
/// Example `config/policy.toml`:
/// ```toml
/// decision = "history-average"
/// threshold = 10.0
///
/// [window]
/// rule = "accumulation"
/// max_days_ahead = 60
/// min_working_days = 3
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub window: WindowRule,
    pub decision: DecisionRule,
    /// GMP percentage that must be strictly exceeded to proceed.
    pub threshold: f64,
}

pub const PRESET_NAMES: [&str; 3] = ["closing-tomorrow", "closing-window", "average"];

impl PolicyConfig {
    /// Look up a named preset.
    pub fn preset(name: &str) -> Result<Self> {
        let policy = match name.trim().to_lowercase().as_str() {
            "closing-tomorrow" => PolicyConfig {
                window: WindowRule::SingleDay,
                decision: DecisionRule::LatestReading,
                threshold: 30.0,
            },
            "closing-window" => PolicyConfig {
                window: WindowRule::DualDay,
                decision: DecisionRule::LatestReading,
                threshold: 5.0,
            },
            "average" => PolicyConfig {
                window: WindowRule::Accumulation {
                    max_days_ahead: 60,
                    min_working_days: 3,
                },
                decision: DecisionRule::HistoryAverage,
                threshold: 10.0,
            },
            other => {
                return Err(Error::Config(format!(
                    "unknown POLICY_PRESET '{other}', expected one of {}",
                    PRESET_NAMES.join(", ")
                )))
            }
        };
        Ok(policy)
    }

    /// Load from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read policy config at '{path}': {e}")))?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("Failed to parse policy config at '{path}': {e}")))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let policy: PolicyConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Resolve the effective policy: a policy file wins over the preset, and
    /// an explicit threshold wins over both.
    pub fn resolve(cfg: &Config) -> Result<Self> {
        let mut policy = match &cfg.policy_config_path {
            Some(path) => Self::load(path)?,
            None => Self::preset(&cfg.policy_preset)?,
        };
        if let Some(threshold) = cfg.gmp_threshold {
            policy.threshold = threshold;
        }
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(Error::Config("policy threshold must be finite".into()));
        }
        if let WindowRule::Accumulation { max_days_ahead, .. } = self.window {
            if max_days_ahead < 1 {
                return Err(Error::Config("max_days_ahead must be at least 1".into()));
            }
        }
        Ok(())
    }
}
