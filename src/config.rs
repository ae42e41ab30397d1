//! Engine configuration
//!
//! Thresholds and window sizes shared by every stage. Every field has a
//! default, so an empty JSON object is a valid configuration.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ComputeError;
use crate::recommendation::{
    RecommendationRules, DEFAULT_HBA1C_STALE_AFTER_DAYS, DEFAULT_STREAK_CELEBRATION_DAYS,
};

/// Default trend window (days)
pub const DEFAULT_WINDOW_DAYS: u32 = 14;

/// Longest accepted window (ten years of days)
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Default number of recent diet plans behind the macronutrient balance
pub const DEFAULT_MACRO_WINDOW_PLANS: usize = 7;

/// Tunable settings for [`crate::pipeline::InsightsEngine`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Trailing days covered by the timeline and streaks.
    /// Accepts a number or the persisted form "14days".
    #[serde(deserialize_with = "deserialize_window", alias = "chartTimeRange")]
    pub window_days: u32,
    pub hba1c_stale_after_days: i64,
    pub streak_celebration_days: u32,
    pub macro_window_plans: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            hba1c_stale_after_days: DEFAULT_HBA1C_STALE_AFTER_DAYS,
            streak_celebration_days: DEFAULT_STREAK_CELEBRATION_DAYS,
            macro_window_plans: DEFAULT_MACRO_WINDOW_PLANS,
        }
    }
}

impl InsightsConfig {
    /// Reject settings no stage can work with
    pub fn validate(&self) -> Result<(), ComputeError> {
        check_window(self.window_days)?;
        if self.macro_window_plans == 0 {
            return Err(ComputeError::InvalidConfig(
                "macro_window_plans must be at least 1".to_string(),
            ));
        }
        if self.hba1c_stale_after_days < 0 {
            return Err(ComputeError::InvalidConfig(
                "hba1c_stale_after_days cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Thresholds for the recommendation rule chain
    pub fn rules(&self) -> RecommendationRules {
        RecommendationRules {
            hba1c_stale_after_days: self.hba1c_stale_after_days,
            streak_celebration_days: self.streak_celebration_days,
        }
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ComputeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

/// Parse a window such as "7days", "14 days", "30d" or "21".
pub fn parse_window(input: &str) -> Result<u32, ComputeError> {
    let trimmed = input.trim().to_ascii_lowercase();
    let digits = ["days", "day", "d"]
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix))
        .unwrap_or(trimmed.as_str())
        .trim();

    let days = digits
        .parse::<u32>()
        .map_err(|_| ComputeError::InvalidWindow(format!("'{input}' is not a number of days")))?;
    check_window(days)
}

/// Window must cover between 1 and [`MAX_WINDOW_DAYS`] days.
pub fn check_window(days: u32) -> Result<u32, ComputeError> {
    match days {
        0 => Err(ComputeError::InvalidWindow(
            "window must span at least one day".to_string(),
        )),
        days if days > MAX_WINDOW_DAYS => Err(ComputeError::InvalidWindow(format!(
            "window of {days} days exceeds the maximum of {MAX_WINDOW_DAYS}"
        ))),
        days => Ok(days),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WindowRepr {
    Days(u32),
    Text(String),
}

impl WindowRepr {
    fn into_days(self) -> Result<u32, ComputeError> {
        match self {
            WindowRepr::Days(days) => check_window(days),
            WindowRepr::Text(text) => parse_window(&text),
        }
    }
}

fn deserialize_window<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    WindowRepr::deserialize(deserializer)?
        .into_days()
        .map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_optional_window<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<WindowRepr>::deserialize(deserializer)?
        .map(WindowRepr::into_days)
        .transpose()
        .map_err(serde::de::Error::custom)
}
