//! Next-action recommendation
//!
//! An ordered rule chain: rules are tried top-down and the first match wins.
//! The last rule always matches, so exactly one recommendation comes back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::normalizer::{parse_instant, DateLike};
use crate::types::{Priority, Recommendation};

/// Default age (days) after which an HbA1c result is considered stale
pub const DEFAULT_HBA1C_STALE_AFTER_DAYS: i64 = 90;

/// Default exercise streak length that earns a celebration
pub const DEFAULT_STREAK_CELEBRATION_DAYS: u32 = 5;

/// Signals the rule chain looks at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationInput {
    /// Profile completion, 0-100
    pub profile_completion_pct: f64,
    /// When the latest HbA1c result was recorded, if ever
    #[serde(default)]
    pub hba1c_last_updated_at: Option<DateLike>,
    /// Current exercise streak in days
    #[serde(default)]
    pub exercise_streak: u32,
    /// Days in the window that have a diet plan
    #[serde(default)]
    pub diet_days_with_plan: u32,
}

/// Thresholds used by the rule chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRules {
    pub hba1c_stale_after_days: i64,
    pub streak_celebration_days: u32,
}

impl Default for RecommendationRules {
    fn default() -> Self {
        Self {
            hba1c_stale_after_days: DEFAULT_HBA1C_STALE_AFTER_DAYS,
            streak_celebration_days: DEFAULT_STREAK_CELEBRATION_DAYS,
        }
    }
}

/// Resolved view of the input that every rule reads
struct RuleContext<'a> {
    input: &'a RecommendationInput,
    rules: &'a RecommendationRules,
    hba1c_age_days: Option<i64>,
}

type Rule = fn(&RuleContext<'_>) -> Option<Recommendation>;

const RULE_CHAIN: [Rule; 4] = [
    incomplete_profile,
    stale_hba1c,
    exercise_streak,
    missing_diet_plan,
];

impl RecommendationRules {
    /// Run the rule chain, measuring ages against `now`
    pub fn evaluate(
        &self,
        input: &RecommendationInput,
        now: DateTime<Utc>,
    ) -> Result<Recommendation, ComputeError> {
        if !input.profile_completion_pct.is_finite() {
            return Err(ComputeError::non_finite(
                "profile_completion_pct",
                input.profile_completion_pct,
            ));
        }

        // An unparsable date counts as no date
        let hba1c_age_days = input
            .hba1c_last_updated_at
            .as_ref()
            .and_then(parse_instant)
            .map(|updated| (now - updated).num_days());

        let context = RuleContext {
            input,
            rules: self,
            hba1c_age_days,
        };

        Ok(RULE_CHAIN
            .iter()
            .find_map(|rule| rule(&context))
            .unwrap_or_else(all_set))
    }
}

/// Run the rule chain with default thresholds
pub fn recommend(
    input: &RecommendationInput,
    now: DateTime<Utc>,
) -> Result<Recommendation, ComputeError> {
    RecommendationRules::default().evaluate(input, now)
}

/// Percentage of answered questions, rounded and clamped to 0-100
pub fn completion_percentage(answered: u32, total: u32) -> f64 {
    let pct = (f64::from(answered) / f64::from(total.max(1)) * 100.0).round();
    pct.min(100.0)
}

fn incomplete_profile(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let pct = ctx.input.profile_completion_pct;
    if pct >= 100.0 {
        return None;
    }
    let done = pct.floor().max(0.0);
    let remaining = 100.0 - done;
    Some(recommendation(
        "Complete Your Profile",
        format!(
            "Your profile is {done:.0}% complete. Add the remaining {remaining:.0}% to unlock personalized insights."
        ),
        Priority::High,
        "complete_profile",
    ))
}

fn stale_hba1c(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let age = ctx.hba1c_age_days?;
    if age <= ctx.rules.hba1c_stale_after_days {
        return None;
    }
    Some(recommendation(
        "Update HbA1c Results",
        format!(
            "Your last HbA1c result is {age} days old. A fresh test keeps your targets accurate."
        ),
        Priority::Medium,
        "update_hba1c",
    ))
}

fn exercise_streak(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let streak = ctx.input.exercise_streak;
    if streak < ctx.rules.streak_celebration_days {
        return None;
    }
    Some(recommendation(
        "Maintain Your Streak!",
        format!("You have followed your exercise plan {streak} days in a row. Keep it going!"),
        Priority::Positive,
        "maintain_streak",
    ))
}

fn missing_diet_plan(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    if ctx.input.diet_days_with_plan > 0 {
        return None;
    }
    Some(recommendation(
        "Generate Your Diet Plan",
        "No diet plan in your recent window. Generate one to start tracking meals.".to_string(),
        Priority::Medium,
        "generate_diet_plan",
    ))
}

fn all_set() -> Recommendation {
    recommendation(
        "All Set!",
        "Your plans are on track. Explore your suggestions for more ideas.".to_string(),
        Priority::Low,
        "explore_suggestions",
    )
}

fn recommendation(
    title: &str,
    description: String,
    priority: Priority,
    action_key: &str,
) -> Recommendation {
    Recommendation {
        title: title.to_string(),
        description,
        priority,
        action_key: action_key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn make_test_input(pct: f64, streak: u32, diet_days: u32) -> RecommendationInput {
        RecommendationInput {
            profile_completion_pct: pct,
            hba1c_last_updated_at: None,
            exercise_streak: streak,
            diet_days_with_plan: diet_days,
        }
    }

    #[test]
    fn test_incomplete_profile_wins() {
        let mut input = make_test_input(60.0, 10, 0);
        input.hba1c_last_updated_at = Some(DateLike::from(now() - Duration::days(400)));

        let rec = recommend(&input, now()).unwrap();
        assert_eq!(rec.title, "Complete Your Profile");
        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.action_key, "complete_profile");
        assert!(rec.description.contains("40%"));
    }

    #[test]
    fn test_stale_hba1c() {
        let mut input = make_test_input(100.0, 10, 0);
        input.hba1c_last_updated_at = Some(DateLike::from(now() - Duration::days(120)));

        let rec = recommend(&input, now()).unwrap();
        assert_eq!(rec.title, "Update HbA1c Results");
        assert_eq!(rec.priority, Priority::Medium);
        assert!(rec.description.contains("120 days"));
    }

    #[test]
    fn test_hba1c_at_threshold_is_not_stale() {
        let mut input = make_test_input(100.0, 0, 3);
        input.hba1c_last_updated_at = Some(DateLike::from(now() - Duration::days(90)));

        let rec = recommend(&input, now()).unwrap();
        assert_eq!(rec.title, "All Set!");
    }

    #[test]
    fn test_unparsable_hba1c_date_is_ignored() {
        let mut input = make_test_input(100.0, 0, 3);
        input.hba1c_last_updated_at = Some(DateLike::from("last spring"));

        let rec = recommend(&input, now()).unwrap();
        assert_eq!(rec.priority, Priority::Low);
    }

    #[test]
    fn test_streak_beats_missing_diet_plan() {
        let rec = recommend(&make_test_input(100.0, 6, 0), now()).unwrap();

        assert_eq!(rec.title, "Maintain Your Streak!");
        assert_eq!(rec.priority, Priority::Positive);
        assert!(rec.description.contains("6 days"));
    }

    #[test]
    fn test_missing_diet_plan() {
        let rec = recommend(&make_test_input(100.0, 4, 0), now()).unwrap();

        assert_eq!(rec.title, "Generate Your Diet Plan");
        assert_eq!(rec.action_key, "generate_diet_plan");
    }

    #[test]
    fn test_default_rule() {
        let rec = recommend(&make_test_input(100.0, 0, 2), now()).unwrap();

        assert_eq!(rec.title, "All Set!");
        assert_eq!(rec.priority, Priority::Low);
    }

    #[test]
    fn test_custom_thresholds() {
        let rules = RecommendationRules {
            hba1c_stale_after_days: 30,
            streak_celebration_days: 3,
        };

        let rec = rules.evaluate(&make_test_input(100.0, 3, 1), now()).unwrap();
        assert_eq!(rec.action_key, "maintain_streak");

        let mut input = make_test_input(100.0, 0, 1);
        input.hba1c_last_updated_at = Some(DateLike::from("2024-04-15"));
        let rec = rules.evaluate(&input, now()).unwrap();
        assert_eq!(rec.action_key, "update_hba1c");
    }

    #[test]
    fn test_non_finite_completion_is_rejected() {
        let err = recommend(&make_test_input(f64::NAN, 0, 0), now()).unwrap_err();
        assert!(matches!(err, ComputeError::NonFiniteValue { .. }));
    }

    #[test]
    fn test_completion_percentage() {
        assert_eq!(completion_percentage(0, 0), 0.0);
        assert_eq!(completion_percentage(2, 3), 67.0);
        assert_eq!(completion_percentage(12, 12), 100.0);
        assert_eq!(completion_percentage(15, 12), 100.0);
    }

    proptest! {
        #[test]
        fn test_incomplete_profile_always_wins(
            pct in 0.0f64..99.99,
            streak in 0u32..60,
            diet_days in 0u32..60,
            hba1c_age in proptest::option::of(0i64..1000),
        ) {
            let mut input = make_test_input(pct, streak, diet_days);
            input.hba1c_last_updated_at =
                hba1c_age.map(|age| DateLike::from(now() - Duration::days(age)));

            let rec = recommend(&input, now()).unwrap();
            prop_assert_eq!(rec.priority, Priority::High);
            prop_assert_eq!(rec.action_key, "complete_profile");
        }

        #[test]
        fn test_recommend_is_total(
            pct in 0.0f64..=100.0,
            streak in 0u32..60,
            diet_days in 0u32..60,
        ) {
            let rec = recommend(&make_test_input(pct, streak, diet_days), now());
            prop_assert!(rec.is_ok());
        }
    }
}
