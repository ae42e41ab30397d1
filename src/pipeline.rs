//! Pipeline orchestration
//!
//! This module provides the public API for Glyco Insights.
//! It runs every stage over one snapshot of a user's records:
//! classification → timeline → consistency → recommendation, with the
//! activity feed and nutrition summaries assembled alongside.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::classifier::{classify_bmi, classify_labs};
use crate::config::{deserialize_optional_window, InsightsConfig};
use crate::consistency::compute_consistency;
use crate::error::ComputeError;
use crate::extract::MacroExtractor;
use crate::feed::{assemble_feed, AssessmentSummary, DiseaseData};
use crate::normalizer::{date_key, normalize_date, DateLike};
use crate::nutrition::{macronutrient_balance, meal_distribution};
use crate::recommendation::{completion_percentage, RecommendationInput};
use crate::timeline::{PlanHistories, TimelineBuilder};
use crate::types::{
    ActivityItem, AnthropometricRecord, ClassifiedMetric, ConsistencyReport, DailyTimelineEntry,
    LabInsights, LabSnapshot, LifetimeAverages, MacroBalance, MealShare, PlanRecord,
    Recommendation,
};
use crate::{INSIGHTS_VERSION, PRODUCER_NAME};

/// Everything the engine needs for one report. Every field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightsInput {
    #[serde(default, alias = "personalInfo")]
    pub anthropometrics: Option<AnthropometricRecord>,
    /// Flat lab snapshot; a medical-info document must be flattened first
    #[serde(default)]
    pub labs: Option<LabSnapshot>,
    #[serde(default, alias = "dietHistory")]
    pub diet_history: Vec<PlanRecord>,
    #[serde(default, alias = "exerciseHistory")]
    pub exercise_history: Vec<PlanRecord>,
    #[serde(default, alias = "lifestyleHistory")]
    pub lifestyle_history: Vec<PlanRecord>,
    /// Explicit profile completion (0-100); derived from `disease_data` otherwise
    #[serde(default, alias = "profileCompletionPct")]
    pub profile_completion_pct: Option<f64>,
    #[serde(default, alias = "latestAssessment")]
    pub latest_assessment: Option<AssessmentSummary>,
    #[serde(default, alias = "diseaseData")]
    pub disease_data: Option<DiseaseData>,
    /// Overrides the configured window for this request
    #[serde(
        default,
        alias = "chartTimeRange",
        deserialize_with = "deserialize_optional_window"
    )]
    pub window_days: Option<u32>,
    /// Last day of the window; today (UTC) when absent
    #[serde(default, alias = "anchorDate")]
    pub anchor_date: Option<DateLike>,
}

/// Provenance of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub producer: String,
    pub version: String,
    pub report_id: String,
    pub computed_at: DateTime<Utc>,
}

/// Derived dashboard view. Recomputed on every call, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsReport {
    pub meta: ReportMeta,
    pub window_days: u32,
    pub anchor_date: String,
    pub bmi: Option<ClassifiedMetric>,
    pub labs: LabInsights,
    pub timeline: Vec<DailyTimelineEntry>,
    pub averages: LifetimeAverages,
    pub consistency: ConsistencyReport,
    pub recommendation: Recommendation,
    pub activity: Vec<ActivityItem>,
    pub macros: Option<MacroBalance>,
    pub meals: Vec<MealShare>,
}

/// Compute an insights report from a JSON input document.
///
/// # Arguments
/// * `raw_json` - Serialized [`InsightsInput`]
///
/// # Returns
/// The serialized [`InsightsReport`]
///
/// # Example
/// ```ignore
/// let report_json = insights_from_json(input_json)?;
/// ```
pub fn insights_from_json(raw_json: String) -> Result<String, ComputeError> {
    InsightsEngine::new().compute_json(&raw_json)
}

/// Runs the full derivation with a fixed configuration.
///
/// The engine holds no per-user state; one instance can serve any number of
/// independent requests.
pub struct InsightsEngine {
    config: InsightsConfig,
    timeline: TimelineBuilder,
    macros: MacroExtractor,
}

impl Default for InsightsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightsEngine {
    /// Create an engine with default settings
    pub fn new() -> Self {
        Self {
            config: InsightsConfig::default(),
            timeline: TimelineBuilder::new(),
            macros: MacroExtractor::default(),
        }
    }

    /// Create an engine with a validated configuration
    pub fn with_config(config: InsightsConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Load configuration from JSON
    pub fn load_config(&mut self, json: &str) -> Result<(), ComputeError> {
        self.config = InsightsConfig::from_json(json)?;
        Ok(())
    }

    pub fn config(&self) -> &InsightsConfig {
        &self.config
    }

    /// Parse, compute against the current time and serialize
    pub fn compute_json(&self, raw_json: &str) -> Result<String, ComputeError> {
        let input: InsightsInput = serde_json::from_str(raw_json)?;
        let report = self.compute(&input, Utc::now())?;
        serde_json::to_string(&report).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Derive the report. Deterministic for a given `now`, except for the
    /// generated report id.
    pub fn compute(
        &self,
        input: &InsightsInput,
        now: DateTime<Utc>,
    ) -> Result<InsightsReport, ComputeError> {
        let window_days = input.window_days.unwrap_or(self.config.window_days);
        let anchor = resolve_anchor(input.anchor_date.as_ref(), now)?;

        // Stage 1: classify anthropometrics and labs
        let bmi = match &input.anthropometrics {
            Some(record) => classify_bmi(record)?,
            None => None,
        };
        let labs = match &input.labs {
            Some(snapshot) => classify_labs(snapshot)?,
            None => LabInsights::default(),
        };

        // Stage 2: align plan streams
        let histories = PlanHistories::new(
            &input.diet_history,
            &input.exercise_history,
            &input.lifestyle_history,
        );
        let timeline = self.timeline.build(&histories, window_days, anchor)?;
        let averages = self.timeline.lifetime_averages(&histories);

        // Stage 3: streaks and score
        let consistency = compute_consistency(&timeline);

        // Stage 4: next action
        let recommendation_input = RecommendationInput {
            profile_completion_pct: profile_completion(input),
            hba1c_last_updated_at: input
                .labs
                .as_ref()
                .and_then(|labs| labs.hba1c.as_ref())
                .and_then(|hba1c| hba1c.date.clone()),
            exercise_streak: consistency.per_category.exercise.current_streak,
            diet_days_with_plan: consistency.per_category.diet.days_with_plan,
        };
        let recommendation = self.config.rules().evaluate(&recommendation_input, now)?;

        // Independent of the chain above
        let activity = assemble_feed(
            input.latest_assessment.as_ref(),
            input.disease_data.as_ref(),
            now,
        );
        let macros = macronutrient_balance(
            &input.diet_history,
            &self.macros,
            self.config.macro_window_plans,
        );
        let meals = meal_distribution(&input.diet_history);

        debug!(
            window_days,
            anchor = %anchor,
            score = consistency.score,
            recommendation = %recommendation.action_key,
            activity_items = activity.len(),
            "computed insights report"
        );

        Ok(InsightsReport {
            meta: ReportMeta {
                producer: PRODUCER_NAME.to_string(),
                version: INSIGHTS_VERSION.to_string(),
                report_id: Uuid::new_v4().to_string(),
                computed_at: now,
            },
            window_days,
            anchor_date: date_key(anchor),
            bmi,
            labs,
            timeline,
            averages,
            consistency,
            recommendation,
            activity,
            macros,
            meals,
        })
    }
}

fn resolve_anchor(
    anchor: Option<&DateLike>,
    now: DateTime<Utc>,
) -> Result<NaiveDate, ComputeError> {
    match anchor {
        Some(value) => normalize_date(value).ok_or_else(|| {
            ComputeError::DateParseError(format!("unusable anchor date: {value:?}"))
        }),
        None => Ok(now.date_naive()),
    }
}

/// Explicit percentage, else questionnaire progress, else zero
fn profile_completion(input: &InsightsInput) -> f64 {
    input
        .profile_completion_pct
        .or_else(|| {
            input
                .disease_data
                .as_ref()
                .map(|data| completion_percentage(data.answered_questions, data.total_questions))
        })
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BadgeTier, MealSlot, Priority, Severity};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap()
    }

    fn sample_input_json() -> &'static str {
        r#"{
            "anthropometrics": { "height_cm": 170, "weight_kg": 80 },
            "labs": {
                "hba1c": { "value": 8.5, "unit": "%", "date": "2023-09-01" },
                "fasting_glucose": { "value": 110, "unit": "mg/dL" },
                "blood_pressure": { "systolic": 128, "diastolic": 82 }
            },
            "diet_history": [
                {
                    "target_date": "2024-01-11",
                    "nutritional_totals": { "calories": 1800, "carbs": 200, "protein": 90, "fat": 60, "fiber": 28 }
                },
                {
                    "target_date": "2024-01-12",
                    "nutritional_totals": { "calories": 1900, "carbs": 210, "protein": 95, "fat": 65, "fiber": 30 }
                },
                {
                    "target_date": "2024-01-14T07:30:00Z",
                    "meals": [
                        { "meal_type": "breakfast", "items": [
                            { "calories": 400, "carbs": 50, "protein": 20, "fat": 12, "fiber": 6 }
                        ]},
                        { "meal_type": "lunch", "calories": 650, "carbs": 70, "protein": 35, "fat": 20 },
                        { "meal_type": "dinner", "calories": 700, "carbs": 60, "protein": 40, "fat": 25 }
                    ]
                }
            ],
            "exercise_history": [
                { "target_date": "2024-01-13", "totals": { "duration_total_min": 30, "calories_total": 200 } },
                { "target_date": "2024-01-14", "totals": { "duration_total_min": 40, "calories_total": 260 } },
                { "target_date": "2024-01-15", "totals": { "duration_total_min": 35, "calories_total": 230 } }
            ],
            "lifestyle_history": [
                { "target_date": "2024-01-15" }
            ],
            "profile_completion_pct": 100,
            "latest_assessment": { "completed_at": "2024-01-10T09:00:00Z", "risk_level": "medium" },
            "disease_data": {
                "disease": "Type 2 Diabetes",
                "last_updated": "2024-01-05T12:00:00Z",
                "answered_questions": 6,
                "total_questions": 8
            },
            "window_days": "7days"
        }"#
    }

    fn sample_input() -> InsightsInput {
        serde_json::from_str(sample_input_json()).unwrap()
    }

    #[test]
    fn test_full_report() {
        let report = InsightsEngine::new().compute(&sample_input(), now()).unwrap();

        assert_eq!(report.meta.producer, "glyco-insights");
        assert_eq!(report.meta.computed_at, now());
        assert_eq!(report.window_days, 7);
        assert_eq!(report.anchor_date, "2024-01-15");

        let bmi = report.bmi.unwrap();
        assert_eq!(bmi.label, "Overweight");
        assert_eq!(bmi.percent, 64);

        assert_eq!(report.labs.hba1c.as_ref().unwrap().severity, Severity::Error);
        assert_eq!(report.labs.fasting_glucose.as_ref().unwrap().label, "Prediabetes range");
        assert!(report.labs.blood_pressure.is_some());

        assert_eq!(report.timeline.len(), 7);
        assert_eq!(report.timeline[0].date_key, "2024-01-09");
        let jan14 = &report.timeline[5];
        assert!(jan14.diet && jan14.exercise);
        assert_eq!(jan14.diet_calories, Some(1750.0));

        assert_eq!(report.averages.avg_exercise_minutes, Some(35.0));
        assert_eq!(report.averages.avg_diet_calories, Some(1817.0));

        // 3 diet + 3 exercise + 1 lifestyle over 21 day-slots
        assert_eq!(report.consistency.score, 33);
        assert_eq!(report.consistency.badge.tier, BadgeTier::Bronze.rank());
        assert_eq!(report.consistency.per_category.exercise.current_streak, 3);
        assert_eq!(report.consistency.per_category.diet.current_streak, 0);

        // profile complete, HbA1c from September is stale
        assert_eq!(report.recommendation.title, "Update HbA1c Results");

        assert_eq!(report.activity.len(), 3);
        assert_eq!(report.activity[2].title, "Tracking Type 2 Diabetes");

        assert_eq!(report.macros.unwrap().plans_used, 3);
        let meals: Vec<MealSlot> = report.meals.iter().map(|m| m.meal).collect();
        assert_eq!(meals, vec![MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner]);
    }

    #[test]
    fn test_empty_input() {
        let report = InsightsEngine::new()
            .compute(&InsightsInput::default(), now())
            .unwrap();

        assert_eq!(report.window_days, 14);
        assert_eq!(report.timeline.len(), 14);
        assert_eq!(report.bmi, None);
        assert_eq!(report.labs, LabInsights::default());
        assert_eq!(report.consistency.score, 0);
        assert_eq!(report.recommendation.priority, Priority::High);
        assert!(report.activity.is_empty());
        assert_eq!(report.macros, None);
        assert!(report.meals.is_empty());
    }

    #[test]
    fn test_profile_completion_falls_back_to_questionnaire() {
        let mut input = sample_input();
        input.profile_completion_pct = None;

        let report = InsightsEngine::new().compute(&input, now()).unwrap();
        assert_eq!(report.recommendation.title, "Complete Your Profile");
        assert!(report.recommendation.description.contains("25%"));
    }

    #[test]
    fn test_configured_window_and_override() {
        let config = InsightsConfig {
            window_days: 30,
            ..InsightsConfig::default()
        };
        let engine = InsightsEngine::with_config(config).unwrap();

        let report = engine.compute(&InsightsInput::default(), now()).unwrap();
        assert_eq!(report.timeline.len(), 30);

        let report = engine.compute(&sample_input(), now()).unwrap();
        assert_eq!(report.timeline.len(), 7);
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        let input = InsightsInput {
            window_days: Some(0),
            ..InsightsInput::default()
        };
        let result = InsightsEngine::new().compute(&input, now());
        assert!(matches!(result, Err(ComputeError::InvalidWindow(_))));

        let config = InsightsConfig {
            window_days: 0,
            ..InsightsConfig::default()
        };
        assert!(InsightsEngine::with_config(config).is_err());
    }

    #[test]
    fn test_oversized_window_fails_without_allocating() {
        let input = InsightsInput {
            window_days: Some(u32::MAX),
            ..InsightsInput::default()
        };
        let result = InsightsEngine::new().compute(&input, now());
        assert!(matches!(result, Err(ComputeError::InvalidWindow(_))));

        let json = r#"{"window_days":4294967295,"anchor_date":"2024-01-15"}"#;
        let result = insights_from_json(json.to_string());
        assert!(matches!(result, Err(ComputeError::JsonError(_))));

        let json = r#"{"window_days":"4294967295days","anchor_date":"2024-01-15"}"#;
        assert!(insights_from_json(json.to_string()).is_err());
    }

    #[test]
    fn test_assessment_without_risk_level() {
        let json = r#"{
            "latest_assessment": { "completed_at": "2024-01-10T09:00:00Z" },
            "anchor_date": "2024-01-15"
        }"#;
        let report: serde_json::Value =
            serde_json::from_str(&insights_from_json(json.to_string()).unwrap()).unwrap();

        assert_eq!(report["activity"], serde_json::json!([]));
        assert_eq!(report["timeline"].as_array().unwrap().len(), 14);
    }

    #[test]
    fn test_partial_records_are_tolerated() {
        let partial_fields: [(&str, &[&str]); 7] = [
            ("/latest_assessment", &["completed_at", "risk_level"]),
            (
                "/disease_data",
                &["disease", "last_updated", "answered_questions", "total_questions"],
            ),
            ("/anthropometrics", &["height_cm", "weight_kg"]),
            ("/labs", &["hba1c", "fasting_glucose", "blood_pressure"]),
            ("/labs/hba1c", &["value", "unit", "date"]),
            ("/labs/fasting_glucose", &["value", "unit"]),
            ("/labs/blood_pressure", &["systolic", "diastolic"]),
        ];
        let engine = InsightsEngine::new();

        for (section, fields) in partial_fields {
            for field in fields {
                let mut value: serde_json::Value =
                    serde_json::from_str(sample_input_json()).unwrap();
                value
                    .pointer_mut(section)
                    .and_then(serde_json::Value::as_object_mut)
                    .unwrap()
                    .remove(*field);

                let input: InsightsInput = serde_json::from_value(value)
                    .unwrap_or_else(|e| panic!("{section} without {field}: {e}"));
                let report = engine.compute(&input, now());
                assert!(report.is_ok(), "{section} without {field}: {report:?}");
            }
        }
    }

    #[test]
    fn test_empty_nested_records() {
        let json = r#"{
            "anthropometrics": {},
            "labs": { "hba1c": {}, "fasting_glucose": {}, "blood_pressure": {} },
            "latest_assessment": {},
            "disease_data": {},
            "anchor_date": "2024-01-15"
        }"#;
        let input: InsightsInput = serde_json::from_str(json).unwrap();
        let report = InsightsEngine::new().compute(&input, now()).unwrap();

        assert_eq!(report.bmi, None);
        assert_eq!(report.labs, LabInsights::default());
        assert!(report.activity.is_empty());
    }

    #[test]
    fn test_labs_must_be_flat() {
        let nested = r#"{
            "medicalInfo": { "recent_lab_results": { "hba1c": { "value": 7.2 } } }
        }"#;
        let input: InsightsInput = serde_json::from_str(nested).unwrap();
        assert!(input.labs.is_none());

        let flat = r#"{ "labs": { "hba1c": { "value": 7.2 } } }"#;
        let input: InsightsInput = serde_json::from_str(flat).unwrap();
        let report = InsightsEngine::new().compute(&input, now()).unwrap();
        assert!(report.labs.hba1c.is_some());
    }

    #[test]
    fn test_unusable_anchor_is_rejected() {
        let input = InsightsInput {
            anchor_date: Some(DateLike::from("whenever")),
            ..InsightsInput::default()
        };
        let result = InsightsEngine::new().compute(&input, now());
        assert!(matches!(result, Err(ComputeError::DateParseError(_))));
    }

    #[test]
    fn test_insights_from_json() {
        let result = insights_from_json(sample_input_json().to_string());
        assert!(result.is_ok());

        let report: serde_json::Value = serde_json::from_str(&result.unwrap()).unwrap();
        assert_eq!(report["meta"]["producer"], "glyco-insights");
        assert_eq!(report["window_days"], 7);
        assert_eq!(report["timeline"].as_array().unwrap().len(), 7);
        assert_eq!(report["bmi"]["severity"], "warning");
    }

    #[test]
    fn test_camel_case_input() {
        let json = r#"{
            "dietHistory": [{ "targetDate": "2024-01-15", "total_calories": 1500 }],
            "chartTimeRange": "14days",
            "anchorDate": "2024-01-15",
            "profileCompletionPct": 80
        }"#;
        let input: InsightsInput = serde_json::from_str(json).unwrap();
        let report = InsightsEngine::new().compute(&input, now()).unwrap();

        assert_eq!(report.window_days, 14);
        assert_eq!(report.timeline[13].diet_calories, Some(1500.0));
        assert_eq!(report.recommendation.priority, Priority::High);
    }

    #[test]
    fn test_invalid_json() {
        let result = insights_from_json("not valid json".to_string());
        assert!(matches!(result, Err(ComputeError::JsonError(_))));
    }

    #[test]
    fn test_report_ids_are_unique() {
        let engine = InsightsEngine::new();
        let first = engine.compute(&InsightsInput::default(), now()).unwrap();
        let second = engine.compute(&InsightsInput::default(), now()).unwrap();

        assert_ne!(first.meta.report_id, second.meta.report_id);
        assert_eq!(first.timeline, second.timeline);
    }
}
