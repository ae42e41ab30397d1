//! Core types for the Glyco Insights engine
//!
//! This module defines the raw records supplied by upstream services and the
//! derived values produced at each stage: classified metrics, the daily
//! timeline, consistency statistics, the next-action recommendation and the
//! activity feed. Derived values are recomputed on every call and never stored.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ComputeError;
use crate::normalizer::DateLike;

/// Severity band shared by every classified metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// Metrics the classifier knows how to band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Bmi,
    Hba1c,
    FastingGlucose,
    BloodPressure,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Bmi => "bmi",
            MetricKind::Hba1c => "hba1c",
            MetricKind::FastingGlucose => "fasting_glucose",
            MetricKind::BloodPressure => "blood_pressure",
        }
    }
}

impl FromStr for MetricKind {
    type Err = ComputeError;

    /// Accepts snake_case, kebab-case and common short forms ("bp", "glucose")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bmi" => Ok(MetricKind::Bmi),
            "hba1c" | "a1c" => Ok(MetricKind::Hba1c),
            "fasting_glucose" | "glucose" => Ok(MetricKind::FastingGlucose),
            "blood_pressure" | "bp" => Ok(MetricKind::BloodPressure),
            other => Err(ComputeError::ParseError(format!("unknown metric kind '{other}'"))),
        }
    }
}

/// Display value of a classified metric. Blood pressure renders as "120/80".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

/// A raw value mapped onto a qualitative band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedMetric {
    pub kind: MetricKind,
    pub value: MetricValue,
    pub label: String,
    pub severity: Severity,
    /// Gauge fill percentage. Lab gauges may exceed 100 (capped per metric).
    pub percent: u32,
}

/// Height and weight from the personal-info service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropometricRecord {
    #[serde(default, alias = "heightCm", alias = "height")]
    pub height_cm: Option<f64>,
    #[serde(default, alias = "weightKg", alias = "weight")]
    pub weight_kg: Option<f64>,
}

/// Most recent HbA1c lab result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hba1cResult {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub date: Option<DateLike>,
}

/// Most recent fasting glucose lab result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlucoseResult {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Last recorded blood pressure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BloodPressureReading {
    #[serde(default)]
    pub systolic: Option<f64>,
    #[serde(default)]
    pub diastolic: Option<f64>,
}

/// Lab values from the medical-info service. Every sub-field is independent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabSnapshot {
    #[serde(default)]
    pub hba1c: Option<Hba1cResult>,
    #[serde(default, alias = "fastingGlucose")]
    pub fasting_glucose: Option<GlucoseResult>,
    #[serde(default, alias = "bloodPressure")]
    pub blood_pressure: Option<BloodPressureReading>,
}

/// Classified lab panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabInsights {
    pub hba1c: Option<ClassifiedMetric>,
    pub fasting_glucose: Option<ClassifiedMetric>,
    pub blood_pressure: Option<ClassifiedMetric>,
}

/// Plan category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanCategory {
    Diet,
    Exercise,
    Lifestyle,
}

impl PlanCategory {
    pub const ALL: [PlanCategory; 3] = [
        PlanCategory::Diet,
        PlanCategory::Exercise,
        PlanCategory::Lifestyle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanCategory::Diet => "diet",
            PlanCategory::Exercise => "exercise",
            PlanCategory::Lifestyle => "lifestyle",
        }
    }
}

/// One day's generated plan for one category.
///
/// The category-specific payload is kept as the upstream document so that
/// metric extraction stays decoupled from the generator's schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    #[serde(default, alias = "targetDate")]
    pub target_date: Option<DateLike>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PlanRecord {
    /// Create a record for the given target date with an empty payload
    pub fn new(target_date: impl Into<DateLike>) -> Self {
        Self {
            target_date: Some(target_date.into()),
            fields: Map::new(),
        }
    }

    /// Attach a top-level payload field
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

/// One calendar day of the trend window.
///
/// Numeric fields are `None` only when the category has no plan that day; a
/// plan whose payload lacks the metric reports `Some(0.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTimelineEntry {
    /// ISO date key (YYYY-MM-DD, UTC)
    pub date_key: String,
    /// Short display label, e.g. "05 March"
    pub label: String,
    pub diet: bool,
    pub exercise: bool,
    pub lifestyle: bool,
    pub diet_calories: Option<f64>,
    pub diet_carbs: Option<f64>,
    pub exercise_minutes: Option<f64>,
    pub exercise_calories: Option<f64>,
}

impl DailyTimelineEntry {
    /// Whether the category had a plan on this day
    pub fn has_plan(&self, category: PlanCategory) -> bool {
        match category {
            PlanCategory::Diet => self.diet,
            PlanCategory::Exercise => self.exercise,
            PlanCategory::Lifestyle => self.lifestyle,
        }
    }
}

/// Averages over the entire supplied history, independent of the window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifetimeAverages {
    pub avg_diet_calories: Option<f64>,
    pub avg_diet_carbs: Option<f64>,
    pub avg_exercise_minutes: Option<f64>,
    pub avg_exercise_calories: Option<f64>,
}

/// Completion statistics for one plan category over the window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total_days: u32,
    pub days_with_plan: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Per-category statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerCategoryStats {
    pub diet: CategoryStats,
    pub exercise: CategoryStats,
    pub lifestyle: CategoryStats,
}

impl PerCategoryStats {
    pub fn get(&self, category: PlanCategory) -> &CategoryStats {
        match category {
            PlanCategory::Diet => &self.diet,
            PlanCategory::Exercise => &self.exercise,
            PlanCategory::Lifestyle => &self.lifestyle,
        }
    }
}

/// Gamification tier earned by the consistency score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTier {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl BadgeTier {
    pub fn label(&self) -> &'static str {
        match self {
            BadgeTier::Bronze => "Bronze",
            BadgeTier::Silver => "Silver",
            BadgeTier::Gold => "Gold",
            BadgeTier::Diamond => "Diamond",
        }
    }

    /// Numeric rank, 1 (Bronze) through 4 (Diamond)
    pub fn rank(&self) -> u8 {
        match self {
            BadgeTier::Bronze => 1,
            BadgeTier::Silver => 2,
            BadgeTier::Gold => 3,
            BadgeTier::Diamond => 4,
        }
    }
}

/// Badge shown next to the consistency score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub label: String,
    pub tier: u8,
}

impl From<BadgeTier> for Badge {
    fn from(tier: BadgeTier) -> Self {
        Self {
            label: tier.label().to_string(),
            tier: tier.rank(),
        }
    }
}

/// Consistency and streak summary for the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub per_category: PerCategoryStats,
    /// Pooled completion percentage (0-100)
    pub score: u32,
    pub badge: Badge,
}

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Positive,
    Low,
}

/// The single next action suggested to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub action_key: String,
}

/// What an activity feed item reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Assessment,
    DetailsUpdated,
    TrackingCondition,
}

/// Display tone of an activity feed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityTone {
    Success,
    Warning,
    Error,
    Info,
}

impl From<Severity> for ActivityTone {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Success => ActivityTone::Success,
            Severity::Warning => ActivityTone::Warning,
            Severity::Error => ActivityTone::Error,
        }
    }
}

/// One display-ready entry of the recent activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
    pub tone: ActivityTone,
}

/// Share of carbohydrate, protein and fat across recent diet plans
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroBalance {
    pub carbs_pct: u32,
    pub protein_pct: u32,
    pub fat_pct: u32,
    pub fiber_g_per_day: f64,
    /// Number of plans that contributed
    pub plans_used: u32,
}

/// Meal bucket used by the meal-wise distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Snacks,
    Dinner,
}

impl MealSlot {
    pub const ORDER: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Snacks,
        MealSlot::Dinner,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "Breakfast",
            MealSlot::Lunch => "Lunch",
            MealSlot::Snacks => "Snacks",
            MealSlot::Dinner => "Dinner",
        }
    }
}

/// Calories and protein for one meal bucket of the latest diet plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealShare {
    pub meal: MealSlot,
    pub calories: f64,
    pub protein: f64,
}
