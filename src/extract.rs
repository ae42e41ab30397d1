//! Plan metric extraction
//!
//! Plan generators nest their numbers under schema-specific keys
//! (`nutritional_totals.calories`, `totals.duration_total_min`, per-meal item
//! lists, ...). Extraction is pluggable so the timeline never hardcodes those
//! paths: anything implementing [`MetricExtractor`] can be injected, including
//! plain closures. The defaults here follow the current generator schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::PlanRecord;

/// Pulls category-specific metrics out of a plan record
pub trait MetricExtractor<M> {
    fn extract(&self, record: &PlanRecord) -> M;
}

impl<M, F> MetricExtractor<M> for F
where
    F: Fn(&PlanRecord) -> M,
{
    fn extract(&self, record: &PlanRecord) -> M {
        self(record)
    }
}

/// Numbers tracked per diet plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DietMetrics {
    pub calories: Option<f64>,
    pub carbs: Option<f64>,
}

/// Numbers tracked per exercise plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseMetrics {
    pub minutes: Option<f64>,
    pub calories: Option<f64>,
}

/// Macronutrient grams of one diet plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    pub carbs: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
}

/// Sum over a nested collection when no precomputed total exists.
///
/// Each entry of `collection` contributes either its own total (first present
/// of `entry_fields`) or the sum of its `items` (first present of
/// `item_fields` per item). `prefer_items` decides which wins when both exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
    pub collection: String,
    pub entry_fields: Vec<String>,
    pub items: String,
    pub item_fields: Vec<String>,
    #[serde(default)]
    pub prefer_items: bool,
}

impl Rollup {
    pub fn new(collection: &str, entry_fields: &[&str], items: &str, item_fields: &[&str]) -> Self {
        Self {
            collection: collection.to_string(),
            entry_fields: owned(entry_fields),
            items: items.to_string(),
            item_fields: owned(item_fields),
            prefer_items: false,
        }
    }

    pub fn prefer_items(mut self) -> Self {
        self.prefer_items = true;
        self
    }

    fn resolve(&self, fields: &Map<String, Value>) -> Option<f64> {
        let entries = lookup(fields, &self.collection)?.as_array()?;

        let mut total = None;
        for entry in entries {
            let own = first_number(entry, &self.entry_fields);
            let from_items = self.sum_items(entry);
            let value = if self.prefer_items {
                from_items.or(own)
            } else {
                own.or(from_items)
            };
            if let Some(v) = value {
                total = Some(total.unwrap_or(0.0) + v);
            }
        }
        total
    }

    fn sum_items(&self, entry: &Value) -> Option<f64> {
        let items = lookup_in(entry, &self.items)?.as_array()?;
        items
            .iter()
            .filter_map(|item| first_number(item, &self.item_fields))
            .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
    }
}

/// Where to find one metric: dotted paths tried in order, then an optional
/// rollup over a nested collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPath {
    pub paths: Vec<String>,
    #[serde(default)]
    pub rollup: Option<Rollup>,
}

impl FieldPath {
    pub fn new(paths: &[&str]) -> Self {
        Self {
            paths: owned(paths),
            rollup: None,
        }
    }

    pub fn with_rollup(mut self, rollup: Rollup) -> Self {
        self.rollup = Some(rollup);
        self
    }

    /// Resolve the metric from a record; `None` when nothing matches
    pub fn resolve(&self, record: &PlanRecord) -> Option<f64> {
        self.paths
            .iter()
            .find_map(|path| lookup(&record.fields, path).and_then(as_number))
            .or_else(|| {
                self.rollup
                    .as_ref()
                    .and_then(|rollup| rollup.resolve(&record.fields))
            })
    }
}

/// Diet extractor driven by field paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietExtractor {
    pub calories: FieldPath,
    pub carbs: FieldPath,
}

impl Default for DietExtractor {
    fn default() -> Self {
        Self {
            calories: FieldPath::new(&["nutritional_totals.calories", "total_calories"])
                .with_rollup(meal_rollup(&["calories", "nutrition.calories", "total_calories"])),
            carbs: FieldPath::new(&[
                "nutritional_totals.carbs",
                "nutritional_totals.carbohydrates",
                "total_carbs",
            ])
            .with_rollup(meal_rollup(&[
                "carbs",
                "carbohydrates",
                "nutrition.carbs",
                "nutrition.carbohydrates",
                "total_carbs",
            ])),
        }
    }
}

impl MetricExtractor<DietMetrics> for DietExtractor {
    fn extract(&self, record: &PlanRecord) -> DietMetrics {
        DietMetrics {
            calories: self.calories.resolve(record),
            carbs: self.carbs.resolve(record),
        }
    }
}

/// Exercise extractor driven by field paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseExtractor {
    pub minutes: FieldPath,
    pub calories: FieldPath,
}

impl Default for ExerciseExtractor {
    fn default() -> Self {
        Self {
            minutes: FieldPath::new(&["totals.duration_total_min", "total_duration_min"])
                .with_rollup(Rollup::new(
                    "sessions",
                    &["total_duration_min"],
                    "items",
                    &["duration_min", "duration", "duration_minutes"],
                )),
            calories: FieldPath::new(&["totals.calories_total", "total_estimated_calories"])
                .with_rollup(Rollup::new(
                    "sessions",
                    &["total_estimated_calories"],
                    "items",
                    &["estimated_calories", "calories_burned", "calories"],
                )),
        }
    }
}

impl MetricExtractor<ExerciseMetrics> for ExerciseExtractor {
    fn extract(&self, record: &PlanRecord) -> ExerciseMetrics {
        ExerciseMetrics {
            minutes: self.minutes.resolve(record),
            calories: self.calories.resolve(record),
        }
    }
}

/// Macronutrient extractor driven by field paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroExtractor {
    pub carbs: FieldPath,
    pub protein: FieldPath,
    pub fat: FieldPath,
    pub fiber: FieldPath,
}

impl Default for MacroExtractor {
    fn default() -> Self {
        let macro_path = |totals_key: &str, aliases: &[&str]| {
            let total = format!("nutritional_totals.{totals_key}");
            let flat = format!("total_{totals_key}");
            FieldPath::new(&[total.as_str(), flat.as_str()]).with_rollup(meal_rollup(aliases))
        };

        Self {
            carbs: macro_path(
                "carbs",
                &["carbs", "carbohydrates", "nutrition.carbs", "nutrition.carbohydrates"],
            ),
            protein: macro_path(
                "protein",
                &["protein", "proteins", "nutrition.protein", "nutrition.proteins"],
            ),
            fat: macro_path("fat", &["fat", "fats", "nutrition.fat", "nutrition.fats"]),
            fiber: macro_path("fiber", &["fiber", "nutrition.fiber"]),
        }
    }
}

impl MetricExtractor<MacroTotals> for MacroExtractor {
    fn extract(&self, record: &PlanRecord) -> MacroTotals {
        MacroTotals {
            carbs: self.carbs.resolve(record),
            protein: self.protein.resolve(record),
            fat: self.fat.resolve(record),
            fiber: self.fiber.resolve(record),
        }
    }
}

/// Meals carry per-item nutrition; item sums win over meal-level totals.
fn meal_rollup(fields: &[&str]) -> Rollup {
    Rollup::new("meals", fields, "items", fields).prefer_items()
}

/// Look up a dotted path (`a.b.0.c`) in a record's fields
pub(crate) fn lookup<'a>(fields: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let root = fields.get(segments.next()?)?;
    segments.try_fold(root, step)
}

/// Look up a dotted path inside an arbitrary JSON value
pub(crate) fn lookup_in<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, step)
}

pub(crate) fn first_number(value: &Value, paths: &[String]) -> Option<f64> {
    paths
        .iter()
        .find_map(|path| lookup_in(value, path).and_then(as_number))
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Numbers, or numeric strings, that are finite
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
