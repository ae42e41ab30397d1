//! Nutrition summaries over diet plans
//!
//! - macronutrient balance across the most recent plans
//! - meal-wise calorie and protein split of the latest plan

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::extract::{as_number, lookup, lookup_in, MacroTotals, MetricExtractor};
use crate::normalizer::normalize_date;
use crate::types::{MacroBalance, MealShare, MealSlot, PlanRecord};

const MEAL_TYPE_FIELDS: &[&str] = &["meal_type", "type", "name"];
const CALORIE_FIELDS: &[&str] = &["calories", "nutrition.calories", "total_calories"];
const PROTEIN_FIELDS: &[&str] = &[
    "protein",
    "proteins",
    "nutrition.protein",
    "nutrition.proteins",
    "total_protein",
];

/// Macronutrient split over the `plans` most recent diet records.
///
/// Returns `None` when no dated record reports any carbohydrate, protein or fat.
pub fn macronutrient_balance<X>(
    diet_history: &[PlanRecord],
    extractor: &X,
    plans: usize,
) -> Option<MacroBalance>
where
    X: MetricExtractor<MacroTotals>,
{
    let recent = most_recent(diet_history, plans);
    if recent.is_empty() {
        return None;
    }

    let totals = recent
        .iter()
        .map(|record| extractor.extract(record))
        .fold(MacroTotals::default(), |acc, m| MacroTotals {
            carbs: add(acc.carbs, m.carbs),
            protein: add(acc.protein, m.protein),
            fat: add(acc.fat, m.fat),
            fiber: add(acc.fiber, m.fiber),
        });

    let carbs = totals.carbs.unwrap_or(0.0);
    let protein = totals.protein.unwrap_or(0.0);
    let fat = totals.fat.unwrap_or(0.0);
    let energy_grams = carbs + protein + fat;
    if energy_grams <= 0.0 {
        return None;
    }

    let share = |grams: f64| (100.0 * grams / energy_grams).round() as u32;
    let plans_used = recent.len() as u32;

    debug!(plans_used, carbs, protein, fat, "computed macronutrient balance");

    Some(MacroBalance {
        carbs_pct: share(carbs),
        protein_pct: share(protein),
        fat_pct: share(fat),
        fiber_g_per_day: (totals.fiber.unwrap_or(0.0) / f64::from(plans_used)).round(),
        plans_used,
    })
}

/// Calories and protein per meal of the latest diet plan.
///
/// Meals are bucketed by a case-insensitive match on their type or name;
/// anything unrecognized counts as a snack. Buckets without calories are
/// left out.
pub fn meal_distribution(diet_history: &[PlanRecord]) -> Vec<MealShare> {
    let Some(latest) = most_recent(diet_history, 1).into_iter().next() else {
        return Vec::new();
    };
    let Some(meals) = lookup(&latest.fields, "meals").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut shares: Vec<MealShare> = MealSlot::ORDER
        .iter()
        .map(|slot| MealShare {
            meal: *slot,
            calories: 0.0,
            protein: 0.0,
        })
        .collect();

    for meal in meals {
        let slot = meal_slot(meal);
        let (calories, protein) = match meal.get("items").and_then(Value::as_array) {
            Some(items) => items.iter().fold((0.0, 0.0), |(cal, prot), item| {
                (
                    cal + first_of(item, CALORIE_FIELDS).unwrap_or(0.0),
                    prot + first_of(item, PROTEIN_FIELDS).unwrap_or(0.0),
                )
            }),
            None => (
                first_of(meal, CALORIE_FIELDS).unwrap_or(0.0),
                first_of(meal, PROTEIN_FIELDS).unwrap_or(0.0),
            ),
        };

        if let Some(share) = shares.iter_mut().find(|s| s.meal == slot) {
            share.calories += calories;
            share.protein += protein;
        }
    }

    shares.retain(|share| share.calories > 0.0);
    shares
}

fn meal_slot(meal: &Value) -> MealSlot {
    let name = MEAL_TYPE_FIELDS
        .iter()
        .find_map(|field| meal.get(*field).and_then(Value::as_str))
        .unwrap_or_default()
        .to_lowercase();

    if name.contains("breakfast") {
        MealSlot::Breakfast
    } else if name.contains("lunch") {
        MealSlot::Lunch
    } else if name.contains("dinner") {
        MealSlot::Dinner
    } else {
        MealSlot::Snacks
    }
}

/// Dated records, newest first; ties keep input order
fn most_recent(history: &[PlanRecord], limit: usize) -> Vec<&PlanRecord> {
    let mut dated: Vec<(NaiveDate, &PlanRecord)> = history
        .iter()
        .filter_map(|record| {
            let day = record.target_date.as_ref().and_then(normalize_date)?;
            Some((day, record))
        })
        .collect();
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    dated.into_iter().take(limit).map(|(_, record)| record).collect()
}

fn first_of(value: &Value, paths: &[&str]) -> Option<f64> {
    paths
        .iter()
        .find_map(|path| lookup_in(value, path).and_then(as_number))
}

fn add(acc: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (acc, value) {
        (Some(a), Some(v)) => Some(a + v),
        (None, v) => v,
        (a, None) => a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::MacroExtractor;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn make_test_plan(date: &str, carbs: f64, protein: f64, fat: f64, fiber: f64) -> PlanRecord {
        PlanRecord::new(date).with_field(
            "nutritional_totals",
            json!({ "carbs": carbs, "protein": protein, "fat": fat, "fiber": fiber }),
        )
    }

    #[test]
    fn test_macro_balance_uses_most_recent_plans() {
        let history = vec![
            make_test_plan("2024-01-01", 500.0, 0.0, 0.0, 90.0),
            make_test_plan("2024-01-03", 200.0, 100.0, 100.0, 30.0),
            make_test_plan("2024-01-02", 200.0, 100.0, 100.0, 20.0),
        ];

        let balance = macronutrient_balance(&history, &MacroExtractor::default(), 2).unwrap();

        assert_eq!(balance.plans_used, 2);
        assert_eq!(balance.carbs_pct, 50);
        assert_eq!(balance.protein_pct, 25);
        assert_eq!(balance.fat_pct, 25);
        assert!((balance.fiber_g_per_day - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_macro_balance_from_meal_items() {
        let plan = PlanRecord::new("2024-01-05").with_field(
            "meals",
            json!([
                { "meal_type": "breakfast", "items": [
                    { "carbs": 60, "protein": 20, "fat": 10, "fiber": 8 }
                ]},
                { "meal_type": "dinner", "nutrition": { "carbs": 40, "protein": 30, "fat": 20 } }
            ]),
        );

        let balance = macronutrient_balance(&[plan], &MacroExtractor::default(), 7).unwrap();

        // 100 carbs, 50 protein, 30 fat => 180 g
        assert_eq!(balance.carbs_pct, 56);
        assert_eq!(balance.protein_pct, 28);
        assert_eq!(balance.fat_pct, 17);
        assert!((balance.fiber_g_per_day - 8.0).abs() < 0.001);
    }

    #[test]
    fn test_macro_balance_absent_without_data() {
        let extractor = MacroExtractor::default();

        assert_eq!(macronutrient_balance(&[], &extractor, 7), None);
        assert_eq!(
            macronutrient_balance(&[PlanRecord::new("2024-01-01")], &extractor, 7),
            None
        );
        assert_eq!(
            macronutrient_balance(&[PlanRecord::new("not a date")], &extractor, 7),
            None
        );
    }

    #[test]
    fn test_meal_distribution_buckets_latest_plan() {
        let older = PlanRecord::new("2024-01-01").with_field(
            "meals",
            json!([{ "meal_type": "Lunch", "calories": 999 }]),
        );
        let latest = PlanRecord::new("2024-01-02").with_field(
            "meals",
            json!([
                { "meal_type": "Breakfast", "items": [
                    { "calories": 250, "protein": 12 },
                    { "nutrition": { "calories": 150, "protein": 8 } }
                ]},
                { "name": "Mid-morning Snack", "calories": 120, "protein": 4 },
                { "type": "DINNER", "total_calories": 600, "total_protein": 35 },
                { "calories": 80 },
                { "meal_type": "lunch", "calories": 0 }
            ]),
        );

        let shares = meal_distribution(&[latest, older]);

        assert_eq!(
            shares,
            vec![
                MealShare {
                    meal: MealSlot::Breakfast,
                    calories: 400.0,
                    protein: 20.0,
                },
                MealShare {
                    meal: MealSlot::Snacks,
                    calories: 200.0,
                    protein: 4.0,
                },
                MealShare {
                    meal: MealSlot::Dinner,
                    calories: 600.0,
                    protein: 35.0,
                },
            ]
        );
    }

    #[test]
    fn test_meal_distribution_without_meals() {
        assert!(meal_distribution(&[]).is_empty());
        assert!(meal_distribution(&[PlanRecord::new("2024-01-01")]).is_empty());
    }
}
