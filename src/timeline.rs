//! Daily activity timeline
//!
//! Aligns the three plan streams (diet, exercise, lifestyle) onto one
//! contiguous, oldest-first series of calendar days ending at an anchor date.
//!
//! Two aggregation scopes are kept apart on purpose:
//! - the timeline is bounded by the trend window and feeds charts and streaks
//! - [`TimelineBuilder::lifetime_averages`] spans the whole supplied history

use std::collections::HashMap;

use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::config::check_window;
use crate::error::ComputeError;
use crate::extract::{
    DietExtractor, DietMetrics, ExerciseExtractor, ExerciseMetrics, MetricExtractor,
};
use crate::normalizer::{date_key, day_label, normalize_date};
use crate::types::{DailyTimelineEntry, LifetimeAverages, PlanCategory, PlanRecord};

/// Borrowed view over the three plan histories
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanHistories<'a> {
    pub diet: &'a [PlanRecord],
    pub exercise: &'a [PlanRecord],
    pub lifestyle: &'a [PlanRecord],
}

impl<'a> PlanHistories<'a> {
    pub fn new(
        diet: &'a [PlanRecord],
        exercise: &'a [PlanRecord],
        lifestyle: &'a [PlanRecord],
    ) -> Self {
        Self {
            diet,
            exercise,
            lifestyle,
        }
    }

    pub fn get(&self, category: PlanCategory) -> &'a [PlanRecord] {
        match category {
            PlanCategory::Diet => self.diet,
            PlanCategory::Exercise => self.exercise,
            PlanCategory::Lifestyle => self.lifestyle,
        }
    }
}

/// Builds timelines using injected metric extractors
#[derive(Debug, Clone)]
pub struct TimelineBuilder<D = DietExtractor, E = ExerciseExtractor> {
    diet: D,
    exercise: E,
}

impl Default for TimelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineBuilder {
    /// Create a builder using the default generator-schema extractors
    pub fn new() -> Self {
        Self {
            diet: DietExtractor::default(),
            exercise: ExerciseExtractor::default(),
        }
    }
}

impl<D, E> TimelineBuilder<D, E>
where
    D: MetricExtractor<DietMetrics>,
    E: MetricExtractor<ExerciseMetrics>,
{
    /// Create a builder with custom extractors
    pub fn with_extractors(diet: D, exercise: E) -> Self {
        Self { diet, exercise }
    }

    /// Build `window_days` consecutive days ending at `anchor`, oldest first.
    ///
    /// Always returns exactly `window_days` entries. Fails when the window is
    /// outside [`check_window`] or would start before the earliest
    /// representable date.
    pub fn build(
        &self,
        histories: &PlanHistories<'_>,
        window_days: u32,
        anchor: NaiveDate,
    ) -> Result<Vec<DailyTimelineEntry>, ComputeError> {
        let window_days = check_window(window_days)?;
        let oldest = anchor
            .checked_sub_days(Days::new(u64::from(window_days) - 1))
            .ok_or_else(|| {
                ComputeError::InvalidWindow(format!(
                    "{window_days} days before {anchor} is out of calendar range"
                ))
            })?;

        let diet = index_by_day(PlanCategory::Diet, histories.diet);
        let exercise = index_by_day(PlanCategory::Exercise, histories.exercise);
        let lifestyle = index_by_day(PlanCategory::Lifestyle, histories.lifestyle);

        let mut timeline = Vec::with_capacity(window_days as usize);
        for day in oldest.iter_days().take(window_days as usize) {
            let diet_metrics = diet.get(&day).map(|record| self.diet.extract(record));
            let exercise_metrics = exercise
                .get(&day)
                .map(|record| self.exercise.extract(record));

            timeline.push(DailyTimelineEntry {
                date_key: date_key(day),
                label: day_label(day),
                diet: diet_metrics.is_some(),
                exercise: exercise_metrics.is_some(),
                lifestyle: lifestyle.contains_key(&day),
                diet_calories: diet_metrics.map(|m| m.calories.unwrap_or(0.0)),
                diet_carbs: diet_metrics.map(|m| m.carbs.unwrap_or(0.0)),
                exercise_minutes: exercise_metrics.map(|m| m.minutes.unwrap_or(0.0)),
                exercise_calories: exercise_metrics.map(|m| m.calories.unwrap_or(0.0)),
            });
        }

        debug!(
            window_days,
            anchor = %anchor,
            diet_days = diet.len(),
            exercise_days = exercise.len(),
            lifestyle_days = lifestyle.len(),
            "built plan timeline"
        );

        Ok(timeline)
    }

    /// Averages over every supplied record, regardless of window or date.
    ///
    /// Each average covers the records that report the metric and is rounded
    /// to a whole number; `None` when no record reports it.
    pub fn lifetime_averages(&self, histories: &PlanHistories<'_>) -> LifetimeAverages {
        let diet: Vec<DietMetrics> = histories
            .diet
            .iter()
            .map(|record| self.diet.extract(record))
            .collect();
        let exercise: Vec<ExerciseMetrics> = histories
            .exercise
            .iter()
            .map(|record| self.exercise.extract(record))
            .collect();

        LifetimeAverages {
            avg_diet_calories: rounded_mean(diet.iter().filter_map(|m| m.calories)),
            avg_diet_carbs: rounded_mean(diet.iter().filter_map(|m| m.carbs)),
            avg_exercise_minutes: rounded_mean(exercise.iter().filter_map(|m| m.minutes)),
            avg_exercise_calories: rounded_mean(exercise.iter().filter_map(|m| m.calories)),
        }
    }
}

/// Build a timeline with the default extractors. `anchor` defaults to today (UTC).
pub fn build_timeline(
    diet_history: &[PlanRecord],
    exercise_history: &[PlanRecord],
    lifestyle_history: &[PlanRecord],
    window_days: u32,
    anchor: Option<NaiveDate>,
) -> Result<Vec<DailyTimelineEntry>, ComputeError> {
    let anchor = anchor.unwrap_or_else(|| Utc::now().date_naive());
    let histories = PlanHistories::new(diet_history, exercise_history, lifestyle_history);
    TimelineBuilder::new().build(&histories, window_days, anchor)
}

/// Map each day to its first record; later same-day records are ignored.
fn index_by_day(
    category: PlanCategory,
    history: &[PlanRecord],
) -> HashMap<NaiveDate, &PlanRecord> {
    let mut by_day = HashMap::with_capacity(history.len());
    let mut skipped = 0usize;

    for record in history {
        match record.target_date.as_ref().and_then(normalize_date) {
            Some(day) => {
                by_day.entry(day).or_insert(record);
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(
            category = category.as_str(),
            skipped, "skipped plan records without a usable target date"
        );
    }

    by_day
}

fn rounded_mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| (sum / f64::from(count)).round())
}
