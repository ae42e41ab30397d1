//! Streak and consistency scoring over a daily timeline

use tracing::debug;

use crate::types::{
    BadgeTier, CategoryStats, ConsistencyReport, DailyTimelineEntry, PerCategoryStats, PlanCategory,
};

/// Lower score bound of each tier, evaluated top-down
const BADGE_THRESHOLDS: [(u32, BadgeTier); 3] = [
    (80, BadgeTier::Diamond),
    (60, BadgeTier::Gold),
    (40, BadgeTier::Silver),
];

/// Summarize plan completion over the timeline.
///
/// The score pools completed days across all categories:
/// `round(100 * sum(days_with_plan) / sum(total_days))`.
pub fn compute_consistency(timeline: &[DailyTimelineEntry]) -> ConsistencyReport {
    let per_category = PerCategoryStats {
        diet: category_stats(timeline, PlanCategory::Diet),
        exercise: category_stats(timeline, PlanCategory::Exercise),
        lifestyle: category_stats(timeline, PlanCategory::Lifestyle),
    };

    let (completed, total) = PlanCategory::ALL
        .iter()
        .map(|category| per_category.get(*category))
        .fold((0u32, 0u32), |(completed, total), stats| {
            (completed + stats.days_with_plan, total + stats.total_days)
        });

    let score = if total == 0 {
        0
    } else {
        (100.0 * f64::from(completed) / f64::from(total)).round() as u32
    };
    let badge = badge_for_score(score);

    debug!(score, completed, total, badge = badge.label(), "computed consistency");

    ConsistencyReport {
        per_category,
        score,
        badge: badge.into(),
    }
}

/// Badge tier for a pooled score
pub fn badge_for_score(score: u32) -> BadgeTier {
    BADGE_THRESHOLDS
        .iter()
        .find(|(min, _)| score >= *min)
        .map(|(_, tier)| *tier)
        .unwrap_or(BadgeTier::Bronze)
}

/// Consecutive days with a plan, counted back from the most recent entry
pub fn current_streak(timeline: &[DailyTimelineEntry], category: PlanCategory) -> u32 {
    timeline
        .iter()
        .rev()
        .take_while(|entry| entry.has_plan(category))
        .count() as u32
}

/// Longest run of consecutive days with a plan anywhere in the timeline
pub fn longest_streak(timeline: &[DailyTimelineEntry], category: PlanCategory) -> u32 {
    let mut longest = 0u32;
    let mut run = 0u32;
    for entry in timeline {
        if entry.has_plan(category) {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

fn category_stats(timeline: &[DailyTimelineEntry], category: PlanCategory) -> CategoryStats {
    CategoryStats {
        total_days: timeline.len() as u32,
        days_with_plan: timeline.iter().filter(|e| e.has_plan(category)).count() as u32,
        current_streak: current_streak(timeline, category),
        longest_streak: longest_streak(timeline, category),
    }
}

impl Default for ConsistencyReport {
    fn default() -> Self {
        compute_consistency(&[])
    }
}
