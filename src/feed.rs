//! Recent activity feed
//!
//! Items are appended in a fixed order (assessment, details update, tracked
//! condition) and are not re-sorted by time afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::normalizer::{parse_instant, DateLike};
use crate::types::{ActivityItem, ActivityKind, ActivityTone, Severity};

/// Latest completed risk assessment. Either field may be missing upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSummary {
    #[serde(default, alias = "completedAt", alias = "last_assessment_at")]
    pub completed_at: Option<DateLike>,
    #[serde(default, alias = "riskLevel")]
    pub risk_level: Option<String>,
}

impl AssessmentSummary {
    pub fn new(completed_at: impl Into<DateLike>, risk_level: impl Into<String>) -> Self {
        Self {
            completed_at: Some(completed_at.into()),
            risk_level: Some(risk_level.into()),
        }
    }
}

/// Disease questionnaire state from the medical-info service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiseaseData {
    #[serde(default)]
    pub disease: Option<String>,
    #[serde(default, alias = "lastUpdated")]
    pub last_updated: Option<DateLike>,
    #[serde(default, alias = "answeredQuestions")]
    pub answered_questions: u32,
    #[serde(default, alias = "totalQuestions")]
    pub total_questions: u32,
}

/// Severity of an assessment risk level: low is success, medium is warning,
/// anything else is an error.
pub fn risk_severity(risk_level: &str) -> Severity {
    match risk_level.trim().to_ascii_lowercase().as_str() {
        "low" => Severity::Success,
        "medium" => Severity::Warning,
        _ => Severity::Error,
    }
}

/// Assemble the activity feed. `now` stamps the tracked-condition item.
pub fn assemble_feed(
    latest_assessment: Option<&AssessmentSummary>,
    disease_data: Option<&DiseaseData>,
    now: DateTime<Utc>,
) -> Vec<ActivityItem> {
    let mut items = Vec::with_capacity(3);

    if let Some(assessment) = latest_assessment {
        let risk_level = assessment
            .risk_level
            .as_deref()
            .map(str::trim)
            .filter(|level| !level.is_empty());

        match (assessment.completed_at.as_ref(), risk_level) {
            (Some(completed_at), Some(risk_level)) => match parse_instant(completed_at) {
                Some(occurred_at) => items.push(ActivityItem {
                    kind: ActivityKind::Assessment,
                    title: "Assessment Completed".to_string(),
                    occurred_at,
                    tone: risk_severity(risk_level).into(),
                }),
                None => warn!("skipped assessment with unparsable completion date"),
            },
            _ => debug!("skipped assessment without completion date or risk level"),
        }
    }

    let Some(data) = disease_data else {
        return items;
    };

    if let Some(updated) = data.last_updated.as_ref() {
        match parse_instant(updated) {
            Some(occurred_at) => items.push(ActivityItem {
                kind: ActivityKind::DetailsUpdated,
                title: "Disease Data Updated".to_string(),
                occurred_at,
                tone: ActivityTone::Info,
            }),
            None => warn!("skipped disease data update with unparsable date"),
        }
    }

    if let Some(disease) = data.disease.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        items.push(ActivityItem {
            kind: ActivityKind::TrackingCondition,
            title: format!("Tracking {disease}"),
            occurred_at: now,
            tone: ActivityTone::Error,
        });
    }

    items
}
