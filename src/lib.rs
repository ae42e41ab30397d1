//! Glyco Insights - Health insights derivation engine for diabetes self-management
//!
//! Glyco Insights turns raw health records into dashboard-ready insights
//! through a deterministic pipeline: date normalization + metric
//! classification → daily timeline → streaks and consistency → next-action
//! recommendation. The activity feed and nutrition summaries are assembled
//! alongside from the same records.
//!
//! ## Modules
//!
//! - **Classification**: BMI and lab values mapped onto severity bands
//! - **Timeline**: diet, exercise and lifestyle plans aligned on UTC days
//! - **Consistency**: streaks, pooled completion score and badge tiers
//! - **Recommendation**: ordered rule chain selecting one next action
//!
//! Every computation is a pure function of its inputs; nothing is cached or
//! persisted between calls.

pub mod classifier;
pub mod config;
pub mod consistency;
pub mod error;
pub mod extract;
pub mod feed;
pub mod normalizer;
pub mod nutrition;
pub mod pipeline;
pub mod recommendation;
pub mod timeline;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::{classify, classify_bmi, classify_labs, compute_bmi, MetricReading};
pub use config::{parse_window, InsightsConfig};
pub use consistency::compute_consistency;
pub use error::ComputeError;
pub use extract::{DietExtractor, ExerciseExtractor, MacroExtractor, MetricExtractor};
pub use feed::{assemble_feed, AssessmentSummary, DiseaseData};
pub use normalizer::{normalize, DateLike};
pub use nutrition::{macronutrient_balance, meal_distribution};
pub use pipeline::{insights_from_json, InsightsEngine, InsightsInput, InsightsReport};
pub use recommendation::{recommend, RecommendationInput, RecommendationRules};
pub use timeline::{build_timeline, PlanHistories, TimelineBuilder};

/// Engine version embedded in every report
pub const INSIGHTS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "glyco-insights";
