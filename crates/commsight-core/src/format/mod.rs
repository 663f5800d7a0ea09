//! Response formatting
//!
//! Research answers, insight cards and trend analyses built from model
//! output, with heuristic and labeled fallbacks so callers always receive a
//! complete object.

mod formatter;
mod trends;
mod types;

pub use formatter::{create_quick_summary, trend_fallback, ResponseFormatter};
pub use trends::{detect_granularity, direction_for_change, half_over_half_change, outliers};
pub use types::{
    Anomaly, DataPoint, Granularity, Insight, InsightCard, KeyFinding, ParseMode, QuickSummary,
    Severity, StructuredResearchResponse, Trend, TrendAnalysis, TrendDirection,
};
