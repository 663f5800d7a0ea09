//! Structured report shapes produced from model output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which layer produced a structured object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Brace-matched JSON from the model
    Json,
    /// Pattern extraction from free text
    Heuristic,
    /// Labeled minimal object; nothing usable came back
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFinding {
    pub finding: String,
    pub evidence: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredResearchResponse {
    pub question: String,
    pub summary: String,
    pub key_findings: Vec<KeyFinding>,
    pub recommendations: Vec<String>,
    pub limitations: Vec<String>,
    pub follow_up_questions: Vec<String>,
    pub parse_mode: ParseMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "up" | "increasing" | "rising" => Trend::Up,
            "down" | "decreasing" | "falling" => Trend::Down,
            _ => Trend::Flat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub label: String,
    pub value: String,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" | "high" => Severity::Critical,
            "warning" | "medium" => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightCard {
    pub title: String,
    pub headline: String,
    pub insights: Vec<Insight>,
    pub severity: Severity,
    pub action_items: Vec<String>,
    pub parse_mode: ParseMode,
}

/// One observation in a time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Quarterly => "quarterly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    Volatile,
}

impl TrendDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "increasing" | "up" | "rising" => Some(TrendDirection::Increasing),
            "decreasing" | "down" | "falling" => Some(TrendDirection::Decreasing),
            "stable" | "flat" => Some(TrendDirection::Stable),
            "volatile" => Some(TrendDirection::Volatile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub period: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub metric: String,
    pub granularity: Granularity,
    pub direction: TrendDirection,
    pub change_percent: f64,
    pub summary: String,
    pub anomalies: Vec<Anomaly>,
    pub drivers: Vec<String>,
    pub forecast: String,
    pub parse_mode: ParseMode,
}

/// One-sentence digest of findings, computed without the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickSummary {
    pub summary: String,
    pub confidence: f64,
    pub source_count: usize,
}
