//! Free text in, typed reports out
//!
//! Every operation tries the model's JSON first, then pattern extraction
//! over whatever text is at hand, then a labeled minimal object.

use super::trends::{
    detect_granularity, direction_for_change, half_over_half_change, outliers,
};
use super::types::*;
use crate::config::FormatterConfig;
use crate::error::Result;
use crate::index::truncate_chars;
use crate::llm::{
    f64_field, parse_json_object, str_field, string_list, templates, with_deadline,
    CallOptions, LLMClient, PromptTemplates,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

lazy_static! {
    static ref SUMMARY_LINE: Regex = Regex::new(
        r"(?im)^\s*(?:#+\s*)?(?:\*\*)?(?:summary|conclusion|key finding|bottom line)s?(?:\*\*)?\s*[:\-]\s*(.+)$"
    )
    .unwrap();
    static ref BULLET: Regex = Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+)$").unwrap();
    static ref PERCENT: Regex = Regex::new(r"([-+]?\d+(?:\.\d+)?)\s*%").unwrap();
    static ref RISING: Regex =
        Regex::new(r"(?i)\b(increas\w*|ris(?:e|es|ing)|rose|grow\w*|up(?:ward)?|spik\w*)\b").unwrap();
    static ref FALLING: Regex =
        Regex::new(r"(?i)\b(decreas\w*|declin\w*|fall\w*|drop\w*|down(?:ward)?)\b").unwrap();
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?](?:\s|$)|\n").unwrap();
    static ref CRITICAL_WORDS: Regex =
        Regex::new(r"(?i)\b(critical|urgent|severe|outage|fraud)\b").unwrap();
    static ref WARNING_WORDS: Regex =
        Regex::new(r"(?i)\b(increas\w*|risk|concern\w*|complain\w*|escalat\w*)\b").unwrap();
}

const FORMAT_SYSTEM_PROMPT: &str = "You turn analyst notes about customer communications into \
    structured reports. Output ONLY valid JSON.";

const HEURISTIC_CONFIDENCE: f64 = 0.5;
const FALLBACK_CONFIDENCE: f64 = 0.3;
const MAX_HEURISTIC_ITEMS: usize = 5;
const MAX_CARD_INSIGHTS: usize = 3;

pub struct ResponseFormatter {
    client: Arc<dyn LLMClient>,
    templates: Arc<dyn PromptTemplates>,
    config: FormatterConfig,
}

impl ResponseFormatter {
    pub fn new(
        client: Arc<dyn LLMClient>,
        templates: Arc<dyn PromptTemplates>,
        config: FormatterConfig,
    ) -> Self {
        Self {
            client,
            templates,
            config,
        }
    }

    async fn call(&self, operation: &str, template: &str, vars: &[(&str, &str)]) -> Result<String> {
        let prompt = self.templates.render_named(template, vars)?;
        let options = CallOptions::bucket(self.config.rate_limit_key.clone());
        let response = with_deadline(
            operation,
            self.config.timeout(),
            self.client.prompt(&prompt, Some(FORMAT_SYSTEM_PROMPT), &options),
        )
        .await?;
        tracing::debug!("Raw {} response: {}", operation, response);
        Ok(response)
    }

    /// Call the model, logging and discarding failures
    async fn call_or_none(
        &self,
        operation: &str,
        template: &str,
        vars: &[(&str, &str)],
    ) -> Option<String> {
        match self.call(operation, template, vars).await {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!("{} failed: {}, using local extraction", operation, e);
                None
            }
        }
    }

    pub async fn format_research_response(
        &self,
        question: &str,
        findings: &str,
    ) -> StructuredResearchResponse {
        let response = self
            .call_or_none(
                "research formatting",
                templates::RESEARCH_FORMAT,
                &[("question", question), ("findings", findings)],
            )
            .await;

        if let Some(json) = response.as_deref().and_then(parse_json_object) {
            if let Some(parsed) = research_from_json(question, &json) {
                return parsed;
            }
        }

        let text = response.as_deref().unwrap_or(findings);
        if let Some(parsed) = research_from_text(question, text) {
            tracing::warn!("Research response not JSON, using heuristic extraction");
            return parsed;
        }

        tracing::warn!("Research response unusable, returning fallback");
        research_fallback(question, findings)
    }

    pub async fn generate_insight_card(&self, topic: &str, finding: &str) -> InsightCard {
        let response = self
            .call_or_none(
                "insight card",
                templates::INSIGHT_CARD,
                &[("topic", topic), ("finding", finding)],
            )
            .await;

        if let Some(json) = response.as_deref().and_then(parse_json_object) {
            if let Some(card) = card_from_json(topic, &json) {
                return card;
            }
        }

        let text = response.as_deref().unwrap_or(finding);
        if let Some(card) = card_from_text(topic, text) {
            tracing::warn!("Insight card not JSON, using line extraction");
            return card;
        }

        tracing::warn!("Insight card unusable, returning fallback");
        card_fallback(topic, finding)
    }

    /// Analyze a metric series: LLM JSON, then prose extraction, then the
    /// statistical fallback.
    ///
    /// Points are sorted by timestamp before anything else happens, so the
    /// granularity comes from the gap between the two earliest points rather
    /// than the first two in caller order. Unordered input (e.g. from a file)
    /// then gets the same framing as the ordered series.
    pub async fn analyze_trends(&self, metric: &str, points: &[DataPoint]) -> TrendAnalysis {
        let mut points = points.to_vec();
        points.sort_by_key(|p| p.timestamp);
        let granularity = detect_granularity(&points);

        if points.len() < 2 {
            return trend_fallback(metric, granularity, &points);
        }

        let data = points
            .iter()
            .map(|p| match &p.label {
                Some(label) => format!("{} ({}): {}", p.timestamp.to_rfc3339(), label, p.value),
                None => format!("{}: {}", p.timestamp.to_rfc3339(), p.value),
            })
            .collect::<Vec<_>>()
            .join("\n");

        let response = self
            .call_or_none(
                "trend analysis",
                templates::TREND_ANALYSIS,
                &[
                    ("granularity", granularity.as_str()),
                    ("metric", metric),
                    ("data", &data),
                ],
            )
            .await;

        if let Some(text) = response.as_deref() {
            if let Some(json) = parse_json_object(text) {
                return trend_from_json(metric, granularity, &points, &json);
            }
            if let Some(analysis) = trend_from_text(metric, granularity, text) {
                tracing::warn!("Trend analysis not JSON, using pattern extraction");
                return analysis;
            }
        }

        trend_fallback(metric, granularity, &points)
    }
}

/// Up to three findings in one sentence; confidence grows with sources
pub fn create_quick_summary(findings: &[String], source_count: usize) -> QuickSummary {
    let picked: Vec<&str> = findings
        .iter()
        .map(|f| f.trim().trim_end_matches('.'))
        .filter(|f| !f.is_empty())
        .take(3)
        .collect();

    let summary = match picked.as_slice() {
        [] => "No findings to summarize.".to_string(),
        [one] => format!("{}.", one),
        [first, second] => format!("{} and {}.", first, lowercase_first(second)),
        [first, second, third, ..] => format!(
            "{}, {}, and {}.",
            first,
            lowercase_first(second),
            lowercase_first(third)
        ),
    };

    QuickSummary {
        summary,
        confidence: (0.5 + 0.1 * source_count as f64).min(0.95),
        source_count,
    }
}

/// Lower-case the first letter unless the word looks like an acronym
fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match (chars.next(), s.chars().nth(1)) {
        (Some(first), Some(second)) if !second.is_uppercase() => {
            first.to_lowercase().chain(chars).collect()
        }
        _ => s.to_string(),
    }
}

fn research_from_json(question: &str, json: &Value) -> Option<StructuredResearchResponse> {
    let summary = str_field(json, "summary")?;
    let key_findings = json
        .get("keyFindings")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(KeyFinding {
                        finding: s.clone(),
                        evidence: String::new(),
                        confidence: HEURISTIC_CONFIDENCE,
                    }),
                    _ => Some(KeyFinding {
                        finding: str_field(item, "finding")?,
                        evidence: str_field(item, "evidence").unwrap_or_default(),
                        confidence: f64_field(item, "confidence")
                            .filter(|c| c.is_finite())
                            .map_or(HEURISTIC_CONFIDENCE, |c| c.clamp(0.0, 1.0)),
                    }),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(StructuredResearchResponse {
        question: question.to_string(),
        summary,
        key_findings,
        recommendations: string_list(json, "recommendations"),
        limitations: string_list(json, "limitations"),
        follow_up_questions: string_list(json, "followUpQuestions"),
        parse_mode: ParseMode::Json,
    })
}

fn bullets(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| BULLET.captures(line))
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn research_from_text(question: &str, text: &str) -> Option<StructuredResearchResponse> {
    let summary = SUMMARY_LINE
        .captures(text)
        .map(|caps| caps[1].trim().to_string());
    let items = bullets(text);
    if summary.is_none() && items.is_empty() {
        return None;
    }

    let summary = summary
        .or_else(|| first_sentence(text))
        .unwrap_or_else(|| items[0].clone());
    let key_findings = items
        .into_iter()
        .take(MAX_HEURISTIC_ITEMS)
        .map(|finding| KeyFinding {
            finding,
            evidence: "Extracted from unstructured text".to_string(),
            confidence: HEURISTIC_CONFIDENCE,
        })
        .collect();

    Some(StructuredResearchResponse {
        question: question.to_string(),
        summary,
        key_findings,
        recommendations: Vec::new(),
        limitations: vec!["Structure was inferred from free text".to_string()],
        follow_up_questions: Vec::new(),
        parse_mode: ParseMode::Heuristic,
    })
}

fn research_fallback(question: &str, findings: &str) -> StructuredResearchResponse {
    StructuredResearchResponse {
        question: question.to_string(),
        summary: "Automated formatting unavailable; raw findings are shown as-is.".to_string(),
        key_findings: vec![KeyFinding {
            finding: truncate_chars(findings.trim(), 500),
            evidence: "Unprocessed findings".to_string(),
            confidence: FALLBACK_CONFIDENCE,
        }],
        recommendations: vec!["Review the raw findings manually".to_string()],
        limitations: vec!["The findings could not be structured automatically".to_string()],
        follow_up_questions: vec![format!("Rephrase and retry: {}", question)],
        parse_mode: ParseMode::Fallback,
    }
}

fn card_from_json(topic: &str, json: &Value) -> Option<InsightCard> {
    let headline = str_field(json, "headline")?;
    let insights = json
        .get("insights")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(Insight {
                        label: str_field(item, "label")?,
                        value: str_field(item, "value").unwrap_or_default(),
                        trend: str_field(item, "trend")
                            .map_or(Trend::Flat, |t| Trend::parse(&t)),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(InsightCard {
        title: str_field(json, "title").unwrap_or_else(|| topic.to_string()),
        headline,
        insights,
        severity: str_field(json, "severity").map_or(Severity::Info, |s| Severity::parse(&s)),
        action_items: string_list(json, "actionItems"),
        parse_mode: ParseMode::Json,
    })
}

fn card_from_text(topic: &str, text: &str) -> Option<InsightCard> {
    let lines: Vec<String> = text
        .lines()
        .map(|line| match BULLET.captures(line) {
            Some(caps) => caps[1].trim().to_string(),
            None => line.trim().to_string(),
        })
        .filter(|line| !line.is_empty())
        .collect();
    let (headline, rest) = lines.split_first()?;

    let insights = rest
        .iter()
        .take(MAX_CARD_INSIGHTS)
        .enumerate()
        .map(|(i, line)| Insight {
            label: format!("Insight {}", i + 1),
            value: line.clone(),
            trend: trend_in(line),
        })
        .collect();

    Some(InsightCard {
        title: topic.to_string(),
        headline: headline.clone(),
        insights,
        severity: severity_in(text),
        action_items: Vec::new(),
        parse_mode: ParseMode::Heuristic,
    })
}

fn card_fallback(topic: &str, finding: &str) -> InsightCard {
    InsightCard {
        title: topic.to_string(),
        headline: "Insight unavailable".to_string(),
        insights: vec![Insight {
            label: "Finding".to_string(),
            value: truncate_chars(finding.trim(), 200),
            trend: Trend::Flat,
        }],
        severity: Severity::Info,
        action_items: vec!["Review the underlying finding".to_string()],
        parse_mode: ParseMode::Fallback,
    }
}

fn trend_in(text: &str) -> Trend {
    match (RISING.is_match(text), FALLING.is_match(text)) {
        (true, false) => Trend::Up,
        (false, true) => Trend::Down,
        _ => Trend::Flat,
    }
}

fn severity_in(text: &str) -> Severity {
    if CRITICAL_WORDS.is_match(text) {
        Severity::Critical
    } else if WARNING_WORDS.is_match(text) {
        Severity::Warning
    } else {
        Severity::Info
    }
}

fn trend_from_json(
    metric: &str,
    granularity: Granularity,
    points: &[DataPoint],
    json: &Value,
) -> TrendAnalysis {
    let computed = half_over_half_change(points);
    let change_percent = f64_field(json, "changePercent")
        .filter(|c| c.is_finite())
        .unwrap_or(computed);
    let direction = str_field(json, "direction")
        .and_then(|d| TrendDirection::parse(&d))
        .unwrap_or_else(|| direction_for_change(change_percent));

    let anomalies = json
        .get("anomalies")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(Anomaly {
                        period: str_field(item, "period")?,
                        description: str_field(item, "description").unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    TrendAnalysis {
        metric: metric.to_string(),
        granularity,
        direction,
        change_percent,
        summary: str_field(json, "summary")
            .unwrap_or_else(|| describe_change(metric, direction, change_percent)),
        anomalies,
        drivers: string_list(json, "drivers"),
        forecast: str_field(json, "forecast").unwrap_or_else(|| "No forecast provided".to_string()),
        parse_mode: ParseMode::Json,
    }
}

fn trend_from_text(metric: &str, granularity: Granularity, text: &str) -> Option<TrendAnalysis> {
    let change_percent = PERCENT
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok());
    let direction = match trend_in(text) {
        Trend::Up => Some(TrendDirection::Increasing),
        Trend::Down => Some(TrendDirection::Decreasing),
        Trend::Flat => None,
    };
    if change_percent.is_none() && direction.is_none() {
        return None;
    }

    let direction = direction.unwrap_or_else(|| direction_for_change(change_percent.unwrap_or(0.0)));
    Some(TrendAnalysis {
        metric: metric.to_string(),
        granularity,
        direction,
        change_percent: change_percent.unwrap_or(0.0),
        summary: first_sentence(text)
            .unwrap_or_else(|| describe_change(metric, direction, change_percent.unwrap_or(0.0))),
        anomalies: Vec::new(),
        drivers: Vec::new(),
        forecast: "No forecast provided".to_string(),
        parse_mode: ParseMode::Heuristic,
    })
}

/// Statistical analysis with no model input
pub fn trend_fallback(metric: &str, granularity: Granularity, points: &[DataPoint]) -> TrendAnalysis {
    let change_percent = half_over_half_change(points);
    let direction = direction_for_change(change_percent);
    let summary = if points.len() < 2 {
        format!(
            "Statistical fallback: not enough data points ({}) to analyze {}.",
            points.len(),
            metric
        )
    } else {
        format!("Statistical fallback: {}", describe_change(metric, direction, change_percent))
    };

    let anomalies = outliers(points)
        .into_iter()
        .map(|p| Anomaly {
            period: p.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            description: format!("Value {} is more than two standard deviations from the mean", p.value),
        })
        .collect();

    TrendAnalysis {
        metric: metric.to_string(),
        granularity,
        direction,
        change_percent,
        summary,
        anomalies,
        drivers: Vec::new(),
        forecast: "Unavailable (statistical fallback)".to_string(),
        parse_mode: ParseMode::Fallback,
    }
}

fn describe_change(metric: &str, direction: TrendDirection, change_percent: f64) -> String {
    let verb = match direction {
        TrendDirection::Increasing => "increased",
        TrendDirection::Decreasing => "decreased",
        TrendDirection::Stable => "held steady",
        TrendDirection::Volatile => "fluctuated",
    };
    format!(
        "{} {} ({:+.1}% second half vs first half).",
        metric, verb, change_percent
    )
}

fn first_sentence(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let end = SENTENCE_END
        .find(trimmed)
        .map_or(trimmed.len(), |m| m.start() + 1);
    let sentence = trimmed[..end].trim();
    (!sentence.is_empty()).then(|| truncate_chars(sentence, 300))
}
