//! Response formatter parse layers: JSON, heuristic extraction, fallback

mod common;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use common::{request_text, ScriptedLLM};
use commsight_core::config::FormatterConfig;
use commsight_core::format::{
    DataPoint, Granularity, ParseMode, ResponseFormatter, Severity, Trend, TrendDirection,
};
use commsight_core::llm::BuiltinTemplates;
use std::sync::Arc;
use std::time::Duration;

fn formatter(llm: Arc<ScriptedLLM>) -> ResponseFormatter {
    ResponseFormatter::new(llm, Arc::new(BuiltinTemplates::new()), FormatterConfig::default())
}

fn series(values: &[f64], step: ChronoDuration) -> Vec<DataPoint> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| DataPoint {
            timestamp: start + step * i as i32,
            value,
            label: None,
        })
        .collect()
}

#[tokio::test]
async fn test_research_from_json() {
    let llm = Arc::new(ScriptedLLM::replying(
        r#"```json
{"summary": "Fee complaints doubled after the March pricing change.",
 "keyFindings": [
   {"finding": "Overdraft fee mentions up 2x", "evidence": "41 of 60 emails", "confidence": 0.9},
   "Branch visits flat"
 ],
 "recommendations": ["Review fee communication"],
 "followUpQuestions": ["Which segments churned?"]}
```"#,
    ));
    let formatter = formatter(llm.clone());

    let research = formatter
        .format_research_response("What changed in March?", "raw notes")
        .await;

    assert_eq!(research.parse_mode, ParseMode::Json);
    assert_eq!(research.question, "What changed in March?");
    assert_eq!(research.key_findings.len(), 2);
    assert_eq!(research.key_findings[0].confidence, 0.9);
    assert_eq!(research.key_findings[1].finding, "Branch visits flat");
    assert_eq!(research.follow_up_questions, vec!["Which segments churned?"]);

    let buckets = llm.buckets.lock().unwrap();
    assert_eq!(buckets[0].as_deref(), Some("response-formatting"));
}

#[tokio::test]
async fn test_research_heuristic_from_prose() {
    let llm = Arc::new(ScriptedLLM::replying(
        "Summary: Customers are frustrated by card declines.\n\n- Declines cluster at fuel stations\n- Most callers were travelling\n",
    ));
    let research = formatter(llm)
        .format_research_response("Why are customers calling?", "notes")
        .await;

    assert_eq!(research.parse_mode, ParseMode::Heuristic);
    assert_eq!(research.summary, "Customers are frustrated by card declines.");
    assert_eq!(research.key_findings.len(), 2);
    assert_eq!(research.key_findings[0].finding, "Declines cluster at fuel stations");
}

#[tokio::test]
async fn test_research_failure_extracts_from_findings() {
    let llm = Arc::new(ScriptedLLM::failing("backend down"));
    let research = formatter(llm)
        .format_research_response("Q?", "- Refunds take ten days\n- Agents lack status tools")
        .await;

    assert_eq!(research.parse_mode, ParseMode::Heuristic);
    assert_eq!(research.key_findings.len(), 2);
}

#[tokio::test]
async fn test_research_fallback_when_nothing_usable() {
    let llm = Arc::new(ScriptedLLM::failing("backend down"));
    let research = formatter(llm)
        .format_research_response("Why churn?", "   plain unstructured notes   ")
        .await;

    assert_eq!(research.parse_mode, ParseMode::Fallback);
    assert_eq!(research.key_findings[0].finding, "plain unstructured notes");
    assert_eq!(research.key_findings[0].confidence, 0.3);
    assert!(!research.summary.is_empty());
}

#[tokio::test]
async fn test_insight_card_json_and_heuristic() {
    let json = Arc::new(ScriptedLLM::replying(
        r#"{"headline": "Fraud alerts spiking", "severity": "high",
            "insights": [{"label": "Alerts", "value": "+40%", "trend": "rising"}],
            "actionItems": ["Staff the fraud line"]}"#,
    ));
    let card = formatter(json).generate_insight_card("Fraud", "notes").await;
    assert_eq!(card.parse_mode, ParseMode::Json);
    assert_eq!(card.title, "Fraud");
    assert_eq!(card.severity, Severity::Critical);
    assert_eq!(card.insights[0].trend, Trend::Up);

    let prose = Arc::new(ScriptedLLM::replying(
        "Complaints about app logins increased\n- Login errors rose after the update\n- Password resets dropped",
    ));
    let card = formatter(prose).generate_insight_card("App", "notes").await;
    assert_eq!(card.parse_mode, ParseMode::Heuristic);
    assert_eq!(card.headline, "Complaints about app logins increased");
    assert_eq!(card.severity, Severity::Warning);
    assert_eq!(card.insights[0].trend, Trend::Up);
    assert_eq!(card.insights[1].trend, Trend::Down);
}

#[tokio::test]
async fn test_insight_card_fallback_on_empty() {
    let llm = Arc::new(ScriptedLLM::failing("down"));
    let card = formatter(llm).generate_insight_card("Topic", "   ").await;
    assert_eq!(card.parse_mode, ParseMode::Fallback);
    assert_eq!(card.title, "Topic");
}

#[tokio::test]
async fn test_two_points_one_day_apart_are_daily() {
    let llm = Arc::new(ScriptedLLM::replying(
        r#"{"direction": "increasing", "changePercent": 50, "summary": "Volume rose."}"#,
    ));
    let formatter = formatter(llm.clone());

    let analysis = formatter
        .analyze_trends("complaints", &series(&[10.0, 15.0], ChronoDuration::days(1)))
        .await;

    assert_eq!(analysis.granularity, Granularity::Daily);
    assert_eq!(analysis.parse_mode, ParseMode::Json);
    assert_eq!(analysis.direction, TrendDirection::Increasing);
    assert_eq!(analysis.change_percent, 50.0);

    let requests = llm.requests.lock().unwrap();
    assert!(request_text(&requests[0]).contains("daily"));
}

#[tokio::test]
async fn test_trend_points_sorted_before_analysis() {
    let llm = Arc::new(ScriptedLLM::failing("down"));
    let mut points = series(&[10.0, 10.0, 20.0, 20.0], ChronoDuration::weeks(1));
    points.reverse();

    let analysis = formatter(llm).analyze_trends("calls", &points).await;

    assert_eq!(analysis.granularity, Granularity::Weekly);
    assert_eq!(analysis.parse_mode, ParseMode::Fallback);
    assert_eq!(analysis.direction, TrendDirection::Increasing);
    assert_eq!(analysis.change_percent, 100.0);
    assert!(analysis.summary.starts_with("Statistical fallback"));
}

#[tokio::test]
async fn test_granularity_uses_two_earliest_points() {
    let llm = Arc::new(ScriptedLLM::failing("down"));
    // caller order opens with a two-week gap; the earliest points are a day apart
    let values: Vec<f64> = (5..20).map(f64::from).collect();
    let mut points = series(&values, ChronoDuration::days(1));
    points.swap(0, 14);

    let analysis = formatter(llm).analyze_trends("calls", &points).await;

    assert_eq!(analysis.granularity, Granularity::Daily);
    assert_eq!(analysis.direction, TrendDirection::Increasing);
}

#[tokio::test]
async fn test_trend_heuristic_from_prose() {
    let llm = Arc::new(ScriptedLLM::replying(
        "Chat volume dropped 12.5% over the period. Weekends were quiet.",
    ));
    let analysis = formatter(llm)
        .analyze_trends("chats", &series(&[8.0, 7.0, 7.0], ChronoDuration::hours(1)))
        .await;

    assert_eq!(analysis.granularity, Granularity::Hourly);
    assert_eq!(analysis.parse_mode, ParseMode::Heuristic);
    assert_eq!(analysis.direction, TrendDirection::Decreasing);
    assert_eq!(analysis.change_percent, 12.5);
    assert_eq!(analysis.summary, "Chat volume dropped 12.5% over the period.");
}

#[tokio::test]
async fn test_single_point_skips_model() {
    let llm = Arc::new(ScriptedLLM::replying("{}"));
    let analysis = formatter(llm.clone())
        .analyze_trends("calls", &series(&[3.0], ChronoDuration::days(1)))
        .await;

    assert_eq!(llm.calls(), 0);
    assert_eq!(analysis.parse_mode, ParseMode::Fallback);
    assert_eq!(analysis.granularity, Granularity::Daily);
}

#[tokio::test(start_paused = true)]
async fn test_slow_trend_call_falls_back() {
    let llm = Arc::new(ScriptedLLM::replying("{}").with_delay(Duration::from_secs(600)));
    let analysis = formatter(llm)
        .analyze_trends("calls", &series(&[1.0, 2.0], ChronoDuration::days(1)))
        .await;
    assert_eq!(analysis.parse_mode, ParseMode::Fallback);
}
