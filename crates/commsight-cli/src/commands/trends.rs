//! Trends command

use crate::app::{OutputFormat, TrendsArgs};
use crate::output::{render, terminal};
use crate::services;
use anyhow::{Context, Result};
use commsight_core::format::{detect_granularity, trend_fallback, DataPoint};
use commsight_core::Config;

pub async fn run(args: TrendsArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let mut points: Vec<DataPoint> = serde_json::from_str(&raw)
        .map_err(|e| commsight_core::CommsightError::InvalidInput(format!(
            "{}: expected a JSON array of data points: {}",
            args.file.display(),
            e
        )))?;

    let analysis = if args.no_llm {
        points.sort_by_key(|p| p.timestamp);
        trend_fallback(&args.metric, detect_granularity(&points), &points)
    } else {
        let formatter = services::formatter(config, services::llm_client(config)?);
        formatter.analyze_trends(&args.metric, &points).await
    };

    print!("{}", render(&analysis, format, terminal::format_trend));
    Ok(())
}
