//! Retrieval and answer commands

use crate::app::{AskArgs, FilterArgs, OutputFormat, QueryArgs, SearchArgs, SimilarArgs, SummarizeArgs};
use crate::output::{render, terminal};
use crate::services;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use commsight_core::{Config, DateRange, RagRequest, SearchFilters};

pub async fn run_query(args: QueryArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let query = joined(&args.query, "question")?;
    let filters = build_filters(&args.filters)?;
    let rag = services::orchestrator(config)?;

    let request = RagRequest {
        top_k: args.top_k,
        filters,
        enhance_query: !args.no_enhance,
        use_reranking: args.rerank,
        rerank_top_k: args.rerank_top_k,
        customer_context: args.customer_context,
        ..RagRequest::new(query)
    };
    let response = rag.query(&request).await?;

    print!("{}", render(&response, format, terminal::format_rag_response));
    Ok(())
}

pub async fn run_search(args: SearchArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let query = joined(&args.query, "query")?;
    let filters = build_filters(&args.filters)?;
    let rag = services::orchestrator(config)?;

    let results = rag.semantic_search(&query, args.top_k, &filters).await?;

    print!(
        "{}",
        render(results.as_slice(), format, |r| terminal::format_results(r, args.full))
    );
    Ok(())
}

pub async fn run_similar(args: SimilarArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let rag = services::orchestrator(config)?;
    let results = rag.find_similar(&args.id, args.top_k).await?;

    print!(
        "{}",
        render(results.as_slice(), format, |r| terminal::format_results(r, false))
    );
    Ok(())
}

pub async fn run_ask(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let question = joined(&args.question, "question")?;
    let rag = services::orchestrator(config)?;

    let response = rag.ask_about_customer(&args.customer, &question).await?;

    print!("{}", render(&response, format, terminal::format_rag_response));
    Ok(())
}

pub async fn run_summarize(args: SummarizeArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let rag = services::orchestrator(config)?;
    let summary = rag.summarize_customer_communications(&args.customer).await?;

    print!("{}", render(&summary, format, terminal::format_customer_summary));
    Ok(())
}

/// Words joined with spaces; empty input is an error
pub(crate) fn joined(words: &[String], what: &str) -> Result<String> {
    let text = words.join(" ").trim().to_string();
    if text.is_empty() {
        bail!(commsight_core::CommsightError::InvalidInput(format!("a {} is required", what)));
    }
    Ok(text)
}

fn build_filters(args: &FilterArgs) -> Result<SearchFilters> {
    let start = args
        .since
        .as_deref()
        .map(|s| parse_timestamp(s, false))
        .transpose()?;
    let end = args
        .until
        .as_deref()
        .map(|s| parse_timestamp(s, true))
        .transpose()?;

    Ok(SearchFilters {
        channels: args.channels.clone(),
        customer_id: args.customer.clone(),
        sentiments: args.sentiments.clone(),
        tags: args.tags.clone(),
        date_range: (start.is_some() || end.is_some()).then_some(DateRange { start, end }),
        ..Default::default()
    })
}

/// RFC 3339, or a bare date taken as the start (or end) of that day in UTC
fn parse_timestamp(value: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD or RFC 3339", value))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    match time {
        Some(t) => Ok(t.and_utc()),
        None => bail!("Invalid date '{}'", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_from_args() {
        let args = FilterArgs {
            channels: vec!["email".into()],
            since: Some("2024-03-01".into()),
            until: Some("2024-03-31".into()),
            ..Default::default()
        };
        let filters = build_filters(&args).unwrap();
        let range = filters.date_range.unwrap();
        assert_eq!(range.start.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(range.end.unwrap().to_rfc3339(), "2024-03-31T23:59:59+00:00");
        assert_eq!(filters.channels, vec!["email"]);
    }

    #[test]
    fn test_no_dates_no_range() {
        let filters = build_filters(&FilterArgs::default()).unwrap();
        assert!(filters.is_empty());
    }

    #[test]
    fn test_bad_date_rejected() {
        let args = FilterArgs {
            since: Some("March 1st".into()),
            ..Default::default()
        };
        assert!(build_filters(&args).is_err());
    }

    #[test]
    fn test_joined_requires_text() {
        assert!(joined(&[], "question").is_err());
        assert_eq!(joined(&["card".into(), "fees".into()], "q").unwrap(), "card fees");
    }
}
