//! Index command

use crate::app::{IndexArgs, OutputFormat};
use crate::output::{render, terminal};
use crate::progress::ProgressReporter;
use crate::services;
use anyhow::Result;
use commsight_core::index::load_records;
use commsight_core::Config;

/// Index every record in the file; a failed record is reported and skipped
pub async fn run(args: IndexArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let records = load_records(&args.file)?;
    let pipeline = services::indexing_pipeline(config, services::llm_client(config)?)?;

    let mut progress = ProgressReporter::new(records.len());
    let mut reports = Vec::with_capacity(records.len());

    for (position, record) in records.iter().enumerate() {
        let document_id = record.document_id(position);
        progress.start(&document_id);

        let result = pipeline
            .index_document(
                &document_id,
                &record.render_document(),
                &record.metadata(),
                args.summary.as_deref(),
            )
            .await;
        match result {
            Ok(report) => {
                progress.succeeded();
                reports.push(report);
            }
            Err(e) => {
                progress.failed();
                tracing::warn!("Failed to index {}: {}", document_id, e);
            }
        }
    }
    progress.finish();

    print!("{}", render(reports.as_slice(), format, terminal::format_index_reports));
    Ok(())
}
