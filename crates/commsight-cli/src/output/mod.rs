//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use serde::Serialize;

/// Render `value` as pretty JSON, or through `cli` for terminal output
pub fn render<T: Serialize + ?Sized>(
    value: &T,
    format: OutputFormat,
    cli: impl FnOnce(&T) -> String,
) -> String {
    match format {
        OutputFormat::Json => json::to_pretty(value),
        OutputFormat::Cli => cli(value),
    }
}
