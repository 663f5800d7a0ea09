//! Query rewrite commands

use super::rag::joined;
use crate::app::{DecomposeArgs, EnhanceArgs, OutputFormat};
use crate::output::{render, terminal};
use crate::services;
use anyhow::Result;
use commsight_core::query::{basic_enhancement, decompose, EnhanceOptions};
use commsight_core::Config;

pub async fn run(args: EnhanceArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let query = joined(&args.query, "question")?;

    let enhanced = if args.no_llm {
        basic_enhancement(&query)
    } else {
        let enhancer = services::enhancer(config, services::llm_client(config)?);
        let options = EnhanceOptions {
            time_range: args.time_range,
            customer_context: args.customer_context,
            ..Default::default()
        };
        enhancer.enhance(&query, &options).await
    };

    print!("{}", render(&enhanced, format, terminal::format_enhanced));
    Ok(())
}

pub fn run_decompose(args: DecomposeArgs, format: OutputFormat) -> Result<()> {
    let question = joined(&args.question, "question")?;
    let parts = decompose(&question);

    print!(
        "{}",
        render(parts.as_slice(), format, terminal::format_numbered)
    );
    Ok(())
}
