//! Retrieval-augmented answering over customer communications
//!
//! A request moves through enhancement, hybrid retrieval, optional
//! reranking and budgeted generation. Stages other than retrieval fall back
//! instead of failing, and each fallback is recorded in the response's
//! `degraded_mode`.

mod answer;
mod orchestrator;
mod types;

pub use answer::{
    build_context, clamp_confidence, excerpt, parse_answer, BudgetedContext, GeneratedAnswer,
    DEFAULT_CONFIDENCE, EXCERPT_CHARS, GENERATION_FAILED_CONFIDENCE, NO_RESULTS_ANSWER,
    PLAIN_TEXT_CONFIDENCE,
};
pub use orchestrator::{channel_tally, RagOrchestrator, CUSTOMER_TOP_K, GENERATION_BUCKET};
pub use types::{
    CustomerSummary, DegradedMode, RagRequest, RagResponse, RetrievalResult, Source,
};
