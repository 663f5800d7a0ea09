//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "commsight")]
#[command(
    author,
    version,
    about = "Ask questions of customer communications"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Config file (defaults to $COMMSIGHT_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a question from retrieved communications
    Query(QueryArgs),

    /// Retrieve communications without generating an answer
    Search(SearchArgs),

    /// Find communications similar to a stored one
    Similar(SimilarArgs),

    /// Ask a question about one customer
    Ask(AskArgs),

    /// Summarize a customer's recent communications
    Summarize(SummarizeArgs),

    /// Chunk, contextualize and index communication records
    Index(IndexArgs),

    /// Rewrite a question into search queries
    Enhance(EnhanceArgs),

    /// Split a compound question into sub-questions
    Decompose(DecomposeArgs),

    /// Split a document or records file into chunks
    Chunk(ChunkArgs),

    /// Analyze a time series of data points
    Trends(TrendsArgs),
}

/// Retrieval filters shared by query and search
#[derive(Args, Clone, Default)]
pub struct FilterArgs {
    /// Only these channels (repeatable)
    #[arg(long = "channel")]
    pub channels: Vec<String>,

    /// Only this customer
    #[arg(long)]
    pub customer: Option<String>,

    /// Only these sentiments (repeatable)
    #[arg(long = "sentiment")]
    pub sentiments: Vec<String>,

    /// Only these tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Earliest timestamp (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<String>,

    /// Latest timestamp (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<String>,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Question
    pub query: Vec<String>,

    /// Number of documents to retrieve
    #[arg(short = 'n', long)]
    pub top_k: Option<usize>,

    /// Rerank retrieved documents
    #[arg(long)]
    pub rerank: bool,

    /// Documents kept after reranking
    #[arg(long)]
    pub rerank_top_k: Option<usize>,

    /// Search with the question as typed
    #[arg(long)]
    pub no_enhance: bool,

    /// Extra context for the query rewrite
    #[arg(long)]
    pub customer_context: Option<String>,

    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    pub query: Vec<String>,

    /// Number of results
    #[arg(short = 'n', long)]
    pub top_k: Option<usize>,

    /// Show full document content
    #[arg(long)]
    pub full: bool,

    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Args)]
pub struct SimilarArgs {
    /// Document id
    pub id: String,

    /// Number of results
    #[arg(short = 'n', long)]
    pub top_k: Option<usize>,
}

#[derive(Args)]
pub struct AskArgs {
    /// Customer id
    pub customer: String,

    /// Question
    pub question: Vec<String>,
}

#[derive(Args)]
pub struct SummarizeArgs {
    /// Customer id
    pub customer: String,
}

#[derive(Args)]
pub struct IndexArgs {
    /// Records file (YAML or JSON)
    pub file: PathBuf,

    /// Summary passed along with every record's document context
    #[arg(long)]
    pub summary: Option<String>,
}

#[derive(Args)]
pub struct EnhanceArgs {
    /// Question
    pub query: Vec<String>,

    /// Time range description, e.g. "last 30 days"
    #[arg(long)]
    pub time_range: Option<String>,

    /// Extra context about the customer
    #[arg(long)]
    pub customer_context: Option<String>,

    /// Use the synonym heuristic only
    #[arg(long)]
    pub no_llm: bool,
}

#[derive(Args)]
pub struct DecomposeArgs {
    /// Question
    pub question: Vec<String>,
}

#[derive(Args)]
pub struct ChunkArgs {
    /// Records file (.yml, .yaml, .json) or plain text document
    pub file: PathBuf,

    /// Chunk size in bytes
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Overlap in bytes
    #[arg(long)]
    pub overlap: Option<usize>,

    /// Minimum chunk size in bytes
    #[arg(long)]
    pub min_chunk_size: Option<usize>,

    /// Generate context prefixes through the LLM
    #[arg(long)]
    pub contextualize: bool,
}

#[derive(Args)]
pub struct TrendsArgs {
    /// JSON array of {timestamp, value, label?}
    pub file: PathBuf,

    /// Metric name
    #[arg(long, default_value = "communications")]
    pub metric: String,

    /// Statistical analysis only
    #[arg(long)]
    pub no_llm: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
