//! Communication records as they arrive for indexing

use crate::error::{CommsightError, Result};
use crate::search::CommunicationMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// One utterance in a conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Turn {
    pub speaker: String,
    pub text: String,
}

/// A transcript, email thread or chat log with its descriptive fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationRecord {
    #[serde(alias = "transcript_id")]
    pub id: Option<String>,
    pub source_type: Option<String>,
    pub event_name: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub channel: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub sentiment: Option<String>,
    pub outcome: Option<String>,
    pub journey_type: Option<String>,
    pub tags: Vec<String>,
    pub turns: Vec<Turn>,
    /// Free text for records without turns (emails, notes)
    pub body: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    Wrapped { transcripts: Vec<CommunicationRecord> },
    List(Vec<CommunicationRecord>),
    Single(CommunicationRecord),
}

impl CommunicationRecord {
    /// Document text: `key=value | ...` header, blank line, `speaker: text` lines
    pub fn render_document(&self) -> String {
        let header = [
            ("event_name", &self.event_name),
            ("journey_type", &self.journey_type),
            ("sentiment", &self.sentiment),
            ("outcome", &self.outcome),
            ("channel", &self.channel),
        ]
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}={}", key, v))
        })
        .collect::<Vec<_>>()
        .join(" | ");

        let mut lines: Vec<String> = self
            .turns
            .iter()
            .filter_map(|turn| {
                let speaker = turn.speaker.trim();
                let text = turn.text.trim();
                (!speaker.is_empty() && !text.is_empty()).then(|| format!("{}: {}", speaker, text))
            })
            .collect();
        if let Some(body) = self.body.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            lines.push(body.to_string());
        }
        let body = lines.join("\n");

        if header.is_empty() {
            body
        } else {
            format!("{}\n\n{}", header, body)
        }
    }

    /// Stable id: the record's own, else a hash of its text and position
    pub fn document_id(&self, position: usize) -> String {
        if let Some(id) = self.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            return id.to_string();
        }
        let mut hasher = Sha256::new();
        hasher.update(self.render_document().as_bytes());
        hasher.update(position.to_le_bytes());
        let hash = format!("{:x}", hasher.finalize());
        format!("comm-{}", &hash[..16])
    }

    pub fn metadata(&self) -> CommunicationMetadata {
        CommunicationMetadata {
            source_type: self
                .source_type
                .clone()
                .or_else(|| (!self.turns.is_empty()).then(|| "transcript".to_string())),
            customer_id: self.customer_id.clone(),
            customer_name: self.customer_name.clone(),
            channel: self.channel.clone(),
            timestamp: self.timestamp,
            sentiment: self.sentiment.clone(),
            tags: self.tags.clone(),
            outcome: self.outcome.clone(),
            journey_type: self.journey_type.clone(),
        }
    }
}

/// Parse records from YAML or JSON text: a list, a single record, or an
/// object with a `transcripts` list
pub fn parse_records(text: &str) -> Result<Vec<CommunicationRecord>> {
    unwrap_records(serde_yaml::from_str(text)?)
}

/// Load records from a `.json`, `.yaml` or `.yml` file
pub fn load_records(path: &Path) -> Result<Vec<CommunicationRecord>> {
    let text = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => unwrap_records(serde_json::from_str(&text)?),
        _ => parse_records(&text),
    }
}

fn unwrap_records(parsed: RecordFile) -> Result<Vec<CommunicationRecord>> {
    let records = match parsed {
        RecordFile::Wrapped { transcripts } => transcripts,
        RecordFile::List(records) => records,
        RecordFile::Single(record) => vec![record],
    };
    if records.is_empty() {
        return Err(CommsightError::InvalidInput("No records found".to_string()));
    }
    Ok(records)
}
