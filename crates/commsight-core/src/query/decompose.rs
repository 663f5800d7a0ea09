//! Heuristic question decomposition (no LLM call)

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref AND_SPLIT: Regex = Regex::new(r"(?i)\s+and\s+").unwrap();
    static ref COMPARISON: Regex =
        Regex::new(r"(?i)\b(compare|versus|vs\.?|difference between)(\s|$)").unwrap();
    static ref VS_SUBJECTS: Regex =
        Regex::new(r"(?i)^(?:compare\s+)?(.+?)\s+(?:versus|vs\.?|and|with|to)\s+(.+?)$").unwrap();
    static ref DIFFERENCE_SUBJECTS: Regex =
        Regex::new(r"(?i)difference\s+between\s+(.+?)\s+and\s+(.+?)$").unwrap();
    static ref WHY_PREFIX: Regex =
        Regex::new(r"(?i)^why\s+(?:(?:does|did|do|are|is|was|were|have|has)\s+)?(.*)$").unwrap();
}

/// Minimum clause length for an "and" split to count
const MIN_CLAUSE_CHARS: usize = 10;

/// Split a compound question into simpler ones.
///
/// The first matching heuristic wins: "and" clauses, then comparison
/// aspects, then "why" reframings. No match returns the question unchanged.
pub fn decompose(question: &str) -> Vec<String> {
    let trimmed = question.trim();

    split_clauses(trimmed)
        .or_else(|| comparison_aspects(trimmed))
        .or_else(|| why_reframings(trimmed))
        .unwrap_or_else(|| vec![question.to_string()])
}

fn split_clauses(question: &str) -> Option<Vec<String>> {
    let clauses: Vec<&str> = AND_SPLIT.split(question).map(str::trim).collect();
    if clauses.len() > 1 && clauses.iter().all(|c| c.chars().count() > MIN_CLAUSE_CHARS) {
        Some(clauses.iter().map(|c| c.to_string()).collect())
    } else {
        None
    }
}

fn comparison_aspects(question: &str) -> Option<Vec<String>> {
    if !COMPARISON.is_match(question) {
        return None;
    }
    let core = strip_question_mark(question);
    let subjects = DIFFERENCE_SUBJECTS
        .captures(core)
        .or_else(|| VS_SUBJECTS.captures(core))
        .map(|caps| (caps[1].trim().to_string(), caps[2].trim().to_string()));

    Some(match subjects {
        Some((a, b)) => vec![
            format!("What characterizes {} in customer communications?", a),
            format!("What characterizes {} in customer communications?", b),
        ],
        None => vec![
            format!("What are the key aspects of: {}?", core),
            format!("How do the compared items differ in: {}?", core),
        ],
    })
}

fn why_reframings(question: &str) -> Option<Vec<String>> {
    let caps = WHY_PREFIX.captures(question)?;
    let topic = strip_question_mark(caps[1].trim());
    if topic.is_empty() {
        return None;
    }
    Some(vec![
        format!("What are the root causes behind: {}?", topic),
        format!("What do customers say when {}?", topic),
        format!("What events or patterns precede: {}?", topic),
    ])
}

fn strip_question_mark(s: &str) -> &str {
    s.trim_end_matches('?').trim()
}
