//! Domain synonym table for deterministic query expansion

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref SYNONYMS: HashMap<&'static str, &'static [&'static str]> = {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("complaint", &["issue", "problem", "concern", "grievance"]);
        m.insert("complaints", &["issues", "problems", "concerns", "grievances"]);
        m.insert("issue", &["problem", "complaint", "concern"]);
        m.insert("problem", &["issue", "complaint", "difficulty"]);
        m.insert("refund", &["reimbursement", "repayment", "money back"]);
        m.insert("cancel", &["terminate", "close", "end"]);
        m.insert("cancellation", &["termination", "closure"]);
        m.insert("declined", &["rejected", "refused", "denied"]);
        m.insert("fee", &["charge", "cost", "penalty"]);
        m.insert("fees", &["charges", "costs", "penalties"]);
        m.insert("charge", &["fee", "payment", "debit"]);
        m.insert("delay", &["wait", "hold-up", "lag"]);
        m.insert("slow", &["delayed", "sluggish", "lagging"]);
        m.insert("angry", &["frustrated", "upset", "annoyed"]);
        m.insert("frustrated", &["angry", "upset", "annoyed"]);
        m.insert("happy", &["satisfied", "pleased", "content"]);
        m.insert("fraud", &["scam", "unauthorized transaction", "suspicious activity"]);
        m.insert("payment", &["transaction", "transfer", "remittance"]);
        m.insert("transfer", &["payment", "wire", "transaction"]);
        m.insert("card", &["debit card", "credit card"]);
        m.insert("login", &["sign in", "log in", "authentication"]);
        m.insert("app", &["mobile app", "application"]);
        m.insert("mortgage", &["home loan", "housing loan"]);
        m.insert("rate", &["interest rate", "pricing"]);
        m.insert("escalation", &["escalated complaint", "supervisor request"]);
        m.insert("churn", &["attrition", "account closure", "leaving"]);
        m
    };
}

/// Synonyms for one lower-case term
pub fn synonyms_for(term: &str) -> Option<&'static [&'static str]> {
    SYNONYMS.get(term).copied()
}

/// Lower-case a token and strip surrounding punctuation
pub(crate) fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '-')
        .to_lowercase()
}

/// The query itself, then one variant per synonym of each table hit.
/// Replacement is whole-word and case-insensitive; duplicates are dropped.
pub fn expand_with_synonyms(query: &str) -> Vec<String> {
    let mut variants = vec![query.to_string()];

    for token in query.split_whitespace() {
        let term = normalize_token(token);
        let Some(synonyms) = synonyms_for(&term) else {
            continue;
        };

        let pattern = format!(r"(?i)\b{}\b", regex::escape(&term));
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };

        for synonym in synonyms {
            let variant = re.replace_all(query, *synonym).into_owned();
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
    }

    variants
}

/// Table hits in the query with their synonyms
pub fn synonym_map(query: &str) -> Vec<(String, Vec<String>)> {
    let mut out: Vec<(String, Vec<String>)> = Vec::new();
    for token in query.split_whitespace() {
        let term = normalize_token(token);
        if out.iter().any(|(t, _)| *t == term) {
            continue;
        }
        if let Some(synonyms) = synonyms_for(&term) {
            out.push((term, synonyms.iter().map(|s| s.to_string()).collect()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_query_first() {
        let variants = expand_with_synonyms("Complaint about fees");
        assert_eq!(variants[0], "Complaint about fees");
        assert!(variants.contains(&"issue about fees".to_string()));
        assert!(variants.contains(&"Complaint about charges".to_string()));
    }

    #[test]
    fn test_no_match_returns_only_query() {
        assert_eq!(expand_with_synonyms("weather today"), vec!["weather today"]);
        assert_eq!(expand_with_synonyms(""), vec![""]);
    }

    #[test]
    fn test_punctuation_and_whole_words() {
        let variants = expand_with_synonyms("why was my card declined?");
        assert!(variants.contains(&"why was my card rejected?".to_string()));
        assert!(variants.contains(&"why was my debit card declined?".to_string()));

        // "cards" is not the whole word "card"
        let plural = expand_with_synonyms("cards");
        assert_eq!(plural, vec!["cards"]);
    }

    #[test]
    fn test_regex_special_chars_are_escaped() {
        let variants = expand_with_synonyms("fee (+) refund");
        assert_eq!(variants[0], "fee (+) refund");
        assert!(variants.contains(&"charge (+) refund".to_string()));
    }

    #[test]
    fn test_synonym_map_dedupes() {
        let map = synonym_map("fee fee fraud");
        assert_eq!(map.len(), 2);
        assert_eq!(map[0].0, "fee");
    }
}
