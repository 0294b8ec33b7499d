//! Query evaluation shared by the local store adapters.

use panel_application::{DocumentQuery, StoreError};
use panel_domain::{MESSAGE_DOCUMENT_TYPE, SESSION_DOCUMENT_TYPE};
use serde_json::Value;
use std::cmp::Ordering;

pub(crate) fn document_id(document: &Value) -> Result<&str, StoreError> {
    document["id"]
        .as_str()
        .ok_or_else(|| StoreError::InvalidDocument("document has no string `id`".into()))
}

pub(crate) fn partition_key(document: &Value) -> Result<&str, StoreError> {
    document["session_id"]
        .as_str()
        .ok_or_else(|| StoreError::InvalidDocument("document has no string `session_id`".into()))
}

fn is_type(document: &Value, kind: &str) -> bool {
    document["type"].as_str() == Some(kind)
}

fn in_session(document: &Value, session_id: &str) -> bool {
    document["session_id"].as_str() == Some(session_id)
}

/// Evaluate `query` over a full scan of `documents`.
pub(crate) fn evaluate<'a>(
    query: &DocumentQuery,
    documents: impl Iterator<Item = &'a Value>,
) -> Vec<Value> {
    match query {
        DocumentQuery::MessagesBySession { session_id } => {
            let mut messages: Vec<Value> = documents
                .filter(|d| is_type(d, MESSAGE_DOCUMENT_TYPE) && in_session(d, session_id))
                .cloned()
                .collect();
            messages.sort_by_key(|d| d["sequence"].as_u64().unwrap_or(u64::MAX));
            messages
        }
        DocumentQuery::CountMessages { session_id } => {
            let n = documents
                .filter(|d| is_type(d, MESSAGE_DOCUMENT_TYPE) && in_session(d, session_id))
                .count();
            vec![Value::from(n)]
        }
        DocumentQuery::RecentSessions { limit } => {
            let mut sessions: Vec<Value> = documents
                .filter(|d| is_type(d, SESSION_DOCUMENT_TYPE))
                .cloned()
                .collect();
            sessions.sort_by(|a, b| {
                b["timestamp"]
                    .as_f64()
                    .partial_cmp(&a["timestamp"].as_f64())
                    .unwrap_or(Ordering::Equal)
            });
            sessions.truncate(*limit);
            sessions
        }
        DocumentQuery::CountSessions => {
            vec![Value::from(
                documents.filter(|d| is_type(d, SESSION_DOCUMENT_TYPE)).count(),
            )]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Vec<Value> {
        vec![
            json!({"id": "s1", "session_id": "s1", "type": "session", "timestamp": 10.0}),
            json!({"id": "s2", "session_id": "s2", "type": "session", "timestamp": 30.0}),
            json!({"id": "s3", "session_id": "s3", "type": "session", "timestamp": 20.0}),
            json!({"id": "m2", "session_id": "s1", "type": "message", "sequence": 2}),
            json!({"id": "m1", "session_id": "s1", "type": "message", "sequence": 1}),
            json!({"id": "m9", "session_id": "s2", "type": "message", "sequence": 1}),
        ]
    }

    #[test]
    fn test_messages_sorted_by_sequence() {
        let docs = docs();
        let result = evaluate(
            &DocumentQuery::MessagesBySession {
                session_id: "s1".into(),
            },
            docs.iter(),
        );
        let ids: Vec<&str> = result.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_counts_are_single_numbers() {
        let docs = docs();
        let count = evaluate(
            &DocumentQuery::CountMessages {
                session_id: "s1".into(),
            },
            docs.iter(),
        );
        assert_eq!(count, vec![json!(2)]);
        assert_eq!(evaluate(&DocumentQuery::CountSessions, docs.iter()), vec![json!(3)]);
    }

    #[test]
    fn test_recent_sessions_newest_first() {
        let docs = docs();
        let result = evaluate(&DocumentQuery::RecentSessions { limit: 2 }, docs.iter());
        let ids: Vec<&str> = result.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["s2", "s3"]);
    }
}
