use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Body of a statement request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRequest {
    pub ksql: String,
    #[serde(rename = "streamsProperties")]
    pub streams_properties: BTreeMap<String, String>,
}

impl StatementRequest {
    pub fn new(ksql: impl Into<String>) -> Self {
        Self {
            ksql: ksql.into(),
            streams_properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.streams_properties.insert(key.into(), value.into());
        self
    }
}

/// The engine's answer to a statement request.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl StatementResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Best-effort error message from the response body.
    pub fn message(&self) -> String {
        self.body
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.body.to_string())
    }
}

/// Access to a KSQL-style query engine.
#[async_trait]
pub trait KsqlClient: Send + Sync {
    /// Returns the names of all tables in the engine catalog, upper-cased.
    ///
    /// Any transport failure or non-success answer is an error; it never
    /// means "no tables".
    async fn list_tables(&self) -> Result<HashSet<String>>;

    /// Submits statements for execution.
    ///
    /// Returns `Err` only when no answer was received; engine rejections come
    /// back as a non-success [`StatementResponse`].
    async fn execute(&self, request: &StatementRequest) -> Result<StatementResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_streams_properties_in_camel_case() {
        let request = StatementRequest::new("SHOW TABLES;")
            .with_property("ksql.streams.auto.offset.reset", "earliest");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["ksql"], "SHOW TABLES;");
        assert_eq!(
            json["streamsProperties"]["ksql.streams.auto.offset.reset"],
            "earliest"
        );
    }

    #[test]
    fn response_message_prefers_message_field() {
        let response = StatementResponse {
            status: 400,
            body: serde_json::json!({"@type": "statement_error", "message": "bad"}),
        };
        assert!(!response.is_success());
        assert_eq!(response.message(), "bad");
    }
}
