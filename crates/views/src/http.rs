//! HTTP client for the engine's `/ksql` endpoint.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;

use crate::{KsqlClient, Result, StatementRequest, StatementResponse, ViewError};

const KSQL_MEDIA_TYPE: &str = "application/vnd.ksql.v1+json";

/// Talks to a KSQL server over its REST API.
///
/// Every request is bounded by the timeout given at construction.
#[derive(Debug, Clone)]
pub struct HttpKsqlClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpKsqlClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, request: &StatementRequest) -> Result<StatementResponse> {
        let response = self
            .http
            .post(format!("{}/ksql", self.base_url))
            .header(ACCEPT, KSQL_MEDIA_TYPE)
            .header(CONTENT_TYPE, KSQL_MEDIA_TYPE)
            .body(serde_json::to_vec(request)?)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(StatementResponse { status, body })
    }
}

/// Collects table names from a `SHOW TABLES` response.
fn table_names(body: &Value) -> Result<HashSet<String>> {
    let entries = body.as_array().ok_or_else(|| {
        ViewError::UnexpectedResponse(format!("expected a list of results, got {body}"))
    })?;

    Ok(entries
        .iter()
        .filter_map(|entry| entry.get("tables").and_then(Value::as_array))
        .flatten()
        .filter_map(|table| table.get("name").and_then(Value::as_str))
        .map(str::to_uppercase)
        .collect())
}

#[async_trait]
impl KsqlClient for HttpKsqlClient {
    #[tracing::instrument(skip(self), fields(url = %self.base_url))]
    async fn list_tables(&self) -> Result<HashSet<String>> {
        let response = self.post(&StatementRequest::new("SHOW TABLES;")).await?;
        if !response.is_success() {
            return Err(ViewError::UnexpectedResponse(format!(
                "SHOW TABLES returned status {}: {}",
                response.status,
                response.message()
            )));
        }
        table_names(&response.body)
    }

    #[tracing::instrument(skip(self, request), fields(url = %self.base_url))]
    async fn execute(&self, request: &StatementRequest) -> Result<StatementResponse> {
        self.post(request).await
    }
}
