//! In-memory query engine.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use broker::{
    BrokerAdmin, BrokerError, MessageSource, OutboundMessage, RawMessage, TopicName, TopicSpec,
    Transport,
};
use serde_json::{Map, Value, json};

use crate::{KsqlClient, Result, StatementRequest, StatementResponse, ViewError};

/// Most source messages folded into aggregates per [`InMemoryKsqlEngine::materialize`] call.
const MATERIALIZE_BATCH: usize = 500;
const ADMIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The broker an engine reads source topics from and writes derived
/// topics to.
#[derive(Clone)]
pub struct BrokerLink {
    pub admin: Arc<dyn BrokerAdmin>,
    pub transport: Arc<dyn Transport>,
    pub source: Arc<dyn MessageSource>,
}

impl std::fmt::Debug for BrokerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerLink").finish_non_exhaustive()
    }
}

/// A grouped count maintained over a source table's topic.
#[derive(Debug, Clone)]
struct Aggregate {
    name: String,
    source_table: String,
    key_column: String,
    count_column: String,
    offset: u64,
    counts: BTreeMap<String, u64>,
    topic_ready: bool,
}

#[derive(Debug, Default)]
struct EngineState {
    tables: BTreeSet<String>,
    source_topics: HashMap<String, TopicName>,
    aggregates: Vec<Aggregate>,
    submissions: Vec<StatementRequest>,
    catalog_calls: usize,
    catalog_failure: Option<String>,
    rejection: Option<(u16, String)>,
}

/// Extracts the table name from a `CREATE TABLE [IF NOT EXISTS] name` statement.
fn created_table(statement: &str) -> Option<(String, bool)> {
    let tokens: Vec<String> = statement
        .split_whitespace()
        .take(6)
        .map(str::to_uppercase)
        .collect();

    match tokens.as_slice() {
        [create, table, if_, not, exists, name, ..]
            if create == "CREATE" && table == "TABLE" && if_ == "IF" && not == "NOT" && exists == "EXISTS" =>
        {
            Some((name.trim_end_matches('(').to_string(), true))
        }
        [create, table, name, ..] if create == "CREATE" && table == "TABLE" => {
            Some((name.trim_end_matches('(').to_string(), false))
        }
        _ => None,
    }
}

/// Extracts the quoted `KAFKA_TOPIC` property of a statement.
fn kafka_topic(statement: &str) -> Option<TopicName> {
    let upper = statement.to_ascii_uppercase();
    let property = upper.find("KAFKA_TOPIC")?;
    let rest = &statement[property + "KAFKA_TOPIC".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start().strip_prefix('\'')?;
    let end = rest.find('\'')?;
    Some(TopicName::new(&rest[..end]))
}

/// Parses `... AS SELECT key, COUNT(..) AS alias FROM source GROUP BY key`.
fn grouped_count(name: &str, statement: &str) -> Option<Aggregate> {
    let upper = statement.to_ascii_uppercase();
    let tokens: Vec<&str> = upper.split_whitespace().collect();

    let select = tokens.iter().position(|t| *t == "SELECT")?;
    if tokens.get(select.checked_sub(1)?) != Some(&"AS") {
        return None;
    }
    let from = tokens.iter().position(|t| *t == "FROM")?;
    let group = tokens.windows(2).position(|w| w == ["GROUP", "BY"])?;

    let source_table = tokens.get(from + 1)?.trim_end_matches(';').to_string();
    let key_column = tokens.get(group + 2)?.trim_end_matches(';').to_string();

    let projection = &tokens[select + 1..from];
    let count = projection.iter().position(|t| t.starts_with("COUNT("))?;
    let count_column = match projection.get(count + 1) {
        Some(&"AS") => projection.get(count + 2)?.trim_end_matches(',').to_string(),
        _ => "KSQL_COL_0".to_string(),
    };

    Some(Aggregate {
        name: name.to_string(),
        source_table,
        key_column,
        count_column,
        offset: 0,
        counts: BTreeMap::new(),
        topic_ready: false,
    })
}

/// Value of `column` in a JSON object payload, compared case-insensitively.
fn column_value(message: &RawMessage, column: &str) -> Option<Value> {
    let payload = message.payload.as_deref()?;
    let Value::Object(fields) = serde_json::from_slice::<Value>(payload).ok()? else {
        return None;
    };
    fields
        .into_iter()
        .find(|(name, value)| name.eq_ignore_ascii_case(column) && !value.is_null())
        .map(|(_, value)| value)
}

/// In-memory query engine for tests and local runs.
///
/// Understands just enough of the statement language to track which tables
/// were created. A plain `CREATE TABLE` for an existing name is rejected with
/// status 400; `CREATE TABLE IF NOT EXISTS` is accepted and ignored.
///
/// With a [`BrokerLink`], grouped-count tables are also materialized:
/// [`materialize`](Self::materialize) folds new source records into the
/// counts and writes the updated rows to a topic named after the table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKsqlEngine {
    state: Arc<Mutex<EngineState>>,
    broker: Option<BrokerLink>,
}

impl InMemoryKsqlEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the broker used to materialize derived tables.
    pub fn with_broker(mut self, broker: BrokerLink) -> Self {
        self.broker = Some(broker);
        self
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a table to the catalog, as if created earlier.
    pub fn with_table(self, name: &str) -> Self {
        self.lock().tables.insert(name.to_uppercase());
        self
    }

    /// Makes catalog listing fail, or succeed again with `None`.
    pub fn set_catalog_failure(&self, reason: Option<String>) {
        self.lock().catalog_failure = reason;
    }

    /// Makes every submission answer with the given status and message,
    /// or accept again with `None`.
    pub fn set_rejection(&self, rejection: Option<(u16, String)>) {
        self.lock().rejection = rejection;
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.lock().tables.contains(&name.to_uppercase())
    }

    pub fn catalog_calls(&self) -> usize {
        self.lock().catalog_calls
    }

    pub fn submission_count(&self) -> usize {
        self.lock().submissions.len()
    }

    /// Every request submitted so far, in order.
    pub fn submissions(&self) -> Vec<StatementRequest> {
        self.lock().submissions.clone()
    }

    /// Brings every grouped-count table up to date with its source topic.
    ///
    /// Creates the derived topic on first use and publishes one
    /// `{KEY, COUNT}` row per folded source record. Returns the number of
    /// rows written. Without a broker, or before the source topic exists,
    /// nothing happens.
    #[tracing::instrument(skip(self))]
    pub async fn materialize(&self) -> Result<usize> {
        let Some(broker) = &self.broker else {
            return Ok(0);
        };

        let pending: Vec<(usize, String, TopicName, u64, bool)> = {
            let state = self.lock();
            state
                .aggregates
                .iter()
                .enumerate()
                .filter_map(|(index, aggregate)| {
                    let topic = state.source_topics.get(&aggregate.source_table)?;
                    Some((
                        index,
                        aggregate.name.clone(),
                        topic.clone(),
                        aggregate.offset,
                        aggregate.topic_ready,
                    ))
                })
                .collect()
        };

        let mut written = 0;
        for (index, name, source_topic, offset, topic_ready) in pending {
            let messages = match broker
                .source
                .fetch(&source_topic, offset, MATERIALIZE_BATCH)
                .await
            {
                Ok(messages) => messages,
                Err(BrokerError::UnknownTopic(_)) => continue,
                Err(err) => return Err(err.into()),
            };

            let sink = TopicName::new(name.as_str());
            if !topic_ready {
                ensure_topic(broker, &sink).await?;
                self.lock().aggregates[index].topic_ready = true;
            }

            let rows = {
                let mut state = self.lock();
                let aggregate = &mut state.aggregates[index];
                let mut rows = Vec::with_capacity(messages.len());
                for message in &messages {
                    aggregate.offset = aggregate.offset.max(message.offset + 1);
                    let Some(key) = column_value(message, &aggregate.key_column) else {
                        continue;
                    };
                    let key_text = match &key {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    };
                    let count = aggregate.counts.entry(key_text.clone()).or_insert(0);
                    *count += 1;

                    let mut row = Map::new();
                    row.insert(aggregate.key_column.clone(), key.clone());
                    row.insert(aggregate.count_column.clone(), json!(*count));
                    rows.push((key_text.into_bytes(), Value::Object(row)));
                }
                rows
            };

            for (key, row) in rows {
                let payload = serde_json::to_vec(&row)?;
                broker
                    .transport
                    .produce(OutboundMessage::new(sink.clone(), key, Some(payload)), None)?;
                written += 1;
            }
        }

        if written > 0 {
            tracing::debug!(rows = written, "derived tables materialized");
        }
        Ok(written)
    }
}

async fn ensure_topic(broker: &BrokerLink, topic: &TopicName) -> Result<()> {
    if broker.admin.list_topics(ADMIN_TIMEOUT).await?.contains(topic) {
        return Ok(());
    }
    let spec = TopicSpec::new(topic.clone(), 1, 1)?;
    let mut results = broker.admin.create_topics(&[spec], ADMIN_TIMEOUT).await?;
    match results.remove(topic) {
        Some(Ok(())) => {
            tracing::info!(%topic, "derived topic created");
            Ok(())
        }
        Some(Err(reason)) => Err(ViewError::UnexpectedResponse(format!(
            "could not create derived topic {topic}: {reason}"
        ))),
        None => Err(ViewError::UnexpectedResponse(format!(
            "broker returned no result for derived topic {topic}"
        ))),
    }
}

#[async_trait]
impl KsqlClient for InMemoryKsqlEngine {
    async fn list_tables(&self) -> Result<HashSet<String>> {
        let mut state = self.lock();
        state.catalog_calls += 1;
        if let Some(reason) = &state.catalog_failure {
            return Err(ViewError::UnexpectedResponse(reason.clone()));
        }
        Ok(state.tables.iter().cloned().collect())
    }

    async fn execute(&self, request: &StatementRequest) -> Result<StatementResponse> {
        let mut state = self.lock();
        state.submissions.push(request.clone());

        if let Some((status, message)) = &state.rejection {
            return Ok(StatementResponse {
                status: *status,
                body: json!({"@type": "statement_error", "message": message}),
            });
        }

        let created: Vec<(String, bool, &str)> = request
            .ksql
            .split(';')
            .filter_map(|statement| {
                created_table(statement).map(|(name, if_not_exists)| (name, if_not_exists, statement))
            })
            .collect();

        if let Some((name, _, _)) = created
            .iter()
            .find(|(name, if_not_exists, _)| !if_not_exists && state.tables.contains(name))
        {
            return Ok(StatementResponse {
                status: 400,
                body: json!({
                    "@type": "statement_error",
                    "message": format!("Cannot add table '{name}': A table with the same name already exists"),
                }),
            });
        }

        let mut results = Vec::with_capacity(created.len());
        for (name, _, statement) in created {
            if let Some(aggregate) = grouped_count(&name, statement) {
                if !state.aggregates.iter().any(|a| a.name == name) {
                    state.aggregates.push(aggregate);
                }
            } else if let Some(topic) = kafka_topic(statement) {
                state.source_topics.entry(name.clone()).or_insert(topic);
            }
            state.tables.insert(name);
            results.push(json!({
                "@type": "currentStatus",
                "commandStatus": {"status": "SUCCESS", "message": "Table created"},
            }));
        }

        Ok(StatementResponse {
            status: 200,
            body: Value::Array(results),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ViewDefinition;
    use broker::InMemoryBroker;

    fn link(broker: &InMemoryBroker) -> BrokerLink {
        BrokerLink {
            admin: Arc::new(broker.clone()),
            transport: Arc::new(broker.clone()),
            source: Arc::new(broker.clone()),
        }
    }

    fn turnstile_entry(broker: &InMemoryBroker, station_id: i64) {
        let payload = json!({"station_id": station_id, "station_name": "x", "line": "blue"});
        broker
            .produce(
                OutboundMessage::new(
                    TopicName::new("turnstile"),
                    b"k".to_vec(),
                    Some(serde_json::to_vec(&payload).unwrap()),
                ),
                None,
            )
            .unwrap();
    }

    #[test]
    fn grouped_count_parses_view_statement() {
        let view = ViewDefinition::turnstile_summary("turnstile");
        let aggregate = grouped_count("TURNSTILE_SUMMARY", &view.derived_statement()).unwrap();
        assert_eq!(aggregate.source_table, "TURNSTILE");
        assert_eq!(aggregate.key_column, "STATION_ID");
        assert_eq!(aggregate.count_column, "COUNT");
        assert!(grouped_count("TURNSTILE", &view.source_statement()).is_none());
    }

    #[test]
    fn kafka_topic_reads_quoted_property() {
        let view = ViewDefinition::turnstile_summary("org.chicago.cta.turnstile.v1");
        assert_eq!(
            kafka_topic(&view.source_statement()),
            Some(TopicName::new("org.chicago.cta.turnstile.v1"))
        );
        assert_eq!(kafka_topic("CREATE TABLE A (x INT)"), None);
    }

    #[tokio::test]
    async fn materialize_counts_source_records_into_derived_topic() {
        let broker = InMemoryBroker::new()
            .with_topic(TopicSpec::new("turnstile", 1, 1).unwrap());
        let engine = InMemoryKsqlEngine::new().with_broker(link(&broker));
        let view = ViewDefinition::turnstile_summary("turnstile");
        engine
            .execute(&StatementRequest::new(view.statement()))
            .await
            .unwrap();

        for station in [40380, 40010, 40380] {
            turnstile_entry(&broker, station);
        }
        assert_eq!(engine.materialize().await.unwrap(), 3);

        let rows: Vec<Value> = broker
            .messages("TURNSTILE_SUMMARY")
            .iter()
            .map(|m| serde_json::from_slice(m.payload.as_deref().unwrap()).unwrap())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], json!({"STATION_ID": 40380, "COUNT": 2}));

        // Already folded records are not counted twice.
        assert_eq!(engine.materialize().await.unwrap(), 0);
        turnstile_entry(&broker, 40010);
        assert_eq!(engine.materialize().await.unwrap(), 1);
        let last = broker.messages("TURNSTILE_SUMMARY").pop().unwrap();
        assert_eq!(last.payload_lossy(), r#"{"COUNT":2,"STATION_ID":40010}"#);
    }

    #[tokio::test]
    async fn materialize_waits_for_source_topic() {
        let broker = InMemoryBroker::new();
        let engine = InMemoryKsqlEngine::new().with_broker(link(&broker));
        let view = ViewDefinition::turnstile_summary("turnstile");
        engine
            .execute(&StatementRequest::new(view.statement()))
            .await
            .unwrap();

        assert_eq!(engine.materialize().await.unwrap(), 0);
        assert!(!broker.has_topic("TURNSTILE_SUMMARY"));
    }

    #[tokio::test]
    async fn materialize_without_broker_is_a_no_op() {
        let engine = InMemoryKsqlEngine::new();
        let view = ViewDefinition::turnstile_summary("turnstile");
        engine
            .execute(&StatementRequest::new(view.statement()))
            .await
            .unwrap();
        assert_eq!(engine.materialize().await.unwrap(), 0);
    }

    #[test]
    fn created_table_parses_both_forms() {
        assert_eq!(
            created_table("CREATE TABLE IF NOT EXISTS turnstile (id INT)"),
            Some(("TURNSTILE".to_string(), true))
        );
        assert_eq!(
            created_table("\n create table TURNSTILE_SUMMARY WITH (x)"),
            Some(("TURNSTILE_SUMMARY".to_string(), false))
        );
        assert_eq!(created_table("SHOW TABLES"), None);
        assert_eq!(created_table("   "), None);
    }

    #[tokio::test]
    async fn execute_creates_tables() {
        let engine = InMemoryKsqlEngine::new();
        let response = engine
            .execute(&StatementRequest::new(
                "CREATE TABLE IF NOT EXISTS A (x INT); CREATE TABLE B AS SELECT x FROM A;",
            ))
            .await
            .unwrap();

        assert!(response.is_success());
        assert!(engine.has_table("a"));
        assert!(engine.has_table("B"));
        let tables = engine.list_tables().await.unwrap();
        assert_eq!(tables.len(), 2);
    }

    #[tokio::test]
    async fn plain_create_of_existing_table_is_rejected() {
        let engine = InMemoryKsqlEngine::new().with_table("A");
        let response = engine
            .execute(&StatementRequest::new("CREATE TABLE A (x INT);"))
            .await
            .unwrap();
        assert_eq!(response.status, 400);
        assert!(response.message().contains("already exists"));
    }

    #[tokio::test]
    async fn if_not_exists_tolerates_existing_table() {
        let engine = InMemoryKsqlEngine::new().with_table("A");
        let response = engine
            .execute(&StatementRequest::new("CREATE TABLE IF NOT EXISTS A (x INT);"))
            .await
            .unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn catalog_failure_is_an_error() {
        let engine = InMemoryKsqlEngine::new();
        engine.set_catalog_failure(Some("connection refused".to_string()));
        assert!(engine.list_tables().await.is_err());
        assert_eq!(engine.catalog_calls(), 1);
    }
}
