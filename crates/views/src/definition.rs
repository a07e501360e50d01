//! View definitions and the statements that create them.

use common::TopicName;
use serde::{Deserialize, Serialize};

use crate::{Result, ViewError};

/// Serialization format of a table's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueFormat {
    Json,
    Avro,
    Delimited,
}

impl ValueFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueFormat::Json => "JSON",
            ValueFormat::Avro => "AVRO",
            ValueFormat::Delimited => "DELIMITED",
        }
    }
}

/// A column of the source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub sql_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// A derived table computed as a grouped aggregate over a source table.
///
/// The engine is asked whether `derived_name` exists; nothing else about the
/// definition is compared, so changing it does not replace an existing view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub source_name: String,
    pub source_topic: TopicName,
    pub source_columns: Vec<Column>,
    pub source_key: String,
    pub source_format: ValueFormat,
    pub derived_name: String,
    pub grouping_key: String,
    pub aggregate_expression: String,
    pub output_format: ValueFormat,
}

impl ViewDefinition {
    /// Turnstile entries counted per station.
    pub fn turnstile_summary(turnstile_topic: impl Into<TopicName>) -> Self {
        Self {
            source_name: "TURNSTILE".to_string(),
            source_topic: turnstile_topic.into(),
            source_columns: vec![
                Column::new("station_id", "INT"),
                Column::new("station_name", "VARCHAR"),
                Column::new("line", "VARCHAR"),
            ],
            source_key: "station_id".to_string(),
            source_format: ValueFormat::Json,
            derived_name: "TURNSTILE_SUMMARY".to_string(),
            grouping_key: "station_id".to_string(),
            aggregate_expression: "COUNT(station_id) AS count".to_string(),
            output_format: ValueFormat::Json,
        }
    }

    /// Checks that names are present and the key columns are declared.
    pub fn validate(&self) -> Result<()> {
        if self.source_name.trim().is_empty() || self.derived_name.trim().is_empty() {
            return Err(ViewError::InvalidDefinition(
                "source and derived names must not be empty".to_string(),
            ));
        }
        if self.source_topic.is_blank() {
            return Err(ViewError::InvalidDefinition(format!(
                "{} has no source topic",
                self.source_name
            )));
        }
        // The topic is rendered inside a quoted string literal.
        if self.source_topic.as_str().contains('\'') {
            return Err(ViewError::InvalidDefinition(format!(
                "source topic {} must not contain quotes",
                self.source_topic
            )));
        }
        for key in [&self.source_key, &self.grouping_key] {
            if !self.source_columns.iter().any(|c| &c.name == key) {
                return Err(ViewError::InvalidDefinition(format!(
                    "column {key} is not declared on {}",
                    self.source_name
                )));
            }
        }
        if self.aggregate_expression.trim().is_empty() {
            return Err(ViewError::InvalidDefinition(format!(
                "{} has no aggregate expression",
                self.derived_name
            )));
        }
        Ok(())
    }

    /// Statement declaring the source table over the raw topic.
    ///
    /// The key column is declared with `PRIMARY KEY`, the form accepted by
    /// ksqlDB 0.10 and later alongside `IF NOT EXISTS`.
    pub fn source_statement(&self) -> String {
        let columns = self
            .source_columns
            .iter()
            .map(|c| {
                if c.name == self.source_key {
                    format!("    {} {} PRIMARY KEY", c.name, c.sql_type)
                } else {
                    format!("    {} {}", c.name, c.sql_type)
                }
            })
            .collect::<Vec<_>>()
            .join(",\n");

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n) WITH (\n    KAFKA_TOPIC = '{}',\n    VALUE_FORMAT = '{}'\n);",
            self.source_name,
            columns,
            self.source_topic,
            self.source_format.as_str(),
        )
    }

    /// Statement declaring the grouped aggregate.
    pub fn derived_statement(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {}\nWITH (VALUE_FORMAT = '{}') AS\n    SELECT {}, {}\n    FROM {}\n    GROUP BY {};",
            self.derived_name,
            self.output_format.as_str(),
            self.grouping_key,
            self.aggregate_expression,
            self.source_name,
            self.grouping_key,
        )
    }

    /// Both statements, submitted together as one request.
    pub fn statement(&self) -> String {
        format!("{}\n\n{}", self.source_statement(), self.derived_statement())
    }
}
