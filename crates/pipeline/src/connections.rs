//! Broker and query-engine handles chosen from configuration.

use std::sync::Arc;

use broker::{BrokerAdmin, InMemoryBroker, MessageSource, Transport};
use views::{BrokerLink, HttpKsqlClient, InMemoryKsqlEngine, KsqlClient};

use crate::config::{BrokerKind, Config};
use crate::{PipelineError, Result};

/// The broker-facing seams used by the pipeline.
#[derive(Clone)]
pub struct BrokerConnections {
    pub admin: Arc<dyn BrokerAdmin>,
    pub transport: Arc<dyn Transport>,
    pub source: Arc<dyn MessageSource>,
}

impl BrokerConnections {
    pub fn in_memory(broker: InMemoryBroker) -> Self {
        Self {
            admin: Arc::new(broker.clone()),
            transport: Arc::new(broker.clone()),
            source: Arc::new(broker),
        }
    }

    /// The same seams, as handed to a local query engine.
    pub fn link(&self) -> BrokerLink {
        BrokerLink {
            admin: self.admin.clone(),
            transport: self.transport.clone(),
            source: self.source.clone(),
        }
    }

    #[cfg(feature = "kafka")]
    pub fn kafka(bootstrap_servers: &str) -> Result<Self> {
        Ok(Self {
            admin: Arc::new(broker::KafkaAdmin::new(bootstrap_servers)?),
            transport: Arc::new(broker::KafkaTransport::new(bootstrap_servers)?),
            source: Arc::new(broker::KafkaSource::new(bootstrap_servers)?),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        match config.broker {
            BrokerKind::Memory => {
                tracing::info!("using in-memory broker");
                Ok(Self::in_memory(InMemoryBroker::new()))
            }
            #[cfg(feature = "kafka")]
            BrokerKind::Kafka => {
                tracing::info!(servers = %config.bootstrap_servers, "connecting to Kafka");
                Self::kafka(&config.bootstrap_servers)
            }
            #[cfg(not(feature = "kafka"))]
            BrokerKind::Kafka => Err(PipelineError::Config(
                "BROKER=kafka requires building with the `kafka` feature".to_string(),
            )),
        }
    }
}

/// The query engine the view is bootstrapped against.
#[derive(Debug, Clone)]
pub enum QueryEngine {
    /// A KSQL server reached over HTTP. It materializes tables itself.
    Remote(HttpKsqlClient),
    /// The in-process engine, materialized by the pipeline on each tick.
    Local(InMemoryKsqlEngine),
}

impl QueryEngine {
    pub fn client(&self) -> Arc<dyn KsqlClient> {
        match self {
            Self::Remote(client) => Arc::new(client.clone()),
            Self::Local(engine) => Arc::new(engine.clone()),
        }
    }

    /// Brings local derived tables up to date. Returns the rows written.
    pub async fn materialize(&self) -> views::Result<usize> {
        match self {
            Self::Remote(_) => Ok(0),
            Self::Local(engine) => engine.materialize().await,
        }
    }
}

/// Returns the HTTP engine client when `KSQL_URL` is set, otherwise an
/// in-memory engine reading from and writing to `connections`.
pub fn query_engine(config: &Config, connections: &BrokerConnections) -> Result<QueryEngine> {
    match &config.ksql_url {
        Some(url) => {
            tracing::info!(%url, "using KSQL server");
            let client = HttpKsqlClient::new(url.as_str(), HttpKsqlClient::DEFAULT_TIMEOUT)
                .map_err(PipelineError::View)?;
            Ok(QueryEngine::Remote(client))
        }
        None => {
            tracing::info!("KSQL_URL not set, using in-memory engine");
            Ok(QueryEngine::Local(
                InMemoryKsqlEngine::new().with_broker(connections.link()),
            ))
        }
    }
}
