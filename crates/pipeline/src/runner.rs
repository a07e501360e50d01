//! The publish/consume loop body.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use broker::TopicName;
use consumers::ConsumeStats;
use producer::TopicProvisioner;
use views::{BootstrapState, ViewBootstrapper, ViewDefinition};

use crate::config::Config;
use crate::connections::{BrokerConnections, QueryEngine};
use crate::feeds::ModelFeeds;
use crate::simulation::Simulation;
use crate::{AppState, Result};

/// Everything the pipeline does between startup and shutdown.
pub struct Pipeline {
    state: Arc<AppState>,
    simulation: Simulation,
    bootstrapper: ViewBootstrapper,
    engine: QueryEngine,
    feeds: ModelFeeds,
}

impl Pipeline {
    /// Provisions every producer topic and makes a first attempt at the
    /// turnstile summary view.
    ///
    /// A topic that cannot be provisioned aborts startup. A view that
    /// cannot be ensured does not; it is retried on every tick.
    #[tracing::instrument(skip_all)]
    pub async fn start(
        config: &Config,
        connections: BrokerConnections,
        engine: QueryEngine,
        state: Arc<AppState>,
    ) -> Result<Self> {
        let provisioner =
            TopicProvisioner::new(connections.admin.clone(), state.registry.clone())
                .with_timeout(config.admin_timeout);
        let simulation =
            Simulation::create(&provisioner, connections.transport.clone(), config.flush_timeout)
                .await?;

        let view = ViewDefinition::turnstile_summary(simulation.turnstile_topic().clone());
        let summary_topic = TopicName::new(view.derived_name.to_uppercase());

        let feeds = ModelFeeds::new(
            connections.source,
            simulation.weather_topic().clone(),
            state.weather.clone(),
            summary_topic,
            state.turnstile_summary.clone(),
        );

        let mut pipeline = Self {
            state,
            simulation,
            bootstrapper: ViewBootstrapper::new(engine.client(), view),
            engine,
            feeds,
        };
        pipeline.ensure_view().await;
        Ok(pipeline)
    }

    pub fn view_state(&self) -> BootstrapState {
        self.bootstrapper.state()
    }

    async fn ensure_view(&mut self) {
        if self.bootstrapper.state() == BootstrapState::Ensured {
            return;
        }

        match self.bootstrapper.ensure().await {
            Ok(outcome) => tracing::info!(?outcome, "turnstile summary view ensured"),
            Err(e) => tracing::warn!(error = %e, "turnstile summary view not ensured, will retry"),
        }
        *self.state.view_state.write().await = self.bootstrapper.state();
    }

    /// Runs one round: retry the view if needed, publish, bring local
    /// derived tables up to date, then feed the models.
    pub async fn tick(&mut self) -> Result<ConsumeStats> {
        self.ensure_view().await;

        self.simulation.tick()?;
        metrics::counter!("pipeline_ticks_total").increment(1);
        self.state
            .ticks
            .store(self.simulation.ticks(), Ordering::Relaxed);

        if let Err(e) = self.engine.materialize().await {
            tracing::warn!(error = %e, "derived tables not materialized, will retry");
        }

        Ok(self.feeds.poll().await?)
    }

    /// Closes every producer.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("closing producers");
        self.simulation.close().await
    }
}
