//! Check-then-submit bootstrap of a derived view.

use std::sync::Arc;

use crate::{KsqlClient, Result, StatementRequest, ViewDefinition, ViewError};

/// Lifecycle of a [`ViewBootstrapper`].
///
/// ```text
/// Unchecked ──► Ensured
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BootstrapState {
    /// The engine has not confirmed the view yet.
    #[default]
    Unchecked,
    /// The engine has the view (terminal state).
    Ensured,
}

impl BootstrapState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapState::Unchecked => "Unchecked",
            BootstrapState::Ensured => "Ensured",
        }
    }
}

impl std::fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How [`ViewBootstrapper::ensure`] reached the `Ensured` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Already ensured by an earlier call; nothing was sent.
    AlreadyEnsured,
    /// The catalog already listed the view.
    FoundInCatalog,
    /// The view's statements were submitted and accepted.
    Submitted,
}

/// Creates a derived view once per engine, not once per process.
///
/// The engine catalog is the source of truth, so restarting the process does
/// not resubmit the statements. Checking and submitting are separate calls;
/// two processes may both see the view missing and both submit, which the
/// `IF NOT EXISTS` statements make harmless.
pub struct ViewBootstrapper {
    client: Arc<dyn KsqlClient>,
    view: ViewDefinition,
    state: BootstrapState,
}

impl ViewBootstrapper {
    /// Streams property applied to every submission.
    pub const OFFSET_RESET_PROPERTY: &'static str = "ksql.streams.auto.offset.reset";

    pub fn new(client: Arc<dyn KsqlClient>, view: ViewDefinition) -> Self {
        Self {
            client,
            view,
            state: BootstrapState::Unchecked,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    pub fn view(&self) -> &ViewDefinition {
        &self.view
    }

    /// Makes sure the engine has the view, submitting it if needed.
    ///
    /// On a catalog failure or a rejected submission the error is logged and
    /// returned, the state stays `Unchecked` and a later call retries.
    #[tracing::instrument(skip(self), fields(view = %self.view.derived_name))]
    pub async fn ensure(&mut self) -> Result<BootstrapOutcome> {
        if self.state == BootstrapState::Ensured {
            return Ok(BootstrapOutcome::AlreadyEnsured);
        }

        self.view.validate()?;
        let view_name = self.view.derived_name.to_uppercase();

        let tables = self.client.list_tables().await.map_err(|err| {
            metrics::counter!("view_catalog_catalog_failures_total").increment(1);
            tracing::warn!(error = %err, "catalog listing failed, view state unknown");
            ViewError::CatalogUnavailable {
                view: view_name.clone(),
                reason: err.to_string(),
            }
        })?;

        if tables.contains(&view_name) {
            tracing::info!("view already present in catalog");
            self.state = BootstrapState::Ensured;
            return Ok(BootstrapOutcome::FoundInCatalog);
        }

        tracing::debug!("submitting view statements");
        let request = StatementRequest::new(self.view.statement())
            .with_property(Self::OFFSET_RESET_PROPERTY, "earliest");
        metrics::counter!("view_submissions_total").increment(1);

        let response = match self.client.execute(&request).await {
            Ok(response) => response,
            Err(err) => {
                metrics::counter!("view_submission_failures_total").increment(1);
                tracing::error!(error = %err, "view submission failed");
                return Err(ViewError::ViewSubmission {
                    view: view_name,
                    status: None,
                    message: err.to_string(),
                });
            }
        };

        if !response.is_success() {
            metrics::counter!("view_submission_failures_total").increment(1);
            let message = response.message();
            tracing::error!(status = response.status, %message, "engine rejected view statements");
            return Err(ViewError::ViewSubmission {
                view: view_name,
                status: Some(response.status),
                message,
            });
        }

        tracing::info!("view created");
        self.state = BootstrapState::Ensured;
        Ok(BootstrapOutcome::Submitted)
    }
}
