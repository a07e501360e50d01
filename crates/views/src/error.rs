//! View bootstrap error types.

use thiserror::Error;

/// Errors that can occur while bootstrapping derived views.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The engine catalog could not be read.
    ///
    /// Whether the view exists is unknown; nothing was submitted and the
    /// next `ensure` call checks again.
    #[error("Catalog listing for {view} failed: {reason}")]
    CatalogUnavailable { view: String, reason: String },

    /// The engine did not accept the view's statements.
    ///
    /// `status` is the HTTP status when the engine answered at all.
    #[error("Submission of {view} failed: {message}")]
    ViewSubmission {
        view: String,
        status: Option<u16>,
        message: String,
    },

    /// The view definition is inconsistent.
    #[error("Invalid view definition: {0}")]
    InvalidDefinition(String),

    /// The HTTP request to the engine failed.
    #[error("Engine request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine answered with something that could not be interpreted.
    #[error("Unexpected engine response: {0}")]
    UnexpectedResponse(String),

    /// The broker behind a materialized table failed.
    #[error("Broker error: {0}")]
    Broker(#[from] broker::BrokerError),

    /// A request body could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;
