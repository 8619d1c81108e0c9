//! Error types for the controller.
//!
//! Defines custom error types with classification for retry behavior.

use std::time::Duration;
use thiserror::Error;

use crate::store::{ResourceKind, StoreOp};

/// Error type for controller operations
#[derive(Error, Debug)]
pub enum Error {
    /// A store operation on one cluster resource failed. Earlier operations
    /// in the same lifecycle sequence are left in place; re-invoking the
    /// sequence is the recovery path.
    #[error("{op} failed for {kind} {name:?}: {source}")]
    Store {
        kind: ResourceKind,
        op: StoreOp,
        name: String,
        #[source]
        source: kube::Error,
    },

    /// Kubernetes API error outside a lifecycle sequence
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Rejected cluster configuration, detected before any remote call
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Discovered object is missing a required metadata field
    #[error("missing required field: {0}")]
    MissingField(String),
}

impl Error {
    /// Attach the failing resource kind and operation to a store error.
    pub fn store(kind: ResourceKind, op: StoreOp, name: &str, source: kube::Error) -> Self {
        Error::Store {
            kind,
            op,
            name: name.to_string(),
            source,
        }
    }

    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Kube(kube::Error::Api(e)) => e.code == 404,
            Error::Store {
                source: kube::Error::Api(e),
                ..
            } => e.code == 404,
            _ => false,
        }
    }

    /// Check if this error should be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube(e) | Error::Store { source: e, .. } => {
                // Retry on network errors, rate limiting, and server errors
                matches!(
                    e,
                    kube::Error::Api(api_err) if api_err.code >= 500 || api_err.code == 429
                ) || matches!(e, kube::Error::Service(_))
            }
            Error::InvalidConfiguration(_) | Error::MissingField(_) => false,
        }
    }

    /// Get the recommended requeue duration for this error
    pub fn requeue_after(&self) -> Duration {
        if self.is_retryable() {
            Duration::from_secs(30)
        } else {
            // Don't requeue for non-retryable errors
            Duration::from_secs(3600)
        }
    }
}

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;
