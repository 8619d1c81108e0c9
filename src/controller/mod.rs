//! Controller module for kafka-operator.
//!
//! Contains the lifecycle reconciler, the watch-loop glue, error handling,
//! and the shared controller context.

pub mod context;
pub mod error;
pub mod lifecycle;
pub mod reconciler;

pub use error::{Error, Result};
pub use lifecycle::ClusterReconciler;
