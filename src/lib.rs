//! kafka-operator library crate
//!
//! This module exports the controller, the cluster resource model, and the
//! store boundary, plus the watch loop that drives them.

pub mod cluster;
pub mod config;
pub mod controller;
pub mod health;
pub mod store;

pub use health::HealthState;

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use controller::{context::Context, reconciler::reconcile};

/// Label selector identifying ConfigMaps that describe Kafka clusters.
pub const CLUSTER_CONFIG_SELECTOR: &str = "app=kafka";

/// Create namespaced or cluster-wide API based on scope
pub fn scoped_api<T>(client: Client, namespace: Option<&str>) -> Api<T>
where
    T: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <T as Resource>::DynamicType: Default,
    T: Clone + DeserializeOwned + std::fmt::Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Create the watcher configuration for the cluster ConfigMap stream.
///
/// - labelled ConfigMaps only, everything else in the namespace is ignored
/// - `any_semantic()`: more reliable resource discovery in test environments
fn cluster_watcher_config() -> WatcherConfig {
    WatcherConfig::default()
        .labels(CLUSTER_CONFIG_SELECTOR)
        .any_semantic()
}

/// Run the operator controller (cluster-wide).
///
/// This is the main controller loop that watches cluster ConfigMaps and
/// reconciles them. It can be called from main.rs or spawned as a background
/// task during integration tests.
///
/// If health_state is provided, metrics will be recorded for reconciliations.
pub async fn run_controller(client: Client, health_state: Option<Arc<HealthState>>) {
    run_controller_scoped(client, health_state, None).await
}

/// Run the operator controller with optional namespace scoping.
///
/// When `namespace` is `Some(ns)`, only watches ConfigMaps in that namespace.
/// When `namespace` is `None`, watches ConfigMaps cluster-wide.
///
/// Use the scoped version for integration tests to enable parallel test execution.
pub async fn run_controller_scoped(
    client: Client,
    health_state: Option<Arc<HealthState>>,
    namespace: Option<&str>,
) {
    let scope_msg = namespace.unwrap_or("cluster-wide");
    info!(
        "Starting controller for Kafka cluster ConfigMaps (scope: {})",
        scope_msg
    );

    // Mark as ready once we start the controller
    if let Some(ref state) = health_state {
        state.set_ready(true).await;
    }

    let ctx = Arc::new(Context::new(client.clone(), health_state));

    let config_maps: Api<ConfigMap> = scoped_api(client, namespace);

    Controller::new(config_maps, cluster_watcher_config())
        .run(reconcile, controller::reconciler::error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    debug!("Reconciled: {}", obj.name);
                }
                Err(e) => {
                    // ObjectNotFound/NotFound errors are expected after deletion when
                    // related watch events trigger reconciliation for a deleted object.
                    // Log these at debug level instead of error.
                    let is_not_found = match &e {
                        kube::runtime::controller::Error::ObjectNotFound(_) => true,
                        kube::runtime::controller::Error::ReconcilerFailed(err, _) => {
                            err.is_not_found()
                        }
                        _ => false,
                    };
                    if is_not_found {
                        debug!("Object no longer exists (likely deleted): {:?}", e);
                    } else {
                        error!("Reconciliation error: {:?}", e);
                    }
                }
            }
        })
        .await;

    // This should never complete in normal operation
    error!("Controller stream ended unexpectedly");
}
