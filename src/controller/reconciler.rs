//! Reconciliation loop for cluster ConfigMaps.
//!
//! Each labelled ConfigMap describes one Kafka cluster. While the ConfigMap
//! lives, reconciliation converges the cluster's resources onto the desired
//! shape; when it is marked for deletion, the resources are torn down before
//! the finalizer is released. All lifecycle sequencing lives in
//! [`ClusterReconciler`]; this module is the glue between it and the watch
//! stream.

use std::sync::Arc;
use std::time::{Duration, Instant};

use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    api::{Patch, PatchParams},
    runtime::controller::Action,
    Api, ResourceExt,
};
use tracing::{debug, error, info, warn};

use crate::cluster::identity::cluster_from_config_map;
use crate::config::KafkaConfig;
use crate::controller::{context::Context, error::Error, lifecycle::ClusterReconciler};
use crate::store::{KubeStore, FIELD_MANAGER};

/// Finalizer deferring ConfigMap deletion until cluster teardown
pub const FINALIZER: &str = "kafka-operator.io/finalizer";

/// Reconcile one cluster ConfigMap
///
/// This is the main reconciliation function called by the controller.
/// It handles the full lifecycle: creation, updates, and deletion.
pub async fn reconcile(config_map: Arc<ConfigMap>, ctx: Arc<Context>) -> Result<Action, Error> {
    let start_time = Instant::now();
    let (identity, labels) = cluster_from_config_map(&config_map)?;
    let name = identity.name().to_string();
    let namespace = identity.namespace().to_string();

    debug!(name = %name, namespace = %namespace, "Reconciling Kafka cluster");

    let api: Api<ConfigMap> = Api::namespaced(ctx.client.clone(), &namespace);
    let reconciler = ClusterReconciler::new(KubeStore::new(ctx.client.clone()));

    // Handle deletion
    if config_map.metadata.deletion_timestamp.is_some() {
        info!(name = %name, "Cluster marked for deletion, tearing down resources");
        reconciler.delete(&identity).await?;
        ctx.publish_normal_event(
            &config_map,
            "Deleted",
            "DeleteCluster",
            Some(format!("Deleted resources of Kafka cluster {name}")),
        )
        .await;
        remove_finalizer(&api, &name).await?;
        return Ok(Action::await_change());
    }

    // Ensure finalizer is present
    if !config_map.finalizers().iter().any(|f| f == FINALIZER) {
        info!(name = %name, "Adding finalizer");
        add_finalizer(&api, &name).await?;
        return Ok(Action::requeue(Duration::from_secs(1)));
    }

    // Converge the cluster resources onto the desired shape. Configuration
    // parsing happens upstream; the discovery loop feeds the defaults.
    let config = KafkaConfig::default();
    if let Err(e) = reconciler.create(&identity, &labels, &config).await {
        error!(name = %name, error = %e, "Failed to apply cluster resources");
        ctx.publish_warning_event(&config_map, "CreateFailed", "CreateCluster", Some(e.to_string()))
            .await;
        if let Some(ref health_state) = ctx.health_state {
            health_state.metrics.record_error(&namespace, &name);
        }
        return Err(e);
    }

    ctx.publish_normal_event(
        &config_map,
        "Created",
        "CreateCluster",
        Some(format!("Applied resources of Kafka cluster {name}")),
    )
    .await;

    // Record metrics
    if let Some(ref health_state) = ctx.health_state {
        let duration = start_time.elapsed().as_secs_f64();
        health_state
            .metrics
            .record_reconcile(&namespace, &name, duration);
    }

    Ok(Action::requeue(Duration::from_secs(300)))
}

/// Error policy for the controller
pub fn error_policy(config_map: Arc<ConfigMap>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = config_map.name_any();
    let namespace = config_map.namespace().unwrap_or_else(|| "default".to_string());

    // Record error metric
    if let Some(ref health_state) = ctx.health_state {
        health_state.metrics.record_error(&namespace, &name);
    }

    if error.is_not_found() {
        debug!(name = %name, "Resource not found (likely deleted)");
        return Action::await_change();
    }

    if error.is_retryable() {
        warn!(name = %name, error = %error, "Retryable error, will retry");
        Action::requeue(error.requeue_after())
    } else {
        error!(name = %name, error = %error, "Non-retryable error");
        Action::requeue(Duration::from_secs(300))
    }
}

/// Add finalizer to a cluster ConfigMap
async fn add_finalizer(api: &Api<ConfigMap>, name: &str) -> Result<(), Error> {
    let patch = serde_json::json!({
        "metadata": {
            "finalizers": [FINALIZER]
        }
    });
    api.patch(
        name,
        &PatchParams::apply(FIELD_MANAGER),
        &Patch::Merge(&patch),
    )
    .await?;
    Ok(())
}

/// Remove finalizer from a cluster ConfigMap
async fn remove_finalizer(api: &Api<ConfigMap>, name: &str) -> Result<(), Error> {
    let patch = serde_json::json!({
        "metadata": {
            "finalizers": null
        }
    });
    api.patch(
        name,
        &PatchParams::apply(FIELD_MANAGER),
        &Patch::Merge(&patch),
    )
    .await?;
    Ok(())
}
