//! Cluster identity and naming conventions.
//!
//! A [`ClusterIdentity`] pins down the (name, namespace) pair of one managed
//! Kafka cluster and every name derived from it. All derived naming lives
//! here so the services, the stateful set, and their selectors can never
//! drift apart.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::controller::error::{Error, Result};

/// Suffix appended to the cluster name to form the headless service name.
const HEADLESS_SUFFIX: &str = "-headless";

/// Labels attached to a cluster's resources, copied from its configuration
/// source. An empty map means "no extra labels".
pub type ClusterLabels = BTreeMap<String, String>;

/// Identity of one managed Kafka cluster within the API server.
///
/// Immutable once constructed; `namespace` + `name` form the natural key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterIdentity {
    name: String,
    namespace: String,
    headless_name: String,
}

impl ClusterIdentity {
    /// Derive the identity for a cluster name in a namespace.
    ///
    /// This is the only place the headless-service name is derived.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let name = name.into();
        let headless_name = format!("{name}{HEADLESS_SUFFIX}");
        Self {
            name,
            namespace: namespace.into(),
            headless_name,
        }
    }

    /// Cluster name; also the name of the client service and the stateful set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace the cluster's resources live in.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name of the headless service providing per-broker network identity.
    pub fn headless_name(&self) -> &str {
        &self.headless_name
    }
}

/// Selector labels addressing the cluster's broker pods.
///
/// Applied to the pod template and referenced by both services' selectors
/// and the stateful set's selector, keeping the binding between them in one
/// place.
pub fn selector_labels(identity: &ClusterIdentity) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("name".to_string(), identity.name().to_string());
    labels
}

fn cluster_from_meta(meta: &ObjectMeta) -> Result<(ClusterIdentity, ClusterLabels)> {
    let name = meta
        .name
        .clone()
        .ok_or_else(|| Error::MissingField("metadata.name".to_string()))?;
    let namespace = meta
        .namespace
        .clone()
        .ok_or_else(|| Error::MissingField("metadata.namespace".to_string()))?;
    let labels = meta.labels.clone().unwrap_or_default();
    Ok((ClusterIdentity::new(name, namespace), labels))
}

/// Build a cluster identity from a discovered cluster ConfigMap.
pub fn cluster_from_config_map(config_map: &ConfigMap) -> Result<(ClusterIdentity, ClusterLabels)> {
    cluster_from_meta(&config_map.metadata)
}

/// Build a cluster identity from an existing stateful set.
///
/// Yields the same identity as [`cluster_from_config_map`] for the same
/// underlying cluster, so either construction path feeds the reconciler
/// without further transformation.
pub fn cluster_from_stateful_set(
    stateful_set: &StatefulSet,
) -> Result<(ClusterIdentity, ClusterLabels)> {
    cluster_from_meta(&stateful_set.metadata)
}
