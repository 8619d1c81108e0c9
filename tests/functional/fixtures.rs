//! Test fixtures for cluster lifecycle tests.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use kafka_operator::cluster::{ClusterIdentity, ClusterLabels};
use kafka_operator::config::KafkaConfig;

/// The reference scenario: cluster `my-cluster` in namespace `kafka`,
/// labelled `app=kafka`, three brokers running `kafka:2.1`.
pub fn scenario() -> (ClusterIdentity, ClusterLabels, KafkaConfig) {
    let identity = ClusterIdentity::new("my-cluster", "kafka");
    let labels = BTreeMap::from([("app".to_string(), "kafka".to_string())]);
    let config = KafkaConfig {
        replicas: 3,
        image: "kafka:2.1".to_string(),
        ..Default::default()
    };
    (identity, labels, config)
}

/// Builder for cluster ConfigMap fixtures.
#[derive(Clone, Debug)]
pub struct ClusterConfigMapBuilder {
    name: String,
    namespace: String,
    labels: BTreeMap<String, String>,
}

impl ClusterConfigMapBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: "default".to_string(),
            labels: BTreeMap::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(self.namespace),
                labels: if self.labels.is_empty() {
                    None
                } else {
                    Some(self.labels)
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
