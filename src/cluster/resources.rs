//! Resource generation for Kafka clusters.
//!
//! Creates three resources per cluster:
//! - **Client Service**: load-balanced broker access on the client port
//! - **Headless Service**: stable per-broker network identity
//! - **StatefulSet**: the ordinal-indexed broker pods
//!
//! All builders are pure functions of identity + labels + configuration so
//! resource shape can be tested without touching the API server.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EmptyDirVolumeSource, ExecAction, PodSpec, PodTemplateSpec, Probe,
    Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::cluster::identity::{selector_labels, ClusterIdentity, ClusterLabels};
use crate::config::{KafkaConfig, ProbeSpec, CLIENT_PORT, DATA_VOLUME_NAME};
use crate::controller::error::Result;

/// The full resource set for one Kafka cluster.
#[derive(Clone, Debug)]
pub struct KafkaResources {
    pub client_service: Service,
    pub headless_service: Service,
    pub stateful_set: StatefulSet,
}

impl KafkaResources {
    /// Build the resource set for a cluster.
    ///
    /// Validates the configuration first; no resource value is produced from
    /// an invalid configuration.
    pub fn build(
        identity: &ClusterIdentity,
        labels: &ClusterLabels,
        config: &KafkaConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client_service: client_service(identity, labels),
            headless_service: headless_service(identity, labels),
            stateful_set: stateful_set(identity, labels, config),
        })
    }
}

fn kafka_port() -> ServicePort {
    ServicePort {
        port: CLIENT_PORT,
        target_port: Some(IntOrString::Int(CLIENT_PORT)),
        protocol: Some("TCP".to_string()),
        name: Some("kafka".to_string()),
        ..Default::default()
    }
}

/// Generate the client Service.
///
/// Routable ClusterIP service load-balancing client connections across
/// ready brokers.
pub fn client_service(identity: &ClusterIdentity, labels: &ClusterLabels) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(identity.name().to_string()),
            namespace: Some(identity.namespace().to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(selector_labels(identity)),
            ports: Some(vec![kafka_port()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Generate the headless Service.
///
/// Carries no cluster IP so each broker is addressable directly; the
/// stateful set names it as its network-identity provider.
pub fn headless_service(identity: &ClusterIdentity, labels: &ClusterLabels) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(identity.headless_name().to_string()),
            namespace: Some(identity.namespace().to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            cluster_ip: Some("None".to_string()),
            selector: Some(selector_labels(identity)),
            ports: Some(vec![kafka_port()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Generate the StatefulSet running the brokers.
pub fn stateful_set(
    identity: &ClusterIdentity,
    labels: &ClusterLabels,
    config: &KafkaConfig,
) -> StatefulSet {
    StatefulSet {
        metadata: ObjectMeta {
            name: Some(identity.name().to_string()),
            namespace: Some(identity.namespace().to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(StatefulSetSpec {
            replicas: Some(config.replicas),
            service_name: Some(identity.headless_name().to_string()),
            selector: LabelSelector {
                match_labels: Some(selector_labels(identity)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    name: Some(identity.name().to_string()),
                    labels: Some(selector_labels(identity)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![kafka_container(identity, config)],
                    volumes: Some(vec![Volume {
                        name: DATA_VOLUME_NAME.to_string(),
                        empty_dir: Some(EmptyDirVolumeSource::default()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn kafka_container(identity: &ClusterIdentity, config: &KafkaConfig) -> Container {
    Container {
        name: identity.name().to_string(),
        image: Some(config.image.clone()),
        ports: Some(vec![ContainerPort {
            container_port: CLIENT_PORT,
            name: Some("clientport".to_string()),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        volume_mounts: Some(vec![VolumeMount {
            name: DATA_VOLUME_NAME.to_string(),
            mount_path: config.data_path.clone(),
            ..Default::default()
        }]),
        liveness_probe: Some(exec_probe(&config.liveness)),
        readiness_probe: Some(exec_probe(&config.readiness)),
        ..Default::default()
    }
}

fn exec_probe(probe: &ProbeSpec) -> Probe {
    Probe {
        exec: Some(ExecAction {
            command: Some(probe.command.clone()),
        }),
        initial_delay_seconds: Some(probe.initial_delay_seconds),
        timeout_seconds: Some(probe.timeout_seconds),
        ..Default::default()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::get_unwrap
)]
mod tests {
    use super::*;
    use crate::controller::error::Error;

    fn test_identity() -> ClusterIdentity {
        ClusterIdentity::new("my-cluster", "kafka")
    }

    fn test_labels() -> ClusterLabels {
        BTreeMap::from([("app".to_string(), "kafka".to_string())])
    }

    fn test_config() -> KafkaConfig {
        KafkaConfig {
            image: "kafka:2.1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_client_service_shape() {
        let svc = client_service(&test_identity(), &test_labels());

        assert_eq!(svc.metadata.name, Some("my-cluster".to_string()));
        assert_eq!(svc.metadata.namespace, Some("kafka".to_string()));

        let spec = svc.spec.unwrap();
        assert_eq!(spec.type_, Some("ClusterIP".to_string()));
        assert_eq!(spec.cluster_ip, None);
        assert_eq!(
            spec.selector.unwrap().get("name"),
            Some(&"my-cluster".to_string())
        );

        let ports = spec.ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 9092);
        assert_eq!(ports[0].name, Some("kafka".to_string()));
        assert_eq!(ports[0].protocol, Some("TCP".to_string()));
    }

    #[test]
    fn test_headless_service_shape() {
        let svc = headless_service(&test_identity(), &test_labels());

        assert_eq!(svc.metadata.name, Some("my-cluster-headless".to_string()));

        let spec = svc.spec.unwrap();
        assert_eq!(spec.cluster_ip, Some("None".to_string()));
        assert_eq!(
            spec.selector.unwrap().get("name"),
            Some(&"my-cluster".to_string())
        );
        assert_eq!(spec.ports.unwrap()[0].port, 9092);
    }

    #[test]
    fn test_stateful_set_shape() {
        let sts = stateful_set(&test_identity(), &test_labels(), &test_config());

        assert_eq!(sts.metadata.name, Some("my-cluster".to_string()));

        let spec = sts.spec.unwrap();
        assert_eq!(spec.replicas, Some(3));
        assert_eq!(spec.service_name, Some("my-cluster-headless".to_string()));
        assert_eq!(
            spec.selector.match_labels.unwrap().get("name"),
            Some(&"my-cluster".to_string())
        );

        let pod_spec = spec.template.spec.unwrap();
        assert_eq!(pod_spec.containers.len(), 1);

        let container = &pod_spec.containers[0];
        assert_eq!(container.image, Some("kafka:2.1".to_string()));
        assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 9092);
        assert_eq!(
            container.ports.as_ref().unwrap()[0].name,
            Some("clientport".to_string())
        );

        let mounts = container.volume_mounts.as_ref().unwrap();
        assert_eq!(mounts[0].name, "kafka-storage");
        assert_eq!(mounts[0].mount_path, "/var/lib/kafka");

        let volumes = pod_spec.volumes.unwrap();
        assert_eq!(volumes[0].name, "kafka-storage");
        assert!(volumes[0].empty_dir.is_some());
    }

    #[test]
    fn test_stateful_set_probes() {
        let sts = stateful_set(&test_identity(), &test_labels(), &test_config());
        let container = &sts.spec.unwrap().template.spec.unwrap().containers[0];

        let liveness = container.liveness_probe.as_ref().unwrap();
        assert_eq!(
            liveness.exec.as_ref().unwrap().command,
            Some(vec!["/opt/kafka/kafka_healthcheck.sh".to_string()])
        );
        assert_eq!(liveness.initial_delay_seconds, Some(15));
        assert_eq!(liveness.timeout_seconds, Some(5));

        let readiness = container.readiness_probe.as_ref().unwrap();
        assert_eq!(readiness.initial_delay_seconds, Some(15));
        assert_eq!(readiness.timeout_seconds, Some(5));
    }

    #[test]
    fn test_all_resources_carry_identical_labels() {
        let labels = test_labels();
        let resources =
            KafkaResources::build(&test_identity(), &labels, &test_config()).unwrap();

        assert_eq!(resources.client_service.metadata.labels, Some(labels.clone()));
        assert_eq!(
            resources.headless_service.metadata.labels,
            Some(labels.clone())
        );
        assert_eq!(resources.stateful_set.metadata.labels, Some(labels));
    }

    #[test]
    fn test_selector_binding_between_service_and_pods() {
        let identity = test_identity();
        let resources =
            KafkaResources::build(&identity, &test_labels(), &test_config()).unwrap();

        let expected = selector_labels(&identity);
        let headless_selector = resources
            .headless_service
            .spec
            .unwrap()
            .selector
            .unwrap();
        let pod_labels = resources
            .stateful_set
            .spec
            .unwrap()
            .template
            .metadata
            .unwrap()
            .labels
            .unwrap();

        assert_eq!(headless_selector, expected);
        assert_eq!(pod_labels, expected);
    }

    #[test]
    fn test_empty_labels_are_valid() {
        let resources =
            KafkaResources::build(&test_identity(), &BTreeMap::new(), &test_config()).unwrap();
        assert_eq!(
            resources.client_service.metadata.labels,
            Some(BTreeMap::new())
        );
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = KafkaConfig {
            replicas: 0,
            ..test_config()
        };
        let err = KafkaResources::build(&test_identity(), &test_labels(), &config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }
}
