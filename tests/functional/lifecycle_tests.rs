//! Functional tests for the cluster lifecycle reconciler.
//!
//! Every test drives the production `ClusterReconciler` against the mock
//! store and asserts on the observed call trace and the resulting resource
//! set.

use kafka_operator::cluster::{cluster_from_config_map, KafkaResources};
use kafka_operator::config::KafkaConfig;
use kafka_operator::controller::{ClusterReconciler, Error};
use kafka_operator::store::{ResourceKind, StoreOp};

use crate::fixtures::{scenario, ClusterConfigMapBuilder};
use crate::mock_store::{MockStore, StoreCall};

#[tokio::test]
async fn test_create_applies_resources_in_dependency_order() {
    let (identity, labels, config) = scenario();
    let store = MockStore::new();
    let reconciler = ClusterReconciler::new(store);

    reconciler.create(&identity, &labels, &config).await.unwrap();

    assert_eq!(
        reconciler.store().calls(),
        vec![
            StoreCall::ApplyService("my-cluster".to_string()),
            StoreCall::ApplyService("my-cluster-headless".to_string()),
            StoreCall::ApplyStatefulSet("my-cluster".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_create_is_idempotent() {
    let (identity, labels, config) = scenario();
    let reconciler = ClusterReconciler::new(MockStore::new());

    reconciler.create(&identity, &labels, &config).await.unwrap();
    let first = reconciler.store().take_calls();

    // Second invocation with identical input succeeds, issues the same
    // create-or-replace sequence, and converges on the same resource set.
    reconciler.create(&identity, &labels, &config).await.unwrap();
    let second = reconciler.store().take_calls();

    assert_eq!(first, second);
    assert_eq!(reconciler.store().service_names().len(), 2);
    assert_eq!(reconciler.store().stateful_set_names().len(), 1);
}

#[tokio::test]
async fn test_create_reports_the_failing_resource() {
    let (identity, labels, config) = scenario();
    let store = MockStore::new();
    store.fail_on(StoreCall::ApplyService("my-cluster-headless".to_string()));
    let reconciler = ClusterReconciler::new(store);

    let err = reconciler
        .create(&identity, &labels, &config)
        .await
        .unwrap_err();

    match err {
        Error::Store { kind, op, .. } => {
            assert_eq!(kind, ResourceKind::HeadlessService);
            assert_eq!(op, StoreOp::Apply);
        }
        other => panic!("expected store error, got {other:?}"),
    }

    // The client service created before the failure is not rolled back, and
    // nothing after the failure was attempted.
    assert_eq!(
        reconciler.store().service_names(),
        vec!["my-cluster".to_string()]
    );
    assert!(reconciler.store().stateful_set_names().is_empty());
}

#[tokio::test]
async fn test_create_can_be_reinvoked_after_partial_failure() {
    let (identity, labels, config) = scenario();
    let store = MockStore::new();
    store.fail_on(StoreCall::ApplyStatefulSet("my-cluster".to_string()));
    let reconciler = ClusterReconciler::new(store);

    assert!(reconciler.create(&identity, &labels, &config).await.is_err());

    // Retrying the same call completes the remaining steps.
    reconciler.create(&identity, &labels, &config).await.unwrap();

    assert_eq!(reconciler.store().service_names().len(), 2);
    assert_eq!(
        reconciler.store().stateful_set_names(),
        vec!["my-cluster".to_string()]
    );
}

#[tokio::test]
async fn test_create_rejects_invalid_config_before_any_remote_call() {
    let (identity, labels, config) = scenario();
    let reconciler = ClusterReconciler::new(MockStore::new());

    let zero_replicas = KafkaConfig {
        replicas: 0,
        ..config.clone()
    };
    let err = reconciler
        .create(&identity, &labels, &zero_replicas)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));

    let empty_image = KafkaConfig {
        image: String::new(),
        ..config
    };
    let err = reconciler
        .create(&identity, &labels, &empty_image)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));

    assert!(reconciler.store().calls().is_empty());
}

#[tokio::test]
async fn test_delete_removes_in_reverse_dependency_order() {
    let (identity, labels, config) = scenario();
    let reconciler = ClusterReconciler::new(MockStore::new());
    reconciler.create(&identity, &labels, &config).await.unwrap();
    reconciler.store().take_calls();

    reconciler.delete(&identity).await.unwrap();

    assert_eq!(
        reconciler.store().calls(),
        vec![
            StoreCall::GetService("my-cluster".to_string()),
            StoreCall::DeleteService("my-cluster".to_string()),
            StoreCall::GetStatefulSet("my-cluster".to_string()),
            StoreCall::DeleteStatefulSet("my-cluster".to_string()),
            StoreCall::GetService("my-cluster-headless".to_string()),
            StoreCall::DeleteService("my-cluster-headless".to_string()),
        ]
    );
    assert!(reconciler.store().service_names().is_empty());
    assert!(reconciler.store().stateful_set_names().is_empty());
}

#[tokio::test]
async fn test_second_delete_issues_no_mutating_calls() {
    let (identity, labels, config) = scenario();
    let reconciler = ClusterReconciler::new(MockStore::new());
    reconciler.create(&identity, &labels, &config).await.unwrap();

    reconciler.delete(&identity).await.unwrap();
    reconciler.store().take_calls();

    // All probes come back absent; nothing is mutated.
    reconciler.delete(&identity).await.unwrap();
    let calls = reconciler.store().calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|call| !call.is_mutating()));
}

#[tokio::test]
async fn test_delete_on_never_created_cluster_is_a_noop() {
    let (identity, _, _) = scenario();
    let reconciler = ClusterReconciler::new(MockStore::new());

    reconciler.delete(&identity).await.unwrap();
    assert!(reconciler
        .store()
        .calls()
        .iter()
        .all(|call| !call.is_mutating()));
}

#[tokio::test]
async fn test_delete_cleans_up_a_partially_created_cluster() {
    let (identity, labels, config) = scenario();
    let store = MockStore::new();
    // Only the client service made it before the original create failed.
    store.fail_on(StoreCall::ApplyService("my-cluster-headless".to_string()));
    let reconciler = ClusterReconciler::new(store);
    assert!(reconciler.create(&identity, &labels, &config).await.is_err());

    reconciler.delete(&identity).await.unwrap();

    assert!(reconciler.store().service_names().is_empty());
    assert!(reconciler.store().stateful_set_names().is_empty());
}

#[tokio::test]
async fn test_delete_aborts_on_probe_failure() {
    let (identity, labels, config) = scenario();
    let store = MockStore::new();
    let reconciler = ClusterReconciler::new(store);
    reconciler.create(&identity, &labels, &config).await.unwrap();

    // A store communication failure while probing must not be treated as
    // "does not exist": the sequence stops and the error surfaces.
    reconciler
        .store()
        .fail_on(StoreCall::GetStatefulSet("my-cluster".to_string()));

    let err = reconciler.delete(&identity).await.unwrap_err();
    match err {
        Error::Store { kind, op, .. } => {
            assert_eq!(kind, ResourceKind::StatefulSet);
            assert_eq!(op, StoreOp::Probe);
        }
        other => panic!("expected store error, got {other:?}"),
    }

    // The client service deleted before the failure stays deleted; the
    // resources after the failing probe are untouched.
    assert_eq!(
        reconciler.store().service_names(),
        vec!["my-cluster-headless".to_string()]
    );
    assert_eq!(
        reconciler.store().stateful_set_names(),
        vec!["my-cluster".to_string()]
    );
}

#[tokio::test]
async fn test_full_lifecycle_scenario() {
    let (identity, labels, config) = scenario();
    let reconciler = ClusterReconciler::new(MockStore::new());

    reconciler.create(&identity, &labels, &config).await.unwrap();

    let client = reconciler.store().service("kafka", "my-cluster").unwrap();
    let client_spec = client.spec.unwrap();
    assert_eq!(client_spec.ports.unwrap()[0].port, 9092);
    assert_eq!(client_spec.cluster_ip, None);

    let headless = reconciler
        .store()
        .service("kafka", "my-cluster-headless")
        .unwrap();
    let headless_spec = headless.spec.unwrap();
    assert_eq!(headless_spec.cluster_ip, Some("None".to_string()));
    assert_eq!(headless_spec.ports.unwrap()[0].port, 9092);

    let sts = reconciler
        .store()
        .stateful_set("kafka", "my-cluster")
        .unwrap();
    let sts_spec = sts.spec.unwrap();
    assert_eq!(sts_spec.replicas, Some(3));
    assert_eq!(
        sts_spec.service_name,
        Some("my-cluster-headless".to_string())
    );

    // Tear down and verify a subsequent delete is a no-op.
    reconciler.delete(&identity).await.unwrap();
    assert!(reconciler.store().service_names().is_empty());
    assert!(reconciler.store().stateful_set_names().is_empty());

    reconciler.store().take_calls();
    reconciler.delete(&identity).await.unwrap();
    assert!(reconciler
        .store()
        .calls()
        .iter()
        .all(|call| !call.is_mutating()));
}

#[tokio::test]
async fn test_identity_from_config_map_drives_the_lifecycle() {
    // A discovered ConfigMap is enough to build, create, and delete a
    // cluster without further transformation.
    let config_map = ClusterConfigMapBuilder::new("my-cluster")
        .namespace("kafka")
        .label("app", "kafka")
        .build();
    let (identity, labels) = cluster_from_config_map(&config_map).unwrap();

    let config = KafkaConfig::default();
    let resources = KafkaResources::build(&identity, &labels, &config).unwrap();
    assert_eq!(
        resources.stateful_set.spec.unwrap().service_name,
        Some("my-cluster-headless".to_string())
    );

    let reconciler = ClusterReconciler::new(MockStore::new());
    reconciler.create(&identity, &labels, &config).await.unwrap();
    assert_eq!(reconciler.store().service_names().len(), 2);
    reconciler.delete(&identity).await.unwrap();
    assert!(reconciler.store().service_names().is_empty());
}
