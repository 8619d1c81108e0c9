//! Mock store for driving the lifecycle reconciler without a cluster.
//!
//! `MockStore` implements the production `ClusterStore` trait over in-memory
//! maps, records every call in order, and can be armed to fail a specific
//! call so partial-failure behavior can be exercised.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;

use kafka_operator::store::{ClusterStore, Lookup};

/// One remote call observed by the mock store, in issue order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    GetService(String),
    GetStatefulSet(String),
    ApplyService(String),
    ApplyStatefulSet(String),
    DeleteService(String),
    DeleteStatefulSet(String),
}

impl StoreCall {
    /// Whether the call mutates store state (anything but a probe).
    pub fn is_mutating(&self) -> bool {
        !matches!(self, StoreCall::GetService(_) | StoreCall::GetStatefulSet(_))
    }
}

#[derive(Default)]
struct MockState {
    services: BTreeMap<(String, String), Service>,
    stateful_sets: BTreeMap<(String, String), StatefulSet>,
    calls: Vec<StoreCall>,
    failures: Vec<StoreCall>,
}

/// In-memory stand-in for the cluster resource store.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<MockState>,
}

fn unavailable() -> kube::Error {
    kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: "the server is currently unable to handle the request".to_string(),
        reason: "ServiceUnavailable".to_string(),
        code: 503,
    })
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the store to fail the next call matching `call`.
    pub fn fail_on(&self, call: StoreCall) {
        self.lock().failures.push(call);
    }

    /// All calls observed so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Drain the observed calls, leaving resource state untouched.
    pub fn take_calls(&self) -> Vec<StoreCall> {
        std::mem::take(&mut self.lock().calls)
    }

    /// Names of services currently in the store.
    pub fn service_names(&self) -> Vec<String> {
        self.lock()
            .services
            .keys()
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Names of stateful sets currently in the store.
    pub fn stateful_set_names(&self) -> Vec<String> {
        self.lock()
            .stateful_sets
            .keys()
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Fetch a stored service by namespace and name.
    pub fn service(&self, namespace: &str, name: &str) -> Option<Service> {
        self.lock()
            .services
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Fetch a stored stateful set by namespace and name.
    pub fn stateful_set(&self, namespace: &str, name: &str) -> Option<StatefulSet> {
        self.lock()
            .stateful_sets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock store lock poisoned")
    }

    /// Record the call and fail it if a matching failure is armed.
    fn observe(&self, call: StoreCall) -> Result<(), kube::Error> {
        let mut state = self.lock();
        state.calls.push(call.clone());
        if let Some(position) = state.failures.iter().position(|f| *f == call) {
            state.failures.remove(position);
            return Err(unavailable());
        }
        Ok(())
    }

    fn key(namespace: &str, name: &str) -> (String, String) {
        (namespace.to_string(), name.to_string())
    }
}

#[async_trait]
impl ClusterStore for MockStore {
    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Lookup<Service>, kube::Error> {
        self.observe(StoreCall::GetService(name.to_string()))?;
        Ok(self
            .lock()
            .services
            .get(&Self::key(namespace, name))
            .cloned()
            .into())
    }

    async fn get_stateful_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Lookup<StatefulSet>, kube::Error> {
        self.observe(StoreCall::GetStatefulSet(name.to_string()))?;
        Ok(self
            .lock()
            .stateful_sets
            .get(&Self::key(namespace, name))
            .cloned()
            .into())
    }

    async fn apply_service(&self, namespace: &str, service: &Service) -> Result<(), kube::Error> {
        let name = service.metadata.name.clone().unwrap_or_default();
        self.observe(StoreCall::ApplyService(name.clone()))?;
        self.lock()
            .services
            .insert(Self::key(namespace, &name), service.clone());
        Ok(())
    }

    async fn apply_stateful_set(
        &self,
        namespace: &str,
        stateful_set: &StatefulSet,
    ) -> Result<(), kube::Error> {
        let name = stateful_set.metadata.name.clone().unwrap_or_default();
        self.observe(StoreCall::ApplyStatefulSet(name.clone()))?;
        self.lock()
            .stateful_sets
            .insert(Self::key(namespace, &name), stateful_set.clone());
        Ok(())
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        self.observe(StoreCall::DeleteService(name.to_string()))?;
        self.lock().services.remove(&Self::key(namespace, name));
        Ok(())
    }

    async fn delete_stateful_set(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        self.observe(StoreCall::DeleteStatefulSet(name.to_string()))?;
        self.lock()
            .stateful_sets
            .remove(&Self::key(namespace, name));
        Ok(())
    }
}
