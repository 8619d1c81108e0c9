//! Store boundary for cluster resources.
//!
//! The lifecycle reconciler talks to the API server only through the
//! [`ClusterStore`] trait, so lifecycle sequencing can be driven against a
//! mock store in tests. [`KubeStore`] is the production implementation.
//!
//! Lookups return a [`Lookup`] rather than a bare boolean so "absent" stays
//! distinguishable from "lookup failed": a resource that cannot be probed is
//! never treated as gone.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use kube::api::{DeleteParams, Patch, PatchParams};
use kube::{Api, Client};

/// Field manager name for server-side apply.
pub const FIELD_MANAGER: &str = "kafka-operator";

/// Result of probing the store for a named resource.
#[derive(Clone, Debug)]
pub enum Lookup<T> {
    /// The resource exists in the store.
    Present(T),
    /// The resource does not exist. A valid negative result, not an error.
    Absent,
}

impl<T> Lookup<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Lookup::Present(_))
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(resource) => Lookup::Present(resource),
            None => Lookup::Absent,
        }
    }
}

/// The resource kinds one cluster is made of.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    ClientService,
    HeadlessService,
    StatefulSet,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::ClientService => write!(f, "client service"),
            ResourceKind::HeadlessService => write!(f, "headless service"),
            ResourceKind::StatefulSet => write!(f, "stateful set"),
        }
    }
}

/// The store operations issued during a lifecycle sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreOp {
    Probe,
    Apply,
    Delete,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreOp::Probe => write!(f, "probe"),
            StoreOp::Apply => write!(f, "apply"),
            StoreOp::Delete => write!(f, "delete"),
        }
    }
}

/// Operations the reconciler needs from the cluster resource store.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Look up a service by name.
    async fn get_service(&self, namespace: &str, name: &str)
        -> Result<Lookup<Service>, kube::Error>;

    /// Look up a stateful set by name.
    async fn get_stateful_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Lookup<StatefulSet>, kube::Error>;

    /// Create the service or overwrite it to match the given spec.
    async fn apply_service(&self, namespace: &str, service: &Service) -> Result<(), kube::Error>;

    /// Create the stateful set or overwrite it to match the given spec.
    async fn apply_stateful_set(
        &self,
        namespace: &str,
        stateful_set: &StatefulSet,
    ) -> Result<(), kube::Error>;

    /// Delete a service by name. Absence is not an error.
    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), kube::Error>;

    /// Delete a stateful set by name. Absence is not an error.
    async fn delete_stateful_set(&self, namespace: &str, name: &str) -> Result<(), kube::Error>;
}

/// Production store backed by the cluster API server.
///
/// Create-or-replace is realized with server-side apply, so repeated applies
/// of the same spec converge without "already exists" failures.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn stateful_sets(&self, namespace: &str) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map a delete result so a vanished resource counts as success; the goal
/// state is already reached.
fn ignore_not_found<T>(result: Result<T, kube::Error>) -> Result<(), kube::Error> {
    match result {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Lookup<Service>, kube::Error> {
        Ok(self.services(namespace).get_opt(name).await?.into())
    }

    async fn get_stateful_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Lookup<StatefulSet>, kube::Error> {
        Ok(self.stateful_sets(namespace).get_opt(name).await?.into())
    }

    async fn apply_service(&self, namespace: &str, service: &Service) -> Result<(), kube::Error> {
        let name = service.metadata.name.as_deref().unwrap_or_default();
        self.services(namespace)
            .patch(
                name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(service),
            )
            .await?;
        Ok(())
    }

    async fn apply_stateful_set(
        &self,
        namespace: &str,
        stateful_set: &StatefulSet,
    ) -> Result<(), kube::Error> {
        let name = stateful_set.metadata.name.as_deref().unwrap_or_default();
        self.stateful_sets(namespace)
            .patch(
                name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(stateful_set),
            )
            .await?;
        Ok(())
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        ignore_not_found(
            self.services(namespace)
                .delete(name, &DeleteParams::default())
                .await,
        )
    }

    async fn delete_stateful_set(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        ignore_not_found(
            self.stateful_sets(namespace)
                .delete(name, &DeleteParams::default())
                .await,
        )
    }
}
