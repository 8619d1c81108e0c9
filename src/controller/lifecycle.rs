//! Cluster lifecycle orchestration.
//!
//! [`ClusterReconciler`] drives the three cluster resources through creation
//! and deletion in dependency order. It holds no state of its own: the store
//! is the sole source of truth, probed afresh on every call.

use tracing::{debug, info};

use crate::cluster::identity::{ClusterIdentity, ClusterLabels};
use crate::cluster::resources::KafkaResources;
use crate::config::KafkaConfig;
use crate::controller::error::{Error, Result};
use crate::store::{ClusterStore, Lookup, ResourceKind, StoreOp};

/// Orchestrates create/delete sequencing for one cluster's resources.
pub struct ClusterReconciler<S> {
    store: S,
}

impl<S: ClusterStore> ClusterReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create or replace every resource of the cluster.
    ///
    /// Resources are applied client service first, headless service second,
    /// stateful set last: the stateful set names the headless service as its
    /// network-identity provider, and broker pods must not start before that
    /// identity resolves. Each apply is create-or-replace, so repeated calls
    /// with the same input converge on the same resource set.
    ///
    /// On failure the sequence stops; resources applied earlier in the same
    /// call are left in place and a retry of the call completes the rest.
    pub async fn create(
        &self,
        identity: &ClusterIdentity,
        labels: &ClusterLabels,
        config: &KafkaConfig,
    ) -> Result<()> {
        let resources = KafkaResources::build(identity, labels, config)?;
        let namespace = identity.namespace();

        debug!(
            name = %identity.name(),
            namespace = %namespace,
            replicas = config.replicas,
            "Applying cluster resources"
        );

        self.store
            .apply_service(namespace, &resources.client_service)
            .await
            .map_err(|e| {
                Error::store(
                    ResourceKind::ClientService,
                    StoreOp::Apply,
                    identity.name(),
                    e,
                )
            })?;

        self.store
            .apply_service(namespace, &resources.headless_service)
            .await
            .map_err(|e| {
                Error::store(
                    ResourceKind::HeadlessService,
                    StoreOp::Apply,
                    identity.headless_name(),
                    e,
                )
            })?;

        self.store
            .apply_stateful_set(namespace, &resources.stateful_set)
            .await
            .map_err(|e| {
                Error::store(
                    ResourceKind::StatefulSet,
                    StoreOp::Apply,
                    identity.name(),
                    e,
                )
            })?;

        info!(name = %identity.name(), namespace = %namespace, "Cluster resources applied");
        Ok(())
    }

    /// Delete every resource of the cluster that still exists.
    ///
    /// Deletion order is client service, stateful set, headless service: the
    /// stateful set is removed before the headless service it references, so
    /// no resource is ever left pointing at an already-deleted dependency.
    ///
    /// Each deletion is gated on an existence probe and absent resources are
    /// skipped, which makes the call idempotent and safe on a
    /// partially-created or already-deleted cluster. A probe failure aborts
    /// the remaining sequence; completed deletions stand.
    pub async fn delete(&self, identity: &ClusterIdentity) -> Result<()> {
        let namespace = identity.namespace();

        debug!(name = %identity.name(), namespace = %namespace, "Deleting cluster resources");

        self.delete_service_if_present(ResourceKind::ClientService, namespace, identity.name())
            .await?;
        self.delete_stateful_set_if_present(namespace, identity.name())
            .await?;
        self.delete_service_if_present(
            ResourceKind::HeadlessService,
            namespace,
            identity.headless_name(),
        )
        .await?;

        info!(name = %identity.name(), namespace = %namespace, "Cluster resources deleted");
        Ok(())
    }

    async fn delete_service_if_present(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        let found = self
            .store
            .get_service(namespace, name)
            .await
            .map_err(|e| Error::store(kind, StoreOp::Probe, name, e))?;

        match found {
            Lookup::Present(_) => {
                self.store
                    .delete_service(namespace, name)
                    .await
                    .map_err(|e| Error::store(kind, StoreOp::Delete, name, e))?;
                debug!(name = %name, kind = %kind, "Deleted service");
            }
            Lookup::Absent => {
                debug!(name = %name, kind = %kind, "Service already absent, skipping");
            }
        }
        Ok(())
    }

    async fn delete_stateful_set_if_present(&self, namespace: &str, name: &str) -> Result<()> {
        let kind = ResourceKind::StatefulSet;
        let found = self
            .store
            .get_stateful_set(namespace, name)
            .await
            .map_err(|e| Error::store(kind, StoreOp::Probe, name, e))?;

        match found {
            Lookup::Present(_) => {
                self.store
                    .delete_stateful_set(namespace, name)
                    .await
                    .map_err(|e| Error::store(kind, StoreOp::Delete, name, e))?;
                debug!(name = %name, "Deleted stateful set");
            }
            Lookup::Absent => {
                debug!(name = %name, "Stateful set already absent, skipping");
            }
        }
        Ok(())
    }
}
