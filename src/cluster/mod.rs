//! Kafka cluster resource model.
//!
//! | Item | Purpose |
//! |------|---------|
//! | `ClusterIdentity` | Naming conventions for one cluster |
//! | `KafkaResources` | The client Service, headless Service, and StatefulSet |

pub mod identity;
pub mod resources;

pub use identity::{
    cluster_from_config_map, cluster_from_stateful_set, ClusterIdentity, ClusterLabels,
};
pub use resources::KafkaResources;
