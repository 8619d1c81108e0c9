//! Cluster configuration for Kafka deployments.
//!
//! The resource builders take an explicit [`KafkaConfig`] rather than reading
//! implicit defaults; the literal defaults of the stock broker deployment
//! live here as named constants so the caller's configuration layer can
//! supply them.

use crate::controller::error::{Error, Result};

/// Client port every Kafka broker exposes.
pub const CLIENT_PORT: i32 = 9092;

/// Name of the emptyDir volume holding broker data.
pub const DATA_VOLUME_NAME: &str = "kafka-storage";

/// Default mount path for broker data.
pub const DEFAULT_DATA_PATH: &str = "/var/lib/kafka";

/// Default broker container image.
pub const DEFAULT_IMAGE: &str = "enmasseproject/kafka-statefulsets:latest";

/// Default broker replica count.
pub const DEFAULT_REPLICAS: i32 = 3;

/// Health check script baked into the default broker image.
pub const DEFAULT_HEALTHCHECK_SCRIPT: &str = "/opt/kafka/kafka_healthcheck.sh";

/// Default probe initial delay in seconds.
pub const DEFAULT_PROBE_INITIAL_DELAY: i32 = 15;

/// Default probe timeout in seconds.
pub const DEFAULT_PROBE_TIMEOUT: i32 = 5;

/// An executed health check with its timing.
///
/// A zero initial delay is valid and means "probe immediately".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeSpec {
    /// Command executed inside the broker container.
    pub command: Vec<String>,
    /// Seconds to wait before the first probe.
    pub initial_delay_seconds: i32,
    /// Seconds before a single probe attempt is considered failed.
    pub timeout_seconds: i32,
}

impl Default for ProbeSpec {
    fn default() -> Self {
        Self {
            command: vec![DEFAULT_HEALTHCHECK_SCRIPT.to_string()],
            initial_delay_seconds: DEFAULT_PROBE_INITIAL_DELAY,
            timeout_seconds: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Desired shape of one Kafka cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KafkaConfig {
    /// Number of broker replicas (must be at least 1).
    pub replicas: i32,
    /// Broker container image reference.
    pub image: String,
    /// Mount path for the broker data volume.
    pub data_path: String,
    /// Liveness probe definition.
    pub liveness: ProbeSpec,
    /// Readiness probe definition.
    pub readiness: ProbeSpec,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            replicas: DEFAULT_REPLICAS,
            image: DEFAULT_IMAGE.to_string(),
            data_path: DEFAULT_DATA_PATH.to_string(),
            liveness: ProbeSpec::default(),
            readiness: ProbeSpec::default(),
        }
    }
}

impl KafkaConfig {
    /// Validate the configuration.
    ///
    /// Runs before any resource value is built, so an invalid configuration
    /// never reaches the API server.
    pub fn validate(&self) -> Result<()> {
        if self.replicas < 1 {
            return Err(Error::InvalidConfiguration(format!(
                "replicas must be at least 1, got {}",
                self.replicas
            )));
        }
        if self.image.is_empty() {
            return Err(Error::InvalidConfiguration(
                "image must not be empty".to_string(),
            ));
        }
        for probe in [&self.liveness, &self.readiness] {
            if probe.initial_delay_seconds < 0 || probe.timeout_seconds < 0 {
                return Err(Error::InvalidConfiguration(
                    "probe timings must not be negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}
