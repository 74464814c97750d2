//! Simulation error types.

use engine_component::{Entity, StoreError};

/// Startup-time pipeline configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    /// A component kind was registered twice.
    #[error("component '{0}' registered more than once")]
    DuplicateComponent(String),

    /// A system triggers on a kind that was never registered.
    #[error("system '{system}' triggers on unregistered component '{kind}'")]
    UnknownKind { system: String, kind: String },

    /// A system depends on a kind that was never registered.
    #[error("system '{system}' depends on unknown component '{dependency}'")]
    UnknownDependency { system: String, dependency: String },

    /// A system is scheduled before a system it depends on.
    #[error(
        "system '{system}' (depth {depth}) runs before its dependency '{dependency}' (depth {dependency_depth})"
    )]
    DependencyOrder {
        system: String,
        depth: f32,
        dependency: String,
        dependency_depth: f32,
    },

    /// Dependencies form a cycle and cannot be linearised.
    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// Errors raised by the step and entity APIs.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// A structural operation targeted an entity that is not alive.
    #[error("{0} is not active")]
    InactiveEntity(Entity),

    /// No checkpoint was saved under this name.
    #[error("unknown checkpoint '{0}'")]
    UnknownCheckpoint(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to encode state: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode state: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("json conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while recording or replaying an input log.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("failed to encode input log: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode input log: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error(transparent)]
    Sim(#[from] SimError),

    /// The replayed session ended in a different state than was recorded.
    #[error("replay diverged: expected state hash {expected:#018x}, got {actual:#018x}")]
    Diverged { expected: u64, actual: u64 },
}
