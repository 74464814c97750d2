//! Component store error types.

use crate::entity::Entity;

/// Errors raised by the component store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The entity does not have the requested component.
    #[error("component '{kind}' not found on {entity}")]
    NotFound { kind: &'static str, entity: Entity },

    /// The component kind was never registered with this store.
    #[error("unknown component kind: {0}")]
    UnknownKind(String),

    /// A partial record did not satisfy the kind's schema.
    #[error("validation error on '{component}': {message}")]
    Validation { component: String, message: String },

    /// Failed to encode a component record.
    #[error("failed to encode component: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a component record.
    #[error("failed to decode component: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Failed to convert a component record to or from JSON.
    #[error("json conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}
