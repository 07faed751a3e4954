//! Error types for capability discovery and resolution

use thiserror::Error;

/// Configuration-time registry failures. Never retried and never swallowed;
/// callers see these with their original message.
#[derive(Debug, Error, Clone)]
pub enum RegistryError {
    /// The requested namespace is absent from the registration table.
    #[error("discovery failed: unknown namespace '{0}'")]
    Discovery(String),

    /// The capability name was never discovered.
    #[error("unknown capability: '{0}'")]
    UnknownCapability(String),

    /// The provider exists but does not implement the requested interface.
    #[error("provider '{name}' does not implement {interface}")]
    ImplementationNotFound { name: String, interface: String },

    /// The provider factory failed to build an instance.
    #[error("failed to build provider '{name}': {reason}")]
    Build { name: String, reason: String },
}
