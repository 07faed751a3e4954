//! Capability discovery and fallback chains
//!
//! This crate turns a process-start registration table into resolved backend
//! instances and composes same-capability instances into fault-tolerant
//! fallback chains:
//! - Namespace discovery into an immutable descriptor map
//! - Lazy, identity-cached instantiation per named provider
//! - Ordered try-next fallback with a last-successful "current" pointer

pub mod errors;
pub mod fallback;
pub mod registry;

pub use errors::*;
pub use fallback::*;
pub use registry::*;
