//! Element resolution engine with multi-strategy fallback
//!
//! This crate implements the element-resolution core:
//! - Descriptor classification (DOM query / text / image template) with a
//!   pluggable heuristic and a force-text directive
//! - Three detection strategies tried in fixed priority order
//! - A strategy manager composing fallback chains of partially-capable
//!   backends into predictable pass/fail semantics
//! - A presence polling loop with ANY/ALL quorum under a timeout budget

pub mod annotate;
pub mod classify;
pub mod config;
pub mod errors;
pub mod manager;
pub mod presence;
pub mod strategies;
pub mod types;

pub use annotate::*;
pub use classify::*;
pub use config::*;
pub use errors::*;
pub use manager::*;
pub use presence::*;
pub use strategies::*;
pub use types::*;
