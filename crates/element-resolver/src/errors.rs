//! Error types for the resolution engine
//!
//! Absence is never an error here: `locate` and presence assertions report
//! not-found through ordinary return values. These variants cover failures
//! that are logged and folded into not-found one layer up.

use thiserror::Error;

/// Resolution-layer failures.
#[derive(Debug, Error, Clone)]
pub enum ResolverError {
    /// Screen capture failed. Transient; the polling loop retries on the
    /// next iteration.
    #[error("frame capture failed: {0}")]
    CaptureFailed(String),

    /// A strategy attempt failed (including an exhausted fallback chain).
    #[error("strategy '{strategy}' failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    /// Frame annotation failed.
    #[error("annotation failed: {0}")]
    Annotation(String),
}
