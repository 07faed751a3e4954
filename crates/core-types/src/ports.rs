//! Capability port traits implemented by detection backends.
//!
//! The resolution core consumes these contracts; concrete drivers and vision
//! algorithms live behind them. Optional operations default to
//! [`CapabilityError::Unsupported`], which a fallback chain treats as a
//! failing instance for that call.

use crate::{BoundingBox, DetectionMatch, Frame, QuorumRule, TextRegion};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Per-attempt failure from a capability backend.
#[derive(Debug, Error, Clone)]
pub enum CapabilityError {
    /// The instance does not implement the requested operation.
    #[error("operation '{operation}' not supported by this backend")]
    Unsupported { operation: String },

    /// The backend attempted the operation and failed.
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl CapabilityError {
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Screen source for an application under test.
///
/// `capture` is mandatory; query-based operations are optional and gated by
/// the `supports_dom_queries` capability flag.
#[async_trait]
pub trait ElementSource: Send + Sync {
    /// Capture the current screen.
    async fn capture(&self) -> Result<Frame, CapabilityError>;

    /// Locate an element by DOM/accessibility query. `Ok(None)` means the
    /// query ran and matched nothing.
    async fn locate_by_query(
        &self,
        query: &str,
    ) -> Result<Option<DetectionMatch>, CapabilityError> {
        let _ = query;
        Err(CapabilityError::unsupported("locate_by_query"))
    }

    /// Grouped native assertion over DOM queries.
    async fn assert_elements(
        &self,
        queries: &[String],
        timeout: Duration,
        rule: QuorumRule,
    ) -> Result<bool, CapabilityError> {
        let _ = (queries, timeout, rule);
        Err(CapabilityError::unsupported("assert_elements"))
    }

    /// Whether this source can answer DOM/accessibility queries.
    fn supports_dom_queries(&self) -> bool {
        false
    }
}

/// Optical text detection over captured frames.
#[async_trait]
pub trait TextDetector: Send + Sync {
    /// Find the `index`-th occurrence (default first) of `text` in `frame`.
    async fn find_element(
        &self,
        frame: &Frame,
        text: &str,
        index: Option<usize>,
    ) -> Result<Option<DetectionMatch>, CapabilityError>;

    /// Detect every text region in the frame.
    async fn detect_all(&self, frame: &Frame) -> Result<Vec<TextRegion>, CapabilityError>;
}

/// Image-template matching over captured frames.
#[async_trait]
pub trait ImageDetector: Send + Sync {
    /// Find the `index`-th occurrence (default first) of the named template.
    async fn find_element(
        &self,
        frame: &Frame,
        template: &str,
        index: Option<usize>,
    ) -> Result<Option<DetectionMatch>, CapabilityError>;

    /// All regions matching the named template.
    async fn match_template(
        &self,
        frame: &Frame,
        template: &str,
    ) -> Result<Vec<BoundingBox>, CapabilityError>;
}
