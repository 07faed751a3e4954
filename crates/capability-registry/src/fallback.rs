//! Ordered fallback chains over same-capability backend instances
//!
//! Different backends covering the "same" capability may each only partially
//! cover the application under test. A [`FallbackHandle`] keeps call sites
//! uniform: it implements the capability interface itself and forwards every
//! operation per the try-next rule, remembering which member last succeeded.

use async_trait::async_trait;
use parking_lot::Mutex;
use sightline_core_types::{
    BoundingBox, CapabilityError, DetectionMatch, ElementSource, Frame, ImageDetector, QuorumRule,
    TextDetector, TextRegion,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Ordered chain of 1..N same-capability instances with a last-successful
/// "current" pointer.
///
/// A chain with zero members reports failure for every operation without
/// panicking. The design assumes at most one in-flight operation per handle;
/// concurrent callers must supply their own mutual exclusion or use distinct
/// handles.
pub struct FallbackHandle<T: ?Sized> {
    members: Vec<Arc<T>>,
    current: Mutex<Option<usize>>,
}

impl<T: ?Sized> FallbackHandle<T> {
    /// Build a handle over an ordered (possibly empty) member list.
    pub fn new(members: Vec<Arc<T>>) -> Self {
        Self {
            members,
            current: Mutex::new(None),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// The most recently successful member, or none.
    pub fn current(&self) -> Option<Arc<T>> {
        let index = *self.current.lock();
        index.map(|index| Arc::clone(&self.members[index]))
    }

    /// Iterate members in fallback order.
    pub fn members(&self) -> &[Arc<T>] {
        &self.members
    }

    /// Try `op` against each member in order. The first member that succeeds
    /// becomes "current" and its result is returned. When every member fails
    /// the pointer clears and the **last** member's failure is surfaced; an
    /// instance answering `Unsupported` counts as a failing instance.
    pub async fn invoke<R, F, Fut>(&self, operation: &str, mut op: F) -> Result<R, CapabilityError>
    where
        F: FnMut(Arc<T>) -> Fut,
        Fut: Future<Output = Result<R, CapabilityError>>,
    {
        let mut last_error: Option<CapabilityError> = None;

        for (index, member) in self.members.iter().enumerate() {
            match op(Arc::clone(member)).await {
                Ok(result) => {
                    *self.current.lock() = Some(index);
                    return Ok(result);
                }
                Err(err) => {
                    debug!(operation, index, error = %err, "fallback member failed");
                    last_error = Some(err);
                }
            }
        }

        *self.current.lock() = None;
        match last_error {
            Some(err) => {
                warn!(operation, members = self.members.len(), "fallback exhausted");
                Err(err)
            }
            None => Err(CapabilityError::unsupported(operation)),
        }
    }
}

#[async_trait]
impl ElementSource for FallbackHandle<dyn ElementSource> {
    async fn capture(&self) -> Result<Frame, CapabilityError> {
        self.invoke("capture", |member| async move { member.capture().await })
            .await
    }

    async fn locate_by_query(
        &self,
        query: &str,
    ) -> Result<Option<DetectionMatch>, CapabilityError> {
        self.invoke("locate_by_query", |member| async move {
            member.locate_by_query(query).await
        })
        .await
    }

    async fn assert_elements(
        &self,
        queries: &[String],
        timeout: Duration,
        rule: QuorumRule,
    ) -> Result<bool, CapabilityError> {
        self.invoke("assert_elements", |member| async move {
            member.assert_elements(queries, timeout, rule).await
        })
        .await
    }

    fn supports_dom_queries(&self) -> bool {
        self.members
            .iter()
            .any(|member| member.supports_dom_queries())
    }
}

#[async_trait]
impl TextDetector for FallbackHandle<dyn TextDetector> {
    async fn find_element(
        &self,
        frame: &Frame,
        text: &str,
        index: Option<usize>,
    ) -> Result<Option<DetectionMatch>, CapabilityError> {
        self.invoke("find_element", |member| async move {
            member.find_element(frame, text, index).await
        })
        .await
    }

    async fn detect_all(&self, frame: &Frame) -> Result<Vec<TextRegion>, CapabilityError> {
        self.invoke("detect_all", |member| async move {
            member.detect_all(frame).await
        })
        .await
    }
}

#[async_trait]
impl ImageDetector for FallbackHandle<dyn ImageDetector> {
    async fn find_element(
        &self,
        frame: &Frame,
        template: &str,
        index: Option<usize>,
    ) -> Result<Option<DetectionMatch>, CapabilityError> {
        self.invoke("find_element", |member| async move {
            member.find_element(frame, template, index).await
        })
        .await
    }

    async fn match_template(
        &self,
        frame: &Frame,
        template: &str,
    ) -> Result<Vec<BoundingBox>, CapabilityError> {
        self.invoke("match_template", |member| async move {
            member.match_template(frame, template).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_core_types::FrameFormat;

    struct FixedSource {
        label: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl ElementSource for FixedSource {
        async fn capture(&self) -> Result<Frame, CapabilityError> {
            if self.fail {
                Err(CapabilityError::backend(format!("{} is down", self.label)))
            } else {
                let mut frame = Frame::new(vec![0u8; 4], FrameFormat::Png, 1, 1);
                frame.id = self.label.to_string();
                Ok(frame)
            }
        }

        fn supports_dom_queries(&self) -> bool {
            !self.fail
        }
    }

    fn source(label: &'static str, fail: bool) -> Arc<dyn ElementSource> {
        Arc::new(FixedSource { label, fail })
    }

    #[tokio::test]
    async fn test_first_success_wins_and_becomes_current() {
        let b = source("b", false);
        let handle = FallbackHandle::new(vec![source("a", true), Arc::clone(&b)]);

        let frame = handle.capture().await.unwrap();
        assert_eq!(frame.id, "b");

        let current = handle.current().unwrap();
        assert!(Arc::ptr_eq(&current, &b));
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_last_error_and_clears_current() {
        let handle = FallbackHandle::new(vec![source("a", true), source("b", true)]);

        let err = handle.capture().await.unwrap_err();
        assert!(err.to_string().contains("b is down"));
        assert!(handle.current().is_none());
    }

    #[tokio::test]
    async fn test_empty_handle_fails_without_panicking() {
        let handle: FallbackHandle<dyn ElementSource> = FallbackHandle::new(Vec::new());

        assert!(handle.capture().await.is_err());
        assert!(handle.locate_by_query("//a").await.is_err());
        assert!(handle.current().is_none());
        assert!(!handle.supports_dom_queries());
    }

    #[tokio::test]
    async fn test_unsupported_counts_as_failing_member() {
        struct CaptureOnly;

        #[async_trait]
        impl ElementSource for CaptureOnly {
            async fn capture(&self) -> Result<Frame, CapabilityError> {
                Ok(Frame::new(vec![0u8; 4], FrameFormat::Png, 1, 1))
            }
        }

        struct QuerySource;

        #[async_trait]
        impl ElementSource for QuerySource {
            async fn capture(&self) -> Result<Frame, CapabilityError> {
                Ok(Frame::new(vec![0u8; 4], FrameFormat::Png, 1, 1))
            }

            async fn locate_by_query(
                &self,
                _query: &str,
            ) -> Result<Option<DetectionMatch>, CapabilityError> {
                Ok(Some(DetectionMatch::from_bbox(BoundingBox::new(
                    0.0, 0.0, 10.0, 10.0,
                ))))
            }

            fn supports_dom_queries(&self) -> bool {
                true
            }
        }

        let handle: FallbackHandle<dyn ElementSource> = FallbackHandle::new(vec![
            Arc::new(CaptureOnly) as Arc<dyn ElementSource>,
            Arc::new(QuerySource),
        ]);

        // CaptureOnly lacks the operation; the chain falls through to QuerySource.
        let hit = handle.locate_by_query("//button").await.unwrap();
        assert!(hit.is_some());
        assert!(handle.supports_dom_queries());
    }

    #[tokio::test]
    async fn test_current_moves_with_successes() {
        let a = source("a", false);
        let b = source("b", false);
        let handle = FallbackHandle::new(vec![Arc::clone(&a), b]);

        handle.capture().await.unwrap();
        assert!(Arc::ptr_eq(&handle.current().unwrap(), &a));
    }
}
