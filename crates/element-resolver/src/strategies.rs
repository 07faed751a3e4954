//! Detection strategies
//!
//! Three strategies in fixed priority order:
//! 1. Dom - DOM/accessibility queries through the element source
//! 2. TextDetection - optical text search over a captured frame
//! 3. ImageDetection - template matching over a captured frame
//!
//! Per-attempt failures, including an exhausted fallback chain underneath,
//! are logged and folded into not-found so polling stays composable;
//! absence itself is never an error.

use crate::annotate::annotate_frame;
use crate::errors::ResolverError;
use crate::types::{ClassifiedElement, LocateResult, StrategyKind};
use async_trait::async_trait;
use sightline_core_types::{
    CapabilityError, DetectionMatch, ElementSource, Frame, ImageDetector, TextDetector,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Strategy trait, polymorphic over single-element lookup and grouped
/// evaluation against one captured frame.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Strategy kind.
    fn kind(&self) -> StrategyKind;

    /// Attempt to locate a single element. `None` means not-found.
    async fn locate(&self, element: &ClassifiedElement) -> Option<LocateResult>;

    /// Evaluate a group of same-class elements so one capture serves the
    /// whole group. Returns (raw descriptor, hit) per element.
    async fn check_group(
        &self,
        frame: &Frame,
        elements: &[ClassifiedElement],
    ) -> Vec<(String, Option<DetectionMatch>)>;

    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

fn strategy_failed(kind: StrategyKind, err: CapabilityError) -> ResolverError {
    ResolverError::StrategyFailed {
        strategy: kind.name().to_string(),
        reason: err.to_string(),
    }
}

/// Fold a per-attempt failure into not-found, keeping the log trail.
fn swallow(kind: StrategyKind, element: &ClassifiedElement, err: ResolverError) {
    warn!(
        strategy = kind.name(),
        element = element.raw.as_str(),
        error = %err,
        "attempt failed; treating as not found"
    );
}

/// DOM/accessibility query strategy.
///
/// Inapplicable to image-classified or forced-text descriptors; the manager
/// never routes those here.
pub struct DomElementStrategy {
    source: Arc<dyn ElementSource>,
}

impl DomElementStrategy {
    pub fn new(source: Arc<dyn ElementSource>) -> Self {
        Self { source }
    }

    async fn try_locate(
        &self,
        element: &ClassifiedElement,
    ) -> Result<Option<DetectionMatch>, ResolverError> {
        self.source
            .locate_by_query(&element.query)
            .await
            .map_err(|e| strategy_failed(StrategyKind::Dom, e))
    }
}

#[async_trait]
impl Strategy for DomElementStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Dom
    }

    async fn locate(&self, element: &ClassifiedElement) -> Option<LocateResult> {
        debug!(query = element.query.as_str(), "dom lookup");
        match self.try_locate(element).await {
            Ok(Some(hit)) => Some(LocateResult {
                strategy: StrategyKind::Dom,
                center: hit.center,
                bbox: hit.bbox,
                annotated: None,
            }),
            Ok(None) => None,
            Err(err) => {
                swallow(StrategyKind::Dom, element, err);
                None
            }
        }
    }

    async fn check_group(
        &self,
        _frame: &Frame,
        elements: &[ClassifiedElement],
    ) -> Vec<(String, Option<DetectionMatch>)> {
        let mut results = Vec::with_capacity(elements.len());
        for element in elements {
            let hit = match self.try_locate(element).await {
                Ok(hit) => hit,
                Err(err) => {
                    swallow(StrategyKind::Dom, element, err);
                    None
                }
            };
            results.push((element.raw.clone(), hit));
        }
        results
    }
}

/// Optical text detection strategy.
pub struct TextDetectionStrategy {
    source: Arc<dyn ElementSource>,
    detector: Arc<dyn TextDetector>,
}

impl TextDetectionStrategy {
    pub fn new(source: Arc<dyn ElementSource>, detector: Arc<dyn TextDetector>) -> Self {
        Self { source, detector }
    }

    async fn capture(&self) -> Result<Frame, ResolverError> {
        self.source
            .capture()
            .await
            .map_err(|e| ResolverError::CaptureFailed(e.to_string()))
    }
}

#[async_trait]
impl Strategy for TextDetectionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TextDetection
    }

    async fn locate(&self, element: &ClassifiedElement) -> Option<LocateResult> {
        debug!(text = element.query.as_str(), "text detection lookup");
        let frame = match self.capture().await {
            Ok(frame) => frame,
            Err(err) => {
                swallow(StrategyKind::TextDetection, element, err);
                return None;
            }
        };

        match self.detector.find_element(&frame, &element.query, None).await {
            Ok(Some(hit)) => {
                let annotated = annotate_frame(&frame, &[hit.bbox]).ok();
                Some(LocateResult {
                    strategy: StrategyKind::TextDetection,
                    center: hit.center,
                    bbox: hit.bbox,
                    annotated,
                })
            }
            Ok(None) => None,
            Err(err) => {
                swallow(
                    StrategyKind::TextDetection,
                    element,
                    strategy_failed(StrategyKind::TextDetection, err),
                );
                None
            }
        }
    }

    async fn check_group(
        &self,
        frame: &Frame,
        elements: &[ClassifiedElement],
    ) -> Vec<(String, Option<DetectionMatch>)> {
        let mut results = Vec::with_capacity(elements.len());
        for element in elements {
            let hit = match self.detector.find_element(frame, &element.query, None).await {
                Ok(hit) => hit,
                Err(err) => {
                    swallow(
                        StrategyKind::TextDetection,
                        element,
                        strategy_failed(StrategyKind::TextDetection, err),
                    );
                    None
                }
            };
            results.push((element.raw.clone(), hit));
        }
        results
    }
}

/// Image-template matching strategy.
pub struct ImageDetectionStrategy {
    source: Arc<dyn ElementSource>,
    detector: Arc<dyn ImageDetector>,
}

impl ImageDetectionStrategy {
    pub fn new(source: Arc<dyn ElementSource>, detector: Arc<dyn ImageDetector>) -> Self {
        Self { source, detector }
    }
}

#[async_trait]
impl Strategy for ImageDetectionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ImageDetection
    }

    async fn locate(&self, element: &ClassifiedElement) -> Option<LocateResult> {
        debug!(template = element.query.as_str(), "template lookup");
        let frame = match self.source.capture().await {
            Ok(frame) => frame,
            Err(err) => {
                swallow(
                    StrategyKind::ImageDetection,
                    element,
                    ResolverError::CaptureFailed(err.to_string()),
                );
                return None;
            }
        };

        match self.detector.find_element(&frame, &element.query, None).await {
            Ok(Some(hit)) => {
                let annotated = annotate_frame(&frame, &[hit.bbox]).ok();
                Some(LocateResult {
                    strategy: StrategyKind::ImageDetection,
                    center: hit.center,
                    bbox: hit.bbox,
                    annotated,
                })
            }
            Ok(None) => None,
            Err(err) => {
                swallow(
                    StrategyKind::ImageDetection,
                    element,
                    strategy_failed(StrategyKind::ImageDetection, err),
                );
                None
            }
        }
    }

    async fn check_group(
        &self,
        frame: &Frame,
        elements: &[ClassifiedElement],
    ) -> Vec<(String, Option<DetectionMatch>)> {
        let mut results = Vec::with_capacity(elements.len());
        for element in elements {
            let hit = match self.detector.find_element(frame, &element.query, None).await {
                Ok(hit) => hit,
                Err(err) => {
                    swallow(
                        StrategyKind::ImageDetection,
                        element,
                        strategy_failed(StrategyKind::ImageDetection, err),
                    );
                    None
                }
            };
            results.push((element.raw.clone(), hit));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify_element, DefaultClassifier};
    use sightline_core_types::{BoundingBox, FrameFormat, TextRegion};

    fn element(raw: &str) -> ClassifiedElement {
        classify_element(&DefaultClassifier::new(), raw, None)
    }

    fn raw_frame() -> Frame {
        Frame::new(vec![0u8; 4], FrameFormat::Png, 2, 2)
    }

    struct QuerySource {
        hit: Option<DetectionMatch>,
    }

    #[async_trait]
    impl ElementSource for QuerySource {
        async fn capture(&self) -> Result<Frame, CapabilityError> {
            Ok(raw_frame())
        }

        async fn locate_by_query(
            &self,
            _query: &str,
        ) -> Result<Option<DetectionMatch>, CapabilityError> {
            Ok(self.hit)
        }

        fn supports_dom_queries(&self) -> bool {
            true
        }
    }

    struct MatchingTextDetector {
        needle: &'static str,
    }

    #[async_trait]
    impl TextDetector for MatchingTextDetector {
        async fn find_element(
            &self,
            _frame: &Frame,
            text: &str,
            _index: Option<usize>,
        ) -> Result<Option<DetectionMatch>, CapabilityError> {
            if text == self.needle {
                Ok(Some(DetectionMatch::from_bbox(BoundingBox::new(
                    4.0, 4.0, 40.0, 12.0,
                ))))
            } else {
                Ok(None)
            }
        }

        async fn detect_all(&self, _frame: &Frame) -> Result<Vec<TextRegion>, CapabilityError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_dom_strategy_hit_carries_geometry() {
        let hit = DetectionMatch::from_bbox(BoundingBox::new(10.0, 10.0, 20.0, 20.0));
        let strategy = DomElementStrategy::new(Arc::new(QuerySource { hit: Some(hit) }));

        let result = strategy.locate(&element("//button")).await.unwrap();
        assert_eq!(result.strategy, StrategyKind::Dom);
        assert_eq!(result.bbox, hit.bbox);
        assert_eq!(result.center, hit.center);
    }

    #[tokio::test]
    async fn test_dom_strategy_absence_is_none() {
        let strategy = DomElementStrategy::new(Arc::new(QuerySource { hit: None }));
        assert!(strategy.locate(&element("//button")).await.is_none());
    }

    #[tokio::test]
    async fn test_dom_strategy_swallows_backend_failure() {
        struct Failing;

        #[async_trait]
        impl ElementSource for Failing {
            async fn capture(&self) -> Result<Frame, CapabilityError> {
                Err(CapabilityError::backend("gone"))
            }

            async fn locate_by_query(
                &self,
                _query: &str,
            ) -> Result<Option<DetectionMatch>, CapabilityError> {
                Err(CapabilityError::backend("gone"))
            }
        }

        let strategy = DomElementStrategy::new(Arc::new(Failing));
        assert!(strategy.locate(&element("//button")).await.is_none());
    }

    #[tokio::test]
    async fn test_text_strategy_finds_stripped_text() {
        let strategy = TextDetectionStrategy::new(
            Arc::new(QuerySource { hit: None }),
            Arc::new(MatchingTextDetector { needle: "Submit" }),
        );

        // Raw frame bytes are not decodable, so annotation is skipped, but
        // the hit itself still comes through.
        let result = strategy.locate(&element("FORCE_TEXT:Submit")).await.unwrap();
        assert_eq!(result.strategy, StrategyKind::TextDetection);
        assert!(result.annotated.is_none());
    }

    #[tokio::test]
    async fn test_text_group_shares_one_frame() {
        let strategy = TextDetectionStrategy::new(
            Arc::new(QuerySource { hit: None }),
            Arc::new(MatchingTextDetector { needle: "Login" }),
        );

        let elements = vec![element("Login"), element("Missing")];
        let results = strategy.check_group(&raw_frame(), &elements).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_some());
        assert!(results[1].1.is_none());
    }
}
