//! End-to-end resolution flow: registration table -> registry -> fallback
//! chains -> strategy manager -> presence polling.

use async_trait::async_trait;
use capability_registry::{CapabilityRegistry, ProviderInstance, ProviderTable, RegistryError};
use element_resolver::{ElementClass, ResolutionConfig, StrategyKind, StrategyManager};
use sightline_core_types::{
    BoundingBox, CapabilityError, DetectionMatch, ElementSource, Frame, FrameFormat, QuorumRule,
    TextDetector, TextRegion,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Screen source that cannot answer queries and whose captures fail until
/// `fail_first` attempts have been burned.
struct FlakyCamera {
    captures: Arc<AtomicUsize>,
    fail_first: usize,
}

#[async_trait]
impl ElementSource for FlakyCamera {
    async fn capture(&self) -> Result<Frame, CapabilityError> {
        let n = self.captures.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            Err(CapabilityError::backend("camera not ready"))
        } else {
            Ok(Frame::new(vec![0u8; 16], FrameFormat::Png, 4, 4))
        }
    }
}

/// Text detector that only sees the configured words.
struct WordDetector {
    words: Vec<&'static str>,
}

#[async_trait]
impl TextDetector for WordDetector {
    async fn find_element(
        &self,
        _frame: &Frame,
        text: &str,
        _index: Option<usize>,
    ) -> Result<Option<DetectionMatch>, CapabilityError> {
        if self.words.contains(&text) {
            Ok(Some(DetectionMatch::from_bbox(BoundingBox::new(
                8.0, 8.0, 60.0, 14.0,
            ))))
        } else {
            Ok(None)
        }
    }

    async fn detect_all(&self, _frame: &Frame) -> Result<Vec<TextRegion>, CapabilityError> {
        Ok(self
            .words
            .iter()
            .map(|word| TextRegion {
                bbox: BoundingBox::new(8.0, 8.0, 60.0, 14.0),
                text: word.to_string(),
                confidence: 0.95,
            })
            .collect())
    }
}

fn provider_table(captures: Arc<AtomicUsize>) -> ProviderTable {
    let broken_captures = Arc::clone(&captures);
    ProviderTable::new()
        .register(
            "sources",
            "broken-camera",
            Arc::new(move || -> Result<ProviderInstance, RegistryError> {
                Ok(ProviderInstance::ElementSource(Arc::new(FlakyCamera {
                    captures: Arc::clone(&broken_captures),
                    fail_first: usize::MAX,
                })))
            }),
        )
        .register(
            "sources",
            "camera",
            Arc::new(move || -> Result<ProviderInstance, RegistryError> {
                Ok(ProviderInstance::ElementSource(Arc::new(FlakyCamera {
                    captures: Arc::clone(&captures),
                    fail_first: 0,
                })))
            }),
        )
        .register(
            "detectors",
            "word-ocr",
            Arc::new(|| -> Result<ProviderInstance, RegistryError> {
                Ok(ProviderInstance::TextDetector(Arc::new(WordDetector {
                    words: vec!["Login", "Submit"],
                })))
            }),
        )
}

fn wired_manager() -> StrategyManager {
    let captures = Arc::new(AtomicUsize::new(0));
    let registry = CapabilityRegistry::new(provider_table(captures));
    registry.discover("sources").unwrap();
    registry.discover("detectors").unwrap();

    let config = ResolutionConfig {
        element_sources: vec!["broken-camera".to_string(), "camera".to_string()],
        text_detectors: vec!["word-ocr".to_string()],
        poll_interval_ms: 50,
        ..ResolutionConfig::default()
    };

    StrategyManager::from_registry(&registry, &config).unwrap()
}

#[tokio::test]
async fn locate_falls_back_across_broken_source() {
    let manager = wired_manager();

    // The first source in the chain always fails to capture; the second
    // serves the frame the detector matches against.
    let result = manager.locate("Login").await.expect("should locate");
    assert_eq!(result.strategy, StrategyKind::TextDetection);
    assert_eq!(result.center, result.bbox.center());
}

#[tokio::test]
async fn locate_not_found_is_none_not_error() {
    let manager = wired_manager();
    assert!(manager.locate("Nonexistent").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn assert_presence_any_short_circuits() {
    let manager = wired_manager();

    let report = manager
        .assert_presence(
            &["Login".to_string(), "Nonexistent".to_string()],
            None,
            Duration::from_secs(30),
            QuorumRule::Any,
        )
        .await;

    assert!(report.rule_satisfied);
    assert!(report.elapsed < Duration::from_secs(1));
    assert!(report.status.is_found("Login"));
}

#[tokio::test(start_paused = true)]
async fn assert_presence_all_times_out_on_missing_member() {
    let manager = wired_manager();

    let report = manager
        .assert_presence(
            &["Login".to_string(), "Nonexistent".to_string()],
            None,
            Duration::from_secs(2),
            QuorumRule::All,
        )
        .await;

    assert!(!report.rule_satisfied);
    // Best-effort verdict still reports the partial find.
    assert!(report.any_found);
    assert!(report.best_effort());
    assert!(report.status.is_found("Login"));
    assert!(!report.status.is_found("Nonexistent"));
}

#[tokio::test(start_paused = true)]
async fn declared_image_class_without_detector_finds_nothing() {
    let manager = wired_manager();

    let report = manager
        .assert_presence(
            &["Login".to_string()],
            Some(ElementClass::Image),
            Duration::from_millis(500),
            QuorumRule::Any,
        )
        .await;

    // No image detector is configured, so the declared-image element has no
    // applicable strategy and the assertion runs out of budget quietly.
    assert!(!report.rule_satisfied);
    assert!(!report.any_found);
}

#[tokio::test]
async fn config_wiring_errors_propagate() {
    let registry = CapabilityRegistry::new(ProviderTable::new());
    let config = ResolutionConfig {
        element_sources: vec!["missing".to_string()],
        ..ResolutionConfig::default()
    };

    let err = StrategyManager::from_registry(&registry, &config).err().unwrap();
    assert!(matches!(err, RegistryError::UnknownCapability(_)));
}
