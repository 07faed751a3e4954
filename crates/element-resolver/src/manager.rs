//! Strategy manager: classification, strategy selection, and group assertion
//!
//! Owns one fallback chain per capability. An unconfigured text or image
//! detector silently disables its strategy; a DOM-incapable element source
//! disables the DOM strategy. A descriptor no available strategy can handle
//! yields not-found from `locate`, never an error.

use crate::classify::{classify_element, ClassifierRule, DefaultClassifier};
use crate::config::ResolutionConfig;
use crate::presence::{PollState, PresenceAssertion, PresenceReport};
use crate::strategies::{
    DomElementStrategy, ImageDetectionStrategy, Strategy, TextDetectionStrategy,
};
use crate::types::{ClassifiedElement, ElementClass, ElementStatus, LocateResult, StrategyKind};
use capability_registry::{CapabilityRegistry, FallbackHandle, RegistryError};
use sightline_core_types::{ElementSource, ImageDetector, QuorumRule, TextDetector};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use tracing::{debug, info};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Classifies element descriptors and tries applicable strategies in fixed
/// priority order {Dom, TextDetection, ImageDetection}.
pub struct StrategyManager {
    source: Arc<FallbackHandle<dyn ElementSource>>,
    dom_strategy: Arc<DomElementStrategy>,
    text_strategy: Option<Arc<TextDetectionStrategy>>,
    image_strategy: Option<Arc<ImageDetectionStrategy>>,
    classifier: Arc<dyn ClassifierRule>,
    poll_interval: Duration,
}

impl StrategyManager {
    /// Build a manager over one element-source chain and optional detector
    /// chains.
    pub fn new(
        source: FallbackHandle<dyn ElementSource>,
        text_detector: Option<FallbackHandle<dyn TextDetector>>,
        image_detector: Option<FallbackHandle<dyn ImageDetector>>,
    ) -> Self {
        let source = Arc::new(source);
        let source_dyn: Arc<dyn ElementSource> = Arc::clone(&source) as Arc<dyn ElementSource>;

        let dom_strategy = Arc::new(DomElementStrategy::new(Arc::clone(&source_dyn)));
        let text_strategy = text_detector.map(|handle| {
            let detector: Arc<dyn TextDetector> = Arc::new(handle);
            Arc::new(TextDetectionStrategy::new(Arc::clone(&source_dyn), detector))
        });
        let image_strategy = image_detector.map(|handle| {
            let detector: Arc<dyn ImageDetector> = Arc::new(handle);
            Arc::new(ImageDetectionStrategy::new(Arc::clone(&source_dyn), detector))
        });

        Self {
            source,
            dom_strategy,
            text_strategy,
            image_strategy,
            classifier: Arc::new(DefaultClassifier::new()),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Wire a manager from named backend candidates resolved through the
    /// registry. Wiring failures propagate with their original message.
    pub fn from_registry(
        registry: &CapabilityRegistry,
        config: &ResolutionConfig,
    ) -> Result<Self, RegistryError> {
        let source = registry.fallback_element_sources(&config.element_sources)?;
        let text_detector = if config.text_detectors.is_empty() {
            None
        } else {
            Some(registry.fallback_text_detectors(&config.text_detectors)?)
        };
        let image_detector = if config.image_detectors.is_empty() {
            None
        } else {
            Some(registry.fallback_image_detectors(&config.image_detectors)?)
        };

        let classifier = DefaultClassifier::with_extensions(config.image_extensions.clone());
        Ok(Self::new(source, text_detector, image_detector)
            .with_classifier(Arc::new(classifier))
            .with_poll_interval(config.poll_interval()))
    }

    /// Replace the classification heuristic.
    pub fn with_classifier(mut self, classifier: Arc<dyn ClassifierRule>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the presence polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Diagnostic: the element-source member that last succeeded.
    pub fn current_source(&self) -> Option<Arc<dyn ElementSource>> {
        self.source.current()
    }

    /// Classify a raw descriptor, stripping any directive.
    pub fn classify(&self, descriptor: &str) -> ClassifiedElement {
        classify_element(self.classifier.as_ref(), descriptor, None)
    }

    fn dom_capable(&self) -> bool {
        self.source.supports_dom_queries()
    }

    /// Strategies applicable to one element, in priority order.
    fn eligible(&self, element: &ClassifiedElement) -> Vec<Arc<dyn Strategy>> {
        let dom_ok =
            !element.forced_text && element.class != ElementClass::Image && self.dom_capable();

        let mut strategies: Vec<Arc<dyn Strategy>> = Vec::new();
        for kind in StrategyKind::priority_chain() {
            match kind {
                StrategyKind::Dom => {
                    if dom_ok {
                        strategies.push(Arc::clone(&self.dom_strategy) as Arc<dyn Strategy>);
                    }
                }
                StrategyKind::TextDetection => {
                    if element.class == ElementClass::Text {
                        if let Some(strategy) = &self.text_strategy {
                            strategies.push(Arc::clone(strategy) as Arc<dyn Strategy>);
                        }
                    }
                }
                StrategyKind::ImageDetection => {
                    if element.class == ElementClass::Image {
                        if let Some(strategy) = &self.image_strategy {
                            strategies.push(Arc::clone(strategy) as Arc<dyn Strategy>);
                        }
                    }
                }
            }
        }
        strategies
    }

    /// Locate one element. Tries applicable strategies in priority order and
    /// stops at the first success; absence is `None`, never an error.
    pub async fn locate(&self, descriptor: &str) -> Option<LocateResult> {
        let element = self.classify(descriptor);
        debug!(
            element = element.raw.as_str(),
            class = element.class.name(),
            forced_text = element.forced_text,
            "locating element"
        );

        for strategy in self.eligible(&element) {
            debug!(strategy = strategy.name(), "trying strategy");
            if let Some(result) = strategy.locate(&element).await {
                info!(
                    element = element.raw.as_str(),
                    strategy = result.strategy.name(),
                    "element located"
                );
                return Some(result);
            }
        }

        debug!(element = element.raw.as_str(), "no strategy produced a match");
        None
    }

    /// Assert presence of a descriptor group under a quorum rule and a
    /// timeout budget.
    ///
    /// The DOM strategy is excluded for the entire group when any member
    /// carries the force-text directive. A group that is entirely
    /// DOM-classified is first offered to the source's native grouped
    /// assertion; anything else (or a source without that operation) goes
    /// through the generic polling loop.
    pub async fn assert_presence(
        &self,
        elements: &[String],
        declared: Option<ElementClass>,
        timeout: Duration,
        rule: QuorumRule,
    ) -> PresenceReport {
        let classified: Vec<ClassifiedElement> = elements
            .iter()
            .map(|raw| classify_element(self.classifier.as_ref(), raw, declared))
            .collect();

        let dom_excluded =
            classified.iter().any(|element| element.forced_text) || !self.dom_capable();

        let started = Instant::now();
        let mut budget = timeout;

        if !dom_excluded
            && !classified.is_empty()
            && classified
                .iter()
                .all(|element| element.class == ElementClass::Dom)
        {
            let queries: Vec<String> = classified
                .iter()
                .map(|element| element.query.clone())
                .collect();
            match self.source.assert_elements(&queries, timeout, rule).await {
                Ok(satisfied) => {
                    info!(
                        rule = rule.name(),
                        satisfied, "native grouped assertion answered"
                    );
                    return native_report(elements, satisfied, started.elapsed());
                }
                Err(err) => {
                    debug!(
                        error = %err,
                        "native grouped assertion unavailable; using polling loop"
                    );
                    budget = timeout.saturating_sub(started.elapsed());
                }
            }
        }

        let groups = self.group_by_strategy(&classified, dom_excluded);
        let source_dyn: Arc<dyn ElementSource> =
            Arc::clone(&self.source) as Arc<dyn ElementSource>;

        PresenceAssertion::new(
            source_dyn,
            groups,
            elements.to_vec(),
            rule,
            budget,
            self.poll_interval,
        )
        .run()
        .await
    }

    /// Partition classified elements into (strategy, members) groups,
    /// mirroring the per-element eligibility of `locate`.
    ///
    /// A Text-classified member may appear in both the DOM and text groups:
    /// the DOM group runs first each iteration, and a member it already
    /// found is skipped by the text group. Dom-classified members never
    /// reach the text detector; with the DOM strategy excluded they are
    /// left unevaluated.
    fn group_by_strategy(
        &self,
        classified: &[ClassifiedElement],
        dom_excluded: bool,
    ) -> Vec<(Arc<dyn Strategy>, Vec<ClassifiedElement>)> {
        let mut dom_members: Vec<ClassifiedElement> = Vec::new();
        let mut text_members: Vec<ClassifiedElement> = Vec::new();
        let mut image_members: Vec<ClassifiedElement> = Vec::new();

        for element in classified {
            match element.class {
                ElementClass::Image => {
                    if self.image_strategy.is_some() {
                        image_members.push(element.clone());
                    } else {
                        debug!(
                            element = element.raw.as_str(),
                            "no image detector configured; element cannot be evaluated"
                        );
                    }
                }
                ElementClass::Dom => {
                    if !dom_excluded {
                        dom_members.push(element.clone());
                    } else {
                        debug!(
                            element = element.raw.as_str(),
                            "dom strategy unavailable; query element cannot be evaluated"
                        );
                    }
                }
                ElementClass::Text => {
                    if !dom_excluded {
                        dom_members.push(element.clone());
                    }
                    if self.text_strategy.is_some() {
                        text_members.push(element.clone());
                    } else if dom_excluded {
                        debug!(
                            element = element.raw.as_str(),
                            "no applicable strategy; element cannot be evaluated"
                        );
                    }
                }
            }
        }

        let mut groups: Vec<(Arc<dyn Strategy>, Vec<ClassifiedElement>)> = Vec::new();
        if !dom_members.is_empty() {
            groups.push((
                Arc::clone(&self.dom_strategy) as Arc<dyn Strategy>,
                dom_members,
            ));
        }
        if !text_members.is_empty() {
            if let Some(strategy) = &self.text_strategy {
                groups.push((Arc::clone(strategy) as Arc<dyn Strategy>, text_members));
            }
        }
        if !image_members.is_empty() {
            if let Some(strategy) = &self.image_strategy {
                groups.push((Arc::clone(strategy) as Arc<dyn Strategy>, image_members));
            }
        }
        groups
    }
}

/// Report for the native grouped-assertion fast path. The native call
/// returns only a verdict, so per-element geometry stays empty.
fn native_report(elements: &[String], satisfied: bool, elapsed: Duration) -> PresenceReport {
    PresenceReport {
        rule_satisfied: satisfied,
        any_found: satisfied,
        state: if satisfied {
            PollState::Satisfied
        } else {
            PollState::TimedOut
        },
        status: ElementStatus::new(elements.iter().cloned()),
        elapsed,
        timestamp: SystemTime::now(),
        annotated: None,
    }
}
