//! Core types for the resolution engine

use serde::{Deserialize, Serialize};
use sightline_core_types::{BoundingBox, Frame, Point};
use std::collections::HashMap;

/// Classification of a raw element descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementClass {
    /// DOM/accessibility query syntax.
    Dom,

    /// Visible text to find on screen.
    Text,

    /// Image-template naming convention.
    Image,
}

impl ElementClass {
    pub fn name(&self) -> &'static str {
        match self {
            ElementClass::Dom => "dom",
            ElementClass::Text => "text",
            ElementClass::Image => "image",
        }
    }
}

/// Detection strategy enumeration.
///
/// Strategies are tried in the fixed priority order returned by
/// [`StrategyKind::priority_chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// DOM/accessibility queries through the element source.
    Dom,

    /// Optical text detection over a captured frame.
    TextDetection,

    /// Image-template matching over a captured frame.
    ImageDetection,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Dom => "dom",
            StrategyKind::TextDetection => "text-detection",
            StrategyKind::ImageDetection => "image-detection",
        }
    }

    /// All strategies in fixed priority order.
    pub fn priority_chain() -> Vec<StrategyKind> {
        vec![
            StrategyKind::Dom,
            StrategyKind::TextDetection,
            StrategyKind::ImageDetection,
        ]
    }
}

/// A descriptor after classification: the stripped query, its class, and
/// whether a force-text directive narrowed the eligible strategies.
///
/// Directive prefixes are always stripped before a strategy sees the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedElement {
    /// The descriptor exactly as the caller wrote it.
    pub raw: String,

    /// The descriptor with any directive stripped.
    pub query: String,

    /// Classification determined at lookup time.
    pub class: ElementClass,

    /// Set when the force-text directive was present.
    pub forced_text: bool,
}

/// A successful location attempt.
///
/// Found-ness is encoded by existence: a `LocateResult` always carries its
/// center and bounding box, so "found without geometry" is unrepresentable.
#[derive(Debug, Clone)]
pub struct LocateResult {
    /// Strategy that produced the hit.
    pub strategy: StrategyKind,

    /// Center point of the located element.
    pub center: Point,

    /// Bounding box of the located element.
    pub bbox: BoundingBox,

    /// Frame with the hit drawn in, when the strategy annotates.
    pub annotated: Option<Frame>,
}

/// Per-element verdict inside one presence assertion.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementState {
    pub found: bool,
    pub bbox: Option<BoundingBox>,
}

/// Per-assertion status map from raw descriptor to its verdict.
///
/// Freshly created per `assert_presence` call, mutated across polling
/// iterations, discarded at loop exit.
#[derive(Debug, Clone, Default)]
pub struct ElementStatus {
    entries: HashMap<String, ElementState>,
}

impl ElementStatus {
    /// Initialize with every element marked not-found.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: names
                .into_iter()
                .map(|name| (name.into(), ElementState::default()))
                .collect(),
        }
    }

    pub fn mark_found(&mut self, name: &str, bbox: BoundingBox) {
        if let Some(state) = self.entries.get_mut(name) {
            state.found = true;
            state.bbox = Some(bbox);
        }
    }

    pub fn is_found(&self, name: &str) -> bool {
        self.entries.get(name).map(|s| s.found).unwrap_or(false)
    }

    pub fn get(&self, name: &str) -> Option<&ElementState> {
        self.entries.get(name)
    }

    pub fn found_count(&self) -> usize {
        self.entries.values().filter(|s| s.found).count()
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn any_found(&self) -> bool {
        self.entries.values().any(|s| s.found)
    }

    /// Bounding boxes of everything found so far, for annotation.
    pub fn found_bboxes(&self) -> Vec<BoundingBox> {
        self.entries.values().filter_map(|s| s.bbox).collect()
    }

    /// Short "found/total" form for log lines.
    pub fn summary(&self) -> String {
        format!("{}/{} found", self.found_count(), self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_chain_order() {
        let chain = StrategyKind::priority_chain();
        assert_eq!(
            chain,
            vec![
                StrategyKind::Dom,
                StrategyKind::TextDetection,
                StrategyKind::ImageDetection
            ]
        );
    }

    #[test]
    fn test_status_starts_unfound() {
        let status = ElementStatus::new(["a", "b"]);
        assert_eq!(status.found_count(), 0);
        assert_eq!(status.total(), 2);
        assert!(!status.any_found());
    }

    #[test]
    fn test_status_mark_found() {
        let mut status = ElementStatus::new(["a", "b"]);
        status.mark_found("a", BoundingBox::new(0.0, 0.0, 10.0, 10.0));

        assert!(status.is_found("a"));
        assert!(!status.is_found("b"));
        assert_eq!(status.found_bboxes().len(), 1);
        assert_eq!(status.summary(), "1/2 found");
    }
}
