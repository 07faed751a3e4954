//! Descriptor classification
//!
//! Maps a raw element descriptor to {Dom, Text, Image} plus the force-text
//! directive flag. The shape heuristic is pluggable through
//! [`ClassifierRule`]; [`DefaultClassifier`] covers the common conventions:
//! image-template filenames by extension, DOM queries by XPath/CSS shape,
//! everything else is visible text.

use crate::types::{ClassifiedElement, ElementClass};

/// Directive that forces text classification regardless of descriptor shape.
/// Matched case-insensitively; exactly one following space is trimmed.
pub const FORCE_TEXT_DIRECTIVE: &str = "FORCE_TEXT:";

/// Pluggable shape heuristic applied to an already-stripped descriptor.
pub trait ClassifierRule: Send + Sync {
    fn classify(&self, query: &str) -> ElementClass;
}

/// Default shape heuristic.
#[derive(Debug, Clone)]
pub struct DefaultClassifier {
    image_extensions: Vec<String>,
}

impl DefaultClassifier {
    pub fn new() -> Self {
        Self::with_extensions(
            ["png", "jpg", "jpeg", "bmp", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    /// Override the template filename extensions treated as Image.
    pub fn with_extensions(extensions: Vec<String>) -> Self {
        Self {
            image_extensions: extensions
                .into_iter()
                .map(|ext| {
                    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
                    format!(".{ext}")
                })
                .collect(),
        }
    }
}

impl Default for DefaultClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierRule for DefaultClassifier {
    fn classify(&self, query: &str) -> ElementClass {
        let lower = query.trim().to_ascii_lowercase();
        if self.image_extensions.iter().any(|ext| lower.ends_with(ext)) {
            return ElementClass::Image;
        }
        if looks_like_dom_query(query.trim()) {
            return ElementClass::Dom;
        }
        ElementClass::Text
    }
}

/// XPath or CSS-selector shape.
fn looks_like_dom_query(query: &str) -> bool {
    query.starts_with("//")
        || query.starts_with("(//")
        || query.starts_with('/')
        || query.starts_with('#')
        || query.starts_with('[')
        || (query.starts_with('.') && !query.contains(' '))
}

/// Strip the force-text directive if present. Stripping is single
/// application: the returned text never begins with the directive again, so
/// classifying an already-stripped descriptor behaves like classifying the
/// prefixed original once.
pub fn strip_directive(raw: &str) -> (&str, bool) {
    let n = FORCE_TEXT_DIRECTIVE.len();
    match raw.get(..n) {
        Some(prefix) if prefix.eq_ignore_ascii_case(FORCE_TEXT_DIRECTIVE) => {
            let rest = &raw[n..];
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            (rest, true)
        }
        _ => (raw, false),
    }
}

/// Classify a raw descriptor. The force-text directive wins over both the
/// shape heuristic and any caller-declared class; a declared class otherwise
/// overrides the heuristic.
pub fn classify_element(
    rule: &dyn ClassifierRule,
    raw: &str,
    declared: Option<ElementClass>,
) -> ClassifiedElement {
    let (query, forced_text) = strip_directive(raw);
    let class = if forced_text {
        ElementClass::Text
    } else if let Some(declared) = declared {
        declared
    } else {
        rule.classify(query)
    };

    ClassifiedElement {
        raw: raw.to_string(),
        query: query.to_string(),
        class,
        forced_text,
    }
}
