//! Resolution engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Named backend candidates and polling knobs for one resolution session.
///
/// Each list is ordered: earlier names are tried first in the resulting
/// fallback chain. Empty detector lists leave that strategy unconfigured,
/// which silently disables it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Element source candidates, in fallback order.
    #[serde(default)]
    pub element_sources: Vec<String>,

    /// Text detector candidates, in fallback order.
    #[serde(default)]
    pub text_detectors: Vec<String>,

    /// Image detector candidates, in fallback order.
    #[serde(default)]
    pub image_detectors: Vec<String>,

    /// Fixed inter-iteration delay for presence polling.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Template filename extensions classified as Image.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_image_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "bmp", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            element_sources: Vec::new(),
            text_detectors: Vec::new(),
            image_detectors: Vec::new(),
            poll_interval_ms: default_poll_interval_ms(),
            image_extensions: default_image_extensions(),
        }
    }
}

impl ResolutionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
