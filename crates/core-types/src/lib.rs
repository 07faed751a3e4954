//! Shared primitives for the Sightline element-resolution engine.
//!
//! Geometry, the opaque captured [`Frame`], the [`QuorumRule`] used by group
//! assertions, and the capability port traits implemented by detection
//! backends live here so every layer above speaks the same vocabulary.

pub mod ports;

pub use ports::*;

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// A point in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box for on-screen regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top-left corner.
    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Bottom-right corner.
    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    /// Geometric center of the box.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Encoding of a captured frame's pixel data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FrameFormat {
    Png,
    Jpeg,
}

/// A captured screen frame.
///
/// Opaque to the resolution core beyond being passable from capture to
/// detection; only backends interpret the pixel data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Unique identifier for this capture.
    pub id: String,

    /// Encoded image data.
    pub data: Vec<u8>,

    /// Image encoding.
    pub format: FrameFormat,

    /// Image dimensions in pixels.
    pub width: u32,
    pub height: u32,

    /// Capture timestamp.
    pub timestamp: SystemTime,
}

impl Frame {
    /// Wrap encoded image bytes as a frame with a fresh id.
    pub fn new(data: Vec<u8>, format: FrameFormat, width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data,
            format,
            width,
            height,
            timestamp: SystemTime::now(),
        }
    }
}

/// Quorum policy for declaring a group assertion successful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuorumRule {
    /// Satisfied as soon as any one element is found.
    Any,

    /// Satisfied only when every element is found.
    All,
}

impl QuorumRule {
    /// Evaluate the rule for `found` located elements out of `total`.
    pub fn satisfied(&self, found: usize, total: usize) -> bool {
        match self {
            QuorumRule::Any => found > 0,
            QuorumRule::All => total > 0 && found == total,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QuorumRule::Any => "any",
            QuorumRule::All => "all",
        }
    }
}

/// A successful detection hit: a match always carries both its center and
/// its bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionMatch {
    pub center: Point,
    pub bbox: BoundingBox,
}

impl DetectionMatch {
    /// Build a match from its bounding box, deriving the center.
    pub fn from_bbox(bbox: BoundingBox) -> Self {
        Self {
            center: bbox.center(),
            bbox,
        }
    }
}

/// A region of recognized text with its detector confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub bbox: BoundingBox,
    pub text: String,
    pub confidence: f64,
}
