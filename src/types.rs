use serde::{Deserialize, Serialize};

use crate::contours::Contour;
use crate::geometry::CornerPoints;

/// Default space, in pixels, the document must keep between itself and the
/// frame edge for the framing check. Live-preview callers often pass a
/// fraction of the frame width (e.g. 15%) instead.
pub const DEFAULT_PADDING: f32 = 30.0;

/// Default outward inset applied to detected corners before rectification,
/// compensating boundary-tracing bias.
pub const DEFAULT_CORNER_MARGIN: f32 = 5.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Reference-frame padding in pixels.
    pub padding: f32,
    /// Outward corner margin in pixels applied by `extract_paper`.
    pub corner_margin: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            corner_margin: DEFAULT_CORNER_MARGIN,
        }
    }
}

/// Per-frame detection outcome.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Boundary of the paper candidate, for overlay rendering by the caller.
    pub contour: Contour,
    /// Estimated document corners; any of them may be absent.
    pub corners: CornerPoints,
    /// Enclosed area of the candidate contour, in square pixels.
    pub area: f64,
    /// Whether the document fills the frame well enough to capture.
    pub better_framing: bool,
}
