//! # paperscan - Pure Rust Document Scanner
//!
//! paperscan locates a rectangular document inside a camera frame, judges
//! whether it is well framed, and rectifies it into a flat, perspective
//! corrected image. All vision primitives (Otsu thresholding, contour
//! tracing, minimum-area rectangle, perspective warp) are self-contained
//! Rust - no OpenCV.
//!
//! ## Features
//!
//! - **Pure Rust**: the whole pipeline runs on the `image` and `nalgebra`
//!   crates
//! - **Stateless**: one frame in, geometry and pixels out; nothing survives
//!   between calls, so a capture loop can drive it at any cadence
//! - **Recoverable failures**: an undetectable frame is an expected outcome,
//!   not a fault
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paperscan::{imread, imwrite, Scanner};
//!
//! let scanner = Scanner::new();
//! let frame = imread("frame.jpg")?;
//!
//! let detection = scanner.detect(&frame)?;
//! if detection.better_framing {
//!     let paper = scanner.extract_paper(&frame, Some(&detection.corners), 1240, 1754)?;
//!     imwrite("paper.png", &paper)?;
//! }
//! # Ok::<(), paperscan::ScanError>(())
//! ```

// Core modules
mod contours;
mod error;
mod geometry;
mod image_impl;
mod preprocess;
mod scanner;
mod types;

// FFI module for C bindings
#[cfg(feature = "ffi")]
pub mod ffi;

// Public API exports
pub use crate::contours::{find_contours, Contour};
pub use crate::error::ScanError;
pub use crate::geometry::{
    contour_area, corner_points, detect_better_framing, distance, largest_contour,
    reference_frame, CornerPoints, Rect,
};
pub use crate::image_impl::{
    apply_transform, get_perspective_transform, imread, imread_bytes, imwrite, warp_perspective,
    Mat, Point2f, Size,
};
pub use crate::preprocess::{otsu_level, PaperPreProcess};
pub use crate::scanner::{ScanOutput, Scanner};
pub use crate::types::{Detection, ScanConfig, DEFAULT_CORNER_MARGIN, DEFAULT_PADDING};
