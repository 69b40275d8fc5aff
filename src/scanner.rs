//! Per-frame pipeline orchestration.
//!
//! `Scanner` is stateless between calls: every invocation allocates its own
//! intermediate buffers and nothing is retained, so one instance can serve a
//! capture loop frame after frame (or run from a worker thread, one frame in
//! flight at a time).

use log::debug;

use crate::contours::{find_contours, Contour};
use crate::error::ScanError;
use crate::geometry::{
    self, contour_area, corner_points, largest_contour, reference_frame, CornerPoints,
};
use crate::image_impl::{get_perspective_transform, warp_perspective, Mat, Size};
use crate::preprocess::PaperPreProcess;
use crate::types::{Detection, ScanConfig};

pub struct Scanner {
    pub cfg: ScanConfig,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            cfg: ScanConfig::default(),
        }
    }

    pub fn with_config(cfg: ScanConfig) -> Self {
        Self { cfg }
    }

    /// Finds the boundary of the paper within the frame: the largest-area
    /// contour of the thresholded image.
    ///
    /// A frame with too little contrast to threshold (uniform intensity) is
    /// reported as `NoPaperDetected`, like any other undetectable frame.
    pub fn find_paper_contour(&self, img: &Mat) -> Result<Contour, ScanError> {
        let pre = PaperPreProcess::new();
        let gray = pre.grayscale(img)?;
        let blurred = pre.blur(&gray);
        let binary = match pre.binarize(&blurred) {
            Ok(b) => b,
            Err(_) => return Err(ScanError::NoPaperDetected),
        };

        let contours = find_contours(&binary);
        debug!("traced {} contours", contours.len());
        largest_contour(contours)
    }

    /// Estimates the corner points of a detected contour.
    pub fn corner_points(&self, contour: &Contour) -> Result<CornerPoints, ScanError> {
        corner_points(contour)
    }

    /// Evaluates the framing of an estimated quadrilateral against the
    /// padded capture area of a `frame_width` x `frame_height` frame.
    pub fn detect_better_framing(
        &self,
        corners: &CornerPoints,
        frame_width: u32,
        frame_height: u32,
    ) -> bool {
        let rect_ref = reference_frame(frame_width as f32, frame_height as f32, self.cfg.padding);
        geometry::detect_better_framing(&rect_ref, corners)
    }

    /// Runs detection, corner estimation and framing evaluation on a frame.
    pub fn detect(&self, img: &Mat) -> Result<Detection, ScanError> {
        let contour = self.find_paper_contour(img)?;
        let corners = self.corner_points(&contour)?;
        let better_framing =
            self.detect_better_framing(&corners, img.cols() as u32, img.rows() as u32);
        debug!("better framing: {}", better_framing);

        Ok(Detection {
            area: contour_area(&contour),
            contour,
            corners,
            better_framing,
        })
    }

    /// Extracts and undistorts the document into a `result_width` x
    /// `result_height` buffer.
    ///
    /// Corners are detected from the frame unless the caller supplies its
    /// own (e.g. user-adjusted) set; either way all four must be present.
    /// Before solving, each corner is pushed outward by the configured
    /// margin to compensate boundary-tracing bias.
    pub fn extract_paper(
        &self,
        img: &Mat,
        corners: Option<&CornerPoints>,
        result_width: u32,
        result_height: u32,
    ) -> Result<Mat, ScanError> {
        let corners = match corners {
            Some(c) => *c,
            None => {
                let contour = self.find_paper_contour(img)?;
                self.corner_points(&contour)?
            }
        };
        let [tl, tr, bl, br] = corners.as_array().ok_or(ScanError::MissingCorners)?;

        let m = self.cfg.corner_margin;
        let w = result_width as f32;
        let h = result_height as f32;

        let src = [
            [tl.x - m, tl.y - m],
            [tr.x + m, tr.y - m],
            [bl.x - m, bl.y + m],
            [br.x + m, br.y + m],
        ];
        let dst = [[0.0, 0.0], [w, 0.0], [0.0, h], [w, h]];

        let transform = get_perspective_transform(&src, &dst)?;
        warp_perspective(
            img,
            &transform,
            Size::new(result_width as i32, result_height as i32),
        )
    }

    /// Full frame pass: detect, and rectify when the framing is good.
    ///
    /// This is the library-side counterpart of a capture loop tick; the
    /// caller decides what to do with the extracted paper (and when to stop
    /// calling).
    pub fn scan(&self, img: &Mat) -> Result<ScanOutput, ScanError> {
        let detection = self.detect(img)?;
        let paper = if detection.better_framing {
            Some(self.extract_paper(
                img,
                Some(&detection.corners),
                img.cols() as u32,
                img.rows() as u32,
            )?)
        } else {
            None
        };
        Ok(ScanOutput { detection, paper })
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a full `scan` pass.
pub struct ScanOutput {
    pub detection: Detection,
    /// Rectified document, present only on a good-framing frame.
    pub paper: Option<Mat>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::distance;
    use crate::image_impl::Point2f;

    /// Black frame with a white axis-aligned rectangle [x0, x1) x [y0, y1).
    fn frame_with_paper(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> Mat {
        let mut data = vec![0u8; (w * h * 3) as usize];
        for y in y0..y1 {
            for x in x0..x1 {
                let i = ((y * w + x) * 3) as usize;
                data[i] = 255;
                data[i + 1] = 255;
                data[i + 2] = 255;
            }
        }
        Mat::from_rgb8(w, h, data).unwrap()
    }

    #[test]
    fn all_black_frame_detects_no_paper() {
        let img = Mat::from_rgb8(640, 480, vec![0u8; 640 * 480 * 3]).unwrap();
        let scanner = Scanner::new();
        assert!(matches!(
            scanner.find_paper_contour(&img),
            Err(ScanError::NoPaperDetected)
        ));
    }

    #[test]
    fn zero_sized_frame_is_invalid_input() {
        let img = Mat::from_rgb8(0, 0, vec![]).unwrap();
        let scanner = Scanner::new();
        assert!(matches!(
            scanner.find_paper_contour(&img),
            Err(ScanError::InvalidInput(_))
        ));
    }

    #[test]
    fn white_rectangle_candidate_area_and_corners() {
        let img = frame_with_paper(640, 480, 100, 100, 540, 380);
        let scanner = Scanner::new();

        let contour = scanner.find_paper_contour(&img).unwrap();
        let area = contour_area(&contour);
        // 440 x 280 rectangle, give or take tracing/blur boundary effects.
        assert!(
            (area - 123_200.0).abs() < 4_000.0,
            "candidate area {} far from expected",
            area
        );

        let corners = scanner.corner_points(&contour).unwrap();
        assert!(corners.is_complete());
        let [tl, tr, bl, br] = corners.as_array().unwrap();
        let tol = 3.0; // blur shifts the traced edge by a pixel or two
        assert!(distance(tl, Point2f::new(100.0, 100.0)) <= tol);
        assert!(distance(tr, Point2f::new(539.0, 100.0)) <= tol);
        assert!(distance(bl, Point2f::new(100.0, 379.0)) <= tol);
        assert!(distance(br, Point2f::new(539.0, 379.0)) <= tol);
    }

    #[test]
    fn detect_reports_framing_for_well_placed_document() {
        // Paper reaching into the 30 px padding band on all sides.
        let img = frame_with_paper(640, 480, 10, 10, 630, 470);
        let scanner = Scanner::new();
        let detection = scanner.detect(&img).unwrap();
        assert!(detection.corners.is_complete());
        assert!(detection.better_framing);
    }

    #[test]
    fn detect_rejects_framing_for_small_document() {
        // Paper entirely inside the padded area.
        let img = frame_with_paper(640, 480, 200, 150, 440, 330);
        let scanner = Scanner::new();
        let detection = scanner.detect(&img).unwrap();
        assert!(!detection.better_framing);
    }

    #[test]
    fn extract_requires_complete_corners() {
        let img = frame_with_paper(640, 480, 100, 100, 540, 380);
        let scanner = Scanner::new();
        let corners = CornerPoints {
            top_left: Some(Point2f::new(100.0, 100.0)),
            top_right: Some(Point2f::new(540.0, 100.0)),
            bottom_left: None,
            bottom_right: Some(Point2f::new(540.0, 380.0)),
        };
        assert!(matches!(
            scanner.extract_paper(&img, Some(&corners), 200, 300),
            Err(ScanError::MissingCorners)
        ));
    }

    #[test]
    fn extract_of_uniform_region_is_uniform() {
        let img = frame_with_paper(640, 480, 100, 100, 540, 380);
        let scanner = Scanner::with_config(ScanConfig {
            corner_margin: 0.0,
            ..ScanConfig::default()
        });
        let corners = CornerPoints {
            top_left: Some(Point2f::new(110.0, 110.0)),
            top_right: Some(Point2f::new(530.0, 110.0)),
            bottom_left: Some(Point2f::new(110.0, 370.0)),
            bottom_right: Some(Point2f::new(530.0, 370.0)),
        };

        let out = scanner
            .extract_paper(&img, Some(&corners), 200, 300)
            .unwrap();
        assert_eq!(out.cols(), 200);
        assert_eq!(out.rows(), 300);
        // Interior pixels of a uniform white source stay white.
        for (x, y) in [(5, 5), (100, 150), (194, 294), (50, 250)] {
            assert_eq!(out.get_pixel(x, y), [255, 255, 255, 255], "at ({x}, {y})");
        }
    }

    #[test]
    fn extract_with_detected_corners_round_trips() {
        let img = frame_with_paper(640, 480, 100, 100, 540, 380);
        let scanner = Scanner::new();
        let out = scanner.extract_paper(&img, None, 220, 330).unwrap();
        assert_eq!(out.cols(), 220);
        assert_eq!(out.rows(), 330);
        // Center of the rectified document is paper-white.
        assert_eq!(out.get_pixel(110, 165), [255, 255, 255, 255]);
    }

    #[test]
    fn scan_extracts_only_on_better_framing() {
        let scanner = Scanner::new();

        let good = frame_with_paper(640, 480, 10, 10, 630, 470);
        let output = scanner.scan(&good).unwrap();
        assert!(output.paper.is_some());

        let bad = frame_with_paper(640, 480, 200, 150, 440, 330);
        let output = scanner.scan(&bad).unwrap();
        assert!(output.paper.is_none());
    }
}
