//! Geometry over traced contours: area, candidate selection, corner
//! estimation and the framing decision.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::contours::Contour;
use crate::error::ScanError;
use crate::image_impl::{min_area_rect, Point2f};

pub fn distance(p1: Point2f, p2: Point2f) -> f32 {
    (p1.x - p2.x).hypot(p1.y - p2.y)
}

/// Enclosed area of a closed polyline via the shoelace formula, absolute
/// value. Trace order is what makes the signed sum meaningful; duplicate and
/// collinear points contribute zero terms.
pub fn contour_area(contour: &Contour) -> f64 {
    let pts = &contour.points;
    if pts.len() < 3 {
        return 0.0;
    }

    let mut acc = 0i64;
    for i in 0..pts.len() {
        let (x0, y0) = pts[i];
        let (x1, y1) = pts[(i + 1) % pts.len()];
        acc += x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64;
    }
    (acc.abs() as f64) / 2.0
}

/// Picks the contour with the strictly greatest enclosed area; ties keep the
/// first one encountered.
pub fn largest_contour(contours: Vec<Contour>) -> Result<Contour, ScanError> {
    let mut best: Option<(f64, Contour)> = None;
    for contour in contours {
        let area = contour_area(&contour);
        match &best {
            Some((best_area, _)) if area <= *best_area => {}
            _ => best = Some((area, contour)),
        }
    }

    match best {
        Some((area, contour)) => {
            debug!("paper candidate area {}", area);
            Ok(contour)
        }
        None => Err(ScanError::NoPaperDetected),
    }
}

/// Detected document quadrilateral. A corner is absent when no contour point
/// fell into its quadrant; it is never synthesized.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CornerPoints {
    pub top_left: Option<Point2f>,
    pub top_right: Option<Point2f>,
    pub bottom_left: Option<Point2f>,
    pub bottom_right: Option<Point2f>,
}

impl CornerPoints {
    pub fn is_complete(&self) -> bool {
        self.top_left.is_some()
            && self.top_right.is_some()
            && self.bottom_left.is_some()
            && self.bottom_right.is_some()
    }

    /// Corners in tl, tr, bl, br order, or None while any is missing.
    pub fn as_array(&self) -> Option<[Point2f; 4]> {
        Some([
            self.top_left?,
            self.top_right?,
            self.bottom_left?,
            self.bottom_right?,
        ])
    }
}

/// Estimates the four corners of a contour.
///
/// The minimum-area bounding rectangle is fitted only to obtain a center;
/// every contour point is then classified into an angular quadrant around
/// that center (strict inequalities, points on either axis are skipped) and
/// the farthest point per quadrant wins.
///
/// This is a cheap O(n) heuristic, not a polygon simplification; it can
/// misfire on strongly rotated or non-convex contours.
pub fn corner_points(contour: &Contour) -> Result<CornerPoints, ScanError> {
    let pts: Vec<Point2f> = contour
        .points
        .iter()
        .map(|&(x, y)| Point2f::new(x as f32, y as f32))
        .collect();

    let (center, _, _) = min_area_rect(&pts)?;

    let mut corners = CornerPoints::default();
    let mut tl_dist = 0f32;
    let mut tr_dist = 0f32;
    let mut bl_dist = 0f32;
    let mut br_dist = 0f32;

    for p in pts {
        let dist = distance(p, center);

        if p.x < center.x && p.y < center.y {
            if dist > tl_dist {
                corners.top_left = Some(p);
                tl_dist = dist;
            }
        } else if p.x > center.x && p.y < center.y {
            if dist > tr_dist {
                corners.top_right = Some(p);
                tr_dist = dist;
            }
        } else if p.x < center.x && p.y > center.y {
            if dist > bl_dist {
                corners.bottom_left = Some(p);
                bl_dist = dist;
            }
        } else if p.x > center.x && p.y > center.y {
            if dist > br_dist {
                corners.bottom_right = Some(p);
                br_dist = dist;
            }
        }
        // Points exactly on either axis belong to no quadrant.
    }

    Ok(corners)
}

/// Axis-aligned rectangle with closed-bound containment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, p: Point2f) -> bool {
        p.x >= self.x
            && p.x <= self.x + self.width
            && p.y >= self.y
            && p.y <= self.y + self.height
    }
}

/// Capture-area rectangle shrunk by `padding` on every side, derived per
/// frame and never persisted.
pub fn reference_frame(frame_width: f32, frame_height: f32, padding: f32) -> Rect {
    Rect::new(
        padding,
        padding,
        frame_width - padding * 2.0,
        frame_height - padding * 2.0,
    )
}

/// True when the document fills the frame well: all four corners present,
/// none stuck to the image origin axes (a contour clipped by the capture
/// boundary reports zero coordinates there), and every corner outside the
/// padded reference rectangle.
pub fn detect_better_framing(rect_ref: &Rect, corners: &CornerPoints) -> bool {
    let (tl, tr, bl, br) = match (
        corners.top_left,
        corners.top_right,
        corners.bottom_left,
        corners.bottom_right,
    ) {
        (Some(tl), Some(tr), Some(bl), Some(br)) => (tl, tr, bl, br),
        _ => return false,
    };

    !(tl.x == 0.0
        || tl.y == 0.0
        || bl.x == 0.0
        || tr.y == 0.0
        || rect_ref.contains(tl)
        || rect_ref.contains(tr)
        || rect_ref.contains(bl)
        || rect_ref.contains(br))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_contour(x0: i32, y0: i32, x1: i32, y1: i32) -> Contour {
        // Closed axis-aligned rectangle boundary in trace order.
        let mut points = Vec::new();
        for x in x0..=x1 {
            points.push((x, y0));
        }
        for y in y0 + 1..=y1 {
            points.push((x1, y));
        }
        for x in (x0..x1).rev() {
            points.push((x, y1));
        }
        for y in (y0 + 1..y1).rev() {
            points.push((x0, y));
        }
        Contour { points }
    }

    fn quad(tl: (f32, f32), tr: (f32, f32), bl: (f32, f32), br: (f32, f32)) -> CornerPoints {
        CornerPoints {
            top_left: Some(Point2f::new(tl.0, tl.1)),
            top_right: Some(Point2f::new(tr.0, tr.1)),
            bottom_left: Some(Point2f::new(bl.0, bl.1)),
            bottom_right: Some(Point2f::new(br.0, br.1)),
        }
    }

    #[test]
    fn shoelace_area_of_rectangle() {
        let contour = rect_contour(100, 100, 540, 380);
        assert_eq!(contour_area(&contour), 440.0 * 280.0);
    }

    #[test]
    fn degenerate_contours_have_zero_area() {
        assert_eq!(contour_area(&Contour::new()), 0.0);
        let line = Contour {
            points: vec![(0, 0), (5, 0), (10, 0)],
        };
        assert_eq!(contour_area(&line), 0.0);
    }

    #[test]
    fn largest_contour_picks_greatest_area() {
        let small = rect_contour(0, 0, 10, 10);
        let big = rect_contour(20, 20, 60, 60);
        let winner = largest_contour(vec![small, big]).unwrap();
        assert_eq!(contour_area(&winner), 1600.0);
    }

    #[test]
    fn largest_contour_ties_resolve_to_first() {
        let first = rect_contour(0, 0, 10, 10);
        let second = rect_contour(50, 50, 60, 60);
        let winner = largest_contour(vec![first, second]).unwrap();
        assert_eq!(winner.points[0], (0, 0));
    }

    #[test]
    fn empty_set_is_no_paper() {
        assert!(matches!(
            largest_contour(Vec::new()),
            Err(ScanError::NoPaperDetected)
        ));
    }

    #[test]
    fn corners_of_axis_aligned_rectangle_within_one_pixel() {
        let contour = rect_contour(100, 100, 540, 380);
        let corners = corner_points(&contour).unwrap();
        assert!(corners.is_complete());

        let [tl, tr, bl, br] = corners.as_array().unwrap();
        assert!(distance(tl, Point2f::new(100.0, 100.0)) <= 1.0);
        assert!(distance(tr, Point2f::new(540.0, 100.0)) <= 1.0);
        assert!(distance(bl, Point2f::new(100.0, 380.0)) <= 1.0);
        assert!(distance(br, Point2f::new(540.0, 380.0)) <= 1.0);
    }

    #[test]
    fn empty_quadrant_leaves_corner_absent() {
        // All points in one quadrant relative to the fitted center except
        // the spread along the axes; a thin L never reaches top-right.
        let contour = Contour {
            points: vec![(0, 0), (0, 10), (0, 20), (10, 20), (20, 20)],
        };
        let corners = corner_points(&contour).unwrap();
        assert!(corners.top_right.is_none());
    }

    #[test]
    fn reference_frame_is_padded_capture_area() {
        let r = reference_frame(640.0, 480.0, 30.0);
        assert_eq!(r, Rect::new(30.0, 30.0, 580.0, 420.0));
    }

    #[test]
    fn rect_contains_is_inclusive() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains(Point2f::new(10.0, 10.0)));
        assert!(r.contains(Point2f::new(30.0, 30.0)));
        assert!(!r.contains(Point2f::new(30.1, 30.0)));
        assert!(!r.contains(Point2f::new(9.9, 15.0)));
    }

    #[test]
    fn framing_accepts_document_filling_the_frame() {
        let r = reference_frame(640.0, 480.0, 30.0);
        let corners = quad((5.0, 5.0), (635.0, 4.0), (4.0, 476.0), (636.0, 475.0));
        assert!(detect_better_framing(&r, &corners));
    }

    #[test]
    fn framing_rejects_incomplete_quadrilateral() {
        let r = reference_frame(640.0, 480.0, 30.0);
        let mut corners = quad((5.0, 5.0), (635.0, 4.0), (4.0, 476.0), (636.0, 475.0));
        corners.bottom_right = None;
        assert!(!detect_better_framing(&r, &corners));
    }

    #[test]
    fn framing_rejects_origin_axis_corners() {
        let r = reference_frame(640.0, 480.0, 30.0);
        // Each degenerate coordinate the guard checks, one at a time.
        let cases = [
            quad((0.0, 5.0), (635.0, 4.0), (4.0, 476.0), (636.0, 475.0)),
            quad((5.0, 0.0), (635.0, 4.0), (4.0, 476.0), (636.0, 475.0)),
            quad((5.0, 5.0), (635.0, 4.0), (0.0, 476.0), (636.0, 475.0)),
            quad((5.0, 5.0), (635.0, 0.0), (4.0, 476.0), (636.0, 475.0)),
        ];
        for corners in cases {
            assert!(!detect_better_framing(&r, &corners));
        }
    }

    #[test]
    fn framing_rejects_corner_inside_padded_area() {
        let r = reference_frame(640.0, 480.0, 30.0);
        // Top-left corner sits inside the padded rectangle: document too far
        // from the frame edge on that side.
        let corners = quad((50.0, 50.0), (635.0, 4.0), (4.0, 476.0), (636.0, 475.0));
        assert!(!detect_better_framing(&r, &corners));
    }
}
