//! Pixel-buffer wrapper and the numeric routines that back rectification.
//!
//! Everything here is self-contained: the perspective solve runs on nalgebra,
//! the warp is a hand-rolled inverse mapping with bilinear sampling, and the
//! minimum-area rectangle is convex hull plus rotating calipers.

use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

impl Point2f {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Owned pixel buffer, 8 bits per channel, row-major, top-left origin.
#[derive(Clone)]
pub struct Mat {
    image: DynamicImage,
}

impl Mat {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn from_rgb8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ScanError> {
        let img = ImageBuffer::<image::Rgb<u8>, _>::from_raw(width, height, data)
            .ok_or_else(|| ScanError::InvalidInput("RGB data does not match dimensions".into()))?;
        Ok(Self {
            image: DynamicImage::ImageRgb8(img),
        })
    }

    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ScanError> {
        let img = ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, data)
            .ok_or_else(|| ScanError::InvalidInput("RGBA data does not match dimensions".into()))?;
        Ok(Self {
            image: DynamicImage::ImageRgba8(img),
        })
    }

    pub fn rows(&self) -> i32 {
        self.image.height() as i32
    }

    pub fn cols(&self) -> i32 {
        self.image.width() as i32
    }

    pub fn size(&self) -> Size {
        Size::new(self.cols(), self.rows())
    }

    pub fn empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    /// Channel count of the underlying storage (1, 3 or 4).
    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn to_rgba8(&self) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
        self.image.to_rgba8()
    }

    /// RGBA value at (x, y); RGB sources report alpha 255.
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let p = self.image.get_pixel(x, y);
        [p[0], p[1], p[2], p[3]]
    }
}

pub fn imread<P: AsRef<Path>>(path: P) -> Result<Mat, ScanError> {
    let img = image::open(path)?;
    Ok(Mat::new(img))
}

/// Decode an in-memory encoded image (PNG/JPEG).
pub fn imread_bytes(data: &[u8]) -> Result<Mat, ScanError> {
    let img = image::load_from_memory(data)?;
    Ok(Mat::new(img))
}

pub fn imwrite<P: AsRef<Path>>(path: P, img: &Mat) -> Result<(), ScanError> {
    img.image.save(path)?;
    Ok(())
}

/// Solves the 3x3 perspective transform mapping `src_pts` onto `dst_pts`.
///
/// Tries the 8-unknown linear system with h22 fixed to 1 first; if that
/// system is singular or the residual is off, falls back to an SVD of the
/// full 9-parameter system.
pub fn get_perspective_transform(
    src_pts: &[[f32; 2]; 4],
    dst_pts: &[[f32; 2]; 4],
) -> Result<[[f64; 3]; 3], ScanError> {
    use nalgebra::DMatrix;

    let mut a = DMatrix::<f64>::zeros(8, 8);
    let mut b = DMatrix::<f64>::zeros(8, 1);

    for i in 0..4 {
        let x = src_pts[i][0] as f64;
        let y = src_pts[i][1] as f64;
        let u = dst_pts[i][0] as f64;
        let v = dst_pts[i][1] as f64;

        a[(i, 0)] = x;
        a[(i, 1)] = y;
        a[(i, 2)] = 1.0;
        a[(i, 6)] = -u * x;
        a[(i, 7)] = -u * y;
        b[(i, 0)] = u;

        a[(i + 4, 3)] = x;
        a[(i + 4, 4)] = y;
        a[(i + 4, 5)] = 1.0;
        a[(i + 4, 6)] = -v * x;
        a[(i + 4, 7)] = -v * y;
        b[(i + 4, 0)] = v;
    }

    if let Some(h) = a.clone().lu().solve(&b) {
        let residual = (&a * &h - &b).norm();
        if residual < 1e-8 {
            return Ok([
                [h[(0, 0)], h[(1, 0)], h[(2, 0)]],
                [h[(3, 0)], h[(4, 0)], h[(5, 0)]],
                [h[(6, 0)], h[(7, 0)], 1.0],
            ]);
        }
    }

    // Full homogeneous system: null vector of A^T A.
    let mut a9 = DMatrix::<f64>::zeros(8, 9);
    for i in 0..4 {
        let x = src_pts[i][0] as f64;
        let y = src_pts[i][1] as f64;
        let u = dst_pts[i][0] as f64;
        let v = dst_pts[i][1] as f64;

        a9[(i, 0)] = x;
        a9[(i, 1)] = y;
        a9[(i, 2)] = 1.0;
        a9[(i, 6)] = -u * x;
        a9[(i, 7)] = -u * y;
        a9[(i, 8)] = -u;

        a9[(i + 4, 3)] = x;
        a9[(i + 4, 4)] = y;
        a9[(i + 4, 5)] = 1.0;
        a9[(i + 4, 6)] = -v * x;
        a9[(i + 4, 7)] = -v * y;
        a9[(i + 4, 8)] = -v;
    }

    let ata = a9.transpose() * &a9;
    let svd = ata.svd(true, false);
    let u = svd
        .u
        .ok_or_else(|| ScanError::InvalidInput("degenerate corner configuration".into()))?;
    let h = u.column(8);

    Ok([
        [h[0], h[1], h[2]],
        [h[3], h[4], h[5]],
        [h[6], h[7], h[8]],
    ])
}

pub fn invert_matrix_3x3(m: &[[f64; 3]; 3]) -> Result<[[f64; 3]; 3], ScanError> {
    use nalgebra::Matrix3;

    let mat = Matrix3::new(
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
    );

    let inv = mat
        .try_inverse()
        .ok_or_else(|| ScanError::InvalidInput("homography is not invertible".into()))?;

    Ok([
        [inv[(0, 0)], inv[(0, 1)], inv[(0, 2)]],
        [inv[(1, 0)], inv[(1, 1)], inv[(1, 2)]],
        [inv[(2, 0)], inv[(2, 1)], inv[(2, 2)]],
    ])
}

/// Projects a point through a 3x3 homography.
pub fn apply_transform(m: &[[f64; 3]; 3], p: Point2f) -> Point2f {
    let x = p.x as f64;
    let y = p.y as f64;
    let w = m[2][0] * x + m[2][1] * y + m[2][2];
    Point2f::new(
        ((m[0][0] * x + m[0][1] * y + m[0][2]) / w) as f32,
        ((m[1][0] * x + m[1][1] * y + m[1][2]) / w) as f32,
    )
}

/// Resamples `src` through the inverse of `matrix` into a `dsize` buffer.
///
/// Every destination pixel is mapped back into the source and sampled with
/// bilinear interpolation; source coordinates outside the image fill with
/// constant black (transparent black for RGBA sources). The output keeps the
/// source's channel count.
pub fn warp_perspective(
    src: &Mat,
    matrix: &[[f64; 3]; 3],
    dsize: Size,
) -> Result<Mat, ScanError> {
    if dsize.width <= 0 || dsize.height <= 0 {
        return Err(ScanError::InvalidInput(format!(
            "non-positive warp target size {}x{}",
            dsize.width, dsize.height
        )));
    }
    if src.empty() {
        return Err(ScanError::InvalidInput("empty source buffer".into()));
    }

    let src_img = src.to_rgba8();
    // Zero-initialized: unmapped pixels stay transparent black.
    let mut out_img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::new(dsize.width as u32, dsize.height as u32);

    let m_inv = invert_matrix_3x3(matrix)?;

    let (m00, m01, m02) = (m_inv[0][0], m_inv[0][1], m_inv[0][2]);
    let (m10, m11, m12) = (m_inv[1][0], m_inv[1][1], m_inv[1][2]);
    let (m20, m21, m22) = (m_inv[2][0], m_inv[2][1], m_inv[2][2]);
    let src_cols = src.cols();
    let src_rows = src.rows();

    for y in 0..dsize.height as u32 {
        let y_f = y as f64;
        let m01y = m01 * y_f + m02;
        let m11y = m11 * y_f + m12;
        let m21y = m21 * y_f + m22;

        for x in 0..dsize.width as u32 {
            let x_f = x as f64;
            let w = m20 * x_f + m21y;
            let src_x = (m00 * x_f + m01y) / w;
            let src_y = (m10 * x_f + m11y) / w;

            if src_x < 0.0
                || src_y < 0.0
                || src_x > (src_cols - 1) as f64
                || src_y > (src_rows - 1) as f64
            {
                continue;
            }

            let x0 = src_x.floor() as i32;
            let y0 = src_y.floor() as i32;
            // Clamp the far neighbours so the last row/column still samples.
            let x1 = (x0 + 1).min(src_cols - 1);
            let y1 = (y0 + 1).min(src_rows - 1);
            let fx = src_x - x0 as f64;
            let fy = src_y - y0 as f64;

            let p00 = src_img.get_pixel(x0 as u32, y0 as u32);
            let p10 = src_img.get_pixel(x1 as u32, y0 as u32);
            let p01 = src_img.get_pixel(x0 as u32, y1 as u32);
            let p11 = src_img.get_pixel(x1 as u32, y1 as u32);

            let mut px = [0u8; 4];
            for c in 0..4 {
                let v = (1.0 - fx) * (1.0 - fy) * p00[c] as f64
                    + fx * (1.0 - fy) * p10[c] as f64
                    + (1.0 - fx) * fy * p01[c] as f64
                    + fx * fy * p11[c] as f64;
                px[c] = v.round().clamp(0.0, 255.0) as u8;
            }
            out_img.put_pixel(x, y, Rgba(px));
        }
    }

    let warped = DynamicImage::ImageRgba8(out_img);
    Ok(if src.channels() == 4 {
        Mat::new(warped)
    } else {
        Mat::new(DynamicImage::ImageRgb8(warped.to_rgb8()))
    })
}

/// Minimum-area bounding rectangle of a point set, as (center, size, angle).
///
/// Convex hull first, then rotating calipers over the hull edges. Callers in
/// this crate only consume the center.
pub fn min_area_rect(points: &[Point2f]) -> Result<(Point2f, Size, f32), ScanError> {
    if points.is_empty() {
        return Err(ScanError::InvalidInput("empty point set".into()));
    }

    if points.len() == 1 {
        return Ok((points[0], Size::new(0, 0), 0.0));
    }

    if points.len() == 2 {
        let dx = points[1].x - points[0].x;
        let dy = points[1].y - points[0].y;
        let len = (dx * dx + dy * dy).sqrt();
        let center = Point2f::new(
            (points[0].x + points[1].x) / 2.0,
            (points[0].y + points[1].y) / 2.0,
        );
        return Ok((center, Size::new(len as i32, 0), dy.atan2(dx).to_degrees()));
    }

    let hull = convex_hull(points);

    if hull.len() < 3 {
        // Collinear set: axis-aligned bounding box is exact enough.
        let mut min_x = f32::MAX;
        let mut max_x = f32::MIN;
        let mut min_y = f32::MAX;
        let mut max_y = f32::MIN;
        for pt in points {
            min_x = min_x.min(pt.x);
            max_x = max_x.max(pt.x);
            min_y = min_y.min(pt.y);
            max_y = max_y.max(pt.y);
        }
        let center = Point2f::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
        return Ok((
            center,
            Size::new((max_x - min_x) as i32, (max_y - min_y) as i32),
            0.0,
        ));
    }

    let mut min_area = f32::MAX;
    let mut best_rect = None;

    let n = hull.len();
    for i in 0..n {
        let p1 = hull[i];
        let p2 = hull[(i + 1) % n];

        let edge_x = p2.x - p1.x;
        let edge_y = p2.y - p1.y;
        let edge_len = (edge_x * edge_x + edge_y * edge_y).sqrt();
        if edge_len < 1e-6 {
            continue;
        }

        let ux = edge_x / edge_len;
        let uy = edge_y / edge_len;
        let vx = -uy;
        let vy = ux;

        let mut min_u = f32::MAX;
        let mut max_u = f32::MIN;
        let mut min_v = f32::MAX;
        let mut max_v = f32::MIN;
        for pt in &hull {
            let u = pt.x * ux + pt.y * uy;
            let v = pt.x * vx + pt.y * vy;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let width = max_u - min_u;
        let height = max_v - min_v;
        let area = width * height;

        if area < min_area {
            min_area = area;

            let center_u = (min_u + max_u) / 2.0;
            let center_v = (min_v + max_v) / 2.0;
            let center_x = center_u * ux + center_v * vx;
            let center_y = center_u * uy + center_v * vy;

            best_rect = Some((
                Point2f::new(center_x, center_y),
                Size::new(width as i32, height as i32),
                uy.atan2(ux).to_degrees(),
            ));
        }
    }

    best_rect.ok_or_else(|| ScanError::InvalidInput("degenerate hull".into()))
}

/// Convex hull via Graham scan.
fn convex_hull(points: &[Point2f]) -> Vec<Point2f> {
    if points.len() <= 3 {
        return points.to_vec();
    }

    let mut start_idx = 0;
    for (i, pt) in points.iter().enumerate().skip(1) {
        if pt.y < points[start_idx].y
            || (pt.y == points[start_idx].y && pt.x < points[start_idx].x)
        {
            start_idx = i;
        }
    }
    let start = points[start_idx];

    let mut sorted: Vec<Point2f> = points.to_vec();
    sorted.swap(0, start_idx);
    sorted[1..].sort_by(|a, b| {
        let angle_a = (a.y - start.y).atan2(a.x - start.x);
        let angle_b = (b.y - start.y).atan2(b.x - start.x);
        angle_a
            .partial_cmp(&angle_b)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut hull = vec![sorted[0], sorted[1]];
    for pt in sorted.iter().skip(2) {
        while hull.len() >= 2 {
            let p1 = hull[hull.len() - 2];
            let p2 = hull[hull.len() - 1];
            let cross = (p2.x - p1.x) * (pt.y - p1.y) - (p2.y - p1.y) * (pt.x - p1.x);
            if cross <= 0.0 {
                hull.pop();
            } else {
                break;
            }
        }
        hull.push(*pt);
    }

    hull
}
