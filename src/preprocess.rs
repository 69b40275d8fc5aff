//! Frame preparation: grayscale, smoothing and Otsu binarization.

use image::GrayImage;
use log::debug;

use crate::error::ScanError;
use crate::image_impl::Mat;

/// Smoothing kernel side length.
const KERNEL_SIZE: usize = 5;

/// OpenCV's auto-sigma rule for a derived kernel:
/// sigma = 0.3 * ((k - 1) * 0.5 - 1) + 0.8, which is 1.1 for k = 5.
const SIGMA: f32 = 0.3 * ((KERNEL_SIZE as f32 - 1.0) * 0.5 - 1.0) + 0.8;

pub struct PaperPreProcess;

impl PaperPreProcess {
    pub fn new() -> Self {
        Self
    }

    /// Full chain: grayscale -> blur -> Otsu binary mask.
    pub fn run(&self, img: &Mat) -> Result<GrayImage, ScanError> {
        let gray = self.grayscale(img)?;
        let blurred = self.blur(&gray);
        self.binarize(&blurred)
    }

    /// Single-channel luminance with the classic 0.299/0.587/0.114 weights.
    /// Alpha is ignored.
    pub fn grayscale(&self, img: &Mat) -> Result<GrayImage, ScanError> {
        if img.empty() {
            return Err(ScanError::InvalidInput(format!(
                "degenerate frame dimensions {}x{}",
                img.cols(),
                img.rows()
            )));
        }

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut gray = GrayImage::new(width, height);

        for (x, y, px) in rgba.enumerate_pixels() {
            let luma =
                0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            gray.put_pixel(x, y, image::Luma([luma.round().clamp(0.0, 255.0) as u8]));
        }

        Ok(gray)
    }

    /// Separable 5x5 Gaussian with border replication.
    pub fn blur(&self, img: &GrayImage) -> GrayImage {
        let kernel = gaussian_kernel();
        let (width, height) = img.dimensions();
        let w = width as i32;
        let h = height as i32;
        let r = (KERNEL_SIZE / 2) as i32;

        // Horizontal pass.
        let mut tmp = vec![0f32; (width * height) as usize];
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = (x + k as i32 - r).clamp(0, w - 1);
                    acc += weight * img.get_pixel(sx as u32, y as u32)[0] as f32;
                }
                tmp[(y * w + x) as usize] = acc;
            }
        }

        // Vertical pass.
        let mut out = GrayImage::new(width, height);
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = (y + k as i32 - r).clamp(0, h - 1);
                    acc += weight * tmp[(sy * w + x) as usize];
                }
                out.put_pixel(x as u32, y as u32, image::Luma([acc.round().clamp(0.0, 255.0) as u8]));
            }
        }

        out
    }

    /// Otsu global threshold, straight binary polarity: above threshold maps
    /// to 255, the rest to 0.
    pub fn binarize(&self, img: &GrayImage) -> Result<GrayImage, ScanError> {
        let hist = histogram(img);
        let thresh = otsu_level(&hist)?;
        debug!("otsu threshold {}", thresh);

        let (width, height) = img.dimensions();
        let mut out = GrayImage::new(width, height);
        for (x, y, px) in img.enumerate_pixels() {
            let v = if px[0] > thresh { 255 } else { 0 };
            out.put_pixel(x, y, image::Luma([v]));
        }
        Ok(out)
    }
}

impl Default for PaperPreProcess {
    fn default() -> Self {
        Self::new()
    }
}

fn gaussian_kernel() -> [f32; KERNEL_SIZE] {
    let r = (KERNEL_SIZE / 2) as i32;
    let mut kernel = [0f32; KERNEL_SIZE];
    let mut sum = 0.0;
    for (i, k) in kernel.iter_mut().enumerate() {
        let d = (i as i32 - r) as f32;
        *k = (-d * d / (2.0 * SIGMA * SIGMA)).exp();
        sum += *k;
    }
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

fn histogram(img: &GrayImage) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for px in img.pixels() {
        hist[px[0] as usize] += 1;
    }
    hist
}

/// Exhaustive Otsu search over all 255 splits of the 256-bin histogram,
/// maximizing inter-class variance.
///
/// Fails when fewer than two intensity levels are occupied: no split can
/// separate foreground from background.
pub fn otsu_level(hist: &[u32; 256]) -> Result<u8, ScanError> {
    let occupied = hist.iter().filter(|&&c| c > 0).count();
    if occupied < 2 {
        return Err(ScanError::InvalidInput(
            "histogram has fewer than 2 distinct intensity levels".into(),
        ));
    }

    let total: f64 = hist.iter().map(|&c| c as f64).sum();
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut sum_bg = 0.0;
    let mut weight_bg = 0.0;
    let mut best_var = -1.0;
    let mut best_t = 0u8;

    for t in 0..255usize {
        weight_bg += hist[t] as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += t as f64 * hist[t] as f64;

        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let between = weight_bg * weight_fg * (mean_bg - mean_fg) * (mean_bg - mean_fg);

        if between > best_var {
            best_var = between;
            best_t = t as u8;
        }
    }

    Ok(best_t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn uniform_mat(w: u32, h: u32, value: u8) -> Mat {
        Mat::from_rgb8(w, h, vec![value; (w * h * 3) as usize]).unwrap()
    }

    #[test]
    fn grayscale_applies_perceptual_weights() {
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&[100, 200, 50]);
        }
        let img = Mat::from_rgb8(2, 2, data).unwrap();

        let gray = PaperPreProcess::new().grayscale(&img).unwrap();
        // 0.299*100 + 0.587*200 + 0.114*50 = 153.0
        assert_eq!(gray.get_pixel(0, 0)[0], 153);
    }

    #[test]
    fn grayscale_rejects_empty_frame() {
        let img = Mat::from_rgb8(0, 0, vec![]).unwrap();
        assert!(matches!(
            PaperPreProcess::new().grayscale(&img),
            Err(ScanError::InvalidInput(_))
        ));
    }

    #[test]
    fn blur_preserves_uniform_regions() {
        let pre = PaperPreProcess::new();
        let gray = pre.grayscale(&uniform_mat(10, 10, 80)).unwrap();
        let blurred = pre.blur(&gray);
        for px in blurred.pixels() {
            assert_eq!(px[0], 80);
        }
    }

    #[test]
    fn blur_kernel_is_normalized() {
        let kernel = gaussian_kernel();
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        // Symmetric, peaked in the middle.
        assert_eq!(kernel[0], kernel[4]);
        assert_eq!(kernel[1], kernel[3]);
        assert!(kernel[2] > kernel[1]);
    }

    #[test]
    fn otsu_splits_bimodal_histogram_between_peaks() {
        // Two well-separated clusters peaking at 40 and 200.
        let mut hist = [0u32; 256];
        for bin in 30..=50usize {
            hist[bin] = 100;
        }
        for bin in 190..=210usize {
            hist[bin] = 100;
        }
        let t = otsu_level(&hist).unwrap();
        assert!(t > 40 && t < 200, "threshold {} not between the peaks", t);
    }

    #[test]
    fn otsu_rejects_single_level_histogram() {
        let mut hist = [0u32; 256];
        hist[0] = 640 * 480;
        assert!(matches!(
            otsu_level(&hist),
            Err(ScanError::InvalidInput(_))
        ));
    }

    #[test]
    fn binarize_is_two_valued_and_straight_polarity() {
        let mut img = GrayImage::new(4, 4);
        for (i, px) in img.pixels_mut().enumerate() {
            *px = Luma([if i % 2 == 0 { 20 } else { 230 }]);
        }
        let out = PaperPreProcess::new().binarize(&img).unwrap();
        for (i, px) in out.pixels().enumerate() {
            let expected = if i % 2 == 0 { 0 } else { 255 };
            assert_eq!(px[0], expected);
        }
    }
}
