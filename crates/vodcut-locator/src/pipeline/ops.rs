use image::GrayImage;
use image::imageops::{self, FilterType};

use crate::LocatorError;

/// Pixel dimensions of a `width`×`height` image resized by `scale`.
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let scaled = |value: u32| ((value as f64 * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Bilinear resize by a uniform factor.
pub fn resize_to_scale(image: &GrayImage, scale: f64) -> Result<GrayImage, LocatorError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(LocatorError::InvalidScale { scale });
    }
    let (width, height) = scaled_dimensions(image.width(), image.height(), scale);
    if (width, height) == image.dimensions() {
        return Ok(image.clone());
    }
    Ok(imageops::resize(image, width, height, FilterType::Triangle))
}

/// Binary Canny edge map (edges are 255).
pub fn canny(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    imageproc::edges::canny(image, low, high)
}

/// Summed-area tables for the pixel values and their squares.
pub(crate) struct IntegralImages {
    width: usize,
    sum: Vec<f64>,
    sq_sum: Vec<f64>,
}

impl IntegralImages {
    pub(crate) fn new(image: &GrayImage) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let stride = width + 1;
        let mut sum = vec![0.0f64; stride * (height + 1)];
        let mut sq_sum = vec![0.0f64; stride * (height + 1)];
        let raw = image.as_raw();
        for y in 0..height {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..width {
                let value = raw[y * width + x] as f64;
                row_sum += value;
                row_sq += value * value;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sq_sum[idx] = sq_sum[idx - stride] + row_sq;
            }
        }
        Self {
            width: stride,
            sum,
            sq_sum,
        }
    }

    /// Sum and sum of squares over the window at `(x, y)` of size `w`×`h`.
    pub(crate) fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let stride = self.width;
        let a = y * stride + x;
        let b = y * stride + x + w;
        let c = (y + h) * stride + x;
        let d = (y + h) * stride + x + w;
        (
            self.sum[d] - self.sum[b] - self.sum[c] + self.sum[a],
            self.sq_sum[d] - self.sq_sum[b] - self.sq_sum[c] + self.sq_sum[a],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn scaled_dimensions_round_and_never_collapse() {
        assert_eq!(scaled_dimensions(32, 24, 0.5), (16, 12));
        assert_eq!(scaled_dimensions(32, 24, 0.47), (15, 11));
        assert_eq!(scaled_dimensions(3, 3, 0.01), (1, 1));
    }

    #[test]
    fn resize_rejects_bad_scale() {
        let image = GrayImage::new(4, 4);
        assert!(matches!(
            resize_to_scale(&image, 0.0),
            Err(LocatorError::InvalidScale { .. })
        ));
        assert!(resize_to_scale(&image, f64::NAN).is_err());
    }

    #[test]
    fn integral_window_matches_direct_sum() {
        let image = GrayImage::from_fn(7, 5, |x, y| Luma([(x * 10 + y * 3) as u8]));
        let integrals = IntegralImages::new(&image);
        let (sum, sq) = integrals.window(2, 1, 3, 4);
        let mut expected_sum = 0.0;
        let mut expected_sq = 0.0;
        for y in 1..5 {
            for x in 2..5 {
                let value = image.get_pixel(x, y)[0] as f64;
                expected_sum += value;
                expected_sq += value * value;
            }
        }
        assert_eq!(sum, expected_sum);
        assert_eq!(sq, expected_sq);
    }

    #[test]
    fn canny_finds_edges_of_a_bright_square() {
        let image = GrayImage::from_fn(20, 20, |x, y| {
            if (6..14).contains(&x) && (6..14).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let edges = canny(&image, 50.0, 200.0);
        assert!(edges.pixels().any(|p| p[0] == 255));
        assert_eq!(edges.get_pixel(0, 0)[0], 0);
        assert_eq!(edges.get_pixel(10, 10)[0], 0);
    }
}
