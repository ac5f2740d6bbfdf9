use image::GrayImage;
use rayon::prelude::*;

use super::ops::IntegralImages;

/// Windows whose pixel variance (sum of squared deviations) falls below this
/// are treated as flat and score zero.
const FLAT_WINDOW_EPSILON: f64 = 1e-3;

/// Correlation score for every placement of a template inside an image.
///
/// Entry `(x, y)` scores the template with its top-left corner at `(x, y)`.
#[derive(Debug, Clone)]
pub struct CorrelationMap {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

/// A local best match in a [`CorrelationMap`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub x: usize,
    pub y: usize,
    pub score: f32,
}

impl CorrelationMap {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    /// Highest score and its position; the first one in row-major order wins ties.
    pub fn max(&self) -> Option<Peak> {
        let mut best: Option<Peak> = None;
        for (idx, &score) in self.values.iter().enumerate() {
            if best.is_none_or(|peak| score > peak.score) {
                best = Some(Peak {
                    x: idx % self.width,
                    y: idx / self.width,
                    score,
                });
            }
        }
        best
    }
}

/// Zero-mean normalized cross-correlation (`TM_CCOEFF_NORMED`).
///
/// Returns `None` when the template does not fit inside the image. Flat windows
/// and a flat template score `0.0`; every other score lies in `[-1, 1]`.
pub fn ccoeff_normed(image: &GrayImage, template: &GrayImage) -> Option<CorrelationMap> {
    let (img_w, img_h) = (image.width() as usize, image.height() as usize);
    let (tpl_w, tpl_h) = (template.width() as usize, template.height() as usize);
    if tpl_w == 0 || tpl_h == 0 || tpl_w > img_w || tpl_h > img_h {
        return None;
    }
    let out_w = img_w - tpl_w + 1;
    let out_h = img_h - tpl_h + 1;
    let n = (tpl_w * tpl_h) as f64;

    let tpl_raw = template.as_raw();
    let tpl_mean = tpl_raw.iter().map(|&v| v as f64).sum::<f64>() / n;
    let centered: Vec<f64> = tpl_raw.iter().map(|&v| v as f64 - tpl_mean).collect();
    let tpl_norm = centered.iter().map(|v| v * v).sum::<f64>();

    let mut values = vec![0.0f32; out_w * out_h];
    if tpl_norm <= FLAT_WINDOW_EPSILON {
        return Some(CorrelationMap {
            width: out_w,
            height: out_h,
            values,
        });
    }

    let integrals = IntegralImages::new(image);
    let img_raw = image.as_raw();
    values
        .par_chunks_mut(out_w)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, slot) in row.iter_mut().enumerate() {
                let (sum, sq_sum) = integrals.window(x, y, tpl_w, tpl_h);
                let variance = sq_sum - sum * sum / n;
                if variance <= FLAT_WINDOW_EPSILON {
                    *slot = 0.0;
                    continue;
                }
                let mut numerator = 0.0f64;
                for ty in 0..tpl_h {
                    let img_row = &img_raw[(y + ty) * img_w + x..(y + ty) * img_w + x + tpl_w];
                    let tpl_row = &centered[ty * tpl_w..(ty + 1) * tpl_w];
                    numerator += img_row
                        .iter()
                        .zip(tpl_row)
                        .map(|(&i, &t)| i as f64 * t)
                        .sum::<f64>();
                }
                let score = numerator / (variance * tpl_norm).sqrt();
                *slot = score.clamp(-1.0, 1.0) as f32;
            }
        });

    Some(CorrelationMap {
        width: out_w,
        height: out_h,
        values,
    })
}

/// Up to `max_peaks` best placements scoring at least `floor`.
///
/// Each accepted peak suppresses every placement that would overlap it, given
/// a template of `template_w`×`template_h`. Peaks come out best first.
pub fn find_peaks(
    map: &CorrelationMap,
    template_w: usize,
    template_h: usize,
    max_peaks: usize,
    floor: f32,
) -> Vec<Peak> {
    let mut peaks: Vec<Peak> = Vec::with_capacity(max_peaks);
    while peaks.len() < max_peaks {
        let mut best: Option<Peak> = None;
        for (idx, &score) in map.values.iter().enumerate() {
            if score < floor || best.is_some_and(|peak| score <= peak.score) {
                continue;
            }
            let x = idx % map.width;
            let y = idx / map.width;
            let overlaps = peaks
                .iter()
                .any(|peak| peak.x.abs_diff(x) < template_w && peak.y.abs_diff(y) < template_h);
            if !overlaps {
                best = Some(Peak { x, y, score });
            }
        }
        match best {
            Some(peak) => peaks.push(peak),
            None => break,
        }
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Hashed texture with no repeating or affinely related windows.
    fn noise(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let mut v = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77);
            v ^= v >> 15;
            v = v.wrapping_mul(0xC2B2_AE3D);
            v ^= v >> 13;
            Luma([(v % 251) as u8])
        })
    }

    #[test]
    fn exact_crop_scores_one() {
        let image = noise(30, 20);
        let template = image::imageops::crop_imm(&image, 11, 6, 8, 5).to_image();
        let map = ccoeff_normed(&image, &template).unwrap();
        assert_eq!((map.width(), map.height()), (23, 16));
        let best = map.max().unwrap();
        assert_eq!((best.x, best.y), (11, 6));
        assert!((best.score - 1.0).abs() < 1e-5);
        let runner_up = map
            .values()
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != 6 * map.width() + 11)
            .map(|(_, &score)| score)
            .fold(f32::MIN, f32::max);
        assert!(runner_up < 0.9, "runner-up scored {runner_up}");
    }

    #[test]
    fn score_is_invariant_to_brightness_and_contrast() {
        let template = noise(6, 6);
        let image = GrayImage::from_fn(6, 6, |x, y| {
            Luma([(template.get_pixel(x, y)[0] as f64 * 0.5 + 40.0) as u8])
        });
        let map = ccoeff_normed(&image, &template).unwrap();
        assert!(map.get(0, 0) > 0.99);
    }

    #[test]
    fn flat_inputs_score_zero() {
        let flat = GrayImage::from_pixel(10, 10, Luma([77]));
        let template = noise(4, 4);
        let map = ccoeff_normed(&flat, &template).unwrap();
        assert!(map.values().iter().all(|&v| v == 0.0));

        let flat_template = GrayImage::from_pixel(4, 4, Luma([0]));
        let map = ccoeff_normed(&noise(10, 10), &flat_template).unwrap();
        assert!(map.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn oversized_template_has_no_map() {
        assert!(ccoeff_normed(&noise(5, 5), &noise(6, 2)).is_none());
    }

    #[test]
    fn peaks_are_non_overlapping_and_ordered() {
        let map = CorrelationMap {
            width: 10,
            height: 1,
            values: vec![0.1, 0.9, 0.95, 0.2, 0.3, 0.1, 0.8, 0.7, 0.0, 0.65],
        };
        let peaks = find_peaks(&map, 3, 1, 5, 0.6);
        let xs: Vec<_> = peaks.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![2, 6, 9]);
        assert!(find_peaks(&map, 3, 1, 5, 0.99).is_empty());
        assert_eq!(find_peaks(&map, 3, 1, 1, 0.0).len(), 1);
    }
}
