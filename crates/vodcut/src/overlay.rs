//! Per-pixel temporal statistics used to tell live screen content apart from
//! static overlays and borders.

use vodcut_types::{FrameShape, LumaFrame, Rect};

/// Minimum temporal standard deviation, in luma levels, of live content.
pub const MIN_STD: f64 = 2.0;
/// Largest absolute skewness still considered live content.
pub const MAX_ABS_SKEW: f64 = 2.0;
/// Largest excess kurtosis still considered live content.
pub const MAX_EXCESS_KURTOSIS: f64 = 7.0;

/// `0` marks live screen content, `1` marks static or heavy-tailed pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayMap {
    shape: FrameShape,
    data: Vec<u8>,
}

impl OverlayMap {
    /// Builds the map from frames sharing the shape of the first one.
    ///
    /// Frames of any other shape are ignored. Returns `None` without frames.
    pub fn from_frames(frames: &[LumaFrame]) -> Option<Self> {
        let shape = frames.first()?.shape();
        let width = shape.width as usize;
        let mut moments = vec![[0.0f64; 4]; shape.pixel_count()];
        let mut count = 0usize;
        for frame in frames.iter().filter(|frame| frame.shape() == shape) {
            count += 1;
            for y in 0..shape.height as usize {
                let row = frame.row(y);
                let acc = &mut moments[y * width..(y + 1) * width];
                for (slot, &value) in acc.iter_mut().zip(row) {
                    let v = value as f64;
                    let v2 = v * v;
                    slot[0] += v;
                    slot[1] += v2;
                    slot[2] += v2 * v;
                    slot[3] += v2 * v2;
                }
            }
        }
        let n = count as f64;
        let data = moments
            .iter()
            .map(|m| if is_live(m, n) { 0 } else { 1 })
            .collect();
        Some(Self { shape, data })
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn get(&self, y: usize, x: usize) -> u8 {
        self.data[y * self.shape.width as usize + x]
    }

    /// Number of live-content pixels inside `rect`, after clipping to the map.
    pub fn count_live(&self, rect: &Rect) -> usize {
        let Some(span) = (*rect & self.shape).pixel_span() else {
            return 0;
        };
        let width = self.shape.width as usize;
        let bottom = span.bottom().min(self.shape.height as usize);
        let right = span.right().min(width);
        if right <= span.left {
            return 0;
        }
        (span.top..bottom)
            .map(|y| {
                self.data[y * width + span.left..y * width + right]
                    .iter()
                    .filter(|&&value| value == 0)
                    .count()
            })
            .sum()
    }
}

fn is_live(sums: &[f64; 4], n: f64) -> bool {
    if n < 2.0 {
        return false;
    }
    let mean = sums[0] / n;
    let m2 = sums[1] / n;
    let m3 = sums[2] / n;
    let m4 = sums[3] / n;
    let variance = m2 - mean * mean;
    if variance < MIN_STD * MIN_STD {
        return false;
    }
    let central3 = m3 - 3.0 * mean * m2 + 2.0 * mean.powi(3);
    let central4 = m4 - 4.0 * mean * m3 + 6.0 * mean * mean * m2 - 3.0 * mean.powi(4);
    let skew = central3 / variance.powf(1.5);
    let excess_kurtosis = central4 / (variance * variance) - 3.0;
    skew.abs() <= MAX_ABS_SKEW && excess_kurtosis <= MAX_EXCESS_KURTOSIS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> LumaFrame {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        LumaFrame::from_owned(width, height, width as usize, None, data).unwrap()
    }

    #[test]
    fn varying_pixels_are_live_and_static_pixels_are_not() {
        let frames: Vec<_> = (0..20u32)
            .map(|k| frame(4, 2, move |x, _| if x < 2 { 40 + (k * 7 % 50) as u8 } else { 90 }))
            .collect();
        let map = OverlayMap::from_frames(&frames).unwrap();
        assert_eq!(map.get(0, 0), 0);
        assert_eq!(map.get(1, 1), 0);
        assert_eq!(map.get(0, 2), 1);
        assert_eq!(map.get(1, 3), 1);
        assert_eq!(map.count_live(&Rect::new(0.0, 0.0, 2.0, 4.0)), 4);
        assert_eq!(map.count_live(&Rect::new(-5.0, 1.0, 20.0, 20.0)), 2);
    }

    #[test]
    fn rare_spikes_are_heavy_tailed() {
        let frames: Vec<_> = (0..60u32)
            .map(|k| frame(1, 1, move |_, _| if k == 7 { 250 } else { 20 + (k % 2) as u8 }))
            .collect();
        let map = OverlayMap::from_frames(&frames).unwrap();
        assert_eq!(map.get(0, 0), 1);
    }

    #[test]
    fn no_frames_no_map() {
        assert!(OverlayMap::from_frames(&[]).is_none());
    }
}
