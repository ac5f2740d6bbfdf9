//! Turns a confidence series into match chunks.
//!
//! The series is median-smoothed, a Gaussian kernel density is estimated over
//! the smoothed values, and the deepest valley of the log-density between
//! the "menu" and "match" modes becomes the split.

use log::debug;

use crate::error::{SegmentError, SegmentResult};
use crate::model::{MatchChunk, SeriesStats, Threshold};

pub const SMOOTHING_WINDOW: usize = 5;
pub const KDE_BANDWIDTH: f64 = 0.005;
/// Evaluation points of the density over `[0, 1]`.
pub const DENSITY_POINTS: usize = 100;

/// Result of splitting one series.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub split: f64,
    pub smoothed: Vec<f64>,
    pub chunks: Vec<MatchChunk>,
}

impl Segmentation {
    pub fn threshold(&self) -> Threshold {
        Threshold::Split(self.split)
    }
}

/// Centered rolling median.
///
/// Edge positions without a full window take the nearest smoothed value,
/// backward fill first, then forward fill.
pub fn smooth(values: &[f64], window: usize) -> SegmentResult<Vec<f64>> {
    let window = window.max(1);
    if values.len() < window {
        return Err(SegmentError::TooFewSamples {
            count: values.len(),
            window,
        });
    }
    let before = (window - 1) / 2;
    let after = window - 1 - before;
    let mut smoothed: Vec<Option<f64>> = vec![None; values.len()];
    let mut scratch = Vec::with_capacity(window);
    for center in before..values.len() - after {
        scratch.clear();
        scratch.extend_from_slice(&values[center - before..=center + after]);
        smoothed[center] = Some(median(&mut scratch));
    }

    let mut next = None;
    for slot in smoothed.iter_mut().rev() {
        match slot {
            Some(value) => next = Some(*value),
            None => *slot = next,
        }
    }
    let mut previous = None;
    for slot in smoothed.iter_mut() {
        match slot {
            Some(value) => previous = Some(*value),
            None => *slot = previous,
        }
    }
    Ok(smoothed.into_iter().flatten().collect())
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

/// `i / (points - 1)` for `i` in `0..points`.
pub fn density_grid(points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let last = (points - 1) as f64;
            (0..points).map(|i| i as f64 / last).collect()
        }
    }
}

/// Gaussian kernel log-density of `values` at every point of `grid`.
///
/// Evaluated with log-sum-exp so that points far from every sample keep a
/// finite, ordered value.
pub fn log_density(values: &[f64], bandwidth: f64, grid: &[f64]) -> Vec<f64> {
    let samples: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if samples.is_empty() {
        return vec![f64::NEG_INFINITY; grid.len()];
    }
    let norm = (samples.len() as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt()).ln();
    let denom = 2.0 * bandwidth * bandwidth;
    grid.iter()
        .map(|&point| {
            let max = samples
                .iter()
                .map(|v| -(point - v).powi(2) / denom)
                .fold(f64::NEG_INFINITY, f64::max);
            let sum: f64 = samples
                .iter()
                .map(|v| (-(point - v).powi(2) / denom - max).exp())
                .sum();
            max + sum.ln() - norm
        })
        .collect()
}

/// Grid value of the most prominent strict local minimum of the density.
pub fn split_threshold(smoothed: &[f64]) -> Threshold {
    let grid = density_grid(DENSITY_POINTS);
    let density = log_density(smoothed, KDE_BANDWIDTH, &grid);
    let mut best: Option<(usize, f64)> = None;
    for i in 1..density.len().saturating_sub(1) {
        let (left, here, right) = (density[i - 1], density[i], density[i + 1]);
        if !(here < left && here < right) {
            continue;
        }
        let prominence = (left - here).min(right - here);
        if best.is_none_or(|(_, top)| prominence > top) {
            best = Some((i, prominence));
        }
    }
    match best {
        Some((i, prominence)) => {
            debug!("density split at {:.4} (prominence {prominence:.3})", grid[i]);
            Threshold::Split(grid[i])
        }
        None => Threshold::NoSeparation,
    }
}

/// Maximal runs of samples strictly above `split`, in seconds.
pub fn chunk_series(smoothed: &[f64], split: f64, interval: f64) -> Vec<MatchChunk> {
    let mut chunks = Vec::new();
    let mut run: Option<(usize, usize)> = None;
    for (index, value) in smoothed.iter().enumerate() {
        if *value > split {
            run = Some(match run {
                Some((first, _)) => (first, index),
                None => (index, index),
            });
        } else if let Some((first, last)) = run.take() {
            chunks.push(chunk(first, last, interval));
        }
    }
    if let Some((first, last)) = run {
        chunks.push(chunk(first, last, interval));
    }
    chunks
}

fn chunk(first: usize, last: usize, interval: f64) -> MatchChunk {
    MatchChunk {
        start: interval * first as f64,
        end: interval * last as f64,
    }
}

/// Smooths, splits and chunks `values` sampled every `interval` seconds.
pub fn segment(values: &[f64], interval: f64) -> SegmentResult<Segmentation> {
    let smoothed = smooth(values, SMOOTHING_WINDOW)?;
    let split = match split_threshold(&smoothed) {
        Threshold::Split(split) => split,
        Threshold::NoSeparation => {
            return Err(SegmentError::NoSplitFound {
                stats: SeriesStats::from_values(values),
            });
        }
    };
    let chunks = chunk_series(&smoothed, split, interval);
    Ok(Segmentation {
        split,
        smoothed,
        chunks,
    })
}
