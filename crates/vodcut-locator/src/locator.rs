use image::GrayImage;
use log::debug;
use vodcut_types::{Location, LumaFrame, Rect};

use crate::LocatorError;
use crate::pipeline::preprocess::{region_span, to_image};
use crate::pipeline::{ccoeff_normed, crop, find_peaks};
use crate::template::Template;

#[derive(Debug, Clone, PartialEq)]
pub struct LocatorSettings {
    pub scales: Vec<f64>,
    /// Matches kept per frame.
    pub max_clusters: usize,
    /// Similarity floor a match must reach.
    pub worst_match: f64,
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            scales: vec![1.0],
            max_clusters: 1,
            worst_match: 0.8,
        }
    }
}

impl LocatorSettings {
    /// Scales from `start` up to (excluding) `stop` in increments of `step`.
    pub fn scale_range(start: f64, stop: f64, step: f64) -> Vec<f64> {
        if step.is_nan() || step <= 0.0 || !start.is_finite() || !stop.is_finite() {
            return Vec::new();
        }
        let count = ((stop - start) / step).ceil().max(0.0) as usize;
        (0..count).map(|i| start + i as f64 * step).collect()
    }
}

/// Outcome of a search: the best fitting scale and the matches found at it.
///
/// `scale` is `None` when no frame produced a match above the floor, in which
/// case `locations` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub scale: Option<f64>,
    pub locations: Vec<Location>,
}

impl Located {
    pub fn none() -> Self {
        Self {
            scale: None,
            locations: Vec::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.scale.is_some()
    }
}

pub struct TemplateLocator {
    settings: LocatorSettings,
}

impl TemplateLocator {
    pub fn new(settings: LocatorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LocatorSettings {
        &self.settings
    }

    /// Searches `frames` for `template`, optionally only inside `roi`.
    ///
    /// Every configured scale is tried; the winner is the scale whose accepted
    /// matches have the highest mean score (earlier scales win ties). Returned
    /// locations are top-left corners in absolute frame coordinates.
    pub fn locate(
        &self,
        template: &Template,
        frames: &[LumaFrame],
        roi: Option<Rect>,
    ) -> Result<Located, LocatorError> {
        let regions: Vec<(GrayImage, usize, usize)> = frames
            .iter()
            .filter_map(|frame| search_region(frame, roi))
            .collect();
        if regions.is_empty() {
            return Ok(Located::none());
        }

        let floor = self.settings.worst_match as f32;
        let mut best: Option<(f64, f64, Vec<Location>)> = None;
        for &scale in &self.settings.scales {
            let scaled = template.scaled(scale)?;
            let (tpl_w, tpl_h) = (scaled.width() as usize, scaled.height() as usize);
            let mut locations = Vec::new();
            for (image, top, left) in &regions {
                let Some(map) = ccoeff_normed(image, &scaled) else {
                    continue;
                };
                for peak in find_peaks(&map, tpl_w, tpl_h, self.settings.max_clusters, floor) {
                    locations.push(Location::new(
                        (top + peak.y) as f64,
                        (left + peak.x) as f64,
                        peak.score as f64,
                    ));
                }
            }
            if locations.is_empty() {
                debug!("scale {scale:.3}: no match above {floor:.2}");
                continue;
            }
            let mean =
                locations.iter().map(|l| l.confidence).sum::<f64>() / locations.len() as f64;
            debug!(
                "scale {scale:.3}: {} matches, mean score {mean:.3}",
                locations.len()
            );
            if best.as_ref().is_none_or(|(_, score, _)| mean > *score) {
                best = Some((scale, mean, locations));
            }
        }

        Ok(match best {
            Some((scale, _, locations)) => Located {
                scale: Some(scale),
                locations,
            },
            None => Located::none(),
        })
    }
}

fn search_region(frame: &LumaFrame, roi: Option<Rect>) -> Option<(GrayImage, usize, usize)> {
    match roi {
        Some(rect) => {
            let span = region_span(frame, &rect)?;
            let image = crop(frame, &rect)?;
            Some((image, span.top, span.left))
        }
        None => Some((to_image(frame), 0, 0)),
    }
}
