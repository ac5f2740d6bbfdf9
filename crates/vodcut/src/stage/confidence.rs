use image::GrayImage;
use log::debug;
use vodcut_locator::{Template, canny, ccoeff_normed, crop};
use vodcut_types::{LumaFrame, Rect};

use crate::error::{SegmentError, SegmentResult};
use crate::layout::SearchSettings;
use crate::model::{PortLayout, ScreenCalibration};

/// Scores how strongly a frame looks like live gameplay.
///
/// The score is the best edge-map correlation between the percent sign at the
/// calibrated scale and the indicator region of any detected port.
pub struct ConfidenceScorer {
    edges: GrayImage,
    regions: Vec<(usize, Rect)>,
    edge_low: f32,
    edge_high: f32,
}

impl ConfidenceScorer {
    pub fn new(
        template: &Template,
        calibration: &ScreenCalibration,
        ports: &PortLayout,
        search: &SearchSettings,
    ) -> SegmentResult<Self> {
        let edges = template.scaled_edges(calibration.scale, search.edge_low, search.edge_high)?;
        let regions: Vec<(usize, Rect)> = ports
            .detected()
            .map(|(port, rect)| (port, *rect))
            .collect();
        if regions.is_empty() {
            return Err(SegmentError::scoring("no port was detected"));
        }
        Ok(Self {
            edges,
            regions,
            edge_low: search.edge_low,
            edge_high: search.edge_high,
        })
    }

    pub fn score(&self, frame: &LumaFrame) -> SegmentResult<f64> {
        let mut best: Option<f64> = None;
        for (port, region) in &self.regions {
            let Some(image) = crop(frame, region) else {
                continue;
            };
            let edges = canny(&image, self.edge_low, self.edge_high);
            let Some(peak) = ccoeff_normed(&edges, &self.edges).and_then(|map| map.max()) else {
                continue;
            };
            let score = peak.score as f64;
            if best.is_none_or(|top| score > top) {
                best = Some(score);
            }
            debug!("port {port}: confidence {score:.3}");
        }
        best.ok_or_else(|| {
            SegmentError::scoring(format!(
                "none of the {} port regions can hold a {}x{} percent sign",
                self.regions.len(),
                self.edges.width(),
                self.edges.height()
            ))
        })
    }
}
