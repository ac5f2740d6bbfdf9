use std::collections::BTreeMap;

use log::{debug, info};
use vodcut_locator::{Template, TemplateLocator};
use vodcut_types::{FrameShape, LumaFrame, Location, Rect};

use crate::error::{SegmentError, SegmentResult};
use crate::layout::{HudLayout, PORT_COUNT, SearchSettings};
use crate::model::ScreenCalibration;
use crate::overlay::OverlayMap;
use crate::sampler::VideoSampler;

const STAGE: &str = "screen";

/// Finds the game screen from the row of percent signs along its bottom.
pub struct ScreenDetector {
    layout: HudLayout,
    search: SearchSettings,
}

impl ScreenDetector {
    pub fn new(layout: HudLayout, search: SearchSettings) -> Self {
        Self { layout, search }
    }

    /// Draws the screen and overlay samples in one pass, then calibrates.
    pub async fn detect(
        &self,
        template: &Template,
        sampler: &VideoSampler,
    ) -> SegmentResult<ScreenCalibration> {
        let mut draws = sampler
            .draw(&[self.search.screen_samples, self.search.overlay_samples])
            .await?
            .into_iter();
        let frames = draws.next().unwrap_or_default();
        let overlay_frames = draws.next().unwrap_or_default();
        let overlay = OverlayMap::from_frames(&overlay_frames).ok_or(SegmentError::EmptyVideo)?;
        self.detect_in_frames(template, &frames, &overlay)
    }

    /// Calibrates from an already drawn sample and the overlay map of the video.
    pub fn detect_in_frames(
        &self,
        template: &Template,
        frames: &[LumaFrame],
        overlay: &OverlayMap,
    ) -> SegmentResult<ScreenCalibration> {
        let located =
            TemplateLocator::new(self.search.screen_locator()).locate(template, frames, None)?;
        let Some(scale) = located.scale else {
            return Err(SegmentError::calibration(
                STAGE,
                format!(
                    "no percent sign above {:.2} in {} sampled frames",
                    self.search.screen_worst_match,
                    frames.len()
                ),
            ));
        };
        debug!(
            "percent template matched at scale {scale:.3} ({} sightings)",
            located.locations.len()
        );

        calibrate_from_candidates(
            &located.locations,
            (template.height() as f64 * scale, template.width() as f64 * scale),
            overlay.shape(),
            overlay,
            &self.layout,
            self.search.row_tolerance,
        )
    }
}

/// Screen rectangle implied by percent-sign sightings.
///
/// `percent_size` is the `(height, width)` of the template at the matched
/// scale. The busiest row of sightings fixes the screen top; the screen left
/// is taken from whichever port assignment of the leftmost sighting covers
/// the most live pixels of `overlay`.
pub fn calibrate_from_candidates(
    candidates: &[Location],
    percent_size: (f64, f64),
    shape: FrameShape,
    overlay: &OverlayMap,
    layout: &HudLayout,
    row_tolerance: f64,
) -> SegmentResult<ScreenCalibration> {
    let mut rows: BTreeMap<i64, Vec<&Location>> = BTreeMap::new();
    for candidate in candidates {
        let key = (candidate.y / row_tolerance).floor() as i64;
        rows.entry(key).or_default().push(candidate);
    }
    let mut busiest: Option<&Vec<&Location>> = None;
    for row in rows.values() {
        if busiest.is_none_or(|best| row.len() > best.len()) {
            busiest = Some(row);
        }
    }
    let Some(row) = busiest else {
        return Err(SegmentError::calibration(STAGE, "no percent sign candidates"));
    };

    let height = percent_size.0 / layout.percent_height;
    let width = percent_size.1 / layout.percent_height;
    let mean_y = row.iter().map(|l| l.y).sum::<f64>() / row.len() as f64;
    let top = mean_y - layout.percent_top * height;
    let leftmost = row.iter().map(|l| l.x).fold(f64::INFINITY, f64::min);
    debug!(
        "{} of {} sightings in row y~{mean_y:.1}, leftmost x={leftmost:.1}",
        row.len(),
        candidates.len()
    );

    let mut best: Option<(usize, f64, usize)> = None;
    for port in 0..PORT_COUNT {
        let (_, fx) = layout.percent_anchor.at(port);
        let left = leftmost - fx * width;
        let trial = Rect::new(top, left, height, width) & shape;
        let live = overlay.count_live(&trial);
        debug!("leftmost sighting as port {port}: left={left:.1}, {live} live pixels");
        if best.is_none_or(|(_, _, most)| live > most) {
            best = Some((port, left, live));
        }
    }
    let Some((port, left, _)) = best else {
        return Err(SegmentError::calibration(STAGE, "layout defines no ports"));
    };

    let scale = ((height / layout.reference_height) * (width / layout.reference_width)).sqrt();
    let unclipped = Rect::new(top, left, height, width);
    let screen = unclipped & shape;
    if screen.is_empty() {
        return Err(SegmentError::calibration(
            STAGE,
            format!(
                "screen {unclipped} lies outside the {}x{} frame",
                shape.width, shape.height
            ),
        ));
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(SegmentError::calibration(
            STAGE,
            format!("screen scale {scale} from height {height:.1} and width {width:.1}"),
        ));
    }
    info!("screen {screen} scale {scale:.3} (leftmost sign is port {port})");
    Ok(ScreenCalibration { screen, scale })
}
