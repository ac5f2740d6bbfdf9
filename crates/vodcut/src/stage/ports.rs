use log::{debug, info};
use vodcut_locator::{Template, TemplateLocator};
use vodcut_types::{LumaFrame, Rect};

use crate::error::SegmentResult;
use crate::layout::{HudLayout, PORT_COUNT, PortAnchor, SearchSettings};
use crate::model::{PortLayout, PortRoi, ScreenCalibration};
use crate::sampler::VideoSampler;

/// Window of `height x width` screen fractions anchored at `anchor` for
/// `port`, grown by `max_error` on every side and clipped to the screen.
fn padded_region(
    screen: &Rect,
    anchor: &PortAnchor,
    port: usize,
    (height, width): (f64, f64),
    max_error: f64,
) -> Rect {
    let (fy, fx) = anchor.at(port);
    let (top, left) = screen.at(fy, fx);
    let region = Rect::new(
        top - max_error * screen.height,
        left - max_error * screen.width,
        (height + 2.0 * max_error) * screen.height,
        (width + 2.0 * max_error) * screen.width,
    );
    region & *screen
}

/// Where to look for the percent sign of `port`.
pub fn percent_search_roi(layout: &HudLayout, screen: &Rect, port: usize, max_error: f64) -> Rect {
    let window = (layout.percent_window, layout.percent_window);
    padded_region(screen, &layout.percent_anchor, port, window, max_error)
}

/// Damage and stock indicator block of `port`.
pub fn indicator_region(layout: &HudLayout, screen: &Rect, port: usize, max_error: f64) -> Rect {
    let size = (layout.indicator_height, layout.indicator_width);
    padded_region(screen, &layout.indicator_anchor, port, size, max_error)
}

/// Decides, per port, whether a player occupies it.
pub struct PortDetector {
    layout: HudLayout,
    search: SearchSettings,
    max_error: f64,
}

impl PortDetector {
    pub fn new(layout: HudLayout, search: SearchSettings, max_error: f64) -> Self {
        Self {
            layout,
            search,
            max_error,
        }
    }

    pub async fn detect(
        &self,
        template: &Template,
        sampler: &VideoSampler,
        calibration: &ScreenCalibration,
    ) -> SegmentResult<PortLayout> {
        let frames = sampler.random_frames(self.search.port_samples).await?;
        self.detect_in_frames(template, &frames, calibration)
    }

    /// Runs the per-port search over an already drawn frame sample.
    pub fn detect_in_frames(
        &self,
        template: &Template,
        frames: &[LumaFrame],
        calibration: &ScreenCalibration,
    ) -> SegmentResult<PortLayout> {
        let screen = &calibration.screen;
        let locator = TemplateLocator::new(self.search.port_locator(calibration.scale));
        let mut slots = [PortRoi::Absent; PORT_COUNT];
        for (port, slot) in slots.iter_mut().enumerate() {
            let roi = percent_search_roi(&self.layout, screen, port, self.max_error);
            let located = locator.locate(template, frames, Some(roi))?;
            let Some(found) = located.locations.first() else {
                info!("port {port}: no percent sign in {roi}");
                continue;
            };
            let (fy, fx) = self.layout.percent_anchor.at(port);
            let (expected_y, expected_x) = screen.at(fy, fx);
            debug!(
                "port {port}: percent sign at ({:.0}, {:.0}), expected ({expected_y:.1}, {expected_x:.1}), error ({:+.1}, {:+.1}) px",
                found.y,
                found.x,
                found.y - expected_y,
                found.x - expected_x
            );
            let region = indicator_region(&self.layout, screen, port, self.max_error);
            info!("port {port}: detected, indicator region {region}");
            *slot = PortRoi::Detected(region);
        }
        Ok(PortLayout::new(slots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SyntheticVideo, percent_template};

    #[test]
    fn search_roi_is_padded_and_clipped() {
        let layout = HudLayout::default();
        let screen = Rect::new(0.0, 0.0, 100.0, 100.0);
        let roi = percent_search_roi(&layout, &screen, 0, 0.06);
        assert!((roi.top - 81.0).abs() < 1e-9);
        assert!((roi.left - 14.0).abs() < 1e-9);
        assert!((roi.height - 18.0).abs() < 1e-9);
        assert!((roi.width - 18.0).abs() < 1e-9);

        let last = percent_search_roi(&layout, &screen, 3, 0.06);
        assert!(last.right() <= screen.right());
    }

    #[test]
    fn indicator_regions_stay_on_screen() {
        let layout = HudLayout::default();
        let screen = Rect::new(17.0, 23.0, 205.0, 274.0);
        for port in 0..PORT_COUNT {
            let region = indicator_region(&layout, &screen, port, 0.06);
            assert!(!region.is_empty());
            assert!(region.top >= screen.top && region.left >= screen.left);
            assert!(region.bottom() <= screen.bottom() + 1e-9);
            assert!(region.right() <= screen.right() + 1e-9);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_ports_are_absent_at_their_index() {
        let video = SyntheticVideo::default();
        let sampler = video.sampler(1.0).await;
        let detector = PortDetector::new(HudLayout::default(), video.search(), 0.06);
        let layout = detector
            .detect(&percent_template(), &sampler, &video.calibration())
            .await
            .unwrap();
        let states: Vec<bool> = layout.slots().iter().map(PortRoi::is_detected).collect();
        assert_eq!(states, vec![false, true, false, true]);
    }
}
