//! Synthetic gameplay footage for tests.
//!
//! A [`SyntheticVideo`] is a static border around a flat screen whose level
//! changes every frame. During the match section the percent sign of every
//! visible port is drawn at its layout position.

use std::sync::Arc;
use std::time::Duration;

use vodcut_decoder::{FrameSource, MemorySource};
use vodcut_locator::Template;
use vodcut_types::{FrameShape, LumaFrame, Rect};

use crate::layout::{HudLayout, PORT_COUNT, SearchSettings};
use crate::model::{PortLayout, PortRoi, ScreenCalibration};
use crate::pipeline::SegmenterConfig;
use crate::sampler::VideoSampler;
use crate::stage::ports::indicator_region;

pub const TEMPLATE_WIDTH: u32 = 32;
pub const TEMPLATE_HEIGHT: u32 = 24;

/// A 32x24 percent glyph: two squares joined by a diagonal bar.
pub fn percent_template() -> Template {
    let mut data = vec![0u8; (TEMPLATE_WIDTH * TEMPLATE_HEIGHT) as usize];
    for r in 0..TEMPLATE_HEIGHT as i32 {
        for c in 0..TEMPLATE_WIDTH as i32 {
            let upper = (3..10).contains(&r) && (4..12).contains(&c);
            let lower = (14..21).contains(&r) && (20..28).contains(&c);
            let bar = (6..=26).contains(&c) && (r as f64 + 0.75 * c as f64 - 23.0).abs() < 2.5;
            if upper || lower || bar {
                data[(r * TEMPLATE_WIDTH as i32 + c) as usize] = 255;
            }
        }
    }
    Template::from_pixels(TEMPLATE_WIDTH, TEMPLATE_HEIGHT, data).expect("static template")
}

#[derive(Debug, Clone)]
pub struct SyntheticVideo {
    pub shape: FrameShape,
    pub border: u8,
    pub top: f64,
    pub left: f64,
    pub scale: f64,
    pub visible_ports: [bool; PORT_COUNT],
    pub menu_frames: usize,
    pub match_frames: usize,
    pub trailing_frames: usize,
    pub fps: f64,
    pub seed: u64,
}

impl Default for SyntheticVideo {
    fn default() -> Self {
        Self {
            shape: FrameShape::new(240, 320),
            border: 70,
            top: 17.0,
            left: 23.0,
            scale: 0.5,
            visible_ports: [false, true, false, true],
            menu_frames: 6,
            match_frames: 28,
            trailing_frames: 6,
            fps: 1.0,
            seed: 11,
        }
    }
}

impl SyntheticVideo {
    pub fn total_frames(&self) -> usize {
        self.menu_frames + self.match_frames + self.trailing_frames
    }

    pub fn is_match_frame(&self, index: usize) -> bool {
        index >= self.menu_frames && index < self.menu_frames + self.match_frames
    }

    /// First and last second of gameplay.
    pub fn match_span(&self) -> (f64, f64) {
        let first = self.menu_frames as f64 / self.fps;
        let last = (self.menu_frames + self.match_frames - 1) as f64 / self.fps;
        (first, last)
    }

    pub fn screen(&self) -> Rect {
        let layout = HudLayout::default();
        let height = TEMPLATE_HEIGHT as f64 * self.scale / layout.percent_height;
        let width = TEMPLATE_WIDTH as f64 * self.scale / layout.percent_height;
        Rect::new(self.top, self.left, height, width) & self.shape
    }

    pub fn calibration(&self) -> ScreenCalibration {
        let layout = HudLayout::default();
        let screen = self.screen();
        let scale = ((screen.height / layout.reference_height)
            * (screen.width / layout.reference_width))
            .sqrt();
        ScreenCalibration { screen, scale }
    }

    /// Port layout a correct detector reports for this video.
    pub fn expected_ports(&self) -> PortLayout {
        let layout = HudLayout::default();
        let screen = self.screen();
        let mut slots = [PortRoi::Absent; PORT_COUNT];
        for (port, slot) in slots.iter_mut().enumerate() {
            if self.visible_ports[port] {
                *slot = PortRoi::Detected(indicator_region(&layout, &screen, port, 0.06));
            }
        }
        PortLayout::new(slots)
    }

    /// Small scale grid around the true scale, keeping test runs short.
    pub fn search(&self) -> SearchSettings {
        SearchSettings {
            scales: Some(vec![self.scale - 0.03, self.scale, self.scale + 0.03]),
            screen_samples: 8,
            ..SearchSettings::default()
        }
    }

    pub fn config(&self) -> SegmenterConfig {
        SegmenterConfig {
            polling_interval: 1.0 / self.fps,
            search: self.search(),
            seed: Some(self.seed),
            ..SegmenterConfig::default()
        }
    }

    pub fn frame(&self, index: usize) -> LumaFrame {
        let layout = HudLayout::default();
        let width = self.shape.width as usize;
        let mut data = vec![self.border; self.shape.pixel_count()];
        let level = 50 + (index * 29 % 41) as u8;
        let screen = Rect::new(
            self.top,
            self.left,
            TEMPLATE_HEIGHT as f64 * self.scale / layout.percent_height,
            TEMPLATE_WIDTH as f64 * self.scale / layout.percent_height,
        );
        if let Some(span) = (screen & self.shape).pixel_span() {
            for y in span.top..span.bottom() {
                data[y * width + span.left..y * width + span.right()].fill(level);
            }
        }

        if self.is_match_frame(index) {
            let glyph = percent_template()
                .scaled(self.scale)
                .expect("scaled template");
            for port in (0..PORT_COUNT).filter(|port| self.visible_ports[*port]) {
                let (fy, fx) = layout.percent_anchor.at(port);
                let (_, x) = screen.at(fy, fx);
                let y = screen.top + layout.percent_top * screen.height;
                let (oy, ox) = (y.round() as usize, x.round() as usize);
                for (gx, gy, pixel) in glyph.enumerate_pixels() {
                    let t = pixel.0[0] as f64;
                    let value = level as f64 + t * (255.0 - level as f64) / 255.0;
                    data[(oy + gy as usize) * width + ox + gx as usize] = value.round() as u8;
                }
            }
        }

        let timestamp = Duration::from_secs_f64(index as f64 / self.fps);
        LumaFrame::from_owned(self.shape.width, self.shape.height, width, Some(timestamp), data)
            .expect("synthetic frame")
            .with_frame_index(Some(index as u64))
    }

    pub fn frames(&self) -> Vec<LumaFrame> {
        (0..self.total_frames()).map(|index| self.frame(index)).collect()
    }

    pub fn source(&self) -> Arc<dyn FrameSource> {
        Arc::new(MemorySource::new(self.frames()).with_fps(self.fps))
    }

    pub async fn sampler(&self, polling_interval: f64) -> VideoSampler {
        VideoSampler::open(self.source(), polling_interval, Some(self.seed))
            .await
            .expect("synthetic sampler")
    }
}
