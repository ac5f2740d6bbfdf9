use std::path::PathBuf;

use serde::Serialize;
use vodcut_types::Rect;

use crate::layout::PORT_COUNT;

/// Where the game screen sits in the video and how large it is relative to
/// the reference layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenCalibration {
    pub screen: Rect,
    pub scale: f64,
}

/// Percent-indicator region of one player port.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "region", rename_all = "snake_case")]
pub enum PortRoi {
    Detected(Rect),
    Absent,
}

impl PortRoi {
    pub fn region(&self) -> Option<&Rect> {
        match self {
            PortRoi::Detected(rect) => Some(rect),
            PortRoi::Absent => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, PortRoi::Detected(_))
    }
}

/// One [`PortRoi`] per player port, in port order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PortLayout {
    slots: [PortRoi; PORT_COUNT],
}

impl PortLayout {
    pub fn new(slots: [PortRoi; PORT_COUNT]) -> Self {
        Self { slots }
    }

    pub fn absent() -> Self {
        Self::new([PortRoi::Absent; PORT_COUNT])
    }

    pub fn slots(&self) -> &[PortRoi; PORT_COUNT] {
        &self.slots
    }

    pub fn get(&self, port: usize) -> Option<&PortRoi> {
        self.slots.get(port)
    }

    /// Detected ports with their index.
    pub fn detected(&self) -> impl Iterator<Item = (usize, &Rect)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(port, slot)| slot.region().map(|rect| (port, rect)))
    }

    pub fn detected_count(&self) -> usize {
        self.detected().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceSample {
    pub time: f64,
    pub confidence: f64,
}

pub type ConfidenceSeries = Vec<ConfidenceSample>;

/// Time span, in seconds, during which a match is being played.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchChunk {
    pub start: f64,
    pub end: f64,
}

/// Decision boundary between "menu" and "match" confidences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Threshold {
    Split(f64),
    NoSeparation,
}

/// Summary of a confidence series, reported when it cannot be split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl SeriesStats {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                count: 0,
                min: f64::NAN,
                max: f64::NAN,
                mean: f64::NAN,
            };
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Self {
            count: values.len(),
            min,
            max,
            mean,
        }
    }
}

/// Everything a run found, in the shape written to the JSON report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentationReport {
    pub input: Option<PathBuf>,
    pub match_log: Option<PathBuf>,
    pub layout_version: String,
    pub polling_interval: f64,
    pub calibration: ScreenCalibration,
    pub ports: PortLayout,
    pub threshold: Threshold,
    pub chunks: Vec<MatchChunk>,
    pub series: ConfidenceSeries,
}
