//! Match-chunk segmentation of recorded gameplay video.
//!
//! A [`Segmenter`] calibrates the HUD of one recording in three steps and
//! threads each result into the next: the screen rectangle and display scale
//! ([`ScreenCalibration`]), the occupied player ports ([`PortLayout`]), and
//! finally a per-frame confidence series that is split into [`MatchChunk`]s.

pub mod cli;
pub mod error;
pub mod layout;
pub mod model;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod sampler;
pub mod settings;
pub mod stage;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{SegmentError, SegmentResult};
pub use layout::{HudLayout, PORT_COUNT, SearchSettings};
pub use model::{
    ConfidenceSample, ConfidenceSeries, MatchChunk, PortLayout, PortRoi, ScreenCalibration,
    SegmentationReport, SeriesStats, Threshold,
};
pub use pipeline::{ProgressCallback, ScoringProgress, Segmenter, SegmenterConfig};
pub use sampler::VideoSampler;
