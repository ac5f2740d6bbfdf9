use thiserror::Error;
use vodcut_locator::LocatorError;
use vodcut_types::FrameError;

use crate::model::SeriesStats;

pub type SegmentResult<T> = Result<T, SegmentError>;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("{stage} calibration failed: {reason}")]
    Calibration { stage: &'static str, reason: String },

    #[error("cannot score frame: {reason}")]
    Scoring { reason: String },

    #[error(
        "confidence series has no density split (count {}, min {:.3}, max {:.3}, mean {:.3})",
        stats.count, stats.min, stats.max, stats.mean
    )]
    NoSplitFound { stats: SeriesStats },

    #[error("need at least {window} confidence samples to smooth, got {count}")]
    TooFewSamples { count: usize, window: usize },

    #[error("video has no frames")]
    EmptyVideo,

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Locator(#[from] LocatorError),
}

impl SegmentError {
    pub fn calibration(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::Calibration {
            stage,
            reason: reason.into(),
        }
    }

    pub fn scoring(reason: impl Into<String>) -> Self {
        Self::Scoring {
            reason: reason.into(),
        }
    }
}
