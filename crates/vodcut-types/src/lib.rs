//! Shared domain models for the vodcut workspace.
//!
//! This crate centralizes lightweight data structures used across the decoder,
//! locator, and pipeline crates: luma frames, frame errors, and the pixel
//! geometry every detector expresses its regions in. Keep it backend-agnostic
//! and free of heavy dependencies so all crates can depend on it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

mod rect;

pub use rect::{FrameShape, PixelSpan, Rect};

pub type FrameResult<T> = Result<T, FrameError>;

/// Single-channel (luma) picture as produced by the decoder backends.
#[derive(Clone)]
pub struct LumaFrame {
    width: u32,
    height: u32,
    stride: usize,
    frame_index: Option<u64>,
    timestamp: Option<Duration>,
    data: Arc<[u8]>,
}

impl fmt::Debug for LumaFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LumaFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("timestamp", &self.timestamp)
            .field("bytes", &self.data.len())
            .field("frame_index", &self.frame_index)
            .finish()
    }
}

impl LumaFrame {
    pub fn from_owned(
        width: u32,
        height: u32,
        stride: usize,
        timestamp: Option<Duration>,
        data: Vec<u8>,
    ) -> FrameResult<Self> {
        if stride < width as usize {
            return Err(FrameError::InvalidFrame {
                reason: format!("stride {stride} is smaller than width {width}"),
            });
        }
        let required =
            stride
                .checked_mul(height as usize)
                .ok_or_else(|| FrameError::InvalidFrame {
                    reason: "calculated luma plane length overflowed".into(),
                })?;
        if data.len() < required {
            return Err(FrameError::InvalidFrame {
                reason: format!(
                    "insufficient luma bytes: got {} expected at least {}",
                    data.len(),
                    required
                ),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            timestamp,
            data: Arc::from(data.into_boxed_slice()),
            frame_index: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn shape(&self) -> FrameShape {
        FrameShape::new(self.height, self.width)
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn timestamp(&self) -> Option<Duration> {
        self.timestamp
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Visible pixels of row `y`, without stride padding.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width as usize]
    }

    pub fn frame_index(&self) -> Option<u64> {
        self.frame_index
    }

    pub fn with_frame_index(mut self, index: Option<u64>) -> Self {
        self.frame_index = index;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Option<Duration>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("backend {backend} is not supported in this build")]
    Unsupported { backend: &'static str },

    #[error("{backend} backend failed: {message}")]
    BackendFailure {
        backend: &'static str,
        message: String,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    pub fn unsupported(backend: &'static str) -> Self {
        Self::Unsupported { backend }
    }

    pub fn backend_failure(backend: &'static str, message: impl Into<String>) -> Self {
        Self::BackendFailure {
            backend,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// A pixel position with the score of the match found there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub y: f64,
    pub x: f64,
    pub confidence: f64,
}

impl Location {
    pub fn new(y: f64, x: f64, confidence: f64) -> Self {
        Self { y, x, confidence }
    }
}
