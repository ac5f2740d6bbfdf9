use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;

use crate::core::{
    DynFrameProvider, FrameResult, FrameSource, FrameStream, FrameStreamProvider, LumaFrame,
    VideoMetadata,
};

/// Replays frames that are already decoded and held in memory.
pub struct MemoryProvider {
    frames: Arc<[LumaFrame]>,
    fps: Option<f64>,
}

impl MemoryProvider {
    pub fn new(frames: Arc<[LumaFrame]>, fps: Option<f64>) -> Self {
        Self { frames, fps }
    }
}

impl FrameStreamProvider for MemoryProvider {
    fn metadata(&self) -> VideoMetadata {
        let first = self.frames.first();
        let total = self.frames.len() as u64;
        VideoMetadata {
            duration: self
                .fps
                .filter(|fps| *fps > 0.0)
                .map(|fps| Duration::from_secs_f64(total as f64 / fps)),
            fps: self.fps,
            width: first.map(LumaFrame::width),
            height: first.map(LumaFrame::height),
            total_frames: Some(total),
        }
    }

    fn into_stream(self: Box<Self>) -> FrameStream {
        let frames = self.frames;
        let items = (0..frames.len()).map(move |index| {
            let frame = frames[index].clone();
            let frame = match frame.frame_index() {
                Some(_) => frame,
                None => frame.with_frame_index(Some(index as u64)),
            };
            Ok(frame)
        });
        Box::pin(stream::iter(items))
    }
}

/// A [`FrameSource`] that hands out a new [`MemoryProvider`] per pass.
#[derive(Clone)]
pub struct MemorySource {
    frames: Arc<[LumaFrame]>,
    fps: Option<f64>,
}

impl MemorySource {
    pub fn new(frames: Vec<LumaFrame>) -> Self {
        Self {
            frames: Arc::from(frames),
            fps: None,
        }
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for MemorySource {
    fn open(&self) -> FrameResult<DynFrameProvider> {
        Ok(Box::new(MemoryProvider::new(self.frames.clone(), self.fps)))
    }
}
