use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc::Sender;

use crate::core::{
    DynFrameProvider, FrameResult, FrameStream, FrameStreamProvider, LumaFrame, VideoMetadata,
    spawn_stream_from_channel,
};

/// Emits a short run of rolling-gradient frames without touching the input.
pub struct MockProvider {
    _input: Option<PathBuf>,
    width: u32,
    height: u32,
    stride: usize,
    frame_count: usize,
    fps: f64,
    channel_capacity: usize,
}

impl MockProvider {
    const DEFAULT_CHANNEL_CAPACITY: usize = 8;

    pub fn new(input: Option<PathBuf>, channel_capacity: Option<usize>) -> Self {
        Self {
            _input: input,
            width: 320,
            height: 240,
            stride: 320,
            frame_count: 120,
            fps: 60.0,
            channel_capacity: channel_capacity
                .unwrap_or(Self::DEFAULT_CHANNEL_CAPACITY)
                .max(1),
        }
    }

    fn emit_frames(&self, tx: Sender<FrameResult<LumaFrame>>) {
        for index in 0..self.frame_count {
            if tx.is_closed() {
                break;
            }
            let mut buffer = vec![0u8; self.stride * self.height as usize];
            for (row, chunk) in buffer.chunks_mut(self.stride).enumerate() {
                let value = ((row + index) % 256) as u8;
                chunk.fill(value);
            }
            let timestamp = Some(Duration::from_secs_f64(index as f64 / self.fps));
            let frame = LumaFrame::from_owned(self.width, self.height, self.stride, timestamp, buffer)
                .map(|frame| frame.with_frame_index(Some(index as u64)));
            if tx.blocking_send(frame).is_err() {
                break;
            }
        }
    }
}

impl FrameStreamProvider for MockProvider {
    fn metadata(&self) -> VideoMetadata {
        VideoMetadata {
            duration: Some(Duration::from_secs_f64(self.frame_count as f64 / self.fps)),
            fps: Some(self.fps),
            width: Some(self.width),
            height: Some(self.height),
            total_frames: Some(self.frame_count as u64),
        }
    }

    fn into_stream(self: Box<Self>) -> FrameStream {
        let provider = *self;
        let capacity = provider.channel_capacity;
        spawn_stream_from_channel(capacity, move |tx| provider.emit_frames(tx))
    }
}

pub fn boxed_mock(
    input: Option<PathBuf>,
    channel_capacity: Option<usize>,
) -> FrameResult<DynFrameProvider> {
    Ok(Box::new(MockProvider::new(input, channel_capacity)))
}
