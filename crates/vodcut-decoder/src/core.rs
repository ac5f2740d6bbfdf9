use std::pin::Pin;
use std::time::Duration;

use futures_core::Stream;
use futures_util::stream::unfold;
use tokio::sync::mpsc::{self, Sender};

pub use vodcut_types::{FrameError, FrameResult, LumaFrame};

pub type FrameStream = Pin<Box<dyn Stream<Item = FrameResult<LumaFrame>> + Send>>;

pub type DynFrameProvider = Box<dyn FrameStreamProvider>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoMetadata {
    pub duration: Option<Duration>,
    pub fps: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub total_frames: Option<u64>,
}

impl VideoMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration_and_fps(duration: Duration, fps: f64) -> Self {
        Self {
            duration: Some(duration),
            fps: Some(fps),
            ..Default::default()
        }
    }

    pub fn calculate_total_frames(&self) -> Option<u64> {
        if let Some(total) = self.total_frames {
            return Some(total);
        }

        if let (Some(duration), Some(fps)) = (self.duration, self.fps) {
            let seconds = duration.as_secs_f64();
            let total = (seconds * fps).round();
            if total.is_finite() && total >= 0.0 {
                return Some(total as u64);
            }
        }

        None
    }
}

/// A single decode pass over a video.
pub trait FrameStreamProvider: Send + 'static {
    fn metadata(&self) -> VideoMetadata {
        VideoMetadata::default()
    }

    fn into_stream(self: Box<Self>) -> FrameStream;
}

/// Anything that can open a fresh decode pass on demand.
///
/// Every call yields an independent provider, so callers can walk the same
/// video several times without holding decoder state between passes.
pub trait FrameSource: Send + Sync {
    fn open(&self) -> FrameResult<DynFrameProvider>;
}

pub fn spawn_stream_from_channel(
    capacity: usize,
    task: impl FnOnce(Sender<FrameResult<LumaFrame>>) + Send + 'static,
) -> FrameStream {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::task::spawn_blocking(move || task(tx));
    let stream = unfold(rx, |mut receiver| async {
        receiver.recv().await.map(|item| (item, receiver))
    });
    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[test]
    fn total_frames_falls_back_to_duration() {
        let metadata = VideoMetadata::with_duration_and_fps(Duration::from_secs(2), 30.0);
        assert_eq!(metadata.calculate_total_frames(), Some(60));
        assert_eq!(VideoMetadata::new().calculate_total_frames(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn spawn_stream_from_channel_pushes_values() {
        let mut stream = spawn_stream_from_channel(2, move |tx| {
            tx.blocking_send(LumaFrame::from_owned(2, 2, 2, None, vec![1, 2, 3, 4]))
                .unwrap();
        });
        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(frame.data(), &[1, 2, 3, 4]);
        assert!(stream.next().await.is_none());
    }
}
