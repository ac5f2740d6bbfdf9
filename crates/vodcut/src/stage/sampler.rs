use futures_util::{StreamExt, stream::unfold};
use log::warn;
use tokio::sync::mpsc;
use vodcut_types::{FrameResult, LumaFrame};

use super::StreamBundle;

const SAMPLER_CHANNEL_CAPACITY: usize = 1;
const FALLBACK_FPS: f64 = 30.0;
const EPSILON: f64 = 1e-6;

/// A frame picked on the polling grid.
#[derive(Debug, Clone)]
pub struct PolledFrame {
    /// Position on the polling grid.
    pub index: usize,
    /// Grid time in seconds, `index * interval`.
    pub time: f64,
    pub frame: LumaFrame,
}

pub type PolledResult = FrameResult<PolledFrame>;

/// Picks, for every multiple of `interval`, the first decoded frame at or after it.
pub struct PollingSampler {
    interval: f64,
    fps: Option<f64>,
}

impl PollingSampler {
    pub fn new(interval: f64, fps: Option<f64>) -> Self {
        Self {
            interval,
            fps: fps.filter(|fps| fps.is_finite() && *fps > 0.0),
        }
    }

    pub fn attach(self, input: StreamBundle<FrameResult<LumaFrame>>) -> StreamBundle<PolledResult> {
        let StreamBundle {
            stream,
            total_frames,
        } = input;
        let (tx, rx) = mpsc::channel::<PolledResult>(SAMPLER_CHANNEL_CAPACITY);
        let mut schedule = PollSchedule::new(self.interval, self.fps);

        tokio::spawn(async move {
            let mut upstream = stream;
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(frame) => {
                        let mut closed = false;
                        for polled in schedule.poll(frame) {
                            if tx.send(Ok(polled)).await.is_err() {
                                closed = true;
                                break;
                            }
                        }
                        if closed {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(err)).await;
                        break;
                    }
                }
            }
        });

        let stream = Box::pin(unfold(rx, |mut receiver| async {
            receiver.recv().await.map(|item| (item, receiver))
        }));

        let total = total_frames.and_then(|total| {
            let fps = self.fps?;
            let seconds = total as f64 / fps;
            Some((seconds / self.interval).floor() as u64 + 1)
        });
        StreamBundle::new(stream, total)
    }
}

struct PollSchedule {
    interval: f64,
    fps: f64,
    processed: u64,
    next_index: usize,
    warned_fallback: bool,
}

impl PollSchedule {
    fn new(interval: f64, fps: Option<f64>) -> Self {
        Self {
            interval,
            fps: fps.unwrap_or(FALLBACK_FPS),
            processed: 0,
            next_index: 0,
            warned_fallback: fps.is_some(),
        }
    }

    /// Grid points this frame stands for; a sparse source can cover several.
    fn poll(&mut self, frame: LumaFrame) -> Vec<PolledFrame> {
        let time = self.frame_time(&frame);
        self.processed = self.processed.saturating_add(1);

        let mut polled = Vec::new();
        while self.next_index as f64 * self.interval <= time + EPSILON {
            let index = self.next_index;
            polled.push(PolledFrame {
                index,
                time: index as f64 * self.interval,
                frame: frame.clone(),
            });
            self.next_index += 1;
        }
        polled
    }

    fn frame_time(&mut self, frame: &LumaFrame) -> f64 {
        if let Some(ts) = frame.timestamp() {
            return ts.as_secs_f64();
        }
        if !self.warned_fallback {
            warn!("frames carry no timestamps and the frame rate is unknown; assuming {FALLBACK_FPS} fps");
            self.warned_fallback = true;
        }
        let index = frame.frame_index().unwrap_or(self.processed);
        index as f64 / self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::time::Duration;

    fn frame_at(index: u64, millis: Option<u64>) -> LumaFrame {
        LumaFrame::from_owned(1, 1, 1, millis.map(Duration::from_millis), vec![index as u8])
            .unwrap()
            .with_frame_index(Some(index))
    }

    async fn poll_all(frames: Vec<LumaFrame>, interval: f64, fps: Option<f64>) -> Vec<PolledFrame> {
        let input = StreamBundle::new(Box::pin(stream::iter(frames.into_iter().map(Ok))), None);
        PollingSampler::new(interval, fps)
            .attach(input)
            .stream
            .map(|item| item.unwrap())
            .collect()
            .await
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn picks_first_frame_at_each_grid_point() {
        let frames = (0..31).map(|i| frame_at(i, Some(i * 100))).collect();
        let polled = poll_all(frames, 1.0, Some(10.0)).await;
        let picked: Vec<_> = polled.iter().map(|p| p.frame.frame_index()).collect();
        assert_eq!(picked, vec![Some(0), Some(10), Some(20), Some(30)]);
        let times: Vec<_> = polled.iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sparse_frames_fill_every_grid_point() {
        let frames = (0..4).map(|i| frame_at(i, Some(i * 2500))).collect();
        let polled = poll_all(frames, 1.0, None).await;
        let indices: Vec<_> = polled.iter().map(|p| p.index).collect();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
        let picked: Vec<_> = polled.iter().map(|p| p.frame.frame_index().unwrap()).collect();
        assert_eq!(picked, vec![0, 1, 1, 2, 2, 2, 3, 3]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_timestamps_fall_back_to_frame_rate() {
        let frames = (0..9).map(|i| frame_at(i, None)).collect();
        let polled = poll_all(frames, 0.5, Some(4.0)).await;
        let picked: Vec<_> = polled.iter().map(|p| p.frame.frame_index()).collect();
        assert_eq!(picked, vec![Some(0), Some(2), Some(4), Some(6), Some(8)]);
    }
}
