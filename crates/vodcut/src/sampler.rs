//! Frame sampling over a restartable video source.
//!
//! Every method opens a fresh decode pass, so a sampler can be queried any
//! number of times and holds no decoder state between calls. A pass decodes
//! the whole video; callers that need several random draws should take them
//! together through [`VideoSampler::draw`] or
//! [`VideoSampler::calibration_sample`].

use std::sync::Arc;

use futures_util::StreamExt;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vodcut_decoder::{FrameSource, VideoMetadata};
use vodcut_types::{FrameShape, LumaFrame};

use crate::error::{SegmentError, SegmentResult};
use crate::overlay::OverlayMap;
use crate::stage::StreamBundle;
use crate::layout::SearchSettings;
use crate::stage::sampler::{PolledFrame, PolledResult, PollingSampler};

pub struct VideoSampler {
    source: Arc<dyn FrameSource>,
    polling_interval: f64,
    metadata: VideoMetadata,
    shape: FrameShape,
    seed: Option<u64>,
}

impl VideoSampler {
    /// Probes the source for its metadata and frame shape.
    pub async fn open(
        source: Arc<dyn FrameSource>,
        polling_interval: f64,
        seed: Option<u64>,
    ) -> SegmentResult<Self> {
        let provider = source.open()?;
        let metadata = provider.metadata();
        let mut stream = provider.into_stream();
        let first = match stream.next().await {
            Some(frame) => frame?,
            None => return Err(SegmentError::EmptyVideo),
        };
        drop(stream);

        let shape = first.shape();
        debug!(
            "opened video: {}x{} fps={:?} frames={:?}",
            shape.width,
            shape.height,
            metadata.fps,
            metadata.calculate_total_frames()
        );
        Ok(Self {
            source,
            polling_interval,
            metadata,
            shape,
            seed,
        })
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn polling_interval(&self) -> f64 {
        self.polling_interval
    }

    pub fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    /// Frames on the `interval` grid, in time order.
    pub fn sample_frames(&self, interval: f64) -> SegmentResult<StreamBundle<PolledResult>> {
        let provider = self.source.open()?;
        let metadata = provider.metadata();
        let bundle = StreamBundle::new(provider.into_stream(), metadata.calculate_total_frames());
        Ok(PollingSampler::new(interval, metadata.fps.or(self.metadata.fps)).attach(bundle))
    }

    /// Up to `count` frames drawn uniformly from the polling grid, in time order.
    ///
    /// The draw is reproducible when the sampler was opened with a seed.
    pub async fn random_frames(&self, count: usize) -> SegmentResult<Vec<LumaFrame>> {
        Ok(self.draw(&[count]).await?.pop().unwrap_or_default())
    }

    /// One independent uniform draw per entry of `counts`, all taken in a
    /// single decode pass. Each draw comes back in time order.
    pub async fn draw(&self, counts: &[usize]) -> SegmentResult<Vec<Vec<LumaFrame>>> {
        if counts.iter().all(|&count| count == 0) {
            return Ok(vec![Vec::new(); counts.len()]);
        }
        let mut reservoirs: Vec<Reservoir> = counts
            .iter()
            .enumerate()
            .map(|(stream, &count)| Reservoir::new(count, self.rng(stream as u64)))
            .collect();
        let mut stream = self.sample_frames(self.polling_interval)?.stream;
        let mut seen = 0usize;
        while let Some(item) = stream.next().await {
            let polled = item?;
            for reservoir in &mut reservoirs {
                reservoir.offer(seen, &polled);
            }
            seen += 1;
        }
        if seen == 0 {
            return Err(SegmentError::EmptyVideo);
        }
        debug!("drew {counts:?} of {seen} grid frames");
        Ok(reservoirs.into_iter().map(Reservoir::into_frames).collect())
    }

    pub async fn overlay_map(&self, samples: usize) -> SegmentResult<OverlayMap> {
        let frames = self.random_frames(samples).await?;
        OverlayMap::from_frames(&frames).ok_or(SegmentError::EmptyVideo)
    }

    /// Screen, overlay and port samples drawn together in one pass.
    pub async fn calibration_sample(
        &self,
        search: &SearchSettings,
    ) -> SegmentResult<CalibrationSample> {
        let mut draws = self
            .draw(&[
                search.screen_samples,
                search.overlay_samples,
                search.port_samples,
            ])
            .await?
            .into_iter();
        let screen = draws.next().unwrap_or_default();
        let overlay_frames = draws.next().unwrap_or_default();
        let ports = draws.next().unwrap_or_default();
        let overlay = OverlayMap::from_frames(&overlay_frames).ok_or(SegmentError::EmptyVideo)?;
        Ok(CalibrationSample {
            screen,
            overlay,
            ports,
        })
    }

    fn rng(&self, stream: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Frames the screen and port detectors work from.
#[derive(Clone)]
pub struct CalibrationSample {
    pub screen: Vec<LumaFrame>,
    pub overlay: OverlayMap,
    pub ports: Vec<LumaFrame>,
}

struct Reservoir {
    capacity: usize,
    rng: StdRng,
    picks: Vec<(usize, LumaFrame)>,
}

impl Reservoir {
    fn new(capacity: usize, rng: StdRng) -> Self {
        Self {
            capacity,
            rng,
            picks: Vec::with_capacity(capacity),
        }
    }

    fn offer(&mut self, seen: usize, polled: &PolledFrame) {
        if self.picks.len() < self.capacity {
            self.picks.push((polled.index, polled.frame.clone()));
            return;
        }
        if self.capacity == 0 {
            return;
        }
        let slot = self.rng.random_range(0..=seen);
        if slot < self.capacity {
            self.picks[slot] = (polled.index, polled.frame.clone());
        }
    }

    fn into_frames(mut self) -> Vec<LumaFrame> {
        self.picks.sort_by_key(|(index, _)| *index);
        self.picks.into_iter().map(|(_, frame)| frame).collect()
    }
}
