use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::OnceCell;
use tokio_stream::StreamExt;
use vodcut_decoder::FrameSource;
use vodcut_locator::Template;

use crate::error::SegmentResult;
use crate::layout::{HudLayout, SearchSettings};
use crate::model::{
    ConfidenceSample, ConfidenceSeries, PortLayout, ScreenCalibration, SegmentationReport,
};
use crate::sampler::{CalibrationSample, VideoSampler};
use crate::stage::confidence::ConfidenceScorer;
use crate::stage::ports::PortDetector;
use crate::stage::screen::ScreenDetector;
use crate::stage::segmenter::{Segmentation, segment};

pub const DEFAULT_POLLING_INTERVAL: f64 = 2.0;
pub const DEFAULT_MAX_ERROR: f64 = 0.06;

#[derive(Debug, Clone, PartialEq)]
pub struct SegmenterConfig {
    /// Seconds between scored frames.
    pub polling_interval: f64,
    /// Slack around expected HUD positions, as a fraction of the screen.
    pub max_error: f64,
    pub layout: HudLayout,
    pub search: SearchSettings,
    pub seed: Option<u64>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            polling_interval: DEFAULT_POLLING_INTERVAL,
            max_error: DEFAULT_MAX_ERROR,
            layout: HudLayout::default(),
            search: SearchSettings::default(),
            seed: None,
        }
    }
}

/// Progress of the scoring pass, reported after every scored frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringProgress {
    pub scored: u64,
    pub total: Option<u64>,
}

pub type ProgressCallback = Arc<dyn Fn(ScoringProgress) + Send + Sync>;

/// Confidence series of a scoring pass and how it was split.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDetection {
    pub series: ConfidenceSeries,
    pub segmentation: Segmentation,
}

/// Calibrates the HUD of one video and splits it into match chunks.
///
/// Screen and port detection share one calibration sample, drawn on first
/// use, so a full [`Segmenter::parse`] decodes the video twice: once to
/// calibrate and once to score.
pub struct Segmenter {
    config: SegmenterConfig,
    template: Template,
    sampler: VideoSampler,
    calibration_sample: OnceCell<CalibrationSample>,
    input: Option<PathBuf>,
    match_log: Option<PathBuf>,
    progress: Option<ProgressCallback>,
}

impl Segmenter {
    pub async fn open(
        source: Arc<dyn FrameSource>,
        template: Template,
        config: SegmenterConfig,
    ) -> SegmentResult<Self> {
        let sampler = VideoSampler::open(source, config.polling_interval, config.seed).await?;
        Ok(Self {
            config,
            template,
            sampler,
            calibration_sample: OnceCell::new(),
            input: None,
            match_log: None,
            progress: None,
        })
    }

    /// Paths recorded in the report; neither is read by the segmenter.
    pub fn with_source_paths(mut self, input: Option<PathBuf>, match_log: Option<PathBuf>) -> Self {
        self.input = input;
        self.match_log = match_log;
        self
    }

    pub fn set_progress_callback(&mut self, callback: Option<ProgressCallback>) {
        self.progress = callback;
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn sampler(&self) -> &VideoSampler {
        &self.sampler
    }

    async fn calibration_sample(&self) -> SegmentResult<&CalibrationSample> {
        self.calibration_sample
            .get_or_try_init(|| self.sampler.calibration_sample(&self.config.search))
            .await
    }

    pub async fn detect_screen(&self) -> SegmentResult<ScreenCalibration> {
        let sample = self.calibration_sample().await?;
        ScreenDetector::new(self.config.layout.clone(), self.config.search.clone())
            .detect_in_frames(&self.template, &sample.screen, &sample.overlay)
    }

    pub async fn detect_ports(&self, calibration: &ScreenCalibration) -> SegmentResult<PortLayout> {
        let sample = self.calibration_sample().await?;
        PortDetector::new(
            self.config.layout.clone(),
            self.config.search.clone(),
            self.config.max_error,
        )
        .detect_in_frames(&self.template, &sample.ports, calibration)
    }

    /// Scores every frame on the polling grid, in time order.
    pub async fn score_series(
        &self,
        calibration: &ScreenCalibration,
        ports: &PortLayout,
    ) -> SegmentResult<ConfidenceSeries> {
        let scorer = ConfidenceScorer::new(&self.template, calibration, ports, &self.config.search)?;
        let bundle = self.sampler.sample_frames(self.config.polling_interval)?;
        let total = bundle.total_frames;
        let mut stream = bundle.stream;
        let mut series = ConfidenceSeries::new();
        while let Some(item) = stream.next().await {
            let polled = item?;
            let confidence = scorer.score(&polled.frame)?;
            debug!("t={:.2}s confidence {confidence:.4}", polled.time);
            series.push(ConfidenceSample {
                time: polled.time,
                confidence,
            });
            if let Some(callback) = &self.progress {
                callback(ScoringProgress {
                    scored: series.len() as u64,
                    total,
                });
            }
        }
        Ok(series)
    }

    pub async fn detect_match_chunks(
        &self,
        calibration: &ScreenCalibration,
        ports: &PortLayout,
    ) -> SegmentResult<ChunkDetection> {
        let series = self.score_series(calibration, ports).await?;
        let values: Vec<f64> = series.iter().map(|sample| sample.confidence).collect();
        let segmentation = segment(&values, self.config.polling_interval)?;
        info!(
            "split confidences at {:.3}: {} match chunk(s) in {} samples",
            segmentation.split,
            segmentation.chunks.len(),
            series.len()
        );
        for chunk in &segmentation.chunks {
            info!("match {:.1}s -> {:.1}s", chunk.start, chunk.end);
        }
        Ok(ChunkDetection {
            series,
            segmentation,
        })
    }

    /// Screen, then ports, then chunks.
    pub async fn parse(&self) -> SegmentResult<SegmentationReport> {
        let calibration = self.detect_screen().await?;
        let ports = self.detect_ports(&calibration).await?;
        info!(
            "{} of {} ports detected",
            ports.detected_count(),
            ports.slots().len()
        );
        let ChunkDetection {
            series,
            segmentation,
        } = self.detect_match_chunks(&calibration, &ports).await?;
        Ok(SegmentationReport {
            input: self.input.clone(),
            match_log: self.match_log.clone(),
            layout_version: self.config.layout.version.clone(),
            polling_interval: self.config.polling_interval,
            calibration,
            ports,
            threshold: segmentation.threshold(),
            chunks: segmentation.chunks,
            series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    use crate::error::SegmentError;
    use crate::model::PortRoi;
    use crate::testing::{SyntheticVideo, percent_template};

    async fn segmenter(video: &SyntheticVideo) -> Segmenter {
        Segmenter::open(video.source(), percent_template(), video.config())
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn match_chunk_spans_the_gameplay_frames() {
        let video = SyntheticVideo::default();
        let detection = segmenter(&video)
            .await
            .detect_match_chunks(&video.calibration(), &video.expected_ports())
            .await
            .unwrap();
        assert_eq!(detection.series.len(), video.total_frames());
        let chunks = &detection.segmentation.chunks;
        assert_eq!(chunks.len(), 1, "{chunks:?}");
        let (start, end) = video.match_span();
        assert!((chunks[0].start - start).abs() <= 1.0, "{chunks:?}");
        assert!((chunks[0].end - end).abs() <= 1.0, "{chunks:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn progress_is_reported_per_scored_frame() {
        let video = SyntheticVideo::default();
        let mut segmenter = segmenter(&video).await;
        let seen = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&seen);
        segmenter.set_progress_callback(Some(Arc::new(move |progress: ScoringProgress| {
            counter.store(progress.scored, Ordering::SeqCst);
        })));
        segmenter
            .score_series(&video.calibration(), &video.expected_ports())
            .await
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), video.total_frames() as u64);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn all_ports_absent_aborts_scoring() {
        let video = SyntheticVideo::default();
        let err = segmenter(&video)
            .await
            .detect_match_chunks(&video.calibration(), &PortLayout::absent())
            .await
            .unwrap_err();
        assert!(matches!(err, SegmentError::Scoring { .. }));
    }

    struct CountingSource {
        inner: Arc<dyn FrameSource>,
        opens: AtomicU64,
    }

    impl FrameSource for CountingSource {
        fn open(&self) -> vodcut_decoder::FrameResult<vodcut_decoder::DynFrameProvider> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.inner.open()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn parse_decodes_once_to_calibrate_and_once_to_score() {
        let video = SyntheticVideo::default();
        let source = Arc::new(CountingSource {
            inner: video.source(),
            opens: AtomicU64::new(0),
        });
        let segmenter = Segmenter::open(source.clone(), percent_template(), video.config())
            .await
            .unwrap();
        let probes = source.opens.load(Ordering::SeqCst);
        segmenter.parse().await.unwrap();
        assert_eq!(source.opens.load(Ordering::SeqCst) - probes, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn parse_threads_calibration_into_the_report() {
        let video = SyntheticVideo::default();
        let report = segmenter(&video).await.parse().await.unwrap();
        assert_eq!(report.layout_version, "melee-4p-v1");
        assert!(matches!(report.ports.slots()[0], PortRoi::Absent));
        assert!(report.ports.slots()[1].is_detected());
        assert_eq!(report.chunks.len(), 1);
    }
}
