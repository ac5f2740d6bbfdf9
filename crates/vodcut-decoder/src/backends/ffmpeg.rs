#![cfg(feature = "backend-ffmpeg")]

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg::util::error::{EAGAIN, EWOULDBLOCK};
use ffmpeg_next as ffmpeg;
use tokio::sync::mpsc;

use crate::core::{
    DynFrameProvider, FrameError, FrameResult, FrameStream, FrameStreamProvider, LumaFrame,
    VideoMetadata, spawn_stream_from_channel,
};

const BACKEND_NAME: &str = "ffmpeg";
const DEFAULT_CHANNEL_CAPACITY: usize = 8;

pub struct FfmpegProvider {
    input: PathBuf,
    metadata: VideoMetadata,
    channel_capacity: usize,
}

fn failure(err: impl ToString) -> FrameError {
    FrameError::backend_failure(BACKEND_NAME, err.to_string())
}

impl FfmpegProvider {
    pub fn open<P: AsRef<Path>>(path: P, channel_capacity: Option<usize>) -> FrameResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FrameError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input file {} does not exist", path.display()),
            )));
        }
        ffmpeg::init().map_err(failure)?;
        let input = path.to_path_buf();
        let metadata = probe_metadata(&input)?;
        Ok(Self {
            input,
            metadata,
            channel_capacity: channel_capacity
                .unwrap_or(DEFAULT_CHANNEL_CAPACITY)
                .max(1),
        })
    }

    fn decode_loop(&self, tx: mpsc::Sender<FrameResult<LumaFrame>>) -> FrameResult<()> {
        let mut ictx = ffmpeg::format::input(&self.input).map_err(failure)?;
        let input_stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| failure("no video stream found"))?;
        let stream_index = input_stream.index();
        let time_base = input_stream.time_base();

        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .map_err(failure)?;
        let mut decoder = context.decoder().video().map_err(failure)?;

        let mut scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::pixel::Pixel::GRAY8,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::FAST_BILINEAR,
        )
        .map_err(failure)?;

        let mut decoded = ffmpeg::util::frame::Video::empty();
        let mut converted = ffmpeg::util::frame::Video::empty();
        let mut next_index: u64 = 0;

        let mut drain = |decoder: &mut ffmpeg::decoder::Video| -> FrameResult<bool> {
            loop {
                match decoder.receive_frame(&mut decoded) {
                    Ok(_) => {
                        scaler.run(&decoded, &mut converted).map_err(failure)?;
                        converted.set_pts(decoded.timestamp().or(decoded.pts()));
                        let frame = frame_from_converted(&converted, time_base)?
                            .with_frame_index(Some(next_index));
                        next_index += 1;
                        if tx.blocking_send(Ok(frame)).is_err() {
                            return Ok(false);
                        }
                    }
                    Err(err) => {
                        if is_retryable_error(&err) || matches!(err, ffmpeg::Error::Eof) {
                            return Ok(true);
                        }
                        return Err(failure(err));
                    }
                }
            }
        };

        for (stream, packet) in ictx.packets() {
            if stream.index() != stream_index {
                continue;
            }
            if let Err(err) = decoder.send_packet(&packet)
                && !is_retryable_error(&err)
            {
                return Err(failure(err));
            }
            if !drain(&mut decoder)? {
                return Ok(());
            }
        }

        decoder.send_eof().map_err(failure)?;
        drain(&mut decoder)?;
        Ok(())
    }
}

impl FrameStreamProvider for FfmpegProvider {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn into_stream(self: Box<Self>) -> FrameStream {
        let provider = *self;
        let capacity = provider.channel_capacity;
        spawn_stream_from_channel(capacity, move |tx| {
            if let Err(err) = provider.decode_loop(tx.clone()) {
                let _ = tx.blocking_send(Err(err));
            }
        })
    }
}

fn probe_metadata(path: &PathBuf) -> FrameResult<VideoMetadata> {
    let ictx = ffmpeg::format::input(path).map_err(failure)?;
    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| failure("no video stream found"))?;
    let rate = stream.avg_frame_rate();
    let fps = (rate.denominator() != 0)
        .then(|| f64::from(rate))
        .filter(|fps| fps.is_finite() && *fps > 0.0);
    let duration = (ictx.duration() > 0).then(|| {
        Duration::from_secs_f64(ictx.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE))
    });
    let total_frames = (stream.frames() > 0).then(|| stream.frames() as u64);
    let parameters = stream.parameters();
    let context = ffmpeg::codec::context::Context::from_parameters(parameters).map_err(failure)?;
    let decoder = context.decoder().video().map_err(failure)?;
    Ok(VideoMetadata {
        duration,
        fps,
        width: Some(decoder.width()),
        height: Some(decoder.height()),
        total_frames,
    })
}

fn frame_from_converted(
    frame: &ffmpeg::util::frame::Video,
    time_base: ffmpeg::Rational,
) -> FrameResult<LumaFrame> {
    let plane = frame.data(0);
    let stride = frame.stride(0);
    let width = frame.width();
    let height = frame.height();
    let mut buffer = Vec::with_capacity(width as usize * height as usize);
    for row in 0..height as usize {
        let offset = row * stride;
        buffer.extend_from_slice(&plane[offset..offset + width as usize]);
    }
    let timestamp = frame.pts().and_then(|pts| {
        let seconds = pts as f64 * f64::from(time_base);
        (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
    });
    LumaFrame::from_owned(width, height, width as usize, timestamp, buffer)
}

fn is_retryable_error(error: &ffmpeg::Error) -> bool {
    matches!(
        error,
        ffmpeg::Error::Other { errno }
            if *errno == EAGAIN || *errno == EWOULDBLOCK
    )
}

pub fn boxed_ffmpeg<P: AsRef<Path>>(
    path: P,
    channel_capacity: Option<usize>,
) -> FrameResult<DynFrameProvider> {
    Ok(Box::new(FfmpegProvider::open(path, channel_capacity)?))
}
