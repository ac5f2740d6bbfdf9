use std::pin::Pin;

use futures_util::Stream;

pub mod confidence;
pub mod ports;
pub mod sampler;
pub mod screen;
pub mod segmenter;

/// A stage's output stream together with the number of frames upstream expects.
pub struct StreamBundle<T> {
    pub stream: Pin<Box<dyn Stream<Item = T> + Send>>,
    pub total_frames: Option<u64>,
}

impl<T> StreamBundle<T> {
    pub fn new(stream: Pin<Box<dyn Stream<Item = T> + Send>>, total_frames: Option<u64>) -> Self {
        Self {
            stream,
            total_frames,
        }
    }
}
