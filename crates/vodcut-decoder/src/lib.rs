//! Frame decoding for vodcut.
//!
//! Backends turn a video into an asynchronous stream of [`LumaFrame`]s. A
//! [`FrameSource`] can be opened repeatedly, each call starting a fresh decode
//! pass from the first frame.

pub mod backends;
pub mod config;
pub mod core;

pub use backends::memory::{MemoryProvider, MemorySource};
pub use config::{Backend, Configuration};
pub use core::{
    DynFrameProvider, FrameError, FrameResult, FrameSource, FrameStream, FrameStreamProvider,
    LumaFrame, VideoMetadata, spawn_stream_from_channel,
};
