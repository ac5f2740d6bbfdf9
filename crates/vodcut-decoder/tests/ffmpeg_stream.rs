#![cfg(feature = "backend-ffmpeg")]

use std::env;
use std::path::PathBuf;

use tokio_stream::StreamExt;
use vodcut_decoder::{Backend, Configuration, FrameSource};

#[tokio::test(flavor = "multi_thread")]
async fn ffmpeg_backend_decodes_asset() {
    let asset = match env::var("VODCUT_TEST_ASSET") {
        Ok(value) => PathBuf::from(value),
        Err(_) => {
            eprintln!("skipping ffmpeg backend test - VODCUT_TEST_ASSET not set");
            return;
        }
    };

    let config = Configuration {
        backend: Backend::Ffmpeg,
        input: Some(asset),
        ..Configuration::default()
    };
    let provider = match config.open() {
        Ok(provider) => provider,
        Err(err) => panic!("failed to initialize ffmpeg backend: {err:?}"),
    };

    let metadata = provider.metadata();
    let mut stream = provider.into_stream();
    let frame = stream
        .next()
        .await
        .expect("ffmpeg backend should produce at least one frame")
        .expect("frame decoding should succeed");
    assert!(frame.width() > 0);
    assert!(frame.height() > 0);
    assert_eq!(frame.frame_index(), Some(0));
    assert_eq!(frame.data().len(), frame.width() as usize * frame.height() as usize);
    if let Some(width) = metadata.width {
        assert_eq!(width, frame.width());
    }
}
