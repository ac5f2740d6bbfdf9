use std::fmt;
use std::num::NonZeroUsize;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use vodcut::cli::{parse_cli, print_help};
use vodcut::output::{OutputError, write_report};
use vodcut::settings::{ConfigError, EffectiveSettings, resolve_settings};
use vodcut::{ScoringProgress, SegmentError, SegmentationReport, Segmenter};
use vodcut_decoder::{Backend, Configuration, FrameError};
use vodcut_locator::{LocatorError, Template};

#[derive(Debug)]
enum AppError {
    Config(ConfigError),
    Frame(FrameError),
    Template(LocatorError),
    Segment(SegmentError),
    Output(OutputError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "{err}"),
            AppError::Frame(err) => write!(f, "{err}"),
            AppError::Template(err) => write!(f, "failed to load template: {err}"),
            AppError::Segment(err) => write!(f, "{err}"),
            AppError::Output(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<FrameError> for AppError {
    fn from(value: FrameError) -> Self {
        AppError::Frame(value)
    }
}

impl From<SegmentError> for AppError {
    fn from(value: SegmentError) -> Self {
        AppError::Segment(value)
    }
}

impl From<OutputError> for AppError {
    fn from(value: OutputError) -> Self {
        AppError::Output(value)
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let (cli, sources) = parse_cli();
    if cli.list_backends {
        print_available_backends();
        return Ok(());
    }

    let settings = resolve_settings(&cli, &sources)?;
    let Some(input) = settings.input.clone() else {
        usage();
        return Ok(());
    };

    let template = Template::open(&settings.template).map_err(AppError::Template)?;
    info!(
        "loaded template {} ({}x{})",
        settings.template.display(),
        template.width(),
        template.height()
    );

    let env_backend_present = std::env::var("VODCUT_BACKEND").is_ok();
    let mut config = Configuration::from_env().unwrap_or_default();
    let backend_override = settings
        .backend
        .as_deref()
        .map(Backend::from_str)
        .transpose()?;
    if let Some(backend) = backend_override {
        config.backend = backend;
    }
    config.input = Some(input.clone());
    if let Some(capacity) = settings.decoder_channel_capacity.and_then(NonZeroUsize::new) {
        config.channel_capacity = Some(capacity);
    }
    let backend_locked = backend_override.is_some() || env_backend_present;

    let available = Configuration::available_backends();
    if !backend_locked && !available.contains(&config.backend) {
        return Err(FrameError::unsupported(config.backend.as_str()).into());
    }

    let mut attempt_config = config;
    let mut tried = Vec::new();
    let segmenter = loop {
        if !tried.contains(&attempt_config.backend) {
            tried.push(attempt_config.backend);
        }
        let opened = Segmenter::open(
            Arc::new(attempt_config.clone()),
            template.clone(),
            settings.segmenter_config(),
        )
        .await;
        match opened {
            Ok(segmenter) => break segmenter,
            Err(SegmentError::Frame(err)) if !backend_locked => {
                let Some(next) = next_backend(&available, &tried) else {
                    return Err(err.into());
                };
                warn!(
                    "backend {failed} failed to open the video ({err}); trying {next}",
                    failed = attempt_config.backend.as_str(),
                    next = next.as_str()
                );
                attempt_config.backend = next;
            }
            Err(err) => return Err(err.into()),
        }
    };
    info!("decoding with the {} backend", attempt_config.backend);

    let report = segment_with_progress(segmenter, &settings).await?;
    for chunk in &report.chunks {
        println!("match {:>10.2}s -> {:>10.2}s", chunk.start, chunk.end);
    }
    if let Some(path) = settings.output.as_ref() {
        write_report(path, &report, settings.pretty).await?;
        info!("report written to {}", path.display());
    }
    Ok(())
}

async fn segment_with_progress(
    segmenter: Segmenter,
    settings: &EffectiveSettings,
) -> Result<SegmentationReport, AppError> {
    let mut segmenter =
        segmenter.with_source_paths(settings.input.clone(), settings.match_log.clone());

    let progress = ProgressBar::new_spinner();
    progress.set_style(spinner_style());
    progress.set_message("calibrating");
    progress.enable_steady_tick(Duration::from_millis(100));

    let bar = progress.clone();
    segmenter.set_progress_callback(Some(Arc::new(move |update: ScoringProgress| {
        if update.scored == 1 {
            if let Some(total) = update.total {
                bar.set_length(total);
                bar.set_style(bar_style());
            }
            bar.set_message("scoring");
        }
        if bar.length().is_some_and(|len| update.scored > len) {
            bar.set_length(update.scored);
        }
        bar.set_position(update.scored);
    })));

    match segmenter.parse().await {
        Ok(report) => {
            progress.finish_with_message(format!(
                "{} match chunk(s) in {} samples",
                report.chunks.len(),
                report.series.len()
            ));
            Ok(report)
        }
        Err(err) => {
            progress.abandon_with_message("failed");
            Err(err.into())
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{bar:40.cyan/blue} {percent:>3}% {pos}/{len} samples [{elapsed_precise}<{eta_precise}] {msg}",
    )
    .unwrap()
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan.bold} [{elapsed_precise}] samples {pos} • {msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

fn next_backend(available: &[Backend], tried: &[Backend]) -> Option<Backend> {
    available
        .iter()
        .copied()
        .find(|backend| !tried.contains(backend))
}

fn usage() {
    print_help();
    println!();
    print_available_backends();
}

fn print_available_backends() {
    let names: Vec<&'static str> = Configuration::available_backends()
        .iter()
        .map(Backend::as_str)
        .collect();
    if names.is_empty() {
        println!("available backends: (none compiled; rebuild with --features backend-ffmpeg)");
    } else {
        println!("available backends: {}", names.join(", "));
    }
    println!("the mock backend only runs when selected with --backend mock");
}
