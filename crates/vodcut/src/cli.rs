use std::ffi::OsString;
use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};

use crate::pipeline::{DEFAULT_MAX_ERROR, DEFAULT_POLLING_INTERVAL};

/// Which defaulted options were given explicitly on the command line.
#[derive(Debug, Default)]
pub struct CliSources {
    pub polling_interval_from_cli: bool,
    pub max_error_from_cli: bool,
    pub compact_from_cli: bool,
}

impl CliSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            polling_interval_from_cli: value_from_cli(matches, "polling_interval"),
            max_error_from_cli: value_from_cli(matches, "max_error"),
            compact_from_cli: value_from_cli(matches, "compact"),
        }
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches
        .value_source(id)
        .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    match parse_cli_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    }
}

pub fn print_help() {
    let _ = CliArgs::command().print_help();
}

pub fn parse_cli_from<I, T>(args: I) -> Result<(CliArgs, CliSources), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = CliArgs::command().try_get_matches_from(args)?;
    let args = CliArgs::from_arg_matches(&matches)?;
    let sources = CliSources::from_matches(&matches);
    Ok((args, sources))
}

#[derive(Debug, Parser)]
#[command(
    name = "vodcut",
    about = "Find the match chunks of a recorded gameplay video",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Lock decoding to a specific backend implementation
    #[arg(short = 'b', long = "backend")]
    pub backend: Option<String>,

    /// Override the configuration file path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Write the segmentation report as JSON to this file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the list of available decoding backends
    #[arg(long = "list-backends")]
    pub list_backends: bool,

    /// Seconds between scored frames
    #[arg(
        long = "polling-interval",
        id = "polling_interval",
        value_name = "SECS",
        default_value_t = DEFAULT_POLLING_INTERVAL
    )]
    pub polling_interval: f64,

    /// Slack around expected HUD positions, as a fraction of the screen size
    #[arg(long = "max-error", id = "max_error", default_value_t = DEFAULT_MAX_ERROR)]
    pub max_error: f64,

    /// Percent-sign template image
    #[arg(long = "template", value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Seed for the random calibration samples
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Write the report without indentation
    #[arg(long = "compact", id = "compact")]
    pub compact: bool,

    /// Decoder frame queue capacity before applying backpressure
    #[arg(
        long = "decoder-channel-capacity",
        id = "decoder_channel_capacity",
        value_parser = clap::value_parser!(usize)
    )]
    pub decoder_channel_capacity: Option<usize>,

    /// Input video path
    #[arg(value_name = "VIDEO")]
    pub input: Option<PathBuf>,

    /// Match log recorded alongside the video; stored in the report as-is
    #[arg(value_name = "MATCH_LOG")]
    pub match_log: Option<PathBuf>,
}
