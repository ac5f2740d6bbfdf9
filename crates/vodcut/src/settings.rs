use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;

use crate::cli::{CliArgs, CliSources};
use crate::layout::{HudLayout, SearchSettings};
use crate::pipeline::SegmenterConfig;

const DEFAULT_TEMPLATE: &str = "assets/pct.png";
const PROJECT_CONFIG_FILE: &str = "vodcut.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    backend: Option<String>,
    polling_interval: Option<f64>,
    max_error: Option<f64>,
    template: Option<String>,
    seed: Option<u64>,
    output: Option<String>,
    pretty: Option<bool>,
    decoder_channel_capacity: Option<usize>,
    layout: Option<HudLayout>,
    search: Option<SearchSettings>,
}

#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub backend: Option<String>,
    pub input: Option<PathBuf>,
    pub match_log: Option<PathBuf>,
    pub polling_interval: f64,
    pub max_error: f64,
    pub template: PathBuf,
    pub seed: Option<u64>,
    pub output: Option<PathBuf>,
    pub pretty: bool,
    pub decoder_channel_capacity: Option<usize>,
    pub layout: HudLayout,
    pub search: SearchSettings,
    pub config_path: Option<PathBuf>,
}

impl EffectiveSettings {
    pub fn segmenter_config(&self) -> SegmenterConfig {
        SegmenterConfig {
            polling_interval: self.polling_interval,
            max_error: self.max_error,
            layout: self.layout.clone(),
            search: self.search.clone(),
            seed: self.seed,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
        }
    }
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<EffectiveSettings, ConfigError> {
    let (file, config_path) = load_config(cli.config.as_deref())?;
    merge(cli, sources, file, config_path)
}

/// `--config`, then `./vodcut.toml`, then the platform config directory.
fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = path.to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        return read_config(path);
    }

    let candidates = [project_config_path(), default_config_path()];
    for path in candidates.into_iter().flatten() {
        if path.exists() {
            return read_config(path);
        }
    }
    Ok((FileConfig::default(), None))
}

fn read_config(path: PathBuf) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok((config, Some(path)))
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<EffectiveSettings, ConfigError> {
    let config_dir = config_path
        .as_ref()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));

    let FileConfig {
        backend: file_backend,
        polling_interval: file_polling_interval,
        max_error: file_max_error,
        template: file_template,
        seed: file_seed,
        output: file_output,
        pretty: file_pretty,
        decoder_channel_capacity: file_decoder_channel_capacity,
        layout: file_layout,
        search: file_search,
    } = file;

    let backend = normalize_string(cli.backend.clone()).or_else(|| normalize_string(file_backend));

    let mut polling_interval = cli.polling_interval;
    if !sources.polling_interval_from_cli {
        if let Some(value) = file_polling_interval {
            polling_interval = value;
        }
    }
    if !polling_interval.is_finite() || polling_interval <= 0.0 {
        return Err(invalid(
            &config_path,
            !sources.polling_interval_from_cli,
            "polling_interval",
            polling_interval,
        ));
    }

    let mut max_error = cli.max_error;
    if !sources.max_error_from_cli {
        if let Some(value) = file_max_error {
            max_error = value;
        }
    }
    if !(0.0..0.5).contains(&max_error) {
        return Err(invalid(
            &config_path,
            !sources.max_error_from_cli,
            "max_error",
            max_error,
        ));
    }

    let template = match cli.template.clone() {
        Some(path) => expand_pathbuf(path),
        None => normalize_string(file_template)
            .and_then(|value| resolve_path_from_config(value, config_dir.as_deref()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE)),
    };

    let output = match cli.output.clone() {
        Some(path) => Some(expand_pathbuf(path)),
        None => normalize_string(file_output)
            .and_then(|value| resolve_path_from_config(value, config_dir.as_deref())),
    };

    let pretty = if sources.compact_from_cli {
        !cli.compact
    } else {
        file_pretty.unwrap_or(!cli.compact)
    };

    let mut decoder_channel_capacity = cli.decoder_channel_capacity;
    if let Some(0) = decoder_channel_capacity {
        return Err(ConfigError::InvalidValue {
            path: None,
            field: "decoder_channel_capacity",
            value: "0".to_string(),
        });
    }
    if decoder_channel_capacity.is_none() {
        if let Some(value) = file_decoder_channel_capacity {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    path: config_path,
                    field: "decoder_channel_capacity",
                    value: value.to_string(),
                });
            }
            decoder_channel_capacity = Some(value);
        }
    }

    let layout = file_layout.unwrap_or_default();
    if let Some((field, value)) = layout.invalid_field() {
        return Err(ConfigError::InvalidValue {
            path: config_path,
            field,
            value,
        });
    }
    let search = file_search.unwrap_or_default();
    if let Some((field, value)) = search.invalid_field() {
        return Err(ConfigError::InvalidValue {
            path: config_path,
            field,
            value,
        });
    }

    Ok(EffectiveSettings {
        backend,
        input: cli.input.clone().map(expand_pathbuf),
        match_log: cli.match_log.clone().map(expand_pathbuf),
        polling_interval,
        max_error,
        template,
        seed: cli.seed.or(file_seed),
        output,
        pretty,
        decoder_channel_capacity,
        layout,
        search,
        config_path,
    })
}

fn invalid(
    config_path: &Option<PathBuf>,
    from_file: bool,
    field: &'static str,
    value: f64,
) -> ConfigError {
    ConfigError::InvalidValue {
        path: if from_file { config_path.clone() } else { None },
        field,
        value: value.to_string(),
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "vodcut", "vodcut").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir()
        .ok()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn expand_pathbuf(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => expand_home_path(s),
        None => path,
    }
}

fn resolve_path_from_config(value: String, base: Option<&Path>) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_home_path(trimmed);
    match base {
        Some(base) if !expanded.is_absolute() => Some(base.join(expanded)),
        _ => Some(expanded),
    }
}

fn expand_home_path(value: &str) -> PathBuf {
    if value == "~" {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().to_path_buf();
        }
    } else if let Some(stripped) = value.strip_prefix("~/") {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().join(stripped);
        }
    }
    PathBuf::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parse_cli_from;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("vodcut.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    fn resolve(args: &[&str]) -> Result<EffectiveSettings, ConfigError> {
        let (cli, sources) = parse_cli_from(args.iter().copied()).unwrap();
        resolve_settings(&cli, &sources)
    }

    #[test]
    fn file_values_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "polling_interval = 0.5\nseed = 3\ntemplate = \"assets/pct.png\"\npretty = false\n\n[search]\nscreen_samples = 12\n\n[layout]\nversion = \"custom\"\n",
        );
        let settings = resolve(&["vodcut", "--config", path.to_str().unwrap(), "in.mp4"]).unwrap();
        assert_eq!(settings.polling_interval, 0.5);
        assert_eq!(settings.seed, Some(3));
        assert!(!settings.pretty);
        assert_eq!(settings.template, dir.path().join("assets/pct.png"));
        assert_eq!(settings.search.screen_samples, 12);
        assert_eq!(settings.search.port_samples, 10);
        assert_eq!(settings.layout.version, "custom");
        assert_eq!(settings.segmenter_config().polling_interval, 0.5);
    }

    #[test]
    fn cli_values_override_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "polling_interval = 0.5\nmax_error = 0.1\n");
        let settings = resolve(&[
            "vodcut",
            "--config",
            path.to_str().unwrap(),
            "--polling-interval",
            "3",
            "in.mp4",
        ])
        .unwrap();
        assert_eq!(settings.polling_interval, 3.0);
        assert_eq!(settings.max_error, 0.1);
    }

    #[test]
    fn invalid_file_value_names_field_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[search]\nport_samples = 0\n");
        let err = resolve(&["vodcut", "--config", path.to_str().unwrap()]).unwrap_err();
        match &err {
            ConfigError::InvalidValue {
                path: Some(file),
                field,
                ..
            } => {
                assert_eq!(file, &path);
                assert_eq!(*field, "search.port_samples");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("vodcut.toml"));
    }

    #[test]
    fn unknown_layout_key_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[layout]\npercent_tpo = 0.8\n");
        let err = resolve(&["vodcut", "--config", path.to_str().unwrap()]).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_override_is_reported() {
        let err = resolve(&["vodcut", "--config", "/nonexistent/vodcut.toml"]).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn non_positive_polling_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");
        let err = resolve(&[
            "vodcut",
            "--config",
            path.to_str().unwrap(),
            "--polling-interval",
            "0",
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "polling_interval",
                path: None,
                ..
            }
        ));
    }
}
