use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "synthgen.toml";
pub const DEFAULT_RUN_DIR: &str = "runs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Dataset export format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Jsonl,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

/// `synthgen.toml` contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub generation: GenerationSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationSection {
    pub strategy: Option<String>,
    pub seed: Option<u64>,
    pub locale: Option<String>,
    pub batch_size: Option<usize>,
    pub emergency_ceiling: Option<u64>,
    pub recursion_limit: Option<u64>,
    pub quality_threshold: Option<f64>,
    pub adaptive_window: Option<usize>,
    pub contextual: Option<bool>,
    /// Program and arguments that answer completion prompts on stdin.
    pub completion_command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub run_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
}

impl FileConfig {
    /// Load `explicit`, else `synthgen.toml` when present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_path(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `overrides` on top of the file's generation settings.
    pub fn merge_generation(&self, overrides: &GenerationSection) -> GenerationSection {
        let base = &self.generation;
        GenerationSection {
            strategy: overrides.strategy.clone().or_else(|| base.strategy.clone()),
            seed: overrides.seed.or(base.seed),
            locale: overrides.locale.clone().or_else(|| base.locale.clone()),
            batch_size: overrides.batch_size.or(base.batch_size),
            emergency_ceiling: overrides.emergency_ceiling.or(base.emergency_ceiling),
            recursion_limit: overrides.recursion_limit.or(base.recursion_limit),
            quality_threshold: overrides.quality_threshold.or(base.quality_threshold),
            adaptive_window: overrides.adaptive_window.or(base.adaptive_window),
            contextual: overrides.contextual.or(base.contextual),
            completion_command: overrides
                .completion_command
                .clone()
                .or_else(|| base.completion_command.clone()),
        }
    }

    pub fn run_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.output.run_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RUN_DIR))
    }

    pub fn format(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.or(self.output.format).unwrap_or_default()
    }
}
