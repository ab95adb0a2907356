// TOML config adapter - persisted preferences and tool locations

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::OutputFormat;
use crate::engine::EncodingSettings;
use crate::error::{CutError, CutResult};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "KEYCUT_CONFIG";

/// Everything the tool remembers between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Format used when none is given on the command line
    pub last_output_format: OutputFormat,
    pub last_output_dir: Option<PathBuf>,
    pub last_input_dir: Option<PathBuf>,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Concurrent tool invocations during a cut
    pub max_parallel: usize,
    pub encoding: EncodingSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            last_output_format: OutputFormat::Original,
            last_output_dir: None,
            last_input_dir: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            max_parallel: num_cpus::get().max(1),
            encoding: EncodingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Apply `KEYCUT_*` overrides read through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> CutResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(format) = lookup("KEYCUT_OUTPUT_FORMAT") {
            self.last_output_format = OutputFormat::parse(&format)?;
        }
        if let Some(dir) = lookup("KEYCUT_OUTPUT_DIR") {
            self.last_output_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup("KEYCUT_FFMPEG") {
            self.ffmpeg_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("KEYCUT_FFPROBE") {
            self.ffprobe_path = PathBuf::from(path);
        }
        if let Some(value) = lookup("KEYCUT_MAX_PARALLEL") {
            self.max_parallel = value.trim().parse().map_err(|e| CutError::Config {
                message: format!("KEYCUT_MAX_PARALLEL={}: {}", value, e),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> CutResult<()> {
        if self.max_parallel == 0 {
            return Err(CutError::Config {
                message: "max_parallel must be at least 1".to_string(),
            });
        }
        if self.encoding.crf > 51 {
            return Err(CutError::Config {
                message: "CRF value cannot exceed 51".to_string(),
            });
        }
        Ok(())
    }

    /// Remember the choices of a successful cut
    pub fn remember(&mut self, format: OutputFormat, input: &Path, output_dir: &Path) {
        self.last_output_format = format;
        self.last_output_dir = Some(output_dir.to_path_buf());
        self.last_input_dir = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
    }
}

/// TOML configuration adapter
#[derive(Debug, Clone)]
pub struct TomlConfigAdapter {
    path: PathBuf,
}

impl TomlConfigAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Adapter for the per-user config file
    pub fn default_location() -> Self {
        let path = ProjectDirs::from("", "", "keycut")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("keycut.toml"));
        Self::new(path)
    }

    /// Explicit path, else `KEYCUT_CONFIG`, else the per-user location
    pub fn resolve(explicit: Option<&Path>) -> Self {
        match explicit {
            Some(path) => Self::new(path),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => Self::new(PathBuf::from(path)),
                None => Self::default_location(),
            },
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config file; a missing file yields the defaults
    pub fn load(&self) -> CutResult<AppConfig> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", self.path.display());
                return Ok(AppConfig::default());
            }
            Err(e) => {
                return Err(CutError::Config {
                    message: format!("Failed to read {}: {}", self.path.display(), e),
                })
            }
        };

        let config: AppConfig = toml::from_str(&content).map_err(|e| CutError::Config {
            message: format!("Failed to parse TOML config {}: {}", self.path.display(), e),
        })?;
        config.validate()?;
        debug!("Loaded config from {}", self.path.display());
        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> CutResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CutError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| CutError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;
        std::fs::write(&self.path, content).map_err(|e| CutError::Config {
            message: format!("Failed to write {}: {}", self.path.display(), e),
        })?;
        info!("Saved config to {}", self.path.display());
        Ok(())
    }
}
