//! Runtime configuration.
//!
//! The data directory is resolved from, in order: the `--data-dir` flag, the
//! `SURAT_HOME` environment variable, `data_dir` in `~/.surat/config.toml`, and finally
//! `~/.surat` itself.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const HOME_ENV: &str = "SURAT_HOME";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub seed_defaults: Option<bool>,
}

impl ConfigFile {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(ConfigFile::default());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    /// `tracing` filter directive from the config file, if any.
    pub log_level: Option<String>,
    /// Seed the default accounts on first run.
    pub seed_defaults: bool,
}

impl Config {
    /// Resolve against the process environment.
    pub fn resolve(flag: Option<PathBuf>) -> Result<Self, ConfigError> {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        let env_dir = std::env::var_os(HOME_ENV).map(PathBuf::from);
        let default_dir = home.join(".surat");
        let file = ConfigFile::load(&default_dir.join(CONFIG_FILE))?;
        Ok(Self::from_parts(flag, env_dir, file, default_dir))
    }

    pub fn from_parts(flag: Option<PathBuf>, env_dir: Option<PathBuf>, file: ConfigFile, default_dir: PathBuf) -> Self {
        let data_dir = flag.or(env_dir).or(file.data_dir).unwrap_or(default_dir);
        Config {
            data_dir,
            log_level: file.log_level,
            seed_defaults: file.seed_defaults.unwrap_or(true),
        }
    }
}
