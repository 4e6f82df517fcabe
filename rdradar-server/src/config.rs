//! Frame format resolution.
//!
//! Formats are looked up in order:
//! 1. An explicit `--format-file`
//! 2. `<name>.json` in the user formats directory
//!    (`~/.config/rdradar/formats/` on Linux)
//! 3. The built-in database in [`rdradar_core::formats`]
//!
//! A user file with a built-in name overrides the built-in entry.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::{debug, info};
use rdradar_core::error::ConfigError as FormatError;
use rdradar_core::{formats, FrameFormat, FrameFormatConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read format file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in format file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),
}

pub fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "rdradar", "rdradar")
}

/// Directory holding user format files
pub fn formats_dir() -> Option<PathBuf> {
    get_project_dirs().map(|dirs| dirs.config_dir().join("formats"))
}

/// Load and validate a format file.
pub fn load_format_file(path: &Path) -> Result<FrameFormat, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    let config: FrameFormatConfig =
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        })?;
    debug!("Loaded format '{}' from {}", config.name, path.display());
    Ok(FrameFormat::new(config)?)
}

/// Resolve the active format from a name, an optional explicit file and the
/// user formats directory.
pub fn resolve_format(
    name: &str,
    file: Option<&Path>,
    user_dir: Option<&Path>,
) -> Result<FrameFormat, ConfigError> {
    if let Some(file) = file {
        return load_format_file(file);
    }
    if let Some(dir) = user_dir {
        let path = dir.join(format!("{}.json", name));
        if path.is_file() {
            info!("Using user format {}", path.display());
            return load_format_file(&path);
        }
    }
    Ok(formats::load(name)?)
}

/// Write a format as pretty JSON, e.g. to seed a user format from a built-in.
pub fn save_format_file(path: &Path, config: &FrameFormatConfig) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Json {
        path: path.to_owned(),
        source,
    })?;
    fs::write(path, json).map_err(io_err)
}
