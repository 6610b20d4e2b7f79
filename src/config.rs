// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that Strata uses to simplify
//! the process of serialization and deserialization. File I/O is left to the
//! caller to figure out.

use crate::index::transport::DEFAULT_INDEX_URL;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Name of the configuration file looked up at the workspace root.
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Configuration file layout.
///
/// # General Layout
///
/// The configuration is composed of three sections: where the layer index
/// lives, how the workspace is laid out on disk, and how layer repositories
/// are acquired. Every field has a default, so an empty file is valid.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Layer index settings.
    pub index: IndexSettings,

    /// Workspace layout settings.
    pub workspace: WorkspaceSettings,

    /// Layer acquisition settings.
    pub acquire: AcquireSettings,
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: Config = toml::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on path fields.
        config.workspace.sources_dir = expand(&config.workspace.sources_dir)?;
        config.workspace.bitbake_dir = expand(&config.workspace.bitbake_dir)?;

        Ok(config)
    }
}

impl Display for Config {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Layer index settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Base URL of the layer index API.
    pub url: String,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_INDEX_URL.into(),
            user_agent: concat!("strata/", env!("CARGO_PKG_VERSION")).into(),
            timeout_secs: 30,
        }
    }
}

/// Workspace layout settings.
///
/// Relative paths are taken relative to the workspace root.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Branch the workspace is configured for. Detected when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Directory that layer repositories are cloned into.
    pub sources_dir: PathBuf,

    /// Directory holding the build tool checkout and build directory.
    pub bitbake_dir: PathBuf,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            branch: None,
            sources_dir: PathBuf::from("yocto/sources"),
            bitbake_dir: PathBuf::from("bitbake-builds/poky-master"),
        }
    }
}

/// Layer acquisition settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AcquireSettings {
    /// Ref to retry a failed clone against.
    pub fallback_branch: String,

    /// Clone only the tip commit.
    pub shallow: bool,
}

impl Default for AcquireSettings {
    fn default() -> Self {
        Self {
            fallback_branch: "master".into(),
            shallow: true,
        }
    }
}

fn expand(path: &std::path::Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
