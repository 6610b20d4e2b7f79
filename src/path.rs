// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where configuration lives when it is not given explicitly.

use crate::config::CONFIG_FILE_NAME;

use std::path::{Path, PathBuf};

/// Determine default absolute path to user configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/strata/config.toml`. Does
/// not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("strata").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Path to configuration file kept inside a workspace.
pub fn workspace_config_path(workspace: impl AsRef<Path>) -> PathBuf {
    workspace.as_ref().join(CONFIG_FILE_NAME)
}

/// Pick configuration file to load.
///
/// An explicit path always wins, even if it does not exist. Otherwise the
/// workspace file is used, then the user file. Returns `None` if neither
/// exists.
pub fn locate_config(explicit: Option<&Path>, workspace: impl AsRef<Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let candidate = workspace_config_path(workspace);
    if candidate.is_file() {
        return Some(candidate);
    }

    default_config_path().ok().filter(|path| path.is_file())
}

/// No way to determine user's configuration directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
