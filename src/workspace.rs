// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Workspace layout.
//!
//! A __workspace__ is the directory tree that holds cloned layer repositories
//! and the build tool checkout, along with its build directory.
//!
//! # Workspace Layout
//!
//! ```text
//! <root>/
//! ├── <sources_dir>/                      cloned layer repositories
//! └── <bitbake_dir>/
//!     ├── build/                          build directory
//!     └── layers/openembedded-core/
//!         ├── oe-init-build-env           environment setup script
//!         └── meta/                       core layer
//! ```

use crate::config::WorkspaceSettings;

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Branch assumed when the workspace gives no hint of its own.
pub const DEFAULT_BRANCH: &str = "master";

/// Resolved workspace layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    sources_dir: PathBuf,
    bitbake_dir: PathBuf,
    branch: Option<String>,
}

impl Workspace {
    /// Construct new workspace layout rooted at target path.
    pub fn new(root: impl Into<PathBuf>, settings: &WorkspaceSettings) -> Self {
        let root = root.into();
        Self {
            sources_dir: root.join(&settings.sources_dir),
            bitbake_dir: root.join(&settings.bitbake_dir),
            branch: settings.branch.clone(),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sources_dir(&self) -> &Path {
        &self.sources_dir
    }

    pub fn bitbake_dir(&self) -> &Path {
        &self.bitbake_dir
    }

    pub fn build_dir(&self) -> PathBuf {
        self.bitbake_dir.join("build")
    }

    pub fn init_script(&self) -> PathBuf {
        self.bitbake_dir
            .join("layers")
            .join("openembedded-core")
            .join("oe-init-build-env")
    }

    /// Well-known installation path of the core layer.
    pub fn core_layer_dir(&self) -> PathBuf {
        self.bitbake_dir
            .join("layers")
            .join("openembedded-core")
            .join("meta")
    }

    /// Branch the workspace is configured for.
    ///
    /// Uses the configured branch if given. Otherwise the first series name
    /// the core layer declares in `LAYERSERIES_CORENAMES` is used. Falls
    /// back to [`DEFAULT_BRANCH`] when neither is available.
    pub fn branch(&self) -> String {
        if let Some(branch) = &self.branch {
            return branch.clone();
        }

        let layer_conf = self.core_layer_dir().join("conf").join("layer.conf");
        match read_to_string(&layer_conf) {
            Ok(content) => series_from_layer_conf(&content).unwrap_or_else(|| {
                debug!("no series names in {:?}", layer_conf.display());
                DEFAULT_BRANCH.into()
            }),
            Err(_) => {
                debug!("cannot read {:?}", layer_conf.display());
                DEFAULT_BRANCH.into()
            }
        }
    }
}

/// Extract the first series name declared in a core `layer.conf`.
pub fn series_from_layer_conf(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("LAYERSERIES_CORENAMES"))
        .filter_map(|line| line.split_once('=').map(|(_, value)| value))
        .filter_map(|value| {
            value
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .split_whitespace()
                .next()
                .map(ToString::to_string)
        })
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs::{create_dir_all, write};

    #[test]
    fn workspace_paths_are_rooted() {
        let workspace = Workspace::new("/work", &WorkspaceSettings::default());

        assert_eq!(workspace.sources_dir(), Path::new("/work/yocto/sources"));
        assert_eq!(
            workspace.build_dir(),
            PathBuf::from("/work/bitbake-builds/poky-master/build")
        );
        assert_eq!(
            workspace.init_script(),
            PathBuf::from("/work/bitbake-builds/poky-master/layers/openembedded-core/oe-init-build-env")
        );
        assert_eq!(
            workspace.core_layer_dir(),
            PathBuf::from("/work/bitbake-builds/poky-master/layers/openembedded-core/meta")
        );
    }

    #[test]
    fn absolute_settings_are_kept() {
        let settings = WorkspaceSettings {
            branch: None,
            sources_dir: PathBuf::from("/srv/sources"),
            bitbake_dir: PathBuf::from("poky"),
        };
        let workspace = Workspace::new("/work", &settings);

        assert_eq!(workspace.sources_dir(), Path::new("/srv/sources"));
        assert_eq!(workspace.bitbake_dir(), Path::new("/work/poky"));
    }

    #[test]
    fn series_parsing() {
        let content = indoc! {r#"
            BBPATH .= ":${LAYERDIR}"
            LAYERSERIES_CORENAMES = "whinlatter walnascar"
            LAYERSERIES_COMPAT_core = "whinlatter"
        "#};
        assert_eq!(series_from_layer_conf(content).as_deref(), Some("whinlatter"));
        assert_eq!(series_from_layer_conf("BBPATH .= \"\""), None);
    }

    #[test]
    fn configured_branch_wins() {
        let settings = WorkspaceSettings {
            branch: Some("scarthgap".into()),
            ..WorkspaceSettings::default()
        };
        assert_eq!(Workspace::new("/nonexistent", &settings).branch(), "scarthgap");
    }

    #[sealed_test]
    fn branch_detected_from_core_layer() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let workspace = Workspace::new(&root, &WorkspaceSettings::default());
        assert_eq!(workspace.branch(), DEFAULT_BRANCH);

        let conf_dir = workspace.core_layer_dir().join("conf");
        create_dir_all(&conf_dir)?;
        write(
            conf_dir.join("layer.conf"),
            "LAYERSERIES_CORENAMES = \"whinlatter\"\n",
        )?;
        assert_eq!(workspace.branch(), "whinlatter");

        Ok(())
    }
}
