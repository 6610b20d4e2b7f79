// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layer acquisition backend.
//!
//! The side-effecting half of layer resolution. A backend clones layer
//! repositories into the workspace, registers layer directories with the
//! build tool, and reports which layers the build configuration currently
//! knows about.
//!
//! [`BitbakeBackend`] clones through libgit2 and talks to `bitbake-layers`
//! inside a build environment initialized by sourcing the workspace's
//! `oe-init-build-env` script. Every call is blocking.

use crate::workspace::Workspace;

use auth_git2::{GitAuthenticator, Prompter};
use git2::{build::RepoBuilder, Config, FetchOptions, RemoteCallbacks};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{
    fs::remove_dir_all,
    path::{Path, PathBuf},
    process::Command,
    time,
};
use tracing::{debug, info, instrument, warn};

/// Layer registered with the build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLayer {
    pub name: String,
    pub path: PathBuf,
}

/// Side effects needed to acquire a layer.
pub trait Acquisition {
    /// Query layers currently registered with the build configuration.
    ///
    /// Always queried live, never cached.
    fn active_layers(&self) -> Result<Vec<ActiveLayer>>;

    /// Well-known installation path of the core layer.
    fn core_layer_dir(&self) -> PathBuf;

    /// Local path a repository at `vcs_url` is cloned to.
    fn repository_path(&self, vcs_url: &str) -> PathBuf;

    /// Clone repository at `url` checked out at `git_ref` into `dest`.
    fn clone_repository(&self, url: &str, git_ref: &str, dest: &Path) -> Result<()>;

    /// Register layer directory with the build configuration.
    ///
    /// Returns captured output of the registration command.
    fn register_layer(&self, layer_dir: &Path) -> Result<String>;
}

/// Acquisition through libgit2 and `bitbake-layers`.
#[derive(Debug, Clone)]
pub struct BitbakeBackend {
    workspace: Workspace,
    shallow: bool,
    show_progress: bool,
}

impl BitbakeBackend {
    /// Construct new backend for target workspace.
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            shallow: true,
            show_progress: true,
        }
    }

    /// Clone only the tip commit of requested ref.
    pub fn with_shallow(mut self, shallow: bool) -> Self {
        self.shallow = shallow;
        self
    }

    /// Draw progress bar during clones.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn clone_with_progress(
        &self,
        url: &str,
        git_ref: &str,
        dest: &Path,
        bar: ProgressBar,
    ) -> std::result::Result<(), git2::Error> {
        let prompter = IndicatifPrompter::new(bar);
        let authenticator = GitAuthenticator::default().set_prompter(prompter.clone());
        let config = Config::open_default()?;

        let mut throttle = time::Instant::now();
        let mut rc = RemoteCallbacks::new();
        rc.credentials(authenticator.credentials(&config));
        rc.transfer_progress(|progress| {
            let stats = progress.to_owned();
            if throttle.elapsed() > time::Duration::from_millis(10) {
                throttle = time::Instant::now();
                prompter.bar.set_length(stats.total_objects() as u64);
                prompter.bar.set_position(stats.received_objects() as u64);
            }
            true
        });

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(rc);
        if self.shallow {
            fo.depth(1);
        }

        RepoBuilder::new()
            .branch(git_ref)
            .fetch_options(fo)
            .clone(url, dest)?;

        Ok(())
    }

    fn bitbake_layers(&self, args: &str) -> Result<String> {
        let script = format!(
            "source {} {} > /dev/null && bitbake-layers {args}",
            quote_path(&self.workspace.init_script()),
            quote_path(&self.workspace.build_dir()),
        );

        syscall_non_interactive(self.workspace.root(), script)
    }
}

impl Acquisition for BitbakeBackend {
    #[instrument(skip(self), level = "debug")]
    fn active_layers(&self) -> Result<Vec<ActiveLayer>> {
        let output = self.bitbake_layers("show-layers")?;
        Ok(parse_show_layers(&output))
    }

    fn core_layer_dir(&self) -> PathBuf {
        self.workspace.core_layer_dir()
    }

    fn repository_path(&self, vcs_url: &str) -> PathBuf {
        self.workspace.sources_dir().join(repository_name(vcs_url))
    }

    /// Clone repository into workspace.
    ///
    /// The progress of the clone is displayed through a progress bar. If
    /// credentials are required, then the user will be prompted for them and
    /// the progress bar is suspended for the prompt. A partially written
    /// destination is removed when the clone fails.
    ///
    /// # Errors
    ///
    /// - Return [`BackendError::CreateDir`] if parent directory of the
    ///   destination cannot be created.
    /// - Return [`BackendError::Clone`] if libgit2 fails to clone.
    #[instrument(skip(self), level = "debug")]
    fn clone_repository(&self, url: &str, git_ref: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            mkdirp::mkdirp(parent).map_err(|source| BackendError::CreateDir {
                source,
                path: parent.to_path_buf(),
            })?;
        }

        let bar = if self.show_progress {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
        )?
        .progress_chars("-Cco.");
        bar.set_style(style);
        bar.set_message(format!("{url} ({git_ref})"));
        bar.enable_steady_tick(time::Duration::from_millis(100));

        info!("clone {url} at {git_ref:?} into {:?}", dest.display());
        let result = self.clone_with_progress(url, git_ref, dest, bar.clone());
        bar.finish_and_clear();

        if let Err(source) = result {
            // INVARIANT: Leave no half-cloned repository behind for a retry.
            if dest.exists() {
                if let Err(error) = remove_dir_all(dest) {
                    warn!("cannot remove partial clone {:?}: {error}", dest.display());
                }
            }

            return Err(BackendError::Clone {
                source,
                url: url.to_string(),
                git_ref: git_ref.to_string(),
            });
        }

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn register_layer(&self, layer_dir: &Path) -> Result<String> {
        self.bitbake_layers(&format!("add-layer {}", quote_path(layer_dir)))
    }
}

/// Name of the local clone of a repository.
///
/// Uses the final path segment of the URL with any `.git` suffix stripped.
pub fn repository_name(vcs_url: &str) -> String {
    let trimmed = vcs_url.trim().trim_end_matches('/');
    let segment = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);

    segment
        .strip_suffix(".git")
        .unwrap_or(segment)
        .to_string()
}

/// Parse output of `bitbake-layers show-layers`.
///
/// Skips the table header, its underline, and any log chatter the build tool
/// prints before the table.
pub fn parse_show_layers(output: &str) -> Vec<ActiveLayer> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| {
            !(line.is_empty()
                || line.starts_with('=')
                || line.starts_with("NOTE:")
                || line.starts_with("WARNING:")
                || line.starts_with("ERROR:"))
        })
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let path = parts.next()?;
            if name == "layer" && path == "path" {
                return None;
            }

            Some(ActiveLayer {
                name: name.to_string(),
                path: PathBuf::from(path),
            })
        })
        .collect()
}

fn quote_path(path: &Path) -> String {
    shell_words::quote(path.to_string_lossy().as_ref()).into_owned()
}

fn syscall_non_interactive(cwd: &Path, script: String) -> Result<String> {
    debug!("bash -c {script:?}");
    let output = Command::new("bash")
        .arg("-c")
        .arg(&script)
        .current_dir(cwd)
        .output()?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(BackendError::Command {
            command: script,
            output: message,
        });
    }

    Ok(stdout)
}

/// Git2 authentication prompter for progress bar.
#[derive(Debug, Clone)]
pub struct IndicatifPrompter {
    pub(crate) bar: ProgressBar,
}

impl IndicatifPrompter {
    /// Construct new progress bar authenticator.
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Prompter for IndicatifPrompter {
    #[instrument(skip(self, url, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        info!("authentication required at {url}");
        self.bar.suspend(|| -> Option<(String, String)> {
            let username = Text::new("username").prompt().ok()?;
            let password = Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()?;
            Some((username, password))
        })
    }

    #[instrument(skip(self, username, url, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("authentication required at {url} for user {username}");
        self.bar.suspend(|| {
            Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }

    #[instrument(skip(self, ssh_key_path, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!(
            "authentication required with ssh key at {}",
            ssh_key_path.display()
        );
        self.bar.suspend(|| {
            Password::new("passphrase")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }
}

/// Acquisition backend error types.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Repository cannot be cloned at requested ref.
    #[error("failed to clone {url:?} at {git_ref:?}")]
    Clone {
        #[source]
        source: git2::Error,
        url: String,
        git_ref: String,
    },

    /// Build tool command exits with failure.
    #[error("command {command:?} failed:\n{output}")]
    Command { command: String, output: String },

    /// Directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Process cannot be spawned.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = BackendError> = std::result::Result<T, E>;
