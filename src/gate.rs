// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Branch compatibility gate.
//!
//! Layers are published per release series. Registering a layer from one
//! series in a workspace configured for another quietly produces a build
//! configuration that cannot work. The gate runs before any layer is
//! acquired for a branch other than the workspace's own, and only lets the
//! request through when the user explicitly agrees to it.
//!
//! Unattended runs have nobody to ask, so they are always refused.

use inquire::Confirm;
use std::io::IsTerminal;
use tracing::{error, warn};

/// Source of explicit user confirmation.
pub trait Confirmation {
    /// Whether a person can answer prompts.
    fn is_interactive(&self) -> bool;

    /// Ask for an affirmative answer.
    ///
    /// Returns `None` if no parseable answer was given.
    fn confirm(&self, message: &str) -> Option<bool>;
}

/// Confirmation through the controlling terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalConfirmation {
    interactive: bool,
}

impl TerminalConfirmation {
    /// Prompt on the terminal only if standard input is a terminal.
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stdin().is_terminal(),
        }
    }

    /// Never prompt.
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }
}

impl Confirmation for TerminalConfirmation {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn confirm(&self, message: &str) -> Option<bool> {
        Confirm::new(message).with_default(false).prompt().ok()
    }
}

/// Decide whether a request for `requested` may proceed in a workspace
/// configured for `workspace`.
///
/// Equal branches always proceed. Differing branches proceed only when an
/// interactive user answers yes; any other answer, a failed prompt, or a
/// non-interactive context refuses.
pub fn check_compatibility(
    workspace: &str,
    requested: &str,
    confirmation: &impl Confirmation,
) -> bool {
    if workspace == requested {
        return true;
    }

    warn!(
        "workspace is configured for branch {workspace:?}, but {requested:?} was requested; \
         layers from another release series may not be compatible with this workspace"
    );

    if !confirmation.is_interactive() {
        error!("refusing to mix branches without confirmation in a non-interactive session");
        return false;
    }

    confirmation
        .confirm(&format!("Continue with layers from branch {requested:?}?"))
        .unwrap_or(false)
}
