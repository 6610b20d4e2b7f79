// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Top-level request handling.
//!
//! A fetch request names a recipe or machine and a branch. It is carried out
//! in a fixed order:
//!
//! 1. Resolve the branch name to its index ID.
//! 2. Select the newest matching target on that branch.
//! 3. Pass the branch compatibility gate.
//! 4. Walk and acquire the target's owning layer and everything it needs.
//!
//! Nothing is cloned or registered before the gate has approved the request.
//! The read-only queries used for search listings and dependency trees live
//! here as well, so every front end goes through one [`Fetcher`].

use crate::{
    backend::Acquisition,
    gate::{check_compatibility, Confirmation},
    index::{
        model::{BranchRef, LayerItem, ResolvedTarget, TargetKind},
        transport::Transport,
        LayerIndex,
    },
    resolve::{rank, select_machine, select_recipe, Selection},
    walker::{self, LayerSource, WalkError, WalkReport, DEFAULT_FALLBACK_REF},
};

use std::{
    collections::HashSet,
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{info, instrument};

/// Request to acquire a recipe or machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: TargetKind,
    pub name: String,
    pub branch: String,
}

impl Request {
    /// Request recipe on branch.
    pub fn recipe(name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Recipe,
            name: name.into(),
            branch: branch.into(),
        }
    }

    /// Request machine on branch.
    pub fn machine(name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Machine,
            name: name.into(),
            branch: branch.into(),
        }
    }
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub target: ResolvedTarget,
    pub report: WalkReport,
}

/// Recipe search results on one branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchListing {
    /// Hits on the requested branch, newest first.
    pub hits: Vec<ResolvedTarget>,

    /// Number of raw hits that live on other branches.
    pub elsewhere: usize,
}

/// Node of a layer dependency tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub name: String,
    pub children: Vec<DependencyNode>,

    /// Layer already appears earlier in the tree, so its children are not
    /// listed again.
    pub repeated: bool,
}

impl DependencyNode {
    fn render(&self, fmt: &mut Formatter<'_>, prefix: &str, last: bool, root: bool) -> FmtResult {
        let marker = if self.repeated { " (*)" } else { "" };
        let child_prefix = if root {
            writeln!(fmt, "{}{marker}", self.name)?;
            String::new()
        } else {
            let branch = if last { "└── " } else { "├── " };
            writeln!(fmt, "{prefix}{branch}{}{marker}", self.name)?;
            format!("{prefix}{}", if last { "    " } else { "│   " })
        };

        let count = self.children.len();
        for (idx, child) in self.children.iter().enumerate() {
            child.render(fmt, &child_prefix, idx + 1 == count, false)?;
        }

        Ok(())
    }
}

impl Display for DependencyNode {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        self.render(fmt, "", true, true)
    }
}

/// Carries out requests against one index client and one workspace.
#[derive(Debug)]
pub struct Fetcher<T, A, C>
where
    T: Transport,
    A: Acquisition,
    C: Confirmation,
{
    index: LayerIndex<T>,
    backend: A,
    confirmation: C,
    workspace_branch: String,
    fallback_ref: String,
}

impl<T, A, C> Fetcher<T, A, C>
where
    T: Transport,
    A: Acquisition,
    C: Confirmation,
{
    /// Construct new fetcher for a workspace configured for
    /// `workspace_branch`.
    pub fn new(
        index: LayerIndex<T>,
        backend: A,
        confirmation: C,
        workspace_branch: impl Into<String>,
    ) -> Self {
        Self {
            index,
            backend,
            confirmation,
            workspace_branch: workspace_branch.into(),
            fallback_ref: DEFAULT_FALLBACK_REF.into(),
        }
    }

    /// Set ref that failed clones are retried against.
    pub fn with_fallback_ref(mut self, fallback_ref: impl Into<String>) -> Self {
        self.fallback_ref = fallback_ref.into();
        self
    }

    pub fn workspace_branch(&self) -> &str {
        &self.workspace_branch
    }

    pub fn index(&self) -> &LayerIndex<T> {
        &self.index
    }

    pub fn backend(&self) -> &A {
        &self.backend
    }

    /// Acquire requested recipe or machine with its owning layer and every
    /// layer that layer requires.
    ///
    /// # Errors
    ///
    /// - Return [`FetchError::BranchUnresolvable`] if the index has no such
    ///   branch.
    /// - Return [`FetchError::NotFound`] if nothing in the index matches.
    /// - Return [`FetchError::WrongBranch`] if matches exist only on other
    ///   branches.
    /// - Return [`FetchError::BranchMismatch`] if the request is for another
    ///   branch than the workspace's and the user does not confirm it.
    /// - Return [`FetchError::Walk`] if acquiring any layer fails.
    #[instrument(skip(self), level = "debug")]
    pub fn fetch(&mut self, request: &Request) -> Result<FetchOutcome> {
        let branch = self.resolve_branch(&request.branch)?;

        info!("searching for {} {:?} on branch {:?}", request.kind, request.name, branch.name);
        let selection = match request.kind {
            TargetKind::Recipe => select_recipe(&mut self.index, &request.name, &branch),
            TargetKind::Machine => select_machine(&mut self.index, &request.name, &branch),
        };

        let target = match selection {
            Selection::Found(target) => target,
            Selection::WrongBranch { hits } => {
                return Err(FetchError::WrongBranch {
                    kind: request.kind,
                    name: request.name.clone(),
                    branch: branch.name,
                    hits,
                })
            }
            Selection::NotFound => {
                return Err(FetchError::NotFound {
                    kind: request.kind,
                    name: request.name.clone(),
                    branch: branch.name,
                })
            }
        };

        info!(
            "found {} {:?} {} in layer {:?}",
            target.kind,
            target.name,
            target.version.as_deref().unwrap_or("(no version)"),
            target.layer_name
        );

        if !check_compatibility(&self.workspace_branch, &branch.name, &self.confirmation) {
            return Err(FetchError::BranchMismatch {
                workspace: self.workspace_branch.clone(),
                requested: branch.name,
            });
        }

        let report = walker::ensure_layer(
            &mut self.index,
            &self.backend,
            branch,
            &self.fallback_ref,
            &LayerSource::from(&target),
        )?;

        Ok(FetchOutcome { target, report })
    }

    /// List recipes matching term on branch, newest first.
    ///
    /// At most `limit` hits are kept, counted after sorting.
    ///
    /// # Errors
    ///
    /// - Return [`FetchError::BranchUnresolvable`] if the index has no such
    ///   branch.
    pub fn search_recipes(&mut self, term: &str, branch: &str, limit: usize) -> Result<SearchListing> {
        let branch = self.resolve_branch(branch)?;
        let raw = self.index.search_recipes(term);

        let resolved = raw
            .iter()
            .filter_map(|recipe| self.index.resolve_recipe_target(recipe, &branch))
            .collect::<Vec<_>>();

        // INVARIANT: Hits whose layer branch cannot be looked up are dropped,
        // not counted as living on another branch.
        let elsewhere = raw
            .iter()
            .filter_map(|recipe| recipe.layerbranch)
            .filter_map(|id| self.index.layer_branch(id))
            .filter(|layer_branch| layer_branch.branch != branch.id)
            .count();

        let mut hits = rank(resolved);
        hits.truncate(limit);

        Ok(SearchListing { hits, elsewhere })
    }

    /// List layers whose name contains term.
    pub fn search_layers(&self, term: &str) -> Vec<LayerItem> {
        self.index.search_layers(term)
    }

    /// Build dependency tree of a layer on branch as declared by the index.
    ///
    /// # Errors
    ///
    /// - Return [`FetchError::BranchUnresolvable`] if the index has no such
    ///   branch.
    /// - Return [`FetchError::LayerNotFound`] if no layer has that exact
    ///   name.
    pub fn dependency_tree(&mut self, layer: &str, branch: &str) -> Result<DependencyNode> {
        let branch = self.resolve_branch(branch)?;
        let root = self
            .index
            .find_layer(layer)
            .ok_or_else(|| FetchError::LayerNotFound { name: layer.into() })?;

        let mut seen = HashSet::new();
        Ok(self.grow_tree(root, &branch, &mut seen))
    }

    fn grow_tree(
        &mut self,
        layer: LayerItem,
        branch: &BranchRef,
        seen: &mut HashSet<String>,
    ) -> DependencyNode {
        if !seen.insert(layer.name.clone()) {
            return DependencyNode {
                name: layer.name,
                children: Vec::new(),
                repeated: true,
            };
        }

        let children = self
            .index
            .layer_dependencies(layer.id, branch.id)
            .into_iter()
            .map(|dependency| self.grow_tree(dependency, branch, seen))
            .collect();

        DependencyNode {
            name: layer.name,
            children,
            repeated: false,
        }
    }

    fn resolve_branch(&mut self, name: &str) -> Result<BranchRef> {
        self.index
            .branch(name)
            .ok_or_else(|| FetchError::BranchUnresolvable { branch: name.into() })
    }
}

/// Request error types.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Branch name has no ID in the index.
    #[error("branch {branch:?} not found in layer index")]
    BranchUnresolvable { branch: String },

    /// Nothing in the index matches the requested name.
    #[error("{kind} {name:?} not found in layer index")]
    NotFound {
        kind: TargetKind,
        name: String,
        branch: String,
    },

    /// Matches exist, but none of them on the requested branch.
    #[error("{kind} {name:?} exists in layer index, but not on branch {branch:?} ({hits} match(es) on other branches)")]
    WrongBranch {
        kind: TargetKind,
        name: String,
        branch: String,
        hits: usize,
    },

    /// Requested branch differs from the workspace branch and was not
    /// confirmed.
    #[error("workspace is on branch {workspace:?}, refusing to acquire layers from branch {requested:?}")]
    BranchMismatch { workspace: String, requested: String },

    /// No layer has the requested name.
    #[error("layer {name:?} not found in layer index")]
    LayerNotFound { name: String },

    /// Layer acquisition fails.
    #[error(transparent)]
    Walk(#[from] WalkError),
}

/// Friendly result alias :3
pub type Result<T, E = FetchError> = std::result::Result<T, E>;
