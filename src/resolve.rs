// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Target selection.
//!
//! Turn a keyword into the single recipe or machine that a request should
//! acquire. Search hits whose name equals the keyword are preferred; only
//! when there are none do substring hits count. Every hit in that pool is
//! then resolved against the requested branch, and the newest surviving
//! version wins.
//!
//! Selection tells apart two kinds of failure: nothing in the index carries
//! the name at all, and something carries the name but none of it lives on
//! the requested branch.

pub mod version;

use crate::index::{
    model::{BranchRef, Descriptor, ResolvedTarget},
    transport::Transport,
    LayerIndex,
};
use version::RecipeVersion;

use std::cmp::Reverse;
use tracing::debug;

/// Outcome of selecting a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Newest candidate on the requested branch.
    Found(ResolvedTarget),

    /// Candidates exist, but none of them on the requested branch.
    WrongBranch {
        /// Number of candidates that were rejected.
        hits: usize,
    },

    /// Nothing in the index matches the keyword.
    NotFound,
}

/// Select recipe for keyword on branch.
pub fn select_recipe<T>(index: &mut LayerIndex<T>, keyword: &str, branch: &BranchRef) -> Selection
where
    T: Transport,
{
    let hits = index.search_recipes(keyword);
    select(hits, keyword, |recipe| index.resolve_recipe_target(recipe, branch))
}

/// Select machine for keyword on branch.
pub fn select_machine<T>(index: &mut LayerIndex<T>, keyword: &str, branch: &BranchRef) -> Selection
where
    T: Transport,
{
    let hits = index.search_machines(keyword);
    select(hits, keyword, |machine| index.resolve_machine_target(machine, branch))
}

/// Select best candidate among raw search hits.
///
/// `resolve` maps a hit to its branch-validated target, or `None` if the hit
/// is not applicable to the requested branch.
pub fn select<D, F>(hits: Vec<D>, keyword: &str, resolve: F) -> Selection
where
    D: Descriptor,
    F: FnMut(&D) -> Option<ResolvedTarget>,
{
    if hits.is_empty() {
        return Selection::NotFound;
    }

    let (exact, fuzzy): (Vec<D>, Vec<D>) =
        hits.into_iter().partition(|hit| hit.name() == keyword);
    let pool = if exact.is_empty() {
        debug!("no exact match for {keyword:?}, using {} substring matches", fuzzy.len());
        fuzzy
    } else {
        exact
    };

    let candidates = pool.iter().filter_map(resolve).collect::<Vec<_>>();
    match rank(candidates).into_iter().next() {
        Some(target) => Selection::Found(target),
        None => Selection::WrongBranch { hits: pool.len() },
    }
}

/// Order targets newest version first.
///
/// Targets without a version sort last. Ties keep their original order.
pub fn rank(mut targets: Vec<ResolvedTarget>) -> Vec<ResolvedTarget> {
    targets.sort_by_cached_key(|target| {
        Reverse(target.version.as_deref().map(RecipeVersion::parse))
    });
    targets
}
