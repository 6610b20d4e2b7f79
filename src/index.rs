// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layer index client.
//!
//! The __layer index__ is a read-only catalog of layers, the branches they
//! support, the layers they depend on, and the recipes and machines they
//! define. [`LayerIndex`] wraps a [`Transport`] and memoizes point lookups
//! for the lifetime of one client instance.
//!
//! # Failure Policy
//!
//! Any transport or decoding failure on a lookup is reported as an empty
//! result. Callers cannot tell a confirmed empty answer apart from a failed
//! lookup, so every swallowed failure is logged at `warn` level along with
//! the endpoint and filter that produced it.
//!
//! # Branch Scoping
//!
//! Searches are never branch-filtered. A search hit only becomes usable once
//! [`LayerIndex::resolve_recipe_target`] or
//! [`LayerIndex::resolve_machine_target`] checks that the layer branch
//! defining it belongs to the requested branch. Those two methods are the
//! only place a [`ResolvedTarget`] is built.

pub mod model;
pub mod transport;

use crate::index::{
    model::{
        Branch, BranchId, BranchRef, Descriptor, LayerBranch, LayerBranchId, LayerDependency,
        LayerId, LayerItem, MachineDescriptor, RecipeDescriptor, ResolvedTarget, TargetKind,
    },
    transport::{Endpoint, Filter, HttpTransport, Transport, TransportError},
};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Memoizing client for the layer index.
#[derive(Debug)]
pub struct LayerIndex<T = HttpTransport>
where
    T: Transport,
{
    transport: T,
    branches: HashMap<String, BranchId>,
    layers: HashMap<LayerId, LayerItem>,
    layer_branches: HashMap<LayerBranchId, LayerBranch>,
    branches_of_layer: HashMap<LayerId, Vec<LayerBranch>>,
}

impl<T> LayerIndex<T>
where
    T: Transport,
{
    /// Construct new layer index client with empty caches.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            branches: HashMap::new(),
            layers: HashMap::new(),
            layer_branches: HashMap::new(),
            branches_of_layer: HashMap::new(),
        }
    }

    /// Borrow underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Look up branch ID by exact name.
    ///
    /// Returns `None` if the index has no such branch. A resolved ID is kept
    /// for the rest of this client's lifetime and never looked up again.
    #[instrument(skip(self), level = "debug")]
    pub fn resolve_branch_id(&mut self, name: &str) -> Option<BranchId> {
        if let Some(id) = self.branches.get(name) {
            return Some(*id);
        }

        let id = self
            .fetch::<Branch>(Endpoint::Branches, Filter::exact("name", name))
            .into_iter()
            .find(|branch| branch.name == name)
            .map(|branch| branch.id)?;
        debug!("branch {name:?} has ID {id}");
        self.branches.insert(name.to_string(), id);

        Some(id)
    }

    /// Resolve branch name into a [`BranchRef`].
    pub fn branch(&mut self, name: &str) -> Option<BranchRef> {
        self.resolve_branch_id(name)
            .map(|id| BranchRef::new(name, id))
    }

    /// Search recipes whose name contains keyword.
    pub fn search_recipes(&self, keyword: &str) -> Vec<RecipeDescriptor> {
        self.fetch(Endpoint::Recipes, Filter::icontains("pn", keyword))
    }

    /// Search layers whose name contains keyword.
    pub fn search_layers(&self, keyword: &str) -> Vec<LayerItem> {
        self.fetch(Endpoint::LayerItems, Filter::icontains("name", keyword))
    }

    /// Search machines whose name contains keyword.
    pub fn search_machines(&self, keyword: &str) -> Vec<MachineDescriptor> {
        self.fetch(Endpoint::Machines, Filter::icontains("name", keyword))
    }

    /// Find layer whose name matches exactly.
    pub fn find_layer(&mut self, name: &str) -> Option<LayerItem> {
        let layer = self
            .search_layers(name)
            .into_iter()
            .find(|layer| layer.name == name)?;
        self.layers.insert(layer.id, layer.clone());

        Some(layer)
    }

    /// Look up layer by ID.
    pub fn layer_item(&mut self, id: LayerId) -> Option<LayerItem> {
        if let Some(layer) = self.layers.get(&id) {
            return Some(layer.clone());
        }

        let layer = self
            .fetch::<LayerItem>(Endpoint::LayerItems, Filter::exact("id", id))
            .into_iter()
            .next()?;
        self.layers.insert(id, layer.clone());

        Some(layer)
    }

    /// Look up layer branch by ID.
    pub fn layer_branch(&mut self, id: LayerBranchId) -> Option<LayerBranch> {
        if let Some(layer_branch) = self.layer_branches.get(&id) {
            return Some(layer_branch.clone());
        }

        let layer_branch = self
            .fetch::<LayerBranch>(Endpoint::LayerBranches, Filter::exact("id", id))
            .into_iter()
            .next()?;
        self.layer_branches.insert(id, layer_branch.clone());

        Some(layer_branch)
    }

    /// Find the layer branch of a layer on a given branch.
    ///
    /// The index cannot filter on layer and branch at once, so every layer
    /// branch of the layer is fetched and the matching one picked here.
    pub fn layer_branch_for_layer(
        &mut self,
        layer_id: LayerId,
        branch_id: BranchId,
    ) -> Option<LayerBranch> {
        if !self.branches_of_layer.contains_key(&layer_id) {
            let fetched: Vec<LayerBranch> =
                self.fetch(Endpoint::LayerBranches, Filter::exact("layer", layer_id));
            if fetched.is_empty() {
                return None;
            }

            for layer_branch in &fetched {
                self.layer_branches
                    .insert(layer_branch.id, layer_branch.clone());
            }
            self.branches_of_layer.insert(layer_id, fetched);
        }

        self.branches_of_layer
            .get(&layer_id)?
            .iter()
            .find(|layer_branch| layer_branch.branch == branch_id)
            .cloned()
    }

    /// List layers that a layer requires on a given branch.
    ///
    /// Returns an empty listing if the layer has no layer branch for the
    /// given branch. Dependency edges whose target layer cannot be found are
    /// dropped.
    #[instrument(skip(self), level = "debug")]
    pub fn layer_dependencies(&mut self, layer_id: LayerId, branch_id: BranchId) -> Vec<LayerItem> {
        let Some(layer_branch) = self.layer_branch_for_layer(layer_id, branch_id) else {
            debug!("layer {layer_id} has no layer branch for branch {branch_id}");
            return Vec::new();
        };

        let edges: Vec<LayerDependency> = self.fetch(
            Endpoint::LayerDependencies,
            Filter::exact("layerbranch", layer_branch.id),
        );

        edges
            .into_iter()
            .filter_map(|edge| {
                let layer = self.layer_item(edge.dependency);
                if layer.is_none() {
                    warn!("dependency layer {} of layer {layer_id} not found", edge.dependency);
                }
                layer
            })
            .collect()
    }

    /// Resolve recipe search hit against requested branch.
    ///
    /// Returns `None` if the recipe has no layer branch reference, the layer
    /// branch or its layer cannot be found, or the layer branch belongs to a
    /// different branch than requested.
    pub fn resolve_recipe_target(
        &mut self,
        recipe: &RecipeDescriptor,
        branch: &BranchRef,
    ) -> Option<ResolvedTarget> {
        let mut target = self.resolve_target(recipe, branch, TargetKind::Recipe)?;
        target.version = Some(recipe.pv.clone());
        target.summary = recipe.summary.clone();

        Some(target)
    }

    /// Resolve machine search hit against requested branch.
    ///
    /// Same rejection rules as [`LayerIndex::resolve_recipe_target`].
    pub fn resolve_machine_target(
        &mut self,
        machine: &MachineDescriptor,
        branch: &BranchRef,
    ) -> Option<ResolvedTarget> {
        let mut target = self.resolve_target(machine, branch, TargetKind::Machine)?;
        target.summary = machine.description.clone();

        Some(target)
    }

    fn resolve_target(
        &mut self,
        descriptor: &impl Descriptor,
        branch: &BranchRef,
        kind: TargetKind,
    ) -> Option<ResolvedTarget> {
        let layer_branch = self.layer_branch(descriptor.layerbranch()?)?;

        // INVARIANT: Never substitute a layer branch from another branch.
        if layer_branch.branch != branch.id {
            debug!(
                "{kind} {:?} belongs to branch {}, not {} ({})",
                descriptor.name(),
                layer_branch.branch,
                branch.name,
                branch.id
            );
            return None;
        }

        let layer = self.layer_item(layer_branch.layer)?;
        let git_ref = layer_branch
            .actual_branch()
            .unwrap_or(branch.name.as_str())
            .to_string();

        Some(ResolvedTarget {
            kind,
            name: descriptor.name().to_string(),
            version: None,
            summary: String::new(),
            layer_id: layer.id,
            layer_name: layer.name,
            vcs_url: layer.vcs_url,
            vcs_web_url: layer.vcs_web_url,
            vcs_subdir: layer_branch.subdir().map(ToString::to_string),
            branch: branch.clone(),
            git_ref,
        })
    }

    fn fetch<R>(&self, endpoint: Endpoint, filter: Filter) -> Vec<R>
    where
        R: DeserializeOwned,
    {
        let records = match self.transport.get(endpoint, &filter) {
            Ok(records) => records,
            Err(error) => {
                warn!("index lookup {endpoint}?filter={filter} failed: {error}");
                return Vec::new();
            }
        };

        match serde_json::from_value::<Vec<R>>(Value::Array(records)) {
            Ok(records) => records,
            Err(error) => {
                let error = TransportError::Decode(error);
                warn!("index lookup {endpoint}?filter={filter} returned bad records: {error}");
                Vec::new()
            }
        }
    }
}
