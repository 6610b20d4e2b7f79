// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layer index record layout.
//!
//! Records are deserialized straight from the JSON arrays returned by the
//! layer index. Identifiers are wrapped in newtypes so a layer ID can never be
//! handed to a lookup that expects a branch ID.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

macro_rules! index_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl Display for $name {
            fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
                write!(fmt, "{}", self.0)
            }
        }
    };
}

index_id!(
    /// Index-assigned identifier of a [`Branch`].
    BranchId
);
index_id!(
    /// Index-assigned identifier of a [`LayerItem`].
    LayerId
);
index_id!(
    /// Index-assigned identifier of a [`LayerBranch`].
    LayerBranchId
);

/// Named release line of the distribution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
}

/// Branch requested by a caller, resolved to its index identifier.
///
/// The logical branch name is kept apart from any VCS ref a layer declares
/// for it, see [`LayerBranch::actual_branch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub name: String,
    pub id: BranchId,
}

impl BranchRef {
    /// Construct new resolved branch reference.
    pub fn new(name: impl Into<String>, id: BranchId) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// Named layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayerItem {
    pub id: LayerId,
    pub name: String,
    #[serde(default)]
    pub vcs_url: String,
    #[serde(default)]
    pub vcs_web_url: Option<String>,
}

/// Branch-specific facet of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayerBranch {
    pub id: LayerBranchId,
    pub layer: LayerId,
    pub branch: BranchId,
    #[serde(default)]
    pub vcs_subdir: Option<String>,
    #[serde(default)]
    pub actual_branch: Option<String>,
}

impl LayerBranch {
    /// Subdirectory of the layer within its repository, if any.
    pub fn subdir(&self) -> Option<&str> {
        non_empty(self.vcs_subdir.as_deref())
    }

    /// VCS ref that overrides the logical branch name, if any.
    pub fn actual_branch(&self) -> Option<&str> {
        non_empty(self.actual_branch.as_deref())
    }
}

/// Directed edge from a layer branch to the layer it requires.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayerDependency {
    #[serde(default)]
    pub layerbranch: Option<LayerBranchId>,
    pub dependency: LayerId,
}

/// Raw recipe search hit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecipeDescriptor {
    pub pn: String,
    #[serde(default)]
    pub pv: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub layerbranch: Option<LayerBranchId>,
}

/// Raw machine search hit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MachineDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub layerbranch: Option<LayerBranchId>,
}

/// Named search hit that refers to the layer branch defining it.
pub trait Descriptor {
    /// Name of the recipe or machine.
    fn name(&self) -> &str;

    /// Layer branch that defines this descriptor.
    fn layerbranch(&self) -> Option<LayerBranchId>;
}

impl Descriptor for RecipeDescriptor {
    fn name(&self) -> &str {
        &self.pn
    }

    fn layerbranch(&self) -> Option<LayerBranchId> {
        self.layerbranch
    }
}

impl Descriptor for MachineDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn layerbranch(&self) -> Option<LayerBranchId> {
        self.layerbranch
    }
}

/// Kind of target a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Recipe,
    Machine,
}

impl Display for TargetKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Recipe => fmt.write_str("recipe"),
            Self::Machine => fmt.write_str("machine"),
        }
    }
}

/// Branch-validated view of a recipe or machine and the layer owning it.
///
/// # Invariant
///
/// - `branch.id` always equals the branch ID of the layer branch that
///   defines the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub kind: TargetKind,
    pub name: String,
    pub version: Option<String>,
    pub summary: String,
    pub layer_id: LayerId,
    pub layer_name: String,
    pub vcs_url: String,
    pub vcs_web_url: Option<String>,
    pub vcs_subdir: Option<String>,

    /// Logical branch the target was resolved against.
    pub branch: BranchRef,

    /// VCS ref to check out for the owning layer.
    pub git_ref: String,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
