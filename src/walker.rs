// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layer dependency walker.
//!
//! Ensure that a layer and every layer it transitively requires are cloned
//! into the workspace and registered with the build configuration.
//!
//! # Walk Order
//!
//! The walk is depth first. A layer's dependencies are fully satisfied
//! before the layer itself is cloned and registered, so no layer is ever
//! registered ahead of a layer it requires.
//!
//! # Node States
//!
//! Each layer name moves through the following states within one walk:
//!
//! ```text
//! (unvisited) --> Visiting --> Satisfied
//!                     \
//!                      +-----> Failed
//! ```
//!
//! A layer that has been seen once is never processed again, whatever its
//! state. This collapses shared dependencies and cycles alike. The state map
//! belongs to a single [`LayerWalker`], which is meant to be thrown away once
//! its top-level request is done.
//!
//! # Core Layer
//!
//! The core layer ships with the build tool itself. It is never cloned or
//! registered by the walker.

use crate::{
    backend::{Acquisition, ActiveLayer, BackendError},
    index::{
        model::{BranchRef, ResolvedTarget},
        transport::Transport,
        LayerIndex,
    },
};

use std::{
    collections::HashMap,
    fs::canonicalize,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Layer names that denote the core layer.
pub const CORE_LAYER_NAMES: [&str; 2] = ["openembedded-core", "meta"];

/// Active layer names that show the core layer is provisioned.
pub const CORE_ACTIVE_NAMES: [&str; 3] = ["meta", "core", "meta-poky"];

/// Ref that a failed clone is retried against by default.
pub const DEFAULT_FALLBACK_REF: &str = "master";

/// Where to get a layer from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSource {
    pub name: String,
    pub vcs_url: String,
    pub subdir: Option<String>,

    /// VCS ref to clone, which may differ from the logical branch name.
    pub git_ref: String,
}

impl From<&ResolvedTarget> for LayerSource {
    fn from(target: &ResolvedTarget) -> Self {
        Self {
            name: target.layer_name.clone(),
            vcs_url: target.vcs_url.clone(),
            subdir: target.vcs_subdir.clone(),
            git_ref: target.git_ref.clone(),
        }
    }
}

/// Processing state of a layer within one walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Visiting,
    Satisfied,
    Failed,
}

/// Summary of what a walk did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkReport {
    /// Layers registered, in registration order.
    pub registered: Vec<String>,

    /// Layers whose repository was cloned, in clone order.
    pub cloned: Vec<String>,

    /// Layers found already registered.
    pub already_active: Vec<String>,
}

/// Depth-first layer acquisition over one request.
#[derive(Debug)]
pub struct LayerWalker<'a, T, A>
where
    T: Transport,
    A: Acquisition,
{
    index: &'a mut LayerIndex<T>,
    backend: &'a A,
    branch: BranchRef,
    fallback_ref: String,
    states: HashMap<String, NodeState>,
    report: WalkReport,
}

impl<'a, T, A> LayerWalker<'a, T, A>
where
    T: Transport,
    A: Acquisition,
{
    /// Construct new walker with no layers visited.
    pub fn new(index: &'a mut LayerIndex<T>, backend: &'a A, branch: BranchRef) -> Self {
        Self {
            index,
            backend,
            branch,
            fallback_ref: DEFAULT_FALLBACK_REF.into(),
            states: HashMap::new(),
            report: WalkReport::default(),
        }
    }

    /// Set ref that a failed clone is retried against.
    pub fn with_fallback_ref(mut self, fallback_ref: impl Into<String>) -> Self {
        self.fallback_ref = fallback_ref.into();
        self
    }

    /// State of a layer in this walk, if it has been seen.
    pub fn state(&self, name: &str) -> Option<NodeState> {
        self.states.get(name).copied()
    }

    /// Consume walker into its report.
    pub fn into_report(self) -> WalkReport {
        self.report
    }

    /// Ensure layer and all of its dependencies are present and registered.
    ///
    /// # Errors
    ///
    /// - Return [`WalkError::ActiveLayers`] if active layers cannot be
    ///   queried.
    /// - Return [`WalkError::Clone`] if the layer repository cannot be cloned
    ///   at its ref, nor at the fallback ref.
    /// - Return [`WalkError::Registration`] if the build tool refuses the
    ///   layer.
    ///
    /// Errors from dependencies are returned unchanged, so they always name
    /// the layer that actually failed.
    #[instrument(skip(self, source), fields(layer = %source.name), level = "debug")]
    pub fn ensure_layer(&mut self, source: &LayerSource) -> Result<()> {
        if let Some(state) = self.state(&source.name) {
            debug!("layer {:?} already seen ({state:?})", source.name);
            return Ok(());
        }
        self.states.insert(source.name.clone(), NodeState::Visiting);

        match self.acquire(source) {
            Ok(()) => {
                self.states.insert(source.name.clone(), NodeState::Satisfied);
                Ok(())
            }
            Err(error) => {
                self.states.insert(source.name.clone(), NodeState::Failed);
                Err(error)
            }
        }
    }

    fn acquire(&mut self, source: &LayerSource) -> Result<()> {
        let name = source.name.as_str();

        if CORE_LAYER_NAMES.contains(&name) {
            self.check_core_layer(name)?;
            return Ok(());
        }

        info!("checking layer {name:?}");
        let repository = self.backend.repository_path(&source.vcs_url);
        let active = self.active_layers(name)?;
        // INVARIANT: Collection names can differ from index names, so also
        // match on the directory this layer would be registered from.
        let expected = normalize(&resolve_layer_dir(&repository, source.subdir.as_deref()));
        if active
            .iter()
            .any(|layer| layer.name == name || normalize(&layer.path) == expected)
        {
            info!("layer {name:?} is already active");
            self.report.already_active.push(name.to_string());
            return Ok(());
        }

        self.ensure_dependencies(source)?;

        if repository.exists() {
            info!("repository {:?} exists, skipping clone", repository.display());
        } else {
            self.clone_with_fallback(source, &repository)?;
            self.report.cloned.push(name.to_string());
        }

        let layer_dir = layer_directory(&repository, source.subdir.as_deref());
        info!("registering {:?}", layer_dir.display());
        let output = self
            .backend
            .register_layer(&layer_dir)
            .map_err(|source| WalkError::Registration {
                source,
                layer: name.to_string(),
                path: layer_dir.clone(),
            })?;
        if !output.trim().is_empty() {
            debug!("{output}");
        }

        info!("layer {name:?} added");
        self.report.registered.push(name.to_string());

        Ok(())
    }

    fn ensure_dependencies(&mut self, source: &LayerSource) -> Result<()> {
        let Some(layer) = self.index.find_layer(&source.name) else {
            warn!(
                "cannot query layer details for {:?}, its dependencies might be missing",
                source.name
            );
            return Ok(());
        };

        let dependencies = self.index.layer_dependencies(layer.id, self.branch.id);
        if dependencies.is_empty() {
            debug!("layer {:?} declares no dependencies", source.name);
            return Ok(());
        }

        info!(
            "layer {:?} depends on {}",
            source.name,
            dependencies
                .iter()
                .map(|dependency| dependency.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        for dependency in dependencies {
            let Some(layer_branch) = self
                .index
                .layer_branch_for_layer(dependency.id, self.branch.id)
            else {
                warn!(
                    "cannot resolve details of dependency {:?} on branch {:?}, skipping it",
                    dependency.name, self.branch.name
                );
                continue;
            };

            // INVARIANT: A dependency is checked out at its own ref, not its parent's.
            let dependency_source = LayerSource {
                subdir: layer_branch.subdir().map(ToString::to_string),
                git_ref: layer_branch
                    .actual_branch()
                    .unwrap_or(self.branch.name.as_str())
                    .to_string(),
                name: dependency.name,
                vcs_url: dependency.vcs_url,
            };
            self.ensure_layer(&dependency_source)?;
        }

        Ok(())
    }

    fn clone_with_fallback(&mut self, source: &LayerSource, repository: &Path) -> Result<()> {
        let first = match self
            .backend
            .clone_repository(&source.vcs_url, &source.git_ref, repository)
        {
            Ok(()) => return Ok(()),
            Err(error) => error,
        };

        if source.git_ref == self.fallback_ref {
            return Err(WalkError::Clone {
                source: first,
                layer: source.name.clone(),
                fallback: None,
            });
        }

        warn!(
            "clone of {:?} at {:?} failed ({first}), trying {:?}",
            source.name, source.git_ref, self.fallback_ref
        );
        self.backend
            .clone_repository(&source.vcs_url, &self.fallback_ref, repository)
            .map_err(|fallback| WalkError::Clone {
                source: first,
                layer: source.name.clone(),
                fallback: Some(Box::new(fallback)),
            })
    }

    fn check_core_layer(&self, name: &str) -> Result<()> {
        let active = self.active_layers(name)?;
        if active
            .iter()
            .any(|layer| CORE_ACTIVE_NAMES.contains(&layer.name.as_str()))
        {
            info!("skipping {name:?}, provided by the core layer");
            return Ok(());
        }

        let core_dir = normalize(&self.backend.core_layer_dir());
        if active.iter().any(|layer| normalize(&layer.path) == core_dir) {
            info!("skipping {name:?}, core layer path already registered");
            return Ok(());
        }

        warn!(
            "core layer {name:?} does not appear to be registered; \
             it is never cloned, so make sure the build environment provides it"
        );
        Ok(())
    }

    fn active_layers(&self, layer: &str) -> Result<Vec<ActiveLayer>> {
        self.backend
            .active_layers()
            .map_err(|source| WalkError::ActiveLayers {
                source,
                layer: layer.to_string(),
            })
    }
}

/// Ensure layer in a fresh walk.
///
/// # Errors
///
/// - Return [`WalkError`] if any layer in the walk fails.
pub fn ensure_layer<T, A>(
    index: &mut LayerIndex<T>,
    backend: &A,
    branch: BranchRef,
    fallback_ref: &str,
    source: &LayerSource,
) -> Result<WalkReport>
where
    T: Transport,
    A: Acquisition,
{
    let mut walker = LayerWalker::new(index, backend, branch).with_fallback_ref(fallback_ref);
    walker.ensure_layer(source)?;
    Ok(walker.into_report())
}

/// Directory to register for a layer.
///
/// Uses `<repository>/<subdir>` when a subdirectory is given. Falls back to
/// the repository root when only the root holds a `conf/layer.conf`. A
/// missing `conf/layer.conf` is only logged, since the index is sometimes
/// behind on where a layer lives inside its repository.
pub fn layer_directory(repository: &Path, subdir: Option<&str>) -> PathBuf {
    let candidate = subdir_of(repository, subdir);
    let layer_dir = resolve_layer_dir(repository, subdir);

    if has_layer_conf(&candidate) {
        return layer_dir;
    }

    if has_layer_conf(repository) {
        warn!(
            "no layer.conf at {:?}, using repository root",
            candidate.display()
        );
    } else {
        warn!("no layer.conf found at {:?}", candidate.display());
    }

    layer_dir
}

/// Same choice as [`layer_directory`], without logging.
fn resolve_layer_dir(repository: &Path, subdir: Option<&str>) -> PathBuf {
    let candidate = subdir_of(repository, subdir);
    if !has_layer_conf(&candidate) && has_layer_conf(repository) {
        return repository.to_path_buf();
    }

    candidate
}

fn subdir_of(repository: &Path, subdir: Option<&str>) -> PathBuf {
    match subdir {
        Some(subdir) => repository.join(subdir),
        None => repository.to_path_buf(),
    }
}

fn has_layer_conf(dir: &Path) -> bool {
    dir.join("conf").join("layer.conf").is_file()
}

fn normalize(path: &Path) -> PathBuf {
    canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Layer walk error types.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// Active layers cannot be queried.
    #[error("failed to query active layers while processing layer {layer:?}")]
    ActiveLayers {
        #[source]
        source: BackendError,
        layer: String,
    },

    /// Layer repository cannot be cloned.
    #[error("failed to clone layer {layer:?}{}", fallback_note(fallback))]
    Clone {
        #[source]
        source: BackendError,
        layer: String,
        fallback: Option<Box<BackendError>>,
    },

    /// Build tool refuses to register layer.
    #[error("failed to register layer {layer:?} at {:?}", path.display())]
    Registration {
        #[source]
        source: BackendError,
        layer: String,
        path: PathBuf,
    },
}

impl WalkError {
    /// Name of the layer the walk failed at.
    pub fn layer(&self) -> &str {
        match self {
            Self::ActiveLayers { layer, .. }
            | Self::Clone { layer, .. }
            | Self::Registration { layer, .. } => layer,
        }
    }
}

fn fallback_note(fallback: &Option<Box<BackendError>>) -> String {
    match fallback {
        Some(error) => format!(" (fallback also failed: {error})"),
        None => String::new(),
    }
}

/// Friendly result alias :3
pub type Result<T, E = WalkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        index::model::BranchId,
        testing::{Event, MemoryIndex, RecordingBackend},
    };
    use pretty_assertions::assert_eq;

    const WHINLATTER: u64 = 2;

    fn source(name: &str) -> LayerSource {
        LayerSource {
            name: name.into(),
            vcs_url: format!("https://git.example/{name}.git"),
            subdir: None,
            git_ref: "whinlatter".into(),
        }
    }

    fn branch() -> BranchRef {
        BranchRef::new("whinlatter", BranchId(WHINLATTER))
    }

    /// Index where every named layer lives in its own repository on
    /// whinlatter, with the given dependency edges.
    fn graph(layers: &[&str], edges: &[(&str, &str)]) -> MemoryIndex {
        let mut fake = MemoryIndex::new();
        fake.branch(WHINLATTER, "whinlatter");
        let id = |name: &str| layers.iter().position(|layer| *layer == name).unwrap_or(0) as u64 + 1;
        for layer in layers {
            fake.layer(
                100 + id(layer),
                layer,
                &format!("https://git.example/{layer}.git"),
            )
            .layer_branch(id(layer), 100 + id(layer), WHINLATTER, None, None);
        }
        for (from, to) in edges {
            fake.dependency(id(from), 100 + id(to));
        }
        fake
    }

    #[test]
    fn registers_dependencies_before_dependents() -> anyhow::Result<()> {
        let mut index = LayerIndex::new(graph(
            &["meta-app", "meta-python", "meta-oe", "meta-networking"],
            &[
                ("meta-app", "meta-python"),
                ("meta-app", "meta-networking"),
                ("meta-python", "meta-oe"),
                ("meta-networking", "meta-oe"),
            ],
        ));
        let backend = RecordingBackend::new()?;

        let report = ensure_layer(&mut index, &backend, branch(), "master", &source("meta-app"))?;

        assert_eq!(
            report.registered,
            vec!["meta-oe", "meta-python", "meta-networking", "meta-app"]
        );
        assert_eq!(report.cloned, report.registered);
        for layer in ["meta-oe", "meta-python", "meta-networking", "meta-app"] {
            assert_eq!(backend.clones_of(layer), 1, "{layer} cloned once");
            assert_eq!(backend.registrations_of(layer), 1, "{layer} registered once");
        }

        Ok(())
    }

    #[test]
    fn cycle_terminates() -> anyhow::Result<()> {
        let mut index = LayerIndex::new(graph(
            &["meta-a", "meta-b", "meta-c"],
            &[("meta-a", "meta-b"), ("meta-b", "meta-c"), ("meta-c", "meta-a")],
        ));
        let backend = RecordingBackend::new()?;

        let report = ensure_layer(&mut index, &backend, branch(), "master", &source("meta-a"))?;

        assert_eq!(report.registered, vec!["meta-c", "meta-b", "meta-a"]);

        Ok(())
    }

    #[test]
    fn active_layer_is_left_alone() -> anyhow::Result<()> {
        let mut index = LayerIndex::new(graph(&["meta-oe"], &[]));
        let backend = RecordingBackend::new()?;
        backend.activate("meta-oe", "/work/yocto/sources/meta-openembedded/meta-oe");

        let report = ensure_layer(&mut index, &backend, branch(), "master", &source("meta-oe"))?;

        assert_eq!(report.already_active, vec!["meta-oe"]);
        assert!(report.registered.is_empty());
        assert!(backend
            .events()
            .iter()
            .all(|event| matches!(event, Event::ActiveLayers)));

        Ok(())
    }

    #[test]
    fn active_layer_matched_by_path_under_collection_name() -> anyhow::Result<()> {
        let mut fake = MemoryIndex::new();
        fake.branch(WHINLATTER, "whinlatter")
            .layer(101, "meta-oe", "https://git.example/meta-openembedded.git")
            .layer_branch(1, 101, WHINLATTER, Some("meta-oe"), None);
        let mut index = LayerIndex::new(fake);
        let backend = RecordingBackend::new()?;
        let layer_dir = backend
            .repository_path("https://git.example/meta-openembedded.git")
            .join("meta-oe");
        std::fs::create_dir_all(layer_dir.join("conf"))?;
        std::fs::write(layer_dir.join("conf").join("layer.conf"), "")?;
        backend.activate("openembedded-layer", layer_dir.clone());

        let source = LayerSource {
            name: "meta-oe".into(),
            vcs_url: "https://git.example/meta-openembedded.git".into(),
            subdir: Some("meta-oe".into()),
            git_ref: "whinlatter".into(),
        };
        let report = ensure_layer(&mut index, &backend, branch(), "master", &source)?;

        assert_eq!(report.already_active, vec!["meta-oe"]);
        assert!(report.registered.is_empty());
        assert!(backend.side_effects().is_empty());

        Ok(())
    }

    #[test]
    fn core_layer_is_never_cloned() -> anyhow::Result<()> {
        let mut index = LayerIndex::new(graph(
            &["meta-oe", "openembedded-core"],
            &[("meta-oe", "openembedded-core")],
        ));
        let backend = RecordingBackend::new()?;

        let report = ensure_layer(&mut index, &backend, branch(), "master", &source("meta-oe"))?;

        assert_eq!(report.registered, vec!["meta-oe"]);
        assert_eq!(backend.clones_of("openembedded-core"), 0);
        assert_eq!(backend.registrations_of("openembedded-core"), 0);

        Ok(())
    }

    #[test]
    fn core_layer_detected_by_path() -> anyhow::Result<()> {
        let mut index = LayerIndex::new(graph(&["meta"], &[]));
        let backend = RecordingBackend::new()?;
        let core_dir = backend.core_layer_dir();
        backend.activate("custom-core-name", core_dir);

        let mut walker = LayerWalker::new(&mut index, &backend, branch());
        walker.ensure_layer(&source("meta"))?;

        assert_eq!(walker.state("meta"), Some(NodeState::Satisfied));
        assert_eq!(backend.clones_of("meta"), 0);

        Ok(())
    }

    #[test]
    fn dependency_uses_its_own_ref_and_subdir() -> anyhow::Result<()> {
        let mut fake = MemoryIndex::new();
        fake.branch(WHINLATTER, "whinlatter")
            .layer(101, "meta-app", "https://git.example/meta-app.git")
            .layer(102, "meta-oe", "https://git.example/meta-openembedded.git")
            .layer_branch(1, 101, WHINLATTER, None, None)
            .layer_branch(2, 102, WHINLATTER, Some("meta-oe"), Some("whinlatter-next"))
            .dependency(1, 102);
        let mut index = LayerIndex::new(fake);
        let backend = RecordingBackend::new()?;

        ensure_layer(&mut index, &backend, branch(), "master", &source("meta-app"))?;

        let expect_dir = backend.repository_path("https://git.example/meta-openembedded.git");
        let first_clone = backend
            .events()
            .into_iter()
            .find(|event| matches!(event, Event::Clone { .. }));
        assert_eq!(
            first_clone,
            Some(Event::Clone {
                url: "https://git.example/meta-openembedded.git".into(),
                git_ref: "whinlatter-next".into(),
            })
        );
        assert_eq!(backend.registered_paths()[0], expect_dir.join("meta-oe"));

        Ok(())
    }

    #[test]
    fn clone_retries_fallback_ref_once() -> anyhow::Result<()> {
        let mut index = LayerIndex::new(graph(&["meta-old"], &[]));
        let backend = RecordingBackend::new()?;
        backend.fail_clone_at("whinlatter");

        let report = ensure_layer(&mut index, &backend, branch(), "master", &source("meta-old"))?;

        assert_eq!(report.registered, vec!["meta-old"]);
        let refs: Vec<_> = backend
            .events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Clone { git_ref, .. } => Some(git_ref),
                _ => None,
            })
            .collect();
        assert_eq!(refs, vec!["whinlatter", "master"]);

        Ok(())
    }

    #[test]
    fn clone_failure_after_fallback_aborts_walk() -> anyhow::Result<()> {
        let mut index = LayerIndex::new(graph(
            &["meta-app", "meta-gone"],
            &[("meta-app", "meta-gone")],
        ));
        let backend = RecordingBackend::new()?;
        backend.fail_clone_at("whinlatter");
        backend.fail_clone_at("master");

        let mut walker = LayerWalker::new(&mut index, &backend, branch());
        let error = walker.ensure_layer(&source("meta-app")).unwrap_err();

        assert!(matches!(error, WalkError::Clone { fallback: Some(_), .. }));
        assert_eq!(error.layer(), "meta-gone");
        assert_eq!(walker.state("meta-gone"), Some(NodeState::Failed));
        assert_eq!(walker.state("meta-app"), Some(NodeState::Failed));
        assert_eq!(backend.clones_of("meta-app"), 0);
        assert!(backend.registered_paths().is_empty());

        Ok(())
    }

    #[test]
    fn registration_failure_names_layer() -> anyhow::Result<()> {
        let mut index = LayerIndex::new(graph(
            &["meta-app", "meta-bad"],
            &[("meta-app", "meta-bad")],
        ));
        let backend = RecordingBackend::new()?;
        backend.fail_register("meta-bad");

        let error = ensure_layer(&mut index, &backend, branch(), "master", &source("meta-app"))
            .unwrap_err();

        assert_eq!(error.layer(), "meta-bad");
        match error {
            WalkError::Registration { source, .. } => {
                assert!(source.to_string().contains("ERROR: meta-bad"));
            }
            other => panic!("expected registration failure, got {other:?}"),
        }
        assert_eq!(backend.registrations_of("meta-app"), 0);

        Ok(())
    }

    #[test]
    fn active_layer_query_failure_aborts_walk() -> anyhow::Result<()> {
        let mut index = LayerIndex::new(graph(&["meta-oe"], &[]));
        let backend = RecordingBackend::new()?;
        backend.fail_queries();

        let error = ensure_layer(&mut index, &backend, branch(), "master", &source("meta-oe"))
            .unwrap_err();

        assert!(matches!(error, WalkError::ActiveLayers { .. }));
        assert_eq!(error.layer(), "meta-oe");
        assert!(backend.side_effects().is_empty());

        Ok(())
    }

    #[test]
    fn unknown_layer_is_still_acquired() -> anyhow::Result<()> {
        let mut index = LayerIndex::new(MemoryIndex::new());
        let backend = RecordingBackend::new()?;

        let report = ensure_layer(&mut index, &backend, branch(), "master", &source("meta-local"))?;

        assert_eq!(report.registered, vec!["meta-local"]);

        Ok(())
    }

    #[test]
    fn existing_repository_is_not_cloned_again() -> anyhow::Result<()> {
        let mut index = LayerIndex::new(graph(&["meta-oe"], &[]));
        let backend = RecordingBackend::new()?;
        let repository = backend.repository_path("https://git.example/meta-oe.git");
        std::fs::create_dir_all(repository.join("conf"))?;
        std::fs::write(repository.join("conf").join("layer.conf"), "")?;

        let report = ensure_layer(&mut index, &backend, branch(), "master", &source("meta-oe"))?;

        assert!(report.cloned.is_empty());
        assert_eq!(report.registered, vec!["meta-oe"]);

        Ok(())
    }

    #[test]
    fn layer_directory_falls_back_to_root() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let repository = root.path();

        assert_eq!(
            layer_directory(repository, Some("meta-x")),
            repository.join("meta-x")
        );

        std::fs::create_dir_all(repository.join("conf"))?;
        std::fs::write(repository.join("conf").join("layer.conf"), "")?;
        assert_eq!(layer_directory(repository, Some("meta-x")), repository);

        std::fs::create_dir_all(repository.join("meta-x").join("conf"))?;
        std::fs::write(repository.join("meta-x").join("conf").join("layer.conf"), "")?;
        assert_eq!(
            layer_directory(repository, Some("meta-x")),
            repository.join("meta-x")
        );

        Ok(())
    }
}
