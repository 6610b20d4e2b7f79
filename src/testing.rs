// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! In-memory fakes for unit tests.

use crate::{
    backend::{repository_name, Acquisition, ActiveLayer, BackendError, Result as BackendResult},
    gate::Confirmation,
    index::transport::{Endpoint, Filter, FilterOp, Result as TransportResult, Transport, TransportError},
};

use serde_json::{json, Value};
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    fs::create_dir_all,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Layer index held in memory.
///
/// Answers single-field filters the same way the real index does, and
/// counts requests per endpoint.
#[derive(Debug, Default)]
pub(crate) struct MemoryIndex {
    records: HashMap<Endpoint, Vec<Value>>,
    calls: RefCell<HashMap<Endpoint, usize>>,
    failing: bool,
}

impl MemoryIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, endpoint: Endpoint, record: Value) -> &mut Self {
        self.records.entry(endpoint).or_default().push(record);
        self
    }

    pub(crate) fn branch(&mut self, id: u64, name: &str) -> &mut Self {
        self.push(Endpoint::Branches, json!({ "id": id, "name": name }))
    }

    pub(crate) fn layer(&mut self, id: u64, name: &str, vcs_url: &str) -> &mut Self {
        self.push(
            Endpoint::LayerItems,
            json!({ "id": id, "name": name, "vcs_url": vcs_url }),
        )
    }

    pub(crate) fn layer_branch(
        &mut self,
        id: u64,
        layer: u64,
        branch: u64,
        subdir: Option<&str>,
        actual_branch: Option<&str>,
    ) -> &mut Self {
        self.push(
            Endpoint::LayerBranches,
            json!({
                "id": id,
                "layer": layer,
                "branch": branch,
                "vcs_subdir": subdir,
                "actual_branch": actual_branch,
            }),
        )
    }

    pub(crate) fn dependency(&mut self, layerbranch: u64, dependency: u64) -> &mut Self {
        self.push(
            Endpoint::LayerDependencies,
            json!({ "layerbranch": layerbranch, "dependency": dependency }),
        )
    }

    pub(crate) fn recipe(&mut self, pn: &str, pv: &str, layerbranch: u64) -> &mut Self {
        self.push(
            Endpoint::Recipes,
            json!({
                "pn": pn,
                "pv": pv,
                "summary": format!("{pn} summary"),
                "layerbranch": layerbranch,
            }),
        )
    }

    pub(crate) fn machine(&mut self, name: &str, layerbranch: u64) -> &mut Self {
        self.push(
            Endpoint::Machines,
            json!({
                "name": name,
                "description": format!("{name} machine"),
                "layerbranch": layerbranch,
            }),
        )
    }

    /// Make every request fail.
    pub(crate) fn fail_all(&mut self) -> &mut Self {
        self.failing = true;
        self
    }

    /// Number of requests made against endpoint.
    pub(crate) fn calls(&self, endpoint: Endpoint) -> usize {
        self.calls.borrow().get(&endpoint).copied().unwrap_or(0)
    }
}

impl Transport for MemoryIndex {
    fn get(&self, endpoint: Endpoint, filter: &Filter) -> TransportResult<Vec<Value>> {
        *self.calls.borrow_mut().entry(endpoint).or_default() += 1;

        if self.failing {
            let error = serde_json::from_str::<Value>("<html>").unwrap_err();
            return Err(TransportError::Decode(error));
        }

        let records = self.records.get(&endpoint).cloned().unwrap_or_default();
        Ok(records
            .into_iter()
            .filter(|record| filter_matches(record, filter))
            .collect())
    }
}

fn filter_matches(record: &Value, filter: &Filter) -> bool {
    let field = match record.get(filter.field) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        _ => return false,
    };

    match filter.op {
        FilterOp::Exact => field == filter.value,
        FilterOp::IContains => field.to_lowercase().contains(&filter.value.to_lowercase()),
    }
}

/// Side effect observed by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    ActiveLayers,
    Clone { url: String, git_ref: String },
    Register { path: PathBuf },
}

/// Acquisition backend that records side effects instead of running them.
///
/// Clones create an empty directory under a temporary sources directory.
/// Registering a layer makes it active under the name of its directory.
#[derive(Debug)]
pub(crate) struct RecordingBackend {
    root: TempDir,
    active: RefCell<Vec<ActiveLayer>>,
    events: RefCell<Vec<Event>>,
    failing_refs: RefCell<HashSet<String>>,
    failing_layers: RefCell<HashSet<String>>,
    failing_queries: Cell<bool>,
}

impl RecordingBackend {
    pub(crate) fn new() -> std::io::Result<Self> {
        Ok(Self {
            root: tempfile::tempdir()?,
            active: RefCell::new(Vec::new()),
            events: RefCell::new(Vec::new()),
            failing_refs: RefCell::new(HashSet::new()),
            failing_layers: RefCell::new(HashSet::new()),
            failing_queries: Cell::new(false),
        })
    }

    /// Mark layer as already registered.
    pub(crate) fn activate(&self, name: &str, path: impl Into<PathBuf>) {
        self.active.borrow_mut().push(ActiveLayer {
            name: name.into(),
            path: path.into(),
        });
    }

    /// Fail every clone at ref.
    pub(crate) fn fail_clone_at(&self, git_ref: &str) {
        self.failing_refs.borrow_mut().insert(git_ref.into());
    }

    /// Fail registration of layer directory with given name.
    pub(crate) fn fail_register(&self, name: &str) {
        self.failing_layers.borrow_mut().insert(name.into());
    }

    /// Fail every active layer query.
    pub(crate) fn fail_queries(&self) {
        self.failing_queries.set(true);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Events other than active layer queries.
    pub(crate) fn side_effects(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| !matches!(event, Event::ActiveLayers))
            .collect()
    }

    /// Number of clone attempts of the repository named `name`.
    pub(crate) fn clones_of(&self, name: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, Event::Clone { url, .. } if repository_name(url) == name))
            .count()
    }

    /// Number of registrations of a layer directory named `name`.
    pub(crate) fn registrations_of(&self, name: &str) -> usize {
        self.registered_paths()
            .iter()
            .filter(|path| dir_name(path) == name)
            .count()
    }

    pub(crate) fn registered_paths(&self) -> Vec<PathBuf> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Register { path } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Acquisition for RecordingBackend {
    fn active_layers(&self) -> BackendResult<Vec<ActiveLayer>> {
        self.events.borrow_mut().push(Event::ActiveLayers);
        if self.failing_queries.get() {
            return Err(BackendError::Command {
                command: "bitbake-layers show-layers".into(),
                output: "stderr: ERROR: build environment not initialized".into(),
            });
        }

        Ok(self.active.borrow().clone())
    }

    fn core_layer_dir(&self) -> PathBuf {
        self.root.path().join("layers").join("openembedded-core").join("meta")
    }

    fn repository_path(&self, vcs_url: &str) -> PathBuf {
        self.root.path().join("sources").join(repository_name(vcs_url))
    }

    fn clone_repository(&self, url: &str, git_ref: &str, dest: &Path) -> BackendResult<()> {
        self.events.borrow_mut().push(Event::Clone {
            url: url.into(),
            git_ref: git_ref.into(),
        });

        if self.failing_refs.borrow().contains(git_ref) {
            return Err(BackendError::Clone {
                source: git2::Error::from_str(&format!("reference {git_ref:?} not found")),
                url: url.into(),
                git_ref: git_ref.into(),
            });
        }

        create_dir_all(dest).map_err(|source| BackendError::CreateDir {
            source,
            path: dest.to_path_buf(),
        })
    }

    fn register_layer(&self, layer_dir: &Path) -> BackendResult<String> {
        let name = dir_name(layer_dir);
        if self.failing_layers.borrow().contains(&name) {
            return Err(BackendError::Command {
                command: format!("bitbake-layers add-layer {}", layer_dir.display()),
                output: format!("stderr: ERROR: {name} is not a valid layer"),
            });
        }

        self.events.borrow_mut().push(Event::Register {
            path: layer_dir.to_path_buf(),
        });
        self.activate(&name, layer_dir);

        Ok(String::new())
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Confirmation with a canned answer.
#[derive(Debug)]
pub(crate) struct ScriptedConfirmation {
    interactive: bool,
    answer: Option<bool>,
    asked: Cell<usize>,
}

impl ScriptedConfirmation {
    /// Nobody at the terminal.
    pub(crate) fn unattended() -> Self {
        Self {
            interactive: false,
            answer: None,
            asked: Cell::new(0),
        }
    }

    /// Interactive user giving `answer` to every prompt.
    pub(crate) fn answering(answer: bool) -> Self {
        Self {
            interactive: true,
            answer: Some(answer),
            asked: Cell::new(0),
        }
    }

    /// Interactive user whose answer cannot be parsed.
    pub(crate) fn garbled() -> Self {
        Self {
            interactive: true,
            answer: None,
            asked: Cell::new(0),
        }
    }

    /// Number of prompts shown.
    pub(crate) fn asked(&self) -> usize {
        self.asked.get()
    }
}

impl Confirmation for ScriptedConfirmation {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn confirm(&self, _message: &str) -> Option<bool> {
        self.asked.set(self.asked.get() + 1);
        self.answer
    }
}
