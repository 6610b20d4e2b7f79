// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layer index transport.
//!
//! The layer index answers GET requests of the form
//! `<api>/<resource>/?filter=<field>:<value>` with a JSON array. Only one
//! filter expression can be supplied per request, so compound lookups are
//! left to the caller.

use serde_json::Value;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    time::Duration,
};
use tracing::{debug, instrument};

/// Default public layer index API.
pub const DEFAULT_INDEX_URL: &str = "https://layers.openembedded.org/layerindex/api";

/// Index resource to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Branches,
    LayerItems,
    LayerBranches,
    LayerDependencies,
    Recipes,
    Machines,
}

impl Endpoint {
    /// Resource name as it appears in the index URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Branches => "branches",
            Self::LayerItems => "layerItems",
            Self::LayerBranches => "layerBranches",
            Self::LayerDependencies => "layerDependencies",
            Self::Recipes => "recipes",
            Self::Machines => "machines",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Single-field filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: &'static str,
    pub op: FilterOp,
    pub value: String,
}

/// Matching mode of a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Field equals value.
    Exact,

    /// Field contains value, ignoring case.
    IContains,
}

impl Filter {
    /// Match field exactly.
    pub fn exact(field: &'static str, value: impl Display) -> Self {
        Self {
            field,
            op: FilterOp::Exact,
            value: value.to_string(),
        }
    }

    /// Match field by case-insensitive substring.
    pub fn icontains(field: &'static str, value: impl Display) -> Self {
        Self {
            field,
            op: FilterOp::IContains,
            value: value.to_string(),
        }
    }
}

impl Display for Filter {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self.op {
            FilterOp::Exact => write!(fmt, "{}:{}", self.field, self.value),
            FilterOp::IContains => write!(fmt, "{}__icontains:{}", self.field, self.value),
        }
    }
}

/// Fetch raw records from the layer index.
pub trait Transport {
    /// Fetch every record of `endpoint` that matches `filter`.
    ///
    /// # Errors
    ///
    /// - Return [`TransportError`] if the request fails or the response is
    ///   not a JSON array.
    fn get(&self, endpoint: Endpoint, filter: &Filter) -> Result<Vec<Value>>;
}

/// Blocking HTTP transport against a layer index API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTransport {
    /// Construct new HTTP transport.
    ///
    /// # Errors
    ///
    /// - Return [`TransportError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent.as_ref())
            .timeout(timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Base URL of the index API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    #[instrument(skip(self), level = "debug")]
    fn get(&self, endpoint: Endpoint, filter: &Filter) -> Result<Vec<Value>> {
        let url = format!("{}/{}/", self.base_url, endpoint);
        debug!("GET {url}?filter={filter}");
        let records = self
            .client
            .get(&url)
            .query(&[("filter", filter.to_string())])
            .send()?
            .error_for_status()?
            .json::<Vec<Value>>()?;

        Ok(records)
    }
}

/// Layer index transport error types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request failed or returned a non-success status.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Response could not be decoded.
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

/// Friendly result alias :3
pub type Result<T, E = TransportError> = std::result::Result<T, E>;
