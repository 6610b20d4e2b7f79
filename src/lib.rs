// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layer resolution and acquisition for Yocto workspaces.
//!
//! A __layer__ is a directory of build metadata that defines recipes and
//! machines. The public [layer index] catalogs layers per release
//! __branch__, along with the layers each of them requires. This crate finds
//! the layer that provides a requested recipe or machine, then makes sure
//! that layer and everything it transitively requires is cloned into the
//! workspace and registered with the build configuration.
//!
//! # Flow
//!
//! ```text
//! request --> LayerIndex --> resolve --> gate --> LayerWalker --> Acquisition
//!            (branch ID)   (select &    (same    (depth-first    (clone and
//!                           rank)       branch?)  over deps)     register)
//! ```
//!
//! [`fetch::Fetcher`] drives that flow for one workspace.
//!
//! [layer index]: https://layers.openembedded.org

pub mod backend;
pub mod config;
pub mod fetch;
pub mod gate;
pub mod index;
pub mod path;
pub mod resolve;
pub mod walker;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;
