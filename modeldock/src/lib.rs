//! ModelDock - self-hosted model artifact downloader
//!
//! This library provides the core functionality for fetching model repositories
//! from a Hugging Face compatible registry into a local storage tree, estimating
//! transfer progress from bytes landing on disk, and browsing or deleting what
//! has been stored.
//!
//! # Modules
//!
//! - [`repo`] - Repository identifiers, name patterns and storage layout
//! - [`registry`] - Registry metadata lookups (expected file sizes)
//! - [`transfer`] - Transfer supervision and progress estimation
//! - [`catalog`] - Listing and deleting stored models
//! - [`app`] - Facade wiring the components together for callers
//! - [`config`] - INI configuration file
//! - [`logging`] - Tracing subscriber setup

pub mod app;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod registry;
pub mod repo;
pub mod transfer;

/// Version of the ModelDock library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
