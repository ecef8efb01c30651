//! CLI command implementations.

pub mod cache;
pub mod common;
pub mod delete;
pub mod download;
pub mod fetch;
pub mod list;
pub mod migrate;
pub mod serve;
