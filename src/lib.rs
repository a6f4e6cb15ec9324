//! # slugforge - fingerprint-cached vendored builds
//!
//! slugforge compiles one server package (nginx, optionally with a bundled
//! PCRE) inside a buildpack and keeps the result in the buildpack cache. A
//! later build with the same version, secondary version and configure
//! options restores the cached binary instead of compiling again.
//!
//! ## Flow
//!
//! ```text
//! config::ConfigResolver -> fingerprint::decide
//!     -> hit:  cache::ArtifactCache::restore
//!     -> miss: cache::ArtifactCache::purge -> build::BuildPipeline::build
//!              -> cache::ArtifactCache::store
//!     -> bootstrap::generate
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Option layering into a [`config::BuildRequest`]
//! - [`fingerprint`] - Reuse/rebuild decision
//! - [`cache`] - Persistent artifact cache
//! - [`build`] - Fetch/configure/compile pipeline
//! - [`bootstrap`] - Launch script, Procfile and PATH patch

/// Runtime bootstrap file generation.
pub mod bootstrap;

/// Fetch, configure and compile pipeline.
pub mod build;

/// Artifact cache across builds.
pub mod cache;

/// CLI command handlers.
pub mod commands;

/// Build option resolution.
pub mod config;

/// Fatal error types.
pub mod error;

/// Source archive download and unpacking.
pub mod fetch;

/// Cache eligibility fingerprints.
pub mod fingerprint;

/// Wrapped package description.
pub mod package;

/// Runtime file contents.
pub mod templates;

/// Buildpack-style terminal output.
pub mod ui;
