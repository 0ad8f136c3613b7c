#![doc = "token-sync-core: core logic library for token-sync."]

//! This crate contains the design-token pipeline: manifest model, artifact
//! generation, change detection against a repository and change-request
//! publishing. Forge-specific transport lives in the `token-sync` crate.
//!
//! # Usage
//! Build an [`generate::ArtifactGenerator`], pick a [`contract::RepositoryClient`]
//! implementation and hand both to [`synchronise::synchronise`].

pub mod config;
pub mod contract;
pub mod detect;
pub mod error;
pub mod generate;
pub mod manifest;
pub mod publish;
pub mod synchronise;
