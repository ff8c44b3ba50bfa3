//! Resolver arena - dual-candidate issue resolution with idempotent publication
//!
//! This crate provides the core functionality for the `arena` CLI tool.
//!
//! # Architecture
//!
//! - [`select`] - Random model pair selection
//! - [`resolve`] - Resolution output building (issue source, agent attempt)
//! - [`ledger`] - Append-only JSONL ledger of resolution records
//! - [`publish`] - Remote publication (keyed overwrite, collection append)
//! - [`merge`] - Pairing two records into a comparison record
//! - [`pipeline`] - One issue, two models, ledger first, then publish
//! - [`model`] - Data types (`IssueRef`, `ResolutionRecord`, `ComparisonRecord`)
//! - [`config`] - Configuration management
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod publish;
pub mod resolve;
pub mod select;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
