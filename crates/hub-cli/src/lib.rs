//! # hub-cli
//!
//! Command-line interface for the agent hub.
//!
//! This crate provides the `hub` binary:
//!
//! - Browse and register modules in the hub registry (`agents`, `tools`, ...)
//! - List registered nodes and servers (`nodes`)
//! - Install and run modules on a node (`create`, `run`)
//! - Talk to a node's model and storage (`inference`, `storage`)
//! - Create an account and publish manifests (`signup`, `publish`)
//!
//! ## Example
//!
//! ```bash
//! # List agents registered with the hub
//! hub agents
//!
//! # Run an agent on the configured node
//! hub run hello_world -p "firstname=Ada surname=Lovelace"
//!
//! # Download a file from node storage
//! hub storage fs read runs/42/report.txt --output ./downloads
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use error::CliError;
