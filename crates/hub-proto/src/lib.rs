//! # hub-proto
//!
//! Data model shared by the agent hub client and CLI.
//!
//! - [`NodeAddress`]: how a node is reached (direct HTTP or relay)
//! - [`ModuleKind`] / [`ModuleIdentifier`]: what is being run
//! - [`ModuleDeployment`] / [`RunInput`] / [`Run`]: what is sent to a node
//! - [`StorageRequest`] / [`StorageResult`]: node storage operations
//! - [`ModuleRecord`], [`NodeRecord`], ...: hub registry records

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod deployment;
pub mod error;
pub mod inference;
pub mod module;
pub mod records;
pub mod run;
pub mod storage;
pub mod user;

pub use address::NodeAddress;
pub use deployment::{AgentDeployment, Deployment, ModuleDeployment, OrchestratorDeployment};
pub use error::ProtoError;
pub use inference::{ChatCompletionRequest, ChatMessage};
pub use module::{ModuleIdentifier, ModuleKind, ModuleRecord, ModuleRef};
pub use records::{AuctionRecord, NodeRecord, ServerRecord, UserRecord};
pub use run::{Run, RunInput, RunStatus};
pub use storage::{
    CreateContent, StorageOperation, StorageOptions, StoragePayload, StorageRequest,
    StorageResult, StorageType,
};
pub use user::{NodeUser, UserInput};
