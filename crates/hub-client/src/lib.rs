//! # hub-client
//!
//! Client core for the agent hub.
//!
//! - [`node`]: the [`NodeClient`] facade over direct HTTP or relay transports
//! - [`hub`]: [`HubClient`] for registry records, with an explicit [`HubSession`]
//! - [`dispatch`]: [`Dispatcher`], which resolves, builds, signs and polls runs
//! - [`storage`]: [`StorageProvider`], which saves downloaded files locally
//! - [`signing`]: the consumer's signing key
//!
//! ## Example
//!
//! ```rust,no_run
//! use hub_client::{ConsumerKey, Dispatcher, NodeClient, RunRequest};
//!
//! # async fn example() -> hub_client::Result<()> {
//! let node = NodeClient::from_parts(Some("http://localhost:7001"), None, None)?;
//! let key = ConsumerKey::from_hex(&"11".repeat(32))?;
//! let run = Dispatcher::new(&node, &key)
//!     .run(&RunRequest {
//!         module: "tool:summarizer".into(),
//!         ..RunRequest::default()
//!     })
//!     .await?;
//! println!("{}", run.status);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatch;
pub mod error;
pub mod hub;
pub mod node;
pub mod signing;
pub mod storage;

pub use dispatch::{CreateRequest, DispatchStage, Dispatcher, RunRequest, SubNodes};
pub use error::{ClientError, ErrorKind, Result};
pub use hub::{CredentialPrompt, Credentials, HubClient, HubSession, Registry, SurrealRegistry};
pub use node::{HttpTransport, NodeClient, NodeTransport, PollPolicy, RelayTransport};
pub use signing::ConsumerKey;
pub use storage::{StorageOutcome, StorageProvider};
