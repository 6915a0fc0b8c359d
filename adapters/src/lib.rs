//! Core `adapters` crate for abstracting Lightning Network node interactions.
//!
//! This crate defines the `NodeAdapter` trait, which outlines generic functionalities
//! for interacting with Lightning nodes, the RPC capability a node client must expose,
//! and the LND implementation that turns raw RPC responses into [`models`] records.

pub mod errors;
pub mod lnd;
pub mod models;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use errors::{AdapterError, ChannelField, RpcError};
pub use lnd::{get_channels, LndAdapter};
pub use models::{Channel, Channels};

/// Filters accepted by LND's `ListChannels` call. The default is an unfiltered listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListChannelsRequest {
    pub active_only: bool,
    pub inactive_only: bool,
    pub public_only: bool,
    pub private_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
}

/// The `Lightning` service of an LND client.
#[async_trait]
pub trait LightningRpc: Send + Sync {
    /// Lists open channels. `Ok(None)` means the node answered without a body.
    async fn list_channels(&self, request: ListChannelsRequest) -> Result<Option<Value>, RpcError>;
}

/// A connected LND client.
pub trait LndClient: Send + Sync {
    /// The `Lightning` service, if the client exposes it.
    fn lightning(&self) -> Option<&dyn LightningRpc>;
}

/// Node operations NodeGaze needs, independent of the node implementation.
#[async_trait]
pub trait NodeAdapter: Send + Sync {
    async fn get_channels(&self) -> Result<Channels, AdapterError>;
}
