//! Generic data models for the `adapters` crate.
//!
//! These models are the backend-agnostic shape of Lightning entities handed to
//! the rest of NodeGaze, independent of which node implementation produced them.

use std::str::FromStr;

use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AdapterError, ChannelField};

/// An open channel as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub capacity: u64,
    pub commit_transaction_fee: u64,
    pub commit_transaction_weight: u64,
    pub id: String,
    pub is_active: bool,
    /// Always false for channels from a channel listing; closing channels come from a separate call.
    pub is_closing: bool,
    /// Always false for channels from a channel listing; pending opens come from a separate call.
    pub is_opening: bool,
    pub local_balance: u64,
    pub partner_public_key: String,
    pub received: u64,
    pub remote_balance: u64,
    pub sent: u64,
    pub transaction_id: String,
    pub transaction_vout: u32,
    pub transfers_count: u64,
    pub unsettled_balance: u64,
}

impl Channel {
    /// Parses the partner key as a secp256k1 public key.
    pub fn partner_node_id(&self) -> Result<PublicKey, AdapterError> {
        PublicKey::from_str(&self.partner_public_key)
            .map_err(|_| self.malformed(ChannelField::RemotePubkey))
    }

    /// Decodes the funding transaction id, in the byte order it is displayed in.
    pub fn funding_txid(&self) -> Result<[u8; 32], AdapterError> {
        let bytes = hex::decode(&self.transaction_id)
            .map_err(|_| self.malformed(ChannelField::ChannelPoint))?;

        bytes
            .try_into()
            .map_err(|_| self.malformed(ChannelField::ChannelPoint))
    }

    fn malformed(&self, field: ChannelField) -> AdapterError {
        AdapterError::Validation {
            field,
            channel: serde_json::to_value(self).unwrap_or(Value::Null),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channels {
    pub channels: Vec<Channel>,
}

impl Channels {
    pub fn total_capacity(&self) -> u64 {
        self.channels.iter().map(|c| c.capacity).sum()
    }

    pub fn active(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.is_active)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
