//! Custom error types specific to the `adapters` crate.
//!
//! Every failure surfaced by an adapter carries a numeric class (500 for a
//! misused adapter, 503 for anything the node got wrong), a symbolic reason
//! string and, where one exists, the raw payload that triggered it.

use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Class for errors caused by the caller.
pub const INVALID_ARGUMENT_CODE: u16 = 500;
/// Class for errors caused by the node or its response.
pub const UPSTREAM_CODE: u16 = 503;

/// Error returned by an RPC client when a call fails.
///
/// Some transports hand back whatever they managed to read before failing,
/// so a partial response may ride along with the cause.
#[derive(Debug)]
pub struct RpcError {
    source: Box<dyn StdError + Send + Sync>,
    response: Option<Value>,
}

impl RpcError {
    pub fn new<E>(source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self {
            source: source.into(),
            response: None,
        }
    }

    /// Attaches the partial response returned alongside the failure.
    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    pub(crate) fn take_response(&mut self) -> Option<Value> {
        self.response.take()
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc call failed: {}", self.source)
    }
}

impl StdError for RpcError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Required fields of a raw LND channel record, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelField {
    PendingHtlcs,
    Active,
    RemotePubkey,
    ChannelPoint,
    ChanId,
    Capacity,
    LocalBalance,
    RemoteBalance,
    CommitFee,
    CommitWeight,
    FeePerKw,
    UnsettledBalance,
    TotalSatoshisSent,
    TotalSatoshisReceived,
    NumUpdates,
}

impl ChannelField {
    pub const ALL: [ChannelField; 15] = [
        ChannelField::PendingHtlcs,
        ChannelField::Active,
        ChannelField::RemotePubkey,
        ChannelField::ChannelPoint,
        ChannelField::ChanId,
        ChannelField::Capacity,
        ChannelField::LocalBalance,
        ChannelField::RemoteBalance,
        ChannelField::CommitFee,
        ChannelField::CommitWeight,
        ChannelField::FeePerKw,
        ChannelField::UnsettledBalance,
        ChannelField::TotalSatoshisSent,
        ChannelField::TotalSatoshisReceived,
        ChannelField::NumUpdates,
    ];

    /// Key of the field in the raw LND response.
    pub fn name(self) -> &'static str {
        match self {
            ChannelField::PendingHtlcs => "pending_htlcs",
            ChannelField::Active => "active",
            ChannelField::RemotePubkey => "remote_pubkey",
            ChannelField::ChannelPoint => "channel_point",
            ChannelField::ChanId => "chan_id",
            ChannelField::Capacity => "capacity",
            ChannelField::LocalBalance => "local_balance",
            ChannelField::RemoteBalance => "remote_balance",
            ChannelField::CommitFee => "commit_fee",
            ChannelField::CommitWeight => "commit_weight",
            ChannelField::FeePerKw => "fee_per_kw",
            ChannelField::UnsettledBalance => "unsettled_balance",
            ChannelField::TotalSatoshisSent => "total_satoshis_sent",
            ChannelField::TotalSatoshisReceived => "total_satoshis_received",
            ChannelField::NumUpdates => "num_updates",
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            ChannelField::PendingHtlcs => "ExpectedPendingHtlcs",
            ChannelField::Active => "ExpectedChannelActiveState",
            ChannelField::RemotePubkey => "ExpectedRemotePubkey",
            ChannelField::ChannelPoint => "ExpectedChannelPoint",
            ChannelField::ChanId => "ExpectedChanId",
            ChannelField::Capacity => "ExpectedChannelCapacity",
            ChannelField::LocalBalance => "ExpectedLocalBalance",
            ChannelField::RemoteBalance => "ExpectedRemoteBalance",
            ChannelField::CommitFee => "ExpectedCommitFee",
            ChannelField::CommitWeight => "ExpectedCommitWeight",
            ChannelField::FeePerKw => "ExpectedFeePerKw",
            ChannelField::UnsettledBalance => "ExpectedUnsettledBalance",
            ChannelField::TotalSatoshisSent => "ExpectedTotalSatoshisSent",
            ChannelField::TotalSatoshisReceived => "ExpectedTotalSatoshisReceived",
            ChannelField::NumUpdates => "ExpectedNumUpdates",
        }
    }
}

impl fmt::Display for ChannelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The adapter was invoked without a usable client.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: &'static str },

    /// The node failed the call or answered with a malformed envelope.
    #[error("upstream error: {reason}")]
    Upstream {
        reason: &'static str,
        #[source]
        source: Option<RpcError>,
        response: Option<Value>,
    },

    /// A record in the node's response is missing a required field.
    #[error("invalid channel record: {} ({field} missing or malformed)", field.reason())]
    Validation { field: ChannelField, channel: Value },
}

impl AdapterError {
    pub fn code(&self) -> u16 {
        match self {
            AdapterError::InvalidArgument { .. } => INVALID_ARGUMENT_CODE,
            AdapterError::Upstream { .. } | AdapterError::Validation { .. } => UPSTREAM_CODE,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            AdapterError::InvalidArgument { reason } | AdapterError::Upstream { reason, .. } => {
                reason
            }
            AdapterError::Validation { field, .. } => field.reason(),
        }
    }

    /// Raw payload attached for diagnosis: the offending record or the node's response.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            AdapterError::InvalidArgument { .. } => None,
            AdapterError::Upstream { response, .. } => response.as_ref(),
            AdapterError::Validation { channel, .. } => Some(channel),
        }
    }

    pub(crate) fn validation(field: ChannelField, channel: &Value) -> Self {
        AdapterError::Validation {
            field,
            channel: channel.clone(),
        }
    }
}
