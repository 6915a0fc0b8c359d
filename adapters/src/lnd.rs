//! LND-specific adapter implementation for Lightning Network node interactions.
//!
//! This file contains the concrete implementation of the `NodeAdapter` trait for LND
//! and the conversion of LND's `ListChannels` response into [`Channel`] records.
//!
//! LND's JSON encoding is loose: 64-bit integers arrive as strings or numbers
//! depending on the transport, and a field may be left out entirely. Raw records
//! are therefore read into `RawChannel`, where every field is optional and a
//! value of the wrong type counts as absent, and only then converted.

use async_trait::async_trait;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::errors::{AdapterError, ChannelField};
use crate::models::{Channel, Channels};
use crate::{ListChannelsRequest, LndClient, NodeAdapter};

const EXPECTED_LND: &str = "ExpectedLnd";
const GET_CHANNELS_ERR: &str = "GetChannelsErr";
const EXPECTED_CHANNELS_ARRAY: &str = "ExpectedChannelsArray";

/// Lists the node's open channels.
///
/// Fails on the first record missing a required field; no partial listing is returned.
pub async fn get_channels(lnd: Option<&dyn LndClient>) -> Result<Channels, AdapterError> {
    let rpc = lnd
        .and_then(|lnd| lnd.lightning())
        .ok_or(AdapterError::InvalidArgument {
            reason: EXPECTED_LND,
        })?;

    let response = rpc
        .list_channels(ListChannelsRequest::default())
        .await
        .map_err(|mut err| AdapterError::Upstream {
            reason: GET_CHANNELS_ERR,
            response: err.take_response(),
            source: Some(err),
        })?;

    let raw_channels = channels_array(response)?;
    debug!(count = raw_channels.len(), "listed lnd channels");

    let channels = raw_channels
        .iter()
        .map(to_channel)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Channels { channels })
}

fn channels_array(mut response: Option<Value>) -> Result<Vec<Value>, AdapterError> {
    if let Some(Value::Array(channels)) = response.as_mut().and_then(|r| r.get_mut("channels")) {
        return Ok(std::mem::take(channels));
    }

    Err(AdapterError::Upstream {
        reason: EXPECTED_CHANNELS_ARRAY,
        source: None,
        response,
    })
}

/// Converts one raw record. Presence of every field is checked, in order,
/// before any value is parsed.
fn to_channel(channel: &Value) -> Result<Channel, AdapterError> {
    let raw = RawChannel::deserialize(channel).unwrap_or_default();
    let missing = |field: ChannelField| AdapterError::validation(field, channel);

    if raw.pending_htlcs.is_none() {
        return Err(missing(ChannelField::PendingHtlcs));
    }
    let is_active = raw.active.ok_or_else(|| missing(ChannelField::Active))?;
    let partner_public_key = raw
        .remote_pubkey
        .filter(|key| !key.is_empty())
        .ok_or_else(|| missing(ChannelField::RemotePubkey))?;
    let channel_point = raw
        .channel_point
        .filter(|point| !point.is_empty())
        .ok_or_else(|| missing(ChannelField::ChannelPoint))?;
    let id = raw
        .chan_id
        .and_then(RawId::into_id)
        .ok_or_else(|| missing(ChannelField::ChanId))?;

    let capacity = raw.capacity.ok_or_else(|| missing(ChannelField::Capacity))?;
    let local_balance = raw
        .local_balance
        .ok_or_else(|| missing(ChannelField::LocalBalance))?;
    let remote_balance = raw
        .remote_balance
        .ok_or_else(|| missing(ChannelField::RemoteBalance))?;
    let commit_fee = raw
        .commit_fee
        .ok_or_else(|| missing(ChannelField::CommitFee))?;
    let commit_weight = raw
        .commit_weight
        .ok_or_else(|| missing(ChannelField::CommitWeight))?;
    let fee_per_kw = raw
        .fee_per_kw
        .ok_or_else(|| missing(ChannelField::FeePerKw))?;
    let unsettled_balance = raw
        .unsettled_balance
        .ok_or_else(|| missing(ChannelField::UnsettledBalance))?;
    let sent = raw
        .total_satoshis_sent
        .ok_or_else(|| missing(ChannelField::TotalSatoshisSent))?;
    let received = raw
        .total_satoshis_received
        .ok_or_else(|| missing(ChannelField::TotalSatoshisReceived))?;
    let transfers_count = raw
        .num_updates
        .ok_or_else(|| missing(ChannelField::NumUpdates))?;

    let int = |value: RawInteger, field: ChannelField| value.parse().ok_or_else(|| missing(field));

    // Not part of the record, but a listing without it is malformed.
    int(fee_per_kw, ChannelField::FeePerKw)?;

    let (transaction_id, vout) = channel_point
        .split_once(':')
        .ok_or_else(|| missing(ChannelField::ChannelPoint))?;
    let transaction_vout = vout
        .parse::<u32>()
        .map_err(|_| missing(ChannelField::ChannelPoint))?;

    let mapped = Channel {
        capacity: int(capacity, ChannelField::Capacity)?,
        commit_transaction_fee: int(commit_fee, ChannelField::CommitFee)?,
        commit_transaction_weight: int(commit_weight, ChannelField::CommitWeight)?,
        id,
        is_active,
        is_closing: false,
        is_opening: false,
        local_balance: int(local_balance, ChannelField::LocalBalance)?,
        partner_public_key,
        received: int(received, ChannelField::TotalSatoshisReceived)?,
        remote_balance: int(remote_balance, ChannelField::RemoteBalance)?,
        sent: int(sent, ChannelField::TotalSatoshisSent)?,
        transaction_id: transaction_id.to_string(),
        transaction_vout,
        transfers_count: int(transfers_count, ChannelField::NumUpdates)?,
        unsettled_balance: int(unsettled_balance, ChannelField::UnsettledBalance)?,
    };

    trace!(id = %mapped.id, capacity = mapped.capacity, "mapped lnd channel");
    Ok(mapped)
}

/// A channel record as LND reports it, before validation.
#[derive(Debug, Default, Deserialize)]
struct RawChannel {
    #[serde(default, deserialize_with = "lenient")]
    pending_htlcs: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    active: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    remote_pubkey: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    channel_point: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    chan_id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    capacity: Option<RawInteger>,
    #[serde(default, deserialize_with = "lenient")]
    local_balance: Option<RawInteger>,
    #[serde(default, deserialize_with = "lenient")]
    remote_balance: Option<RawInteger>,
    #[serde(default, deserialize_with = "lenient")]
    commit_fee: Option<RawInteger>,
    #[serde(default, deserialize_with = "lenient")]
    commit_weight: Option<RawInteger>,
    #[serde(default, deserialize_with = "lenient")]
    fee_per_kw: Option<RawInteger>,
    #[serde(default, deserialize_with = "lenient")]
    unsettled_balance: Option<RawInteger>,
    #[serde(default, deserialize_with = "lenient")]
    total_satoshis_sent: Option<RawInteger>,
    #[serde(default, deserialize_with = "lenient")]
    total_satoshis_received: Option<RawInteger>,
    #[serde(default, deserialize_with = "lenient")]
    num_updates: Option<RawInteger>,
}

/// Reads a field, treating a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A 64-bit integer, encoded as a JSON number or a decimal string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInteger {
    Number(u64),
    Text(String),
}

impl RawInteger {
    fn parse(self) -> Option<u64> {
        match self {
            RawInteger::Number(n) => Some(n),
            RawInteger::Text(s) => s.parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    /// Empty strings and zero are not valid channel ids.
    fn into_id(self) -> Option<String> {
        match self {
            RawId::Number(0) => None,
            RawId::Number(n) => Some(n.to_string()),
            RawId::Text(s) if s.is_empty() => None,
            RawId::Text(s) => Some(s),
        }
    }
}

/// [`NodeAdapter`] backed by an LND client.
pub struct LndAdapter<C> {
    client: C,
}

impl<C: LndClient> LndAdapter<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: LndClient> NodeAdapter for LndAdapter<C> {
    async fn get_channels(&self) -> Result<Channels, AdapterError> {
        get_channels(Some(&self.client as &dyn LndClient)).await
    }
}
