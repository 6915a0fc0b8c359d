use std::sync::Mutex;

use adapters::{
    get_channels, AdapterError, Channel, ChannelField, LightningRpc, ListChannelsRequest,
    LndAdapter, LndClient, NodeAdapter, RpcError,
};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Client whose `ListChannels` call returns a canned answer and records its requests.
struct ScriptedLnd {
    answer: Mutex<Option<Result<Option<Value>, RpcError>>>,
    requests: Mutex<Vec<ListChannelsRequest>>,
    has_lightning: bool,
}

impl ScriptedLnd {
    fn answering(answer: Result<Option<Value>, RpcError>) -> Self {
        Self {
            answer: Mutex::new(Some(answer)),
            requests: Mutex::new(Vec::new()),
            has_lightning: true,
        }
    }

    fn with_channels(channels: Vec<Value>) -> Self {
        Self::answering(Ok(Some(json!({ "channels": channels }))))
    }

    fn without_lightning() -> Self {
        Self {
            has_lightning: false,
            ..Self::with_channels(vec![])
        }
    }
}

#[async_trait]
impl LightningRpc for ScriptedLnd {
    async fn list_channels(&self, request: ListChannelsRequest) -> Result<Option<Value>, RpcError> {
        self.requests.lock().unwrap().push(request);
        self.answer
            .lock()
            .unwrap()
            .take()
            .expect("list_channels called more than once")
    }
}

impl LndClient for ScriptedLnd {
    fn lightning(&self) -> Option<&dyn LightningRpc> {
        if self.has_lightning {
            Some(self)
        } else {
            None
        }
    }
}

fn raw_channel() -> Value {
    json!({
        "active": true,
        "capacity": "500000",
        "chan_id": "123456",
        "channel_point": "deadbeef:1",
        "commit_fee": "1000",
        "commit_weight": "600",
        "fee_per_kw": "253",
        "local_balance": "250000",
        "num_updates": "3",
        "pending_htlcs": [],
        "remote_balance": "250000",
        "remote_pubkey": "02abc...",
        "total_satoshis_received": "5000",
        "total_satoshis_sent": "10000",
        "unsettled_balance": "0"
    })
}

fn raw_channel_with_id(id: &str) -> Value {
    let mut channel = raw_channel();
    channel["chan_id"] = json!(id);
    channel
}

async fn fetch(lnd: &ScriptedLnd) -> Result<adapters::Channels, AdapterError> {
    get_channels(Some(lnd as &dyn LndClient)).await
}

#[tokio::test]
async fn normalizes_channel_listing() {
    let lnd = ScriptedLnd::with_channels(vec![raw_channel()]);

    let channels = fetch(&lnd).await.unwrap();

    assert_eq!(
        channels.channels,
        vec![Channel {
            capacity: 500000,
            commit_transaction_fee: 1000,
            commit_transaction_weight: 600,
            id: "123456".to_string(),
            is_active: true,
            is_closing: false,
            is_opening: false,
            local_balance: 250000,
            partner_public_key: "02abc...".to_string(),
            received: 5000,
            remote_balance: 250000,
            sent: 10000,
            transaction_id: "deadbeef".to_string(),
            transaction_vout: 1,
            transfers_count: 3,
            unsettled_balance: 0,
        }]
    );
    assert_eq!(
        serde_json::to_value(&channels).unwrap()["channels"][0]["transaction_vout"],
        json!(1)
    );
}

#[tokio::test]
async fn sends_an_unfiltered_request() {
    let lnd = ScriptedLnd::with_channels(vec![]);

    let channels = fetch(&lnd).await.unwrap();

    assert!(channels.is_empty());
    assert_eq!(
        *lnd.requests.lock().unwrap(),
        vec![ListChannelsRequest::default()]
    );
}

#[tokio::test]
async fn preserves_order_and_length() {
    let ids = ["9", "3", "7", "1", "5"];
    let lnd = ScriptedLnd::with_channels(ids.iter().map(|id| raw_channel_with_id(id)).collect());

    let channels = fetch(&lnd).await.unwrap();

    let mapped: Vec<_> = channels.channels.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(mapped, ids);
}

#[tokio::test]
async fn missing_client_is_invalid_argument() {
    let err = get_channels(None).await.unwrap_err();
    assert!(matches!(err, AdapterError::InvalidArgument { .. }));
    assert_eq!(err.code(), 500);
    assert_eq!(err.reason(), "ExpectedLnd");

    let lnd = ScriptedLnd::without_lightning();
    let err = fetch(&lnd).await.unwrap_err();
    assert_eq!(err.code(), 500);
    assert_eq!(err.reason(), "ExpectedLnd");
    assert!(lnd.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rpc_failure_is_wrapped_with_partial_response() {
    let partial = json!({ "channels": [raw_channel()] });
    let lnd = ScriptedLnd::answering(Err(
        RpcError::new("unavailable: connection refused").with_response(partial.clone())
    ));

    let err = fetch(&lnd).await.unwrap_err();

    assert_eq!(err.code(), 503);
    assert_eq!(err.reason(), "GetChannelsErr");
    assert_eq!(err.payload(), Some(&partial));
    match err {
        AdapterError::Upstream {
            source: Some(source),
            ..
        } => assert_eq!(source.to_string(), "rpc call failed: unavailable: connection refused"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_envelope_is_rejected() {
    for response in [
        None,
        Some(json!({})),
        Some(json!({ "channels": null })),
        Some(json!({ "channels": { "0": raw_channel() } })),
        Some(json!([raw_channel()])),
    ] {
        let lnd = ScriptedLnd::answering(Ok(response.clone()));

        let err = fetch(&lnd).await.unwrap_err();

        assert_eq!(err.code(), 503);
        assert_eq!(err.reason(), "ExpectedChannelsArray", "{response:?}");
        assert_eq!(err.payload(), response.as_ref());
    }
}

#[tokio::test]
async fn each_missing_field_is_named() {
    for field in ChannelField::ALL {
        let mut channel = raw_channel();
        channel.as_object_mut().unwrap().remove(field.name());
        let lnd = ScriptedLnd::with_channels(vec![channel.clone()]);

        let err = fetch(&lnd).await.unwrap_err();

        assert_eq!(err.code(), 503);
        assert_eq!(err.reason(), field.reason());
        match err {
            AdapterError::Validation {
                field: missing,
                channel: offending,
            } => {
                assert_eq!(missing, field);
                assert_eq!(offending, channel);
            }
            other => panic!("unexpected error for {field}: {other:?}"),
        }
    }
}

#[tokio::test]
async fn stops_at_first_invalid_record() {
    let mut first_bad = raw_channel_with_id("2");
    first_bad.as_object_mut().unwrap().remove("active");
    let mut second_bad = raw_channel_with_id("3");
    second_bad.as_object_mut().unwrap().remove("capacity");

    let lnd = ScriptedLnd::with_channels(vec![raw_channel_with_id("1"), first_bad.clone(), second_bad]);

    let err = fetch(&lnd).await.unwrap_err();

    assert_eq!(err.reason(), "ExpectedChannelActiveState");
    assert_eq!(err.payload(), Some(&first_bad));
}

#[tokio::test]
async fn adapter_delegates_to_normalizer() {
    let adapter = LndAdapter::new(ScriptedLnd::with_channels(vec![
        raw_channel_with_id("1"),
        raw_channel_with_id("2"),
    ]));

    let channels = adapter.get_channels().await.unwrap();

    assert_eq!(channels.len(), 2);
    assert_eq!(channels.total_capacity(), 1_000_000);
    assert_eq!(adapter.client().requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn adapter_is_usable_as_trait_object() {
    let adapter: Box<dyn NodeAdapter> = Box::new(LndAdapter::new(ScriptedLnd::without_lightning()));

    let err = adapter.get_channels().await.unwrap_err();

    assert_eq!(err.reason(), "ExpectedLnd");
}
