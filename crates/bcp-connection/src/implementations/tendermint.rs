//! Tendermint JSON-RPC transport.
//!
//! Speaks JSON-RPC 2.0 over HTTP to a node. Subscriptions are served by
//! polling: each subscription remembers the last height it looked at and
//! searches the newly committed range on every tick.

use crate::tags::to_query_string;
use crate::{
	BroadcastResponse, ChainStatus, HeightReceiver, QueryModel, TransportError, TransportFactory,
	TransportInterface, TransportQuery, TransportRegistry, TransportSubscriptionId, TxEventReceiver,
	TxResponse, TxResult,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bcp_codec::models::decode_result_set;
use bcp_types::{
	ChainId, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, TransactionId,
	ValidationError,
};
use parking_lot::Mutex;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Results requested per `tx_search` page.
const SEARCH_PAGE_SIZE: u64 = 100;

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
	jsonrpc: &'static str,
	method: &'a str,
	params: serde_json::Value,
	id: u64,
}

/// JSON-RPC 2.0 response envelope. Exactly one of the fields is set.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
	result: Option<serde_json::Value>,
	error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
	code: i64,
	message: String,
	#[serde(default)]
	data: Option<serde_json::Value>,
}

/// Tendermint encodes 64-bit integers as strings; older nodes used numbers.
fn u64_from_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Text(String),
		Number(u64),
	}

	match Raw::deserialize(deserializer)? {
		Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
		Raw::Number(number) => Ok(number),
	}
}

#[derive(Debug, Deserialize)]
struct StatusResult {
	node_info: NodeInfo,
	sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
	network: String,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
	#[serde(deserialize_with = "u64_from_string")]
	latest_block_height: u64,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResult {
	response: AbciQueryResponse,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResponse {
	#[serde(default)]
	code: u32,
	#[serde(default)]
	log: String,
	#[serde(default)]
	key: Option<String>,
	#[serde(default)]
	value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BroadcastResult {
	#[serde(default)]
	code: u32,
	#[serde(default)]
	log: String,
	hash: String,
}

#[derive(Debug, Deserialize)]
struct TxSearchResult {
	txs: Vec<TxSearchItem>,
	#[serde(deserialize_with = "u64_from_string")]
	total_count: u64,
}

#[derive(Debug, Deserialize)]
struct TxSearchItem {
	hash: String,
	#[serde(deserialize_with = "u64_from_string")]
	height: u64,
	#[serde(default)]
	index: u32,
	tx: String,
	tx_result: TxResultJson,
}

#[derive(Debug, Deserialize)]
struct TxResultJson {
	#[serde(default)]
	code: u32,
	#[serde(default)]
	data: Option<String>,
	#[serde(default)]
	log: Option<String>,
}

fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>, TransportError> {
	STANDARD
		.decode(value)
		.map_err(|e| TransportError::InvalidResponse(format!("{} is not base64: {}", field, e)))
}

impl TxSearchItem {
	fn into_response(self) -> Result<TxResponse, TransportError> {
		let data = match self.tx_result.data.as_deref() {
			Some(data) => decode_base64("tx_result.data", data)?,
			None => Vec::new(),
		};
		Ok(TxResponse {
			hash: TransactionId::new(&self.hash),
			height: self.height,
			index: self.index,
			tx: decode_base64("tx", &self.tx)?,
			result: TxResult {
				code: self.tx_result.code,
				log: self.tx_result.log.filter(|log| !log.is_empty()),
				data,
			},
		})
	}
}

/// Splits the result sets of an abci query into key/value models.
fn decode_query_models(response: AbciQueryResponse) -> Result<Vec<QueryModel>, TransportError> {
	let value = match response.value.as_deref() {
		Some(value) if !value.is_empty() => decode_base64("response.value", value)?,
		_ => return Ok(Vec::new()),
	};
	let key = decode_base64("response.key", response.key.as_deref().unwrap_or_default())?;

	let invalid = |e: bcp_codec::CodecError| TransportError::InvalidResponse(e.to_string());
	let keys = decode_result_set(&key).map_err(invalid)?;
	let values = decode_result_set(&value).map_err(invalid)?;
	if keys.len() != values.len() {
		return Err(TransportError::InvalidResponse(format!(
			"query returned {} keys for {} values",
			keys.len(),
			values.len()
		)));
	}

	Ok(keys
		.into_iter()
		.zip(values)
		.map(|(key, value)| QueryModel { key, value })
		.collect())
}

/// Shared JSON-RPC client, cloned into polling tasks.
#[derive(Clone)]
struct RpcClient {
	client: Client,
	url: String,
	next_id: Arc<AtomicU64>,
}

impl RpcClient {
	/// Sanitizes network errors so node addresses do not end up in logs.
	fn sanitize_network_error(error: &reqwest::Error) -> String {
		if error.is_connect() {
			"connection refused or unreachable".to_string()
		} else if error.is_timeout() {
			"connection timed out".to_string()
		} else if error.is_decode() {
			"response decode error".to_string()
		} else {
			"network error".to_string()
		}
	}

	async fn call<T: DeserializeOwned>(
		&self,
		method: &str,
		params: serde_json::Value,
	) -> Result<T, TransportError> {
		let request = JsonRpcRequest {
			jsonrpc: "2.0",
			method,
			params,
			id: self.next_id.fetch_add(1, Ordering::Relaxed),
		};

		let response = self
			.client
			.post(&self.url)
			.json(&request)
			.send()
			.await
			.map_err(|e| TransportError::Connection(Self::sanitize_network_error(&e)))?;
		let envelope: JsonRpcResponse = response
			.json()
			.await
			.map_err(|e| TransportError::InvalidResponse(Self::sanitize_network_error(&e)))?;

		if let Some(error) = envelope.error {
			let detail = error.data.map(|d| format!(" ({})", d)).unwrap_or_default();
			return Err(TransportError::Request(format!(
				"{} failed with code {}: {}{}",
				method, error.code, error.message, detail
			)));
		}
		let result = envelope
			.result
			.ok_or_else(|| TransportError::InvalidResponse(format!("{} returned no result", method)))?;
		serde_json::from_value(result)
			.map_err(|e| TransportError::InvalidResponse(format!("{}: {}", method, e)))
	}

	async fn status(&self) -> Result<ChainStatus, TransportError> {
		let status: StatusResult = self.call("status", serde_json::json!({})).await?;
		Ok(ChainStatus {
			chain_id: ChainId::new(status.node_info.network),
			height: status.sync_info.latest_block_height,
		})
	}

	/// Collects every page of a search.
	async fn tx_search(&self, query: &TransportQuery) -> Result<Vec<TxResponse>, TransportError> {
		let query_string = to_query_string(query);
		let mut responses = Vec::new();
		let mut page = 1u64;

		loop {
			let result: TxSearchResult = self
				.call(
					"tx_search",
					serde_json::json!({
						"query": query_string,
						"prove": false,
						"page": page.to_string(),
						"per_page": SEARCH_PAGE_SIZE.to_string(),
						"order_by": "asc",
					}),
				)
				.await?;

			let received = result.txs.len() as u64;
			for item in result.txs {
				responses.push(item.into_response()?);
			}
			if received == 0 || responses.len() as u64 >= result.total_count {
				break;
			}
			page += 1;
		}

		Ok(responses)
	}
}

/// Transport talking to a Tendermint node over HTTP.
pub struct TendermintTransport {
	rpc: RpcClient,
	poll_interval: Duration,
	next_subscription: AtomicU64,
	/// Stop signals of running polling loops.
	stop_signals: Arc<Mutex<HashMap<TransportSubscriptionId, mpsc::Sender<()>>>>,
	closed: AtomicBool,
}

impl TendermintTransport {
	pub fn new(url: &str, poll_interval: Duration) -> Result<Self, TransportError> {
		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return Err(TransportError::Config(format!(
				"url must start with http:// or https://, got {}",
				url
			)));
		}

		let client = ClientBuilder::new()
			.connect_timeout(Duration::from_secs(5))
			.timeout(Duration::from_secs(30))
			.pool_idle_timeout(Duration::from_secs(30))
			.tcp_nodelay(true)
			.build()
			.map_err(|e| {
				tracing::error!(error = %e, "failed to build http client");
				TransportError::Connection(format!("HTTP client build failed: {e}"))
			})?;

		Ok(Self {
			rpc: RpcClient {
				client,
				url: url.to_string(),
				next_id: Arc::new(AtomicU64::new(1)),
			},
			poll_interval,
			next_subscription: AtomicU64::new(1),
			stop_signals: Arc::new(Mutex::new(HashMap::new())),
			closed: AtomicBool::new(false),
		})
	}

	fn ensure_open(&self) -> Result<(), TransportError> {
		if self.closed.load(Ordering::SeqCst) {
			Err(TransportError::Closed)
		} else {
			Ok(())
		}
	}

	fn register(&self) -> (TransportSubscriptionId, mpsc::Receiver<()>) {
		let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
		let (stop_tx, stop_rx) = mpsc::channel(1);
		self.stop_signals.lock().insert(id, stop_tx);
		(id, stop_rx)
	}

	/// Searches every newly committed block range for `query`.
	async fn tx_polling_loop(
		rpc: RpcClient,
		query: TransportQuery,
		mut last_height: u64,
		sender: mpsc::UnboundedSender<TxResponse>,
		mut stop_rx: mpsc::Receiver<()>,
		poll_interval: Duration,
	) {
		let mut interval = tokio::time::interval(poll_interval);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
		interval.tick().await;

		loop {
			tokio::select! {
				_ = interval.tick() => {
					let current = match rpc.status().await {
						Ok(status) => status.height,
						Err(e) => {
							tracing::error!("Failed to get block height: {}", e);
							continue;
						}
					};
					if current <= last_height {
						continue;
					}

					let mut range = query.clone();
					range.min_height = Some(range.min_height.map_or(last_height + 1, |min| min.max(last_height + 1)));
					range.max_height = Some(range.max_height.map_or(current, |max| max.min(current)));

					if range.min_height <= range.max_height {
						let mut responses = match rpc.tx_search(&range).await {
							Ok(responses) => responses,
							Err(e) => {
								tracing::error!("Failed to search new transactions: {}", e);
								continue;
							}
						};
						responses.sort_by_key(|r| (r.height, r.index));
						for response in responses {
							if sender.send(response).is_err() {
								return;
							}
						}
					}
					last_height = current;
				}
				_ = stop_rx.recv() => {
					tracing::debug!("Stopping transaction polling");
					break;
				}
			}
		}
	}

	async fn height_polling_loop(
		rpc: RpcClient,
		mut last_height: u64,
		sender: mpsc::UnboundedSender<u64>,
		mut stop_rx: mpsc::Receiver<()>,
		poll_interval: Duration,
	) {
		let mut interval = tokio::time::interval(poll_interval);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
		interval.tick().await;

		loop {
			tokio::select! {
				_ = interval.tick() => {
					let current = match rpc.status().await {
						Ok(status) => status.height,
						Err(e) => {
							tracing::error!("Failed to get block height: {}", e);
							continue;
						}
					};
					for height in (last_height + 1)..=current {
						if sender.send(height).is_err() {
							return;
						}
					}
					last_height = last_height.max(current);
				}
				_ = stop_rx.recv() => {
					tracing::debug!("Stopping height polling");
					break;
				}
			}
		}
	}
}

#[async_trait]
impl TransportInterface for TendermintTransport {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(TendermintTransportSchema)
	}

	async fn status(&self) -> Result<ChainStatus, TransportError> {
		self.ensure_open()?;
		self.rpc.status().await
	}

	async fn abci_query(&self, path: &str, data: &[u8]) -> Result<Vec<QueryModel>, TransportError> {
		self.ensure_open()?;
		let result: AbciQueryResult = self
			.rpc
			.call(
				"abci_query",
				serde_json::json!({
					"path": path,
					"data": hex::encode(data),
					"prove": false,
				}),
			)
			.await?;

		if result.response.code != 0 {
			return Err(TransportError::Request(format!(
				"query {} failed with code {}: {}",
				path, result.response.code, result.response.log
			)));
		}
		decode_query_models(result.response)
	}

	async fn broadcast_tx_sync(&self, tx: &[u8]) -> Result<BroadcastResponse, TransportError> {
		self.ensure_open()?;
		let result: BroadcastResult = self
			.rpc
			.call("broadcast_tx_sync", serde_json::json!({ "tx": STANDARD.encode(tx) }))
			.await?;
		Ok(BroadcastResponse {
			hash: TransactionId::new(&result.hash),
			code: result.code,
			log: result.log,
		})
	}

	async fn tx_search(&self, query: &TransportQuery) -> Result<Vec<TxResponse>, TransportError> {
		self.ensure_open()?;
		self.rpc.tx_search(query).await
	}

	async fn subscribe_txs(
		&self,
		query: &TransportQuery,
	) -> Result<(TransportSubscriptionId, TxEventReceiver), TransportError> {
		self.ensure_open()?;
		let start = self.rpc.status().await?.height;
		let (id, stop_rx) = self.register();
		let (sender, receiver) = mpsc::unbounded_channel();

		tokio::spawn(Self::tx_polling_loop(
			self.rpc.clone(),
			query.clone(),
			start,
			sender,
			stop_rx,
			self.poll_interval,
		));

		tracing::debug!(subscription = id, start_height = start, "Polling for transactions");
		Ok((id, receiver))
	}

	async fn subscribe_heights(&self) -> Result<(TransportSubscriptionId, HeightReceiver), TransportError> {
		self.ensure_open()?;
		let start = self.rpc.status().await?.height;
		let (id, stop_rx) = self.register();
		let (sender, receiver) = mpsc::unbounded_channel();

		tokio::spawn(Self::height_polling_loop(
			self.rpc.clone(),
			start,
			sender,
			stop_rx,
			self.poll_interval,
		));

		Ok((id, receiver))
	}

	async fn unsubscribe(&self, id: TransportSubscriptionId) -> Result<(), TransportError> {
		let stop = self.stop_signals.lock().remove(&id);
		if let Some(stop) = stop {
			let _ = stop.send(()).await;
		}
		Ok(())
	}

	async fn close(&self) -> Result<(), TransportError> {
		self.closed.store(true, Ordering::SeqCst);
		let signals: Vec<_> = self.stop_signals.lock().drain().map(|(_, tx)| tx).collect();
		for stop in signals {
			let _ = stop.send(()).await;
		}
		Ok(())
	}
}

/// Configuration schema for the Tendermint transport.
pub struct TendermintTransportSchema;

impl ConfigSchema for TendermintTransportSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("url", FieldType::String).with_validator(|value| {
				let url = value.as_str().unwrap_or_default();
				if url.starts_with("http://") || url.starts_with("https://") {
					Ok(())
				} else {
					Err("url must start with http:// or https://".to_string())
				}
			})],
			vec![Field::new(
				"poll_interval_ms",
				FieldType::Integer {
					min: Some(10),
					max: Some(60_000),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a Tendermint transport from configuration.
///
/// Configuration parameters:
/// - `url`: JSON-RPC endpoint of the node
/// - `poll_interval_ms`: subscription polling interval (default: 500)
pub fn create_transport(config: &toml::Value) -> Result<Box<dyn TransportInterface>, TransportError> {
	TendermintTransportSchema
		.validate(config)
		.map_err(|e| TransportError::Config(format!("Invalid configuration: {}", e)))?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| TransportError::Config("url is required".to_string()))?;
	let poll_interval_ms = config
		.get("poll_interval_ms")
		.and_then(|v| v.as_integer())
		.unwrap_or(500) as u64;

	Ok(Box::new(TendermintTransport::new(
		url,
		Duration::from_millis(poll_interval_ms),
	)?))
}

/// Registry for the Tendermint transport implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "tendermint";
	type Factory = TransportFactory;

	fn factory() -> Self::Factory {
		create_transport
	}
}

impl TransportRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use bcp_codec::models::encode_result_set;

	#[test]
	fn test_status_parses_string_heights() {
		let json = serde_json::json!({
			"node_info": { "network": "bns-testnet", "version": "0.31.5" },
			"sync_info": { "latest_block_height": "1234", "catching_up": false }
		});
		let status: StatusResult = serde_json::from_value(json).unwrap();
		assert_eq!(status.node_info.network, "bns-testnet");
		assert_eq!(status.sync_info.latest_block_height, 1234);
	}

	#[test]
	fn test_query_models_pair_keys_and_values() {
		let response = AbciQueryResponse {
			code: 0,
			log: String::new(),
			key: Some(STANDARD.encode(encode_result_set(vec![b"alice".to_vec(), b"bob".to_vec()]))),
			value: Some(STANDARD.encode(encode_result_set(vec![vec![1], vec![2]]))),
		};
		let models = decode_query_models(response).unwrap();
		assert_eq!(models.len(), 2);
		assert_eq!(models[1].key, b"bob");
		assert_eq!(models[1].value, vec![2]);
	}

	#[test]
	fn test_empty_query_value_means_no_models() {
		let response = AbciQueryResponse {
			code: 0,
			log: String::new(),
			key: None,
			value: None,
		};
		assert!(decode_query_models(response).unwrap().is_empty());
	}

	#[test]
	fn test_search_item_decodes_failed_result() {
		let json = serde_json::json!({
			"hash": "ab12",
			"height": "7",
			"index": 0,
			"tx": STANDARD.encode([1u8, 2, 3]),
			"tx_result": { "code": 13, "log": "invalid amount" }
		});
		let item: TxSearchItem = serde_json::from_value(json).unwrap();
		let response = item.into_response().unwrap();
		assert_eq!(response.hash, TransactionId::new("AB12"));
		assert_eq!(response.height, 7);
		assert_eq!(response.tx, vec![1, 2, 3]);
		assert_eq!(response.result.code, 13);
		assert_eq!(response.result.log.as_deref(), Some("invalid amount"));
		assert!(response.result.data.is_empty());
	}

	#[test]
	fn test_factory_validates_url() {
		let config: toml::Value = toml::from_str(r#"url = "ws://localhost:26657""#).unwrap();
		assert!(matches!(create_transport(&config), Err(TransportError::Config(_))));

		let config: toml::Value =
			toml::from_str("url = \"http://localhost:26657\"\npoll_interval_ms = 100").unwrap();
		assert!(create_transport(&config).is_ok());
	}

	#[tokio::test]
	async fn test_live_node_status() {
		let Ok(url) = std::env::var("BNSD_URL") else {
			return;
		};
		if std::env::var("BNSD_ENABLED").is_err() {
			return;
		}
		let transport = TendermintTransport::new(&url, Duration::from_millis(500)).unwrap();
		let status = transport.status().await.unwrap();
		assert!(!status.chain_id.as_str().is_empty());
	}
}
