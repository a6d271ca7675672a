//! Chain connection module for the BCP client.
//!
//! This module talks to one BNS chain through a pluggable transport. It
//! provides one-shot queries (height, nonces, accounts, transactions,
//! usernames, swaps), transaction submission with an inclusion handle, and
//! long-lived subscriptions built on top of the transport's event stream.
//!
//! Transports are selected by name. `tendermint` speaks JSON-RPC to a node
//! over HTTP; `memory` is an in-process chain used for development and
//! tests.

use async_trait::async_trait;
use bcp_codec::CodecError;
use bcp_types::{AddressError, ChainId, ConfigSchema, ImplementationRegistry, TransactionId};
use thiserror::Error;
use tokio::sync::mpsc;

pub mod block_info;
pub mod connection;
pub mod reactive;
pub mod tags;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
	pub mod tendermint;
}

pub use block_info::BlockInfoHandle;
pub use connection::{ChainConnection, ConnectionOptions, PostTxResponse};
pub use reactive::Subscription;

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
	/// The node could not be reached.
	#[error("Connection failed: {0}")]
	Connection(String),
	/// The node answered with an error.
	#[error("Request failed: {0}")]
	Request(String),
	/// The node answered with something that could not be understood.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// The transport has been closed.
	#[error("Transport closed")]
	Closed,
	/// The transport configuration is invalid.
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Errors that can occur on a chain connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
	/// The requested record does not exist. This is an expected outcome.
	#[error("{0}")]
	NotFound(String),
	#[error("Transport error: {0}")]
	Transport(#[from] TransportError),
	#[error("Codec error: {0}")]
	Codec(#[from] CodecError),
	#[error("Address error: {0}")]
	Address(#[from] AddressError),
	/// The node refused the transaction before inclusion.
	#[error("Transaction rejected with code {code}: {log}")]
	Rejected { code: u32, log: String },
	#[error("Chain id mismatch: expected {expected}, got {actual}")]
	ChainIdMismatch { expected: String, actual: String },
	#[error("Connection is disconnected")]
	Disconnected,
	#[error("Invalid query: {0}")]
	InvalidQuery(String),
	/// A subscription ended before producing the awaited value.
	#[error("Subscription closed")]
	SubscriptionClosed,
}

/// Chain identity and height reported by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStatus {
	pub chain_id: ChainId,
	pub height: u64,
}

/// One key/value pair returned by a state query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryModel {
	pub key: Vec<u8>,
	pub value: Vec<u8>,
}

/// Indexed event tag attached to committed transactions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryTag {
	pub key: String,
	pub value: String,
}

/// Transaction filter understood by transports.
///
/// All present conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportQuery {
	pub tags: Vec<QueryTag>,
	pub hash: Option<TransactionId>,
	pub height: Option<u64>,
	pub min_height: Option<u64>,
	pub max_height: Option<u64>,
}

impl TransportQuery {
	pub fn with_tag(tag: QueryTag) -> Self {
		Self {
			tags: vec![tag],
			..Default::default()
		}
	}

	/// Whether a committed transaction matches this filter.
	pub fn matches(&self, hash: &TransactionId, height: u64, tags: &[QueryTag]) -> bool {
		if self.hash.as_ref().is_some_and(|h| h != hash) {
			return false;
		}
		if self.height.is_some_and(|h| h != height) {
			return false;
		}
		if self.min_height.is_some_and(|min| height < min) {
			return false;
		}
		if self.max_height.is_some_and(|max| height > max) {
			return false;
		}
		self.tags.iter().all(|tag| tags.contains(tag))
	}
}

/// Execution result of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
	/// Zero on success, a chain-defined error code otherwise.
	pub code: u32,
	pub log: Option<String>,
	pub data: Vec<u8>,
}

/// A committed transaction as reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResponse {
	pub hash: TransactionId,
	pub height: u64,
	pub index: u32,
	pub tx: Vec<u8>,
	pub result: TxResult,
}

/// Answer of the node's admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResponse {
	pub hash: TransactionId,
	pub code: u32,
	pub log: String,
}

/// Identifier of a transport-level subscription.
pub type TransportSubscriptionId = u64;

/// Stream of committed transactions matching a subscription.
pub type TxEventReceiver = mpsc::UnboundedReceiver<TxResponse>;

/// Stream of new block heights.
pub type HeightReceiver = mpsc::UnboundedReceiver<u64>;

/// Trait defining the interface for chain transports.
///
/// A transport exposes the raw capabilities of a node: status, state
/// queries, admission of transactions, tag based search and event
/// subscriptions. It knows nothing about the transaction model.
#[async_trait]
pub trait TransportInterface: Send + Sync {
	/// Returns the configuration schema for this transport implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	async fn status(&self) -> Result<ChainStatus, TransportError>;

	/// Queries application state under `path` for the key `data`.
	///
	/// Returns an empty list when nothing is stored under the key.
	async fn abci_query(&self, path: &str, data: &[u8]) -> Result<Vec<QueryModel>, TransportError>;

	/// Submits postable bytes and returns the admission check result.
	async fn broadcast_tx_sync(&self, tx: &[u8]) -> Result<BroadcastResponse, TransportError>;

	async fn tx_search(&self, query: &TransportQuery) -> Result<Vec<TxResponse>, TransportError>;

	/// Starts delivering future transactions matching `query`.
	///
	/// The subscription is active when this call returns.
	async fn subscribe_txs(
		&self,
		query: &TransportQuery,
	) -> Result<(TransportSubscriptionId, TxEventReceiver), TransportError>;

	/// Starts delivering the height of every new block.
	async fn subscribe_heights(&self) -> Result<(TransportSubscriptionId, HeightReceiver), TransportError>;

	/// Stops a subscription. Unknown ids are ignored.
	async fn unsubscribe(&self, id: TransportSubscriptionId) -> Result<(), TransportError>;

	/// Releases all resources held by the transport.
	async fn close(&self) -> Result<(), TransportError>;
}

/// Type alias for transport factory functions.
pub type TransportFactory = fn(&toml::Value) -> Result<Box<dyn TransportInterface>, TransportError>;

/// Registry trait for transport implementations.
pub trait TransportRegistry: ImplementationRegistry<Factory = TransportFactory> {}

/// Get all registered transport implementations.
pub fn get_all_implementations() -> Vec<(&'static str, TransportFactory)> {
	use implementations::{memory, tendermint};

	vec![
		(tendermint::Registry::NAME, tendermint::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_query_matching() {
		let hash = TransactionId::new("AB");
		let tag = QueryTag {
			key: "6361736800".to_string(),
			value: "s".to_string(),
		};
		let query = TransportQuery {
			tags: vec![tag.clone()],
			min_height: Some(2),
			..Default::default()
		};
		assert!(query.matches(&hash, 2, std::slice::from_ref(&tag)));
		assert!(!query.matches(&hash, 1, std::slice::from_ref(&tag)));
		assert!(!query.matches(&hash, 3, &[]));

		let by_hash = TransportQuery {
			hash: Some(TransactionId::new("cd")),
			..Default::default()
		};
		assert!(!by_hash.matches(&hash, 1, &[]));
		assert!(by_hash.matches(&TransactionId::new("CD"), 1, &[]));
	}

	#[test]
	fn test_registered_transports() {
		let names: Vec<_> = get_all_implementations().into_iter().map(|(n, _)| n).collect();
		assert_eq!(names, vec!["tendermint", "memory"]);
	}
}
