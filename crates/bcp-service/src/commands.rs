//! Command implementations for the `bcp` binary.
//!
//! Each command talks to one connection and renders its result as JSON.

use bcp_config::ConfigError;
use bcp_connection::{ChainConnection, ConnectionError, TransportError};
use bcp_types::{AccountQuery, Address, AddressError, TransactionId, TxQuery};
use serde_json::{json, Value};
use std::io::Write;
use thiserror::Error;

/// Errors surfaced by the command line.
#[derive(Debug, Error)]
pub enum ServiceError {
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),
	#[error("Connection error: {0}")]
	Connection(#[from] ConnectionError),
	#[error("Transport error: {0}")]
	Transport(#[from] TransportError),
	#[error("Unknown transport '{0}'")]
	UnknownTransport(String),
	#[error("Invalid address: {0}")]
	Address(#[from] AddressError),
	#[error("Output error: {0}")]
	Output(#[from] serde_json::Error),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Filters of the `search` command.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
	pub id: Option<String>,
	pub address: Option<String>,
	pub height: Option<u64>,
	pub min_height: Option<u64>,
	pub max_height: Option<u64>,
}

impl SearchFilter {
	fn to_query(&self) -> Result<TxQuery, ServiceError> {
		Ok(TxQuery {
			id: self.id.as_deref().map(TransactionId::new),
			height: self.height,
			min_height: self.min_height,
			max_height: self.max_height,
			sent_from_or_to: self.address.as_deref().map(str::parse).transpose()?,
		})
	}
}

pub async fn height(connection: &ChainConnection) -> Result<Value, ServiceError> {
	let height = connection.height().await?;
	Ok(json!({
		"chain_id": connection.chain_id().as_str(),
		"height": height,
	}))
}

/// The account behind `address`, or `null` when it does not exist.
pub async fn account(connection: &ChainConnection, address: &str) -> Result<Value, ServiceError> {
	let address: Address = address.parse()?;
	let account = connection.get_account(&AccountQuery::Address(address)).await?;
	Ok(serde_json::to_value(account)?)
}

pub async fn search(connection: &ChainConnection, filter: &SearchFilter) -> Result<Value, ServiceError> {
	let records = connection.search_tx(&filter.to_query()?).await?;
	tracing::debug!(results = records.len(), "Search finished");
	Ok(serde_json::to_value(records)?)
}

/// Writes one JSON line per account state until interrupted, or until
/// `limit` lines were written.
pub async fn watch_account(
	connection: &ChainConnection,
	address: &str,
	limit: Option<usize>,
	out: &mut impl Write,
) -> Result<(), ServiceError> {
	let address: Address = address.parse()?;
	let mut updates = connection.watch_account(&AccountQuery::Address(address)).await?;
	let mut written = 0;

	while limit.is_none_or(|limit| written < limit) {
		tokio::select! {
			update = updates.recv() => {
				let Some(account) = update else {
					break;
				};
				writeln!(out, "{}", serde_json::to_string(&account)?)?;
				out.flush()?;
				written += 1;
			}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Interrupted");
				break;
			}
		}
	}

	updates.cancel();
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::factory_registry::initialize_registry;
	use bcp_config::Config;
	use bcp_types::{encode_address, AddressPrefix};

	fn genesis_address() -> Address {
		encode_address(AddressPrefix::Tiov, &[9; 20]).unwrap()
	}

	async fn connect() -> ChainConnection {
		let config: Config = format!(
			r#"
[client]
id = "command-test"

[chains.local]
transport = "memory"
chain_id = "command-chain"
genesis = [{{ address = "{}", amount = "12.5" }}]
"#,
			genesis_address()
		)
		.parse()
		.unwrap();
		initialize_registry().connect(&config, "local").await.unwrap()
	}

	#[tokio::test]
	async fn test_height() {
		let connection = connect().await;
		let output = height(&connection).await.unwrap();
		assert_eq!(output["chain_id"], "command-chain");
		assert_eq!(output["height"], 0);
	}

	#[tokio::test]
	async fn test_account_from_genesis() {
		let connection = connect().await;
		let output = account(&connection, genesis_address().as_str()).await.unwrap();
		assert_eq!(output["address"], genesis_address().as_str());
		assert_eq!(output["balance"][0]["quantity"], "12500000000");
		assert_eq!(output["balance"][0]["token_ticker"], "CASH");
	}

	#[tokio::test]
	async fn test_missing_account_is_null() {
		let connection = connect().await;
		let other = encode_address(AddressPrefix::Tiov, &[8; 20]).unwrap();
		let output = account(&connection, other.as_str()).await.unwrap();
		assert!(output.is_null());
	}

	#[tokio::test]
	async fn test_invalid_address_rejected() {
		let connection = connect().await;
		let result = account(&connection, "not-an-address").await;
		assert!(matches!(result, Err(ServiceError::Address(_))));
	}

	#[tokio::test]
	async fn test_search_without_filter_is_invalid() {
		let connection = connect().await;
		let result = search(&connection, &SearchFilter::default()).await;
		assert!(matches!(
			result,
			Err(ServiceError::Connection(ConnectionError::InvalidQuery(_)))
		));

		let filter = SearchFilter {
			address: Some(genesis_address().to_string()),
			..SearchFilter::default()
		};
		let output = search(&connection, &filter).await.unwrap();
		assert_eq!(output, json!([]));
	}

	#[tokio::test]
	async fn test_watch_account_writes_current_state() {
		let connection = connect().await;
		let mut out = Vec::new();
		watch_account(&connection, genesis_address().as_str(), Some(1), &mut out)
			.await
			.unwrap();

		let text = String::from_utf8(out).unwrap();
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines.len(), 1);
		let first: Value = serde_json::from_str(lines[0]).unwrap();
		assert_eq!(first["balance"][0]["quantity"], "12500000000");
	}
}
