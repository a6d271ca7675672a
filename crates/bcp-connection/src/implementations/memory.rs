//! In-process chain used for development and tests.
//!
//! Every admitted transaction is committed right away in its own block, so
//! heights advance one transaction at a time. Queries, search and event
//! subscriptions behave like a node's: failed transactions are recorded in
//! their block but leave the state untouched, and events carry the same
//! tags a node would index.

mod state;

use crate::{
	BroadcastResponse, ChainStatus, HeightReceiver, QueryModel, QueryTag, TransportError,
	TransportFactory, TransportInterface, TransportQuery, TransportRegistry, TransportSubscriptionId,
	TxEventReceiver, TxResponse, TxResult,
};
use crate::connection::{
	AUTH_PATH, CONFIG_PATH, ELECTION_RULE_PATH, ELECTORATE_PATH, PREFIX_QUERY, PROPOSAL_PATH, TOKEN_PATH,
	USERNAME_OWNER_PATH, USERNAME_PATH, WALLET_PATH,
};
use async_trait::async_trait;
use bcp_codec::models::{
	encode_cash_config, encode_election_rule, encode_electorate, encode_proposal, encode_token,
	encode_user_data, encode_username_token, encode_versioned_id, encode_wallet, CASH_CONFIG_KEY,
};
use bcp_codec::{encode_numeric_id, parse_tx, transaction_id_of, FRACTIONAL_DIGITS};
use bcp_types::{
	truncate_id, Address, Amount, ChainId, ConfigSchema, ElectionRule, Electorate, Field, FieldType,
	ImplementationRegistry, Schema, SignedTransaction, Token, TransactionId, ValidationError, VersionedId,
};
use parking_lot::Mutex;
use state::{Ledger, TxFailure, CODE_DUPLICATE, CODE_INPUT};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Ticker used for fees and genesis funds unless configured otherwise.
pub const DEFAULT_FEE_TICKER: &str = "CASH";

struct StoredTx {
	response: TxResponse,
	tags: Vec<QueryTag>,
}

struct TxSubscriber {
	query: TransportQuery,
	sender: mpsc::UnboundedSender<TxResponse>,
}

struct ChainState {
	ledger: Ledger,
	height: u64,
	time_offset: i64,
	txs: Vec<StoredTx>,
	tx_subscribers: HashMap<TransportSubscriptionId, TxSubscriber>,
	height_subscribers: HashMap<TransportSubscriptionId, mpsc::UnboundedSender<u64>>,
	next_subscription: TransportSubscriptionId,
	#[cfg(test)]
	commit_before_search: Vec<Vec<u8>>,
}

impl ChainState {
	fn now(&self) -> i64 {
		chrono::Utc::now().timestamp() + self.time_offset
	}

	fn admit(&self, tx: &[u8], hash: &TransactionId) -> Result<SignedTransaction, TxFailure> {
		if self.txs.iter().any(|stored| &stored.response.hash == hash) {
			return Err(TxFailure::new(CODE_DUPLICATE, "tx already in cache"));
		}
		let signed = parse_tx(tx, &self.ledger.chain_id).map_err(|e| TxFailure::new(CODE_INPUT, e))?;
		self.ledger.check(&signed)?;
		Ok(signed)
	}

	fn broadcast(&mut self, tx: &[u8]) -> BroadcastResponse {
		let hash = transaction_id_of(tx);
		match self.admit(tx, &hash) {
			Ok(signed) => {
				self.commit(hash.clone(), tx.to_vec(), &signed);
				BroadcastResponse {
					hash,
					code: 0,
					log: String::new(),
				}
			},
			Err(failure) => {
				tracing::debug!(tx_id = %truncate_id(hash.as_str()), code = failure.code, "Refused transaction: {}", failure.log);
				BroadcastResponse {
					hash,
					code: failure.code,
					log: failure.log,
				}
			},
		}
	}

	#[cfg(test)]
	fn commit_queued(&mut self) {
		for tx in std::mem::take(&mut self.commit_before_search) {
			let response = self.broadcast(&tx);
			if response.code != 0 {
				tracing::warn!(code = response.code, "Queued transaction refused: {}", response.log);
			}
		}
	}

	#[cfg(not(test))]
	fn commit_queued(&mut self) {}

	/// Every record under `path` whose key starts with `prefix`.
	fn scan(&self, path: &str, prefix: &[u8]) -> Result<Vec<QueryModel>, TransportError> {
		let invalid = |e: bcp_codec::CodecError| TransportError::InvalidResponse(e.to_string());
		let ledger = &self.ledger;

		let mut models = Vec::new();
		match path {
			ELECTORATE_PATH => {
				for (id, electorate) in &ledger.electorates {
					models.push(QueryModel {
						key: encode_versioned_id(*id),
						value: encode_electorate(electorate).map_err(invalid)?,
					});
				}
			},
			ELECTION_RULE_PATH => {
				for (id, rule) in &ledger.election_rules {
					models.push(QueryModel {
						key: encode_versioned_id(*id),
						value: encode_election_rule(rule).map_err(invalid)?,
					});
				}
			},
			PROPOSAL_PATH => {
				let now = self.now();
				for (id, proposal) in &ledger.proposals {
					let (Some(electorate), Some(rule)) = (
						ledger.electorates.get(&proposal.electorate),
						ledger.election_rules.get(&proposal.election_rule),
					) else {
						continue;
					};
					let view = ledger.proposal_at(proposal, now);
					models.push(QueryModel {
						key: encode_numeric_id(*id).to_vec(),
						value: encode_proposal(&view, electorate, rule).map_err(invalid)?,
					});
				}
			},
			TOKEN_PATH => {
				for (ticker, token) in &ledger.tokens {
					models.push(QueryModel {
						key: ticker.as_bytes().to_vec(),
						value: encode_token(token),
					});
				}
			},
			other => {
				return Err(TransportError::Request(format!("unknown prefix query path {}", other)));
			},
		}
		models.retain(|model| model.key.starts_with(prefix));
		Ok(models)
	}

	/// Executes the transaction in a new block and notifies subscribers.
	fn commit(&mut self, hash: TransactionId, tx: Vec<u8>, signed: &SignedTransaction) {
		self.height += 1;
		let mut scratch = self.ledger.clone();

		let (result, tags) = match scratch.deliver(signed, self.now()) {
			Ok(execution) => {
				self.ledger = scratch;
				let result = TxResult {
					code: 0,
					log: None,
					data: execution.data,
				};
				(result, execution.tags)
			},
			Err(failure) => {
				tracing::debug!(tx_id = %truncate_id(hash.as_str()), code = failure.code, "Transaction failed: {}", failure.log);
				let result = TxResult {
					code: failure.code,
					log: Some(failure.log),
					data: Vec::new(),
				};
				(result, Vec::new())
			},
		};

		let response = TxResponse {
			hash,
			height: self.height,
			index: 0,
			tx,
			result,
		};

		self.tx_subscribers.retain(|_, subscriber| {
			if !subscriber.query.matches(&response.hash, response.height, &tags) {
				return true;
			}
			subscriber.sender.send(response.clone()).is_ok()
		});
		let height = self.height;
		self.height_subscribers.retain(|_, sender| sender.send(height).is_ok());

		self.txs.push(StoredTx { response, tags });
	}

	fn query(&self, path: &str, data: &[u8]) -> Result<Vec<QueryModel>, TransportError> {
		if let Some(path) = path.strip_suffix(PREFIX_QUERY) {
			return self.scan(path, data);
		}

		let invalid = |e: bcp_codec::CodecError| TransportError::InvalidResponse(e.to_string());
		let ledger = &self.ledger;

		let models = match path {
			TOKEN_PATH => {
				let ticker = String::from_utf8_lossy(data);
				match ledger.tokens.get(&*ticker) {
					Some(token) => vec![QueryModel {
						key: data.to_vec(),
						value: encode_token(token),
					}],
					None => Vec::new(),
				}
			},
			WALLET_PATH => match ledger.wallets.get(data) {
				Some(balance) => vec![QueryModel {
					key: data.to_vec(),
					value: encode_wallet(balance).map_err(invalid)?,
				}],
				None => Vec::new(),
			},
			AUTH_PATH => match ledger.users.get(data) {
				Some(record) => vec![QueryModel {
					key: data.to_vec(),
					value: encode_user_data(record),
				}],
				None => Vec::new(),
			},
			USERNAME_PATH => {
				let username = String::from_utf8_lossy(data);
				match ledger.usernames.get(username.as_ref()) {
					Some(entry) => vec![QueryModel {
						key: data.to_vec(),
						value: encode_username_token(&entry.owner, &entry.targets).map_err(invalid)?,
					}],
					None => Vec::new(),
				}
			},
			USERNAME_OWNER_PATH => {
				let mut models = Vec::new();
				for (username, entry) in &ledger.usernames {
					if entry.owner.data().ok().as_deref() == Some(data) {
						models.push(QueryModel {
							key: username.as_bytes().to_vec(),
							value: encode_username_token(&entry.owner, &entry.targets).map_err(invalid)?,
						});
					}
				}
				models
			},
			CONFIG_PATH if data == CASH_CONFIG_KEY => vec![QueryModel {
				key: data.to_vec(),
				value: encode_cash_config(ledger.minimal_fee.as_ref()).map_err(invalid)?,
			}],
			CONFIG_PATH => Vec::new(),
			other => {
				return Err(TransportError::Request(format!("unknown query path {}", other)));
			},
		};
		Ok(models)
	}
}

/// Handle to an in-process chain. Clones share the same chain.
#[derive(Clone)]
pub struct MemoryChain {
	inner: Arc<Mutex<ChainState>>,
}

impl MemoryChain {
	pub fn new(chain_id: ChainId) -> Self {
		Self {
			inner: Arc::new(Mutex::new(ChainState {
				ledger: Ledger::new(chain_id, None),
				height: 0,
				time_offset: 0,
				txs: Vec::new(),
				tx_subscribers: HashMap::new(),
				height_subscribers: HashMap::new(),
				next_subscription: 1,
				#[cfg(test)]
				commit_before_search: Vec::new(),
			})),
		}
	}

	/// Builds a chain from a `memory` transport configuration.
	pub fn from_config(config: &toml::Value) -> Result<Self, TransportError> {
		MemoryTransportSchema
			.validate(config)
			.map_err(|e| TransportError::Config(format!("Invalid configuration: {}", e)))?;

		let chain_id = config
			.get("chain_id")
			.and_then(|v| v.as_str())
			.ok_or_else(|| TransportError::Config("chain_id is required".to_string()))?;
		let fee_ticker = config
			.get("fee_ticker")
			.and_then(|v| v.as_str())
			.unwrap_or(DEFAULT_FEE_TICKER);

		let chain = Self::new(ChainId::new(chain_id));
		if let Some(fee) = config.get("minimal_fee").and_then(|v| v.as_str()) {
			let fee = Amount::from_decimal_str(fee, FRACTIONAL_DIGITS, fee_ticker)
				.map_err(|e| TransportError::Config(format!("minimal_fee: {}", e)))?;
			chain.set_minimal_fee(Some(fee));
		}

		if let Some(genesis) = config.get("genesis").and_then(|v| v.as_array()) {
			for entry in genesis {
				let address: Address = entry
					.get("address")
					.and_then(|v| v.as_str())
					.unwrap_or_default()
					.parse()
					.map_err(|e| TransportError::Config(format!("genesis address: {}", e)))?;
				let ticker = entry
					.get("ticker")
					.and_then(|v| v.as_str())
					.unwrap_or(fee_ticker);
				let amount = entry.get("amount").and_then(|v| v.as_str()).unwrap_or_default();
				let amount = Amount::from_decimal_str(amount, FRACTIONAL_DIGITS, ticker)
					.map_err(|e| TransportError::Config(format!("genesis amount: {}", e)))?;
				chain.credit(&address, amount)?;
			}
		}

		Ok(chain)
	}

	pub fn chain_id(&self) -> ChainId {
		self.inner.lock().ledger.chain_id.clone()
	}

	pub fn height(&self) -> u64 {
		self.inner.lock().height
	}

	/// Minimal fee every transaction must pay. `None` disables fees.
	pub fn set_minimal_fee(&self, fee: Option<Amount>) {
		self.inner.lock().ledger.minimal_fee = fee;
	}

	/// Adds funds outside of any transaction, as genesis would.
	pub fn credit(&self, address: &Address, amount: Amount) -> Result<(), TransportError> {
		let key = address
			.data()
			.map_err(|e| TransportError::Config(format!("address {}: {}", address, e)))?;
		self.inner
			.lock()
			.ledger
			.credit(&key, &amount)
			.map_err(|e| TransportError::Config(e.to_string()))
	}

	/// Stores a new version of an electorate, as genesis would.
	pub fn add_electorate(&self, electorate: Electorate) {
		let id = VersionedId {
			id: electorate.id,
			version: electorate.version,
		};
		self.inner.lock().ledger.electorates.insert(id, electorate);
	}

	/// Stores a new version of an election rule, as genesis would.
	pub fn add_election_rule(&self, rule: ElectionRule) {
		let id = VersionedId {
			id: rule.id,
			version: rule.version,
		};
		self.inner.lock().ledger.election_rules.insert(id, rule);
	}

	pub fn register_token(&self, token: Token) {
		self.inner
			.lock()
			.ledger
			.tokens
			.insert(token.token_ticker.clone(), token);
	}

	/// Moves the chain clock forward.
	pub fn advance_time(&self, seconds: i64) {
		self.inner.lock().time_offset += seconds;
	}

	/// Commits `tx` at the start of the next search, after any subscription
	/// opened before that search is registered.
	#[cfg(test)]
	pub(crate) fn commit_before_next_search(&self, tx: Vec<u8>) {
		self.inner.lock().commit_before_search.push(tx);
	}

	/// Opens a transport onto this chain.
	pub fn transport(&self) -> MemoryTransport {
		MemoryTransport {
			chain: self.clone(),
			subscriptions: Mutex::new(HashSet::new()),
			closed: AtomicBool::new(false),
		}
	}
}

/// Transport attached to a [`MemoryChain`].
pub struct MemoryTransport {
	chain: MemoryChain,
	subscriptions: Mutex<HashSet<TransportSubscriptionId>>,
	closed: AtomicBool,
}

impl MemoryTransport {
	fn ensure_open(&self) -> Result<(), TransportError> {
		if self.closed.load(Ordering::SeqCst) {
			Err(TransportError::Closed)
		} else {
			Ok(())
		}
	}

	pub fn chain(&self) -> &MemoryChain {
		&self.chain
	}
}

#[async_trait]
impl TransportInterface for MemoryTransport {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryTransportSchema)
	}

	async fn status(&self) -> Result<ChainStatus, TransportError> {
		self.ensure_open()?;
		let state = self.chain.inner.lock();
		Ok(ChainStatus {
			chain_id: state.ledger.chain_id.clone(),
			height: state.height,
		})
	}

	async fn abci_query(&self, path: &str, data: &[u8]) -> Result<Vec<QueryModel>, TransportError> {
		self.ensure_open()?;
		self.chain.inner.lock().query(path, data)
	}

	async fn broadcast_tx_sync(&self, tx: &[u8]) -> Result<BroadcastResponse, TransportError> {
		self.ensure_open()?;
		Ok(self.chain.inner.lock().broadcast(tx))
	}

	async fn tx_search(&self, query: &TransportQuery) -> Result<Vec<TxResponse>, TransportError> {
		self.ensure_open()?;
		let mut state = self.chain.inner.lock();
		state.commit_queued();

		Ok(state
			.txs
			.iter()
			.filter(|stored| query.matches(&stored.response.hash, stored.response.height, &stored.tags))
			.map(|stored| stored.response.clone())
			.collect())
	}

	async fn subscribe_txs(
		&self,
		query: &TransportQuery,
	) -> Result<(TransportSubscriptionId, TxEventReceiver), TransportError> {
		self.ensure_open()?;
		let (sender, receiver) = mpsc::unbounded_channel();
		let mut state = self.chain.inner.lock();
		let id = state.next_subscription;
		state.next_subscription += 1;
		state.tx_subscribers.insert(
			id,
			TxSubscriber {
				query: query.clone(),
				sender,
			},
		);
		self.subscriptions.lock().insert(id);
		Ok((id, receiver))
	}

	async fn subscribe_heights(&self) -> Result<(TransportSubscriptionId, HeightReceiver), TransportError> {
		self.ensure_open()?;
		let (sender, receiver) = mpsc::unbounded_channel();
		let mut state = self.chain.inner.lock();
		let id = state.next_subscription;
		state.next_subscription += 1;
		state.height_subscribers.insert(id, sender);
		self.subscriptions.lock().insert(id);
		Ok((id, receiver))
	}

	async fn unsubscribe(&self, id: TransportSubscriptionId) -> Result<(), TransportError> {
		if self.subscriptions.lock().remove(&id) {
			let mut state = self.chain.inner.lock();
			state.tx_subscribers.remove(&id);
			state.height_subscribers.remove(&id);
		}
		Ok(())
	}

	async fn close(&self) -> Result<(), TransportError> {
		self.closed.store(true, Ordering::SeqCst);
		let ids: Vec<_> = self.subscriptions.lock().drain().collect();
		let mut state = self.chain.inner.lock();
		for id in ids {
			state.tx_subscribers.remove(&id);
			state.height_subscribers.remove(&id);
		}
		Ok(())
	}
}

/// Configuration schema for the memory transport.
pub struct MemoryTransportSchema;

impl ConfigSchema for MemoryTransportSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let genesis_entry = Schema::new(
			vec![
				Field::new("address", FieldType::String),
				Field::new("amount", FieldType::String),
			],
			vec![Field::new("ticker", FieldType::String)],
		);
		let schema = Schema::new(
			vec![Field::new("chain_id", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(id) if !id.is_empty() => Ok(()),
					_ => Err("chain_id cannot be empty".to_string()),
				}
			})],
			vec![
				Field::new("minimal_fee", FieldType::String),
				Field::new("fee_ticker", FieldType::String),
				Field::new(
					"genesis",
					FieldType::Array(Box::new(FieldType::Table(genesis_entry))),
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a memory transport from configuration.
///
/// Configuration parameters:
/// - `chain_id`: id reported by the chain
/// - `minimal_fee`: decimal fee every transaction must pay (optional)
/// - `fee_ticker`: ticker of the fee token (default: CASH)
/// - `genesis`: array of `{ address, amount, ticker }` initial balances
pub fn create_transport(config: &toml::Value) -> Result<Box<dyn TransportInterface>, TransportError> {
	let chain = MemoryChain::from_config(config)?;
	tracing::info!(chain_id = %chain.chain_id(), "Started in-memory chain");
	Ok(Box::new(chain.transport()))
}

/// Registry for the memory transport implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = TransportFactory;

	fn factory() -> Self::Factory {
		create_transport
	}
}

impl TransportRegistry for Registry {}

/// Chain, funded signers and helpers shared by connection tests.
#[cfg(test)]
pub(crate) mod fixtures {
	use super::MemoryChain;
	use crate::{ChainConnection, ConnectionOptions, PostTxResponse};
	use bcp_account::implementations::local::LocalSigner;
	use bcp_account::SignerService;
	use bcp_codec::bytes_to_post;
	use bcp_types::{
		AccountQuery, Address, Amount, ChainId, SendTransaction, SignedTransaction, TransactionKind,
		UnsignedTransaction,
	};

	pub const CHAIN_ID: &str = "test-chain-memory";
	/// 0.01 CASH
	pub const FEE: u64 = 10_000_000;
	pub const FAUCET_FUNDS: u64 = 1_000_000_000_000;

	pub fn cash(quantity: u64) -> Amount {
		Amount::new(quantity, 9, "CASH")
	}

	pub fn signer(seed: u8) -> SignerService {
		SignerService::new(Box::new(LocalSigner::from_seed([seed; 32])))
	}

	pub struct Fixture {
		pub chain: MemoryChain,
		pub connection: ChainConnection,
		pub faucet: SignerService,
	}

	impl Fixture {
		pub fn chain_id(&self) -> ChainId {
			self.connection.chain_id().clone()
		}

		pub fn address(&self, signer: &SignerService) -> Address {
			signer.address(&self.chain_id()).unwrap()
		}

		/// Attaches the default fee and signs with the creator's nonce.
		pub async fn sign(&self, signer: &SignerService, kind: TransactionKind) -> SignedTransaction {
			let transaction = UnsignedTransaction::new(signer.identity(&self.chain_id()), kind);
			let transaction = self.connection.with_default_fee(transaction).await.unwrap();
			let nonce = self
				.connection
				.get_nonce(&AccountQuery::Address(self.address(signer)))
				.await
				.unwrap();
			signer.sign(transaction, nonce).await.unwrap()
		}

		pub async fn post(&self, signed: &SignedTransaction) -> PostTxResponse {
			self.connection.post_tx(&bytes_to_post(signed).unwrap()).await.unwrap()
		}

		pub async fn send(&self, from: &SignerService, to: &Address, quantity: u64) -> PostTxResponse {
			let kind = TransactionKind::Send(SendTransaction {
				sender: self.address(from),
				recipient: to.clone(),
				amount: cash(quantity),
				memo: Some("test transfer".to_string()),
			});
			let signed = self.sign(from, kind).await;
			self.post(&signed).await
		}
	}

	/// A chain charging 0.01 CASH per transaction with a funded faucet.
	pub async fn fixture() -> Fixture {
		let chain = MemoryChain::new(ChainId::new(CHAIN_ID));
		chain.set_minimal_fee(Some(cash(FEE)));
		let faucet = signer(1);
		let faucet_address = faucet.address(&chain.chain_id()).unwrap();
		chain.credit(&faucet_address, cash(FAUCET_FUNDS)).unwrap();

		let connection = ChainConnection::with_transport(Box::new(chain.transport()), ConnectionOptions::default())
			.await
			.unwrap();
		Fixture {
			chain,
			connection,
			faucet,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::fixtures::{cash, fixture, signer, FEE};
	use super::*;
	use bcp_codec::bytes_to_post;
	use bcp_types::{BlockInfo, SendTransaction, TransactionKind, TxQuery};

	#[tokio::test]
	async fn test_each_transaction_gets_its_own_block() {
		let fx = fixture().await;
		let recipient = fx.address(&signer(2));
		let first = fx.send(&fx.faucet, &recipient, 1).await;
		let second = fx.send(&fx.faucet, &recipient, 1).await;

		let first = first.block_info.wait_for_inclusion().await.unwrap();
		let second = second.block_info.wait_for_inclusion().await.unwrap();
		match (first, second) {
			(BlockInfo::Succeeded { height: a, .. }, BlockInfo::Succeeded { height: b, .. }) => {
				assert_eq!(b, a + 1);
			},
			other => panic!("unexpected outcome {:?}", other),
		}
		assert_eq!(fx.chain.height(), 2);
	}

	#[tokio::test]
	async fn test_replayed_bytes_are_refused() {
		let fx = fixture().await;
		let kind = TransactionKind::Send(SendTransaction {
			sender: fx.address(&fx.faucet),
			recipient: fx.address(&signer(2)),
			amount: cash(5),
			memo: None,
		});
		let signed = fx.sign(&fx.faucet, kind).await;
		let bytes = bytes_to_post(&signed).unwrap();

		let transport = fx.chain.transport();
		assert_eq!(transport.broadcast_tx_sync(&bytes).await.unwrap().code, 0);
		let replay = transport.broadcast_tx_sync(&bytes).await.unwrap();
		assert_eq!(replay.code, state::CODE_DUPLICATE);
	}

	#[tokio::test]
	async fn test_fee_below_minimum_is_refused() {
		let fx = fixture().await;
		let mut transaction = bcp_types::UnsignedTransaction::new(
			fx.faucet.identity(&fx.chain_id()),
			TransactionKind::Send(SendTransaction {
				sender: fx.address(&fx.faucet),
				recipient: fx.address(&signer(2)),
				amount: cash(5),
				memo: None,
			}),
		);
		transaction.fee = Some(bcp_types::Fee {
			payer: None,
			tokens: cash(FEE - 1),
		});
		let signed = fx.faucet.sign(transaction, bcp_types::Nonce::default()).await.unwrap();
		let response = fx
			.chain
			.transport()
			.broadcast_tx_sync(&bytes_to_post(&signed).unwrap())
			.await
			.unwrap();
		assert_eq!(response.code, state::CODE_AMOUNT);
		assert!(response.log.contains("invalid amount"));
	}

	#[tokio::test]
	async fn test_wrong_nonce_is_unauthorized() {
		let fx = fixture().await;
		let transaction = bcp_types::UnsignedTransaction::new(
			fx.faucet.identity(&fx.chain_id()),
			TransactionKind::Send(SendTransaction {
				sender: fx.address(&fx.faucet),
				recipient: fx.address(&signer(2)),
				amount: cash(5),
				memo: None,
			}),
		);
		let transaction = fx.connection.with_default_fee(transaction).await.unwrap();
		let signed = fx.faucet.sign(transaction, bcp_types::Nonce::new(4)).await.unwrap();
		let response = fx
			.chain
			.transport()
			.broadcast_tx_sync(&bytes_to_post(&signed).unwrap())
			.await
			.unwrap();
		assert_eq!(response.code, state::CODE_UNAUTHORIZED);
		assert_eq!(fx.chain.height(), 0);
	}

	#[tokio::test]
	async fn test_search_by_height_and_hash() {
		let fx = fixture().await;
		let posted = fx.send(&fx.faucet, &fx.address(&signer(2)), 10).await;
		posted.block_info.wait_for_inclusion().await.unwrap();

		let transport = fx.chain.transport();
		let by_height = transport
			.tx_search(&TransportQuery {
				height: Some(1),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(by_height.len(), 1);
		assert_eq!(by_height[0].hash, posted.transaction_id);

		let by_hash = fx.connection.search_tx(&TxQuery::by_id(posted.transaction_id.clone())).await.unwrap();
		assert_eq!(by_hash.len(), 1);
		assert_eq!(by_hash[0].height(), 1);
	}

	#[tokio::test]
	async fn test_closed_transport_refuses_calls() {
		let chain = MemoryChain::new(ChainId::new("test-chain-closed"));
		let transport = chain.transport();
		let (_, _events) = transport.subscribe_heights().await.unwrap();
		transport.close().await.unwrap();
		assert!(matches!(transport.status().await, Err(TransportError::Closed)));
		assert!(chain.inner.lock().height_subscribers.is_empty());
	}

	#[test]
	fn test_from_config_with_genesis() {
		let address = bcp_types::encode_address(bcp_types::AddressPrefix::Tiov, &[3u8; 20]).unwrap();
		let config: toml::Value = toml::from_str(&format!(
			r#"
chain_id = "local-bns"
minimal_fee = "0.01"

[[genesis]]
address = "{}"
amount = "1000.5"
"#,
			address
		))
		.unwrap();

		let chain = MemoryChain::from_config(&config).unwrap();
		let state = chain.inner.lock();
		assert_eq!(state.ledger.minimal_fee, Some(cash(FEE)));
		let balance = &state.ledger.wallets[&address.data().unwrap()];
		assert_eq!(balance, &vec![cash(1_000_500_000_000)]);
	}

	#[test]
	fn test_from_config_requires_chain_id() {
		let config: toml::Value = toml::from_str(r#"minimal_fee = "0.01""#).unwrap();
		assert!(matches!(MemoryChain::from_config(&config), Err(TransportError::Config(_))));
	}
}
