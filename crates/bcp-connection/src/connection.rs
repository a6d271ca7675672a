//! Connection to one BNS chain.
//!
//! A connection is established against a transport, learns the chain id
//! during the handshake and stays usable until `disconnect`. One-shot
//! queries may run concurrently. Nonce assignment is left to callers: two
//! submissions from the same signer must not fetch and sign with the same
//! nonce, and the connection takes no lock to prevent it.

use crate::block_info::BlockInfoHandle;
use crate::implementations::tendermint::TendermintTransport;
use crate::reactive::SubscriptionRegistry;
use crate::tags::{bucket_tag, cash_tag, swap_query_tag, SWAP_BUCKET};
use crate::{ConnectionError, QueryModel, TransportInterface, TransportQuery, TxResponse};
use bcp_codec::models::{
	decode_cash_config, decode_election_rule, decode_electorate, decode_proposal, decode_token,
	decode_user_data, decode_username_token, decode_wallet, CASH_CONFIG_KEY,
};
use bcp_codec::{parse_tx, pubkey_to_address, transaction_id_of, CodecError};
use bcp_types::{
	truncate_id, Account, AccountQuery, Address, AddressPrefix, Amount, AtomicSwap, BnsUsernameNft,
	ChainId, ConfirmedTransaction, ElectionRule, Electorate, FailedTransaction, Fee, Hash, Nonce,
	Preimage, Proposal, SwapData, SwapId, SwapQuery, SwapState, Token, TransactionId, TransactionKind,
	TransactionRecord, TxQuery, UnsignedTransaction, UsernameQuery,
};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::instrument;

/// State path of wallets, keyed by address bytes.
pub const WALLET_PATH: &str = "/wallets";
/// State path of signer records, keyed by address bytes.
pub const AUTH_PATH: &str = "/auth";
/// State path of username tokens, keyed by username.
pub const USERNAME_PATH: &str = "/usernames";
/// Owner index of username tokens, keyed by owner address bytes.
pub const USERNAME_OWNER_PATH: &str = "/usernames/owner";
/// State path of module configurations.
pub const CONFIG_PATH: &str = "/configuration";
/// State path of electorates, keyed by versioned id.
pub const ELECTORATE_PATH: &str = "/electorates";
/// State path of election rules, keyed by versioned id.
pub const ELECTION_RULE_PATH: &str = "/electionRules";
/// State path of proposals, keyed by numeric id.
pub const PROPOSAL_PATH: &str = "/proposals";
/// State path of registered tokens, keyed by ticker.
pub const TOKEN_PATH: &str = "/tokens";
/// Suffix turning a state query into a key prefix scan.
pub const PREFIX_QUERY: &str = "?prefix";

/// Default interval at which the HTTP transport polls for new blocks.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Options applied while establishing a connection.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
	/// Refuse the connection when the node reports another chain.
	pub expected_chain_id: Option<ChainId>,
	/// Fee attached by `with_default_fee` instead of the chain minimum.
	pub default_fee: Option<Amount>,
}

/// Result of submitting a transaction.
pub struct PostTxResponse {
	/// Id computed from the submitted bytes.
	pub transaction_id: TransactionId,
	/// Inclusion state, starting at `Pending`.
	pub block_info: BlockInfoHandle,
}

/// An established connection to one chain.
pub struct ChainConnection {
	pub(crate) transport: Arc<dyn TransportInterface>,
	reader: ChainReader,
	connected: AtomicBool,
	default_fee: Option<Amount>,
	minimal_fee: OnceCell<Option<Amount>>,
	pub(crate) subscriptions: Arc<SubscriptionRegistry>,
}

impl ChainConnection {
	/// Connects to a node's JSON-RPC endpoint.
	pub async fn establish(url: &str) -> Result<Self, ConnectionError> {
		let transport = TendermintTransport::new(url, DEFAULT_POLL_INTERVAL)?;
		Self::with_transport(Box::new(transport), ConnectionOptions::default()).await
	}

	/// Connects through an already built transport.
	///
	/// The handshake resolves the chain id; no query is possible before it
	/// succeeds.
	pub async fn with_transport(
		transport: Box<dyn TransportInterface>,
		options: ConnectionOptions,
	) -> Result<Self, ConnectionError> {
		let transport: Arc<dyn TransportInterface> = Arc::from(transport);
		let status = transport.status().await?;

		if let Some(expected) = &options.expected_chain_id {
			if expected != &status.chain_id {
				let _ = transport.close().await;
				return Err(ConnectionError::ChainIdMismatch {
					expected: expected.to_string(),
					actual: status.chain_id.to_string(),
				});
			}
		}

		tracing::info!(
			chain_id = %status.chain_id,
			height = status.height,
			"Connected to chain"
		);

		Ok(Self {
			reader: ChainReader {
				transport: transport.clone(),
				prefix: AddressPrefix::for_chain(&status.chain_id),
				chain_id: status.chain_id,
			},
			transport,
			connected: AtomicBool::new(true),
			default_fee: options.default_fee,
			minimal_fee: OnceCell::new(),
			subscriptions: Arc::new(SubscriptionRegistry::default()),
		})
	}

	pub fn chain_id(&self) -> &ChainId {
		&self.reader.chain_id
	}

	/// Address prefix used on this chain.
	pub fn prefix(&self) -> AddressPrefix {
		self.reader.prefix
	}

	pub(crate) fn reader(&self) -> ChainReader {
		self.reader.clone()
	}

	pub fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	/// Cancels every subscription and releases the transport.
	///
	/// Calling it again has no effect.
	pub async fn disconnect(&self) {
		if !self.connected.swap(false, Ordering::SeqCst) {
			return;
		}
		let cancelled = self.subscriptions.cancel_all();
		if let Err(e) = self.transport.close().await {
			tracing::warn!("Failed to close transport: {}", e);
		}
		tracing::info!(chain_id = %self.chain_id(), cancelled, "Disconnected from chain");
	}

	pub(crate) fn ensure_connected(&self) -> Result<(), ConnectionError> {
		if self.is_connected() {
			Ok(())
		} else {
			Err(ConnectionError::Disconnected)
		}
	}

	pub async fn height(&self) -> Result<u64, ConnectionError> {
		self.ensure_connected()?;
		Ok(self.transport.status().await?.height)
	}

	pub(crate) fn address_of(&self, query: &AccountQuery) -> Result<Address, ConnectionError> {
		self.reader.address_of(query)
	}

	/// The next nonce the account must sign with. Unknown signers start at 0.
	pub async fn get_nonce(&self, query: &AccountQuery) -> Result<Nonce, ConnectionError> {
		self.ensure_connected()?;
		self.reader.nonce(&self.address_of(query)?).await
	}

	/// Balance and public key of an account, `None` if it never held funds.
	pub async fn get_account(&self, query: &AccountQuery) -> Result<Option<Account>, ConnectionError> {
		self.ensure_connected()?;
		self.reader.account(query).await
	}

	/// Submits postable bytes.
	///
	/// Returns once the node admitted the transaction. Inclusion is tracked
	/// by the returned handle. A refusal at admission fails this call.
	#[instrument(skip_all, fields(chain_id = %self.chain_id()))]
	pub async fn post_tx(&self, bytes: &[u8]) -> Result<PostTxResponse, ConnectionError> {
		self.ensure_connected()?;
		let transaction_id = transaction_id_of(bytes);

		// Watch before broadcasting so the inclusion event cannot be missed.
		let watcher = self.live_tx(&TxQuery::by_id(transaction_id.clone())).await?;

		let response = self.transport.broadcast_tx_sync(bytes).await?;
		if response.code != 0 {
			tracing::warn!(
				tx_id = %truncate_id(transaction_id.as_str()),
				code = response.code,
				"Transaction rejected: {}",
				response.log
			);
			return Err(ConnectionError::Rejected {
				code: response.code,
				log: response.log,
			});
		}
		if response.hash != transaction_id {
			tracing::warn!(
				expected = %transaction_id,
				reported = %response.hash,
				"Node reported a different transaction id"
			);
		}

		tracing::info!(tx_id = %truncate_id(transaction_id.as_str()), "Transaction submitted");

		Ok(PostTxResponse {
			transaction_id,
			block_info: BlockInfoHandle::track(watcher),
		})
	}

	/// Looks up one transaction by id.
	pub async fn get_tx(&self, id: &TransactionId) -> Result<TransactionRecord, ConnectionError> {
		self.search_tx(&TxQuery::by_id(id.clone()))
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| ConnectionError::NotFound("transaction does not exist".to_string()))
	}

	pub(crate) fn transport_query(&self, query: &TxQuery) -> Result<TransportQuery, ConnectionError> {
		if query.is_empty() {
			return Err(ConnectionError::InvalidQuery(
				"query needs an id, a height, a height range or an address".to_string(),
			));
		}
		let mut tags = Vec::new();
		if let Some(address) = &query.sent_from_or_to {
			tags.push(cash_tag(address)?);
		}
		Ok(TransportQuery {
			tags,
			hash: query.id.clone(),
			height: query.height,
			min_height: query.min_height,
			max_height: query.max_height,
		})
	}

	/// Searches committed transactions, ordered by height then position.
	///
	/// A `max_height` at or above the current height is treated as open.
	pub async fn search_tx(&self, query: &TxQuery) -> Result<Vec<TransactionRecord>, ConnectionError> {
		self.ensure_connected()?;
		let mut transport_query = self.transport_query(query)?;
		if let Some(max) = transport_query.max_height {
			if max >= self.height().await? {
				transport_query.max_height = None;
			}
		}
		if let (Some(min), Some(max)) = (transport_query.min_height, transport_query.max_height) {
			if min > max {
				return Ok(Vec::new());
			}
		}

		let mut responses = self.transport.tx_search(&transport_query).await?;
		responses.sort_by_key(|r| (r.height, r.index));
		tracing::trace!(chain_id = %self.chain_id(), results = responses.len(), "Searched transactions");

		responses
			.into_iter()
			.map(|r| decode_tx_response(self.chain_id(), r).map_err(ConnectionError::from))
			.collect()
	}

	async fn minimal_fee(&self) -> Result<Option<Amount>, ConnectionError> {
		let fee = self
			.minimal_fee
			.get_or_try_init(|| async {
				self.ensure_connected()?;
				match self.reader.query_first(CONFIG_PATH, CASH_CONFIG_KEY).await? {
					Some(model) => Ok::<_, ConnectionError>(decode_cash_config(&model.value)?),
					None => Ok(None),
				}
			})
			.await?;
		Ok(fee.clone())
	}

	/// Attaches the chain's default fee, keeping an explicitly chosen payer.
	///
	/// The configured fee wins over the chain minimum. The minimum is read
	/// once per connection. A chain without fees leaves the transaction
	/// without one.
	pub async fn with_default_fee(
		&self,
		mut transaction: UnsignedTransaction,
	) -> Result<UnsignedTransaction, ConnectionError> {
		let tokens = match &self.default_fee {
			Some(fee) => Some(fee.clone()),
			None => self.minimal_fee().await?,
		};
		let payer = transaction.fee.take().and_then(|fee| fee.payer);
		Ok(match tokens {
			Some(tokens) => transaction.with_fee(Fee { payer, tokens }),
			None => transaction,
		})
	}

	/// Looks up usernames by name or by owner, sorted by name.
	pub async fn get_usernames(&self, query: &UsernameQuery) -> Result<Vec<BnsUsernameNft>, ConnectionError> {
		self.ensure_connected()?;
		let models = match query {
			UsernameQuery::Username(name) => self.transport.abci_query(USERNAME_PATH, name.as_bytes()).await?,
			UsernameQuery::Owner(owner) => {
				self.transport
					.abci_query(USERNAME_OWNER_PATH, &owner.data()?)
					.await?
			},
		};

		let mut names = models
			.into_iter()
			.map(|model| {
				let username = String::from_utf8_lossy(&model.key).into_owned();
				decode_username_token(&username, self.prefix(), &model.value)
			})
			.collect::<Result<Vec<_>, _>>()?;
		names.sort_by(|a, b| a.id.cmp(&b.id));
		Ok(names)
	}

	async fn scan(&self, path: &str) -> Result<Vec<QueryModel>, ConnectionError> {
		self.ensure_connected()?;
		Ok(self
			.transport
			.abci_query(&format!("{}{}", path, PREFIX_QUERY), &[])
			.await?)
	}

	/// Every stored version of every electorate, ordered by id and version.
	pub async fn get_electorates(&self) -> Result<Vec<Electorate>, ConnectionError> {
		let mut electorates = self
			.scan(ELECTORATE_PATH)
			.await?
			.into_iter()
			.map(|model| decode_electorate(self.prefix(), &model.key, &model.value))
			.collect::<Result<Vec<_>, _>>()?;
		electorates.sort_by_key(|e| (e.id, e.version));
		Ok(electorates)
	}

	/// Every stored version of every election rule, ordered by id and version.
	pub async fn get_election_rules(&self) -> Result<Vec<ElectionRule>, ConnectionError> {
		let mut rules = self
			.scan(ELECTION_RULE_PATH)
			.await?
			.into_iter()
			.map(|model| decode_election_rule(self.prefix(), &model.key, &model.value))
			.collect::<Result<Vec<_>, _>>()?;
		rules.sort_by_key(|r| (r.id, r.version));
		Ok(rules)
	}

	pub async fn get_proposals(&self) -> Result<Vec<Proposal>, ConnectionError> {
		let mut proposals = self
			.scan(PROPOSAL_PATH)
			.await?
			.into_iter()
			.map(|model| decode_proposal(self.prefix(), &model.key, &model.value))
			.collect::<Result<Vec<_>, _>>()?;
		proposals.sort_by_key(|p| p.id);
		Ok(proposals)
	}

	/// The token registered under `ticker`, if any.
	pub async fn get_token(&self, ticker: &str) -> Result<Option<Token>, ConnectionError> {
		self.ensure_connected()?;
		match self.reader.query_first(TOKEN_PATH, ticker.as_bytes()).await? {
			Some(model) => Ok(Some(decode_token(&model.key, &model.value)?)),
			None => Ok(None),
		}
	}

	/// All registered tokens, sorted by ticker.
	pub async fn get_all_tokens(&self) -> Result<Vec<Token>, ConnectionError> {
		let mut tokens = self
			.scan(TOKEN_PATH)
			.await?
			.into_iter()
			.map(|model| decode_token(&model.key, &model.value))
			.collect::<Result<Vec<_>, _>>()?;
		tokens.sort_by(|a, b| a.token_ticker.cmp(&b.token_ticker));
		Ok(tokens)
	}

	/// Swaps matching the query, with state derived from claim and abort
	/// transactions.
	pub async fn get_swaps(&self, query: &SwapQuery) -> Result<Vec<AtomicSwap>, ConnectionError> {
		self.ensure_connected()?;
		self.reader.swaps(query).await
	}
}

/// Read side of a connection, cheap to clone into subscription tasks.
#[derive(Clone)]
pub(crate) struct ChainReader {
	transport: Arc<dyn TransportInterface>,
	chain_id: ChainId,
	prefix: AddressPrefix,
}

impl ChainReader {
	fn address_of(&self, query: &AccountQuery) -> Result<Address, ConnectionError> {
		match query {
			AccountQuery::Address(address) => Ok(address.clone()),
			AccountQuery::Pubkey(pubkey) => Ok(pubkey_to_address(self.prefix, pubkey)?),
		}
	}

	async fn query_first(&self, path: &str, key: &[u8]) -> Result<Option<QueryModel>, ConnectionError> {
		Ok(self.transport.abci_query(path, key).await?.into_iter().next())
	}

	pub(crate) async fn nonce(&self, address: &Address) -> Result<Nonce, ConnectionError> {
		match self.query_first(AUTH_PATH, &address.data()?).await? {
			Some(model) => Ok(decode_user_data(&model.value)?.nonce),
			None => Ok(Nonce::default()),
		}
	}

	pub(crate) async fn account(&self, query: &AccountQuery) -> Result<Option<Account>, ConnectionError> {
		let address = self.address_of(query)?;
		let raw = address.data()?;

		let Some(wallet) = self.query_first(WALLET_PATH, &raw).await? else {
			return Ok(None);
		};
		let balance = decode_wallet(&wallet.value)?;

		let pubkey = match query {
			AccountQuery::Pubkey(pubkey) => Some(pubkey.clone()),
			AccountQuery::Address(_) => match self.query_first(AUTH_PATH, &raw).await? {
				Some(model) => decode_user_data(&model.value)?.pubkey,
				None => None,
			},
		};

		Ok(Some(Account {
			address,
			pubkey,
			balance,
		}))
	}

	async fn confirmed_by_tag(&self, query: TransportQuery) -> Result<Vec<ConfirmedTransaction>, ConnectionError> {
		let mut responses = self.transport.tx_search(&query).await?;
		responses.sort_by_key(|r| (r.height, r.index));
		let mut confirmed = Vec::new();
		for response in responses {
			if let TransactionRecord::Confirmed(tx) = decode_tx_response(&self.chain_id, response)? {
				confirmed.push(tx);
			}
		}
		Ok(confirmed)
	}

	pub(crate) async fn swaps(&self, query: &SwapQuery) -> Result<Vec<AtomicSwap>, ConnectionError> {
		let offers = self
			.confirmed_by_tag(TransportQuery::with_tag(swap_query_tag(query)?))
			.await?;

		let mut swaps = Vec::new();
		for offer in offers {
			let TransactionKind::SwapOffer(data) = offer.transaction.transaction.kind else {
				continue;
			};
			let id = SwapId(offer.result);
			let swap_data = SwapData {
				id: id.clone(),
				hash: data.hash,
				sender: data.sender,
				recipient: data.recipient,
				arbiter: None,
				amounts: data.amounts,
				timeout: data.timeout,
				memo: data.memo,
			};

			let mut state = SwapState::Open;
			let settlements = self
				.confirmed_by_tag(TransportQuery::with_tag(bucket_tag(SWAP_BUCKET, id.as_bytes())))
				.await?;
			for settlement in settlements {
				match settlement.transaction.transaction.kind {
					TransactionKind::SwapClaim(claim) if claim.swap_id == id => {
						if !preimage_matches(&claim.preimage, &swap_data.hash) {
							tracing::warn!(
								swap_id = %truncate_id(&hex::encode(id.as_bytes())),
								tx_id = %truncate_id(settlement.transaction_id.as_str()),
								"Ignoring claim whose preimage does not match the swap hash"
							);
							continue;
						}
						state = SwapState::Claimed {
							preimage: claim.preimage,
						};
						break;
					},
					TransactionKind::SwapAbort(abort) if abort.swap_id == id => {
						state = SwapState::Aborted;
						break;
					},
					_ => {},
				}
			}

			swaps.push(AtomicSwap {
				data: swap_data,
				state,
			});
		}
		Ok(swaps)
	}
}

fn preimage_matches(preimage: &Preimage, hash: &Hash) -> bool {
	Sha256::digest(preimage.as_bytes()).as_slice() == hash.as_bytes()
}

/// Turns a transport response into a transaction record.
pub(crate) fn decode_tx_response(
	chain_id: &ChainId,
	response: TxResponse,
) -> Result<TransactionRecord, CodecError> {
	if response.result.code == 0 {
		let transaction = parse_tx(&response.tx, chain_id)?;
		Ok(TransactionRecord::Confirmed(ConfirmedTransaction {
			transaction_id: response.hash,
			height: response.height,
			index: response.index,
			transaction,
			result: response.result.data,
			log: response.result.log,
		}))
	} else {
		Ok(TransactionRecord::Failed(FailedTransaction {
			transaction_id: response.hash,
			height: response.height,
			index: response.index,
			code: response.result.code,
			message: response.result.log,
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::fixtures::{cash, fixture, signer, FEE};
	use crate::implementations::memory::MemoryChain;
	use bcp_types::{
		create_timestamp_timeout, BlockInfo, ChainAddressPair, Hash, Preimage, RegisterUsernameTransaction,
		SwapClaimTransaction, SwapOfferTransaction, TransferUsernameTransaction,
		UpdateTargetsOfUsernameTransaction,
	};
	use sha2::{Digest, Sha256};

	#[tokio::test]
	async fn test_send_and_confirm() {
		let fx = fixture().await;
		let recipient = fx.address(&signer(2));
		let posted = fx.send(&fx.faucet, &recipient, 2_000_000_000).await;

		let info = posted.block_info.wait_for_inclusion().await.unwrap();
		assert!(matches!(info, BlockInfo::Succeeded { height: 1, .. }));

		let record = fx.connection.get_tx(&posted.transaction_id).await.unwrap();
		let confirmed = record.as_confirmed().expect("confirmed transaction");
		assert_eq!(confirmed.transaction_id, posted.transaction_id);
		assert!(matches!(confirmed.transaction.transaction.kind, TransactionKind::Send(_)));

		let account = fx
			.connection
			.get_account(&AccountQuery::Address(recipient))
			.await
			.unwrap()
			.expect("funded account");
		assert_eq!(account.balance, vec![cash(2_000_000_000)]);
		assert!(account.pubkey.is_none());

		let faucet = AccountQuery::Pubkey(fx.faucet.identity(&fx.chain_id()).pubkey);
		assert_eq!(fx.connection.get_nonce(&faucet).await.unwrap(), Nonce::new(1));
		let faucet_account = fx.connection.get_account(&faucet).await.unwrap().unwrap();
		assert!(faucet_account.pubkey.is_some());
	}

	#[tokio::test]
	async fn test_failed_inclusion_reports_invalid_amount() {
		let fx = fixture().await;
		let broke = signer(3);
		let broke_address = fx.address(&broke);
		fx.send(&fx.faucet, &broke_address, FEE)
			.await
			.block_info
			.wait_for_inclusion()
			.await
			.unwrap();

		let posted = fx.send(&broke, &fx.address(&signer(4)), 1_000_000_000).await;
		let info = posted.block_info.wait_for_inclusion().await.unwrap();
		match info {
			BlockInfo::Failed { height, code, message } => {
				assert_eq!(height, 2);
				assert_eq!(code, 13);
				assert!(message.contains("invalid amount"));
			},
			other => panic!("expected failure, got {:?}", other),
		}

		let results = fx.connection.search_tx(&TxQuery::by_id(posted.transaction_id)).await.unwrap();
		assert_eq!(results.len(), 1);
		assert!(matches!(&results[0], TransactionRecord::Failed(tx) if tx.code == 13));

		// The failed transaction left the fee and the nonce untouched.
		let query = AccountQuery::Address(broke_address);
		assert_eq!(fx.connection.get_nonce(&query).await.unwrap(), Nonce::new(0));
		let account = fx.connection.get_account(&query).await.unwrap().unwrap();
		assert_eq!(account.balance, vec![cash(FEE)]);
	}

	#[tokio::test]
	async fn test_get_tx_not_found() {
		let fx = fixture().await;
		let missing = TransactionId::from_hash(&[0xaa; 32]);
		match fx.connection.get_tx(&missing).await {
			Err(ConnectionError::NotFound(message)) => assert_eq!(message, "transaction does not exist"),
			other => panic!("expected not found, got {:?}", other.map(|_| ())),
		}
	}

	#[tokio::test]
	async fn test_search_by_address_and_height_range() {
		let fx = fixture().await;
		let recipient = fx.address(&signer(2));
		for _ in 0..3 {
			fx.send(&fx.faucet, &recipient, 1).await.block_info.wait_for_inclusion().await.unwrap();
		}

		let all = fx
			.connection
			.search_tx(&TxQuery::sent_from_or_to(recipient.clone()).with_min_height(1).with_max_height(500_000_000))
			.await
			.unwrap();
		assert_eq!(all.iter().map(|r| r.height()).collect::<Vec<_>>(), vec![1, 2, 3]);

		let later = fx
			.connection
			.search_tx(&TxQuery::sent_from_or_to(recipient.clone()).with_min_height(2))
			.await
			.unwrap();
		assert_eq!(later.len(), 2);

		let inverted = fx
			.connection
			.search_tx(&TxQuery::height_range(Some(3), Some(2)))
			.await
			.unwrap();
		assert!(inverted.is_empty());

		let stranger = fx.address(&signer(9));
		assert!(fx.connection.search_tx(&TxQuery::sent_from_or_to(stranger)).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_empty_query_is_invalid() {
		let fx = fixture().await;
		let result = fx.connection.search_tx(&TxQuery::default()).await;
		assert!(matches!(result, Err(ConnectionError::InvalidQuery(_))));
	}

	#[tokio::test]
	async fn test_with_default_fee() {
		let fx = fixture().await;
		let creator = fx.faucet.identity(&fx.chain_id());
		let kind = TransactionKind::SwapAbort(bcp_types::SwapAbortTransaction {
			swap_id: SwapId(vec![1]),
		});

		let filled = fx
			.connection
			.with_default_fee(UnsignedTransaction::new(creator.clone(), kind.clone()))
			.await
			.unwrap();
		assert_eq!(filled.fee.map(|fee| fee.tokens), Some(cash(FEE)));

		let payer = fx.address(&signer(5));
		let explicit = UnsignedTransaction::new(creator.clone(), kind.clone()).with_fee(Fee {
			payer: Some(payer.clone()),
			tokens: cash(1),
		});
		let filled = fx.connection.with_default_fee(explicit).await.unwrap();
		let fee = filled.fee.unwrap();
		assert_eq!(fee.payer, Some(payer));
		assert_eq!(fee.tokens, cash(FEE));

		let configured = ChainConnection::with_transport(
			Box::new(fx.chain.transport()),
			ConnectionOptions {
				expected_chain_id: None,
				default_fee: Some(cash(3 * FEE)),
			},
		)
		.await
		.unwrap();
		let filled = configured.with_default_fee(UnsignedTransaction::new(creator, kind)).await.unwrap();
		assert_eq!(filled.fee.map(|fee| fee.tokens), Some(cash(3 * FEE)));
	}

	#[tokio::test]
	async fn test_without_fees_no_fee_is_attached() {
		let chain = MemoryChain::new(ChainId::new("test-chain-free"));
		let connection = ChainConnection::with_transport(Box::new(chain.transport()), ConnectionOptions::default())
			.await
			.unwrap();
		let creator = signer(1).identity(connection.chain_id());
		let transaction = UnsignedTransaction::new(
			creator,
			TransactionKind::SwapAbort(bcp_types::SwapAbortTransaction {
				swap_id: SwapId(vec![1]),
			}),
		);
		assert!(connection.with_default_fee(transaction).await.unwrap().fee.is_none());
	}

	#[tokio::test]
	async fn test_chain_id_mismatch() {
		let chain = MemoryChain::new(ChainId::new("test-chain-a"));
		let result = ChainConnection::with_transport(
			Box::new(chain.transport()),
			ConnectionOptions {
				expected_chain_id: Some(ChainId::new("test-chain-b")),
				default_fee: None,
			},
		)
		.await;
		assert!(matches!(result, Err(ConnectionError::ChainIdMismatch { .. })));
	}

	#[tokio::test]
	async fn test_disconnect_is_idempotent() {
		let fx = fixture().await;
		let _heights = fx.connection.watch_block_heights().await.unwrap();
		let _nonce = fx
			.connection
			.watch_nonce(&AccountQuery::Address(fx.address(&fx.faucet)))
			.await
			.unwrap();
		assert_eq!(fx.connection.active_subscriptions(), 2);

		fx.connection.disconnect().await;
		fx.connection.disconnect().await;
		assert!(!fx.connection.is_connected());
		assert_eq!(fx.connection.active_subscriptions(), 0);
		assert!(matches!(fx.connection.height().await, Err(ConnectionError::Disconnected)));
	}

	#[tokio::test]
	async fn test_username_transfer_then_cosigned_update() {
		let fx = fixture().await;
		let alice = signer(6);
		let bob = signer(7);
		let alice_address = fx.address(&alice);
		let bob_address = fx.address(&bob);
		fx.send(&fx.faucet, &alice_address, 1_000_000_000)
			.await
			.block_info
			.wait_for_inclusion()
			.await
			.unwrap();

		let targets = vec![ChainAddressPair {
			chain_id: ChainId::new("other-chain"),
			address: "alice-elsewhere".to_string(),
		}];
		let register = fx
			.sign(
				&alice,
				TransactionKind::RegisterUsername(RegisterUsernameTransaction {
					username: "alice*iov".to_string(),
					targets: targets.clone(),
				}),
			)
			.await;
		assert!(fx.post(&register).await.block_info.wait_for_inclusion().await.unwrap().is_succeeded());

		let transfer = fx
			.sign(
				&alice,
				TransactionKind::TransferUsername(TransferUsernameTransaction {
					username: "alice*iov".to_string(),
					new_owner: bob_address.clone(),
				}),
			)
			.await;
		assert!(fx.post(&transfer).await.block_info.wait_for_inclusion().await.unwrap().is_succeeded());

		let new_targets = vec![ChainAddressPair {
			chain_id: ChainId::new("other-chain"),
			address: "bob-elsewhere".to_string(),
		}];
		let update = TransactionKind::UpdateTargetsOfUsername(UpdateTargetsOfUsernameTransaction {
			username: "alice*iov".to_string(),
			targets: new_targets.clone(),
		});

		// Alice pays the fee but no longer owns the name.
		let unauthorized = fx.sign(&alice, update.clone()).await;
		let info = fx.post(&unauthorized).await.block_info.wait_for_inclusion().await.unwrap();
		assert!(matches!(info, BlockInfo::Failed { code: 2, .. }));

		let signed = fx.sign(&alice, update).await;
		let bob_nonce = fx.connection.get_nonce(&AccountQuery::Address(bob_address.clone())).await.unwrap();
		let cosigned = bob.append_signature(&signed, bob_nonce).await.unwrap();
		assert!(fx.post(&cosigned).await.block_info.wait_for_inclusion().await.unwrap().is_succeeded());

		let names = fx
			.connection
			.get_usernames(&UsernameQuery::Username("alice*iov".to_string()))
			.await
			.unwrap();
		assert_eq!(names.len(), 1);
		assert_eq!(names[0].owner, bob_address);
		assert_eq!(names[0].targets, new_targets);

		let owned = fx.connection.get_usernames(&UsernameQuery::Owner(bob_address)).await.unwrap();
		assert_eq!(owned.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["alice*iov"]);
		assert!(fx
			.connection
			.get_usernames(&UsernameQuery::Owner(alice_address))
			.await
			.unwrap()
			.is_empty());
	}

	#[tokio::test]
	async fn test_get_swaps_follows_claim() {
		let fx = fixture().await;
		let recipient = signer(8);
		let recipient_address = fx.address(&recipient);
		fx.send(&fx.faucet, &recipient_address, 1_000_000_000)
			.await
			.block_info
			.wait_for_inclusion()
			.await
			.unwrap();

		let preimage = Preimage(vec![42u8; 32]);
		let hash = Hash::from_slice(&Sha256::digest(preimage.as_bytes())).unwrap();
		let offer = fx
			.sign(
				&fx.faucet,
				TransactionKind::SwapOffer(SwapOfferTransaction {
					sender: fx.address(&fx.faucet),
					recipient: recipient_address.clone(),
					hash: hash.clone(),
					timeout: create_timestamp_timeout(3600),
					amounts: vec![cash(5_000_000_000)],
					memo: None,
				}),
			)
			.await;
		let info = fx.post(&offer).await.block_info.wait_for_inclusion().await.unwrap();
		let BlockInfo::Succeeded { result, .. } = info else {
			panic!("offer failed: {:?}", info);
		};
		let swap_id = SwapId(result);

		let open = fx.connection.get_swaps(&SwapQuery::Recipient(recipient_address.clone())).await.unwrap();
		assert_eq!(open.len(), 1);
		assert_eq!(open[0].data.id, swap_id);
		assert!(open[0].is_open());

		let claim = fx
			.sign(
				&recipient,
				TransactionKind::SwapClaim(SwapClaimTransaction {
					swap_id: swap_id.clone(),
					preimage: preimage.clone(),
				}),
			)
			.await;
		assert!(fx.post(&claim).await.block_info.wait_for_inclusion().await.unwrap().is_succeeded());

		let by_hash = fx.connection.get_swaps(&SwapQuery::Hash(hash)).await.unwrap();
		assert_eq!(by_hash.len(), 1);
		assert_eq!(by_hash[0].preimage(), Some(&preimage));

		let account = fx
			.connection
			.get_account(&AccountQuery::Address(recipient_address))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(account.balance, vec![cash(1_000_000_000 - FEE + 5_000_000_000)]);
	}

	/// Delegates to a memory chain but reports one extra transaction to
	/// searches carrying `tag`.
	struct InjectingTransport {
		inner: crate::implementations::memory::MemoryTransport,
		tag: crate::QueryTag,
		injected: TxResponse,
	}

	#[async_trait::async_trait]
	impl TransportInterface for InjectingTransport {
		fn config_schema(&self) -> Box<dyn bcp_types::ConfigSchema> {
			self.inner.config_schema()
		}

		async fn status(&self) -> Result<crate::ChainStatus, crate::TransportError> {
			self.inner.status().await
		}

		async fn abci_query(&self, path: &str, data: &[u8]) -> Result<Vec<QueryModel>, crate::TransportError> {
			self.inner.abci_query(path, data).await
		}

		async fn broadcast_tx_sync(&self, tx: &[u8]) -> Result<crate::BroadcastResponse, crate::TransportError> {
			self.inner.broadcast_tx_sync(tx).await
		}

		async fn tx_search(&self, query: &TransportQuery) -> Result<Vec<TxResponse>, crate::TransportError> {
			let mut responses = self.inner.tx_search(query).await?;
			if query.tags.contains(&self.tag) {
				responses.push(self.injected.clone());
			}
			Ok(responses)
		}

		async fn subscribe_txs(
			&self,
			query: &TransportQuery,
		) -> Result<(crate::TransportSubscriptionId, crate::TxEventReceiver), crate::TransportError> {
			self.inner.subscribe_txs(query).await
		}

		async fn subscribe_heights(
			&self,
		) -> Result<(crate::TransportSubscriptionId, crate::HeightReceiver), crate::TransportError> {
			self.inner.subscribe_heights().await
		}

		async fn unsubscribe(&self, id: crate::TransportSubscriptionId) -> Result<(), crate::TransportError> {
			self.inner.unsubscribe(id).await
		}

		async fn close(&self) -> Result<(), crate::TransportError> {
			self.inner.close().await
		}
	}

	#[tokio::test]
	async fn test_get_swaps_ignores_claim_with_wrong_preimage() {
		let fx = fixture().await;
		let recipient = signer(8);
		let recipient_address = fx.address(&recipient);

		let preimage = Preimage(vec![42u8; 32]);
		let hash = Hash::from_slice(&Sha256::digest(preimage.as_bytes())).unwrap();
		let offer = fx
			.sign(
				&fx.faucet,
				TransactionKind::SwapOffer(SwapOfferTransaction {
					sender: fx.address(&fx.faucet),
					recipient: recipient_address,
					hash,
					timeout: create_timestamp_timeout(3600),
					amounts: vec![cash(5_000_000_000)],
					memo: None,
				}),
			)
			.await;
		let info = fx.post(&offer).await.block_info.wait_for_inclusion().await.unwrap();
		let BlockInfo::Succeeded { result, .. } = info else {
			panic!("offer failed: {:?}", info);
		};
		let swap_id = SwapId(result);

		// A claim the chain would never accept, reported as successful.
		let forged = fx
			.sign(
				&recipient,
				TransactionKind::SwapClaim(SwapClaimTransaction {
					swap_id: swap_id.clone(),
					preimage: Preimage(vec![1u8; 32]),
				}),
			)
			.await;
		let bytes = bcp_codec::bytes_to_post(&forged).unwrap();
		let transport = InjectingTransport {
			inner: fx.chain.transport(),
			tag: bucket_tag(SWAP_BUCKET, swap_id.as_bytes()),
			injected: TxResponse {
				hash: transaction_id_of(&bytes),
				height: fx.chain.height() + 1,
				index: 0,
				tx: bytes,
				result: crate::TxResult {
					code: 0,
					log: None,
					data: Vec::new(),
				},
			},
		};
		let connection = ChainConnection::with_transport(Box::new(transport), ConnectionOptions::default())
			.await
			.unwrap();

		let swaps = connection.get_swaps(&SwapQuery::Id(swap_id)).await.unwrap();
		assert_eq!(swaps.len(), 1);
		assert!(swaps[0].is_open());
		assert_eq!(swaps[0].preimage(), None);
	}

	#[tokio::test]
	async fn test_governance_proposal_and_votes() {
		use bcp_types::{
			CreateProposalTransaction, Elector, Fraction, ProposalAction, ProposalResult, ProposalStatus,
			ProposalVotes, VersionedId, VoteOption, VoteTransaction,
		};

		let fx = fixture().await;
		let board_member = signer(2);
		let outsider = signer(3);
		let faucet_address = fx.address(&fx.faucet);
		let member_address = fx.address(&board_member);
		for address in [member_address.clone(), fx.address(&outsider)] {
			fx.send(&fx.faucet, &address, 1_000_000_000)
				.await
				.block_info
				.wait_for_inclusion()
				.await
				.unwrap();
		}

		let electorate = Electorate {
			id: 1,
			version: 1,
			admin: faucet_address.clone(),
			title: "Board".to_string(),
			electors: vec![
				Elector {
					address: faucet_address.clone(),
					weight: 2,
				},
				Elector {
					address: member_address.clone(),
					weight: 1,
				},
			],
			total_weight: 3,
		};
		let rule = ElectionRule {
			id: 1,
			version: 1,
			admin: faucet_address.clone(),
			electorate_id: 1,
			title: "Simple majority".to_string(),
			voting_period: 3600,
			threshold: Fraction {
				numerator: 1,
				denominator: 2,
			},
			quorum: None,
		};
		fx.chain.add_electorate(electorate.clone());
		fx.chain.add_election_rule(rule.clone());
		assert_eq!(fx.connection.get_electorates().await.unwrap(), vec![electorate]);
		assert_eq!(fx.connection.get_election_rules().await.unwrap(), vec![rule]);

		let create = fx
			.sign(
				&fx.faucet,
				TransactionKind::CreateProposal(CreateProposalTransaction {
					title: "Adopt the charter".to_string(),
					action: ProposalAction::CreateTextResolution {
						resolution: "The charter is adopted".to_string(),
					},
					description: "First resolution".to_string(),
					election_rule_id: 1,
					start_time: chrono::Utc::now().timestamp(),
					author: faucet_address.clone(),
				}),
			)
			.await;
		assert!(fx.post(&create).await.block_info.wait_for_inclusion().await.unwrap().is_succeeded());

		let vote = |selection| {
			TransactionKind::Vote(VoteTransaction {
				proposal_id: 1,
				selection,
				voter: None,
			})
		};
		let yes = fx.sign(&fx.faucet, vote(VoteOption::Yes)).await;
		assert!(fx.post(&yes).await.block_info.wait_for_inclusion().await.unwrap().is_succeeded());
		let no = fx.sign(&board_member, vote(VoteOption::No)).await;
		assert!(fx.post(&no).await.block_info.wait_for_inclusion().await.unwrap().is_succeeded());

		let again = fx.sign(&board_member, vote(VoteOption::Yes)).await;
		let info = fx.post(&again).await.block_info.wait_for_inclusion().await.unwrap();
		assert!(matches!(info, BlockInfo::Failed { code: 6, .. }));
		let stranger = fx.sign(&outsider, vote(VoteOption::Yes)).await;
		let info = fx.post(&stranger).await.block_info.wait_for_inclusion().await.unwrap();
		assert!(matches!(info, BlockInfo::Failed { code: 2, .. }));

		let proposals = fx.connection.get_proposals().await.unwrap();
		assert_eq!(proposals.len(), 1);
		let open = &proposals[0];
		assert_eq!(open.id, 1);
		assert_eq!(open.author, faucet_address);
		assert_eq!(open.electorate, VersionedId { id: 1, version: 1 });
		assert_eq!(open.voting_end_time - open.voting_start_time, 3600);
		assert_eq!(
			open.votes,
			ProposalVotes {
				yes: 2,
				no: 1,
				abstain: 0,
			}
		);
		assert_eq!(open.status, ProposalStatus::Submitted);
		assert_eq!(open.result, ProposalResult::Undefined);

		fx.chain.advance_time(3601);
		let closed = fx.connection.get_proposals().await.unwrap().remove(0);
		assert_eq!(closed.status, ProposalStatus::Closed);
		assert_eq!(closed.result, ProposalResult::Accepted);
	}

	#[tokio::test]
	async fn test_token_lookup() {
		let fx = fixture().await;
		for (ticker, name) in [("MASH", "Mash token"), ("CASH", "Main token")] {
			fx.chain.register_token(Token {
				token_ticker: ticker.to_string(),
				token_name: name.to_string(),
				fractional_digits: 9,
			});
		}

		let mash = fx.connection.get_token("MASH").await.unwrap().expect("registered token");
		assert_eq!(mash.token_name, "Mash token");
		assert_eq!(mash.fractional_digits, 9);
		assert!(fx.connection.get_token("BASH").await.unwrap().is_none());

		let tickers = fx
			.connection
			.get_all_tokens()
			.await
			.unwrap()
			.into_iter()
			.map(|token| token.token_ticker)
			.collect::<Vec<_>>();
		assert_eq!(tickers, vec!["CASH", "MASH"]);
	}
}
