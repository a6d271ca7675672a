//! One participant in an atomic swap.

use crate::{verify_preimage, SwapError, SwapSettings, SwapTerms};
use bcp_account::SignerService;
use bcp_codec::bytes_to_post;
use bcp_connection::{ChainConnection, ConnectionError};
use bcp_types::{
	create_timestamp_timeout, AccountQuery, Address, Amount, AtomicSwap, BlockInfo, Hash, Preimage,
	SwapAbortTransaction, SwapClaimTransaction, SwapData, SwapId, SwapOfferTransaction, SwapQuery,
	SwapState, SwapTimeout, TransactionKind, UnsignedTransaction,
};
use std::future::Future;
use tracing::instrument;

/// Drives one side of a swap across any number of connections.
///
/// The party signs every step with one key. Its address on each chain is
/// derived from that key and the chain's id.
pub struct SwapParty {
	signer: SignerService,
	settings: SwapSettings,
}

impl SwapParty {
	pub fn new(signer: SignerService, settings: SwapSettings) -> Self {
		Self { signer, settings }
	}

	/// This party's address on the chain behind `chain`.
	pub fn address(&self, chain: &ChainConnection) -> Result<Address, SwapError> {
		Ok(self.signer.address(chain.chain_id())?)
	}

	/// Locks `amounts` for `recipient` behind `hash`, opening a swap.
	#[instrument(skip_all, fields(chain_id = %chain.chain_id()))]
	pub async fn offer(
		&self,
		chain: &ChainConnection,
		recipient: Address,
		amounts: Vec<Amount>,
		hash: Hash,
	) -> Result<AtomicSwap, SwapError> {
		let timeout = create_timestamp_timeout(self.settings.offer_timeout.as_secs() as i64);
		self.lock(chain, recipient, amounts, hash, timeout).await
	}

	/// Answers a verified offer with a lock on another chain.
	///
	/// The counter offer reuses the offer's hash and expires first, so the
	/// offering party's claim on it always lands before its own offer can be
	/// aborted.
	#[instrument(skip_all, fields(chain_id = %chain.chain_id(), offer = %offer.data.id))]
	pub async fn counter_offer(
		&self,
		chain: &ChainConnection,
		offer: &AtomicSwap,
		recipient: Address,
		amounts: Vec<Amount>,
	) -> Result<AtomicSwap, SwapError> {
		let timeout = create_timestamp_timeout(self.settings.counter_offer_timeout.as_secs() as i64);
		let (SwapTimeout::Timestamp(counter), SwapTimeout::Timestamp(original)) = (timeout, offer.data.timeout)
		else {
			return Err(SwapError::ProtocolViolation(format!(
				"offer {} has timeout {:?}, only timestamp timeouts can be ordered",
				offer.data.id, offer.data.timeout
			)));
		};
		if counter >= original {
			return Err(SwapError::ProtocolViolation(format!(
				"counter offer would expire at {} but offer {} expires at {}",
				counter, offer.data.id, original
			)));
		}
		self.lock(chain, recipient, amounts, offer.data.hash, timeout).await
	}

	async fn lock(
		&self,
		chain: &ChainConnection,
		recipient: Address,
		amounts: Vec<Amount>,
		hash: Hash,
		timeout: SwapTimeout,
	) -> Result<AtomicSwap, SwapError> {
		let sender = self.address(chain)?;
		let result = self
			.submit(
				chain,
				TransactionKind::SwapOffer(SwapOfferTransaction {
					sender: sender.clone(),
					recipient: recipient.clone(),
					hash,
					timeout,
					amounts: amounts.clone(),
					memo: None,
				}),
			)
			.await?;

		let id = SwapId(result);
		tracing::info!(swap_id = %id, recipient = %recipient, "Locked funds in swap");
		Ok(AtomicSwap {
			data: SwapData {
				id,
				hash,
				sender,
				recipient,
				arbiter: None,
				amounts,
				timeout,
				memo: None,
			},
			state: SwapState::Open,
		})
	}

	/// Finds the counterparty's open offer and checks it against `terms`.
	///
	/// Waits for the offer to appear if it is not on chain yet.
	#[instrument(skip_all, fields(chain_id = %chain.chain_id(), sender = %terms.sender))]
	pub async fn wait_for_offer(
		&self,
		chain: &ChainConnection,
		terms: &SwapTerms,
	) -> Result<AtomicSwap, SwapError> {
		let mut swaps = chain.watch_swaps(&SwapQuery::Hash(terms.hash)).await?;
		let found = self
			.within("offer", async {
				while let Some(swap) = swaps.recv().await {
					if swap.data.sender == terms.sender {
						return Ok(swap);
					}
				}
				Err(SwapError::Connection(ConnectionError::SubscriptionClosed))
			})
			.await;
		swaps.cancel();
		let found = found?;

		terms.verify(&found)?;
		tracing::info!(swap_id = %found.data.id, "Verified counterparty offer");
		Ok(found)
	}

	/// Claims a swap with a preimage this party already knows.
	#[instrument(skip_all, fields(chain_id = %chain.chain_id(), swap_id = %swap.data.id))]
	pub async fn claim(
		&self,
		chain: &ChainConnection,
		swap: &AtomicSwap,
		preimage: &Preimage,
	) -> Result<(), SwapError> {
		if !swap.is_open() {
			return Err(SwapError::ProtocolViolation(format!(
				"swap {} is no longer open",
				swap.data.id
			)));
		}
		if !verify_preimage(preimage, &swap.data.hash) {
			return Err(SwapError::ProtocolViolation(format!(
				"preimage does not open swap {}",
				swap.data.id
			)));
		}
		let me = self.address(chain)?;
		if swap.data.recipient != me {
			return Err(SwapError::ProtocolViolation(format!(
				"swap {} pays {}, not this party",
				swap.data.id, swap.data.recipient
			)));
		}

		self.submit(
			chain,
			TransactionKind::SwapClaim(SwapClaimTransaction {
				swap_id: swap.data.id.clone(),
				preimage: preimage.clone(),
			}),
		)
		.await?;
		tracing::info!("Claimed swap");
		Ok(())
	}

	/// Waits for the counterparty to claim `swap` and returns the preimage
	/// the claim revealed.
	#[instrument(skip_all, fields(chain_id = %chain.chain_id(), swap_id = %swap.data.id))]
	pub async fn wait_for_preimage(
		&self,
		chain: &ChainConnection,
		swap: &AtomicSwap,
	) -> Result<Preimage, SwapError> {
		let mut updates = chain.watch_swaps(&SwapQuery::Id(swap.data.id.clone())).await?;
		let revealed = self
			.within("revealed preimage", async {
				while let Some(update) = updates.recv().await {
					match update.state {
						SwapState::Open => continue,
						SwapState::Claimed { preimage } => return Ok(preimage),
						SwapState::Aborted => {
							return Err(SwapError::ProtocolViolation(format!(
								"swap {} was aborted before its preimage was revealed",
								update.data.id
							)))
						},
					}
				}
				Err(SwapError::Connection(ConnectionError::SubscriptionClosed))
			})
			.await;
		updates.cancel();
		let preimage = revealed?;

		if !verify_preimage(&preimage, &swap.data.hash) {
			return Err(SwapError::ProtocolViolation(format!(
				"revealed preimage does not match the hash of swap {}",
				swap.data.id
			)));
		}
		tracing::info!("Observed revealed preimage");
		Ok(preimage)
	}

	/// Reads the preimage revealed on `observed` and uses it to claim
	/// `swap` on `chain`.
	pub async fn claim_with_revealed_preimage(
		&self,
		observed_chain: &ChainConnection,
		observed: &AtomicSwap,
		chain: &ChainConnection,
		swap: &AtomicSwap,
	) -> Result<Preimage, SwapError> {
		if observed.data.hash != swap.data.hash {
			return Err(SwapError::ProtocolViolation(format!(
				"swaps {} and {} are locked with different hashes",
				observed.data.id, swap.data.id
			)));
		}
		let preimage = self.wait_for_preimage(observed_chain, observed).await?;
		self.claim(chain, swap, &preimage).await?;
		Ok(preimage)
	}

	/// Returns the funds of an expired, unclaimed swap to its sender.
	#[instrument(skip_all, fields(chain_id = %chain.chain_id(), swap_id = %swap.data.id))]
	pub async fn abort(&self, chain: &ChainConnection, swap: &AtomicSwap) -> Result<(), SwapError> {
		let current = chain
			.get_swaps(&SwapQuery::Id(swap.data.id.clone()))
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| ConnectionError::NotFound(format!("swap {} does not exist", swap.data.id)))?;
		if !current.is_open() {
			return Err(SwapError::ProtocolViolation(format!(
				"swap {} is no longer open",
				swap.data.id
			)));
		}

		self.submit(
			chain,
			TransactionKind::SwapAbort(SwapAbortTransaction {
				swap_id: swap.data.id.clone(),
			}),
		)
		.await?;
		tracing::info!("Aborted swap");
		Ok(())
	}

	/// Signs, posts and waits for one transaction. Returns the execution
	/// result.
	async fn submit(&self, chain: &ChainConnection, kind: TransactionKind) -> Result<Vec<u8>, SwapError> {
		let transaction = UnsignedTransaction::new(self.signer.identity(chain.chain_id()), kind);
		let transaction = chain.with_default_fee(transaction).await?;
		let nonce = chain
			.get_nonce(&AccountQuery::Address(self.address(chain)?))
			.await?;
		let signed = self.signer.sign(transaction, nonce).await?;
		let posted = chain.post_tx(&bytes_to_post(&signed)?).await?;

		let info = tokio::time::timeout(
			self.settings.confirmation_timeout,
			posted.block_info.wait_for_inclusion(),
		)
		.await
		.map_err(|_| {
			SwapError::Timeout(format!(
				"transaction {} not included after {:?}",
				posted.transaction_id, self.settings.confirmation_timeout
			))
		})??;

		match info {
			BlockInfo::Succeeded { result, .. } => Ok(result),
			BlockInfo::Failed { code, message, .. } => {
				tracing::warn!(code, "Swap transaction failed: {}", message);
				Err(SwapError::TransactionFailed { code, message })
			},
			BlockInfo::Pending => Err(ConnectionError::SubscriptionClosed.into()),
		}
	}

	/// Bounds a wait for the counterparty by the confirmation timeout.
	async fn within<T>(
		&self,
		what: &str,
		wait: impl Future<Output = Result<T, SwapError>>,
	) -> Result<T, SwapError> {
		tokio::time::timeout(self.settings.confirmation_timeout, wait)
			.await
			.map_err(|_| {
				SwapError::Timeout(format!(
					"no {} after {:?}",
					what, self.settings.confirmation_timeout
				))
			})?
	}
}
