//! Cross-chain atomic swaps.
//!
//! Two parties exchange value on two independent chains by locking funds
//! behind the same sha256 hash. The party that knows the preimage claims
//! first and thereby reveals it; the other party reads it back from the
//! chain and claims in turn. Every observation of the counterparty's side is
//! checked against the agreed [`SwapTerms`] before anything is signed, and a
//! mismatch stops the swap with [`SwapError::ProtocolViolation`].

use bcp_account::AccountError;
use bcp_codec::CodecError;
use bcp_config::Config;
use bcp_connection::ConnectionError;
use bcp_types::{Address, Amount, AtomicSwap, Hash, Preimage};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

mod party;

pub use party::SwapParty;

/// Length of generated preimages in bytes.
pub const PREIMAGE_LENGTH: usize = 32;

/// Errors that can occur while running a swap.
#[derive(Debug, Error)]
pub enum SwapError {
	/// The counterparty's side does not match the agreed terms, or a
	/// preimage does not open the hash lock. The swap must not proceed.
	#[error("Protocol violation: {0}")]
	ProtocolViolation(String),
	/// The chain included the transaction but refused to execute it.
	#[error("Transaction failed with code {code}: {message}")]
	TransactionFailed { code: u32, message: String },
	#[error("Timed out: {0}")]
	Timeout(String),
	#[error("Connection error: {0}")]
	Connection(#[from] ConnectionError),
	#[error("Account error: {0}")]
	Account(#[from] AccountError),
	#[error("Codec error: {0}")]
	Codec(#[from] CodecError),
}

/// A fresh random preimage.
pub fn create_preimage() -> Preimage {
	Preimage(rand::random::<[u8; PREIMAGE_LENGTH]>().to_vec())
}

/// The hash lock for a preimage.
pub fn hash_preimage(preimage: &Preimage) -> Hash {
	Hash(Sha256::digest(preimage.as_bytes()).into())
}

/// Whether `preimage` opens `hash`.
pub fn verify_preimage(preimage: &Preimage, hash: &Hash) -> bool {
	hash_preimage(preimage) == *hash
}

/// What one party expects to find in the counterparty's offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapTerms {
	pub sender: Address,
	pub recipient: Address,
	pub amounts: Vec<Amount>,
	pub hash: Hash,
}

impl SwapTerms {
	/// Checks an observed swap against these terms.
	pub fn verify(&self, swap: &AtomicSwap) -> Result<(), SwapError> {
		let data = &swap.data;
		if data.hash != self.hash {
			return Err(SwapError::ProtocolViolation(format!(
				"swap {} is locked with a different hash",
				data.id
			)));
		}
		if data.sender != self.sender {
			return Err(SwapError::ProtocolViolation(format!(
				"swap {} was sent by {}, expected {}",
				data.id, data.sender, self.sender
			)));
		}
		if data.recipient != self.recipient {
			return Err(SwapError::ProtocolViolation(format!(
				"swap {} pays {}, expected {}",
				data.id, data.recipient, self.recipient
			)));
		}
		if sorted(&data.amounts) != sorted(&self.amounts) {
			return Err(SwapError::ProtocolViolation(format!(
				"swap {} locks {:?}, expected {:?}",
				data.id, data.amounts, self.amounts
			)));
		}
		if !swap.is_open() {
			return Err(SwapError::ProtocolViolation(format!(
				"swap {} is no longer open",
				data.id
			)));
		}
		Ok(())
	}
}

fn sorted(amounts: &[Amount]) -> Vec<Amount> {
	let mut amounts = amounts.to_vec();
	amounts.sort_by(|a, b| {
		a.token_ticker
			.cmp(&b.token_ticker)
			.then(a.fractional_digits.cmp(&b.fractional_digits))
			.then(a.quantity.cmp(&b.quantity))
	});
	amounts
}

/// Timing of one party's swap steps.
#[derive(Debug, Clone)]
pub struct SwapSettings {
	/// Lifetime of an opening offer.
	pub offer_timeout: Duration,
	/// Lifetime of a counter offer. Shorter than `offer_timeout` so the
	/// opening party cannot claim after the counterparty's refund window.
	pub counter_offer_timeout: Duration,
	/// How long to wait for an inclusion or a counterparty step.
	pub confirmation_timeout: Duration,
}

impl Default for SwapSettings {
	fn default() -> Self {
		Self {
			offer_timeout: Duration::from_secs(3600),
			counter_offer_timeout: Duration::from_secs(1800),
			confirmation_timeout: Duration::from_secs(120),
		}
	}
}

impl SwapSettings {
	pub fn from_config(config: &Config) -> Self {
		Self {
			offer_timeout: Duration::from_secs(config.swap.offer_timeout_secs),
			counter_offer_timeout: Duration::from_secs(config.swap.counter_offer_timeout_secs),
			confirmation_timeout: config.client.confirmation_timeout(),
		}
	}
}
