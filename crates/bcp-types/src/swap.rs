//! Atomic swap types.
//!
//! Swaps are never stored locally. An [`AtomicSwap`] is rebuilt on every
//! query from the offer transaction and, when present, the claim or abort
//! that closed it.

use crate::utils::hex_bytes;
use crate::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a swap hash lock in bytes (sha256).
pub const HASH_LENGTH: usize = 32;

/// A sha256 hash lock.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash(#[serde(with = "hex_bytes::array32")] pub [u8; HASH_LENGTH]);

impl Hash {
	/// Builds a hash from a slice, returning `None` unless it is exactly 32 bytes.
	pub fn from_slice(bytes: &[u8]) -> Option<Self> {
		<[u8; HASH_LENGTH]>::try_from(bytes).ok().map(Hash)
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Debug for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Hash({})", hex::encode(self.0))
	}
}

/// The secret whose hash unlocks a swap.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Preimage(#[serde(with = "hex_bytes")] pub Vec<u8>);

impl Preimage {
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Debug for Preimage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Preimage({})", hex::encode(&self.0))
	}
}

/// Opaque swap identifier assigned by the chain when the offer executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SwapId(#[serde(with = "hex_bytes")] pub Vec<u8>);

impl SwapId {
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Display for SwapId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&hex::encode(&self.0))
	}
}

/// Point after which a swap offer may be aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapTimeout {
	/// A block height.
	Height(u64),
	/// Unix time in seconds.
	Timestamp(i64),
}

impl SwapTimeout {
	/// Whether the timeout has passed at the given chain time.
	pub fn is_expired(&self, height: u64, timestamp: i64) -> bool {
		match self {
			SwapTimeout::Height(h) => height >= *h,
			SwapTimeout::Timestamp(t) => timestamp >= *t,
		}
	}
}

/// A timestamp timeout the given number of seconds from now.
pub fn create_timestamp_timeout(seconds_from_now: i64) -> SwapTimeout {
	SwapTimeout::Timestamp(chrono::Utc::now().timestamp() + seconds_from_now)
}

/// The locked side of a swap as recorded by its offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapData {
	pub id: SwapId,
	pub hash: Hash,
	pub sender: Address,
	pub recipient: Address,
	/// Escrow-backed swaps may name an arbiter. Hash-locked swaps never do.
	pub arbiter: Option<Address>,
	pub amounts: Vec<Amount>,
	pub timeout: SwapTimeout,
	pub memo: Option<String>,
}

/// Observed state of a swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SwapState {
	Open,
	Claimed { preimage: Preimage },
	Aborted,
}

/// A swap together with its observed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicSwap {
	pub data: SwapData,
	pub state: SwapState,
}

impl AtomicSwap {
	pub fn is_open(&self) -> bool {
		matches!(self.state, SwapState::Open)
	}

	/// The preimage revealed by the claim, if the swap was claimed.
	pub fn preimage(&self) -> Option<&Preimage> {
		match &self.state {
			SwapState::Claimed { preimage } => Some(preimage),
			_ => None,
		}
	}
}
