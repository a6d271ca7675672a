//! Chain identifiers, public keys, nonces and signatures.

use crate::utils::hex_bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a chain, resolved from the node during connection setup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Signature algorithms understood by the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
	Ed25519,
}

/// A public key together with its algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PubkeyBundle {
	pub algo: Algorithm,
	#[serde(with = "hex_bytes")]
	pub data: Vec<u8>,
}

impl PubkeyBundle {
	pub fn ed25519(data: impl Into<Vec<u8>>) -> Self {
		Self {
			algo: Algorithm::Ed25519,
			data: data.into(),
		}
	}
}

/// A public key bound to the chain it is used on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicIdentity {
	pub chain_id: ChainId,
	pub pubkey: PubkeyBundle,
}

/// Replay-protection counter of a signer.
///
/// The value is the sequence the next transaction of the signer must carry.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Nonce(i64);

impl Nonce {
	pub fn new(value: i64) -> Self {
		Self(value)
	}

	pub fn value(&self) -> i64 {
		self.0
	}

	/// The nonce that follows this one once it has been consumed.
	pub fn next(&self) -> Self {
		Self(self.0.saturating_add(1))
	}
}

impl fmt::Display for Nonce {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// One signature over a transaction, including the nonce it commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullSignature {
	pub nonce: Nonce,
	pub pubkey: PubkeyBundle,
	#[serde(with = "hex_bytes")]
	pub signature: Vec<u8>,
}

/// Canonical identifier of a posted transaction (uppercase hex hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
	/// Builds an id from a hex string, normalizing to uppercase.
	pub fn new(id: impl AsRef<str>) -> Self {
		Self(id.as_ref().to_uppercase())
	}

	/// Builds an id from raw hash bytes.
	pub fn from_hash(hash: &[u8]) -> Self {
		Self(hex::encode_upper(hash))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for TransactionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transaction_id_normalizes_case() {
		assert_eq!(TransactionId::new("ab01"), TransactionId::new("AB01"));
		assert_eq!(TransactionId::from_hash(&[0xab, 0x01]).as_str(), "AB01");
	}

	#[test]
	fn test_nonce_next() {
		assert_eq!(Nonce::new(4).next(), Nonce::new(5));
		assert_eq!(Nonce::default().value(), 0);
	}
}
