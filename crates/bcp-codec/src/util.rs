//! Address derivation, sign-byte framing and numeric id helpers.

use crate::CodecError;
use bcp_types::{
	encode_address, Address, AddressPrefix, ChainId, Nonce, PubkeyBundle, PublicIdentity,
	TransactionId,
};
use sha2::{Digest, Sha256, Sha512};

/// Magic prefix of every signable byte sequence.
const SIGN_BYTES_PREFIX: [u8; 4] = [0x00, 0xCA, 0xFE, 0x00];

const ED25519_CONDITION_PREFIX: &[u8] = b"sigs/ed25519/";
const ESCROW_CONDITION_PREFIX: &[u8] = b"escrow/seq/";

/// Hash applied to signable bytes before the signature is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrehashType {
	Sha512,
}

/// Bytes a signer must sign, plus the prehash to apply first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningJob {
	pub bytes: Vec<u8>,
	pub prehash: PrehashType,
}

impl SigningJob {
	/// The message that is actually handed to the signature scheme.
	pub fn prehashed(&self) -> Vec<u8> {
		match self.prehash {
			PrehashType::Sha512 => Sha512::digest(&self.bytes).to_vec(),
		}
	}
}

/// Frames encoded transaction bytes so the signature binds chain and nonce.
///
/// Layout: `00 CA FE 00`, one length byte, the chain id, the nonce as a
/// big-endian `i64`, then the transaction bytes.
pub fn append_sign_bytes(tx_bytes: &[u8], chain_id: &ChainId, nonce: Nonce) -> Result<Vec<u8>, CodecError> {
	let chain = chain_id.as_str().as_bytes();
	let chain_len = u8::try_from(chain.len()).map_err(|_| CodecError::InvalidField {
		field: "chain_id",
		reason: format!("chain id longer than 255 bytes: {}", chain.len()),
	})?;

	let mut out = Vec::with_capacity(4 + 1 + chain.len() + 8 + tx_bytes.len());
	out.extend_from_slice(&SIGN_BYTES_PREFIX);
	out.push(chain_len);
	out.extend_from_slice(chain);
	out.extend_from_slice(&nonce.value().to_be_bytes());
	out.extend_from_slice(tx_bytes);
	Ok(out)
}

/// Derives the address controlled by a public key.
pub fn pubkey_to_address(prefix: AddressPrefix, pubkey: &PubkeyBundle) -> Result<Address, CodecError> {
	let mut condition = ED25519_CONDITION_PREFIX.to_vec();
	condition.extend_from_slice(&pubkey.data);
	condition_to_address(prefix, &condition)
}

/// Derives the address of an identity on its own chain.
pub fn identity_to_address(identity: &PublicIdentity) -> Result<Address, CodecError> {
	pubkey_to_address(AddressPrefix::for_chain(&identity.chain_id), &identity.pubkey)
}

/// Permission condition owned by an escrow.
pub fn escrow_condition(escrow_id: u64) -> Vec<u8> {
	let mut condition = ESCROW_CONDITION_PREFIX.to_vec();
	condition.extend_from_slice(&encode_numeric_id(escrow_id));
	condition
}

/// Address of a permission condition: the first 20 bytes of its sha256.
pub fn condition_to_address(prefix: AddressPrefix, condition: &[u8]) -> Result<Address, CodecError> {
	let hash = Sha256::digest(condition);
	Ok(encode_address(prefix, &hash[..20])?)
}

/// Transaction id of postable bytes (uppercase hex sha256).
pub fn transaction_id_of(postable: &[u8]) -> TransactionId {
	TransactionId::from_hash(&Sha256::digest(postable))
}

/// Encodes a numeric id as 8 big-endian bytes.
pub fn encode_numeric_id(id: u64) -> [u8; 8] {
	id.to_be_bytes()
}

/// Decodes an 8-byte big-endian numeric id.
pub fn decode_numeric_id(field: &'static str, bytes: &[u8]) -> Result<u64, CodecError> {
	let fixed: [u8; 8] = bytes.try_into().map_err(|_| CodecError::InvalidField {
		field,
		reason: format!("numeric id must be 8 bytes, got {}", bytes.len()),
	})?;
	Ok(u64::from_be_bytes(fixed))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_append_sign_bytes_layout() {
		let bytes = append_sign_bytes(&[0xAA, 0xBB], &ChainId::new("abc"), Nonce::new(258)).unwrap();
		assert_eq!(
			bytes,
			vec![
				0x00, 0xCA, 0xFE, 0x00, 3, b'a', b'b', b'c', 0, 0, 0, 0, 0, 0, 1, 2, 0xAA, 0xBB
			]
		);
	}

	#[test]
	fn test_chain_id_too_long() {
		let chain_id = ChainId::new("x".repeat(256));
		assert!(append_sign_bytes(&[], &chain_id, Nonce::new(0)).is_err());
	}

	#[test]
	fn test_numeric_id() {
		assert_eq!(decode_numeric_id("id", &encode_numeric_id(42)).unwrap(), 42);
		assert!(matches!(
			decode_numeric_id("escrow_id", &[1, 2, 3]),
			Err(CodecError::InvalidField { field: "escrow_id", .. })
		));
	}

	#[test]
	fn test_identity_to_address_depends_on_chain() {
		let pubkey = PubkeyBundle::ed25519(vec![7u8; 32]);
		let testnet = identity_to_address(&PublicIdentity {
			chain_id: ChainId::new("local-testnet"),
			pubkey: pubkey.clone(),
		})
		.unwrap();
		let mainnet = identity_to_address(&PublicIdentity {
			chain_id: ChainId::new("iov-mainnet"),
			pubkey,
		})
		.unwrap();
		assert!(testnet.as_str().starts_with("tiov1"));
		assert!(mainnet.as_str().starts_with("iov1"));
		assert_eq!(testnet.data().unwrap(), mainnet.data().unwrap());
	}

	#[test]
	fn test_escrow_condition_address() {
		let address = condition_to_address(AddressPrefix::Tiov, &escrow_condition(1)).unwrap();
		assert_eq!(address.data().unwrap().len(), 20);
	}
}
