//! Binary codec for BNS transactions and state records.
//!
//! Transactions travel as protobuf envelopes carrying exactly one
//! kind-specific payload. This crate converts between that wire form and
//! the tagged model in `bcp-types`, frames the bytes a signer must sign,
//! and derives transaction ids and addresses.

use bcp_types::{AddressError, Nonce, SignedTransaction, TransactionId, UnsignedTransaction};
use prost::Message;
use thiserror::Error;

pub mod decode;
pub mod encode;
pub mod models;
pub mod proto;
pub mod util;

pub use decode::{decode_msg, parse_tx};
pub use encode::build_tx;
pub use util::{
	append_sign_bytes, condition_to_address, decode_numeric_id, encode_numeric_id, escrow_condition,
	identity_to_address, pubkey_to_address, transaction_id_of, PrehashType, SigningJob,
};

/// Fractional digits of every token on the wire.
pub const FRACTIONAL_DIGITS: u8 = 9;

/// Errors that can occur while encoding or decoding.
#[derive(Debug, Error)]
pub enum CodecError {
	/// A mandatory field is absent.
	#[error("missing field: {0}")]
	MissingField(&'static str),
	/// A field is present but its content is rejected.
	#[error("invalid field {field}: {reason}")]
	InvalidField { field: &'static str, reason: String },
	/// The envelope carries zero or more than one payload.
	#[error("unknown message type in transaction")]
	UnknownMessageType,
	/// A proposal carries zero or more than one action.
	#[error("unknown proposal action")]
	UnknownProposalAction,
	/// The model holds something the wire format cannot express.
	#[error("unsupported: {0}")]
	Unsupported(String),
	#[error("protobuf decode error: {0}")]
	Protobuf(String),
	#[error("address error: {0}")]
	Address(#[from] AddressError),
}

impl From<prost::DecodeError> for CodecError {
	fn from(err: prost::DecodeError) -> Self {
		CodecError::Protobuf(err.to_string())
	}
}

/// Bytes the creator signs for the given nonce.
pub fn bytes_to_sign(transaction: &UnsignedTransaction, nonce: Nonce) -> Result<SigningJob, CodecError> {
	let tx_bytes = build_tx(transaction, &[])?.encode_to_vec();
	let bytes = append_sign_bytes(&tx_bytes, &transaction.chain_id, nonce)?;
	Ok(SigningJob {
		bytes,
		prehash: PrehashType::Sha512,
	})
}

/// Bytes submitted to the chain.
pub fn bytes_to_post(signed: &SignedTransaction) -> Result<Vec<u8>, CodecError> {
	Ok(build_tx(&signed.transaction, &signed.signatures)?.encode_to_vec())
}

/// Id the chain assigns to a signed transaction.
pub fn identifier(signed: &SignedTransaction) -> Result<TransactionId, CodecError> {
	Ok(transaction_id_of(&bytes_to_post(signed)?))
}
