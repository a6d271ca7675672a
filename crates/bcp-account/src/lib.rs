//! Signing identities for the BCP client.
//!
//! This module provides abstractions for the keys that authorize
//! transactions. A signer exposes its public key and signs prepared
//! signing jobs; the service on top turns unsigned transactions into
//! signed ones and appends co-signatures.

use async_trait::async_trait;
use bcp_codec::{bytes_to_sign, identity_to_address, CodecError, SigningJob};
use bcp_types::{
	Address, ChainId, ConfigSchema, FullSignature, ImplementationRegistry, Nonce, PubkeyBundle,
	PublicIdentity, SignedTransaction, UnsignedTransaction,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during signing operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// The transaction was created by a different identity.
	#[error("Identity mismatch: {0}")]
	IdentityMismatch(String),
	/// Error that occurs when preparing the bytes to sign.
	#[error("Codec error: {0}")]
	Codec(#[from] CodecError),
}

/// Trait defining the interface for signer implementations.
///
/// A signer holds exactly one key. Chain specific framing is done by the
/// codec before the job reaches the signer.
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// Returns the configuration schema for this signer implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Public key of the signing key.
	fn pubkey(&self) -> PubkeyBundle;

	/// Signs a prepared job and returns the raw signature bytes.
	async fn sign_job(&self, job: &SigningJob) -> Result<Vec<u8>, AccountError>;
}

/// Type alias for signer factory functions.
pub type SignerFactory = fn(&toml::Value) -> Result<Box<dyn SignerInterface>, AccountError>;

/// Registry trait for signer implementations.
pub trait SignerRegistry: ImplementationRegistry<Factory = SignerFactory> {}

/// Get all registered signer implementations.
pub fn get_all_implementations() -> Vec<(&'static str, SignerFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service that signs transactions with one identity.
pub struct SignerService {
	implementation: Box<dyn SignerInterface>,
}

impl SignerService {
	pub fn new(implementation: Box<dyn SignerInterface>) -> Self {
		Self { implementation }
	}

	/// The identity of this signer on the given chain.
	pub fn identity(&self, chain_id: &ChainId) -> PublicIdentity {
		PublicIdentity {
			chain_id: chain_id.clone(),
			pubkey: self.implementation.pubkey(),
		}
	}

	/// The address of this signer on the given chain.
	pub fn address(&self, chain_id: &ChainId) -> Result<Address, AccountError> {
		Ok(identity_to_address(&self.identity(chain_id))?)
	}

	async fn full_signature(
		&self,
		transaction: &UnsignedTransaction,
		nonce: Nonce,
	) -> Result<FullSignature, AccountError> {
		let job = bytes_to_sign(transaction, nonce)?;
		let signature = self.implementation.sign_job(&job).await?;
		Ok(FullSignature {
			nonce,
			pubkey: self.implementation.pubkey(),
			signature,
		})
	}

	/// Signs a transaction created by this signer.
	///
	/// The nonce must be the creator's current nonce on the target chain.
	pub async fn sign(
		&self,
		transaction: UnsignedTransaction,
		nonce: Nonce,
	) -> Result<SignedTransaction, AccountError> {
		if transaction.creator.pubkey != self.implementation.pubkey() {
			return Err(AccountError::IdentityMismatch(
				"transaction creator is not this signer".to_string(),
			));
		}
		let primary = self.full_signature(&transaction, nonce).await?;
		tracing::debug!(nonce = nonce.value(), kind = ?transaction.kind.tag(), "Signed transaction");
		Ok(SignedTransaction::new(transaction, primary))
	}

	/// Appends this signer's signature to a transaction signed by someone else.
	///
	/// The nonce is this co-signer's own nonce, not the creator's.
	pub async fn append_signature(
		&self,
		signed: &SignedTransaction,
		nonce: Nonce,
	) -> Result<SignedTransaction, AccountError> {
		let signature = self.full_signature(&signed.transaction, nonce).await?;
		Ok(signed.append_signature(signature))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bcp_types::{SwapAbortTransaction, SwapId, TransactionKind};
	use implementations::local::LocalSigner;

	fn abort_tx(creator: PublicIdentity) -> UnsignedTransaction {
		UnsignedTransaction::new(
			creator,
			TransactionKind::SwapAbort(SwapAbortTransaction {
				swap_id: SwapId(vec![1]),
			}),
		)
	}

	#[tokio::test]
	async fn test_sign_and_cosign() {
		let chain_id = ChainId::new("local-bns-devnet");
		let alice = SignerService::new(Box::new(LocalSigner::from_seed([1u8; 32])));
		let bob = SignerService::new(Box::new(LocalSigner::from_seed([2u8; 32])));

		let signed = alice
			.sign(abort_tx(alice.identity(&chain_id)), Nonce::new(0))
			.await
			.unwrap();
		assert_eq!(signed.signatures.len(), 1);

		let cosigned = bob.append_signature(&signed, Nonce::new(5)).await.unwrap();
		assert_eq!(cosigned.signatures.len(), 2);
		assert_eq!(cosigned.signatures[1].nonce, Nonce::new(5));
		assert_eq!(cosigned.signatures[0], signed.signatures[0]);
	}

	#[tokio::test]
	async fn test_rejects_foreign_creator() {
		let chain_id = ChainId::new("local-bns-devnet");
		let alice = SignerService::new(Box::new(LocalSigner::from_seed([1u8; 32])));
		let bob = SignerService::new(Box::new(LocalSigner::from_seed([2u8; 32])));

		let result = bob.sign(abort_tx(alice.identity(&chain_id)), Nonce::new(0)).await;
		assert!(matches!(result, Err(AccountError::IdentityMismatch(_))));
	}

	#[test]
	fn test_address_depends_on_chain() {
		let signer = SignerService::new(Box::new(LocalSigner::from_seed([3u8; 32])));
		let test = signer.address(&ChainId::new("local-bns-devnet")).unwrap();
		let main = signer.address(&ChainId::new("iov-mainnet")).unwrap();
		assert!(test.as_str().starts_with("tiov1"));
		assert!(main.as_str().starts_with("iov1"));
	}
}
