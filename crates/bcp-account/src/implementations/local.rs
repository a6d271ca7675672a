//! Local ed25519 signer backed by an in-memory seed.

use crate::{AccountError, SignerFactory, SignerInterface, SignerRegistry};
use async_trait::async_trait;
use bcp_codec::SigningJob;
use bcp_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, PubkeyBundle, Schema, SecretString,
	ValidationError,
};
use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroizing;

/// Signer holding an ed25519 key in process memory.
pub struct LocalSigner {
	key: SigningKey,
}

impl LocalSigner {
	pub fn from_seed(seed: [u8; 32]) -> Self {
		let seed = Zeroizing::new(seed);
		Self {
			key: SigningKey::from_bytes(&seed),
		}
	}

	/// Parses a 32 byte hex seed, with or without `0x`.
	pub fn from_secret(secret: &SecretString) -> Result<Self, AccountError> {
		let bytes = secret
			.decode_hex()
			.map_err(|e| AccountError::InvalidKey(format!("seed is not hex: {}", e)))?;
		let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
			AccountError::InvalidKey(format!("seed must be 32 bytes, got {}", bytes.len()))
		})?;
		Ok(Self::from_seed(seed))
	}

	/// A signer with a fresh random key.
	pub fn generate() -> Self {
		Self::from_seed(rand::random())
	}
}

#[async_trait]
impl SignerInterface for LocalSigner {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalSignerSchema)
	}

	fn pubkey(&self) -> PubkeyBundle {
		PubkeyBundle::ed25519(self.key.verifying_key().to_bytes().to_vec())
	}

	async fn sign_job(&self, job: &SigningJob) -> Result<Vec<u8>, AccountError> {
		let signature = self
			.key
			.try_sign(&job.prehashed())
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		Ok(signature.to_bytes().to_vec())
	}
}

/// Configuration schema for the local signer.
pub struct LocalSignerSchema;

impl ConfigSchema for LocalSignerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(|value| {
				let key = value.as_str().unwrap_or_default();
				let digits = key.strip_prefix("0x").unwrap_or(key);
				if digits.len() != 64 || hex::decode(digits).is_err() {
					return Err("private_key must be 32 bytes of hex".to_string());
				}
				Ok(())
			})],
			vec![],
		);
		schema.validate(config)
	}
}

/// Factory function to create a local signer from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex encoded 32 byte ed25519 seed
pub fn create_signer(config: &toml::Value) -> Result<Box<dyn SignerInterface>, AccountError> {
	LocalSignerSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(e.to_string()))?;
	let secret = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".to_string()))?;
	Ok(Box::new(LocalSigner::from_secret(&secret)?))
}

/// Registry for the local signer implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = SignerFactory;

	fn factory() -> Self::Factory {
		create_signer
	}
}

impl SignerRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use bcp_codec::PrehashType;
	use ed25519_dalek::{Signature, Verifier, VerifyingKey};
	use sha2::{Digest, Sha512};

	#[tokio::test]
	async fn test_signature_verifies_over_prehash() {
		let signer = LocalSigner::from_seed([7u8; 32]);
		let job = SigningJob {
			bytes: b"hello".to_vec(),
			prehash: PrehashType::Sha512,
		};
		let raw = signer.sign_job(&job).await.unwrap();

		let pubkey: [u8; 32] = signer.pubkey().data.as_slice().try_into().unwrap();
		let verifying = VerifyingKey::from_bytes(&pubkey).unwrap();
		let signature = Signature::from_slice(&raw).unwrap();
		let digest = Sha512::digest(b"hello");
		assert!(verifying.verify(&digest, &signature).is_ok());
	}

	#[test]
	fn test_factory_validates_key() {
		let config: toml::Value = toml::from_str(&format!(r#"private_key = "0x{}""#, "ab".repeat(32))).unwrap();
		assert!(create_signer(&config).is_ok());

		let config: toml::Value = toml::from_str(r#"private_key = "abcd""#).unwrap();
		assert!(matches!(create_signer(&config), Err(AccountError::InvalidKey(_))));
	}

	#[test]
	fn test_seed_is_redacted() {
		let secret = SecretString::from("0x0101");
		assert!(!format!("{:?}", secret).contains("0101"));
		assert!(LocalSigner::from_secret(&secret).is_err());
	}
}
