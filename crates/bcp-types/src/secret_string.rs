//! Zeroizing container for private key material.
//!
//! Signing seeds are read from configuration or the environment as hex
//! strings. `SecretString` keeps them out of logs and wipes them on drop.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// A secret string that is zeroed on drop and redacted when printed.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Exposes the secret. Keep the returned slice out of logs.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	/// Decodes the secret as hex, accepting an optional `0x` prefix.
	///
	/// The decoded bytes are zeroized when the returned buffer drops.
	pub fn decode_hex(&self) -> Result<Zeroizing<Vec<u8>>, hex::FromHexError> {
		let trimmed = self.0.trim();
		let digits = trimmed
			.strip_prefix("0x")
			.or_else(|| trimmed.strip_prefix("0X"))
			.unwrap_or(trimmed);
		hex::decode(digits).map(Zeroizing::new)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString(***REDACTED***)")
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "***REDACTED***")
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

// Serialized form is always redacted.
impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str("***REDACTED***")
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Ok(SecretString::new(s))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_redacted_output() {
		let secret = SecretString::from("9d61b19deffd5a60ba844af492ec2cc4");
		assert_eq!(format!("{:?}", secret), "SecretString(***REDACTED***)");
		assert_eq!(format!("{}", secret), "***REDACTED***");
		assert_eq!(
			serde_json::to_string(&secret).unwrap(),
			"\"***REDACTED***\""
		);
	}

	#[test]
	fn test_decode_hex() {
		let secret = SecretString::from("0x00ff10");
		assert_eq!(secret.decode_hex().unwrap().as_slice(), &[0x00, 0xff, 0x10]);

		let bare = SecretString::from(" abcd ");
		assert_eq!(bare.decode_hex().unwrap().as_slice(), &[0xab, 0xcd]);

		assert!(SecretString::from("xyz").decode_hex().is_err());
	}
}
