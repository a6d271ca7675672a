//! Bech32 address codec.
//!
//! Addresses are 20 raw bytes rendered as bech32 strings under a
//! human-readable prefix chosen by the chain identifier: `iov` for mainnet
//! chains and `tiov` for everything else.

use crate::ChainId;
use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of raw bytes behind every address.
pub const ADDRESS_LENGTH: usize = 20;

/// Chain ids starting with this marker use the mainnet prefix.
const MAINNET_CHAIN_MARKER: &str = "iov-mainnet";

/// Errors that can occur while encoding or decoding addresses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
	/// The raw address data has the wrong length.
	#[error("Invalid address length: expected {expected} bytes, got {actual}")]
	InvalidLength { expected: usize, actual: usize },
	/// The human-readable prefix is not one this client understands.
	#[error("Unrecognized address prefix: {0}")]
	InvalidPrefix(String),
	/// The string is not valid bech32 or its checksum does not match.
	#[error("Invalid bech32 encoding: {0}")]
	Encoding(String),
}

/// Human-readable address prefixes in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressPrefix {
	/// Mainnet prefix `iov`.
	Iov,
	/// Testnet prefix `tiov`.
	Tiov,
}

impl AddressPrefix {
	/// Selects the prefix for a chain.
	pub fn for_chain(chain_id: &ChainId) -> Self {
		if chain_id.as_str().starts_with(MAINNET_CHAIN_MARKER) {
			AddressPrefix::Iov
		} else {
			AddressPrefix::Tiov
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AddressPrefix::Iov => "iov",
			AddressPrefix::Tiov => "tiov",
		}
	}
}

impl FromStr for AddressPrefix {
	type Err = AddressError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"iov" => Ok(AddressPrefix::Iov),
			"tiov" => Ok(AddressPrefix::Tiov),
			other => Err(AddressError::InvalidPrefix(other.to_string())),
		}
	}
}

impl fmt::Display for AddressPrefix {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A checksummed, prefixed account locator.
///
/// Values of this type are only produced by [`encode_address`] or by parsing
/// a string that decodes successfully, so holding an `Address` means holding
/// a well-formed one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
	/// Returns the textual form.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns the prefix this address was encoded under.
	pub fn prefix(&self) -> Result<AddressPrefix, AddressError> {
		decode_address(&self.0).map(|(prefix, _)| prefix)
	}

	/// Returns the raw 20 address bytes.
	pub fn data(&self) -> Result<Vec<u8>, AddressError> {
		decode_address(&self.0).map(|(_, data)| data)
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for Address {
	type Err = AddressError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		decode_address(s)?;
		Ok(Address(s.to_string()))
	}
}

impl<'de> Deserialize<'de> for Address {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Encodes raw address bytes under the given prefix.
pub fn encode_address(prefix: AddressPrefix, data: &[u8]) -> Result<Address, AddressError> {
	if data.len() != ADDRESS_LENGTH {
		return Err(AddressError::InvalidLength {
			expected: ADDRESS_LENGTH,
			actual: data.len(),
		});
	}

	let hrp = Hrp::parse(prefix.as_str()).map_err(|e| AddressError::Encoding(e.to_string()))?;
	let encoded =
		bech32::encode::<Bech32>(hrp, data).map_err(|e| AddressError::Encoding(e.to_string()))?;
	Ok(Address(encoded))
}

/// Decodes an address string into its prefix and raw bytes.
///
/// Fails when the checksum is wrong or not a bech32 one, when the prefix is
/// neither `iov` nor `tiov`, or when the payload is not exactly
/// [`ADDRESS_LENGTH`] bytes. Only the canonical lowercase form is accepted,
/// so every decodable string is the one [`encode_address`] produces.
pub fn decode_address(address: &str) -> Result<(AddressPrefix, Vec<u8>), AddressError> {
	let checked = CheckedHrpstring::new::<Bech32>(address)
		.map_err(|e| AddressError::Encoding(e.to_string()))?;
	let prefix: AddressPrefix = checked.hrp().to_lowercase().parse()?;
	let data: Vec<u8> = checked.byte_iter().collect();

	if data.len() != ADDRESS_LENGTH {
		return Err(AddressError::InvalidLength {
			expected: ADDRESS_LENGTH,
			actual: data.len(),
		});
	}

	if encode_address(prefix, &data)?.as_str() != address {
		return Err(AddressError::Encoding(format!(
			"'{}' is not in canonical form",
			address
		)));
	}

	Ok((prefix, data))
}

/// Returns whether the string is an address this client can decode.
pub fn is_valid_address(address: &str) -> bool {
	decode_address(address).is_ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_round_trip() {
		let data: Vec<u8> = (0u8..20).collect();
		for prefix in [AddressPrefix::Iov, AddressPrefix::Tiov] {
			let address = encode_address(prefix, &data).unwrap();
			assert!(address.as_str().starts_with(prefix.as_str()));
			let (decoded_prefix, decoded) = decode_address(address.as_str()).unwrap();
			assert_eq!(decoded_prefix, prefix);
			assert_eq!(decoded, data);
		}
	}

	#[test]
	fn test_known_vector() {
		let data = hex::decode("b1ca7e78f74423ae01da3b51e676934d9105f282").unwrap();
		let address = encode_address(AddressPrefix::Tiov, &data).unwrap();
		assert_eq!(address.as_str(), "tiov1k898u78hgs36uqw68dg7va5nfkgstu5z0fhz3f");
	}

	#[test]
	fn test_wrong_length_rejected() {
		let result = encode_address(AddressPrefix::Iov, &[0u8; 19]);
		assert_eq!(
			result,
			Err(AddressError::InvalidLength {
				expected: 20,
				actual: 19
			})
		);
	}

	#[test]
	fn test_bad_checksum_rejected() {
		let data = [7u8; 20];
		let address = encode_address(AddressPrefix::Tiov, &data).unwrap();
		let mut corrupted = address.as_str().to_string();
		let last = corrupted.pop().unwrap();
		corrupted.push(if last == 'q' { 'p' } else { 'q' });
		assert!(!is_valid_address(&corrupted));
		assert!(matches!(
			decode_address(&corrupted),
			Err(AddressError::Encoding(_))
		));
	}

	#[test]
	fn test_bech32m_checksum_rejected() {
		let hrp = Hrp::parse("tiov").unwrap();
		let bech32m = bech32::encode::<bech32::Bech32m>(hrp, &[7u8; 20]).unwrap();
		assert!(!is_valid_address(&bech32m));
		assert!(matches!(
			bech32m.parse::<Address>(),
			Err(AddressError::Encoding(_))
		));
	}

	#[test]
	fn test_uppercase_rejected() {
		let address = encode_address(AddressPrefix::Tiov, &[7u8; 20]).unwrap();
		let upper = address.as_str().to_uppercase();
		assert!(!is_valid_address(&upper));
		assert!(matches!(
			upper.parse::<Address>(),
			Err(AddressError::Encoding(_))
		));

		let parsed: Address = address.as_str().parse().unwrap();
		assert_eq!(parsed, address);
		assert_eq!(parsed.to_string(), address.as_str());
	}

	#[test]
	fn test_foreign_prefix_rejected() {
		let hrp = Hrp::parse("cosmos").unwrap();
		let foreign = bech32::encode::<Bech32>(hrp, &[1u8; 20]).unwrap();
		assert_eq!(
			decode_address(&foreign),
			Err(AddressError::InvalidPrefix("cosmos".to_string()))
		);
		assert!(foreign.parse::<Address>().is_err());
	}

	#[test]
	fn test_prefix_for_chain() {
		assert_eq!(
			AddressPrefix::for_chain(&ChainId::new("iov-mainnet")),
			AddressPrefix::Iov
		);
		assert_eq!(
			AddressPrefix::for_chain(&ChainId::new("local-bns-devnet")),
			AddressPrefix::Tiov
		);
	}

	#[test]
	fn test_is_valid_never_panics() {
		assert!(!is_valid_address(""));
		assert!(!is_valid_address("tiov1"));
		assert!(!is_valid_address("not an address at all"));
	}
}
