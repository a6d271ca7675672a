//! Serde adapters for byte strings and big-integer quantities.

/// Serializes byte vectors as lowercase hex strings.
pub mod hex_bytes {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&hex::encode(bytes))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		hex::decode(&s).map_err(serde::de::Error::custom)
	}

	/// Same encoding for fixed 32-byte arrays.
	pub mod array32 {
		use serde::{Deserializer, Serializer};

		pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			super::serialize(bytes, serializer)
		}

		pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
		where
			D: Deserializer<'de>,
		{
			let bytes = super::deserialize(deserializer)?;
			<[u8; 32]>::try_from(bytes.as_slice())
				.map_err(|_| serde::de::Error::custom("expected 32 bytes"))
		}
	}
}

/// Serializes `U256` quantities as decimal strings.
pub mod quantity_string {
	use alloy_primitives::U256;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&value.to_string())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
	}
}
