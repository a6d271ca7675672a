//! Event tags indexed by the chain and the search strings built from them.
//!
//! A tag key is the uppercase hex of `bucket:` followed by the raw key
//! bytes. The value is always `s` (set).

use crate::{QueryTag, TransportQuery};
use bcp_types::{Address, AddressError, SwapQuery};

/// Tag value marking a set key.
pub const TAG_SET: &str = "s";

pub const CASH_BUCKET: &str = "cash";
pub const SIGS_BUCKET: &str = "sigs";
pub const SWAP_BUCKET: &str = "aswap";
pub const SWAP_SENDER_INDEX: &str = "aswap_sender";
pub const SWAP_RECIPIENT_INDEX: &str = "aswap_recipient";
pub const SWAP_HASH_INDEX: &str = "aswap_preimage_hash";

pub fn bucket_tag(bucket: &str, key: &[u8]) -> QueryTag {
	let mut raw = Vec::with_capacity(bucket.len() + 1 + key.len());
	raw.extend_from_slice(bucket.as_bytes());
	raw.push(b':');
	raw.extend_from_slice(key);
	QueryTag {
		key: hex::encode_upper(raw),
		value: TAG_SET.to_string(),
	}
}

/// Set on every transaction that changes the balance of the address.
pub fn cash_tag(address: &Address) -> Result<QueryTag, AddressError> {
	Ok(bucket_tag(CASH_BUCKET, &address.data()?))
}

/// Set on every transaction signed by the address.
pub fn nonce_tag(address: &Address) -> Result<QueryTag, AddressError> {
	Ok(bucket_tag(SIGS_BUCKET, &address.data()?))
}

/// Tag selecting the transactions that touch swaps matching the query.
///
/// Offers, claims and aborts all carry the id tag and the sender,
/// recipient and hash index tags of the swap they touch.
pub fn swap_query_tag(query: &SwapQuery) -> Result<QueryTag, AddressError> {
	Ok(match query {
		SwapQuery::Id(id) => bucket_tag(SWAP_BUCKET, id.as_bytes()),
		SwapQuery::Sender(address) => bucket_tag(SWAP_SENDER_INDEX, &address.data()?),
		SwapQuery::Recipient(address) => bucket_tag(SWAP_RECIPIENT_INDEX, &address.data()?),
		SwapQuery::Hash(hash) => bucket_tag(SWAP_HASH_INDEX, hash.as_bytes()),
	})
}

/// Renders a query in the node's search syntax.
pub fn to_query_string(query: &TransportQuery) -> String {
	let mut parts = Vec::new();
	if let Some(hash) = &query.hash {
		parts.push(format!("tx.hash='{}'", hash.as_str()));
	}
	if let Some(height) = query.height {
		parts.push(format!("tx.height={}", height));
	}
	if let Some(min) = query.min_height {
		parts.push(format!("tx.height>={}", min));
	}
	if let Some(max) = query.max_height {
		parts.push(format!("tx.height<={}", max));
	}
	for tag in &query.tags {
		parts.push(format!("{}='{}'", tag.key, tag.value));
	}
	parts.join(" AND ")
}

#[cfg(test)]
mod tests {
	use super::*;
	use bcp_types::{encode_address, AddressPrefix, SwapId};

	#[test]
	fn test_bucket_tag_is_upper_hex() {
		let tag = bucket_tag("cash", &[0xab, 0x01]);
		assert_eq!(tag.key, "636173683AAB01");
		assert_eq!(tag.value, "s");
	}

	#[test]
	fn test_swap_tags_differ_per_index() {
		let address = encode_address(AddressPrefix::Tiov, &[1u8; 20]).unwrap();
		let sender = swap_query_tag(&SwapQuery::Sender(address.clone())).unwrap();
		let recipient = swap_query_tag(&SwapQuery::Recipient(address)).unwrap();
		assert_ne!(sender, recipient);
		let id = swap_query_tag(&SwapQuery::Id(SwapId(vec![0, 1]))).unwrap();
		assert_eq!(id, bucket_tag(SWAP_BUCKET, &[0, 1]));
	}

	#[test]
	fn test_query_string() {
		let query = TransportQuery {
			tags: vec![bucket_tag("cash", &[1])],
			min_height: Some(1),
			max_height: Some(20),
			..Default::default()
		};
		assert_eq!(
			to_query_string(&query),
			"tx.height>=1 AND tx.height<=20 AND 636173683A01='s'"
		);
	}
}
