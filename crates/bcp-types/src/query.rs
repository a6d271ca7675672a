//! Query descriptors for accounts, transactions, swaps and usernames.

use crate::{Address, Hash as PreimageHash, PubkeyBundle, SwapId, TransactionId};
use serde::{Deserialize, Serialize};

/// Selects an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountQuery {
	Address(Address),
	Pubkey(PubkeyBundle),
}

/// Selects transactions.
///
/// Build one with the constructors; a height range may be combined with the
/// address filter. Unset range bounds are open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxQuery {
	pub id: Option<TransactionId>,
	pub height: Option<u64>,
	pub min_height: Option<u64>,
	pub max_height: Option<u64>,
	pub sent_from_or_to: Option<Address>,
}

impl TxQuery {
	pub fn by_id(id: TransactionId) -> Self {
		Self {
			id: Some(id),
			..Default::default()
		}
	}

	pub fn by_height(height: u64) -> Self {
		Self {
			height: Some(height),
			..Default::default()
		}
	}

	/// Inclusive height range; `None` leaves that side unbounded.
	pub fn height_range(min_height: Option<u64>, max_height: Option<u64>) -> Self {
		Self {
			min_height,
			max_height,
			..Default::default()
		}
	}

	pub fn sent_from_or_to(address: Address) -> Self {
		Self {
			sent_from_or_to: Some(address),
			..Default::default()
		}
	}

	pub fn with_min_height(mut self, min_height: u64) -> Self {
		self.min_height = Some(min_height);
		self
	}

	pub fn with_max_height(mut self, max_height: u64) -> Self {
		self.max_height = Some(max_height);
		self
	}

	/// Whether the query carries no filter at all.
	pub fn is_empty(&self) -> bool {
		self == &TxQuery::default()
	}
}

/// Selects atomic swaps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapQuery {
	Id(SwapId),
	Sender(Address),
	Recipient(Address),
	Hash(PreimageHash),
}

/// Selects username records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsernameQuery {
	Username(String),
	Owner(Address),
}
