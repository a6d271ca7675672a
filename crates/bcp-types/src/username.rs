//! Username registry records.

use crate::{Address, ChainId};
use serde::{Deserialize, Serialize};

/// An address on some (possibly foreign) chain that a username points to.
///
/// The address is kept as an opaque string because foreign chains use
/// their own address formats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainAddressPair {
	pub chain_id: ChainId,
	pub address: String,
}

/// A registered username and its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BnsUsernameNft {
	pub id: String,
	pub owner: Address,
	pub targets: Vec<ChainAddressPair>,
}
