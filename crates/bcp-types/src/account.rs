//! Account balances.

use crate::{Address, Amount, PubkeyBundle};
use serde::{Deserialize, Serialize};

/// An on-chain balance holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	pub address: Address,
	/// Known once the account has signed at least one transaction.
	pub pubkey: Option<PubkeyBundle>,
	/// One entry per token ticker, sorted by ticker.
	pub balance: Vec<Amount>,
}

impl Account {
	/// Balance of one token, if the account holds any.
	pub fn balance_of(&self, ticker: &str) -> Option<&Amount> {
		self.balance.iter().find(|amount| amount.token_ticker == ticker)
	}
}
