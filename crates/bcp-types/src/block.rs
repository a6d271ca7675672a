//! Inclusion outcomes for submitted transactions.

use crate::utils::hex_bytes;
use crate::{SignedTransaction, TransactionId};
use serde::{Deserialize, Serialize};

/// Inclusion state of a posted transaction.
///
/// Starts as `Pending` and moves to exactly one terminal state. Once
/// terminal it never changes again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BlockInfo {
	Pending,
	Succeeded {
		height: u64,
		#[serde(with = "hex_bytes")]
		result: Vec<u8>,
	},
	Failed {
		height: u64,
		code: u32,
		message: String,
	},
}

impl BlockInfo {
	pub fn is_pending(&self) -> bool {
		matches!(self, BlockInfo::Pending)
	}

	pub fn is_succeeded(&self) -> bool {
		matches!(self, BlockInfo::Succeeded { .. })
	}

	pub fn is_failed(&self) -> bool {
		matches!(self, BlockInfo::Failed { .. })
	}
}

/// A transaction the chain included and executed successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedTransaction {
	pub transaction_id: TransactionId,
	pub height: u64,
	/// Position of the transaction inside its block.
	pub index: u32,
	pub transaction: SignedTransaction,
	/// Data returned by execution, e.g. the id of a new swap.
	#[serde(with = "hex_bytes")]
	pub result: Vec<u8>,
	pub log: Option<String>,
}

/// A transaction the chain included but rejected during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTransaction {
	pub transaction_id: TransactionId,
	pub height: u64,
	pub index: u32,
	pub code: u32,
	pub message: Option<String>,
}

/// Outcome of a searched transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransactionRecord {
	Confirmed(ConfirmedTransaction),
	Failed(FailedTransaction),
}

impl TransactionRecord {
	pub fn transaction_id(&self) -> &TransactionId {
		match self {
			TransactionRecord::Confirmed(tx) => &tx.transaction_id,
			TransactionRecord::Failed(tx) => &tx.transaction_id,
		}
	}

	pub fn height(&self) -> u64 {
		match self {
			TransactionRecord::Confirmed(tx) => tx.height,
			TransactionRecord::Failed(tx) => tx.height,
		}
	}

	pub fn index(&self) -> u32 {
		match self {
			TransactionRecord::Confirmed(tx) => tx.index,
			TransactionRecord::Failed(tx) => tx.index,
		}
	}

	pub fn as_confirmed(&self) -> Option<&ConfirmedTransaction> {
		match self {
			TransactionRecord::Confirmed(tx) => Some(tx),
			TransactionRecord::Failed(_) => None,
		}
	}

	/// Terminal block info matching this record.
	pub fn block_info(&self) -> BlockInfo {
		match self {
			TransactionRecord::Confirmed(tx) => BlockInfo::Succeeded {
				height: tx.height,
				result: tx.result.clone(),
			},
			TransactionRecord::Failed(tx) => BlockInfo::Failed {
				height: tx.height,
				code: tx.code,
				message: tx.message.clone().unwrap_or_default(),
			},
		}
	}
}
