//! The tagged transaction model.
//!
//! Every transaction kind the chain supports is one variant of
//! [`TransactionKind`]. Optional wire fields are `Option`s so that "not
//! provided" stays distinguishable from "provided as empty".

use crate::{
	Address, Amount, ChainAddressPair, ChainId, FullSignature, Hash, Preimage, PublicIdentity,
	SwapId, SwapTimeout,
};
use serde::{Deserialize, Serialize};

/// Fee attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
	/// Account paying the fee. Defaults to the creator when absent.
	pub payer: Option<Address>,
	pub tokens: Amount,
}

/// A transaction before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
	pub chain_id: ChainId,
	pub creator: PublicIdentity,
	pub fee: Option<Fee>,
	pub kind: TransactionKind,
}

impl UnsignedTransaction {
	pub fn new(creator: PublicIdentity, kind: TransactionKind) -> Self {
		Self {
			chain_id: creator.chain_id.clone(),
			creator,
			fee: None,
			kind,
		}
	}

	pub fn with_fee(mut self, fee: Fee) -> Self {
		self.fee = Some(fee);
		self
	}
}

/// An unsigned transaction plus its ordered signatures.
///
/// Order matters: multisignature verification walks signatures in the
/// order they were appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
	pub transaction: UnsignedTransaction,
	pub signatures: Vec<FullSignature>,
}

impl SignedTransaction {
	pub fn new(transaction: UnsignedTransaction, primary: FullSignature) -> Self {
		Self {
			transaction,
			signatures: vec![primary],
		}
	}

	/// Returns a copy with one more co-signature appended.
	pub fn append_signature(&self, signature: FullSignature) -> Self {
		let mut signatures = self.signatures.clone();
		signatures.push(signature);
		Self {
			transaction: self.transaction.clone(),
			signatures,
		}
	}

	pub fn primary_signature(&self) -> Option<&FullSignature> {
		self.signatures.first()
	}
}

/// Discriminant of a transaction kind, used in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKindTag {
	Send,
	SwapOffer,
	SwapClaim,
	SwapAbort,
	RegisterUsername,
	UpdateTargetsOfUsername,
	TransferUsername,
	CreateMultisignatureContract,
	UpdateMultisignatureContract,
	CreateEscrow,
	ReleaseEscrow,
	ReturnEscrow,
	UpdateEscrowParties,
	CreateProposal,
	Vote,
}

/// Payload of a transaction, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionKind {
	Send(SendTransaction),
	SwapOffer(SwapOfferTransaction),
	SwapClaim(SwapClaimTransaction),
	SwapAbort(SwapAbortTransaction),
	RegisterUsername(RegisterUsernameTransaction),
	UpdateTargetsOfUsername(UpdateTargetsOfUsernameTransaction),
	TransferUsername(TransferUsernameTransaction),
	CreateMultisignatureContract(CreateMultisignatureTransaction),
	UpdateMultisignatureContract(UpdateMultisignatureTransaction),
	CreateEscrow(CreateEscrowTransaction),
	ReleaseEscrow(ReleaseEscrowTransaction),
	ReturnEscrow(ReturnEscrowTransaction),
	UpdateEscrowParties(UpdateEscrowPartiesTransaction),
	CreateProposal(CreateProposalTransaction),
	Vote(VoteTransaction),
}

impl TransactionKind {
	pub fn tag(&self) -> TransactionKindTag {
		match self {
			TransactionKind::Send(_) => TransactionKindTag::Send,
			TransactionKind::SwapOffer(_) => TransactionKindTag::SwapOffer,
			TransactionKind::SwapClaim(_) => TransactionKindTag::SwapClaim,
			TransactionKind::SwapAbort(_) => TransactionKindTag::SwapAbort,
			TransactionKind::RegisterUsername(_) => TransactionKindTag::RegisterUsername,
			TransactionKind::UpdateTargetsOfUsername(_) => {
				TransactionKindTag::UpdateTargetsOfUsername
			},
			TransactionKind::TransferUsername(_) => TransactionKindTag::TransferUsername,
			TransactionKind::CreateMultisignatureContract(_) => {
				TransactionKindTag::CreateMultisignatureContract
			},
			TransactionKind::UpdateMultisignatureContract(_) => {
				TransactionKindTag::UpdateMultisignatureContract
			},
			TransactionKind::CreateEscrow(_) => TransactionKindTag::CreateEscrow,
			TransactionKind::ReleaseEscrow(_) => TransactionKindTag::ReleaseEscrow,
			TransactionKind::ReturnEscrow(_) => TransactionKindTag::ReturnEscrow,
			TransactionKind::UpdateEscrowParties(_) => TransactionKindTag::UpdateEscrowParties,
			TransactionKind::CreateProposal(_) => TransactionKindTag::CreateProposal,
			TransactionKind::Vote(_) => TransactionKindTag::Vote,
		}
	}
}

/// Token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTransaction {
	pub sender: Address,
	pub recipient: Address,
	pub amount: Amount,
	pub memo: Option<String>,
}

/// Locks tokens behind a hash until claimed or timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOfferTransaction {
	pub sender: Address,
	pub recipient: Address,
	pub hash: Hash,
	pub timeout: SwapTimeout,
	pub amounts: Vec<Amount>,
	pub memo: Option<String>,
}

/// Releases a swap to its recipient by revealing the preimage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapClaimTransaction {
	pub swap_id: SwapId,
	pub preimage: Preimage,
}

/// Returns an expired swap to its sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapAbortTransaction {
	pub swap_id: SwapId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUsernameTransaction {
	pub username: String,
	pub targets: Vec<ChainAddressPair>,
}

/// Replaces the complete target set of a username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTargetsOfUsernameTransaction {
	pub username: String,
	pub targets: Vec<ChainAddressPair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferUsernameTransaction {
	pub username: String,
	pub new_owner: Address,
}

/// Member of a multisignature contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
	pub address: Address,
	pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMultisignatureTransaction {
	pub participants: Vec<Participant>,
	pub activation_threshold: u32,
	pub admin_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMultisignatureTransaction {
	#[serde(with = "crate::utils::hex_bytes")]
	pub contract_id: Vec<u8>,
	pub participants: Vec<Participant>,
	pub activation_threshold: u32,
	pub admin_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEscrowTransaction {
	pub sender: Address,
	pub arbiter: Address,
	pub recipient: Address,
	pub amounts: Vec<Amount>,
	pub timeout: SwapTimeout,
	pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEscrowTransaction {
	pub escrow_id: u64,
	pub amounts: Vec<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnEscrowTransaction {
	pub escrow_id: u64,
}

/// Changes any subset of the parties of an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEscrowPartiesTransaction {
	pub escrow_id: u64,
	pub sender: Option<Address>,
	pub arbiter: Option<Address>,
	pub recipient: Option<Address>,
}

/// Action executed when a governance proposal passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProposalAction {
	CreateTextResolution {
		resolution: String,
	},
	Send {
		sender: Address,
		recipient: Address,
		amount: Amount,
		memo: Option<String>,
	},
	ReleaseEscrow {
		escrow_id: u64,
		amounts: Vec<Amount>,
	},
	UpdateElectionRule {
		election_rule_id: u64,
		threshold: Fraction,
		voting_period: u32,
	},
	ExecuteBatch {
		actions: Vec<ProposalAction>,
	},
}

/// Rational number used for voting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction {
	pub numerator: u32,
	pub denominator: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProposalTransaction {
	pub title: String,
	pub action: ProposalAction,
	pub description: String,
	pub election_rule_id: u64,
	/// Unix time in seconds.
	pub start_time: i64,
	pub author: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOption {
	Yes,
	No,
	Abstain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTransaction {
	pub proposal_id: u64,
	pub selection: VoteOption,
	/// `None` means the signer of the transaction votes.
	pub voter: Option<Address>,
}
