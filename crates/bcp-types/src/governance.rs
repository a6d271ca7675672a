//! Governance and token registry records.
//!
//! Electorates and election rules are versioned: every change stores a new
//! version under the same numeric id, and proposals pin the versions that
//! were current when they were created.

use crate::{Address, Fraction, ProposalAction};
use serde::{Deserialize, Serialize};

/// Numeric id plus version of a versioned record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionedId {
	pub id: u64,
	pub version: u32,
}

/// A voter and the weight of their vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elector {
	pub address: Address,
	pub weight: u32,
}

/// The set of addresses allowed to vote on proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Electorate {
	pub id: u64,
	pub version: u32,
	pub admin: Address,
	pub title: String,
	pub electors: Vec<Elector>,
	/// Sum of all elector weights.
	pub total_weight: u64,
}

impl Electorate {
	pub fn weight_of(&self, address: &Address) -> Option<u32> {
		self.electors
			.iter()
			.find(|elector| &elector.address == address)
			.map(|elector| elector.weight)
	}
}

/// How long an electorate votes and what it takes to accept a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionRule {
	pub id: u64,
	pub version: u32,
	pub admin: Address,
	pub electorate_id: u64,
	pub title: String,
	/// Voting period in seconds.
	pub voting_period: u32,
	/// Share of the total weight that must vote yes.
	pub threshold: Fraction,
	/// Share of the total weight that must vote at all, if any.
	pub quorum: Option<Fraction>,
}

/// Accumulated vote weights of a proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalVotes {
	pub yes: u64,
	pub no: u64,
	pub abstain: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
	Submitted,
	Closed,
	Withdrawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalResult {
	/// Voting has not been tallied yet.
	Undefined,
	Accepted,
	Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalExecutorResult {
	NotRun,
	Succeeded,
	Failed,
}

/// A governance proposal and its voting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
	pub id: u64,
	pub title: String,
	pub action: ProposalAction,
	pub description: String,
	pub election_rule: VersionedId,
	pub electorate: VersionedId,
	/// Unix time in seconds.
	pub voting_start_time: i64,
	/// Unix time in seconds.
	pub voting_end_time: i64,
	/// Unix time in seconds.
	pub submission_time: i64,
	pub author: Address,
	pub votes: ProposalVotes,
	pub status: ProposalStatus,
	pub result: ProposalResult,
	pub executor_result: ProposalExecutorResult,
}

/// A token registered on chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
	pub token_ticker: String,
	pub token_name: String,
	pub fractional_digits: u8,
}
