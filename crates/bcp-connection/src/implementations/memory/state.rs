//! Ledger of the in-memory chain and the rules that change it.
//!
//! Execution mirrors the node's two phases. `check` is the admission test
//! run on broadcast; `deliver` executes a transaction in a block and may
//! still fail. Callers deliver into a copy of the ledger and keep the copy
//! only on success, so a failed transaction leaves no trace besides its
//! block.

use crate::tags::{
	bucket_tag, CASH_BUCKET, SIGS_BUCKET, SWAP_BUCKET, SWAP_HASH_INDEX, SWAP_RECIPIENT_INDEX,
	SWAP_SENDER_INDEX,
};
use crate::QueryTag;
use bcp_codec::models::UserRecord;
use bcp_codec::{bytes_to_sign, encode_numeric_id, identity_to_address, pubkey_to_address};
use bcp_types::{
	Address, AddressPrefix, Amount, AmountError, ChainAddressPair, ChainId, ElectionRule, Electorate,
	Hash, Nonce, Proposal, ProposalExecutorResult, ProposalResult, ProposalStatus, ProposalVotes,
	PubkeyBundle, SignedTransaction, SwapTimeout, Token, TransactionKind, UnsignedTransaction,
	VersionedId, VoteOption,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub(super) const CODE_UNAUTHORIZED: u32 = 2;
pub(super) const CODE_NOT_FOUND: u32 = 3;
pub(super) const CODE_DUPLICATE: u32 = 6;
pub(super) const CODE_STATE: u32 = 10;
pub(super) const CODE_AMOUNT: u32 = 13;
pub(super) const CODE_INPUT: u32 = 14;

/// A non-zero result code with its log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct TxFailure {
	pub code: u32,
	pub log: String,
}

impl TxFailure {
	pub(super) fn new(code: u32, detail: impl fmt::Display) -> Self {
		let description = match code {
			CODE_UNAUTHORIZED => "unauthorized",
			CODE_NOT_FOUND => "not found",
			CODE_DUPLICATE => "duplicate",
			CODE_STATE => "invalid state",
			CODE_AMOUNT => "invalid amount",
			_ => "invalid input",
		};
		Self {
			code,
			log: format!("{}: {}", detail, description),
		}
	}
}

/// Result data and event tags of a delivered transaction.
pub(super) struct Execution {
	pub data: Vec<u8>,
	pub tags: Vec<QueryTag>,
}

#[derive(Debug, Clone)]
pub(super) struct UsernameEntry {
	pub owner: Address,
	pub targets: Vec<ChainAddressPair>,
}

#[derive(Debug, Clone)]
struct SwapEntry {
	sender: Vec<u8>,
	recipient: Vec<u8>,
	hash: Hash,
	amounts: Vec<Amount>,
	timeout: SwapTimeout,
	open: bool,
}

impl SwapEntry {
	fn tags(&self, id: &[u8]) -> [QueryTag; 4] {
		[
			bucket_tag(SWAP_BUCKET, id),
			bucket_tag(SWAP_SENDER_INDEX, &self.sender),
			bucket_tag(SWAP_RECIPIENT_INDEX, &self.recipient),
			bucket_tag(SWAP_HASH_INDEX, self.hash.as_bytes()),
		]
	}
}

/// A verified signer of a transaction.
struct Signer {
	key: Vec<u8>,
	pubkey: PubkeyBundle,
}

fn address_key(address: &Address) -> Result<Vec<u8>, TxFailure> {
	address
		.data()
		.map_err(|e| TxFailure::new(CODE_INPUT, format!("invalid address {}", e)))
}

fn cash(key: &[u8]) -> QueryTag {
	bucket_tag(CASH_BUCKET, key)
}

/// Application state of the in-memory chain.
#[derive(Debug, Clone)]
pub(super) struct Ledger {
	pub chain_id: ChainId,
	pub minimal_fee: Option<Amount>,
	pub wallets: BTreeMap<Vec<u8>, Vec<Amount>>,
	pub users: BTreeMap<Vec<u8>, UserRecord>,
	pub usernames: BTreeMap<String, UsernameEntry>,
	swaps: BTreeMap<Vec<u8>, SwapEntry>,
	swap_sequence: u64,
	pub electorates: BTreeMap<VersionedId, Electorate>,
	pub election_rules: BTreeMap<VersionedId, ElectionRule>,
	pub proposals: BTreeMap<u64, Proposal>,
	/// Proposal id and voter key of every vote cast.
	votes: BTreeSet<(u64, Vec<u8>)>,
	proposal_sequence: u64,
	pub tokens: BTreeMap<String, Token>,
}

impl Ledger {
	pub(super) fn new(chain_id: ChainId, minimal_fee: Option<Amount>) -> Self {
		Self {
			chain_id,
			minimal_fee,
			wallets: BTreeMap::new(),
			users: BTreeMap::new(),
			usernames: BTreeMap::new(),
			swaps: BTreeMap::new(),
			swap_sequence: 0,
			electorates: BTreeMap::new(),
			election_rules: BTreeMap::new(),
			proposals: BTreeMap::new(),
			votes: BTreeSet::new(),
			proposal_sequence: 0,
			tokens: BTreeMap::new(),
		}
	}

	fn latest<T>(records: &BTreeMap<VersionedId, T>, id: u64) -> Option<&T> {
		records
			.range(VersionedId { id, version: 0 }..=VersionedId { id, version: u32::MAX })
			.next_back()
			.map(|(_, record)| record)
	}

	/// The proposal as seen at chain time `now`. Voting closes by itself
	/// once the voting period is over.
	pub(super) fn proposal_at(&self, proposal: &Proposal, now: i64) -> Proposal {
		let mut view = proposal.clone();
		if view.status != ProposalStatus::Submitted || now < view.voting_end_time {
			return view;
		}
		if let (Some(electorate), Some(rule)) = (
			self.electorates.get(&view.electorate),
			self.election_rules.get(&view.election_rule),
		) {
			view.status = ProposalStatus::Closed;
			view.result = if is_accepted(&view.votes, electorate.total_weight, rule) {
				ProposalResult::Accepted
			} else {
				ProposalResult::Rejected
			};
		}
		view
	}

	pub(super) fn prefix(&self) -> AddressPrefix {
		AddressPrefix::for_chain(&self.chain_id)
	}

	pub(super) fn credit(&mut self, key: &[u8], amount: &Amount) -> Result<(), AmountError> {
		let wallet = self.wallets.entry(key.to_vec()).or_default();
		match wallet.iter_mut().find(|coin| coin.token_ticker == amount.token_ticker) {
			Some(coin) => *coin = coin.checked_add(amount)?,
			None => {
				wallet.push(amount.clone());
				wallet.sort_by(|a, b| a.token_ticker.cmp(&b.token_ticker));
			},
		}
		Ok(())
	}

	fn debit(&mut self, key: &[u8], amount: &Amount) -> Result<(), TxFailure> {
		let insufficient = || TxFailure::new(CODE_AMOUNT, format!("insufficient funds for {}", amount));
		let coin = self
			.wallets
			.get_mut(key)
			.and_then(|wallet| wallet.iter_mut().find(|coin| coin.token_ticker == amount.token_ticker))
			.ok_or_else(insufficient)?;
		*coin = coin.checked_sub(amount).map_err(|_| insufficient())?;
		Ok(())
	}

	fn deposit(&mut self, key: &[u8], amount: &Amount) -> Result<(), TxFailure> {
		self.credit(key, amount)
			.map_err(|e| TxFailure::new(CODE_AMOUNT, e))
	}

	pub(super) fn nonce_of(&self, key: &[u8]) -> Nonce {
		self.users
			.get(key)
			.map(|record| record.nonce)
			.unwrap_or_default()
	}

	/// Verifies every signature against the signer's current nonce.
	fn signers(&self, signed: &SignedTransaction) -> Result<Vec<Signer>, TxFailure> {
		if signed.signatures.is_empty() {
			return Err(TxFailure::new(CODE_UNAUTHORIZED, "missing signature"));
		}

		let mut signers = Vec::with_capacity(signed.signatures.len());
		for signature in &signed.signatures {
			let address = pubkey_to_address(self.prefix(), &signature.pubkey)
				.map_err(|e| TxFailure::new(CODE_INPUT, e))?;
			let key = address_key(&address)?;

			let expected = self.nonce_of(&key);
			if signature.nonce != expected {
				return Err(TxFailure::new(
					CODE_UNAUTHORIZED,
					format!("nonce {} of {} expected {}", signature.nonce, address, expected),
				));
			}
			verify_signature(&signed.transaction, signature)?;

			signers.push(Signer {
				key,
				pubkey: signature.pubkey.clone(),
			});
		}
		Ok(signers)
	}

	/// Admission test: signatures, nonces and the minimal fee.
	pub(super) fn check(&self, signed: &SignedTransaction) -> Result<(), TxFailure> {
		self.signers(signed)?;
		if let Some(minimal) = &self.minimal_fee {
			let paid = signed.transaction.fee.as_ref().map(|fee| &fee.tokens);
			let sufficient = paid.is_some_and(|paid| {
				paid.token_ticker == minimal.token_ticker
					&& paid.fractional_digits == minimal.fractional_digits
					&& paid.quantity >= minimal.quantity
			});
			if !sufficient {
				return Err(TxFailure::new(CODE_AMOUNT, format!("fee less than minimum {}", minimal)));
			}
		}
		Ok(())
	}

	/// Executes a transaction at chain time `now`.
	pub(super) fn deliver(&mut self, signed: &SignedTransaction, now: i64) -> Result<Execution, TxFailure> {
		let signers = self.signers(signed)?;
		let mut tags = Vec::new();

		for signer in &signers {
			let record = self.users.entry(signer.key.clone()).or_insert(UserRecord {
				pubkey: None,
				nonce: Nonce::default(),
			});
			record.nonce = record.nonce.next();
			record.pubkey = Some(signer.pubkey.clone());
			tags.push(bucket_tag(SIGS_BUCKET, &signer.key));
		}

		if let Some(fee) = &signed.transaction.fee {
			let payer = match &fee.payer {
				Some(payer) => payer.clone(),
				None => identity_to_address(&signed.transaction.creator)
					.map_err(|e| TxFailure::new(CODE_INPUT, e))?,
			};
			let payer = require_signer(&payer, &signers)?;
			self.debit(&payer, &fee.tokens)?;
			tags.push(cash(&payer));
		}

		let data = self.execute(&signed.transaction, &signers, now, &mut tags)?;
		tags.dedup();
		Ok(Execution { data, tags })
	}

	fn execute(
		&mut self,
		transaction: &UnsignedTransaction,
		signers: &[Signer],
		now: i64,
		tags: &mut Vec<QueryTag>,
	) -> Result<Vec<u8>, TxFailure> {
		match &transaction.kind {
			TransactionKind::Send(send) => {
				let sender = require_signer(&send.sender, signers)?;
				let recipient = address_key(&send.recipient)?;
				self.debit(&sender, &send.amount)?;
				self.deposit(&recipient, &send.amount)?;
				tags.push(cash(&sender));
				tags.push(cash(&recipient));
				Ok(Vec::new())
			},
			TransactionKind::SwapOffer(offer) => {
				if offer.amounts.is_empty() {
					return Err(TxFailure::new(CODE_INPUT, "swap without amounts"));
				}
				if offer.timeout.is_expired(0, now) {
					return Err(TxFailure::new(CODE_INPUT, "timeout in the past"));
				}
				let sender = require_signer(&offer.sender, signers)?;
				for amount in &offer.amounts {
					self.debit(&sender, amount)?;
				}

				self.swap_sequence += 1;
				let id = encode_numeric_id(self.swap_sequence).to_vec();
				let entry = SwapEntry {
					sender: sender.clone(),
					recipient: address_key(&offer.recipient)?,
					hash: offer.hash.clone(),
					amounts: offer.amounts.clone(),
					timeout: offer.timeout,
					open: true,
				};
				tags.push(cash(&sender));
				tags.extend(entry.tags(&id));
				self.swaps.insert(id.clone(), entry);
				Ok(id)
			},
			TransactionKind::SwapClaim(claim) => {
				let id = claim.swap_id.as_bytes();
				// Claims stay possible after the timeout until someone aborts.
				let swap = self.open_swap(id)?;
				if Sha256::digest(claim.preimage.as_bytes()).as_slice() != swap.hash.as_bytes() {
					return Err(TxFailure::new(CODE_INPUT, "invalid preimage"));
				}
				for amount in &swap.amounts {
					self.deposit(&swap.recipient, amount)?;
				}
				tags.push(cash(&swap.recipient));
				tags.extend(swap.tags(id));
				self.close_swap(id);
				Ok(Vec::new())
			},
			TransactionKind::SwapAbort(abort) => {
				let id = abort.swap_id.as_bytes();
				let swap = self.open_swap(id)?;
				if !swap.timeout.is_expired(0, now) {
					return Err(TxFailure::new(CODE_STATE, "swap not expired"));
				}
				for amount in &swap.amounts {
					self.deposit(&swap.sender, amount)?;
				}
				tags.push(cash(&swap.sender));
				tags.extend(swap.tags(id));
				self.close_swap(id);
				Ok(Vec::new())
			},
			TransactionKind::RegisterUsername(register) => {
				if self.usernames.contains_key(&register.username) {
					return Err(TxFailure::new(
						CODE_DUPLICATE,
						format!("username {} already registered", register.username),
					));
				}
				let owner =
					identity_to_address(&transaction.creator).map_err(|e| TxFailure::new(CODE_INPUT, e))?;
				self.usernames.insert(
					register.username.clone(),
					UsernameEntry {
						owner,
						targets: register.targets.clone(),
					},
				);
				Ok(Vec::new())
			},
			TransactionKind::UpdateTargetsOfUsername(update) => {
				let entry = self.owned_username(&update.username, signers)?;
				entry.targets = update.targets.clone();
				Ok(Vec::new())
			},
			TransactionKind::TransferUsername(transfer) => {
				let entry = self.owned_username(&transfer.username, signers)?;
				entry.owner = transfer.new_owner.clone();
				Ok(Vec::new())
			},
			TransactionKind::CreateProposal(create) => {
				require_signer(&create.author, signers)?;
				let rule = Self::latest(&self.election_rules, create.election_rule_id)
					.ok_or_else(|| TxFailure::new(CODE_NOT_FOUND, format!("election rule {}", create.election_rule_id)))?;
				let electorate = Self::latest(&self.electorates, rule.electorate_id)
					.ok_or_else(|| TxFailure::new(CODE_NOT_FOUND, format!("electorate {}", rule.electorate_id)))?;

				self.proposal_sequence += 1;
				let id = self.proposal_sequence;
				let proposal = Proposal {
					id,
					title: create.title.clone(),
					action: create.action.clone(),
					description: create.description.clone(),
					election_rule: VersionedId {
						id: rule.id,
						version: rule.version,
					},
					electorate: VersionedId {
						id: electorate.id,
						version: electorate.version,
					},
					voting_start_time: create.start_time,
					voting_end_time: create.start_time + i64::from(rule.voting_period),
					submission_time: now,
					author: create.author.clone(),
					votes: ProposalVotes::default(),
					status: ProposalStatus::Submitted,
					result: ProposalResult::Undefined,
					executor_result: ProposalExecutorResult::NotRun,
				};
				self.proposals.insert(id, proposal);
				Ok(encode_numeric_id(id).to_vec())
			},
			TransactionKind::Vote(vote) => {
				let voter = match &vote.voter {
					Some(voter) => voter.clone(),
					None => identity_to_address(&transaction.creator).map_err(|e| TxFailure::new(CODE_INPUT, e))?,
				};
				let voter_key = require_signer(&voter, signers)?;
				let proposal = self
					.proposals
					.get(&vote.proposal_id)
					.ok_or_else(|| TxFailure::new(CODE_NOT_FOUND, format!("proposal {}", vote.proposal_id)))?;
				if proposal.status != ProposalStatus::Submitted
					|| now < proposal.voting_start_time
					|| now >= proposal.voting_end_time
				{
					return Err(TxFailure::new(CODE_STATE, "proposal not open for voting"));
				}
				let weight = self
					.electorates
					.get(&proposal.electorate)
					.and_then(|electorate| electorate.weight_of(&voter))
					.ok_or_else(|| TxFailure::new(CODE_UNAUTHORIZED, format!("{} is not an elector", voter)))?;
				if !self.votes.insert((vote.proposal_id, voter_key)) {
					return Err(TxFailure::new(CODE_DUPLICATE, format!("{} already voted", voter)));
				}

				if let Some(proposal) = self.proposals.get_mut(&vote.proposal_id) {
					let weight = u64::from(weight);
					match vote.selection {
						VoteOption::Yes => proposal.votes.yes += weight,
						VoteOption::No => proposal.votes.no += weight,
						VoteOption::Abstain => proposal.votes.abstain += weight,
					}
				}
				Ok(Vec::new())
			},
			other => Err(TxFailure::new(
				CODE_INPUT,
				format!("unsupported message {:?}", other.tag()),
			)),
		}
	}

	fn open_swap(&self, id: &[u8]) -> Result<SwapEntry, TxFailure> {
		let swap = self
			.swaps
			.get(id)
			.ok_or_else(|| TxFailure::new(CODE_NOT_FOUND, format!("swap {}", hex::encode(id))))?;
		if !swap.open {
			return Err(TxFailure::new(CODE_STATE, "swap already settled"));
		}
		Ok(swap.clone())
	}

	fn close_swap(&mut self, id: &[u8]) {
		if let Some(swap) = self.swaps.get_mut(id) {
			swap.open = false;
		}
	}

	fn owned_username(&mut self, username: &str, signers: &[Signer]) -> Result<&mut UsernameEntry, TxFailure> {
		let entry = self
			.usernames
			.get_mut(username)
			.ok_or_else(|| TxFailure::new(CODE_NOT_FOUND, format!("username {}", username)))?;
		let owner = address_key(&entry.owner)?;
		if !signers.iter().any(|signer| signer.key == owner) {
			return Err(TxFailure::new(CODE_UNAUTHORIZED, "owner signature required"));
		}
		Ok(entry)
	}
}

/// Whether the yes votes pass the rule's threshold and, if the rule has
/// one, enough weight took part to meet its quorum.
fn is_accepted(votes: &ProposalVotes, total_weight: u64, rule: &ElectionRule) -> bool {
	let total = u128::from(total_weight);
	let cast = u128::from(votes.yes) + u128::from(votes.no) + u128::from(votes.abstain);
	let quorum_met = rule
		.quorum
		.as_ref()
		.map_or(true, |quorum| cast * u128::from(quorum.denominator) >= total * u128::from(quorum.numerator));
	quorum_met
		&& u128::from(votes.yes) * u128::from(rule.threshold.denominator)
			> total * u128::from(rule.threshold.numerator)
}

fn require_signer(address: &Address, signers: &[Signer]) -> Result<Vec<u8>, TxFailure> {
	let key = address_key(address)?;
	if signers.iter().any(|signer| signer.key == key) {
		Ok(key)
	} else {
		Err(TxFailure::new(CODE_UNAUTHORIZED, format!("{} did not sign", address)))
	}
}

fn verify_signature(
	transaction: &UnsignedTransaction,
	signature: &bcp_types::FullSignature,
) -> Result<(), TxFailure> {
	let invalid = || TxFailure::new(CODE_UNAUTHORIZED, "invalid signature");
	let job = bytes_to_sign(transaction, signature.nonce).map_err(|e| TxFailure::new(CODE_INPUT, e))?;
	let pubkey: [u8; 32] = signature.pubkey.data.as_slice().try_into().map_err(|_| invalid())?;
	let key = VerifyingKey::from_bytes(&pubkey).map_err(|_| invalid())?;
	let sig = Signature::from_slice(&signature.signature).map_err(|_| invalid())?;
	key.verify(&job.prehashed(), &sig).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
	use super::*;
	use bcp_types::{encode_address, Fraction};

	fn fraction(numerator: u32, denominator: u32) -> Fraction {
		Fraction {
			numerator,
			denominator,
		}
	}

	fn rule(threshold: Fraction, quorum: Option<Fraction>) -> ElectionRule {
		ElectionRule {
			id: 1,
			version: 1,
			admin: encode_address(AddressPrefix::Tiov, &[1; 20]).unwrap(),
			electorate_id: 1,
			title: "Majority".to_string(),
			voting_period: 60,
			threshold,
			quorum,
		}
	}

	#[test]
	fn test_acceptance_needs_more_than_threshold() {
		let majority = rule(fraction(1, 2), None);
		let half = ProposalVotes {
			yes: 5,
			no: 5,
			abstain: 0,
		};
		assert!(!is_accepted(&half, 10, &majority));
		let more = ProposalVotes {
			yes: 6,
			no: 0,
			abstain: 0,
		};
		assert!(is_accepted(&more, 10, &majority));
	}

	#[test]
	fn test_quorum_counts_every_cast_vote() {
		let low_bar = rule(fraction(1, 10), Some(fraction(1, 2)));
		let thin = ProposalVotes {
			yes: 2,
			no: 0,
			abstain: 0,
		};
		assert!(!is_accepted(&thin, 10, &low_bar));
		let with_abstentions = ProposalVotes {
			yes: 2,
			no: 0,
			abstain: 3,
		};
		assert!(is_accepted(&with_abstentions, 10, &low_bar));
	}
}
