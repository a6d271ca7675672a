//! Chain state records returned by abci queries.

use crate::decode::{decode_amount, decode_proposal_action, decode_pubkey};
use crate::encode::{encode_amount, encode_proposal_action, encode_pubkey};
use crate::util::{decode_numeric_id, encode_numeric_id};
use crate::{proto, CodecError, FRACTIONAL_DIGITS};
use bcp_types::{
	encode_address, Address, AddressPrefix, Amount, BnsUsernameNft, ChainAddressPair, ChainId,
	ElectionRule, Elector, Electorate, Fraction, Nonce, Proposal, ProposalExecutorResult,
	ProposalResult, ProposalStatus, ProposalVotes, PubkeyBundle, Token, VersionedId,
};
use prost::Message;

/// Key of the cash module configuration in the configuration bucket.
pub const CASH_CONFIG_KEY: &[u8] = b"_c:cash";

/// Decodes a wallet record into balances sorted by ticker.
pub fn decode_wallet(bytes: &[u8]) -> Result<Vec<Amount>, CodecError> {
	let set = proto::Set::decode(bytes)?;
	let mut balance = set
		.coins
		.iter()
		.map(decode_amount)
		.collect::<Result<Vec<_>, _>>()?;
	balance.sort_by(|a, b| a.token_ticker.cmp(&b.token_ticker));
	Ok(balance)
}

pub fn encode_wallet(balance: &[Amount]) -> Result<Vec<u8>, CodecError> {
	let coins = balance
		.iter()
		.map(encode_amount)
		.collect::<Result<Vec<_>, _>>()?;
	Ok(proto::Set {
		metadata: Some(proto::Metadata { schema: 1 }),
		coins,
	}
	.encode_to_vec())
}

/// Signer record: the registered public key and the next expected nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
	pub pubkey: Option<PubkeyBundle>,
	pub nonce: Nonce,
}

pub fn decode_user_data(bytes: &[u8]) -> Result<UserRecord, CodecError> {
	let data = proto::UserData::decode(bytes)?;
	let pubkey = data.pubkey.as_ref().map(decode_pubkey).transpose()?;
	Ok(UserRecord {
		pubkey,
		nonce: Nonce::new(data.sequence),
	})
}

pub fn encode_user_data(record: &UserRecord) -> Vec<u8> {
	proto::UserData {
		metadata: Some(proto::Metadata { schema: 1 }),
		pubkey: record.pubkey.as_ref().map(encode_pubkey),
		sequence: record.nonce.value(),
	}
	.encode_to_vec()
}

/// Decodes a username token stored under the username key.
pub fn decode_username_token(
	username: &str,
	prefix: AddressPrefix,
	bytes: &[u8],
) -> Result<BnsUsernameNft, CodecError> {
	let token = proto::UsernameToken::decode(bytes)?;
	let owner = token.owner.ok_or(CodecError::MissingField("owner"))?;
	Ok(BnsUsernameNft {
		id: username.to_string(),
		owner: encode_address(prefix, &owner)?,
		targets: token
			.targets
			.into_iter()
			.map(|t| ChainAddressPair {
				chain_id: ChainId::new(t.blockchain_id),
				address: t.address,
			})
			.collect(),
	})
}

pub fn encode_username_token(owner: &Address, targets: &[ChainAddressPair]) -> Result<Vec<u8>, CodecError> {
	Ok(proto::UsernameToken {
		metadata: Some(proto::Metadata { schema: 1 }),
		targets: targets
			.iter()
			.map(|t| proto::BlockchainAddress {
				blockchain_id: t.chain_id.as_str().to_string(),
				address: t.address.clone(),
			})
			.collect(),
		owner: Some(owner.data()?),
	}
	.encode_to_vec())
}

/// Minimal fee from the cash configuration. A zero fee means none.
pub fn decode_cash_config(bytes: &[u8]) -> Result<Option<Amount>, CodecError> {
	let config = proto::CashConfiguration::decode(bytes)?;
	match config.minimal_fee {
		Some(coin) => {
			let fee = decode_amount(&coin)?;
			Ok(if fee.is_zero() { None } else { Some(fee) })
		},
		None => Ok(None),
	}
}

pub fn encode_cash_config(minimal_fee: Option<&Amount>) -> Result<Vec<u8>, CodecError> {
	Ok(proto::CashConfiguration {
		metadata: Some(proto::Metadata { schema: 1 }),
		owner: None,
		minimal_fee: minimal_fee.map(encode_amount).transpose()?,
	}
	.encode_to_vec())
}

/// Splits a versioned key: an 8 byte id followed by a 4 byte version,
/// both big-endian.
pub fn decode_versioned_id(field: &'static str, key: &[u8]) -> Result<VersionedId, CodecError> {
	if key.len() != 12 {
		return Err(CodecError::InvalidField {
			field,
			reason: format!("expected 12 bytes, got {}", key.len()),
		});
	}
	let (id, version) = key.split_at(8);
	let mut version_bytes = [0u8; 4];
	version_bytes.copy_from_slice(version);
	Ok(VersionedId {
		id: decode_numeric_id(field, id)?,
		version: u32::from_be_bytes(version_bytes),
	})
}

pub fn encode_versioned_id(id: VersionedId) -> Vec<u8> {
	let mut key = encode_numeric_id(id.id).to_vec();
	key.extend_from_slice(&id.version.to_be_bytes());
	key
}

fn decode_fraction(fraction: proto::Fraction) -> Fraction {
	Fraction {
		numerator: fraction.numerator,
		denominator: fraction.denominator,
	}
}

fn encode_fraction(fraction: &Fraction) -> proto::Fraction {
	proto::Fraction {
		numerator: fraction.numerator,
		denominator: fraction.denominator,
	}
}

fn decode_reference(field: &'static str, reference: Option<proto::VersionedIdRef>) -> Result<VersionedId, CodecError> {
	let reference = reference.ok_or(CodecError::MissingField(field))?;
	Ok(VersionedId {
		id: decode_numeric_id(field, &reference.id)?,
		version: reference.version,
	})
}

fn encode_reference(id: VersionedId) -> proto::VersionedIdRef {
	proto::VersionedIdRef {
		id: encode_numeric_id(id.id).to_vec(),
		version: id.version,
	}
}

/// Decodes an electorate stored under its versioned id.
pub fn decode_electorate(prefix: AddressPrefix, key: &[u8], bytes: &[u8]) -> Result<Electorate, CodecError> {
	let VersionedId { id, version } = decode_versioned_id("electorate id", key)?;
	let electorate = proto::Electorate::decode(bytes)?;
	let electors = electorate
		.electors
		.into_iter()
		.map(|elector| -> Result<Elector, CodecError> {
			Ok(Elector {
				address: encode_address(prefix, &elector.address)?,
				weight: elector.weight,
			})
		})
		.collect::<Result<Vec<_>, _>>()?;
	Ok(Electorate {
		id,
		version,
		admin: encode_address(prefix, &electorate.admin.ok_or(CodecError::MissingField("admin"))?)?,
		title: electorate.title,
		electors,
		total_weight: electorate.total_electorate_weight,
	})
}

pub fn encode_electorate(electorate: &Electorate) -> Result<Vec<u8>, CodecError> {
	let electors = electorate
		.electors
		.iter()
		.map(|elector| -> Result<proto::Elector, CodecError> {
			Ok(proto::Elector {
				address: elector.address.data()?,
				weight: elector.weight,
			})
		})
		.collect::<Result<Vec<_>, _>>()?;
	Ok(proto::Electorate {
		metadata: Some(proto::Metadata { schema: 1 }),
		admin: Some(electorate.admin.data()?),
		title: electorate.title.clone(),
		electors,
		total_electorate_weight: electorate.total_weight,
	}
	.encode_to_vec())
}

/// Decodes an election rule stored under its versioned id.
pub fn decode_election_rule(prefix: AddressPrefix, key: &[u8], bytes: &[u8]) -> Result<ElectionRule, CodecError> {
	let VersionedId { id, version } = decode_versioned_id("election rule id", key)?;
	let rule = proto::ElectionRule::decode(bytes)?;
	let electorate_id = rule.electorate_id.ok_or(CodecError::MissingField("electorate_id"))?;
	Ok(ElectionRule {
		id,
		version,
		admin: encode_address(prefix, &rule.admin.ok_or(CodecError::MissingField("admin"))?)?,
		electorate_id: decode_numeric_id("electorate_id", &electorate_id)?,
		title: rule.title,
		voting_period: rule.voting_period,
		threshold: decode_fraction(rule.threshold.ok_or(CodecError::MissingField("threshold"))?),
		quorum: rule.quorum.map(decode_fraction),
	})
}

pub fn encode_election_rule(rule: &ElectionRule) -> Result<Vec<u8>, CodecError> {
	Ok(proto::ElectionRule {
		metadata: Some(proto::Metadata { schema: 1 }),
		admin: Some(rule.admin.data()?),
		electorate_id: Some(encode_numeric_id(rule.electorate_id).to_vec()),
		title: rule.title.clone(),
		voting_period: rule.voting_period,
		threshold: Some(encode_fraction(&rule.threshold)),
		quorum: rule.quorum.as_ref().map(encode_fraction),
	}
	.encode_to_vec())
}

fn invalid_enum(field: &'static str, value: i32) -> CodecError {
	CodecError::InvalidField {
		field,
		reason: format!("unknown value {}", value),
	}
}

fn decode_status(value: i32) -> Result<ProposalStatus, CodecError> {
	match value {
		1 => Ok(ProposalStatus::Submitted),
		2 => Ok(ProposalStatus::Closed),
		3 => Ok(ProposalStatus::Withdrawn),
		other => Err(invalid_enum("status", other)),
	}
}

fn encode_status(status: ProposalStatus) -> i32 {
	match status {
		ProposalStatus::Submitted => 1,
		ProposalStatus::Closed => 2,
		ProposalStatus::Withdrawn => 3,
	}
}

fn decode_result(value: i32) -> Result<ProposalResult, CodecError> {
	match value {
		1 => Ok(ProposalResult::Undefined),
		2 => Ok(ProposalResult::Accepted),
		3 => Ok(ProposalResult::Rejected),
		other => Err(invalid_enum("result", other)),
	}
}

fn encode_result(result: ProposalResult) -> i32 {
	match result {
		ProposalResult::Undefined => 1,
		ProposalResult::Accepted => 2,
		ProposalResult::Rejected => 3,
	}
}

fn decode_executor_result(value: i32) -> Result<ProposalExecutorResult, CodecError> {
	match value {
		1 => Ok(ProposalExecutorResult::NotRun),
		2 => Ok(ProposalExecutorResult::Succeeded),
		3 => Ok(ProposalExecutorResult::Failed),
		other => Err(invalid_enum("executor_result", other)),
	}
}

fn encode_executor_result(result: ProposalExecutorResult) -> i32 {
	match result {
		ProposalExecutorResult::NotRun => 1,
		ProposalExecutorResult::Succeeded => 2,
		ProposalExecutorResult::Failed => 3,
	}
}

/// Decodes a proposal stored under its numeric id.
pub fn decode_proposal(prefix: AddressPrefix, key: &[u8], bytes: &[u8]) -> Result<Proposal, CodecError> {
	let proposal = proto::Proposal::decode(bytes)?;
	let raw_option = proposal.raw_option.ok_or(CodecError::MissingField("raw_option"))?;
	let action = decode_proposal_action(prefix, proto::ProposalOptions::decode(raw_option.as_slice())?)?;
	let tally = proposal.vote_state.unwrap_or_default();
	Ok(Proposal {
		id: decode_numeric_id("proposal id", key)?,
		title: proposal.title,
		action,
		description: proposal.description,
		election_rule: decode_reference("election_rule_ref", proposal.election_rule_ref)?,
		electorate: decode_reference("electorate_ref", proposal.electorate_ref)?,
		voting_start_time: proposal.voting_start_time,
		voting_end_time: proposal.voting_end_time,
		submission_time: proposal.submission_time,
		author: encode_address(prefix, &proposal.author.ok_or(CodecError::MissingField("author"))?)?,
		votes: ProposalVotes {
			yes: tally.total_yes,
			no: tally.total_no,
			abstain: tally.total_abstain,
		},
		status: decode_status(proposal.status)?,
		result: decode_result(proposal.result)?,
		executor_result: decode_executor_result(proposal.executor_result)?,
	})
}

/// Encodes a proposal. The tally carries the weights and fractions of the
/// pinned electorate and election rule.
pub fn encode_proposal(
	proposal: &Proposal,
	electorate: &Electorate,
	rule: &ElectionRule,
) -> Result<Vec<u8>, CodecError> {
	Ok(proto::Proposal {
		metadata: Some(proto::Metadata { schema: 1 }),
		title: proposal.title.clone(),
		raw_option: Some(encode_proposal_action(&proposal.action)?.encode_to_vec()),
		description: proposal.description.clone(),
		election_rule_ref: Some(encode_reference(proposal.election_rule)),
		electorate_ref: Some(encode_reference(proposal.electorate)),
		voting_start_time: proposal.voting_start_time,
		voting_end_time: proposal.voting_end_time,
		submission_time: proposal.submission_time,
		author: Some(proposal.author.data()?),
		vote_state: Some(proto::TallyResult {
			total_yes: proposal.votes.yes,
			total_no: proposal.votes.no,
			total_abstain: proposal.votes.abstain,
			total_electorate_weight: electorate.total_weight,
			quorum: rule.quorum.as_ref().map(encode_fraction),
			threshold: Some(encode_fraction(&rule.threshold)),
		}),
		status: encode_status(proposal.status),
		result: encode_result(proposal.result),
		executor_result: encode_executor_result(proposal.executor_result),
	}
	.encode_to_vec())
}

/// Decodes a token record. The ticker is the key; every token on the chain
/// uses the same number of fractional digits.
pub fn decode_token(key: &[u8], bytes: &[u8]) -> Result<Token, CodecError> {
	let ticker = std::str::from_utf8(key).map_err(|e| CodecError::InvalidField {
		field: "ticker",
		reason: e.to_string(),
	})?;
	let info = proto::TokenInfo::decode(bytes)?;
	Ok(Token {
		token_ticker: ticker.to_string(),
		token_name: info.name,
		fractional_digits: FRACTIONAL_DIGITS,
	})
}

pub fn encode_token(token: &Token) -> Vec<u8> {
	proto::TokenInfo {
		metadata: Some(proto::Metadata { schema: 1 }),
		name: token.token_name.clone(),
	}
	.encode_to_vec()
}

/// Decodes the per-message results of a block transaction.
pub fn decode_result_set(bytes: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
	Ok(proto::ResultSet::decode(bytes)?.results)
}

pub fn encode_result_set(results: Vec<Vec<u8>>) -> Vec<u8> {
	proto::ResultSet { results }.encode_to_vec()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wallet_sorted_by_ticker() {
		let bytes = encode_wallet(&[
			Amount::new(5u64, 9, "MASH"),
			Amount::new(1_500_000_000u64, 9, "CASH"),
		])
		.unwrap();
		let balance = decode_wallet(&bytes).unwrap();
		assert_eq!(balance[0].token_ticker, "CASH");
		assert_eq!(balance[0], Amount::new(1_500_000_000u64, 9, "CASH"));
		assert_eq!(balance[1].token_ticker, "MASH");
	}

	#[test]
	fn test_user_data_without_pubkey() {
		let record = UserRecord {
			pubkey: None,
			nonce: Nonce::new(3),
		};
		assert_eq!(decode_user_data(&encode_user_data(&record)).unwrap(), record);
	}

	#[test]
	fn test_zero_minimal_fee_means_none() {
		let zero = Amount::zero(9, "CASH");
		assert_eq!(decode_cash_config(&encode_cash_config(Some(&zero)).unwrap()).unwrap(), None);

		let fee = Amount::new(10_000_000u64, 9, "CASH");
		assert_eq!(
			decode_cash_config(&encode_cash_config(Some(&fee)).unwrap()).unwrap(),
			Some(fee)
		);
	}

	fn address(byte: u8) -> Address {
		encode_address(AddressPrefix::Tiov, &[byte; 20]).unwrap()
	}

	fn board() -> Electorate {
		Electorate {
			id: 1,
			version: 2,
			admin: address(1),
			title: "Board".to_string(),
			electors: vec![
				Elector {
					address: address(1),
					weight: 3,
				},
				Elector {
					address: address(2),
					weight: 7,
				},
			],
			total_weight: 10,
		}
	}

	fn majority() -> ElectionRule {
		ElectionRule {
			id: 4,
			version: 1,
			admin: address(1),
			electorate_id: 1,
			title: "Majority".to_string(),
			voting_period: 3600,
			threshold: Fraction {
				numerator: 1,
				denominator: 2,
			},
			quorum: None,
		}
	}

	#[test]
	fn test_versioned_key_layout() {
		let key = encode_versioned_id(VersionedId { id: 1, version: 2 });
		assert_eq!(key, vec![0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2]);
		assert_eq!(decode_versioned_id("id", &key).unwrap(), VersionedId { id: 1, version: 2 });
		assert!(matches!(
			decode_versioned_id("id", &key[..8]),
			Err(CodecError::InvalidField { field: "id", .. })
		));
	}

	#[test]
	fn test_electorate_from_state() {
		let electorate = board();
		let key = encode_versioned_id(VersionedId { id: 1, version: 2 });
		let decoded = decode_electorate(AddressPrefix::Tiov, &key, &encode_electorate(&electorate).unwrap()).unwrap();
		assert_eq!(decoded, electorate);
		assert_eq!(decoded.weight_of(&address(2)), Some(7));
	}

	#[test]
	fn test_election_rule_without_quorum() {
		let rule = majority();
		let key = encode_versioned_id(VersionedId { id: 4, version: 1 });
		let decoded = decode_election_rule(AddressPrefix::Tiov, &key, &encode_election_rule(&rule).unwrap()).unwrap();
		assert_eq!(decoded.quorum, None);
		assert_eq!(decoded, rule);
	}

	#[test]
	fn test_proposal_keeps_action_and_tally() {
		let proposal = Proposal {
			id: 9,
			title: "Hello".to_string(),
			action: bcp_types::ProposalAction::CreateTextResolution {
				resolution: "be excellent".to_string(),
			},
			description: "first".to_string(),
			election_rule: VersionedId { id: 4, version: 1 },
			electorate: VersionedId { id: 1, version: 2 },
			voting_start_time: 100,
			voting_end_time: 3700,
			submission_time: 90,
			author: address(2),
			votes: ProposalVotes {
				yes: 7,
				no: 0,
				abstain: 3,
			},
			status: ProposalStatus::Submitted,
			result: ProposalResult::Undefined,
			executor_result: ProposalExecutorResult::NotRun,
		};
		let bytes = encode_proposal(&proposal, &board(), &majority()).unwrap();
		let decoded = decode_proposal(AddressPrefix::Tiov, &encode_numeric_id(9), &bytes).unwrap();
		assert_eq!(decoded, proposal);

		let tally = proto::Proposal::decode(bytes.as_slice()).unwrap().vote_state.unwrap();
		assert_eq!(tally.total_electorate_weight, 10);
	}

	#[test]
	fn test_proposal_with_unknown_status_rejected() {
		let bytes = proto::Proposal {
			raw_option: Some(
				encode_proposal_action(&bcp_types::ProposalAction::CreateTextResolution {
					resolution: "x".to_string(),
				})
				.unwrap()
				.encode_to_vec(),
			),
			election_rule_ref: Some(encode_reference(VersionedId { id: 1, version: 1 })),
			electorate_ref: Some(encode_reference(VersionedId { id: 1, version: 1 })),
			author: Some(vec![2; 20]),
			status: 7,
			result: 1,
			executor_result: 1,
			..Default::default()
		}
		.encode_to_vec();
		assert!(matches!(
			decode_proposal(AddressPrefix::Tiov, &encode_numeric_id(1), &bytes),
			Err(CodecError::InvalidField { field: "status", .. })
		));
	}

	#[test]
	fn test_token_ticker_comes_from_key() {
		let token = Token {
			token_ticker: "CASH".to_string(),
			token_name: "Main token of this chain".to_string(),
			fractional_digits: 9,
		};
		assert_eq!(decode_token(b"CASH", &encode_token(&token)).unwrap(), token);
	}

	#[test]
	fn test_username_token_requires_owner() {
		let bytes = proto::UsernameToken::default().encode_to_vec();
		assert!(matches!(
			decode_username_token("alice*iov", AddressPrefix::Tiov, &bytes),
			Err(CodecError::MissingField("owner"))
		));
	}
}
