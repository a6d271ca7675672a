//! Wire to model decoding.

use crate::proto;
use crate::util::decode_numeric_id;
use crate::{CodecError, FRACTIONAL_DIGITS};
use alloy_primitives::U256;
use bcp_types::{
	encode_address, Address, AddressPrefix, Amount, ChainAddressPair, ChainId,
	CreateEscrowTransaction, CreateMultisignatureTransaction, CreateProposalTransaction, Fee,
	Fraction, FullSignature, Hash, Nonce, Participant, Preimage, ProposalAction, PubkeyBundle,
	PublicIdentity, RegisterUsernameTransaction, ReleaseEscrowTransaction,
	ReturnEscrowTransaction, SendTransaction, SignedTransaction, SwapAbortTransaction,
	SwapClaimTransaction, SwapId, SwapOfferTransaction, SwapTimeout, TransactionKind,
	TransferUsernameTransaction, UnsignedTransaction, UpdateEscrowPartiesTransaction,
	UpdateMultisignatureTransaction, UpdateTargetsOfUsernameTransaction, VoteOption,
	VoteTransaction, HASH_LENGTH,
};
use prost::Message;

/// Unwraps a mandatory field or reports it by name.
pub(crate) fn ensure<T>(value: Option<T>, field: &'static str) -> Result<T, CodecError> {
	value.ok_or(CodecError::MissingField(field))
}

pub(crate) fn decode_amount(coin: &proto::Coin) -> Result<Amount, CodecError> {
	let scale = 10u64.pow(FRACTIONAL_DIGITS as u32);
	if coin.whole < 0 || coin.fractional < 0 || coin.fractional as u64 >= scale {
		return Err(CodecError::InvalidField {
			field: "amount",
			reason: format!("invalid coin {}.{}", coin.whole, coin.fractional),
		});
	}
	let quantity = U256::from(coin.whole as u64) * U256::from(scale) + U256::from(coin.fractional as u64);
	Ok(Amount::new(quantity, FRACTIONAL_DIGITS, coin.ticker.clone()))
}

fn decode_amounts(coins: &[proto::Coin]) -> Result<Vec<Amount>, CodecError> {
	coins.iter().map(decode_amount).collect()
}

pub(crate) fn decode_pubkey(pubkey: &proto::PublicKey) -> Result<PubkeyBundle, CodecError> {
	let data = ensure(pubkey.ed25519.clone(), "pubkey.ed25519")?;
	Ok(PubkeyBundle::ed25519(data))
}

fn decode_address(prefix: AddressPrefix, bytes: Vec<u8>) -> Result<Address, CodecError> {
	Ok(encode_address(prefix, &bytes)?)
}

fn decode_optional_address(
	prefix: AddressPrefix,
	bytes: Option<Vec<u8>>,
) -> Result<Option<Address>, CodecError> {
	bytes.map(|b| decode_address(prefix, b)).transpose()
}

fn decode_full_signature(sig: &proto::StdSignature) -> Result<FullSignature, CodecError> {
	let pubkey = decode_pubkey(ensure(sig.pubkey.as_ref(), "signature.pubkey")?)?;
	let signature = ensure(
		sig.signature.as_ref().and_then(|s| s.ed25519.clone()),
		"signature.signature",
	)?;
	Ok(FullSignature {
		nonce: Nonce::new(sig.sequence),
		pubkey,
		signature,
	})
}

fn decode_targets(targets: &[proto::BlockchainAddress]) -> Vec<ChainAddressPair> {
	targets
		.iter()
		.map(|target| ChainAddressPair {
			chain_id: ChainId::new(target.blockchain_id.clone()),
			address: target.address.clone(),
		})
		.collect()
}

fn decode_participants(
	prefix: AddressPrefix,
	participants: &[proto::Participant],
) -> Result<Vec<Participant>, CodecError> {
	participants
		.iter()
		.map(|p| {
			Ok(Participant {
				address: decode_address(prefix, ensure(p.signature.clone(), "participant.signature")?)?,
				weight: p.weight,
			})
		})
		.collect()
}

fn decode_vote_option(selected: i32) -> Result<VoteOption, CodecError> {
	match selected {
		1 => Ok(VoteOption::Yes),
		2 => Ok(VoteOption::No),
		3 => Ok(VoteOption::Abstain),
		other => Err(CodecError::InvalidField {
			field: "selected",
			reason: format!("unknown vote option {}", other),
		}),
	}
}

fn decode_send(prefix: AddressPrefix, msg: proto::SendMsg) -> Result<SendTransaction, CodecError> {
	Ok(SendTransaction {
		sender: decode_address(prefix, ensure(msg.source, "source")?)?,
		recipient: decode_address(prefix, ensure(msg.destination, "destination")?)?,
		amount: decode_amount(&ensure(msg.amount, "amount")?)?,
		memo: msg.memo,
	})
}

fn decode_swap_offer(
	prefix: AddressPrefix,
	msg: proto::SwapCreateMsg,
) -> Result<SwapOfferTransaction, CodecError> {
	let raw_hash = ensure(msg.preimage_hash, "preimage_hash")?;
	let hash = Hash::from_slice(&raw_hash).ok_or_else(|| CodecError::InvalidField {
		field: "preimage_hash",
		reason: format!("Hash must be {} bytes (sha256), got {}", HASH_LENGTH, raw_hash.len()),
	})?;

	Ok(SwapOfferTransaction {
		sender: decode_address(prefix, ensure(msg.source, "source")?)?,
		recipient: decode_address(prefix, ensure(msg.destination, "destination")?)?,
		hash,
		timeout: SwapTimeout::Timestamp(ensure(msg.timeout, "timeout")?),
		amounts: decode_amounts(&msg.amount)?,
		memo: msg.memo,
	})
}

pub(crate) fn decode_proposal_action(
	prefix: AddressPrefix,
	options: proto::ProposalOptions,
) -> Result<ProposalAction, CodecError> {
	let present = [
		options.send_msg.is_some(),
		options.escrow_release_msg.is_some(),
		options.execute_proposal_batch_msg.is_some(),
		options.gov_create_text_resolution_msg.is_some(),
		options.gov_update_election_rule_msg.is_some(),
	]
	.iter()
	.filter(|set| **set)
	.count();
	if present != 1 {
		return Err(CodecError::UnknownProposalAction);
	}

	if let Some(msg) = options.send_msg {
		let send = decode_send(prefix, msg)?;
		return Ok(ProposalAction::Send {
			sender: send.sender,
			recipient: send.recipient,
			amount: send.amount,
			memo: send.memo,
		});
	}
	if let Some(msg) = options.escrow_release_msg {
		return Ok(ProposalAction::ReleaseEscrow {
			escrow_id: decode_numeric_id("escrow_id", &ensure(msg.escrow_id, "escrow_id")?)?,
			amounts: decode_amounts(&msg.amount)?,
		});
	}
	if let Some(msg) = options.execute_proposal_batch_msg {
		let actions = msg
			.messages
			.into_iter()
			.map(|item| decode_proposal_action(prefix, item))
			.collect::<Result<Vec<_>, _>>()?;
		return Ok(ProposalAction::ExecuteBatch { actions });
	}
	if let Some(msg) = options.gov_create_text_resolution_msg {
		return Ok(ProposalAction::CreateTextResolution {
			resolution: ensure(msg.resolution, "resolution")?,
		});
	}
	if let Some(msg) = options.gov_update_election_rule_msg {
		let threshold = ensure(msg.threshold, "threshold")?;
		return Ok(ProposalAction::UpdateElectionRule {
			election_rule_id: decode_numeric_id(
				"election_rule_id",
				&ensure(msg.election_rule_id, "election_rule_id")?,
			)?,
			threshold: Fraction {
				numerator: threshold.numerator,
				denominator: threshold.denominator,
			},
			voting_period: ensure(msg.voting_period, "voting_period")?,
		});
	}
	Err(CodecError::UnknownProposalAction)
}

/// Number of kind-specific payloads set on an envelope.
fn payload_count(tx: &proto::Tx) -> usize {
	[
		tx.cash_send_msg.is_some(),
		tx.aswap_create_msg.is_some(),
		tx.aswap_release_msg.is_some(),
		tx.aswap_return_msg.is_some(),
		tx.username_register_token_msg.is_some(),
		tx.username_change_token_targets_msg.is_some(),
		tx.username_transfer_token_msg.is_some(),
		tx.multisig_create_msg.is_some(),
		tx.multisig_update_msg.is_some(),
		tx.escrow_create_msg.is_some(),
		tx.escrow_release_msg.is_some(),
		tx.escrow_return_msg.is_some(),
		tx.escrow_update_parties_msg.is_some(),
		tx.gov_create_proposal_msg.is_some(),
		tx.gov_vote_msg.is_some(),
	]
	.iter()
	.filter(|set| **set)
	.count()
}

/// Decodes the kind-specific payload of an envelope.
///
/// Exactly one payload must be present.
pub fn decode_msg(chain_id: &ChainId, tx: proto::Tx) -> Result<TransactionKind, CodecError> {
	if payload_count(&tx) != 1 {
		return Err(CodecError::UnknownMessageType);
	}
	let prefix = AddressPrefix::for_chain(chain_id);

	if let Some(msg) = tx.cash_send_msg {
		return Ok(TransactionKind::Send(decode_send(prefix, msg)?));
	}

	if let Some(msg) = tx.aswap_create_msg {
		return Ok(TransactionKind::SwapOffer(decode_swap_offer(prefix, msg)?));
	}
	if let Some(msg) = tx.aswap_release_msg {
		return Ok(TransactionKind::SwapClaim(SwapClaimTransaction {
			swap_id: SwapId(ensure(msg.swap_id, "swap_id")?),
			preimage: Preimage(ensure(msg.preimage, "preimage")?),
		}));
	}
	if let Some(msg) = tx.aswap_return_msg {
		return Ok(TransactionKind::SwapAbort(SwapAbortTransaction {
			swap_id: SwapId(ensure(msg.swap_id, "swap_id")?),
		}));
	}

	if let Some(msg) = tx.username_register_token_msg {
		return Ok(TransactionKind::RegisterUsername(RegisterUsernameTransaction {
			username: ensure(msg.username, "username")?,
			targets: decode_targets(&msg.targets),
		}));
	}
	if let Some(msg) = tx.username_change_token_targets_msg {
		return Ok(TransactionKind::UpdateTargetsOfUsername(
			UpdateTargetsOfUsernameTransaction {
				username: ensure(msg.username, "username")?,
				targets: decode_targets(&msg.new_targets),
			},
		));
	}
	if let Some(msg) = tx.username_transfer_token_msg {
		return Ok(TransactionKind::TransferUsername(TransferUsernameTransaction {
			username: ensure(msg.username, "username")?,
			new_owner: decode_address(prefix, ensure(msg.new_owner, "new_owner")?)?,
		}));
	}

	if let Some(msg) = tx.multisig_create_msg {
		return Ok(TransactionKind::CreateMultisignatureContract(
			CreateMultisignatureTransaction {
				participants: decode_participants(prefix, &msg.participants)?,
				activation_threshold: ensure(msg.activation_threshold, "activation_threshold")?,
				admin_threshold: ensure(msg.admin_threshold, "admin_threshold")?,
			},
		));
	}
	if let Some(msg) = tx.multisig_update_msg {
		return Ok(TransactionKind::UpdateMultisignatureContract(
			UpdateMultisignatureTransaction {
				contract_id: ensure(msg.contract_id, "contract_id")?,
				participants: decode_participants(prefix, &msg.participants)?,
				activation_threshold: ensure(msg.activation_threshold, "activation_threshold")?,
				admin_threshold: ensure(msg.admin_threshold, "admin_threshold")?,
			},
		));
	}

	if let Some(msg) = tx.escrow_create_msg {
		return Ok(TransactionKind::CreateEscrow(CreateEscrowTransaction {
			sender: decode_address(prefix, ensure(msg.source, "source")?)?,
			arbiter: decode_address(prefix, ensure(msg.arbiter, "arbiter")?)?,
			recipient: decode_address(prefix, ensure(msg.destination, "destination")?)?,
			amounts: decode_amounts(&msg.amount)?,
			timeout: SwapTimeout::Timestamp(ensure(msg.timeout, "timeout")?),
			memo: msg.memo,
		}));
	}
	if let Some(msg) = tx.escrow_release_msg {
		return Ok(TransactionKind::ReleaseEscrow(ReleaseEscrowTransaction {
			escrow_id: decode_numeric_id("escrow_id", &ensure(msg.escrow_id, "escrow_id")?)?,
			amounts: decode_amounts(&msg.amount)?,
		}));
	}
	if let Some(msg) = tx.escrow_return_msg {
		return Ok(TransactionKind::ReturnEscrow(ReturnEscrowTransaction {
			escrow_id: decode_numeric_id("escrow_id", &ensure(msg.escrow_id, "escrow_id")?)?,
		}));
	}
	if let Some(msg) = tx.escrow_update_parties_msg {
		return Ok(TransactionKind::UpdateEscrowParties(UpdateEscrowPartiesTransaction {
			escrow_id: decode_numeric_id("escrow_id", &ensure(msg.escrow_id, "escrow_id")?)?,
			sender: decode_optional_address(prefix, msg.source)?,
			arbiter: decode_optional_address(prefix, msg.arbiter)?,
			recipient: decode_optional_address(prefix, msg.destination)?,
		}));
	}

	if let Some(msg) = tx.gov_create_proposal_msg {
		let raw_option = ensure(msg.raw_option, "raw_option")?;
		let options = proto::ProposalOptions::decode(raw_option.as_slice())?;
		return Ok(TransactionKind::CreateProposal(CreateProposalTransaction {
			title: ensure(msg.title, "title")?,
			action: decode_proposal_action(prefix, options)?,
			description: ensure(msg.description, "description")?,
			election_rule_id: decode_numeric_id(
				"election_rule_id",
				&ensure(msg.election_rule_id, "election_rule_id")?,
			)?,
			start_time: ensure(msg.start_time, "start_time")?,
			author: decode_address(prefix, ensure(msg.author, "author")?)?,
		}));
	}
	if let Some(msg) = tx.gov_vote_msg {
		return Ok(TransactionKind::Vote(VoteTransaction {
			proposal_id: decode_numeric_id("proposal_id", &ensure(msg.proposal_id, "proposal_id")?)?,
			selection: decode_vote_option(ensure(msg.selected, "selected")?)?,
			voter: decode_optional_address(prefix, msg.voter)?,
		}));
	}

	Err(CodecError::UnknownMessageType)
}

/// Decodes postable bytes into a signed transaction.
///
/// The creator is taken from the first signature, so a transaction without
/// signatures cannot be parsed.
pub fn parse_tx(bytes: &[u8], chain_id: &ChainId) -> Result<SignedTransaction, CodecError> {
	let mut tx = proto::Tx::decode(bytes)?;

	let signatures = tx
		.signatures
		.iter()
		.map(decode_full_signature)
		.collect::<Result<Vec<_>, _>>()?;
	let primary = signatures.first().ok_or(CodecError::MissingField("signatures"))?;
	let creator = PublicIdentity {
		chain_id: chain_id.clone(),
		pubkey: primary.pubkey.clone(),
	};

	let prefix = AddressPrefix::for_chain(chain_id);
	let fee = match tx.fees.take() {
		Some(info) => Some(Fee {
			payer: decode_optional_address(prefix, info.payer)?,
			tokens: decode_amount(&ensure(info.fees, "fees.fees")?)?,
		}),
		None => None,
	};

	let kind = decode_msg(chain_id, tx)?;

	Ok(SignedTransaction {
		transaction: UnsignedTransaction {
			chain_id: chain_id.clone(),
			creator,
			fee,
			kind,
		},
		signatures,
	})
}
