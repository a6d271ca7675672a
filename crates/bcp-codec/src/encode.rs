//! Model to wire encoding.

use crate::util::encode_numeric_id;
use crate::{proto, CodecError, FRACTIONAL_DIGITS};
use alloy_primitives::U256;
use bcp_types::{
	Address, Amount, ChainAddressPair, FullSignature, Participant, ProposalAction, PubkeyBundle,
	SwapTimeout, TransactionKind, UnsignedTransaction, VoteOption,
};
use prost::Message;

fn metadata() -> Option<proto::Metadata> {
	Some(proto::Metadata { schema: 1 })
}

pub(crate) fn encode_amount(amount: &Amount) -> Result<proto::Coin, CodecError> {
	if amount.fractional_digits != FRACTIONAL_DIGITS {
		return Err(CodecError::InvalidField {
			field: "amount",
			reason: format!(
				"expected {} fractional digits, got {}",
				FRACTIONAL_DIGITS, amount.fractional_digits
			),
		});
	}
	let scale = U256::from(10u64.pow(FRACTIONAL_DIGITS as u32));
	let whole = amount.quantity / scale;
	let fractional = amount.quantity % scale;

	let whole = u64::try_from(whole)
		.ok()
		.and_then(|w| i64::try_from(w).ok())
		.ok_or_else(|| CodecError::InvalidField {
			field: "amount",
			reason: format!("quantity {} does not fit the wire format", amount.quantity),
		})?;
	// Always below the scale, so the conversion cannot fail.
	let fractional = fractional.as_limbs()[0] as i64;

	Ok(proto::Coin {
		whole,
		fractional,
		ticker: amount.token_ticker.clone(),
	})
}

fn encode_amounts(amounts: &[Amount]) -> Result<Vec<proto::Coin>, CodecError> {
	amounts.iter().map(encode_amount).collect()
}

pub(crate) fn encode_pubkey(pubkey: &PubkeyBundle) -> proto::PublicKey {
	proto::PublicKey {
		ed25519: Some(pubkey.data.clone()),
	}
}

fn address_bytes(address: &Address) -> Result<Vec<u8>, CodecError> {
	Ok(address.data()?)
}

fn optional_address_bytes(address: Option<&Address>) -> Result<Option<Vec<u8>>, CodecError> {
	address.map(address_bytes).transpose()
}

fn encode_timeout(timeout: &SwapTimeout) -> Result<i64, CodecError> {
	match timeout {
		SwapTimeout::Timestamp(t) => Ok(*t),
		SwapTimeout::Height(h) => Err(CodecError::Unsupported(format!(
			"height based timeouts are not supported by this chain (height {})",
			h
		))),
	}
}

fn encode_targets(targets: &[ChainAddressPair]) -> Vec<proto::BlockchainAddress> {
	targets
		.iter()
		.map(|target| proto::BlockchainAddress {
			blockchain_id: target.chain_id.as_str().to_string(),
			address: target.address.clone(),
		})
		.collect()
}

fn encode_participants(participants: &[Participant]) -> Result<Vec<proto::Participant>, CodecError> {
	participants
		.iter()
		.map(|p| {
			Ok(proto::Participant {
				signature: Some(address_bytes(&p.address)?),
				weight: p.weight,
			})
		})
		.collect()
}

fn encode_vote_option(option: VoteOption) -> i32 {
	match option {
		VoteOption::Yes => 1,
		VoteOption::No => 2,
		VoteOption::Abstain => 3,
	}
}

fn encode_send(
	sender: &Address,
	recipient: &Address,
	amount: &Amount,
	memo: &Option<String>,
) -> Result<proto::SendMsg, CodecError> {
	Ok(proto::SendMsg {
		metadata: metadata(),
		source: Some(address_bytes(sender)?),
		destination: Some(address_bytes(recipient)?),
		amount: Some(encode_amount(amount)?),
		memo: memo.clone(),
	})
}

pub(crate) fn encode_proposal_action(action: &ProposalAction) -> Result<proto::ProposalOptions, CodecError> {
	let mut options = proto::ProposalOptions::default();
	match action {
		ProposalAction::CreateTextResolution { resolution } => {
			options.gov_create_text_resolution_msg = Some(proto::CreateTextResolutionMsg {
				metadata: metadata(),
				resolution: Some(resolution.clone()),
			});
		},
		ProposalAction::Send {
			sender,
			recipient,
			amount,
			memo,
		} => {
			options.send_msg = Some(encode_send(sender, recipient, amount, memo)?);
		},
		ProposalAction::ReleaseEscrow { escrow_id, amounts } => {
			options.escrow_release_msg = Some(proto::EscrowReleaseMsg {
				metadata: metadata(),
				escrow_id: Some(encode_numeric_id(*escrow_id).to_vec()),
				amount: encode_amounts(amounts)?,
			});
		},
		ProposalAction::UpdateElectionRule {
			election_rule_id,
			threshold,
			voting_period,
		} => {
			options.gov_update_election_rule_msg = Some(proto::UpdateElectionRuleMsg {
				metadata: metadata(),
				election_rule_id: Some(encode_numeric_id(*election_rule_id).to_vec()),
				threshold: Some(proto::Fraction {
					numerator: threshold.numerator,
					denominator: threshold.denominator,
				}),
				voting_period: Some(*voting_period),
			});
		},
		ProposalAction::ExecuteBatch { actions } => {
			let messages = actions
				.iter()
				.map(encode_proposal_action)
				.collect::<Result<Vec<_>, _>>()?;
			options.execute_proposal_batch_msg = Some(proto::ExecuteProposalBatchMsg { messages });
		},
	}
	Ok(options)
}

/// Fills the kind-specific payload of an envelope.
fn encode_msg(kind: &TransactionKind, tx: &mut proto::Tx) -> Result<(), CodecError> {
	match kind {
		TransactionKind::Send(send) => {
			tx.cash_send_msg = Some(encode_send(
				&send.sender,
				&send.recipient,
				&send.amount,
				&send.memo,
			)?);
		},
		TransactionKind::SwapOffer(offer) => {
			tx.aswap_create_msg = Some(proto::SwapCreateMsg {
				metadata: metadata(),
				source: Some(address_bytes(&offer.sender)?),
				preimage_hash: Some(offer.hash.as_bytes().to_vec()),
				destination: Some(address_bytes(&offer.recipient)?),
				amount: encode_amounts(&offer.amounts)?,
				timeout: Some(encode_timeout(&offer.timeout)?),
				memo: offer.memo.clone(),
			});
		},
		TransactionKind::SwapClaim(claim) => {
			tx.aswap_release_msg = Some(proto::SwapReleaseMsg {
				metadata: metadata(),
				swap_id: Some(claim.swap_id.as_bytes().to_vec()),
				preimage: Some(claim.preimage.as_bytes().to_vec()),
			});
		},
		TransactionKind::SwapAbort(abort) => {
			tx.aswap_return_msg = Some(proto::SwapReturnMsg {
				metadata: metadata(),
				swap_id: Some(abort.swap_id.as_bytes().to_vec()),
			});
		},
		TransactionKind::RegisterUsername(register) => {
			tx.username_register_token_msg = Some(proto::RegisterTokenMsg {
				metadata: metadata(),
				username: Some(register.username.clone()),
				targets: encode_targets(&register.targets),
			});
		},
		TransactionKind::UpdateTargetsOfUsername(update) => {
			tx.username_change_token_targets_msg = Some(proto::ChangeTokenTargetsMsg {
				metadata: metadata(),
				username: Some(update.username.clone()),
				new_targets: encode_targets(&update.targets),
			});
		},
		TransactionKind::TransferUsername(transfer) => {
			tx.username_transfer_token_msg = Some(proto::TransferTokenMsg {
				metadata: metadata(),
				username: Some(transfer.username.clone()),
				new_owner: Some(address_bytes(&transfer.new_owner)?),
			});
		},
		TransactionKind::CreateMultisignatureContract(create) => {
			tx.multisig_create_msg = Some(proto::MultisigCreateMsg {
				metadata: metadata(),
				participants: encode_participants(&create.participants)?,
				activation_threshold: Some(create.activation_threshold),
				admin_threshold: Some(create.admin_threshold),
			});
		},
		TransactionKind::UpdateMultisignatureContract(update) => {
			tx.multisig_update_msg = Some(proto::MultisigUpdateMsg {
				metadata: metadata(),
				contract_id: Some(update.contract_id.clone()),
				participants: encode_participants(&update.participants)?,
				activation_threshold: Some(update.activation_threshold),
				admin_threshold: Some(update.admin_threshold),
			});
		},
		TransactionKind::CreateEscrow(create) => {
			tx.escrow_create_msg = Some(proto::EscrowCreateMsg {
				metadata: metadata(),
				source: Some(address_bytes(&create.sender)?),
				arbiter: Some(address_bytes(&create.arbiter)?),
				destination: Some(address_bytes(&create.recipient)?),
				amount: encode_amounts(&create.amounts)?,
				timeout: Some(encode_timeout(&create.timeout)?),
				memo: create.memo.clone(),
			});
		},
		TransactionKind::ReleaseEscrow(release) => {
			tx.escrow_release_msg = Some(proto::EscrowReleaseMsg {
				metadata: metadata(),
				escrow_id: Some(encode_numeric_id(release.escrow_id).to_vec()),
				amount: encode_amounts(&release.amounts)?,
			});
		},
		TransactionKind::ReturnEscrow(ret) => {
			tx.escrow_return_msg = Some(proto::EscrowReturnMsg {
				metadata: metadata(),
				escrow_id: Some(encode_numeric_id(ret.escrow_id).to_vec()),
			});
		},
		TransactionKind::UpdateEscrowParties(update) => {
			tx.escrow_update_parties_msg = Some(proto::EscrowUpdatePartiesMsg {
				metadata: metadata(),
				escrow_id: Some(encode_numeric_id(update.escrow_id).to_vec()),
				source: optional_address_bytes(update.sender.as_ref())?,
				arbiter: optional_address_bytes(update.arbiter.as_ref())?,
				destination: optional_address_bytes(update.recipient.as_ref())?,
			});
		},
		TransactionKind::CreateProposal(proposal) => {
			let options = encode_proposal_action(&proposal.action)?;
			tx.gov_create_proposal_msg = Some(proto::CreateProposalMsg {
				metadata: metadata(),
				title: Some(proposal.title.clone()),
				raw_option: Some(options.encode_to_vec()),
				description: Some(proposal.description.clone()),
				election_rule_id: Some(encode_numeric_id(proposal.election_rule_id).to_vec()),
				start_time: Some(proposal.start_time),
				author: Some(address_bytes(&proposal.author)?),
			});
		},
		TransactionKind::Vote(vote) => {
			tx.gov_vote_msg = Some(proto::VoteMsg {
				metadata: metadata(),
				proposal_id: Some(encode_numeric_id(vote.proposal_id).to_vec()),
				voter: optional_address_bytes(vote.voter.as_ref())?,
				selected: Some(encode_vote_option(vote.selection)),
			});
		},
	}
	Ok(())
}

fn encode_signature(signature: &FullSignature) -> proto::StdSignature {
	proto::StdSignature {
		sequence: signature.nonce.value(),
		pubkey: Some(encode_pubkey(&signature.pubkey)),
		signature: Some(proto::Signature {
			ed25519: Some(signature.signature.clone()),
		}),
	}
}

/// Builds the wire envelope of a transaction with the given signatures.
///
/// Signable bytes are produced from the envelope without signatures.
pub fn build_tx(
	transaction: &UnsignedTransaction,
	signatures: &[FullSignature],
) -> Result<proto::Tx, CodecError> {
	let mut tx = proto::Tx {
		signatures: signatures.iter().map(encode_signature).collect(),
		..Default::default()
	};

	if let Some(fee) = &transaction.fee {
		tx.fees = Some(proto::FeeInfo {
			metadata: metadata(),
			payer: optional_address_bytes(fee.payer.as_ref())?,
			fees: Some(encode_amount(&fee.tokens)?),
		});
	}

	encode_msg(&transaction.kind, &mut tx)?;
	Ok(tx)
}
