//! Wire messages of the bnsd application.
//!
//! The transaction envelope carries its kind-specific payload in a protobuf
//! `oneof`. Each member is declared here as its own optional field, which is
//! wire-identical but lets the decoder see when zero or several members are
//! set instead of silently keeping the last one.
//!
//! Scalars that the decoder must be able to report as missing are declared
//! `optional` so presence survives decoding.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metadata {
	#[prost(int32, tag = "1")]
	pub schema: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Coin {
	#[prost(int64, tag = "1")]
	pub whole: i64,
	#[prost(int64, tag = "2")]
	pub fractional: i64,
	#[prost(string, tag = "3")]
	pub ticker: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PublicKey {
	#[prost(bytes = "vec", optional, tag = "1")]
	pub ed25519: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Signature {
	#[prost(bytes = "vec", optional, tag = "1")]
	pub ed25519: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StdSignature {
	#[prost(int64, tag = "1")]
	pub sequence: i64,
	#[prost(message, optional, tag = "2")]
	pub pubkey: ::core::option::Option<PublicKey>,
	#[prost(message, optional, tag = "4")]
	pub signature: ::core::option::Option<Signature>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FeeInfo {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub payer: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(message, optional, tag = "3")]
	pub fees: ::core::option::Option<Coin>,
}

// cash

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub source: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(bytes = "vec", optional, tag = "3")]
	pub destination: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(message, optional, tag = "4")]
	pub amount: ::core::option::Option<Coin>,
	#[prost(string, optional, tag = "5")]
	pub memo: ::core::option::Option<::prost::alloc::string::String>,
}

/// Wallet record stored under an address.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Set {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(message, repeated, tag = "2")]
	pub coins: ::prost::alloc::vec::Vec<Coin>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CashConfiguration {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub owner: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(message, optional, tag = "3")]
	pub minimal_fee: ::core::option::Option<Coin>,
}

// sigs

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserData {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(message, optional, tag = "2")]
	pub pubkey: ::core::option::Option<PublicKey>,
	#[prost(int64, tag = "3")]
	pub sequence: i64,
}

// aswap

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SwapCreateMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub source: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(bytes = "vec", optional, tag = "3")]
	pub preimage_hash: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(bytes = "vec", optional, tag = "4")]
	pub destination: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(message, repeated, tag = "5")]
	pub amount: ::prost::alloc::vec::Vec<Coin>,
	#[prost(int64, optional, tag = "6")]
	pub timeout: ::core::option::Option<i64>,
	#[prost(string, optional, tag = "7")]
	pub memo: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SwapReleaseMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub swap_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(bytes = "vec", optional, tag = "3")]
	pub preimage: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SwapReturnMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub swap_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

// username

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockchainAddress {
	#[prost(string, tag = "1")]
	pub blockchain_id: ::prost::alloc::string::String,
	#[prost(string, tag = "2")]
	pub address: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterTokenMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(string, optional, tag = "2")]
	pub username: ::core::option::Option<::prost::alloc::string::String>,
	#[prost(message, repeated, tag = "3")]
	pub targets: ::prost::alloc::vec::Vec<BlockchainAddress>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransferTokenMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(string, optional, tag = "2")]
	pub username: ::core::option::Option<::prost::alloc::string::String>,
	#[prost(bytes = "vec", optional, tag = "3")]
	pub new_owner: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChangeTokenTargetsMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(string, optional, tag = "2")]
	pub username: ::core::option::Option<::prost::alloc::string::String>,
	#[prost(message, repeated, tag = "3")]
	pub new_targets: ::prost::alloc::vec::Vec<BlockchainAddress>,
}

/// Username record stored under the username.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UsernameToken {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(message, repeated, tag = "2")]
	pub targets: ::prost::alloc::vec::Vec<BlockchainAddress>,
	#[prost(bytes = "vec", optional, tag = "3")]
	pub owner: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

// multisig

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Participant {
	#[prost(bytes = "vec", optional, tag = "1")]
	pub signature: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(uint32, tag = "2")]
	pub weight: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultisigCreateMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(message, repeated, tag = "2")]
	pub participants: ::prost::alloc::vec::Vec<Participant>,
	#[prost(uint32, optional, tag = "3")]
	pub activation_threshold: ::core::option::Option<u32>,
	#[prost(uint32, optional, tag = "4")]
	pub admin_threshold: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultisigUpdateMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub contract_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(message, repeated, tag = "3")]
	pub participants: ::prost::alloc::vec::Vec<Participant>,
	#[prost(uint32, optional, tag = "4")]
	pub activation_threshold: ::core::option::Option<u32>,
	#[prost(uint32, optional, tag = "5")]
	pub admin_threshold: ::core::option::Option<u32>,
}

// escrow

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EscrowCreateMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub source: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(bytes = "vec", optional, tag = "3")]
	pub arbiter: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(bytes = "vec", optional, tag = "4")]
	pub destination: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(message, repeated, tag = "5")]
	pub amount: ::prost::alloc::vec::Vec<Coin>,
	#[prost(int64, optional, tag = "6")]
	pub timeout: ::core::option::Option<i64>,
	#[prost(string, optional, tag = "7")]
	pub memo: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EscrowReleaseMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub escrow_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(message, repeated, tag = "3")]
	pub amount: ::prost::alloc::vec::Vec<Coin>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EscrowReturnMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub escrow_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EscrowUpdatePartiesMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub escrow_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(bytes = "vec", optional, tag = "3")]
	pub source: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(bytes = "vec", optional, tag = "4")]
	pub arbiter: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(bytes = "vec", optional, tag = "5")]
	pub destination: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

// gov

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Fraction {
	#[prost(uint32, tag = "1")]
	pub numerator: u32,
	#[prost(uint32, tag = "2")]
	pub denominator: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateTextResolutionMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(string, optional, tag = "2")]
	pub resolution: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateElectionRuleMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub election_rule_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(message, optional, tag = "3")]
	pub threshold: ::core::option::Option<Fraction>,
	#[prost(uint32, optional, tag = "4")]
	pub voting_period: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateProposalMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(string, optional, tag = "2")]
	pub title: ::core::option::Option<::prost::alloc::string::String>,
	#[prost(bytes = "vec", optional, tag = "3")]
	pub raw_option: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(string, optional, tag = "4")]
	pub description: ::core::option::Option<::prost::alloc::string::String>,
	#[prost(bytes = "vec", optional, tag = "5")]
	pub election_rule_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(int64, optional, tag = "6")]
	pub start_time: ::core::option::Option<i64>,
	#[prost(bytes = "vec", optional, tag = "7")]
	pub author: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VoteMsg {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub proposal_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(bytes = "vec", optional, tag = "3")]
	pub voter: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	/// 1 = yes, 2 = no, 3 = abstain.
	#[prost(int32, optional, tag = "4")]
	pub selected: ::core::option::Option<i32>,
}

/// Reference to one version of a versioned record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionedIdRef {
	#[prost(bytes = "vec", tag = "1")]
	pub id: ::prost::alloc::vec::Vec<u8>,
	#[prost(uint32, tag = "2")]
	pub version: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Elector {
	#[prost(bytes = "vec", tag = "1")]
	pub address: ::prost::alloc::vec::Vec<u8>,
	#[prost(uint32, tag = "2")]
	pub weight: u32,
}

/// Electorate record stored under its versioned id.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Electorate {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub admin: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(string, tag = "3")]
	pub title: ::prost::alloc::string::String,
	#[prost(message, repeated, tag = "4")]
	pub electors: ::prost::alloc::vec::Vec<Elector>,
	#[prost(uint64, tag = "5")]
	pub total_electorate_weight: u64,
}

/// Election rule record stored under its versioned id.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ElectionRule {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(bytes = "vec", optional, tag = "2")]
	pub admin: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(bytes = "vec", optional, tag = "3")]
	pub electorate_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(string, tag = "4")]
	pub title: ::prost::alloc::string::String,
	#[prost(uint32, tag = "5")]
	pub voting_period: u32,
	#[prost(message, optional, tag = "6")]
	pub threshold: ::core::option::Option<Fraction>,
	#[prost(message, optional, tag = "7")]
	pub quorum: ::core::option::Option<Fraction>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TallyResult {
	#[prost(uint64, tag = "1")]
	pub total_yes: u64,
	#[prost(uint64, tag = "2")]
	pub total_no: u64,
	#[prost(uint64, tag = "3")]
	pub total_abstain: u64,
	#[prost(uint64, tag = "4")]
	pub total_electorate_weight: u64,
	#[prost(message, optional, tag = "5")]
	pub quorum: ::core::option::Option<Fraction>,
	#[prost(message, optional, tag = "6")]
	pub threshold: ::core::option::Option<Fraction>,
}

/// Proposal record stored under its numeric id.
///
/// Status: 1 submitted, 2 closed, 3 withdrawn. Result: 1 undefined,
/// 2 accepted, 3 rejected. Executor result: 1 not run, 2 success, 3 failure.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Proposal {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(string, tag = "2")]
	pub title: ::prost::alloc::string::String,
	#[prost(bytes = "vec", optional, tag = "3")]
	pub raw_option: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(string, tag = "4")]
	pub description: ::prost::alloc::string::String,
	#[prost(message, optional, tag = "5")]
	pub election_rule_ref: ::core::option::Option<VersionedIdRef>,
	#[prost(message, optional, tag = "6")]
	pub electorate_ref: ::core::option::Option<VersionedIdRef>,
	#[prost(int64, tag = "7")]
	pub voting_start_time: i64,
	#[prost(int64, tag = "8")]
	pub voting_end_time: i64,
	#[prost(int64, tag = "9")]
	pub submission_time: i64,
	#[prost(bytes = "vec", optional, tag = "10")]
	pub author: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
	#[prost(message, optional, tag = "11")]
	pub vote_state: ::core::option::Option<TallyResult>,
	#[prost(int32, tag = "12")]
	pub status: i32,
	#[prost(int32, tag = "13")]
	pub result: i32,
	#[prost(int32, tag = "14")]
	pub executor_result: i32,
}

// currency

/// Token record stored under its ticker.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TokenInfo {
	#[prost(message, optional, tag = "1")]
	pub metadata: ::core::option::Option<Metadata>,
	#[prost(string, tag = "2")]
	pub name: ::prost::alloc::string::String,
}

/// Action payload of a proposal, itself a union of messages.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProposalOptions {
	#[prost(message, optional, tag = "51")]
	pub send_msg: ::core::option::Option<SendMsg>,
	#[prost(message, optional, tag = "53")]
	pub escrow_release_msg: ::core::option::Option<EscrowReleaseMsg>,
	#[prost(message, optional, tag = "60")]
	pub execute_proposal_batch_msg: ::core::option::Option<ExecuteProposalBatchMsg>,
	#[prost(message, optional, tag = "77")]
	pub gov_create_text_resolution_msg: ::core::option::Option<CreateTextResolutionMsg>,
	#[prost(message, optional, tag = "78")]
	pub gov_update_election_rule_msg: ::core::option::Option<UpdateElectionRuleMsg>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteProposalBatchMsg {
	#[prost(message, repeated, tag = "1")]
	pub messages: ::prost::alloc::vec::Vec<ProposalOptions>,
}

/// The transaction envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Tx {
	#[prost(message, optional, tag = "1")]
	pub fees: ::core::option::Option<FeeInfo>,
	#[prost(message, repeated, tag = "2")]
	pub signatures: ::prost::alloc::vec::Vec<StdSignature>,
	#[prost(bytes = "vec", repeated, tag = "4")]
	pub multisig: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
	#[prost(message, optional, tag = "51")]
	pub cash_send_msg: ::core::option::Option<SendMsg>,
	#[prost(message, optional, tag = "52")]
	pub escrow_create_msg: ::core::option::Option<EscrowCreateMsg>,
	#[prost(message, optional, tag = "53")]
	pub escrow_release_msg: ::core::option::Option<EscrowReleaseMsg>,
	#[prost(message, optional, tag = "54")]
	pub escrow_return_msg: ::core::option::Option<EscrowReturnMsg>,
	#[prost(message, optional, tag = "55")]
	pub escrow_update_parties_msg: ::core::option::Option<EscrowUpdatePartiesMsg>,
	#[prost(message, optional, tag = "56")]
	pub multisig_create_msg: ::core::option::Option<MultisigCreateMsg>,
	#[prost(message, optional, tag = "57")]
	pub multisig_update_msg: ::core::option::Option<MultisigUpdateMsg>,
	#[prost(message, optional, tag = "61")]
	pub username_register_token_msg: ::core::option::Option<RegisterTokenMsg>,
	#[prost(message, optional, tag = "62")]
	pub username_transfer_token_msg: ::core::option::Option<TransferTokenMsg>,
	#[prost(message, optional, tag = "63")]
	pub username_change_token_targets_msg: ::core::option::Option<ChangeTokenTargetsMsg>,
	#[prost(message, optional, tag = "70")]
	pub aswap_create_msg: ::core::option::Option<SwapCreateMsg>,
	#[prost(message, optional, tag = "71")]
	pub aswap_release_msg: ::core::option::Option<SwapReleaseMsg>,
	#[prost(message, optional, tag = "72")]
	pub aswap_return_msg: ::core::option::Option<SwapReturnMsg>,
	#[prost(message, optional, tag = "73")]
	pub gov_create_proposal_msg: ::core::option::Option<CreateProposalMsg>,
	#[prost(message, optional, tag = "75")]
	pub gov_vote_msg: ::core::option::Option<VoteMsg>,
}

/// Key or value list returned by abci queries.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResultSet {
	#[prost(bytes = "vec", repeated, tag = "1")]
	pub results: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}
