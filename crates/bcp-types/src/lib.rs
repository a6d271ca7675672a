//! Common types module for the BCP client.
//!
//! This module defines the chain-agnostic data model shared by the codec,
//! the chain connection, and the atomic swap coordinator: addresses, amounts,
//! identities, the tagged transaction model, inclusion outcomes and query
//! descriptors. It also carries the configuration validation framework used
//! by pluggable transports.

/// Account balances and lookup queries.
pub mod account;
/// Bech32 address codec with chain-specific prefixes.
pub mod address;
/// Token quantities with fixed fractional digits.
pub mod amount;
/// Inclusion outcomes for submitted transactions.
pub mod block;
/// Governance records and the token registry.
pub mod governance;
/// Chain identifiers, public keys, nonces and signatures.
pub mod identity;
/// Transaction query descriptors.
pub mod query;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Zeroizing container for private key material.
pub mod secret_string;
/// Atomic swap identifiers, hash locks and derived swap state.
pub mod swap;
/// The tagged union of supported transaction kinds.
pub mod transaction;
/// Username registry records.
pub mod username;
/// Utility functions for formatting and serialization.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use account::*;
pub use address::{
	decode_address, encode_address, is_valid_address, Address, AddressError, AddressPrefix,
	ADDRESS_LENGTH,
};
pub use amount::{Amount, AmountError};
pub use block::*;
pub use governance::*;
pub use identity::*;
pub use query::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use swap::*;
pub use transaction::*;
pub use username::*;
pub use utils::{format_token_amount, truncate_id};
pub use validation::*;
