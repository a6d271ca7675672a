//! Utility functions for formatting and serialization.

pub mod formatting;
pub mod serde_helpers;

pub use formatting::{format_token_amount, truncate_id};
pub use serde_helpers::{hex_bytes, quantity_string};
