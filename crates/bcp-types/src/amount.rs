//! Token quantities.
//!
//! Quantities are unsigned 256-bit integers scaled by a fixed number of
//! fractional digits, so `2.01 CASH` with nine digits is stored as
//! `2010000000`. All arithmetic is checked.

use crate::utils::{format_token_amount, quantity_string};
use alloy_primitives::ruint::UintTryFrom;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during amount arithmetic or parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
	/// The two amounts use different tokens or precisions.
	#[error("Cannot combine {left} with {right}")]
	Mismatch { left: String, right: String },
	/// Addition overflowed the quantity type.
	#[error("Amount overflow")]
	Overflow,
	/// Subtraction would make the quantity negative.
	#[error("Amount underflow: {have} is less than {need}")]
	Underflow { have: String, need: String },
	/// The decimal string could not be parsed.
	#[error("Invalid decimal amount '{0}'")]
	Parse(String),
}

/// A quantity of one token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
	#[serde(with = "quantity_string")]
	pub quantity: U256,
	pub fractional_digits: u8,
	pub token_ticker: String,
}

impl Amount {
	/// Builds an amount from any unsigned integer that fits in 256 bits.
	pub fn new<Q>(quantity: Q, fractional_digits: u8, ticker: impl Into<String>) -> Self
	where
		U256: UintTryFrom<Q>,
	{
		Self {
			quantity: U256::from(quantity),
			fractional_digits,
			token_ticker: ticker.into(),
		}
	}

	/// A zero quantity of the given token.
	pub fn zero(fractional_digits: u8, ticker: impl Into<String>) -> Self {
		Self::new(U256::ZERO, fractional_digits, ticker)
	}

	/// Parses a human decimal like `"0.01"` into an amount.
	///
	/// More fractional places than `fractional_digits` is an error rather
	/// than a silent truncation.
	pub fn from_decimal_str(
		value: &str,
		fractional_digits: u8,
		ticker: impl Into<String>,
	) -> Result<Self, AmountError> {
		let parse_err = || AmountError::Parse(value.to_string());
		let (whole, fraction) = match value.split_once('.') {
			Some((w, f)) => (w, f),
			None => (value, ""),
		};
		if whole.is_empty()
			|| fraction.len() > fractional_digits as usize
			|| !whole.bytes().all(|b| b.is_ascii_digit())
			|| !fraction.bytes().all(|b| b.is_ascii_digit())
		{
			return Err(parse_err());
		}

		let padded = format!(
			"{}{:0<width$}",
			whole,
			fraction,
			width = fractional_digits as usize
		);
		let quantity = U256::from_str_radix(&padded, 10).map_err(|_| parse_err())?;
		Ok(Self::new(quantity, fractional_digits, ticker))
	}

	pub fn is_zero(&self) -> bool {
		self.quantity.is_zero()
	}

	fn same_token(&self, other: &Amount) -> Result<(), AmountError> {
		if self.token_ticker != other.token_ticker || self.fractional_digits != other.fractional_digits
		{
			return Err(AmountError::Mismatch {
				left: self.to_string(),
				right: other.to_string(),
			});
		}
		Ok(())
	}

	pub fn checked_add(&self, other: &Amount) -> Result<Amount, AmountError> {
		self.same_token(other)?;
		let quantity = self
			.quantity
			.checked_add(other.quantity)
			.ok_or(AmountError::Overflow)?;
		Ok(Self::new(quantity, self.fractional_digits, self.token_ticker.clone()))
	}

	pub fn checked_sub(&self, other: &Amount) -> Result<Amount, AmountError> {
		self.same_token(other)?;
		let quantity =
			self.quantity
				.checked_sub(other.quantity)
				.ok_or_else(|| AmountError::Underflow {
					have: self.to_string(),
					need: other.to_string(),
				})?;
		Ok(Self::new(quantity, self.fractional_digits, self.token_ticker.clone()))
	}
}

impl fmt::Display for Amount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} {}",
			format_token_amount(&self.quantity.to_string(), self.fractional_digits),
			self.token_ticker
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_from_decimal_str() {
		let fee = Amount::from_decimal_str("0.01", 9, "CASH").unwrap();
		assert_eq!(fee.quantity, U256::from(10_000_000u64));

		let whole = Amount::from_decimal_str("2", 9, "CASH").unwrap();
		assert_eq!(whole.quantity, U256::from(2_000_000_000u64));

		assert!(Amount::from_decimal_str("0.0000000001", 9, "CASH").is_err());
		assert!(Amount::from_decimal_str("-1", 9, "CASH").is_err());
		assert!(Amount::from_decimal_str(".5", 9, "CASH").is_err());
	}

	#[test]
	fn test_checked_arithmetic() {
		let a = Amount::new(2_000_000_000u64, 9, "CASH");
		let fee = Amount::new(10_000_000u64, 9, "CASH");
		assert_eq!(
			a.checked_add(&fee).unwrap().quantity,
			U256::from(2_010_000_000u64)
		);
		assert!(matches!(
			fee.checked_sub(&a),
			Err(AmountError::Underflow { .. })
		));
		let other = Amount::new(1u64, 9, "MASH");
		assert!(matches!(
			a.checked_add(&other),
			Err(AmountError::Mismatch { .. })
		));
		let max = Amount::new(U256::MAX, 9, "CASH");
		assert_eq!(max.checked_add(&fee), Err(AmountError::Overflow));
	}

	#[test]
	fn test_new_accepts_any_unsigned_quantity() {
		let from_u32 = Amount::new(7u32, 9, "CASH");
		let from_u64 = Amount::new(7u64, 9, "CASH");
		let from_u128 = Amount::new(7u128, 9, "CASH");
		let from_u256 = Amount::new(U256::from(7u64), 9, "CASH");
		assert_eq!(from_u32, from_u64);
		assert_eq!(from_u64, from_u128);
		assert_eq!(from_u128, from_u256);

		let huge = Amount::new(u128::MAX, 9, "CASH");
		assert_eq!(huge.quantity, U256::from(u128::MAX));
	}

	#[test]
	fn test_display() {
		let amount = Amount::new(2_010_000_000u64, 9, "CASH");
		assert_eq!(amount.to_string(), "2.01 CASH");
	}

	#[test]
	fn test_serde_quantity_as_decimal_string() {
		let amount = Amount::new(5_000_000_000u64, 9, "MASH");
		let json = serde_json::to_value(&amount).unwrap();
		assert_eq!(json["quantity"], "5000000000");
		let back: Amount = serde_json::from_value(json).unwrap();
		assert_eq!(back, amount);
	}
}
