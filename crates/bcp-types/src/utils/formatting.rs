//! String formatting utilities.
//!
//! Provides helpers for shortening identifiers in log lines and for rendering
//! scaled token quantities.

/// Utility function to truncate a hex string for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

/// Renders a raw quantity with the given number of fractional digits.
///
/// Trailing zeros of the fraction are dropped, so `2010000000` with nine
/// digits becomes `"2.01"` and `5000000000` becomes `"5"`.
pub fn format_token_amount(amount: &str, decimals: u8) -> String {
	if decimals == 0 {
		return amount.to_string();
	}

	let places = decimals as usize;
	let (integer_part, decimal_part) = if amount.len() <= places {
		("0".to_string(), format!("{:0>width$}", amount, width = places))
	} else {
		let split = amount.len() - places;
		(amount[..split].to_string(), amount[split..].to_string())
	};

	let trimmed = decimal_part.trim_end_matches('0');
	if trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, trimmed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("12345678"), "12345678");
		assert_eq!(truncate_id("123456789"), "12345678..");
		assert_eq!(truncate_id("A1B2C3D4E5F6"), "A1B2C3D4..");
	}

	#[test]
	fn test_format_token_amount() {
		assert_eq!(format_token_amount("2010000000", 9), "2.01");
		assert_eq!(format_token_amount("5000000000", 9), "5");
		assert_eq!(format_token_amount("10000000", 9), "0.01");
		assert_eq!(format_token_amount("0", 9), "0");
		assert_eq!(format_token_amount("42", 0), "42");
	}
}
