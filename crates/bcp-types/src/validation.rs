//! Configuration validation for pluggable components.
//!
//! Transports and other pluggable parts receive their settings as raw TOML
//! tables. Each one describes the table it accepts as a [`Schema`] and the
//! loader validates the table before handing it to the component's factory,
//! so factories can assume well-typed input.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
	/// A required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field is present but its value is rejected.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field has the wrong TOML type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	/// The table could not be turned into the component's settings.
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

impl ValidationError {
	/// Qualifies the field name with the name of the enclosing table.
	fn nested_in(self, parent: &str) -> Self {
		match self {
			ValidationError::MissingField(f) => {
				ValidationError::MissingField(format!("{}.{}", parent, f))
			},
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: format!("{}.{}", parent, field),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: format!("{}.{}", parent, field),
				expected,
				actual,
			},
			other => other,
		}
	}
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// An integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	/// A string restricted to a fixed set of values.
	OneOf(&'static [&'static str]),
	/// An array whose elements all have the same type.
	Array(Box<FieldType>),
	/// A nested table with its own schema.
	Table(Schema),
}

/// Custom check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field of a schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a custom check that runs after the type check.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML table against this schema.
	///
	/// Required fields must be present; optional fields are checked only
	/// when present. Nested tables are validated recursively and errors
	/// carry the dotted path of the offending field.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn type_mismatch(field: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(type_mismatch(field_name, "string", value));
			}
		},
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| type_mismatch(field_name, "integer", value))?;

			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is less than minimum {}", int_val, min_val),
					});
				}
			}
			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is greater than maximum {}", int_val, max_val),
					});
				}
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(type_mismatch(field_name, "boolean", value));
			}
		},
		FieldType::OneOf(choices) => {
			let s = value
				.as_str()
				.ok_or_else(|| type_mismatch(field_name, "string", value))?;
			if !choices.iter().any(|choice| *choice == s) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("'{}' is not one of {}", s, choices.join(", ")),
				});
			}
		},
		FieldType::Array(inner_type) => {
			let array = value
				.as_array()
				.ok_or_else(|| type_mismatch(field_name, "array", value))?;
			for (i, item) in array.iter().enumerate() {
				validate_field_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		},
		FieldType::Table(schema) => {
			schema
				.validate(value)
				.map_err(|e| e.nested_in(field_name))?;
		},
	}

	Ok(())
}

/// A component's description of the configuration table it accepts.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn transport_schema() -> Schema {
		Schema::new(
			vec![
				Field::new("url", FieldType::String),
				Field::new("kind", FieldType::OneOf(&["tendermint", "memory"])),
			],
			vec![
				Field::new(
					"poll_interval_ms",
					FieldType::Integer {
						min: Some(10),
						max: Some(60_000),
					},
				),
				Field::new(
					"fee",
					FieldType::Table(Schema::new(
						vec![Field::new("ticker", FieldType::String)],
						vec![],
					)),
				),
			],
		)
	}

	#[test]
	fn test_valid_table() {
		let config: toml::Value = toml::from_str(
			r#"
			url = "http://localhost:26657"
			kind = "tendermint"
			poll_interval_ms = 500
			fee = { ticker = "CASH" }
			"#,
		)
		.unwrap();
		assert!(transport_schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_and_out_of_range() {
		let config: toml::Value = toml::from_str(r#"kind = "memory""#).unwrap();
		assert_eq!(
			transport_schema().validate(&config),
			Err(ValidationError::MissingField("url".to_string()))
		);

		let config: toml::Value = toml::from_str(
			r#"
			url = "x"
			kind = "memory"
			poll_interval_ms = 1
			"#,
		)
		.unwrap();
		assert!(matches!(
			transport_schema().validate(&config),
			Err(ValidationError::InvalidValue { field, .. }) if field == "poll_interval_ms"
		));
	}

	#[test]
	fn test_one_of_and_nested_paths() {
		let config: toml::Value = toml::from_str(
			r#"
			url = "x"
			kind = "websocket"
			"#,
		)
		.unwrap();
		assert!(matches!(
			transport_schema().validate(&config),
			Err(ValidationError::InvalidValue { field, .. }) if field == "kind"
		));

		let config: toml::Value = toml::from_str(
			r#"
			url = "x"
			kind = "memory"
			fee = { ticker = 5 }
			"#,
		)
		.unwrap();
		assert!(matches!(
			transport_schema().validate(&config),
			Err(ValidationError::TypeMismatch { field, .. }) if field == "fee.ticker"
		));
	}
}
