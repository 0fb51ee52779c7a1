//! Configuration validation for pluggable implementations.
//!
//! Each implementation section (`[chain.implementations.local]`,
//! `[account.implementations.local]`, ...) is kept as raw TOML by the config
//! crate and checked against a `Schema` before the implementation is built.
//! Besides primitive types the schema understands the two value kinds this
//! system is configured with most: EVM addresses and hex private keys.

use crate::utils::{parse_address, without_0x_prefix};
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field is present but its value is unacceptable.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field has the wrong TOML type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	/// Deserializing a validated section into its typed form failed.
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

/// The expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	/// A string value.
	String,
	/// An integer value with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	/// A boolean value.
	Boolean,
	/// A string holding a 20-byte hex address.
	Address,
	/// A string holding a 32-byte hex private key.
	PrivateKey,
	/// An array whose items share one type.
	Array(Box<FieldType>),
	/// A nested table with its own schema.
	Table(Schema),
}

/// Custom validator run after the type check.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a schema.
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

	/// Adds a custom validator; it returns an error message on failure.
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

	/// Validates a TOML value against this schema.
	///
	/// Required fields must be present; optional fields are checked only
	/// when present. Nested tables report errors with a dotted path.
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
		FieldType::Address => {
			let s = value
				.as_str()
				.ok_or_else(|| type_mismatch(field_name, "address string", value))?;
			parse_address(s).map_err(|message| ValidationError::InvalidValue {
				field: field_name.to_string(),
				message,
			})?;
		},
		FieldType::PrivateKey => {
			let s = value
				.as_str()
				.ok_or_else(|| type_mismatch(field_name, "private key string", value))?;
			let hex_part = without_0x_prefix(s);
			if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
				// Never echo the key itself.
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: "expected 32 bytes of hex".to_string(),
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
			schema.validate(value).map_err(|e| match e {
				ValidationError::MissingField(f) => {
					ValidationError::MissingField(format!("{}.{}", field_name, f))
				},
				ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
					field: format!("{}.{}", field_name, field),
					message,
				},
				ValidationError::TypeMismatch {
					field,
					expected,
					actual,
				} => ValidationError::TypeMismatch {
					field: format!("{}.{}", field_name, field),
					expected,
					actual,
				},
				other => other,
			})?;
		},
	}

	Ok(())
}

/// A configuration schema that can validate a raw TOML section.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(s: &str) -> toml::Value {
		toml::from_str(s).unwrap()
	}

	fn chain_schema() -> Schema {
		Schema::new(
			vec![
				Field::new("rpc_url", FieldType::String),
				Field::new("contract_address", FieldType::Address),
			],
			vec![Field::new(
				"chain_id",
				FieldType::Integer {
					min: Some(1),
					max: None,
				},
			)],
		)
	}

	#[test]
	fn test_valid_section() {
		let value = parse(
			r#"
rpc_url = "http://localhost:8545"
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
chain_id = 31337
"#,
		);
		assert!(chain_schema().validate(&value).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let value = parse(r#"rpc_url = "http://localhost:8545""#);
		let err = chain_schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "contract_address"));
	}

	#[test]
	fn test_bad_address() {
		let value = parse(
			r#"
rpc_url = "http://localhost:8545"
contract_address = "0x1234"
"#,
		);
		let err = chain_schema().validate(&value).unwrap_err();
		assert!(err.to_string().contains("contract_address"));
	}

	#[test]
	fn test_integer_bounds() {
		let value = parse(
			r#"
rpc_url = "http://localhost:8545"
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
chain_id = 0
"#,
		);
		let err = chain_schema().validate(&value).unwrap_err();
		assert!(err.to_string().contains("less than minimum"));
	}

	#[test]
	fn test_private_key_error_hides_value() {
		let schema = Schema::new(vec![Field::new("private_key", FieldType::PrivateKey)], vec![]);
		let value = parse(r#"private_key = "0xdeadbeef""#);
		let err = schema.validate(&value).unwrap_err().to_string();
		assert!(err.contains("private_key"));
		assert!(!err.contains("deadbeef"));

		let value = parse(
			r#"private_key = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a""#,
		);
		assert!(schema.validate(&value).is_ok());
	}

	#[test]
	fn test_nested_table_paths() {
		let schema = Schema::new(
			vec![Field::new("ledger", FieldType::Table(chain_schema()))],
			vec![],
		);
		let value = parse(
			r#"
[ledger]
rpc_url = 1
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
"#,
		);
		let err = schema.validate(&value).unwrap_err();
		assert!(
			matches!(err, ValidationError::TypeMismatch { ref field, .. } if field == "ledger.rpc_url")
		);
	}
}
