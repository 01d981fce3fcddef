use std::fmt::Display;

use float_cmp::approx_eq;
use serde::Deserialize;

use crate::BlockmailError;
use crate::BlockmailResult;

/// A single variable value available to a template.
///
/// Values are deliberately flat: strings, booleans, numbers, arrays of strings
/// and `null`. Anything richer must be flattened by the caller before
/// rendering.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	Array(Vec<String>),
}

impl Eq for Value {}
impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(value), Value::Bool(other_value)) => value == other_value,
			(Value::Number(value), Value::Number(other_value)) => {
				approx_eq!(f64, *value, *other_value, ulps = 2)
			}
			(Value::String(value), Value::String(other_value)) => value == other_value,
			(Value::Array(value), Value::Array(other_value)) => value == other_value,
			_ => false,
		}
	}
}

impl Value {
	/// The truthiness of a bare condition such as `{{#if name}}`.
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Null => false,
			Value::Bool(value) => *value,
			Value::Number(value) => *value != 0.0 && !value.is_nan(),
			Value::String(value) => !value.is_empty() && value != "null" && value != "undefined",
			Value::Array(items) => !items.is_empty(),
		}
	}

	/// `===` against a literal from the template. Only strings can ever be
	/// strictly equal to a literal, so `true === 'true'` is false.
	pub fn strict_eq(&self, literal: &str) -> bool {
		matches!(self, Value::String(value) if value == literal)
	}

	/// `==` against a literal from the template, coercing the value.
	pub fn loose_eq(&self, literal: &str) -> bool {
		match self {
			Value::Null => false,
			Value::Bool(value) => {
				let (word, digit) = if *value { ("true", 1.0) } else { ("false", 0.0) };
				literal == word
					|| parse_number(literal)
						.is_some_and(|number| approx_eq!(f64, number, digit, ulps = 2))
			}
			Value::Number(value) => {
				parse_number(literal)
					.is_some_and(|number| approx_eq!(f64, *value, number, ulps = 2))
			}
			Value::String(value) => value == literal,
			Value::Array(items) => items.join(",") == literal,
		}
	}

	/// Convert a JSON value, rejecting nested objects and arrays that hold
	/// anything other than strings.
	pub fn from_json(name: &str, value: serde_json::Value) -> BlockmailResult<Self> {
		match value {
			serde_json::Value::Null => Ok(Value::Null),
			serde_json::Value::Bool(value) => Ok(Value::Bool(value)),
			serde_json::Value::Number(number) => {
				number.as_f64().map(Value::Number).ok_or_else(|| {
					BlockmailError::UnsupportedValue {
						name: name.to_string(),
						reason: format!("`{number}` cannot be represented as a number"),
					}
				})
			}
			serde_json::Value::String(value) => Ok(Value::String(value)),
			serde_json::Value::Array(items) => {
				items
					.into_iter()
					.map(|item| {
						match item {
							serde_json::Value::String(item) => Ok(item),
							other => {
								Err(BlockmailError::UnsupportedValue {
									name: name.to_string(),
									reason: format!("array items must be strings, found `{other}`"),
								})
							}
						}
					})
					.collect::<BlockmailResult<Vec<_>>>()
					.map(Value::Array)
			}
			serde_json::Value::Object(_) => {
				Err(BlockmailError::UnsupportedValue {
					name: name.to_string(),
					reason: "nested objects are not supported".to_string(),
				})
			}
		}
	}

	/// Interpret a raw command line or form value: `true`, `false`, `null` and
	/// numbers keep their type, everything else is a string.
	pub fn parse_loose(raw: &str) -> Self {
		match raw {
			"true" => Value::Bool(true),
			"false" => Value::Bool(false),
			"null" => Value::Null,
			_ => {
				parse_number(raw)
					.map_or_else(|| Value::String(raw.to_string()), Value::Number)
			}
		}
	}
}

fn parse_number(text: &str) -> Option<f64> {
	// `inf` and `nan` parse as floats but are never numbers in a template.
	text.trim().parse::<f64>().ok().filter(|number| number.is_finite())
}

impl Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Value::Null => Ok(()),
			Value::Bool(value) => write!(f, "{value}"),
			Value::Number(value) => fmt_number(*value, f),
			Value::String(value) => write!(f, "{value}"),
			Value::Array(items) => write!(f, "{}", items.join(",")),
		}
	}
}

fn fmt_number(value: f64, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
	if value.is_nan() {
		write!(f, "NaN")
	} else if value.is_infinite() {
		write!(f, "{}Infinity", if value < 0.0 { "-" } else { "" })
	} else if value == 0.0 {
		write!(f, "0")
	} else if value.fract() == 0.0 && value.abs() < 1e21 {
		write!(f, "{value:.0}")
	} else {
		write!(f, "{value}")
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Number(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Number(f64::from(value))
	}
}

impl From<u32> for Value {
	fn from(value: u32) -> Self {
		Value::Number(f64::from(value))
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Number(value as f64)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::String(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::String(value)
	}
}

impl From<Vec<String>> for Value {
	fn from(items: Vec<String>) -> Self {
		Value::Array(items)
	}
}

impl From<Vec<&str>> for Value {
	fn from(items: Vec<&str>) -> Self {
		Value::Array(items.into_iter().map(ToString::to_string).collect())
	}
}

impl<T> From<Option<T>> for Value
where
	T: Into<Value>,
{
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}
