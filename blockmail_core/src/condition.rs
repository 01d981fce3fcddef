use std::fmt::Display;

use thiserror::Error;
use tracing::warn;

use crate::Context;
use crate::Value;

/// Comparison operators in the order they are tried. `===` must come before
/// `==` and `!==` before `!=` because the shorter symbols are substrings of
/// the longer ones.
const COMPARISONS: [Operator; 4] = [
	Operator::StrictEq,
	Operator::StrictNeq,
	Operator::LooseEq,
	Operator::LooseNeq,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
	/// `===`, no type coercion.
	StrictEq,
	/// `!==`
	StrictNeq,
	/// `==`, coercing the variable to compare with the literal.
	LooseEq,
	/// `!=`
	LooseNeq,
	/// A bare variable name.
	Truthy,
}

impl Operator {
	pub fn symbol(self) -> &'static str {
		match self {
			Operator::StrictEq => "===",
			Operator::StrictNeq => "!==",
			Operator::LooseEq => "==",
			Operator::LooseNeq => "!=",
			Operator::Truthy => "",
		}
	}
}

impl Display for Operator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Operator::Truthy => write!(f, "truthy"),
			operator => write!(f, "{}", operator.symbol()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConditionError {
	#[error("the condition is empty")]
	Empty,
	#[error("`{operator}` needs exactly one variable on the left and one value on the right")]
	MalformedComparison { operator: Operator },
}

/// A parsed block condition such as `rsvp_status === 'attending'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition<'a> {
	pub operator: Operator,
	/// The variable name.
	pub left: &'a str,
	/// The literal to compare against, with one layer of quotes removed.
	/// `None` for truthy checks.
	pub right: Option<&'a str>,
}

impl<'a> Condition<'a> {
	/// Parse condition text. The first operator found wins; text without an
	/// operator is a truthy check on a single variable.
	pub fn parse(text: &'a str) -> Result<Self, ConditionError> {
		let text = text.trim();
		if text.is_empty() {
			return Err(ConditionError::Empty);
		}

		for operator in COMPARISONS {
			if !text.contains(operator.symbol()) {
				continue;
			}

			let mut sides = text.split(operator.symbol()).map(str::trim);
			let (Some(left), Some(right), None) = (sides.next(), sides.next(), sides.next()) else {
				return Err(ConditionError::MalformedComparison { operator });
			};

			if left.is_empty() || right.is_empty() {
				return Err(ConditionError::MalformedComparison { operator });
			}

			return Ok(Self {
				operator,
				left,
				right: Some(strip_quotes(right)),
			});
		}

		Ok(Self {
			operator: Operator::Truthy,
			left: text,
			right: None,
		})
	}

	/// Evaluate against `context`. Variables missing from the context behave
	/// like `null`.
	pub fn evaluate(&self, context: &Context) -> bool {
		let value = context.get(self.left).unwrap_or(&Value::Null);
		let right = self.right.unwrap_or_default();

		match self.operator {
			Operator::StrictEq => value.strict_eq(right),
			Operator::StrictNeq => !value.strict_eq(right),
			Operator::LooseEq => value.loose_eq(right),
			Operator::LooseNeq => !value.loose_eq(right),
			Operator::Truthy => value.is_truthy(),
		}
	}
}

/// Parse and evaluate condition text in one step. Invalid conditions are
/// logged and evaluate to `false`.
pub fn evaluate_condition(text: &str, context: &Context) -> bool {
	match Condition::parse(text) {
		Ok(condition) => condition.evaluate(context),
		Err(error) => {
			warn!(condition = text.trim(), %error, "invalid condition evaluates to false");
			false
		}
	}
}

/// Remove one layer of matching single or double quotes.
fn strip_quotes(value: &str) -> &str {
	['"', '\'']
		.into_iter()
		.find_map(|quote| {
			value
				.strip_prefix(quote)
				.and_then(|inner| inner.strip_suffix(quote))
		})
		.unwrap_or(value)
}
