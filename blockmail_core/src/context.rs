use std::collections::BTreeMap;

use derive_more::Deref;
use derive_more::DerefMut;
use serde::Deserialize;

use crate::BlockmailError;
use crate::BlockmailResult;
use crate::Value;

/// The flat variable mapping supplied for a single render call.
///
/// Guest fields, campaign fields and site-wide settings are expected to be
/// merged into one `Context` before rendering. Use [`Context::merge`] to layer
/// them so that more specific values win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut, Deserialize)]
#[serde(transparent)]
pub struct Context(
	#[deref]
	#[deref_mut]
	BTreeMap<String, Value>,
);

impl Context {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder style insert.
	#[must_use]
	pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.0.insert(name.into(), value.into());
		self
	}

	/// Insert a variable, returning the value it replaced.
	pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(name.into(), value.into())
	}

	/// Copy every variable from `other` into this context, overwriting
	/// existing names.
	pub fn merge(&mut self, other: &Context) {
		for (name, value) in other.iter() {
			self.0.insert(name.clone(), value.clone());
		}
	}

	/// Build a context from layers ordered from least to most specific.
	pub fn layered<'a>(layers: impl IntoIterator<Item = &'a Context>) -> Self {
		let mut context = Self::new();
		for layer in layers {
			context.merge(layer);
		}
		context
	}

	/// Parse a flat JSON object.
	pub fn from_json_str(json: &str) -> BlockmailResult<Self> {
		let value: serde_json::Value =
			serde_json::from_str(json).map_err(|e| BlockmailError::ContextParse(e.to_string()))?;
		Self::from_json_value(value)
	}

	/// Convert a JSON object into a context. Every value must be a string,
	/// boolean, number, array of strings or `null`.
	pub fn from_json_value(value: serde_json::Value) -> BlockmailResult<Self> {
		let serde_json::Value::Object(map) = value else {
			return Err(BlockmailError::ContextParse(format!(
				"expected a JSON object, found `{value}`"
			)));
		};

		let mut context = Self::new();
		for (name, value) in map {
			let value = Value::from_json(&name, value)?;
			context.0.insert(name, value);
		}

		Ok(context)
	}
}

impl<K, V> FromIterator<(K, V)> for Context
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|(name, value)| (name.into(), value.into()))
				.collect(),
		)
	}
}

impl From<BTreeMap<String, Value>> for Context {
	fn from(map: BTreeMap<String, Value>) -> Self {
		Self(map)
	}
}
