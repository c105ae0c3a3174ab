//! Path parameters captured while matching a branch.
//!
//! Parameters are merged from the leaf route towards the root. When the same
//! name is captured at several depths, the value becomes a
//! [`ParamValue::Multiple`] ordered leaf value first.
//!
//! # Example
//!
//! ```
//! use reinhardt_client_router::Params;
//!
//! let mut params = Params::new();
//! params.merge_ancestor("id", "2");
//! params.merge_ancestor("id", "1");
//!
//! assert_eq!(params.get("id"), Some("2"));
//! assert_eq!(params.get_all("id"), vec!["2", "1"]);
//! ```

use crate::error::ParamError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Value of a single parameter name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
	/// The name was captured once.
	Single(String),
	/// The name was captured at several depths, leaf value first.
	Multiple(Vec<String>),
}

impl ParamValue {
	/// Returns the innermost (leaf) value.
	pub fn first(&self) -> &str {
		match self {
			Self::Single(value) => value,
			Self::Multiple(values) => values.first().map(String::as_str).unwrap_or(""),
		}
	}

	/// Returns every captured value, leaf value first.
	pub fn values(&self) -> Vec<&str> {
		match self {
			Self::Single(value) => vec![value.as_str()],
			Self::Multiple(values) => values.iter().map(String::as_str).collect(),
		}
	}
}

/// Named parameters captured across a matched branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params {
	inner: BTreeMap<String, ParamValue>,
}

impl Params {
	/// Creates an empty parameter map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds parameters from a single pattern's captures.
	///
	/// Repeated names inside one pattern follow the same rule as repeated
	/// names across depths: the rightmost capture comes first.
	pub fn from_captures<'a, I>(captures: I) -> Self
	where
		I: IntoIterator<Item = (&'a str, &'a str)>,
		I::IntoIter: DoubleEndedIterator,
	{
		let mut params = Self::new();
		for (name, value) in captures.into_iter().rev() {
			params.merge_ancestor(name, value);
		}
		params
	}

	/// Merges a value captured by an ancestor route.
	///
	/// An unset name is inserted as is. A name already set by a deeper route
	/// keeps its value first and collects the ancestor value after it.
	pub fn merge_ancestor(&mut self, name: &str, value: &str) {
		match self.inner.get_mut(name) {
			None => {
				self.inner
					.insert(name.to_string(), ParamValue::Single(value.to_string()));
			}
			Some(ParamValue::Multiple(values)) => values.push(value.to_string()),
			Some(existing) => {
				let leaf = existing.first().to_string();
				*existing = ParamValue::Multiple(vec![leaf, value.to_string()]);
			}
		}
	}

	/// Returns the leaf value of a parameter.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.inner.get(name).map(ParamValue::first)
	}

	/// Returns every value of a parameter, leaf value first.
	pub fn get_all(&self, name: &str) -> Vec<&str> {
		self.inner
			.get(name)
			.map(ParamValue::values)
			.unwrap_or_default()
	}

	/// Returns the raw value entry of a parameter.
	pub fn value(&self, name: &str) -> Option<&ParamValue> {
		self.inner.get(name)
	}

	/// Parses the leaf value of a parameter into `T`.
	///
	/// # Errors
	///
	/// Returns [`ParamError::Missing`] when the parameter was not captured and
	/// [`ParamError::Parse`] when the value does not parse.
	pub fn parse<T>(&self, name: &str) -> Result<T, ParamError>
	where
		T: FromStr,
		T::Err: std::fmt::Display,
	{
		let raw = self
			.get(name)
			.ok_or_else(|| ParamError::Missing(name.to_string()))?;
		raw.parse::<T>().map_err(|e| ParamError::Parse {
			name: name.to_string(),
			param_type: std::any::type_name::<T>(),
			raw_value: raw.to_string(),
			reason: e.to_string(),
		})
	}

	/// Returns whether a parameter was captured.
	pub fn contains(&self, name: &str) -> bool {
		self.inner.contains_key(name)
	}

	/// Returns the number of distinct parameter names.
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Returns whether no parameter was captured.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Iterates over parameter names and values in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
		self.inner.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Sets a single value, replacing anything previously captured.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.inner
			.insert(name.into(), ParamValue::Single(value.into()));
	}
}

impl<K, V> FromIterator<(K, V)> for Params
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		let mut params = Self::new();
		for (k, v) in iter {
			params.insert(k, v);
		}
		params
	}
}
