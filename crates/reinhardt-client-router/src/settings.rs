//! Router configuration.
//!
//! Settings can be built in code with the `with_*` methods or loaded from a
//! TOML document. Missing keys fall back to their defaults.
//!
//! ```
//! use reinhardt_client_router::RouterSettings;
//!
//! let settings = RouterSettings::from_toml_str(
//! 	r#"
//! 	case_sensitive = true
//! 	max_redirects = 3
//! 	"#,
//! )
//! .unwrap();
//!
//! assert!(settings.case_sensitive);
//! assert_eq!(settings.max_redirects, 3);
//! assert_eq!(settings.pattern_cache_capacity, 256);
//! ```

use crate::compiler::DEFAULT_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};

/// Default bound on consecutive redirects in one navigation.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Configuration of a [`Router`](crate::Router).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
	/// Match literal path text case-sensitively.
	pub case_sensitive: bool,
	/// Reject a trailing slash that a leaf route does not declare.
	pub strict_trailing_slash: bool,
	/// Number of compiled patterns kept in the cache. Zero is treated as one.
	pub pattern_cache_capacity: usize,
	/// Maximum number of redirects followed in one navigation.
	pub max_redirects: usize,
	/// Prefix added by `Navigator::create_href`.
	pub basename: String,
}

impl Default for RouterSettings {
	fn default() -> Self {
		Self {
			case_sensitive: false,
			strict_trailing_slash: false,
			pattern_cache_capacity: DEFAULT_CACHE_CAPACITY,
			max_redirects: DEFAULT_MAX_REDIRECTS,
			basename: String::new(),
		}
	}
}

impl RouterSettings {
	/// Creates default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses settings from a TOML document.
	///
	/// # Errors
	///
	/// Returns the TOML error when the document is malformed or a key has
	/// the wrong type.
	pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(source)
	}

	/// Serializes the settings to TOML.
	///
	/// # Errors
	///
	/// Returns the TOML serializer error.
	pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
		toml::to_string(self)
	}

	/// Sets case-sensitive matching.
	pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
		self.case_sensitive = case_sensitive;
		self
	}

	/// Sets strict trailing slash handling.
	pub fn with_strict_trailing_slash(mut self, strict: bool) -> Self {
		self.strict_trailing_slash = strict;
		self
	}

	/// Sets the pattern cache capacity.
	pub fn with_pattern_cache_capacity(mut self, capacity: usize) -> Self {
		self.pattern_cache_capacity = capacity;
		self
	}

	/// Sets the redirect limit.
	pub fn with_max_redirects(mut self, max: usize) -> Self {
		self.max_redirects = max;
		self
	}

	/// Sets the href basename.
	pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
		self.basename = basename.into();
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults() {
		let settings = RouterSettings::default();
		assert!(!settings.case_sensitive);
		assert!(!settings.strict_trailing_slash);
		assert_eq!(settings.pattern_cache_capacity, 256);
		assert_eq!(settings.max_redirects, 10);
		assert_eq!(settings.basename, "");
	}

	#[rstest]
	fn test_empty_toml_is_default() {
		assert_eq!(
			RouterSettings::from_toml_str("").unwrap(),
			RouterSettings::default()
		);
	}

	#[rstest]
	fn test_toml_wrong_type_rejected() {
		assert!(RouterSettings::from_toml_str("max_redirects = \"many\"").is_err());
	}

	#[rstest]
	fn test_builder_and_toml_round_trip() {
		let settings = RouterSettings::new()
			.with_case_sensitive(true)
			.with_strict_trailing_slash(true)
			.with_pattern_cache_capacity(8)
			.with_max_redirects(2)
			.with_basename("/app");

		let encoded = settings.to_toml_string().unwrap();
		assert_eq!(RouterSettings::from_toml_str(&encoded).unwrap(), settings);
	}
}
