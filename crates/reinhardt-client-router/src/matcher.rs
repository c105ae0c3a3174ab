//! Matching a pathname against a compiled pattern.

use crate::params::Params;
use crate::pattern::CompiledPattern;
use std::borrow::Cow;

/// Successful match of a pattern against (a prefix of) a pathname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
	/// The part of the pathname the pattern consumed, without leading slash.
	pub consumed: String,
	/// What is left for child routes, with surrounding slashes trimmed.
	/// Empty when the pattern consumed the whole pathname.
	pub remaining: String,
	/// Capture names in pattern order.
	pub param_names: Vec<String>,
	/// Decoded capture values, `None` for captures inside an unmatched
	/// optional group.
	pub param_values: Vec<Option<String>>,
}

impl PathMatch {
	/// Returns whether the whole pathname was consumed.
	pub fn is_full(&self) -> bool {
		self.remaining.is_empty()
	}

	/// Collects the matched captures into a parameter map.
	///
	/// Captures of unmatched optional groups are left out.
	pub fn params(&self) -> Params {
		let captures: Vec<(&str, &str)> = self
			.param_names
			.iter()
			.zip(&self.param_values)
			.filter_map(|(name, value)| value.as_deref().map(|v| (name.as_str(), v)))
			.collect();
		Params::from_captures(captures)
	}
}

/// Matches `pathname` against `pattern`.
///
/// Leading slashes of the pathname are ignored. A match that stops in the
/// middle of a path segment is rejected, so `/users` does not match
/// `/usersx`. Returns `None` when the pattern does not match.
pub fn match_pattern(pattern: &CompiledPattern, pathname: &str) -> Option<PathMatch> {
	let path = pathname.trim_start_matches('/');
	let captures = pattern.regex().captures(path)?;
	let whole = captures.get(0)?;

	let consumed = whole.as_str();
	let rest = &path[whole.end()..];

	let on_boundary =
		rest.is_empty() || rest.starts_with('/') || consumed.is_empty() || consumed.ends_with('/');
	if !on_boundary {
		return None;
	}

	let param_values = (1..captures.len())
		.map(|i| captures.get(i).map(|m| decode(m.as_str())))
		.collect();

	Some(PathMatch {
		consumed: consumed.to_string(),
		remaining: rest.trim_matches('/').to_string(),
		param_names: pattern.param_names().to_vec(),
		param_values,
	})
}

/// Percent-decodes a captured value, keeping it raw when it is not valid
/// UTF-8 after decoding.
fn decode(raw: &str) -> String {
	match urlencoding::decode(raw) {
		Ok(Cow::Borrowed(value)) => value.to_string(),
		Ok(Cow::Owned(value)) => value,
		Err(_) => raw.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pattern::CompileOptions;
	use rstest::rstest;

	fn compile(pattern: &str) -> CompiledPattern {
		CompiledPattern::new(pattern, CompileOptions::prefix()).unwrap()
	}

	#[rstest]
	fn test_full_match() {
		let m = match_pattern(&compile("/users/:id"), "/users/42").unwrap();
		assert_eq!(m.consumed, "users/42");
		assert!(m.is_full());
		assert_eq!(m.param_values, vec![Some("42".to_string())]);
	}

	#[rstest]
	#[case("/users/42/posts", "posts")]
	#[case("/users/42/posts/", "posts")]
	#[case("/users/42/", "")]
	fn test_remaining_normalized(#[case] pathname: &str, #[case] remaining: &str) {
		let m = match_pattern(&compile("/users/:id"), pathname).unwrap();
		assert_eq!(m.remaining, remaining);
	}

	#[rstest]
	fn test_segment_boundary_enforced() {
		assert!(match_pattern(&compile("/users"), "/usersx").is_none());
		assert!(match_pattern(&compile("/users"), "/users/x").is_some());
	}

	#[rstest]
	fn test_no_match() {
		assert!(match_pattern(&compile("/users"), "/posts").is_none());
	}

	#[rstest]
	fn test_case_insensitive_by_default() {
		assert!(match_pattern(&compile("/Users"), "/users").is_some());

		let sensitive = CompiledPattern::new(
			"/Users",
			CompileOptions {
				case_sensitive: true,
				..CompileOptions::prefix()
			},
		)
		.unwrap();
		assert!(match_pattern(&sensitive, "/users").is_none());
	}

	#[rstest]
	fn test_values_percent_decoded() {
		let m = match_pattern(&compile("/users/:name"), "/users/j%C3%B6rg").unwrap();
		assert_eq!(m.params().get("name"), Some("jörg"));
	}

	#[rstest]
	fn test_undecodable_value_kept_raw() {
		let m = match_pattern(&compile("/f/:name"), "/f/%FF").unwrap();
		assert_eq!(m.params().get("name"), Some("%FF"));
	}

	#[rstest]
	fn test_multiple_splats_positional() {
		let m = match_pattern(&compile("/*/to/*"), "/from/a/to/b/c").unwrap();
		let params = m.params();
		assert_eq!(params.get("0"), Some("from/a"));
		assert_eq!(params.get("1"), Some("b/c"));
	}

	#[rstest]
	fn test_optional_group_absent() {
		let pattern = compile("/users(/:id)");
		let without = match_pattern(&pattern, "/users").unwrap();
		assert_eq!(without.param_values, vec![None]);
		assert!(!without.params().contains("id"));

		let with = match_pattern(&pattern, "/users/9").unwrap();
		assert_eq!(with.params().get("id"), Some("9"));
	}

	#[rstest]
	fn test_trailing_splat_consumes_everything() {
		let m = match_pattern(&compile("/*"), "/zzz/yyy").unwrap();
		assert!(m.is_full());
		assert_eq!(m.params().get("splat"), Some("zzz/yyy"));
	}

	#[rstest]
	fn test_empty_pattern_matches_as_prefix() {
		let m = match_pattern(&compile(""), "/a/b").unwrap();
		assert_eq!(m.consumed, "");
		assert_eq!(m.remaining, "a/b");
	}
}
