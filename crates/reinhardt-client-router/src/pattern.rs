//! Route path pattern compilation.
//!
//! A route pattern is a path with dynamic tokens:
//!
//! - `/users` - literal text, matched exactly (regex metacharacters escaped)
//! - `/users/:id` - named parameter, any run of characters except `/`, `?`, `#`
//! - `/files/*` - splat, captured under the name `splat`
//! - `/files/**` - greedy splat, always matches as much as possible
//! - `/users(/:id)` - optional group, the enclosed part may be absent
//!
//! A trailing splat is greedy and anchors the pattern to the end of the
//! pathname. A splat followed by more literal text is lazy and stops at the
//! first occurrence of that text. When a pattern holds more than one splat the
//! captures are named by position (`0`, `1`, ...) instead of `splat`.
//!
//! Patterns are compiled relative: leading slashes are stripped from both the
//! pattern and the pathname before matching.

use crate::error::{PatternError, RouterError};
use crate::params::Params;
use regex::{Regex, RegexBuilder};

/// Maximum allowed length for a route pattern string in bytes.
const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed number of path segments in a route pattern.
const MAX_PATH_SEGMENTS: usize = 32;

/// Maximum allowed size for a compiled pattern regex (in bytes).
const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

/// Name given to the capture of a pattern's only splat.
pub const SPLAT_PARAM: &str = "splat";

/// How much of a pathname a compiled pattern must consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
	/// Match a prefix of the pathname; the rest is left for child routes.
	Prefix,
	/// Match the whole pathname.
	Exact,
}

/// Options that influence the generated expression.
///
/// Two compilations of the same pattern with equal options are
/// interchangeable, which is what the compiler cache relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompileOptions {
	/// Prefix or exact matching.
	pub mode: MatchMode,
	/// Whether literal text is matched case-sensitively.
	pub case_sensitive: bool,
	/// Whether exact patterns reject a trailing slash they do not declare.
	pub strict_trailing_slash: bool,
}

impl CompileOptions {
	/// Prefix matching, case-insensitive, lenient trailing slash.
	pub const fn prefix() -> Self {
		Self {
			mode: MatchMode::Prefix,
			case_sensitive: false,
			strict_trailing_slash: false,
		}
	}

	/// Exact matching, case-insensitive, lenient trailing slash.
	pub const fn exact() -> Self {
		Self {
			mode: MatchMode::Exact,
			case_sensitive: false,
			strict_trailing_slash: false,
		}
	}
}

impl Default for CompileOptions {
	fn default() -> Self {
		Self::prefix()
	}
}

/// A lexical token of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternToken {
	/// Literal text.
	Literal(String),
	/// `:name`
	Param(String),
	/// `*`
	Splat,
	/// `**`
	GreedySplat,
	/// `(`
	GroupOpen,
	/// `)`
	GroupClose,
}

impl PatternToken {
	fn is_splat(&self) -> bool {
		matches!(self, Self::Splat | Self::GreedySplat)
	}
}

/// Splits a pattern into tokens.
///
/// # Errors
///
/// Returns [`PatternError::UnbalancedGroup`] for mismatched parentheses and
/// [`PatternError::EmptyParamName`] for a `:` without a name.
pub fn tokenize(pattern: &str) -> Result<Vec<PatternToken>, PatternError> {
	let mut tokens = Vec::new();
	let mut literal = String::new();
	let mut open_groups: Vec<usize> = Vec::new();
	let mut chars = pattern.char_indices().peekable();

	fn flush(literal: &mut String, tokens: &mut Vec<PatternToken>) {
		if !literal.is_empty() {
			tokens.push(PatternToken::Literal(std::mem::take(literal)));
		}
	}

	while let Some((position, c)) = chars.next() {
		match c {
			':' => {
				flush(&mut literal, &mut tokens);
				let mut name = String::new();
				while let Some(&(_, next)) = chars.peek() {
					let valid = if name.is_empty() {
						next.is_ascii_alphabetic() || next == '_' || next == '$'
					} else {
						next.is_ascii_alphanumeric() || next == '_' || next == '$'
					};
					if !valid {
						break;
					}
					name.push(next);
					chars.next();
				}
				if name.is_empty() {
					return Err(PatternError::EmptyParamName {
						pattern: pattern.to_string(),
						position,
					});
				}
				tokens.push(PatternToken::Param(name));
			}
			'*' => {
				flush(&mut literal, &mut tokens);
				if matches!(chars.peek(), Some((_, '*'))) {
					chars.next();
					tokens.push(PatternToken::GreedySplat);
				} else {
					tokens.push(PatternToken::Splat);
				}
			}
			'(' => {
				flush(&mut literal, &mut tokens);
				open_groups.push(position);
				tokens.push(PatternToken::GroupOpen);
			}
			')' => {
				flush(&mut literal, &mut tokens);
				if open_groups.pop().is_none() {
					return Err(PatternError::UnbalancedGroup {
						pattern: pattern.to_string(),
						position,
					});
				}
				tokens.push(PatternToken::GroupClose);
			}
			_ => literal.push(c),
		}
	}
	flush(&mut literal, &mut tokens);

	if let Some(position) = open_groups.pop() {
		return Err(PatternError::UnbalancedGroup {
			pattern: pattern.to_string(),
			position,
		});
	}

	Ok(tokens)
}

/// Returns the parameter names a token list captures, in order.
fn param_names_of(tokens: &[PatternToken]) -> Vec<String> {
	let splats = tokens.iter().filter(|t| t.is_splat()).count();
	let mut splat_index = 0;
	tokens
		.iter()
		.filter_map(|token| match token {
			PatternToken::Param(name) => Some(name.clone()),
			PatternToken::Splat | PatternToken::GreedySplat => {
				let name = if splats > 1 {
					splat_index.to_string()
				} else {
					SPLAT_PARAM.to_string()
				};
				splat_index += 1;
				Some(name)
			}
			_ => None,
		})
		.collect()
}

/// Returns the parameter names a pattern declares, without building a regex.
///
/// Malformed patterns declare nothing.
pub fn declared_param_names(pattern: &str) -> Vec<String> {
	tokenize(pattern.trim_start_matches('/'))
		.map(|tokens| param_names_of(&tokens))
		.unwrap_or_default()
}

/// Whether a splat token at `index` is the last capturing token.
fn is_trailing(tokens: &[PatternToken], index: usize) -> bool {
	tokens[index + 1..]
		.iter()
		.all(|t| matches!(t, PatternToken::GroupClose))
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
	/// The original pattern string.
	pattern: String,
	/// Options it was compiled with.
	options: CompileOptions,
	/// Source of the generated expression.
	regex_source: String,
	/// Compiled regex pattern.
	regex: Regex,
	/// Parameter names in capture order.
	param_names: Vec<String>,
	/// Tokens of the leading-slash-stripped pattern.
	tokens: Vec<PatternToken>,
}

impl CompiledPattern {
	/// Compiles a pattern without going through a cache.
	///
	/// Prefer [`PatternCompiler::compile`](crate::PatternCompiler::compile),
	/// which memoizes the result.
	///
	/// # Errors
	///
	/// Returns a [`PatternError`] if the pattern is too long, has too many
	/// segments, is malformed, or compiles to an invalid regex.
	pub fn new(pattern: &str, options: CompileOptions) -> Result<Self, PatternError> {
		// Reject oversized patterns before building a regex from them
		if pattern.len() > MAX_PATTERN_LENGTH {
			return Err(PatternError::TooLong {
				length: pattern.len(),
				max: MAX_PATTERN_LENGTH,
			});
		}

		let segment_count = pattern.split('/').count();
		if segment_count > MAX_PATH_SEGMENTS {
			return Err(PatternError::TooManySegments {
				count: segment_count,
				max: MAX_PATH_SEGMENTS,
			});
		}

		let tokens = tokenize(pattern.trim_start_matches('/'))?;
		let param_names = param_names_of(&tokens);
		let regex_source = Self::build_source(&tokens, options);

		let regex = RegexBuilder::new(&regex_source)
			.case_insensitive(!options.case_sensitive)
			.size_limit(MAX_REGEX_SIZE)
			.build()
			.map_err(|e| PatternError::InvalidRegex {
				pattern: pattern.to_string(),
				message: e.to_string(),
			})?;

		Ok(Self {
			pattern: pattern.to_string(),
			options,
			regex_source,
			regex,
			param_names,
			tokens,
		})
	}

	fn build_source(tokens: &[PatternToken], options: CompileOptions) -> String {
		let mut source = String::from("^");

		for (index, token) in tokens.iter().enumerate() {
			match token {
				PatternToken::Literal(text) => source.push_str(&regex::escape(text)),
				PatternToken::Param(_) => source.push_str("([^/?#]+)"),
				PatternToken::Splat if is_trailing(tokens, index) => source.push_str("(.*)"),
				PatternToken::Splat => source.push_str("(.*?)"),
				PatternToken::GreedySplat => source.push_str("(.*)"),
				PatternToken::GroupOpen => source.push_str("(?:"),
				PatternToken::GroupClose => source.push_str(")?"),
			}
		}

		let ends_with_splat = tokens
			.iter()
			.rev()
			.find(|t| !matches!(t, PatternToken::GroupClose))
			.is_some_and(PatternToken::is_splat);

		if ends_with_splat {
			// A trailing splat consumes the rest of the pathname.
			source.push('$');
		} else if options.mode == MatchMode::Exact {
			if options.strict_trailing_slash {
				source.push('$');
			} else {
				source.push_str("/?$");
			}
		}

		source
	}

	/// Returns the original pattern string.
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Returns the options the pattern was compiled with.
	pub fn options(&self) -> CompileOptions {
		self.options
	}

	/// Returns the generated regex source.
	pub fn regex_source(&self) -> &str {
		&self.regex_source
	}

	pub(crate) fn regex(&self) -> &Regex {
		&self.regex
	}

	/// Returns the parameter names in capture order.
	pub fn param_names(&self) -> &[String] {
		&self.param_names
	}

	/// Returns the pattern's tokens.
	pub fn tokens(&self) -> &[PatternToken] {
		&self.tokens
	}

	/// Returns whether the pattern captures anything.
	pub fn is_static(&self) -> bool {
		self.param_names.is_empty()
	}

	/// Builds a concrete pathname from this pattern.
	///
	/// Named parameters are percent-encoded, splats are inserted verbatim.
	/// An optional group is dropped when any parameter inside it is missing.
	///
	/// # Errors
	///
	/// Returns [`RouterError::MissingParameter`] when a parameter outside
	/// every optional group is missing.
	pub fn format(&self, params: &Params) -> Result<String, RouterError> {
		// One buffer per open group, plus the root buffer.
		let mut stack: Vec<(String, bool)> = vec![(String::new(), true)];
		let mut names = self.param_names.iter();

		for token in &self.tokens {
			match token {
				PatternToken::Literal(text) => {
					if let Some((buffer, _)) = stack.last_mut() {
						buffer.push_str(text);
					}
				}
				PatternToken::Param(_) | PatternToken::Splat | PatternToken::GreedySplat => {
					let name = names.next().map(String::as_str).unwrap_or(SPLAT_PARAM);
					let value = params.get(name).map(|v| match token {
						PatternToken::Param(_) => urlencoding::encode(v).into_owned(),
						_ => v.to_string(),
					});
					match (value, stack.len()) {
						(Some(value), _) => {
							if let Some((buffer, _)) = stack.last_mut() {
								buffer.push_str(&value);
							}
						}
						(None, 1) => return Err(RouterError::MissingParameter(name.to_string())),
						(None, _) => {
							if let Some((_, complete)) = stack.last_mut() {
								*complete = false;
							}
						}
					}
				}
				PatternToken::GroupOpen => stack.push((String::new(), true)),
				PatternToken::GroupClose => {
					if let Some((group, complete)) = stack.pop()
						&& complete && let Some((parent, _)) = stack.last_mut()
					{
						parent.push_str(&group);
					}
				}
			}
		}

		let body = stack.pop().map(|(buffer, _)| buffer).unwrap_or_default();
		let mut path = String::with_capacity(body.len() + 1);
		path.push('/');
		for c in body.trim_start_matches('/').chars() {
			if c == '/' && path.ends_with('/') {
				continue;
			}
			path.push(c);
		}
		Ok(path)
	}
}

impl PartialEq for CompiledPattern {
	fn eq(&self, other: &Self) -> bool {
		self.pattern == other.pattern
			&& self.options == other.options
			&& self.regex_source == other.regex_source
			&& self.param_names == other.param_names
			&& self.tokens == other.tokens
	}
}

impl Eq for CompiledPattern {}

impl std::fmt::Display for CompiledPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.pattern)
	}
}

/// Joins a child pattern onto its parent's pattern.
///
/// Absolute child patterns (leading `/`) replace the parent pattern.
pub fn join_patterns(parent: &str, child: &str) -> String {
	if child.starts_with('/') {
		return child.to_string();
	}
	let parent = parent.trim_end_matches('/');
	if child.is_empty() {
		if parent.is_empty() {
			return "/".to_string();
		}
		return parent.to_string();
	}
	format!("{}/{}", parent, child)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn prefix(pattern: &str) -> CompiledPattern {
		CompiledPattern::new(pattern, CompileOptions::prefix()).unwrap()
	}

	#[rstest]
	fn test_tokenize_mixed() {
		let tokens = tokenize("users/:id(/posts/*)").unwrap();
		assert_eq!(
			tokens,
			vec![
				PatternToken::Literal("users/".to_string()),
				PatternToken::Param("id".to_string()),
				PatternToken::GroupOpen,
				PatternToken::Literal("/posts/".to_string()),
				PatternToken::Splat,
				PatternToken::GroupClose,
			]
		);
	}

	#[rstest]
	#[case("/a(/b", 2)]
	#[case("/a)/b", 2)]
	#[case("((x)", 0)]
	fn test_unbalanced_group(#[case] pattern: &str, #[case] position: usize) {
		let err = CompiledPattern::new(pattern, CompileOptions::prefix()).unwrap_err();
		assert_eq!(
			err,
			PatternError::UnbalancedGroup {
				pattern: pattern.trim_start_matches('/').to_string(),
				position: position - usize::from(pattern.starts_with('/')),
			}
		);
	}

	#[rstest]
	fn test_empty_param_name() {
		let err = tokenize("users/:/x").unwrap_err();
		assert!(matches!(err, PatternError::EmptyParamName { position: 6, .. }));
	}

	#[rstest]
	fn test_single_splat_named_splat() {
		let pattern = prefix("/files/*");
		assert_eq!(pattern.param_names(), &["splat"]);
	}

	#[rstest]
	fn test_multiple_splats_named_by_position() {
		let pattern = prefix("/*/to/*");
		assert_eq!(pattern.param_names(), &["0", "1"]);
	}

	#[rstest]
	fn test_trailing_splat_greedy_inner_splat_lazy() {
		let pattern = prefix("/*/to/*");
		assert_eq!(pattern.regex_source(), "^(.*?)/to/(.*)$");
	}

	#[rstest]
	fn test_literal_metacharacters_escaped() {
		let pattern = prefix("/api/v1.0/");
		assert_eq!(pattern.regex_source(), r"^api/v1\.0/");
	}

	#[rstest]
	fn test_exact_mode_anchors_with_optional_slash() {
		let pattern = CompiledPattern::new("/users", CompileOptions::exact()).unwrap();
		assert_eq!(pattern.regex_source(), "^users/?$");

		let strict = CompiledPattern::new(
			"/users",
			CompileOptions {
				strict_trailing_slash: true,
				..CompileOptions::exact()
			},
		)
		.unwrap();
		assert_eq!(strict.regex_source(), "^users$");
	}

	#[rstest]
	fn test_compiling_twice_is_structurally_identical() {
		assert_eq!(prefix("/users/:id(/edit)"), prefix("/users/:id(/edit)"));
	}

	#[rstest]
	fn test_pattern_rejects_excessive_length() {
		// Arrange: a pattern exceeding 1024 bytes
		let long_pattern = "/".to_string() + &"a".repeat(1025);

		// Act
		let result = CompiledPattern::new(&long_pattern, CompileOptions::prefix());

		// Assert
		assert!(matches!(result, Err(PatternError::TooLong { .. })));
	}

	#[rstest]
	fn test_pattern_rejects_excessive_segments() {
		// Arrange: a pattern with more than 32 segments
		let segments: Vec<&str> = (0..35).map(|_| "seg").collect();
		let pattern = format!("/{}/", segments.join("/"));

		// Act
		let result = CompiledPattern::new(&pattern, CompileOptions::prefix());

		// Assert
		assert!(matches!(result, Err(PatternError::TooManySegments { .. })));
	}

	#[rstest]
	fn test_format_simple() {
		let pattern = prefix("/users/:id");
		let params: Params = [("id", "42")].into_iter().collect();
		assert_eq!(pattern.format(&params).unwrap(), "/users/42");
	}

	#[rstest]
	fn test_format_encodes_params_not_splats() {
		let pattern = prefix("/users/:name/files/*");
		let params: Params = [("name", "a b"), ("splat", "docs/readme.md")]
			.into_iter()
			.collect();
		assert_eq!(
			pattern.format(&params).unwrap(),
			"/users/a%20b/files/docs/readme.md"
		);
	}

	#[rstest]
	fn test_format_drops_incomplete_optional_group() {
		let pattern = prefix("/users(/:id)");
		assert_eq!(pattern.format(&Params::new()).unwrap(), "/users");

		let params: Params = [("id", "7")].into_iter().collect();
		assert_eq!(pattern.format(&params).unwrap(), "/users/7");
	}

	#[rstest]
	fn test_format_missing_required_param() {
		let pattern = prefix("/users/:id");
		let err = pattern.format(&Params::new()).unwrap_err();
		assert!(matches!(err, RouterError::MissingParameter(name) if name == "id"));
	}

	#[rstest]
	#[case("/users", ":id", "/users/:id")]
	#[case("/users/", ":id", "/users/:id")]
	#[case("/users", "/admin", "/admin")]
	#[case("", "", "/")]
	#[case("/users", "", "/users")]
	fn test_join_patterns(#[case] parent: &str, #[case] child: &str, #[case] expected: &str) {
		assert_eq!(join_patterns(parent, child), expected);
	}

	#[rstest]
	fn test_declared_param_names() {
		assert_eq!(declared_param_names("/users/:id/:tab"), vec!["id", "tab"]);
		assert!(declared_param_names("/a(/b").is_empty());
	}
}
