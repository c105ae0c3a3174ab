//! Property tests for pattern compilation and matching.

use proptest::prelude::*;
use reinhardt_client_router::{MatchMode, Params, PatternCompiler, match_pattern};

/// One path segment: a literal or a parameter value.
#[derive(Debug, Clone)]
enum Segment {
	Literal(String),
	Param(String),
}

fn segments() -> impl Strategy<Value = Vec<Segment>> {
	prop::collection::vec(
		prop_oneof![
			"[a-z]{1,8}".prop_map(Segment::Literal),
			"[A-Za-z0-9_.~-]{1,12}".prop_map(Segment::Param),
		],
		1..8,
	)
}

/// Builds `(pattern, pathname, values)` from generated segments.
fn build(segments: &[Segment]) -> (String, String, Vec<String>) {
	let mut pattern = String::new();
	let mut pathname = String::new();
	let mut values = Vec::new();
	for (i, segment) in segments.iter().enumerate() {
		match segment {
			Segment::Literal(text) => {
				pattern.push_str(&format!("/{}", text));
				pathname.push_str(&format!("/{}", text));
			}
			Segment::Param(value) => {
				pattern.push_str(&format!("/:p{}", i));
				pathname.push_str(&format!("/{}", value));
				values.push(value.clone());
			}
		}
	}
	(pattern, pathname, values)
}

proptest! {
	/// Test: substituted values come back out of the matcher
	///
	/// Category: Property
	/// Verifies that a pathname built by substituting values into a pattern
	/// matches fully and yields exactly the substituted values.
	#[test]
	fn prop_match_returns_substituted_values(segments in segments()) {
		let (pattern, pathname, values) = build(&segments);
		let compiler = PatternCompiler::default();
		let compiled = compiler.compile(&pattern, MatchMode::Exact).unwrap();

		let matched = match_pattern(&compiled, &pathname).unwrap();

		prop_assert_eq!(matched.remaining.as_str(), "");
		let captured: Vec<String> = matched.param_values.into_iter().flatten().collect();
		prop_assert_eq!(captured, values);
	}

	/// Test: formatting then matching recovers the parameters
	///
	/// Category: Property
	/// Verifies that values containing reserved characters survive
	/// percent-encoding in `format` and decoding in the matcher.
	#[test]
	fn prop_format_then_match(a in "[a-z ?#%/]{1,10}", b in "[0-9]{1,5}") {
		let compiler = PatternCompiler::default();
		let compiled = compiler.compile("/items/:a/rev/:b", MatchMode::Exact).unwrap();
		let params: Params = [("a", a.as_str()), ("b", b.as_str())].into_iter().collect();

		let pathname = compiled.format(&params).unwrap();
		let matched = match_pattern(&compiled, &pathname).unwrap();

		prop_assert_eq!(matched.params(), params);
	}

	/// Test: compiling twice is structurally identical
	///
	/// Category: Property
	#[test]
	fn prop_compile_deterministic(segments in segments()) {
		let (pattern, _, _) = build(&segments);
		let first = PatternCompiler::new(1).compile(&pattern, MatchMode::Prefix).unwrap();
		let second = PatternCompiler::new(1).compile(&pattern, MatchMode::Prefix).unwrap();
		prop_assert_eq!(&*first, &*second);
	}
}
