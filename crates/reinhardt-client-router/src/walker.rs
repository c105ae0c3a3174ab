//! Route tree walking.
//!
//! [`match_routes`] tries sibling routes in declaration order and descends into
//! children whenever a route leaves part of the pathname unconsumed. The first
//! branch that consumes the whole pathname wins; there is no scoring.
//!
//! A pathless route with children is a layout: it always hands the pathname to
//! its children and only stands as a leaf (with its index route) when none of
//! them match an empty remainder. A route whose own pattern fails still offers
//! the pathname to its absolute children.

use crate::compiler::PatternCompiler;
use crate::error::RouterError;
use crate::location::Location;
use crate::matcher::match_pattern;
use crate::params::Params;
use crate::route::{Components, Route, RouteId};
use futures::future::BoxFuture;

/// The outcome of matching a location against the route tree.
///
/// A result with an empty branch is the not-found state.
#[derive(Debug, Clone)]
pub struct MatchResult {
	/// The matched location.
	pub location: Location,
	/// Matched routes, root first.
	pub branch: Vec<Route>,
	/// Parameters merged across the branch.
	///
	/// Holds captured values only. A name declared inside an optional group
	/// that did not match is absent here; [`declared_params`](Self::declared_params)
	/// lists every declared name.
	pub params: Params,
	/// Resolved component payloads, one per branch entry, once resolved.
	pub components: Option<Vec<Option<Components>>>,
	/// The pathname prefix matched through each branch entry.
	pub route_paths: Vec<String>,
}

impl MatchResult {
	/// Creates the not-found state for a location.
	pub fn not_found(location: Location) -> Self {
		Self {
			location,
			branch: Vec::new(),
			params: Params::new(),
			components: Some(Vec::new()),
			route_paths: Vec::new(),
		}
	}

	/// Returns whether no route matched.
	pub fn is_not_found(&self) -> bool {
		self.branch.is_empty()
	}

	/// Returns the deepest matched route.
	pub fn leaf(&self) -> Option<&Route> {
		self.branch.last()
	}

	/// Returns every parameter name declared across the branch, root first,
	/// each name once.
	pub fn declared_params(&self) -> Vec<String> {
		let mut names: Vec<String> = Vec::new();
		for name in self.branch.iter().flat_map(Route::param_names) {
			if !names.contains(&name) {
				names.push(name);
			}
		}
		names
	}

	/// Returns whether a route is part of the branch.
	pub fn contains(&self, route_id: RouteId) -> bool {
		self.branch.iter().any(|r| r.id() == route_id)
	}

	/// Returns whether components were resolved.
	pub fn is_resolved(&self) -> bool {
		self.components
			.as_ref()
			.is_some_and(|c| c.len() == self.branch.len())
	}

	/// Attaches resolved components.
	pub fn with_components(mut self, components: Vec<Option<Components>>) -> Self {
		self.components = Some(components);
		self
	}

	/// Returns whether `pathname` is active in this state.
	///
	/// Without `exact`, a pathname is active when some branch entry matched
	/// exactly that prefix. With `exact`, it must equal the matched pathname.
	/// Trailing slashes are ignored.
	pub fn is_active(&self, pathname: &str, exact: bool) -> bool {
		if self.is_not_found() {
			return false;
		}
		let target = normalize(pathname);
		if exact {
			return target == normalize(&self.location.pathname);
		}
		self.route_paths.iter().any(|p| normalize(p) == target)
	}
}

fn normalize(pathname: &str) -> String {
	format!("/{}", pathname.trim_matches('/'))
}

/// A matched branch before it is turned into a [`MatchResult`].
struct Branch {
	routes: Vec<Route>,
	params: Params,
	route_paths: Vec<String>,
}

/// Matches a location against a route tree.
///
/// Returns `Ok(None)` when no branch consumes the whole pathname.
///
/// # Errors
///
/// Returns [`RouterError::Pattern`] for a malformed route path and
/// [`RouterError::Match`] when loading lazy children or an index route fails.
/// No partial result is returned in either case.
pub async fn match_routes(
	compiler: &PatternCompiler,
	routes: &[Route],
	location: &Location,
) -> Result<Option<MatchResult>, RouterError> {
	let pathname = location.pathname.as_str();
	let branch = match_level(compiler, routes, pathname, Some(pathname), "").await?;

	Ok(branch.map(|branch| MatchResult {
		location: location.clone(),
		branch: branch.routes,
		params: branch.params,
		components: None,
		route_paths: branch.route_paths,
	}))
}

/// Matches one level of siblings.
///
/// `remaining` is `None` below a parent whose own pattern did not match; only
/// absolute routes can match there.
fn match_level<'a>(
	compiler: &'a PatternCompiler,
	routes: &'a [Route],
	full: &'a str,
	remaining: Option<&'a str>,
	base: &'a str,
) -> BoxFuture<'a, Result<Option<Branch>, RouterError>> {
	Box::pin(async move {
		for route in routes {
			let (input, base) = if route.is_absolute() {
				(Some(full), "")
			} else {
				(remaining, base)
			};

			let matched = match input {
				Some(input) => {
					let pattern = compiler.compile(route.pattern(), route.match_mode())?;
					match_pattern(&pattern, input)
				}
				None => None,
			};

			let Some(matched) = matched else {
				if route.has_children()
					&& let Some(branch) = descend(compiler, route, full, None, None, Params::new()).await?
				{
					return Ok(Some(branch));
				}
				continue;
			};

			let route_path = join_path(base, &matched.consumed);
			let params = matched.params();
			tracing::debug!(
				route_id = %route.id(),
				pattern = route.pattern(),
				consumed = %matched.consumed,
				remaining = %matched.remaining,
				"route matched"
			);

			let layout = route.path().is_none() && route.has_children();
			if matched.is_full() && !layout {
				return leaf_branch(route, params, route_path).await.map(Some);
			}

			let child = descend(
				compiler,
				route,
				full,
				Some(matched.remaining.as_str()),
				Some(route_path.as_str()),
				params.clone(),
			)
			.await?;
			if child.is_some() {
				return Ok(child);
			}
			if layout && matched.is_full() {
				return leaf_branch(route, params, route_path).await.map(Some);
			}
		}
		Ok(None)
	})
}

/// A fully matched route plus its index route, if any.
async fn leaf_branch(route: &Route, params: Params, route_path: String) -> Result<Branch, RouterError> {
	let mut branch = Branch {
		routes: vec![route.clone()],
		params,
		route_paths: vec![route_path.clone()],
	};
	if let Some(index) = route.load_index_route().await? {
		branch.routes.push(index.as_ref().clone());
		branch.route_paths.push(route_path);
	}
	Ok(branch)
}

/// Matches the children of `route` and prepends it to the child branch.
///
/// Without a `route_path` the route consumed nothing, and its entry takes the
/// path matched by the first child.
async fn descend(
	compiler: &PatternCompiler,
	route: &Route,
	full: &str,
	remaining: Option<&str>,
	route_path: Option<&str>,
	params: Params,
) -> Result<Option<Branch>, RouterError> {
	let Some(children) = route.load_children().await? else {
		return Ok(None);
	};
	let base = route_path.unwrap_or("");
	let Some(mut branch) = match_level(compiler, &children, full, remaining, base).await? else {
		return Ok(None);
	};

	for (name, value) in params.iter() {
		for v in value.values() {
			branch.params.merge_ancestor(name, v);
		}
	}
	let path = match route_path {
		Some(path) => path.to_string(),
		None => branch.route_paths.first().cloned().unwrap_or_else(|| "/".to_string()),
	};
	branch.routes.insert(0, route.clone());
	branch.route_paths.insert(0, path);
	Ok(Some(branch))
}

fn join_path(base: &str, consumed: &str) -> String {
	let base = base.trim_end_matches('/');
	let consumed = consumed.trim_matches('/');
	if consumed.is_empty() {
		if base.is_empty() {
			return "/".to_string();
		}
		return base.to_string();
	}
	format!("{}/{}", base, consumed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	async fn run(routes: &[Route], pathname: &str) -> Option<MatchResult> {
		let compiler = PatternCompiler::default();
		match_routes(&compiler, routes, &Location::new(pathname))
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn test_nested_match() {
		let routes = vec![Route::new("/users").children(vec![Route::new(":id")])];
		let result = run(&routes, "/users/42").await.unwrap();

		assert_eq!(result.branch.len(), 2);
		assert_eq!(result.params.get("id"), Some("42"));
		assert_eq!(result.route_paths, vec!["/users", "/users/42"]);
	}

	#[tokio::test]
	async fn test_first_match_wins() {
		let first = Route::new("/a/:x");
		let second = Route::new("/a/b");
		let routes = vec![first.clone(), second];
		let result = run(&routes, "/a/b").await.unwrap();
		assert_eq!(result.leaf().map(Route::id), Some(first.id()));
	}

	#[tokio::test]
	async fn test_index_route_appended_on_exact_match() {
		let index = Route::pathless();
		let routes = vec![
			Route::new("/users")
				.index(index.clone())
				.children(vec![Route::new(":id")]),
		];
		let result = run(&routes, "/users").await.unwrap();
		assert_eq!(result.branch.len(), 2);
		assert_eq!(result.leaf().map(Route::id), Some(index.id()));
	}

	#[tokio::test]
	async fn test_pathless_layout_route() {
		let routes = vec![Route::pathless().children(vec![Route::new("about")])];
		let result = run(&routes, "/about").await.unwrap();
		assert_eq!(result.branch.len(), 2);
	}

	#[tokio::test]
	async fn test_absolute_child_matches_full_pathname() {
		// Arrange
		let users = Route::new("/users");
		let admin = Route::new("/admin");
		let routes = vec![users.clone().children(vec![Route::new("edit"), admin.clone()])];

		// Act
		let result = run(&routes, "/admin").await.unwrap();

		// Assert
		assert_eq!(result.branch.len(), 2);
		assert_eq!(result.leaf().map(Route::id), Some(admin.id()));
		assert_eq!(result.route_paths, vec!["/admin", "/admin"]);
		assert!(run(&routes, "/edit").await.is_none());
	}

	#[tokio::test]
	async fn test_absolute_grandchild_below_unmatched_parents() {
		let settings = Route::new("/settings");
		let routes = vec![
			Route::new("/a").children(vec![Route::new("b").children(vec![settings.clone()])]),
		];

		let result = run(&routes, "/settings").await.unwrap();

		assert_eq!(result.branch.len(), 3);
		assert_eq!(result.leaf().map(Route::id), Some(settings.id()));
	}

	#[tokio::test]
	async fn test_pathless_root_layout_reaches_root_child() {
		// Arrange
		let home = Route::new("/");
		let about = Route::new("/about");
		let layout = Route::pathless().children(vec![home.clone(), about.clone()]);
		let routes = vec![layout.clone()];

		// Act
		let root = run(&routes, "/").await.unwrap();
		let page = run(&routes, "/about").await.unwrap();

		// Assert
		assert_eq!(root.branch.len(), 2);
		assert_eq!(root.branch[0].id(), layout.id());
		assert_eq!(root.leaf().map(Route::id), Some(home.id()));
		assert_eq!(page.leaf().map(Route::id), Some(about.id()));
	}

	#[tokio::test]
	async fn test_pathless_layout_falls_back_to_index_route() {
		let index = Route::pathless();
		let layout = Route::pathless()
			.index(index.clone())
			.children(vec![Route::new("about")]);
		let routes = vec![layout.clone()];

		let result = run(&routes, "/").await.unwrap();

		assert_eq!(result.branch.len(), 2);
		assert_eq!(result.leaf().map(Route::id), Some(index.id()));
		assert!(run(&routes, "/missing").await.is_none());
	}

	#[tokio::test]
	async fn test_falls_through_when_children_do_not_match() {
		let fallback = Route::new("/users/new");
		let routes = vec![
			Route::new("/users").children(vec![Route::new("edit")]),
			fallback.clone(),
		];
		let result = run(&routes, "/users/new").await.unwrap();
		assert_eq!(result.branch.len(), 1);
		assert_eq!(result.leaf().map(Route::id), Some(fallback.id()));
	}

	#[tokio::test]
	async fn test_leaf_route_requires_full_match() {
		let routes = vec![Route::new("/users")];
		assert!(run(&routes, "/users/42").await.is_none());
		assert!(run(&routes, "/users/").await.is_some());
	}

	#[tokio::test]
	async fn test_lazy_children_error_propagates() {
		let routes = vec![Route::new("/lazy").lazy_children(|| async { Err("boom".into()) })];
		let compiler = PatternCompiler::default();
		let err = match_routes(&compiler, &routes, &Location::new("/lazy/x"))
			.await
			.unwrap_err();
		assert!(matches!(err, RouterError::Match(_)));
	}

	#[tokio::test]
	async fn test_malformed_pattern_is_error() {
		let routes = vec![Route::new("/a(")];
		let compiler = PatternCompiler::default();
		let err = match_routes(&compiler, &routes, &Location::new("/a"))
			.await
			.unwrap_err();
		assert!(matches!(err, RouterError::Pattern(_)));
	}

	#[rstest]
	#[case("/users", false, true)]
	#[case("/users/", false, true)]
	#[case("/users/42", true, true)]
	#[case("/users", true, false)]
	#[case("/posts", false, false)]
	fn test_is_active(#[case] pathname: &str, #[case] exact: bool, #[case] expected: bool) {
		let state = MatchResult {
			location: Location::new("/users/42"),
			branch: vec![Route::new("/users"), Route::new(":id")],
			params: [("id", "42")].into_iter().collect(),
			components: None,
			route_paths: vec!["/users".to_string(), "/users/42".to_string()],
		};
		assert_eq!(state.is_active(pathname, exact), expected);
	}

	#[tokio::test]
	async fn test_unmatched_optional_param_is_declared_but_absent() {
		let routes = vec![Route::new("/posts(/:page)")];

		let result = run(&routes, "/posts").await.unwrap();

		assert!(!result.params.contains("page"));
		assert_eq!(result.declared_params(), vec!["page".to_string()]);
	}

	#[rstest]
	fn test_not_found_is_never_active() {
		let state = MatchResult::not_found(Location::new("/x"));
		assert!(state.is_not_found());
		assert!(state.is_resolved());
		assert!(!state.is_active("/x", true));
	}
}
