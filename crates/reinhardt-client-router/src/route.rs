//! Route definitions.
//!
//! A [`Route`] is one node of the route tree. It declares an optional path
//! pattern, child routes (inline or loaded on demand), an optional index route,
//! an optional component payload and lifecycle hooks.
//!
//! # Example
//!
//! ```
//! use reinhardt_client_router::Route;
//!
//! let routes = vec![
//! 	Route::new("/users")
//! 		.name("users")
//! 		.children(vec![Route::new(":id").name("user_detail")]),
//! 	Route::new("/*").name("not_found"),
//! ];
//!
//! assert_eq!(routes[0].param_names(), Vec::<String>::new());
//! ```

use crate::error::{BoxError, HookError, LoadTarget, MatchError, ResolutionError};
use crate::hooks::{Redirect, RouteHooks};
use crate::pattern::{MatchMode, declared_param_names, join_patterns};
use crate::walker::MatchResult;
use futures::future::BoxFuture;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;

static NEXT_ROUTE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a route, assigned when the route is constructed.
///
/// Clones of a route share its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(u64);

impl RouteId {
	fn next() -> Self {
		Self(NEXT_ROUTE_ID.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns the raw identifier.
	pub fn as_u64(&self) -> u64 {
		self.0
	}
}

impl std::fmt::Display for RouteId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// A type-erased component reference.
///
/// The router never inspects components; it only carries them to the host,
/// which downcasts to its own component type.
#[derive(Clone)]
pub struct Component {
	value: Arc<dyn Any + Send + Sync>,
	type_name: &'static str,
}

impl Component {
	/// Wraps a component value.
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self {
			value: Arc::new(value),
			type_name: std::any::type_name::<T>(),
		}
	}

	/// Returns the wrapped value if it is a `T`.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.value.downcast_ref::<T>()
	}

	/// Returns whether the wrapped value is a `T`.
	pub fn is<T: Any>(&self) -> bool {
		self.value.is::<T>()
	}

	/// Returns the type name of the wrapped value.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}
}

impl std::fmt::Debug for Component {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("Component").field(&self.type_name).finish()
	}
}

/// The resolved component payload of a route.
#[derive(Debug, Clone)]
pub enum Components {
	/// One component.
	Single(Component),
	/// Named slots, in declaration order.
	Named(Vec<(String, Component)>),
}

impl Components {
	/// Returns the component of a single-component payload.
	pub fn single(&self) -> Option<&Component> {
		match self {
			Self::Single(component) => Some(component),
			Self::Named(_) => None,
		}
	}

	/// Returns the component of a named slot.
	pub fn slot(&self, name: &str) -> Option<&Component> {
		match self {
			Self::Single(_) => None,
			Self::Named(slots) => slots.iter().find(|(n, _)| n == name).map(|(_, c)| c),
		}
	}

	/// Returns slot names in declaration order.
	pub fn slot_names(&self) -> Vec<&str> {
		match self {
			Self::Single(_) => Vec::new(),
			Self::Named(slots) => slots.iter().map(|(n, _)| n.as_str()).collect(),
		}
	}
}

type RoutesLoader = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<Route>, BoxError>> + Send + Sync>;
type RouteLoader = Arc<dyn Fn() -> BoxFuture<'static, Result<Route, BoxError>> + Send + Sync>;
type ComponentsLoader =
	Arc<dyn Fn() -> BoxFuture<'static, Result<Components, BoxError>> + Send + Sync>;

/// How a route declares its component payload.
#[derive(Clone)]
pub enum ComponentSpec {
	/// Known at tree build time.
	Ready(Components),
	/// Loaded when the route is resolved.
	Lazy(ComponentsLoader),
}

#[derive(Clone)]
enum ChildRoutes {
	None,
	Static(Arc<Vec<Route>>),
	Lazy {
		loader: RoutesLoader,
		cell: Arc<OnceCell<Arc<Vec<Route>>>>,
	},
}

#[derive(Clone)]
enum IndexRoute {
	None,
	Static(Arc<Route>),
	Lazy {
		loader: RouteLoader,
		cell: Arc<OnceCell<Arc<Route>>>,
	},
}

/// A node of the route tree.
#[derive(Clone)]
pub struct Route {
	id: RouteId,
	path: Option<String>,
	name: Option<String>,
	children: ChildRoutes,
	index_route: IndexRoute,
	component: Option<ComponentSpec>,
	hooks: RouteHooks,
}

impl Route {
	/// Creates a route matching `path`.
	///
	/// Paths starting with `/` are absolute and are matched against the full
	/// pathname; other paths are matched against what the parent left over.
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: Some(path.into()),
			..Self::pathless()
		}
	}

	/// Creates a route without a path.
	///
	/// A pathless route consumes nothing and is used to group children under
	/// a shared layout or shared hooks.
	pub fn pathless() -> Self {
		Self {
			id: RouteId::next(),
			path: None,
			name: None,
			children: ChildRoutes::None,
			index_route: IndexRoute::None,
			component: None,
			hooks: RouteHooks::default(),
		}
	}

	/// Names the route for reverse routing.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Sets inline child routes.
	pub fn children(mut self, children: Vec<Route>) -> Self {
		self.children = ChildRoutes::Static(Arc::new(children));
		self
	}

	/// Sets a loader for child routes.
	///
	/// The loader runs the first time the route needs its children; the
	/// result is kept for every later match. A failed load is retried on the
	/// next match.
	pub fn lazy_children<F, Fut>(mut self, loader: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Vec<Route>, BoxError>> + Send + 'static,
	{
		let boxed: RoutesLoader = Arc::new(move || Box::pin(loader()));
		self.children = ChildRoutes::Lazy {
			loader: boxed,
			cell: Arc::new(OnceCell::new()),
		};
		self
	}

	/// Sets the index route.
	pub fn index(mut self, route: Route) -> Self {
		self.index_route = IndexRoute::Static(Arc::new(route));
		self
	}

	/// Sets a loader for the index route.
	pub fn lazy_index<F, Fut>(mut self, loader: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Route, BoxError>> + Send + 'static,
	{
		let boxed: RouteLoader = Arc::new(move || Box::pin(loader()));
		self.index_route = IndexRoute::Lazy {
			loader: boxed,
			cell: Arc::new(OnceCell::new()),
		};
		self
	}

	/// Sets a single component.
	pub fn component<T: Any + Send + Sync>(mut self, component: T) -> Self {
		self.component = Some(ComponentSpec::Ready(Components::Single(Component::new(
			component,
		))));
		self
	}

	/// Sets named component slots. Slot order is kept.
	pub fn components<I, S>(mut self, slots: I) -> Self
	where
		I: IntoIterator<Item = (S, Component)>,
		S: Into<String>,
	{
		let slots = slots.into_iter().map(|(n, c)| (n.into(), c)).collect();
		self.component = Some(ComponentSpec::Ready(Components::Named(slots)));
		self
	}

	/// Sets a loader for the component payload.
	pub fn lazy_component<F, Fut>(mut self, loader: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Components, BoxError>> + Send + 'static,
	{
		let boxed: ComponentsLoader = Arc::new(move || Box::pin(loader()));
		self.component = Some(ComponentSpec::Lazy(boxed));
		self
	}

	/// Replaces the route's hooks.
	pub fn hooks(mut self, hooks: RouteHooks) -> Self {
		self.hooks = hooks;
		self
	}

	/// Adds a synchronous `onEnter` hook.
	pub fn on_enter<F>(mut self, f: F) -> Self
	where
		F: Fn(&MatchResult, &Redirect) -> Result<(), HookError> + Send + Sync + 'static,
	{
		self.hooks = self.hooks.on_enter(f);
		self
	}

	/// Adds an asynchronous `onEnter` hook.
	pub fn on_enter_async<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(MatchResult, Redirect) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<(), HookError>> + Send + 'static,
	{
		self.hooks = self.hooks.on_enter_async(f);
		self
	}

	/// Adds an `onLeave` hook.
	pub fn on_leave<F>(mut self, f: F) -> Self
	where
		F: Fn(&MatchResult) -> Result<(), HookError> + Send + Sync + 'static,
	{
		self.hooks = self.hooks.on_leave(f);
		self
	}

	/// Adds a synchronous `onChange` hook.
	pub fn on_change<F>(mut self, f: F) -> Self
	where
		F: Fn(&MatchResult, &MatchResult, &Redirect) -> Result<(), HookError>
			+ Send
			+ Sync
			+ 'static,
	{
		self.hooks = self.hooks.on_change(f);
		self
	}

	/// Adds an asynchronous `onChange` hook.
	pub fn on_change_async<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(MatchResult, MatchResult, Redirect) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<(), HookError>> + Send + 'static,
	{
		self.hooks = self.hooks.on_change_async(f);
		self
	}

	/// Returns the route identity.
	pub fn id(&self) -> RouteId {
		self.id
	}

	/// Returns the declared path, if any.
	pub fn path(&self) -> Option<&str> {
		self.path.as_deref()
	}

	/// Returns the pattern to compile; pathless routes use the empty pattern.
	pub fn pattern(&self) -> &str {
		self.path.as_deref().unwrap_or("")
	}

	/// Returns whether the path is absolute.
	pub fn is_absolute(&self) -> bool {
		self.pattern().starts_with('/')
	}

	/// Returns the route name, if any.
	pub fn route_name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Returns the declared hooks.
	pub fn route_hooks(&self) -> &RouteHooks {
		&self.hooks
	}

	/// Returns the declared component payload.
	pub fn component_spec(&self) -> Option<&ComponentSpec> {
		self.component.as_ref()
	}

	/// Returns the parameter names the route's own path declares.
	pub fn param_names(&self) -> Vec<String> {
		declared_param_names(self.pattern())
	}

	/// Returns whether the route declares children, inline or lazy.
	pub fn has_children(&self) -> bool {
		!matches!(self.children, ChildRoutes::None)
	}

	/// Returns whether the route declares an index route.
	pub fn has_index_route(&self) -> bool {
		!matches!(self.index_route, IndexRoute::None)
	}

	/// Match mode used for this route's pattern.
	///
	/// Routes with children must leave the rest of the pathname to them;
	/// leaf routes must consume all of it.
	pub fn match_mode(&self) -> MatchMode {
		if self.has_children() {
			MatchMode::Prefix
		} else {
			MatchMode::Exact
		}
	}

	/// Returns the child routes that are available without loading.
	pub fn loaded_children(&self) -> Option<Arc<Vec<Route>>> {
		match &self.children {
			ChildRoutes::None => None,
			ChildRoutes::Static(children) => Some(Arc::clone(children)),
			ChildRoutes::Lazy { cell, .. } => cell.get().cloned(),
		}
	}

	/// Returns the index route if it is available without loading.
	pub fn loaded_index_route(&self) -> Option<Arc<Route>> {
		match &self.index_route {
			IndexRoute::None => None,
			IndexRoute::Static(route) => Some(Arc::clone(route)),
			IndexRoute::Lazy { cell, .. } => cell.get().cloned(),
		}
	}

	/// Returns the child routes, running the loader on first use.
	///
	/// # Errors
	///
	/// Returns a [`MatchError`] wrapping the loader's error.
	pub async fn load_children(&self) -> Result<Option<Arc<Vec<Route>>>, MatchError> {
		match &self.children {
			ChildRoutes::None => Ok(None),
			ChildRoutes::Static(children) => Ok(Some(Arc::clone(children))),
			ChildRoutes::Lazy { loader, cell } => {
				let children = cell
					.get_or_try_init(|| async {
						tracing::debug!(route_id = %self.id, path = self.pattern(), "loading child routes");
						loader().await.map(Arc::new)
					})
					.await
					.map_err(|source| self.match_error(LoadTarget::Children, source))?;
				Ok(Some(Arc::clone(children)))
			}
		}
	}

	/// Returns the index route, running the loader on first use.
	///
	/// # Errors
	///
	/// Returns a [`MatchError`] wrapping the loader's error.
	pub async fn load_index_route(&self) -> Result<Option<Arc<Route>>, MatchError> {
		match &self.index_route {
			IndexRoute::None => Ok(None),
			IndexRoute::Static(route) => Ok(Some(Arc::clone(route))),
			IndexRoute::Lazy { loader, cell } => {
				let route = cell
					.get_or_try_init(|| async {
						tracing::debug!(route_id = %self.id, path = self.pattern(), "loading index route");
						loader().await.map(Arc::new)
					})
					.await
					.map_err(|source| self.match_error(LoadTarget::IndexRoute, source))?;
				Ok(Some(Arc::clone(route)))
			}
		}
	}

	/// Resolves the component payload.
	///
	/// Lazy payloads are loaded on every call.
	///
	/// # Errors
	///
	/// Returns a [`ResolutionError`] wrapping the loader's error.
	pub async fn resolve_components(&self) -> Result<Option<Components>, ResolutionError> {
		match &self.component {
			None => Ok(None),
			Some(ComponentSpec::Ready(components)) => Ok(Some(components.clone())),
			Some(ComponentSpec::Lazy(loader)) => {
				loader()
					.await
					.map(Some)
					.map_err(|source| ResolutionError {
						route_id: self.id,
						path: self.pattern().to_string(),
						source,
					})
			}
		}
	}

	fn match_error(&self, target: LoadTarget, source: BoxError) -> MatchError {
		MatchError {
			route_id: self.id,
			path: self.pattern().to_string(),
			target,
			source,
		}
	}
}

impl PartialEq for Route {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for Route {}

impl std::fmt::Debug for Route {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let children = match &self.children {
			ChildRoutes::None => "none".to_string(),
			ChildRoutes::Static(children) => format!("{} static", children.len()),
			ChildRoutes::Lazy { cell, .. } => match cell.get() {
				Some(children) => format!("{} loaded", children.len()),
				None => "lazy".to_string(),
			},
		};
		f.debug_struct("Route")
			.field("id", &self.id)
			.field("path", &self.path)
			.field("name", &self.name)
			.field("children", &children)
			.field("has_index_route", &self.has_index_route())
			.field("hooks", &self.hooks)
			.finish()
	}
}

/// Finds a named route among the routes available without loading and
/// returns its full pattern, joined with every ancestor pattern.
pub fn find_named_pattern(routes: &[Route], name: &str) -> Option<String> {
	fn walk(routes: &[Route], base: &str, name: &str) -> Option<String> {
		for route in routes {
			let pattern = join_patterns(base, route.pattern());
			if route.route_name() == Some(name) {
				return Some(pattern);
			}
			if let Some(index) = route.loaded_index_route()
				&& index.route_name() == Some(name)
			{
				return Some(pattern);
			}
			if let Some(children) = route.loaded_children()
				&& let Some(found) = walk(&children, &pattern, name)
			{
				return Some(found);
			}
		}
		None
	}
	walk(routes, "", name)
}

/// Visits every route available without loading, depth first, with its
/// full pattern.
pub fn visit_routes<F>(routes: &[Route], f: &mut F)
where
	F: FnMut(&Route, &str),
{
	fn walk<F: FnMut(&Route, &str)>(routes: &[Route], base: &str, f: &mut F) {
		for route in routes {
			let pattern = join_patterns(base, route.pattern());
			f(route, &pattern);
			if let Some(index) = route.loaded_index_route() {
				f(index.as_ref(), &pattern);
			}
			if let Some(children) = route.loaded_children() {
				walk(&children, &pattern, f);
			}
		}
	}
	walk(routes, "", f);
}
