//! Route lifecycle hooks.
//!
//! Three hook kinds run during a transition:
//!
//! - `onLeave` runs for routes that leave the active branch. It receives the
//!   previous state, cannot redirect and is always synchronous.
//! - `onChange` runs for routes that stay active while the location changes.
//! - `onEnter` runs for routes that enter the active branch.
//!
//! `onEnter` and `onChange` hooks may be synchronous closures or closures
//! returning a future, and both may call [`Redirect::to`]. Hooks are either
//! declared on a [`Route`](crate::Route) or registered at runtime in a
//! [`HookRegistry`] under the route's [`RouteId`].

use crate::error::HookError;
use crate::location::Location;
use crate::route::RouteId;
use crate::walker::MatchResult;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Which lifecycle hook is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
	/// `onEnter`
	Enter,
	/// `onLeave`
	Leave,
	/// `onChange`
	Change,
}

impl std::fmt::Display for HookKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Enter => write!(f, "onEnter"),
			Self::Leave => write!(f, "onLeave"),
			Self::Change => write!(f, "onChange"),
		}
	}
}

/// Future returned by asynchronous hooks.
pub type HookFuture = BoxFuture<'static, Result<(), HookError>>;

/// Handle a hook uses to redirect the running transition.
///
/// Clones share the same target.
#[derive(Clone, Default)]
pub struct Redirect {
	target: Arc<Mutex<Option<Location>>>,
}

impl Redirect {
	/// Creates an unset redirect handle.
	pub fn new() -> Self {
		Self::default()
	}

	/// Requests a redirect. The last call wins.
	pub fn to(&self, location: impl Into<Location>) {
		*self.target.lock() = Some(location.into());
	}

	/// Returns the requested target without clearing it.
	pub fn target(&self) -> Option<Location> {
		self.target.lock().clone()
	}

	/// Returns whether a redirect was requested.
	pub fn is_set(&self) -> bool {
		self.target.lock().is_some()
	}

	pub(crate) fn take(&self) -> Option<Location> {
		self.target.lock().take()
	}
}

impl std::fmt::Debug for Redirect {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Redirect")
			.field("target", &self.target.lock().as_ref().map(Location::path))
			.finish()
	}
}

/// `onLeave` hook, called with the state being left.
pub type LeaveHook = Arc<dyn Fn(&MatchResult) -> Result<(), HookError> + Send + Sync>;

type SyncEnterFn = Arc<dyn Fn(&MatchResult, &Redirect) -> Result<(), HookError> + Send + Sync>;
type AsyncEnterFn = Arc<dyn Fn(MatchResult, Redirect) -> HookFuture + Send + Sync>;
type SyncChangeFn =
	Arc<dyn Fn(&MatchResult, &MatchResult, &Redirect) -> Result<(), HookError> + Send + Sync>;
type AsyncChangeFn = Arc<dyn Fn(MatchResult, MatchResult, Redirect) -> HookFuture + Send + Sync>;

/// `onEnter` hook, called with the state being entered.
#[derive(Clone)]
pub enum EnterHook {
	/// Completes before returning.
	Sync(SyncEnterFn),
	/// Completes when the returned future resolves.
	Async(AsyncEnterFn),
}

impl EnterHook {
	pub(crate) async fn call(&self, next: &MatchResult, redirect: &Redirect) -> Result<(), HookError> {
		match self {
			Self::Sync(f) => f(next, redirect),
			Self::Async(f) => f(next.clone(), redirect.clone()).await,
		}
	}
}

/// `onChange` hook, called with the previous and next state.
#[derive(Clone)]
pub enum ChangeHook {
	/// Completes before returning.
	Sync(SyncChangeFn),
	/// Completes when the returned future resolves.
	Async(AsyncChangeFn),
}

impl ChangeHook {
	pub(crate) async fn call(
		&self,
		prev: &MatchResult,
		next: &MatchResult,
		redirect: &Redirect,
	) -> Result<(), HookError> {
		match self {
			Self::Sync(f) => f(prev, next, redirect),
			Self::Async(f) => f(prev.clone(), next.clone(), redirect.clone()).await,
		}
	}
}

/// The hooks attached to one route.
#[derive(Clone, Default)]
pub struct RouteHooks {
	pub(crate) on_enter: Vec<EnterHook>,
	pub(crate) on_leave: Vec<LeaveHook>,
	pub(crate) on_change: Vec<ChangeHook>,
}

impl RouteHooks {
	/// Creates an empty hook set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a synchronous `onEnter` hook.
	pub fn on_enter<F>(mut self, f: F) -> Self
	where
		F: Fn(&MatchResult, &Redirect) -> Result<(), HookError> + Send + Sync + 'static,
	{
		self.on_enter.push(EnterHook::Sync(Arc::new(f)));
		self
	}

	/// Adds an asynchronous `onEnter` hook.
	pub fn on_enter_async<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(MatchResult, Redirect) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<(), HookError>> + Send + 'static,
	{
		let boxed: AsyncEnterFn = Arc::new(move |next, redirect| Box::pin(f(next, redirect)));
		self.on_enter.push(EnterHook::Async(boxed));
		self
	}

	/// Adds an `onLeave` hook.
	pub fn on_leave<F>(mut self, f: F) -> Self
	where
		F: Fn(&MatchResult) -> Result<(), HookError> + Send + Sync + 'static,
	{
		self.on_leave.push(Arc::new(f));
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
		self.on_change.push(ChangeHook::Sync(Arc::new(f)));
		self
	}

	/// Adds an asynchronous `onChange` hook.
	pub fn on_change_async<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(MatchResult, MatchResult, Redirect) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<(), HookError>> + Send + 'static,
	{
		let boxed: AsyncChangeFn =
			Arc::new(move |prev, next, redirect| Box::pin(f(prev, next, redirect)));
		self.on_change.push(ChangeHook::Async(boxed));
		self
	}

	/// Appends every hook of `other` after the hooks already present.
	pub fn extend(&mut self, other: RouteHooks) {
		self.on_enter.extend(other.on_enter);
		self.on_leave.extend(other.on_leave);
		self.on_change.extend(other.on_change);
	}

	/// Returns whether no hook is set.
	pub fn is_empty(&self) -> bool {
		self.on_enter.is_empty() && self.on_leave.is_empty() && self.on_change.is_empty()
	}

	/// Returns the `onEnter` hooks.
	pub fn enter_hooks(&self) -> &[EnterHook] {
		&self.on_enter
	}

	/// Returns the `onLeave` hooks.
	pub fn leave_hooks(&self) -> &[LeaveHook] {
		&self.on_leave
	}

	/// Returns the `onChange` hooks.
	pub fn change_hooks(&self) -> &[ChangeHook] {
		&self.on_change
	}
}

impl std::fmt::Debug for RouteHooks {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouteHooks")
			.field("on_enter", &self.on_enter.len())
			.field("on_leave", &self.on_leave.len())
			.field("on_change", &self.on_change.len())
			.finish()
	}
}

/// Hooks registered at runtime, keyed by route identity.
///
/// The transition manager runs a route's declared hooks first and the
/// registered ones after them. Clones share the same table.
#[derive(Clone, Default)]
pub struct HookRegistry {
	table: Arc<RwLock<HashMap<RouteId, RouteHooks>>>,
}

impl HookRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers hooks for a route, after any already registered for it.
	pub fn register(&self, route_id: RouteId, hooks: RouteHooks) {
		tracing::debug!(%route_id, "registering route hooks");
		self.table.write().entry(route_id).or_default().extend(hooks);
	}

	/// Returns the hooks registered for a route.
	pub fn hooks_for(&self, route_id: RouteId) -> Option<RouteHooks> {
		self.table.read().get(&route_id).cloned()
	}

	/// Removes every hook registered for a route.
	pub fn remove(&self, route_id: RouteId) -> Option<RouteHooks> {
		self.table.write().remove(&route_id)
	}

	/// Returns the number of routes with registered hooks.
	pub fn len(&self) -> usize {
		self.table.read().len()
	}

	/// Returns whether nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.table.read().is_empty()
	}
}

impl std::fmt::Debug for HookRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HookRegistry")
			.field("routes", &self.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::route::Route;
	use rstest::rstest;

	#[rstest]
	fn test_hook_kind_display() {
		assert_eq!(HookKind::Enter.to_string(), "onEnter");
		assert_eq!(HookKind::Leave.to_string(), "onLeave");
		assert_eq!(HookKind::Change.to_string(), "onChange");
	}

	#[rstest]
	fn test_redirect_last_call_wins() {
		let redirect = Redirect::new();
		assert!(!redirect.is_set());

		let clone = redirect.clone();
		clone.to("/a");
		clone.to("/b");

		assert_eq!(redirect.target().unwrap().pathname, "/b");
		assert_eq!(redirect.take().unwrap().pathname, "/b");
		assert!(!redirect.is_set());
	}

	#[rstest]
	fn test_registry_appends_hooks() {
		let registry = HookRegistry::new();
		let route = Route::new("/a");

		registry.register(route.id(), RouteHooks::new().on_leave(|_| Ok(())));
		registry.register(
			route.id(),
			RouteHooks::new()
				.on_leave(|_| Ok(()))
				.on_enter(|_, _| Ok(())),
		);

		let hooks = registry.hooks_for(route.id()).unwrap();
		assert_eq!(hooks.leave_hooks().len(), 2);
		assert_eq!(hooks.enter_hooks().len(), 1);
		assert_eq!(registry.len(), 1);

		registry.remove(route.id());
		assert!(registry.is_empty());
	}

	#[tokio::test]
	async fn test_async_enter_hook_redirects() {
		let hooks = RouteHooks::new().on_enter_async(|_next, redirect| async move {
			tokio::task::yield_now().await;
			redirect.to("/login");
			Ok(())
		});

		let redirect = Redirect::new();
		let state = MatchResult::not_found(Location::new("/secret"));
		hooks.enter_hooks()[0].call(&state, &redirect).await.unwrap();

		assert_eq!(redirect.target().unwrap().pathname, "/login");
	}
}
