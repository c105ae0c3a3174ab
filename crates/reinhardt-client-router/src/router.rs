//! Router state controller.
//!
//! The [`Router`] owns the committed [`MatchResult`] and drives every
//! transition: match the location, diff against the committed state, run
//! hooks, resolve components, commit and notify subscribers. Redirects restart
//! the cycle at the redirect target after replacing the current history entry.
//!
//! ## Example
//!
//! ```
//! use reinhardt_client_router::{Route, Router};
//!
//! # tokio_test::block_on(async {
//! let router = Router::builder()
//! 	.route(Route::new("/users").children(vec![Route::new(":id")]))
//! 	.build()
//! 	.unwrap();
//!
//! let state = router.navigate("/users/42").await.unwrap().unwrap();
//! assert_eq!(state.params.get("id"), Some("42"));
//! assert!(router.is_active("/users", false));
//! # });
//! ```

use crate::compiler::PatternCompiler;
use crate::error::RouterError;
use crate::hooks::HookRegistry;
use crate::location::{Location, LocationSource, MemoryHistory, NavigationType, Navigator, Unsubscribe};
use crate::params::Params;
use crate::pattern::MatchMode;
use crate::resolver::resolve_components;
use crate::route::{Route, find_named_pattern, visit_routes};
use crate::settings::RouterSettings;
use crate::transition::{
	Transition, TransitionOutcome, TransitionTracker, compute_diff, run_transition_hooks,
};
use crate::walker::{MatchResult, match_routes};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::Instrument;

/// What the router is doing right now.
///
/// A finished transition returns to `Idle`; its result is the return value of
/// [`Router::navigate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPhase {
	/// No transition in flight.
	#[default]
	Idle,
	/// Matching the location against the route tree.
	Matching,
	/// Running lifecycle hooks.
	HooksRunning,
	/// A hook redirected; the replace was issued and matching restarts.
	Redirected,
	/// Resolving component payloads before commit.
	Resolving,
}

/// What the error handler decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
	/// The error was dealt with; the navigation ends without a commit.
	Handled,
	/// The error is returned to the caller.
	Propagate,
}

/// Receives every transition error before it reaches the caller.
pub type ErrorHandler = Arc<dyn Fn(&RouterError) -> ErrorDisposition + Send + Sync>;

/// Called with every committed state.
pub type StateListener = Arc<dyn Fn(&MatchResult) + Send + Sync>;

/// Builder for [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
	routes: Vec<Route>,
	settings: RouterSettings,
	compiler: Option<PatternCompiler>,
	registry: Option<HookRegistry>,
	source: Option<Arc<dyn LocationSource>>,
	error_handler: Option<ErrorHandler>,
}

impl RouterBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a top-level route.
	pub fn route(mut self, route: Route) -> Self {
		self.routes.push(route);
		self
	}

	/// Adds several top-level routes.
	pub fn routes(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
		self.routes.extend(routes);
		self
	}

	/// Sets the router settings.
	pub fn settings(mut self, settings: RouterSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Uses an existing pattern compiler instead of one built from settings.
	pub fn compiler(mut self, compiler: PatternCompiler) -> Self {
		self.compiler = Some(compiler);
		self
	}

	/// Sets the hook registry.
	pub fn hook_registry(mut self, registry: HookRegistry) -> Self {
		self.registry = Some(registry);
		self
	}

	/// Sets the location source. Defaults to a [`MemoryHistory`] at `/`.
	pub fn location_source(mut self, source: Arc<dyn LocationSource>) -> Self {
		self.source = Some(source);
		self
	}

	/// Sets the error handler.
	pub fn error_handler<F>(mut self, handler: F) -> Self
	where
		F: Fn(&RouterError) -> ErrorDisposition + Send + Sync + 'static,
	{
		self.error_handler = Some(Arc::new(handler));
		self
	}

	/// Builds the router.
	///
	/// Every route pattern known without loading is compiled here, so a
	/// malformed pattern fails before the first navigation.
	///
	/// # Errors
	///
	/// Returns [`RouterError::Pattern`] for the first malformed pattern.
	pub fn build(self) -> Result<Router, RouterError> {
		let compiler = self
			.compiler
			.unwrap_or_else(|| PatternCompiler::from_settings(&self.settings));

		let mut first_error = None;
		visit_routes(&self.routes, &mut |route: &Route, _full: &str| {
			if first_error.is_none()
				&& let Err(err) = compiler.compile(route.pattern(), route.match_mode())
			{
				first_error = Some(err);
			}
		});
		if let Some(err) = first_error {
			return Err(err.into());
		}

		tracing::debug!(
			routes = self.routes.len(),
			cached_patterns = compiler.cache_len(),
			"router built"
		);

		Ok(Router {
			inner: Arc::new(RouterInner {
				routes: self.routes,
				settings: self.settings,
				compiler,
				registry: self.registry.unwrap_or_default(),
				source: self
					.source
					.unwrap_or_else(|| Arc::new(MemoryHistory::default())),
				error_handler: self.error_handler,
				state: RwLock::new(None),
				subscribers: RwLock::new(Vec::new()),
				next_subscriber: AtomicU64::new(0),
				tracker: TransitionTracker::new(),
				phase: RwLock::new(TransitionPhase::Idle),
				self_issued: Mutex::new(Vec::new()),
				listening: AtomicBool::new(false),
			}),
		})
	}
}

struct RouterInner {
	routes: Vec<Route>,
	settings: RouterSettings,
	compiler: PatternCompiler,
	registry: HookRegistry,
	source: Arc<dyn LocationSource>,
	error_handler: Option<ErrorHandler>,
	state: RwLock<Option<MatchResult>>,
	subscribers: RwLock<Vec<(u64, StateListener)>>,
	next_subscriber: AtomicU64,
	tracker: TransitionTracker,
	phase: RwLock<TransitionPhase>,
	/// Keys of replace calls issued by redirects while listening.
	self_issued: Mutex<Vec<String>>,
	listening: AtomicBool,
}

/// Client-side router.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Router {
	inner: Arc<RouterInner>,
}

impl Router {
	/// Returns a router builder.
	pub fn builder() -> RouterBuilder {
		RouterBuilder::new()
	}

	/// Returns the committed state, `None` before the first commit.
	pub fn state(&self) -> Option<MatchResult> {
		self.inner.state.read().clone()
	}

	/// Returns the current phase.
	pub fn phase(&self) -> TransitionPhase {
		*self.inner.phase.read()
	}

	/// Returns the top-level routes.
	pub fn routes(&self) -> &[Route] {
		&self.inner.routes
	}

	/// Returns the settings.
	pub fn settings(&self) -> &RouterSettings {
		&self.inner.settings
	}

	/// Returns the pattern compiler.
	pub fn compiler(&self) -> &PatternCompiler {
		&self.inner.compiler
	}

	/// Returns the hook registry.
	pub fn hook_registry(&self) -> &HookRegistry {
		&self.inner.registry
	}

	/// Returns a navigator over the router's location source.
	pub fn navigator(&self) -> Navigator {
		Navigator::new(Arc::clone(&self.inner.source)).with_basename(&self.inner.settings.basename)
	}

	/// Registers a listener for committed states.
	pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
	where
		F: Fn(&MatchResult) + Send + Sync + 'static,
	{
		let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
		self.inner
			.subscribers
			.write()
			.push((id, Arc::new(listener)));

		let inner = Arc::downgrade(&self.inner);
		Unsubscribe::new(move || {
			if let Some(inner) = inner.upgrade() {
				inner.subscribers.write().retain(|(sid, _)| *sid != id);
			}
		})
	}

	/// Returns whether `pathname` is active in the committed state.
	pub fn is_active(&self, pathname: &str, exact: bool) -> bool {
		self.inner
			.state
			.read()
			.as_ref()
			.is_some_and(|state| state.is_active(pathname, exact))
	}

	/// Builds the pathname of a named route.
	///
	/// Only routes known without loading are searched.
	///
	/// # Errors
	///
	/// Returns [`RouterError::InvalidRouteName`] for an unknown name and
	/// [`RouterError::MissingParameter`] when a required parameter is missing.
	pub fn href_for(&self, name: &str, params: &Params) -> Result<String, RouterError> {
		let pattern = find_named_pattern(&self.inner.routes, name)
			.ok_or_else(|| RouterError::InvalidRouteName(name.to_string()))?;
		let compiled = self.inner.compiler.compile(&pattern, MatchMode::Exact)?;
		compiled.format(params)
	}

	/// Runs a transition to the current location of the location source.
	///
	/// # Errors
	///
	/// See [`navigate`](Self::navigate).
	pub async fn start(&self) -> Result<Option<MatchResult>, RouterError> {
		let location = self.inner.source.location();
		self.navigate(location).await
	}

	/// Runs a transition to `location` and returns the committed state.
	///
	/// This does not touch the location source except for redirects, which
	/// replace the current entry. Returns `Ok(None)` when the transition was
	/// superseded, or when it failed and the error handler handled the error.
	///
	/// # Errors
	///
	/// Returns the transition error when the error handler propagates it.
	pub async fn navigate(
		&self,
		location: impl Into<Location>,
	) -> Result<Option<MatchResult>, RouterError> {
		let transition = self.inner.tracker.begin(location.into());
		self.drive(transition).await
	}

	/// Subscribes to the location source and runs a transition for every
	/// location change it reports.
	///
	/// Transitions are spawned on the current tokio runtime. Errors of spawned
	/// transitions go through the error handler and are logged when
	/// propagated, since there is no caller to return them to.
	///
	/// # Errors
	///
	/// Returns [`RouterError::NoRuntime`] outside a tokio runtime and
	/// [`RouterError::AlreadyListening`] while a previous listener is still
	/// subscribed.
	pub fn listen(&self) -> Result<Unsubscribe, RouterError> {
		let handle = tokio::runtime::Handle::try_current().map_err(|_| RouterError::NoRuntime)?;
		if self.inner.listening.swap(true, Ordering::SeqCst) {
			return Err(RouterError::AlreadyListening);
		}
		let weak = Arc::downgrade(&self.inner);

		let unsubscribe = self.inner.source.subscribe(Arc::new(move |location: &Location| {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			if inner.take_self_issued(&location.key) {
				tracing::debug!(path = %location, "ignoring redirect issued by the router");
				return;
			}

			let router = Router { inner };
			// Begin here so that transitions supersede each other in event order.
			let transition = router.inner.tracker.begin(location.clone());
			handle.spawn(async move {
				if let Err(err) = router.drive(transition).await {
					tracing::error!(error = %err, "transition failed");
				}
			});
		}));

		let weak = Arc::downgrade(&self.inner);
		Ok(Unsubscribe::new(move || {
			unsubscribe.unsubscribe();
			if let Some(inner) = weak.upgrade() {
				inner.listening.store(false, Ordering::SeqCst);
				inner.self_issued.lock().clear();
			}
		}))
	}

	async fn drive(&self, transition: Transition) -> Result<Option<MatchResult>, RouterError> {
		let span = tracing::info_span!(
			"transition",
			id = transition.id(),
			pathname = %transition.location().pathname
		);

		let result = self.run(&transition).instrument(span).await;
		let err = match result {
			Ok(state) => return Ok(state),
			Err(err) => err,
		};

		if transition.is_superseded() {
			tracing::debug!(id = transition.id(), error = %err, "discarding error of superseded transition");
			return Ok(None);
		}
		self.set_phase(&transition, TransitionPhase::Idle);

		match &self.inner.error_handler {
			Some(handler) if handler(&err) == ErrorDisposition::Handled => {
				tracing::error!(error = %err, "transition failed, handled by error handler");
				Ok(None)
			}
			_ => Err(err),
		}
	}

	async fn run(&self, transition: &Transition) -> Result<Option<MatchResult>, RouterError> {
		let inner = &self.inner;
		let mut location = transition.location().clone();
		let mut redirects = 0;

		loop {
			if transition.is_superseded() {
				return Ok(self.cancelled(transition));
			}
			self.set_phase(transition, TransitionPhase::Matching);

			let matched = match_routes(&inner.compiler, &inner.routes, &location).await?;
			if transition.is_superseded() {
				return Ok(self.cancelled(transition));
			}

			let next = match matched {
				Some(next) => next,
				None => {
					tracing::warn!(pathname = %location.pathname, "no route matched");
					MatchResult::not_found(location.clone())
				}
			};

			let prev = self.state();
			let diff = compute_diff(prev.as_ref(), &next);
			tracing::debug!(
				leaving = diff.leaving.len(),
				changing = diff.changing.len(),
				entering = diff.entering.len(),
				"transition diff computed"
			);

			self.set_phase(transition, TransitionPhase::HooksRunning);
			let outcome =
				run_transition_hooks(transition, prev.as_ref(), &next, &diff, &inner.registry)
					.await?;

			match outcome {
				TransitionOutcome::Proceed => {}
				TransitionOutcome::Superseded => return Ok(self.cancelled(transition)),
				TransitionOutcome::Redirect(target) => {
					redirects += 1;
					if redirects > inner.settings.max_redirects {
						return Err(RouterError::RedirectLimitExceeded {
							limit: inner.settings.max_redirects,
							location: target.path(),
						});
					}

					tracing::info!(from = %location, to = %target, "redirecting");
					self.set_phase(transition, TransitionPhase::Redirected);
					let target = target.with_action(NavigationType::Replace);
					if inner.listening.load(Ordering::SeqCst) {
						inner.self_issued.lock().push(target.key.clone());
					}
					inner.source.replace(target.clone());
					location = target;
					continue;
				}
			}

			self.set_phase(transition, TransitionPhase::Resolving);
			let components = resolve_components(&next.branch).await?;
			let committed = next.with_components(components);

			if !self.commit(transition, &committed) {
				return Ok(self.cancelled(transition));
			}
			self.set_phase(transition, TransitionPhase::Idle);
			return Ok(Some(committed));
		}
	}

	fn cancelled(&self, transition: &Transition) -> Option<MatchResult> {
		tracing::warn!(id = transition.id(), "transition superseded");
		None
	}

	fn set_phase(&self, transition: &Transition, phase: TransitionPhase) {
		if !transition.is_superseded() {
			*self.inner.phase.write() = phase;
		}
	}

	/// Publishes a state unless the transition was superseded.
	fn commit(&self, transition: &Transition, state: &MatchResult) -> bool {
		{
			let mut current = self.inner.state.write();
			if transition.is_superseded() {
				return false;
			}
			*current = Some(state.clone());
		}

		tracing::info!(
			pathname = %state.location.pathname,
			routes = state.branch.len(),
			not_found = state.is_not_found(),
			"transition committed"
		);

		let subscribers: Vec<_> = self
			.inner
			.subscribers
			.read()
			.iter()
			.map(|(_, s)| Arc::clone(s))
			.collect();
		for subscriber in subscribers {
			subscriber(state);
		}
		true
	}
}

impl RouterInner {
	fn take_self_issued(&self, key: &str) -> bool {
		let mut issued = self.self_issued.lock();
		match issued.iter().position(|k| k == key) {
			Some(index) => {
				issued.remove(index);
				true
			}
			None => false,
		}
	}
}

impl std::fmt::Debug for Router {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Router")
			.field("routes", &self.inner.routes.len())
			.field("settings", &self.inner.settings)
			.field("phase", &self.phase())
			.field("has_error_handler", &self.inner.error_handler.is_some())
			.finish()
	}
}
