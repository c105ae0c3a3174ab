//! Transition diffing and hook execution.
//!
//! [`compute_diff`] decides which routes leave, stay, and enter when the
//! router moves from one [`MatchResult`] to the next. [`run_transition_hooks`]
//! then runs `onLeave`, `onChange` and `onEnter` hooks in that order.
//!
//! Only one transition is active at a time. Starting a new one through a
//! [`TransitionTracker`] supersedes the previous one, which notices after its
//! next await point and stops without any observable effect.

use crate::error::{HookError, RouterError};
use crate::hooks::{HookKind, HookRegistry, Redirect, RouteHooks};
use crate::location::Location;
use crate::route::Route;
use crate::walker::MatchResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Routes affected by a transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionDiff {
	/// Routes leaving the branch, deepest first.
	pub leaving: Vec<Route>,
	/// Routes staying in the branch while the location changes, root first.
	pub changing: Vec<Route>,
	/// Routes entering the branch, root first.
	pub entering: Vec<Route>,
}

impl TransitionDiff {
	/// Returns whether no route is affected.
	pub fn is_empty(&self) -> bool {
		self.leaving.is_empty() && self.changing.is_empty() && self.entering.is_empty()
	}
}

/// Computes the routes leaving, changing and entering between two states.
///
/// A route leaves when it is absent from `next` or when one of the parameters
/// its own path declares changed value. A route that leaves because of a
/// parameter change enters again. Routes kept in both branches are reported
/// as changing when the location path, query or hash changed.
pub fn compute_diff(prev: Option<&MatchResult>, next: &MatchResult) -> TransitionDiff {
	let Some(prev) = prev else {
		return TransitionDiff {
			entering: next.branch.clone(),
			..TransitionDiff::default()
		};
	};

	let params_changed = |route: &Route| {
		route
			.param_names()
			.iter()
			.any(|name| prev.params.value(name) != next.params.value(name))
	};

	let leaving: Vec<Route> = prev
		.branch
		.iter()
		.rev()
		.filter(|route| !next.contains(route.id()) || params_changed(route))
		.cloned()
		.collect();

	let is_leaving = |route: &Route| leaving.iter().any(|r| r.id() == route.id());

	let entering = next
		.branch
		.iter()
		.filter(|route| !prev.contains(route.id()) || is_leaving(route))
		.cloned()
		.collect();

	let changing = if prev.location.same_path(&next.location) {
		Vec::new()
	} else {
		next.branch
			.iter()
			.filter(|route| prev.contains(route.id()) && !is_leaving(route))
			.cloned()
			.collect()
	};

	TransitionDiff {
		leaving,
		changing,
		entering,
	}
}

/// An in-flight attempt to move to a location.
#[derive(Debug, Clone)]
pub struct Transition {
	id: u64,
	location: Location,
	redirect: Redirect,
	active: Arc<AtomicU64>,
}

impl Transition {
	/// Returns the transition identifier.
	pub fn id(&self) -> u64 {
		self.id
	}

	/// Returns the target location.
	pub fn location(&self) -> &Location {
		&self.location
	}

	/// Returns the redirect handle passed to hooks.
	pub fn redirect(&self) -> &Redirect {
		&self.redirect
	}

	/// Returns whether a newer transition started.
	pub fn is_superseded(&self) -> bool {
		self.active.load(Ordering::SeqCst) != self.id
	}
}

/// Hands out transitions and tracks which one is active.
#[derive(Debug, Default)]
pub struct TransitionTracker {
	active: Arc<AtomicU64>,
	next: AtomicU64,
}

impl TransitionTracker {
	/// Creates a tracker with no active transition.
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a transition, superseding the active one.
	pub fn begin(&self, location: Location) -> Transition {
		let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
		let previous = self.active.swap(id, Ordering::SeqCst);
		if previous != 0 {
			tracing::debug!(id, previous, "transition supersedes previous one");
		}
		Transition {
			id,
			location,
			redirect: Redirect::new(),
			active: Arc::clone(&self.active),
		}
	}

	/// Returns the identifier of the active transition, zero before the first.
	pub fn active_id(&self) -> u64 {
		self.active.load(Ordering::SeqCst)
	}
}

/// How the hook sequence ended.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
	/// Every hook ran; the transition may commit.
	Proceed,
	/// A hook redirected; the cycle restarts at this location.
	Redirect(Location),
	/// A newer transition started; nothing may be committed.
	Superseded,
}

fn hooks_of(route: &Route, registry: &HookRegistry) -> Vec<RouteHooks> {
	let mut hooks = vec![route.route_hooks().clone()];
	if let Some(registered) = registry.hooks_for(route.id()) {
		hooks.push(registered);
	}
	hooks
}

fn hook_error(kind: HookKind, route: &Route, source: HookError) -> RouterError {
	RouterError::Hook {
		kind,
		route_id: route.id(),
		path: route.pattern().to_string(),
		source,
	}
}

/// Runs the lifecycle hooks of a transition.
///
/// `onLeave` hooks run in `diff.leaving` order, then `onChange` hooks in
/// `diff.changing` order, then `onEnter` hooks in `diff.entering` order.
/// The first hook that requests a redirect stops the sequence.
///
/// # Errors
///
/// The first failing hook aborts the sequence with [`RouterError::Hook`].
pub async fn run_transition_hooks(
	transition: &Transition,
	prev: Option<&MatchResult>,
	next: &MatchResult,
	diff: &TransitionDiff,
	registry: &HookRegistry,
) -> Result<TransitionOutcome, RouterError> {
	if transition.is_superseded() {
		return Ok(TransitionOutcome::Superseded);
	}

	if let Some(prev) = prev {
		for route in &diff.leaving {
			for hooks in hooks_of(route, registry) {
				for hook in hooks.leave_hooks() {
					tracing::debug!(route_id = %route.id(), "running onLeave hook");
					hook(prev).map_err(|e| hook_error(HookKind::Leave, route, e))?;
				}
			}
		}

		for route in &diff.changing {
			for hooks in hooks_of(route, registry) {
				for hook in hooks.change_hooks() {
					tracing::debug!(route_id = %route.id(), "running onChange hook");
					let result = hook.call(prev, next, transition.redirect()).await;
					if let Some(outcome) = settle(transition, result, HookKind::Change, route)? {
						return Ok(outcome);
					}
				}
			}
		}
	}

	for route in &diff.entering {
		for hooks in hooks_of(route, registry) {
			for hook in hooks.enter_hooks() {
				tracing::debug!(route_id = %route.id(), "running onEnter hook");
				let result = hook.call(next, transition.redirect()).await;
				if let Some(outcome) = settle(transition, result, HookKind::Enter, route)? {
					return Ok(outcome);
				}
			}
		}
	}

	Ok(TransitionOutcome::Proceed)
}

/// Decides what happens after a hook completed.
///
/// Returns `Some` when the sequence must stop.
fn settle(
	transition: &Transition,
	result: Result<(), HookError>,
	kind: HookKind,
	route: &Route,
) -> Result<Option<TransitionOutcome>, RouterError> {
	if transition.is_superseded() {
		tracing::debug!(id = transition.id(), %kind, "transition superseded during hook");
		return Ok(Some(TransitionOutcome::Superseded));
	}
	result.map_err(|e| hook_error(kind, route, e))?;
	Ok(transition.redirect().take().map(TransitionOutcome::Redirect))
}
