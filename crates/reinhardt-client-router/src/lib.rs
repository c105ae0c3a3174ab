//! Client-side route matching and transitions.
//!
//! This crate maps locations onto a tree of [`Route`]s and drives the
//! transitions between matched states:
//!
//! - [`pattern`] and [`compiler`] turn route paths such as `/users/:id(/edit)`
//!   into cached regular expressions.
//! - [`matcher`] matches one compiled pattern against a pathname.
//! - [`walker`] walks the route tree and produces a [`MatchResult`].
//! - [`resolver`] loads the component payloads of a matched branch.
//! - [`transition`] diffs two states and runs `onLeave`, `onChange` and
//!   `onEnter` hooks, honoring redirects and supersession.
//! - [`router`] ties everything together behind [`Router`].
//!
//! The router reads and writes locations through a [`LocationSource`]; rendering
//! and browser history backends live outside this crate.
//!
//! ## Example
//!
//! ```
//! use reinhardt_client_router::{Route, Router};
//!
//! # tokio_test::block_on(async {
//! let router = Router::builder()
//! 	.route(
//! 		Route::new("/old").on_enter(|_, redirect| {
//! 			redirect.to("/new");
//! 			Ok(())
//! 		}),
//! 	)
//! 	.route(Route::new("/new"))
//! 	.build()
//! 	.unwrap();
//!
//! let state = router.navigate("/old").await.unwrap().unwrap();
//! assert_eq!(state.location.pathname, "/new");
//! # });
//! ```

pub mod compiler;
pub mod error;
pub mod hooks;
pub mod location;
pub mod matcher;
pub mod params;
pub mod pattern;
pub mod resolver;
pub mod route;
pub mod router;
pub mod settings;
pub mod transition;
pub mod walker;

pub use compiler::{CacheStats, PatternCompiler};
pub use error::{
	BoxError, HookError, LoadTarget, MatchError, ParamError, PatternError, ResolutionError,
	RouterError,
};
pub use hooks::{ChangeHook, EnterHook, HookKind, HookRegistry, LeaveHook, Redirect, RouteHooks};
pub use location::{
	Location, LocationListener, LocationSource, MemoryHistory, NavigationType, Navigator,
	Unsubscribe,
};
pub use matcher::{PathMatch, match_pattern};
pub use params::{ParamValue, Params};
pub use pattern::{CompileOptions, CompiledPattern, MatchMode, PatternToken};
pub use resolver::resolve_components;
pub use route::{Component, ComponentSpec, Components, Route, RouteId};
pub use router::{ErrorDisposition, ErrorHandler, Router, RouterBuilder, StateListener, TransitionPhase};
pub use settings::RouterSettings;
pub use transition::{
	Transition, TransitionDiff, TransitionOutcome, TransitionTracker, compute_diff,
	run_transition_hooks,
};
pub use walker::{MatchResult, match_routes};
