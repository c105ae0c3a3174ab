//! Error types for client-side routing.
//!
//! Every failure a navigation can run into is one of the variants of
//! [`RouterError`]. The narrower error types are kept separate so that each
//! stage (compilation, matching, resolution, hooks) can be handled on its own.
//!
//! A pathname that matches no route is not an error: the walker returns
//! `Ok(None)` and the router commits a not-found state instead.

use crate::hooks::HookKind;
use crate::route::RouteId;
use thiserror::Error;

/// Boxed error returned by user supplied loaders and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error raised while compiling a route path pattern.
///
/// Pattern errors are detected when the pattern is compiled, never while a
/// pathname is being matched against it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
	/// An optional group was opened without being closed, or closed without
	/// being opened.
	#[error("unbalanced optional group in pattern '{pattern}' at byte {position}")]
	UnbalancedGroup {
		/// The offending pattern.
		pattern: String,
		/// Byte offset of the unmatched parenthesis.
		position: usize,
	},

	/// A `:` was not followed by a parameter name.
	#[error("missing parameter name in pattern '{pattern}' at byte {position}")]
	EmptyParamName {
		/// The offending pattern.
		pattern: String,
		/// Byte offset of the `:`.
		position: usize,
	},

	/// The pattern exceeds the maximum allowed length.
	#[error("pattern length {length} exceeds maximum allowed length of {max} bytes")]
	TooLong {
		/// Length of the pattern in bytes.
		length: usize,
		/// Maximum accepted length.
		max: usize,
	},

	/// The pattern has too many path segments.
	#[error("pattern has {count} path segments, exceeding maximum of {max}")]
	TooManySegments {
		/// Number of segments found.
		count: usize,
		/// Maximum accepted segment count.
		max: usize,
	},

	/// The generated expression was rejected by the regex engine.
	#[error("failed to compile pattern regex for '{pattern}': {message}")]
	InvalidRegex {
		/// The offending pattern.
		pattern: String,
		/// Message reported by the regex engine.
		message: String,
	},
}

/// What a lazy route accessor was asked to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTarget {
	/// The route's child routes.
	Children,
	/// The route's index route.
	IndexRoute,
}

impl std::fmt::Display for LoadTarget {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Children => write!(f, "child routes"),
			Self::IndexRoute => write!(f, "index route"),
		}
	}
}

/// Failure while lazily loading part of the route tree during matching.
#[derive(Debug, Error)]
#[error("failed to load {target} of route {route_id} ('{path}'): {source}")]
pub struct MatchError {
	/// Route whose accessor failed.
	pub route_id: RouteId,
	/// Declared path of that route (empty for pathless routes).
	pub path: String,
	/// Which accessor failed.
	pub target: LoadTarget,
	/// The loader's error.
	#[source]
	pub source: BoxError,
}

/// Failure while resolving a route's component payload.
#[derive(Debug, Error)]
#[error("failed to resolve components of route {route_id} ('{path}'): {source}")]
pub struct ResolutionError {
	/// Route whose component accessor failed.
	pub route_id: RouteId,
	/// Declared path of that route (empty for pathless routes).
	pub path: String,
	/// The loader's error.
	#[source]
	pub source: BoxError,
}

/// Error returned by a lifecycle hook.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HookError {
	message: String,
	#[source]
	source: Option<BoxError>,
}

impl HookError {
	/// Creates a hook error with a plain message.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			source: None,
		}
	}

	/// Wraps an arbitrary error raised inside a hook.
	pub fn from_error(error: impl Into<BoxError>) -> Self {
		let source = error.into();
		Self {
			message: source.to_string(),
			source: Some(source),
		}
	}

	/// Returns the error message.
	pub fn message(&self) -> &str {
		&self.message
	}
}

/// Error raised by typed parameter access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
	/// No parameter with this name was captured.
	#[error("missing path parameter '{0}'")]
	Missing(String),

	/// The captured value could not be parsed into the requested type.
	#[error("failed to parse parameter '{name}' value '{raw_value}' as {param_type}: {reason}")]
	Parse {
		/// Parameter name.
		name: String,
		/// Expected type name.
		param_type: &'static str,
		/// Raw string value that failed to parse.
		raw_value: String,
		/// Error message from parsing.
		reason: String,
	},
}

/// Error type for router operations.
#[derive(Debug, Error)]
pub enum RouterError {
	/// A route pattern failed to compile.
	#[error(transparent)]
	Pattern(#[from] PatternError),

	/// A lazy route accessor failed while matching.
	#[error(transparent)]
	Match(#[from] MatchError),

	/// A component accessor failed.
	#[error(transparent)]
	Resolution(#[from] ResolutionError),

	/// A lifecycle hook failed; the transition was aborted.
	#[error("{kind} hook of route {route_id} ('{path}') failed: {source}")]
	Hook {
		/// Which hook failed.
		kind: HookKind,
		/// Route the hook is attached to.
		route_id: RouteId,
		/// Declared path of that route.
		path: String,
		/// The hook's error.
		#[source]
		source: HookError,
	},

	/// Hooks kept redirecting beyond the configured limit.
	#[error("redirect limit of {limit} exceeded while navigating to '{location}'")]
	RedirectLimitExceeded {
		/// Configured limit.
		limit: usize,
		/// The last redirect target.
		location: String,
	},

	/// Invalid route name.
	#[error("Invalid route name: {0}")]
	InvalidRouteName(String),

	/// Missing parameter for reverse URL.
	#[error("Missing parameter: {0}")]
	MissingParameter(String),

	/// Typed parameter access failed.
	#[error(transparent)]
	Param(#[from] ParamError),

	/// `listen` was called outside a tokio runtime.
	#[error("router listener requires a running tokio runtime")]
	NoRuntime,

	/// `listen` was called while a listener is already installed.
	#[error("router is already listening to its location source")]
	AlreadyListening,
}
