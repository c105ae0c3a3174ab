//! Cached pattern compilation.
//!
//! Each router owns one [`PatternCompiler`]. The compiler memoizes compiled
//! patterns in a bounded LRU cache keyed by the pattern string and the
//! [`CompileOptions`] it was compiled with, so a cache hit never rebuilds the
//! regex.

use crate::error::PatternError;
use crate::pattern::{CompileOptions, CompiledPattern, MatchMode};
use crate::settings::RouterSettings;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of compiled patterns kept in the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

type CacheKey = (String, CompileOptions);

/// Cache counters of a [`PatternCompiler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
	/// Lookups served from the cache.
	pub hits: u64,
	/// Lookups that compiled a pattern.
	pub misses: u64,
}

/// Compiles route patterns and memoizes the results.
///
/// Cloning a compiler shares its cache.
///
/// # Example
///
/// ```
/// use reinhardt_client_router::{MatchMode, PatternCompiler};
///
/// let compiler = PatternCompiler::new(16);
/// let first = compiler.compile("/users/:id", MatchMode::Prefix).unwrap();
/// let second = compiler.compile("/users/:id", MatchMode::Prefix).unwrap();
///
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// assert_eq!(compiler.stats().hits, 1);
/// ```
#[derive(Clone)]
pub struct PatternCompiler {
	cache: Arc<Mutex<LruCache<CacheKey, Arc<CompiledPattern>>>>,
	case_sensitive: bool,
	strict_trailing_slash: bool,
	hits: Arc<AtomicU64>,
	misses: Arc<AtomicU64>,
}

impl PatternCompiler {
	/// Creates a compiler with the given cache capacity.
	///
	/// A capacity of zero is clamped to one.
	pub fn new(capacity: usize) -> Self {
		let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
		Self {
			cache: Arc::new(Mutex::new(LruCache::new(capacity))),
			case_sensitive: false,
			strict_trailing_slash: false,
			hits: Arc::new(AtomicU64::new(0)),
			misses: Arc::new(AtomicU64::new(0)),
		}
	}

	/// Creates a compiler configured from router settings.
	pub fn from_settings(settings: &RouterSettings) -> Self {
		Self::new(settings.pattern_cache_capacity)
			.with_case_sensitive(settings.case_sensitive)
			.with_strict_trailing_slash(settings.strict_trailing_slash)
	}

	/// Sets whether literal text is matched case-sensitively.
	pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
		self.case_sensitive = case_sensitive;
		self
	}

	/// Sets whether exact patterns reject an undeclared trailing slash.
	pub fn with_strict_trailing_slash(mut self, strict: bool) -> Self {
		self.strict_trailing_slash = strict;
		self
	}

	/// Returns the options used for a given match mode.
	pub fn options(&self, mode: MatchMode) -> CompileOptions {
		CompileOptions {
			mode,
			case_sensitive: self.case_sensitive,
			strict_trailing_slash: self.strict_trailing_slash,
		}
	}

	/// Compiles a pattern, serving repeated requests from the cache.
	///
	/// # Errors
	///
	/// Returns the [`PatternError`] of a malformed pattern. Failures are not
	/// cached.
	pub fn compile(
		&self,
		pattern: &str,
		mode: MatchMode,
	) -> Result<Arc<CompiledPattern>, PatternError> {
		let key = (pattern.to_string(), self.options(mode));

		if let Some(compiled) = self.cache.lock().get(&key) {
			self.hits.fetch_add(1, Ordering::Relaxed);
			tracing::debug!(pattern, ?mode, "pattern cache hit");
			return Ok(Arc::clone(compiled));
		}

		self.misses.fetch_add(1, Ordering::Relaxed);
		tracing::debug!(pattern, ?mode, "pattern cache miss");
		let compiled = Arc::new(CompiledPattern::new(pattern, key.1)?);
		self.cache.lock().put(key, Arc::clone(&compiled));
		Ok(compiled)
	}

	/// Returns the number of cached patterns.
	pub fn cache_len(&self) -> usize {
		self.cache.lock().len()
	}

	/// Returns the cache capacity.
	pub fn capacity(&self) -> usize {
		self.cache.lock().cap().get()
	}

	/// Returns hit and miss counters.
	pub fn stats(&self) -> CacheStats {
		CacheStats {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
		}
	}

	/// Drops every cached pattern and resets the counters.
	pub fn clear(&self) {
		self.cache.lock().clear();
		self.hits.store(0, Ordering::Relaxed);
		self.misses.store(0, Ordering::Relaxed);
	}
}

impl Default for PatternCompiler {
	fn default() -> Self {
		Self::new(DEFAULT_CACHE_CAPACITY)
	}
}

impl std::fmt::Debug for PatternCompiler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PatternCompiler")
			.field("cache_len", &self.cache_len())
			.field("case_sensitive", &self.case_sensitive)
			.field("strict_trailing_slash", &self.strict_trailing_slash)
			.field("stats", &self.stats())
			.finish()
	}
}
