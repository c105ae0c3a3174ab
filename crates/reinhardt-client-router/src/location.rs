//! Locations and the location source contract.
//!
//! The router never talks to a browser history directly. It reads and writes
//! locations through a [`LocationSource`], and hands a [`Navigator`] to any
//! code that needs to trigger navigation. [`MemoryHistory`] is an in-memory
//! source for tests and non-browser hosts.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// How a location was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationType {
	/// A new history entry was pushed.
	#[default]
	Push,
	/// The current history entry was replaced.
	Replace,
	/// The user moved through history (back/forward/go).
	Pop,
}

/// A position in the application's history.
///
/// # Example
///
/// ```
/// use reinhardt_client_router::Location;
///
/// let location = Location::new("/search?q=rust#top");
/// assert_eq!(location.pathname, "/search");
/// assert_eq!(location.search, "?q=rust");
/// assert_eq!(location.hash, "#top");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
	/// Path part, always starting with `/`.
	pub pathname: String,
	/// Query string including the leading `?`, or empty.
	pub search: String,
	/// Fragment including the leading `#`, or empty.
	pub hash: String,
	/// Unique key of the history entry.
	pub key: String,
	/// Arbitrary state attached to the entry.
	pub state: Option<serde_json::Value>,
	/// How the entry was reached.
	pub action: NavigationType,
}

impl Location {
	/// Parses a path such as `/a/b?x=1#frag` into a location with a fresh key.
	pub fn new(path: &str) -> Self {
		let (rest, hash) = match path.find('#') {
			Some(i) => (&path[..i], &path[i..]),
			None => (path, ""),
		};
		let (pathname, search) = match rest.find('?') {
			Some(i) => (&rest[..i], &rest[i..]),
			None => (rest, ""),
		};

		let pathname = if pathname.starts_with('/') {
			pathname.to_string()
		} else {
			format!("/{}", pathname)
		};

		Self {
			pathname,
			search: if search == "?" { String::new() } else { search.to_string() },
			hash: if hash == "#" { String::new() } else { hash.to_string() },
			key: new_key(),
			state: None,
			action: NavigationType::Push,
		}
	}

	/// Attaches entry state.
	pub fn with_state(mut self, state: serde_json::Value) -> Self {
		self.state = Some(state);
		self
	}

	/// Sets the navigation type.
	pub fn with_action(mut self, action: NavigationType) -> Self {
		self.action = action;
		self
	}

	/// Sets the entry key.
	pub fn with_key(mut self, key: impl Into<String>) -> Self {
		self.key = key.into();
		self
	}

	/// Replaces the query string with a serialized value.
	///
	/// # Errors
	///
	/// Returns the serializer error when `query` is not a flat map or sequence
	/// of pairs.
	pub fn with_query<T: Serialize>(
		mut self,
		query: &T,
	) -> Result<Self, serde_urlencoded::ser::Error> {
		let encoded = serde_urlencoded::to_string(query)?;
		self.search = if encoded.is_empty() {
			String::new()
		} else {
			format!("?{}", encoded)
		};
		Ok(self)
	}

	/// Returns pathname, search and hash joined back together.
	pub fn path(&self) -> String {
		format!("{}{}{}", self.pathname, self.search, self.hash)
	}

	/// Returns whether both locations point at the same path, query and hash.
	///
	/// Keys, state and navigation type are ignored.
	pub fn same_path(&self, other: &Location) -> bool {
		self.pathname == other.pathname && self.search == other.search && self.hash == other.hash
	}

	/// Deserializes the query string.
	///
	/// # Errors
	///
	/// Returns the deserializer error when the query does not fit `T`.
	pub fn query<T: DeserializeOwned>(&self) -> Result<T, serde_urlencoded::de::Error> {
		serde_urlencoded::from_str(self.search.trim_start_matches('?'))
	}

	/// Returns the decoded query pairs in order.
	pub fn query_pairs(&self) -> Vec<(String, String)> {
		self.query().unwrap_or_default()
	}
}

impl Default for Location {
	fn default() -> Self {
		Self::new("/")
	}
}

impl From<&str> for Location {
	fn from(path: &str) -> Self {
		Self::new(path)
	}
}

impl From<String> for Location {
	fn from(path: String) -> Self {
		Self::new(&path)
	}
}

impl From<&String> for Location {
	fn from(path: &String) -> Self {
		Self::new(path)
	}
}

impl std::fmt::Display for Location {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}{}{}", self.pathname, self.search, self.hash)
	}
}

fn new_key() -> String {
	let mut key = Uuid::new_v4().simple().to_string();
	key.truncate(8);
	key
}

/// Callback invoked with every location a source moves to.
pub type LocationListener = Arc<dyn Fn(&Location) + Send + Sync>;

/// Handle returned by `subscribe` calls; calling it removes the listener.
pub struct Unsubscribe {
	inner: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Unsubscribe {
	/// Wraps a removal callback.
	pub fn new<F>(f: F) -> Self
	where
		F: FnOnce() + Send + Sync + 'static,
	{
		Self {
			inner: Some(Box::new(f)),
		}
	}

	/// A handle that does nothing.
	pub fn noop() -> Self {
		Self { inner: None }
	}

	/// Removes the listener.
	pub fn unsubscribe(mut self) {
		if let Some(f) = self.inner.take() {
			f();
		}
	}
}

impl std::fmt::Debug for Unsubscribe {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Unsubscribe")
			.field("active", &self.inner.is_some())
			.finish()
	}
}

/// Where locations come from and go to.
///
/// Implementations notify subscribers after every `push`, `replace` and
/// effective `go`.
pub trait LocationSource: Send + Sync {
	/// Returns the current location.
	fn location(&self) -> Location;

	/// Registers a change listener.
	fn subscribe(&self, listener: LocationListener) -> Unsubscribe;

	/// Adds a history entry.
	fn push(&self, location: Location);

	/// Replaces the current history entry.
	fn replace(&self, location: Location);

	/// Moves `delta` entries through history.
	fn go(&self, delta: isize);
}

struct MemoryHistoryInner {
	entries: RwLock<Vec<Location>>,
	index: RwLock<usize>,
	listeners: RwLock<Vec<(u64, LocationListener)>>,
	next_listener_id: AtomicU64,
}

/// In-memory [`LocationSource`].
///
/// Keeps an entry stack with a cursor, the way a browser history does.
/// Clones share the same history.
#[derive(Clone)]
pub struct MemoryHistory {
	inner: Arc<MemoryHistoryInner>,
}

impl MemoryHistory {
	/// Creates a history with a single entry.
	pub fn new(initial: impl Into<Location>) -> Self {
		Self {
			inner: Arc::new(MemoryHistoryInner {
				entries: RwLock::new(vec![initial.into().with_action(NavigationType::Pop)]),
				index: RwLock::new(0),
				listeners: RwLock::new(Vec::new()),
				next_listener_id: AtomicU64::new(0),
			}),
		}
	}

	/// Returns every entry, oldest first.
	pub fn entries(&self) -> Vec<Location> {
		self.inner.entries.read().clone()
	}

	/// Returns the cursor position.
	pub fn index(&self) -> usize {
		*self.inner.index.read()
	}

	/// Returns the number of entries.
	pub fn len(&self) -> usize {
		self.inner.entries.read().len()
	}

	/// Always false: a history holds at least one entry.
	pub fn is_empty(&self) -> bool {
		self.inner.entries.read().is_empty()
	}

	/// Returns the number of registered listeners.
	pub fn listener_count(&self) -> usize {
		self.inner.listeners.read().len()
	}

	fn notify(&self, location: &Location) {
		// Listeners may navigate again, so call them without holding the lock.
		let listeners: Vec<LocationListener> = self
			.inner
			.listeners
			.read()
			.iter()
			.map(|(_, l)| Arc::clone(l))
			.collect();
		for listener in listeners {
			listener(location);
		}
	}
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new("/")
	}
}

impl std::fmt::Debug for MemoryHistory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryHistory")
			.field("entries", &self.len())
			.field("index", &self.index())
			.field("listeners", &self.listener_count())
			.finish()
	}
}

impl LocationSource for MemoryHistory {
	fn location(&self) -> Location {
		let index = self.index();
		self.inner
			.entries
			.read()
			.get(index)
			.cloned()
			.unwrap_or_default()
	}

	fn subscribe(&self, listener: LocationListener) -> Unsubscribe {
		let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
		self.inner.listeners.write().push((id, listener));

		let inner = Arc::downgrade(&self.inner);
		Unsubscribe::new(move || {
			if let Some(inner) = inner.upgrade() {
				inner.listeners.write().retain(|(lid, _)| *lid != id);
			}
		})
	}

	fn push(&self, location: Location) {
		let location = location.with_action(NavigationType::Push);
		{
			let mut entries = self.inner.entries.write();
			let mut index = self.inner.index.write();
			entries.truncate(*index + 1);
			entries.push(location.clone());
			*index = entries.len() - 1;
		}
		tracing::debug!(path = %location, "memory history push");
		self.notify(&location);
	}

	fn replace(&self, location: Location) {
		let location = location.with_action(NavigationType::Replace);
		{
			let mut entries = self.inner.entries.write();
			let index = *self.inner.index.read();
			if let Some(entry) = entries.get_mut(index) {
				*entry = location.clone();
			}
		}
		tracing::debug!(path = %location, "memory history replace");
		self.notify(&location);
	}

	fn go(&self, delta: isize) {
		let location = {
			let entries = self.inner.entries.read();
			let mut index = self.inner.index.write();
			let Some(target) = index.checked_add_signed(delta).filter(|t| *t < entries.len())
			else {
				tracing::debug!(delta, "memory history go out of range, ignored");
				return;
			};
			if target == *index {
				return;
			}
			*index = target;
			entries[target].clone().with_action(NavigationType::Pop)
		};
		tracing::debug!(delta, path = %location, "memory history go");
		self.notify(&location);
	}
}

/// Navigation capability handed to code that needs to change location.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct Navigator {
	source: Arc<dyn LocationSource>,
	basename: String,
}

impl Navigator {
	/// Creates a navigator over a location source.
	pub fn new(source: Arc<dyn LocationSource>) -> Self {
		Self {
			source,
			basename: String::new(),
		}
	}

	/// Sets the prefix used by [`create_href`](Self::create_href).
	pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
		self.basename = basename.into().trim_end_matches('/').to_string();
		self
	}

	/// Returns the current location.
	pub fn location(&self) -> Location {
		self.source.location()
	}

	/// Pushes a new location.
	pub fn push(&self, location: impl Into<Location>) {
		self.source.push(location.into());
	}

	/// Replaces the current location.
	pub fn replace(&self, location: impl Into<Location>) {
		self.source.replace(location.into());
	}

	/// Moves through history.
	pub fn go(&self, delta: isize) {
		self.source.go(delta);
	}

	/// Moves one entry back.
	pub fn go_back(&self) {
		self.go(-1);
	}

	/// Moves one entry forward.
	pub fn go_forward(&self) {
		self.go(1);
	}

	/// Builds an href for a location, prefixed with the basename.
	pub fn create_href(&self, location: impl Into<Location>) -> String {
		format!("{}{}", self.basename, location.into().path())
	}
}

impl std::fmt::Debug for Navigator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Navigator")
			.field("basename", &self.basename)
			.finish()
	}
}
