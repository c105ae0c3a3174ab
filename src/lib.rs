//! # Reinhardt Navigator
//!
//! Client-side routing for Reinhardt frontends.
//!
//! The routing engine lives in [`reinhardt_client_router`]; this crate
//! re-exports it and offers a [`prelude`] for application code.
//!
//! ## Quick Example
//!
//! ```
//! use reinhardt_navigator::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let router = Router::builder()
//! 	.route(
//! 		Route::new("/users")
//! 			.name("users")
//! 			.children(vec![Route::new(":id").name("user_detail")]),
//! 	)
//! 	.route(Route::new("/*").name("not_found"))
//! 	.build()
//! 	.unwrap();
//!
//! let state = router.navigate("/users/42").await.unwrap().unwrap();
//! assert_eq!(state.params.parse::<u32>("id").unwrap(), 42);
//!
//! let params: Params = [("id", "7")].into_iter().collect();
//! assert_eq!(router.href_for("user_detail", &params).unwrap(), "/users/7");
//! # });
//! ```
//!
//! ## Listening to a Location Source
//!
//! [`Router::listen`](prelude::Router::listen) subscribes to the router's
//! [`LocationSource`](prelude::LocationSource) and runs a transition for each
//! change on the current tokio runtime. Navigation is triggered through a
//! [`Navigator`](prelude::Navigator):
//!
//! ```no_run
//! use reinhardt_navigator::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), RouterError> {
//! let history = MemoryHistory::new("/");
//! let router = Router::builder()
//! 	.location_source(Arc::new(history.clone()))
//! 	.route(Route::new("/"))
//! 	.route(Route::new("/about"))
//! 	.build()?;
//!
//! router.start().await?;
//! let _listener = router.listen()?;
//! router.navigator().push("/about");
//! # Ok(())
//! # }
//! ```

pub use reinhardt_client_router::*;

/// Re-export of the routing crate under its own name.
pub use reinhardt_client_router as client_router;

/// Commonly used types.
pub mod prelude {
	pub use crate::{
		Components, ErrorDisposition, HookError, HookRegistry, Location, LocationSource,
		MatchResult, MemoryHistory, NavigationType, Navigator, Params, Redirect, Route,
		RouteHooks, Router, RouterError, RouterSettings,
	};

	// External
	pub use serde::{Deserialize, Serialize};
}
