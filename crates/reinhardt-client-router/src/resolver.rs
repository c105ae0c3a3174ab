//! Component resolution for a matched branch.

use crate::error::ResolutionError;
use crate::route::{Components, Route};
use futures::stream::{FuturesUnordered, StreamExt};

/// Resolves the component payload of every route in `branch`.
///
/// All entries resolve concurrently. The call settles only once every entry
/// has settled, and the results come back in branch order. Routes without a
/// component payload yield `None`.
///
/// # Errors
///
/// Returns the first [`ResolutionError`] in completion order. The other
/// entries still run to completion and their results are dropped.
pub async fn resolve_components(
	branch: &[Route],
) -> Result<Vec<Option<Components>>, ResolutionError> {
	let mut pending: FuturesUnordered<_> = branch
		.iter()
		.enumerate()
		.map(|(index, route)| async move { (index, route.resolve_components().await) })
		.collect();

	let mut resolved: Vec<Option<Components>> = vec![None; branch.len()];
	let mut first_error = None;

	while let Some((index, result)) = pending.next().await {
		match result {
			Ok(components) => resolved[index] = components,
			Err(err) => {
				tracing::debug!(route_id = %err.route_id, error = %err, "component resolution failed");
				if first_error.is_none() {
					first_error = Some(err);
				}
			}
		}
	}

	match first_error {
		Some(err) => Err(err),
		None => Ok(resolved),
	}
}
