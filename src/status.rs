//! Status projection for the refreshable components.

// crates.io
use serde::Serialize;
// self
use crate::{_prelude::*, metrics::RefreshMetricsSnapshot};

/// Lifecycle state reported for a refreshable component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
	/// No snapshot has been installed yet.
	Empty,
	/// A snapshot is installed and within its freshness window.
	Ready,
	/// A snapshot is installed but too old to be trusted.
	Stale,
}

/// Point-in-time status of a refreshable component.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComponentStatus {
	/// Component label (`key_store`, `revocation_cache`).
	pub component: &'static str,
	/// Lifecycle state.
	pub state: ComponentState,
	/// Wall-clock time of the most recent successful refresh.
	pub last_refresh: Option<DateTime<Utc>>,
	/// Number of entries held by the current snapshot.
	pub entries: usize,
	/// Count of successful refresh operations.
	pub refresh_successes: u64,
	/// Count of failed refresh operations.
	pub refresh_errors: u64,
	/// Failures since the last success.
	pub consecutive_errors: u64,
	/// Latency of the most recent successful refresh, in microseconds.
	pub last_refresh_micros: Option<u64>,
}
impl ComponentStatus {
	pub(crate) fn new(
		component: &'static str,
		state: ComponentState,
		last_refresh: Option<DateTime<Utc>>,
		entries: usize,
		metrics: RefreshMetricsSnapshot,
	) -> Self {
		Self {
			component,
			state,
			last_refresh,
			entries,
			refresh_successes: metrics.refresh_successes,
			refresh_errors: metrics.refresh_errors,
			consecutive_errors: metrics.consecutive_errors,
			last_refresh_micros: metrics.last_refresh_micros,
		}
	}
}
