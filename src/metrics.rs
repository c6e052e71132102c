//! Metrics helpers and per-component refresh bookkeeping.

// std
#[cfg(feature = "prometheus")] use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use metrics::Label;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use smallvec::SmallVec;
// self
use crate::_prelude::*;

type LabelSet = SmallVec<[Label; 3]>;

const METRIC_VALIDATIONS_TOTAL: &str = "tokeninfo_validations_total";
const METRIC_UPSTREAM_CACHE_LOOKUPS_TOTAL: &str = "tokeninfo_upstream_cache_lookups_total";
const METRIC_REFRESH_TOTAL: &str = "tokeninfo_refresh_total";
const METRIC_REFRESH_DURATION: &str = "tokeninfo_refresh_duration_seconds";
const METRIC_REFRESH_ERRORS: &str = "tokeninfo_refresh_errors_total";

/// Shared Prometheus handle installed by [`install_default_exporter`].
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Thread-safe refresh accumulator for a single background component.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	refresh_successes: AtomicU64,
	refresh_errors: AtomicU64,
	consecutive_errors: AtomicU64,
	last_refresh_micros: AtomicU64,
}
impl RefreshMetrics {
	/// Create a new accumulator.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record a successful refresh and its latency.
	pub fn record_success(&self, duration: Duration) {
		self.refresh_successes.fetch_add(1, Ordering::Relaxed);
		self.consecutive_errors.store(0, Ordering::Relaxed);
		self.last_refresh_micros.store(duration.as_micros() as u64, Ordering::Relaxed);
	}

	/// Record a failed refresh.
	pub fn record_error(&self) {
		self.refresh_errors.fetch_add(1, Ordering::Relaxed);
		self.consecutive_errors.fetch_add(1, Ordering::Relaxed);
	}

	/// Take a point-in-time snapshot for status reporting.
	pub fn snapshot(&self) -> RefreshMetricsSnapshot {
		RefreshMetricsSnapshot {
			refresh_successes: self.refresh_successes.load(Ordering::Relaxed),
			refresh_errors: self.refresh_errors.load(Ordering::Relaxed),
			consecutive_errors: self.consecutive_errors.load(Ordering::Relaxed),
			last_refresh_micros: match self.last_refresh_micros.load(Ordering::Relaxed) {
				0 => None,
				value => Some(value),
			},
		}
	}
}

/// Read-only snapshot of refresh counters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshMetricsSnapshot {
	/// Count of successful refresh operations.
	pub refresh_successes: u64,
	/// Count of refresh attempts that resulted in errors.
	pub refresh_errors: u64,
	/// Failures since the last success.
	pub consecutive_errors: u64,
	/// Microsecond latency of the most recent successful refresh.
	pub last_refresh_micros: Option<u64>,
}

/// Install the default Prometheus recorder backed by `metrics`.
///
/// Multiple invocations are safe; subsequent calls become no-ops once the recorder is installed.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new()
		.install_recorder()
		.map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Access the global Prometheus exporter handle when installed.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Record the outcome of a token validation.
pub fn record_validation(processor: &'static str, outcome: &'static str) {
	let mut labels = LabelSet::new();

	labels.push(Label::new("processor", processor));
	labels.push(Label::new("outcome", outcome));

	metrics::counter!(METRIC_VALIDATIONS_TOTAL, labels.iter()).increment(1);
}

/// Record an upstream cache lookup.
pub fn record_upstream_cache_lookup(hit: bool) {
	let mut labels = LabelSet::new();

	labels.push(Label::new("result", if hit { "hit" } else { "miss" }));

	metrics::counter!(METRIC_UPSTREAM_CACHE_LOOKUPS_TOTAL, labels.iter()).increment(1);
}

/// Record a successful refresh along with its latency.
pub fn record_refresh_success(component: &'static str, duration: Duration) {
	metrics::counter!(METRIC_REFRESH_TOTAL, status_labels(component, "success").iter())
		.increment(1);
	metrics::histogram!(METRIC_REFRESH_DURATION, base_labels(component).iter())
		.record(duration.as_secs_f64());
}

/// Record a failed refresh.
pub fn record_refresh_error(component: &'static str) {
	metrics::counter!(METRIC_REFRESH_TOTAL, status_labels(component, "error").iter()).increment(1);
	metrics::counter!(METRIC_REFRESH_ERRORS, base_labels(component).iter()).increment(1);
}

fn base_labels(component: &'static str) -> LabelSet {
	let mut labels = LabelSet::new();

	labels.push(Label::new("component", component));

	labels
}

fn status_labels(component: &'static str, status: &'static str) -> LabelSet {
	let mut labels = base_labels(component);

	labels.push(Label::new("status", status));

	labels
}
