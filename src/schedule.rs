//! Periodic refresh scheduling for background components.
//!
//! Timers come from `tokio::time`, so tests drive refresh cadence deterministically with a paused
//! runtime clock.

// std
use std::future::Future;
// crates.io
use parking_lot::Mutex;
use tokio::{
	task::JoinHandle,
	time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
// self
use crate::_prelude::*;

// Start used when `now + period` overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A resource that can be refreshed from its provider.
pub trait Refresh: Send + Sync + 'static {
	/// Component label used in logs and metrics.
	fn component(&self) -> &'static str;

	/// Pull the provider document and install a new snapshot on success.
	fn refresh(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Owns the background refresh tasks and their shared cancellation signal.
#[derive(Debug, Default)]
pub struct Scheduler {
	cancel: CancellationToken,
	handles: Mutex<Vec<JoinHandle<()>>>,
}
impl Scheduler {
	/// Create a scheduler with no running tasks.
	pub fn new() -> Self {
		Self::default()
	}

	/// Spawn a task refreshing `target` every `period`.
	///
	/// The first refresh runs one full `period` after spawning; startup loads are the caller's
	/// responsibility. Failures are logged and never stop the loop. A `period` too large for the
	/// clock postpones the first refresh indefinitely.
	///
	/// # Panics
	///
	/// Must be called within a Tokio runtime context, with a non-zero `period`.
	pub fn spawn<R>(&self, target: Arc<R>, period: Duration)
	where
		R: Refresh,
	{
		let token = self.cancel.child_token();
		let component = target.component();
		let now = Instant::now();
		let start = now.checked_add(period).unwrap_or_else(|| now + FAR_FUTURE);
		let mut ticker = time::interval_at(start, period);

		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		let handle = tokio::spawn(async move {
			tracing::info!(component, ?period, "background refresh task started");

			loop {
				tokio::select! {
					_ = token.cancelled() => break,
					_ = ticker.tick() => {
						tokio::select! {
							_ = token.cancelled() => break,
							result = target.refresh() => if let Err(err) = result {
								tracing::warn!(
									component,
									error = %err,
									"background refresh failed; keeping previous snapshot"
								);
							},
						}
					},
				}
			}

			tracing::info!(component, "background refresh task shutting down");
		});

		self.handles.lock().push(handle);
	}

	/// Cancellation token shared by every spawned task.
	///
	/// Callers can use this to integrate with external shutdown signals.
	pub fn cancel_token(&self) -> &CancellationToken {
		&self.cancel
	}

	/// Number of tasks spawned so far.
	pub fn task_count(&self) -> usize {
		self.handles.lock().len()
	}

	/// Cancel every task and wait for them to finish.
	pub async fn shutdown(&self) {
		self.cancel.cancel();

		let handles = std::mem::take(&mut *self.handles.lock());

		for handle in handles {
			if let Err(err) = handle.await {
				tracing::warn!(error = %err, "background refresh task ended abnormally");
			}
		}
	}
}
impl Drop for Scheduler {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}
