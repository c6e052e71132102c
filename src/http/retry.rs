//! Retry budgeting for provider document fetches.

// std
use std::cell::RefCell;
// crates.io
use rand::{Rng, SeedableRng, rngs::SmallRng};
use tokio::time;
// self
use crate::_prelude::*;

thread_local! {
	static SMALL_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_rng(&mut rand::rng()));
}

/// Retry configuration for provider fetches.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
	/// Retries allowed after the first attempt.
	pub max_retries: u32,
	/// Timeout applied to each attempt.
	pub attempt_timeout: Duration,
	/// Delay before the first retry.
	pub initial_backoff: Duration,
	/// Cap on the exponential backoff.
	pub max_backoff: Duration,
	/// Wall-clock bound on the whole fetch, retries included.
	pub deadline: Duration,
	/// Randomize each delay within the upper fifth of its window.
	pub jitter: bool,
}
impl RetryPolicy {
	/// Policy whose attempts are bounded by the configured HTTP client timeout.
	pub fn with_attempt_timeout(attempt_timeout: Duration) -> Self {
		let defaults = Self::default();
		let attempt_timeout =
			if attempt_timeout.is_zero() { defaults.attempt_timeout } else { attempt_timeout };
		let deadline = attempt_timeout
			.saturating_mul(defaults.max_retries + 1)
			.saturating_add(defaults.max_backoff.saturating_mul(defaults.max_retries));

		Self { attempt_timeout, deadline, ..defaults }
	}

	/// Policy performing a single attempt, used where the caller owns the retry cadence.
	pub fn single_attempt(attempt_timeout: Duration) -> Self {
		Self { max_retries: 0, ..Self::with_attempt_timeout(attempt_timeout) }
	}

	/// Reject policies that could never complete an attempt.
	pub fn validate(&self) -> Result<()> {
		let invalid = |field, reason: &str| Err(Error::Validation { field, reason: reason.into() });

		if self.attempt_timeout.is_zero() {
			return invalid("retry_policy.attempt_timeout", "Must be greater than zero.");
		}
		if self.initial_backoff.is_zero() {
			return invalid("retry_policy.initial_backoff", "Must be greater than zero.");
		}
		if self.max_backoff < self.initial_backoff {
			return invalid("retry_policy.max_backoff", "Must not be below initial_backoff.");
		}
		if self.deadline < self.attempt_timeout {
			return invalid("retry_policy.deadline", "Must not be below attempt_timeout.");
		}

		Ok(())
	}

	/// Delay before retry number `retry` (zero-based): doubling, capped, optionally jittered.
	pub fn backoff(&self, retry: u32) -> Duration {
		let doubled = self.initial_backoff.saturating_mul(1 << retry.min(16));
		let capped = doubled.min(self.max_backoff);

		if !self.jitter {
			return capped;
		}

		let floor = capped.mul_f64(0.8).max(self.initial_backoff);

		if capped <= floor {
			return capped;
		}

		let spread = (capped - floor).as_nanos().min(u64::MAX as u128) as u64;
		let offset = SMALL_RNG.with(|rng| rng.borrow_mut().random_range(0..=spread));

		floor + Duration::from_nanos(offset)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 2,
			attempt_timeout: Duration::from_secs(3),
			initial_backoff: Duration::from_millis(250),
			max_backoff: Duration::from_secs(2),
			deadline: Duration::from_secs(8),
			jitter: true,
		}
	}
}

/// Attempt and deadline bookkeeping for one fetch.
#[derive(Debug)]
pub struct RetryBudget<'a> {
	policy: &'a RetryPolicy,
	deadline: Instant,
	retries: u32,
}
impl<'a> RetryBudget<'a> {
	/// Start a budget whose deadline runs from now.
	pub fn new(policy: &'a RetryPolicy) -> Self {
		let now = Instant::now();
		let deadline =
			now.checked_add(policy.deadline).unwrap_or_else(|| now + Duration::from_secs(86_400));

		Self { policy, deadline, retries: 0 }
	}

	/// Timeout for the next attempt, or `None` once the deadline has passed.
	pub fn next_attempt(&self) -> Option<Duration> {
		let timeout = self.remaining().min(self.policy.attempt_timeout);

		(!timeout.is_zero()).then_some(timeout)
	}

	/// Remaining time before the deadline.
	pub fn remaining(&self) -> Duration {
		self.deadline.saturating_duration_since(Instant::now())
	}

	/// Sleep before the next retry; `false` when no retry is left.
	pub async fn wait_for_retry(&mut self) -> bool {
		if self.retries >= self.policy.max_retries {
			tracing::debug!(retries = self.retries, "retry budget exhausted");

			return false;
		}

		let delay = self.policy.backoff(self.retries).min(self.remaining());

		self.retries += 1;

		tracing::debug!(retry = self.retries, ?delay, "retrying after backoff");

		if !delay.is_zero() {
			time::sleep(delay).await;
		}

		true
	}
}
