//! Revocation cache with a fail-closed staleness guard.

// std
use std::future::Future;
// crates.io
use arc_swap::ArcSwapOption;
use serde_json::{Map, Value};
use url::Url;
// self
use crate::{
	_prelude::*,
	http::client::JsonFetcher,
	metrics::{self, RefreshMetrics},
	revocation::{RevocationKind, RevocationList, RevocationSnapshot},
	schedule::Refresh,
	security::RevocationHasher,
	status::{ComponentState, ComponentStatus},
};

/// Periodically refreshed revocation snapshot answering salted membership queries.
///
/// Queries never answer "not revoked" from a snapshot older than `max_age`, nor before the first
/// snapshot is installed; both cases surface [`Error::RevocationStale`].
#[derive(Debug)]
pub struct RevocationCache {
	url: Url,
	fetcher: JsonFetcher,
	hasher: RevocationHasher,
	max_age: Duration,
	snapshot: ArcSwapOption<RevocationSnapshot>,
	metrics: Arc<RefreshMetrics>,
}
impl RevocationCache {
	/// Component label used in logs, metrics and status reports.
	pub const COMPONENT: &'static str = "revocation_cache";

	/// Create an empty cache; queries fail closed until the first refresh succeeds.
	pub fn new(url: Url, fetcher: JsonFetcher, hasher: RevocationHasher, max_age: Duration) -> Self {
		Self {
			url,
			fetcher,
			hasher,
			max_age,
			snapshot: ArcSwapOption::empty(),
			metrics: RefreshMetrics::new(),
		}
	}

	/// Current snapshot, provided it is still trustworthy.
	pub fn snapshot(&self) -> Result<Arc<RevocationSnapshot>> {
		let snapshot = self.snapshot.load_full().ok_or(Error::RevocationStale { age: None })?;
		let age = snapshot.age();

		if age > self.max_age {
			return Err(Error::RevocationStale { age: Some(age) });
		}

		Ok(snapshot)
	}

	/// Whether `identifier` is revoked under `kind`.
	///
	/// For [`RevocationKind::Global`] the identifier is the token's `iat` in epoch seconds.
	pub fn is_revoked(&self, identifier: &str, kind: &RevocationKind) -> Result<bool> {
		let snapshot = self.snapshot()?;

		Ok(match kind {
			RevocationKind::Global => snapshot.issued_before().is_some_and(|cut_off| {
				identifier.parse::<i64>().ok().is_none_or(|iat| iat < cut_off)
			}),
			kind => snapshot.contains(kind, &self.hasher.digest(identifier)),
		})
	}

	/// Evaluate every revocation kind for a verified token against one snapshot.
	///
	/// Returns the first matching kind. A token without a numeric `iat` is treated as revoked
	/// whenever a global cut-off is in force.
	pub fn check_token(
		&self,
		raw: &str,
		claims: &Map<String, Value>,
	) -> Result<Option<RevocationKind>> {
		let snapshot = self.snapshot()?;

		if snapshot.contains(&RevocationKind::Token, &self.hasher.digest(raw)) {
			return Ok(Some(RevocationKind::Token));
		}

		for name in snapshot.claim_names() {
			let value = match claims.get(name) {
				Some(Value::String(value)) => value.clone(),
				Some(Value::Number(value)) => value.to_string(),
				_ => continue,
			};
			let kind = RevocationKind::Claim(name.to_owned());

			if snapshot.contains(&kind, &self.hasher.digest(&value)) {
				return Ok(Some(kind));
			}
		}

		if let Some(cut_off) = snapshot.issued_before() {
			let issued_at = claims.get("iat").and_then(Value::as_i64);

			if issued_at.is_none_or(|iat| iat < cut_off) {
				return Ok(Some(RevocationKind::Global));
			}
		}

		Ok(None)
	}

	/// Digest and atomically install `list`, returning the number of revoked digests.
	pub fn install(&self, list: RevocationList) -> usize {
		let snapshot = RevocationSnapshot::build(list, &self.hasher);
		let entries = snapshot.len();

		self.snapshot.store(Some(Arc::new(snapshot)));

		entries
	}

	/// Fetch the revocation list and install it; on failure the previous snapshot stays.
	#[tracing::instrument(skip(self), fields(url = %self.url))]
	pub async fn refresh(&self) -> Result<()> {
		let start = Instant::now();

		match self.fetcher.get::<RevocationList>(&self.url).await {
			Ok(list) => {
				let entries = self.install(list);
				let elapsed = start.elapsed();

				self.metrics.record_success(elapsed);
				metrics::record_refresh_success(Self::COMPONENT, elapsed);

				tracing::debug!(entries, ?elapsed, "revocation list refreshed");

				Ok(())
			},
			Err(err) => {
				self.metrics.record_error();
				metrics::record_refresh_error(Self::COMPONENT);

				Err(err)
			},
		}
	}

	/// Access the refresh accumulator.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		self.metrics.clone()
	}

	/// Status projection for operators.
	pub fn status(&self) -> ComponentStatus {
		let metrics = self.metrics.snapshot();

		match self.snapshot.load_full() {
			None => ComponentStatus::new(Self::COMPONENT, ComponentState::Empty, None, 0, metrics),
			Some(snapshot) => {
				let state = if snapshot.age() > self.max_age {
					ComponentState::Stale
				} else {
					ComponentState::Ready
				};

				ComponentStatus::new(
					Self::COMPONENT,
					state,
					Some(snapshot.refreshed_at()),
					snapshot.len(),
					metrics,
				)
			},
		}
	}
}
impl Refresh for RevocationCache {
	fn component(&self) -> &'static str {
		Self::COMPONENT
	}

	fn refresh(&self) -> impl Future<Output = Result<()>> + Send {
		RevocationCache::refresh(self)
	}
}
