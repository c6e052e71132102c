//! Key store refreshed from the OpenID discovery document.

// std
use std::future::Future;
// crates.io
use arc_swap::ArcSwap;
use jsonwebtoken::jwk::JwkSet;
use serde::Deserialize;
use url::Url;
// self
use crate::{
	_prelude::*,
	http::client::JsonFetcher,
	keys::KeySnapshot,
	metrics::{self, RefreshMetrics},
	schedule::Refresh,
	status::{ComponentState, ComponentStatus},
};

/// Subset of the OpenID discovery document the key store relies on.
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfiguration {
	/// Issuer identifier tokens signed by this provider carry.
	pub issuer: String,
	/// Location of the provider's key set.
	pub jwks_uri: Url,
}

/// Holds the latest verification keys and swaps them atomically on refresh.
#[derive(Debug)]
pub struct KeyStore {
	configuration_url: Url,
	fetcher: JsonFetcher,
	snapshot: ArcSwap<KeySnapshot>,
	metrics: Arc<RefreshMetrics>,
}
impl KeyStore {
	/// Component label used in logs, metrics and status reports.
	pub const COMPONENT: &'static str = "key_store";

	/// Create an empty store; call [`KeyStore::refresh`] before verifying tokens.
	pub fn new(configuration_url: Url, fetcher: JsonFetcher) -> Self {
		Self {
			configuration_url,
			fetcher,
			snapshot: ArcSwap::from_pointee(KeySnapshot::empty()),
			metrics: RefreshMetrics::new(),
		}
	}

	/// Latest fully loaded snapshot.
	pub fn keys(&self) -> Arc<KeySnapshot> {
		self.snapshot.load_full()
	}

	/// Current keys rendered as a JWKS document.
	pub fn jwks(&self) -> JwkSet {
		self.snapshot.load().to_jwk_set()
	}

	/// Atomically replace the current snapshot, returning its key count.
	pub fn install(&self, snapshot: KeySnapshot) -> usize {
		let keys = snapshot.len();

		self.snapshot.store(Arc::new(snapshot));

		keys
	}

	/// Fetch the discovery document and key set, installing a new snapshot on success.
	///
	/// On failure the previous snapshot stays in place.
	#[tracing::instrument(skip(self), fields(url = %self.configuration_url))]
	pub async fn refresh(&self) -> Result<()> {
		let start = Instant::now();

		match self.load().await {
			Ok(snapshot) => {
				let elapsed = start.elapsed();
				let keys = self.install(snapshot);

				self.metrics.record_success(elapsed);
				metrics::record_refresh_success(Self::COMPONENT, elapsed);

				tracing::debug!(keys, ?elapsed, "key set refreshed");

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
		let snapshot = self.snapshot.load();
		let state = if snapshot.is_empty() { ComponentState::Empty } else { ComponentState::Ready };

		ComponentStatus::new(
			Self::COMPONENT,
			state,
			snapshot.refreshed_at(),
			snapshot.len(),
			self.metrics.snapshot(),
		)
	}

	async fn load(&self) -> Result<KeySnapshot> {
		let configuration: ProviderConfiguration = self.fetcher.get(&self.configuration_url).await?;
		let set: JwkSet = self.fetcher.get(&configuration.jwks_uri).await?;

		KeySnapshot::from_jwk_set(configuration.issuer, &set)
	}
}
impl Refresh for KeyStore {
	fn component(&self) -> &'static str {
		Self::COMPONENT
	}

	fn refresh(&self) -> impl Future<Output = Result<()>> + Send {
		KeyStore::refresh(self)
	}
}
