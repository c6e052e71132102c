//! Composition root wiring every component from [`Settings`].

// crates.io
use jsonwebtoken::jwk::JwkSet;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	cache::UpstreamCache,
	http::{
		client::{self, JsonFetcher, REVOCATION_MAX_RESPONSE_BYTES},
		retry::RetryPolicy,
	},
	keys::KeyStore,
	processor::{JwtProcessor, Processor, UpstreamProcessor},
	registry::{IssuerMatcher, ProcessorRegistry},
	revocation::RevocationCache,
	schedule::Scheduler,
	security::RevocationHasher,
	settings::Settings,
	status::ComponentStatus,
	tokeninfo::TokenInfo,
};

/// Content type of the JWKS document.
pub const JWKS_CONTENT_TYPE: &str = "application/json";

/// Running gateway: registry, caches and their background refreshers.
#[derive(Debug)]
pub struct Gateway {
	settings: Arc<Settings>,
	registry: ProcessorRegistry,
	key_store: Option<Arc<KeyStore>>,
	revocation_cache: Option<Arc<RevocationCache>>,
	upstream_cache: Option<Arc<UpstreamCache>>,
	scheduler: Scheduler,
}
impl Gateway {
	/// Build every component, load the key set and start the background refreshers.
	///
	/// Fails when the settings are inconsistent or, for local verification, when the initial key
	/// set cannot be loaded. A failed initial revocation load is logged and leaves the revocation
	/// cache failing closed until a background refresh succeeds.
	///
	/// # Panics
	///
	/// Must be called within a Tokio runtime context.
	#[tracing::instrument(skip_all)]
	pub async fn start(settings: Settings) -> Result<Self> {
		settings.validate()?;

		let settings = Arc::new(settings);
		let client = client::build_client(&settings)?;
		let retry_policy = RetryPolicy::with_attempt_timeout(settings.http_client_timeout);
		let mut registry = ProcessorRegistry::new();
		let mut key_store = None;
		let mut revocation_cache = None;
		let mut upstream_cache = None;

		if let (Some(configuration_url), Some(revocation_url)) =
			(&settings.openid_provider_configuration_url, &settings.revocation_provider_url)
		{
			let keys = Arc::new(KeyStore::new(
				configuration_url.clone(),
				JsonFetcher::new(client.clone(), retry_policy.clone())?,
			));

			keys.refresh().await?;

			let issuer = keys.keys().issuer().map(str::to_owned).ok_or_else(|| Error::Config {
				field: "openid_provider_configuration_url",
				reason: "Discovery document carries no issuer.".into(),
			})?;
			let revocations = Arc::new(RevocationCache::new(
				revocation_url.clone(),
				JsonFetcher::new(client.clone(), retry_policy.clone())?
					.with_max_response_bytes(REVOCATION_MAX_RESPONSE_BYTES),
				RevocationHasher::new(&settings.hashing_salt)?,
				settings.revocation_max_age(),
			));

			if let Err(err) = revocations.refresh().await {
				tracing::warn!(
					error = %err,
					"initial revocation refresh failed; failing closed until a refresh succeeds"
				);
			}

			registry.register(
				IssuerMatcher::Exact(issuer),
				Arc::new(Processor::Jwt(JwtProcessor::new(keys.clone(), revocations.clone()))),
			)?;

			key_store = Some(keys);
			revocation_cache = Some(revocations);
		}
		if let Some(url) = &settings.upstream_tokeninfo_url {
			let cache = Arc::new(UpstreamCache::new(
				settings.upstream_cache_max_size,
				settings.upstream_cache_ttl,
			));
			let processor = Arc::new(Processor::Upstream(UpstreamProcessor::new(
				client.clone(),
				url.clone(),
				settings.upstream_timeout,
				cache.clone(),
			)));

			if settings.upstream_issuers.is_empty() {
				registry.register(IssuerMatcher::Any, processor)?;
			} else {
				for issuer in &settings.upstream_issuers {
					registry.register(IssuerMatcher::Exact(issuer.clone()), processor.clone())?;
				}
			}

			upstream_cache = Some(cache);
		}

		let scheduler = Scheduler::new();

		if let Some(keys) = &key_store {
			scheduler.spawn(keys.clone(), settings.openid_provider_refresh_interval);
		}
		if let Some(revocations) = &revocation_cache {
			scheduler.spawn(revocations.clone(), settings.revocation_provider_refresh_interval);
		}

		tracing::info!(
			processors = registry.len(),
			local = key_store.is_some(),
			upstream = upstream_cache.is_some(),
			"gateway started"
		);

		Ok(Self { settings, registry, key_store, revocation_cache, upstream_cache, scheduler })
	}

	/// Validate a raw bearer token.
	pub async fn validate(&self, raw: &str) -> Result<TokenInfo> {
		self.registry.validate(raw).await
	}

	/// Current signing keys; empty for upstream-only deployments.
	pub fn jwks(&self) -> JwkSet {
		self.key_store.as_ref().map_or_else(|| JwkSet { keys: Vec::new() }, |keys| keys.jwks())
	}

	/// Current signing keys encoded as a JWKS document.
	///
	/// Encoding failures are logged and yield an empty key list.
	pub fn jwks_json(&self) -> Vec<u8> {
		serde_json::to_vec(&self.jwks()).unwrap_or_else(|err| {
			tracing::error!(error = %err, "failed to encode JWKS document");

			br#"{"keys":[]}"#.to_vec()
		})
	}

	/// Status of every refreshable component.
	pub fn statuses(&self) -> Vec<ComponentStatus> {
		let mut statuses = Vec::with_capacity(2);

		if let Some(keys) = &self.key_store {
			statuses.push(keys.status());
		}
		if let Some(revocations) = &self.revocation_cache {
			statuses.push(revocations.status());
		}

		statuses
	}

	/// Settings the gateway was started with.
	pub fn settings(&self) -> &Arc<Settings> {
		&self.settings
	}

	/// Issuer registry.
	pub fn registry(&self) -> &ProcessorRegistry {
		&self.registry
	}

	/// Key store, when local verification is enabled.
	pub fn key_store(&self) -> Option<&Arc<KeyStore>> {
		self.key_store.as_ref()
	}

	/// Revocation cache, when local verification is enabled.
	pub fn revocation_cache(&self) -> Option<&Arc<RevocationCache>> {
		self.revocation_cache.as_ref()
	}

	/// Upstream result cache, when an upstream endpoint is configured.
	pub fn upstream_cache(&self) -> Option<&Arc<UpstreamCache>> {
		self.upstream_cache.as_ref()
	}

	/// Cancellation token stopping the background refreshers.
	pub fn cancel_token(&self) -> &CancellationToken {
		self.scheduler.cancel_token()
	}

	/// Stop the background refreshers and wait for them to exit.
	pub async fn shutdown(&self) {
		self.scheduler.shutdown().await;
	}
}
