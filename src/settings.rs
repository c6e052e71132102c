//! Process-wide settings resolved once at startup.
//!
//! Every component receives the frozen [`Settings`] through its constructor; nothing reads the
//! environment after [`Settings::from_env`] returns.

// crates.io
use serde::Serialize;
use url::Url;
// self
use crate::_prelude::*;

/// Default upper bound for upstream cache entries.
pub const DEFAULT_UPSTREAM_CACHE_MAX_SIZE: usize = 10_000;
/// Default upstream cache freshness window.
pub const DEFAULT_UPSTREAM_CACHE_TTL: Duration = Duration::from_secs(60);
/// Default per-call upstream introspection timeout.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(2);
/// Default overall HTTP client timeout.
pub const DEFAULT_HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default connect/TLS handshake timeout.
pub const DEFAULT_HTTP_CLIENT_TLS_TIMEOUT: Duration = Duration::from_secs(10);
/// Default key store refresh interval.
pub const DEFAULT_OPENID_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
/// Default listen address for the token endpoints.
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9021";
/// Default listen address for the metrics endpoint.
pub const DEFAULT_METRICS_LISTEN_ADDRESS: &str = ":9020";
/// Default nominal freshness of a revocation snapshot.
pub const DEFAULT_REVOCATION_CACHE_TTL: Duration = Duration::from_secs(30);
/// Default revocation refresh interval.
pub const DEFAULT_REVOCATION_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
/// Default grace period past the revocation TTL.
pub const DEFAULT_REVOCATION_REFRESH_TOLERANCE: Duration = Duration::from_secs(60);

const UPSTREAM_TOKENINFO_URL: &str = "UPSTREAM_TOKENINFO_URL";
const OPENID_PROVIDER_CONFIGURATION_URL: &str = "OPENID_PROVIDER_CONFIGURATION_URL";
const REVOCATION_PROVIDER_URL: &str = "REVOCATION_PROVIDER_URL";
const UPSTREAM_ISSUERS: &str = "UPSTREAM_ISSUERS";
const UPSTREAM_CACHE_MAX_SIZE: &str = "UPSTREAM_CACHE_MAX_SIZE";
const UPSTREAM_CACHE_TTL: &str = "UPSTREAM_CACHE_TTL";
const UPSTREAM_TIMEOUT: &str = "UPSTREAM_TIMEOUT";
const HTTP_CLIENT_TIMEOUT: &str = "HTTP_CLIENT_TIMEOUT";
const HTTP_CLIENT_TLS_TIMEOUT: &str = "HTTP_CLIENT_TLS_TIMEOUT";
const OPENID_PROVIDER_REFRESH_INTERVAL: &str = "OPENID_PROVIDER_REFRESH_INTERVAL";
const LISTEN_ADDRESS: &str = "LISTEN_ADDRESS";
const METRICS_LISTEN_ADDRESS: &str = "METRICS_LISTEN_ADDRESS";
const REVOCATION_CACHE_TTL: &str = "REVOCATION_CACHE_TTL";
const REVOCATION_PROVIDER_REFRESH_INTERVAL: &str = "REVOCATION_PROVIDER_REFRESH_INTERVAL";
const REVOCATION_HASHING_SALT: &str = "REVOCATION_HASHING_SALT";
const REVOCATION_REFRESH_TOLERANCE: &str = "REVOCATION_REFRESH_TOLERANCE";

/// Immutable gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Settings {
	/// Remote introspection endpoint for upstream-delegated tokens.
	pub upstream_tokeninfo_url: Option<Url>,
	/// OpenID discovery document advertising the issuer and `jwks_uri`.
	pub openid_provider_configuration_url: Option<Url>,
	/// Endpoint publishing the revocation list.
	pub revocation_provider_url: Option<Url>,
	/// Issuers delegated upstream; empty delegates every issuer without a local processor.
	pub upstream_issuers: Vec<String>,
	/// Maximum resident upstream cache entries; zero disables the cache.
	pub upstream_cache_max_size: usize,
	/// Freshness window for upstream cache entries.
	pub upstream_cache_ttl: Duration,
	/// Per-call upstream introspection timeout; zero leaves only the client timeout.
	pub upstream_timeout: Duration,
	/// Overall timeout applied to every outbound HTTP call.
	pub http_client_timeout: Duration,
	/// Connect and TLS handshake timeout.
	pub http_client_tls_timeout: Duration,
	/// Key store refresh interval.
	pub openid_provider_refresh_interval: Duration,
	/// Address the host binary serves token endpoints on.
	pub listen_address: String,
	/// Address the host binary serves metrics on.
	pub metrics_listen_address: String,
	/// Nominal freshness of a revocation snapshot.
	pub revocation_cache_ttl: Duration,
	/// Revocation cache refresh interval.
	pub revocation_provider_refresh_interval: Duration,
	/// Deployment secret keying the revocation digests.
	#[serde(skip)]
	pub hashing_salt: String,
	/// Grace period past `revocation_cache_ttl` before the cache fails closed.
	pub revocation_refresh_tolerance: Duration,
}
impl Settings {
	/// Load settings from the process environment.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Load settings through an arbitrary key/value lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let value = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
		let settings = Self {
			upstream_tokeninfo_url: get_url(UPSTREAM_TOKENINFO_URL, value(UPSTREAM_TOKENINFO_URL))?,
			openid_provider_configuration_url: get_url(
				OPENID_PROVIDER_CONFIGURATION_URL,
				value(OPENID_PROVIDER_CONFIGURATION_URL),
			)?,
			revocation_provider_url: get_url(
				REVOCATION_PROVIDER_URL,
				value(REVOCATION_PROVIDER_URL),
			)?,
			upstream_issuers: value(UPSTREAM_ISSUERS)
				.map(|raw| {
					raw.split(',')
						.map(str::trim)
						.filter(|issuer| !issuer.is_empty())
						.map(str::to_owned)
						.collect()
				})
				.unwrap_or_default(),
			upstream_cache_max_size: get_int(
				UPSTREAM_CACHE_MAX_SIZE,
				value(UPSTREAM_CACHE_MAX_SIZE),
				DEFAULT_UPSTREAM_CACHE_MAX_SIZE,
			),
			upstream_cache_ttl: get_duration(
				UPSTREAM_CACHE_TTL,
				value(UPSTREAM_CACHE_TTL),
				DEFAULT_UPSTREAM_CACHE_TTL,
			),
			upstream_timeout: get_duration(
				UPSTREAM_TIMEOUT,
				value(UPSTREAM_TIMEOUT),
				DEFAULT_UPSTREAM_TIMEOUT,
			),
			http_client_timeout: get_duration(
				HTTP_CLIENT_TIMEOUT,
				value(HTTP_CLIENT_TIMEOUT),
				DEFAULT_HTTP_CLIENT_TIMEOUT,
			),
			http_client_tls_timeout: get_duration(
				HTTP_CLIENT_TLS_TIMEOUT,
				value(HTTP_CLIENT_TLS_TIMEOUT),
				DEFAULT_HTTP_CLIENT_TLS_TIMEOUT,
			),
			openid_provider_refresh_interval: get_duration(
				OPENID_PROVIDER_REFRESH_INTERVAL,
				value(OPENID_PROVIDER_REFRESH_INTERVAL),
				DEFAULT_OPENID_REFRESH_INTERVAL,
			),
			listen_address: value(LISTEN_ADDRESS)
				.unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_owned()),
			metrics_listen_address: value(METRICS_LISTEN_ADDRESS)
				.unwrap_or_else(|| DEFAULT_METRICS_LISTEN_ADDRESS.to_owned()),
			revocation_cache_ttl: get_duration(
				REVOCATION_CACHE_TTL,
				value(REVOCATION_CACHE_TTL),
				DEFAULT_REVOCATION_CACHE_TTL,
			),
			revocation_provider_refresh_interval: get_duration(
				REVOCATION_PROVIDER_REFRESH_INTERVAL,
				value(REVOCATION_PROVIDER_REFRESH_INTERVAL),
				DEFAULT_REVOCATION_REFRESH_INTERVAL,
			),
			hashing_salt: value(REVOCATION_HASHING_SALT).unwrap_or_default(),
			revocation_refresh_tolerance: get_duration(
				REVOCATION_REFRESH_TOLERANCE,
				value(REVOCATION_REFRESH_TOLERANCE),
				DEFAULT_REVOCATION_REFRESH_TOLERANCE,
			),
		};

		settings.validate()?;

		if settings.revocation_provider_url.is_some() && settings.hashing_salt.is_empty() {
			tracing::warn!("revocation hashing salt is empty; digests are keyed with an empty key");
		}

		Ok(settings)
	}

	/// Validate the mutual constraints between the configured endpoints.
	pub fn validate(&self) -> Result<()> {
		match (&self.openid_provider_configuration_url, &self.revocation_provider_url) {
			(Some(_), None) =>
				return Err(Error::Config {
					field: "revocation_provider_url",
					reason: "Must be set when an OpenID provider configuration URL is set.".into(),
				}),
			(None, Some(_)) =>
				return Err(Error::Config {
					field: "openid_provider_configuration_url",
					reason: "Must be set when a revocation provider URL is set.".into(),
				}),
			_ => {},
		}

		if self.upstream_tokeninfo_url.is_none() && !self.local_verification_enabled() {
			return Err(Error::Config {
				field: "upstream_tokeninfo_url",
				reason: "Either an upstream tokeninfo URL or an OpenID provider configuration URL \
				         must be set."
					.into(),
			});
		}
		if self.openid_provider_refresh_interval.is_zero() {
			return Err(Error::Config {
				field: "openid_provider_refresh_interval",
				reason: "Must be greater than zero.".into(),
			});
		}
		if self.revocation_provider_refresh_interval.is_zero() {
			return Err(Error::Config {
				field: "revocation_provider_refresh_interval",
				reason: "Must be greater than zero.".into(),
			});
		}

		Ok(())
	}

	/// Whether tokens can be verified locally (key store plus revocation cache).
	pub fn local_verification_enabled(&self) -> bool {
		self.openid_provider_configuration_url.is_some() && self.revocation_provider_url.is_some()
	}

	/// Maximum age a revocation snapshot may reach before the cache fails closed.
	pub fn revocation_max_age(&self) -> Duration {
		self.revocation_cache_ttl.saturating_add(self.revocation_refresh_tolerance)
	}
}
impl Default for Settings {
	fn default() -> Self {
		Self {
			upstream_tokeninfo_url: None,
			openid_provider_configuration_url: None,
			revocation_provider_url: None,
			upstream_issuers: Vec::new(),
			upstream_cache_max_size: DEFAULT_UPSTREAM_CACHE_MAX_SIZE,
			upstream_cache_ttl: DEFAULT_UPSTREAM_CACHE_TTL,
			upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
			http_client_timeout: DEFAULT_HTTP_CLIENT_TIMEOUT,
			http_client_tls_timeout: DEFAULT_HTTP_CLIENT_TLS_TIMEOUT,
			openid_provider_refresh_interval: DEFAULT_OPENID_REFRESH_INTERVAL,
			listen_address: DEFAULT_LISTEN_ADDRESS.to_owned(),
			metrics_listen_address: DEFAULT_METRICS_LISTEN_ADDRESS.to_owned(),
			revocation_cache_ttl: DEFAULT_REVOCATION_CACHE_TTL,
			revocation_provider_refresh_interval: DEFAULT_REVOCATION_REFRESH_INTERVAL,
			hashing_salt: String::new(),
			revocation_refresh_tolerance: DEFAULT_REVOCATION_REFRESH_TOLERANCE,
		}
	}
}

/// Parse a duration such as `30s`, `10m0s`, `1h30m`, `250ms` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(seconds) = raw.parse::<u64>() {
		return Some(Duration::from_secs(seconds));
	}

	humantime::parse_duration(raw).ok()
}

fn get_url(field: &'static str, value: Option<String>) -> Result<Option<Url>> {
	let Some(raw) = value else {
		return Ok(None);
	};
	let url = Url::parse(raw.trim())
		.map_err(|err| Error::Config { field, reason: format!("Invalid URL '{raw}': {err}.") })?;

	if url.host_str().is_none() {
		return Err(Error::Config { field, reason: format!("URL '{raw}' has no host.") });
	}

	Ok(Some(url))
}

fn get_int(field: &'static str, value: Option<String>, default: usize) -> usize {
	match value {
		None => default,
		Some(raw) => raw.trim().parse().unwrap_or_else(|err| {
			tracing::warn!(field, value = %raw, error = %err, "invalid integer; using default");

			default
		}),
	}
}

fn get_duration(field: &'static str, value: Option<String>, default: Duration) -> Duration {
	match value {
		None => default,
		Some(raw) => parse_duration(&raw).unwrap_or_else(|| {
			tracing::warn!(field, value = %raw, "invalid duration; using default");

			default
		}),
	}
}
