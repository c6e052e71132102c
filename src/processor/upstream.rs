//! Strategy delegating validation to a remote introspection endpoint.

// crates.io
use http::{StatusCode, header::ACCEPT};
use reqwest::Client;
use serde_json::{Map, Value};
use url::Url;
// self
use crate::{
	_prelude::*,
	cache::UpstreamCache,
	error::Rejection,
	processor::ProcessorKind,
	security::TokenFingerprint,
	tokeninfo::TokenInfo,
};

/// Validates tokens by asking the upstream tokeninfo endpoint, memoizing active results.
///
/// The upstream endpoint is authoritative for revocation; the local revocation cache is not
/// consulted on this path.
#[derive(Debug)]
pub struct UpstreamProcessor {
	client: Client,
	url: Url,
	timeout: Duration,
	cache: Arc<UpstreamCache>,
}
impl UpstreamProcessor {
	/// Create a processor calling `url`; a zero `timeout` leaves only the client timeout.
	pub fn new(client: Client, url: Url, timeout: Duration, cache: Arc<UpstreamCache>) -> Self {
		Self { client, url, timeout, cache }
	}

	/// Shared result cache.
	pub fn cache(&self) -> &Arc<UpstreamCache> {
		&self.cache
	}

	/// Validate `raw`, serving from the cache when possible.
	pub async fn validate(&self, raw: &str) -> Result<TokenInfo> {
		if let Some(info) = self.cache.get(raw) {
			tracing::debug!(fingerprint = %TokenFingerprint::of(raw), "upstream cache hit");

			return Ok(info);
		}

		let info = self.introspect(raw).await?;

		self.cache.put(raw, info.clone());

		Ok(info)
	}

	async fn introspect(&self, raw: &str) -> Result<TokenInfo> {
		let mut request =
			self.client.get(self.url.clone()).bearer_auth(raw).header(ACCEPT, "application/json");

		if !self.timeout.is_zero() {
			request = request.timeout(self.timeout);
		}

		let start = Instant::now();
		let response = request.send().await.map_err(unavailable)?;
		let status = response.status();

		match status {
			StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN =>
				return Err(Rejection::Inactive.into()),
			status if !status.is_success() =>
				return Err(Error::UpstreamUnavailable(format!("{} answered {status}", self.url))),
			_ => {},
		}

		let body = response.json::<Map<String, Value>>().await.map_err(unavailable)?;

		tracing::debug!(%status, elapsed = ?start.elapsed(), "upstream introspection complete");

		parse_introspection(body, Utc::now())
	}
}

/// Interpret an introspection body.
///
/// `active` defaults to `true`; a relative `expires_in` is used when `exp` is absent.
pub fn parse_introspection(body: Map<String, Value>, now: DateTime<Utc>) -> Result<TokenInfo> {
	if !body.get("active").and_then(Value::as_bool).unwrap_or(true) {
		return Err(Rejection::Inactive.into());
	}

	let expires_in = body.get("expires_in").and_then(Value::as_i64);
	let mut info = TokenInfo::from_claims(body, ProcessorKind::Upstream);

	if info.expires_at.is_none() {
		info.expires_at = expires_in.map(|seconds| now + TimeDelta::seconds(seconds));
	}

	Ok(info)
}

fn unavailable(err: reqwest::Error) -> Error {
	Error::UpstreamUnavailable(err.to_string())
}
