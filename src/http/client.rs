//! HTTP client integration for provider documents.

// crates.io
use http::{StatusCode, header::ACCEPT};
use reqwest::{Client, redirect::Policy};
use serde::de::DeserializeOwned;
use url::Url;
// self
use crate::{
	_prelude::*,
	http::retry::{RetryBudget, RetryPolicy},
	settings::Settings,
};

/// Default size guard for provider documents (1 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 1_048_576;
/// Revocation lists are allowed to grow larger than key sets (16 MiB).
pub const REVOCATION_MAX_RESPONSE_BYTES: u64 = 16 * 1_048_576;
/// Maximum redirect depth.
pub const MAX_REDIRECTS: usize = 10;

/// Build the shared reqwest client from the configured timeouts.
pub fn build_client(settings: &Settings) -> Result<Client> {
	let mut builder = Client::builder()
		.redirect(Policy::limited(MAX_REDIRECTS))
		.user_agent(format!("tokeninfo-gateway/{}", env!("CARGO_PKG_VERSION")));

	if !settings.http_client_tls_timeout.is_zero() {
		builder = builder.connect_timeout(settings.http_client_tls_timeout);
	}
	if !settings.http_client_timeout.is_zero() {
		builder = builder.timeout(settings.http_client_timeout);
	}

	Ok(builder.build()?)
}

/// Fetches and decodes JSON documents, retrying per the configured policy.
#[derive(Clone, Debug)]
pub struct JsonFetcher {
	client: Client,
	retry_policy: RetryPolicy,
	max_response_bytes: u64,
}
impl JsonFetcher {
	/// Create a fetcher around a shared client.
	pub fn new(client: Client, retry_policy: RetryPolicy) -> Result<Self> {
		retry_policy.validate()?;

		Ok(Self { client, retry_policy, max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES })
	}

	/// Override the response size guard.
	pub fn with_max_response_bytes(mut self, max_response_bytes: u64) -> Self {
		self.max_response_bytes = max_response_bytes;

		self
	}

	/// Access the underlying HTTP client.
	pub fn client(&self) -> &Client {
		&self.client
	}

	/// GET `url` and decode the body, retrying transient failures within the policy budget.
	pub async fn get<T>(&self, url: &Url) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut budget = RetryBudget::new(&self.retry_policy);
		let mut last_error = None;

		while let Some(timeout) = budget.next_attempt() {
			match self.get_once(url, timeout).await {
				Ok(document) => return Ok(document),
				Err(err) => {
					let retryable = is_retryable(&err);

					tracing::debug!(%url, error = %err, retryable, "document fetch attempt failed");

					last_error = Some(err);

					if !retryable || !budget.wait_for_retry().await {
						break;
					}
				},
			}
		}

		Err(last_error.unwrap_or_else(|| Error::Validation {
			field: "retry_policy.deadline",
			reason: format!("Retry budget exhausted before fetching {url}."),
		}))
	}

	async fn get_once<T>(&self, url: &Url, attempt_timeout: Duration) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let request = self
			.client
			.get(url.clone())
			.header(ACCEPT, "application/json")
			.timeout(attempt_timeout);
		let start = Instant::now();
		let response = request.send().await?;
		let status = response.status();

		if !status.is_success() {
			let body = response.text().await.ok();

			return Err(Error::HttpStatus { status, url: url.clone(), body });
		}

		let bytes = response.bytes().await?;

		if bytes.len() as u64 > self.max_response_bytes {
			return Err(Error::Validation {
				field: "max_response_bytes",
				reason: format!(
					"Response size {size} bytes exceeds the configured guard of {limit} bytes.",
					size = bytes.len(),
					limit = self.max_response_bytes
				),
			});
		}

		let document = serde_json::from_slice(&bytes)?;

		tracing::debug!(%url, %status, elapsed = ?start.elapsed(), "document fetch complete");

		Ok(document)
	}
}

fn is_retryable(err: &Error) -> bool {
	match err {
		Error::Reqwest(_) => true,
		Error::HttpStatus { status, .. } =>
			status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS,
		_ => false,
	}
}
