//! Issuer-based dispatch to validation strategies.

// std
use std::collections::HashMap;
// crates.io
use base64::prelude::*;
use serde::Deserialize;
// self
use crate::{
	_prelude::*,
	error::Rejection,
	metrics,
	processor::Processor,
	tokeninfo::TokenInfo,
};

/// Which issuers a registration answers for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssuerMatcher {
	/// Tokens whose `iss` equals the given value.
	Exact(String),
	/// Any issuer without an exact registration.
	Any,
}

/// Maps issuers to processors; built once at startup and read-only afterwards.
#[derive(Debug, Default)]
pub struct ProcessorRegistry {
	exact: HashMap<String, Arc<Processor>>,
	fallback: Option<Arc<Processor>>,
}
impl ProcessorRegistry {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `processor` for `matcher`; each issuer and the fallback may be claimed once.
	pub fn register(&mut self, matcher: IssuerMatcher, processor: Arc<Processor>) -> Result<()> {
		match matcher {
			IssuerMatcher::Exact(issuer) => {
				if self.exact.contains_key(&issuer) {
					return Err(Error::Config {
						field: "upstream_issuers",
						reason: format!("Issuer {issuer} is registered twice."),
					});
				}

				tracing::info!(%issuer, processor = processor.kind().label(), "issuer registered");

				self.exact.insert(issuer, processor);
			},
			IssuerMatcher::Any => {
				if self.fallback.is_some() {
					return Err(Error::Config {
						field: "upstream_issuers",
						reason: "A fallback processor is already registered.".into(),
					});
				}

				tracing::info!(processor = processor.kind().label(), "fallback processor registered");

				self.fallback = Some(processor);
			},
		}

		Ok(())
	}

	/// Processor for `issuer`: exact match first, then the fallback.
	pub fn lookup(&self, issuer: &str) -> Option<&Arc<Processor>> {
		self.exact.get(issuer).or(self.fallback.as_ref())
	}

	/// Number of exact registrations plus the fallback, if any.
	pub fn len(&self) -> usize {
		self.exact.len() + usize::from(self.fallback.is_some())
	}

	/// Whether nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Select a processor by the token's unverified issuer and fully validate the token.
	#[tracing::instrument(skip_all, fields(issuer = tracing::field::Empty))]
	pub async fn validate(&self, raw: &str) -> Result<TokenInfo> {
		let Some(issuer) = peek_issuer(raw) else {
			metrics::record_validation("none", "unsupported");

			return Err(Rejection::UnsupportedToken { issuer: None }.into());
		};

		tracing::Span::current().record("issuer", issuer.as_str());

		let Some(processor) = self.lookup(&issuer) else {
			metrics::record_validation("none", "unsupported");

			return Err(Rejection::UnsupportedToken { issuer: Some(issuer) }.into());
		};
		let result = processor.validate(raw).await;

		match &result {
			Ok(_) => tracing::debug!("token accepted"),
			Err(Error::RevocationStale { age }) =>
				tracing::warn!(?age, "revocation data stale; rejecting token"),
			Err(err) => tracing::debug!(error = %err, "token not accepted"),
		}

		metrics::record_validation(processor.kind().label(), outcome_label(&result));

		result
	}
}

#[derive(Deserialize)]
struct IssuerPeek {
	iss: Option<String>,
}

/// Read the `iss` claim of a compact JWT without verifying it.
///
/// Returns `None` for anything that is not a three-segment token with a JSON payload carrying a
/// non-empty string issuer.
pub fn peek_issuer(raw: &str) -> Option<String> {
	let mut segments = raw.split('.');
	let (Some(_), Some(payload), Some(_), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return None;
	};
	let bytes = BASE64_URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
	let peek = serde_json::from_slice::<IssuerPeek>(&bytes).ok()?;

	peek.iss.filter(|issuer| !issuer.is_empty())
}

fn outcome_label(result: &Result<TokenInfo>) -> &'static str {
	match result {
		Ok(_) => "accepted",
		Err(Error::Rejected(rejection)) => rejection.label(),
		Err(Error::RevocationStale { .. }) => "revocation_stale",
		Err(Error::UpstreamUnavailable(_)) => "upstream_unavailable",
		Err(_) => "error",
	}
}
