//! Accepted-token result and its tokeninfo-style JSON rendering.

// crates.io
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, processor::ProcessorKind};

const RESERVED_KEYS: [&str; 3] = ["expires_in", "scope", "token_type"];

/// Result of a successful validation.
///
/// Serializes to a flat JSON object: every claim verbatim, plus `scope` as an array, `expires_in`
/// in seconds and `token_type` fixed to `Bearer`.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenInfo {
	/// `iss` claim.
	pub issuer: Option<String>,
	/// `sub` claim, or `uid` for providers that use it.
	pub subject: Option<String>,
	/// Granted scopes.
	pub scopes: Vec<String>,
	/// Absolute expiry of the token.
	pub expires_at: Option<DateTime<Utc>>,
	/// Strategy that accepted the token.
	pub processor: ProcessorKind,
	/// Every claim as received.
	pub claims: Map<String, Value>,
}
impl TokenInfo {
	/// Build from a claim set, deriving the well-known fields.
	pub fn from_claims(claims: Map<String, Value>, processor: ProcessorKind) -> Self {
		let issuer = claims.get("iss").and_then(Value::as_str).map(str::to_owned);
		let subject = claims
			.get("sub")
			.or_else(|| claims.get("uid"))
			.and_then(Value::as_str)
			.map(str::to_owned);
		let scopes = claims.get("scope").map(scope_list).unwrap_or_default();
		let expires_at =
			claims.get("exp").and_then(Value::as_i64).and_then(|exp| DateTime::from_timestamp(exp, 0));

		Self { issuer, subject, scopes, expires_at, processor, claims }
	}

	/// Whole seconds until expiry, floored at zero.
	pub fn expires_in(&self, now: DateTime<Utc>) -> Option<i64> {
		self.expires_at.map(|expires_at| (expires_at - now).num_seconds().max(0))
	}

	/// Whether the token's own expiry has passed.
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		self.expires_at.is_some_and(|expires_at| expires_at <= now)
	}

	/// Whether the token grants `scope`.
	pub fn has_scope(&self, scope: &str) -> bool {
		self.scopes.iter().any(|granted| granted == scope)
	}
}
impl Serialize for TokenInfo {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut map = serializer.serialize_map(None)?;

		for (key, value) in &self.claims {
			if !RESERVED_KEYS.contains(&key.as_str()) {
				map.serialize_entry(key, value)?;
			}
		}

		map.serialize_entry("scope", &self.scopes)?;

		if let Some(expires_in) = self.expires_in(Utc::now()) {
			map.serialize_entry("expires_in", &expires_in)?;
		}

		map.serialize_entry("token_type", "Bearer")?;
		map.end()
	}
}

/// Interpret a `scope` value given either as an array or as a space-separated string.
pub fn scope_list(value: &Value) -> Vec<String> {
	match value {
		Value::String(raw) => raw.split_whitespace().map(str::to_owned).collect(),
		Value::Array(items) => items.iter().filter_map(Value::as_str).map(str::to_owned).collect(),
		_ => Vec::new(),
	}
}
