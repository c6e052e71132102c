//! Revocation list ingestion and salted membership queries.

pub mod cache;
pub mod snapshot;

pub use cache::RevocationCache;
pub use snapshot::RevocationSnapshot;

// std
use std::fmt::{Display, Formatter, Result as FmtResult};
// crates.io
use serde::Deserialize;

/// Category of a revocation entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RevocationKind {
	/// The raw token itself was revoked.
	Token,
	/// Every token carrying the named claim with a revoked value.
	Claim(String),
	/// Every token issued before the global cut-off.
	Global,
}
impl Display for RevocationKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			RevocationKind::Token => f.write_str("token"),
			RevocationKind::Claim(name) => write!(f, "claim:{name}"),
			RevocationKind::Global => f.write_str("global"),
		}
	}
}

/// Revocation list published by the revocation provider.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RevocationList {
	/// Individual records; unknown record types are ignored.
	#[serde(default)]
	pub revocations: Vec<RevocationRecord>,
}

/// A single published revocation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevocationRecord {
	/// Revoke one raw token.
	Token {
		/// Raw token value.
		value: String,
	},
	/// Revoke tokens whose `name` claim equals `value`.
	Claim {
		/// Claim name, e.g. `sub`.
		name: String,
		/// Revoked claim value.
		value: String,
	},
	/// Revoke every token whose `iat` precedes `issued_before` (epoch seconds).
	Global {
		/// Cut-off in epoch seconds.
		issued_before: i64,
	},
	/// A record type this gateway does not understand.
	#[serde(other)]
	Unknown,
}
