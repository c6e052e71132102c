//! Crate-wide error types and `Result` alias.

// std
use std::fmt::{Display, Formatter, Result as FmtResult};
// self
use crate::revocation::RevocationKind;

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the gateway crate.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Jsonwebtoken(#[from] jsonwebtoken::errors::Error),
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),

	#[error("Configuration error for {field}: {reason}")]
	Config { field: &'static str, reason: String },
	#[error("Upstream HTTP status {status} from {url}: {body:?}")]
	HttpStatus { status: http::StatusCode, url: url::Url, body: Option<String> },
	#[error("Metrics error: {0}")]
	Metrics(String),
	#[error("Token rejected: {0}")]
	Rejected(Rejection),
	#[error("Revocation data is stale; last refresh {age:?} ago.")]
	RevocationStale { age: Option<std::time::Duration> },
	#[error("Upstream introspection unavailable: {0}")]
	UpstreamUnavailable(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
impl Error {
	/// Classify the error for the request boundary.
	///
	/// Stale revocation data is reported as a rejection so callers fail closed.
	pub fn disposition(&self) -> Disposition {
		match self {
			Error::Rejected(_) | Error::RevocationStale { .. } => Disposition::Rejected,
			_ => Disposition::Indeterminate,
		}
	}

	/// Borrow the rejection reason when the token was rejected outright.
	pub fn rejection(&self) -> Option<&Rejection> {
		match self {
			Error::Rejected(rejection) => Some(rejection),
			_ => None,
		}
	}
}
impl From<Rejection> for Error {
	fn from(value: Rejection) -> Self {
		Self::Rejected(value)
	}
}

/// How the request boundary should treat a failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
	/// The token is definitively not acceptable.
	Rejected,
	/// Infrastructure failed before a verdict could be reached.
	Indeterminate,
}

/// Reason a token was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
	/// The token could not be decoded.
	Malformed(String),
	/// The issuer is missing or no processor is registered for it.
	UnsupportedToken {
		/// Issuer claim, when the token carries one.
		issuer: Option<String>,
	},
	/// The `kid` header does not name a key in the current snapshot.
	UnknownKeyId(Option<String>),
	/// The token's algorithm disagrees with the signing key.
	AlgorithmMismatch,
	/// Signature verification failed.
	BadSignature,
	/// The token has expired.
	Expired,
	/// The token's `nbf` lies in the future.
	NotYetValid,
	/// The issuer claim does not match the verifying processor.
	IssuerMismatch,
	/// The upstream endpoint reported the token as inactive.
	Inactive,
	/// The token matched the revocation snapshot.
	Revoked(RevocationKind),
}
impl Rejection {
	/// Short, stable label used for metrics and logs.
	pub fn label(&self) -> &'static str {
		match self {
			Rejection::Malformed(_) => "malformed",
			Rejection::UnsupportedToken { .. } => "unsupported",
			Rejection::UnknownKeyId(_) => "unknown_kid",
			Rejection::AlgorithmMismatch => "algorithm_mismatch",
			Rejection::BadSignature => "bad_signature",
			Rejection::Expired => "expired",
			Rejection::NotYetValid => "not_yet_valid",
			Rejection::IssuerMismatch => "issuer_mismatch",
			Rejection::Inactive => "inactive",
			Rejection::Revoked(_) => "revoked",
		}
	}
}
impl Display for Rejection {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Rejection::Malformed(reason) => write!(f, "malformed token ({reason})"),
			Rejection::UnsupportedToken { issuer: Some(issuer) } =>
				write!(f, "no processor registered for issuer '{issuer}'"),
			Rejection::UnsupportedToken { issuer: None } => write!(f, "token carries no issuer"),
			Rejection::UnknownKeyId(Some(kid)) => write!(f, "unknown key id '{kid}'"),
			Rejection::UnknownKeyId(None) => write!(f, "token header carries no key id"),
			Rejection::AlgorithmMismatch => write!(f, "algorithm does not match signing key"),
			Rejection::BadSignature => write!(f, "invalid signature"),
			Rejection::Expired => write!(f, "token expired"),
			Rejection::NotYetValid => write!(f, "token not yet valid"),
			Rejection::IssuerMismatch => write!(f, "issuer mismatch"),
			Rejection::Inactive => write!(f, "token inactive"),
			Rejection::Revoked(kind) => write!(f, "token revoked ({kind})"),
		}
	}
}
