//! Strategy verifying JWTs locally against the key store.

// crates.io
use jsonwebtoken::{Validation, errors::ErrorKind};
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	error::Rejection,
	keys::KeyStore,
	processor::ProcessorKind,
	revocation::RevocationCache,
	tokeninfo::TokenInfo,
};

/// Verifies signature, temporal claims and issuer, then consults the revocation cache.
#[derive(Debug)]
pub struct JwtProcessor {
	keys: Arc<KeyStore>,
	revocations: Arc<RevocationCache>,
}
impl JwtProcessor {
	/// Create a processor over the shared key store and revocation cache.
	pub fn new(keys: Arc<KeyStore>, revocations: Arc<RevocationCache>) -> Self {
		Self { keys, revocations }
	}

	/// Validate `raw` against the current key snapshot.
	///
	/// A stale revocation cache rejects otherwise valid tokens.
	pub fn validate(&self, raw: &str) -> Result<TokenInfo> {
		let header =
			jsonwebtoken::decode_header(raw).map_err(|err| Rejection::Malformed(err.to_string()))?;
		let kid = header.kid.ok_or(Rejection::UnknownKeyId(None))?;
		let snapshot = self.keys.keys();
		let entry = snapshot.get(&kid).ok_or_else(|| Rejection::UnknownKeyId(Some(kid.clone())))?;

		if entry.algorithm.is_some_and(|algorithm| algorithm != header.alg) {
			return Err(Rejection::AlgorithmMismatch.into());
		}

		let mut validation = Validation::new(header.alg);

		validation.validate_aud = false;
		validation.validate_nbf = true;

		if let Some(issuer) = snapshot.issuer() {
			validation.set_issuer(&[issuer]);
		}

		let claims = jsonwebtoken::decode::<Map<String, Value>>(raw, &entry.key, &validation)
			.map_err(|err| rejection_for(err.kind()))?
			.claims;

		if let Some(kind) = self.revocations.check_token(raw, &claims)? {
			tracing::debug!(%kind, kid = %kid, "rejecting revoked token");

			return Err(Rejection::Revoked(kind).into());
		}

		Ok(TokenInfo::from_claims(claims, ProcessorKind::Jwt))
	}
}

fn rejection_for(kind: &ErrorKind) -> Rejection {
	match kind {
		ErrorKind::InvalidSignature => Rejection::BadSignature,
		ErrorKind::ExpiredSignature => Rejection::Expired,
		ErrorKind::ImmatureSignature => Rejection::NotYetValid,
		ErrorKind::InvalidIssuer => Rejection::IssuerMismatch,
		ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => Rejection::AlgorithmMismatch,
		ErrorKind::MissingRequiredClaim(claim) =>
			Rejection::Malformed(format!("missing required claim `{claim}`")),
		other => Rejection::Malformed(format!("{other:?}")),
	}
}
