//! Immutable key snapshots built from a provider key set.

// std
use std::{
	collections::HashMap,
	fmt::{Debug, Formatter, Result as FmtResult},
};
// crates.io
use jsonwebtoken::{
	Algorithm, DecodingKey,
	jwk::{Jwk, JwkSet, KeyAlgorithm, PublicKeyUse},
};
// self
use crate::_prelude::*;

/// Verification key resolved from a single JWK.
#[derive(Clone)]
pub struct KeyEntry {
	/// Key material ready for signature verification.
	pub key: DecodingKey,
	/// Algorithm the provider declared for this key, if any.
	pub algorithm: Option<Algorithm>,
	/// The published JWK, kept for re-publication.
	pub jwk: Jwk,
}
impl KeyEntry {
	/// Convert a published JWK into a verification key.
	pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
		if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
			return Err(Error::Validation {
				field: "jwk.use",
				reason: "Encryption keys cannot verify signatures.".into(),
			});
		}

		let algorithm = match jwk.common.key_algorithm {
			None => None,
			Some(declared) => Some(signing_algorithm(declared).ok_or_else(|| Error::Validation {
				field: "jwk.alg",
				reason: format!("Unsupported signing algorithm {declared:?}."),
			})?),
		};
		let key = DecodingKey::from_jwk(jwk)?;

		Ok(Self { key, algorithm, jwk: jwk.clone() })
	}
}
impl Debug for KeyEntry {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("KeyEntry")
			.field("kid", &self.jwk.common.key_id)
			.field("algorithm", &self.algorithm)
			.finish_non_exhaustive()
	}
}

/// Point-in-time view of the provider's usable signing keys.
#[derive(Clone, Debug, Default)]
pub struct KeySnapshot {
	issuer: Option<String>,
	keys: HashMap<String, KeyEntry>,
	refreshed_at: Option<DateTime<Utc>>,
}
impl KeySnapshot {
	/// Snapshot holding no keys, installed before the first refresh completes.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Build a snapshot from a fetched key set.
	///
	/// Keys without a `kid` or that cannot be converted are skipped; a set without any usable key
	/// is rejected.
	pub fn from_jwk_set(issuer: impl Into<String>, set: &JwkSet) -> Result<Self> {
		let mut keys = HashMap::with_capacity(set.keys.len());

		for jwk in &set.keys {
			let Some(kid) = jwk.common.key_id.as_deref() else {
				tracing::warn!("skipping JWK without key id");

				continue;
			};

			match KeyEntry::from_jwk(jwk) {
				Ok(entry) => {
					keys.insert(kid.to_owned(), entry);
				},
				Err(err) => tracing::warn!(kid, error = %err, "skipping unusable JWK"),
			}
		}

		if keys.is_empty() {
			return Err(Error::Validation {
				field: "jwks.keys",
				reason: "Key set contains no usable signing keys.".into(),
			});
		}

		Ok(Self { issuer: Some(issuer.into()), keys, refreshed_at: Some(Utc::now()) })
	}

	/// Look up a key by its id.
	pub fn get(&self, kid: &str) -> Option<&KeyEntry> {
		self.keys.get(kid)
	}

	/// Issuer advertised alongside this key set.
	pub fn issuer(&self) -> Option<&str> {
		self.issuer.as_deref()
	}

	/// Wall-clock time the snapshot was built, `None` for the empty snapshot.
	pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
		self.refreshed_at
	}

	/// Number of usable keys.
	pub fn len(&self) -> usize {
		self.keys.len()
	}

	/// Whether the snapshot holds no keys.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Render the usable keys as a JWKS document, ordered by key id.
	pub fn to_jwk_set(&self) -> JwkSet {
		let mut entries: Vec<_> = self.keys.iter().collect();

		entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

		JwkSet { keys: entries.into_iter().map(|(_, entry)| entry.jwk.clone()).collect() }
	}
}

fn signing_algorithm(declared: KeyAlgorithm) -> Option<Algorithm> {
	match declared {
		KeyAlgorithm::HS256 => Some(Algorithm::HS256),
		KeyAlgorithm::HS384 => Some(Algorithm::HS384),
		KeyAlgorithm::HS512 => Some(Algorithm::HS512),
		KeyAlgorithm::ES256 => Some(Algorithm::ES256),
		KeyAlgorithm::ES384 => Some(Algorithm::ES384),
		KeyAlgorithm::RS256 => Some(Algorithm::RS256),
		KeyAlgorithm::RS384 => Some(Algorithm::RS384),
		KeyAlgorithm::RS512 => Some(Algorithm::RS512),
		KeyAlgorithm::PS256 => Some(Algorithm::PS256),
		KeyAlgorithm::PS384 => Some(Algorithm::PS384),
		KeyAlgorithm::PS512 => Some(Algorithm::PS512),
		KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
		_ => None,
	}
}
