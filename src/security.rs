//! Credential hygiene: token fingerprints and keyed revocation digests.
//!
//! # Threat Model
//! Raw bearer tokens and revoked identifiers are credentials in their own right. Caches, logs and
//! snapshots only ever hold one-way digests: an unkeyed SHA-256 fingerprint for the upstream cache
//! index and an HMAC-SHA256 digest keyed by the deployment salt for revocation membership.

// std
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
// crates.io
use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 fingerprint of a raw bearer token.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenFingerprint([u8; 32]);
impl TokenFingerprint {
	/// Fingerprint the given raw token.
	pub fn of(token: &str) -> Self {
		let digest = Sha256::digest(token.as_bytes());
		let mut bytes = [0u8; 32];

		bytes.copy_from_slice(&digest);

		Self(bytes)
	}

	/// Raw fingerprint bytes.
	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}
}
impl Debug for TokenFingerprint {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		write!(f, "TokenFingerprint({self})")
	}
}
impl Display for TokenFingerprint {
	// Eight bytes are enough to correlate log lines.
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str(&BASE64_URL_SAFE_NO_PAD.encode(&self.0[..8]))
	}
}

/// Keyed one-way digest used for revocation membership.
pub type RevocationDigest = [u8; 32];

/// HMAC-SHA256 hasher keyed by the deployment hashing salt.
#[derive(Clone)]
pub struct RevocationHasher {
	mac: HmacSha256,
}
impl RevocationHasher {
	/// Create a hasher keyed with the given salt.
	pub fn new(salt: &str) -> Result<Self> {
		let mac = <HmacSha256 as Mac>::new_from_slice(salt.as_bytes()).map_err(|err| {
			Error::Validation { field: "hashing_salt", reason: format!("Unusable salt: {err}.") }
		})?;

		Ok(Self { mac })
	}

	/// Digest a plaintext identifier.
	pub fn digest(&self, identifier: &str) -> RevocationDigest {
		let mut mac = self.mac.clone();

		mac.update(identifier.as_bytes());

		let output = mac.finalize().into_bytes();
		let mut bytes = [0u8; 32];

		bytes.copy_from_slice(&output);

		bytes
	}
}
impl Debug for RevocationHasher {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str("RevocationHasher(..)")
	}
}
