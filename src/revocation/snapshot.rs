//! Immutable revocation snapshots.

// std
use std::collections::{HashMap, HashSet};
// self
use crate::{
	_prelude::*,
	revocation::{RevocationKind, RevocationList, RevocationRecord},
	security::{RevocationDigest, RevocationHasher},
};

/// Point-in-time view of the revocation list, holding only salted digests.
#[derive(Clone, Debug)]
pub struct RevocationSnapshot {
	tokens: HashSet<RevocationDigest>,
	claims: HashMap<String, HashSet<RevocationDigest>>,
	issued_before: Option<i64>,
	refreshed_at: DateTime<Utc>,
	installed_at: Instant,
}
impl RevocationSnapshot {
	/// Digest every record of `list` with `hasher`.
	pub fn build(list: RevocationList, hasher: &RevocationHasher) -> Self {
		let mut tokens = HashSet::new();
		let mut claims: HashMap<String, HashSet<RevocationDigest>> = HashMap::new();
		let mut issued_before = None;
		let mut skipped = 0_usize;

		for record in list.revocations {
			match record {
				RevocationRecord::Token { value } => {
					tokens.insert(hasher.digest(&value));
				},
				RevocationRecord::Claim { name, value } => {
					claims.entry(name).or_default().insert(hasher.digest(&value));
				},
				RevocationRecord::Global { issued_before: cut_off } =>
					issued_before = issued_before.max(Some(cut_off)),
				RevocationRecord::Unknown => skipped += 1,
			}
		}

		if skipped > 0 {
			tracing::warn!(skipped, "skipping revocation records of unknown type");
		}

		Self { tokens, claims, issued_before, refreshed_at: Utc::now(), installed_at: Instant::now() }
	}

	/// Whether the digest is revoked under `kind`.
	///
	/// `Global` never matches a digest; use [`RevocationSnapshot::issued_before`] instead.
	pub fn contains(&self, kind: &RevocationKind, digest: &RevocationDigest) -> bool {
		match kind {
			RevocationKind::Token => self.tokens.contains(digest),
			RevocationKind::Claim(name) =>
				self.claims.get(name).is_some_and(|digests| digests.contains(digest)),
			RevocationKind::Global => false,
		}
	}

	/// Claim names with at least one revoked value.
	pub fn claim_names(&self) -> impl Iterator<Item = &str> {
		self.claims.keys().map(String::as_str)
	}

	/// Global cut-off in epoch seconds.
	pub fn issued_before(&self) -> Option<i64> {
		self.issued_before
	}

	/// Wall-clock time the snapshot was built.
	pub fn refreshed_at(&self) -> DateTime<Utc> {
		self.refreshed_at
	}

	/// Time elapsed since the snapshot was installed.
	pub fn age(&self) -> Duration {
		self.installed_at.elapsed()
	}

	/// Total number of revoked digests.
	pub fn len(&self) -> usize {
		self.tokens.len() + self.claims.values().map(HashSet::len).sum::<usize>()
	}

	/// Whether the snapshot revokes nothing.
	pub fn is_empty(&self) -> bool {
		self.len() == 0 && self.issued_before.is_none()
	}
}
