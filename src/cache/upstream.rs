//! Size- and time-bounded memo of upstream introspection results.

// std
use std::num::NonZeroUsize;
// crates.io
use lru::LruCache;
use parking_lot::Mutex;
// self
use crate::{_prelude::*, metrics, security::TokenFingerprint, tokeninfo::TokenInfo};

#[derive(Debug)]
struct CacheEntry {
	info: TokenInfo,
	inserted_at: Instant,
}
impl CacheEntry {
	fn is_fresh(&self, now: Instant, ttl: Duration, wall_clock: DateTime<Utc>) -> bool {
		now.saturating_duration_since(self.inserted_at) < ttl && !self.info.is_expired(wall_clock)
	}
}

/// LRU cache of active upstream results keyed by token fingerprint.
///
/// A capacity of zero disables the cache: every lookup misses and inserts are dropped.
#[derive(Debug)]
pub struct UpstreamCache {
	entries: Option<Mutex<LruCache<TokenFingerprint, CacheEntry>>>,
	ttl: Duration,
}
impl UpstreamCache {
	/// Create a cache holding at most `max_size` entries for `ttl` each.
	pub fn new(max_size: usize, ttl: Duration) -> Self {
		let entries = NonZeroUsize::new(max_size).map(|capacity| Mutex::new(LruCache::new(capacity)));

		Self { entries, ttl }
	}

	/// Whether caching is enabled.
	pub fn is_enabled(&self) -> bool {
		self.entries.is_some()
	}

	/// Return a fresh cached result for `token`.
	///
	/// Entries past the TTL or past the token's own expiry are removed and reported as misses.
	pub fn get(&self, token: &str) -> Option<TokenInfo> {
		let hit = self.entries.as_ref().and_then(|entries| {
			let fingerprint = TokenFingerprint::of(token);
			let (now, wall_clock) = (Instant::now(), Utc::now());
			let mut entries = entries.lock();
			let lookup = entries
				.get(&fingerprint)
				.map(|entry| entry.is_fresh(now, self.ttl, wall_clock).then(|| entry.info.clone()));

			match lookup {
				Some(Some(info)) => Some(info),
				Some(None) => {
					entries.pop(&fingerprint);

					tracing::debug!(%fingerprint, "evicted expired upstream cache entry");

					None
				},
				None => None,
			}
		});

		metrics::record_upstream_cache_lookup(hit.is_some());

		hit
	}

	/// Cache an active result for `token`, evicting the least recently used entry at capacity.
	pub fn put(&self, token: &str, info: TokenInfo) {
		let Some(entries) = &self.entries else {
			return;
		};
		let entry = CacheEntry { info, inserted_at: Instant::now() };

		entries.lock().put(TokenFingerprint::of(token), entry);
	}

	/// Number of resident entries, fresh or not.
	pub fn len(&self) -> usize {
		self.entries.as_ref().map_or(0, |entries| entries.lock().len())
	}

	/// Whether no entries are resident.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
