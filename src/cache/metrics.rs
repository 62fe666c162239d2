// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing token cache traffic.
#[derive(Debug, Default)]
pub struct TokenCacheMetrics {
	hits: AtomicU64,
	acquisitions: AtomicU64,
	failures: AtomicU64,
}
impl TokenCacheMetrics {
	/// Lookups served from cache without contacting the credential source.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Calls made to the credential source, successful or not.
	pub fn acquisitions(&self) -> u64 {
		self.acquisitions.load(Ordering::Relaxed)
	}

	/// Credential source calls that failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_acquisition(&self) {
		self.acquisitions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
