// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing how a [`super::SessionStore`] has been fed.
#[derive(Debug, Default)]
pub struct SessionMetrics {
	published: AtomicU64,
	stale_dropped: AtomicU64,
	lookup_faults: AtomicU64,
}
impl SessionMetrics {
	/// Number of snapshots delivered to observers.
	pub fn published(&self) -> u64 {
		self.published.load(Ordering::Relaxed)
	}

	/// Number of derived snapshots discarded because a newer change superseded them.
	pub fn stale_dropped(&self) -> u64 {
		self.stale_dropped.load(Ordering::Relaxed)
	}

	/// Number of profile lookups that failed and were treated as "no profile".
	pub fn lookup_faults(&self) -> u64 {
		self.lookup_faults.load(Ordering::Relaxed)
	}

	pub(crate) fn record_published(&self) {
		self.published.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_stale(&self) {
		self.stale_dropped.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_lookup_fault(&self) {
		self.lookup_faults.fetch_add(1, Ordering::Relaxed);
	}
}
