//! Time sources reporting whole seconds since the Unix epoch.

// std
use std::sync::atomic::{AtomicI64, Ordering};
// crates.io
use chrono::Utc;
// self
use crate::_prelude::*;

/// Source of the current time used by the rate-limit gate.
pub trait Clock: Send + Sync {
	/// Current wall-clock time in whole seconds.
	fn now_secs(&self) -> i64;
}

/// Wall clock backed by [`chrono::Utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now_secs(&self) -> i64 {
		Utc::now().timestamp()
	}
}

/// Manually driven clock, mainly for deterministic tests.
///
/// Clones share the same underlying reading.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
	now: Arc<AtomicI64>,
}
impl ManualClock {
	/// Create a clock pinned at `now` seconds.
	pub fn new(now: i64) -> Self {
		Self { now: Arc::new(AtomicI64::new(now)) }
	}

	/// Jump to an absolute reading.
	pub fn set(&self, now: i64) {
		self.now.store(now, Ordering::SeqCst);
	}

	/// Move the clock forward by `by`, truncated to whole seconds.
	pub fn advance(&self, by: Duration) {
		let secs = i64::try_from(by.as_secs()).unwrap_or(i64::MAX);

		self.now.fetch_add(secs, Ordering::SeqCst);
	}
}
impl Clock for ManualClock {
	fn now_secs(&self) -> i64 {
		self.now.load(Ordering::SeqCst)
	}
}
impl<C> Clock for Arc<C>
where
	C: Clock + ?Sized,
{
	fn now_secs(&self) -> i64 {
		(**self).now_secs()
	}
}
