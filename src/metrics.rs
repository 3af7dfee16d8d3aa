//! Metrics helpers and per-coordinator telemetry bookkeeping.
//!
//! Counters are always kept on the coordinator; with the `metrics` feature they are also emitted
//! through the `metrics` facade, labelled by owner key.

// std
#[cfg(feature = "prometheus")] use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
#[cfg(feature = "metrics")] use metrics::Label;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
#[cfg(feature = "metrics")] use smallvec::SmallVec;
// self
use crate::_prelude::*;

#[cfg(feature = "metrics")]
type LabelSet = SmallVec<[Label; 2]>;

const METRIC_LOOKUPS_TOTAL: &str = "keys_cache_lookups_total";
const METRIC_HITS_TOTAL: &str = "keys_cache_hits_total";
const METRIC_NOT_FOUND_TOTAL: &str = "keys_cache_not_found_total";
const METRIC_RATE_LIMITED_TOTAL: &str = "keys_cache_rate_limited_total";
const METRIC_COALESCED_TOTAL: &str = "keys_cache_coalesced_total";
const METRIC_LOAD_TOTAL: &str = "keys_cache_load_total";
const METRIC_LOAD_DURATION: &str = "keys_cache_load_duration_seconds";

/// Shared Prometheus handle installed by [`install_default_exporter`].
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Thread-safe counters for a single coordinator.
#[derive(Debug, Default)]
pub struct CoordinatorMetrics {
	lookups: AtomicU64,
	cache_hits: AtomicU64,
	not_found: AtomicU64,
	rate_limited: AtomicU64,
	coalesced: AtomicU64,
	loads: AtomicU64,
	load_errors: AtomicU64,
	last_load_micros: AtomicU64,
}
impl CoordinatorMetrics {
	/// Create a new metrics accumulator.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Capture the current counter values.
	pub fn snapshot(&self) -> CoordinatorMetricsSnapshot {
		CoordinatorMetricsSnapshot {
			lookups: self.lookups.load(Ordering::Relaxed),
			cache_hits: self.cache_hits.load(Ordering::Relaxed),
			not_found: self.not_found.load(Ordering::Relaxed),
			rate_limited: self.rate_limited.load(Ordering::Relaxed),
			coalesced: self.coalesced.load(Ordering::Relaxed),
			loads: self.loads.load(Ordering::Relaxed),
			load_errors: self.load_errors.load(Ordering::Relaxed),
			last_load_micros: match self.last_load_micros.load(Ordering::Relaxed) {
				0 => None,
				value => Some(value),
			},
		}
	}

	/// Record a lookup served straight from the cached entry.
	pub fn record_hit(&self, owner_key: &str) {
		self.lookups.fetch_add(1, Ordering::Relaxed);
		self.cache_hits.fetch_add(1, Ordering::Relaxed);

		emit_counter(METRIC_LOOKUPS_TOTAL, owner_key, None);
		emit_counter(METRIC_HITS_TOTAL, owner_key, None);
	}

	/// Record a lookup that found its key only after a refresh.
	pub fn record_refreshed_hit(&self, owner_key: &str) {
		self.lookups.fetch_add(1, Ordering::Relaxed);

		emit_counter(METRIC_LOOKUPS_TOTAL, owner_key, None);
	}

	/// Record a lookup that ended without a key.
	pub fn record_not_found(&self, owner_key: &str) {
		self.lookups.fetch_add(1, Ordering::Relaxed);
		self.not_found.fetch_add(1, Ordering::Relaxed);

		emit_counter(METRIC_LOOKUPS_TOTAL, owner_key, None);
		emit_counter(METRIC_NOT_FOUND_TOTAL, owner_key, None);
	}

	/// Record a refresh skipped by the rate-limit gate.
	pub fn record_rate_limited(&self, owner_key: &str) {
		self.rate_limited.fetch_add(1, Ordering::Relaxed);

		emit_counter(METRIC_RATE_LIMITED_TOTAL, owner_key, None);
	}

	/// Record a lookup that waited on another caller's refresh.
	pub fn record_coalesced(&self, owner_key: &str) {
		self.coalesced.fetch_add(1, Ordering::Relaxed);

		emit_counter(METRIC_COALESCED_TOTAL, owner_key, None);
	}

	/// Record a successful loader call along with its latency.
	pub fn record_load_success(&self, owner_key: &str, duration: Duration) {
		self.loads.fetch_add(1, Ordering::Relaxed);

		let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

		self.last_load_micros.store(micros.max(1), Ordering::Relaxed);

		emit_counter(METRIC_LOAD_TOTAL, owner_key, Some("success"));
		emit_histogram(METRIC_LOAD_DURATION, owner_key, duration);
	}

	/// Record a failed loader call.
	pub fn record_load_error(&self, owner_key: &str) {
		self.loads.fetch_add(1, Ordering::Relaxed);
		self.load_errors.fetch_add(1, Ordering::Relaxed);

		emit_counter(METRIC_LOAD_TOTAL, owner_key, Some("error"));
	}
}

/// Read-only snapshot of coordinator counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoordinatorMetricsSnapshot {
	/// Lookups that returned a key or not-found.
	pub lookups: u64,
	/// Lookups answered from the cached entry without refreshing.
	pub cache_hits: u64,
	/// Lookups that ended without a key.
	pub not_found: u64,
	/// Refreshes skipped because the owner was loaded too recently.
	pub rate_limited: u64,
	/// Lookups that waited on a refresh run by another caller.
	pub coalesced: u64,
	/// Loader invocations.
	pub loads: u64,
	/// Loader invocations that failed.
	pub load_errors: u64,
	/// Microsecond latency of the most recent successful load.
	pub last_load_micros: Option<u64>,
}
impl CoordinatorMetricsSnapshot {
	/// Ratio of cache hits over lookups.
	pub fn hit_rate(&self) -> f64 {
		if self.lookups == 0 { 0.0 } else { self.cache_hits as f64 / self.lookups as f64 }
	}
}

/// Install the default Prometheus recorder backed by `metrics`.
///
/// Multiple invocations are safe; subsequent calls become no-ops once the recorder is installed.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new()
		.install_recorder()
		.map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Access the global Prometheus exporter handle when installed.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

#[cfg(feature = "metrics")]
fn emit_counter(name: &'static str, owner_key: &str, status: Option<&'static str>) {
	let mut labels = LabelSet::with_capacity(2);

	labels.push(Label::new("owner", owner_key.to_owned()));

	if let Some(status) = status {
		labels.push(Label::new("status", status));
	}

	metrics::counter!(name, labels.iter()).increment(1);
}

#[cfg(not(feature = "metrics"))]
fn emit_counter(_name: &'static str, _owner_key: &str, _status: Option<&'static str>) {}

#[cfg(feature = "metrics")]
fn emit_histogram(name: &'static str, owner_key: &str, duration: Duration) {
	let labels = [Label::new("owner", owner_key.to_owned())];

	metrics::histogram!(name, labels.iter()).record(duration.as_secs_f64());
}

#[cfg(not(feature = "metrics"))]
fn emit_histogram(_name: &'static str, _owner_key: &str, _duration: Duration) {}
