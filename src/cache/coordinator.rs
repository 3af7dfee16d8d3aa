//! Lookup coordinator coalescing and rate limiting key refreshes.

// crates.io
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	cache::{
		entry::{PublicKey, PublicKeysEntry},
		inflight::{Claim, InFlight, SharedOutcome},
		store::{KeyStore, MemoryKeyStore},
	},
	clock::{Clock, SystemClock},
	config::CoordinatorConfig,
	loader::KeyLoader,
	metrics::CoordinatorMetrics,
};

/// Serves public keys per owner, refreshing through a loader when a kid is unknown.
///
/// Concurrent lookups missing the cache for the same owner share a single loader call, and an
/// owner is never loaded again until `min_time_between_requests` has elapsed since its entry was
/// produced. Different owners refresh independently.
#[derive(Clone, Debug)]
pub struct KeyCacheCoordinator<S = MemoryKeyStore, C = SystemClock> {
	store: S,
	clock: C,
	config: Arc<CoordinatorConfig>,
	in_flight: Arc<InFlight>,
	metrics: Arc<CoordinatorMetrics>,
}
impl KeyCacheCoordinator {
	/// Create a [`CoordinatorBuilder`] with an in-memory store and the system clock.
	pub fn builder() -> CoordinatorBuilder {
		CoordinatorBuilder::new()
	}
}
impl<S, C> KeyCacheCoordinator<S, C>
where
	S: KeyStore,
	C: Clock,
{
	/// Resolve `kid` for `owner_key`, loading fresh keys through `loader` when necessary.
	///
	/// Returns `Ok(None)` when the kid is unknown after any permitted refresh; this is a normal
	/// outcome, distinct from [`Error::Load`].
	#[tracing::instrument(skip(self, kid, loader), fields(kid = kid.unwrap_or_default()))]
	pub async fn lookup<L>(
		&self,
		owner_key: &str,
		kid: Option<&str>,
		loader: &L,
	) -> Result<Option<PublicKey>>
	where
		L: KeyLoader,
	{
		let entry = self.store.get(owner_key).await?;

		if let Some(key) = entry.as_deref().and_then(|entry| entry.resolve(kid)) {
			self.metrics.record_hit(owner_key);

			return Ok(Some(key.clone()));
		}

		let now = self.clock.now_secs();
		let entry = if self.may_load(entry.as_deref(), now) {
			self.refresh(owner_key, loader).await?
		} else {
			tracing::warn!(
				last_request_time = entry.as_deref().map(PublicKeysEntry::last_request_time),
				"won't load the keys; last request was too recent"
			);

			self.metrics.record_rate_limited(owner_key);

			entry
		};

		if let Some(key) = entry.as_deref().and_then(|entry| entry.resolve(kid)) {
			self.metrics.record_refreshed_hit(owner_key);

			return Ok(Some(key.clone()));
		}

		let available: Vec<Option<&str>> = entry
			.as_deref()
			.map(|entry| entry.current_keys().kids().collect())
			.unwrap_or_default();

		tracing::warn!(?kid, ?available, "public key wasn't found in the storage");

		self.metrics.record_not_found(owner_key);

		Ok(None)
	}

	/// Read the entry currently stored for `owner_key` without refreshing.
	pub async fn cached_entry(&self, owner_key: &str) -> Result<Option<Arc<PublicKeysEntry>>> {
		self.store.get(owner_key).await
	}

	/// Minimum interval between two loads for the same owner.
	pub fn min_time_between_requests(&self) -> Duration {
		self.config.min_time_between_requests
	}

	/// Number of refreshes currently running.
	pub fn in_flight(&self) -> usize {
		self.in_flight.len()
	}

	/// Access the coordinator's counters.
	pub fn metrics(&self) -> Arc<CoordinatorMetrics> {
		self.metrics.clone()
	}

	/// Access the backing store.
	pub fn store(&self) -> &S {
		&self.store
	}

	// Joins the running refresh for `owner_key`, or runs one and publishes its outcome.
	async fn refresh<L>(&self, owner_key: &str, loader: &L) -> Result<Option<Arc<PublicKeysEntry>>>
	where
		L: KeyLoader,
	{
		let outcome = match self.in_flight.claim(owner_key) {
			Claim::Runner(ticket) => {
				let outcome = self.load_once(owner_key, loader).await;

				ticket.complete(outcome)
			},
			Claim::Waiter(waiter) => {
				tracing::debug!("waiting on refresh started by another caller");

				self.metrics.record_coalesced(owner_key);

				waiter
					.wait()
					.await
					.ok_or_else(|| Error::RefreshAbandoned { owner_key: owner_key.to_owned() })?
			},
		};

		outcome.map_err(|source| Error::Load { owner_key: owner_key.to_owned(), source })
	}

	// The gate is re-checked here against the freshest entry; another refresh may have completed
	// since the caller's own check.
	async fn load_once<L>(&self, owner_key: &str, loader: &L) -> SharedOutcome
	where
		L: KeyLoader,
	{
		let entry = self.store.get(owner_key).await.map_err(Arc::new)?;
		let now = self.clock.now_secs();

		if !self.may_load(entry.as_deref(), now) {
			tracing::debug!("keys were refreshed within the rate-limit window; reusing them");

			return Ok(entry);
		}

		let started = Instant::now();
		let keys = match loader.load_keys(owner_key).await {
			Ok(keys) => keys,
			Err(err) => {
				tracing::debug!(error = %err, "loading public keys failed");

				self.metrics.record_load_error(owner_key);

				return Err(Arc::new(err));
			},
		};

		tracing::debug!(
			kids = ?keys.kids().collect::<Vec<_>>(),
			"public keys retrieved successfully"
		);

		let entry = Arc::new(PublicKeysEntry::new(now, keys));

		if let Err(err) = self.store.put(owner_key, entry.clone()).await {
			tracing::debug!(error = %err, "storing refreshed public keys failed");

			self.metrics.record_load_error(owner_key);

			return Err(Arc::new(err));
		}

		self.metrics.record_load_success(owner_key, started.elapsed());

		Ok(Some(entry))
	}

	// An owner never loaded before is always allowed to load.
	fn may_load(&self, entry: Option<&PublicKeysEntry>, now: i64) -> bool {
		match entry {
			Some(entry) => now > entry.last_request_time().saturating_add(self.config.min_secs()),
			None => true,
		}
	}
}

/// Builder for [`KeyCacheCoordinator`].
#[derive(Debug)]
pub struct CoordinatorBuilder<S = MemoryKeyStore, C = SystemClock> {
	config: CoordinatorConfig,
	store: S,
	clock: C,
}
impl CoordinatorBuilder {
	/// Create a builder with default configuration, an in-memory store and the system clock.
	pub fn new() -> Self {
		Self { config: CoordinatorConfig::default(), store: MemoryKeyStore::new(), clock: SystemClock }
	}
}
impl Default for CoordinatorBuilder {
	fn default() -> Self {
		Self::new()
	}
}
impl<S, C> CoordinatorBuilder<S, C> {
	/// Override the minimum interval between two loads for the same owner.
	pub fn min_time_between_requests(mut self, value: Duration) -> Self {
		self.config.min_time_between_requests = value;

		self
	}

	/// Replace the whole configuration.
	pub fn config(mut self, config: CoordinatorConfig) -> Self {
		self.config = config;

		self
	}

	/// Use a different backing store.
	pub fn store<S2>(self, store: S2) -> CoordinatorBuilder<S2, C>
	where
		S2: KeyStore,
	{
		CoordinatorBuilder { config: self.config, store, clock: self.clock }
	}

	/// Use a different time source.
	pub fn clock<C2>(self, clock: C2) -> CoordinatorBuilder<S, C2>
	where
		C2: Clock,
	{
		CoordinatorBuilder { config: self.config, store: self.store, clock }
	}

	/// Validate the configuration and construct the coordinator.
	pub fn build(self) -> Result<KeyCacheCoordinator<S, C>>
	where
		S: KeyStore,
		C: Clock,
	{
		self.config.validate()?;

		Ok(KeyCacheCoordinator {
			store: self.store,
			clock: self.clock,
			config: Arc::new(self.config),
			in_flight: Arc::new(InFlight::default()),
			metrics: CoordinatorMetrics::new(),
		})
	}
}
