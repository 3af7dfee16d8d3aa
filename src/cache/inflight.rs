//! In-flight refresh registry.
//!
//! Each owner key maps to at most one pending refresh. The first caller to claim a key becomes its
//! runner and publishes the outcome into a write-once cell; every other caller subscribes to that
//! cell and waits for the outcome instead of loading.

// std
use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard, PoisonError},
};
// crates.io
use tokio::sync::watch;
// self
use crate::{_prelude::*, cache::entry::PublicKeysEntry};

/// Outcome of one refresh, shared by every caller coalesced onto it.
pub(crate) type SharedOutcome = std::result::Result<Option<Arc<PublicKeysEntry>>, Arc<Error>>;

type Cell = watch::Receiver<Option<SharedOutcome>>;

/// Registry of refreshes currently running, keyed by owner key.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
	pending: Mutex<HashMap<String, Cell>>,
}
impl InFlight {
	/// Atomically claim the refresh for `owner_key`, or join the one already running.
	pub(crate) fn claim(&self, owner_key: &str) -> Claim<'_> {
		let mut pending = self.lock();

		if let Some(cell) = pending.get(owner_key) {
			return Claim::Waiter(Waiter { cell: cell.clone() });
		}

		let (tx, cell) = watch::channel(None);

		pending.insert(owner_key.to_owned(), cell);

		Claim::Runner(RefreshTicket { registry: self, owner_key: owner_key.to_owned(), tx })
	}

	/// Number of refreshes currently registered.
	pub(crate) fn len(&self) -> usize {
		self.lock().len()
	}

	fn release(&self, owner_key: &str) {
		self.lock().remove(owner_key);
	}

	// Critical sections never panic, so a poisoned map is still consistent.
	fn lock(&self) -> MutexGuard<'_, HashMap<String, Cell>> {
		self.pending.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// Result of [`InFlight::claim`].
#[derive(Debug)]
pub(crate) enum Claim<'a> {
	/// This caller registered the refresh and must run it.
	Runner(RefreshTicket<'a>),
	/// Another caller is already running the refresh.
	Waiter(Waiter),
}

/// Ownership of a registered refresh.
///
/// Dropping the ticket removes the registration, whether or not an outcome was published.
#[derive(Debug)]
pub(crate) struct RefreshTicket<'a> {
	registry: &'a InFlight,
	owner_key: String,
	tx: watch::Sender<Option<SharedOutcome>>,
}
impl RefreshTicket<'_> {
	/// Publish the outcome to every waiter and release the registration.
	pub(crate) fn complete(self, outcome: SharedOutcome) -> SharedOutcome {
		self.tx.send_replace(Some(outcome.clone()));

		outcome
	}
}
impl Drop for RefreshTicket<'_> {
	fn drop(&mut self) {
		self.registry.release(&self.owner_key);
	}
}

/// Subscription to a refresh run by another caller.
#[derive(Debug)]
pub(crate) struct Waiter {
	cell: Cell,
}
impl Waiter {
	/// Wait for the runner's outcome; `None` when the runner went away without publishing one.
	pub(crate) async fn wait(mut self) -> Option<SharedOutcome> {
		self.cell.wait_for(Option::is_some).await.ok().and_then(|outcome| outcome.clone())
	}
}
