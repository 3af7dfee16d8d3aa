//! Loader capability producing fresh key sets for an owner.

// std
use std::future::Future;
// self
use crate::{_prelude::*, cache::entry::KeySet};

/// Retrieves the current keys of an owner from their authoritative source.
///
/// The coordinator calls a loader at most once per coalescing window, never concurrently for the
/// same owner key, and never retries it within a single lookup. Timeouts are the loader's concern.
pub trait KeyLoader: Send + Sync {
	/// Load every key currently published for `owner_key`.
	fn load_keys(&self, owner_key: &str) -> impl Future<Output = Result<KeySet>> + Send;
}
impl<F, Fut> KeyLoader for F
where
	F: Fn(&str) -> Fut + Send + Sync,
	Fut: Future<Output = Result<KeySet>> + Send,
{
	fn load_keys(&self, owner_key: &str) -> impl Future<Output = Result<KeySet>> + Send {
		self(owner_key)
	}
}
