//! Backing stores holding one [`PublicKeysEntry`] per owner.

// std
use std::{collections::HashMap, future::Future};
// crates.io
#[cfg(feature = "redis")] use redis::AsyncCommands;
use tokio::sync::RwLock;
// self
use crate::{_prelude::*, cache::entry::PublicKeysEntry};

/// Shared mapping from owner key to the latest key snapshot.
///
/// `put` is an unconditional overwrite (last writer wins). Implementations may be shared across
/// processes; a put only needs to become visible to later gets eventually.
pub trait KeyStore: Send + Sync {
	/// Read the entry stored for `owner_key`.
	fn get(
		&self,
		owner_key: &str,
	) -> impl Future<Output = Result<Option<Arc<PublicKeysEntry>>>> + Send;

	/// Replace the entry stored for `owner_key`.
	fn put(
		&self,
		owner_key: &str,
		entry: Arc<PublicKeysEntry>,
	) -> impl Future<Output = Result<()>> + Send;
}
impl<S> KeyStore for Arc<S>
where
	S: KeyStore,
{
	fn get(
		&self,
		owner_key: &str,
	) -> impl Future<Output = Result<Option<Arc<PublicKeysEntry>>>> + Send {
		(**self).get(owner_key)
	}

	fn put(
		&self,
		owner_key: &str,
		entry: Arc<PublicKeysEntry>,
	) -> impl Future<Output = Result<()>> + Send {
		(**self).put(owner_key, entry)
	}
}

/// In-process store; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryKeyStore {
	entries: Arc<RwLock<HashMap<String, Arc<PublicKeysEntry>>>>,
}
impl MemoryKeyStore {
	/// Create an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of owners with a stored entry.
	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	/// Whether no entry has been stored yet.
	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}

	/// Drop the entry for `owner_key`, returning whether one existed.
	pub async fn remove(&self, owner_key: &str) -> bool {
		self.entries.write().await.remove(owner_key).is_some()
	}
}
impl KeyStore for MemoryKeyStore {
	async fn get(&self, owner_key: &str) -> Result<Option<Arc<PublicKeysEntry>>> {
		Ok(self.entries.read().await.get(owner_key).cloned())
	}

	async fn put(&self, owner_key: &str, entry: Arc<PublicKeysEntry>) -> Result<()> {
		self.entries.write().await.insert(owner_key.to_owned(), entry);

		Ok(())
	}
}

/// Redis-backed store sharing entries across processes.
///
/// Entries are stored as JSON under `<namespace>:<owner_key>`.
#[cfg(feature = "redis")]
#[derive(Clone, Debug)]
pub struct RedisKeyStore {
	client: redis::Client,
	namespace: Arc<str>,
	ttl: Option<Duration>,
}
#[cfg(feature = "redis")]
impl RedisKeyStore {
	/// Default key namespace.
	pub const DEFAULT_NAMESPACE: &'static str = "keys-cache";

	/// Wrap a Redis client using the default namespace and no expiry.
	pub fn new(client: redis::Client) -> Self {
		Self { client, namespace: Arc::from(Self::DEFAULT_NAMESPACE), ttl: None }
	}

	/// Adjust the key namespace.
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Arc::from(namespace.into());

		self
	}

	/// Expire stored entries after `ttl`, rounded up to at least one second.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = Some(ttl);

		self
	}

	fn key(&self, owner_key: &str) -> String {
		format!("{}:{owner_key}", self.namespace)
	}
}
#[cfg(feature = "redis")]
impl KeyStore for RedisKeyStore {
	async fn get(&self, owner_key: &str) -> Result<Option<Arc<PublicKeysEntry>>> {
		let mut conn = self.client.get_multiplexed_async_connection().await?;
		let value: Option<String> = conn.get(self.key(owner_key)).await?;

		match value {
			Some(json) => Ok(Some(Arc::new(serde_json::from_str(&json)?))),
			None => Ok(None),
		}
	}

	async fn put(&self, owner_key: &str, entry: Arc<PublicKeysEntry>) -> Result<()> {
		let mut conn = self.client.get_multiplexed_async_connection().await?;
		let key = self.key(owner_key);
		let payload = serde_json::to_string(&*entry)?;

		match self.ttl {
			Some(ttl) => conn.set_ex::<_, _, ()>(key, payload, ttl.as_secs().max(1)).await?,
			None => conn.set::<_, _, ()>(key, payload).await?,
		}

		Ok(())
	}
}
