//! Coalescing, rate-limited public key cache keyed by owning entity and kid.
//!
//! A [`KeyCacheCoordinator`] sits in front of an expensive key retrieval (usually a JWKS fetch)
//! and guarantees that concurrent lookups for the same owner never trigger redundant loads, and
//! that loads for an owner are never attempted more often than the configured minimum interval.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod clock;
pub mod http;
pub mod loader;
pub mod metrics;
pub mod owner;

mod config;
mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use crate::{Error, Result};
}

#[cfg(feature = "redis")] pub use crate::cache::RedisKeyStore;
#[cfg(feature = "prometheus")] pub use crate::metrics::install_default_exporter;
pub use crate::{
	cache::{
		coordinator::{CoordinatorBuilder, KeyCacheCoordinator},
		entry::{KeySet, PublicKey, PublicKeysEntry},
		store::{KeyStore, MemoryKeyStore},
	},
	clock::{Clock, ManualClock, SystemClock},
	config::{CoordinatorConfig, DEFAULT_MIN_TIME_BETWEEN_REQUESTS},
	error::{Error, Result},
	http::jwks::HttpJwksLoader,
	loader::KeyLoader,
	owner::OwnerKey,
};
