//! Cached key snapshots and kid resolution.

// std
use std::collections::{BTreeMap, btree_map::Iter};
// crates.io
use jsonwebtoken::jwk::{Jwk, JwkSet};
use serde::{Deserialize, Serialize};
// self
use crate::_prelude::*;

/// Shared handle over public key material; the cache never inspects it.
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey(Arc<Jwk>);
impl PublicKey {
	/// Wrap a JWK.
	pub fn new(jwk: Jwk) -> Self {
		Self(Arc::new(jwk))
	}

	/// Borrow the underlying JWK.
	pub fn jwk(&self) -> &Jwk {
		&self.0
	}

	/// The `kid` advertised inside the JWK itself, if any.
	pub fn key_id(&self) -> Option<&str> {
		self.0.common.key_id.as_deref()
	}

	/// Whether both handles point at the same allocation.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}
impl From<Jwk> for PublicKey {
	fn from(value: Jwk) -> Self {
		Self::new(value)
	}
}

/// Mapping from kid to public key.
///
/// Ordered so that the absent kid sorts first, followed by kids in lexicographic order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<KeySlot>", into = "Vec<KeySlot>")]
pub struct KeySet {
	keys: BTreeMap<Option<String>, PublicKey>,
}
impl KeySet {
	/// Create an empty key set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a key set from a JWKS document, keying each JWK by its own `kid`.
	///
	/// Later JWKs replace earlier ones sharing the same `kid`.
	pub fn from_jwk_set(jwks: JwkSet) -> Self {
		jwks.keys.into_iter().map(|jwk| (jwk.common.key_id.clone(), PublicKey::new(jwk))).collect()
	}

	/// Insert a key, returning the one it replaced.
	pub fn insert(&mut self, kid: Option<String>, key: impl Into<PublicKey>) -> Option<PublicKey> {
		self.keys.insert(kid, key.into())
	}

	/// Builder-style insert under a concrete kid.
	pub fn with_key(mut self, kid: impl Into<String>, key: impl Into<PublicKey>) -> Self {
		self.insert(Some(kid.into()), key);

		self
	}

	/// Resolve a kid against this set.
	///
	/// An absent `kid` on a non-empty set selects a single key for callers that never send one:
	/// the key stored without a kid when present, otherwise the key with the smallest kid. A
	/// concrete `kid` only ever matches exactly.
	pub fn resolve(&self, kid: Option<&str>) -> Option<&PublicKey> {
		match kid {
			None => self.keys.first_key_value().map(|(_, key)| key),
			Some(kid) => self.keys.get(&Some(kid.to_owned())),
		}
	}

	/// Kids present in this set, in resolution order.
	pub fn kids(&self) -> impl Iterator<Item = Option<&str>> {
		self.keys.keys().map(Option::as_deref)
	}

	/// Iterate over `(kid, key)` pairs.
	pub fn iter(&self) -> Iter<'_, Option<String>, PublicKey> {
		self.keys.iter()
	}

	/// Number of keys held.
	pub fn len(&self) -> usize {
		self.keys.len()
	}

	/// Whether the set holds no keys.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}
}
impl FromIterator<(Option<String>, PublicKey)> for KeySet {
	fn from_iter<T>(iter: T) -> Self
	where
		T: IntoIterator<Item = (Option<String>, PublicKey)>,
	{
		Self { keys: iter.into_iter().collect() }
	}
}
impl From<JwkSet> for KeySet {
	fn from(value: JwkSet) -> Self {
		Self::from_jwk_set(value)
	}
}
impl From<Vec<KeySlot>> for KeySet {
	fn from(value: Vec<KeySlot>) -> Self {
		value.into_iter().map(|slot| (slot.kid, PublicKey::new(slot.jwk))).collect()
	}
}
impl From<KeySet> for Vec<KeySlot> {
	fn from(value: KeySet) -> Self {
		value
			.keys
			.into_iter()
			.map(|(kid, key)| KeySlot { kid, jwk: Jwk::clone(&key.0) })
			.collect()
	}
}

/// Serialized form of a single [`KeySet`] slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeySlot {
	#[serde(default)]
	kid: Option<String>,
	jwk: Jwk,
}

/// Immutable snapshot of the keys loaded for one owner.
///
/// A refresh always produces a new entry; kid sets of successive entries are never merged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicKeysEntry {
	last_request_time: i64,
	current_keys: KeySet,
}
impl PublicKeysEntry {
	/// Create an entry produced at `last_request_time` seconds.
	pub fn new(last_request_time: i64, current_keys: KeySet) -> Self {
		Self { last_request_time, current_keys }
	}

	/// Clock reading, in seconds, at which this snapshot was loaded.
	pub fn last_request_time(&self) -> i64 {
		self.last_request_time
	}

	/// Keys captured in this snapshot.
	pub fn current_keys(&self) -> &KeySet {
		&self.current_keys
	}

	/// Resolve a kid against this snapshot; see [`KeySet::resolve`].
	pub fn resolve(&self, kid: Option<&str>) -> Option<&PublicKey> {
		self.current_keys.resolve(kid)
	}
}
