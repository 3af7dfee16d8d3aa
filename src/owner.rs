//! Owner key construction for clients and identity providers.

// std
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Opaque key identifying the entity whose keys are cached.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerKey(String);
impl OwnerKey {
	/// Key for a client registered in `realm_id`: `<realm>::client::<client_id>`.
	pub fn client(realm_id: &str, client_id: &str) -> Self {
		Self(format!("{realm_id}::client::{client_id}"))
	}

	/// Key for an identity provider configured in `realm_id`: `<realm>::idp::<internal_id>`.
	pub fn identity_provider(realm_id: &str, idp_internal_id: &str) -> Self {
		Self(format!("{realm_id}::idp::{idp_internal_id}"))
	}

	/// Borrow the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for OwnerKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Display for OwnerKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl From<String> for OwnerKey {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<OwnerKey> for String {
	fn from(value: OwnerKey) -> Self {
		value.0
	}
}
