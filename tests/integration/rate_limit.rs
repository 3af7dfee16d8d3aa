//! Rate limiting and kid resolution across refreshes.

// crates.io
use keys_cache::{KeyStore, ManualClock, OwnerKey, PublicKeysEntry, Result};
// self
use crate::common::{self, GatedLoader};

#[tokio::test]
async fn stale_entry_is_served_until_window_elapses() -> Result<()> {
	let clock = ManualClock::new(0);
	let coordinator = common::coordinator(&clock, 10);
	let owner = OwnerKey::client("realm-1", "app");
	let first = GatedLoader::ready(&["x"]);
	let kx = coordinator.lookup(owner.as_str(), Some("x"), &first).await?.expect("kx");
	let entry = coordinator.cached_entry(owner.as_str()).await?.expect("entry");

	assert_eq!(kx.key_id(), Some("x"));
	assert_eq!(first.calls(), 1);
	assert_eq!(entry.last_request_time(), 0);
	assert_eq!(entry.current_keys().kids().collect::<Vec<_>>(), vec![Some("x")]);

	clock.set(5);

	let second = GatedLoader::ready(&["y"]);

	assert!(coordinator.lookup(owner.as_str(), Some("y"), &second).await?.is_none());
	assert_eq!(second.calls(), 0);

	clock.set(11);

	let third = GatedLoader::ready(&["y"]);
	let ky = coordinator.lookup(owner.as_str(), Some("y"), &third).await?.expect("ky");

	assert_eq!(ky.key_id(), Some("y"));
	assert_eq!(third.calls(), 1);

	let entry = coordinator.cached_entry(owner.as_str()).await?.expect("entry");

	assert_eq!(entry.last_request_time(), 11);
	assert!(entry.resolve(Some("x")).is_none(), "refresh must not merge kid sets");

	Ok(())
}

#[tokio::test]
async fn known_kid_is_served_regardless_of_window() -> Result<()> {
	let clock = ManualClock::new(100);
	let coordinator = common::coordinator(&clock, 10);
	let loader = GatedLoader::ready(&["A", "B"]);

	let a = coordinator.lookup("owner", Some("A"), &loader).await?.expect("A");

	clock.set(101);

	let b = coordinator.lookup("owner", Some("B"), &loader).await?.expect("B");
	let any = coordinator.lookup("owner", None, &loader).await?.expect("fallback");

	assert_eq!(a.key_id(), Some("A"));
	assert_eq!(b.key_id(), Some("B"));
	assert_eq!(any.key_id(), Some("A"));
	assert_eq!(loader.calls(), 1);

	Ok(())
}

#[tokio::test]
async fn zero_interval_reloads_on_every_later_second() -> Result<()> {
	let clock = ManualClock::new(10);
	let coordinator = common::coordinator(&clock, 0);
	let loader = GatedLoader::ready(&["a"]);

	coordinator.lookup("owner", Some("missing"), &loader).await?;
	coordinator.lookup("owner", Some("missing"), &loader).await?;

	assert_eq!(loader.calls(), 1);

	clock.set(11);
	coordinator.lookup("owner", Some("missing"), &loader).await?;

	assert_eq!(loader.calls(), 2);

	Ok(())
}

#[tokio::test]
async fn entries_written_by_others_are_respected() -> Result<()> {
	let clock = ManualClock::new(500);
	let coordinator = common::coordinator(&clock, 10);
	let loader = GatedLoader::ready(&["mine"]);

	// Another process sharing the store refreshed this owner moments ago.
	coordinator
		.store()
		.put("owner", PublicKeysEntry::new(495, common::key_set(&["theirs"])).into())
		.await?;

	assert!(coordinator.lookup("owner", Some("mine"), &loader).await?.is_none());
	assert!(coordinator.lookup("owner", Some("theirs"), &loader).await?.is_some());
	assert_eq!(loader.calls(), 0);
	assert_eq!(coordinator.metrics().snapshot().rate_limited, 1);

	Ok(())
}
