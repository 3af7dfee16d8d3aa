//! Coordinator configuration and validation.

// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::_prelude::*;

/// Default minimum interval between two loads for the same owner.
pub const DEFAULT_MIN_TIME_BETWEEN_REQUESTS: Duration = Duration::from_secs(10);

/// Settings governing a [`KeyCacheCoordinator`](crate::KeyCacheCoordinator).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
	/// Minimum time between two loads for the same owner, in whole seconds.
	///
	/// A lookup at `t` whose entry was produced at `last` may only load when
	/// `t > last + min_time_between_requests`.
	#[serde(default = "default_min_time_between_requests")]
	pub min_time_between_requests: Duration,
}
impl CoordinatorConfig {
	/// Construct a configuration with the given minimum interval.
	pub fn new(min_time_between_requests: Duration) -> Self {
		Self { min_time_between_requests }
	}

	/// Validate the configuration against the documented constraints.
	pub fn validate(&self) -> Result<()> {
		if self.min_time_between_requests.subsec_nanos() != 0 {
			return Err(Error::Validation {
				field: "min_time_between_requests",
				reason: "Must be a whole number of seconds.".into(),
			});
		}

		Ok(())
	}

	pub(crate) fn min_secs(&self) -> i64 {
		i64::try_from(self.min_time_between_requests.as_secs()).unwrap_or(i64::MAX)
	}
}
impl Default for CoordinatorConfig {
	fn default() -> Self {
		Self { min_time_between_requests: DEFAULT_MIN_TIME_BETWEEN_REQUESTS }
	}
}

fn default_min_time_between_requests() -> Duration {
	DEFAULT_MIN_TIME_BETWEEN_REQUESTS
}
