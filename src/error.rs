//! Crate-wide error types and `Result` alias.

// self
use crate::_prelude::*;

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the keys cache crate.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),

	#[cfg(feature = "redis")]
	#[error(transparent)]
	Redis(#[from] redis::RedisError),

	#[error("Upstream HTTP status {status} from {url}: {body:?}")]
	HttpStatus { status: http::StatusCode, url: url::Url, body: Option<String> },
	/// The loader failed; every caller coalesced onto the same refresh receives the same source.
	#[error("Error when loading public keys for '{owner_key}': {source}")]
	Load {
		owner_key: String,
		#[source]
		source: Arc<Error>,
	},
	#[error("Metrics error: {0}")]
	Metrics(String),
	/// The caller running a refresh was dropped before publishing a result.
	#[error("Refresh of public keys for '{owner_key}' was abandoned before completing.")]
	RefreshAbandoned { owner_key: String },
	#[error("Security violation: {0}")]
	Security(String),
	#[error("Store error: {0}")]
	Store(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
impl Error {
	/// Whether this error reports a loader failure rather than a store or configuration problem.
	pub fn is_load_failure(&self) -> bool {
		matches!(self, Self::Load { .. } | Self::RefreshAbandoned { .. })
	}
}
