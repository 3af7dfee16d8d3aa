//! Loader fetching a JWKS document over HTTP.

// crates.io
use jsonwebtoken::jwk::JwkSet;
use reqwest::{Client, redirect::Policy};
use tokio::time::Instant;
use url::Url;
// self
use crate::{_prelude::*, cache::entry::KeySet, loader::KeyLoader};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default size guard (1 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 1_048_576;
/// Maximum redirect depth.
pub const MAX_REDIRECTS: usize = 10;

/// Fetches the keys of one owner from a JWKS endpoint.
///
/// Every JWK in the document is keyed by its own `kid`.
///
/// The URL must carry a host at construction. The remaining settings are checked on every fetch,
/// so a misconfigured loader only fails inside a refresh and reaches callers as [`Error::Load`]
/// wrapping [`Error::Security`] or [`Error::Validation`]. Call [`HttpJwksLoader::validate`] once
/// the loader is configured to report such faults up front.
#[derive(Clone, Debug)]
pub struct HttpJwksLoader {
	client: Client,
	jwks_url: Url,
	require_https: bool,
	timeout: Duration,
	max_response_bytes: u64,
}
impl HttpJwksLoader {
	/// Build a loader for `jwks_url` with the default reqwest client.
	pub fn new(jwks_url: impl AsRef<str>) -> Result<Self> {
		let client = Client::builder()
			.redirect(Policy::limited(MAX_REDIRECTS))
			.user_agent(format!("keys-cache/{}", env!("CARGO_PKG_VERSION")))
			.connect_timeout(Duration::from_secs(5))
			.build()?;

		Self::with_client(jwks_url, client)
	}

	/// Build a loader using the supplied HTTP client.
	pub fn with_client(jwks_url: impl AsRef<str>, client: Client) -> Result<Self> {
		let jwks_url = Url::parse(jwks_url.as_ref())?;

		if jwks_url.host_str().is_none() {
			return Err(missing_host());
		}

		Ok(Self {
			client,
			jwks_url,
			require_https: true,
			timeout: DEFAULT_TIMEOUT,
			max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
		})
	}

	/// Set HTTPS requirement to the desired value.
	pub fn with_require_https(mut self, require_https: bool) -> Self {
		self.require_https = require_https;

		self
	}

	/// Override the per-request timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Override the response size guard.
	pub fn with_max_response_bytes(mut self, max_response_bytes: u64) -> Self {
		self.max_response_bytes = max_response_bytes;

		self
	}

	/// Endpoint this loader fetches.
	pub fn jwks_url(&self) -> &Url {
		&self.jwks_url
	}

	/// Validate the loader settings.
	pub fn validate(&self) -> Result<()> {
		if self.require_https && self.jwks_url.scheme() != "https" {
			return Err(Error::Security(format!("Upstream URL {} must use HTTPS.", self.jwks_url)));
		}
		if self.jwks_url.host_str().is_none() {
			return Err(missing_host());
		}
		if self.timeout < Duration::from_millis(100) {
			return Err(Error::Validation {
				field: "timeout",
				reason: "Must be at least 100 ms.".into(),
			});
		}
		if self.max_response_bytes == 0 {
			return Err(Error::Validation {
				field: "max_response_bytes",
				reason: "Must be greater than zero.".into(),
			});
		}

		Ok(())
	}

	async fn fetch(&self, owner_key: &str) -> Result<KeySet> {
		self.validate()?;

		let start = Instant::now();
		let response =
			self.client.get(self.jwks_url.clone()).timeout(self.timeout).send().await?;
		let status = response.status();

		if !status.is_success() {
			let body = response.text().await.ok();

			return Err(Error::HttpStatus { status, url: self.jwks_url.clone(), body });
		}
		if let Some(length) = response.content_length()
			&& length > self.max_response_bytes
		{
			return Err(self.oversized(length));
		}

		let bytes = response.bytes().await?;

		if bytes.len() as u64 > self.max_response_bytes {
			return Err(self.oversized(bytes.len() as u64));
		}

		let jwks: JwkSet = serde_json::from_slice(&bytes)?;
		let keys = KeySet::from_jwk_set(jwks);

		tracing::debug!(
			owner_key,
			url = %self.jwks_url,
			status = %status,
			keys = keys.len(),
			elapsed = ?start.elapsed(),
			"jwks fetch complete"
		);

		Ok(keys)
	}

	fn oversized(&self, size: u64) -> Error {
		Error::Validation {
			field: "max_response_bytes",
			reason: format!(
				"Response size {size} bytes exceeds the configured guard of {limit} bytes.",
				limit = self.max_response_bytes
			),
		}
	}
}
impl KeyLoader for HttpJwksLoader {
	async fn load_keys(&self, owner_key: &str) -> Result<KeySet> {
		self.fetch(owner_key).await
	}
}

fn missing_host() -> Error {
	Error::Validation { field: "jwks_url", reason: "Must include a host component.".into() }
}
