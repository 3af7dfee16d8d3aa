//! JWKS loading over HTTP through the coordinator.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use keys_cache::{Error, HttpJwksLoader, ManualClock, OwnerKey, Result};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};
// self
use crate::common;

const JWKS_BODY: &str = r#"{
    "keys": [
        {
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "kid": "primary",
            "n": "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyAhIiMkJSYnKCkqKywtLi8wMTIzNDU2Nzg5Ojs8PT4_QEFCQ0RFRkdISUpLTE1OT1BRUlNUVVZXWFlaW1xdXl9gYWJjZGVmZ2hpamtsbW5vcHFyc3R1dnd4eXp7fH1-f4A",
            "e": "AQAB"
        },
        {
            "kty": "oct",
            "kid": "secondary",
            "k": "c2VjcmV0LWtleS1tYXRlcmlhbA"
        }
    ]
}"#;
const JWKS_PATH: &str = "/realms/realm-1/protocol/openid-connect/certs";

fn loader(server: &MockServer) -> HttpJwksLoader {
	HttpJwksLoader::new(format!("{}{}", server.uri(), JWKS_PATH))
		.expect("loader")
		.with_require_https(false)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lookups_fetch_jwks_once() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(JWKS_PATH))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_string(JWKS_BODY)
				.insert_header("content-type", "application/json")
				.set_delay(Duration::from_millis(200)),
		)
		.expect(1)
		.mount(&server)
		.await;

	let clock = ManualClock::new(1_000);
	let coordinator = Arc::new(common::coordinator(&clock, 10));
	let loader = Arc::new(loader(&server));
	let owner = OwnerKey::identity_provider("realm-1", "corp-oidc");
	let mut handles = Vec::new();

	for kid in ["primary", "secondary", "primary", "secondary"] {
		let coordinator = coordinator.clone();
		let loader = loader.clone();
		let owner = owner.clone();

		handles.push(tokio::spawn(async move {
			coordinator.lookup(owner.as_str(), Some(kid), &*loader).await
		}));
	}

	for handle in handles {
		assert!(handle.await.expect("join")?.is_some());
	}

	let entry = coordinator.cached_entry(owner.as_str()).await?.expect("entry");

	assert_eq!(entry.current_keys().kids().collect::<Vec<_>>(), vec![
		Some("primary"),
		Some("secondary")
	]);

	server.verify().await;

	Ok(())
}

#[tokio::test]
async fn upstream_error_surfaces_as_load_failure() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(JWKS_PATH))
		.respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
		.expect(1)
		.mount(&server)
		.await;

	let clock = ManualClock::new(1_000);
	let coordinator = common::coordinator(&clock, 10);
	let err = coordinator
		.lookup("realm-1::idp::corp", Some("primary"), &loader(&server))
		.await
		.expect_err("load failure");

	match err {
		Error::Load { source, .. } => assert!(matches!(
			&*source,
			Error::HttpStatus { status, body: Some(body), .. }
				if status.as_u16() == 503 && body == "maintenance"
		)),
		other => panic!("expected load failure, got {other:?}"),
	}

	assert!(coordinator.cached_entry("realm-1::idp::corp").await.expect("store").is_none());

	server.verify().await;
}

#[tokio::test]
async fn oversized_document_is_rejected() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(JWKS_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_string(JWKS_BODY))
		.mount(&server)
		.await;

	let clock = ManualClock::new(1_000);
	let coordinator = common::coordinator(&clock, 10);
	let small = loader(&server).with_max_response_bytes(64);
	let err = coordinator.lookup("owner", None, &small).await.expect_err("too large");

	assert!(matches!(
		err,
		Error::Load { ref source, .. }
			if matches!(&**source, Error::Validation { field: "max_response_bytes", .. })
	));
}

#[tokio::test]
async fn insecure_endpoint_is_refused_by_default() {
	let server = MockServer::start().await;
	let clock = ManualClock::new(1_000);
	let coordinator = common::coordinator(&clock, 10);
	let strict = HttpJwksLoader::new(format!("{}{}", server.uri(), JWKS_PATH)).expect("loader");
	let err = coordinator.lookup("owner", None, &strict).await.expect_err("http refused");

	assert!(matches!(
		err,
		Error::Load { ref source, .. } if matches!(&**source, Error::Security(_))
	));
}

#[tokio::test]
async fn any_success_status_is_accepted() -> Result<()> {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(JWKS_PATH))
		.respond_with(ResponseTemplate::new(203).set_body_string(JWKS_BODY))
		.expect(1)
		.mount(&server)
		.await;

	let clock = ManualClock::new(1_000);
	let coordinator = common::coordinator(&clock, 10);
	let key = coordinator.lookup("owner", Some("secondary"), &loader(&server)).await?;

	assert_eq!(key.as_ref().and_then(|key| key.key_id()), Some("secondary"));

	server.verify().await;

	Ok(())
}
