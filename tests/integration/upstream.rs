// std
use std::time::Duration;
// crates.io
use serde_json::json;
use tokeninfo_gateway::{Disposition, Error, Gateway, ProcessorKind, Rejection, Result, Settings};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{header, method, path},
};
// self
use crate::common::{self, TOKENINFO_PATH};

const SERVICES: &str = "https://services.example";

fn token(subject: &str) -> String {
	common::mint(json!({ "iss": SERVICES, "sub": subject }))
}

async fn mount_tokeninfo(server: &MockServer, response: ResponseTemplate, calls: u64) {
	Mock::given(method("GET"))
		.and(path(TOKENINFO_PATH))
		.respond_with(response)
		.expect(calls)
		.mount(server)
		.await;
}

#[tokio::test]
async fn disabled_cache_consults_upstream_every_time() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;
	let token = token("service-a");

	Mock::given(method("GET"))
		.and(path(TOKENINFO_PATH))
		.and(header("authorization", format!("Bearer {token}").as_str()))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"uid": "service-a",
			"scope": ["uid"],
			"expires_in": 600
		})))
		.expect(3)
		.mount(&server)
		.await;

	let settings = Settings { upstream_cache_max_size: 0, ..common::upstream_settings(&server) };
	let gateway = Gateway::start(settings).await?;

	for _ in 0..3 {
		let info = gateway.validate(&token).await?;

		assert_eq!(info.processor, ProcessorKind::Upstream);
		assert_eq!(info.subject.as_deref(), Some("service-a"));
	}

	assert!(gateway.upstream_cache().is_some_and(|cache| cache.is_empty()));

	server.verify().await;

	Ok(())
}

#[tokio::test]
async fn accepted_results_are_cached() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	mount_tokeninfo(
		&server,
		ResponseTemplate::new(200)
			.set_body_json(json!({ "uid": "service-a", "scope": "uid", "expires_in": 600 })),
		1,
	)
	.await;

	let gateway = Gateway::start(common::upstream_settings(&server)).await?;
	let token = token("service-a");
	let first = gateway.validate(&token).await?;
	let second = gateway.validate(&token).await?;

	assert_eq!(first.subject, second.subject);
	assert!(second.has_scope("uid"));
	assert_eq!(gateway.upstream_cache().map(|cache| cache.len()), Some(1));

	server.verify().await;

	Ok(())
}

#[tokio::test]
async fn unauthorized_and_inactive_tokens_are_rejected() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(TOKENINFO_PATH))
		.respond_with(ResponseTemplate::new(401))
		.up_to_n_times(1)
		.mount(&server)
		.await;
	mount_tokeninfo(&server, ResponseTemplate::new(200).set_body_json(json!({ "active": false })), 1)
		.await;

	let gateway = Gateway::start(common::upstream_settings(&server)).await?;

	for subject in ["unauthorized", "inactive"] {
		let err = gateway.validate(&token(subject)).await.unwrap_err();

		assert_eq!(err.rejection(), Some(&Rejection::Inactive));
		assert_eq!(err.disposition(), Disposition::Rejected);
	}

	assert_eq!(gateway.upstream_cache().map(|cache| cache.len()), Some(0));

	Ok(())
}

#[tokio::test]
async fn upstream_failures_are_indeterminate() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	mount_tokeninfo(&server, ResponseTemplate::new(502), 1).await;

	let gateway = Gateway::start(common::upstream_settings(&server)).await?;
	let err = gateway.validate(&token("service-a")).await.unwrap_err();

	assert!(matches!(err, Error::UpstreamUnavailable(_)));
	assert_eq!(err.disposition(), Disposition::Indeterminate);

	Ok(())
}

#[tokio::test]
async fn slow_upstream_times_out() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	mount_tokeninfo(
		&server,
		ResponseTemplate::new(200)
			.set_body_json(json!({ "uid": "service-a" }))
			.set_delay(Duration::from_secs(2)),
		1,
	)
	.await;

	let settings = Settings {
		upstream_timeout: Duration::from_millis(100),
		..common::upstream_settings(&server)
	};
	let gateway = Gateway::start(settings).await?;
	let err = gateway.validate(&token("service-a")).await.unwrap_err();

	assert!(matches!(err, Error::UpstreamUnavailable(_)));

	Ok(())
}

#[tokio::test]
async fn tokens_without_an_issuer_are_unsupported() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	mount_tokeninfo(&server, ResponseTemplate::new(200), 0).await;

	let gateway = Gateway::start(common::upstream_settings(&server)).await?;

	for raw in ["opaque-token", common::mint(json!({ "sub": "service-a" })).as_str()] {
		let err = gateway.validate(raw).await.unwrap_err();

		assert_eq!(err.rejection(), Some(&Rejection::UnsupportedToken { issuer: None }));
	}

	server.verify().await;

	Ok(())
}
