// std
use std::{sync::Arc, time::Duration};
// crates.io
use reqwest::Client;
use serde_json::json;
use tokeninfo_gateway::{
	ComponentState, Error, Result, RevocationCache, RevocationKind,
	http::{client::JsonFetcher, retry::RetryPolicy},
	schedule::Scheduler,
	security::RevocationHasher,
};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};
// self
use crate::common::{self, REVOCATIONS_PATH};

fn cache(server: &MockServer, max_age: Duration) -> Result<RevocationCache> {
	let fetcher =
		JsonFetcher::new(Client::new(), RetryPolicy::single_attempt(Duration::from_secs(2)))?;

	Ok(RevocationCache::new(
		common::url(server, REVOCATIONS_PATH),
		fetcher,
		RevocationHasher::new("integration-salt")?,
		max_age,
	))
}

async fn mount_once(server: &MockServer, revocations: serde_json::Value) {
	Mock::given(method("GET"))
		.and(path(REVOCATIONS_PATH))
		.respond_with(
			ResponseTemplate::new(200).set_body_json(json!({ "revocations": revocations })),
		)
		.up_to_n_times(1)
		.mount(server)
		.await;
}

#[tokio::test]
async fn background_refresh_picks_up_new_revocations() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	mount_once(&server, json!([])).await;
	common::mount_revocations(&server, json!([{ "type": "CLAIM", "name": "sub", "value": "alice" }]))
		.await;

	let cache = Arc::new(cache(&server, Duration::from_secs(60))?);
	let sub = RevocationKind::Claim("sub".into());

	cache.refresh().await?;

	assert!(!cache.is_revoked("alice", &sub)?);

	let scheduler = Scheduler::new();

	scheduler.spawn(cache.clone(), Duration::from_millis(50));

	let revoked = tokio::time::timeout(Duration::from_secs(5), async {
		loop {
			if cache.is_revoked("alice", &sub).unwrap_or(false) {
				break;
			}

			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await;

	assert!(revoked.is_ok(), "background refresh never installed the revocation");
	assert!(!cache.is_revoked("bob", &sub)?);

	scheduler.shutdown().await;

	Ok(())
}

#[tokio::test]
async fn failed_refreshes_keep_answering_until_the_snapshot_goes_stale() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	mount_once(&server, json!([{ "type": "TOKEN", "value": "revoked-token" }])).await;
	Mock::given(method("GET"))
		.and(path(REVOCATIONS_PATH))
		.respond_with(ResponseTemplate::new(503))
		.mount(&server)
		.await;

	let cache = cache(&server, Duration::from_millis(300))?;

	cache.refresh().await?;

	assert!(cache.refresh().await.is_err());
	assert!(cache.is_revoked("revoked-token", &RevocationKind::Token)?);
	assert!(!cache.is_revoked("other-token", &RevocationKind::Token)?);
	assert_eq!(cache.status().state, ComponentState::Ready);

	tokio::time::sleep(Duration::from_millis(400)).await;

	assert!(matches!(
		cache.is_revoked("other-token", &RevocationKind::Token),
		Err(Error::RevocationStale { age: Some(_) })
	));

	let status = cache.status();

	assert_eq!(status.state, ComponentState::Stale);
	assert_eq!(status.refresh_successes, 1);
	assert_eq!(status.refresh_errors, 1);

	Ok(())
}

#[tokio::test]
async fn unknown_record_types_are_ignored() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	common::mount_revocations(
		&server,
		json!([
			{ "type": "SESSION", "value": "ignored" },
			{ "type": "GLOBAL", "issued_before": 1_000 }
		]),
	)
	.await;

	let cache = cache(&server, Duration::from_secs(60))?;

	cache.refresh().await?;

	assert!(cache.is_revoked("999", &RevocationKind::Global)?);
	assert!(!cache.is_revoked("1000", &RevocationKind::Global)?);

	Ok(())
}
