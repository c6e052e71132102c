// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};
// crates.io
use reqwest::Client;
use serde_json::json;
use tokeninfo_gateway::{
	ComponentState, KeyStore, Result,
	http::{client::JsonFetcher, retry::RetryPolicy},
};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};
// self
use crate::common::{self, DISCOVERY_PATH, KEYS_PATH};

fn store(server: &MockServer) -> Result<KeyStore> {
	let fetcher =
		JsonFetcher::new(Client::new(), RetryPolicy::single_attempt(Duration::from_secs(2)))?;

	Ok(KeyStore::new(common::url(server, DISCOVERY_PATH), fetcher))
}

async fn mount_keys_once(server: &MockServer, keys: Vec<serde_json::Value>) {
	Mock::given(method("GET"))
		.and(path(KEYS_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
		.up_to_n_times(1)
		.mount(server)
		.await;
}

#[tokio::test]
async fn refresh_swaps_key_sets_atomically() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	common::mount_discovery(&server).await;
	mount_keys_once(&server, vec![common::oct_jwk("a", common::SECRET)]).await;
	common::mount_keys(
		&server,
		vec![common::oct_jwk("a", common::SECRET), common::oct_jwk("b", common::SECRET)],
	)
	.await;

	let store = Arc::new(store(&server)?);

	store.refresh().await?;

	assert_eq!(store.keys().len(), 1);

	let done = Arc::new(AtomicBool::new(false));
	let readers = (0..4)
		.map(|_| {
			let store = store.clone();
			let done = done.clone();

			tokio::spawn(async move {
				while !done.load(Ordering::Relaxed) {
					let keys = store.keys();

					assert!(keys.get("a").is_some(), "every snapshot carries the first key");
					assert!(matches!(keys.len(), 1 | 2));

					tokio::task::yield_now().await;
				}
			})
		})
		.collect::<Vec<_>>();

	store.refresh().await?;
	done.store(true, Ordering::Relaxed);

	for reader in readers {
		reader.await.expect("reader");
	}

	let keys = store.keys();

	assert_eq!(keys.len(), 2);
	assert!(keys.get("b").is_some());
	assert_eq!(store.status().refresh_successes, 2);

	Ok(())
}

#[tokio::test]
async fn failed_refresh_keeps_the_previous_snapshot() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	common::mount_discovery(&server).await;
	mount_keys_once(&server, vec![common::oct_jwk("a", common::SECRET)]).await;
	Mock::given(method("GET"))
		.and(path(KEYS_PATH))
		.respond_with(ResponseTemplate::new(500))
		.mount(&server)
		.await;

	let store = store(&server)?;

	store.refresh().await?;

	let before = store.keys();

	assert!(store.refresh().await.is_err());

	let after = store.keys();

	assert!(Arc::ptr_eq(&before, &after));
	assert!(after.get("a").is_some());

	let status = store.status();

	assert_eq!(status.state, ComponentState::Ready);
	assert_eq!(status.refresh_errors, 1);
	assert_eq!(status.consecutive_errors, 1);

	Ok(())
}

#[tokio::test]
async fn keys_without_identifiers_are_skipped() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	common::mount_discovery(&server).await;
	common::mount_keys(
		&server,
		vec![
			common::oct_jwk("a", common::SECRET),
			json!({ "kty": "oct", "alg": "HS256", "k": "YWFhYWFh" }),
		],
	)
	.await;

	let store = store(&server)?;

	store.refresh().await?;

	assert_eq!(store.keys().len(), 1);
	assert_eq!(store.keys().issuer(), Some(common::ISSUER));

	Ok(())
}
