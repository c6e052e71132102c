//! End-to-end validation through [`Gateway`].

// crates.io
use serde_json::json;
use tokeninfo_gateway::{
	ComponentState, Disposition, Error, Gateway, ProcessorKind, Rejection, Result, RevocationKind,
	Settings,
};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};
// self
use crate::common::{self, ISSUER, TOKENINFO_PATH};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
	let pairs: Vec<(String, String)> =
		pairs.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect();

	move |name: &str| pairs.iter().find(|(key, _)| key == name).map(|(_, value)| value.clone())
}

#[test]
fn upstream_only_configuration_loads() {
	let settings =
		Settings::from_lookup(lookup(&[("UPSTREAM_TOKENINFO_URL", "http://example.com")]))
			.expect("settings");

	assert!(settings.upstream_tokeninfo_url.is_some());
	assert!(settings.openid_provider_configuration_url.is_none());
	assert!(settings.revocation_provider_url.is_none());
}

#[test]
fn local_only_configuration_loads() {
	let settings = Settings::from_lookup(lookup(&[
		("OPENID_PROVIDER_CONFIGURATION_URL", "http://example.com"),
		("REVOCATION_PROVIDER_URL", "http://example.com"),
	]))
	.expect("settings");

	assert!(settings.upstream_tokeninfo_url.is_none());
	assert!(settings.openid_provider_configuration_url.is_some());
	assert!(settings.revocation_provider_url.is_some());
}

#[test]
fn partial_local_configuration_is_rejected() {
	for pairs in [
		&[("OPENID_PROVIDER_CONFIGURATION_URL", "http://example.com")][..],
		&[("REVOCATION_PROVIDER_URL", "http://example.com")][..],
		&[][..],
	] {
		assert!(matches!(Settings::from_lookup(lookup(pairs)), Err(Error::Config { .. })));
	}
}

#[tokio::test]
async fn accepts_locally_verified_tokens() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	common::mount_provider(&server, json!([])).await;

	let gateway = Gateway::start(common::local_settings(&server)).await?;
	let info = gateway.validate(&common::mint(common::valid_claims("alice"))).await?;

	assert_eq!(info.processor, ProcessorKind::Jwt);
	assert_eq!(info.issuer.as_deref(), Some(ISSUER));
	assert_eq!(info.subject.as_deref(), Some("alice"));
	assert!(info.has_scope("cn"));

	let states: Vec<_> = gateway.statuses().into_iter().map(|status| status.state).collect();

	assert_eq!(states, [ComponentState::Ready, ComponentState::Ready]);

	gateway.shutdown().await;

	Ok(())
}

#[tokio::test]
async fn revoked_tokens_are_rejected_despite_valid_signatures() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;
	let revoked = common::mint(common::valid_claims("alice"));
	let revoked_subject = common::mint(common::valid_claims("mallory"));

	common::mount_provider(
		&server,
		json!([
			{ "type": "TOKEN", "value": revoked },
			{ "type": "CLAIM", "name": "sub", "value": "mallory" }
		]),
	)
	.await;

	let gateway = Gateway::start(common::local_settings(&server)).await?;
	let by_token = gateway.validate(&revoked).await.unwrap_err();
	let by_claim = gateway.validate(&revoked_subject).await.unwrap_err();

	assert_eq!(by_token.rejection(), Some(&Rejection::Revoked(RevocationKind::Token)));
	assert_eq!(
		by_claim.rejection(),
		Some(&Rejection::Revoked(RevocationKind::Claim("sub".into())))
	);
	assert!(gateway.validate(&common::mint(common::valid_claims("bob"))).await.is_ok());

	Ok(())
}

#[tokio::test]
async fn startup_fails_without_a_key_set() {
	common::init_tracing();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(common::DISCOVERY_PATH))
		.respond_with(ResponseTemplate::new(404))
		.mount(&server)
		.await;

	assert!(Gateway::start(common::local_settings(&server)).await.is_err());
}

#[tokio::test]
async fn revocation_outage_at_startup_fails_closed() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	common::mount_discovery(&server).await;
	common::mount_keys(&server, vec![common::oct_jwk(common::KID, common::SECRET)]).await;
	Mock::given(method("GET"))
		.and(path(common::REVOCATIONS_PATH))
		.respond_with(ResponseTemplate::new(404))
		.mount(&server)
		.await;

	let gateway = Gateway::start(common::local_settings(&server)).await?;
	let err = gateway.validate(&common::mint(common::valid_claims("alice"))).await.unwrap_err();

	assert!(matches!(err, Error::RevocationStale { age: None }));
	assert_eq!(err.disposition(), Disposition::Rejected);

	Ok(())
}

#[tokio::test]
async fn hybrid_deployments_route_by_issuer() -> Result<()> {
	common::init_tracing();

	let server = MockServer::start().await;

	common::mount_provider(&server, json!([])).await;
	Mock::given(method("GET"))
		.and(path(TOKENINFO_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"uid": "service-a",
			"scope": "uid",
			"expires_in": 600
		})))
		.expect(1)
		.mount(&server)
		.await;

	let settings = Settings {
		upstream_tokeninfo_url: Some(common::url(&server, TOKENINFO_PATH)),
		upstream_issuers: vec!["https://services.example".into()],
		..common::local_settings(&server)
	};
	let gateway = Gateway::start(settings).await?;
	let local = gateway.validate(&common::mint(common::valid_claims("alice"))).await?;
	let delegated = common::mint_with(
		"unknown",
		b"anothersecretanothersecretanother",
		json!({ "iss": "https://services.example", "sub": "service-a" }),
	);
	let upstream = gateway.validate(&delegated).await?;
	let foreign = common::mint(json!({ "iss": "https://elsewhere.example" }));

	assert_eq!(local.processor, ProcessorKind::Jwt);
	assert_eq!(upstream.processor, ProcessorKind::Upstream);
	assert_eq!(upstream.subject.as_deref(), Some("service-a"));
	assert!(matches!(
		gateway.validate(&foreign).await.unwrap_err().rejection(),
		Some(Rejection::UnsupportedToken { issuer: Some(_) })
	));

	server.verify().await;

	Ok(())
}
