//! Shared fixtures: a mocked identity provider and token minting.

// crates.io
use base64::prelude::*;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use tokeninfo_gateway::Settings;
use url::Url;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};

pub const ISSUER: &str = "https://identity.example";
pub const KID: &str = "primary";
pub const SECRET: &[u8] = b"integrationsecretintegrationsecre";
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
pub const KEYS_PATH: &str = "/oauth2/connect/keys";
pub const REVOCATIONS_PATH: &str = "/revocations";
pub const TOKENINFO_PATH: &str = "/oauth2/tokeninfo";

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn oct_jwk(kid: &str, secret: &[u8]) -> Value {
	json!({
		"kty": "oct",
		"use": "sig",
		"alg": "HS256",
		"kid": kid,
		"k": BASE64_URL_SAFE_NO_PAD.encode(secret),
	})
}

pub fn mint_with(kid: &str, secret: &[u8], claims: Value) -> String {
	let mut header = Header::new(Algorithm::HS256);

	header.kid = Some(kid.to_owned());

	jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(secret)).expect("token")
}

pub fn mint(claims: Value) -> String {
	mint_with(KID, SECRET, claims)
}

pub fn valid_claims(subject: &str) -> Value {
	let now = chrono::Utc::now().timestamp();

	json!({
		"iss": ISSUER,
		"sub": subject,
		"scope": ["uid", "cn"],
		"iat": now,
		"exp": now + 3_600,
	})
}

pub fn url(server: &MockServer, path: &str) -> Url {
	Url::parse(&format!("{}{path}", server.uri())).expect("url")
}

pub async fn mount_discovery(server: &MockServer) {
	Mock::given(method("GET"))
		.and(path(DISCOVERY_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"issuer": ISSUER,
			"jwks_uri": url(server, KEYS_PATH),
		})))
		.mount(server)
		.await;
}

pub async fn mount_keys(server: &MockServer, keys: Vec<Value>) {
	Mock::given(method("GET"))
		.and(path(KEYS_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
		.mount(server)
		.await;
}

pub async fn mount_revocations(server: &MockServer, revocations: Value) {
	Mock::given(method("GET"))
		.and(path(REVOCATIONS_PATH))
		.respond_with(
			ResponseTemplate::new(200).set_body_json(json!({ "revocations": revocations })),
		)
		.mount(server)
		.await;
}

/// Mount a provider publishing the primary key and the given revocation records.
pub async fn mount_provider(server: &MockServer, revocations: Value) {
	mount_discovery(server).await;
	mount_keys(server, vec![oct_jwk(KID, SECRET)]).await;
	mount_revocations(server, revocations).await;
}

pub fn local_settings(server: &MockServer) -> Settings {
	Settings {
		openid_provider_configuration_url: Some(url(server, DISCOVERY_PATH)),
		revocation_provider_url: Some(url(server, REVOCATIONS_PATH)),
		hashing_salt: "integration-salt".into(),
		..Settings::default()
	}
}

pub fn upstream_settings(server: &MockServer) -> Settings {
	Settings { upstream_tokeninfo_url: Some(url(server, TOKENINFO_PATH)), ..Settings::default() }
}
