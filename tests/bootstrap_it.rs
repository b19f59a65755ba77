// crates.io
use httpmock::prelude::*;
// self
use housekeeping_bridge::{
	_preludet::*,
	auth::TokenSecret,
	bootstrap::{self, LoginOutcome, MAX_LOGIN_RETRIES},
	http::ReqwestHttpClient,
	oauth::OAuthAuthority,
	store::{MemoryStore, SecretStore, StoreError, StoreFuture, StoreKey},
};

/// Store whose refresh token survives removal, as a replicated backend lagging behind a delete
/// would behave.
#[derive(Default)]
struct StickyRefreshStore(MemoryStore);
impl SecretStore for StickyRefreshStore {
	fn read<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>> {
		self.0.read(key)
	}

	fn write<'a>(&'a self, key: &'a StoreKey, value: &'a str) -> StoreFuture<'a, ()> {
		self.0.write(key, value)
	}

	fn remove<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool> {
		if *key == StoreKey::RefreshToken {
			return Box::pin(async { Ok::<_, StoreError>(false) });
		}

		self.0.remove(key)
	}

	fn close(&self) -> StoreFuture<'_, ()> {
		self.0.close()
	}
}

#[tokio::test]
async fn stored_refresh_token_yields_an_access_token() {
	let server = MockServer::start_async().await;
	let (authority, store) = build_test_authority(&server.base_url());
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-boot\",\"token_type\":\"bearer\",\"expires_in\":3600}");
		})
		.await;

	store
		.store_refresh_token(&TokenSecret::new("refresh-boot"))
		.await
		.expect("Refresh token fixture should be stored.");

	let outcome = bootstrap::bootstrap(&authority).await.expect("Bootstrap should succeed.");

	token_mock.assert_async().await;

	assert_eq!(outcome, LoginOutcome::Ready);
	assert_eq!(
		store
			.retrieve_access_token()
			.await
			.expect("Access token read should succeed.")
			.map(|token| token.expose().to_owned())
			.as_deref(),
		Some("access-boot")
	);
}

#[tokio::test]
async fn cleared_refresh_token_falls_back_to_interactive_login() {
	let server = MockServer::start_async().await;
	let (authority, store) = build_test_authority(&server.base_url());
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;

	store
		.store_refresh_token(&TokenSecret::new("refresh-revoked"))
		.await
		.expect("Refresh token fixture should be stored.");

	let outcome = bootstrap::login(&authority).await.expect("Login should fall back to a URL.");

	token_mock.assert_calls_async(1).await;

	assert!(matches!(outcome, LoginOutcome::AwaitingAuthorization(_)));
	assert!(!store.contains(&StoreKey::RefreshToken));
}

#[tokio::test]
async fn persistent_rejection_exhausts_the_login_budget() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let store = Arc::new(StickyRefreshStore::default());

	store
		.store_refresh_token(&TokenSecret::new("refresh-sticky"))
		.await
		.expect("Refresh token fixture should be stored.");

	let authority = OAuthAuthority::with_http_client(
		test_client_config(&server.base_url()),
		store,
		ReqwestHttpClient::new().expect("Test HTTP client should build."),
	);
	let err = bootstrap::login(&authority).await.expect_err("Login should give up.");

	token_mock.assert_calls_async(MAX_LOGIN_RETRIES as usize + 1).await;

	assert!(matches!(err, Error::LoginExhausted { attempts: 3 }));
	assert_eq!(err.to_string(), "Failed to get refresh token after 3 attempts.");
}

#[tokio::test]
async fn token_endpoint_outage_aborts_login() {
	let server = MockServer::start_async().await;
	let (authority, store) = build_test_authority(&server.base_url());
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(503).body("");
		})
		.await;

	store
		.store_refresh_token(&TokenSecret::new("refresh-kept"))
		.await
		.expect("Refresh token fixture should be stored.");

	let err = bootstrap::login(&authority).await.expect_err("Outage should abort the login.");

	token_mock.assert_calls_async(1).await;

	assert_eq!(err.kind().as_str(), "transport_failure");
	assert!(store.contains(&StoreKey::RefreshToken));
}
