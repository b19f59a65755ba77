//! OAuth2 authority client for the authorization-code grant.
//!
//! [`OAuthAuthority`] owns the explicitly constructed [`ClientConfig`], the secret store holding
//! the token pair, and the HTTP client used for token endpoint calls. It never caches tokens in
//! memory: the store is the only source of truth, and [`AuthorizedTransport`] reads the bearer
//! from it on every request.

pub mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use oauth2::{
	AuthType, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RedirectUrl, RefreshToken, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{AuthorizationRequest, OAuthState, TokenSecret, state::build_authorize_url},
	config::{ClientAuthMethod, ClientConfig, vars},
	error::{ConfigError, DecodeError, TransportError},
	http::{AuthorizedTransport, ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	obs::{self, FlowKind},
	store::{SecretStore, StoreError},
};

type TokenClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Tokens issued by a successful authorization code exchange.
#[derive(Clone, Debug)]
pub struct IssuedTokens {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Refresh token, when the authority issued one.
	pub refresh_token: Option<TokenSecret>,
}

/// Authorization-code grant client bound to one secret store.
pub struct OAuthAuthority {
	config: ClientConfig,
	store: Arc<dyn SecretStore>,
	http_client: ReqwestHttpClient,
	refresh_guard: AsyncMutex<()>,
	refresh_metrics: Arc<RefreshMetrics>,
}
impl OAuthAuthority {
	/// Creates an authority with the default bounded HTTP client.
	pub fn new(config: ClientConfig, store: Arc<dyn SecretStore>) -> Result<Self> {
		Ok(Self::with_http_client(config, store, ReqwestHttpClient::new()?))
	}

	/// Creates an authority that sends every request through `http_client`.
	pub fn with_http_client(
		config: ClientConfig,
		store: Arc<dyn SecretStore>,
		http_client: ReqwestHttpClient,
	) -> Self {
		Self {
			config,
			store,
			http_client,
			refresh_guard: AsyncMutex::new(()),
			refresh_metrics: Default::default(),
		}
	}

	/// Client configuration this authority was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Secret store holding the token pair and pending states.
	pub fn store(&self) -> &Arc<dyn SecretStore> {
		&self.store
	}

	/// Refresh counters.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		&self.refresh_metrics
	}

	/// HTTP client whose requests carry the current bearer token.
	pub fn authorized_transport(&self) -> AuthorizedTransport {
		AuthorizedTransport::new(self.http_client.0.clone(), Arc::clone(&self.store))
	}

	/// Generates a fresh `state`, persists it, and composes the authorize URL.
	///
	/// Fails with [`ConfigError::Missing`] when the authorization endpoint, client id, or
	/// redirect URI is empty.
	pub async fn authorization_url(&self) -> Result<AuthorizationRequest> {
		obs::observe(FlowKind::Authorize, "authorization_url", self.authorization_url_inner())
			.await
	}

	/// Validates `state` against the persisted nonce and exchanges `code` for tokens.
	///
	/// The nonce is consumed before the exchange, so a replayed callback fails with
	/// [`Error::NotFound`] even when the first exchange was rejected.
	pub async fn exchange_code(&self, state: &str, code: &str) -> Result<IssuedTokens> {
		obs::observe(FlowKind::CodeExchange, "exchange_code", self.exchange_code_inner(state, code))
			.await
	}

	/// Mints a new access token from the stored refresh token.
	///
	/// Refreshes are serialized per authority. A missing or rejected refresh token clears the
	/// stored one and fails with [`Error::Unauthorized`]; transport and decode failures leave the
	/// store untouched.
	pub async fn refresh_access_token(&self) -> Result<()> {
		let _guard = self.refresh_guard.lock().await;

		self.refresh_metrics.record_attempt();

		let result =
			obs::observe(FlowKind::Refresh, "refresh_access_token", self.refresh_inner()).await;

		self.refresh_metrics.record_result(&result);

		result
	}

	async fn authorization_url_inner(&self) -> Result<AuthorizationRequest> {
		let endpoint = self.config.authorization_endpoint()?;
		let client_id = self.config.require_client_id()?;
		let redirect_uri = self.redirect_uri()?;
		let state = OAuthState::generate();

		self.store.store_oauth_state(&state).await?;

		let url =
			build_authorize_url(&endpoint, client_id, redirect_uri, &self.config.scopes, &state);

		tracing::debug!(%state, "persisted authorization state");

		Ok(AuthorizationRequest { url, state })
	}

	async fn exchange_code_inner(&self, state: &str, code: &str) -> Result<IssuedTokens> {
		let stored = self.store.consume_oauth_state(state).await.map_err(|e| match e {
			StoreError::NotFound { key } => Error::NotFound { resource: "OAuth state", key },
			other => other.into(),
		})?;

		if stored != state {
			return Err(Error::StateMismatch);
		}

		let redirect_uri = RedirectUrl::new(self.redirect_uri()?.to_owned())
			.map_err(|source| ConfigError::InvalidUrl { field: vars::REDIRECT_URL, source })?;
		let client = self.token_client()?.set_redirect_uri(redirect_uri);
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.instrumented(meta.clone());
		let response = client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.request_async(&handle)
			.await
			.map_err(|e| map_request_error(FlowKind::CodeExchange, meta.take(), e))?;
		let tokens = issued_tokens(&response)?;

		self.store.store_access_token(&tokens.access_token).await?;

		match &tokens.refresh_token {
			Some(refresh) => self.store.store_refresh_token(refresh).await?,
			None => tracing::warn!("authority issued no refresh token; the next expiry needs a new login"),
		}

		Ok(tokens)
	}

	async fn refresh_inner(&self) -> Result<()> {
		let Some(refresh) = self.store.retrieve_refresh_token().await? else {
			self.store.clear_refresh_token().await?;

			return Err(Error::Unauthorized { reason: "no refresh token is stored".into() });
		};
		let client = self.token_client()?;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.instrumented(meta.clone());
		let outcome = client
			.exchange_refresh_token(&RefreshToken::new(refresh.expose().to_owned()))
			.request_async(&handle)
			.await;
		let response = match outcome {
			Ok(response) => response,
			Err(e) => {
				let err = map_request_error(FlowKind::Refresh, meta.take(), e);

				if matches!(err, Error::Unauthorized { .. }) {
					self.store.clear_refresh_token().await?;

					tracing::warn!("authority rejected the refresh token; cleared it");
				}

				return Err(err);
			},
		};
		let tokens = issued_tokens(&response)?;
		let current = self.store.retrieve_access_token().await?;

		if current.as_ref() == Some(&tokens.access_token) {
			tracing::debug!("refreshed access token is unchanged; skipping write");
		} else {
			self.store.store_access_token(&tokens.access_token).await?;
		}

		let rotated = match tokens.refresh_token {
			Some(next) if next != refresh => {
				self.store.store_refresh_token(&next).await?;
				self.refresh_metrics.record_rotation();

				true
			},
			_ => false,
		};

		tracing::info!(
			access_token_len = tokens.access_token.len(),
			rotated,
			"refreshed access token"
		);

		Ok(())
	}

	fn redirect_uri(&self) -> Result<&str, ConfigError> {
		self.config.redirect_endpoint()?;

		Ok(&self.config.redirect_url)
	}

	fn token_client(&self) -> Result<TokenClient, ConfigError> {
		let token_url = TokenUrl::from_url(self.config.token_endpoint()?);
		let client_id = self.config.require_client_id()?;
		let client_secret = self.config.require_client_secret()?;
		let client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_token_uri(token_url);
		let client = match self.config.client_auth {
			ClientAuthMethod::ClientSecretPost => client.set_auth_type(AuthType::RequestBody),
			ClientAuthMethod::ClientSecretBasic => client.set_auth_type(AuthType::BasicAuth),
		};

		Ok(client)
	}
}
impl Debug for OAuthAuthority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthAuthority")
			.field("client_id", &self.config.client_id)
			.field("token_url", &self.config.token_url)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish_non_exhaustive()
	}
}

fn issued_tokens(response: &BasicTokenResponse) -> Result<IssuedTokens> {
	let access_token = TokenSecret::non_empty(response.access_token().secret().to_owned())
		.ok_or(DecodeError::MissingField { what: "token response", field: "access_token" })?;
	let refresh_token =
		response.refresh_token().and_then(|token| TokenSecret::non_empty(token.secret().to_owned()));

	Ok(IssuedTokens { access_token, refresh_token })
}

fn map_request_error(
	flow: FlowKind,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let status = meta.and_then(|meta| meta.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response(flow, status, &response),
		RequestTokenError::Request(error) => map_transport_error(status, error),
		RequestTokenError::Parse(source, _body) =>
			DecodeError::Json { what: "token response", source }.into(),
		RequestTokenError::Other(message) => TransportError::TokenEndpoint { message, status }.into(),
	}
}

// Only a 4xx OAuth error is a rejection; a 5xx carrying one is reported as a transport failure.
fn map_server_response(
	flow: FlowKind,
	status: Option<u16>,
	response: &BasicErrorResponse,
) -> Error {
	let code: &str = response.error().as_ref();
	let detail = match response.error_description() {
		Some(description) => format!("{code}: {description}"),
		None => code.to_owned(),
	};

	if status.is_some_and(|status| status >= 500) {
		return TransportError::TokenEndpoint { message: detail, status }.into();
	}

	let reason = match flow {
		FlowKind::Refresh => format!("refresh token rejected by the authority ({detail})"),
		_ => format!("authorization code rejected by the authority ({detail})"),
	};

	Error::Unauthorized { reason }
}

fn map_transport_error(status: Option<u16>, err: HttpClientError<ReqwestError>) -> Error {
	const ENDPOINT: &str = "token endpoint";

	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(ENDPOINT, *inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::TokenEndpoint { message, status }.into(),
		_ => TransportError::TokenEndpoint { message: "unknown HTTP client error".into(), status }
			.into(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::test_client_config,
		store::{MemoryStore, StoreKey},
	};

	fn authority(config: ClientConfig) -> (OAuthAuthority, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let http = ReqwestHttpClient::new().expect("HTTP client should build.");

		(OAuthAuthority::with_http_client(config, store.clone(), http), store)
	}

	#[tokio::test]
	async fn empty_auth_url_is_a_missing_config_error() {
		let mut config = test_client_config("https://hotels.example.com");

		config.auth_url.clear();

		let (authority, store) = authority(config);
		let err = authority
			.authorization_url()
			.await
			.expect_err("An empty authorization endpoint should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::Missing { field: vars::AUTH_URL })));
		assert_eq!(err.kind(), crate::error::ErrorKind::ConfigMissing);
		assert!(!store.contains(&StoreKey::AccessToken));
	}

	#[tokio::test]
	async fn authorization_urls_carry_distinct_persisted_states() {
		let (authority, store) = authority(test_client_config("https://hotels.example.com"));
		let first = authority.authorization_url().await.expect("First URL should build.");
		let second = authority.authorization_url().await.expect("Second URL should build.");

		assert_ne!(first.state.as_str(), second.state.as_str());

		for request in [&first, &second] {
			assert!(store.contains(&StoreKey::OAuthState(request.state.as_str().into())));
			assert!(
				request.url.query_pairs().any(|(k, v)| k == "state" && v == request.state.as_str())
			);
		}
	}

	#[tokio::test]
	async fn unknown_state_fails_without_contacting_the_authority() {
		let (authority, _store) = authority(test_client_config("http://127.0.0.1:9"));
		let err = authority
			.exchange_code("abc", "code1")
			.await
			.expect_err("An unknown state should be rejected.");

		assert!(matches!(err, Error::NotFound { resource: "OAuth state", ref key } if key == "abc"));
	}

	#[tokio::test]
	async fn missing_refresh_token_requires_login() {
		let (authority, _store) = authority(test_client_config("http://127.0.0.1:9"));
		let err = authority
			.refresh_access_token()
			.await
			.expect_err("Refreshing without a refresh token should fail.");

		assert!(matches!(err, Error::Unauthorized { .. }));
		assert_eq!(authority.refresh_metrics().attempts(), 1);
		assert_eq!(authority.refresh_metrics().failures(), 1);
	}

	#[test]
	fn outage_responses_keep_the_refresh_token() {
		let response: BasicErrorResponse =
			serde_json::from_str(r#"{"error":"invalid_grant","error_description":"expired"}"#)
				.expect("Error response fixture should parse.");

		assert!(matches!(
			map_server_response(FlowKind::Refresh, Some(400), &response),
			Error::Unauthorized { ref reason } if reason.contains("invalid_grant: expired")
		));
		assert!(matches!(
			map_server_response(FlowKind::Refresh, Some(503), &response),
			Error::Transport(TransportError::TokenEndpoint { status: Some(503), .. })
		));
	}
}
