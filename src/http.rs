//! HTTP transport primitives.
//!
//! [`ReqwestHttpClient`] owns the single reqwest client every outbound call goes through; it is
//! built with finite connect and overall deadlines and never follows redirects. Token endpoint
//! calls go through [`InstrumentedHandle`], which implements `oauth2`'s [`AsyncHttpClient`] and
//! records the response status in a [`ResponseMetadataSlot`] so error mapping can report it.
//! Hospitality API calls go through [`AuthorizedTransport`], which pulls the bearer token from
//! the secret store right before each dispatch.

// std
use std::{ops::Deref, time::Duration};
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{RequestBuilder, redirect::Policy};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	store::SecretStore,
};

/// Upper bound for establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound for a whole request, body included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
///
/// The authority creates a fresh slot for each token request and reads the captured
/// metadata immediately after `oauth2` resolves.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Builds a client with the bridge's deadlines and redirect policy.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.connect_timeout(CONNECT_TIMEOUT)
			.timeout(REQUEST_TIMEOUT)
			.redirect(Policy::none())
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`]. The caller owns its timeout configuration.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds an instrumented handle that captures response metadata.
	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle::new(self.0.clone(), slot)
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Handle passed to `oauth2` token requests.
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot }))
	}
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// HTTP client whose requests carry the current bearer token from the secret store.
///
/// The token is read on every [`send`](Self::send), so a refresh performed by any other caller
/// is picked up by the next request without invalidation hooks. A missing token is not an
/// error: the request goes out unauthenticated and the remote's rejection drives the refresh.
#[derive(Clone)]
pub struct AuthorizedTransport {
	client: ReqwestClient,
	store: Arc<dyn SecretStore>,
}
impl AuthorizedTransport {
	/// Creates a transport over `client` reading tokens from `store`.
	pub fn new(client: ReqwestClient, store: Arc<dyn SecretStore>) -> Self {
		Self { client, store }
	}

	/// Starts a `GET` request.
	pub fn get(&self, url: Url) -> RequestBuilder {
		self.client.get(url)
	}

	/// Starts a `POST` request.
	pub fn post(&self, url: Url) -> RequestBuilder {
		self.client.post(url)
	}

	/// Attaches the bearer token, dispatches `request`, and returns the body of a 2xx response.
	///
	/// Non-2xx statuses are reported as [`TransportError::Status`].
	pub async fn send(&self, endpoint: &'static str, request: RequestBuilder) -> Result<Vec<u8>> {
		let request = match self.store.retrieve_access_token().await? {
			Some(token) => request.bearer_auth(token.expose()),
			None => {
				tracing::debug!(endpoint, "no access token stored; sending unauthenticated");

				request
			},
		};
		let response =
			request.send().await.map_err(|e| TransportError::network(endpoint, e))?;
		let status = response.status();

		if !status.is_success() {
			tracing::warn!(endpoint, status = status.as_u16(), "remote answered with an error status");

			return Err(TransportError::Status { endpoint, status: status.as_u16() }.into());
		}

		let body = response.bytes().await.map_err(|e| TransportError::network(endpoint, e))?;

		Ok(body.to_vec())
	}
}
impl Debug for AuthorizedTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizedTransport").finish_non_exhaustive()
	}
}
