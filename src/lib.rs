//! PBX-to-Cloudbeds housekeeping bridge built around a self-refreshing OAuth 2.0 client.
//!
//! Housekeepers dial status numbers from guest-room phones; the PBX forwards the call metadata,
//! and the bridge turns it into a `postHousekeepingStatus` call against Cloudbeds. Tokens live in
//! a pluggable [`store::SecretStore`], the [`oauth::OAuthAuthority`] drives the authorization-code
//! grant, and the [`hospitality::HospitalityClient`] retries once through a token refresh when
//! the remote reports `success=false`.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod adapter;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod directory;
pub mod error;
pub mod event;
pub mod hospitality;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::{ApiEndpoints, ClientConfig},
		directory::{RoomDirectory, StaticDirectory},
		hospitality::HospitalityClient,
		http::ReqwestHttpClient,
		oauth::OAuthAuthority,
		store::{MemoryStore, SecretStore},
	};

	/// Client identifier used by every test fixture.
	pub const TEST_CLIENT_ID: &str = "client-test";
	/// Client secret used by every test fixture.
	pub const TEST_CLIENT_SECRET: &str = "secret-test";

	/// Builds a [`ClientConfig`] whose endpoints all point at `base`, typically an
	/// `httpmock` server URL.
	pub fn test_client_config(base: &str) -> ClientConfig {
		let base = base.trim_end_matches('/');

		ClientConfig {
			client_id: TEST_CLIENT_ID.into(),
			client_secret: crate::auth::TokenSecret::new(TEST_CLIENT_SECRET),
			redirect_url: "https://bridge.example.com/oauth/callback".into(),
			auth_url: format!("{base}/oauth/authorize"),
			token_url: format!("{base}/oauth/token"),
			scopes: vec!["read:room".into(), "write:housekeeping".into()],
			api: ApiEndpoints::with_base(&format!("{base}/api/v1.1/"))
				.expect("Test API base URL should parse."),
			client_auth: Default::default(),
		}
	}

	/// Builds an authority backed by a fresh [`MemoryStore`].
	pub fn build_test_authority(base: &str) -> (Arc<OAuthAuthority>, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn SecretStore> = store_backend.clone();
		let authority = OAuthAuthority::with_http_client(
			test_client_config(base),
			store,
			ReqwestHttpClient::new().expect("Test HTTP client should build."),
		);

		(Arc::new(authority), store_backend)
	}

	/// Builds a hospitality client with the provided directory entries and a fresh
	/// [`MemoryStore`].
	pub fn build_test_client<I, K, V>(
		base: &str,
		extensions: I,
	) -> (HospitalityClient, Arc<OAuthAuthority>, Arc<MemoryStore>)
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let (authority, store) = build_test_authority(base);
		let directory = StaticDirectory::new(RoomDirectory::from_pairs(extensions));
		let client = HospitalityClient::new(authority.clone(), Arc::new(directory));

		(client, authority, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(feature = "server")]
use {axum as _, color_eyre as _, dotenvy as _, tokio as _, tracing_subscriber as _};
#[cfg(test)] use {housekeeping_bridge as _, httpmock as _, tempfile as _, tokio as _};
