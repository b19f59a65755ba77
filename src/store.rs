//! Secret store contract and built-in backends.
//!
//! Backends only implement raw keyed reads, writes, and removals through [`SecretStore`]; the
//! token, state, and variable operations the OAuth authority relies on are provided methods so
//! every backend shares one set of semantics:
//!
//! - token reads treat an absent or empty value as "no token" rather than an error,
//! - [`SecretStore::consume_oauth_state`] removes the nonce right after reading it and fails with
//!   [`StoreError::NotFound`] when it is absent or malformed,
//! - [`SecretStore::retrieve_var`] strips one pair of surrounding ASCII double quotes.

pub mod file;
pub mod memory;
#[cfg(feature = "ssm")] pub mod parameter;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "ssm")] pub use parameter::ParameterStore;

// self
use crate::{
	_prelude::*,
	auth::{OAuthState, TokenSecret},
};

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by secret stores.
pub trait SecretStore
where
	Self: Send + Sync,
{
	/// Reads the raw value stored under `key`.
	fn read<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>>;

	/// Overwrites the value stored under `key`.
	fn write<'a>(&'a self, key: &'a StoreKey, value: &'a str) -> StoreFuture<'a, ()>;

	/// Deletes `key`, returning whether it existed.
	fn remove<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool>;

	/// Releases backend resources. Calling it more than once is a no-op.
	fn close(&self) -> StoreFuture<'_, ()>;

	/// Returns the stored access token, if any.
	fn retrieve_access_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move {
			Ok(self.read(&StoreKey::AccessToken).await?.and_then(TokenSecret::non_empty))
		})
	}

	/// Persists the access token.
	fn store_access_token<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.write(&StoreKey::AccessToken, token.expose()).await })
	}

	/// Returns the stored refresh token, if any.
	fn retrieve_refresh_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move {
			Ok(self.read(&StoreKey::RefreshToken).await?.and_then(TokenSecret::non_empty))
		})
	}

	/// Persists the refresh token.
	fn store_refresh_token<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.write(&StoreKey::RefreshToken, token.expose()).await })
	}

	/// Forgets the refresh token once it has been proven stale.
	fn clear_refresh_token(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.remove(&StoreKey::RefreshToken).await?;

			Ok(())
		})
	}

	/// Persists a pending authorization nonce.
	fn store_oauth_state<'a>(&'a self, state: &'a OAuthState) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.write(&StoreKey::OAuthState(state.as_str().to_owned()), state.as_str()).await
		})
	}

	/// Reads and deletes the nonce stored under `nonce`.
	///
	/// Values that do not have the shape of a generated nonce are [`StoreError::NotFound`] without
	/// touching the backend, since backends address keys by name and a name such as
	/// `refresh_token` would otherwise resolve to another entry.
	fn consume_oauth_state<'a>(&'a self, nonce: &'a str) -> StoreFuture<'a, String> {
		Box::pin(async move {
			if !OAuthState::is_well_formed(nonce) {
				return Err(StoreError::NotFound { key: nonce.to_owned() });
			}

			let key = StoreKey::OAuthState(nonce.to_owned());
			let value = self
				.read(&key)
				.await?
				.filter(|value| !value.is_empty())
				.ok_or_else(|| StoreError::NotFound { key: nonce.to_owned() })?;

			self.remove(&key).await?;

			Ok(value)
		})
	}

	/// Reads an out-of-band configuration variable.
	fn retrieve_var<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			let value = self.read(&StoreKey::Var(name.to_owned())).await?;

			Ok(value.map(|value| unquote(&value).to_owned()).filter(|value| !value.is_empty()))
		})
	}
}

/// Logical key inside a store namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StoreKey {
	/// Current bearer token.
	AccessToken,
	/// Long-lived refresh token.
	RefreshToken,
	/// Pending authorization nonce, keyed by its own value.
	OAuthState(String),
	/// Out-of-band configuration variable.
	Var(String),
}
impl StoreKey {
	/// Key name inside the namespace.
	pub fn name(&self) -> &str {
		match self {
			Self::AccessToken => "access_token",
			Self::RefreshToken => "refresh_token",
			Self::OAuthState(nonce) => nonce,
			Self::Var(name) => name,
		}
	}

	/// Whether the backend must encrypt the value at rest.
	pub fn is_sensitive(&self) -> bool {
		matches!(self, Self::AccessToken | Self::RefreshToken)
	}
}

/// Deployment-scoped prefix (`<app>/<env>`) shared by every key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace {
	/// Application name.
	pub app: String,
	/// Deployment environment.
	pub env: String,
}
impl Namespace {
	/// Creates a namespace for the provided application + environment.
	pub fn new(app: impl Into<String>, env: impl Into<String>) -> Self {
		Self { app: app.into(), env: env.into() }
	}

	/// Bucket name used by the embedded backend.
	pub fn bucket(&self) -> String {
		format!("{}/{}", self.app, self.env)
	}

	/// Hierarchical parameter path used by the managed backend.
	pub fn path(&self, key: &StoreKey) -> String {
		format!("/{}/{}/{}", self.app, self.env, key.name())
	}
}
impl Default for Namespace {
	fn default() -> Self {
		Self::new("housekeeping-bridge", "dev")
	}
}

/// Error type produced by [`SecretStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// A key that must exist is absent.
	#[error("Key `{key}` was not found in the secret store.")]
	NotFound {
		/// Missing key name.
		key: String,
	},
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The store was used after [`SecretStore::close`].
	#[error("Secret store is closed.")]
	Closed,
}

/// Strips one pair of surrounding ASCII double quotes.
pub fn unquote(value: &str) -> &str {
	value
		.strip_prefix('"')
		.and_then(|inner| inner.strip_suffix('"'))
		.unwrap_or(value)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_bridge_error_with_source() {
		let store_error = StoreError::Backend { message: "parameter service unreachable".into() };
		let bridge_error: Error = store_error.clone().into();

		assert!(matches!(bridge_error, Error::Storage(_)));
		assert!(bridge_error.to_string().contains("parameter service unreachable"));

		let source = StdError::source(&bridge_error)
			.expect("Bridge error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn namespace_formats_bucket_and_paths() {
		let namespace = Namespace::new("bridge", "prod");

		assert_eq!(namespace.bucket(), "bridge/prod");
		assert_eq!(namespace.path(&StoreKey::AccessToken), "/bridge/prod/access_token");
		assert_eq!(namespace.path(&StoreKey::RefreshToken), "/bridge/prod/refresh_token");
		assert_eq!(
			namespace.path(&StoreKey::OAuthState("0123456789abcdef0123".into())),
			"/bridge/prod/0123456789abcdef0123"
		);
	}

	#[test]
	fn only_tokens_are_sensitive() {
		assert!(StoreKey::AccessToken.is_sensitive());
		assert!(StoreKey::RefreshToken.is_sensitive());
		assert!(!StoreKey::OAuthState("abc".into()).is_sensitive());
		assert!(!StoreKey::Var("BUCKET".into()).is_sensitive());
	}

	#[test]
	fn unquote_strips_one_pair_of_double_quotes() {
		assert_eq!(unquote("\"bucket-name\""), "bucket-name");
		assert_eq!(unquote("bucket-name"), "bucket-name");
		assert_eq!(unquote("\"half"), "\"half");
		assert_eq!(unquote("\"\"x\"\""), "\"x\"");
	}
}
