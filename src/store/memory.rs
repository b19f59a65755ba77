//! Thread-safe in-memory [`SecretStore`] implementation for local development and tests.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	store::{SecretStore, StoreError, StoreFuture, StoreKey},
};

type StoreMap = Arc<RwLock<HashMap<StoreKey, String>>>;

/// Thread-safe storage backend that keeps secrets in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	map: StoreMap,
	closed: Arc<AtomicBool>,
}
impl MemoryStore {
	/// Seeds the store with `(key, value)` pairs.
	pub fn with_entries<I>(entries: I) -> Self
	where
		I: IntoIterator<Item = (StoreKey, String)>,
	{
		let store = Self::default();

		store.map.write().extend(entries);

		store
	}

	/// Returns true when `key` currently holds a value.
	pub fn contains(&self, key: &StoreKey) -> bool {
		self.map.read().contains_key(key)
	}

	/// Returns true once [`SecretStore::close`] has been called.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}

	fn ensure_open(&self) -> Result<(), StoreError> {
		if self.is_closed() { Err(StoreError::Closed) } else { Ok(()) }
	}
}
impl SecretStore for MemoryStore {
	fn read<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			self.ensure_open()?;

			Ok(self.map.read().get(key).cloned())
		})
	}

	fn write<'a>(&'a self, key: &'a StoreKey, value: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.ensure_open()?;
			self.map.write().insert(key.clone(), value.to_owned());

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			self.ensure_open()?;

			Ok(self.map.write().remove(key).is_some())
		})
	}

	fn close(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.closed.store(true, Ordering::Release);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{OAuthState, TokenSecret};

	#[tokio::test]
	async fn token_reads_treat_missing_and_empty_as_absent() {
		let store = MemoryStore::with_entries([(StoreKey::AccessToken, String::new())]);

		assert!(
			store
				.retrieve_access_token()
				.await
				.expect("Access token read should succeed.")
				.is_none()
		);
		assert!(
			store
				.retrieve_refresh_token()
				.await
				.expect("Refresh token read should succeed.")
				.is_none()
		);

		store
			.store_refresh_token(&TokenSecret::new("refresh-1"))
			.await
			.expect("Refresh token write should succeed.");

		let refresh = store
			.retrieve_refresh_token()
			.await
			.expect("Refresh token read should succeed.")
			.expect("Refresh token should be present after a write.");

		assert_eq!(refresh.expose(), "refresh-1");

		store.clear_refresh_token().await.expect("Clearing the refresh token should succeed.");

		assert!(!store.contains(&StoreKey::RefreshToken));
	}

	#[tokio::test]
	async fn oauth_state_is_consumed_at_most_once() {
		let store = MemoryStore::default();
		let state = OAuthState::generate();

		store.store_oauth_state(&state).await.expect("State write should succeed.");

		let value = store
			.consume_oauth_state(state.as_str())
			.await
			.expect("First consumption should find the state.");

		assert_eq!(value, state.as_str());

		let err = store
			.consume_oauth_state(state.as_str())
			.await
			.expect_err("Second consumption should fail.");

		assert_eq!(err, StoreError::NotFound { key: state.as_str().into() });
	}

	#[tokio::test]
	async fn retrieve_var_strips_quotes_and_close_is_idempotent() {
		let store = MemoryStore::with_entries([(
			StoreKey::Var("DIRECTORY_BUCKET".into()),
			"\"hotel-directory\"".into(),
		)]);

		assert_eq!(
			store.retrieve_var("DIRECTORY_BUCKET").await.expect("Var read should succeed."),
			Some("hotel-directory".into())
		);
		assert_eq!(store.retrieve_var("UNKNOWN").await.expect("Var read should succeed."), None);

		store.close().await.expect("First close should succeed.");
		store.close().await.expect("Second close should succeed.");

		assert_eq!(
			store.retrieve_access_token().await.expect_err("Reads after close should fail."),
			StoreError::Closed
		);
	}
}
