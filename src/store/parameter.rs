//! Managed [`SecretStore`] backed by AWS Systems Manager Parameter Store.
//!
//! Keys live under `/<app>/<env>/<name>`. Tokens are written as `SecureString` and every read
//! requests decryption; nonces and variables are plain `String` parameters.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ssm::{Client, error::DisplayErrorContext, types::ParameterType};
// self
use crate::{
	_prelude::*,
	store::{Namespace, SecretStore, StoreError, StoreFuture, StoreKey},
};

/// Parameter Store client scoped to one namespace.
#[derive(Debug)]
pub struct ParameterStore {
	client: Client,
	namespace: Namespace,
	closed: AtomicBool,
}
impl ParameterStore {
	/// Loads AWS credentials from the environment and connects to `region` (or the default
	/// region chain when `None`).
	pub async fn connect(namespace: Namespace, region: Option<String>) -> Self {
		let mut loader = aws_config::defaults(BehaviorVersion::latest());

		if let Some(region) = region {
			loader = loader.region(Region::new(region));
		}

		let sdk_config = loader.load().await;

		Self::with_client(Client::new(&sdk_config), namespace)
	}

	/// Wraps a preconfigured SSM client.
	pub fn with_client(client: Client, namespace: Namespace) -> Self {
		Self { client, namespace, closed: AtomicBool::new(false) }
	}

	fn ensure_open(&self) -> Result<(), StoreError> {
		if self.closed.load(Ordering::Acquire) { Err(StoreError::Closed) } else { Ok(()) }
	}

	fn backend_error(action: &str, path: &str, err: impl StdError) -> StoreError {
		StoreError::Backend {
			message: format!("Failed to {action} {path}: {}", DisplayErrorContext(&err)),
		}
	}
}
impl SecretStore for ParameterStore {
	fn read<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			self.ensure_open()?;

			let path = self.namespace.path(key);
			let result =
				self.client.get_parameter().name(&path).with_decryption(true).send().await;

			match result {
				Ok(output) =>
					Ok(output.parameter().and_then(|parameter| parameter.value()).map(str::to_owned)),
				Err(err) => match err.as_service_error() {
					Some(service) if service.is_parameter_not_found() => Ok(None),
					_ => Err(Self::backend_error("read", &path, err)),
				},
			}
		})
	}

	fn write<'a>(&'a self, key: &'a StoreKey, value: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.ensure_open()?;

			let path = self.namespace.path(key);
			let kind =
				if key.is_sensitive() { ParameterType::SecureString } else { ParameterType::String };

			self.client
				.put_parameter()
				.name(&path)
				.value(value)
				.r#type(kind)
				.overwrite(true)
				.send()
				.await
				.map_err(|err| Self::backend_error("write", &path, err))?;

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			self.ensure_open()?;

			let path = self.namespace.path(key);

			match self.client.delete_parameter().name(&path).send().await {
				Ok(_) => Ok(true),
				Err(err) => match err.as_service_error() {
					Some(service) if service.is_parameter_not_found() => Ok(false),
					_ => Err(Self::backend_error("delete", &path, err)),
				},
			}
		})
	}

	fn close(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.closed.store(true, Ordering::Release);

			Ok(())
		})
	}
}
