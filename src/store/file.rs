//! Embedded single-file [`SecretStore`] for local development.
//!
//! The file holds one JSON object per bucket (`<app>/<env>`), each mapping key names such as
//! `access_token`, `refresh_token`, or a state nonce to their values. Every mutation rewrites the
//! file synchronously through a temporary sibling and an atomic rename.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
	sync::atomic::{AtomicBool, Ordering},
};
// self
use crate::{
	_prelude::*,
	store::{Namespace, SecretStore, StoreError, StoreFuture, StoreKey},
};

type Buckets = BTreeMap<String, BTreeMap<String, String>>;

/// Persists secrets to a JSON file after each mutation.
#[derive(Debug)]
pub struct FileStore {
	path: PathBuf,
	bucket: String,
	inner: RwLock<Buckets>,
	closed: AtomicBool,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>, namespace: &Namespace) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		tracing::debug!(path = %path.display(), bucket = %namespace.bucket(), "opened file store");

		Ok(Self {
			path,
			bucket: namespace.bucket(),
			inner: RwLock::new(snapshot),
			closed: AtomicBool::new(false),
		})
	}

	fn load_snapshot(path: &Path) -> Result<Buckets, StoreError> {
		if !path.exists() {
			return Ok(Buckets::new());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(Buckets::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, contents: &Buckets) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn ensure_open(&self) -> Result<(), StoreError> {
		if self.closed.load(Ordering::Acquire) { Err(StoreError::Closed) } else { Ok(()) }
	}
}
impl SecretStore for FileStore {
	fn read<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			self.ensure_open()?;

			Ok(self.inner.read().get(&self.bucket).and_then(|b| b.get(key.name())).cloned())
		})
	}

	fn write<'a>(&'a self, key: &'a StoreKey, value: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.ensure_open()?;

			let mut guard = self.inner.write();

			guard
				.entry(self.bucket.clone())
				.or_default()
				.insert(key.name().to_owned(), value.to_owned());
			self.persist_locked(&guard)
		})
	}

	fn remove<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			self.ensure_open()?;

			let mut guard = self.inner.write();
			let existed = guard
				.get_mut(&self.bucket)
				.map(|bucket| bucket.remove(key.name()).is_some())
				.unwrap_or(false);

			if existed {
				self.persist_locked(&guard)?;
			}

			Ok(existed)
		})
	}

	fn close(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			if !self.closed.swap(true, Ordering::AcqRel) {
				tracing::debug!(path = %self.path.display(), "closed file store");
			}

			Ok(())
		})
	}
}
