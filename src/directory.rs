//! Extension-to-room directory and housekeeper status table.
//!
//! A directory document is JSON in one of two shapes:
//!
//! - a flat object mapping extensions to room ids, `{"101":"544559-1"}`;
//! - a structured object with `extension_map` and `housekeeper_map` lists.
//!
//! Sources re-read the document on every [`DirectorySource::load`].

// std
use std::{
	fs,
	io::ErrorKind as IoErrorKind,
	path::PathBuf,
};
// self
use crate::{
	_prelude::*,
	config::DirectoryConfig,
	error::{DecodeError, TransportError},
};

/// Boxed future returned by [`DirectorySource::load`].
pub type DirectoryFuture<'a> = Pin<Box<dyn Future<Output = Result<RoomDirectory>> + 'a + Send>>;

/// Anything able to produce the current [`RoomDirectory`].
pub trait DirectorySource
where
	Self: Send + Sync,
{
	/// Loads a fresh copy of the directory.
	fn load(&self) -> DirectoryFuture<'_>;
}

/// One `extension_map` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionEntry {
	/// Phone extension installed in the room.
	pub extension: String,
	/// Remote room identifier.
	pub room_id: String,
}

/// One `housekeeper_map` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousekeeperEntry {
	/// Number a housekeeper dials to report the status.
	pub number: String,
	/// Room condition reported by that number, sent verbatim.
	pub condition: String,
	/// Do-not-disturb flag sent alongside the condition, when set.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub do_not_disturb: Option<bool>,
}

/// Housekeeping status carried by an update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HousekeepingStatus {
	/// Room condition, e.g. `clean` or `dirty`.
	pub condition: String,
	/// Optional do-not-disturb flag.
	pub do_not_disturb: Option<bool>,
}
impl HousekeepingStatus {
	/// Status carrying only a condition.
	pub fn condition(condition: impl Into<String>) -> Self {
		Self { condition: condition.into(), do_not_disturb: None }
	}
}
impl From<&HousekeeperEntry> for HousekeepingStatus {
	fn from(entry: &HousekeeperEntry) -> Self {
		Self { condition: entry.condition.clone(), do_not_disturb: entry.do_not_disturb }
	}
}

/// Dialed-number lookup table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HousekeeperTable(BTreeMap<String, HousekeepingStatus>);
impl HousekeeperTable {
	/// Builds the table from `housekeeper_map` entries; later duplicates win.
	pub fn from_entries<'a, I>(entries: I) -> Self
	where
		I: IntoIterator<Item = &'a HousekeeperEntry>,
	{
		Self(entries.into_iter().map(|entry| (entry.number.clone(), entry.into())).collect())
	}

	/// Status reported by dialing `number`.
	pub fn lookup(&self, number: &str) -> Option<&HousekeepingStatus> {
		self.0.get(number.trim())
	}

	/// Number of configured status numbers.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when no status numbers are configured.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DirectoryDocument {
	Structured {
		extension_map: Vec<ExtensionEntry>,
		#[serde(default)]
		housekeeper_map: Vec<HousekeeperEntry>,
	},
	Flat(BTreeMap<String, String>),
}

/// Extension-to-room-id mapping plus the housekeeper table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoomDirectory {
	rooms: BTreeMap<String, String>,
	housekeepers: HousekeeperTable,
}
impl RoomDirectory {
	/// Builds a directory from `(extension, room_id)` pairs.
	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			rooms: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
			housekeepers: HousekeeperTable::default(),
		}
	}

	/// Replaces the housekeeper table.
	pub fn with_housekeepers(mut self, housekeepers: HousekeeperTable) -> Self {
		self.housekeepers = housekeepers;

		self
	}

	/// Parses either directory document shape.
	pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
		match DecodeError::decode::<DirectoryDocument>("room directory", bytes)? {
			DirectoryDocument::Flat(rooms) =>
				Ok(Self { rooms, housekeepers: HousekeeperTable::default() }),
			DirectoryDocument::Structured { extension_map, housekeeper_map } => Ok(Self {
				rooms: extension_map.into_iter().map(|e| (e.extension, e.room_id)).collect(),
				housekeepers: HousekeeperTable::from_entries(&housekeeper_map),
			}),
		}
	}

	/// Resolves `extension` to its non-empty room id.
	pub fn resolve(&self, extension: &str) -> Result<&str> {
		self.rooms
			.get(extension)
			.map(String::as_str)
			.filter(|room_id| !room_id.is_empty())
			.ok_or_else(|| Error::NotFound { resource: "room extension", key: extension.into() })
	}

	/// Housekeeper status numbers.
	pub fn housekeepers(&self) -> &HousekeeperTable {
		&self.housekeepers
	}

	/// Number of mapped extensions.
	pub fn len(&self) -> usize {
		self.rooms.len()
	}

	/// Returns true when no extension is mapped.
	pub fn is_empty(&self) -> bool {
		self.rooms.is_empty()
	}
}

/// Directory held in memory.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory(RoomDirectory);
impl StaticDirectory {
	/// Wraps a fixed directory.
	pub fn new(directory: RoomDirectory) -> Self {
		Self(directory)
	}
}
impl DirectorySource for StaticDirectory {
	fn load(&self) -> DirectoryFuture<'_> {
		Box::pin(async move { Ok(self.0.clone()) })
	}
}

/// Directory read from a local JSON file.
///
/// The file is a small local document read with a single blocking call per load; deployments
/// with a large or remote directory use [`UrlDirectory`].
#[derive(Clone, Debug)]
pub struct FileDirectory {
	path: PathBuf,
}
impl FileDirectory {
	/// Reads from `path` on every load.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

}
impl DirectorySource for FileDirectory {
	fn load(&self) -> DirectoryFuture<'_> {
		Box::pin(async move {
			let bytes = fs::read(&self.path).map_err(|e| match e.kind() {
				IoErrorKind::NotFound => Error::NotFound {
					resource: "room directory",
					key: self.path.display().to_string(),
				},
				_ => TransportError::Io(e).into(),
			})?;

			Ok(RoomDirectory::parse(&bytes)?)
		})
	}
}

/// Directory fetched from a blob storage object over HTTP(S).
#[derive(Clone, Debug)]
pub struct UrlDirectory {
	client: ReqwestClient,
	url: Url,
}
impl UrlDirectory {
	const ENDPOINT: &str = "room directory";

	/// Fetches `url` with `client` on every load.
	pub fn new(client: ReqwestClient, url: Url) -> Self {
		Self { client, url }
	}
}
impl DirectorySource for UrlDirectory {
	fn load(&self) -> DirectoryFuture<'_> {
		Box::pin(async move {
			let response = self
				.client
				.get(self.url.clone())
				.send()
				.await
				.map_err(|e| TransportError::network(Self::ENDPOINT, e))?;
			let status = response.status();

			if status == reqwest::StatusCode::NOT_FOUND {
				return Err(Error::NotFound { resource: "room directory", key: self.url.to_string() });
			}
			if !status.is_success() {
				return Err(
					TransportError::Status { endpoint: Self::ENDPOINT, status: status.as_u16() }.into()
				);
			}

			let bytes =
				response.bytes().await.map_err(|e| TransportError::network(Self::ENDPOINT, e))?;

			Ok(RoomDirectory::parse(&bytes)?)
		})
	}
}

/// Builds the source described by `config`.
pub fn source_from_config(
	config: &DirectoryConfig,
	client: ReqwestClient,
) -> Arc<dyn DirectorySource> {
	match config {
		DirectoryConfig::File(path) => Arc::new(FileDirectory::new(path.clone())),
		DirectoryConfig::Url(url) => Arc::new(UrlDirectory::new(client, url.clone())),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn flat_documents_map_extensions_to_rooms() {
		let directory =
			RoomDirectory::parse(br#"{"101":"544559-1","102":""}"#).expect("Flat map should parse.");

		assert_eq!(directory.resolve("101").expect("101 should resolve."), "544559-1");
		assert!(matches!(
			directory.resolve("102"),
			Err(Error::NotFound { resource: "room extension", .. })
		));
		assert!(matches!(directory.resolve("999"), Err(Error::NotFound { .. })));
		assert!(directory.housekeepers().is_empty());
	}

	#[test]
	fn structured_documents_carry_housekeeper_numbers() {
		let directory = RoomDirectory::parse(
			br#"{
				"extension_map": [{"extension": "101", "room_id": "544559-1"}],
				"housekeeper_map": [
					{"number": "8001", "condition": "clean"},
					{"number": "8003", "condition": "dirty", "do_not_disturb": true}
				]
			}"#,
		)
		.expect("Structured document should parse.");

		assert_eq!(directory.resolve("101").expect("101 should resolve."), "544559-1");
		assert_eq!(
			directory.housekeepers().lookup("8001"),
			Some(&HousekeepingStatus::condition("clean"))
		);
		assert_eq!(
			directory.housekeepers().lookup("8003").and_then(|status| status.do_not_disturb),
			Some(true)
		);
		assert!(directory.housekeepers().lookup("8002").is_none());
	}

	#[test]
	fn malformed_documents_are_decode_failures() {
		assert!(matches!(RoomDirectory::parse(b"[1,2,3]"), Err(DecodeError::Json { .. })));
	}

	#[tokio::test]
	async fn missing_file_is_not_found() {
		let dir = tempfile::tempdir().expect("Temporary directory should be created.");
		let source = FileDirectory::new(dir.path().join("absent.json"));
		let err = source.load().await.expect_err("Absent file should fail to load.");

		assert!(matches!(err, Error::NotFound { resource: "room directory", .. }));
	}

	#[tokio::test]
	async fn file_directory_rereads_on_every_load() {
		let dir = tempfile::tempdir().expect("Temporary directory should be created.");
		let path = dir.path().join("directory.json");
		let source = FileDirectory::new(&path);

		fs::write(&path, br#"{"101":"544559-1"}"#).expect("Fixture should be written.");

		assert_eq!(source.load().await.expect("First load should succeed.").len(), 1);

		fs::write(&path, br#"{"101":"544559-1","102":"544559-2"}"#)
			.expect("Fixture should be rewritten.");

		assert_eq!(source.load().await.expect("Second load should succeed.").len(), 2);
	}
}
