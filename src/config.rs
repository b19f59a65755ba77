//! Process configuration: OAuth client settings, API endpoints, store and directory selection.
//!
//! Values come from the environment. Apart from the client id and secret, each value may also be
//! supplied out of band through [`SecretStore::retrieve_var`]. Emptiness is not checked at load
//! time; an empty required value surfaces as [`ConfigError::Missing`] the first time an operation
//! needs it.

// std
use std::{env, path::PathBuf};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ConfigError,
	store::{FileStore, Namespace, SecretStore, unquote},
};

/// Environment variable names understood by the bridge.
pub mod vars {
	/// OAuth client identifier (environment only).
	pub const CLIENT_ID: &str = "CLOUDBEDS_CLIENT_ID";
	/// OAuth client secret (environment only).
	pub const CLIENT_SECRET: &str = "CLOUDBEDS_CLIENT_SECRET";
	/// Redirect URI registered with the authority.
	pub const REDIRECT_URL: &str = "CLOUDBEDS_REDIRECT_URL";
	/// Authorization endpoint.
	pub const AUTH_URL: &str = "CLOUDBEDS_AUTH_URL";
	/// Token endpoint.
	pub const TOKEN_URL: &str = "CLOUDBEDS_TOKEN_URL";
	/// Comma-separated scope list.
	pub const SCOPES: &str = "CLOUDBEDS_SCOPES";
	/// Base URL of the hospitality API.
	pub const API_URL: &str = "CLOUDBEDS_API_URL";
	/// Token endpoint client authentication (`post` or `basic`).
	pub const CLIENT_AUTH: &str = "CLOUDBEDS_CLIENT_AUTH";
	/// Application name used in the store namespace.
	pub const APPLICATION_NAME: &str = "APPLICATION_NAME";
	/// Deployment environment used in the store namespace.
	pub const ENVIRONMENT: &str = "ENVIRONMENT";
	/// Region of the managed parameter store.
	pub const REGION: &str = "AWS_REGION";
	/// Secret store backend (`file` or `parameter`).
	pub const SECRET_STORE: &str = "SECRET_STORE";
	/// Embedded store file name.
	pub const SECRET_STORE_FILE: &str = "SECRET_STORE_FILE";
	/// Local room directory file.
	pub const DIRECTORY_FILE: &str = "DIRECTORY_FILE";
	/// Remote room directory object URL.
	pub const DIRECTORY_URL: &str = "DIRECTORY_URL";
}

const STORE_FALLBACK_VARS: &[&str] = &[
	vars::REDIRECT_URL,
	vars::AUTH_URL,
	vars::TOKEN_URL,
	vars::SCOPES,
	vars::API_URL,
	vars::CLIENT_AUTH,
	vars::DIRECTORY_FILE,
	vars::DIRECTORY_URL,
];

/// Client authentication used at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// Form POST body parameters for `client_id`/`client_secret`.
	#[default]
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}
impl ClientAuthMethod {
	fn parse(raw: Option<&str>) -> Result<Self, ConfigError> {
		match raw.map(str::to_ascii_lowercase).as_deref() {
			None | Some("post") => Ok(Self::ClientSecretPost),
			Some("basic") => Ok(Self::ClientSecretBasic),
			Some(other) =>
				Err(ConfigError::Unsupported { field: vars::CLIENT_AUTH, value: other.into() }),
		}
	}
}

/// Hospitality API endpoints derived from one base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiEndpoints {
	/// Base URL ending in `/`.
	pub base: Url,
	/// `GET` endpoint listing rooms.
	pub rooms: Url,
	/// `POST` endpoint updating housekeeping status.
	pub housekeeping: Url,
}
impl ApiEndpoints {
	/// Production API base.
	pub const DEFAULT_BASE: &str = "https://hotels.cloudbeds.com/api/v1.1/";

	/// Derives the endpoint set from `base`; a missing trailing slash is added.
	pub fn with_base(base: &str) -> Result<Self, ConfigError> {
		let normalized =
			if base.ends_with('/') { base.to_owned() } else { format!("{base}/") };
		let base = Url::parse(&normalized)
			.map_err(|source| ConfigError::InvalidUrl { field: vars::API_URL, source })?;
		let join = |path: &str| {
			base.join(path).map_err(|source| ConfigError::InvalidUrl { field: vars::API_URL, source })
		};

		Ok(Self { rooms: join("getRooms")?, housekeeping: join("postHousekeepingStatus")?, base })
	}
}

/// OAuth client configuration, read-only after start-up.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Redirect URI registered with the authority.
	pub redirect_url: String,
	/// Authorization endpoint.
	pub auth_url: String,
	/// Token endpoint.
	pub token_url: String,
	/// Ordered scope list.
	pub scopes: Vec<String>,
	/// Hospitality API endpoints.
	pub api: ApiEndpoints,
	/// Token endpoint client authentication.
	pub client_auth: ClientAuthMethod,
}
impl ClientConfig {
	/// Builds the configuration from a variable lookup.
	pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let api = match lookup(vars::API_URL) {
			Some(base) => ApiEndpoints::with_base(&base)?,
			None => ApiEndpoints::with_base(ApiEndpoints::DEFAULT_BASE)?,
		};

		Ok(Self {
			client_id: lookup(vars::CLIENT_ID).unwrap_or_default(),
			client_secret: TokenSecret::new(lookup(vars::CLIENT_SECRET).unwrap_or_default()),
			redirect_url: lookup(vars::REDIRECT_URL).unwrap_or_default(),
			auth_url: lookup(vars::AUTH_URL).unwrap_or_default(),
			token_url: lookup(vars::TOKEN_URL).unwrap_or_default(),
			scopes: parse_scopes(lookup(vars::SCOPES).as_deref().unwrap_or_default()),
			api,
			client_auth: ClientAuthMethod::parse(lookup(vars::CLIENT_AUTH).as_deref())?,
		})
	}

	/// Reads the environment, falling back to `store` variables where permitted.
	pub async fn load(store: &dyn SecretStore) -> Result<Self> {
		let vars = collect_vars(store).await?;

		Ok(Self::from_vars(|name| vars.get(name).cloned())?)
	}

	/// Parsed authorization endpoint.
	pub fn authorization_endpoint(&self) -> Result<Url, ConfigError> {
		parse_required(vars::AUTH_URL, &self.auth_url)
	}

	/// Parsed token endpoint.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		parse_required(vars::TOKEN_URL, &self.token_url)
	}

	/// Parsed redirect URI.
	pub fn redirect_endpoint(&self) -> Result<Url, ConfigError> {
		parse_required(vars::REDIRECT_URL, &self.redirect_url)
	}

	/// Non-empty client identifier.
	pub fn require_client_id(&self) -> Result<&str, ConfigError> {
		require(vars::CLIENT_ID, &self.client_id)
	}

	/// Non-empty client secret.
	pub fn require_client_secret(&self) -> Result<&TokenSecret, ConfigError> {
		require(vars::CLIENT_SECRET, self.client_secret.expose())?;

		Ok(&self.client_secret)
	}
}

/// Secret store backend selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
	/// Embedded single-file store.
	#[default]
	File,
	/// Managed parameter store.
	Parameter,
}

/// Secret store settings, read from the environment only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
	/// Backend to open.
	pub backend: StoreBackend,
	/// Key namespace.
	pub namespace: Namespace,
	/// Region for the managed backend.
	pub region: Option<String>,
	/// File used by the embedded backend.
	pub file: PathBuf,
}
impl StoreConfig {
	/// Default embedded store file.
	pub const DEFAULT_FILE: &str = "housekeeping.db.json";

	/// Builds the store settings from a variable lookup.
	pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let backend = match lookup(vars::SECRET_STORE).map(|v| v.to_ascii_lowercase()).as_deref() {
			None | Some("file") => StoreBackend::File,
			Some("parameter") | Some("ssm") => StoreBackend::Parameter,
			Some(other) =>
				return Err(ConfigError::Unsupported {
					field: vars::SECRET_STORE,
					value: other.into(),
				}),
		};
		let defaults = Namespace::default();

		Ok(Self {
			backend,
			namespace: Namespace::new(
				lookup(vars::APPLICATION_NAME).unwrap_or(defaults.app),
				lookup(vars::ENVIRONMENT).unwrap_or(defaults.env),
			),
			region: lookup(vars::REGION),
			file: lookup(vars::SECRET_STORE_FILE).unwrap_or_else(|| Self::DEFAULT_FILE.into()).into(),
		})
	}

	/// Reads the store settings from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_vars(env_var)
	}

	/// Opens the configured backend.
	pub async fn open(&self) -> Result<Arc<dyn SecretStore>> {
		match self.backend {
			StoreBackend::File => Ok(Arc::new(FileStore::open(&self.file, &self.namespace)?)),
			#[cfg(feature = "ssm")]
			StoreBackend::Parameter => Ok(Arc::new(
				crate::store::ParameterStore::connect(self.namespace.clone(), self.region.clone())
					.await,
			)),
			#[cfg(not(feature = "ssm"))]
			StoreBackend::Parameter => Err(ConfigError::Unsupported {
				field: vars::SECRET_STORE,
				value: "parameter (build with the `ssm` feature)".into(),
			}
			.into()),
		}
	}
}

/// Where the room directory is loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryConfig {
	/// Local JSON file, re-read on every call.
	File(PathBuf),
	/// Remote JSON object, fetched on every call.
	Url(Url),
}
impl DirectoryConfig {
	/// Default local directory file.
	pub const DEFAULT_FILE: &str = "directory.json";

	/// Builds the directory settings from a variable lookup; a URL wins over a file.
	pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(raw) = lookup(vars::DIRECTORY_URL) {
			let url = Url::parse(&raw)
				.map_err(|source| ConfigError::InvalidUrl { field: vars::DIRECTORY_URL, source })?;

			return Ok(Self::Url(url));
		}

		Ok(Self::File(lookup(vars::DIRECTORY_FILE).unwrap_or_else(|| Self::DEFAULT_FILE.into()).into()))
	}

	/// Reads the environment, falling back to `store` variables.
	pub async fn load(store: &dyn SecretStore) -> Result<Self> {
		let vars = collect_vars(store).await?;

		Ok(Self::from_vars(|name| vars.get(name).cloned())?)
	}
}

/// Everything the bridge needs besides the store settings.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
	/// OAuth client settings.
	pub client: ClientConfig,
	/// Room directory location.
	pub directory: DirectoryConfig,
}
impl BridgeConfig {
	/// Reads the environment once, falling back to `store` variables where permitted.
	pub async fn load(store: &dyn SecretStore) -> Result<Self> {
		let vars = collect_vars(store).await?;
		let lookup = |name: &str| vars.get(name).cloned();

		Ok(Self {
			client: ClientConfig::from_vars(lookup)?,
			directory: DirectoryConfig::from_vars(lookup)?,
		})
	}
}

/// Splits a comma-separated scope list, trimming entries and dropping empties.
pub fn parse_scopes(raw: &str) -> Vec<String> {
	raw.split(',').map(str::trim).filter(|scope| !scope.is_empty()).map(str::to_owned).collect()
}

fn env_var(name: &str) -> Option<String> {
	env::var(name).ok().map(|value| unquote(value.trim()).to_owned()).filter(|value| !value.is_empty())
}

async fn collect_vars(store: &dyn SecretStore) -> Result<HashMap<&'static str, String>> {
	let mut collected = HashMap::new();

	for name in [vars::CLIENT_ID, vars::CLIENT_SECRET] {
		if let Some(value) = env_var(name) {
			collected.insert(name, value);
		}
	}
	for &name in STORE_FALLBACK_VARS {
		let value = match env_var(name) {
			Some(value) => Some(value),
			None => store.retrieve_var(name).await?,
		};

		if let Some(value) = value {
			collected.insert(name, value);
		}
	}

	Ok(collected)
}

fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ConfigError> {
	if value.trim().is_empty() { Err(ConfigError::Missing { field }) } else { Ok(value) }
}

fn parse_required(field: &'static str, value: &str) -> Result<Url, ConfigError> {
	Url::parse(require(field, value)?).map_err(|source| ConfigError::InvalidUrl { field, source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::{MemoryStore, StoreKey};

	fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> =
			pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();

		move |name| map.get(name).cloned()
	}

	#[test]
	fn scopes_are_split_on_commas_and_trimmed() {
		assert_eq!(parse_scopes("read:room, write:housekeeping,,"), vec![
			"read:room".to_owned(),
			"write:housekeeping".to_owned()
		]);
		assert!(parse_scopes("").is_empty());
	}

	#[test]
	fn empty_client_config_reports_missing_fields() {
		let config = ClientConfig::from_vars(|_| None).expect("Defaults should build.");

		assert!(matches!(
			config.authorization_endpoint(),
			Err(ConfigError::Missing { field: vars::AUTH_URL })
		));
		assert!(matches!(
			config.token_endpoint(),
			Err(ConfigError::Missing { field: vars::TOKEN_URL })
		));
		assert!(matches!(
			config.require_client_id(),
			Err(ConfigError::Missing { field: vars::CLIENT_ID })
		));
		assert_eq!(config.api.base.as_str(), ApiEndpoints::DEFAULT_BASE);
		assert_eq!(config.client_auth, ClientAuthMethod::ClientSecretPost);
	}

	#[test]
	fn api_endpoints_join_onto_base_without_trailing_slash() {
		let api = ApiEndpoints::with_base("https://api.example.com/api/v1.1")
			.expect("API base should parse.");

		assert_eq!(api.rooms.as_str(), "https://api.example.com/api/v1.1/getRooms");
		assert_eq!(
			api.housekeeping.as_str(),
			"https://api.example.com/api/v1.1/postHousekeepingStatus"
		);
	}

	#[test]
	fn store_config_parses_backend_and_namespace() {
		let config = StoreConfig::from_vars(lookup_from(&[
			(vars::SECRET_STORE, "parameter"),
			(vars::APPLICATION_NAME, "bridge"),
			(vars::ENVIRONMENT, "prod"),
			(vars::REGION, "eu-west-1"),
		]))
		.expect("Store config should parse.");

		assert_eq!(config.backend, StoreBackend::Parameter);
		assert_eq!(config.namespace, Namespace::new("bridge", "prod"));
		assert_eq!(config.region.as_deref(), Some("eu-west-1"));

		let err = StoreConfig::from_vars(lookup_from(&[(vars::SECRET_STORE, "redis")]))
			.expect_err("Unknown backends should be rejected.");

		assert!(matches!(err, ConfigError::Unsupported { field: vars::SECRET_STORE, .. }));
	}

	#[test]
	fn directory_url_wins_over_file() {
		let config = DirectoryConfig::from_vars(lookup_from(&[
			(vars::DIRECTORY_FILE, "rooms.json"),
			(vars::DIRECTORY_URL, "https://bucket.example.com/rooms.json"),
		]))
		.expect("Directory config should parse.");

		assert!(matches!(config, DirectoryConfig::Url(_)));
		assert_eq!(
			DirectoryConfig::from_vars(|_| None).expect("Default directory should build."),
			DirectoryConfig::File(DirectoryConfig::DEFAULT_FILE.into())
		);
	}

	#[tokio::test]
	async fn client_secret_is_never_read_from_store_vars() {
		let store = MemoryStore::with_entries([
			(StoreKey::Var(vars::CLIENT_SECRET.into()), "leaked".into()),
			(StoreKey::Var(vars::SCOPES.into()), "\"read:room,write:housekeeping\"".into()),
		]);
		let collected = collect_vars(&store).await.expect("Variable collection should succeed.");

		if env::var(vars::CLIENT_SECRET).is_err() {
			assert!(!collected.contains_key(vars::CLIENT_SECRET));
		}
		if env::var(vars::SCOPES).is_err() {
			assert_eq!(
				collected.get(vars::SCOPES).map(String::as_str),
				Some("read:room,write:housekeeping")
			);
		}
	}
}
