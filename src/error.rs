//! Bridge-level error types shared by the store, the OAuth authority, and the API client.

// self
use crate::_prelude::*;

/// Bridge-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical bridge error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout, non-2xx status).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// A directory entry or OAuth state nonce does not exist.
	#[error("No {resource} found for `{key}`.")]
	NotFound {
		/// What was looked up.
		resource: &'static str,
		/// Lookup key.
		key: String,
	},
	/// Remote API answered with `success=false`.
	#[error("Remote API rejected the request: {message}.")]
	RemoteRejection {
		/// Remote-supplied message, possibly extended with local context.
		message: String,
	},
	/// Refresh token is missing or was rejected; an operator must authorize again.
	#[error("Interactive login required: {reason}.")]
	Unauthorized {
		/// Why the stored credentials are unusable.
		reason: String,
	},
	/// Callback `state` does not match the persisted nonce.
	#[error("Authorization state mismatch.")]
	StateMismatch,
	/// The login routine kept failing to obtain a refresh token.
	#[error("Failed to get refresh token after {attempts} attempts.")]
	LoginExhausted {
		/// Number of refresh attempts made.
		attempts: u32,
	},
}
impl Error {
	/// Classifies the error into the kind reported at the edge.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Storage(crate::store::StoreError::NotFound { .. }) => ErrorKind::NotFound,
			Self::Storage(_) => ErrorKind::Storage,
			Self::Config(ConfigError::Missing { .. }) => ErrorKind::ConfigMissing,
			Self::Config(_) => ErrorKind::Config,
			Self::Transport(_) => ErrorKind::TransportFailure,
			Self::Decode(_) => ErrorKind::DecodeFailure,
			Self::NotFound { .. } => ErrorKind::NotFound,
			Self::RemoteRejection { .. } => ErrorKind::RemoteRejection,
			Self::Unauthorized { .. } | Self::LoginExhausted { .. } => ErrorKind::Unauthorized,
			Self::StateMismatch => ErrorKind::InternalAuth,
		}
	}

	/// HTTP status the edge should answer with for this error.
	pub fn http_status(&self) -> u16 {
		self.kind().http_status()
	}
}

/// Coarse error classification used for edge responses and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// A required configuration value is empty.
	ConfigMissing,
	/// Any other configuration problem.
	Config,
	/// Extension or OAuth state is unknown.
	NotFound,
	/// Network, timeout, or non-2xx HTTP failure.
	TransportFailure,
	/// Body failed to parse.
	DecodeFailure,
	/// Envelope reported `success=false`.
	RemoteRejection,
	/// Refresh token rejected or missing.
	Unauthorized,
	/// OAuth state mismatch on callback.
	InternalAuth,
	/// Secret store backend failure.
	Storage,
}
impl ErrorKind {
	/// Returns a stable label suitable for responses and log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ConfigMissing => "config_missing",
			Self::Config => "config",
			Self::NotFound => "not_found",
			Self::TransportFailure => "transport_failure",
			Self::DecodeFailure => "decode_failure",
			Self::RemoteRejection => "remote_rejection",
			Self::Unauthorized => "unauthorized",
			Self::InternalAuth => "internal_auth",
			Self::Storage => "storage",
		}
	}

	/// HTTP status code mapped onto this kind.
	pub const fn http_status(self) -> u16 {
		match self {
			Self::NotFound => 404,
			Self::TransportFailure | Self::DecodeFailure | Self::RemoteRejection => 502,
			_ => 500,
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures raised by the bridge.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required configuration value is empty.
	#[error("Configuration value `{field}` is missing.")]
	Missing {
		/// Environment variable or field name.
		field: &'static str,
	},
	/// A configured URL cannot be parsed.
	#[error("Configuration value `{field}` is not a valid URL.")]
	InvalidUrl {
		/// Environment variable or field name.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured value is outside the accepted set.
	#[error("Configuration value `{field}` has unsupported value `{value}`.")]
	Unsupported {
		/// Environment variable or field name.
		field: &'static str,
		/// Rejected value.
		value: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO, HTTP status).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure or timeout.
	#[error("Network error occurred while calling {endpoint}.")]
	Network {
		/// Logical endpoint label.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Remote answered with a non-2xx status.
	#[error("{endpoint} answered with HTTP {status}.")]
	Status {
		/// Logical endpoint label.
		endpoint: &'static str,
		/// HTTP status code.
		status: u16,
	},
	/// Token endpoint returned something other than a token or an OAuth error.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: &'static str, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

/// Body decoding failures.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// JSON body did not match the expected shape.
	#[error("{what} is malformed JSON.")]
	Json {
		/// Logical payload label.
		what: &'static str,
		/// Structured parsing failure including the failing path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Envelope reported success but omitted required data.
	#[error("{what} is missing `{field}`.")]
	MissingField {
		/// Logical payload label.
		what: &'static str,
		/// Missing field name.
		field: &'static str,
	},
}
impl DecodeError {
	/// Decodes `bytes` into `T`, tagging failures with `what`.
	pub fn decode<T>(what: &'static str, bytes: &[u8]) -> Result<T, Self>
	where
		T: serde::de::DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut de).map_err(|source| Self::Json { what, source })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn kinds_map_onto_edge_statuses() {
		let not_found = Error::NotFound { resource: "room extension", key: "999".into() };

		assert_eq!(not_found.kind(), ErrorKind::NotFound);
		assert_eq!(not_found.http_status(), 404);

		let missing = Error::from(ConfigError::Missing { field: "CLOUDBEDS_AUTH_URL" });

		assert_eq!(missing.kind(), ErrorKind::ConfigMissing);
		assert_eq!(missing.http_status(), 500);
		assert_eq!(
			Error::Unauthorized { reason: "refresh token rejected".into() }.http_status(),
			500
		);
		assert_eq!(Error::RemoteRejection { message: "nope".into() }.http_status(), 502);
		assert_eq!(
			Error::from(StoreError::NotFound { key: "abc".into() }).kind(),
			ErrorKind::NotFound
		);
	}

	#[test]
	fn decode_errors_name_the_failing_path() {
		let err = DecodeError::decode::<BTreeMap<String, u32>>("fixture", br#"{"a":"x"}"#)
			.expect_err("String value should fail to decode as u32.");

		match err {
			DecodeError::Json { what, source } => {
				assert_eq!(what, "fixture");
				assert_eq!(source.path().to_string(), "a");
			},
			other => panic!("Unexpected decode error: {other:?}."),
		}
	}
}
