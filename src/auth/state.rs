//! One-time `state` nonces and authorization URL composition.

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

const STATE_BYTES: usize = 10;

/// Number of hexadecimal characters in every generated [`OAuthState`].
pub const STATE_LEN: usize = STATE_BYTES * 2;

/// Single-use nonce binding an authorization callback to the request that initiated it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OAuthState(String);
impl OAuthState {
	/// Draws a fresh nonce from the thread-local CSPRNG.
	pub fn generate() -> Self {
		let mut bytes = [0_u8; STATE_BYTES];

		rand::rng().fill(&mut bytes);

		Self(hex::encode(bytes))
	}

	/// Returns the nonce as transmitted in the `state` query parameter.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns true when `value` has the shape of a generated nonce.
	pub fn is_well_formed(value: &str) -> bool {
		value.len() == STATE_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
	}
}
impl Debug for OAuthState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("OAuthState").field(&self.0).finish()
	}
}
impl Display for OAuthState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Authorization URL handed to the operator plus the `state` it carries.
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
	/// Fully-formed authorize URL the operator should open.
	pub url: Url,
	/// Nonce persisted in the secret store until the callback consumes it.
	pub state: OAuthState,
}

/// Composes the authorize URL for the authorization-code grant.
///
/// Scopes are configured as a list and transmitted space-delimited.
pub(crate) fn build_authorize_url(
	auth_url: &Url,
	client_id: &str,
	redirect_uri: &str,
	scopes: &[String],
	state: &OAuthState,
) -> Url {
	let mut url = auth_url.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri);

	if !scopes.is_empty() {
		pairs.append_pair("scope", &scopes.join(" "));
	}

	pairs.append_pair("response_type", "code");
	pairs.append_pair("state", state.as_str());

	drop(pairs);

	url
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashSet;
	// self
	use super::*;

	#[test]
	fn generated_states_are_twenty_hex_characters_and_unique() {
		let states: HashSet<_> = (0..256).map(|_| OAuthState::generate()).collect();

		assert_eq!(states.len(), 256);

		for state in &states {
			assert_eq!(state.as_str().len(), STATE_LEN);
			assert!(OAuthState::is_well_formed(state.as_str()));
		}
	}

	#[test]
	fn authorize_url_space_joins_scopes() {
		let base = Url::parse("https://hotels.example.com/api/v1.1/oauth")
			.expect("Authorize URL fixture should parse.");
		let state = OAuthState::generate();
		let url = build_authorize_url(
			&base,
			"client",
			"https://bridge.example.com/cb",
			&["read:room".into(), "write:housekeeping".into()],
			&state,
		);
		let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();

		assert_eq!(pairs.get("scope"), Some(&"read:room write:housekeeping".into()));
		assert_eq!(pairs.get("response_type"), Some(&"code".into()));
		assert_eq!(pairs.get("state"), Some(&state.as_str().into()));
		assert_eq!(pairs.get("redirect_uri"), Some(&"https://bridge.example.com/cb".into()));
	}

	#[test]
	fn authorize_url_omits_empty_scope() {
		let base =
			Url::parse("https://auth.example.com/authorize").expect("Authorize URL should parse.");
		let url = build_authorize_url(&base, "client", "urn:cb", &[], &OAuthState::generate());

		assert!(url.query_pairs().all(|(key, _)| key != "scope"));
	}
}
