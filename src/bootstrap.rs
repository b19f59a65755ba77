//! Start-up login routine.
//!
//! [`login`] walks the token lifecycle as a bounded loop: with a refresh token it refreshes, and
//! without one it emits an authorization URL for the operator. A refresh token that keeps being
//! rejected without disappearing from the store stops the loop after [`MAX_LOGIN_RETRIES`]
//! retries.

// self
use crate::{
	_prelude::*,
	oauth::OAuthAuthority,
	obs::{self, FlowKind},
};

/// Retries allowed after the first rejected refresh.
pub const MAX_LOGIN_RETRIES: u32 = 2;

/// Result of a login attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
	/// A usable access token is stored.
	Ready,
	/// An operator must open the URL to authorize the bridge.
	AwaitingAuthorization(Url),
}

/// Runs [`login`] unless an access token is already stored.
pub async fn bootstrap(authority: &OAuthAuthority) -> Result<LoginOutcome> {
	if authority.store().retrieve_access_token().await?.is_some() {
		tracing::debug!("access token present; skipping login");

		return Ok(LoginOutcome::Ready);
	}

	login(authority).await
}

/// Obtains an access token from the stored refresh token, or asks for an interactive login.
pub async fn login(authority: &OAuthAuthority) -> Result<LoginOutcome> {
	obs::observe(FlowKind::Login, "login", login_loop(authority)).await
}

async fn login_loop(authority: &OAuthAuthority) -> Result<LoginOutcome> {
	let mut retries = 0;

	loop {
		if authority.store().retrieve_refresh_token().await?.is_none() {
			let request = authority.authorization_url().await?;

			tracing::warn!(
				url = %request.url,
				"no refresh token stored; open the URL to authorize the bridge"
			);

			return Ok(LoginOutcome::AwaitingAuthorization(request.url));
		}

		match authority.refresh_access_token().await {
			Ok(()) => return Ok(LoginOutcome::Ready),
			Err(Error::Unauthorized { reason }) => {
				if retries >= MAX_LOGIN_RETRIES {
					tracing::error!(%reason, retries, "giving up on login");

					return Err(Error::LoginExhausted { attempts: retries + 1 });
				}

				retries += 1;

				tracing::warn!(%reason, retries, "refresh token rejected; retrying login");
			},
			Err(e) => return Err(e),
		}
	}
}
