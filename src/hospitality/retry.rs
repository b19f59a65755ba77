//! Invalidate-refresh-retry around hospitality API calls.
//!
//! The remote answers HTTP 200 with `success=false` when the access token is stale, so the
//! application-level flag, not the HTTP status, drives the refresh. Transport and decode failures
//! are returned as-is and never retried.

// self
use crate::{_prelude::*, hospitality::Envelope, oauth::OAuthAuthority};

/// Runs `attempt`, refreshing the access token and re-running it once when the envelope reports
/// `success=false`.
///
/// Returns the payload of the first successful envelope. A second rejection is final and
/// surfaces as [`Error::RemoteRejection`]. When the refresh itself fails the retry is skipped and
/// the original rejection is reported together with the refresh failure; a rejected refresh
/// token also logs a fresh authorization URL for the operator.
pub async fn with_token_refresh<T, F, Fut>(
	authority: &OAuthAuthority,
	operation: &'static str,
	mut attempt: F,
) -> Result<Option<T>>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<Envelope<T>>>,
{
	let first = attempt().await?;

	if first.success {
		return Ok(first.data);
	}

	let rejection = first.rejection_message();

	tracing::info!(operation, %rejection, "remote rejected the request; refreshing the access token");

	if let Err(e) = authority.refresh_access_token().await {
		return Err(match e {
			Error::Unauthorized { reason } => {
				log_reauthorization(authority).await;

				Error::Unauthorized { reason: format!("{reason}; {operation} failed with: {rejection}") }
			},
			other => Error::RemoteRejection {
				message: format!("{rejection}; token refresh failed: {other}"),
			},
		});
	}

	let second = attempt().await?;

	if second.success {
		Ok(second.data)
	} else {
		let message = second.rejection_message();

		tracing::warn!(operation, %message, "remote rejected the request after a token refresh");

		Err(Error::RemoteRejection { message })
	}
}

/// Emits a fresh authorization URL through the log.
pub(crate) async fn log_reauthorization(authority: &OAuthAuthority) {
	match authority.authorization_url().await {
		Ok(request) => tracing::warn!(
			url = %request.url,
			"interactive login required; open the URL to authorize the bridge"
		),
		Err(e) => tracing::error!(error = %e, "failed to build an authorization URL"),
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::_preludet::build_test_authority;

	fn rejected<T>(message: &str) -> Envelope<T> {
		Envelope { success: false, data: None, message: Some(message.into()) }
	}

	#[tokio::test]
	async fn success_is_returned_without_refreshing() {
		let (authority, _store) = build_test_authority("http://127.0.0.1:9");
		let calls = &AtomicUsize::new(0);
		let data = with_token_refresh(&authority, "fixture", move || async move {
			calls.fetch_add(1, Ordering::SeqCst);

			Ok(Envelope { success: true, data: Some(7), message: None })
		})
		.await
		.expect("A successful envelope should pass through.");

		assert_eq!(data, Some(7));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(authority.refresh_metrics().attempts(), 0);
	}

	#[tokio::test]
	async fn missing_refresh_token_skips_the_retry() {
		let (authority, _store) = build_test_authority("http://127.0.0.1:9");
		let calls = &AtomicUsize::new(0);
		let err = with_token_refresh::<u8, _, _>(&authority, "fixture", move || async move {
			calls.fetch_add(1, Ordering::SeqCst);

			Ok(rejected("Token expired"))
		})
		.await
		.expect_err("A failed refresh should surface an error.");

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(matches!(err, Error::Unauthorized { ref reason } if reason.contains("Token expired")));
	}

	#[tokio::test]
	async fn transport_failures_are_not_retried() {
		let (authority, _store) = build_test_authority("http://127.0.0.1:9");
		let calls = &AtomicUsize::new(0);
		let err = with_token_refresh::<u8, _, _>(&authority, "fixture", move || async move {
			calls.fetch_add(1, Ordering::SeqCst);

			Err(crate::error::TransportError::Status { endpoint: "fixture", status: 503 }.into())
		})
		.await
		.expect_err("Transport failures should propagate.");

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(err.kind(), crate::error::ErrorKind::TransportFailure);
		assert_eq!(authority.refresh_metrics().attempts(), 0);
	}
}
