//! Edge-facing façade over [`HospitalityClient`].
//!
//! Each operation forwards to the client and folds the outcome into an [`AdapterReply`] carrying
//! the HTTP status the edge should answer with. Failures are logged here and rendered as
//! `<kind>: <detail>`; tokens and the client secret never appear in replies.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, event::CallEvent, hospitality::HospitalityClient};

/// Body of an [`AdapterReply`].
#[derive(Clone, Debug, PartialEq)]
pub enum ReplyBody {
	/// No body.
	Empty,
	/// Plain text.
	Text(String),
	/// JSON document.
	Json(Value),
}

/// Status code and body for the edge.
#[derive(Clone, Debug, PartialEq)]
pub struct AdapterReply {
	/// HTTP status code.
	pub status: u16,
	/// Response body.
	pub body: ReplyBody,
}
impl AdapterReply {
	/// `200` with a plain-text body.
	pub fn ok_text(text: impl Into<String>) -> Self {
		Self { status: 200, body: ReplyBody::Text(text.into()) }
	}

	/// `200` with a JSON body.
	pub fn ok_json<T>(value: &T) -> Self
	where
		T: Serialize,
	{
		match serde_json::to_value(value) {
			Ok(value) => Self { status: 200, body: ReplyBody::Json(value) },
			Err(e) => {
				tracing::error!(error = %e, "failed to serialize reply");

				Self { status: 500, body: ReplyBody::Text(format!("internal: {e}")) }
			},
		}
	}

	/// `204` without a body.
	pub fn no_content() -> Self {
		Self { status: 204, body: ReplyBody::Empty }
	}

	/// Maps `err` onto its edge status.
	pub fn from_error(err: &Error) -> Self {
		let kind = err.kind();

		Self { status: kind.http_status(), body: ReplyBody::Text(format!("{kind}: {err}")) }
	}

	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin forwarding layer used by the edge.
#[derive(Clone, Debug)]
pub struct Adapter {
	client: Arc<HospitalityClient>,
}
impl Adapter {
	/// Wraps `client`.
	pub fn new(client: Arc<HospitalityClient>) -> Self {
		Self { client }
	}

	/// Underlying API client.
	pub fn client(&self) -> &Arc<HospitalityClient> {
		&self.client
	}

	/// Issues an authorization URL for an operator-initiated login.
	pub async fn handle_manual_login(&self) -> AdapterReply {
		reply("manual_login", self.client.handle_initial_login().await, |url| {
			AdapterReply::ok_text(url.to_string())
		})
	}

	/// Completes the authorization round-trip.
	pub async fn handle_oauth_callback(&self, state: &str, code: &str) -> AdapterReply {
		reply("oauth_callback", self.client.handle_oauth_callback(state, code).await, |()| {
			AdapterReply::ok_text("Authorization complete")
		})
	}

	/// Updates the housekeeping condition of one room.
	pub async fn update_room(
		&self,
		extension: &str,
		condition: &str,
		housekeeper_id: &str,
	) -> AdapterReply {
		let result = self.client.update_housekeeping(extension, condition, housekeeper_id).await;

		reply("update_room", result, AdapterReply::ok_text)
	}

	/// Lists every room.
	pub async fn get_rooms(&self) -> AdapterReply {
		reply("get_rooms", self.client.list_rooms().await, |rooms| AdapterReply::ok_json(&rooms))
	}

	/// Resolves one room by extension.
	pub async fn get_room(&self, extension: &str) -> AdapterReply {
		reply("get_room", self.client.get_room(extension).await, |room| AdapterReply::ok_json(&room))
	}

	/// Handles a PBX call event; events without a status report answer `204`.
	pub async fn handle_call_event(&self, event: &CallEvent) -> AdapterReply {
		let directory = match self.client.directory().await {
			Ok(directory) => directory,
			Err(e) => return reply::<()>("call_event", Err(e), |()| AdapterReply::no_content()),
		};
		let Some(command) = event.normalize(&directory) else {
			return AdapterReply::no_content();
		};
		let result = self
			.client
			.apply_status(&command.extension, &command.status, &command.housekeeper_id)
			.await;

		reply("call_event", result, AdapterReply::ok_text)
	}

	/// Releases the secret store.
	pub async fn close(&self) -> Result<()> {
		self.client.close().await
	}
}

fn reply<T>(
	operation: &'static str,
	result: Result<T>,
	ok: impl FnOnce(T) -> AdapterReply,
) -> AdapterReply {
	match result {
		Ok(value) => ok(value),
		Err(e) => {
			let reply = AdapterReply::from_error(&e);

			if reply.status >= 500 {
				tracing::error!(operation, kind = %e.kind(), error = %e, "operation failed");
			} else {
				tracing::warn!(operation, kind = %e.kind(), error = %e, "operation failed");
			}

			reply
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::TransportError;

	#[test]
	fn errors_render_kind_and_status() {
		let reply = AdapterReply::from_error(&Error::NotFound {
			resource: "room extension",
			key: "999".into(),
		});

		assert_eq!(reply.status, 404);
		assert_eq!(
			reply.body,
			ReplyBody::Text("not_found: No room extension found for `999`.".into())
		);

		let reply = AdapterReply::from_error(
			&TransportError::Status { endpoint: "getRooms", status: 503 }.into(),
		);

		assert_eq!(reply.status, 502);
		assert!(!reply.is_success());
	}

	#[test]
	fn json_replies_serialize_payloads() {
		let reply = AdapterReply::ok_json(&serde_json::json!({ "room_id": "544559-1" }));

		assert!(reply.is_success());
		assert_eq!(reply.body, ReplyBody::Json(serde_json::json!({ "room_id": "544559-1" })));
	}
}
