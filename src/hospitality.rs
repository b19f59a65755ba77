//! Typed client for the hospitality API.
//!
//! Every remote call goes through the authority's [`AuthorizedTransport`] and the
//! [`with_token_refresh`] wrapper. Directory resolution happens before any remote call, so an
//! unknown extension never reaches the network.

pub mod envelope;
pub mod retry;

pub use envelope::*;
pub use retry::with_token_refresh;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	directory::{DirectorySource, HousekeepingStatus, RoomDirectory},
	error::DecodeError,
	http::AuthorizedTransport,
	oauth::OAuthAuthority,
	obs::{self, FlowKind},
};

const ROOMS_ENDPOINT: &str = "getRooms";
const HOUSEKEEPING_ENDPOINT: &str = "postHousekeepingStatus";

/// Hospitality API operations served to the adapter.
pub struct HospitalityClient {
	authority: Arc<OAuthAuthority>,
	directory: Arc<dyn DirectorySource>,
	transport: AuthorizedTransport,
}
impl HospitalityClient {
	/// Creates a client resolving extensions through `directory`.
	pub fn new(authority: Arc<OAuthAuthority>, directory: Arc<dyn DirectorySource>) -> Self {
		let transport = authority.authorized_transport();

		Self { authority, directory, transport }
	}

	/// Authority used for token management.
	pub fn authority(&self) -> &Arc<OAuthAuthority> {
		&self.authority
	}

	/// Loads the current room directory.
	pub async fn directory(&self) -> Result<RoomDirectory> {
		self.directory.load().await
	}

	/// Lists rooms across every property, in remote order.
	pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>> {
		obs::observe(FlowKind::ListRooms, "list_rooms", self.list_rooms_inner()).await
	}

	/// Sets the housekeeping condition of the room behind `extension`.
	///
	/// `housekeeper_id` is only logged.
	pub async fn update_housekeeping(
		&self,
		extension: &str,
		condition: &str,
		housekeeper_id: &str,
	) -> Result<String> {
		self.apply_status(extension, &HousekeepingStatus::condition(condition), housekeeper_id).await
	}

	/// Same as [`update_housekeeping`](Self::update_housekeeping), with an optional
	/// do-not-disturb flag.
	pub async fn apply_status(
		&self,
		extension: &str,
		status: &HousekeepingStatus,
		housekeeper_id: &str,
	) -> Result<String> {
		obs::observe(
			FlowKind::UpdateHousekeeping,
			"update_housekeeping",
			self.apply_status_inner(extension, status, housekeeper_id),
		)
		.await
	}

	/// Resolves `extension` without contacting the remote.
	pub async fn get_room(&self, extension: &str) -> Result<RoomSummary> {
		let directory = self.directory.load().await?;
		let room_id = directory.resolve(extension)?;

		Ok(RoomSummary {
			room_id: room_id.to_owned(),
			extension: Some(extension.to_owned()),
			..Default::default()
		})
	}

	/// Starts an interactive login and returns the URL the operator must open.
	pub async fn handle_initial_login(&self) -> Result<Url> {
		let request = self.authority.authorization_url().await?;

		tracing::info!(url = %request.url, "authorization URL issued");

		Ok(request.url)
	}

	/// Completes an interactive login.
	pub async fn handle_oauth_callback(&self, state: &str, code: &str) -> Result<()> {
		let tokens = self.authority.exchange_code(state, code).await?;

		tracing::info!(
			access_token_len = tokens.access_token.len(),
			refresh_token_len = tokens.refresh_token.as_ref().map_or(0, TokenSecret::len),
			"stored tokens from the authorization callback"
		);

		Ok(())
	}

	/// Closes the secret store.
	pub async fn close(&self) -> Result<()> {
		Ok(self.authority.store().close().await?)
	}

	async fn list_rooms_inner(&self) -> Result<Vec<RoomSummary>> {
		let properties =
			with_token_refresh(&self.authority, ROOMS_ENDPOINT, move || self.fetch_rooms()).await?;
		let rooms = flatten_rooms(properties.unwrap_or_default());

		tracing::debug!(count = rooms.len(), "listed rooms");

		Ok(rooms)
	}

	async fn apply_status_inner(
		&self,
		extension: &str,
		status: &HousekeepingStatus,
		housekeeper_id: &str,
	) -> Result<String> {
		let directory = self.directory.load().await?;
		let room_id = directory.resolve(extension)?;

		tracing::info!(
			extension,
			room_id,
			condition = %status.condition,
			housekeeper_id,
			"updating housekeeping status"
		);

		let form = &housekeeping_form(room_id, status);
		let data = with_token_refresh(&self.authority, HOUSEKEEPING_ENDPOINT, move || {
			self.post_housekeeping(form)
		})
		.await?
		.filter(|data| !data.room_id.is_empty())
		.ok_or(DecodeError::MissingField { what: "housekeeping response", field: "data.roomID" })?;

		tracing::debug!(
			room_id = %data.room_id,
			condition = %data.room_condition,
			"remote accepted the update"
		);

		Ok(format!("Finish UpdateRoom successfully updated room {extension} to {}", status.condition))
	}

	async fn fetch_rooms(&self) -> Result<Envelope<Vec<PropertyRooms>>> {
		let request = self.transport.get(self.authority.config().api.rooms.clone());
		let body = self.transport.send(ROOMS_ENDPOINT, request).await?;

		Ok(Envelope::decode("rooms response", &body)?)
	}

	async fn post_housekeeping(
		&self,
		form: &[(&'static str, String)],
	) -> Result<Envelope<HousekeepingData>> {
		let request =
			self.transport.post(self.authority.config().api.housekeeping.clone()).form(form);
		let body = self.transport.send(HOUSEKEEPING_ENDPOINT, request).await?;

		Ok(Envelope::decode("housekeeping response", &body)?)
	}
}
impl Debug for HospitalityClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HospitalityClient")
			.field("authority", &self.authority)
			.finish_non_exhaustive()
	}
}

fn housekeeping_form(room_id: &str, status: &HousekeepingStatus) -> Vec<(&'static str, String)> {
	let mut form = vec![("roomID", room_id.to_owned()), ("roomCondition", status.condition.clone())];

	if let Some(do_not_disturb) = status.do_not_disturb {
		form.push(("doNotDisturb", do_not_disturb.to_string()));
	}

	form
}
