//! PBX call events and their translation into housekeeping commands.
//!
//! A housekeeper dials a status number from the room phone. The PBX reports the call with the
//! dialed `Number` and the calling extension in `Agent`; the number selects the condition through
//! the directory's housekeeper table.

// self
use crate::{
	_prelude::*,
	directory::{HousekeepingStatus, RoomDirectory},
};

/// Call record posted by the PBX.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallEvent {
	/// Dialed number.
	#[serde(default)]
	pub number: String,
	/// `Inbound` or `Outbound`.
	#[serde(default)]
	pub call_type: String,
	/// PBX-specific direction label.
	#[serde(default)]
	pub call_direction: String,
	/// Caller display name.
	#[serde(default)]
	pub name: String,
	/// Calling extension.
	#[serde(default)]
	pub agent: String,
	/// First name attached to the calling extension.
	#[serde(default)]
	pub agent_first_name: String,
	/// Call timestamp as sent by the PBX.
	#[serde(default)]
	pub date_time: String,
}
impl CallEvent {
	/// Classified call type.
	pub fn kind(&self) -> CallType {
		CallType::parse(&self.call_type)
	}

	/// Translates the event into a command, or `None` when it carries no status report.
	///
	/// Inbound calls, numbers missing from the housekeeper table, and events without a calling
	/// extension are dropped.
	pub fn normalize(&self, directory: &RoomDirectory) -> Option<HousekeepingCommand> {
		if self.kind() == CallType::Inbound {
			tracing::debug!(number = %self.number, "dropping inbound call");

			return None;
		}

		let Some(status) = directory.housekeepers().lookup(&self.number) else {
			tracing::debug!(number = %self.number, "dialed number is not a status number");

			return None;
		};
		let extension = self.agent.trim();

		if extension.is_empty() {
			tracing::debug!(number = %self.number, "call event has no calling extension");

			return None;
		}

		let housekeeper_id = match self.agent_first_name.trim() {
			"" => extension,
			first_name => first_name,
		};

		Some(HousekeepingCommand {
			extension: extension.to_owned(),
			housekeeper_id: housekeeper_id.to_owned(),
			status: status.clone(),
		})
	}
}

/// Direction of a PBX call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallType {
	/// Call received by the PBX.
	Inbound,
	/// Call placed from an extension.
	Outbound,
	/// Anything else.
	Other,
}
impl CallType {
	fn parse(raw: &str) -> Self {
		match raw.trim() {
			value if value.eq_ignore_ascii_case("inbound") => Self::Inbound,
			value if value.eq_ignore_ascii_case("outbound") => Self::Outbound,
			_ => Self::Other,
		}
	}
}

/// Status update derived from a call event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HousekeepingCommand {
	/// Room extension.
	pub extension: String,
	/// Housekeeper identifier, logged only.
	pub housekeeper_id: String,
	/// Status to record.
	pub status: HousekeepingStatus,
}
