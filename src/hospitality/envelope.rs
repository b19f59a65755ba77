//! Response envelope and payload shapes of the hospitality API.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{_prelude::*, error::DecodeError};

/// JSON wrapper returned by every hospitality endpoint.
///
/// `data` is only decoded when `success` is true, so a rejection with an unexpected payload
/// still reaches the refresh path instead of failing as a decode error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope<T> {
	/// Application-level success flag.
	pub success: bool,
	/// Payload of a successful response.
	pub data: Option<T>,
	/// Remote-supplied message, usually present on rejections.
	pub message: Option<String>,
}
impl<T> Envelope<T> {
	/// Message describing a rejection.
	pub fn rejection_message(&self) -> String {
		match self.message.as_deref().map(str::trim) {
			Some(message) if !message.is_empty() => message.to_owned(),
			_ => "success=false without a message".into(),
		}
	}
}
impl<T> Envelope<T>
where
	T: DeserializeOwned,
{
	/// Decodes an envelope whose `data` is a `T`.
	pub fn decode(what: &'static str, bytes: &[u8]) -> Result<Self, DecodeError> {
		let raw: RawEnvelope = DecodeError::decode(what, bytes)?;

		if !raw.success {
			return Ok(Self { success: false, data: None, message: raw.message });
		}

		let data = match raw.data {
			Value::Null => None,
			value => Some(
				serde_path_to_error::deserialize(value)
					.map_err(|source| DecodeError::Json { what, source })?,
			),
		};

		Ok(Self { success: true, data, message: raw.message })
	}
}

#[derive(Deserialize)]
struct RawEnvelope {
	#[serde(default)]
	success: bool,
	#[serde(default)]
	data: Value,
	#[serde(default)]
	message: Option<String>,
}

/// `data` of a `postHousekeepingStatus` response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousekeepingData {
	/// Date the status applies to.
	#[serde(default)]
	pub date: String,
	/// Updated room id.
	#[serde(rename = "roomID", default)]
	pub room_id: String,
	/// Condition now recorded by the remote.
	#[serde(default)]
	pub room_condition: String,
	/// Do-not-disturb flag, when the remote reports it.
	#[serde(default)]
	pub do_not_disturb: Option<bool>,
}

/// One property group of a `getRooms` response.
#[derive(Clone, Debug, Deserialize)]
pub struct PropertyRooms {
	/// Property identifier.
	#[serde(rename = "propertyID", default)]
	pub property_id: String,
	/// Rooms of the property, in remote order.
	#[serde(default)]
	pub rooms: Vec<RemoteRoom>,
}

/// Room as reported by `getRooms`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRoom {
	/// Room id.
	#[serde(rename = "roomID", default)]
	pub room_id: String,
	/// Display name.
	#[serde(default)]
	pub room_name: String,
	/// Room type name.
	#[serde(default)]
	pub room_type_name: String,
	/// Maximum number of guests.
	#[serde(default)]
	pub max_guests: Option<Lenient<u32>>,
	/// Whether the room is private.
	#[serde(default)]
	pub is_private: bool,
	/// Whether the room is blocked.
	#[serde(default)]
	pub room_blocked: bool,
	/// Whether the room is occupied.
	#[serde(default)]
	pub room_occupied: bool,
	/// Room phone number.
	#[serde(default)]
	pub room_phone: Option<String>,
	/// Current housekeeping condition.
	#[serde(default)]
	pub room_condition: Option<String>,
}

/// Numeric value the remote may send either as a number or as a string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lenient<T>(pub T);
impl<'de, T> Deserialize<'de> for Lenient<T>
where
	T: Deserialize<'de> + std::str::FromStr,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Repr<T> {
			Value(T),
			Text(String),
		}

		match Repr::<T>::deserialize(deserializer)? {
			Repr::Value(value) => Ok(Self(value)),
			Repr::Text(text) => text
				.trim()
				.parse()
				.map(Self)
				.map_err(|_| serde::de::Error::custom(format!("`{text}` is not a number"))),
		}
	}
}

/// Public room shape served to the adapter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
	/// Remote room id.
	pub room_id: String,
	/// Display name.
	pub room_name: String,
	/// Room type name.
	pub room_type: String,
	/// Maximum number of guests.
	pub capacity: u32,
	/// Private room flag.
	pub is_private: bool,
	/// Blocked room flag.
	pub is_blocked: bool,
	/// Occupied room flag.
	pub is_occupied: bool,
	/// Room phone number, when known.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	/// Current housekeeping condition, when known.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub condition: Option<String>,
	/// Phone extension from the room directory, when known.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub extension: Option<String>,
}
impl From<RemoteRoom> for RoomSummary {
	fn from(room: RemoteRoom) -> Self {
		Self {
			room_id: room.room_id,
			room_name: room.room_name,
			room_type: room.room_type_name,
			capacity: room.max_guests.map(|Lenient(n)| n).unwrap_or_default(),
			is_private: room.is_private,
			is_blocked: room.room_blocked,
			is_occupied: room.room_occupied,
			phone: room.room_phone.filter(|phone| !phone.is_empty()),
			condition: room.room_condition.filter(|condition| !condition.is_empty()),
			extension: None,
		}
	}
}

/// Flattens property groups into room summaries, keeping remote order.
pub fn flatten_rooms(properties: Vec<PropertyRooms>) -> Vec<RoomSummary> {
	properties.into_iter().flat_map(|property| property.rooms).map(RoomSummary::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rejections_skip_payload_decoding() {
		let envelope = Envelope::<HousekeepingData>::decode(
			"fixture",
			br#"{"success":false,"data":[],"message":"Token expired"}"#,
		)
		.expect("A rejection should decode regardless of its payload.");

		assert!(!envelope.success);
		assert_eq!(envelope.rejection_message(), "Token expired");
	}

	#[test]
	fn housekeeping_payload_decodes() {
		let envelope = Envelope::<HousekeepingData>::decode(
			"fixture",
			br#"{"success":true,"data":{"date":"2024-01-01","roomID":"544559-1","roomCondition":"clean"}}"#,
		)
		.expect("Housekeeping fixture should decode.");
		let data = envelope.data.expect("Payload should be present.");

		assert_eq!(data.room_id, "544559-1");
		assert_eq!(data.room_condition, "clean");
		assert_eq!(data.do_not_disturb, None);
	}

	#[test]
	fn rooms_flatten_across_properties_in_order() {
		let envelope = Envelope::<Vec<PropertyRooms>>::decode(
			"fixture",
			br#"{"success":true,"count":3,"total":3,"data":[
				{"propertyID":"1","rooms":[
					{"roomID":"544559-1","roomName":"101","roomTypeName":"Double","maxGuests":"2","isPrivate":true},
					{"roomID":"544559-2","roomName":"102","roomTypeName":"Single","maxGuests":1,"roomBlocked":true}
				]},
				{"propertyID":"2","rooms":[{"roomID":"900-1","roomName":"A"}]}
			]}"#,
		)
		.expect("Rooms fixture should decode.");
		let rooms = flatten_rooms(envelope.data.expect("Payload should be present."));
		let ids: Vec<_> = rooms.iter().map(|room| room.room_id.as_str()).collect();

		assert_eq!(ids, ["544559-1", "544559-2", "900-1"]);
		assert_eq!(rooms[0].capacity, 2);
		assert!(rooms[0].is_private);
		assert!(rooms[1].is_blocked);
		assert_eq!(rooms[2].capacity, 0);
	}

	#[test]
	fn malformed_success_payload_names_the_path() {
		let err = Envelope::<HousekeepingData>::decode(
			"housekeeping response",
			br#"{"success":true,"data":{"roomID":5}}"#,
		)
		.expect_err("A numeric room id should fail to decode.");

		assert!(matches!(err, DecodeError::Json { what: "housekeeping response", .. }));
	}
}
