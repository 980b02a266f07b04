// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire-level envelope types.
//!
//! Outbound commands are wrapped in a [`CommandEnvelope`]:
//!
//! ```json
//! {"Id":"…","Data":{"Cmd":129,"Data":{},"RequestID":"…","MainboardID":"…","TimeStamp":1700000000,"From":0}}
//! ```
//!
//! Inbound frames decode into a [`StatusEnvelope`] whose blocks are all
//! optional. Blocks and the fields inside them are decoded leniently: a
//! field with an unexpected type is dropped (and logged) while the rest of
//! the block survives.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Command opcode carried in `Data.Cmd`.
///
/// # Examples
///
/// ```
/// use sdcp_lib::protocol::Opcode;
///
/// assert_eq!(Opcode::Pause.code(), 129);
/// assert_eq!(Opcode::from_code(131), Opcode::Resume);
/// assert_eq!(Opcode::from_code(7), Opcode::Other(7));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Request a status push.
    Status,
    /// Request the machine attributes.
    Attributes,
    /// Pause the current job.
    Pause,
    /// Stop (cancel) the current job.
    Stop,
    /// Resume a paused job.
    Resume,
    /// Set machine parameters: target temperatures, fans, lights.
    SetParameters,
    /// Any other vendor opcode.
    Other(u32),
}

impl Opcode {
    /// Maps a raw `Cmd` value to an opcode.
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Status,
            1 => Self::Attributes,
            129 => Self::Pause,
            130 => Self::Stop,
            131 => Self::Resume,
            403 => Self::SetParameters,
            other => Self::Other(other),
        }
    }

    /// Returns the raw `Cmd` value.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Status => 0,
            Self::Attributes => 1,
            Self::Pause => 129,
            Self::Stop => 130,
            Self::Resume => 131,
            Self::SetParameters => 403,
            Self::Other(code) => code,
        }
    }
}

impl Serialize for Opcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

impl<'de> Deserialize<'de> for Opcode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::from_code)
    }
}

/// Outbound command envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Opaque session id.
    #[serde(rename = "Id")]
    pub id: String,
    /// Command body.
    #[serde(rename = "Data")]
    pub data: CommandData,
}

/// Body of a [`CommandEnvelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    /// Command opcode.
    #[serde(rename = "Cmd")]
    pub cmd: Opcode,
    /// Command-specific data object.
    #[serde(rename = "Data")]
    pub data: Value,
    /// Request id used to correlate the response.
    #[serde(rename = "RequestID")]
    pub request_id: String,
    /// Target mainboard id.
    #[serde(rename = "MainboardID")]
    pub mainboard_id: String,
    /// Unix timestamp in seconds.
    #[serde(rename = "TimeStamp")]
    pub timestamp: i64,
    /// Sender tag.
    #[serde(rename = "From")]
    pub from: u32,
}

/// A decoded inbound frame.
///
/// Any combination of blocks may be present; each is handled on its own.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusEnvelope {
    /// Telemetry block.
    #[serde(rename = "Status", default, deserialize_with = "lenient")]
    pub status: Option<StatusBlock>,

    /// Command response block (taken from `Data` when it carries a `Cmd`).
    #[serde(rename = "Data", default, deserialize_with = "lenient")]
    pub response: Option<ResponseBlock>,

    /// Machine attributes block.
    #[serde(rename = "Attributes", default, deserialize_with = "lenient")]
    pub attributes: Option<AttributesBlock>,

    /// Topic the printer published the frame on.
    #[serde(rename = "Topic", default, deserialize_with = "lenient")]
    pub topic: Option<String>,

    /// Mainboard id at the top level of the frame.
    #[serde(rename = "MainboardID", default, deserialize_with = "lenient")]
    pub mainboard_id: Option<String>,
}

impl StatusEnvelope {
    /// Returns `true` if the frame carries no usable block.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.response.is_none() && self.attributes.is_none()
    }

    /// Returns the mainboard id from whichever block reports it.
    #[must_use]
    pub fn mainboard_id(&self) -> Option<&str> {
        self.mainboard_id
            .as_deref()
            .or_else(|| self.response.as_ref()?.mainboard_id.as_deref())
            .or_else(|| self.attributes.as_ref()?.mainboard_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// The `Status` telemetry block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusBlock {
    /// Machine status codes.
    #[serde(rename = "CurrentStatus", default, deserialize_with = "lenient")]
    pub current_status: Option<Vec<i64>>,

    /// Nozzle temperature.
    #[serde(rename = "TempOfNozzle", default, deserialize_with = "lenient")]
    pub temp_of_nozzle: Option<f64>,

    /// Nozzle target temperature.
    #[serde(rename = "TempTargetNozzle", default, deserialize_with = "lenient")]
    pub temp_target_nozzle: Option<f64>,

    /// Bed temperature.
    #[serde(rename = "TempOfHotbed", default, deserialize_with = "lenient")]
    pub temp_of_hotbed: Option<f64>,

    /// Bed target temperature.
    #[serde(rename = "TempTargetHotbed", default, deserialize_with = "lenient")]
    pub temp_target_hotbed: Option<f64>,

    /// Chamber temperature.
    #[serde(rename = "TempOfBox", default, deserialize_with = "lenient")]
    pub temp_of_box: Option<f64>,

    /// Chamber target temperature.
    #[serde(rename = "TempTargetBox", default, deserialize_with = "lenient")]
    pub temp_target_box: Option<f64>,

    /// Fan speeds.
    #[serde(rename = "CurrentFanSpeed", default, deserialize_with = "lenient")]
    pub fan_speed: Option<FanSpeedBlock>,

    /// Toolhead coordinates as `"x,y,z"`. The vendor spells the key without
    /// the trailing `t`.
    #[serde(rename = "CurrenCoord", default, deserialize_with = "lenient")]
    pub current_coord: Option<String>,

    /// Z offset.
    #[serde(rename = "ZOffset", default, deserialize_with = "lenient")]
    pub z_offset: Option<f64>,

    /// Light state.
    #[serde(rename = "LightStatus", default, deserialize_with = "lenient")]
    pub light_status: Option<LightBlock>,

    /// Print job information.
    #[serde(rename = "PrintInfo", default, deserialize_with = "lenient")]
    pub print_info: Option<PrintInfoBlock>,
}

/// The `CurrentFanSpeed` block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FanSpeedBlock {
    /// Part cooling fan, percent.
    #[serde(rename = "ModelFan", default, deserialize_with = "lenient")]
    pub model_fan: Option<f64>,

    /// Auxiliary fan, percent.
    #[serde(rename = "AuxiliaryFan", default, deserialize_with = "lenient")]
    pub auxiliary_fan: Option<f64>,

    /// Chamber fan, percent.
    #[serde(rename = "BoxFan", default, deserialize_with = "lenient")]
    pub box_fan: Option<f64>,
}

/// The `LightStatus` block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LightBlock {
    /// Chamber light, reported as `0`/`1` or as a boolean.
    #[serde(rename = "SecondLight", default, deserialize_with = "lenient_flag")]
    pub second_light: Option<bool>,

    /// RGB strip channels.
    #[serde(rename = "RgbLight", default, deserialize_with = "lenient")]
    pub rgb_light: Option<Vec<i64>>,
}

/// The `PrintInfo` block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PrintInfoBlock {
    /// Print status code.
    #[serde(rename = "Status", default, deserialize_with = "lenient")]
    pub status: Option<i64>,

    /// Current layer.
    #[serde(rename = "CurrentLayer", default, deserialize_with = "lenient")]
    pub current_layer: Option<i64>,

    /// Total layers.
    #[serde(rename = "TotalLayer", default, deserialize_with = "lenient")]
    pub total_layer: Option<i64>,

    /// Elapsed print time in seconds.
    #[serde(rename = "CurrentTicks", default, deserialize_with = "lenient")]
    pub current_ticks: Option<f64>,

    /// Estimated total print time in seconds.
    #[serde(rename = "TotalTicks", default, deserialize_with = "lenient")]
    pub total_ticks: Option<f64>,

    /// Job file name.
    #[serde(rename = "Filename", default, deserialize_with = "lenient")]
    pub filename: Option<String>,

    /// Progress percent.
    #[serde(rename = "Progress", default, deserialize_with = "lenient")]
    pub progress: Option<f64>,

    /// Print speed percent.
    #[serde(rename = "PrintSpeedPct", default, deserialize_with = "lenient")]
    pub print_speed_pct: Option<f64>,

    /// Job id assigned by the printer.
    #[serde(rename = "TaskId", default, deserialize_with = "lenient")]
    pub task_id: Option<String>,
}

/// A command response block, decoded from the frame's `Data` object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseBlock {
    /// Opcode the response belongs to.
    #[serde(rename = "Cmd")]
    pub cmd: Opcode,

    /// Echoed request id, when the firmware echoes it.
    #[serde(rename = "RequestID", default, deserialize_with = "lenient")]
    pub request_id: Option<String>,

    /// Response data; carries `Ack` for command results.
    #[serde(rename = "Data", default)]
    pub data: Value,

    /// Mainboard id of the responding printer.
    #[serde(rename = "MainboardID", default, deserialize_with = "lenient")]
    pub mainboard_id: Option<String>,
}

impl ResponseBlock {
    /// Returns the `Ack` code, if present and numeric.
    #[must_use]
    pub fn ack(&self) -> Option<i64> {
        self.data.get("Ack").and_then(Value::as_i64)
    }
}

/// The `Attributes` block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttributesBlock {
    /// User-visible printer name.
    #[serde(rename = "Name", default, deserialize_with = "lenient")]
    pub name: Option<String>,

    /// Machine model name.
    #[serde(rename = "MachineName", default, deserialize_with = "lenient")]
    pub machine_name: Option<String>,

    /// Firmware version.
    #[serde(rename = "FirmwareVersion", default, deserialize_with = "lenient")]
    pub firmware_version: Option<String>,

    /// Mainboard id.
    #[serde(rename = "MainboardID", default, deserialize_with = "lenient")]
    pub mainboard_id: Option<String>,

    /// Mainboard IP address.
    #[serde(rename = "MainboardIP", default, deserialize_with = "lenient")]
    pub mainboard_ip: Option<String>,
}

/// Deserializes an optional value, turning a type mismatch into `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed field");
            Ok(None)
        }
    }
}

/// Deserializes a flag sent either as a boolean or as a number.
fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::Null => None,
        other => {
            tracing::warn!(value = %other, "Skipping malformed flag");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_codes() {
        for op in [
            Opcode::Status,
            Opcode::Attributes,
            Opcode::Pause,
            Opcode::Stop,
            Opcode::Resume,
            Opcode::SetParameters,
            Opcode::Other(999),
        ] {
            assert_eq!(Opcode::from_code(op.code()), op);
        }
    }

    #[test]
    fn command_envelope_field_order() {
        let envelope = CommandEnvelope {
            id: "sid".to_string(),
            data: CommandData {
                cmd: Opcode::Pause,
                data: serde_json::json!({}),
                request_id: "rid".to_string(),
                mainboard_id: "mb".to_string(),
                timestamp: 1_700_000_000,
                from: 0,
            },
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            json,
            r#"{"Id":"sid","Data":{"Cmd":129,"Data":{},"RequestID":"rid","MainboardID":"mb","TimeStamp":1700000000,"From":0}}"#
        );
    }

    #[test]
    fn malformed_field_does_not_discard_block() {
        let json = r#"{"Status":{"TempOfNozzle":"hot","TempOfHotbed":60.5}}"#;
        let envelope: StatusEnvelope = serde_json::from_str(json).unwrap();
        let status = envelope.status.unwrap();
        assert_eq!(status.temp_of_nozzle, None);
        assert_eq!(status.temp_of_hotbed, Some(60.5));
    }

    #[test]
    fn data_without_cmd_is_not_a_response() {
        let json = r#"{"Data":{"Foo":1}}"#;
        let envelope: StatusEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.response.is_none());
        assert!(envelope.is_empty());
    }

    #[test]
    fn light_flag_accepts_numbers_and_booleans() {
        let a: LightBlock = serde_json::from_str(r#"{"SecondLight":1}"#).unwrap();
        let b: LightBlock = serde_json::from_str(r#"{"SecondLight":false}"#).unwrap();
        let c: LightBlock = serde_json::from_str(r#"{"SecondLight":"on"}"#).unwrap();
        assert_eq!(a.second_light, Some(true));
        assert_eq!(b.second_light, Some(false));
        assert_eq!(c.second_light, None);
    }

    #[test]
    fn mainboard_id_lookup_order() {
        let json = r#"{"Data":{"Cmd":0,"MainboardID":"from-data"},"Attributes":{"MainboardID":"from-attrs"}}"#;
        let envelope: StatusEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.mainboard_id(), Some("from-data"));

        let json = r#"{"MainboardID":"top","Data":{"Cmd":0,"MainboardID":"from-data"}}"#;
        let envelope: StatusEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.mainboard_id(), Some("top"));
    }

    #[test]
    fn response_ack() {
        let json = r#"{"Data":{"Cmd":129,"Data":{"Ack":1},"RequestID":"abc"}}"#;
        let envelope: StatusEnvelope = serde_json::from_str(json).unwrap();
        let response = envelope.response.unwrap();
        assert_eq!(response.cmd, Opcode::Pause);
        assert_eq!(response.request_id.as_deref(), Some("abc"));
        assert_eq!(response.ack(), Some(1));
    }
}
