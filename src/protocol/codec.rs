// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Encoding of outbound commands and decoding of inbound frames.
//!
//! The codec is pure: it never touches the network. Each [`Codec`] carries
//! the envelope context of one session (session id, mainboard id, sender
//! tag) so that every outbound command is stamped consistently.
//!
//! # Examples
//!
//! ```
//! use sdcp_lib::protocol::{Codec, Opcode, decode};
//!
//! let codec = Codec::new("mainboard-1");
//! let text = codec.encode(Opcode::Pause, serde_json::json!({}));
//!
//! let envelope = decode(&text).unwrap();
//! let response = envelope.response.unwrap();
//! assert_eq!(response.cmd, Opcode::Pause);
//! ```

use serde_json::Value;
use uuid::Uuid;

use crate::error::ParseError;

use super::correlator::next_request_id;
use super::envelope::{CommandData, CommandEnvelope, Opcode, StatusEnvelope};

/// Sender tag used by home-automation clients.
pub const DEFAULT_SENDER: u32 = 0;

/// Command encoder holding one session's envelope context.
///
/// The session id and sender are fixed; the mainboard id can be updated once
/// the printer reports it.
#[derive(Debug, Clone)]
pub struct Codec {
    session_id: String,
    mainboard_id: String,
    sender: u32,
}

impl Codec {
    /// Creates a codec with a fresh session id.
    #[must_use]
    pub fn new(mainboard_id: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().simple().to_string(),
            mainboard_id: mainboard_id.into(),
            sender: DEFAULT_SENDER,
        }
    }

    /// Sets the sender tag written to `From`.
    #[must_use]
    pub fn with_sender(mut self, sender: u32) -> Self {
        self.sender = sender;
        self
    }

    /// Returns the opaque session id written to `Id`.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns the mainboard id written to outbound commands.
    #[must_use]
    pub fn mainboard_id(&self) -> &str {
        &self.mainboard_id
    }

    /// Updates the mainboard id, typically once the printer has reported it.
    pub fn set_mainboard_id(&mut self, mainboard_id: impl Into<String>) {
        self.mainboard_id = mainboard_id.into();
    }

    /// Builds a fresh envelope for the given request id.
    #[must_use]
    pub fn envelope(&self, request_id: &str, opcode: Opcode, data: Value) -> CommandEnvelope {
        CommandEnvelope {
            id: self.session_id.clone(),
            data: CommandData {
                cmd: opcode,
                data,
                request_id: request_id.to_string(),
                mainboard_id: self.mainboard_id.clone(),
                timestamp: chrono::Utc::now().timestamp(),
                from: self.sender,
            },
        }
    }

    /// Encodes a command with a fresh request id.
    #[must_use]
    pub fn encode(&self, opcode: Opcode, data: Value) -> String {
        self.encode_request(&next_request_id(), opcode, data)
    }

    /// Encodes a command under an already allocated request id.
    #[must_use]
    pub fn encode_request(&self, request_id: &str, opcode: Opcode, data: Value) -> String {
        let envelope = self.envelope(request_id, opcode, data);
        // Serializing a struct of strings, integers and a `Value` cannot fail
        serde_json::to_string(&envelope).unwrap_or_default()
    }
}

/// Decodes an inbound text frame.
///
/// # Errors
///
/// Returns [`ParseError::Json`] if the text is not valid JSON and
/// [`ParseError::UnexpectedFormat`] if it is not a JSON object. Malformed
/// fields inside an otherwise valid object are skipped, not reported.
pub fn decode(text: &str) -> Result<StatusEnvelope, ParseError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(ParseError::UnexpectedFormat(format!(
            "expected JSON object, got {}",
            json_kind(&value)
        )));
    }
    Ok(serde_json::from_value(value)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_of_encode_preserves_opcode_and_data() {
        let codec = Codec::new("mb");
        let data = json!({"TempTargetNozzle": 210, "LightStatus": {"SecondLight": 1}});

        let text = codec.encode(Opcode::SetParameters, data.clone());
        let response = decode(&text).unwrap().response.unwrap();

        assert_eq!(response.cmd, Opcode::SetParameters);
        assert_eq!(response.data, data);
        assert_eq!(response.mainboard_id.as_deref(), Some("mb"));
        assert!(response.request_id.is_some());
    }

    #[test]
    fn encode_uses_fresh_request_ids() {
        let codec = Codec::new("mb");
        let a: Value = serde_json::from_str(&codec.encode(Opcode::Status, json!({}))).unwrap();
        let b: Value = serde_json::from_str(&codec.encode(Opcode::Status, json!({}))).unwrap();
        assert_ne!(a["Data"]["RequestID"], b["Data"]["RequestID"]);
        assert_eq!(a["Id"], b["Id"]);
    }

    #[test]
    fn encode_request_stamps_context() {
        let codec = Codec::new("mb-7").with_sender(3);
        let value: Value =
            serde_json::from_str(&codec.encode_request("req-1", Opcode::Resume, json!({})))
                .unwrap();
        assert_eq!(value["Id"], codec.session_id());
        assert_eq!(value["Data"]["Cmd"], 131);
        assert_eq!(value["Data"]["RequestID"], "req-1");
        assert_eq!(value["Data"]["MainboardID"], "mb-7");
        assert_eq!(value["Data"]["From"], 3);
        assert!(value["Data"]["TimeStamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn learned_mainboard_id_is_used_and_timestamp_is_seconds() {
        let mut codec = Codec::new("");
        let session_id = codec.session_id().to_string();
        codec.set_mainboard_id("learned");

        let value: Value = serde_json::from_str(&codec.encode(Opcode::Status, json!({}))).unwrap();
        assert_eq!(value["Data"]["MainboardID"], "learned");
        assert_eq!(value["Id"], json!(session_id));

        let now = chrono::Utc::now().timestamp();
        let stamp = value["Data"]["TimeStamp"].as_i64().unwrap();
        assert!((now - stamp).abs() <= 5);
    }

    #[test]
    fn decode_rejects_invalid_json() {
        assert!(matches!(decode("{not json"), Err(ParseError::Json(_))));
    }

    #[test]
    fn decode_rejects_non_objects() {
        assert!(matches!(
            decode("[1,2,3]"),
            Err(ParseError::UnexpectedFormat(_))
        ));
        assert!(matches!(decode("\"pong\""), Err(ParseError::UnexpectedFormat(_))));
    }

    #[test]
    fn decode_frame_with_status_and_response() {
        let text = r#"{
            "Status": {"TempOfNozzle": 200.0},
            "Data": {"Cmd": 0, "Data": {"Ack": 0}, "RequestID": "r1"},
            "Topic": "sdcp/status/mb"
        }"#;
        let envelope = decode(text).unwrap();
        assert!(envelope.status.is_some());
        assert!(envelope.response.is_some());
        assert_eq!(envelope.topic.as_deref(), Some("sdcp/status/mb"));
    }

    #[test]
    fn decode_empty_object() {
        let envelope = decode("{}").unwrap();
        assert!(envelope.is_empty());
    }
}
