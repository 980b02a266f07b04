// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Printer command definitions.
//!
//! User actions are expressed as [`Intent`]s. Each intent maps to one SDCP
//! opcode and data object through the [`Command`] trait, and submitting it
//! yields an [`IntentResult`].
//!
//! # Available Intents
//!
//! | Intent | Opcode | Data |
//! |--------|--------|------|
//! | [`Intent::Pause`] | 129 | `{}` |
//! | [`Intent::Cancel`] | 130 | `{}` |
//! | [`Intent::Resume`] | 131 | `{}` |
//! | [`Intent::SetNozzleTarget`] | 403 | `{"TempTargetNozzle": t}` |
//! | [`Intent::SetBedTarget`] | 403 | `{"TempTargetHotbed": t}` |
//! | [`Intent::SetLight`] | 403 | `{"LightStatus": {..}}` |
//! | [`Intent::SetFanSpeeds`] | 403 | `{"TargetFanSpeed": {..}}` |
//! | [`Intent::Refresh`] | 0 | `{}` |
//! | [`Intent::RequestAttributes`] | 1 | `{}` |
//!
//! # Examples
//!
//! ```
//! use sdcp_lib::command::{Command, Intent};
//! use sdcp_lib::protocol::Opcode;
//!
//! assert_eq!(Intent::Cancel.opcode(), Opcode::Stop);
//! assert_eq!(Intent::Cancel.opcode().code(), 130);
//! ```

mod intent;

pub use intent::{Intent, MAX_BED_TARGET, MAX_NOZZLE_TARGET};

use serde_json::Value;

use crate::protocol::Opcode;

/// A command that can be sent to a printer.
pub trait Command {
    /// Returns the opcode written to `Data.Cmd`.
    fn opcode(&self) -> Opcode;

    /// Returns the data object written to `Data.Data`.
    fn data(&self) -> Value;
}

/// Immediate result of submitting an intent.
///
/// The printer's eventual verdict arrives later as a
/// [`CommandCompleted`](crate::event::PrinterEvent::CommandCompleted) event
/// carrying the same request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentResult {
    /// The command was written to the connection.
    Sent {
        /// Request id to correlate the acknowledgement with.
        request_id: String,
    },
    /// The session is not connected; nothing was sent.
    NotConnected,
    /// The intent name is not handled; nothing was sent.
    Unsupported,
}

impl IntentResult {
    /// Returns `true` if the command was sent.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    /// Returns the request id of a sent command.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Sent { request_id } => Some(request_id),
            Self::NotConnected | Self::Unsupported => None,
        }
    }
}
