// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Printer event types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::protocol::{AttributesBlock, CommandOutcome, Opcode};
use crate::state::{DeviceState, StateChange};

/// One state-tree write: a leaf path, its new value and when it was observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateUpdate {
    /// Dot separated leaf path, e.g. `temperature.bed.actual`.
    pub path: &'static str,
    /// New value.
    pub value: Value,
    /// Time the frame carrying the value was processed.
    pub timestamp: DateTime<Utc>,
}

impl StateUpdate {
    /// Stamps a state change with `timestamp`.
    #[must_use]
    pub fn from_change(change: StateChange, timestamp: DateTime<Utc>) -> Self {
        let (path, value) = change.into_parts();
        Self {
            path,
            value,
            timestamp,
        }
    }
}

/// Machine attributes reported by the printer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrinterAttributes {
    /// User-visible name.
    pub name: Option<String>,
    /// Machine model.
    pub machine_name: Option<String>,
    /// Firmware version.
    pub firmware_version: Option<String>,
    /// Mainboard id.
    pub mainboard_id: Option<String>,
    /// Mainboard IP address as reported by the printer.
    pub mainboard_ip: Option<String>,
}

impl From<&AttributesBlock> for PrinterAttributes {
    fn from(block: &AttributesBlock) -> Self {
        Self {
            name: block.name.clone(),
            machine_name: block.machine_name.clone(),
            firmware_version: block.firmware_version.clone(),
            mainboard_id: block.mainboard_id.clone(),
            mainboard_ip: block.mainboard_ip.clone(),
        }
    }
}

/// Events emitted by a printer session.
///
/// These are the outbound updates consumed by whatever mirrors the printer
/// into a state tree.
///
/// # Examples
///
/// ```
/// use sdcp_lib::event::PrinterEvent;
///
/// let event = PrinterEvent::ConnectionChanged {
///     connected: false,
///     error: Some("connection refused".to_string()),
/// };
/// assert!(event.is_connection_event());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PrinterEvent {
    /// The session entered or left the connected state.
    ConnectionChanged {
        /// Whether the session is now connected.
        connected: bool,
        /// Error that caused the disconnection, if any.
        error: Option<String>,
    },

    /// One or more state leaves changed.
    StateChanged {
        /// The changed leaves.
        updates: Vec<StateUpdate>,
        /// The complete new state.
        state: Box<DeviceState>,
    },

    /// A command was acknowledged by the printer.
    CommandCompleted {
        /// Request id of the command.
        request_id: String,
        /// Opcode of the command.
        opcode: Opcode,
        /// How the printer answered.
        outcome: CommandOutcome,
    },

    /// The printer reported its machine attributes.
    AttributesReceived(PrinterAttributes),
}

impl PrinterEvent {
    /// Creates a connected event.
    #[must_use]
    pub fn connected() -> Self {
        Self::ConnectionChanged {
            connected: true,
            error: None,
        }
    }

    /// Creates a disconnected event.
    #[must_use]
    pub fn disconnected(error: Option<String>) -> Self {
        Self::ConnectionChanged {
            connected: false,
            error,
        }
    }

    /// Returns `true` for [`ConnectionChanged`](Self::ConnectionChanged).
    #[must_use]
    pub fn is_connection_event(&self) -> bool {
        matches!(self, Self::ConnectionChanged { .. })
    }

    /// Returns `true` for [`StateChanged`](Self::StateChanged).
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }
}
