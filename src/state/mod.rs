// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Printer state management types.
//!
//! The [`DeviceState`] struct holds the normalized telemetry of one printer.
//! [`apply`] maps a decoded status frame onto a previous state, and
//! [`DeviceState::diff`] lists the resulting [`StateChange`]s.
//!
//! # Examples
//!
//! ```
//! use sdcp_lib::protocol::decode;
//! use sdcp_lib::state::{DeviceState, apply};
//!
//! let before = DeviceState::new();
//! let frame = decode(r#"{"Status":{"CurrentFanSpeed":{"ModelFan":80}}}"#).unwrap();
//! let after = apply(&before, &frame);
//!
//! let changes = before.diff(&after);
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes[0].path(), "fan.model");
//! ```

mod device_state;
mod normalizer;
mod state_change;

pub use device_state::{DeviceState, Fans, Lighting, Position, PrintJob, Temperature, Temperatures};
pub use normalizer::{apply, parse_coordinates};
pub use state_change::StateChange;
