// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Printer session engine.
//!
//! The engine is split in two:
//!
//! - [`Session`]: a synchronous state machine. It owns the codec, the
//!   request correlator and the device state, and turns [`Input`]s into
//!   [`Effect`]s. Unit tests drive it directly with synthetic instants.
//! - the driver: a tokio task that owns the WebSocket and the timer
//!   deadlines and executes the effects. It is started by
//!   [`Printer::spawn`](crate::Printer::spawn).
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected --Connect--> Connecting --TransportOpened--> Connected
//!      ^                         |                              |
//!      +---- error / close ------+---------- error / close -----+
//!      |
//!      +---- reconnect timer --> Connecting
//! ```
//!
//! `Shutdown` is accepted in every state and is terminal.

pub(crate) mod driver;
mod machine;

pub use machine::{Effect, Input, Session, SessionState, TimerKind};
