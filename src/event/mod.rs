// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for printer sessions.
//!
//! Every session publishes [`PrinterEvent`]s on an [`EventBus`], a tokio
//! broadcast channel. Connection transitions, state-leaf updates, command
//! acknowledgements and attribute reports all travel this way.
//!
//! # Examples
//!
//! ```
//! use sdcp_lib::event::{EventBus, PrinterEvent};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(PrinterEvent::disconnected(None));
//! assert!(rx.try_recv().is_ok());
//! ```

mod event_bus;
mod printer_event;

pub use event_bus::EventBus;
pub use printer_event::{PrinterAttributes, PrinterEvent, StateUpdate};
