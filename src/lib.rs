// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `sdcp_lib` - A Rust library to monitor and control SDCP 3D printers.
//!
//! This library keeps a persistent WebSocket session to a printer speaking
//! the SDCP JSON protocol, polls its status, normalizes the vendor telemetry
//! into a stable [`DeviceState`](state::DeviceState) and translates user
//! intents into protocol commands.
//!
//! # Supported Features
//!
//! - **Session management**: connect, keep-alive pings, periodic status
//!   polling, automatic reconnection
//! - **Telemetry**: temperatures, fans, print job progress and times,
//!   toolhead position, lighting
//! - **Job control**: pause, resume, cancel
//! - **Machine parameters**: target temperatures, fan speeds, lights
//! - **Discovery**: UDP broadcast scan for printers on the local network
//!
//! # Quick Start
//!
//! ```no_run
//! use sdcp_lib::{Printer, PrinterEvent};
//!
//! #[tokio::main]
//! async fn main() -> sdcp_lib::Result<()> {
//!     let printer = Printer::connect("192.168.1.40")?;
//!     let mut events = printer.subscribe();
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             PrinterEvent::ConnectionChanged { connected: true, .. } => {
//!                 printer.refresh().await?;
//!             }
//!             PrinterEvent::StateChanged { updates, .. } => {
//!                 for update in updates {
//!                     println!("{} = {}", update.path, update.value);
//!                 }
//!             }
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Timings
//!
//! ```no_run
//! use std::time::Duration;
//! use sdcp_lib::Printer;
//! use sdcp_lib::config::{Endpoint, SessionConfig};
//!
//! # async fn example() -> sdcp_lib::Result<()> {
//! let config = SessionConfig::new(Endpoint::parse("192.168.1.40:3030")?)
//!     .with_poll_interval(Duration::from_secs(5))
//!     .with_reconnect_delay(Duration::from_secs(15));
//!
//! let printer = Printer::spawn(config)?;
//! printer.pause().await?;
//! printer.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
#[cfg(feature = "discovery")]
pub mod discovery;
pub mod error;
pub mod event;
mod printer;
pub mod protocol;
pub mod session;
pub mod state;
pub mod types;

pub use command::{Command, Intent, IntentResult};
pub use config::{Endpoint, ReconnectPolicy, SessionConfig};
pub use error::{Error, ParseError, ProtocolError, Result, ValueError};
pub use event::{EventBus, PrinterEvent, StateUpdate};
pub use printer::Printer;
pub use protocol::{CommandOutcome, Opcode};
pub use session::SessionState;
pub use state::DeviceState;
pub use types::{PrintStatus, RgbColor};
