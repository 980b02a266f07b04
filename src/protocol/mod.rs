// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire protocol for SDCP printers.
//!
//! This module provides the pure encode/decode layer and the request
//! correlation used by the session engine.
//!
//! # Components
//!
//! - [`Codec`] / [`decode`]: JSON envelopes in and out, no I/O
//! - [`Correlator`]: matches command acknowledgements to requests
//! - [`Opcode`]: vendor command numbers
//!
//! The WebSocket transport itself is internal to the session driver.

mod codec;
mod correlator;
mod envelope;
pub(crate) mod websocket;

pub use codec::{Codec, DEFAULT_SENDER, decode};
pub use correlator::{
    CommandOutcome, Correlator, DEFAULT_STALE_AFTER, PendingRequest, Resolved, next_request_id,
};
pub use envelope::{
    AttributesBlock, CommandData, CommandEnvelope, FanSpeedBlock, LightBlock, Opcode,
    PrintInfoBlock, ResponseBlock, StatusBlock, StatusEnvelope,
};
