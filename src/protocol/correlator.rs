// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Matching of command responses to the requests that caused them.
//!
//! Every outbound command is registered under a process-unique request id.
//! When a response arrives it is matched by the echoed `RequestID`. Some
//! firmware versions do not echo the id; those responses fall back to the
//! oldest pending request with the same opcode. A response echoing an id
//! that is not pending is ignored.
//!
//! Requests that never get an answer are purged once they are older than the
//! stale window. Purging is silent: a missing acknowledgement is not an error
//! the caller has to handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use super::codec::Codec;
use super::envelope::{Opcode, StatusEnvelope};

/// Global counter for generating unique request ids.
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Default age after which an unanswered request is dropped.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);

/// Allocates a new request id.
///
/// The id combines the current millisecond timestamp with a monotonically
/// increasing process-wide counter, rendered as 32 hex characters.
#[must_use]
pub fn next_request_id() -> String {
    let counter = REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let millis = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    format!("{millis:016x}{counter:016x}")
}

/// Result of a command as acknowledged by the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The printer accepted the command.
    Success,
    /// The printer rejected the command with a known code.
    Failure {
        /// Vendor ack code.
        code: i64,
        /// Meaning of the code.
        reason: &'static str,
    },
    /// The printer answered with a code this library does not know.
    UnknownCode(i64),
}

impl CommandOutcome {
    /// Maps a vendor `Ack` code to an outcome.
    ///
    /// A response without an ack code counts as success.
    #[must_use]
    pub fn from_ack(ack: Option<i64>) -> Self {
        match ack {
            None | Some(0) => Self::Success,
            Some(code) => match failure_reason(code) {
                Some(reason) => Self::Failure { code, reason },
                None => Self::UnknownCode(code),
            },
        }
    }

    /// Returns `true` if the command was accepted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

fn failure_reason(code: i64) -> Option<&'static str> {
    Some(match code {
        1 => "printer busy",
        2 => "file not found",
        3 => "checksum mismatch",
        4 => "file read failed",
        5 => "resolution mismatch",
        6 => "unrecognized file format",
        7 => "machine model mismatch",
        _ => return None,
    })
}

/// A command waiting for its acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// Request id sent in `RequestID`.
    pub request_id: String,
    /// Command opcode.
    pub command: Opcode,
    /// When the command was sent.
    pub issued_at: Instant,
    /// Command data object.
    pub payload: Value,
    sequence: u64,
}

/// A response matched to its request.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// The request that was answered.
    pub request: PendingRequest,
    /// The printer's verdict.
    pub outcome: CommandOutcome,
}

/// Tracks in-flight commands.
#[derive(Debug)]
pub struct Correlator {
    pending: HashMap<String, PendingRequest>,
    stale_after: Duration,
    sequence: u64,
}

impl Correlator {
    /// Creates a correlator that drops requests after `stale_after`.
    #[must_use]
    pub fn new(stale_after: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            stale_after,
            sequence: 0,
        }
    }

    /// Registers a command and returns its request id and encoded frame.
    pub fn register(
        &mut self,
        codec: &Codec,
        opcode: Opcode,
        data: Value,
        now: Instant,
    ) -> (String, String) {
        let request_id = next_request_id();
        let text = codec.encode_request(&request_id, opcode, data.clone());

        self.sequence += 1;
        self.pending.insert(
            request_id.clone(),
            PendingRequest {
                request_id: request_id.clone(),
                command: opcode,
                issued_at: now,
                payload: data,
                sequence: self.sequence,
            },
        );

        tracing::trace!(request_id = %request_id, cmd = opcode.code(), "Registered request");
        (request_id, text)
    }

    /// Matches the envelope's response block, if any, to a pending request.
    ///
    /// Returns `None` when the envelope has no response block or when no
    /// pending request matches it.
    pub fn resolve(&mut self, envelope: &StatusEnvelope) -> Option<Resolved> {
        let response = envelope.response.as_ref()?;

        let request = match response.request_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => {
                let request = self.pending.remove(id);
                if request.is_none() {
                    tracing::debug!(
                        request_id = %id,
                        cmd = response.cmd.code(),
                        "Response for unknown request id ignored"
                    );
                    return None;
                }
                request
            }
            None => {
                let oldest = self
                    .pending
                    .values()
                    .filter(|p| p.command == response.cmd)
                    .min_by_key(|p| p.sequence)
                    .map(|p| p.request_id.clone());
                if let Some(id) = &oldest {
                    tracing::debug!(
                        request_id = %id,
                        cmd = response.cmd.code(),
                        "Response without request id, matched by opcode"
                    );
                }
                oldest.and_then(|id| self.pending.remove(&id))
            }
        };

        let Some(request) = request else {
            tracing::debug!(cmd = response.cmd.code(), "Unsolicited response ignored");
            return None;
        };

        Some(Resolved {
            request,
            outcome: CommandOutcome::from_ack(response.ack()),
        })
    }

    /// Drops requests older than the stale window and returns how many went.
    pub fn purge_stale(&mut self, now: Instant) -> usize {
        let before = self.pending.len();
        let stale_after = self.stale_after;
        self.pending
            .retain(|_, p| now.saturating_duration_since(p.issued_at) < stale_after);
        let purged = before - self.pending.len();
        if purged > 0 {
            tracing::debug!(purged, "Purged stale requests");
        }
        purged
    }

    /// Returns the number of requests in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if no request is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns `true` if the request id is still pending.
    #[must_use]
    pub fn contains(&self, request_id: &str) -> bool {
        self.pending.contains_key(request_id)
    }

    /// Drops every pending request.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER)
    }
}
