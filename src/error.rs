// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `sdcp_lib` library.
//!
//! This module provides the error hierarchy for the printer session engine:
//! value validation, transport communication, frame decoding, and session
//! operations.
//!
//! None of these errors is fatal to the host process. Decode failures drop a
//! single frame, transport failures send the session back to
//! `Disconnected` where it keeps retrying.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred on the transport.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while decoding an inbound frame.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The session driver is no longer running.
    #[error("session has been shut down")]
    SessionClosed,
}

/// Errors related to value validation and constraints.
///
/// These errors occur when building a configuration or an intent with
/// values the printer cannot accept.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("{field} value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
        /// The actual value that was provided.
        actual: f64,
    },

    /// A duration setting is zero or otherwise unusable.
    #[error("invalid interval for {0}")]
    InvalidInterval(&'static str),

    /// A hex color string could not be parsed.
    #[error("invalid hex color: {0}")]
    InvalidHexColor(String),

    /// The printer host is empty or malformed.
    #[error("invalid host: {0}")]
    InvalidHost(String),

    /// The intent arguments could not be interpreted.
    #[error("invalid argument for {intent}: {message}")]
    InvalidArgument {
        /// Name of the intent.
        intent: String,
        /// Description of the problem.
        message: String,
    },
}

/// Errors related to the WebSocket transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// WebSocket connection or communication failed.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The connection attempt timed out.
    #[error("connection timed out after {0} ms")]
    Timeout(u64),

    /// I/O error on a socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to decoding printer frames.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame is valid JSON but not an object.
    #[error("unexpected frame format: {0}")]
    UnexpectedFormat(String),

    /// Failed to parse a specific field.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
