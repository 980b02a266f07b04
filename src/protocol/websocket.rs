// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WebSocket transport to the printer.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::ProtocolError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An inbound transport event.
#[derive(Debug)]
pub(crate) enum Inbound {
    /// A text frame.
    Text(String),
    /// The remote side closed the connection.
    Closed(String),
    /// The connection failed.
    Error(ProtocolError),
}

/// An open WebSocket connection.
///
/// Owned exclusively by the session driver.
pub(crate) struct Connection {
    stream: WsStream,
}

impl Connection {
    /// Opens a connection, giving up after `timeout`.
    pub(crate) async fn open(url: &str, timeout: Duration) -> Result<Self, ProtocolError> {
        tracing::debug!(url = %url, "Opening WebSocket");

        // Safe: timeout in practical use will never exceed u64::MAX milliseconds
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = timeout.as_millis() as u64;

        let (stream, _) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| ProtocolError::Timeout(timeout_ms))??;

        Ok(Self { stream })
    }

    /// Sends a text frame.
    pub(crate) async fn send_text(&mut self, text: String) -> Result<(), ProtocolError> {
        self.stream.send(Message::text(text)).await?;
        Ok(())
    }

    /// Sends a ping frame.
    pub(crate) async fn ping(&mut self) -> Result<(), ProtocolError> {
        self.stream.send(Message::Ping(Default::default())).await?;
        Ok(())
    }

    /// Waits for the next event that matters to the session.
    ///
    /// Control frames are handled here; binary frames are decoded as UTF-8
    /// text when possible.
    pub(crate) async fn next_inbound(&mut self) -> Inbound {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Inbound::Text(text.as_str().to_owned()),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Inbound::Text(text),
                    Err(_) => tracing::debug!(len = bytes.len(), "Ignoring non-UTF-8 frame"),
                },
                Some(Ok(Message::Close(frame))) => return Inbound::Closed(close_reason(frame)),
                Some(Ok(Message::Pong(_))) => tracing::trace!("Pong received"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Inbound::Error(e.into()),
                None => return Inbound::Closed("stream ended".to_string()),
            }
        }
    }

    /// Closes the connection, ignoring errors from an already dead socket.
    pub(crate) async fn close(mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "Error while closing WebSocket");
        }
    }
}

fn close_reason(frame: Option<CloseFrame>) -> String {
    match frame {
        Some(frame) if !frame.reason.is_empty() => {
            format!("{} ({})", frame.reason.as_str(), u16::from(frame.code))
        }
        Some(frame) => format!("close code {}", u16::from(frame.code)),
        None => "closed by peer".to_string(),
    }
}
