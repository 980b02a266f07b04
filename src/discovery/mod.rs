// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! UDP broadcast discovery of SDCP printers.
//!
//! Printers answer the probe datagram `M99999` sent to UDP port 3000 with a
//! JSON description of themselves. Discovery is a one-shot operation: send
//! the probe, collect distinct responders for a bounded window, return them.
//! It does not depend on any session.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use sdcp_lib::discovery::{DiscoveryOptions, discover};
//!
//! # async fn example() -> sdcp_lib::Result<()> {
//! let printers = discover(DiscoveryOptions::new().with_timeout(Duration::from_secs(2))).await?;
//! for printer in &printers {
//!     println!("{} {:?}", printer.address, printer.name);
//! }
//! # Ok(())
//! # }
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;
use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::error::{Error, ProtocolError};

/// Probe payload understood by SDCP printers.
pub const DISCOVERY_PROBE: &[u8] = b"M99999";

/// UDP port printers listen on for the probe.
pub const DISCOVERY_PORT: u16 = 3000;

/// Default collection window.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Largest reply accepted.
const MAX_DATAGRAM: usize = 4096;

/// Options for a discovery run.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sdcp_lib::discovery::DiscoveryOptions;
///
/// let options = DiscoveryOptions::new().with_timeout(Duration::from_secs(1));
/// assert_eq!(options.timeout(), Duration::from_secs(1));
/// assert_eq!(options.target().port(), 3000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    timeout: Option<Duration>,
    target: Option<SocketAddr>,
}

impl DiscoveryOptions {
    /// Creates options with defaults: 3 second window, limited broadcast.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long replies are collected.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sends the probe to `target` instead of the broadcast address.
    ///
    /// Useful for a directed subnet broadcast or a single known host.
    #[must_use]
    pub fn with_target(mut self, target: SocketAddr) -> Self {
        self.target = Some(target);
        self
    }

    /// Returns the collection window.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_DISCOVERY_TIMEOUT)
    }

    /// Returns the probe destination.
    #[must_use]
    pub fn target(&self) -> SocketAddr {
        self.target.unwrap_or(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::BROADCAST),
            DISCOVERY_PORT,
        ))
    }
}

/// A printer that answered the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPrinter {
    /// Address the reply came from.
    pub address: IpAddr,
    /// User-visible name.
    pub name: Option<String>,
    /// Machine model.
    pub machine_name: Option<String>,
    /// Mainboard id, used to address commands.
    pub mainboard_id: Option<String>,
    /// Firmware version.
    pub firmware_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Reply {
    #[serde(rename = "Data", default)]
    data: ReplyData,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyData {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "MachineName")]
    machine_name: Option<String>,
    #[serde(rename = "MainboardID")]
    mainboard_id: Option<String>,
    #[serde(rename = "FirmwareVersion")]
    firmware_version: Option<String>,
}

/// Parses a discovery reply.
///
/// A reply that is not the expected JSON still identifies a responder, so
/// only the address is kept in that case.
#[must_use]
pub fn parse_reply(address: IpAddr, payload: &[u8]) -> DiscoveredPrinter {
    let data = match serde_json::from_slice::<Reply>(payload) {
        Ok(reply) => reply.data,
        Err(e) => {
            tracing::debug!(%address, error = %e, "Discovery reply is not SDCP JSON");
            ReplyData::default()
        }
    };

    DiscoveredPrinter {
        address,
        name: data.name,
        machine_name: data.machine_name,
        mainboard_id: data.mainboard_id,
        firmware_version: data.firmware_version,
    }
}

/// Broadcasts the probe and collects distinct responders.
///
/// Responders are deduplicated by address and returned in the order they
/// first answered.
///
/// # Errors
///
/// Returns [`ProtocolError::Io`] if the socket cannot be bound or the probe
/// cannot be sent. Errors while receiving end the window early.
pub async fn discover(options: DiscoveryOptions) -> Result<Vec<DiscoveredPrinter>, Error> {
    let target = options.target();
    let bind_addr: SocketAddr = if target.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(bind_addr).await.map_err(ProtocolError::Io)?;
    socket.set_broadcast(true).map_err(ProtocolError::Io)?;
    socket
        .send_to(DISCOVERY_PROBE, target)
        .await
        .map_err(ProtocolError::Io)?;

    tracing::debug!(%target, timeout_ms = options.timeout().as_millis(), "Discovery probe sent");

    let deadline = Instant::now() + options.timeout();
    let mut printers: Vec<DiscoveredPrinter> = Vec::new();
    let mut buf = [0u8; MAX_DATAGRAM];

    loop {
        let received = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await;
        match received {
            Err(_) => break,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Discovery receive failed");
                break;
            }
            Ok(Ok((len, from))) => {
                let address = from.ip();
                if printers.iter().any(|p| p.address == address) {
                    continue;
                }
                let printer = parse_reply(address, &buf[..len]);
                tracing::debug!(%address, name = ?printer.name, "Printer discovered");
                printers.push(printer);
            }
        }
    }

    tracing::info!(count = printers.len(), "Discovery finished");
    Ok(printers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_reply() {
        let payload = br#"{"Id":"x","Data":{"Name":"Saturn 4","MachineName":"ELEGOO Saturn 4 Ultra","MainboardID":"abc123","MainboardIP":"10.0.0.9","FirmwareVersion":"V1.2.3"}}"#;
        let ip: IpAddr = "10.0.0.9".parse().unwrap();
        let printer = parse_reply(ip, payload);

        assert_eq!(printer.address, ip);
        assert_eq!(printer.name.as_deref(), Some("Saturn 4"));
        assert_eq!(printer.machine_name.as_deref(), Some("ELEGOO Saturn 4 Ultra"));
        assert_eq!(printer.mainboard_id.as_deref(), Some("abc123"));
        assert_eq!(printer.firmware_version.as_deref(), Some("V1.2.3"));
    }

    #[test]
    fn parse_garbage_keeps_address() {
        let ip: IpAddr = "10.0.0.10".parse().unwrap();
        let printer = parse_reply(ip, b"not json");
        assert_eq!(printer.address, ip);
        assert_eq!(printer.name, None);
    }

    #[test]
    fn default_target_is_broadcast() {
        let target = DiscoveryOptions::new().target();
        assert_eq!(target.ip(), IpAddr::V4(Ipv4Addr::BROADCAST));
        assert_eq!(target.port(), DISCOVERY_PORT);
    }

    #[tokio::test]
    async fn collects_distinct_responders() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = responder.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, from) = responder.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], DISCOVERY_PROBE);

            let reply = br#"{"Data":{"Name":"Bench","MainboardID":"mb-1"}}"#;
            responder.send_to(reply, from).await.unwrap();
            // Same host answering twice is reported once
            responder.send_to(reply, from).await.unwrap();
        });

        let printers = discover(
            DiscoveryOptions::new()
                .with_target(target)
                .with_timeout(Duration::from_millis(300)),
        )
        .await
        .unwrap();

        assert_eq!(printers.len(), 1);
        assert_eq!(printers[0].address, target.ip());
        assert_eq!(printers[0].mainboard_id.as_deref(), Some("mb-1"));
    }

    #[tokio::test]
    async fn silent_network_returns_empty() {
        // Bound but never answers
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = silent.local_addr().unwrap();

        let printers = discover(
            DiscoveryOptions::new()
                .with_target(target)
                .with_timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap();

        assert!(printers.is_empty());
    }
}
