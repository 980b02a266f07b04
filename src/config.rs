// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session configuration types.
//!
//! Configuration is loaded by the host application; this module only
//! defaults and validates it before a session is built.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ValueError;
use crate::protocol::DEFAULT_STALE_AFTER;

/// Path of the printer's WebSocket endpoint.
pub const WEBSOCKET_PATH: &str = "/websocket";

/// Default interval between status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default keep-alive interval, under the printer's 60 s idle timeout.
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(50);

/// Default delay before a reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default timeout for opening the WebSocket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Network address of a printer.
///
/// # Examples
///
/// ```
/// use sdcp_lib::config::Endpoint;
///
/// let endpoint: Endpoint = "192.168.1.40".parse().unwrap();
/// assert_eq!(endpoint.url(), "ws://192.168.1.40/websocket");
///
/// let endpoint: Endpoint = "ws://printer.local:3030/websocket".parse().unwrap();
/// assert_eq!(endpoint.port(), Some(3030));
/// assert_eq!(endpoint.url(), "ws://printer.local:3030/websocket");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: Option<u16>,
}

impl Endpoint {
    /// Creates an endpoint on the default port.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidHost`] if the host is empty or contains
    /// whitespace or a path separator.
    pub fn new(host: impl Into<String>) -> Result<Self, ValueError> {
        let host = host.into();
        if host.is_empty() || host.contains(|c: char| c.is_whitespace() || c == '/') {
            return Err(ValueError::InvalidHost(host));
        }
        Ok(Self { host, port: None })
    }

    /// Sets an explicit port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Parses `host`, `host:port` or a full `ws://host[:port]/websocket` URL.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidHost`] for an empty host or a port that
    /// is not a number.
    pub fn parse(s: &str) -> Result<Self, ValueError> {
        let rest = s.trim();
        let rest = rest.strip_prefix("ws://").unwrap_or(rest);
        let rest = rest.strip_suffix(WEBSOCKET_PATH).unwrap_or(rest);
        let rest = rest.trim_end_matches('/');

        // Bracketed IPv6 literals contain colons of their own
        if rest.starts_with('[') {
            return match rest.rsplit_once("]:") {
                Some((h, p)) => Ok(Self::new(format!("{h}]"))?.with_port(parse_port(s, p)?)),
                None => Self::new(rest),
            };
        }

        match rest.rsplit_once(':') {
            Some((h, p)) => Ok(Self::new(h)?.with_port(parse_port(s, p)?)),
            None => Self::new(rest),
        }
    }

    /// Returns the host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the explicit port, if any.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Returns the WebSocket URL.
    #[must_use]
    pub fn url(&self) -> String {
        match self.port {
            Some(port) => format!("ws://{}:{port}{WEBSOCKET_PATH}", self.host),
            None => format!("ws://{}{WEBSOCKET_PATH}", self.host),
        }
    }
}

fn parse_port(input: &str, port: &str) -> Result<u16, ValueError> {
    port.parse()
        .map_err(|_| ValueError::InvalidHost(format!("invalid port in {input:?}")))
}

impl FromStr for Endpoint {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{port}", self.host),
            None => f.write_str(&self.host),
        }
    }
}

/// Configuration for automatic reconnection.
///
/// The default is a fixed delay with unlimited retries. A backoff multiplier
/// above `1.0` grows the delay per consecutive failure, capped at
/// `max_delay`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sdcp_lib::config::ReconnectPolicy;
///
/// let fixed = ReconnectPolicy::fixed(Duration::from_secs(5));
/// assert_eq!(fixed.delay_for_attempt(7), Duration::from_secs(5));
///
/// let backoff = ReconnectPolicy::fixed(Duration::from_secs(1))
///     .with_backoff_multiplier(2.0)
///     .with_max_delay(Duration::from_secs(10))
///     .with_max_retries(5);
/// assert_eq!(backoff.delay_for_attempt(3), Duration::from_secs(8));
/// assert!(!backoff.should_retry(5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Whether automatic reconnection is enabled.
    pub enabled: bool,
    /// Maximum number of reconnect attempts after the initial connect fails
    /// (`None` = unlimited).
    pub max_retries: Option<u32>,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for backoff delays.
    pub max_delay: Duration,
    /// Growth factor per failed attempt; `1.0` keeps the delay fixed.
    pub backoff_multiplier: f32,
}

impl ReconnectPolicy {
    /// Creates a fixed-delay policy with unlimited retries.
    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        Self {
            enabled: true,
            max_retries: None,
            initial_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
        }
    }

    /// Creates a disabled policy.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the maximum number of reconnect attempts after the initial
    /// connect fails.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the maximum backoff delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the delay after `attempt` consecutive failures.
    ///
    /// Attempt `0` uses the initial delay.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.backoff_multiplier <= 1.0 {
            return self.initial_delay;
        }

        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        // Safe: delays are seconds or minutes, far from f32 precision limits
        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.initial_delay.as_millis() as f32 * multiplier;

        // Safe: positive and capped by max_delay right after
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let delay = Duration::from_millis(delay_ms.min(u64::MAX as f32) as u64);

        delay.min(self.max_delay.max(self.initial_delay))
    }

    /// Returns `true` if another reconnect attempt should be made when
    /// `retries` reconnect attempts have already failed.
    #[must_use]
    pub fn should_retry(&self, retries: u32) -> bool {
        self.enabled && self.max_retries.is_none_or(|max| retries < max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

/// Configuration of one printer session.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sdcp_lib::config::{Endpoint, SessionConfig};
///
/// let config = SessionConfig::new(Endpoint::new("192.168.1.40").unwrap())
///     .with_poll_interval(Duration::from_secs(5))
///     .without_keep_alive();
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.keep_alive_interval, None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Printer address.
    pub endpoint: Endpoint,
    /// Interval between status requests.
    pub poll_interval: Duration,
    /// Keep-alive ping interval; `None` disables keep-alive.
    pub keep_alive_interval: Option<Duration>,
    /// Reconnection policy.
    pub reconnect: ReconnectPolicy,
    /// Age after which an unanswered command is dropped.
    pub stale_after: Duration,
    /// Timeout for opening the WebSocket.
    pub connect_timeout: Duration,
    /// Mainboard id to address; learned from the printer when empty.
    pub mainboard_id: Option<String>,
}

impl SessionConfig {
    /// Creates a configuration with default timings.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            poll_interval: DEFAULT_POLL_INTERVAL,
            keep_alive_interval: Some(DEFAULT_KEEP_ALIVE_INTERVAL),
            reconnect: ReconnectPolicy::default(),
            stale_after: DEFAULT_STALE_AFTER,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            mainboard_id: None,
        }
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = Some(interval);
        self
    }

    /// Disables keep-alive pings.
    #[must_use]
    pub fn without_keep_alive(mut self) -> Self {
        self.keep_alive_interval = None;
        self
    }

    /// Uses a fixed reconnect delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect = ReconnectPolicy::fixed(delay);
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Sets the stale request window.
    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the mainboard id written to outbound commands.
    #[must_use]
    pub fn with_mainboard_id(mut self, mainboard_id: impl Into<String>) -> Self {
        self.mainboard_id = Some(mainboard_id.into());
        self
    }

    /// Checks that every interval is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidInterval`] naming the first zero
    /// interval, or a keep-alive interval that is not shorter than the
    /// printer's 60 s idle timeout.
    pub fn validate(&self) -> Result<(), ValueError> {
        if self.poll_interval.is_zero() {
            return Err(ValueError::InvalidInterval("poll_interval"));
        }
        if let Some(keep_alive) = self.keep_alive_interval
            && (keep_alive.is_zero() || keep_alive >= Duration::from_secs(60))
        {
            return Err(ValueError::InvalidInterval("keep_alive_interval"));
        }
        if self.reconnect.enabled && self.reconnect.initial_delay.is_zero() {
            return Err(ValueError::InvalidInterval("reconnect_delay"));
        }
        if self.stale_after.is_zero() {
            return Err(ValueError::InvalidInterval("stale_after"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ValueError::InvalidInterval("connect_timeout"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_forms() {
        let plain = Endpoint::parse("10.0.0.5").unwrap();
        assert_eq!(plain.host(), "10.0.0.5");
        assert_eq!(plain.port(), None);
        assert_eq!(plain.url(), "ws://10.0.0.5/websocket");

        let with_port = Endpoint::parse("10.0.0.5:3030").unwrap();
        assert_eq!(with_port.port(), Some(3030));
        assert_eq!(with_port.url(), "ws://10.0.0.5:3030/websocket");

        let url = Endpoint::parse("ws://10.0.0.5:3030/websocket").unwrap();
        assert_eq!(url, with_port);

        let v6 = Endpoint::parse("[fe80::1]:3030").unwrap();
        assert_eq!(v6.host(), "[fe80::1]");
        assert_eq!(v6.port(), Some(3030));
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(Endpoint::parse("").is_err());
        assert!(Endpoint::parse("ws://").is_err());
        assert!(Endpoint::parse("host:notaport").is_err());
        assert!(Endpoint::parse("host:70000").is_err());
        assert!(Endpoint::new("a b").is_err());
    }

    #[test]
    fn endpoint_display() {
        assert_eq!(Endpoint::new("p").unwrap().to_string(), "p");
        assert_eq!(Endpoint::new("p").unwrap().with_port(1).to_string(), "p:1");
    }

    #[test]
    fn default_policy_is_fixed_and_unlimited() {
        let policy = ReconnectPolicy::default();
        assert!(policy.enabled);
        assert_eq!(policy.max_retries, None);
        assert_eq!(policy.delay_for_attempt(0), DEFAULT_RECONNECT_DELAY);
        assert_eq!(policy.delay_for_attempt(50), DEFAULT_RECONNECT_DELAY);
        assert!(policy.should_retry(10_000));
    }

    #[test]
    fn backoff_delay_calculation() {
        let policy = ReconnectPolicy::fixed(Duration::from_secs(1))
            .with_backoff_multiplier(2.0)
            .with_max_delay(Duration::from_secs(10));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(10));
    }

    #[test]
    fn retry_limits() {
        let policy = ReconnectPolicy::default().with_max_retries(3);
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!ReconnectPolicy::disabled().should_retry(0));
    }

    #[test]
    fn session_config_defaults() {
        let config = SessionConfig::new(Endpoint::new("printer").unwrap());
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.keep_alive_interval, Some(Duration::from_secs(50)));
        assert_eq!(config.stale_after, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_names_bad_interval() {
        let endpoint = Endpoint::new("printer").unwrap();

        let err = SessionConfig::new(endpoint.clone())
            .with_poll_interval(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValueError::InvalidInterval("poll_interval")));

        let err = SessionConfig::new(endpoint.clone())
            .with_keep_alive(Duration::from_secs(60))
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ValueError::InvalidInterval("keep_alive_interval")
        ));

        assert!(
            SessionConfig::new(endpoint)
                .with_reconnect(ReconnectPolicy::disabled().with_max_delay(Duration::ZERO))
                .validate()
                .is_ok()
        );
    }
}
