// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle state machine.
//!
//! [`Session`] performs no I/O. It consumes [`Input`]s (transport events,
//! timer firings, user requests) together with the current instant and
//! answers with the [`Effect`]s its driver must carry out. Timers are plain
//! deadlines the driver sleeps towards; cancelling a timer clears its
//! deadline.

use std::fmt;

use chrono::Utc;
use serde_json::json;
use tokio::time::Instant;

use crate::command::{Command, Intent, IntentResult};
use crate::config::SessionConfig;
use crate::event::{PrinterAttributes, PrinterEvent, StateUpdate};
use crate::protocol::{Codec, Correlator, Opcode, StatusEnvelope, decode};
use crate::state::{self, DeviceState};

/// Connection state of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No transport; a reconnect may be pending.
    #[default]
    Disconnected,
    /// A transport is being opened.
    Connecting,
    /// The transport is open.
    Connected,
}

impl SessionState {
    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The session's timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Transport-level ping.
    KeepAlive,
    /// Periodic status request.
    Poll,
    /// Delayed reconnect attempt.
    Reconnect,
}

/// Something that happened to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Start connecting.
    Connect,
    /// The transport finished opening.
    TransportOpened,
    /// The transport was closed, with a reason.
    TransportClosed(String),
    /// The transport failed, with a description.
    TransportError(String),
    /// A text frame arrived.
    Frame(String),
    /// A timer deadline passed.
    Timer(TimerKind),
    /// Stop for good.
    Shutdown,
}

/// Work the driver must carry out for the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a transport to the URL.
    Open(String),
    /// Send a text frame.
    Send(String),
    /// Send a keep-alive ping.
    Ping,
    /// Close the transport.
    Close,
    /// Publish an event.
    Emit(PrinterEvent),
}

/// The printer session engine.
///
/// # Examples
///
/// ```
/// use sdcp_lib::config::{Endpoint, SessionConfig};
/// use sdcp_lib::session::{Effect, Input, Session, SessionState};
/// use tokio::time::Instant;
///
/// let config = SessionConfig::new(Endpoint::new("10.0.0.7").unwrap());
/// let mut session = Session::new(config);
/// let now = Instant::now();
///
/// let effects = session.handle(Input::Connect, now);
/// assert_eq!(effects, vec![Effect::Open("ws://10.0.0.7/websocket".to_string())]);
/// assert_eq!(session.state(), SessionState::Connecting);
///
/// session.handle(Input::TransportOpened, now);
/// assert_eq!(session.state(), SessionState::Connected);
/// ```
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    codec: Codec,
    correlator: Correlator,
    device: DeviceState,
    connect_attempt: u32,
    last_error: Option<String>,
    terminated: bool,
    keep_alive_at: Option<Instant>,
    poll_at: Option<Instant>,
    reconnect_at: Option<Instant>,
}

impl Session {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let codec = Codec::new(config.mainboard_id.clone().unwrap_or_default());
        let correlator = Correlator::new(config.stale_after);
        Self {
            config,
            state: SessionState::Disconnected,
            codec,
            correlator,
            device: DeviceState::new(),
            connect_attempt: 0,
            last_error: None,
            terminated: false,
            keep_alive_at: None,
            poll_at: None,
            reconnect_at: None,
        }
    }

    /// Returns the connection state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the normalized printer state.
    #[must_use]
    pub fn device_state(&self) -> &DeviceState {
        &self.device
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the number of connect attempts since the last success.
    #[must_use]
    pub fn connect_attempt(&self) -> u32 {
        self.connect_attempt
    }

    /// Returns the last transport error.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns `true` once [`Input::Shutdown`] was handled.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Returns the mainboard id commands are addressed to.
    #[must_use]
    pub fn mainboard_id(&self) -> &str {
        self.codec.mainboard_id()
    }

    /// Returns the number of commands awaiting acknowledgement.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.correlator.len()
    }

    /// Returns the deadline of one timer, if armed.
    #[must_use]
    pub fn timer(&self, kind: TimerKind) -> Option<Instant> {
        match kind {
            TimerKind::KeepAlive => self.keep_alive_at,
            TimerKind::Poll => self.poll_at,
            TimerKind::Reconnect => self.reconnect_at,
        }
    }

    /// Returns `true` if a reconnect is scheduled.
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_at.is_some()
    }

    /// Returns the earliest armed timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<(Instant, TimerKind)> {
        [
            (self.reconnect_at, TimerKind::Reconnect),
            (self.keep_alive_at, TimerKind::KeepAlive),
            (self.poll_at, TimerKind::Poll),
        ]
        .into_iter()
        .filter_map(|(at, kind)| at.map(|at| (at, kind)))
        .min_by_key(|(at, _)| *at)
    }

    /// Advances the state machine.
    pub fn handle(&mut self, input: Input, now: Instant) -> Vec<Effect> {
        if self.terminated {
            tracing::trace!(?input, "Session terminated, input ignored");
            return Vec::new();
        }

        match input {
            Input::Connect => self.connect(),
            Input::TransportOpened => self.on_opened(now),
            Input::TransportClosed(reason) | Input::TransportError(reason) => {
                self.on_transport_lost(reason, now)
            }
            Input::Frame(text) => self.on_frame(&text),
            Input::Timer(kind) => self.on_timer(kind, now),
            Input::Shutdown => self.shutdown(),
        }
    }

    /// Submits a user intent.
    ///
    /// Nothing is sent unless the session is connected.
    pub fn submit(&mut self, intent: &Intent, now: Instant) -> (IntentResult, Vec<Effect>) {
        if self.state != SessionState::Connected || self.terminated {
            tracing::debug!(intent = intent.name(), state = %self.state, "Intent rejected");
            return (IntentResult::NotConnected, Vec::new());
        }

        let (request_id, text) = self
            .correlator
            .register(&self.codec, intent.opcode(), intent.data(), now);
        tracing::debug!(
            intent = intent.name(),
            request_id = %request_id,
            cmd = intent.opcode().code(),
            "Intent sent"
        );
        (IntentResult::Sent { request_id }, vec![Effect::Send(text)])
    }

    fn connect(&mut self) -> Vec<Effect> {
        if self.state != SessionState::Disconnected {
            tracing::debug!(state = %self.state, "Connect ignored");
            return Vec::new();
        }

        self.reconnect_at = None;
        self.connect_attempt = self.connect_attempt.saturating_add(1);
        self.state = SessionState::Connecting;

        let url = self.config.endpoint.url();
        tracing::info!(url = %url, attempt = self.connect_attempt, "Connecting to printer");
        vec![Effect::Open(url)]
    }

    fn on_opened(&mut self, now: Instant) -> Vec<Effect> {
        if self.state != SessionState::Connecting {
            tracing::debug!(state = %self.state, "Unexpected transport open ignored");
            return Vec::new();
        }

        self.state = SessionState::Connected;
        self.connect_attempt = 0;
        self.last_error = None;
        self.keep_alive_at = self.config.keep_alive_interval.map(|interval| now + interval);
        self.poll_at = Some(now + self.config.poll_interval);

        tracing::info!(endpoint = %self.config.endpoint, "Connected to printer");

        vec![
            self.status_request(now),
            Effect::Emit(PrinterEvent::connected()),
        ]
    }

    fn on_transport_lost(&mut self, reason: String, now: Instant) -> Vec<Effect> {
        let was = self.state;
        self.state = SessionState::Disconnected;
        self.keep_alive_at = None;
        self.poll_at = None;

        let mut effects = Vec::new();
        match was {
            SessionState::Connected => {
                tracing::warn!(reason = %reason, "Connection to printer lost");
                // Requests sent on the dead connection are never answered
                self.correlator.clear();
                effects.push(Effect::Emit(PrinterEvent::disconnected(Some(reason.clone()))));
            }
            SessionState::Connecting => {
                tracing::warn!(
                    reason = %reason,
                    attempt = self.connect_attempt,
                    "Connection attempt failed"
                );
            }
            SessionState::Disconnected => {
                tracing::debug!(reason = %reason, "Transport failure while disconnected");
            }
        }

        self.last_error = Some(reason);
        self.schedule_reconnect(now);
        effects
    }

    fn schedule_reconnect(&mut self, now: Instant) {
        if self.reconnect_at.is_some() {
            return;
        }

        // The first attempt is the initial connect, not a retry
        let retries = self.connect_attempt.saturating_sub(1);
        let policy = &self.config.reconnect;
        if !policy.should_retry(retries) {
            tracing::warn!(
                attempts = self.connect_attempt,
                "Giving up reconnecting to printer"
            );
            return;
        }

        let delay = policy.delay_for_attempt(retries);
        self.reconnect_at = Some(now + delay);
        tracing::debug!(delay_ms = delay.as_millis(), "Reconnect scheduled");
    }

    fn on_frame(&mut self, text: &str) -> Vec<Effect> {
        if self.state != SessionState::Connected {
            tracing::debug!(state = %self.state, "Frame outside connected state dropped");
            return Vec::new();
        }

        let envelope = match decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                return Vec::new();
            }
        };

        if envelope.is_empty() {
            tracing::trace!(topic = ?envelope.topic, "Frame without known blocks");
            return Vec::new();
        }

        self.learn_mainboard_id(&envelope);

        let mut effects = Vec::new();

        if let Some(resolved) = self.correlator.resolve(&envelope) {
            let request = resolved.request;
            if resolved.outcome.is_success() {
                tracing::debug!(
                    request_id = %request.request_id,
                    cmd = request.command.code(),
                    "Command acknowledged"
                );
            } else {
                tracing::warn!(
                    request_id = %request.request_id,
                    cmd = request.command.code(),
                    outcome = ?resolved.outcome,
                    "Command rejected by printer"
                );
            }
            effects.push(Effect::Emit(PrinterEvent::CommandCompleted {
                request_id: request.request_id,
                opcode: request.command,
                outcome: resolved.outcome,
            }));
        }

        if envelope.status.is_some() {
            let next = state::apply(&self.device, &envelope);
            let changes = self.device.diff(&next);
            if !changes.is_empty() {
                let timestamp = Utc::now();
                self.device = next;
                let updates = changes
                    .into_iter()
                    .map(|change| StateUpdate::from_change(change, timestamp))
                    .collect();
                effects.push(Effect::Emit(PrinterEvent::StateChanged {
                    updates,
                    state: Box::new(self.device.clone()),
                }));
            }
        }

        if let Some(attributes) = &envelope.attributes {
            effects.push(Effect::Emit(PrinterEvent::AttributesReceived(
                PrinterAttributes::from(attributes),
            )));
        }

        effects
    }

    fn learn_mainboard_id(&mut self, envelope: &StatusEnvelope) {
        if !self.codec.mainboard_id().is_empty() {
            return;
        }
        if let Some(id) = envelope.mainboard_id() {
            tracing::debug!(mainboard_id = %id, "Learned mainboard id");
            self.codec.set_mainboard_id(id);
        }
    }

    fn on_timer(&mut self, kind: TimerKind, now: Instant) -> Vec<Effect> {
        match kind {
            TimerKind::KeepAlive => {
                match (self.state, self.config.keep_alive_interval) {
                    (SessionState::Connected, Some(interval)) => {
                        self.keep_alive_at = Some(now + interval);
                        vec![Effect::Ping]
                    }
                    _ => {
                        self.keep_alive_at = None;
                        Vec::new()
                    }
                }
            }
            TimerKind::Poll => {
                if self.state != SessionState::Connected {
                    tracing::debug!(state = %self.state, "Poll timer cancelled");
                    self.poll_at = None;
                    return Vec::new();
                }
                self.correlator.purge_stale(now);
                self.poll_at = Some(now + self.config.poll_interval);
                vec![self.status_request(now)]
            }
            TimerKind::Reconnect => {
                self.reconnect_at = None;
                self.connect()
            }
        }
    }

    fn shutdown(&mut self) -> Vec<Effect> {
        self.terminated = true;
        self.keep_alive_at = None;
        self.poll_at = None;
        self.reconnect_at = None;
        self.correlator.clear();

        let was = std::mem::replace(&mut self.state, SessionState::Disconnected);
        tracing::info!(state = %was, "Session shut down");

        match was {
            SessionState::Connected => vec![
                Effect::Close,
                Effect::Emit(PrinterEvent::disconnected(None)),
            ],
            SessionState::Connecting => vec![Effect::Close],
            SessionState::Disconnected => Vec::new(),
        }
    }

    fn status_request(&mut self, now: Instant) -> Effect {
        let (_, text) = self
            .correlator
            .register(&self.codec, Opcode::Status, json!({}), now);
        Effect::Send(text)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{Endpoint, ReconnectPolicy};
    use crate::protocol::CommandOutcome;

    fn config() -> SessionConfig {
        SessionConfig::new(Endpoint::new("10.0.0.7").unwrap())
            .with_mainboard_id("mb-1")
            .with_reconnect_delay(Duration::from_secs(5))
    }

    fn connected(now: Instant) -> Session {
        let mut session = Session::new(config());
        session.handle(Input::Connect, now);
        session.handle(Input::TransportOpened, now);
        session
    }

    fn sent_frames(effects: &[Effect]) -> Vec<serde_json::Value> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(text) => serde_json::from_str(text).ok(),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn connect_open_close_scenario() {
        let now = Instant::now();
        let mut session = Session::new(config());
        assert_eq!(session.state(), SessionState::Disconnected);

        let effects = session.handle(Input::Connect, now);
        assert_eq!(effects, vec![Effect::Open("ws://10.0.0.7/websocket".to_string())]);
        assert_eq!(session.state(), SessionState::Connecting);
        assert_eq!(session.connect_attempt(), 1);

        let effects = session.handle(Input::TransportOpened, now);
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.connect_attempt(), 0);
        let frames = sent_frames(&effects);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["Data"]["Cmd"], 0);
        assert!(effects.contains(&Effect::Emit(PrinterEvent::connected())));
        assert_eq!(session.timer(TimerKind::KeepAlive), Some(now + Duration::from_secs(50)));
        assert_eq!(session.timer(TimerKind::Poll), Some(now + Duration::from_secs(10)));

        let later = now + Duration::from_secs(1);
        let effects = session.handle(Input::TransportClosed("bye".to_string()), later);
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.timer(TimerKind::KeepAlive), None);
        assert_eq!(session.timer(TimerKind::Poll), None);
        assert_eq!(
            session.timer(TimerKind::Reconnect),
            Some(later + Duration::from_secs(5))
        );
        assert_eq!(
            effects,
            vec![Effect::Emit(PrinterEvent::disconnected(Some("bye".to_string())))]
        );
        assert_eq!(session.last_error(), Some("bye"));
    }

    #[test]
    fn reconnect_converges_to_one_timer() {
        let now = Instant::now();
        let mut session = Session::new(config());

        for n in 0..5u64 {
            let at = now + Duration::from_secs(n);
            session.handle(Input::Connect, at);
            session.handle(Input::TransportError("refused".to_string()), at);
            // A duplicate error for the same attempt must not add a timer
            session.handle(Input::TransportError("refused".to_string()), at);
            assert_eq!(session.state(), SessionState::Disconnected);
            assert!(session.reconnect_pending());
        }

        let deadlines: Vec<_> = [TimerKind::KeepAlive, TimerKind::Poll, TimerKind::Reconnect]
            .into_iter()
            .filter_map(|kind| session.timer(kind).map(|_| kind))
            .collect();
        assert_eq!(deadlines, vec![TimerKind::Reconnect]);
    }

    #[test]
    fn reconnect_timer_starts_connecting() {
        let now = Instant::now();
        let mut session = Session::new(config());
        session.handle(Input::Connect, now);
        session.handle(Input::TransportError("refused".to_string()), now);

        let (at, kind) = session.next_deadline().unwrap();
        assert_eq!(kind, TimerKind::Reconnect);

        let effects = session.handle(Input::Timer(TimerKind::Reconnect), at);
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(!session.reconnect_pending());
        assert!(matches!(effects.as_slice(), [Effect::Open(_)]));
        assert_eq!(session.connect_attempt(), 2);
    }

    #[test]
    fn connect_cancels_pending_reconnect() {
        let now = Instant::now();
        let mut session = Session::new(config());
        session.handle(Input::Connect, now);
        session.handle(Input::TransportError("refused".to_string()), now);
        assert!(session.reconnect_pending());

        session.handle(Input::Connect, now);
        assert!(!session.reconnect_pending());
        assert_eq!(session.state(), SessionState::Connecting);
    }

    #[test]
    fn connect_while_connected_is_ignored() {
        let now = Instant::now();
        let mut session = connected(now);
        assert!(session.handle(Input::Connect, now).is_empty());
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[test]
    fn retry_limit_stops_scheduling() {
        let now = Instant::now();
        let policy = ReconnectPolicy::fixed(Duration::from_secs(1)).with_max_retries(2);
        let mut session = Session::new(config().with_reconnect(policy));

        session.handle(Input::Connect, now);
        session.handle(Input::TransportError("refused".to_string()), now);

        // Two retries after the initial attempt
        for _ in 0..2 {
            assert!(session.reconnect_pending());
            let effects = session.handle(Input::Timer(TimerKind::Reconnect), now);
            assert!(matches!(effects.as_slice(), [Effect::Open(_)]));
            session.handle(Input::TransportError("refused".to_string()), now);
        }

        assert_eq!(session.connect_attempt(), 3);
        assert!(!session.reconnect_pending());
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn backoff_grows_with_attempts() {
        let now = Instant::now();
        let policy = ReconnectPolicy::fixed(Duration::from_secs(1))
            .with_backoff_multiplier(2.0)
            .with_max_delay(Duration::from_secs(60));
        let mut session = Session::new(config().with_reconnect(policy));

        session.handle(Input::Connect, now);
        session.handle(Input::TransportError("x".to_string()), now);
        assert_eq!(session.timer(TimerKind::Reconnect), Some(now + Duration::from_secs(1)));

        session.handle(Input::Timer(TimerKind::Reconnect), now);
        session.handle(Input::TransportError("x".to_string()), now);
        assert_eq!(session.timer(TimerKind::Reconnect), Some(now + Duration::from_secs(2)));
    }

    #[test]
    fn status_frame_emits_state_change() {
        let now = Instant::now();
        let mut session = connected(now);

        let effects = session.handle(
            Input::Frame(r#"{"Status":{"TempOfNozzle":42.567}}"#.to_string()),
            now,
        );
        assert_eq!(session.device_state().temperatures().nozzle.actual, 42.57);

        let [Effect::Emit(PrinterEvent::StateChanged { updates, state })] = effects.as_slice()
        else {
            panic!("expected one state change, got {effects:?}");
        };
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].path, "temperature.nozzle.actual");
        assert_eq!(updates[0].value, json!(42.57));
        assert_eq!(state.temperatures().nozzle.actual, 42.57);

        // Same frame again changes nothing
        let effects = session.handle(
            Input::Frame(r#"{"Status":{"TempOfNozzle":42.567}}"#.to_string()),
            now,
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn malformed_frames_are_dropped() {
        let now = Instant::now();
        let mut session = connected(now);
        let before = session.device_state().clone();

        assert!(session.handle(Input::Frame("{not json".to_string()), now).is_empty());
        assert!(session.handle(Input::Frame("[1,2,3]".to_string()), now).is_empty());
        assert_eq!(session.device_state(), &before);
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[test]
    fn frames_outside_connected_are_ignored() {
        let now = Instant::now();
        let mut session = Session::new(config());
        let effects = session.handle(
            Input::Frame(r#"{"Status":{"TempOfNozzle":99.0}}"#.to_string()),
            now,
        );
        assert!(effects.is_empty());
        assert_eq!(session.device_state(), &DeviceState::new());
    }

    #[test]
    fn acknowledgement_emits_command_completed() {
        let now = Instant::now();
        let mut session = connected(now);

        let (result, effects) = session.submit(&Intent::Pause, now);
        let IntentResult::Sent { request_id } = result else {
            panic!("expected Sent, got {result:?}");
        };
        let frames = sent_frames(&effects);
        assert_eq!(frames[0]["Data"]["Cmd"], 129);
        assert_eq!(frames[0]["Data"]["RequestID"], json!(request_id));
        assert_eq!(frames[0]["Data"]["MainboardID"], "mb-1");

        let ack = json!({"Data": {"Cmd": 129, "RequestID": request_id, "Data": {"Ack": 1}}});
        let effects = session.handle(Input::Frame(ack.to_string()), now);
        assert_eq!(
            effects,
            vec![Effect::Emit(PrinterEvent::CommandCompleted {
                request_id,
                opcode: Opcode::Pause,
                outcome: CommandOutcome::Failure {
                    code: 1,
                    reason: "printer busy"
                },
            })]
        );
    }

    #[test]
    fn late_ack_for_purged_command_is_not_reported() {
        let now = Instant::now();
        let mut session = connected(now);

        let (first, _) = session.submit(&Intent::Pause, now);
        let old_id = first.request_id().unwrap().to_string();

        let later = now + Duration::from_secs(31);
        session.handle(Input::Timer(TimerKind::Poll), later);
        let (second, _) = session.submit(&Intent::Pause, later);
        let new_id = second.request_id().unwrap().to_string();

        let late = json!({"Data": {"Cmd": 129, "RequestID": old_id, "Data": {"Ack": 1}}});
        assert!(session.handle(Input::Frame(late.to_string()), later).is_empty());

        let ack = json!({"Data": {"Cmd": 129, "RequestID": new_id, "Data": {"Ack": 0}}});
        let effects = session.handle(Input::Frame(ack.to_string()), later);
        assert_eq!(
            effects,
            vec![Effect::Emit(PrinterEvent::CommandCompleted {
                request_id: new_id,
                opcode: Opcode::Pause,
                outcome: CommandOutcome::Success,
            })]
        );
    }

    #[test]
    fn submit_while_disconnected_sends_nothing() {
        let now = Instant::now();
        let mut session = Session::new(config());
        let (result, effects) = session.submit(&Intent::Pause, now);
        assert_eq!(result, IntentResult::NotConnected);
        assert!(effects.is_empty());
        assert_eq!(session.pending_requests(), 0);
    }

    #[test]
    fn poll_sends_status_and_rearms() {
        let now = Instant::now();
        let mut session = connected(now);
        let fire = now + Duration::from_secs(10);

        let effects = session.handle(Input::Timer(TimerKind::Poll), fire);
        let frames = sent_frames(&effects);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["Data"]["Cmd"], 0);
        assert_eq!(session.timer(TimerKind::Poll), Some(fire + Duration::from_secs(10)));
    }

    #[test]
    fn poll_purges_stale_requests() {
        let now = Instant::now();
        let mut session = connected(now);
        assert_eq!(session.pending_requests(), 1);

        session.handle(Input::Timer(TimerKind::Poll), now + Duration::from_secs(31));
        // The old status request is purged, the new one is pending
        assert_eq!(session.pending_requests(), 1);
    }

    #[test]
    fn poll_self_cancels_when_not_connected() {
        let now = Instant::now();
        let mut session = Session::new(config());
        let effects = session.handle(Input::Timer(TimerKind::Poll), now);
        assert!(effects.is_empty());
        assert_eq!(session.timer(TimerKind::Poll), None);
    }

    #[test]
    fn keep_alive_pings_and_rearms() {
        let now = Instant::now();
        let mut session = connected(now);
        let fire = now + Duration::from_secs(50);

        assert_eq!(session.handle(Input::Timer(TimerKind::KeepAlive), fire), vec![Effect::Ping]);
        assert_eq!(
            session.timer(TimerKind::KeepAlive),
            Some(fire + Duration::from_secs(50))
        );
    }

    #[test]
    fn keep_alive_can_be_disabled() {
        let now = Instant::now();
        let mut session = Session::new(config().without_keep_alive());
        session.handle(Input::Connect, now);
        session.handle(Input::TransportOpened, now);
        assert_eq!(session.timer(TimerKind::KeepAlive), None);
    }

    #[test]
    fn shutdown_is_idempotent_and_terminal() {
        let now = Instant::now();
        let mut session = connected(now);

        let effects = session.handle(Input::Shutdown, now);
        assert_eq!(
            effects,
            vec![Effect::Close, Effect::Emit(PrinterEvent::disconnected(None))]
        );
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.next_deadline(), None);
        assert!(session.is_terminated());

        assert!(session.handle(Input::Shutdown, now).is_empty());
        assert!(session.handle(Input::Connect, now).is_empty());
        assert!(session.handle(Input::TransportError("late".to_string()), now).is_empty());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.reconnect_pending());
    }

    #[test]
    fn shutdown_while_disconnected_has_no_effects() {
        let now = Instant::now();
        let mut session = Session::new(config());
        session.handle(Input::Connect, now);
        session.handle(Input::TransportError("refused".to_string()), now);

        assert!(session.handle(Input::Shutdown, now).is_empty());
        assert!(!session.reconnect_pending());
    }

    #[test]
    fn mainboard_id_is_learned_when_unset() {
        let now = Instant::now();
        let mut session = Session::new(SessionConfig::new(Endpoint::new("p").unwrap()));
        session.handle(Input::Connect, now);
        session.handle(Input::TransportOpened, now);
        assert_eq!(session.mainboard_id(), "");

        session.handle(
            Input::Frame(r#"{"Attributes":{"MainboardID":"learned"}}"#.to_string()),
            now,
        );
        assert_eq!(session.mainboard_id(), "learned");
    }

    #[test]
    fn attributes_are_emitted() {
        let now = Instant::now();
        let mut session = connected(now);
        let effects = session.handle(
            Input::Frame(r#"{"Attributes":{"Name":"Bench","FirmwareVersion":"V1"}}"#.to_string()),
            now,
        );
        let [Effect::Emit(PrinterEvent::AttributesReceived(attrs))] = effects.as_slice() else {
            panic!("expected attributes, got {effects:?}");
        };
        assert_eq!(attrs.name.as_deref(), Some("Bench"));
        assert_eq!(attrs.firmware_version.as_deref(), Some("V1"));
    }
}
