// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Async driver running one [`Session`].
//!
//! The driver task owns the session, the WebSocket and the timers. Requests
//! from [`Printer`](crate::Printer) handles, transport events and timer
//! deadlines are multiplexed with `tokio::select!` and fed to the session
//! one at a time.

use std::collections::VecDeque;
use std::future::{Future, pending};
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::command::{Intent, IntentResult};
use crate::error::ProtocolError;
use crate::event::{EventBus, PrinterEvent};
use crate::protocol::websocket::{Connection, Inbound};
use crate::state::DeviceState;

use super::{Effect, Input, Session, SessionState, TimerKind};

type ConnectFuture = Pin<Box<dyn Future<Output = Result<Connection, ProtocolError>> + Send>>;

/// A request sent from a handle to the driver.
#[derive(Debug)]
pub(crate) enum Request {
    /// Submit an intent and report the immediate result.
    Submit {
        intent: Intent,
        reply: oneshot::Sender<IntentResult>,
    },
    /// Connect now, skipping a pending reconnect delay.
    Connect,
    /// Shut the session down and stop the driver.
    Shutdown { reply: oneshot::Sender<()> },
}

/// Channels the driver publishes on.
pub(crate) struct Outputs {
    pub(crate) events: EventBus,
    pub(crate) state: watch::Sender<DeviceState>,
    pub(crate) connection: watch::Sender<SessionState>,
}

enum Step {
    Request(Option<Request>),
    Input(Input),
}

pub(crate) struct Driver {
    session: Session,
    requests: mpsc::Receiver<Request>,
    outputs: Outputs,
    connection: Option<Connection>,
    connecting: Option<ConnectFuture>,
    connect_timeout: Duration,
}

impl Driver {
    pub(crate) fn new(
        session: Session,
        requests: mpsc::Receiver<Request>,
        outputs: Outputs,
    ) -> Self {
        let connect_timeout = session.config().connect_timeout;
        Self {
            session,
            requests,
            outputs,
            connection: None,
            connecting: None,
            connect_timeout,
        }
    }

    /// Runs until shutdown or until every handle is dropped.
    pub(crate) async fn run(mut self) {
        self.feed(Input::Connect).await;

        loop {
            let deadline = self.session.next_deadline();

            let step = tokio::select! {
                request = self.requests.recv() => Step::Request(request),
                result = poll_connecting(&mut self.connecting) => {
                    self.connecting = None;
                    match result {
                        Ok(connection) => {
                            self.connection = Some(connection);
                            Step::Input(Input::TransportOpened)
                        }
                        Err(e) => Step::Input(Input::TransportError(e.to_string())),
                    }
                }
                inbound = next_inbound(&mut self.connection) => match inbound {
                    Inbound::Text(text) => Step::Input(Input::Frame(text)),
                    Inbound::Closed(reason) => {
                        self.connection = None;
                        Step::Input(Input::TransportClosed(reason))
                    }
                    Inbound::Error(e) => {
                        self.connection = None;
                        Step::Input(Input::TransportError(e.to_string()))
                    }
                },
                kind = sleep_until(deadline) => Step::Input(Input::Timer(kind)),
            };

            match step {
                Step::Input(input) => self.feed(input).await,
                Step::Request(Some(request)) => {
                    if self.on_request(request).await {
                        break;
                    }
                }
                Step::Request(None) => {
                    tracing::debug!("All printer handles dropped, shutting down");
                    self.feed(Input::Shutdown).await;
                    break;
                }
            }
        }

        tracing::debug!("Session driver stopped");
    }

    async fn on_request(&mut self, request: Request) -> bool {
        match request {
            Request::Submit { intent, reply } => {
                let (result, effects) = self.session.submit(&intent, Instant::now());
                self.execute(effects).await;
                // The caller may have stopped waiting
                let _ = reply.send(result);
                false
            }
            Request::Connect => {
                self.feed(Input::Connect).await;
                false
            }
            Request::Shutdown { reply } => {
                self.feed(Input::Shutdown).await;
                let _ = reply.send(());
                true
            }
        }
    }

    async fn feed(&mut self, input: Input) {
        let effects = self.session.handle(input, Instant::now());
        self.execute(effects).await;
    }

    /// Carries out effects, feeding send failures back into the session.
    async fn execute(&mut self, effects: Vec<Effect>) {
        self.sync_connection_state();
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Open(url) => {
                    let timeout = self.connect_timeout;
                    self.connecting =
                        Some(Box::pin(async move { Connection::open(&url, timeout).await }));
                }
                Effect::Send(text) => {
                    let Some(connection) = self.connection.as_mut() else {
                        tracing::debug!("No open connection, frame dropped");
                        continue;
                    };
                    tracing::trace!(frame = %text, "Sending frame");
                    if let Err(e) = connection.send_text(text).await {
                        self.connection = None;
                        let more = self
                            .session
                            .handle(Input::TransportError(e.to_string()), Instant::now());
                        queue.extend(more);
                    }
                }
                Effect::Ping => {
                    if let Some(connection) = self.connection.as_mut()
                        && let Err(e) = connection.ping().await
                    {
                        tracing::warn!(error = %e, "Keep-alive ping failed");
                    }
                }
                Effect::Close => {
                    self.connecting = None;
                    if let Some(connection) = self.connection.take() {
                        connection.close().await;
                    }
                }
                Effect::Emit(event) => self.publish(event),
            }
        }

        self.sync_connection_state();
    }

    fn sync_connection_state(&self) {
        let state = self.session.state();
        self.outputs.connection.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn publish(&self, event: PrinterEvent) {
        if let PrinterEvent::StateChanged { state, .. } = &event {
            self.outputs.state.send_replace(state.as_ref().clone());
        }
        self.outputs.events.publish(event);
    }
}

async fn poll_connecting(
    connecting: &mut Option<ConnectFuture>,
) -> Result<Connection, ProtocolError> {
    match connecting.as_mut() {
        Some(future) => future.await,
        None => pending().await,
    }
}

async fn next_inbound(connection: &mut Option<Connection>) -> Inbound {
    match connection.as_mut() {
        Some(connection) => connection.next_inbound().await,
        None => pending().await,
    }
}

async fn sleep_until(deadline: Option<(Instant, TimerKind)>) -> TimerKind {
    match deadline {
        Some((at, kind)) => {
            tokio::time::sleep_until(at).await;
            kind
        }
        None => pending().await,
    }
}
