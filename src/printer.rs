// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level handle to a managed printer.

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::command::{Intent, IntentResult};
use crate::config::{Endpoint, SessionConfig};
use crate::error::Error;
use crate::event::{EventBus, PrinterEvent};
use crate::session::driver::{Driver, Outputs, Request};
use crate::session::{Session, SessionState};
use crate::state::DeviceState;
use crate::types::RgbColor;

/// Capacity of the request channel to the driver.
const REQUEST_CHANNEL_CAPACITY: usize = 32;

/// A printer managed by a background session.
///
/// Cloning the handle is cheap; every clone talks to the same session. The
/// session shuts down on [`Printer::shutdown`] or once every handle is
/// dropped.
///
/// # Creating a Printer
///
/// ```no_run
/// use sdcp_lib::Printer;
///
/// # async fn example() -> sdcp_lib::Result<()> {
/// let printer = Printer::connect("192.168.1.40")?;
/// let mut events = printer.subscribe();
///
/// while let Ok(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Printer {
    requests: mpsc::Sender<Request>,
    state: watch::Receiver<DeviceState>,
    connection: watch::Receiver<SessionState>,
    events: EventBus,
}

impl Printer {
    /// Starts a session for the printer at `address` with default timings.
    ///
    /// `address` is a host, `host:port` or `ws://` URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if the address cannot be parsed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn connect(address: &str) -> Result<Self, Error> {
        Self::spawn(SessionConfig::new(Endpoint::parse(address)?))
    }

    /// Starts a session with an explicit configuration.
    ///
    /// The session starts connecting right away and keeps reconnecting
    /// according to its policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if the configuration does not validate.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(config: SessionConfig) -> Result<Self, Error> {
        config.validate()?;

        let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(DeviceState::new());
        let (connection_tx, connection_rx) = watch::channel(SessionState::Disconnected);
        let events = EventBus::new();

        tracing::debug!(endpoint = %config.endpoint, "Spawning printer session");

        let driver = Driver::new(
            Session::new(config),
            request_rx,
            Outputs {
                events: events.clone(),
                state: state_tx,
                connection: connection_tx,
            },
        );
        tokio::spawn(driver.run());

        Ok(Self {
            requests: request_tx,
            state: state_rx,
            connection: connection_rx,
            events,
        })
    }

    /// Returns a snapshot of the printer state.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state.borrow().clone()
    }

    /// Returns a receiver that is notified whenever the state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<DeviceState> {
        self.state.clone()
    }

    /// Returns the connection state.
    #[must_use]
    pub fn connection_state(&self) -> SessionState {
        *self.connection.borrow()
    }

    /// Returns `true` if the session is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection_state() == SessionState::Connected
    }

    /// Returns a receiver that is notified on connection transitions.
    #[must_use]
    pub fn watch_connection(&self) -> watch::Receiver<SessionState> {
        self.connection.clone()
    }

    /// Subscribes to printer events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PrinterEvent> {
        self.events.subscribe()
    }

    // ========== Job Control ==========

    /// Pauses the running job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] after shutdown.
    pub async fn pause(&self) -> Result<IntentResult, Error> {
        self.submit(Intent::Pause).await
    }

    /// Resumes a paused job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] after shutdown.
    pub async fn resume(&self) -> Result<IntentResult, Error> {
        self.submit(Intent::Resume).await
    }

    /// Cancels the running job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] after shutdown.
    pub async fn cancel(&self) -> Result<IntentResult, Error> {
        self.submit(Intent::Cancel).await
    }

    // ========== Machine Parameters ==========

    /// Sets the nozzle target temperature in °C.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] outside `0..=300` and
    /// [`Error::SessionClosed`] after shutdown.
    pub async fn set_nozzle_target(&self, celsius: f64) -> Result<IntentResult, Error> {
        self.submit(Intent::set_nozzle_target(celsius)?).await
    }

    /// Sets the bed target temperature in °C.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] outside `0..=120` and
    /// [`Error::SessionClosed`] after shutdown.
    pub async fn set_bed_target(&self, celsius: f64) -> Result<IntentResult, Error> {
        self.submit(Intent::set_bed_target(celsius)?).await
    }

    /// Switches the chamber light, optionally recoloring the RGB strip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] after shutdown.
    pub async fn set_light(&self, on: bool, rgb: Option<RgbColor>) -> Result<IntentResult, Error> {
        self.submit(Intent::SetLight { on, rgb }).await
    }

    /// Sets fan speeds in percent; `None` leaves a fan unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for a speed above 100 and
    /// [`Error::SessionClosed`] after shutdown.
    pub async fn set_fan_speeds(
        &self,
        model: Option<u8>,
        auxiliary: Option<u8>,
        chamber: Option<u8>,
    ) -> Result<IntentResult, Error> {
        self.submit(Intent::set_fan_speeds(model, auxiliary, chamber)?)
            .await
    }

    /// Requests an immediate status report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] after shutdown.
    pub async fn refresh(&self) -> Result<IntentResult, Error> {
        self.submit(Intent::Refresh).await
    }

    /// Requests the machine attributes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] after shutdown.
    pub async fn request_attributes(&self) -> Result<IntentResult, Error> {
        self.submit(Intent::RequestAttributes).await
    }

    // ========== Generic Invocation ==========

    /// Invokes an intent by its external name.
    ///
    /// Unknown names are logged and answered with
    /// [`IntentResult::Unsupported`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if the argument does not fit the intent and
    /// [`Error::SessionClosed`] after shutdown.
    pub async fn invoke(&self, name: &str, value: &Value) -> Result<IntentResult, Error> {
        match Intent::from_name(name, value)? {
            Some(intent) => self.submit(intent).await,
            None => {
                tracing::warn!(name, "Unsupported intent ignored");
                Ok(IntentResult::Unsupported)
            }
        }
    }

    /// Submits an intent to the session.
    ///
    /// A disconnected session rejects the intent without sending anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if the intent arguments are out of range and
    /// [`Error::SessionClosed`] after shutdown.
    pub async fn submit(&self, intent: Intent) -> Result<IntentResult, Error> {
        intent.validate()?;

        if !self.is_connected() {
            if self.requests.is_closed() {
                return Err(Error::SessionClosed);
            }
            tracing::debug!(intent = intent.name(), "Printer not connected");
            return Ok(IntentResult::NotConnected);
        }

        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Submit { intent, reply })
            .await
            .map_err(|_| Error::SessionClosed)?;
        response.await.map_err(|_| Error::SessionClosed)
    }

    // ========== Lifecycle ==========

    /// Connects now if the session is waiting to reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] after shutdown.
    pub async fn reconnect(&self) -> Result<(), Error> {
        self.requests
            .send(Request::Connect)
            .await
            .map_err(|_| Error::SessionClosed)
    }

    /// Shuts the session down and closes the connection.
    ///
    /// Calling it more than once, or after the session stopped, is a no-op.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.requests.send(Request::Shutdown { reply }).await.is_err() {
            return;
        }
        // Dropped reply means the driver already stopped
        let _ = done.await;
    }

    /// Returns `true` once the session has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }
}
