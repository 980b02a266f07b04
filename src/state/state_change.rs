// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! A [`StateChange`] is one changed leaf of the
//! [`DeviceState`](super::DeviceState): a dot separated path such as
//! `temperature.bed.target` plus its new JSON value. Changes are produced by
//! [`DeviceState::diff`](super::DeviceState::diff) and forwarded to the
//! state-tree writer.
//!
//! # Examples
//!
//! ```
//! use sdcp_lib::state::StateChange;
//!
//! let change = StateChange::new("fan.model", serde_json::json!(50));
//! assert_eq!(change.path(), "fan.model");
//! assert_eq!(change.value(), &serde_json::json!(50));
//! ```

use serde_json::Value;

/// One changed leaf of the device state.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StateChange {
    path: &'static str,
    value: Value,
}

impl StateChange {
    /// Creates a change.
    #[must_use]
    pub fn new(path: &'static str, value: Value) -> Self {
        Self { path, value }
    }

    /// Returns the dot separated path of the changed leaf.
    #[must_use]
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Returns the new value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the first path segment, the field group.
    ///
    /// ```
    /// use sdcp_lib::state::StateChange;
    ///
    /// let change = StateChange::new("temperature.nozzle.actual", serde_json::json!(1.0));
    /// assert_eq!(change.group(), "temperature");
    /// ```
    #[must_use]
    pub fn group(&self) -> &'static str {
        self.path.split('.').next().unwrap_or(self.path)
    }

    /// Consumes the change and returns its parts.
    #[must_use]
    pub fn into_parts(self) -> (&'static str, Value) {
        (self.path, self.value)
    }
}
