// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Printer state tracking.

use serde::Serialize;
use serde_json::{Value, json};

use crate::types::{PrintStatus, RgbColor, ZERO_HMS};

use super::StateChange;

/// Actual and target temperature of one heater, in °C.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Temperature {
    /// Measured temperature.
    pub actual: f64,
    /// Target temperature.
    pub target: f64,
}

/// Temperatures of all heaters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Temperatures {
    /// Nozzle (hotend).
    pub nozzle: Temperature,
    /// Heated bed.
    pub bed: Temperature,
    /// Enclosure chamber.
    pub chamber: Temperature,
}

/// Fan speeds in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Fans {
    /// Part cooling fan.
    pub model: u8,
    /// Auxiliary fan.
    pub auxiliary: u8,
    /// Chamber fan.
    pub chamber: u8,
}

/// Current print job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintJob {
    /// Decoded job status.
    pub status: PrintStatus,
    /// Raw vendor status code.
    pub status_code: i64,
    /// Progress percent (0-100).
    pub progress: u8,
    /// Current layer.
    pub current_layer: u32,
    /// Total layers.
    pub total_layer: u32,
    /// Print speed percent.
    pub speed_percent: u32,
    /// Job file name.
    pub filename: String,
    /// Job id assigned by the printer.
    pub task_id: String,
    /// Elapsed seconds.
    pub elapsed_seconds: u64,
    /// Remaining seconds, `max(0, total - elapsed)`.
    pub remaining_seconds: u64,
    /// Estimated total seconds.
    pub total_seconds: u64,
    /// Elapsed time as `HH:MM:SS`.
    pub elapsed: String,
    /// Remaining time as `HH:MM:SS`.
    pub remaining: String,
    /// Total time as `HH:MM:SS`.
    pub total: String,
}

impl Default for PrintJob {
    fn default() -> Self {
        Self {
            status: PrintStatus::Idle,
            status_code: 0,
            progress: 0,
            current_layer: 0,
            total_layer: 0,
            speed_percent: 100,
            filename: String::new(),
            task_id: String::new(),
            elapsed_seconds: 0,
            remaining_seconds: 0,
            total_seconds: 0,
            elapsed: ZERO_HMS.to_string(),
            remaining: ZERO_HMS.to_string(),
            total: ZERO_HMS.to_string(),
        }
    }
}

/// Toolhead position in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Position {
    /// X axis.
    pub x: f64,
    /// Y axis.
    pub y: f64,
    /// Z axis.
    pub z: f64,
    /// Z offset, rounded to 4 decimals.
    pub z_offset: f64,
}

/// Chamber lighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Lighting {
    /// Chamber light on/off.
    pub chamber: bool,
    /// RGB strip color.
    pub rgb: RgbColor,
}

/// Normalized snapshot of printer telemetry.
///
/// Every field has a deterministic default, so a state that has never
/// received a report is still fully populated. The state is only changed by
/// the [normalizer](super::apply), one field group at a time.
///
/// # Examples
///
/// ```
/// use sdcp_lib::state::DeviceState;
///
/// let state = DeviceState::new();
/// assert_eq!(state.fans().model, 0);
/// assert_eq!(state.print_job().elapsed, "00:00:00");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceState {
    temperatures: Temperatures,
    fans: Fans,
    print: PrintJob,
    position: Position,
    light: Lighting,
    machine_status: Vec<i64>,
}

impl DeviceState {
    /// Creates a state holding only defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the heater temperatures.
    #[must_use]
    pub fn temperatures(&self) -> &Temperatures {
        &self.temperatures
    }

    /// Returns the fan speeds.
    #[must_use]
    pub fn fans(&self) -> &Fans {
        &self.fans
    }

    /// Returns the current print job.
    #[must_use]
    pub fn print_job(&self) -> &PrintJob {
        &self.print
    }

    /// Returns the toolhead position.
    #[must_use]
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Returns the lighting state.
    #[must_use]
    pub fn light(&self) -> &Lighting {
        &self.light
    }

    /// Returns the raw machine status codes.
    #[must_use]
    pub fn machine_status(&self) -> &[i64] {
        &self.machine_status
    }

    pub(crate) fn temperatures_mut(&mut self) -> &mut Temperatures {
        &mut self.temperatures
    }

    pub(crate) fn fans_mut(&mut self) -> &mut Fans {
        &mut self.fans
    }

    pub(crate) fn print_job_mut(&mut self) -> &mut PrintJob {
        &mut self.print
    }

    pub(crate) fn position_mut(&mut self) -> &mut Position {
        &mut self.position
    }

    pub(crate) fn light_mut(&mut self) -> &mut Lighting {
        &mut self.light
    }

    pub(crate) fn set_machine_status(&mut self, codes: Vec<i64>) {
        self.machine_status = codes;
    }

    /// Returns every leaf of the state as a `(path, value)` pair.
    ///
    /// Paths are dot separated, e.g. `temperature.nozzle.actual`.
    #[must_use]
    pub fn leaves(&self) -> Vec<(&'static str, Value)> {
        let t = &self.temperatures;
        let p = &self.print;
        vec![
            ("temperature.nozzle.actual", json!(t.nozzle.actual)),
            ("temperature.nozzle.target", json!(t.nozzle.target)),
            ("temperature.bed.actual", json!(t.bed.actual)),
            ("temperature.bed.target", json!(t.bed.target)),
            ("temperature.chamber.actual", json!(t.chamber.actual)),
            ("temperature.chamber.target", json!(t.chamber.target)),
            ("fan.model", json!(self.fans.model)),
            ("fan.auxiliary", json!(self.fans.auxiliary)),
            ("fan.chamber", json!(self.fans.chamber)),
            ("print.status", json!(p.status.as_str())),
            ("print.status_code", json!(p.status_code)),
            ("print.progress", json!(p.progress)),
            ("print.current_layer", json!(p.current_layer)),
            ("print.total_layer", json!(p.total_layer)),
            ("print.speed", json!(p.speed_percent)),
            ("print.filename", json!(p.filename)),
            ("print.task_id", json!(p.task_id)),
            ("print.elapsed_seconds", json!(p.elapsed_seconds)),
            ("print.remaining_seconds", json!(p.remaining_seconds)),
            ("print.total_seconds", json!(p.total_seconds)),
            ("print.elapsed", json!(p.elapsed)),
            ("print.remaining", json!(p.remaining)),
            ("print.total", json!(p.total)),
            ("position.x", json!(self.position.x)),
            ("position.y", json!(self.position.y)),
            ("position.z", json!(self.position.z)),
            ("position.z_offset", json!(self.position.z_offset)),
            ("light.chamber", json!(self.light.chamber)),
            ("light.rgb", json!(self.light.rgb)),
            ("machine.status", json!(self.machine_status)),
        ]
    }

    /// Lists the leaves whose values differ in `other`.
    ///
    /// The returned changes carry the values from `other`.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<StateChange> {
        self.leaves()
            .into_iter()
            .zip(other.leaves())
            .filter(|((_, old), (_, new))| old != new)
            .map(|(_, (path, value))| StateChange::new(path, value))
            .collect()
    }
}
