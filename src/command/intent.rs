// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User intents and their mapping onto printer commands.

use serde_json::{Map, Value, json};

use crate::command::Command;
use crate::error::ValueError;
use crate::protocol::Opcode;
use crate::types::RgbColor;

/// Highest nozzle target accepted, in °C.
pub const MAX_NOZZLE_TARGET: f64 = 300.0;

/// Highest bed target accepted, in °C.
pub const MAX_BED_TARGET: f64 = 120.0;

/// A high-level action requested by the user.
///
/// Every intent maps to exactly one opcode and data object.
///
/// # Examples
///
/// ```
/// use sdcp_lib::command::{Command, Intent};
/// use sdcp_lib::protocol::Opcode;
///
/// let intent = Intent::set_bed_target(60.0).unwrap();
/// assert_eq!(intent.opcode(), Opcode::SetParameters);
/// assert_eq!(intent.data(), serde_json::json!({"TempTargetHotbed": 60.0}));
///
/// assert!(Intent::set_bed_target(500.0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Pause the running job.
    Pause,
    /// Resume a paused job.
    Resume,
    /// Cancel the running job.
    Cancel,
    /// Set the nozzle target temperature in °C.
    SetNozzleTarget(f64),
    /// Set the bed target temperature in °C.
    SetBedTarget(f64),
    /// Switch the chamber light and optionally recolor the RGB strip.
    SetLight {
        /// Chamber light on/off.
        on: bool,
        /// RGB strip color; left unchanged when `None`.
        rgb: Option<RgbColor>,
    },
    /// Set fan speeds in percent; `None` leaves a fan unchanged.
    SetFanSpeeds {
        /// Part cooling fan.
        model: Option<u8>,
        /// Auxiliary fan.
        auxiliary: Option<u8>,
        /// Chamber fan.
        chamber: Option<u8>,
    },
    /// Request an immediate status report.
    Refresh,
    /// Request the machine attributes.
    RequestAttributes,
}

impl Intent {
    /// Creates a checked nozzle target intent.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::OutOfRange`] outside `0..=300` °C.
    pub fn set_nozzle_target(celsius: f64) -> Result<Self, ValueError> {
        check_range("nozzle target", celsius, MAX_NOZZLE_TARGET)?;
        Ok(Self::SetNozzleTarget(celsius))
    }

    /// Creates a checked bed target intent.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::OutOfRange`] outside `0..=120` °C.
    pub fn set_bed_target(celsius: f64) -> Result<Self, ValueError> {
        check_range("bed target", celsius, MAX_BED_TARGET)?;
        Ok(Self::SetBedTarget(celsius))
    }

    /// Creates a checked fan speed intent.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::OutOfRange`] if any speed exceeds 100.
    pub fn set_fan_speeds(
        model: Option<u8>,
        auxiliary: Option<u8>,
        chamber: Option<u8>,
    ) -> Result<Self, ValueError> {
        for (field, speed) in [
            ("model fan", model),
            ("auxiliary fan", auxiliary),
            ("chamber fan", chamber),
        ] {
            if let Some(speed) = speed {
                check_range(field, f64::from(speed), 100.0)?;
            }
        }
        Ok(Self::SetFanSpeeds {
            model,
            auxiliary,
            chamber,
        })
    }

    /// Validates the intent's arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::OutOfRange`] for a temperature or speed the
    /// printer would not accept.
    pub fn validate(&self) -> Result<(), ValueError> {
        match *self {
            Self::SetNozzleTarget(t) => check_range("nozzle target", t, MAX_NOZZLE_TARGET),
            Self::SetBedTarget(t) => check_range("bed target", t, MAX_BED_TARGET),
            Self::SetFanSpeeds {
                model,
                auxiliary,
                chamber,
            } => Self::set_fan_speeds(model, auxiliary, chamber).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Builds an intent from its external name and argument.
    ///
    /// Returns `Ok(None)` for a name this library does not handle.
    ///
    /// | Name | Argument |
    /// |------|----------|
    /// | `pause`, `resume`, `cancel`, `refresh`, `requestAttributes` | ignored |
    /// | `setNozzleTarget`, `setBedTarget` | number or numeric string |
    /// | `setLight` | boolean, or `{"on": bool, "rgb": [r, g, b] \| "#rrggbb"}` |
    /// | `setFanSpeeds` | `{"model": n, "auxiliary": n, "chamber": n}` |
    ///
    /// # Errors
    ///
    /// Returns [`ValueError`] if the argument has the wrong shape or range.
    ///
    /// # Examples
    ///
    /// ```
    /// use sdcp_lib::command::Intent;
    /// use serde_json::json;
    ///
    /// assert_eq!(Intent::from_name("pause", &json!(null)).unwrap(), Some(Intent::Pause));
    /// assert_eq!(
    ///     Intent::from_name("setNozzleTarget", &json!("215")).unwrap(),
    ///     Some(Intent::SetNozzleTarget(215.0))
    /// );
    /// assert_eq!(Intent::from_name("selfDestruct", &json!(true)).unwrap(), None);
    /// ```
    pub fn from_name(name: &str, value: &Value) -> Result<Option<Self>, ValueError> {
        let intent = match name {
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "cancel" => Self::Cancel,
            "refresh" => Self::Refresh,
            "requestAttributes" => Self::RequestAttributes,
            "setNozzleTarget" => Self::set_nozzle_target(number_arg(name, value)?)?,
            "setBedTarget" => Self::set_bed_target(number_arg(name, value)?)?,
            "setLight" => light_arg(name, value)?,
            "setFanSpeeds" => fan_arg(name, value)?,
            _ => return Ok(None),
        };
        Ok(Some(intent))
    }

    /// Returns the external name of the intent.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
            Self::SetNozzleTarget(_) => "setNozzleTarget",
            Self::SetBedTarget(_) => "setBedTarget",
            Self::SetLight { .. } => "setLight",
            Self::SetFanSpeeds { .. } => "setFanSpeeds",
            Self::Refresh => "refresh",
            Self::RequestAttributes => "requestAttributes",
        }
    }
}

impl Command for Intent {
    fn opcode(&self) -> Opcode {
        match self {
            Self::Pause => Opcode::Pause,
            Self::Resume => Opcode::Resume,
            Self::Cancel => Opcode::Stop,
            Self::SetNozzleTarget(_)
            | Self::SetBedTarget(_)
            | Self::SetLight { .. }
            | Self::SetFanSpeeds { .. } => Opcode::SetParameters,
            Self::Refresh => Opcode::Status,
            Self::RequestAttributes => Opcode::Attributes,
        }
    }

    fn data(&self) -> Value {
        match self {
            Self::SetNozzleTarget(t) => json!({ "TempTargetNozzle": t }),
            Self::SetBedTarget(t) => json!({ "TempTargetHotbed": t }),
            Self::SetLight { on, rgb } => {
                let mut light = Map::new();
                light.insert("SecondLight".to_string(), json!(on));
                if let Some(rgb) = rgb {
                    light.insert("RgbLight".to_string(), json!(rgb.to_array()));
                }
                json!({ "LightStatus": light })
            }
            Self::SetFanSpeeds {
                model,
                auxiliary,
                chamber,
            } => {
                let mut fans = Map::new();
                for (key, speed) in [
                    ("ModelFan", model),
                    ("AuxiliaryFan", auxiliary),
                    ("BoxFan", chamber),
                ] {
                    if let Some(speed) = speed {
                        fans.insert(key.to_string(), json!(speed));
                    }
                }
                json!({ "TargetFanSpeed": fans })
            }
            Self::Pause | Self::Resume | Self::Cancel | Self::Refresh | Self::RequestAttributes => {
                json!({})
            }
        }
    }
}

fn check_range(field: &'static str, value: f64, max: f64) -> Result<(), ValueError> {
    if value.is_finite() && (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValueError::OutOfRange {
            field,
            min: 0.0,
            max,
            actual: value,
        })
    }
}

fn invalid(intent: &str, message: impl Into<String>) -> ValueError {
    ValueError::InvalidArgument {
        intent: intent.to_string(),
        message: message.into(),
    }
}

fn number_arg(intent: &str, value: &Value) -> Result<f64, ValueError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid(intent, format!("expected a number, got {value}")))
}

fn light_arg(intent: &str, value: &Value) -> Result<Intent, ValueError> {
    match value {
        Value::Bool(on) => Ok(Intent::SetLight { on: *on, rgb: None }),
        Value::Object(fields) => {
            let on = fields
                .get("on")
                .and_then(Value::as_bool)
                .ok_or_else(|| invalid(intent, "missing boolean \"on\""))?;
            let rgb = match fields.get("rgb") {
                None | Some(Value::Null) => None,
                Some(Value::String(hex)) => Some(RgbColor::from_hex(hex)?),
                Some(Value::Array(channels)) => Some(rgb_channels(intent, channels)?),
                Some(other) => {
                    return Err(invalid(intent, format!("unsupported rgb value {other}")));
                }
            };
            Ok(Intent::SetLight { on, rgb })
        }
        other => Err(invalid(intent, format!("expected boolean or object, got {other}"))),
    }
}

fn rgb_channels(intent: &str, channels: &[Value]) -> Result<RgbColor, ValueError> {
    let channel = |v: &Value| {
        v.as_u64()
            .and_then(|c| u8::try_from(c).ok())
            .ok_or_else(|| invalid(intent, format!("rgb channel {v} is not 0-255")))
    };
    match channels {
        [r, g, b] => Ok(RgbColor::new(channel(r)?, channel(g)?, channel(b)?)),
        _ => Err(invalid(intent, "rgb needs exactly 3 channels")),
    }
}

fn fan_arg(intent: &str, value: &Value) -> Result<Intent, ValueError> {
    let Value::Object(fields) = value else {
        return Err(invalid(intent, format!("expected object, got {value}")));
    };
    let speed = |key: &str| -> Result<Option<u8>, ValueError> {
        match fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .and_then(|s| u8::try_from(s).ok())
                .map(Some)
                .ok_or_else(|| invalid(intent, format!("{key} speed {v} is not a percentage"))),
        }
    };
    Intent::set_fan_speeds(speed("model")?, speed("auxiliary")?, speed("chamber")?)
}
