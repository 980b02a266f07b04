// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for printer telemetry and control.
//!
//! # Types
//!
//! - [`RgbColor`] - Chamber light strip color (0-255 per channel)
//! - [`PrintStatus`] - Print job status decoded from vendor codes
//! - [`format_hms`] - `HH:MM:SS` rendering of job times

mod duration;
mod print_status;
mod rgb_color;

pub use duration::{ZERO_HMS, format_hms, remaining_seconds};
pub use print_status::PrintStatus;
pub use rgb_color::RgbColor;

/// Rounds `value` to `decimals` decimal places.
///
/// Non-finite values are returned unchanged.
///
/// ```
/// use sdcp_lib::types::round_to;
///
/// assert_eq!(round_to(42.567, 2), 42.57);
/// assert_eq!(round_to(0.123_456, 4), 0.1235);
/// ```
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
