// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Print job time rendering.
//!
//! The printer reports job times as raw second counts (`CurrentTicks`,
//! `TotalTicks`). For display they are rendered as zero-padded `HH:MM:SS`.
//! Hours are not wrapped at 24, so a 30 hour print renders as `30:00:00`.
//!
//! # Examples
//!
//! ```
//! use sdcp_lib::types::format_hms;
//!
//! assert_eq!(format_hms(3661.0), "01:01:01");
//! assert_eq!(format_hms(-5.0), "00:00:00");
//! assert_eq!(format_hms(f64::NAN), "00:00:00");
//! ```

/// Rendering used for any time value that is negative or not a number.
pub const ZERO_HMS: &str = "00:00:00";

/// Formats a number of seconds as `HH:MM:SS`.
///
/// Fractional seconds are truncated. Negative, NaN and infinite inputs
/// render as `00:00:00`.
#[must_use]
pub fn format_hms(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return ZERO_HMS.to_string();
    }

    // Safe: seconds is finite and non-negative; saturates for absurd values
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = seconds.trunc() as u64;

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Remaining seconds of a job: `max(0, total - elapsed)`.
#[must_use]
pub fn remaining_seconds(total: u64, elapsed: u64) -> u64 {
    total.saturating_sub(elapsed)
}
