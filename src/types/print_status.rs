// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Print job status codes.

use std::fmt;

/// Status of the current print job as reported in `PrintInfo.Status`.
///
/// The printer reports a numeric code; codes without a known meaning are
/// kept as [`PrintStatus::Unknown`] so the raw value is never lost.
///
/// # Examples
///
/// ```
/// use sdcp_lib::types::PrintStatus;
///
/// let status = PrintStatus::from_code(13);
/// assert_eq!(status, PrintStatus::Printing);
/// assert_eq!(status.code(), 13);
/// assert_eq!(status.to_string(), "printing");
///
/// assert_eq!(PrintStatus::from_code(99), PrintStatus::Unknown(99));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrintStatus {
    /// No job is running.
    #[default]
    Idle,
    /// Axes are homing.
    Homing,
    /// Job is being paused.
    Pausing,
    /// Job is paused.
    Paused,
    /// Job is being stopped.
    Stopping,
    /// Job was stopped before completion.
    Stopped,
    /// Job finished successfully.
    Completed,
    /// Job file is being verified.
    FileChecking,
    /// Job is printing.
    Printing,
    /// Job is resuming from pause.
    Resuming,
    /// Nozzle or bed is heating up.
    Heating,
    /// Bed leveling is in progress.
    Leveling,
    /// Code not known to this library.
    Unknown(i64),
}

impl PrintStatus {
    /// Maps a vendor status code to a status.
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Idle,
            1 => Self::Homing,
            5 => Self::Pausing,
            6 => Self::Paused,
            7 => Self::Stopping,
            8 => Self::Stopped,
            9 => Self::Completed,
            10 => Self::FileChecking,
            13 => Self::Printing,
            15 => Self::Resuming,
            16 => Self::Heating,
            20 => Self::Leveling,
            other => Self::Unknown(other),
        }
    }

    /// Returns the vendor status code.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Idle => 0,
            Self::Homing => 1,
            Self::Pausing => 5,
            Self::Paused => 6,
            Self::Stopping => 7,
            Self::Stopped => 8,
            Self::Completed => 9,
            Self::FileChecking => 10,
            Self::Printing => 13,
            Self::Resuming => 15,
            Self::Heating => 16,
            Self::Leveling => 20,
            Self::Unknown(code) => code,
        }
    }

    /// Returns the human readable status text.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Homing => "homing",
            Self::Pausing => "pausing",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
            Self::FileChecking => "file checking",
            Self::Printing => "printing",
            Self::Resuming => "resuming",
            Self::Heating => "heating",
            Self::Leveling => "leveling",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Returns `true` while a job occupies the printer.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(
            self,
            Self::Idle | Self::Stopped | Self::Completed | Self::Unknown(_)
        )
    }
}

impl fmt::Display for PrintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for PrintStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
