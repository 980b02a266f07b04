// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping of decoded telemetry onto the [`DeviceState`].
//!
//! Fields absent from a frame keep their previous value; only fields the
//! frame actually carries are touched. Applying the same frame twice yields
//! the same state.

use crate::error::ParseError;
use crate::protocol::{FanSpeedBlock, LightBlock, PrintInfoBlock, StatusBlock, StatusEnvelope};
use crate::types::{PrintStatus, RgbColor, format_hms, remaining_seconds, round_to};

use super::DeviceState;
use super::device_state::Temperature;

/// Decimal places kept for temperatures.
const TEMPERATURE_DECIMALS: i32 = 2;

/// Decimal places kept for the Z offset.
const Z_OFFSET_DECIMALS: i32 = 4;

/// Produces the state that results from applying `envelope` to `previous`.
///
/// # Examples
///
/// ```
/// use sdcp_lib::protocol::decode;
/// use sdcp_lib::state::{DeviceState, apply};
///
/// let frame = decode(r#"{"Status":{"TempOfNozzle":42.567}}"#).unwrap();
/// let state = apply(&DeviceState::new(), &frame);
///
/// assert_eq!(state.temperatures().nozzle.actual, 42.57);
/// assert_eq!(state.temperatures().bed.actual, 0.0);
/// ```
#[must_use]
pub fn apply(previous: &DeviceState, envelope: &StatusEnvelope) -> DeviceState {
    let mut state = previous.clone();
    if let Some(status) = &envelope.status {
        apply_status(&mut state, status);
    }
    state
}

fn apply_status(state: &mut DeviceState, status: &StatusBlock) {
    apply_temperatures(state, status);

    if let Some(fans) = &status.fan_speed {
        apply_fans(state, fans);
    }

    if let Some(coord) = &status.current_coord {
        match parse_coordinates(coord) {
            Ok((x, y, z)) => {
                let position = state.position_mut();
                position.x = x;
                position.y = y;
                position.z = z;
            }
            Err(e) => tracing::warn!(error = %e, "Skipping position"),
        }
    }

    if let Some(z_offset) = status.z_offset.filter(|v| v.is_finite()) {
        state.position_mut().z_offset = round_to(z_offset, Z_OFFSET_DECIMALS);
    }

    if let Some(light) = &status.light_status {
        apply_light(state, light);
    }

    if let Some(info) = &status.print_info {
        apply_print_info(state, info);
    }

    if let Some(codes) = &status.current_status {
        state.set_machine_status(codes.clone());
    }
}

fn apply_temperatures(state: &mut DeviceState, status: &StatusBlock) {
    let temperatures = state.temperatures_mut();
    update_temperature(
        &mut temperatures.nozzle,
        status.temp_of_nozzle,
        status.temp_target_nozzle,
    );
    update_temperature(
        &mut temperatures.bed,
        status.temp_of_hotbed,
        status.temp_target_hotbed,
    );
    update_temperature(
        &mut temperatures.chamber,
        status.temp_of_box,
        status.temp_target_box,
    );
}

fn update_temperature(slot: &mut Temperature, actual: Option<f64>, target: Option<f64>) {
    if let Some(actual) = actual.filter(|v| v.is_finite()) {
        slot.actual = round_to(actual, TEMPERATURE_DECIMALS);
    }
    if let Some(target) = target.filter(|v| v.is_finite()) {
        slot.target = round_to(target, TEMPERATURE_DECIMALS);
    }
}

fn apply_fans(state: &mut DeviceState, block: &FanSpeedBlock) {
    let fans = state.fans_mut();
    if let Some(v) = block.model_fan.and_then(percent) {
        fans.model = v;
    }
    if let Some(v) = block.auxiliary_fan.and_then(percent) {
        fans.auxiliary = v;
    }
    if let Some(v) = block.box_fan.and_then(percent) {
        fans.chamber = v;
    }
}

fn apply_light(state: &mut DeviceState, block: &LightBlock) {
    let light = state.light_mut();
    if let Some(on) = block.second_light {
        light.chamber = on;
    }
    if let Some(rgb) = &block.rgb_light {
        match rgb.as_slice() {
            [r, g, b] => light.rgb = RgbColor::clamped(*r, *g, *b),
            other => tracing::warn!(len = other.len(), "Skipping RGB light, expected 3 channels"),
        }
    }
}

fn apply_print_info(state: &mut DeviceState, info: &PrintInfoBlock) {
    let job = state.print_job_mut();

    if let Some(code) = info.status {
        job.status = PrintStatus::from_code(code);
        job.status_code = code;
    }
    if let Some(layer) = info.current_layer {
        job.current_layer = non_negative_u32(layer);
    }
    if let Some(layer) = info.total_layer {
        job.total_layer = non_negative_u32(layer);
    }
    if let Some(progress) = info.progress.and_then(percent) {
        job.progress = progress;
    }
    if let Some(speed) = info.print_speed_pct.filter(|v| v.is_finite()) {
        // Safe: clamped to a non-negative range well inside u32
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let speed = speed.round().clamp(0.0, 1000.0) as u32;
        job.speed_percent = speed;
    }
    if let Some(filename) = &info.filename {
        job.filename.clone_from(filename);
    }
    if let Some(task_id) = &info.task_id {
        job.task_id.clone_from(task_id);
    }

    if info.current_ticks.is_some() || info.total_ticks.is_some() {
        if let Some(elapsed) = info.current_ticks {
            job.elapsed_seconds = seconds(elapsed);
        }
        if let Some(total) = info.total_ticks {
            job.total_seconds = seconds(total);
        }
        job.remaining_seconds = remaining_seconds(job.total_seconds, job.elapsed_seconds);

        // Negative and NaN inputs were already mapped to zero seconds
        #[allow(clippy::cast_precision_loss)]
        {
            job.elapsed = format_hms(job.elapsed_seconds as f64);
            job.total = format_hms(job.total_seconds as f64);
            job.remaining = format_hms(job.remaining_seconds as f64);
        }
    }
}

/// Parses an `"x,y,z"` coordinate string.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] unless the string holds exactly three
/// comma separated finite numbers.
pub fn parse_coordinates(s: &str) -> Result<(f64, f64, f64), ParseError> {
    let invalid = |message: String| ParseError::InvalidValue {
        field: "CurrenCoord".to_string(),
        message,
    };

    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(invalid(format!(
            "expected 3 coordinates, got {}: {s}",
            parts.len()
        )));
    };

    let parse = |token: &str| {
        token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(format!("not a number: {token:?}")))
    };

    Ok((parse(x)?, parse(y)?, parse(z)?))
}

fn percent(value: f64) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    // Safe: clamped to 0-100
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let v = value.round().clamp(0.0, 100.0) as u8;
    Some(v)
}

fn seconds(value: f64) -> u64 {
    if !value.is_finite() || value < 0.0 {
        return 0;
    }
    // Safe: finite and non-negative; saturates for absurd values
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let secs = value.trunc() as u64;
    secs
}

fn non_negative_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode;

    fn frame(json: &str) -> StatusEnvelope {
        decode(json).unwrap()
    }

    fn busy_state() -> DeviceState {
        apply(
            &DeviceState::new(),
            &frame(
                r#"{"Status":{
                    "CurrentStatus":[1],
                    "TempOfNozzle":210.123,"TempTargetNozzle":210,
                    "TempOfHotbed":59.996,"TempTargetHotbed":60,
                    "TempOfBox":31.5,"TempTargetBox":0,
                    "CurrentFanSpeed":{"ModelFan":100,"AuxiliaryFan":40,"BoxFan":20},
                    "CurrenCoord":"120.50,80.25,3.40",
                    "ZOffset":0.123456,
                    "LightStatus":{"SecondLight":1,"RgbLight":[255,128,0]},
                    "PrintInfo":{"Status":13,"CurrentLayer":42,"TotalLayer":300,
                        "CurrentTicks":600,"TotalTicks":3661,"Filename":"benchy.gcode",
                        "Progress":14,"PrintSpeedPct":100,"TaskId":"job-7f3a"}
                }}"#,
            ),
        )
    }

    #[test]
    fn empty_envelope_is_identity() {
        let empty = StatusEnvelope::default();
        assert_eq!(apply(&DeviceState::new(), &empty), DeviceState::new());

        let state = busy_state();
        assert_eq!(apply(&state, &empty), state);
        assert_eq!(apply(&state, &frame(r#"{"Status":{}}"#)), state);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let f = frame(r#"{"Status":{"TempOfNozzle":100.005,"PrintInfo":{"CurrentTicks":5}}}"#);
        let once = apply(&DeviceState::new(), &f);
        assert_eq!(apply(&once, &f), once);
    }

    #[test]
    fn nozzle_temperature_is_rounded_and_others_untouched() {
        let state = apply(
            &DeviceState::new(),
            &frame(r#"{"Status":{"TempOfNozzle":42.567}}"#),
        );
        assert_eq!(state.temperatures().nozzle.actual, 42.57);
        assert_eq!(state.temperatures().bed, Temperature::default());
        assert_eq!(state.temperatures().chamber, Temperature::default());
    }

    #[test]
    fn full_status_is_normalized() {
        let state = busy_state();
        assert_eq!(state.temperatures().nozzle.actual, 210.12);
        assert_eq!(state.temperatures().bed.actual, 60.0);
        assert_eq!(state.fans().auxiliary, 40);
        assert_eq!(state.position().x, 120.5);
        assert_eq!(state.position().z, 3.4);
        assert_eq!(state.position().z_offset, 0.1235);
        assert!(state.light().chamber);
        assert_eq!(state.light().rgb, RgbColor::new(255, 128, 0));
        assert_eq!(state.machine_status(), &[1]);

        let job = state.print_job();
        assert_eq!(job.status, PrintStatus::Printing);
        assert_eq!(job.filename, "benchy.gcode");
        assert_eq!(job.task_id, "job-7f3a");
        assert_eq!(job.remaining_seconds, 3061);
        assert_eq!(job.elapsed, "00:10:00");
        assert_eq!(job.total, "01:01:01");
        assert_eq!(job.remaining, "00:51:01");
    }

    #[test]
    fn missing_fans_keep_previous_values() {
        let state = busy_state();
        let next = apply(&state, &frame(r#"{"Status":{"TempOfNozzle":205.0}}"#));
        assert_eq!(next.fans(), state.fans());
        assert_eq!(next.fans().model, 100);
    }

    #[test]
    fn partial_fan_block_updates_only_present_fans() {
        let state = busy_state();
        let next = apply(
            &state,
            &frame(r#"{"Status":{"CurrentFanSpeed":{"ModelFan":55.4}}}"#),
        );
        assert_eq!(next.fans().model, 55);
        assert_eq!(next.fans().auxiliary, 40);
        assert_eq!(next.fans().chamber, 20);
    }

    #[test]
    fn malformed_position_is_skipped_without_losing_other_fields() {
        let state = busy_state();
        let next = apply(
            &state,
            &frame(r#"{"Status":{"CurrenCoord":"1.0,2.0","TempOfHotbed":70.0}}"#),
        );
        assert_eq!(next.position(), state.position());
        assert_eq!(next.temperatures().bed.actual, 70.0);
    }

    #[test]
    fn elapsed_beyond_total_clamps_remaining() {
        let state = apply(
            &DeviceState::new(),
            &frame(r#"{"Status":{"PrintInfo":{"CurrentTicks":500,"TotalTicks":100}}}"#),
        );
        assert_eq!(state.print_job().remaining_seconds, 0);
        assert_eq!(state.print_job().remaining, "00:00:00");
    }

    #[test]
    fn negative_ticks_render_zero() {
        let state = apply(
            &DeviceState::new(),
            &frame(r#"{"Status":{"PrintInfo":{"CurrentTicks":-30,"TotalTicks":-1}}}"#),
        );
        assert_eq!(state.print_job().elapsed, "00:00:00");
        assert_eq!(state.print_job().total, "00:00:00");
    }

    #[test]
    fn remaining_uses_last_known_total() {
        let state = busy_state();
        let next = apply(
            &state,
            &frame(r#"{"Status":{"PrintInfo":{"CurrentTicks":3600}}}"#),
        );
        assert_eq!(next.print_job().total_seconds, 3661);
        assert_eq!(next.print_job().remaining_seconds, 61);
    }

    #[test]
    fn wrong_sized_rgb_is_skipped() {
        let state = busy_state();
        let next = apply(
            &state,
            &frame(r#"{"Status":{"LightStatus":{"RgbLight":[1,2]}}}"#),
        );
        assert_eq!(next.light().rgb, RgbColor::new(255, 128, 0));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let state = apply(
            &DeviceState::new(),
            &frame(
                r#"{"Status":{"CurrentFanSpeed":{"ModelFan":150},
                    "LightStatus":{"RgbLight":[300,-1,5]},
                    "PrintInfo":{"Progress":-3,"CurrentLayer":-1}}}"#,
            ),
        );
        assert_eq!(state.fans().model, 100);
        assert_eq!(state.light().rgb, RgbColor::new(255, 0, 5));
        assert_eq!(state.print_job().progress, 0);
        assert_eq!(state.print_job().current_layer, 0);
    }

    #[test]
    fn parse_coordinates_shapes() {
        assert_eq!(parse_coordinates("1,2,3").unwrap(), (1.0, 2.0, 3.0));
        assert_eq!(parse_coordinates(" 1.5 , -2 ,0.2 ").unwrap(), (1.5, -2.0, 0.2));
        assert!(parse_coordinates("1,2").is_err());
        assert!(parse_coordinates("1,2,3,4").is_err());
        assert!(parse_coordinates("a,b,c").is_err());
        assert!(parse_coordinates("").is_err());
        assert!(parse_coordinates("1,NaN,3").is_err());
    }
}
