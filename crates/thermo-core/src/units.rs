//! Conversion from servo position to the two display units.
//!
//! Both maps are linear and were fitted to two measurements taken on the
//! installed dial:
//!
//! | servo position | dial rotation | thermostat |
//! |---------------:|--------------:|-----------:|
//! | 10             | 50°           | 80 °F      |
//! | 180            | −90°          | 56 °F      |
//!
//! The functions are total: callers clamp positions before they are sent
//! to the device, not before they are displayed.

use serde::Serialize;

use crate::model::Position;

/// One measured correspondence between servo position and display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    pub position: f64,
    pub rotation_deg: f64,
    pub temperature_f: f64,
}

/// Servo fully counter-clockwise: warmest setting.
pub const CALIBRATION_LOW: CalibrationPoint = CalibrationPoint {
    position: 10.0,
    rotation_deg: 50.0,
    temperature_f: 80.0,
};

/// Servo fully clockwise: coolest setting.
pub const CALIBRATION_HIGH: CalibrationPoint = CalibrationPoint {
    position: 180.0,
    rotation_deg: -90.0,
    temperature_f: 56.0,
};

fn interpolate(position: f64, at_low: f64, at_high: f64) -> f64 {
    (position - CALIBRATION_LOW.position) * (at_high - at_low)
        / (CALIBRATION_HIGH.position - CALIBRATION_LOW.position)
        + at_low
}

/// Dial rotation in degrees for a servo position.
pub fn rotation(position: f64) -> f64 {
    interpolate(
        position,
        CALIBRATION_LOW.rotation_deg,
        CALIBRATION_HIGH.rotation_deg,
    )
}

/// Thermostat temperature in °F for a servo position.
pub fn temperature(position: f64) -> f64 {
    interpolate(
        position,
        CALIBRATION_LOW.temperature_f,
        CALIBRATION_HIGH.temperature_f,
    )
}

/// Display values derived from a position at render time. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayValues {
    pub rotation_deg: f64,
    pub temperature_f: f64,
}

impl DisplayValues {
    pub fn of(position: Position) -> Self {
        let p = position.as_f64();
        Self {
            rotation_deg: rotation(p),
            temperature_f: temperature(p),
        }
    }

    /// Whole-degree temperature as shown on the dial face.
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn rounded_temperature(&self) -> i64 {
        self.temperature_f.round() as i64
    }
}
