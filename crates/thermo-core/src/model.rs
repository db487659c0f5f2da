// ── Domain model ──
//
// Servo position and the two user intents exposed by the control surface.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::units::DisplayValues;

/// Raw servo position in whole degrees.
///
/// The valid range is [`Position::MIN`]..=[`Position::MAX`]. Requests are
/// clamped into it by [`Position::clamped`]; values reported by the device
/// are kept as reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(u32);

impl Position {
    pub const MIN: Self = Self(10);
    pub const MAX: Self = Self(180);

    /// Amount a single warmer/cooler intent moves the servo.
    pub const STEP: i64 = 10;

    /// Wrap a position reported by the device.
    pub const fn from_device(degrees: u32) -> Self {
        Self(degrees)
    }

    /// Clamp a requested position into the valid range. Never fails.
    pub fn clamped(requested: i64) -> Self {
        let bounded = requested.clamp(i64::from(Self::MIN.0), i64::from(Self::MAX.0));
        u32::try_from(bounded).map_or(Self::MIN, Self)
    }

    pub const fn degrees(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }

    pub fn is_in_range(self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self)
    }

    /// Rotation and temperature for this position.
    pub fn display(self) -> DisplayValues {
        DisplayValues::of(self)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User intents on a ready control surface.
///
/// The dial runs backwards: a higher servo position is a lower temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Intent {
    /// Raise the temperature: servo position − 10.
    Warmer,
    /// Lower the temperature: servo position + 10.
    Cooler,
}

impl Intent {
    pub const fn delta(self) -> i64 {
        match self {
            Self::Warmer => -Position::STEP,
            Self::Cooler => Position::STEP,
        }
    }

    /// Unclamped request produced by applying this intent at `from`.
    pub fn request_from(self, from: Position) -> i64 {
        i64::from(from.degrees()) + self.delta()
    }
}
