// src/gps/data.rs
//! Typed GPS values extracted from NMEA sentences

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn letter(self) -> char {
        match self {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
            Hemisphere::East => 'E',
            Hemisphere::West => 'W',
        }
    }

    fn is_negative(self) -> bool {
        matches!(self, Hemisphere::South | Hemisphere::West)
    }
}

/// An unsigned angle in decimal degrees plus its hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub degrees: f64,
    pub hemisphere: Hemisphere,
}

impl Coordinate {
    /// Decimal degrees, negative for south and west.
    pub fn signed(&self) -> f64 {
        if self.hemisphere.is_negative() {
            -self.degrees
        } else {
            self.degrees
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}° {}", self.degrees, self.hemisphere.letter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub latitude: Coordinate,
    pub longitude: Coordinate,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// GGA fix quality indicator. Zero means no fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FixQuality(pub u8);

impl FixQuality {
    pub fn has_fix(self) -> bool {
        self.0 > 0
    }

    pub fn description(self) -> String {
        match self.0 {
            0 => "No fix".to_string(),
            1 => "GPS".to_string(),
            2 => "DGPS".to_string(),
            3 => "PPS".to_string(),
            4 => "RTK".to_string(),
            5 => "Float RTK".to_string(),
            6 => "Estimated".to_string(),
            7 => "Manual".to_string(),
            8 => "Simulation".to_string(),
            q => format!("Unknown ({})", q),
        }
    }
}

/// RMC receiver status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RmcStatus {
    Active,
    Void,
}

/// Best-known fix state seen during a probe, kept for the final report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FixSnapshot {
    pub time: Option<NaiveTime>,
    pub date: Option<NaiveDate>,
    pub position: Option<Position>,
    pub satellites: Option<u8>,
    pub fix_quality: Option<FixQuality>,
}

impl FixSnapshot {
    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_coordinates() {
        let south = Coordinate { degrees: 33.5, hemisphere: Hemisphere::South };
        let east = Coordinate { degrees: 151.2, hemisphere: Hemisphere::East };
        assert_eq!(south.signed(), -33.5);
        assert_eq!(east.signed(), 151.2);
    }

    #[test]
    fn test_fix_quality_threshold() {
        assert!(!FixQuality(0).has_fix());
        assert!(FixQuality(1).has_fix());
        assert!(FixQuality(6).has_fix());
        assert_eq!(FixQuality(4).description(), "RTK");
        assert_eq!(FixQuality(42).description(), "Unknown (42)");
    }

    #[test]
    fn test_position_display() {
        let position = Position {
            latitude: Coordinate { degrees: 48.1173, hemisphere: Hemisphere::North },
            longitude: Coordinate { degrees: 11.516667, hemisphere: Hemisphere::East },
        };
        assert_eq!(position.to_string(), "48.117300° N, 11.516667° E");
    }
}
