// src/gps/mod.rs
//! NMEA decoding and the GPS values it yields

pub mod data;
pub mod nmea;

pub use data::{Coordinate, FixQuality, FixSnapshot, Hemisphere, Position, RmcStatus};
pub use nmea::{parse_line, NmeaSentence};
