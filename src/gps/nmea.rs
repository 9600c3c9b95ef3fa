// src/gps/nmea.rs
//! NMEA 0183 sentence parsing
//!
//! Only the two sentence kinds that carry fix information are decoded:
//! GGA (fix data) and RMC (recommended minimum data), each in the GPS-only
//! (`GP`) and combined GNSS (`GN`) talker spellings. Everything else that is
//! framed correctly is reported as [`NmeaSentence::Other`].

use super::data::{Coordinate, FixQuality, Hemisphere, Position, RmcStatus};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

const GGA_MIN_FIELDS: usize = 15;
const RMC_MIN_FIELDS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Talker {
    /// `GP`: GPS only
    Gps,
    /// `GN`: combined GNSS solution
    Gnss,
}

/// GGA: Global Positioning System Fix Data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GgaSentence {
    pub talker: Talker,
    pub time: Option<NaiveTime>,
    pub position: Option<Position>,
    pub fix_quality: FixQuality,
    pub satellites: Option<u8>,
    pub hdop: Option<f64>,
    pub altitude: Option<f64>,
}

/// RMC: Recommended Minimum Specific GNSS Data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RmcSentence {
    pub talker: Talker,
    pub time: Option<NaiveTime>,
    pub status: RmcStatus,
    pub position: Option<Position>,
    pub speed_knots: Option<f64>,
    pub course: Option<f64>,
    pub date: Option<NaiveDate>,
}

impl RmcSentence {
    /// Speed over ground converted from knots to km/h
    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed_knots.map(|knots| knots * 1.852)
    }
}

/// Why a `$`-framed line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("checksum mismatch: sentence says {expected:02X}, computed {computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },

    #[error("unreadable checksum '{0}'")]
    BadChecksum(String),

    #[error("{kind} sentence has {found} fields, expected at least {expected}")]
    FieldCount {
        kind: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("invalid {field} field '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("missing {0} field")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NmeaSentence {
    Gga(GgaSentence),
    Rmc(RmcSentence),
    /// Well-formed sentence of a kind we don't decode, e.g. `GPGSV`
    Other(String),
    Malformed(MalformedReason),
}

impl NmeaSentence {
    /// True for the sentence kinds that count as valid receiver traffic.
    pub fn is_fix_data(&self) -> bool {
        matches!(self, NmeaSentence::Gga(_) | NmeaSentence::Rmc(_))
    }

    /// GGA with quality > 0, or RMC with an active status.
    pub fn signals_fix(&self) -> bool {
        match self {
            NmeaSentence::Gga(gga) => gga.fix_quality.has_fix(),
            NmeaSentence::Rmc(rmc) => rmc.status == RmcStatus::Active,
            _ => false,
        }
    }
}

/// Classify one decoded line.
///
/// Returns `None` for lines that are not NMEA at all (no leading `$`); these
/// are discarded before any parsing. Decoding never fails outright: bad
/// framing or bad fields produce [`NmeaSentence::Malformed`].
pub fn parse_line(line: &str) -> Option<NmeaSentence> {
    let line = line.trim();
    if !line.starts_with('$') {
        return None;
    }

    Some(parse_sentence(line).unwrap_or_else(NmeaSentence::Malformed))
}

/// XOR of every byte between `$` and `*`
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

fn parse_sentence(line: &str) -> Result<NmeaSentence, MalformedReason> {
    let body = verify_checksum(&line[1..])?;
    let fields: Vec<&str> = body.split(',').collect();

    match fields[0] {
        "GPGGA" => parse_gga(Talker::Gps, &fields).map(NmeaSentence::Gga),
        "GNGGA" => parse_gga(Talker::Gnss, &fields).map(NmeaSentence::Gga),
        "GPRMC" => parse_rmc(Talker::Gps, &fields).map(NmeaSentence::Rmc),
        "GNRMC" => parse_rmc(Talker::Gnss, &fields).map(NmeaSentence::Rmc),
        address => Ok(NmeaSentence::Other(address.to_string())),
    }
}

/// Strip and check the optional `*HH` suffix, returning the sentence body.
fn verify_checksum(content: &str) -> Result<&str, MalformedReason> {
    let Some((body, suffix)) = content.rsplit_once('*') else {
        return Ok(content);
    };

    let expected = parse_hex_byte(suffix).ok_or_else(|| MalformedReason::BadChecksum(suffix.to_string()))?;
    let computed = checksum(body);
    if expected != computed {
        return Err(MalformedReason::ChecksumMismatch { expected, computed });
    }

    Ok(body)
}

fn parse_hex_byte(s: &str) -> Option<u8> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(s, 16).ok()
}

/// Parse GGA fields:
/// time, lat, N/S, lon, E/W, quality, sats, hdop, alt, M, geoid, M, age, station
fn parse_gga(talker: Talker, fields: &[&str]) -> Result<GgaSentence, MalformedReason> {
    check_field_count("GGA", fields, GGA_MIN_FIELDS)?;

    Ok(GgaSentence {
        talker,
        time: utc_time(fields[1])?,
        position: position(&fields[2..6])?,
        fix_quality: FixQuality(required(fields[6], "fix quality")?),
        satellites: optional(fields[7], "satellite count")?,
        hdop: optional(fields[8], "HDOP")?,
        altitude: optional(fields[9], "altitude")?,
    })
}

/// Parse RMC fields:
/// time, status, lat, N/S, lon, E/W, speed, course, date, magvar, E/W [, mode]
fn parse_rmc(talker: Talker, fields: &[&str]) -> Result<RmcSentence, MalformedReason> {
    check_field_count("RMC", fields, RMC_MIN_FIELDS)?;

    let status = match fields[2] {
        "A" => RmcStatus::Active,
        "V" => RmcStatus::Void,
        "" => return Err(MalformedReason::MissingField("status")),
        other => return Err(invalid("status", other)),
    };

    Ok(RmcSentence {
        talker,
        time: utc_time(fields[1])?,
        status,
        position: position(&fields[3..7])?,
        speed_knots: optional(fields[7], "speed")?,
        course: optional(fields[8], "course")?,
        date: utc_date(fields[9])?,
    })
}

fn check_field_count(kind: &'static str, fields: &[&str], expected: usize) -> Result<(), MalformedReason> {
    if fields.len() < expected {
        return Err(MalformedReason::FieldCount {
            kind,
            found: fields.len(),
            expected,
        });
    }
    Ok(())
}

fn invalid(field: &'static str, value: &str) -> MalformedReason {
    MalformedReason::InvalidField {
        field,
        value: value.to_string(),
    }
}

/// Empty field means "not reported"; anything else must parse.
fn optional<T: FromStr>(raw: &str, field: &'static str) -> Result<Option<T>, MalformedReason> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| invalid(field, raw))
}

fn required<T: FromStr>(raw: &str, field: &'static str) -> Result<T, MalformedReason> {
    optional(raw, field)?.ok_or(MalformedReason::MissingField(field))
}

#[derive(Clone, Copy)]
enum Axis {
    Latitude,
    Longitude,
}

/// `[lat, N/S, lon, E/W]`: either all four are present or all are empty.
fn position(fields: &[&str]) -> Result<Option<Position>, MalformedReason> {
    let latitude = coordinate(fields[0], fields[1], Axis::Latitude)?;
    let longitude = coordinate(fields[2], fields[3], Axis::Longitude)?;

    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok(Some(Position { latitude, longitude })),
        (None, None) => Ok(None),
        (None, Some(_)) => Err(MalformedReason::MissingField("latitude")),
        (Some(_), None) => Err(MalformedReason::MissingField("longitude")),
    }
}

/// Convert `ddmm.mmmm` / `dddmm.mmmm` into decimal degrees.
fn coordinate(value: &str, hemisphere: &str, axis: Axis) -> Result<Option<Coordinate>, MalformedReason> {
    let (name, max_degrees) = match axis {
        Axis::Latitude => ("latitude", 90.0),
        Axis::Longitude => ("longitude", 180.0),
    };

    match (value.is_empty(), hemisphere.is_empty()) {
        (true, true) => return Ok(None),
        (false, false) => {}
        _ => return Err(MalformedReason::MissingField(name)),
    }

    let hemisphere = match (axis, hemisphere) {
        (Axis::Latitude, "N") => Hemisphere::North,
        (Axis::Latitude, "S") => Hemisphere::South,
        (Axis::Longitude, "E") => Hemisphere::East,
        (Axis::Longitude, "W") => Hemisphere::West,
        (_, other) => return Err(invalid("hemisphere", other)),
    };

    let raw: f64 = value.parse().map_err(|_| invalid(name, value))?;
    if !(raw >= 0.0) {
        return Err(invalid(name, value));
    }

    let whole = (raw / 100.0).trunc();
    let minutes = raw - whole * 100.0;
    let degrees = whole + minutes / 60.0;
    // written negated so NaN is rejected too
    if !(minutes < 60.0) || !(degrees <= max_degrees) {
        return Err(invalid(name, value));
    }

    Ok(Some(Coordinate { degrees, hemisphere }))
}

fn two_digits(s: &str) -> Option<u32> {
    s.parse().ok()
}

/// `hhmmss` with an optional fractional second
fn utc_time(raw: &str) -> Result<Option<NaiveTime>, MalformedReason> {
    if raw.is_empty() {
        return Ok(None);
    }

    let (hms, fraction) = raw.split_once('.').unwrap_or((raw, ""));
    if hms.len() != 6
        || !hms.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid("time", raw));
    }

    let nanos = if fraction.is_empty() {
        0
    } else {
        let digits = &fraction[..fraction.len().min(9)];
        let value: u32 = digits.parse().map_err(|_| invalid("time", raw))?;
        value * 10u32.pow(9 - digits.len() as u32)
    };

    let parsed = match (two_digits(&hms[0..2]), two_digits(&hms[2..4]), two_digits(&hms[4..6])) {
        (Some(h), Some(m), Some(s)) => NaiveTime::from_hms_nano_opt(h, m, s, nanos),
        _ => None,
    };

    parsed.map(Some).ok_or_else(|| invalid("time", raw))
}

/// `ddmmyy`; years 80-99 are 19xx, the rest 20xx
fn utc_date(raw: &str) -> Result<Option<NaiveDate>, MalformedReason> {
    if raw.is_empty() {
        return Ok(None);
    }
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("date", raw));
    }

    let parsed = match (two_digits(&raw[0..2]), two_digits(&raw[2..4]), two_digits(&raw[4..6])) {
        (Some(day), Some(month), Some(yy)) => {
            let year = if yy >= 80 { 1900 + yy } else { 2000 + yy };
            NaiveDate::from_ymd_opt(year as i32, month, day)
        }
        _ => None,
    };

    parsed.map(Some).ok_or_else(|| invalid("date", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPGGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const GPRMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    fn gga(line: &str) -> GgaSentence {
        match parse_line(line) {
            Some(NmeaSentence::Gga(gga)) => gga,
            other => panic!("expected GGA, got {:?}", other),
        }
    }

    fn rmc(line: &str) -> RmcSentence {
        match parse_line(line) {
            Some(NmeaSentence::Rmc(rmc)) => rmc,
            other => panic!("expected RMC, got {:?}", other),
        }
    }

    fn is_malformed(line: &str) -> bool {
        matches!(parse_line(line), Some(NmeaSentence::Malformed(_)))
    }

    #[test]
    fn test_gpgga_parsing() {
        let data = gga(GPGGA);

        assert_eq!(data.talker, Talker::Gps);
        assert_eq!(data.time, NaiveTime::from_hms_opt(12, 35, 19));
        assert_eq!(data.fix_quality, FixQuality(1));
        assert_eq!(data.satellites, Some(8));
        assert_eq!(data.hdop, Some(0.9));
        assert_eq!(data.altitude, Some(545.4));

        let position = data.position.expect("position");
        assert!((position.latitude.degrees - 48.1173).abs() < 1e-6);
        assert_eq!(position.latitude.hemisphere, Hemisphere::North);
        assert!((position.longitude.degrees - 11.516_666_7).abs() < 1e-6);
        assert_eq!(position.longitude.hemisphere, Hemisphere::East);
        assert!(parse_line(GPGGA).unwrap().signals_fix());
    }

    #[test]
    fn test_gprmc_parsing() {
        let data = rmc(GPRMC);

        assert_eq!(data.status, RmcStatus::Active);
        assert_eq!(data.course, Some(84.4));
        assert_eq!(data.date, NaiveDate::from_ymd_opt(1994, 3, 23));
        // Speed should be converted from knots to km/h
        assert!((data.speed_kmh().unwrap() - 41.5).abs() < 0.1);
        assert!(parse_line(GPRMC).unwrap().signals_fix());
    }

    #[test]
    fn test_gnss_talker_variants() {
        let data = gga("$GNGGA,092750.000,5321.6802,N,00630.3372,W,2,12,0.7,10.5,M,55.0,M,,*63");
        assert_eq!(data.talker, Talker::Gnss);
        assert_eq!(data.fix_quality, FixQuality(2));
        assert_eq!(data.time, NaiveTime::from_hms_milli_opt(9, 27, 50, 0));
        let position = data.position.unwrap();
        assert!(position.longitude.signed() < 0.0);

        let data = rmc("$GNRMC,092750.000,A,5321.6802,N,00630.3372,W,0.02,31.66,280511,,,A*5D");
        assert_eq!(data.talker, Talker::Gnss);
        assert_eq!(data.date, NaiveDate::from_ymd_opt(2011, 5, 28));
    }

    #[test]
    fn test_zero_quality_is_not_a_fix() {
        let line = "$GPGGA,123520,4807.038,N,01131.000,E,0,03,2.1,545.4,M,46.9,M,,*4D";
        let sentence = parse_line(line).unwrap();
        assert!(sentence.is_fix_data());
        assert!(!sentence.signals_fix());
    }

    #[test]
    fn test_empty_fields_before_first_fix() {
        let data = gga("$GPGGA,,,,,,0,00,99.99,,,,,,*48");
        assert_eq!(data.time, None);
        assert_eq!(data.position, None);
        assert_eq!(data.altitude, None);
        assert_eq!(data.fix_quality, FixQuality(0));

        let data = rmc("$GNRMC,092750.000,V,,,,,,,,,,N*5A");
        assert_eq!(data.status, RmcStatus::Void);
        assert_eq!(data.position, None);
        assert!(!NmeaSentence::Rmc(data).signals_fix());
    }

    #[test]
    fn test_checksum_mismatch_is_malformed() {
        let corrupted = GPGGA.replace("*47", "*48");
        assert!(matches!(
            parse_line(&corrupted),
            Some(NmeaSentence::Malformed(MalformedReason::ChecksumMismatch { expected: 0x48, computed: 0x47 }))
        ));

        // a flipped payload character with the original checksum
        assert!(is_malformed(&GPGGA.replace("545.4", "545.5")));
        assert!(is_malformed(&GPRMC.replace(",A,", ",V,")));
        assert!(is_malformed(&GPGGA.replace("*47", "*ZZ")));
        assert!(is_malformed(&GPGGA.replace("*47", "*4")));
    }

    #[test]
    fn test_checksum_is_optional_and_case_insensitive() {
        let without = GPGGA.trim_end_matches("*47");
        assert!(matches!(parse_line(without), Some(NmeaSentence::Gga(_))));

        let lower = GPRMC.replace("*6A", "*6a");
        assert!(matches!(parse_line(&lower), Some(NmeaSentence::Rmc(_))));
    }

    #[test]
    fn test_bad_fields_are_malformed() {
        // wrong hemisphere letter
        assert!(is_malformed("$GPGGA,123519,4807.038,X,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*51"));
        // non-numeric fix quality
        assert!(is_malformed("$GPGGA,123519,4807.038,N,01131.000,E,one,08,0.9,545.4,M,46.9,M,,*12"));
        // latitude without longitude
        assert!(is_malformed("$GPGGA,123519,4807.038,N,,,1,08,0.9,545.4,M,46.9,M,,*2E"));
        // unknown RMC status
        assert!(is_malformed("$GPRMC,123519,X,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*73"));
        // truncated sentence
        assert!(matches!(
            parse_line("$GPGGA,123519,4807.038,N,01131.000,E,1,08*77"),
            Some(NmeaSentence::Malformed(MalformedReason::FieldCount { kind: "GGA", found: 8, .. }))
        ));
        // 65 seconds
        assert!(is_malformed("$GPGGA,126519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*42"));
        // 77 minutes
        assert!(is_malformed("$GPGGA,123519,4877.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*40"));
    }

    #[test]
    fn test_other_sentences() {
        let gsv = "$GPGSV,3,1,12,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45*7F";
        let sentence = parse_line(gsv).unwrap();
        assert_eq!(sentence, NmeaSentence::Other("GPGSV".to_string()));
        assert!(!sentence.is_fix_data());
        assert!(!sentence.signals_fix());
    }

    #[test]
    fn test_non_nmea_lines_are_discarded() {
        for line in ["", "   ", "garbage", "GPGGA,123519", "\u{fffd}\u{fffd}$GPGGA", "!AIVDM,1,1"] {
            assert_eq!(parse_line(line), None, "line {:?}", line);
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let line = format!("  {}\r\n", GPGGA);
        assert!(matches!(parse_line(&line), Some(NmeaSentence::Gga(_))));
    }

    #[test]
    fn test_checksum_value() {
        assert_eq!(checksum("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,"), 0x47);
    }
}
