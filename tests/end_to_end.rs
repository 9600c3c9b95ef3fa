// tests/end_to_end.rs
//! Full runs against scripted serial links

use gps_doctor::{
    ports::{discover, priority, PortDescriptor},
    probe::{
        script::{Feed, ScriptedLink},
        ProbeSettings,
    },
    CandidatePort, DiagnosticStatus, GpsDoctor, GpsError, Platform, PortSource,
};
use std::time::{Duration, Instant};

const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

fn settings(window: Duration) -> ProbeSettings {
    ProbeSettings {
        read_window: window,
        read_timeout: Duration::from_millis(10),
        ..ProbeSettings::default()
    }
}

#[test]
fn ten_fixed_gga_sentences_succeed_with_fix() {
    let link = ScriptedLink::new().with_feed("/dev/ttyACM0", 4800, Feed::then_silent(vec![GGA; 10]));
    let candidates = priority::prioritize(Vec::new(), vec!["/dev/ttyACM0".to_string()], None);
    let mut doctor = GpsDoctor::new(link, settings(Duration::from_secs(20)), vec![4800, 9600]);

    let started = Instant::now();
    let result = doctor.run(&candidates, &mut ());

    assert!(started.elapsed() < Duration::from_secs(20));
    assert_eq!(result.status, DiagnosticStatus::Succeeded);
    assert!(result.fix_acquired);
    assert_eq!(result.total_sentences_seen, 10);
    assert_eq!(result.succeeded_baud, Some(4800));
    assert!(result.errors.is_empty());

    let port = result.succeeded_port.clone().unwrap();
    assert_eq!(port.path, "/dev/ttyACM0");
    assert_eq!(port.source, PortSource::FallbackGuess);

    let position = result.last_fix.as_ref().and_then(|fix| fix.position).unwrap();
    assert!((position.latitude.signed() - 48.1173).abs() < 1e-4);
    assert!(result.into_result().is_ok());
}

#[test]
fn no_ports_anywhere_is_no_candidates_found() {
    let empty_dir = tempfile::tempdir().unwrap();
    let patterns = vec![
        format!("{}/serial/by-id/*", empty_dir.path().display()),
        format!("{}/ttyACM*", empty_dir.path().display()),
    ];

    let candidates = priority::prioritize(discover(&[]), priority::glob_in_order(&patterns), None);
    assert!(candidates.is_empty());

    let mut doctor = GpsDoctor::new(ScriptedLink::new(), ProbeSettings::default(), vec![4800, 9600]);
    let result = doctor.run(&candidates, &mut ());

    assert_eq!(result.status, DiagnosticStatus::NoCandidatesFound);
    assert_eq!(result.attempts, 0);
    assert_eq!(result.total_sentences_seen, 0);
    assert!(result.errors.is_empty());
    assert!(result.succeeded_port.is_none());
    assert!(matches!(result.into_result(), Err(GpsError::NoCandidatesFound)));
}

#[test]
fn user_override_is_probed_first() {
    let devices = vec![
        PortDescriptor::new("COM5").with_description("u-blox GNSS receiver"),
        PortDescriptor::new("COM9").with_description("USB Serial Port"),
    ];
    let candidates = priority::candidate_ports(Platform::Windows, &devices, Some("COM9"));
    assert_eq!(
        candidates.iter().map(|c| c.path.as_str()).collect::<Vec<_>>(),
        ["COM9", "COM5"]
    );

    let link = ScriptedLink::new()
        .with_feed("COM5", 4800, Feed::lines(vec![GGA; 10]))
        .with_feed("COM9", 9600, Feed::lines(vec![GGA; 10]));
    let mut doctor = GpsDoctor::new(link, settings(Duration::from_millis(50)), vec![4800, 9600]);
    let result = doctor.run(&candidates, &mut ());

    let port = result.succeeded_port.clone().unwrap();
    assert_eq!(port.path, "COM9");
    assert_eq!(port.source, PortSource::UserOverride);
    assert_eq!(port.rank, 0);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(doctor.link().max_open_handles(), 1);
    assert_eq!(doctor.link().open_handles(), 0);
}

#[test]
fn malformed_traffic_everywhere_exhausts_candidates() {
    let garbage = vec![
        "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00",
        "\u{fffd}\u{fffd}\u{fffd}",
        "$GPRMC,broken*11",
    ];
    let candidates: Vec<CandidatePort> = priority::prioritize(
        Vec::new(),
        vec!["/dev/ttyUSB0".to_string(), "/dev/ttyUSB1".to_string()],
        None,
    );
    let link = ScriptedLink::new()
        .with_feed("/dev/ttyUSB0", 4800, Feed::then_silent(garbage.clone()))
        .with_feed("/dev/ttyUSB0", 9600, Feed::then_silent(garbage))
        .with_feed("/dev/ttyUSB1", 4800, Feed::Refuse("Device or resource busy".to_string()));
    let mut doctor = GpsDoctor::new(link, settings(Duration::from_millis(30)), vec![4800, 9600]);

    let result = doctor.run(&candidates, &mut ());

    assert_eq!(result.status, DiagnosticStatus::AllCandidatesExhausted);
    assert_eq!(result.attempts, 4);
    assert_eq!(result.errors.len(), 4);
    assert_eq!(result.total_sentences_seen, 0);
    assert!(!result.fix_acquired);
    assert!(result.errors[0].reason.contains("malformed"));
    assert!(result.last_error_for("/dev/ttyUSB1").is_some());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "AllCandidatesExhausted");
    assert_eq!(json["errors"].as_array().map(Vec::len), Some(4));
}
