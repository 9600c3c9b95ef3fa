// src/ports/priority.rs
//! Merge discovered ports and platform fallbacks into one probe order

use super::{enumerate, CandidatePort, Platform, PortDescriptor, PortSource};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use tracing::debug;

/// Device patterns ordered by how reliably they identify a receiver:
/// persistent by-id symlinks, CDC-ACM (most u-blox), USB-serial bridges,
/// then macOS SiLabs and FTDI/Prolific names.
pub const POSIX_PATTERNS: &[&str] = &[
    "/dev/serial/by-id/*",
    "/dev/ttyACM*",
    "/dev/ttyUSB*",
    "/dev/tty.SLAB_USBtoUART*",
    "/dev/tty.usbserial*",
];

/// COM ports guessed on Windows when enumeration finds nothing
pub const WINDOWS_COM_RANGE: RangeInclusive<u32> = 3..=20;

/// Platform-specific guesses. Windows only guesses when nothing was
/// discovered; POSIX always adds whatever the device patterns match.
pub fn fallback_candidates(platform: Platform, have_discovered: bool) -> Vec<String> {
    match platform {
        Platform::Windows if have_discovered => Vec::new(),
        Platform::Windows => WINDOWS_COM_RANGE.map(|n| format!("COM{}", n)).collect(),
        Platform::Posix => glob_in_order(POSIX_PATTERNS),
    }
}

/// Expand each pattern in turn, keeping pattern order. Bad patterns and
/// unreadable entries are skipped.
pub fn glob_in_order<S: AsRef<str>>(patterns: &[S]) -> Vec<String> {
    let mut matches = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                debug!(pattern, "skipping invalid glob pattern: {}", e);
                continue;
            }
        };
        matches.extend(paths.flatten().map(|path| path.to_string_lossy().into_owned()));
    }
    matches
}

/// Build the final probe sequence.
///
/// Order: user override, discovered ports, fallback guesses. Duplicates keep
/// their first position; ranks are the resulting indices.
pub fn prioritize(discovered: Vec<CandidatePort>, fallbacks: Vec<String>, user_override: Option<&str>) -> Vec<CandidatePort> {
    let pinned = user_override.map(|path| CandidatePort::new(path, PortSource::UserOverride));
    let guesses = fallbacks
        .into_iter()
        .map(|path| CandidatePort::new(path, PortSource::FallbackGuess));

    let mut seen = HashSet::new();
    pinned
        .into_iter()
        .chain(discovered)
        .chain(guesses)
        .filter(|candidate| seen.insert(candidate.path.clone()))
        .enumerate()
        .map(|(rank, candidate)| CandidatePort { rank, ..candidate })
        .collect()
}

/// Enumeration snapshot + platform + override -> probe order.
pub fn candidate_ports(platform: Platform, devices: &[PortDescriptor], user_override: Option<&str>) -> Vec<CandidatePort> {
    let discovered = enumerate::discover(devices);
    let fallbacks = fallback_candidates(platform, !discovered.is_empty());
    prioritize(discovered, fallbacks, user_override)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn discovered(paths: &[&str]) -> Vec<CandidatePort> {
        paths
            .iter()
            .map(|path| CandidatePort::new(*path, PortSource::Discovered))
            .collect()
    }

    fn paths(candidates: &[CandidatePort]) -> Vec<&str> {
        candidates.iter().map(|c| c.path.as_str()).collect()
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let result = prioritize(
            discovered(&["/dev/ttyACM0", "/dev/ttyUSB0"]),
            vec!["/dev/ttyACM0".into(), "/dev/ttyACM1".into(), "/dev/ttyUSB0".into()],
            None,
        );

        assert_eq!(paths(&result), ["/dev/ttyACM0", "/dev/ttyUSB0", "/dev/ttyACM1"]);
        assert_eq!(result[0].source, PortSource::Discovered);
        assert_eq!(result[2].source, PortSource::FallbackGuess);
        let ranks: Vec<_> = result.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, [0, 1, 2]);
    }

    #[test]
    fn test_override_is_pinned_first_without_duplicates() {
        let result = prioritize(
            discovered(&["/dev/ttyACM0", "/dev/ttyUSB0"]),
            vec!["/dev/ttyUSB0".into()],
            Some("/dev/ttyUSB0"),
        );

        assert_eq!(paths(&result), ["/dev/ttyUSB0", "/dev/ttyACM0"]);
        assert_eq!(result[0].source, PortSource::UserOverride);
        assert_eq!(result[0].rank, 0);
    }

    #[test]
    fn test_override_not_otherwise_known() {
        let result = prioritize(Vec::new(), Vec::new(), Some("/dev/gps0"));
        assert_eq!(result, vec![CandidatePort::new("/dev/gps0", PortSource::UserOverride)]);
    }

    #[test]
    fn test_prioritization_is_deterministic() {
        let devices = vec![
            PortDescriptor::new("COM9").with_description("USB Serial Port"),
            PortDescriptor::new("COM5").with_description("u-blox GNSS receiver"),
            PortDescriptor::new("COM6").with_description("Bluetooth link"),
        ];

        let first = candidate_ports(Platform::Windows, &devices, Some("COM9"));
        for _ in 0..10 {
            assert_eq!(candidate_ports(Platform::Windows, &devices, Some("COM9")), first);
        }
        assert_eq!(paths(&first), ["COM9", "COM5"]);
    }

    #[test]
    fn test_windows_guesses_only_without_discovery() {
        let guesses = fallback_candidates(Platform::Windows, false);
        assert_eq!(guesses.len(), 18);
        assert_eq!(guesses.first().map(String::as_str), Some("COM3"));
        assert_eq!(guesses.last().map(String::as_str), Some("COM20"));

        assert!(fallback_candidates(Platform::Windows, true).is_empty());
    }

    #[test]
    fn test_glob_keeps_pattern_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("serial/by-id")).unwrap();
        for name in ["ttyUSB0", "ttyACM1", "ttyACM0", "serial/by-id/usb-u-blox_GNSS-if00"] {
            fs::write(root.join(name), b"").unwrap();
        }

        let patterns: Vec<String> = ["serial/by-id/*", "ttyACM*", "ttyUSB*", "tty.usbserial*"]
            .iter()
            .map(|p| format!("{}/{}", root.display(), p))
            .collect();
        let found = glob_in_order(&patterns);

        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(&format!("{}/", root.display())).unwrap())
            .collect();
        assert_eq!(names, ["serial/by-id/usb-u-blox_GNSS-if00", "ttyACM0", "ttyACM1", "ttyUSB0"]);
        assert_eq!(glob_in_order(&patterns), found);
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ttyACM0"), b"").unwrap();
        let patterns = vec!["[".to_string(), format!("{}/ttyACM*", dir.path().display())];
        assert_eq!(glob_in_order(&patterns).len(), 1);
    }

    #[test]
    fn test_nothing_anywhere_yields_empty_list() {
        assert!(prioritize(Vec::new(), Vec::new(), None).is_empty());
    }
}
