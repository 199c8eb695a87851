//! Attribute Channel integration tests
//!
//! Every built-in attribute is exercised against a sandboxed system root:
//! in-domain writes land in the backing file in the attribute's wire format,
//! out-of-domain writes leave the file untouched.

use device_parts::models::{self, Attribute, Encoding};
use device_parts::AttributeChannel;
use proptest::prelude::*;
use std::path::Path;

fn sandbox(root: &Path, attribute: &Attribute, initial: &str) -> AttributeChannel {
    let channel = AttributeChannel::new(root.to_path_buf());
    let path = channel.resolve(attribute);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, initial).unwrap();
    channel
}

fn bounds(attribute: &Attribute) -> (i64, i64) {
    match attribute.domain {
        models::Domain::Range { min, max } => (min, max),
        models::Domain::Pattern(_) => panic!("range attribute expected"),
    }
}

#[test]
fn test_mic_gain_rejects_150_and_accepts_60() {
    let dir = tempfile::TempDir::new().unwrap();
    let attr = models::microphone_gain();
    let channel = sandbox(dir.path(), &attr, "0");

    assert!(!channel.write(&attr, 150i64));
    assert_eq!(std::fs::read_to_string(channel.resolve(&attr)).unwrap(), "0");

    assert!(channel.write(&attr, 60i64));
    assert_eq!(std::fs::read_to_string(channel.resolve(&attr)).unwrap(), "60");
}

#[test]
fn test_headphone_gain_written_for_both_channels() {
    let dir = tempfile::TempDir::new().unwrap();
    let attr = models::headphone_gain();
    assert_eq!(attr.encoding, Encoding::Symmetric);
    let channel = sandbox(dir.path(), &attr, "0 0");

    assert!(channel.write(&attr, -4i64));
    assert_eq!(channel.read(&attr).unwrap(), "-4 -4");
}

#[test]
fn test_unsupported_hardware_reports_false() {
    let dir = tempfile::TempDir::new().unwrap();
    let channel = AttributeChannel::new(dir.path().to_path_buf());
    for attr in [
        models::vibrator_strength(),
        models::headphone_gain(),
        models::microphone_gain(),
        models::earpiece_gain(),
    ] {
        assert!(!channel.is_supported(&attr));
        assert!(!channel.write(&attr, 1i64));
    }
}

proptest! {
    #[test]
    fn prop_in_domain_writes_read_back(value in 0i64..=100) {
        let dir = tempfile::TempDir::new().unwrap();
        let attr = models::microphone_gain();
        let channel = sandbox(dir.path(), &attr, "0");

        prop_assert!(channel.write(&attr, value));
        prop_assert_eq!(channel.read(&attr).unwrap(), attr.encode(&value.into()));
    }

    #[test]
    fn prop_out_of_domain_writes_leave_file(
        value in prop_oneof![i64::MIN..-10i64, 21i64..i64::MAX]
    ) {
        let dir = tempfile::TempDir::new().unwrap();
        let attr = models::earpiece_gain();
        let (min, max) = bounds(&attr);
        prop_assume!(value < min || value > max);
        let channel = sandbox(dir.path(), &attr, "3");

        prop_assert!(!channel.write(&attr, value));
        prop_assert_eq!(channel.read(&attr).unwrap(), "3");
    }
}
