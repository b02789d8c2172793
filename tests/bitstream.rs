//! NAL header parsing and status vocabulary tests.

use framegate::{NalHeader, NalUnitType, ReturnCode, SliceType, UnavailableReason};

// ── NAL unit header ────────────────────────────────────────────────

#[test]
fn parses_unit_type_from_first_byte() {
    let cases = [
        (0x02, NalUnitType::NonIdr),
        (0x04, NalUnitType::Idr),
        (0x32, NalUnitType::Sps),
        (0x34, NalUnitType::Pps),
        (0x36, NalUnitType::Aps),
        (0x38, NalUnitType::FillerData),
        (0x3a, NalUnitType::Sei),
        (0x14, NalUnitType::Other(9)),
    ];
    for (first, expected) in cases {
        let header = NalHeader::parse(&[first, 0x00]).expect("valid header");
        assert_eq!(header.unit_type, expected, "first byte {first:#04x}");
    }
}

#[test]
fn parses_temporal_id_and_extension_flag() {
    let header = NalHeader::parse(&[0x05, 0x81]).unwrap();
    assert_eq!(header.unit_type, NalUnitType::Idr);
    assert_eq!(header.temporal_id, 0b110);
    assert!(header.extension);

    let header = NalHeader::parse(&[0x02, 0x40, 0xff]).unwrap();
    assert_eq!(header.temporal_id, 1);
    assert!(!header.extension);
}

#[test]
fn rejects_malformed_headers() {
    assert!(NalHeader::parse(&[]).is_none());
    assert!(NalHeader::parse(&[0x02]).is_none(), "one byte is not a header");
    assert!(NalHeader::parse(&[0x82, 0x00]).is_none(), "forbidden bit set");
    assert!(NalHeader::parse(&[0x00, 0x00]).is_none(), "type_plus1 of zero");
}

#[test]
fn unit_type_raw_values_round_trip() {
    for raw in 0..=63 {
        assert_eq!(NalUnitType::from_raw(raw).as_raw(), raw);
    }
    assert!(NalUnitType::Idr.is_picture());
    assert!(NalUnitType::NonIdr.is_picture());
    assert!(!NalUnitType::Sps.is_picture());
}

#[test]
fn unit_type_display_names() {
    assert_eq!(NalUnitType::NonIdr.to_string(), "NonIDR");
    assert_eq!(NalUnitType::Idr.to_string(), "IDR");
    assert_eq!(NalUnitType::Sps.to_string(), "SPS");
    assert_eq!(NalUnitType::FillerData.to_string(), "FD");
    assert_eq!(NalUnitType::Other(40).to_string(), "Unknown(40)");
    assert_eq!(NalUnitType::default(), NalUnitType::NonIdr);
}

// ── Slice type ─────────────────────────────────────────────────────

#[test]
fn slice_type_mapping() {
    assert_eq!(SliceType::from_raw(0), SliceType::B);
    assert_eq!(SliceType::from_raw(1), SliceType::P);
    assert_eq!(SliceType::from_raw(2), SliceType::I);
    assert_eq!(SliceType::from_raw(3), SliceType::Unknown);
    assert_eq!(SliceType::from_raw(-1), SliceType::Unknown);
    assert_eq!(SliceType::Unknown.as_raw(), -1);
    assert_eq!(SliceType::I.to_string(), "I");
    assert_eq!(SliceType::default(), SliceType::Unknown);
}

// ── Return codes ───────────────────────────────────────────────────

#[test]
fn return_code_raw_values_round_trip() {
    let codes = [
        ReturnCode::NoMoreFrames,
        ReturnCode::OutputNotAvailable,
        ReturnCode::DimensionChanged,
        ReturnCode::FrameDelayed,
        ReturnCode::CrcIgnored,
        ReturnCode::Ok,
        ReturnCode::Failure,
        ReturnCode::InvalidArgument,
        ReturnCode::OutOfMemory,
        ReturnCode::ReachedMax,
        ReturnCode::Unsupported,
        ReturnCode::Unexpected,
        ReturnCode::UnsupportedColorSpace,
        ReturnCode::MalformedBitstream,
        ReturnCode::ThreadAllocation,
        ReturnCode::BadCrc,
    ];
    for code in codes {
        assert_eq!(ReturnCode::from_raw(code.as_raw()), code);
    }
    assert_eq!(ReturnCode::from_raw(12345), ReturnCode::Unknown);
}

#[test]
fn informational_codes_are_successes() {
    assert_eq!(ReturnCode::OutputNotAvailable.as_raw(), 204);
    assert!(ReturnCode::OutputNotAvailable.is_success());
    assert!(ReturnCode::NoMoreFrames.is_success());
    assert!(ReturnCode::Ok.is_success());
    assert!(ReturnCode::MalformedBitstream.is_failure());
    assert!(ReturnCode::Unknown.is_failure());
}

#[test]
fn display_includes_raw_value() {
    assert_eq!(ReturnCode::OutputNotAvailable.to_string(), "output not available (204)");
    assert_eq!(
        UnavailableReason::PullFailed(ReturnCode::FrameDelayed).to_string(),
        "pull failed: frame delayed (202)"
    );
}
