/*!
 * Tests for subtitle parsing, writing and validation
 */

use std::fmt::Write;
use anyhow::Result;
use whispersub::subtitle_processor::{
    decode_subtitle_bytes, SubtitleEntry, SubtitleTrack, TextEncoding, BLOCK_PATTERN_SLOT,
};
use whispersub::timecode::TimeCode;
use crate::common;

/// Test subtitle entry display formatting
#[test]
fn test_subtitle_entry_display_withValidEntry_shouldFormatCorrectly() {
    let entry = SubtitleEntry::new(
        1,
        TimeCode::from_millis(5000),
        TimeCode::from_millis(10000),
        "Test subtitle".to_string(),
    );
    let mut output = String::new();
    write!(output, "{}", entry).unwrap();

    assert!(output.contains("1"));
    assert!(output.contains("00:00:05,000"));
    assert!(output.contains("00:00:10,000"));
    assert!(output.contains("Test subtitle"));
}

/// Test a minimal conformant block parses and round-trips through validation
#[test]
fn test_parse_withSingleConformantBlock_shouldRoundTripValidation() {
    let outcome = SubtitleTrack::parse_lenient("1\n00:00:01,000 --> 00:00:02,000\nHello\n");
    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.entries[0].text, "Hello");

    let track = outcome.into_track(None);
    let report = SubtitleTrack::validate(&track.write_to_string());
    assert!(report.is_valid);
    assert_eq!(report.block_count, 1);
}

/// Test lenient parsing of a mix of conformant blocks, dialect lines and noise
#[test]
fn test_parse_lenient_withMixedDialects_shouldParseAllEntries() {
    let content = "\
1
00:00:01,000 --> 00:00:04,000
A conformant block.

2 00:00:05,000 --> 00:00:08,000 An inline dialect line
3 00:00:09.000 --> 00:00:12.000 A period-separated inline line
this line matches nothing
";

    let outcome = SubtitleTrack::parse_lenient(content);
    assert_eq!(outcome.entries.len(), 3);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].reason, "no pattern matched");
    assert_eq!(outcome.stats.parsed, 3);
    assert_eq!(outcome.stats.failed, 1);
    assert_eq!(outcome.stats.pattern_counts[BLOCK_PATTERN_SLOT], 1);

    // Entries come back sorted by index
    let indices: Vec<usize> = outcome.entries.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(outcome.entries[0].text, "A conformant block.");
    assert_eq!(outcome.entries[2].text, "A period-separated inline line");
}

/// Test that parse failures record the original line number
#[test]
fn test_parse_lenient_withUnmatchedLine_shouldRecordLineNumber() {
    let content = "garbage on line one\n1 00:00:01,000 --> 00:00:02,000 ok\n";
    let outcome = SubtitleTrack::parse_lenient(content);
    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].line_number, 1);
    assert!(outcome.failures[0].raw_text.contains("garbage"));
}

/// Test that a dangling header without a text line is a failure, not a panic
#[test]
fn test_parse_lenient_withDanglingHeader_shouldRecordFailure() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\n";
    let outcome = SubtitleTrack::parse_lenient(content);
    assert!(outcome.entries.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].reason, "header without a text line");
}

/// Test that entries with end <= start are kept, not dropped
#[test]
fn test_parse_lenient_withReversedTimes_shouldKeepEntry() {
    let content = "1 00:00:05,000 --> 00:00:02,000 Reversed but kept\n";
    let outcome = SubtitleTrack::parse_lenient(content);
    assert_eq!(outcome.entries.len(), 1);
    assert!(outcome.entries[0].duration_secs() < 0.0);
}

/// Test canonical output normalizes period separators to commas
#[test]
fn test_write_withPeriodSeparatedInput_shouldWriteCommaForm() {
    let content = "1 00:00:01.000 --> 00:00:02.500 Period input\n";
    let outcome = SubtitleTrack::parse_lenient(content);
    let track = outcome.into_track(None);
    let written = track.write_to_string();
    assert!(written.contains("00:00:01,000 --> 00:00:02,500"));
    assert!(!written.contains('.'));
}

/// Test the round-trip contract: parse(write(track)) preserves every entry
#[test]
fn test_roundtrip_withFinalizedTrack_shouldPreserveEntries() {
    let mut track = SubtitleTrack::from_entries(vec![
        SubtitleEntry::new(
            7,
            TimeCode::from_millis(5_000),
            TimeCode::from_millis(8_000),
            "Second in time".to_string(),
        ),
        SubtitleEntry::new(
            3,
            TimeCode::from_millis(1_000),
            TimeCode::from_millis(4_000),
            "First in time".to_string(),
        ),
    ]);
    track.finalize();

    let written = track.write_to_string();
    let reparsed = SubtitleTrack::parse_lenient(&written);
    assert_eq!(reparsed.failures.len(), 0);
    assert_eq!(reparsed.entries.len(), track.entries.len());
    for (original, reparsed) in track.entries.iter().zip(reparsed.entries.iter()) {
        assert_eq!(original.index, reparsed.index);
        assert_eq!(original.start, reparsed.start);
        assert_eq!(original.end, reparsed.end);
        assert_eq!(original.text, reparsed.text);
    }
}

/// Test finalize sorts by start time and renumbers from 1
#[test]
fn test_finalize_withUnorderedEntries_shouldSortAndRenumber() {
    let mut track = SubtitleTrack::from_entries(vec![
        SubtitleEntry::new(9, TimeCode::from_millis(9_000), TimeCode::from_millis(9_500), "c".into()),
        SubtitleEntry::new(2, TimeCode::from_millis(1_000), TimeCode::from_millis(1_500), "a".into()),
        SubtitleEntry::new(5, TimeCode::from_millis(5_000), TimeCode::from_millis(5_500), "b".into()),
    ]);
    track.finalize();

    let order: Vec<(usize, i64)> = track
        .entries
        .iter()
        .map(|e| (e.index, e.start.as_millis()))
        .collect();
    assert_eq!(order, vec![(1, 1_000), (2, 5_000), (3, 9_000)]);
}

/// Test strict validation counts blocks in canonical output
#[test]
fn test_validate_withCanonicalOutput_shouldCountBlocks() {
    let content = "\
1
00:00:01,000 --> 00:00:04,000
First.

2
00:00:05,000 --> 00:00:09,000
Second.
";
    let report = SubtitleTrack::validate(content);
    assert!(report.is_valid);
    assert_eq!(report.block_count, 2);
    assert_eq!(report.empty_text_blocks, 0);
}

/// Test strict validation rejects the period-separated dialect
#[test]
fn test_validate_withPeriodSeparator_shouldNotCountBlock() {
    let content = "1\n00:00:01.000 --> 00:00:04.000\nNot canonical.\n";
    let report = SubtitleTrack::validate(content);
    assert_eq!(report.block_count, 0);
    assert!(!report.is_valid);
}

/// Test strict validation flags blocks with empty text
#[test]
fn test_validate_withEmptyTextBlock_shouldCountIt() {
    let content = "\
1
00:00:01,000 --> 00:00:04,000


2
00:00:05,000 --> 00:00:09,000
Real text.
";
    let report = SubtitleTrack::validate(content);
    assert_eq!(report.block_count, 2);
    assert_eq!(report.empty_text_blocks, 1);
}

/// Test decoding picks UTF-8 with BOM and strips it
#[test]
fn test_decode_withUtf8Bom_shouldStripBom() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice("1 00:00:01,000 --> 00:00:02,000 bom\n".as_bytes());
    let (text, encoding) = decode_subtitle_bytes(&bytes).unwrap();
    assert_eq!(encoding, TextEncoding::Utf8Bom);
    assert!(text.starts_with('1'));
}

/// Test decoding falls through to UTF-16LE for BOM-prefixed input
#[test]
fn test_decode_withUtf16LeBom_shouldDecode() {
    let source = "1 00:00:01,000 --> 00:00:02,000 wide\n";
    let mut bytes = vec![0xFF, 0xFE];
    for unit in source.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let (text, encoding) = decode_subtitle_bytes(&bytes).unwrap();
    assert_eq!(encoding, TextEncoding::Utf16Le);
    assert_eq!(text, source);
}

/// Test decoding of bytes that are not valid UTF-8
#[test]
fn test_decode_withNonUtf8Bytes_shouldFallBackToLatin1() {
    let bytes = vec![b'c', b'a', b'f', 0xE9]; // "café" in latin1
    let (text, encoding) = decode_subtitle_bytes(&bytes).unwrap();
    assert_eq!(encoding, TextEncoding::Latin1);
    assert_eq!(text, "café");
}

/// Test plain text extraction strips indices and timestamps
#[test]
fn test_plain_text_withEntries_shouldReturnTextOnly() {
    let track = SubtitleTrack::from_entries(vec![
        SubtitleEntry::new(1, TimeCode::from_millis(0), TimeCode::from_millis(1_000), "Hello".into()),
        SubtitleEntry::new(2, TimeCode::from_millis(1_000), TimeCode::from_millis(2_000), "world".into()),
    ]);
    assert_eq!(track.plain_text(), "Hello\nworld");
}

/// Test writing to disk round-trips through a real file
#[test]
fn test_write_to_srt_withRealFile_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_dialect_subtitle(&temp_dir.path().to_path_buf(), "dialect.srt")?;

    let bytes = std::fs::read(&input)?;
    let (outcome, _) = SubtitleTrack::parse_bytes(&bytes)?;
    assert_eq!(outcome.entries.len(), 2);

    let mut track = outcome.into_track(Some(input));
    track.finalize();

    let output = temp_dir.path().join("nested").join("out.srt");
    track.write_to_srt(&output)?;

    let written = std::fs::read_to_string(&output)?;
    let report = SubtitleTrack::validate(&written);
    assert!(report.is_valid);
    assert_eq!(report.block_count, 2);
    Ok(())
}
