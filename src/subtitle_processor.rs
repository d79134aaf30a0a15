use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SubtitleError;
use crate::timecode::TimeCode;

// @module: Subtitle interchange format reading, writing and validation

const INLINE_PATTERNS_LEN: usize = 3;
const PATTERN_SLOTS: usize = INLINE_PATTERNS_LEN + 1;

/// Pattern slot recorded when an entry was assembled from a conformant
/// index/time/text block rather than a single inline line.
pub const BLOCK_PATTERN_SLOT: usize = INLINE_PATTERNS_LEN;

// @const: Inline header patterns for the non-conformant single-line dialect,
// most specific/common first. First match wins for a line.
static INLINE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // index, comma times, text separated by whitespace
        Regex::new(r"^(\d+)\s+(\d{2}:\d{2}:\d{2},\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2},\d{3})\s+(.+)$")
            .unwrap(),
        // looser spacing around the index and text
        Regex::new(r"^(\d+)\s*(\d{2}:\d{2}:\d{2},\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2},\d{3})\s*(.+)$")
            .unwrap(),
        // period fractional separator variant
        Regex::new(
            r"^(\d+)\s+(\d{2}:\d{2}:\d{2}\.\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}\.\d{3})\s+(.+)$",
        )
        .unwrap(),
    ]
});

// @const: Time-range line in a conformant block, either separator dialect
static BLOCK_TIME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}[,.]\d{3})$").unwrap()
});

// @const: Strict canonical time-range line used by the validator
static STRICT_TIME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}:\d{2}:\d{2},\d{3} --> \d{2}:\d{2}:\d{2},\d{3}$").unwrap()
});

/// Candidate text encodings, tried in order when decoding input bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8Bom,
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8Bom => "utf-8-sig",
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Latin1 => "latin1",
        }
    }
}

/// Decode raw subtitle bytes by trying an ordered list of encodings.
///
/// The first candidate that decodes without error wins. Output text is
/// always UTF-8 regardless of the input encoding.
pub fn decode_subtitle_bytes(bytes: &[u8]) -> Result<(String, TextEncoding), SubtitleError> {
    let candidates = [
        TextEncoding::Utf8Bom,
        TextEncoding::Utf8,
        TextEncoding::Utf16Le,
        TextEncoding::Utf16Be,
        TextEncoding::Latin1,
    ];

    for encoding in candidates {
        if let Some(text) = try_decode(bytes, encoding) {
            debug!("Decoded subtitle input as {}", encoding.name());
            return Ok((text, encoding));
        }
    }

    Err(SubtitleError::Encoding {
        tried: candidates.len(),
    })
}

fn try_decode(bytes: &[u8], encoding: TextEncoding) -> Option<String> {
    match encoding {
        TextEncoding::Utf8Bom => {
            let stripped = bytes.strip_prefix(&[0xEFu8, 0xBB, 0xBF][..])?;
            std::str::from_utf8(stripped).ok().map(str::to_string)
        }
        TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
        TextEncoding::Utf16Le => {
            let stripped = bytes.strip_prefix(&[0xFFu8, 0xFE][..])?;
            decode_utf16(stripped, u16::from_le_bytes)
        }
        TextEncoding::Utf16Be => {
            let stripped = bytes.strip_prefix(&[0xFEu8, 0xFF][..])?;
            decode_utf16(stripped, u16::from_be_bytes)
        }
        TextEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
    }
}

fn decode_utf16(bytes: &[u8], combine: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| combine([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

// @struct: Single time-coded subtitle record
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    // @field: Positive index, unique but not necessarily contiguous
    pub index: usize,

    // @field: Start time-code
    pub start: TimeCode,

    // @field: End time-code
    pub end: TimeCode,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(index: usize, start: TimeCode, end: TimeCode, text: String) -> Self {
        SubtitleEntry {
            index,
            start,
            end,
            text,
        }
    }

    /// Entry duration in fractional seconds. Negative when `end <= start`.
    pub fn duration_secs(&self) -> f64 {
        self.end.as_seconds() - self.start.as_seconds()
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", self.start, self.end)?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// A line the parser could not match against any known pattern.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    /// 1-based line number in the decoded input
    pub line_number: usize,
    /// The offending line, truncated for reporting
    pub raw_text: String,
    /// Why the line was rejected
    pub reason: String,
}

/// Summary statistics for one parse run.
#[derive(Debug, Clone, Default)]
pub struct ParseStats {
    /// Entries successfully parsed
    pub parsed: usize,
    /// Lines that matched no pattern
    pub failed: usize,
    /// Sum of entry durations in seconds
    pub total_duration_secs: f64,
    /// How many entries each pattern slot produced
    pub pattern_counts: [usize; PATTERN_SLOTS],
}

impl ParseStats {
    /// Average entry duration in seconds, zero for an empty parse.
    pub fn average_duration_secs(&self) -> f64 {
        if self.parsed == 0 {
            0.0
        } else {
            self.total_duration_secs / self.parsed as f64
        }
    }
}

/// Result of a lenient parse: entries plus the accumulated failures.
///
/// No single bad line aborts a parse; every unmatched line lands in
/// `failures` and parsing continues.
#[derive(Debug)]
pub struct ParseOutcome {
    /// Parsed entries, sorted by index
    pub entries: Vec<SubtitleEntry>,
    /// Unmatched lines with context
    pub failures: Vec<ParseFailure>,
    /// Summary statistics
    pub stats: ParseStats,
}

impl ParseOutcome {
    /// Move the entries into a track, discarding failure context.
    pub fn into_track(self, source_file: Option<PathBuf>) -> SubtitleTrack {
        SubtitleTrack {
            source_file,
            entries: self.entries,
        }
    }
}

/// Report from strict re-validation of canonical output.
#[derive(Debug, Clone, Copy)]
pub struct ValidationReport {
    /// True when at least one block round-tripped and no structure violations were seen
    pub is_valid: bool,
    /// How many blocks matched the strict canonical shape
    pub block_count: usize,
    /// Blocks whose text is empty after trimming
    pub empty_text_blocks: usize,
}

/// Ordered collection of subtitle entries with an optional source path.
#[derive(Debug, Clone, Default)]
pub struct SubtitleTrack {
    /// Where the track came from, if it was read from disk
    pub source_file: Option<PathBuf>,

    /// Entries, in index order after finalization
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleTrack {
    pub fn new() -> Self {
        SubtitleTrack::default()
    }

    pub fn from_entries(entries: Vec<SubtitleEntry>) -> Self {
        SubtitleTrack {
            source_file: None,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse raw bytes: decode with the candidate encodings, then parse leniently.
    pub fn parse_bytes(bytes: &[u8]) -> Result<(ParseOutcome, TextEncoding), SubtitleError> {
        let (content, encoding) = decode_subtitle_bytes(bytes)?;
        Ok((Self::parse_lenient(&content), encoding))
    }

    /// Lenient line-by-line parse of possibly non-conformant input.
    ///
    /// Parsing is line-based rather than block-based because non-conformant
    /// generators use irregular spacing around the arrow and drop blank-line
    /// separators. Each line is matched against the inline single-line
    /// patterns first; conformant index/time/text blocks are assembled from
    /// consecutive lines, taking exactly one text line per header.
    pub fn parse_lenient(content: &str) -> ParseOutcome {
        let mut entries = Vec::new();
        let mut failures: Vec<ParseFailure> = Vec::new();
        let mut stats = ParseStats::default();

        // Block-assembly state: index line seen, then time line seen
        let mut pending_index: Option<usize> = None;
        let mut pending_times: Option<(TimeCode, TimeCode)> = None;
        let mut pending_line: usize = 0;

        let fail = |failures: &mut Vec<ParseFailure>, line_number: usize, raw: &str, reason: &str| {
            let mut raw_text: String = raw.chars().take(100).collect();
            if raw.chars().count() > 100 {
                raw_text.push('…');
            }
            if failures.len() < 10 {
                warn!("Line {} did not match any pattern: {}", line_number, raw_text);
            }
            failures.push(ParseFailure {
                line_number,
                raw_text,
                reason: reason.to_string(),
            });
        };

        for (line_idx, line) in content.lines().enumerate() {
            let line_number = line_idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                // A separator; a dangling header without text becomes a failure
                if pending_index.is_some() {
                    fail(
                        &mut failures,
                        pending_line,
                        trimmed,
                        "header without a text line",
                    );
                }
                pending_index = None;
                pending_times = None;
                continue;
            }

            // Inline single-line dialect, first match wins
            if let Some((entry, pattern_idx)) = Self::match_inline(trimmed) {
                if pending_index.is_some() {
                    fail(
                        &mut failures,
                        pending_line,
                        trimmed,
                        "header without a text line",
                    );
                    pending_index = None;
                    pending_times = None;
                }
                Self::check_ordering(&entry, line_number);
                stats.pattern_counts[pattern_idx] += 1;
                stats.total_duration_secs += entry.duration_secs();
                entries.push(entry);
                if entries.len() % 50 == 0 {
                    debug!("{} entries parsed so far", entries.len());
                }
                continue;
            }

            // Conformant block assembly: index, then times, then one text line
            match (pending_index, pending_times) {
                (None, _) => {
                    if let Ok(index) = trimmed.parse::<usize>() {
                        pending_index = Some(index);
                        pending_times = None;
                        pending_line = line_number;
                    } else {
                        fail(&mut failures, line_number, trimmed, "no pattern matched");
                    }
                }
                (Some(_), None) => {
                    if let Some(caps) = BLOCK_TIME_LINE.captures(trimmed) {
                        let start = TimeCode::parse(&caps[1]);
                        let end = TimeCode::parse(&caps[2]);
                        match (start, end) {
                            (Ok(start), Ok(end)) => {
                                pending_times = Some((start, end));
                            }
                            _ => {
                                fail(&mut failures, line_number, trimmed, "unparsable time-code");
                                pending_index = None;
                            }
                        }
                    } else {
                        fail(&mut failures, pending_line, trimmed, "index without time line");
                        pending_index = None;
                        // Retry the current line as a fresh index
                        if let Ok(index) = trimmed.parse::<usize>() {
                            pending_index = Some(index);
                            pending_line = line_number;
                        } else {
                            fail(&mut failures, line_number, trimmed, "no pattern matched");
                        }
                    }
                }
                (Some(index), Some((start, end))) => {
                    // Exactly one text line completes the block in this dialect
                    let entry = SubtitleEntry::new(index, start, end, trimmed.to_string());
                    Self::check_ordering(&entry, line_number);
                    stats.pattern_counts[BLOCK_PATTERN_SLOT] += 1;
                    stats.total_duration_secs += entry.duration_secs();
                    entries.push(entry);
                    pending_index = None;
                    pending_times = None;
                }
            }
        }

        if pending_index.is_some() {
            fail(&mut failures, pending_line, "", "header without a text line");
        }

        // Entries are returned in index order for writing
        entries.sort_by_key(|entry| entry.index);

        stats.parsed = entries.len();
        stats.failed = failures.len();

        debug!(
            "Parse finished: {} entries, {} failed lines, {:.1}s total duration",
            stats.parsed, stats.failed, stats.total_duration_secs
        );

        ParseOutcome {
            entries,
            failures,
            stats,
        }
    }

    fn match_inline(line: &str) -> Option<(SubtitleEntry, usize)> {
        for (pattern_idx, pattern) in INLINE_PATTERNS.iter().enumerate() {
            let Some(caps) = pattern.captures(line) else {
                continue;
            };
            let index: usize = caps[1].parse().ok()?;
            // Normalization happens inside parse; formatting is canonical
            let start = TimeCode::parse(&caps[2]).ok()?;
            let end = TimeCode::parse(&caps[3]).ok()?;
            let text = caps[4].trim().to_string();
            return Some((SubtitleEntry::new(index, start, end, text), pattern_idx));
        }
        None
    }

    // Semantic boundary check: warn but keep the entry, ordering correctness
    // is left to the caller
    fn check_ordering(entry: &SubtitleEntry, line_number: usize) {
        if entry.end <= entry.start {
            warn!(
                "Line {}: end time {} is not after start time {} (entry {} kept)",
                line_number, entry.end, entry.start, entry.index
            );
        }
    }

    /// Finalize the track: sort by start time and renumber sequentially.
    ///
    /// After this, entries are strictly increasing in start and in index.
    pub fn finalize(&mut self) {
        self.entries.sort_by_key(|entry| entry.start);
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.index = i + 1;
        }
    }

    /// Serialize to the canonical interchange form.
    ///
    /// One block per entry in index order, blocks joined by a blank line,
    /// comma time separator, single trailing newline.
    pub fn write_to_string(&self) -> String {
        let blocks: Vec<String> = self
            .entries
            .iter()
            .map(|entry| format!("{}\n{} --> {}\n{}", entry.index, entry.start, entry.end, entry.text))
            .collect();
        let mut content = blocks.join("\n\n");
        content.push('\n');
        content
    }

    /// Write the canonical form to a file, creating parent directories.
    /// Output is always UTF-8.
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;
        file.write_all(self.write_to_string().as_bytes())
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;

        Ok(())
    }

    /// Strictly re-parse canonical output and count round-tripped blocks.
    ///
    /// A block is an index line, a canonical time line, and body text up to
    /// the next header or end of input. Blocks with empty trimmed text are
    /// counted separately. A `block_count` that differs from the entry count
    /// of the track that produced the text indicates a writer/parser
    /// inconsistency, not bad input, and callers must surface it distinctly.
    pub fn validate(content: &str) -> ValidationReport {
        let lines: Vec<&str> = content.lines().collect();
        let mut block_count = 0;
        let mut empty_text_blocks = 0;
        let mut structure_violation = false;

        let is_header = |i: usize| -> bool {
            i + 1 < lines.len()
                && !lines[i].trim().is_empty()
                && lines[i].trim().chars().all(|c| c.is_ascii_digit())
                && STRICT_TIME_LINE.is_match(lines[i + 1].trim())
        };

        let mut i = 0;
        while i < lines.len() {
            if lines[i].trim().is_empty() {
                i += 1;
                continue;
            }
            if is_header(i) {
                i += 2;
                let mut body = String::new();
                while i < lines.len() && !lines[i].trim().is_empty() && !is_header(i) {
                    if !body.is_empty() {
                        body.push('\n');
                    }
                    body.push_str(lines[i]);
                    i += 1;
                }
                block_count += 1;
                if body.trim().is_empty() {
                    empty_text_blocks += 1;
                }
            } else {
                structure_violation = true;
                i += 1;
            }
        }

        ValidationReport {
            is_valid: block_count > 0 && !structure_violation,
            block_count,
            empty_text_blocks,
        }
    }

    /// Entry text only, timestamps and indices stripped, one line per entry.
    pub fn plain_text(&self) -> String {
        self.entries
            .iter()
            .map(|entry| entry.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for SubtitleTrack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Track")?;
        if let Some(source) = &self.source_file {
            writeln!(f, "Source: {}", source.display())?;
        }
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
