use std::fmt;

use crate::errors::TimeCodeError;

// @module: Time-code parsing, normalization and formatting

/// A subtitle time-code: a signed millisecond offset from track start.
///
/// Two textual dialects exist in the wild (`HH:MM:SS,mmm` and
/// `HH:MM:SS.mmm`); both parse, and the canonical written form always uses
/// the comma separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeCode {
    millis: i64,
}

impl TimeCode {
    /// Create a time-code from a millisecond offset.
    pub fn from_millis(millis: i64) -> Self {
        TimeCode { millis }
    }

    /// Create a time-code from fractional seconds, rounded to milliseconds.
    pub fn from_seconds(seconds: f64) -> Self {
        TimeCode {
            millis: (seconds * 1000.0).round() as i64,
        }
    }

    /// Millisecond offset from track start.
    pub fn as_millis(&self) -> i64 {
        self.millis
    }

    /// Offset as fractional seconds: `h*3600 + m*60 + s + ms/1000`.
    pub fn as_seconds(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    /// True for offsets valid in a finalized entry.
    pub fn is_non_negative(&self) -> bool {
        self.millis >= 0
    }

    /// Parse `HH:MM:SS,mmm` or `HH:MM:SS.mmm` without range checks.
    ///
    /// Any digit pattern matching the shape is accepted; semantic errors
    /// (e.g. minutes >= 60) are left to downstream ordering checks. Use
    /// [`TimeCode::parse_strict`] when range validation is wanted.
    pub fn parse(text: &str) -> Result<Self, TimeCodeError> {
        let (h, m, s, ms) = Self::split_components(text)?;
        Ok(TimeCode {
            millis: ((h * 3600 + m * 60 + s) * 1000 + ms) as i64,
        })
    }

    /// Parse with range validation on minutes, seconds and milliseconds.
    pub fn parse_strict(text: &str) -> Result<Self, TimeCodeError> {
        let (h, m, s, ms) = Self::split_components(text)?;
        if m >= 60 {
            return Err(TimeCodeError::OutOfRange {
                text: text.to_string(),
                component: "minutes",
            });
        }
        if s >= 60 {
            return Err(TimeCodeError::OutOfRange {
                text: text.to_string(),
                component: "seconds",
            });
        }
        if ms >= 1000 {
            return Err(TimeCodeError::OutOfRange {
                text: text.to_string(),
                component: "milliseconds",
            });
        }
        Ok(TimeCode {
            millis: ((h * 3600 + m * 60 + s) * 1000 + ms) as i64,
        })
    }

    /// Rewrite the fractional separator to the canonical comma form.
    ///
    /// Digits are never altered, and normalization is idempotent.
    pub fn normalize(text: &str) -> String {
        text.replace('.', ",")
    }

    // Split HH:MM:SS[,.]mmm into numeric components, shape check only
    fn split_components(text: &str) -> Result<(u64, u64, u64, u64), TimeCodeError> {
        let parts: Vec<&str> = text.trim().split(&[':', ',', '.'][..]).collect();
        if parts.len() != 4 {
            return Err(TimeCodeError::Format(text.to_string()));
        }
        if parts[0].len() < 2 || parts[1].len() != 2 || parts[2].len() != 2 || parts[3].len() != 3 {
            return Err(TimeCodeError::Format(text.to_string()));
        }
        let mut values = [0u64; 4];
        for (i, part) in parts.iter().enumerate() {
            values[i] = part
                .parse()
                .map_err(|_| TimeCodeError::Format(text.to_string()))?;
        }
        Ok((values[0], values[1], values[2], values[3]))
    }
}

impl fmt::Display for TimeCode {
    /// Canonical form: zero-padded, comma separator, exactly 3 fractional digits.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Negative offsets only occur transiently before finalization
        let ms = self.millis.unsigned_abs();
        let sign = if self.millis < 0 { "-" } else { "" };
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;
        write!(
            f,
            "{}{:02}:{:02}:{:02},{:03}",
            sign, hours, minutes, seconds, millis
        )
    }
}
