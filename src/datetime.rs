//! CIM datetime lexical forms (DSP0004 2.2.1).
//!
//! Both forms are exactly 25 characters wide and are disambiguated by the
//! character at offset 21: `:` marks an interval, `+`/`-` an absolute
//! timestamp with a UTC offset in minutes.
//!
//! ```text
//! yyyymmddhhmmss.mmmmmmsutc   timestamp, s = + oder -, utc = Minuten (3 Ziffern)
//! ddddddddhhmmss.mmmmmm:000   interval, dddddddd = Tage (8 Ziffern)
//! ```

use core::fmt;

use crate::{Error, Result};

/// Offset of the timestamp/interval discriminator within the 25-char form.
const DISCRIMINATOR_OFFSET: usize = 21;

/// A CIM datetime value: a point in time or a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CimDateTime {
    /// Absolute timestamp with UTC offset in minutes.
    Timestamp {
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        microsecond: u32,
        /// Signed offset from UTC in minutes (e.g. +120 for CEST).
        utc_offset: i16,
    },
    /// Duration in days/hours/minutes/seconds/microseconds.
    Interval {
        days: u32,
        hours: u8,
        minutes: u8,
        seconds: u8,
        microseconds: u32,
    },
}

impl CimDateTime {
    /// Parses the 25-character lexical form.
    pub fn parse(text: &str) -> Result<Self> {
        let bytes = text.as_bytes();
        // Fixed-offset slicing below requires one byte per character.
        if bytes.len() != 25 || !text.is_ascii() {
            return Err(Error::decode("datetime", text));
        }
        if bytes[14] != b'.' {
            return Err(Error::decode("datetime", text));
        }
        match bytes[DISCRIMINATOR_OFFSET] {
            b':' => Self::parse_interval(text),
            b'+' | b'-' => Self::parse_timestamp(text),
            _ => Err(Error::decode("datetime", text)),
        }
    }

    fn parse_timestamp(text: &str) -> Result<Self> {
        let year = digits(text, 0..4)? as u16;
        let month = digits(text, 4..6)? as u8;
        let day = digits(text, 6..8)? as u8;
        let hour = digits(text, 8..10)? as u8;
        let minute = digits(text, 10..12)? as u8;
        let second = digits(text, 12..14)? as u8;
        let microsecond = digits(text, 15..21)? as u32;
        let offset = digits(text, 22..25)? as i16;
        let utc_offset = if text.as_bytes()[DISCRIMINATOR_OFFSET] == b'-' {
            -offset
        } else {
            offset
        };
        if !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return Err(Error::decode("datetime", text));
        }
        Ok(Self::Timestamp {
            year,
            month,
            day,
            hour,
            minute,
            second,
            microsecond,
            utc_offset,
        })
    }

    fn parse_interval(text: &str) -> Result<Self> {
        // Das Suffix nach dem Doppelpunkt ist fix ":000".
        if &text[22..25] != "000" {
            return Err(Error::decode("datetime", text));
        }
        let days = digits(text, 0..8)? as u32;
        let hours = digits(text, 8..10)? as u8;
        let minutes = digits(text, 10..12)? as u8;
        let seconds = digits(text, 12..14)? as u8;
        let microseconds = digits(text, 15..21)? as u32;
        if hours > 23 || minutes > 59 || seconds > 59 {
            return Err(Error::decode("datetime", text));
        }
        Ok(Self::Interval {
            days,
            hours,
            minutes,
            seconds,
            microseconds,
        })
    }

    pub fn is_interval(&self) -> bool {
        matches!(self, Self::Interval { .. })
    }
}

/// Parses an all-digit slice of the lexical form.
fn digits(text: &str, range: core::ops::Range<usize>) -> Result<u64> {
    let slice = &text[range];
    if !slice.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::decode("datetime", text));
    }
    slice
        .parse::<u64>()
        .map_err(|_| Error::decode("datetime", text))
}

impl fmt::Display for CimDateTime {
    /// Emits the canonical 25-character form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Timestamp {
                year,
                month,
                day,
                hour,
                minute,
                second,
                microsecond,
                utc_offset,
            } => {
                let sign = if utc_offset < 0 { '-' } else { '+' };
                write!(
                    f,
                    "{year:04}{month:02}{day:02}{hour:02}{minute:02}{second:02}.{microsecond:06}{sign}{:03}",
                    utc_offset.unsigned_abs()
                )
            }
            Self::Interval {
                days,
                hours,
                minutes,
                seconds,
                microseconds,
            } => write!(
                f,
                "{days:08}{hours:02}{minutes:02}{seconds:02}.{microseconds:06}:000"
            ),
        }
    }
}
