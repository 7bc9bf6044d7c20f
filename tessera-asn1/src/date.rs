use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Years from this one on are written as GeneralizedTime.
pub const GENERALIZED_TIME_CUTOFF: i32 = 2050;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("{kind} `{text}` is malformed: {reason}")]
    Malformed {
        kind: TimeKind,
        text: String,
        reason: &'static str,
    },

    #[error("{kind} `{text}` is not a valid calendar date")]
    OutOfRange { kind: TimeKind, text: String },

    /// UTCTime only covers 1950 to 2049
    #[error("year {year} can't be written as UTCTime")]
    UtcTimeYear { year: i32 },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub enum TimeKind {
    UtcTime,
    GeneralizedTime,
}

impl TimeKind {
    /// UTCTime before 2050, GeneralizedTime from then on.
    pub fn for_year(year: i32) -> Self {
        if year < GENERALIZED_TIME_CUTOFF {
            TimeKind::UtcTime
        } else {
            TimeKind::GeneralizedTime
        }
    }
}

impl fmt::Display for TimeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TimeKind::UtcTime => f.write_str("UTCTime"),
            TimeKind::GeneralizedTime => f.write_str("GeneralizedTime"),
        }
    }
}

/// A point in time read from, or written to, UTCTime and GeneralizedTime.
///
/// Equality and ordering compare instants, so `...Z` and the same instant expressed
/// with a numeric offset are equal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Asn1Time(OffsetDateTime);

impl Asn1Time {
    pub fn new(datetime: OffsetDateTime) -> Self {
        Self(datetime)
    }

    /// Builds a UTC time, `None` when the fields don't form a valid date.
    pub fn from_ymd_hms(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<Self> {
        let date = Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()?;
        let time = Time::from_hms(hour, minute, second).ok()?;
        Some(Self(PrimitiveDateTime::new(date, time).assume_utc()))
    }

    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn datetime(&self) -> OffsetDateTime {
        self.0
    }

    pub fn utc(&self) -> OffsetDateTime {
        self.0.to_offset(UtcOffset::UTC)
    }

    /// Calendar year, in UTC.
    pub fn year(&self) -> i32 {
        self.utc().year()
    }

    /// Encoding picked for this instant by the 2050 rule.
    pub fn kind(&self) -> TimeKind {
        TimeKind::for_year(self.year())
    }

    /// Parses `YYMMDDhhmm[ss](Z|+hhmm|-hhmm)`.
    pub fn decode_utc_time(content: &[u8]) -> Result<Self, TimeError> {
        let text = String::from_utf8_lossy(content).into_owned();
        let malformed = |reason| TimeError::Malformed {
            kind: TimeKind::UtcTime,
            text: text.clone(),
            reason,
        };

        let (body, offset) = split_zone(content).ok_or_else(|| malformed("missing or invalid zone"))?;
        let body = match body.len() {
            12 => body.to_vec(),
            // seconds are optional, normalise to :00
            10 => [body, b"00"].concat(),
            _ => return Err(malformed("expected 10 or 12 digits before the zone")),
        };
        if !body.iter().all(u8::is_ascii_digit) {
            return Err(malformed("non-digit character"));
        }

        let yy = i32::from(body.read_pair(0));
        let year = if yy >= 50 { 1900 + yy } else { 2000 + yy };
        let fields = Fields {
            year,
            month: body.read_pair(2),
            day: body.read_pair(4),
            hour: body.read_pair(6),
            minute: body.read_pair(8),
            second: body.read_pair(10),
            nanosecond: 0,
            offset,
        };

        fields.build().map(Self).ok_or(TimeError::OutOfRange {
            kind: TimeKind::UtcTime,
            text,
        })
    }

    /// Parses `YYYYMMDDhhmmss[.f+][Z|+hhmm|-hhmm]`; a missing zone is read as UTC.
    pub fn decode_generalized_time(content: &[u8]) -> Result<Self, TimeError> {
        let text = String::from_utf8_lossy(content).into_owned();
        let malformed = |reason| TimeError::Malformed {
            kind: TimeKind::GeneralizedTime,
            text: text.clone(),
            reason,
        };

        let (body, offset) = match split_zone(content) {
            Some(parts) => parts,
            None if content.last().is_some_and(u8::is_ascii_digit) => (content, (0, 0)),
            None => return Err(malformed("invalid zone")),
        };
        if body.len() < 14 || !body[..14].iter().all(u8::is_ascii_digit) {
            return Err(malformed("expected 14 leading digits"));
        }

        let nanosecond = match &body[14..] {
            [] => 0,
            [b'.' | b',', fraction @ ..] if !fraction.is_empty() && fraction.iter().all(u8::is_ascii_digit) => {
                // nanosecond precision, extra digits are dropped
                let mut nanos = 0u32;
                for i in 0..9 {
                    nanos = nanos * 10 + fraction.get(i).map_or(0, |d| u32::from(d - b'0'));
                }
                nanos
            }
            _ => return Err(malformed("invalid fractional seconds")),
        };

        let fields = Fields {
            year: i32::from(body.read_pair(0)) * 100 + i32::from(body.read_pair(2)),
            month: body.read_pair(4),
            day: body.read_pair(6),
            hour: body.read_pair(8),
            minute: body.read_pair(10),
            second: body.read_pair(12),
            nanosecond,
            offset,
        };

        fields.build().map(Self).ok_or(TimeError::OutOfRange {
            kind: TimeKind::GeneralizedTime,
            text,
        })
    }

    /// `YYMMDDhhmmssZ`, for years 1950 to 2049.
    pub fn encode_utc_time(&self) -> Result<Vec<u8>, TimeError> {
        let utc = self.utc();
        let year = utc.year();
        if !(1950..GENERALIZED_TIME_CUTOFF).contains(&year) {
            return Err(TimeError::UtcTimeYear { year });
        }

        let mut encoded = format!("{:02}", year % 100).into_bytes();
        push_clock(&mut encoded, utc);
        Ok(encoded)
    }

    /// `YYYYMMDDhhmmssZ`, without fractional seconds.
    pub fn encode_generalized_time(&self) -> Vec<u8> {
        let utc = self.utc();
        let mut encoded = format!("{:04}", utc.year()).into_bytes();
        push_clock(&mut encoded, utc);
        encoded
    }

    /// Encodes following the 2050 rule.
    pub fn encode(&self) -> (TimeKind, Vec<u8>) {
        match self.kind() {
            TimeKind::UtcTime => match self.encode_utc_time() {
                Ok(encoded) => (TimeKind::UtcTime, encoded),
                // years before 1950 can't be UTCTime either
                Err(_) => (TimeKind::GeneralizedTime, self.encode_generalized_time()),
            },
            TimeKind::GeneralizedTime => (TimeKind::GeneralizedTime, self.encode_generalized_time()),
        }
    }
}

impl From<OffsetDateTime> for Asn1Time {
    fn from(datetime: OffsetDateTime) -> Self {
        Self(datetime)
    }
}

impl From<Asn1Time> for OffsetDateTime {
    fn from(time: Asn1Time) -> Self {
        time.0
    }
}

impl fmt::Display for Asn1Time {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let utc = self.utc();
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
            utc.year(),
            u8::from(utc.month()),
            utc.day(),
            utc.hour(),
            utc.minute(),
            utc.second()
        )
    }
}

impl Serialize for Asn1Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct Fields {
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    nanosecond: u32,
    offset: (i8, i8),
}

impl Fields {
    fn build(self) -> Option<OffsetDateTime> {
        let date = Date::from_calendar_date(self.year, Month::try_from(self.month).ok()?, self.day).ok()?;
        let time = Time::from_hms_nano(self.hour, self.minute, self.second, self.nanosecond).ok()?;
        let offset = UtcOffset::from_hms(self.offset.0, self.offset.1, 0).ok()?;
        Some(PrimitiveDateTime::new(date, time).assume_offset(offset))
    }
}

trait DigitReader {
    fn read_pair(&self, idx: usize) -> u8;
}

impl DigitReader for [u8] {
    #[inline]
    fn read_pair(&self, idx: usize) -> u8 {
        (self[idx] & 0x0F) * 10 + (self[idx + 1] & 0x0F)
    }
}

/// Splits off a trailing `Z` or `±hhmm`; `Z` is the `+0000` offset.
fn split_zone(content: &[u8]) -> Option<(&[u8], (i8, i8))> {
    if let Some(body) = content.strip_suffix(b"Z") {
        return Some((body, (0, 0)));
    }

    let split = content.len().checked_sub(5)?;
    let (body, zone) = content.split_at(split);
    let sign = match zone[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    if !zone[1..].iter().all(u8::is_ascii_digit) {
        return None;
    }

    let hours = zone.read_pair(1);
    let minutes = zone.read_pair(3);
    if hours > 23 || minutes > 59 {
        return None;
    }

    Some((body, (sign * hours as i8, sign * minutes as i8)))
}

fn push_clock(encoded: &mut Vec<u8>, utc: OffsetDateTime) {
    encoded.extend_from_slice(
        format!(
            "{:02}{:02}{:02}{:02}{:02}Z",
            u8::from(utc.month()),
            utc.day(),
            utc.hour(),
            utc.minute(),
            utc.second()
        )
        .as_bytes(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(b"500101000000Z", 1950)]
    #[case(b"490101000000Z", 2049)]
    #[case(b"991231235959Z", 1999)]
    #[case(b"000101000000Z", 2000)]
    fn utc_time_pivot(#[case] content: &[u8], #[case] year: i32) {
        assert_eq!(Asn1Time::decode_utc_time(content).unwrap().year(), year);
    }

    #[test]
    fn utc_time_without_seconds() {
        let time = Asn1Time::decode_utc_time(b"2406151230Z").unwrap();
        assert_eq!(time, Asn1Time::from_ymd_hms(2024, 6, 15, 12, 30, 0).unwrap());
    }

    #[test]
    fn numeric_offsets_are_applied() {
        let time = Asn1Time::decode_utc_time(b"240615123000+0200").unwrap();
        assert_eq!(time, Asn1Time::from_ymd_hms(2024, 6, 15, 10, 30, 0).unwrap());

        let time = Asn1Time::decode_generalized_time(b"20240615123000-0130").unwrap();
        assert_eq!(time.to_string(), "2024-06-15 14:00:00 UTC");
    }

    #[test]
    fn generalized_time_fraction() {
        let time = Asn1Time::decode_generalized_time(b"20550101000000.25Z").unwrap();
        assert_eq!(time.datetime().nanosecond(), 250_000_000);
        assert_eq!(time.year(), 2055);
        // fractions are never written back
        assert_eq!(time.encode_generalized_time(), b"20550101000000Z");
    }

    #[rstest]
    #[case(2049, TimeKind::UtcTime, &b"491231235959Z"[..])]
    #[case(2050, TimeKind::GeneralizedTime, &b"20500101000000Z"[..])]
    #[case(1949, TimeKind::GeneralizedTime, &b"19491231235959Z"[..])]
    fn cutoff(#[case] year: i32, #[case] kind: TimeKind, #[case] expected: &[u8]) {
        let time = if year == 2050 {
            Asn1Time::from_ymd_hms(year, 1, 1, 0, 0, 0)
        } else {
            Asn1Time::from_ymd_hms(year, 12, 31, 23, 59, 59)
        }
        .unwrap();
        assert_eq!(time.encode(), (kind, expected.to_vec()));
    }

    #[test]
    fn utc_time_year_range_is_enforced() {
        let time = Asn1Time::from_ymd_hms(2050, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(time.encode_utc_time(), Err(TimeError::UtcTimeYear { year: 2050 }));
    }

    #[rstest]
    #[case(&b"2406151230"[..])]
    #[case(&b"24061512Z"[..])]
    #[case(&b"24AB15123000Z"[..])]
    #[case(&b"241315123000Z"[..])]
    #[case(&b"240615123000+2500"[..])]
    fn malformed_utc_time(#[case] content: &[u8]) {
        assert!(Asn1Time::decode_utc_time(content).is_err());
    }
}
