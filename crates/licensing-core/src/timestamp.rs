//! Timestamp, Duration, and Timespan value types, and the overlap/intersection
//! algorithm (§4.2, §4.5 step 5) that all dependency-chain validation rests on.

use crate::error::{LicenseError, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A UTC instant, serialized per §4.1 as `YYYY-MM-DD HH:MM:SS+00:00` (no
/// milliseconds) and accepted either in that form or as a bare Unix
/// timestamp (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S+00:00";

impl Timestamp {
    #[must_use]
    pub fn from_unix_seconds(secs: i64) -> Self {
        Self(Utc.timestamp_opt(secs, 0).single().unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap()))
    }

    #[must_use]
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parses either the canonical `YYYY-MM-DD HH:MM:SS+00:00` string or a
    /// bare integer/float Unix-seconds string, matching the tolerant
    /// coercion §4.2 requires of every value type.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S+00:00") {
            return Ok(Self(Utc.from_utc_datetime(&naive)));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }
        if let Ok(secs) = text.parse::<i64>() {
            return Ok(Self::from_unix_seconds(secs));
        }
        if let Ok(secs) = text.parse::<f64>() {
            return Ok(Self::from_unix_seconds(secs as i64));
        }
        Err(LicenseError::InvalidField {
            field: "timestamp".into(),
            detail: format!("unparseable timestamp: {text:?}").into(),
            context: None,
        })
    }

    #[must_use]
    pub fn inner(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_FORMAT))
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp::from_unix_seconds(self.unix_seconds() + rhs.as_seconds())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(d)?;
        Timestamp::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// A non-negative duration, serialized per §4.1 as a human-friendly string
/// (`"1y"`, `"30d"`) or a bare number of seconds, and parseable from either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duration(i64);

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;
const SECS_PER_MONTH: i64 = 30 * SECS_PER_DAY;
const SECS_PER_YEAR: i64 = 365 * SECS_PER_DAY;

impl Duration {
    #[must_use]
    pub const fn from_seconds(secs: i64) -> Self {
        Self(secs.max(0))
    }

    #[must_use]
    pub const fn as_seconds(&self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses a human-friendly duration string (`"1y, 7mo"`, `"30d"`) or a
    /// bare number of seconds.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Ok(secs) = text.parse::<i64>() {
            return Ok(Self::from_seconds(secs));
        }
        if let Ok(secs) = text.parse::<f64>() {
            return Ok(Self::from_seconds(secs as i64));
        }

        let mut total: i64 = 0;
        let mut any = false;
        for term in text.split(',') {
            let term = term.trim();
            if term.is_empty() {
                continue;
            }
            let split_at = term.find(|c: char| !c.is_ascii_digit()).ok_or_else(|| {
                LicenseError::InvalidField {
                    field: "duration".into(),
                    detail: format!("missing unit in duration term {term:?}").into(),
                    context: None,
                }
            })?;
            let (digits, unit) = term.split_at(split_at);
            let value: i64 = digits.parse().map_err(|_| LicenseError::InvalidField {
                field: "duration".into(),
                detail: format!("invalid numeric duration term {term:?}").into(),
                context: None,
            })?;
            let unit = unit.trim();
            let secs = match unit {
                "y" | "yr" | "yrs" | "year" | "years" => value * SECS_PER_YEAR,
                "mo" | "mos" | "month" | "months" => value * SECS_PER_MONTH,
                "w" | "wk" | "weeks" => value * SECS_PER_DAY * 7,
                "d" | "day" | "days" => value * SECS_PER_DAY,
                "h" | "hr" | "hrs" | "hours" => value * SECS_PER_HOUR,
                "m" | "min" | "mins" | "minutes" => value * SECS_PER_MINUTE,
                "s" | "sec" | "secs" | "seconds" => value,
                other => {
                    return Err(LicenseError::InvalidField {
                        field: "duration".into(),
                        detail: format!("unknown duration unit {other:?}").into(),
                        context: None,
                    });
                },
            };
            total += secs;
            any = true;
        }
        if !any {
            return Err(LicenseError::InvalidField {
                field: "duration".into(),
                detail: "empty duration".into(),
                context: None,
            });
        }
        Ok(Self::from_seconds(total))
    }
}

impl fmt::Display for Duration {
    /// Renders an approximate, human-friendly breakdown (year ≈ 365d, month
    /// ≈ 30d). The intersection *math* (§4.5 step 5) always operates on
    /// exact seconds; only this rendering is approximate.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut remaining = self.0;
        let mut parts = Vec::new();

        let years = remaining / SECS_PER_YEAR;
        remaining -= years * SECS_PER_YEAR;
        if years > 0 {
            parts.push(format!("{years}y"));
        }
        let months = remaining / SECS_PER_MONTH;
        remaining -= months * SECS_PER_MONTH;
        if months > 0 {
            parts.push(format!("{months}mo"));
        }
        let days = remaining / SECS_PER_DAY;
        remaining -= days * SECS_PER_DAY;
        if days > 0 {
            parts.push(format!("{days}d"));
        }
        let hours = remaining / SECS_PER_HOUR;
        remaining -= hours * SECS_PER_HOUR;
        if hours > 0 {
            parts.push(format!("{hours}h"));
        }
        let minutes = remaining / SECS_PER_MINUTE;
        remaining -= minutes * SECS_PER_MINUTE;
        if minutes > 0 {
            parts.push(format!("{minutes}m"));
        }
        if remaining > 0 || parts.is_empty() {
            parts.push(format!("{remaining}s"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(d)?;
        Duration::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// `(start, length)` with open-ended semantics for absent parts: an absent
/// `start` means "perpetual from the beginning of time"; an absent `length`
/// means "no upper bound". Both absent serializes as wholly absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timespan {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub length: Option<Duration>,
}

impl Timespan {
    pub fn new(start: Option<Timestamp>, length: Option<Duration>) -> Result<Self> {
        if start.is_none() && length.is_some() {
            return Err(LicenseError::InvalidField {
                field: "timespan.length".into(),
                detail: "length without a start is invalid".into(),
                context: None,
            });
        }
        Ok(Self { start, length })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.length.is_none()
    }

    #[must_use]
    pub fn end(&self) -> Option<Timestamp> {
        match (self.start, self.length) {
            (Some(start), Some(length)) => Some(start + length),
            _ => None,
        }
    }
}

/// The running overlap computed so far: `(start, length)`, both optional.
pub type Overlap = (Option<Timestamp>, Option<Duration>);

/// Intersects `(start, length)` with `other`, per §4.5 step 5 /
/// the original `overlap_intersect` algorithm.
///
/// Returns the narrowed `(start, length)`. The caller is responsible for
/// checking whether the computed length is exactly zero (§9 open
/// question: a zero-length intersection is a failure, reproduced here
/// faithfully even though it means two back-to-back spans never overlap).
#[must_use]
pub fn overlap_intersect(start: Option<Timestamp>, length: Option<Duration>, other: &Timespan) -> Overlap {
    let Some(start) = start else {
        debug_assert!(length.is_none(), "a length without a start is invalid");
        let Some(other_start) = other.start else {
            return (None, None);
        };
        return (Some(other_start), other.length);
    };
    let Some(other_start) = other.start else {
        return (Some(start), length);
    };

    let begun = start.max(other_start);

    if length.is_none() && other.length.is_none() {
        return (Some(begun), None);
    }

    let ended = match (length, other.length) {
        (Some(length), None) => start + length,
        (None, Some(other_length)) => other_start + other_length,
        (Some(length), Some(other_length)) => (start + length).min(other_start + other_length),
        (None, None) => unreachable!("handled above"),
    };

    let narrowed_length = if ended.unix_seconds() <= begun.unix_seconds() {
        Duration::from_seconds(0)
    } else {
        Duration::from_seconds(ended.unix_seconds() - begun.unix_seconds())
    };
    (Some(begun), Some(narrowed_length))
}

/// Intersects a running `(start, length)` with each of `others` in order,
/// failing with [`LicenseError::IncompatibleTimespan`] the moment the
/// overlap narrows to exactly zero.
pub fn overlap_all<'a>(
    start: Option<Timestamp>,
    length: Option<Duration>,
    others: impl IntoIterator<Item = &'a Timespan>,
    author: &str,
    product: &str,
) -> Result<Overlap> {
    let mut running = (start, length);
    for other in others {
        running = overlap_intersect(running.0, running.1, other);
        if running.1.is_some_and(|l| l.is_zero()) {
            return Err(LicenseError::IncompatibleTimespan {
                author: author.to_owned().into(),
                product: product.to_owned().into(),
                detail: format!(
                    "license from {} for {} incompatible with others",
                    running.0.map(|s| s.to_string()).unwrap_or_default(),
                    other.length.map(|l| l.to_string()).unwrap_or_else(|| "unbounded".to_owned()),
                )
                .into(),
                context: None,
            });
        }
    }
    Ok(running)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_round_trips_through_display_and_parse() {
        let d = Duration::from_seconds(SECS_PER_YEAR + 7 * SECS_PER_MONTH);
        let text = d.to_string();
        assert_eq!(text, "1y, 7mo");
        assert_eq!(Duration::parse(&text).unwrap(), d);
    }

    #[test]
    fn overlap_boundary_scenario_from_spec() {
        let a = Timespan::new(
            Some(Timestamp::parse("2020-01-01 00:00:00+00:00").unwrap()),
            Some(Duration::from_seconds(2 * SECS_PER_YEAR)),
        )
        .unwrap();
        let b_start = Timestamp::parse("2021-06-01 00:00:00+00:00").unwrap();
        let b_length = Duration::from_seconds(2 * SECS_PER_YEAR);

        let (start, length) = overlap_intersect(a.start, a.length, &Timespan { start: Some(b_start), length: Some(b_length) });
        assert_eq!(start, Some(b_start));
        // `length` here is a fixed 2*365-day span, not two calendar years, so it lands one day
        // short of 2022-01-01 (2020 was a leap year): the overlap is 2021-06-01..2021-12-31,
        // 213 days, not the "1y, 7mo" a naive calendar-year reading of the inputs might suggest.
        assert_eq!(length.unwrap().as_seconds(), 213 * SECS_PER_DAY);

        let c = Timespan::new(
            Some(Timestamp::parse("2024-01-01 00:00:00+00:00").unwrap()),
            Some(Duration::from_seconds(SECS_PER_DAY)),
        )
        .unwrap();
        let (_, zero_length) = overlap_intersect(start, length, &c);
        assert!(zero_length.unwrap().is_zero());
    }

    #[test]
    fn absent_timespan_is_identity() {
        let empty = Timespan::default();
        let (start, length) = overlap_intersect(None, None, &empty);
        assert_eq!(start, None);
        assert_eq!(length, None);
    }
}
