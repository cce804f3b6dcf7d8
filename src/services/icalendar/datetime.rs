// Date, date-time, and duration parsing

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;

use super::timezone::ZoneResolver;
use crate::error::IcsError;
use crate::models::moment::{IcsDuration, Moment};

lazy_static! {
    // [TZID=<zone>:]YYYYMMDD[THHMMSS][Z] -- the TZID segment may be quoted.
    static ref MOMENT_RE: Regex = Regex::new(
        r#"^(?:TZID=(?:"(?P<qtz>[^"]+)"|(?P<tz>[^:]+)):)?(?P<date>\d{8})(?:T(?P<time>\d{6}))?(?P<zulu>Z)?$"#
    )
    .unwrap();
    static ref DURATION_RE: Regex = Regex::new(
        r"^(?P<sign>[-+])?P(?:(?P<weeks>\d+)W)?(?:(?P<years>\d+)Y)?(?:(?P<months>\d+)M)?(?:(?P<days>\d+)D)?(?:T(?:(?P<hours>\d+)H)?(?:(?P<minutes>\d+)M)?(?:(?P<seconds>\d+)S)?)?$"
    )
    .unwrap();
}

/// Parse an iCalendar date or date-time, optionally prefixed with a
/// `TZID=<zone>:` marker. A trailing `Z` wins over any zone prefix;
/// without either, the resolver's default zone applies.
pub fn parse_moment(input: &str, resolver: &ZoneResolver) -> Result<Moment, IcsError> {
    let trimmed = input.trim();
    let caps = MOMENT_RE
        .captures(trimmed)
        .ok_or_else(|| IcsError::InvalidMoment(trimmed.to_string()))?;

    let digits = &caps["date"];
    let date = NaiveDate::from_ymd_opt(
        parse_number(&digits[0..4])?,
        parse_number(&digits[4..6])?,
        parse_number(&digits[6..8])?,
    )
    .ok_or_else(|| IcsError::InvalidMoment(trimmed.to_string()))?;

    let time = match caps.name("time") {
        Some(m) => {
            let t = m.as_str();
            Some(
                NaiveTime::from_hms_opt(
                    parse_number(&t[0..2])?,
                    parse_number(&t[2..4])?,
                    parse_number(&t[4..6])?,
                )
                .ok_or_else(|| IcsError::InvalidMoment(trimmed.to_string()))?,
            )
        }
        None => None,
    };

    let utc = caps.name("zulu").is_some();
    let zone = if utc {
        Tz::UTC
    } else {
        match caps.name("qtz").or_else(|| caps.name("tz")) {
            Some(tzid) => resolver.resolve(tzid.as_str()),
            None => resolver.default_zone(),
        }
    };

    Ok(Moment {
        date,
        time,
        zone,
        utc,
    })
}

/// Parse the ISO 8601 duration subset `P[nY][nM][nD][T[nH][nM][nS]]` plus
/// the week form `PnW`, with an optional leading sign.
pub fn parse_duration(input: &str) -> Result<IcsDuration, IcsError> {
    let trimmed = input.trim();
    let caps = DURATION_RE
        .captures(trimmed)
        .ok_or_else(|| IcsError::InvalidDuration(trimmed.to_string()))?;

    let field = |name: &str| -> i64 {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0)
    };

    let weeks = field("weeks");
    let years = field("years");
    let months = field("months");
    let days = field("days") + weeks * 7;
    let hours = field("hours");
    let minutes = field("minutes");
    let seconds = field("seconds");

    if weeks == 0
        && years == 0
        && months == 0
        && days == 0
        && hours == 0
        && minutes == 0
        && seconds == 0
        && !trimmed.contains(|c: char| c.is_ascii_digit())
    {
        return Err(IcsError::InvalidDuration(trimmed.to_string()));
    }

    let sign: i64 = if caps.name("sign").map(|m| m.as_str()) == Some("-") {
        -1
    } else {
        1
    };

    Ok(IcsDuration {
        years: (sign * years) as i32,
        months: (sign * months) as i32,
        days: sign * days,
        hours: sign * hours,
        minutes: sign * minutes,
        seconds: sign * seconds,
    })
}

fn parse_number<T: std::str::FromStr>(digits: &str) -> Result<T, IcsError> {
    digits
        .parse::<T>()
        .map_err(|_| IcsError::InvalidMoment(digits.to_string()))
}
