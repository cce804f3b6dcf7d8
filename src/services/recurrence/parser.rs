// RRULE parsing
// Splits the `;`-separated stanzas into an RRule record and checks the
// combinations the expander cannot honour.

use chrono::Weekday;

use crate::error::IcsError;
use crate::models::rrule::{weekday_from_code, ByDay, Frequency, RRule};
use crate::services::icalendar::{parse_moment, ZoneResolver};

pub(super) fn parse_rrule(
    text: &str,
    default_wkst: Weekday,
    resolver: &ZoneResolver,
) -> Result<RRule, IcsError> {
    let mut freq: Option<Frequency> = None;
    let mut rule = RRule {
        freq: Frequency::Daily,
        interval: 1,
        count: None,
        until: None,
        by_month: Vec::new(),
        by_month_day: Vec::new(),
        by_year_day: Vec::new(),
        by_week_no: Vec::new(),
        by_day: Vec::new(),
        by_set_pos: Vec::new(),
        wkst: default_wkst,
    };

    for stanza in text.split(';') {
        let stanza = stanza.trim();
        if stanza.is_empty() {
            continue;
        }
        let Some((key, value)) = stanza.split_once('=') else {
            return Err(IcsError::rrule(text, format!("malformed stanza '{stanza}'")));
        };
        let value = value.trim();
        match key.trim().to_ascii_uppercase().as_str() {
            "FREQ" => {
                freq = Some(match value {
                    "DAILY" => Frequency::Daily,
                    "WEEKLY" => Frequency::Weekly,
                    "MONTHLY" => Frequency::Monthly,
                    "YEARLY" => Frequency::Yearly,
                    other => {
                        return Err(IcsError::rrule(text, format!("unsupported FREQ '{other}'")))
                    }
                });
            }
            "INTERVAL" => {
                rule.interval = value
                    .parse::<u32>()
                    .ok()
                    .filter(|&i| i >= 1)
                    .ok_or_else(|| IcsError::rrule(text, "INTERVAL must be a positive integer"))?;
            }
            "COUNT" => {
                rule.count = Some(
                    value
                        .parse::<u32>()
                        .ok()
                        .filter(|&c| c >= 1)
                        .ok_or_else(|| IcsError::rrule(text, "COUNT must be a positive integer"))?,
                );
            }
            "UNTIL" => {
                rule.until = Some(parse_moment(value, resolver).map_err(|_| {
                    IcsError::rrule(text, format!("UNTIL value '{value}' is not a date"))
                })?);
            }
            "BYMONTH" => rule.by_month = int_list(text, value, 1, 12)?,
            "BYMONTHDAY" => {
                rule.by_month_day = signed_list(text, value, 31)?;
            }
            "BYYEARDAY" => rule.by_year_day = signed_list(text, value, 366)?,
            "BYWEEKNO" => rule.by_week_no = signed_list(text, value, 53)?,
            "BYSETPOS" => rule.by_set_pos = signed_list(text, value, 366)?,
            "BYDAY" => rule.by_day = byday_list(text, value)?,
            "WKST" => {
                rule.wkst = weekday_from_code(value)
                    .ok_or_else(|| IcsError::rrule(text, format!("bad WKST '{value}'")))?;
            }
            // Stanzas outside the supported set are tolerated.
            _ => {}
        }
    }

    rule.freq = freq.ok_or_else(|| IcsError::rrule(text, "missing FREQ"))?;
    Ok(rule)
}

/// Combinations the expander refuses: a numeric BYDAY ordinal needs a
/// MONTHLY or YEARLY frequency, and YEARLY rules with BYWEEKNO cannot
/// also carry numeric BYDAY entries.
pub(super) fn validate(rule: &RRule, text: &str) -> Result<(), IcsError> {
    let has_ordinal = rule.by_day.iter().any(|entry| entry.ordinal.is_some());
    if !has_ordinal {
        return Ok(());
    }
    match rule.freq {
        Frequency::Monthly => Ok(()),
        Frequency::Yearly => {
            if rule.by_week_no.is_empty() {
                Ok(())
            } else {
                Err(IcsError::rrule(
                    text,
                    "numeric BYDAY cannot combine with BYWEEKNO",
                ))
            }
        }
        _ => Err(IcsError::rrule(
            text,
            "numeric BYDAY requires a MONTHLY or YEARLY frequency",
        )),
    }
}

fn int_list(rule: &str, value: &str, min: u32, max: u32) -> Result<Vec<u32>, IcsError> {
    value
        .split(',')
        .map(|item| {
            item.trim()
                .parse::<u32>()
                .ok()
                .filter(|n| (min..=max).contains(n))
                .ok_or_else(|| IcsError::rrule(rule, format!("value '{item}' out of range")))
        })
        .collect()
}

fn signed_list(rule: &str, value: &str, magnitude: i32) -> Result<Vec<i32>, IcsError> {
    value
        .split(',')
        .map(|item| {
            item.trim()
                .parse::<i32>()
                .ok()
                .filter(|&n| n != 0 && n.abs() <= magnitude)
                .ok_or_else(|| IcsError::rrule(rule, format!("value '{item}' out of range")))
        })
        .collect()
}

fn byday_list(rule: &str, value: &str) -> Result<Vec<ByDay>, IcsError> {
    value
        .split(',')
        .map(|item| {
            let item = item.trim();
            if !item.is_ascii() || item.len() < 2 {
                return Err(IcsError::rrule(rule, format!("bad BYDAY entry '{item}'")));
            }
            let (prefix, code) = item.split_at(item.len() - 2);
            let weekday = weekday_from_code(code)
                .ok_or_else(|| IcsError::rrule(rule, format!("bad BYDAY entry '{item}'")))?;
            let ordinal = if prefix.is_empty() {
                None
            } else {
                Some(
                    prefix
                        .parse::<i32>()
                        .ok()
                        .filter(|&n| n != 0 && n.abs() <= 53)
                        .ok_or_else(|| {
                            IcsError::rrule(rule, format!("bad BYDAY ordinal '{item}'"))
                        })?,
                )
            };
            Ok(ByDay { ordinal, weekday })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::icalendar::ZoneTables;
    use test_case::test_case;

    fn resolver() -> ZoneResolver {
        ZoneResolver::new(chrono_tz::UTC, ZoneTables::default())
    }

    fn parse(text: &str) -> Result<RRule, IcsError> {
        parse_rrule(text, Weekday::Mon, &resolver())
    }

    #[test]
    fn test_parse_full_rule() {
        let rule = parse("FREQ=YEARLY;INTERVAL=2;COUNT=10;BYMONTH=3;BYDAY=TU,TH;BYSETPOS=2,4,-2;WKST=SU").unwrap();
        assert_eq!(rule.freq, Frequency::Yearly);
        assert_eq!(rule.interval, 2);
        assert_eq!(rule.count, Some(10));
        assert_eq!(rule.by_month, vec![3]);
        assert_eq!(rule.by_day.len(), 2);
        assert_eq!(rule.by_set_pos, vec![2, 4, -2]);
        assert_eq!(rule.wkst, Weekday::Sun);
    }

    #[test]
    fn test_byday_ordinals() {
        let rule = parse("FREQ=MONTHLY;BYDAY=-1SU,2MO").unwrap();
        assert_eq!(
            rule.by_day,
            vec![
                ByDay {
                    ordinal: Some(-1),
                    weekday: Weekday::Sun
                },
                ByDay {
                    ordinal: Some(2),
                    weekday: Weekday::Mon
                },
            ]
        );
    }

    #[test]
    fn test_until_parsed_as_moment() {
        let rule = parse("FREQ=WEEKLY;UNTIL=20210608T135959Z").unwrap();
        let until = rule.until.unwrap();
        assert!(until.utc);
        assert_eq!(until.date.to_string(), "2021-06-08");
    }

    #[test]
    fn test_defaults() {
        let rule = parse("FREQ=DAILY").unwrap();
        assert_eq!(rule.interval, 1);
        assert_eq!(rule.count, None);
        assert_eq!(rule.wkst, Weekday::Mon);
        assert!(rule.by_day.is_empty());
    }

    #[test]
    fn test_unknown_stanza_tolerated() {
        assert!(parse("FREQ=DAILY;RSCALE=GREGORIAN").is_ok());
    }

    #[test_case(""; "empty rule")]
    #[test_case("COUNT=3"; "missing freq")]
    #[test_case("FREQ=HOURLY"; "unsupported freq")]
    #[test_case("FREQ=DAILY;INTERVAL=0"; "zero interval")]
    #[test_case("FREQ=DAILY;COUNT=zero"; "count not numeric")]
    #[test_case("FREQ=DAILY;BYMONTH=13"; "month out of range")]
    #[test_case("FREQ=DAILY;BYMONTHDAY=0"; "zero month day")]
    #[test_case("FREQ=DAILY;BYDAY=XX"; "bad weekday")]
    #[test_case("FREQ=DAILY;UNTIL=someday"; "bad until")]
    fn test_parse_errors(text: &str) {
        assert!(matches!(parse(text), Err(IcsError::InvalidRRule { .. })));
    }

    #[test]
    fn test_validate_ordinal_needs_monthly_or_yearly() {
        let daily = parse("FREQ=DAILY;BYDAY=2MO").unwrap();
        assert!(validate(&daily, "FREQ=DAILY;BYDAY=2MO").is_err());

        let monthly = parse("FREQ=MONTHLY;BYDAY=2MO").unwrap();
        assert!(validate(&monthly, "FREQ=MONTHLY;BYDAY=2MO").is_ok());
    }

    #[test]
    fn test_validate_yearly_weekno_rejects_ordinal() {
        let text = "FREQ=YEARLY;BYWEEKNO=20;BYDAY=2MO";
        let rule = parse(text).unwrap();
        assert!(validate(&rule, text).is_err());

        let plain = "FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO";
        let rule = parse(plain).unwrap();
        assert!(validate(&rule, plain).is_ok());
    }
}
