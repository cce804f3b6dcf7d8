// Time-zone resolution
// Maps zone strings (IANA identifiers, CLDR display names, Windows zone
// ids) to a canonical IANA zone, falling back to the configured default.

use std::cell::RefCell;
use std::collections::HashMap;
use std::str::FromStr;

use chrono_tz::Tz;

/// The display-name lookup consulted after IANA matching fails. A
/// built-in table covers the names that commonly appear in the wild;
/// callers with complete CLDR or Windows data can inject their own.
#[derive(Debug, Clone)]
pub struct ZoneTables {
    cldr: HashMap<String, String>,
    windows: HashMap<String, String>,
}

impl Default for ZoneTables {
    fn default() -> Self {
        Self {
            cldr: BUILTIN_CLDR
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            windows: BUILTIN_WINDOWS
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl ZoneTables {
    pub fn new<I, J>(cldr: I, windows: J) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
        J: IntoIterator<Item = (String, String)>,
    {
        Self {
            cldr: cldr.into_iter().collect(),
            windows: windows.into_iter().collect(),
        }
    }
}

/// Per-parse zone resolver. IANA validity lookups are cached for the
/// lifetime of the resolver; build one resolver per parse when embedding
/// concurrently.
pub struct ZoneResolver {
    default_zone: Tz,
    tables: ZoneTables,
    iana_cache: RefCell<HashMap<String, Option<Tz>>>,
}

impl ZoneResolver {
    pub fn new(default_zone: Tz, tables: ZoneTables) -> Self {
        Self {
            default_zone,
            tables,
            iana_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn default_zone(&self) -> Tz {
        self.default_zone
    }

    /// Resolve a candidate zone string, falling back to the default zone
    /// when nothing matches.
    pub fn resolve(&self, candidate: &str) -> Tz {
        let cleaned = decode_entities(candidate.trim().trim_matches('"'));
        if let Some(tz) = self.lookup_iana(&cleaned) {
            return tz;
        }
        if let Some(iana) = self.tables.cldr.get(cleaned.as_str()) {
            if let Some(tz) = self.lookup_iana(iana) {
                return tz;
            }
        }
        if let Some(iana) = self.tables.windows.get(cleaned.as_str()) {
            if let Some(tz) = self.lookup_iana(iana) {
                return tz;
            }
        }
        self.default_zone
    }

    /// Whether the candidate maps to a concrete IANA zone without the
    /// default fallback.
    pub fn recognises(&self, candidate: &str) -> bool {
        let cleaned = decode_entities(candidate.trim().trim_matches('"'));
        self.lookup_iana(&cleaned).is_some()
            || self.tables.cldr.contains_key(cleaned.as_str())
            || self.tables.windows.contains_key(cleaned.as_str())
    }

    fn lookup_iana(&self, name: &str) -> Option<Tz> {
        if let Some(cached) = self.iana_cache.borrow().get(name) {
            return *cached;
        }
        let parsed = Tz::from_str(name).ok();
        self.iana_cache
            .borrow_mut()
            .insert(name.to_string(), parsed);
        parsed
    }
}

/// Decode the HTML entities that show up in exported TZID parameters.
fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let semicolon = match rest.find(';') {
            Some(i) if i <= 8 => i,
            _ => {
                out.push('&');
                rest = &rest[1..];
                continue;
            }
        };
        let entity = &rest[1..semicolon];
        let decoded = match entity {
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix('#')
                .and_then(|d| d.parse::<u32>().ok())
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semicolon + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// CLDR display names seen in calendar exports, keyed exactly as emitted.
const BUILTIN_CLDR: &[(&str, &str)] = &[
    ("British Summer Time", "Europe/London"),
    ("Greenwich Mean Time", "Etc/GMT"),
    ("Central European Standard Time", "Europe/Berlin"),
    ("Central European Summer Time", "Europe/Berlin"),
    ("Eastern European Standard Time", "Europe/Bucharest"),
    ("Eastern European Summer Time", "Europe/Bucharest"),
    ("Western European Standard Time", "Europe/Lisbon"),
    ("Eastern Standard Time", "America/New_York"),
    ("Eastern Daylight Time", "America/New_York"),
    ("Central Standard Time", "America/Chicago"),
    ("Central Daylight Time", "America/Chicago"),
    ("Mountain Standard Time", "America/Denver"),
    ("Mountain Daylight Time", "America/Denver"),
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("Pacific Daylight Time", "America/Los_Angeles"),
    ("Alaska Standard Time", "America/Anchorage"),
    ("Hawaii-Aleutian Standard Time", "Pacific/Honolulu"),
    ("Atlantic Standard Time", "America/Halifax"),
    ("Brasilia Standard Time", "America/Sao_Paulo"),
    ("Argentina Standard Time", "America/Argentina/Buenos_Aires"),
    ("India Standard Time", "Asia/Kolkata"),
    ("China Standard Time", "Asia/Shanghai"),
    ("Japan Standard Time", "Asia/Tokyo"),
    ("Korean Standard Time", "Asia/Seoul"),
    ("Singapore Standard Time", "Asia/Singapore"),
    ("Hong Kong Standard Time", "Asia/Hong_Kong"),
    ("Gulf Standard Time", "Asia/Dubai"),
    ("Arabian Standard Time", "Asia/Riyadh"),
    ("Israel Standard Time", "Asia/Jerusalem"),
    ("Moscow Standard Time", "Europe/Moscow"),
    ("Australian Eastern Standard Time", "Australia/Sydney"),
    ("Australian Eastern Daylight Time", "Australia/Sydney"),
    ("Australian Central Standard Time", "Australia/Adelaide"),
    ("Australian Western Standard Time", "Australia/Perth"),
    ("New Zealand Standard Time", "Pacific/Auckland"),
    ("South Africa Standard Time", "Africa/Johannesburg"),
    ("East Africa Time", "Africa/Nairobi"),
    ("West Africa Standard Time", "Africa/Lagos"),
];

// Windows zone ids from the Unicode windowsZones mapping, keyed by the
// id Outlook writes into TZID parameters.
const BUILTIN_WINDOWS: &[(&str, &str)] = &[
    ("GMT Standard Time", "Europe/London"),
    ("Greenwich Standard Time", "Atlantic/Reykjavik"),
    ("W. Europe Standard Time", "Europe/Berlin"),
    ("Central Europe Standard Time", "Europe/Budapest"),
    ("Romance Standard Time", "Europe/Paris"),
    ("Central European Standard Time", "Europe/Warsaw"),
    ("E. Europe Standard Time", "Europe/Chisinau"),
    ("FLE Standard Time", "Europe/Kiev"),
    ("GTB Standard Time", "Europe/Bucharest"),
    ("Russian Standard Time", "Europe/Moscow"),
    ("Turkey Standard Time", "Europe/Istanbul"),
    ("US Eastern Standard Time", "America/Indiana/Indianapolis"),
    ("Eastern Standard Time", "America/New_York"),
    ("Central Standard Time", "America/Chicago"),
    ("Mountain Standard Time", "America/Denver"),
    ("US Mountain Standard Time", "America/Phoenix"),
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("Alaskan Standard Time", "America/Anchorage"),
    ("Hawaiian Standard Time", "Pacific/Honolulu"),
    ("Atlantic Standard Time", "America/Halifax"),
    ("SA Eastern Standard Time", "America/Cayenne"),
    ("E. South America Standard Time", "America/Sao_Paulo"),
    ("Argentina Standard Time", "America/Argentina/Buenos_Aires"),
    ("SA Pacific Standard Time", "America/Bogota"),
    ("Central America Standard Time", "America/Guatemala"),
    ("Canada Central Standard Time", "America/Regina"),
    ("India Standard Time", "Asia/Kolkata"),
    ("China Standard Time", "Asia/Shanghai"),
    ("Tokyo Standard Time", "Asia/Tokyo"),
    ("Korea Standard Time", "Asia/Seoul"),
    ("Singapore Standard Time", "Asia/Singapore"),
    ("Taipei Standard Time", "Asia/Taipei"),
    ("SE Asia Standard Time", "Asia/Bangkok"),
    ("Arabian Standard Time", "Asia/Dubai"),
    ("Arab Standard Time", "Asia/Riyadh"),
    ("Israel Standard Time", "Asia/Jerusalem"),
    ("Iran Standard Time", "Asia/Tehran"),
    ("Pakistan Standard Time", "Asia/Karachi"),
    ("Bangladesh Standard Time", "Asia/Dhaka"),
    ("AUS Eastern Standard Time", "Australia/Sydney"),
    ("AUS Central Standard Time", "Australia/Darwin"),
    ("Cen. Australia Standard Time", "Australia/Adelaide"),
    ("W. Australia Standard Time", "Australia/Perth"),
    ("Tasmania Standard Time", "Australia/Hobart"),
    ("New Zealand Standard Time", "Pacific/Auckland"),
    ("South Africa Standard Time", "Africa/Johannesburg"),
    ("Egypt Standard Time", "Africa/Cairo"),
    ("W. Central Africa Standard Time", "Africa/Lagos"),
    ("E. Africa Standard Time", "Africa/Nairobi"),
    ("Morocco Standard Time", "Africa/Casablanca"),
    ("UTC", "Etc/UTC"),
];
