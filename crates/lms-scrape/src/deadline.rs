//! Due-date extraction from free text near quizzes and assignments.
//!
//! Patterns are tried in a fixed order and the first match wins:
//!
//! 1. `D Month YYYY` with English or Italian month names
//! 2. `D/M/YYYY`
//! 3. `YYYY-MM-DD`
//!
//! Activity date blocks often carry several labelled dates ("Opened: ...
//! Due: ..."). A fragment introduced by a due marker is searched first, and
//! the whole text only when no such fragment yields a date.
//!
//! The matched substring is always kept as the raw value. Numeric slash
//! dates are read under the configured [`DateOrder`]; when the text alone
//! cannot settle the order the deadline is flagged `ambiguous`.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

use crate::classify::ElementMetadata;
use crate::error::ScrapeError;
use crate::types::Deadline;

/// Labels that introduce the closing date, English then Italian.
pub const DEFAULT_DUE_MARKERS: &[&str] = &[
    "due",
    "closes",
    "closed",
    "deadline",
    "scadenza",
    "chiusura",
];

/// Month names and abbreviations, English then Italian.
const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("sept", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
    ("gennaio", 1),
    ("febbraio", 2),
    ("marzo", 3),
    ("aprile", 4),
    ("maggio", 5),
    ("giugno", 6),
    ("luglio", 7),
    ("agosto", 8),
    ("settembre", 9),
    ("ottobre", 10),
    ("novembre", 11),
    ("dicembre", 12),
    ("gen", 1),
    ("mag", 5),
    ("giu", 6),
    ("lug", 7),
    ("ago", 8),
    ("set", 9),
    ("ott", 10),
    ("dic", 12),
];

/// Field order assumed for numeric `a/b/YYYY` dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateOrder {
    /// `15/03/2024` is 15 March.
    #[default]
    DayFirst,
    /// `03/15/2024` is 15 March.
    MonthFirst,
}

impl FromStr for DateOrder {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day-first" | "dayfirst" | "dmy" => Ok(DateOrder::DayFirst),
            "month-first" | "monthfirst" | "mdy" => Ok(DateOrder::MonthFirst),
            other => Err(ScrapeError::Unsupported(format!("date order '{other}'"))),
        }
    }
}

fn month_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})\s+(\p{L}+)\.?,?\s+(\d{4})\b").expect("valid regex"))
}

fn slash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("valid regex"))
}

fn iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("valid regex"))
}

/// A `Label:` heading, as used between dates in one block.
fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\p{L}+\s*:").expect("valid regex"))
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\s,]*(?:(?i:at|alle|ore)\s+)?(\d{1,2}):(\d{2})(?:\s*([AaPp])\.?[Mm]\.?)?")
            .expect("valid regex")
    })
}

/// Extracts deadlines from element metadata.
#[derive(Debug, Clone)]
pub struct DeadlineExtractor {
    order: DateOrder,
    due: Option<Regex>,
}

impl Default for DeadlineExtractor {
    fn default() -> Self {
        Self::new(DateOrder::default())
    }
}

impl DeadlineExtractor {
    pub fn new(order: DateOrder) -> Self {
        Self::with_due_markers(order, DEFAULT_DUE_MARKERS)
    }

    /// Use `markers` (matched case-insensitively as whole words) to find the
    /// closing date. An empty list disables marker lookup.
    pub fn with_due_markers<S: AsRef<str>>(order: DateOrder, markers: &[S]) -> Self {
        let words: Vec<String> = markers
            .iter()
            .map(|m| m.as_ref().trim())
            .filter(|m| !m.is_empty())
            .map(regex::escape)
            .collect();
        let due = if words.is_empty() {
            None
        } else {
            Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|"))).ok()
        };
        Self { order, due }
    }

    /// Extract a deadline from the element's date text, if it has one.
    pub fn extract(&self, element: &ElementMetadata) -> Option<Deadline> {
        let text = element.date_text.as_deref()?;
        self.parse_text(text)
    }

    /// Find the deadline in free text, preferring a due-marked fragment.
    pub fn parse_text(&self, text: &str) -> Option<Deadline> {
        if let Some(due) = &self.due {
            for marker in due.find_iter(text) {
                let fragment = labelled_fragment(&text[marker.end()..]);
                if let Some(found) = self.match_patterns(fragment) {
                    return Some(found);
                }
            }
        }
        self.match_patterns(text)
    }

    /// Run the ordered patterns over `text`.
    fn match_patterns(&self, text: &str) -> Option<Deadline> {
        if let Some(found) = match_month_name(text) {
            return Some(found.into_deadline(text));
        }
        if let Some(found) = self.match_slash(text) {
            return Some(found.into_deadline(text));
        }
        if let Some(found) = match_iso(text) {
            return Some(found.into_deadline(text));
        }
        None
    }

    fn match_slash(&self, text: &str) -> Option<DateMatch> {
        let caps = slash_re().captures(text)?;
        let whole = caps.get(0)?;
        let a: u32 = caps[1].parse().ok()?;
        let b: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;

        // A field above 12 can only be the day, whatever the configured order.
        let (day, month, ambiguous) = match (a > 12, b > 12) {
            (true, false) => (a, b, false),
            (false, true) => (b, a, false),
            (true, true) => (a, b, false),
            (false, false) => {
                let ambiguous = a != b;
                match self.order {
                    DateOrder::DayFirst => (a, b, ambiguous),
                    DateOrder::MonthFirst => (b, a, ambiguous),
                }
            }
        };

        Some(DateMatch {
            raw: whole.as_str().to_string(),
            end: whole.end(),
            date: NaiveDate::from_ymd_opt(year, month, day),
            ambiguous,
        })
    }
}

/// A pattern hit before time handling.
struct DateMatch {
    raw: String,
    end: usize,
    date: Option<NaiveDate>,
    ambiguous: bool,
}

impl DateMatch {
    fn into_deadline(self, text: &str) -> Deadline {
        let normalized = self.date.map(|date| match trailing_time(&text[self.end..]) {
            Some(time) => date.and_time(time).format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => date.format("%Y-%m-%d").to_string(),
        });
        Deadline {
            raw: self.raw,
            normalized,
            ambiguous: self.ambiguous,
        }
    }
}

fn match_month_name(text: &str) -> Option<DateMatch> {
    month_name_re().captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        let month = month_number(&caps[2])?;
        let day: u32 = caps[1].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        Some(DateMatch {
            raw: whole.as_str().to_string(),
            end: whole.end(),
            date: NaiveDate::from_ymd_opt(year, month, day),
            ambiguous: false,
        })
    })
}

fn match_iso(text: &str) -> Option<DateMatch> {
    let caps = iso_re().captures(text)?;
    let whole = caps.get(0)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    Some(DateMatch {
        raw: whole.as_str().to_string(),
        end: whole.end(),
        date: NaiveDate::from_ymd_opt(year, month, day),
        ambiguous: false,
    })
}

fn month_number(word: &str) -> Option<u32> {
    let lower = word.to_lowercase();
    MONTHS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, n)| *n)
}

/// `rest` up to the next `Label:` that follows a digit.
fn labelled_fragment(rest: &str) -> &str {
    let Some(first_digit) = rest.find(|c: char| c.is_ascii_digit()) else {
        return rest;
    };
    match label_re().find_at(rest, first_digit) {
        Some(label) => &rest[..label.start()],
        None => rest,
    }
}

/// Parse an `HH:MM` (optionally AM/PM) directly after a date.
fn trailing_time(rest: &str) -> Option<NaiveTime> {
    let caps = time_re().captures(rest)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    if let Some(meridiem) = caps.get(3) {
        if hour == 0 || hour > 12 {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("p");
        hour = match (pm, hour) {
            (false, 12) => 0,
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, h) => h,
        };
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}
