//! Date-range parsing for LinkedIn-style lines such as
//! `June 2021 - Present (4 years 9 months)`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

const MONTH_NAMES: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";

/// A line that opens an experience entry: full month name, year, separator.
static DATE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^(?:{MONTH_NAMES})\s+\d{{4}}\s*[-–]\s*\S"))
        .expect("date line pattern is valid")
});

static DATE_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\w+)\s+(\d{4})\s*[-–]\s*(present|\w+\s+\d{4})")
        .expect("date range pattern is valid")
});

static MONTH_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s+(\d{4})").expect("month year pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
}

/// Two-digit month number for a full English month name.
pub fn month_number(name: &str) -> Option<&'static str> {
    let month = match name.to_ascii_lowercase().as_str() {
        "january" => "01",
        "february" => "02",
        "march" => "03",
        "april" => "04",
        "may" => "05",
        "june" => "06",
        "july" => "07",
        "august" => "08",
        "september" => "09",
        "october" => "10",
        "november" => "11",
        "december" => "12",
        _ => return None,
    };
    Some(month)
}

/// Whether `line` starts with a month-name date range.
pub fn is_date_range_line(line: &str) -> bool {
    DATE_LINE_RE.is_match(line)
}

/// Parses the first date range found in `line`.
///
/// Dates come out as `YYYY-MM` when the month is recognized, otherwise as the
/// bare year. `Present` sets `current` and leaves `end_date` empty. A line with
/// no range yields the empty default.
pub fn parse_date_range(line: &str) -> DateRange {
    let Some(caps) = DATE_RANGE_RE.captures(line) else {
        return DateRange::default();
    };

    let start_date = format_month_year(&caps[1], &caps[2]);
    let end_raw = caps[3].trim();
    let current = end_raw.eq_ignore_ascii_case("present");

    let end_date = if current {
        String::new()
    } else {
        MONTH_YEAR_RE
            .captures(end_raw)
            .map(|c| format_month_year(&c[1], &c[2]))
            .unwrap_or_default()
    };

    DateRange {
        start_date,
        end_date,
        current,
    }
}

fn format_month_year(month: &str, year: &str) -> String {
    match month_number(month) {
        Some(m) => format!("{year}-{m}"),
        None => year.to_string(),
    }
}
