//! Title classification and normalisation
//!
//! Titles are classified independently per side before comparison. The
//! classification decides which comparison rule applies to a pair.

mod normalize;

pub use normalize::{
    expand_numbers, remove_postfixes, remove_sequence_prefix, strip_accents, TitleNormalizer,
};

pub(crate) use normalize::spell_number;

use once_cell::sync::Lazy;
use regex::Regex;

static DATE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})$").unwrap());

static SEQUENCE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i:episode)(?:\s*[:\-]\s*|\s+)(\d+)$").unwrap());

/// Calendar date parsed from a `D/M/YYYY` style title
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TitleDate {
    pub day: u8,
    pub month: u8,
    /// Four-digit year; two-digit years are read as 20yy
    pub year: u16,
}

/// Classification of a title for comparison-rule selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TitleType {
    /// `09/10/2011`, `9/10/11`
    Date(TitleDate),
    /// `Episode 1`, `Episode: 1`, `episode - 1`
    Sequence(u64),
    Default,
}

impl TitleType {
    /// Classify a title; the first matching rule wins
    pub fn of(title: &str) -> Self {
        let title = title.trim();

        if let Some(date) = parse_date(title) {
            return TitleType::Date(date);
        }

        if let Some(number) = SEQUENCE_TITLE
            .captures(title)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            return TitleType::Sequence(number);
        }

        TitleType::Default
    }

    pub fn is_default(&self) -> bool {
        matches!(self, TitleType::Default)
    }
}

fn parse_date(title: &str) -> Option<TitleDate> {
    let captures = DATE_TITLE.captures(title)?;
    let day: u8 = captures.get(1)?.as_str().parse().ok()?;
    let month: u8 = captures.get(2)?.as_str().parse().ok()?;
    let year_text = captures.get(3)?.as_str();
    let year: u16 = year_text.parse().ok()?;
    let year = if year_text.len() == 2 { 2000 + year } else { year };

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    Some(TitleDate { day, month, year })
}
