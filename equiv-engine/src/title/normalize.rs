//! Default-title normalisation and comparison
//!
//! Normalisation, in order:
//! 1. Drop a leading sequence prefix (`2. `, `2: `, `2 - `)
//! 2. Spell out whole-word numbers below 100 (`Apollo 13` as `Apollo thirteen`)
//! 3. Lower-case and trim
//! 4. Drop common prefixes (`the `, `live `)
//! 5. Strip accents
//! 6. Common replacements (`&` to `and`, `v`/`vs.` to `vs`, `fc ` and commas removed)
//! 7. Dots removed; slashes, symbols and spaces become dashes; apostrophes removed
//!
//! Two normalised titles match when they are equal once dashes are ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static SEQUENCE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\s*[.:\-]\s*(.*)$").unwrap());

static SLASH_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s?/\s?").unwrap());

static NON_WORD_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9\s']+").unwrap());

/// `Girls' Night`: an apostrophe ending a word
static TRAILING_APOSTROPHE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w' ").unwrap());

static RATING_POSTFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\((?:un)?rated\)").unwrap());

static LEADING_COLONS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:+(.*)$").unwrap());

const UNITS: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const STANDARD_PREFIXES: &[&str] = &["the ", "live "];
const TXLOG_PREFIXES: &[&str] = &["the ", "live ", "film:", "new:", "live:"];

/// Normaliser for `DEFAULT` titles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleNormalizer {
    prefixes: &'static [&'static str],
    repeat_prefixes: bool,
}

impl Default for TitleNormalizer {
    fn default() -> Self {
        Self::standard()
    }
}

impl TitleNormalizer {
    /// Programme-guide rules: `the ` and `live ` removed once each
    pub fn standard() -> Self {
        Self {
            prefixes: STANDARD_PREFIXES,
            repeat_prefixes: false,
        }
    }

    /// Transmission-log rules: also `film:`, `new:`, `live:`, removed repeatedly
    pub fn txlog() -> Self {
        Self {
            prefixes: TXLOG_PREFIXES,
            repeat_prefixes: true,
        }
    }

    /// Steps 1-5: sequence prefix, numbers, case, common prefixes, accents
    pub fn normalize_without_replacing(&self, title: &str) -> String {
        let lowered = expand_numbers(remove_sequence_prefix(title))
            .trim()
            .to_lowercase();
        strip_accents(&self.remove_common_prefixes(&lowered))
    }

    /// Full normalisation
    pub fn normalize(&self, title: &str) -> String {
        replace_special_chars(&self.normalize_without_replacing(title))
    }

    /// Whether two `DEFAULT` titles are the same programme title
    ///
    /// A title that normalises to nothing but separators never matches.
    pub fn titles_match(&self, subject: &str, candidate: &str) -> bool {
        let subject_normalized = self.normalize(subject);
        let candidate_normalized = self.normalize(candidate);

        let subject_bare = without_dashes(&subject_normalized);
        let candidate_bare = without_dashes(&candidate_normalized);
        if subject_bare.is_empty() || candidate_bare.is_empty() {
            return false;
        }

        if let Some(pattern) = self.apostrophe_pattern(subject) {
            return pattern.is_match(&candidate_normalized);
        }
        if let Some(pattern) = self.apostrophe_pattern(candidate) {
            return pattern.is_match(&subject_normalized);
        }

        subject_bare == candidate_bare
    }

    /// Whether the text before a colon on one side matches the other side
    pub fn colon_prefix_match(&self, subject: &str, candidate: &str) -> bool {
        let subject = self.normalize_without_replacing(strip_leading_colons(subject));
        let candidate = self.normalize_without_replacing(strip_leading_colons(candidate));

        let (lhs, rhs) = match (subject.find(':'), candidate.find(':')) {
            (Some(i), Some(j)) => (&subject[..i], &candidate[..j]),
            (Some(i), None) if subject.len() > candidate.len() => {
                (&subject[..i], candidate.as_str())
            }
            (_, Some(j)) => (subject.as_str(), &candidate[..j]),
            _ => return false,
        };
        let (lhs, rhs) = (lhs.trim(), rhs.trim());
        !lhs.is_empty() && lhs == rhs
    }

    fn remove_common_prefixes(&self, title: &str) -> String {
        let mut remaining = title.to_string();
        if self.repeat_prefixes {
            while let Some(prefix) = self
                .prefixes
                .iter()
                .find(|p| remaining.len() > p.len() && remaining.starts_with(*p))
            {
                remaining = remaining[prefix.len()..].trim().to_string();
            }
        } else {
            for prefix in self.prefixes {
                if remaining.len() > prefix.len() && remaining.starts_with(prefix) {
                    remaining = remaining[prefix.len()..].to_string();
                }
            }
        }
        remaining
    }

    /// Anchored pattern letting `word' ` stand for a longer word on the other side
    ///
    /// `maccabi tel-aviv v d' kiev` matches `maccabi-tel-aviv-vs-dynamo-kiev`.
    fn apostrophe_pattern(&self, title: &str) -> Option<Regex> {
        if !TRAILING_APOSTROPHE.is_match(title) {
            return None;
        }
        let lowered = expand_numbers(remove_sequence_prefix(title)).to_lowercase();
        let unaccented = strip_accents(&self.remove_common_prefixes(&lowered));
        let replaced = apply_common_replacements(&unaccented);
        let dashed = NON_WORD_RUN.replace_all(&replaced, "-");

        let pieces: Vec<String> = dashed
            .split("' ")
            .map(|piece| regex::escape(&piece.replace(' ', "-")))
            .collect();
        Regex::new(&format!(r"^(?:{})$", pieces.join(r"(?:\w+|\W*)-"))).ok()
    }
}

/// Drop a leading `N.`, `N:` or `N -` sequence prefix
pub fn remove_sequence_prefix(title: &str) -> &str {
    SEQUENCE_PREFIX
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(title)
}

/// Spell out space-separated numbers below one hundred
///
/// Larger numbers, years among them, are left as digits.
pub fn expand_numbers(title: &str) -> String {
    title
        .split(' ')
        .map(|word| spell_number(word).unwrap_or_else(|| word.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `word` in words, when it is a plain number below 100
pub(crate) fn spell_number(word: &str) -> Option<String> {
    if word.is_empty()
        || !word.bytes().all(|b| b.is_ascii_digit())
        || (word.len() > 1 && word.starts_with('0'))
    {
        return None;
    }
    let n: usize = word.parse().ok()?;
    match n {
        0..=19 => Some(UNITS[n].to_string()),
        20..=99 if n % 10 == 0 => Some(TENS[n / 10].to_string()),
        20..=99 => Some(format!("{} {}", TENS[n / 10], UNITS[n % 10])),
        _ => None,
    }
}

/// Remove combining marks after canonical decomposition
pub fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Drop `(Rated)`/`(Unrated)` and a `(year)` postfix for the item's own year
pub fn remove_postfixes(title: &str, year: Option<i32>) -> String {
    let without_year = match year {
        Some(year) => title.replace(&format!("({year})"), ""),
        None => title.to_string(),
    };
    RATING_POSTFIX.replace_all(&without_year, "").trim().to_string()
}

fn strip_leading_colons(title: &str) -> &str {
    LEADING_COLONS
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(title)
}

fn apply_common_replacements(title: &str) -> String {
    title
        .replace(" vs. ", " vs ")
        .replace(" v ", " vs ")
        .replace(" & ", " and ")
        .replace("fc ", "")
        .replace(',', "")
}

fn replace_special_chars(title: &str) -> String {
    let replaced = apply_common_replacements(title).replace('.', "");
    let replaced = SLASH_SEPARATOR.replace_all(&replaced, "-");
    let replaced = NON_WORD_RUN.replace_all(&replaced, "-");
    replaced.replace('\'', "").replace(' ', "-")
}

fn without_dashes(text: &str) -> String {
    text.chars().filter(|c| *c != '-').collect()
}
