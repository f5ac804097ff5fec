use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::McNumber;

/// The two register sections that list newly granted authority.
///
/// Each section is bounded by a literal start phrase and end phrase. Matching
/// is case-insensitive and spans lines; the region is the shortest text
/// between the first start marker and the following end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterSection {
    /// "CERTIFICATES, PERMITS & LICENSES FILED AFTER JANUARY 1, 1995"
    /// up to "CERTIFICATES OF REGISTRATION".
    PermitsAndLicenses,
    /// "CERTIFICATES OF REGISTRATION" up to "DISMISSALS Decisions".
    Registrations,
}

impl RegisterSection {
    pub const ALL: [RegisterSection; 2] = [Self::PermitsAndLicenses, Self::Registrations];

    pub fn title(self) -> &'static str {
        match self {
            Self::PermitsAndLicenses => "Certificates, permits & licenses",
            Self::Registrations => "Certificates of registration",
        }
    }

    fn pattern(self) -> &'static Regex {
        static PERMITS_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?is)CERTIFICATES, PERMITS & LICENSES FILED AFTER JANUARY 1, 1995\s+NUMBER(.*?)CERTIFICATES OF REGISTRATION\s+NUMBER",
            )
            .unwrap()
        });
        static REGISTRATIONS_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?is)CERTIFICATES OF REGISTRATION\s+NUMBER(.*?)DISMISSALS\s+Decisions")
                .unwrap()
        });

        match self {
            Self::PermitsAndLicenses => &PERMITS_RE,
            Self::Registrations => &REGISTRATIONS_RE,
        }
    }
}

// Greedy over the whole digit run; runs outside 4..=8 digits are discarded,
// so a ninth digit disqualifies the token while trailing letters do not.
static MC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"MC-([0-9]+)").unwrap());
static MC_EXACT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^MC-[0-9]{4,8}$").unwrap());

pub(crate) fn is_mc_number(raw: &str) -> bool {
    MC_EXACT_RE.is_match(raw)
}

/// Return the text of a section, or `None` if either marker is missing.
pub fn section_text(text: &str, section: RegisterSection) -> Option<&str> {
    section
        .pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// All MC numbers inside one section, in document order (duplicates kept).
pub fn scan_region(text: &str, section: RegisterSection) -> Vec<McNumber> {
    let Some(region) = section_text(text, section) else {
        return Vec::new();
    };
    MC_RE
        .captures_iter(region)
        .filter(|caps| (4..=8).contains(&caps[1].len()))
        .map(|caps| McNumber(caps[0].to_string()))
        .collect()
}

/// Scan both sections independently and concatenate the results, first
/// section first.
pub fn scan_sections(text: &str) -> Vec<McNumber> {
    RegisterSection::ALL
        .iter()
        .flat_map(|&section| scan_region(text, section))
        .collect()
}

/// Remove duplicates and sort ascending.
///
/// Ordering is by string, not by numeric value: `MC-123456` sorts before
/// `MC-2345`.
pub fn dedup_sorted(mcs: Vec<McNumber>) -> Vec<McNumber> {
    mcs.into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Find the unique, sorted MC numbers listed in a register's text.
pub fn find_mc_numbers(text: &str) -> Vec<McNumber> {
    dedup_sorted(scan_sections(text))
}
