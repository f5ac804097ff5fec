use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod document;
pub mod lookup;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod pipeline;
pub mod rate_limit;
pub mod report;
pub mod section;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend, extract_text, join_pages};
pub use document::{LiRegisterSource, RegisterSource, register_url};
pub use lookup::{CarrierLookup, FmcsaLookup, LookupError};
pub use pipeline::Pipeline;
pub use rate_limit::{DetailPacer, PacingMode};
pub use report::ReportJson;
pub use section::{dedup_sorted, find_mc_numbers, scan_sections};

/// Date of a daily register, as the `YYYYMMDD` token used in the document URL.
///
/// Only emptiness is checked; the token is substituted into the URL as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateToken(String);

impl DateToken {
    pub fn new(raw: &str) -> Result<Self, PipelineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::MissingDate);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An MC (motor carrier authority) number such as `MC-123456`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct McNumber(String);

impl McNumber {
    /// Accepts exactly `MC-` followed by 4 to 8 ASCII digits.
    pub fn parse(raw: &str) -> Option<Self> {
        section::is_mc_number(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for McNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A USDOT number resolved from an MC number (4 to 8 digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsdotNumber(String);

impl UsdotNumber {
    pub fn parse(raw: &str) -> Option<Self> {
        let len = raw.len();
        ((4..=8).contains(&len) && raw.bytes().all(|b| b.is_ascii_digit()))
            .then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UsdotNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Carrier details scraped from the SMS registration page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierRecord {
    pub usdot: UsdotNumber,
    /// Label (colon stripped) → value (line breaks stripped).
    pub info: BTreeMap<String, String>,
    /// Set when the page was fetched but had no carrier info list.
    pub note: Option<String>,
}

/// Which per-identifier stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The MC number could not be resolved to a USDOT number.
    Lookup,
    /// The registration page could not be fetched.
    Scrape,
}

/// A per-identifier failure. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    pub details: Option<String>,
    pub status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarrierDetails {
    Record(CarrierRecord),
    Failed(Failure),
}

/// Outcome of processing a single MC number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierOutcome {
    pub mc: McNumber,
    pub usdot: Option<UsdotNumber>,
    pub details: CarrierDetails,
}

impl CarrierOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.details, CarrierDetails::Record(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match &self.details {
            CarrierDetails::Failed(f) => Some(f),
            CarrierDetails::Record(_) => None,
        }
    }
}

/// Result of a complete pipeline run for one register date.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub date: DateToken,
    pub document_url: String,
    pub total_mc_numbers: usize,
    pub outcomes: Vec<CarrierOutcome>,
}

/// Outcome counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeSummary {
    pub resolved: usize,
    pub lookup_failed: usize,
    pub scrape_failed: usize,
}

impl PipelineResult {
    pub fn summary(&self) -> OutcomeSummary {
        let mut summary = OutcomeSummary::default();
        for outcome in &self.outcomes {
            match outcome.failure().map(|f| f.kind) {
                None => summary.resolved += 1,
                Some(FailureKind::Lookup) => summary.lookup_failed += 1,
                Some(FailureKind::Scrape) => summary.scrape_failed += 1,
            }
        }
        summary
    }
}

/// Progress events emitted during a pipeline run.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    DocumentFetched {
        url: String,
        bytes: usize,
    },
    TextExtracted {
        pages: usize,
        chars: usize,
    },
    IdentifiersFound {
        total: usize,
    },
    Resolving {
        index: usize,
        total: usize,
        mc: McNumber,
    },
    /// Waiting before the registration page fetch.
    Pacing {
        index: usize,
        wait: Duration,
    },
    Completed {
        index: usize,
        total: usize,
        outcome: Box<CarrierOutcome>,
    },
}

/// Errors that end a run before any identifier is processed.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing date parameter in format YYYYMMDD")]
    MissingDate,
    #[error("PDF not available. Status Code: {status}. URL: {url}")]
    DocumentUnavailable { status: u16, url: String },
    #[error("PDF download failed. URL: {url}: {message}")]
    DocumentFetch { url: String, message: String },
    #[error("PDF could not be read: {0}")]
    DocumentFormat(#[from] BackendError),
}

/// Configuration for a pipeline run.
#[derive(Clone)]
pub struct Config {
    /// Timeout for the SAFER USDOT lookup.
    pub lookup_timeout_secs: u64,
    /// Timeout for the SMS registration page.
    pub detail_timeout_secs: u64,
    /// Timeout for the register PDF download. `None` waits indefinitely.
    pub document_timeout_secs: Option<u64>,
    /// Delay before each registration page fetch.
    pub detail_delay_ms: u64,
    pub pacing: PacingMode,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("lookup_timeout_secs", &self.lookup_timeout_secs)
            .field("detail_timeout_secs", &self.detail_timeout_secs)
            .field(
                "document_timeout_secs",
                &self
                    .document_timeout_secs
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unbounded".into()),
            )
            .field("detail_delay_ms", &self.detail_delay_ms)
            .field("pacing", &self.pacing)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lookup_timeout_secs: 10,
            detail_timeout_secs: 15,
            document_timeout_secs: None,
            detail_delay_ms: 3000,
            pacing: PacingMode::Fixed,
        }
    }
}

impl Config {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }

    pub fn document_timeout(&self) -> Option<Duration> {
        self.document_timeout_secs.map(Duration::from_secs)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }
}
