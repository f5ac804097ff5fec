//! Carrier lookups against the public FMCSA sites.

pub mod safer;
pub mod sms;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::{CarrierRecord, Config, McNumber, UsdotNumber};

pub(crate) const USER_AGENT: &str = "Mozilla/5.0";

/// Error from a single lookup call. Recorded per identifier, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    Rejected { status: u16 },
    /// Connection failure, timeout, or unreadable body.
    #[error("{0}")]
    Transport(String),
    /// The body could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

impl LookupError {
    pub fn status(&self) -> Option<u16> {
        match self {
            LookupError::Rejected { status } => Some(*status),
            _ => None,
        }
    }
}

/// Resolves MC numbers and fetches carrier details.
pub trait CarrierLookup: Send + Sync {
    /// Resolve an MC number to its USDOT number.
    ///
    /// `Ok(None)` means the lookup page was fetched but carried no USDOT number.
    fn resolve_usdot<'a>(
        &'a self,
        mc: &'a McNumber,
    ) -> Pin<Box<dyn Future<Output = Result<Option<UsdotNumber>, LookupError>> + Send + 'a>>;

    /// Fetch the registration details for a USDOT number.
    fn carrier_details<'a>(
        &'a self,
        usdot: &'a UsdotNumber,
    ) -> Pin<Box<dyn Future<Output = Result<CarrierRecord, LookupError>> + Send + 'a>>;
}

/// Live lookups: SAFER company snapshot and SMS carrier registration.
pub struct FmcsaLookup {
    client: reqwest::Client,
    lookup_timeout: Duration,
    detail_timeout: Duration,
}

impl FmcsaLookup {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            lookup_timeout: config.lookup_timeout(),
            detail_timeout: config.detail_timeout(),
        }
    }
}

impl CarrierLookup for FmcsaLookup {
    fn resolve_usdot<'a>(
        &'a self,
        mc: &'a McNumber,
    ) -> Pin<Box<dyn Future<Output = Result<Option<UsdotNumber>, LookupError>> + Send + 'a>> {
        Box::pin(safer::resolve_usdot(&self.client, mc, self.lookup_timeout))
    }

    fn carrier_details<'a>(
        &'a self,
        usdot: &'a UsdotNumber,
    ) -> Pin<Box<dyn Future<Output = Result<CarrierRecord, LookupError>> + Send + 'a>> {
        Box::pin(sms::carrier_details(&self.client, usdot, self.detail_timeout))
    }
}

/// GET `url` with the fixed header set and return the body text on 2xx.
pub(crate) async fn fetch_html(
    client: &reqwest::Client,
    url: &str,
    accept: &str,
    referer: &str,
    timeout: Duration,
) -> Result<String, LookupError> {
    debug!(%url, timeout_secs = timeout.as_secs(), "lookup request");
    let resp = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .header("Referer", referer)
        .header("Accept", accept)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| LookupError::Transport(e.to_string()))?;

    check_lookup_response(&resp)?;

    resp.text()
        .await
        .map_err(|e| LookupError::Transport(e.to_string()))
}

/// `Err(Rejected)` for any non-success status.
pub fn check_lookup_response(resp: &reqwest::Response) -> Result<(), LookupError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(LookupError::Rejected {
            status: status.as_u16(),
        })
    }
}
