//! Download of the daily L&I register PDF.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::{DateToken, PipelineError};

const REGISTER_URL_PREFIX: &str = "https://li-public.fmcsa.dot.gov/lihtml/rptspdf/LI_REGISTER";
const REGISTER_REFERER: &str = "https://li-public.fmcsa.dot.gov/";

/// URL of the register PDF for a given date.
pub fn register_url(date: &DateToken) -> String {
    format!("{REGISTER_URL_PREFIX}{}.PDF", date.as_str())
}

/// A source of register documents.
pub trait RegisterSource: Send + Sync {
    /// The URL the document for `date` is fetched from.
    fn document_url(&self, date: &DateToken) -> String {
        register_url(date)
    }

    /// Fetch the raw PDF bytes for `date`. A single attempt, no retry.
    fn fetch<'a>(
        &'a self,
        date: &'a DateToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, PipelineError>> + Send + 'a>>;
}

/// Live source backed by li-public.fmcsa.dot.gov.
pub struct LiRegisterSource {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl LiRegisterSource {
    pub fn new(client: reqwest::Client, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }
}

impl RegisterSource for LiRegisterSource {
    fn fetch<'a>(
        &'a self,
        date: &'a DateToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, PipelineError>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.document_url(date);
            debug!(%url, "fetching register document");

            let mut request = self
                .client
                .get(&url)
                .header("User-Agent", crate::lookup::USER_AGENT)
                .header("Accept", "application/pdf")
                .header("Referer", REGISTER_REFERER);
            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }

            let resp = request
                .send()
                .await
                .map_err(|e| PipelineError::DocumentFetch {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

            check_document_response(&resp, &url)?;

            let bytes = resp
                .bytes()
                .await
                .map_err(|e| PipelineError::DocumentFetch {
                    url: url.clone(),
                    message: e.to_string(),
                })?;
            Ok(bytes.to_vec())
        })
    }
}

/// Any non-2xx status means the register is unavailable for that date.
pub fn check_document_response(resp: &reqwest::Response, url: &str) -> Result<(), PipelineError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(PipelineError::DocumentUnavailable {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}
