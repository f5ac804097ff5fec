//! Mock collaborators for testing the pipeline without network or PDF access.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::{BackendError, PdfBackend};
use crate::document::RegisterSource;
use crate::lookup::{CarrierLookup, LookupError};
use crate::{CarrierRecord, DateToken, McNumber, PipelineError, UsdotNumber};

/// A [`PdfBackend`] that ignores the bytes and returns fixed page texts.
pub struct TextBackend {
    pages: Result<Vec<String>, String>,
}

impl TextBackend {
    pub fn pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: Ok(pages.into_iter().map(Into::into).collect()),
        }
    }

    /// Every document fails to open with `message`.
    pub fn unreadable(message: &str) -> Self {
        Self {
            pages: Err(message.to_string()),
        }
    }
}

impl PdfBackend for TextBackend {
    fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, BackendError> {
        self.pages.clone().map_err(BackendError::OpenError)
    }
}

/// A [`RegisterSource`] returning canned bytes, a fixed HTTP status, or a
/// transport failure.
pub struct MockRegister {
    response: RegisterResponse,
    fetch_count: AtomicUsize,
}

#[derive(Clone)]
enum RegisterResponse {
    Bytes(Vec<u8>),
    Status(u16),
    Transport(String),
}

impl MockRegister {
    fn with_response(response: RegisterResponse) -> Self {
        Self {
            response,
            fetch_count: AtomicUsize::new(0),
        }
    }

    pub fn ok(bytes: &[u8]) -> Self {
        Self::with_response(RegisterResponse::Bytes(bytes.to_vec()))
    }

    pub fn unavailable(status: u16) -> Self {
        Self::with_response(RegisterResponse::Status(status))
    }

    /// The download never completes, e.g. connection refused or timed out.
    pub fn transport(message: &str) -> Self {
        Self::with_response(RegisterResponse::Transport(message.to_string()))
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl RegisterSource for MockRegister {
    fn fetch<'a>(
        &'a self,
        date: &'a DateToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, PipelineError>> + Send + 'a>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let response = self.response.clone();
        let url = self.document_url(date);
        Box::pin(async move {
            match response {
                RegisterResponse::Bytes(bytes) => Ok(bytes),
                RegisterResponse::Status(status) => {
                    Err(PipelineError::DocumentUnavailable { status, url })
                }
                RegisterResponse::Transport(message) => {
                    Err(PipelineError::DocumentFetch { url, message })
                }
            }
        })
    }
}

/// A hand-rolled [`CarrierLookup`] with per-identifier canned answers.
///
/// Unknown MC numbers resolve to no USDOT number; unknown USDOT numbers yield
/// an empty record. Every call is logged in order.
#[derive(Default)]
pub struct MockLookup {
    usdots: HashMap<String, Result<Option<UsdotNumber>, LookupError>>,
    details: HashMap<String, Result<BTreeMap<String, String>, LookupError>>,
    resolve_calls: Mutex<Vec<String>>,
    detail_calls: Mutex<Vec<(String, tokio::time::Instant)>>,
}

impl MockLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_usdot(mut self, mc: &str, usdot: &str) -> Self {
        self.usdots
            .insert(mc.to_string(), Ok(UsdotNumber::parse(usdot)));
        self
    }

    pub fn with_resolve_error(mut self, mc: &str, error: LookupError) -> Self {
        self.usdots.insert(mc.to_string(), Err(error));
        self
    }

    pub fn with_details(mut self, usdot: &str, info: &[(&str, &str)]) -> Self {
        let map = info
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.details.insert(usdot.to_string(), Ok(map));
        self
    }

    pub fn with_details_error(mut self, usdot: &str, error: LookupError) -> Self {
        self.details.insert(usdot.to_string(), Err(error));
        self
    }

    /// MC numbers passed to `resolve_usdot`, in call order.
    pub fn resolve_calls(&self) -> Vec<String> {
        self.resolve_calls.lock().unwrap().clone()
    }

    /// USDOT numbers passed to `carrier_details`, in call order.
    pub fn detail_calls(&self) -> Vec<String> {
        self.detail_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(usdot, _)| usdot.clone())
            .collect()
    }

    /// Clock readings (tokio time) at each `carrier_details` call.
    pub fn detail_call_times(&self) -> Vec<tokio::time::Instant> {
        self.detail_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.resolve_calls.lock().unwrap().len() + self.detail_calls.lock().unwrap().len()
    }
}

impl CarrierLookup for MockLookup {
    fn resolve_usdot<'a>(
        &'a self,
        mc: &'a McNumber,
    ) -> Pin<Box<dyn Future<Output = Result<Option<UsdotNumber>, LookupError>> + Send + 'a>> {
        self.resolve_calls
            .lock()
            .unwrap()
            .push(mc.as_str().to_string());
        let response = self.usdots.get(mc.as_str()).cloned().unwrap_or(Ok(None));
        Box::pin(async move { response })
    }

    fn carrier_details<'a>(
        &'a self,
        usdot: &'a UsdotNumber,
    ) -> Pin<Box<dyn Future<Output = Result<CarrierRecord, LookupError>> + Send + 'a>> {
        self.detail_calls
            .lock()
            .unwrap()
            .push((usdot.as_str().to_string(), tokio::time::Instant::now()));
        let response = self
            .details
            .get(usdot.as_str())
            .cloned()
            .unwrap_or_else(|| Ok(BTreeMap::new()));
        let usdot = usdot.clone();
        Box::pin(async move {
            response.map(|info| CarrierRecord {
                usdot,
                info,
                note: None,
            })
        })
    }
}
