use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{BackendError, PdfBackend, join_pages};
use crate::document::{LiRegisterSource, RegisterSource};
use crate::lookup::{CarrierLookup, FmcsaLookup, LookupError};
use crate::rate_limit::DetailPacer;
use crate::section::find_mc_numbers;
use crate::{
    CarrierDetails, CarrierOutcome, Config, DateToken, Failure, FailureKind, McNumber,
    PipelineError, PipelineEvent, PipelineResult, UsdotNumber,
};

/// Message recorded when an MC number could not be resolved.
pub const USDOT_NOT_FOUND: &str = "USDOT not found or error occurred";

/// The register enrichment pipeline.
///
/// Fetch the register PDF, extract its text, collect the MC numbers listed in
/// the two authority sections, then resolve and enrich each one in ascending
/// order. Identifiers are processed strictly one after another; a failure for
/// one identifier is recorded in its outcome and the batch carries on.
pub struct Pipeline {
    source: Arc<dyn RegisterSource>,
    backend: Arc<dyn PdfBackend>,
    lookup: Arc<dyn CarrierLookup>,
    config: Config,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn RegisterSource>,
        backend: Arc<dyn PdfBackend>,
        lookup: Arc<dyn CarrierLookup>,
        config: Config,
    ) -> Self {
        Self {
            source,
            backend,
            lookup,
            config,
        }
    }

    /// Pipeline against the live FMCSA sites, sharing one HTTP client.
    pub fn live(config: Config, backend: Arc<dyn PdfBackend>) -> Self {
        let client = reqwest::Client::new();
        let source = LiRegisterSource::new(client.clone(), config.document_timeout());
        let lookup = FmcsaLookup::new(client, &config);
        Self::new(Arc::new(source), backend, Arc::new(lookup), config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the pipeline for the register of `date`.
    ///
    /// Returns an error only if the date is empty or the register could not be
    /// downloaded or read; per-identifier failures are part of the result.
    pub async fn run(
        &self,
        date: &str,
        progress: &(dyn Fn(PipelineEvent) + Send + Sync),
    ) -> Result<PipelineResult, PipelineError> {
        let date = DateToken::new(date)?;
        let document_url = self.source.document_url(&date);

        info!(%date, url = %document_url, "fetching register");
        let bytes = self.source.fetch(&date).await?;
        progress(PipelineEvent::DocumentFetched {
            url: document_url.clone(),
            bytes: bytes.len(),
        });

        let pages = self.extract_pages(bytes).await?;
        let text = join_pages(&pages);
        progress(PipelineEvent::TextExtracted {
            pages: pages.len(),
            chars: text.len(),
        });

        let mc_numbers = find_mc_numbers(&text);
        let total = mc_numbers.len();
        info!(%date, total, "MC numbers found");
        progress(PipelineEvent::IdentifiersFound { total });

        let pacer = DetailPacer::new(self.config.pacing, self.config.detail_delay());
        let mut outcomes = Vec::with_capacity(total);
        for (index, mc) in mc_numbers.into_iter().enumerate() {
            progress(PipelineEvent::Resolving {
                index,
                total,
                mc: mc.clone(),
            });
            let outcome = self.process_identifier(mc, &pacer, index, progress).await;
            progress(PipelineEvent::Completed {
                index,
                total,
                outcome: Box::new(outcome.clone()),
            });
            outcomes.push(outcome);
        }

        Ok(PipelineResult {
            date,
            document_url,
            total_mc_numbers: total,
            outcomes,
        })
    }

    /// Resolve one MC number and, if it resolves, fetch its registration.
    ///
    /// The pacer is only consulted on the path that reaches the registration
    /// fetch.
    pub async fn process_identifier(
        &self,
        mc: McNumber,
        pacer: &DetailPacer,
        index: usize,
        progress: &(dyn Fn(PipelineEvent) + Send + Sync),
    ) -> CarrierOutcome {
        let usdot = match self.lookup.resolve_usdot(&mc).await {
            Ok(Some(usdot)) => usdot,
            Ok(None) => {
                let detail = format!("No USDOT Number in lookup response for MC: {mc}");
                return lookup_failure(mc, detail, None);
            }
            Err(LookupError::Rejected { status }) => {
                let detail = format!("FMCSA rejected the request for MC: {mc}");
                return lookup_failure(mc, detail, Some(status));
            }
            Err(e) => {
                let detail = format!("Exception while fetching USDOT for MC: {mc}: {e}");
                return lookup_failure(mc, detail, None);
            }
        };
        debug!(%mc, %usdot, "resolved");

        progress(PipelineEvent::Pacing {
            index,
            wait: pacer.delay(),
        });
        pacer.wait().await;

        let details = match self.lookup.carrier_details(&usdot).await {
            Ok(record) => CarrierDetails::Record(record),
            Err(e) => {
                warn!(%mc, %usdot, error = %e, "registration fetch failed");
                CarrierDetails::Failed(scrape_failure(&usdot, e))
            }
        };

        CarrierOutcome {
            mc,
            usdot: Some(usdot),
            details,
        }
    }

    // PDF decoding is blocking work
    async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<String>, BackendError> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || backend.extract_pages(&bytes))
            .await
            .map_err(|e| BackendError::Task(e.to_string()))?
    }
}

fn lookup_failure(mc: McNumber, detail: String, status: Option<u16>) -> CarrierOutcome {
    warn!(%mc, %detail, "USDOT lookup failed");
    CarrierOutcome {
        mc,
        usdot: None,
        details: CarrierDetails::Failed(Failure {
            kind: FailureKind::Lookup,
            message: USDOT_NOT_FOUND.to_string(),
            details: Some(detail),
            status,
        }),
    }
}

fn scrape_failure(usdot: &UsdotNumber, error: LookupError) -> Failure {
    match error {
        LookupError::Rejected { status } => Failure {
            kind: FailureKind::Scrape,
            message: format!("Failed to fetch page for USDOT: {usdot}"),
            details: None,
            status: Some(status),
        },
        other => Failure {
            kind: FailureKind::Scrape,
            message: format!("Exception during scraping for USDOT: {usdot}"),
            details: Some(other.to_string()),
            status: None,
        },
    }
}
