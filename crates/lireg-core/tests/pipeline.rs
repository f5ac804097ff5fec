//! Integration tests for [`Pipeline`] with mocked register, PDF backend and
//! carrier lookups. No network access.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use lireg_core::mock::{MockLookup, MockRegister, TextBackend};
use lireg_core::pipeline::USDOT_NOT_FOUND;
use lireg_core::{
    CarrierDetails, Config, FailureKind, LookupError, Pipeline, PipelineError, PipelineEvent,
};

const REGISTER: &str = "\
FMCSA REGISTER
CERTIFICATES, PERMITS & LICENSES FILED AFTER JANUARY 1, 1995
NUMBER TITLE
MC-300000 GAMMA HAULING LLC
MC-200000 BETA FREIGHT INC
CERTIFICATES OF REGISTRATION
NUMBER TITLE
MC-100000 ALPHA LOGISTICS
MC-200000 BETA FREIGHT INC
DISMISSALS
Decisions and notices
MC-999999 DISMISSED CARRIER
";

fn pipeline(
    register: Arc<MockRegister>,
    backend: TextBackend,
    lookup: Arc<MockLookup>,
    config: Config,
) -> Pipeline {
    Pipeline::new(register, Arc::new(backend), lookup, config)
}

fn no_progress(_: PipelineEvent) {}

#[tokio::test(start_paused = true)]
async fn resolves_every_number_in_ascending_order() {
    let register = Arc::new(MockRegister::ok(b"%PDF"));
    let lookup = Arc::new(
        MockLookup::new()
            .with_usdot("MC-100000", "1111111")
            .with_usdot("MC-200000", "2222222")
            .with_usdot("MC-300000", "3333333")
            .with_details("1111111", &[("Legal Name", "ALPHA LOGISTICS")]),
    );
    let p = pipeline(
        register.clone(),
        TextBackend::pages([REGISTER]),
        lookup.clone(),
        Config::default(),
    );

    let result = p.run("20240105", &no_progress).await.unwrap();

    assert_eq!(result.date.as_str(), "20240105");
    assert!(result.document_url.ends_with("LI_REGISTER20240105.PDF"));
    assert_eq!(result.total_mc_numbers, 3);
    let mcs: Vec<&str> = result.outcomes.iter().map(|o| o.mc.as_str()).collect();
    assert_eq!(mcs, ["MC-100000", "MC-200000", "MC-300000"]);
    assert_eq!(lookup.resolve_calls(), ["MC-100000", "MC-200000", "MC-300000"]);
    assert_eq!(lookup.detail_calls(), ["1111111", "2222222", "3333333"]);
    assert_eq!(register.fetch_count(), 1);

    match &result.outcomes[0].details {
        CarrierDetails::Record(record) => {
            assert_eq!(record.usdot.as_str(), "1111111");
            assert_eq!(record.info["Legal Name"], "ALPHA LOGISTICS");
        }
        other => panic!("expected a record, got {other:?}"),
    }
    assert!(result.outcomes.iter().all(|o| o.is_success()));
}

#[tokio::test(start_paused = true)]
async fn empty_register_makes_no_lookups() {
    let lookup = Arc::new(MockLookup::new());
    let p = pipeline(
        Arc::new(MockRegister::ok(b"%PDF")),
        TextBackend::pages(["nothing to see here", ""]),
        lookup.clone(),
        Config::default(),
    );

    let result = p.run("20240105", &no_progress).await.unwrap();

    assert_eq!(result.total_mc_numbers, 0);
    assert!(result.outcomes.is_empty());
    assert_eq!(lookup.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failures_are_recorded_and_the_batch_continues() {
    let lookup = Arc::new(
        MockLookup::new()
            .with_resolve_error("MC-100000", LookupError::Rejected { status: 403 })
            // MC-200000 is unknown: the lookup page carries no USDOT number
            .with_usdot("MC-300000", "3333333")
            .with_details_error("3333333", LookupError::Rejected { status: 500 }),
    );
    let p = pipeline(
        Arc::new(MockRegister::ok(b"%PDF")),
        TextBackend::pages([REGISTER]),
        lookup.clone(),
        Config::default(),
    );

    let result = p.run("20240105", &no_progress).await.unwrap();
    assert_eq!(result.outcomes.len(), 3);

    let rejected = result.outcomes[0].failure().unwrap();
    assert_eq!(rejected.kind, FailureKind::Lookup);
    assert_eq!(rejected.message, USDOT_NOT_FOUND);
    assert_eq!(rejected.status, Some(403));
    assert!(result.outcomes[0].usdot.is_none());

    let missing = result.outcomes[1].failure().unwrap();
    assert_eq!(missing.kind, FailureKind::Lookup);
    assert_eq!(
        missing.details.as_deref(),
        Some("No USDOT Number in lookup response for MC: MC-200000")
    );

    let scrape = result.outcomes[2].failure().unwrap();
    assert_eq!(scrape.kind, FailureKind::Scrape);
    assert_eq!(scrape.message, "Failed to fetch page for USDOT: 3333333");
    assert_eq!(scrape.status, Some(500));
    assert_eq!(
        result.outcomes[2].usdot.as_ref().map(|u| u.as_str()),
        Some("3333333")
    );

    let summary = result.summary();
    assert_eq!(summary.resolved, 0);
    assert_eq!(summary.lookup_failed, 2);
    assert_eq!(summary.scrape_failed, 1);

    // Only the resolved number reached the registration stage.
    assert_eq!(lookup.detail_calls(), ["3333333"]);
}

#[tokio::test(start_paused = true)]
async fn transport_errors_are_recorded_without_status() {
    let lookup = Arc::new(
        MockLookup::new()
            .with_resolve_error("MC-100000", LookupError::Transport("operation timed out".into()))
            .with_usdot("MC-300000", "3333333")
            .with_details_error("3333333", LookupError::Transport("connection reset".into())),
    );
    let p = pipeline(
        Arc::new(MockRegister::ok(b"%PDF")),
        TextBackend::pages([REGISTER]),
        lookup.clone(),
        Config::default(),
    );

    let result = p.run("20240105", &no_progress).await.unwrap();
    assert_eq!(result.outcomes.len(), 3);

    let lookup_failure = result.outcomes[0].failure().unwrap();
    assert_eq!(lookup_failure.kind, FailureKind::Lookup);
    assert_eq!(lookup_failure.message, USDOT_NOT_FOUND);
    assert_eq!(
        lookup_failure.details.as_deref(),
        Some("Exception while fetching USDOT for MC: MC-100000: operation timed out")
    );
    assert_eq!(lookup_failure.status, None);
    assert!(result.outcomes[0].usdot.is_none());

    let scrape_failure = result.outcomes[2].failure().unwrap();
    assert_eq!(scrape_failure.kind, FailureKind::Scrape);
    assert_eq!(
        scrape_failure.message,
        "Exception during scraping for USDOT: 3333333"
    );
    assert_eq!(scrape_failure.details.as_deref(), Some("connection reset"));
    assert_eq!(scrape_failure.status, None);
    assert_eq!(
        result.outcomes[2].usdot.as_ref().map(|u| u.as_str()),
        Some("3333333")
    );

    assert_eq!(lookup.detail_calls(), ["3333333"]);
}

#[tokio::test]
async fn failed_register_download_is_fatal() {
    let register = Arc::new(MockRegister::transport("connection refused"));
    let lookup = Arc::new(MockLookup::new());
    let p = pipeline(
        register.clone(),
        TextBackend::pages([REGISTER]),
        lookup.clone(),
        Config::default(),
    );

    let err = p.run("20240105", &no_progress).await.unwrap_err();

    match &err {
        PipelineError::DocumentFetch { url, message } => {
            assert!(url.ends_with("LI_REGISTER20240105.PDF"));
            assert_eq!(message, "connection refused");
        }
        other => panic!("expected DocumentFetch, got {other:?}"),
    }
    assert_eq!(register.fetch_count(), 1);
    assert_eq!(lookup.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn delay_precedes_every_registration_fetch() {
    let lookup = Arc::new(
        MockLookup::new()
            .with_usdot("MC-100000", "1111111")
            .with_usdot("MC-300000", "3333333"),
    );
    let p = pipeline(
        Arc::new(MockRegister::ok(b"%PDF")),
        TextBackend::pages([REGISTER]),
        lookup.clone(),
        Config::default(),
    );

    let start = tokio::time::Instant::now();
    p.run("20240105", &no_progress).await.unwrap();

    let times = lookup.detail_call_times();
    assert_eq!(times.len(), 2);
    assert!(times[0] - start >= Duration::from_secs(3));
    // MC-200000 fails its lookup in between and adds no delay.
    let gap = times[1] - times[0];
    assert!(gap >= Duration::from_secs(3) && gap < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn lookup_failures_do_not_wait() {
    let lookup = Arc::new(MockLookup::new());
    let p = pipeline(
        Arc::new(MockRegister::ok(b"%PDF")),
        TextBackend::pages([REGISTER]),
        lookup.clone(),
        Config::default(),
    );

    let start = tokio::time::Instant::now();
    let result = p.run("20240105", &no_progress).await.unwrap();

    assert_eq!(result.outcomes.len(), 3);
    assert!(result.outcomes.iter().all(|o| !o.is_success()));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn unavailable_register_is_fatal() {
    let register = Arc::new(MockRegister::unavailable(404));
    let lookup = Arc::new(MockLookup::new());
    let p = pipeline(
        register.clone(),
        TextBackend::pages([REGISTER]),
        lookup.clone(),
        Config::default(),
    );

    let err = p.run("20240105", &no_progress).await.unwrap_err();

    match &err {
        PipelineError::DocumentUnavailable { status, url } => {
            assert_eq!(*status, 404);
            assert!(url.ends_with("LI_REGISTER20240105.PDF"));
        }
        other => panic!("expected DocumentUnavailable, got {other:?}"),
    }
    assert!(err.to_string().starts_with("PDF not available. Status Code: 404."));
    assert_eq!(register.fetch_count(), 1);
    assert_eq!(lookup.call_count(), 0);
}

#[tokio::test]
async fn unreadable_register_is_fatal() {
    let lookup = Arc::new(MockLookup::new());
    let p = pipeline(
        Arc::new(MockRegister::ok(b"not a pdf")),
        TextBackend::unreadable("no objects found"),
        lookup.clone(),
        Config::default(),
    );

    let err = p.run("20240105", &no_progress).await.unwrap_err();
    assert!(matches!(err, PipelineError::DocumentFormat(_)));
    assert_eq!(lookup.call_count(), 0);
}

#[tokio::test]
async fn missing_date_fetches_nothing() {
    let register = Arc::new(MockRegister::ok(b"%PDF"));
    let p = pipeline(
        register.clone(),
        TextBackend::pages([REGISTER]),
        Arc::new(MockLookup::new()),
        Config::default(),
    );

    let err = p.run("  ", &no_progress).await.unwrap_err();
    assert!(matches!(err, PipelineError::MissingDate));
    assert_eq!(register.fetch_count(), 0);
}

#[tokio::test]
async fn progress_events_follow_the_run() {
    let lookup = Arc::new(MockLookup::new().with_usdot("MC-100000", "1111111"));
    let config = Config {
        detail_delay_ms: 0,
        ..Config::default()
    };
    let p = pipeline(
        Arc::new(MockRegister::ok(b"%PDF")),
        TextBackend::pages([REGISTER]),
        lookup,
        config,
    );

    let events = Mutex::new(Vec::new());
    let record = |e: PipelineEvent| {
        let tag = match e {
            PipelineEvent::DocumentFetched { .. } => "fetched",
            PipelineEvent::TextExtracted { .. } => "extracted",
            PipelineEvent::IdentifiersFound { .. } => "found",
            PipelineEvent::Resolving { .. } => "resolving",
            PipelineEvent::Pacing { .. } => "pacing",
            PipelineEvent::Completed { .. } => "completed",
        };
        events.lock().unwrap().push(tag);
    };
    p.run("20240105", &record).await.unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        [
            "fetched",
            "extracted",
            "found",
            "resolving",
            "pacing",
            "completed",
            "resolving",
            "completed",
            "resolving",
            "completed",
        ]
    );
}

#[test]
fn pipeline_exposes_its_config() {
    let config = Config {
        detail_delay_ms: 250,
        document_timeout_secs: Some(30),
        ..Config::default()
    };
    let p = pipeline(
        Arc::new(MockRegister::ok(b"%PDF")),
        TextBackend::pages([REGISTER]),
        Arc::new(MockLookup::new()),
        config,
    );
    assert_eq!(p.config().detail_delay(), Duration::from_millis(250));
    assert_eq!(p.config().document_timeout(), Some(Duration::from_secs(30)));
}
