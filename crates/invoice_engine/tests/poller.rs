use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use invoice_engine::{
    ApiError, ApiSettings, EngineEvent, InvoiceClient, InvoiceRecord, InvoiceSource,
    PollSettings, PollerHandle,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Replays a fixed status script, repeating the last entry once exhausted.
struct ScriptedSource {
    statuses: Vec<&'static str>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(statuses: Vec<&'static str>) -> Self {
        Self {
            statuses,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl InvoiceSource for ScriptedSource {
    async fn fetch_invoice(&self, invoice_id: &str) -> Result<InvoiceRecord, ApiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let status = self.statuses[call.min(self.statuses.len() - 1)];
        Ok(InvoiceRecord {
            invoice_id: invoice_id.to_string(),
            invoice_number: None,
            vendor_id: None,
            po_number: None,
            status: Some(status.to_string()),
            recommendation: None,
            risk_score: None,
            extracted_data: None,
            matching_result: None,
            fraud_result: None,
            uploaded_at: None,
            processed_at: None,
            processing_log: Vec::new(),
        })
    }
}

fn fast() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(20),
    }
}

fn collect(handle: &PollerHandle, count: usize) -> Vec<(String, u64, Option<String>)> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = Vec::new();
    while seen.len() < count && Instant::now() < deadline {
        if let Some(EngineEvent::PollCompleted {
            invoice_id,
            seq,
            result,
        }) = handle.recv_timeout(Duration::from_millis(100))
        {
            seen.push((invoice_id, seq, result.ok().and_then(|r| r.status)));
        }
    }
    seen
}

#[test]
fn poller_delivers_increasing_sequence_numbers() {
    let source = Arc::new(ScriptedSource::new(vec![
        "PROCESSING",
        "EXTRACTING",
        "MATCHING",
        "COMPLETED",
    ]));
    let handle = PollerHandle::new(source, fast()).expect("poller");
    handle.watch("inv-1");

    let events = collect(&handle, 4);
    assert_eq!(events.len(), 4);
    let mut seqs: Vec<u64> = events.iter().map(|(_, seq, _)| *seq).collect();
    seqs.sort_unstable();
    seqs.dedup();
    assert_eq!(seqs.len(), 4, "sequence numbers must be unique");
    assert!(events.iter().all(|(id, _, _)| id == "inv-1"));
}

#[test]
fn duplicate_watch_shares_one_loop() {
    let source = Arc::new(ScriptedSource::new(vec!["PROCESSING"]));
    // Only the immediate first tick fits before the interval elapses.
    let handle = PollerHandle::new(
        source.clone(),
        PollSettings {
            interval: Duration::from_secs(30),
        },
    )
    .unwrap();
    handle.watch("inv-1");
    handle.watch("inv-1");

    assert_eq!(collect(&handle, 1).len(), 1);
    std::thread::sleep(Duration::from_millis(200));
    handle.unwatch("inv-1");
    assert!(handle.try_recv().is_none());
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unwatch_stops_polling() {
    let source = Arc::new(ScriptedSource::new(vec!["PROCESSING"]));
    let handle = PollerHandle::new(source.clone(), fast()).unwrap();
    handle.watch("inv-2");
    assert!(!collect(&handle, 2).is_empty());

    handle.unwatch("inv-2");
    std::thread::sleep(Duration::from_millis(60));
    while handle.try_recv().is_some() {}
    let calls_after_stop = source.calls.load(Ordering::SeqCst);

    std::thread::sleep(Duration::from_millis(120));
    assert!(handle.try_recv().is_none());
    assert_eq!(source.calls.load(Ordering::SeqCst), calls_after_stop);
}

#[tokio::test(flavor = "multi_thread")]
async fn poller_keeps_going_through_http_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/invoices/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/invoices/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "invoice_id": "flaky",
            "status": "COMPLETED"
        })))
        .mount(&server)
        .await;

    let client = InvoiceClient::new(&ApiSettings {
        base_url: server.uri(),
        ..ApiSettings::default()
    })
    .unwrap();
    let handle = PollerHandle::new(
        Arc::new(client),
        PollSettings {
            interval: Duration::from_millis(100),
        },
    )
    .unwrap();
    handle.watch("flaky");

    let outcome = tokio::task::spawn_blocking(move || {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut failures = 0;
        while Instant::now() < deadline {
            match handle.recv_timeout(Duration::from_millis(100)) {
                Some(EngineEvent::PollCompleted { result: Err(_), .. }) => failures += 1,
                Some(EngineEvent::PollCompleted { result: Ok(record), .. }) => {
                    return (failures, record.status);
                }
                None => {}
            }
        }
        (failures, None)
    })
    .await
    .unwrap();

    assert_eq!(outcome.0, 2);
    assert_eq!(outcome.1.as_deref(), Some("COMPLETED"));
}
