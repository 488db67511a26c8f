// SPDX-License-Identifier: MPL-2.0
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use preview_probe::config::{self, CollectorConfig};
use preview_probe::diagnostics::{
    ConsoleChannel, DebugCollector, ElementNode, Fetch, FetchRequest, FetchResponse, HostEvent,
    LogArg, ReadyState, ReadyStateCallback, Xhr, XhrFactory,
};
use preview_probe::error::Error;
use preview_probe::feedback::{FeedbackPayload, SimulatedTransport, Transport};
use tempfile::tempdir;

fn new_collector(config: CollectorConfig) -> DebugCollector {
    DebugCollector::new(config).expect("valid config")
}

struct Reply(u16);

impl FetchResponse for Reply {
    fn status(&self) -> u16 {
        self.0
    }
}

/// Answers `/slow` late, `/fast` early and refuses anything else.
struct DelayedFetch;

impl Fetch for DelayedFetch {
    type Response = Reply;
    type Error = Error;

    fn fetch(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send {
        async move {
            let (delay_ms, status) = match request.url.as_str() {
                "https://api.test/slow" => (40, 200),
                "https://api.test/fast" => (1, 201),
                _ => (1, 0),
            };
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            if status == 0 {
                Err(Error::Transport("connection refused".into()))
            } else {
                Ok(Reply(status))
            }
        }
    }
}

#[test]
fn limits_from_config_file_drive_transmission_slices() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("collector.toml");

    let mut config = CollectorConfig::default();
    config.limits.max_errors = 8;
    config.limits.send_errors = 2;
    config::save_to_path(&config, &path).expect("save config");

    let loaded = config::load_from_path(&path).expect("load config");
    assert_eq!(loaded.limits.max_errors, 8);

    let collector = new_collector(loaded);
    for i in 0..12 {
        collector
            .errors()
            .report_unhandled_rejection(format!("rejection {i}"), None);
    }

    assert_eq!(collector.errors().count(), 8);
    let bundle = collector.assemble_for_transmission();
    let messages: Vec<_> = bundle.errors.iter().map(|e| e.message.clone()).collect();
    assert_eq!(messages, ["rejection 11", "rejection 10"]);
    assert_eq!(bundle.debug_info.total_errors, 8);
}

#[test]
fn invalid_limits_in_file_fail_fast() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("collector.toml");
    std::fs::write(&path, "[limits]\nmax_console_logs = 5\nsend_console_logs = 9\n")
        .expect("write config");

    assert!(matches!(
        config::load_from_path(&path),
        Err(Error::Config(_))
    ));
}

#[tokio::test]
async fn network_records_follow_completion_order() {
    let collector = new_collector(CollectorConfig::default());
    let client = Arc::new(collector.observe_fetch(DelayedFetch));

    let slow = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.fetch(FetchRequest::get("https://api.test/slow")).await })
    };
    let fast = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            client
                .fetch(FetchRequest::post("https://api.test/fast"))
                .await
        })
    };
    let refused = client.fetch(FetchRequest::get("https://api.test/down")).await;

    assert!(slow.await.expect("task").is_ok());
    assert!(fast.await.expect("task").is_ok());
    assert!(refused.is_err());

    // newest first: slow finished last
    let records = collector.network().all();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].url, "https://api.test/slow");
    assert_eq!(records[0].status_code, 200);
    assert!(records[0].duration_ms >= 40);

    let refused = records
        .iter()
        .find(|r| r.url == "https://api.test/down")
        .expect("refused call recorded");
    assert_eq!(refused.status_code, 0);
    assert!(!refused.succeeded);
    assert!(refused
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("connection refused")));

    let fast = records
        .iter()
        .find(|r| r.url == "https://api.test/fast")
        .expect("fast call recorded");
    assert_eq!(fast.method, "POST");
}

struct EchoXhr {
    callback: Option<ReadyStateCallback>,
    state: ReadyState,
}

impl Xhr for EchoXhr {
    fn open(&mut self, _method: &str, _url: &str) {
        self.state = ReadyState::Opened;
    }

    fn set_on_ready_state_change(&mut self, callback: ReadyStateCallback) {
        self.callback = Some(callback);
    }

    fn send(&mut self, _body: Option<Vec<u8>>) {
        self.state = ReadyState::Done;
        if let Some(callback) = self.callback.as_mut() {
            callback(ReadyState::HeadersReceived, 418);
            callback(ReadyState::Done, 418);
        }
    }

    fn ready_state(&self) -> ReadyState {
        self.state
    }

    fn status(&self) -> u16 {
        418
    }
}

struct EchoFactory;

impl XhrFactory for EchoFactory {
    type Xhr = EchoXhr;

    fn create(&self) -> Self::Xhr {
        EchoXhr {
            callback: None,
            state: ReadyState::Unsent,
        }
    }
}

#[test]
fn xhr_record_is_visible_from_the_done_callback() {
    let collector = new_collector(CollectorConfig::default());
    let factory = collector.observe_xhr(EchoFactory);
    let network = collector.network().clone();
    let seen = Arc::new(AtomicUsize::new(usize::MAX));

    let mut xhr = factory.create();
    xhr.open("PUT", "https://api.test/teapot");
    let seen_in_callback = Arc::clone(&seen);
    xhr.set_on_ready_state_change(Box::new(move |state, _| {
        if state == ReadyState::Done {
            seen_in_callback.store(network.count(), Ordering::SeqCst);
        }
    }));
    xhr.send(None);

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    let record = &collector.network().all()[0];
    assert_eq!(record.method, "PUT");
    assert_eq!(record.status_code, 418);
    assert!(!record.succeeded);
}

#[test]
fn view_refresh_logging_is_not_recaptured() {
    // keep the process-wide panic hook out of this test
    let mut config = CollectorConfig::default();
    config.features.error_collection = false;
    let collector = new_collector(config);
    let installation = collector.install();

    let console = collector.page_console().clone();
    let refreshes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&refreshes);
    collector.console().on_change(move |count| {
        counter.fetch_add(1, Ordering::SeqCst);
        console.log(&[LogArg::from("viewer refreshed, rows:"), LogArg::from(count as i64)]);
    });

    collector
        .page_console()
        .info(&[LogArg::from("loaded"), LogArg::object(&serde_json::json!({"ms": 120}))]);

    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    let records = collector.console().all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, ConsoleChannel::Info);
    assert!(records[0].message.starts_with("loaded {"));

    installation.restore();
}

#[test]
fn host_events_from_other_threads_reach_recorders() {
    let collector = new_collector(CollectorConfig::default());
    let handle = collector.host_handle();

    let senders: Vec<_> = (0..4)
        .map(|i| {
            let handle = handle.clone();
            std::thread::spawn(move || {
                handle.send(HostEvent::Interaction {
                    action: "tap".into(),
                    element: Some(ElementNode::new("LI").with_class(format!("item n{i}"))),
                    extra: serde_json::Map::new(),
                });
            })
        })
        .collect();
    for sender in senders {
        sender.join().expect("sender thread");
    }

    assert_eq!(collector.process_pending(), 4);
    assert_eq!(collector.interactions().count(), 4);
    assert!(collector
        .interactions()
        .all()
        .iter()
        .all(|r| r.target_path.starts_with("li.item.n")));
}

#[tokio::test]
async fn feedback_payload_carries_scrubbed_context() {
    let collector = new_collector(CollectorConfig::default());
    collector
        .console()
        .record(ConsoleChannel::Error, "ENOENT /Users/ana/project/app.js");
    collector
        .host_handle()
        .send_json(
            r#"{"type":"network","method":"GET","url":"https://api.test/me?session=s3cr3t","status_code":200,"duration_ms":8}"#,
        )
        .expect("valid network event");
    collector.process_pending();

    let payload = FeedbackPayload::compose(
        "the page stays white",
        collector.config().app.preview_url.clone(),
        collector.assemble_for_transmission(),
    )
    .expect("non-empty message");

    let json = serde_json::to_string(&payload).expect("serializable");
    assert!(!json.contains("/Users/ana"));
    assert!(!json.contains("s3cr3t"));
    assert!(json.contains("<path>"));

    let transport = SimulatedTransport::new(Duration::from_millis(1));
    transport.send(&payload).await.expect("simulated send");
    assert_eq!(transport.sent(), 1);
}

#[test]
fn clear_all_then_stats_are_zero() {
    let collector = new_collector(CollectorConfig::default());
    collector.console().record(ConsoleChannel::Log, "one");
    collector
        .interactions()
        .record("click", None, serde_json::Map::new());

    collector.clear_all();

    let stats = collector.stats();
    assert_eq!(
        (stats.console_logs, stats.errors, stats.network_requests, stats.interactions),
        (0, 0, 0, 0)
    );
}
