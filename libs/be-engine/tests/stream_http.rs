use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use be_api::{Record, Sink, SinkError};
use be_engine::{
    Failure, JobClient, JobError, JobFilter, JobRequest, SessionError, SessionState, SinkRegistryBuilder,
    StreamSession, Transport, TransportConfig,
};
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

const TOKEN: &str = "s3cret-7f2c";

// ═══════════════════════════════════════════════════════════════
//  Fake platform
// ═══════════════════════════════════════════════════════════════

#[derive(Clone, Default)]
struct Seen {
    tokens: Arc<Mutex<Vec<String>>>,
    job_ids: Arc<Mutex<Vec<Option<String>>>>,
}

impl Seen {
    fn record(&self, headers: &HeaderMap, query: &HashMap<String, String>) {
        let token = headers
            .get("x-token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.tokens.lock().unwrap().push(token);
        self.job_ids.lock().unwrap().push(query.get("job_id").cloned());
    }
}

fn chunked(parts: &[&str], stall: bool) -> Body {
    let parts: Vec<Result<Bytes, Infallible>> = parts
        .iter()
        .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
        .collect();
    if stall {
        Body::from_stream(stream::iter(parts).chain(stream::pending()))
    } else {
        Body::from_stream(stream::iter(parts))
    }
}

async fn feed(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    seen.record(&headers, &query);
    if headers.get("x-token").and_then(|v| v.to_str().ok()) != Some(TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    chunked(
        &[
            "{\"origin\":{\"job_id\":\"1234\"},\"x\":1}\n{\"origin\":{\"jo",
            "b_id\":\"5678\"},\"x\":2}\n",
            "\n{\"origin\":{\"job_id\":\"1234\"},\"x\":3}\n",
        ],
        false,
    )
    .into_response()
}

async fn stalled() -> Response {
    chunked(&["{\"x\":1}\n"], true).into_response()
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

async fn create_job(headers: HeaderMap, axum::Json(body): axum::Json<serde_json::Value>) -> Response {
    if headers.get("x-token").is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if body["options"][0]["targets"][0] == "10.0.0.1" {
        return axum::Json(serde_json::json!({"message": "target not allowed"})).into_response();
    }
    axum::Json(serde_json::json!({
        "job_id": "abcd",
        "stream_url": "http://stream.example.test/v1/stream",
        "message": "ok"
    }))
    .into_response()
}

async fn serve(seen: Seen) -> String {
    let app = Router::new()
        .route("/v1/stream", get(feed))
        .route("/v1/stalled", get(stalled))
        .route("/v1/broken", get(broken))
        .route("/v1/tasks", post(create_job))
        .with_state(seen);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ═══════════════════════════════════════════════════════════════
//  Client side
// ═══════════════════════════════════════════════════════════════

struct Collect(Arc<Mutex<Vec<serde_json::Value>>>);

impl Sink for Collect {
    fn name(&self) -> &str {
        "collect"
    }

    fn run(&self, record: &Record) -> Result<(), SinkError> {
        self.0.lock().unwrap().push(record.to_value());
        Ok(())
    }
}

fn session(url: String, read_timeout: Duration, out: &Arc<Mutex<Vec<serde_json::Value>>>) -> StreamSession {
    let transport = Transport::new(TransportConfig {
        url,
        connect_timeout: Duration::from_secs(2),
        read_timeout,
    })
    .unwrap();
    let registry = SinkRegistryBuilder::new()
        .register(Box::new(Collect(out.clone())))
        .build()
        .unwrap();
    StreamSession::new(transport, Arc::new(registry))
}

fn xs(out: &Arc<Mutex<Vec<serde_json::Value>>>) -> Vec<i64> {
    out.lock()
        .unwrap()
        .iter()
        .filter_map(|v| v["x"].as_i64())
        .collect()
}

#[tokio::test]
async fn filtered_stream_delivers_only_matching_job() {
    let seen = Seen::default();
    let base = serve(seen.clone()).await;
    let out = Arc::default();
    let mut session = session(format!("{base}/v1/stream"), Duration::from_secs(5), &out)
        .with_filter(JobFilter::new(Some("1234".into())));

    let report = session.run(TOKEN).await.unwrap();

    assert_eq!(xs(&out), [1, 3]);
    assert_eq!(report.filtered_out, 1);
    assert_eq!(report.decode_errors, 0);
    assert_eq!(session.state(), SessionState::Terminated(None));
    assert_eq!(*seen.tokens.lock().unwrap(), [TOKEN]);
    assert_eq!(*seen.job_ids.lock().unwrap(), [Some("1234".to_string())]);
}

#[tokio::test]
async fn unfiltered_stream_keeps_wire_order() {
    let seen = Seen::default();
    let base = serve(seen.clone()).await;
    let out = Arc::default();
    let mut session = session(format!("{base}/v1/stream"), Duration::from_secs(5), &out);

    let report = session.run(TOKEN).await.unwrap();

    assert_eq!(xs(&out), [1, 2, 3]);
    assert_eq!(report.dispatched, 3);
    assert_eq!(*seen.job_ids.lock().unwrap(), [None]);
}

#[tokio::test]
async fn rejected_token_is_an_auth_failure() {
    let base = serve(Seen::default()).await;
    let out = Arc::default();
    let mut session = session(format!("{base}/v1/stream"), Duration::from_secs(5), &out);

    let err = session.run("bad").await.unwrap_err();

    assert!(matches!(err, SessionError::Unauthorized));
    assert_eq!(session.state(), SessionState::Terminated(Some(Failure::Auth)));
    assert!(out.lock().unwrap().is_empty());
}

#[tokio::test]
async fn server_error_is_a_transport_failure() {
    let base = serve(Seen::default()).await;
    let out = Arc::default();
    let mut session = session(format!("{base}/v1/broken"), Duration::from_secs(5), &out);

    let err = session.run(TOKEN).await.unwrap_err();

    assert!(matches!(err, SessionError::Status { status: 500, .. }));
    assert_eq!(err.failure(), Failure::Transport);
}

#[tokio::test]
async fn stalled_stream_hits_read_timeout() {
    let base = serve(Seen::default()).await;
    let out = Arc::default();
    let mut session = session(format!("{base}/v1/stalled"), Duration::from_millis(200), &out);

    let err = session.run(TOKEN).await.unwrap_err();

    assert!(matches!(err, SessionError::ReadTimeout(_)));
    assert_eq!(xs(&out), [1]);
}

#[tokio::test]
async fn cancellation_ends_open_stream() {
    let base = serve(Seen::default()).await;
    let out = Arc::default();
    let cancel = CancellationToken::new();
    let mut session = session(format!("{base}/v1/stalled"), Duration::from_secs(30), &out)
        .with_cancellation(cancel.clone());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });
    let err = session.run(TOKEN).await.unwrap_err();

    assert!(matches!(err, SessionError::Cancelled));
    assert_eq!(session.state(), SessionState::Terminated(Some(Failure::Cancelled)));
    assert_eq!(xs(&out), [1]);
}

#[tokio::test]
async fn connection_refused_is_a_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let out = Arc::default();
    let mut session = session(format!("http://{addr}/v1/stream"), Duration::from_secs(5), &out);

    let err = session.run(TOKEN).await.unwrap_err();

    assert_eq!(err.failure(), Failure::Transport);
}

#[tokio::test]
async fn job_submission_round_trip() {
    let base = serve(Seen::default()).await;
    let client = JobClient::new(format!("{base}/v1/tasks"), Duration::from_secs(2)).unwrap();

    let ok = JobRequest::scan("scan", 22, None, vec!["ssh".into()], vec!["8.8.8.8".into()]);
    let job = client.submit(TOKEN, &ok, false).await.unwrap();
    assert_eq!(job.job_id, "abcd");

    let refused = JobRequest::scan("scan", 22, None, vec![], vec!["10.0.0.1".into()]);
    let err = client.submit(TOKEN, &refused, false).await.unwrap_err();
    assert!(matches!(err, JobError::Rejected(ref m) if m == "target not allowed"));
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn verbose_echo_leaves_records_untouched() {
    let seen = Seen::default();
    let base = serve(seen.clone()).await;
    let out = Arc::default();
    let logs = Captured::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut session = session(format!("{base}/v1/stream"), Duration::from_secs(5), &out)
        .with_filter(JobFilter::new(Some("1234".into())))
        .verbose(true);
    let report = session.run(TOKEN).await.unwrap();

    assert_eq!(xs(&out), [1, 3]);
    assert_eq!(report.filtered_out, 1);

    let logs = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    let request = logs.find("be_engine::wire: request").expect("request echo");
    let response = logs.find("be_engine::wire: response").expect("response echo");
    let ended = logs.find("stream ended").expect("end of stream");
    assert!(request < response && response < ended, "{logs}");
    assert!(logs.contains("x-token: <redacted>"), "{logs}");
    assert!(logs.contains("job_id=1234"), "{logs}");
    assert!(!logs.contains(TOKEN), "{logs}");
}
