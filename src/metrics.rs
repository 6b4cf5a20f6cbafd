//! Prometheus metrics for the video archiver.
//!
//! Exposes:
//! - `telegram_video_archiver_videos_found_total` (counter)
//! - `telegram_video_archiver_videos_downloaded_total` (counter by origin)
//! - `telegram_video_archiver_download_failures_total` (counter)
//! - `telegram_video_archiver_archives_total` (counter by kind and status)
//! - `telegram_video_archiver_originals_deleted_total` (counter)
//! - `telegram_video_archiver_command_duration_seconds` (histogram)
//! - `telegram_video_archiver_command_total` (counter with status)
//! - `telegram_video_archiver_command_inflight` (gauge)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, Encoder, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
    TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static VIDEOS_FOUND: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "telegram_video_archiver_videos_found_total",
        "Video messages discovered in the group"
    )
    .expect("failed to register videos found counter")
});

static VIDEOS_DOWNLOADED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "telegram_video_archiver_videos_downloaded_total",
        "Videos downloaded or found already on disk",
        &["origin"]
    )
    .expect("failed to register videos downloaded counter")
});

static DOWNLOAD_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "telegram_video_archiver_download_failures_total",
        "Video downloads that failed"
    )
    .expect("failed to register download failures counter")
});

static ARCHIVES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "telegram_video_archiver_archives_total",
        "Archiver invocations by kind and status",
        &["kind", "status"]
    )
    .expect("failed to register archives counter")
});

static ORIGINALS_DELETED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "telegram_video_archiver_originals_deleted_total",
        "Raw video files removed after a successful archive"
    )
    .expect("failed to register originals deleted counter")
});

static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 50ms up to ~3.6 hours; long runs are normal here.
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 19).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "telegram_video_archiver_command_duration_seconds",
        "CLI command duration in seconds",
        &["command"],
        buckets
    )
    .expect("failed to register command duration histogram")
});

static COMMAND_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "telegram_video_archiver_command_total",
        "Total command executions by status",
        &["command", "status"]
    )
    .expect("failed to register command counter")
});

static COMMAND_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "telegram_video_archiver_command_inflight",
        "Number of in-flight commands",
        &["command"]
    )
    .expect("failed to register inflight gauge")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&VIDEOS_FOUND);
    Lazy::force(&VIDEOS_DOWNLOADED);
    Lazy::force(&DOWNLOAD_FAILURES);
    Lazy::force(&ARCHIVES);
    Lazy::force(&ORIGINALS_DELETED);
    Lazy::force(&COMMAND_DURATION);
    Lazy::force(&COMMAND_TOTAL);
    Lazy::force(&COMMAND_INFLIGHT);
}

fn status_label(success: bool) -> &'static str {
    if success {
        "ok"
    } else {
        "error"
    }
}

pub fn record_video_found() {
    VIDEOS_FOUND.inc();
}

/// `skipped` marks videos satisfied by files from an earlier run.
pub fn record_video_downloaded(skipped: bool) {
    let origin = if skipped { "existing" } else { "download" };
    VIDEOS_DOWNLOADED.with_label_values(&[origin]).inc();
}

pub fn record_download_failure() {
    DOWNLOAD_FAILURES.inc();
}

/// `kind` is `individual`, `batch` or `final_batch`.
pub fn record_archive(kind: &'static str, success: bool) {
    ARCHIVES.with_label_values(&[kind, status_label(success)]).inc();
}

pub fn record_originals_deleted(count: u64) {
    ORIGINALS_DELETED.inc_by(count);
}

/// Increment inflight gauge for a command.
pub fn record_command_start(command: &'static str) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).inc();
}

/// Record command completion with duration and status.
pub fn record_command_result(command: &'static str, duration: Duration, success: bool) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).dec();
    COMMAND_DURATION
        .with_label_values(&[command])
        .observe(duration.as_secs_f64());
    COMMAND_TOTAL
        .with_label_values(&[command, status_label(success)])
        .inc();
}

fn plain_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(plain_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"encode error"),
        ));
    }

    let mut response = plain_response(StatusCode::OK, Bytes::from(buffer));
    if let Ok(value) = hyper::header::HeaderValue::from_str(encoder.format_type()) {
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, value);
    }
    Ok(response)
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(plain_response(StatusCode::NOT_FOUND, Bytes::new())),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn metrics_text() -> String {
        let response = metrics_response().await.expect("metrics response");
        assert_eq!(response.status(), StatusCode::OK);
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect metrics body")
            .to_bytes();
        String::from_utf8(body_bytes.to_vec()).expect("utf-8 metrics body")
    }

    #[test]
    fn records_successful_command_metrics() {
        let cmd = "test_command_metrics_success";

        record_command_start(cmd);
        assert_eq!(COMMAND_INFLIGHT.with_label_values(&[cmd]).get(), 1);

        record_command_result(cmd, Duration::from_millis(120), true);

        assert_eq!(COMMAND_INFLIGHT.with_label_values(&[cmd]).get(), 0);
        assert_eq!(COMMAND_TOTAL.with_label_values(&[cmd, "ok"]).get(), 1);
        assert_eq!(
            COMMAND_DURATION
                .with_label_values(&[cmd])
                .get_sample_count(),
            1
        );
    }

    #[test]
    fn records_failed_command_metrics() {
        let cmd = "test_command_metrics_error";

        record_command_start(cmd);
        record_command_result(cmd, Duration::from_secs(2), false);

        assert_eq!(COMMAND_TOTAL.with_label_values(&[cmd, "error"]).get(), 1);
    }

    #[test]
    fn pipeline_counters_only_grow() {
        let found = VIDEOS_FOUND.get();
        let downloaded = VIDEOS_DOWNLOADED.with_label_values(&["download"]).get();
        let existing = VIDEOS_DOWNLOADED.with_label_values(&["existing"]).get();
        let failures = DOWNLOAD_FAILURES.get();
        let deleted = ORIGINALS_DELETED.get();

        record_video_found();
        record_video_downloaded(false);
        record_video_downloaded(true);
        record_download_failure();
        record_originals_deleted(3);

        assert!(VIDEOS_FOUND.get() > found);
        assert!(VIDEOS_DOWNLOADED.with_label_values(&["download"]).get() > downloaded);
        assert!(VIDEOS_DOWNLOADED.with_label_values(&["existing"]).get() > existing);
        assert!(DOWNLOAD_FAILURES.get() > failures);
        assert!(ORIGINALS_DELETED.get() >= deleted + 3);
    }

    #[test]
    fn archive_outcomes_are_labelled_by_kind_and_status() {
        let ok_before = ARCHIVES.with_label_values(&["batch", "ok"]).get();
        let err_before = ARCHIVES.with_label_values(&["final_batch", "error"]).get();

        record_archive("batch", true);
        record_archive("final_batch", false);

        assert!(ARCHIVES.with_label_values(&["batch", "ok"]).get() > ok_before);
        assert!(ARCHIVES.with_label_values(&["final_batch", "error"]).get() > err_before);
    }

    #[test]
    fn init_collectors_can_be_called_multiple_times() {
        init_collectors();
        init_collectors();
        // Should not panic
    }

    #[tokio::test]
    async fn metrics_response_contains_registered_metrics() {
        let cmd = "test_metrics_response";
        record_command_start(cmd);
        record_command_result(cmd, Duration::from_millis(10), true);
        record_video_found();

        let text = metrics_text().await;
        assert!(text.contains("telegram_video_archiver_command_total"));
        assert!(text.contains("telegram_video_archiver_videos_found_total"));
        assert!(text.contains(cmd));
    }

    #[tokio::test]
    async fn metrics_response_has_text_content_type() {
        let response = metrics_response().await.expect("metrics response");

        let content_type = response
            .headers()
            .get(hyper::header::CONTENT_TYPE)
            .expect("content type");
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    }
}
