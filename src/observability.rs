use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings committed.
pub const BOOKINGS_CREATED_TOTAL: &str = "tidbok_bookings_created_total";

/// Counter: bookings cancelled.
pub const BOOKINGS_CANCELLED_TOTAL: &str = "tidbok_bookings_cancelled_total";

/// Counter: rejected mutations. Labels: op, code.
pub const BOOKING_REJECTIONS_TOTAL: &str = "tidbok_booking_rejections_total";

/// Counter: availability queries served.
pub const SLOT_QUERIES_TOTAL: &str = "tidbok_slot_queries_total";

/// Histogram: availability pipeline latency in seconds.
pub const SLOT_QUERY_DURATION_SECONDS: &str = "tidbok_slot_query_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: journal append + fsync duration in seconds.
pub const JOURNAL_APPEND_DURATION_SECONDS: &str = "tidbok_journal_append_duration_seconds";

/// Install the Prometheus metrics exporter on the given port. No-op if
/// port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Install the default fmt tracing subscriber. Call once at startup from
/// the embedding process.
pub fn init_logging() {
    tracing_subscriber::fmt::init();
}
