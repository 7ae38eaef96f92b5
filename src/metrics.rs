use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::env;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

lazy_static::lazy_static! {
    pub static ref METRIC_NAMESPACE: String =
        env::var("METRIC_NAMESPACE").unwrap_or_else(|_| "shop_loadtest".to_string());

    // === HTTP Metrics ===

    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec =
        IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests sent to the system under test")
                .namespace(METRIC_NAMESPACE.as_str()),
            &["method", "endpoint", "status"]  // status: code or "error"
        ).unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec =
        HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latencies in seconds"
            ).namespace(METRIC_NAMESPACE.as_str()),
            &["endpoint"]
        ).unwrap();

    // === Action Metrics ===

    pub static ref ACTIONS_TOTAL: IntCounterVec =
        IntCounterVec::new(
            Opts::new("actions_total", "Leaf actions executed by virtual users")
                .namespace(METRIC_NAMESPACE.as_str()),
            &["profile", "action", "outcome"]  // outcome: success, tolerated, failed
        ).unwrap();

    pub static ref ACTION_ERRORS_TOTAL: IntCounterVec =
        IntCounterVec::new(
            Opts::new("action_errors_total", "Failed leaf actions by error category")
                .namespace(METRIC_NAMESPACE.as_str()),
            &["category"]
        ).unwrap();

    // === Virtual User Metrics ===

    pub static ref ACTIVE_USERS: Gauge =
        Gauge::with_opts(
            Opts::new("active_users", "Number of virtual users currently running")
                .namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();

    pub static ref SESSIONS_STARTED_TOTAL: IntCounter =
        IntCounter::with_opts(
            Opts::new("sessions_started_total", "Virtual user sessions started")
                .namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();
}

/// Registers all metrics with the default Prometheus registry.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let registry = prometheus::default_registry();

    registry.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    registry.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;

    registry.register(Box::new(ACTIONS_TOTAL.clone()))?;
    registry.register(Box::new(ACTION_ERRORS_TOTAL.clone()))?;

    registry.register(Box::new(ACTIVE_USERS.clone()))?;
    registry.register(Box::new(SESSIONS_STARTED_TOTAL.clone()))?;

    Ok(())
}

fn encode(registry: &Arc<Mutex<Registry>>) -> Result<(Vec<u8>, String), String> {
    let encoder = TextEncoder::new();
    let metric_families = registry
        .lock()
        .map_err(|_| "metrics registry lock poisoned".to_string())?
        .gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| e.to_string())?;
    Ok((buffer, encoder.format_type().to_string()))
}

/// HTTP handler for the Prometheus metrics endpoint.
pub async fn metrics_handler(
    _req: Request<Body>,
    registry: Arc<Mutex<Registry>>,
) -> Result<Response<Body>, hyper::Error> {
    let response = match encode(&registry) {
        Ok((buffer, content_type)) => Response::builder()
            .status(200)
            .header("Content-Type", content_type)
            .body(Body::from(buffer)),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            Response::builder().status(500).body(Body::from(e))
        }
    };

    Ok(response.unwrap_or_else(|_| Response::new(Body::empty())))
}

/// Starts the Prometheus metrics HTTP server.
pub async fn start_metrics_server(port: u16, registry: Arc<Mutex<Registry>>) {
    let addr = ([0, 0, 0, 0], port).into();

    let make_svc = make_service_fn(move |_conn| {
        let registry_clone = registry.clone();
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                let registry_clone_inner = registry_clone.clone();
                async move { metrics_handler(req, registry_clone_inner).await }
            }))
        }
    });

    let server = match Server::try_bind(&addr) {
        Ok(builder) => builder.serve(make_svc),
        Err(e) => {
            error!(port, error = %e, "Failed to bind metrics server");
            return;
        }
    };
    info!(port, addr = %addr, "Metrics server listening");

    if let Err(e) = server.await {
        error!(error = %e, "Metrics server error");
    }
}

/// Gathers and encodes metrics as a string for final output.
pub fn gather_metrics_string(registry: &Arc<Mutex<Registry>>) -> String {
    match encode(registry) {
        Ok((buffer, _)) => String::from_utf8(buffer)
            .unwrap_or_else(|_| String::from("# ERROR ENCODING METRICS TO UTF-8")),
        Err(e) => format!("# ERROR GATHERING METRICS: {}", e),
    }
}
