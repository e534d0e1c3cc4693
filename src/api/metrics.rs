use actix_web::HttpResponse;
use std::sync::atomic::{AtomicU64, Ordering};

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static FLASHCARDS_GENERATED: AtomicU64 = AtomicU64::new(0);
static GENERATION_FAILURES: AtomicU64 = AtomicU64::new(0);
static COLLECTIONS_SAVED: AtomicU64 = AtomicU64::new(0);
static NAME_CONFLICTS: AtomicU64 = AtomicU64::new(0);

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn record_generation(cards: usize) {
    FLASHCARDS_GENERATED.fetch_add(cards as u64, Ordering::Relaxed);
}

pub fn increment_generation_failures() {
    GENERATION_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_collections_saved() {
    COLLECTIONS_SAVED.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_name_conflicts() {
    NAME_CONFLICTS.fetch_add(1, Ordering::Relaxed);
}

/// Leitura dos contadores; só alimenta `render`
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_errors_total: u64,
    pub flashcards_generated_total: u64,
    pub generation_failures_total: u64,
    pub collections_saved_total: u64,
    pub name_conflicts_total: u64,
}

fn snapshot() -> MetricsResponse {
    MetricsResponse {
        http_requests_total: REQUEST_COUNT.load(Ordering::Relaxed),
        http_errors_total: ERROR_COUNT.load(Ordering::Relaxed),
        flashcards_generated_total: FLASHCARDS_GENERATED.load(Ordering::Relaxed),
        generation_failures_total: GENERATION_FAILURES.load(Ordering::Relaxed),
        collections_saved_total: COLLECTIONS_SAVED.load(Ordering::Relaxed),
        name_conflicts_total: NAME_CONFLICTS.load(Ordering::Relaxed),
    }
}

fn render(metrics: &MetricsResponse) -> String {
    let counters = [
        ("http_requests_total", "Total number of HTTP requests", metrics.http_requests_total),
        ("http_errors_total", "Total number of HTTP errors", metrics.http_errors_total),
        ("flashcards_generated_total", "Flashcards returned by generation", metrics.flashcards_generated_total),
        ("generation_failures_total", "Failed generation requests", metrics.generation_failures_total),
        ("collections_saved_total", "Collections saved", metrics.collections_saved_total),
        ("name_conflicts_total", "Saves rejected by duplicate name", metrics.name_conflicts_total),
    ];

    counters
        .iter()
        .map(|(name, help, value)| {
            format!("# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "System metrics (Prometheus text format)")
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(render(&snapshot()))
}
