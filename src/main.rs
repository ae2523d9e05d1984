use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use tracing::info;

use http_whois::{
    config::Config,
    domain::Domain,
    errors::WhoisError,
    metrics,
    pipeline::{select_domain, LookupRequest, Outcome, ResolutionPipeline},
    render,
    SuffixCache,
};

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    cache: Option<Arc<SuffixCache>>,
}

#[derive(Deserialize)]
struct DomainQuery {
    /// Domain to look up; wins over the path when non-empty
    domain: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    suffix_cache_enabled: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "http_whois=info,tower_http=debug".into()),
        )
        .init();

    let config = Arc::new(Config::load()?);
    info!("Configuration loaded successfully");

    let cache = SuffixCache::from_config(&config).map(Arc::new);
    if cache.is_some() {
        info!(
            "Suffix cache enabled ({} entries, {}s TTL)",
            config.cache_max_entries, config.cache_ttl_seconds
        );
    }

    metrics::init_metrics();

    let app_state = AppState {
        config: config.clone(),
        cache,
    };

    // Service routes sit under an underscore prefix; no domain or TLD can start with one.
    let app = Router::new()
        .route("/", get(whois_root))
        .route("/_service/health", get(health_check))
        .route("/_service/metrics", get(metrics::metrics_handler))
        .route("/_service/cache", delete(invalidate_all))
        .route("/_service/cache/:suffix", delete(invalidate_suffix))
        .route("/*path", get(whois_path))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!("WHOIS gateway listening on {}", addr);
    info!("Health check: http://{}/_service/health", addr);
    info!("Metrics: http://{}/_service/metrics", addr);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, gracefully shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

async fn whois_root(
    Query(params): Query<DomainQuery>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    match select_domain("/", params.domain.as_deref()) {
        Some(domain) => whois_lookup(&state, domain, &headers).await,
        None => render::home_page().into_response(),
    }
}

async fn whois_path(
    Path(path): Path<String>,
    Query(params): Query<DomainQuery>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    match select_domain(&path, params.domain.as_deref()) {
        Some(domain) => whois_lookup(&state, domain, &headers).await,
        None => render::home_page().into_response(),
    }
}

async fn whois_lookup(state: &AppState, domain: String, headers: &HeaderMap) -> Response {
    let start_time = Instant::now();

    let request = LookupRequest {
        domain,
        accept: header_value(headers, header::ACCEPT),
        user_agent: header_value(headers, header::USER_AGENT),
    };

    let outcome = match ResolutionPipeline::new(&state.config) {
        Ok(pipeline) => pipeline.with_cache(state.cache.clone()).run(&request).await,
        Err(e) => Err(e),
    };

    metrics::record_query_time(start_time.elapsed().as_millis() as u64);
    metrics::increment_requests(resolved_suffix(&request, &outcome).as_deref());

    match outcome {
        Ok(outcome) => {
            track_outcome(&outcome);
            outcome.into_response()
        }
        Err(e) => {
            metrics::increment_errors(e.kind());
            e.into_response()
        }
    }
}

fn track_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Rendered(representation) => metrics::increment_negotiated(representation.media_type()),
        Outcome::PassThrough(upstream) => metrics::increment_passthrough(upstream.status),
        Outcome::NotAcceptable => metrics::increment_errors("not_acceptable"),
    }
}

/// Suffix to label metrics with, only once the registry (or the cache it
/// fed) has vouched for it.
fn resolved_suffix(request: &LookupRequest, outcome: &Result<Outcome, WhoisError>) -> Option<String> {
    match outcome {
        Ok(Outcome::Rendered(_)) | Ok(Outcome::NotAcceptable) => Domain::normalize(&request.domain)
            .ok()
            .map(|domain| domain.suffix().to_string()),
        _ => None,
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.config.start_time.elapsed().as_secs(),
        suffix_cache_enabled: state.cache.is_some(),
    })
}

async fn invalidate_all(State(state): State<AppState>) -> Response {
    match &state.cache {
        Some(cache) => {
            cache.invalidate_all();
            info!("Suffix cache cleared");
            StatusCode::NO_CONTENT.into_response()
        }
        None => cache_disabled(),
    }
}

async fn invalidate_suffix(
    Path(suffix): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match &state.cache {
        Some(cache) => {
            cache.invalidate(&suffix).await;
            info!("Suffix cache entry '{}' invalidated", suffix);
            StatusCode::NO_CONTENT.into_response()
        }
        None => cache_disabled(),
    }
}

fn cache_disabled() -> Response {
    (StatusCode::CONFLICT, "Suffix cache is disabled").into_response()
}
