//! Request orchestration: normalize, resolve the suffix, query, negotiate, render.

use crate::{
    cache::SuffixCache,
    config::Config,
    domain::Domain,
    errors::WhoisError,
    negotiation::{negotiate, PRODUCIBLE},
    registry::{RegistryLookup, RegistryResolver, UpstreamResponse, WhoisServerRecord},
    render::{render, Representation},
    whois::{WhoisClient, WhoisResult},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Accept value used when the caller sent none, or only whitespace.
pub const DEFAULT_ACCEPT: &str = "*/*";

/// One inbound lookup as seen by the core.
#[derive(Debug, Clone, Default)]
pub struct LookupRequest {
    pub domain: String,
    pub accept: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Lookup succeeded and was rendered in the negotiated type.
    Rendered(Representation),
    /// The registry answered with something other than 200 or 404.
    PassThrough(UpstreamResponse),
    /// Nothing the caller accepts can be produced.
    NotAcceptable,
}

/// Choose the lookup target: a non-empty `domain` query parameter wins,
/// otherwise the already URL-decoded path without its leading slash.
/// `None` means there is nothing to look up (the entry form case).
pub fn select_domain(path: &str, query_domain: Option<&str>) -> Option<String> {
    if let Some(domain) = query_domain.filter(|d| !d.is_empty()) {
        return Some(domain.to_string());
    }
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Built fresh for every request. Its only shared piece is the optional
/// suffix cache, which callers hand in explicitly.
pub struct ResolutionPipeline {
    registry: RegistryResolver,
    whois: WhoisClient,
    cache: Option<Arc<SuffixCache>>,
}

impl ResolutionPipeline {
    pub fn new(config: &Config) -> Result<Self, WhoisError> {
        Ok(Self {
            registry: RegistryResolver::new(config)?,
            whois: WhoisClient::new(config),
            cache: None,
        })
    }

    pub fn with_cache(mut self, cache: Option<Arc<SuffixCache>>) -> Self {
        self.cache = cache;
        self
    }

    pub async fn run(&self, request: &LookupRequest) -> Result<Outcome, WhoisError> {
        let domain = Domain::normalize(&request.domain)?;
        let suffix = domain.suffix();

        let server = match self.find_server(suffix, request.user_agent.as_deref()).await? {
            RegistryLookup::Server(record) => record.server,
            RegistryLookup::PassThrough(upstream) => return Ok(Outcome::PassThrough(upstream)),
        };

        // The query line carries the domain exactly as the caller typed it.
        let text = self.whois.query(&server, domain.raw()).await?;
        info!("WHOIS lookup for {} via {} returned {} bytes", domain.raw(), server, text.len());

        let result = WhoisResult {
            server,
            domain: domain.ascii(),
            whois: text,
        };

        let accept = request
            .accept
            .as_deref()
            .filter(|accept| !accept.trim().is_empty())
            .unwrap_or(DEFAULT_ACCEPT);
        match negotiate(accept, &PRODUCIBLE) {
            Some(media_type) => Ok(Outcome::Rendered(render(media_type, domain.raw(), &result)?)),
            None => {
                debug!("No producible type satisfies Accept '{}'", accept);
                Ok(Outcome::NotAcceptable)
            }
        }
    }

    async fn find_server(&self, suffix: &str, user_agent: Option<&str>) -> Result<RegistryLookup, WhoisError> {
        if let Some(cache) = &self.cache {
            if let Some(server) = cache.get(suffix).await {
                return Ok(RegistryLookup::Server(WhoisServerRecord {
                    suffix: suffix.to_string(),
                    server,
                }));
            }
        }

        let lookup = self.registry.resolve(suffix, user_agent).await?;

        if let (Some(cache), RegistryLookup::Server(record)) = (&self.cache, &lookup) {
            cache.set(&record.suffix, &record.server).await;
        }
        Ok(lookup)
    }
}

#[cfg(feature = "server")]
mod response {
    use super::*;
    use axum::{
        http::{header, HeaderName, HeaderValue, StatusCode},
        response::{IntoResponse, Response},
    };
    use tracing::warn;

    impl IntoResponse for Representation {
        fn into_response(self) -> Response {
            let content_type = self.content_type();
            ([(header::CONTENT_TYPE, content_type)], self.into_body()).into_response()
        }
    }

    impl IntoResponse for UpstreamResponse {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = (status, self.body).into_response();

            // Only the upstream's own content type applies to its body.
            let headers = response.headers_mut();
            headers.remove(header::CONTENT_TYPE);
            for (name, value) in self.headers {
                match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                    (Ok(name), Ok(value)) => {
                        headers.append(name, value);
                    }
                    _ => warn!("Dropping unrepresentable upstream header '{}'", name),
                }
            }
            response
        }
    }

    impl IntoResponse for Outcome {
        fn into_response(self) -> Response {
            match self {
                Outcome::Rendered(representation) => representation.into_response(),
                Outcome::PassThrough(upstream) => upstream.into_response(),
                Outcome::NotAcceptable => (
                    StatusCode::NOT_ACCEPTABLE,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    format!("Not Acceptable. Available representations: {}", PRODUCIBLE.join(", ")),
                )
                    .into_response(),
            }
        }
    }
}
