//! IANA root-zone database lookups.
//!
//! Each suffix has an HTML page under the root-zone database. The page lists
//! the authoritative WHOIS server after a bold `WHOIS Server:` label; a
//! missing page means the suffix is not delegated at all.

use crate::{config::Config, errors::WhoisError};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

static WHOIS_SERVER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"WHOIS Server:</b>\s*(.*)").expect("static WHOIS server pattern is valid")
});

/// Authoritative WHOIS server for one suffix. Looked up per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoisServerRecord {
    pub suffix: String,
    pub server: String,
}

// Connection-level headers, plus the ones invalidated because reqwest has
// already decompressed and de-chunked the body.
const DROPPED_HEADERS: [header::HeaderName; 5] = [
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::CONTENT_ENCODING,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// A registry response that was neither 200 nor 404, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Upstream headers in arrival order, minus connection-level ones.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryLookup {
    Server(WhoisServerRecord),
    PassThrough(UpstreamResponse),
}

pub struct RegistryResolver {
    client: reqwest::Client,
    base_url: Url,
    default_user_agent: String,
}

impl RegistryResolver {
    pub fn new(config: &Config) -> Result<Self, WhoisError> {
        let client = reqwest::Client::builder()
            .timeout(config.registry_timeout())
            .gzip(true)
            .build()?;

        let base_url = Url::parse(&config.registry_base_url).map_err(|e| {
            WhoisError::Internal(format!("Invalid registry base URL '{}': {}", config.registry_base_url, e))
        })?;

        Ok(Self {
            client,
            base_url,
            default_user_agent: config.default_user_agent.clone(),
        })
    }

    /// Page URL for a suffix. The suffix is pushed as one path segment, so
    /// stray `/` or `?` characters are percent-encoded rather than
    /// reinterpreted.
    pub fn page_url(&self, suffix: &str) -> Result<Url, WhoisError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| WhoisError::Internal(format!("Registry base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .push(&format!("{}.html", suffix));
        Ok(url)
    }

    /// Fetch the registry page for `suffix` and pull out its WHOIS server.
    ///
    /// `user_agent` is the caller's own agent string when it sent one.
    pub async fn resolve(&self, suffix: &str, user_agent: Option<&str>) -> Result<RegistryLookup, WhoisError> {
        let url = self.page_url(suffix)?;
        let user_agent = user_agent.unwrap_or(self.default_user_agent.as_str());
        debug!("Fetching registry page {} (User-Agent: {})", url, user_agent);

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, user_agent)
            .send()
            .await?;

        let status = response.status();
        debug!("Registry responded {} for '{}'", status, suffix);

        match status {
            StatusCode::NOT_FOUND => Err(WhoisError::SuffixNotFound(suffix.to_string())),
            StatusCode::OK => {
                let body = response.text().await?;
                match extract_whois_server(&body) {
                    Some(server) => {
                        info!("WHOIS server for '{}' is {}", suffix, server);
                        Ok(RegistryLookup::Server(WhoisServerRecord {
                            suffix: suffix.to_string(),
                            server,
                        }))
                    }
                    None => Err(WhoisError::NoWhoisServer(suffix.to_string())),
                }
            }
            other => {
                warn!("Unexpected registry status {} for '{}', passing through", other, suffix);
                let headers = response
                    .headers()
                    .iter()
                    .filter(|(name, _)| !DROPPED_HEADERS.contains(name))
                    .filter_map(|(name, value)| {
                        value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
                    })
                    .collect();
                let body = response.bytes().await?.to_vec();
                Ok(RegistryLookup::PassThrough(UpstreamResponse {
                    status: other.as_u16(),
                    headers,
                    body,
                }))
            }
        }
    }
}

/// First `WHOIS Server:</b>` entry on the page, trimmed. An empty entry
/// counts as no server.
pub fn extract_whois_server(html: &str) -> Option<String> {
    let captures = WHOIS_SERVER_RE.captures(html)?;
    let server = captures.get(1)?.as_str().trim();
    if server.is_empty() {
        None
    } else {
        Some(server.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COM_PAGE: &str = "<h2>Registry Information</h2>\n\
        <p>\n\
        <b>URL for registration services:</b> <a href=\"http://www.verisigninc.com\">http://www.verisigninc.com</a><br/>\n\
        <b>WHOIS Server:</b> whois.verisign-grs.com\n\
        <br/>\n\
        <b>RDAP Server: </b> https://rdap.verisign.com/com/v1/\n\
        </p>\n";

    #[test]
    fn test_extract_server() {
        assert_eq!(extract_whois_server(COM_PAGE).as_deref(), Some("whois.verisign-grs.com"));
    }

    #[test]
    fn test_extract_trims_trailing_whitespace() {
        let html = "<b>WHOIS Server:</b> whois.example.org   \r\n<br/>";
        assert_eq!(extract_whois_server(html).as_deref(), Some("whois.example.org"));
    }

    #[test]
    fn test_extract_first_occurrence_only() {
        let html = "<b>WHOIS Server:</b> first.example\n<b>WHOIS Server:</b> second.example\n";
        assert_eq!(extract_whois_server(html).as_deref(), Some("first.example"));
    }

    #[test]
    fn test_extract_missing() {
        assert_eq!(extract_whois_server("<b>RDAP Server:</b> https://rdap.example/"), None);
        assert_eq!(extract_whois_server("<b>WHOIS Server:</b>\n"), None);
    }

    #[test]
    fn test_upstream_header_lookup_ignores_case() {
        let upstream = UpstreamResponse {
            status: 503,
            headers: vec![
                ("content-type".to_string(), "text/html".to_string()),
                ("retry-after".to_string(), "120".to_string()),
            ],
            body: b"maintenance".to_vec(),
        };
        assert_eq!(upstream.content_type(), Some("text/html"));
        assert_eq!(upstream.header("Retry-After"), Some("120"));
        assert_eq!(upstream.header("x-missing"), None);
    }

    #[test]
    fn test_page_url() {
        let resolver = RegistryResolver::new(&Config::default()).unwrap();
        assert_eq!(
            resolver.page_url("com").unwrap().as_str(),
            "https://www.iana.org/domains/root/db/com.html"
        );
        assert_eq!(
            resolver.page_url("xn--fiqs8s").unwrap().as_str(),
            "https://www.iana.org/domains/root/db/xn--fiqs8s.html"
        );
    }

    #[test]
    fn test_page_url_without_trailing_slash() {
        let config = Config {
            registry_base_url: "http://127.0.0.1:8080/db".to_string(),
            ..Config::default()
        };
        let resolver = RegistryResolver::new(&config).unwrap();
        assert_eq!(resolver.page_url("net").unwrap().as_str(), "http://127.0.0.1:8080/db/net.html");
    }

    #[test]
    fn test_page_url_encodes_path_characters() {
        let resolver = RegistryResolver::new(&Config::default()).unwrap();
        let url = resolver.page_url("a/b?c").unwrap();
        assert_eq!(url.as_str(), "https://www.iana.org/domains/root/db/a%2Fb%3Fc.html");
    }
}
