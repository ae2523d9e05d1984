//! # HTTP WHOIS
//!
//! Resolve a domain to its WHOIS record over plain HTTP.
//!
//! ## Features
//!
//! - Authoritative server discovery from the IANA root-zone database
//! - Internationalized domains converted to their ASCII-compatible form
//! - Raw port-43 WHOIS queries with full stream draining and deadlines
//! - `Accept`-driven rendering as plain text, JSON or HTML
//! - Optional, explicitly invalidated suffix → server cache
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use http_whois::{Config, LookupRequest, Outcome, ResolutionPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let pipeline = ResolutionPipeline::new(&config)?;
//!     let request = LookupRequest {
//!         domain: "example.com".to_string(),
//!         accept: Some("application/json".to_string()),
//!         user_agent: None,
//!     };
//!
//!     if let Outcome::Rendered(representation) = pipeline.run(&request).await? {
//!         println!("{}", representation.body());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod media_type;
pub mod metrics;
pub mod negotiation;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod whois;

// Re-export main types for easy access
pub use cache::SuffixCache;
pub use config::Config;
pub use domain::Domain;
pub use errors::WhoisError;
pub use media_type::MediaType;
pub use negotiation::{negotiate, AcceptList, PRODUCIBLE};
pub use pipeline::{select_domain, LookupRequest, Outcome, ResolutionPipeline};
pub use registry::{RegistryLookup, RegistryResolver, UpstreamResponse, WhoisServerRecord};
pub use render::Representation;
pub use whois::{WhoisClient, WhoisResult};
