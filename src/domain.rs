//! Domain normalization.
//!
//! A domain arrives exactly as the caller typed it, possibly with Unicode
//! labels. Registry lookups need the ASCII-compatible form, so every label is
//! converted on its own and rejoined in the original order.

use crate::errors::WhoisError;
use tracing::debug;

/// A domain in both its raw (as received) and ASCII-compatible forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    raw: String,
    labels: Vec<String>,
}

impl Domain {
    /// Convert each `.`-separated label to its ASCII-compatible encoding.
    ///
    /// Labels that are already ASCII are kept byte-for-byte, so ASCII input
    /// normalizes to itself. Labels with non-ASCII characters go through
    /// IDNA ToASCII; a label it rejects fails with `InvalidDomain`.
    /// ToASCII maps the ideographic and full-width dots to `.`, so its
    /// output is split again and each piece becomes a label of its own.
    pub fn normalize(raw: &str) -> Result<Self, WhoisError> {
        let mut labels = Vec::new();
        for label in raw.split('.') {
            let ascii = label_to_ascii(label)?;
            labels.extend(ascii.split('.').map(str::to_string));
        }

        let domain = Self {
            raw: raw.to_string(),
            labels,
        };
        debug!("Normalized '{}' to '{}'", domain.raw, domain.ascii());
        Ok(domain)
    }

    /// The domain exactly as supplied.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The ASCII-compatible form, labels joined with `.`.
    pub fn ascii(&self) -> String {
        self.labels.join(".")
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Rightmost ASCII label, the registry lookup key.
    pub fn suffix(&self) -> &str {
        // split() always yields at least one item
        self.labels.last().map(String::as_str).unwrap_or_default()
    }
}

fn label_to_ascii(label: &str) -> Result<String, WhoisError> {
    if label.is_ascii() {
        return Ok(label.to_string());
    }

    idna::domain_to_ascii(label)
        .map_err(|e| WhoisError::InvalidDomain(format!("label '{}' cannot be encoded: {}", label, e)))
}
