use std::collections::HashMap;

/// One entry of an `Accept`-style header, e.g. `text/html;level=1`.
///
/// Values are kept exactly as written; no case folding happens anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub main_type: String,
    pub sub_type: String,
    pub params: HashMap<String, String>,
}

impl MediaType {
    /// Parse a single token. Parameters that are not a clean `key=value`
    /// pair are dropped. A token without `/` yields an empty subtype, which
    /// matches nothing except a `*` pattern.
    pub fn parse(token: &str) -> Self {
        let mut parts = token.split(';');
        let full_type = parts.next().unwrap_or_default().trim();

        let mut type_parts = full_type.split('/');
        let main_type = type_parts.next().unwrap_or_default();
        let sub_type = type_parts.next().unwrap_or_default();

        let params = parts
            .filter_map(|param| {
                let mut kv = param.split('=');
                match (kv.next(), kv.next(), kv.next()) {
                    (Some(key), Some(value), None) => {
                        Some((key.trim().to_string(), value.trim().to_string()))
                    }
                    _ => None,
                }
            })
            .collect();

        Self {
            main_type: main_type.to_string(),
            sub_type: sub_type.to_string(),
            params,
        }
    }

    pub fn is_all_types(&self) -> bool {
        self.main_type == "*" && self.sub_type == "*"
    }

    /// Whether this pattern accepts `candidate`. Only the pattern's wildcards
    /// count; a `*` in the candidate is compared literally.
    pub fn matches(&self, candidate: &str) -> bool {
        if self.is_all_types() {
            return true;
        }
        let other = MediaType::parse(candidate);
        self.main_type == other.main_type && (self.sub_type == "*" || self.sub_type == other.sub_type)
    }
}

impl std::str::FromStr for MediaType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(MediaType::parse(s))
    }
}
