use crate::media_type::MediaType;
use tracing::debug;

pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_HTML: &str = "text/html";

/// Representations the pipeline can produce, in the order they are offered.
pub const PRODUCIBLE: [&str; 3] = [TEXT_PLAIN, APPLICATION_JSON, TEXT_HTML];

/// Caller preferences in header order. Quality values are parsed along with
/// the other parameters but never consulted: earlier entries always win.
#[derive(Debug, Clone, Default)]
pub struct AcceptList {
    entries: Vec<MediaType>,
}

impl AcceptList {
    pub fn parse(header: &str) -> Self {
        let entries = header
            .split(',')
            .filter(|token| !token.trim().is_empty())
            .map(MediaType::parse)
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[MediaType] {
        &self.entries
    }

    /// First producible type accepted, scanning preferences in order and,
    /// for each one, the producible list in the order given.
    pub fn select<'a>(&self, producible: &[&'a str]) -> Option<&'a str> {
        self.entries
            .iter()
            .find_map(|pattern| producible.iter().copied().find(|candidate| pattern.matches(candidate)))
    }
}

pub fn negotiate<'a>(accept: &str, producible: &[&'a str]) -> Option<&'a str> {
    let selected = AcceptList::parse(accept).select(producible);
    debug!("Negotiated {:?} for Accept '{}'", selected, accept);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_accepted_entry_drives_selection() {
        assert_eq!(negotiate("text/html,text/plain", &PRODUCIBLE), Some(TEXT_HTML));
        assert_eq!(negotiate("text/plain,text/html", &PRODUCIBLE), Some(TEXT_PLAIN));
    }

    #[test]
    fn test_wildcard_picks_first_producible() {
        assert_eq!(negotiate("text/*", &PRODUCIBLE), Some(TEXT_PLAIN));
        assert_eq!(negotiate("*/*", &PRODUCIBLE), Some(TEXT_PLAIN));
        assert_eq!(negotiate("application/*", &PRODUCIBLE), Some(APPLICATION_JSON));
    }

    #[test]
    fn test_browser_header() {
        let accept = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
        assert_eq!(negotiate(accept, &PRODUCIBLE), Some(TEXT_HTML));
    }

    #[test]
    fn test_no_match_is_none() {
        assert_eq!(negotiate("application/xml", &PRODUCIBLE), None);
        assert_eq!(negotiate("", &PRODUCIBLE), None);
    }

    #[test]
    fn test_quality_values_are_ignored() {
        assert_eq!(
            negotiate("application/json;q=0.1, text/plain;q=1.0", &PRODUCIBLE),
            Some(APPLICATION_JSON)
        );
    }

    #[test]
    fn test_blank_tokens_are_skipped() {
        let list = AcceptList::parse(" , ,application/json,  ,");
        assert_eq!(list.entries().len(), 1);
        assert_eq!(list.select(&PRODUCIBLE), Some(APPLICATION_JSON));
    }
}
