use crate::{
    errors::WhoisError,
    negotiation::{APPLICATION_JSON, TEXT_HTML, TEXT_PLAIN},
    whois::WhoisResult,
};
use once_cell::sync::Lazy;

const HOME_PAGE: &str = include_str!("../templates/home.html");
const RESULT_TEMPLATE: &str = include_str!("../templates/result.html");
const DOMAIN_MARKER: &str = "{{domain}}";
const WHOIS_MARKER: &str = "{{whois}}";

// Split once up front so substituted text is never rescanned for markers.
static RESULT_PARTS: Lazy<(&'static str, &'static str, &'static str)> = Lazy::new(|| {
    let (head, rest) = RESULT_TEMPLATE
        .split_once(DOMAIN_MARKER)
        .expect("result template has a domain marker");
    let (middle, tail) = rest
        .split_once(WHOIS_MARKER)
        .expect("result template has a whois marker after the domain marker");
    (head, middle, tail)
});

/// A fully rendered body together with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Representation {
    PlainText(String),
    Json(String),
    Html(String),
}

impl Representation {
    pub fn content_type(&self) -> &'static str {
        match self {
            Representation::PlainText(_) => "text/plain; charset=utf-8",
            Representation::Json(_) => "application/json",
            Representation::Html(_) => "text/html; charset=utf-8",
        }
    }

    /// Media type this representation was negotiated as.
    pub fn media_type(&self) -> &'static str {
        match self {
            Representation::PlainText(_) => TEXT_PLAIN,
            Representation::Json(_) => APPLICATION_JSON,
            Representation::Html(_) => TEXT_HTML,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Representation::PlainText(body) | Representation::Json(body) | Representation::Html(body) => body,
        }
    }

    pub fn into_body(self) -> String {
        match self {
            Representation::PlainText(body) | Representation::Json(body) | Representation::Html(body) => body,
        }
    }
}

/// Render `result` as the negotiated media type. `raw_domain` is what the
/// caller typed and is only used to refill the HTML form.
pub fn render(media_type: &str, raw_domain: &str, result: &WhoisResult) -> Result<Representation, WhoisError> {
    match media_type {
        TEXT_PLAIN => Ok(Representation::PlainText(result.whois.clone())),
        APPLICATION_JSON => {
            let body = serde_json::to_string(result)
                .map_err(|e| WhoisError::Internal(format!("Failed to serialize result: {}", e)))?;
            Ok(Representation::Json(body))
        }
        TEXT_HTML => Ok(Representation::Html(result_page(raw_domain, &result.whois))),
        other => Err(WhoisError::Internal(format!("No renderer for media type '{}'", other))),
    }
}

pub fn home_page() -> Representation {
    Representation::Html(HOME_PAGE.to_string())
}

pub fn result_page(domain: &str, whois: &str) -> String {
    let (head, middle, tail) = *RESULT_PARTS;
    let domain = escape_html(domain);
    let whois = escape_html(whois);

    let mut page = String::with_capacity(head.len() + domain.len() + middle.len() + whois.len() + tail.len());
    page.push_str(head);
    page.push_str(&domain);
    page.push_str(middle);
    page.push_str(&whois);
    page.push_str(tail);
    page
}

/// Escape text for use in element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn result() -> WhoisResult {
        WhoisResult {
            server: "whois.verisign-grs.com".to_string(),
            domain: "example.com".to_string(),
            whois: "Domain Name: EXAMPLE.COM\r\n".to_string(),
        }
    }

    #[test]
    fn test_json_body_is_exact() {
        let rep = render(APPLICATION_JSON, "example.com", &result()).unwrap();
        assert_eq!(rep.content_type(), "application/json");
        assert_eq!(
            rep.body(),
            r#"{"server":"whois.verisign-grs.com","domain":"example.com","whois":"Domain Name: EXAMPLE.COM\r\n"}"#
        );
    }

    #[test]
    fn test_plain_text_is_raw_response() {
        let rep = render(TEXT_PLAIN, "example.com", &result()).unwrap();
        assert_eq!(rep.content_type(), "text/plain; charset=utf-8");
        assert_eq!(rep.into_body(), "Domain Name: EXAMPLE.COM\r\n");
    }

    #[test]
    fn test_html_round_trip() {
        let rep = render(TEXT_HTML, "Example.com", &result()).unwrap();
        let body = rep.body();

        let value = Regex::new(r#"value="([^"]*)""#).unwrap();
        let pre = Regex::new(r"(?s)<pre>(.*)</pre>").unwrap();
        assert_eq!(&value.captures(body).unwrap()[1], "Example.com");
        assert_eq!(&pre.captures(body).unwrap()[1], "Domain Name: EXAMPLE.COM\r\n");
        assert!(!body.contains(DOMAIN_MARKER));
        assert!(!body.contains(WHOIS_MARKER));
    }

    #[test]
    fn test_html_escapes_untrusted_text() {
        let page = result_page("\"><script>x</script>", "</pre><img src=x onerror=alert(1)>");
        assert!(!page.contains("<script>"));
        assert!(!page.contains("<img"));
        assert!(page.contains("value=\"&quot;&gt;&lt;script&gt;x&lt;/script&gt;\""));
        assert!(page.contains("<pre>&lt;/pre&gt;&lt;img src=x onerror=alert(1)&gt;</pre>"));
    }

    #[test]
    fn test_markers_in_input_are_not_expanded() {
        let page = result_page("{{whois}}", "{{domain}}");
        assert!(page.contains("value=\"{{whois}}\""));
        assert!(page.contains("<pre>{{domain}}</pre>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a & b <c> \"d\" 'e'"), "a &amp; b &lt;c&gt; &quot;d&quot; &#39;e&#39;");
        assert_eq!(escape_html("plain.example"), "plain.example");
    }

    #[test]
    fn test_home_page_has_form() {
        let page = home_page();
        assert_eq!(page.content_type(), "text/html; charset=utf-8");
        assert!(page.body().contains("name=\"domain\""));
    }

    #[test]
    fn test_unknown_media_type() {
        assert!(render("application/xml", "example.com", &result()).is_err());
    }
}
