use std::sync::LazyLock;

use mail_parser::{MessageParser, PartType};
use regex::{Regex, RegexBuilder};

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"]+|www\.[^\s<>"]+"#).expect("url pattern should compile")
});

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"<a\s[^>]*?href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a\s*>"#)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .expect("anchor pattern should compile")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern should compile"));

static BODY_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        r#"https?://[^\s<>"]+(?:unsubscribe|opt[_-]out)[^\s<>"]*"#,
        r#"https?://[^\s<>"]+(?:click\.notification)[^\s<>"]*"#,
    ]
    .map(|pattern| {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("unsubscribe pattern should compile")
    })
});

/// Best-effort search for an unsubscribe URL in a raw RFC 5322 message.
///
/// The `List-Unsubscribe` header wins; otherwise `text/html` parts are scanned for an anchor whose
/// text mentions unsubscribing, then for URLs that look like unsubscribe endpoints.
pub fn find_unsubscribe_link(raw: &[u8]) -> Option<String> {
    let message = MessageParser::default().parse(raw)?;
    if let Some(url) = message
        .header_raw("List-Unsubscribe")
        .and_then(|value| URL.find(value))
    {
        return Some(url.as_str().to_string());
    }

    message.parts.iter().find_map(|part| match &part.body {
        PartType::Html(html) => link_in_html(html),
        _ => None,
    })
}

fn link_in_html(html: &str) -> Option<String> {
    let anchor = ANCHOR.captures_iter(html).find_map(|captures| {
        let text = TAG.replace_all(&captures[2], "");
        text.to_lowercase()
            .contains("unsubscribe")
            .then(|| captures[1].to_string())
    });
    anchor.or_else(|| {
        BODY_PATTERNS
            .iter()
            .find_map(|pattern| pattern.find(html))
            .map(|found| found.as_str().to_string())
    })
}
