use std::collections::{HashMap, HashSet};

use ammonia::Builder;

/// Sanitizes article HTML captured by the browser extension down to an
/// essential allowlist: headers, paragraphs, line breaks and links. All
/// other markup (divs, styles, scripts, classes, ids) is stripped while the
/// text content is kept. Only `href` survives on links, restricted to
/// http/https/mailto.
pub fn sanitize_article_html(html: &str) -> String {
    let mut link_attributes = HashMap::new();
    link_attributes.insert("a", HashSet::from(["href"]));

    Builder::default()
        .tags(HashSet::from(["h1", "h2", "h3", "h4", "h5", "h6", "p", "br", "a"]))
        .generic_attributes(HashSet::new())
        .tag_attributes(link_attributes)
        .url_schemes(HashSet::from(["http", "https", "mailto"]))
        .link_rel(None)
        .clean(html)
        .to_string()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_allowed_tags_and_href() {
        let input = r#"<h2>Title</h2><p>Read <a href="https://example.com">this</a>.</p>"#;
        assert_eq!(
            sanitize_article_html(input),
            r#"<h2>Title</h2><p>Read <a href="https://example.com">this</a>.</p>"#
        );
    }

    #[test]
    fn strips_scripts_and_layout_markup() {
        let input = r#"<div class="wrap"><script>alert(1)</script><p id="x" style="color:red">body</p></div>"#;
        assert_eq!(sanitize_article_html(input), "<p>body</p>");
    }

    #[test]
    fn drops_unsafe_link_schemes() {
        let cleaned = sanitize_article_html(r#"<a href="javascript:alert(1)">click</a>"#);
        assert!(!cleaned.contains("javascript"));
        assert!(cleaned.contains("click"));
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_article_html(""), "");
        assert_eq!(sanitize_article_html("   "), "");
    }
}
