//! Small helpers over `scraper` shared by the site adapters.
//!
//! `scraper::Html` is not `Send`, so adapters parse synchronously into owned
//! values and never hold a document across an `.await`.

use jobscout_core::error::AppError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub(crate) fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::ParseError(format!("bad selector {css}: {e}")))
}

/// Outer HTML of up to `limit` elements matching `card_css`.
pub(crate) fn split_cards(html: &str, card_css: &str, limit: usize) -> Result<Vec<String>, AppError> {
    let card = selector(card_css)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&card)
        .take(limit)
        .map(|el| el.html())
        .collect())
}

/// Visible text of an element with whitespace collapsed, `None` if blank.
pub(crate) fn element_text(el: ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

pub(crate) fn first_text(root: ElementRef<'_>, sel: &Selector) -> Option<String> {
    root.select(sel).find_map(element_text)
}

pub(crate) fn first_attr(root: ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    root.select(sel)
        .find_map(|el| el.value().attr(attr))
        .map(str::to_string)
}

/// Resolve a possibly relative link against the page it was found on.
pub(crate) fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_cards_respects_limit() {
        let html = r#"<div class="c">1</div><div class="c">2</div><div class="c">3</div>"#;
        let cards = split_cards(html, ".c", 2).unwrap();
        assert_eq!(cards.len(), 2);
        assert!(cards[0].contains(">1<"));
    }

    #[test]
    fn first_text_collapses_whitespace_and_skips_blank() {
        let doc = Html::parse_fragment("<h2>  </h2><h2>Data\n   Analyst</h2>");
        let h2 = selector("h2").unwrap();
        assert_eq!(
            first_text(doc.root_element(), &h2).as_deref(),
            Some("Data Analyst")
        );
    }

    #[test]
    fn resolve_url_handles_relative_and_absolute() {
        let base = Url::parse("https://www.indeed.com/jobs?q=x").unwrap();
        assert_eq!(
            resolve_url(&base, "/rc/clk?jk=abc").as_deref(),
            Some("https://www.indeed.com/rc/clk?jk=abc")
        );
        assert_eq!(
            resolve_url(&base, "https://acme.test/apply").as_deref(),
            Some("https://acme.test/apply")
        );
        assert_eq!(resolve_url(&base, "  "), None);
    }

    #[test]
    fn invalid_selector_is_a_parse_error() {
        assert!(matches!(selector("div[").unwrap_err(), AppError::ParseError(_)));
    }
}
