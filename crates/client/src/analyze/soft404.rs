//! Soft-404 detection: pages that answer 200 but are really an error page.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use super::find_phrase;

/// Phrases that mark an error page, matched against lower-cased text.
const SOFT_404_PHRASES: &[&str] = &[
    "page not found",
    "no results found",
    "page you requested",
    "page is sleeping",
    "under maintenance",
    "this page has moved",
    "cannot be found",
    "could not be found",
    "does not exist",
    "error 404",
    "404 error",
    "404 not found",
];

/// Pages whose header, footer and nav make up more than this share of the
/// body have no real content.
pub const BOILERPLATE_THRESHOLD: f64 = 0.7;

const BOILERPLATE_TAGS: &[&str] = &["header", "footer", "nav"];

static TITLE_404: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b404\b").expect("invalid 404 regex"));

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("invalid selector"));

static BOILERPLATE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body header, body footer, body nav").expect("invalid selector"));

/// Whether the page is an error page served with a success status.
///
/// `title` and `body_text` must already be lower-cased.
pub fn is_soft_404(document: &Html, title: &str, body_text: &str) -> bool {
    if TITLE_404.is_match(title) || find_phrase(title, SOFT_404_PHRASES).is_some() {
        tracing::debug!(title, "soft 404 signal in title");
        return true;
    }

    if let Some(phrase) = find_phrase(body_text, SOFT_404_PHRASES) {
        tracing::debug!(phrase, "soft 404 signal in body");
        return true;
    }

    let ratio = boilerplate_ratio(document);
    if ratio > BOILERPLATE_THRESHOLD {
        tracing::debug!(ratio, "page is mostly boilerplate");
        return true;
    }

    false
}

/// Share of the body taken up by top-level header, footer and nav markup.
///
/// Returns 0.0 when the body is empty.
pub fn boilerplate_ratio(document: &Html) -> f64 {
    let Some(body) = document.select(&BODY).next() else {
        return 0.0;
    };
    let total = body.inner_html().len();
    if total == 0 {
        return 0.0;
    }

    let boilerplate: usize = document
        .select(&BOILERPLATE)
        .filter(|el| !has_boilerplate_ancestor(*el))
        .map(|el| el.html().len())
        .sum();

    boilerplate as f64 / total as f64
}

fn has_boilerplate_ancestor(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| BOILERPLATE_TAGS.contains(&a.value().name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(html: &str, title: &str) -> bool {
        let document = Html::parse_document(html);
        let body = crate::analyze::visible_text(&document);
        is_soft_404(&document, &title.to_lowercase(), &body)
    }

    #[test]
    fn test_title_404() {
        let html = "<html><body><nav>Home | Services</nav><footer>City of Springfield</footer></body></html>";
        assert!(check(html, "404 Page Not Found"));
        assert!(check("<html><body><p>x</p></body></html>", "Error 404 - Springfield"));
    }

    #[test]
    fn test_title_number_is_not_404() {
        let html = format!("<html><body><main><p>{}</p></main></body></html>", "Curbside pickup rules. ".repeat(20));
        assert!(!check(&html, "Route 4040 Collection Schedule"));
    }

    #[test]
    fn test_body_phrase() {
        let html = format!(
            "<html><body><main><h1>Sorry</h1><p>The page you requested could not be found.</p>{}</main></body></html>",
            "<p>Try the search box.</p>".repeat(5)
        );
        assert!(check(&html, "Springfield Public Works"));
    }

    #[test]
    fn test_phrase_inside_script_ignored() {
        let html = format!(
            "<html><body><main>{}</main><script>var msg = 'page not found';</script></body></html>",
            "<p>Flatten cardboard boxes before recycling.</p>".repeat(5)
        );
        assert!(!check(&html, "Cardboard"));
    }

    #[test]
    fn test_boilerplate_only_page() {
        let nav = format!("<nav>{}</nav>", "<a href=\"/x\">Link</a>".repeat(30));
        let footer = format!("<footer>{}</footer>", "<p>Contact us</p>".repeat(20));
        let html = format!("<html><body><header>City</header>{nav}<div>Hi</div>{footer}</body></html>");
        let document = Html::parse_document(&html);
        assert!(boilerplate_ratio(&document) > BOILERPLATE_THRESHOLD);
        assert!(check(&html, "Springfield"));
    }

    #[test]
    fn test_real_content_page() {
        let main = format!("<main>{}</main>", "<p>Place clean glass bottles and jars in the blue cart.</p>".repeat(20));
        let html = format!("<html><body><header>City</header><nav><a href=\"/\">Home</a></nav>{main}<footer>Contact</footer></body></html>");
        let document = Html::parse_document(&html);
        assert!(boilerplate_ratio(&document) < 0.2);
        assert!(!check(&html, "Glass Recycling"));
    }

    #[test]
    fn test_nested_boilerplate_counted_once() {
        let html = "<html><body><header><nav>Menu</nav></header></body></html>";
        let document = Html::parse_document(html);
        let ratio = boilerplate_ratio(&document);
        assert!(ratio <= 1.0);
        assert!(ratio > 0.9);
    }

    #[test]
    fn test_empty_body_ratio() {
        let document = Html::parse_document("<html><body></body></html>");
        assert_eq!(boilerplate_ratio(&document), 0.0);
    }
}
