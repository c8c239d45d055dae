use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

pub(crate) static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"product-item-id-(\d+)").unwrap());

static TESTID_DIV: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div[data-testid]").unwrap());

const MARKER_ATTR: &str = "data-testid";

pub fn marker(el: ElementRef<'_>) -> Option<&str> {
    el.value().attr(MARKER_ATTR)
}

fn is_listing_div(el: ElementRef<'_>) -> bool {
    el.value().name() == "div" && marker(el).is_some_and(|m| MARKER_RE.is_match(m))
}

/// Listing containers in document order, each resolved through [`resolve_nesting`].
/// Candidates whose promotion finds no outer container are dropped.
pub fn listing_containers(doc: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    doc.select(&TESTID_DIV)
        .filter(|el| is_listing_div(*el))
        .filter_map(resolve_nesting)
}

/// An element repeating its own marker further down is a wrapper, not the
/// listing: hand back the closest marked `div` above it instead.
pub fn resolve_nesting(candidate: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let value = marker(candidate)?;
    let repeats = candidate
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|d| marker(d) == Some(value));

    if !repeats {
        return Some(candidate);
    }
    candidate
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| is_listing_div(*a))
}
