use std::collections::BTreeSet;

use scraper::ElementRef;

use super::containers::{marker, MARKER_RE};

/// Caption-style, left-aligned text: how the catalog grid renders the seller.
const ACCOUNT_NAME_CLASSES: [&str; 3] = [
    "web_ui__Text__text",
    "web_ui__Text__caption",
    "web_ui__Text__left",
];

fn is_account_name(el: ElementRef<'_>) -> bool {
    if el.value().name() != "p" {
        return false;
    }
    let classes: BTreeSet<&str> = el.value().classes().collect();
    classes.len() == ACCOUNT_NAME_CLASSES.len()
        && ACCOUNT_NAME_CLASSES.iter().all(|c| classes.contains(c))
}

/// Trimmed text of the first account-name paragraph inside `container`.
pub fn account_name(container: ElementRef<'_>) -> Option<String> {
    let p = container
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| is_account_name(*el))?;
    Some(p.text().collect::<String>().trim().to_string())
}

/// Digits captured from a `product-item-id-<digits>` marker, as written.
pub fn product_id(marker_value: &str) -> Option<String> {
    MARKER_RE
        .captures(marker_value)
        .map(|c| c[1].to_string())
}

pub fn container_product_id(container: ElementRef<'_>) -> Option<String> {
    product_id(marker(container)?)
}
