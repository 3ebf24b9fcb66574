//! Submit click and price extraction.
//!
//! Nothing in here returns an error: a quote that cannot be read is an empty
//! string, which is itself a valid (failure-signaling) result. Session death
//! during extraction surfaces naturally on the next unit's navigation.

use fantoccini::{Client, Locator};
use regex::Regex;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tradescout_drivers::scout_browser::pacing::Pacer;
use tracing::{debug, warn};

/// Price elements, most specific first; a bare heading is the last guess
/// before the full-document fallback.
const PRICE_SELECTORS: [&str; 4] = [
    ".pricing-display-price",
    "#price-re",
    ".quote-price",
    "h2",
];

/// Submit controls tried in order; the trailing text scan catches restyled
/// buttons.
const SUBMIT_SCRIPT: &str = r#"
    const sels = ["button[type='submit']", "button.btn-submit", "input[type='submit']"];
    for (const s of sels) {
        const b = document.querySelector(s);
        if (b) { b.click(); return true; }
    }
    for (const b of document.querySelectorAll('button')) {
        if (b.textContent.trim().toLowerCase().includes('quote')) { b.click(); return true; }
    }
    return false;
"#;

/// Extract the numeric portion of a currency-prefixed price.
///
/// Requires the marker (e.g. `RM`), optional whitespace, digits with
/// optional thousands commas and decimal fraction. Commas are stripped from
/// the result. No match yields the empty string.
pub fn parse_price_text(text: &str, marker: &str) -> String {
    let pattern = format!(r"{}\s*([\d,]+(?:\.\d+)?)", regex::escape(marker));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return String::new(),
    };
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace(',', ""))
        .unwrap_or_default()
}

/// Click submit and read the quoted price, or `""` when nothing readable
/// appeared within the short wait.
pub async fn submit_and_extract(
    client: &Client,
    pacer: &Pacer,
    marker: &str,
    short_wait: Duration,
    poll: Duration,
) -> String {
    match client.execute(SUBMIT_SCRIPT, vec![]).await {
        Ok(v) if v.as_bool().unwrap_or(false) => {}
        Ok(_) => {
            warn!(target: "scrape.extract", "no submit control found");
            return String::new();
        }
        Err(e) => {
            warn!(target: "scrape.extract", error = %e, "submit click failed");
            return String::new();
        }
    }
    pacer.settle().await;

    // The quote renders asynchronously; poll the selector ladder until the
    // short deadline, then try one whole-document scan per pass.
    let deadline = Instant::now() + short_wait;
    loop {
        for selector in PRICE_SELECTORS {
            let Ok(elements) = client.find_all(Locator::Css(selector)).await else {
                return String::new();
            };
            for element in &elements {
                let Ok(text) = element.text().await else {
                    continue;
                };
                let price = parse_price_text(&text, marker);
                if !price.is_empty() {
                    debug!(target: "scrape.extract", %selector, %price, "price extracted");
                    return price;
                }
            }
        }

        if let Ok(source) = client.source().await {
            let price = parse_price_text(&source, marker);
            if !price.is_empty() {
                debug!(target: "scrape.extract", %price, "price extracted from document scan");
                return price;
            }
        }

        if Instant::now() >= deadline {
            debug!(target: "scrape.extract", "no price found before deadline");
            return String::new();
        }
        sleep(poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spaced_price_with_thousands_comma() {
        assert_eq!(parse_price_text("Trade-in value: RM 1,234", "RM"), "1234");
    }

    #[test]
    fn parses_unspaced_price_with_fraction() {
        assert_eq!(parse_price_text("RM1234.50", "RM"), "1234.50");
    }

    #[test]
    fn missing_marker_yields_empty() {
        assert_eq!(parse_price_text("your quote is 1234", "RM"), "");
        assert_eq!(parse_price_text("", "RM"), "");
    }

    #[test]
    fn first_marker_wins_in_longer_text() {
        let text = "Was RM 2,000. Now RM 1,500!";
        assert_eq!(parse_price_text(text, "RM"), "2000");
    }

    #[test]
    fn extraction_is_idempotent_over_identical_text() {
        let text = "RM 899 today";
        assert_eq!(
            parse_price_text(text, "RM"),
            parse_price_text(text, "RM")
        );
    }

    #[test]
    fn marker_with_regex_metacharacters_is_escaped() {
        assert_eq!(parse_price_text("S$ 1,000", "S$"), "1000");
    }
}
