//! Extraction of the price from the token page HTML

use super::FetchError;
use crate::models::Price;

/// Text immediately preceding the current price on the page.
pub const PRICE_MARKER: &str = "<b>Current:</b>";

/// Entity that pads and terminates the price text.
pub const PRICE_DELIMITER: &str = "&nbsp;";

/// Pull the current price out of the page body.
///
/// The page renders it as `<b>Current:</b>&nbsp;235,000&nbsp;...`; the text
/// between the padding and the next `&nbsp;` is parsed after removing
/// thousands separators.
pub fn extract_price(html: &str) -> Result<Price, FetchError> {
    let start = html
        .find(PRICE_MARKER)
        .ok_or(FetchError::MarkerNotFound)?
        + PRICE_MARKER.len();

    let rest = html[start..].trim_start();
    let rest = rest.trim_start_matches(PRICE_DELIMITER).trim_start();

    let end = rest
        .find(PRICE_DELIMITER)
        .ok_or(FetchError::DelimiterNotFound)?;
    let raw = &rest[..end];

    let digits: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    digits
        .parse::<Price>()
        .map_err(|_| FetchError::InvalidNumber(raw.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<div class="token">
        <b>Current:</b>&nbsp;235,000&nbsp;<img src="gold.png"/>
        <b>24h Low:</b>&nbsp;229,871&nbsp;
    </div>"#;

    #[test]
    fn test_extracts_current_price() {
        assert_eq!(extract_price(PAGE).unwrap(), 235_000);
    }

    #[test]
    fn test_small_price_without_separator() {
        let html = "<p><b>Current:</b>&nbsp;950&nbsp;</p>";
        assert_eq!(extract_price(html).unwrap(), 950);
    }

    #[test]
    fn test_missing_marker() {
        let html = "<p><b>Price:</b>&nbsp;235,000&nbsp;</p>";
        assert!(matches!(extract_price(html), Err(FetchError::MarkerNotFound)));
    }

    #[test]
    fn test_missing_delimiter() {
        let html = "<p><b>Current:</b>&nbsp;235,000</p>";
        assert!(matches!(extract_price(html), Err(FetchError::DelimiterNotFound)));
    }

    #[test]
    fn test_non_numeric_value() {
        let html = "<p><b>Current:</b>&nbsp;n/a&nbsp;</p>";
        match extract_price(html) {
            Err(FetchError::InvalidNumber(raw)) => assert_eq!(raw, "n/a"),
            other => panic!("expected InvalidNumber, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_value_is_rejected() {
        let html = "<p><b>Current:</b>&nbsp;-5&nbsp;</p>";
        assert!(matches!(extract_price(html), Err(FetchError::InvalidNumber(_))));
    }
}
