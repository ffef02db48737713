//! Price values and their textual rendering

/// A token price as scraped from the source page.
pub type Price = u64;

/// Render a non-negative integer with `,` thousands separators.
pub fn format_grouped(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

/// Render a signed delta with an explicit `+` for gains and grouping.
pub fn format_signed(delta: i128) -> String {
    let magnitude = format_grouped(u64::try_from(delta.unsigned_abs()).unwrap_or(u64::MAX));
    match delta.signum() {
        1 => format!("+{magnitude}"),
        -1 => format!("-{magnitude}"),
        _ => magnitude,
    }
}

/// Annotation appended to the price in notifications, e.g. ` [+1,250]`.
///
/// Empty when there is no usable previous price (absent or zero).
pub fn diff_annotation(current: Price, previous: Option<Price>) -> String {
    match previous {
        Some(prev) if prev > 0 => {
            let delta = i128::from(current) - i128::from(prev);
            format!(" [{}]", format_signed(delta))
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0")]
    #[case(999, "999")]
    #[case(1_000, "1,000")]
    #[case(235_000, "235,000")]
    #[case(1_234_567, "1,234,567")]
    fn test_format_grouped(#[case] value: u64, #[case] expected: &str) {
        assert_eq!(format_grouped(value), expected);
    }

    #[test]
    fn test_diff_annotation_gain() {
        assert_eq!(diff_annotation(235_000, Some(230_000)), " [+5,000]");
    }

    #[test]
    fn test_diff_annotation_loss_has_no_plus() {
        assert_eq!(diff_annotation(228_750, Some(230_000)), " [-1,250]");
    }

    #[test]
    fn test_diff_annotation_without_usable_previous() {
        assert_eq!(diff_annotation(400_000, None), "");
        assert_eq!(diff_annotation(400_000, Some(0)), "");
    }
}
