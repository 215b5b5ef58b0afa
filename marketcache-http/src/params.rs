//! Query-parameter parsing per §6: `tf` case-insensitive (default `5m`,
//! handled by `Timeframe::parse_or_default`), `ext` loose boolean parsing,
//! `since` clamped to non-negative, symbol CSVs split on comma.

#[must_use]
pub fn parse_ext(raw: Option<&str>) -> bool {
    matches!(
        raw.map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("on")
    )
}

#[must_use]
pub fn parse_since(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0)
        .max(0)
}

#[must_use]
pub fn split_symbols_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_accepts_loose_truthy_forms() {
        for v in ["1", "true", "TRUE", "yes", "on"] {
            assert!(parse_ext(Some(v)), "{v} should parse as true");
        }
        assert!(!parse_ext(Some("0")));
        assert!(!parse_ext(None));
    }

    #[test]
    fn since_clamps_negatives_to_zero() {
        assert_eq!(parse_since(Some("-5")), 0);
        assert_eq!(parse_since(Some("42")), 42);
        assert_eq!(parse_since(None), 0);
        assert_eq!(parse_since(Some("garbage")), 0);
    }

    #[test]
    fn splits_and_trims_csv_symbols() {
        assert_eq!(
            split_symbols_csv(" aapl, msft ,,nvda"),
            vec!["aapl".to_string(), "msft".to_string(), "nvda".to_string()]
        );
    }
}
