//! Symbol normalization and 24/7 classification.

use crate::types::{Symbol, SymbolMetadata};

/// Classify a symbol as 24/7-traded (crypto, futures) versus session-bound.
///
/// True when cached metadata declares a crypto quote type OR the symbol's
/// suffix alone marks it as 24/7; otherwise false.
#[must_use]
pub fn is_24_7(symbol: &Symbol, metadata: Option<&SymbolMetadata>) -> bool {
    let metadata_says_crypto = metadata
        .map(|m| m.quote_type.to_ascii_lowercase().contains("crypto"))
        .unwrap_or(false);
    metadata_says_crypto || symbol.looks_24_7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_uppercase_and_strips_invalid_chars() {
        let sym = Symbol::normalize(" aapl ").unwrap();
        assert_eq!(sym.as_str(), "AAPL");
    }

    #[test]
    fn empty_canonicalization_rejected() {
        assert!(Symbol::normalize("   ").is_none());
        assert!(Symbol::normalize("@@@").is_none());
    }

    #[test]
    fn classifies_crypto_suffix_as_24_7() {
        let sym = Symbol::normalize("BTC-USD").unwrap();
        assert!(is_24_7(&sym, None));
    }

    #[test]
    fn classifies_futures_suffix_as_24_7() {
        let sym = Symbol::normalize("ES=F").unwrap();
        assert!(is_24_7(&sym, None));
    }

    #[test]
    fn classifies_plain_equity_as_session_bound() {
        let sym = Symbol::normalize("AAPL").unwrap();
        assert!(!is_24_7(&sym, None));
    }

    #[test]
    fn metadata_crypto_quote_type_marks_24_7_without_suffix() {
        let sym = Symbol::normalize("WEIRD").unwrap();
        let meta = SymbolMetadata {
            quote_type: "CRYPTOCURRENCY".to_string(),
            ..Default::default()
        };
        assert!(is_24_7(&sym, Some(&meta)));
    }
}
