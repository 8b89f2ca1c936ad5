//! Vendor name normalization
//!
//! Canonicalizes free-text vendor names so OCR noise does not fragment
//! the mapping space. Applied identically at lookup and write time -
//! that symmetry is the central correctness property of the classifier.

/// Normalize a vendor name for mapping lookups and writes.
///
/// Lowercases, trims, collapses internal whitespace runs, and strips
/// leading/trailing punctuation. Interior punctuation is preserved
/// ("starbucks #4521" stays distinct from "starbucks #4522").
pub fn normalize_vendor(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() && c != '#');

    let mut out = String::with_capacity(trimmed.len());
    let mut last_was_space = false;
    for c in trimmed.chars() {
        if c.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_was_space = false;
        }
    }

    // A run of trailing whitespace leaves one space behind
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_casefold_and_trim() {
        assert_eq!(normalize_vendor("  STARBUCKS #4521  "), "starbucks #4521");
        assert_eq!(normalize_vendor("Amazon"), "amazon");
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(normalize_vendor("WHOLE   FOODS\tMARKET"), "whole foods market");
        assert_eq!(normalize_vendor("a \n b"), "a b");
    }

    #[test]
    fn test_edge_punctuation_stripped() {
        assert_eq!(normalize_vendor("*STARBUCKS*"), "starbucks");
        assert_eq!(normalize_vendor("\"Target\""), "target");
        // Interior punctuation survives
        assert_eq!(normalize_vendor("7-Eleven"), "7-eleven");
    }

    #[test]
    fn test_ocr_noise_converges() {
        // Variants of the same storefront collapse to one key
        let canonical = normalize_vendor("Starbucks #4521");
        assert_eq!(normalize_vendor("STARBUCKS  #4521"), canonical);
        assert_eq!(normalize_vendor(" starbucks #4521."), canonical);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_vendor(""), "");
        assert_eq!(normalize_vendor("   "), "");
        assert_eq!(normalize_vendor("**"), "");
    }
}
