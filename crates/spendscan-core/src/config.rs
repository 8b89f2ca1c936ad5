//! Core configuration
//!
//! All tunable policy constants live here and are passed into each
//! component at construction. There is no global settings singleton;
//! the CLI builds one `CoreConfig` at startup and threads it through.

/// Policy constants for classification, learning, and the pipeline.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Confidence assigned when a vendor mapping is first created or
    /// overridden to a new category (the "unlearned" seed).
    pub confidence_seed: i64,

    /// Divisor k in the reinforcement step `confidence += (100 - confidence) / k`.
    /// Confidence converges toward 100 without reaching it from below.
    pub reinforce_divisor: i64,

    /// Confidence reported when no mapping exists for a vendor.
    pub fallback_confidence: i64,

    /// Suggestions below this confidence are flagged for review.
    /// The backend never auto-confirms on the user's behalf.
    pub low_confidence_threshold: i64,

    /// Maximum OCR attempts per pipeline run (initial call + retries).
    pub max_parse_attempts: u32,

    /// Backoff before the first OCR retry; doubles on each subsequent one.
    pub retry_backoff_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            confidence_seed: 50,
            reinforce_divisor: 4,
            fallback_confidence: 0,
            low_confidence_threshold: 70,
            max_parse_attempts: 3,
            retry_backoff_ms: 250,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.confidence_seed, 50);
        assert_eq!(config.reinforce_divisor, 4);
        assert_eq!(config.fallback_confidence, 0);
        assert_eq!(config.low_confidence_threshold, 70);
        assert_eq!(config.max_parse_attempts, 3);
    }
}
