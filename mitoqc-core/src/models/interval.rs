use serde::{Deserialize, Serialize};

use crate::errors::{MitoQcError, Result};

/// Represent the retained window of a target, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInterval {
    pub target: String,
    pub min_pos: i64,
    pub max_pos: i64,
}

impl TargetInterval {
    ///
    /// Trim `trim_bases` from both ends of the observed `[lo, hi]` window.
    /// An empty result is a configuration error, never clamped.
    ///
    pub fn trimmed(target: &str, lo: i64, hi: i64, trim_bases: i64) -> Result<Self> {
        let min_pos = lo + trim_bases;
        let max_pos = hi - trim_bases;
        if min_pos > max_pos {
            return Err(MitoQcError::IntervalTooSmall {
                target: target.to_string(),
                min_pos,
                max_pos,
            });
        }
        Ok(TargetInterval {
            target: target.to_string(),
            min_pos,
            max_pos,
        })
    }

    #[inline]
    pub fn contains(&self, pos: i64) -> bool {
        pos >= self.min_pos && pos <= self.max_pos
    }

    pub fn width(&self) -> i64 {
        self.max_pos - self.min_pos + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;

    #[rstest]
    fn test_trimmed_bounds() {
        let iv = TargetInterval::trimmed("T", 100, 200, 10).unwrap();
        assert_eq!((iv.min_pos, iv.max_pos), (110, 190));
        assert!(iv.contains(110));
        assert!(iv.contains(190));
        assert!(!iv.contains(191));
        assert_eq!(iv.width(), 81);
    }

    #[rstest]
    fn test_single_base_survives() {
        let iv = TargetInterval::trimmed("T", 100, 200, 50).unwrap();
        assert_eq!((iv.min_pos, iv.max_pos), (150, 150));
    }

    #[rstest]
    #[case(100, 190, 46)]
    #[case(100, 189, 45)]
    fn test_too_small(#[case] lo: i64, #[case] hi: i64, #[case] trim: i64) {
        let err = TargetInterval::trimmed("T", lo, hi, trim).unwrap_err();
        assert!(matches!(err, MitoQcError::IntervalTooSmall { .. }));
    }
}
