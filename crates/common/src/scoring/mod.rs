//! Weighted score calculation
//!
//! A lecturer's raw average is shrunk toward the global mean so a single
//! extreme rating cannot outrank a long history of consistent ones. The
//! prior weight is configured (`scoring.mean_mark_general_weight`); the
//! global mean is a mean-of-means over lecturers with at least one
//! approved comment.

/// Arithmetic mean of the three per-dimension marks
pub fn mark_general(kindness: i32, freebie: i32, clarity: i32) -> f64 {
    f64::from(kindness + freebie + clarity) / 3.0
}

/// Shrinkage-weighted mark
///
/// `mark_weighted = (mark_general * n + mu * w) / (n + w)`
///
/// With `n = 0` the result is exactly `mu`; as `n` grows the result
/// converges to the raw average regardless of `mu`.
pub fn calc_weighted_mark(mark_general: f64, comments_num: i64, mean_mark_general: f64, prior_weight: f64) -> f64 {
    let n = comments_num as f64;
    (mark_general * n + mean_mark_general * prior_weight) / (n + prior_weight)
}

/// Weighted mark for a lecturer that may have no approved comments.
///
/// A lecturer with zero approved comments has no raw average, so the
/// weighted mark is undefined rather than pinned to the global mean.
pub fn weighted_mark(raw_average: Option<f64>, comments_num: i64, mean_mark_general: f64, prior_weight: f64) -> Option<f64> {
    raw_average.map(|avg| calc_weighted_mark(avg, comments_num, mean_mark_general, prior_weight))
}

/// SQL rendering of [`calc_weighted_mark`], for listings that sort and
/// paginate on the weighted mark inside the query. The NULL branch for
/// a zero count mirrors [`weighted_mark`] returning `None`.
///
/// Any change to the arithmetic belongs here, next to the Rust form
/// and the property tests below.
pub fn weighted_mark_sql(avg: &str, count: &str, mu: &str, prior_weight: &str) -> String {
    format!(
        "CASE WHEN COALESCE({count}, 0) > 0 \
         THEN ({avg} * {count} + {mu} * {prior_weight}) / ({count} + {prior_weight}) END"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f64 = 0.75;

    #[test]
    fn test_mark_general_is_exact_mean() {
        assert_eq!(mark_general(1, 1, 1), 1.0);
        assert_eq!(mark_general(-2, -2, -2), -2.0);
        assert!((mark_general(1, 0, 0) - 1.0 / 3.0).abs() < 1e-12);
        assert!((mark_general(2, -1, 0) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_mark_undefined_without_comments() {
        assert_eq!(weighted_mark(None, 0, 1.5, W), None);
    }

    #[test]
    fn test_weighted_mark_blends_exactly() {
        // (2.0 * 1 + 1.0 * 0.75) / (1 + 0.75)
        let got = calc_weighted_mark(2.0, 1, 1.0, W);
        assert!((got - 2.75 / 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_mark_converges_to_raw_average() {
        let raw = 1.8;
        let far_mean = -2.0;
        let with_many = calc_weighted_mark(raw, 1_000_000, far_mean, W);
        assert!((with_many - raw).abs() < 1e-4);

        // Monotone approach: more evidence means less pull toward the mean
        let few = calc_weighted_mark(raw, 2, far_mean, W);
        let more = calc_weighted_mark(raw, 50, far_mean, W);
        assert!((more - raw).abs() < (few - raw).abs());
    }

    #[test]
    fn test_sql_rendering_pins_the_same_arithmetic() {
        assert_eq!(
            weighted_mark_sql("avg", "n", "$1", "$2"),
            "CASE WHEN COALESCE(n, 0) > 0 THEN (avg * n + $1 * $2) / (n + $2) END"
        );
    }

    #[test]
    fn test_low_evidence_pulled_toward_mean() {
        // One extreme rating must not outrank a consistently good lecturer
        let one_extreme = calc_weighted_mark(2.0, 1, 0.5, W);
        let many_good = calc_weighted_mark(1.7, 100, 0.5, W);
        assert!(many_good > one_extreme);
    }
}
