//! Two-decimal rounding shared by call durations and report accuracy.

/// Round to two decimals, resolving exact halves to the even digit
/// (`3.125` becomes `3.12`, `0.375` becomes `0.38`).
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_go_to_even() {
        assert_eq!(round2(3.125), 3.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(0.125), 0.12);
    }

    #[test]
    fn other_values_round_to_nearest() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(200.0 / 3.0), 66.67);
        assert_eq!(round2(0.0), 0.0);
    }
}
