use rust_decimal::{Decimal, RoundingStrategy};

/// Round to 2 decimal places, half-away-from-zero — the rounding rule the
/// loan engine uses for every derived monetary figure (interest, schedule
/// installments, totals).
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(
            round2(Decimal::from_str("1.005").unwrap()),
            Decimal::from_str("1.01").unwrap()
        );
        assert_eq!(
            round2(Decimal::from_str("-1.005").unwrap()),
            Decimal::from_str("-1.01").unwrap()
        );
        assert_eq!(
            round2(Decimal::from_str("2.004").unwrap()),
            Decimal::from_str("2.00").unwrap()
        );
    }
}
