use loan_engine_api::domain::money::round2;
use rust_decimal::Decimal;

/// `totalInterest`, `totalRepayable`, `monthlyPayment` from principal, the
/// annual rate, and the tenor, per §4.2's creation-time derivation. Also
/// used at reduced-amount approval, which re-derives the same three figures
/// from the approved amount as the new principal.
pub fn derive_schedule_totals(
    principal: Decimal,
    annual_interest_rate: Decimal,
    tenor_months: u32,
) -> (Decimal, Decimal, Decimal) {
    let tenor = Decimal::from(tenor_months);
    let total_interest = round2(principal * annual_interest_rate * tenor / Decimal::from(12));
    let total_repayable = round2(principal + total_interest);
    let monthly_payment = round2(total_repayable / tenor);
    (total_interest, total_repayable, monthly_payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn happy_path_figures_match_scenario_one() {
        let (interest, repayable, monthly) = derive_schedule_totals(
            Decimal::from(100_000),
            Decimal::from_str("0.15").unwrap(),
            10,
        );
        assert_eq!(interest, Decimal::from_str("12500.00").unwrap());
        assert_eq!(repayable, Decimal::from_str("112500.00").unwrap());
        assert_eq!(monthly, Decimal::from_str("11250.00").unwrap());
    }

    #[test]
    fn reduced_approval_figures_match_scenario_two() {
        let (interest, repayable, monthly) = derive_schedule_totals(
            Decimal::from(60_000),
            Decimal::from_str("0.15").unwrap(),
            10,
        );
        assert_eq!(interest, Decimal::from_str("7500.00").unwrap());
        assert_eq!(repayable, Decimal::from_str("67500.00").unwrap());
        assert_eq!(monthly, Decimal::from_str("6750.00").unwrap());
    }
}
