//! Weighted moving-average (CUMP) cost arithmetic.
//!
//! Every average-cost computation in the system goes through this module;
//! the ledger and the workflow services never do the blend themselves.
//! All arithmetic stays in `rust_decimal::Decimal` at full precision —
//! rounding is a presentation concern and happens in the handlers.

use rust_decimal::Decimal;

/// Blends an inbound receipt into the current weighted moving-average cost.
///
/// `(old_qty * old_cost + in_qty * in_cost) / (old_qty + in_qty)`
///
/// Degenerate case: when `old_qty + in_qty == 0` there is no stock to
/// weight, so the incoming unit cost is returned as-is (zero when that is
/// zero). A first receipt into an empty item therefore yields exactly the
/// receipt's unit cost.
pub fn compute_cump(
    old_qty: Decimal,
    old_cost: Decimal,
    in_qty: Decimal,
    in_cost: Decimal,
) -> Decimal {
    let total_qty = old_qty + in_qty;
    if total_qty.is_zero() {
        return in_cost;
    }
    (old_qty * old_cost + in_qty * in_cost) / total_qty
}

/// Value of an on-hand position: `quantity * average_cost`.
pub fn stock_value(quantity: Decimal, average_cost: Decimal) -> Decimal {
    quantity * average_cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn first_receipt_into_empty_item_takes_receipt_cost() {
        let avg = compute_cump(dec!(0), dec!(0), dec!(50), dec!(600));
        assert_eq!(avg, dec!(600));
    }

    #[test]
    fn receipt_blends_by_quantity() {
        // 100 @ 500 plus 50 @ 600 -> 80000 / 150
        let avg = compute_cump(dec!(100), dec!(500), dec!(50), dec!(600));
        assert_eq!(avg.round_dp(2), dec!(533.33));
        assert_eq!((avg * dec!(150)).round_dp(6), dec!(80000));
    }

    #[test]
    fn sequential_receipts_match_single_blend() {
        // Receiving 30 then 20 at the same price must land where one
        // receipt of 50 would have.
        let after_first = compute_cump(dec!(100), dec!(500), dec!(30), dec!(600));
        assert_eq!(after_first.round_dp(2), dec!(523.08));

        let after_second = compute_cump(dec!(130), after_first, dec!(20), dec!(600));
        let single = compute_cump(dec!(100), dec!(500), dec!(50), dec!(600));
        assert_eq!(after_second.round_dp(6), single.round_dp(6));
    }

    #[test]
    fn degenerate_zero_total_returns_incoming_cost() {
        assert_eq!(compute_cump(dec!(0), dec!(0), dec!(0), dec!(0)), dec!(0));
        assert_eq!(
            compute_cump(dec!(0), dec!(123.45), dec!(0), dec!(7.5)),
            dec!(7.5)
        );
    }

    #[test]
    fn equal_costs_leave_average_unchanged() {
        let avg = compute_cump(dec!(40), dec!(12.5), dec!(60), dec!(12.5));
        assert_eq!(avg, dec!(12.5));
    }

    #[rstest]
    #[case(dec!(10), dec!(100), dec!(10), dec!(200))]
    #[case(dec!(1), dec!(0.01), dec!(999), dec!(45))]
    #[case(dec!(250), dec!(73.20), dec!(0.5), dec!(12))]
    fn result_stays_between_input_costs(
        #[case] old_qty: Decimal,
        #[case] old_cost: Decimal,
        #[case] in_qty: Decimal,
        #[case] in_cost: Decimal,
    ) {
        let avg = compute_cump(old_qty, old_cost, in_qty, in_cost);
        let lo = old_cost.min(in_cost);
        let hi = old_cost.max(in_cost);
        assert!(avg >= lo && avg <= hi, "{} not in [{}, {}]", avg, lo, hi);
    }

    #[test]
    fn stock_value_is_quantity_times_cost() {
        assert_eq!(stock_value(dec!(150), dec!(533.3333)), dec!(79999.995));
        assert_eq!(stock_value(dec!(0), dec!(500)), dec!(0));
    }
}
