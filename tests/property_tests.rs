//! Property-based tests for the costing core.
//!
//! These exercise the pure pricing functions across wide input ranges,
//! checking the invariants the ledger relies on rather than fixed
//! examples.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stockledger_api::entities::{bom_line, inventory_item};
use stockledger_api::services::costing::{compute_cump, stock_value};
use stockledger_api::services::production::{line_requirement, required_quantity};
use uuid::Uuid;

// Strategies for generating quantities and unit costs as decimals with
// realistic scales.
fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|thousandths| Decimal::new(thousandths, 3))
}

fn cost_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000).prop_map(|ten_thousandths| Decimal::new(ten_thousandths, 4))
}

fn waste_factor_strategy() -> impl Strategy<Value = Decimal> {
    (10_000i64..20_000).prop_map(|ten_thousandths| Decimal::new(ten_thousandths, 4))
}

const EPSILON: Decimal = dec!(0.000001);

fn item_fixture(quantity: Decimal, average_cost: Decimal) -> inventory_item::Model {
    inventory_item::Model {
        id: Uuid::new_v4(),
        sku: "PROP-1".into(),
        name: "Property fixture".into(),
        item_type: inventory_item::ItemType::RawMaterial,
        unit: inventory_item::UnitOfMeasure::Kg,
        quantity,
        average_cost,
        last_cost: average_cost,
        total_value: quantity * average_cost,
        reorder_point: None,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn bom_line_fixture(quantity_per_unit: Decimal, waste_factor: Decimal) -> bom_line::Model {
    bom_line::Model {
        id: Uuid::new_v4(),
        batch_id: Uuid::new_v4(),
        item_id: Uuid::new_v4(),
        quantity_per_unit,
        waste_factor,
        created_at: Utc::now(),
    }
}

// Property: a blended average stays between the two input costs
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn blended_average_is_bounded_by_input_costs(
        old_qty in quantity_strategy(),
        old_cost in cost_strategy(),
        in_qty in quantity_strategy(),
        in_cost in cost_strategy(),
    ) {
        let blended = compute_cump(old_qty, old_cost, in_qty, in_cost);
        let lower = old_cost.min(in_cost);
        let upper = old_cost.max(in_cost);
        prop_assert!(
            blended >= lower && blended <= upper,
            "average {} escaped [{}, {}]",
            blended,
            lower,
            upper
        );
    }

    #[test]
    fn blending_preserves_total_value(
        old_qty in quantity_strategy(),
        old_cost in cost_strategy(),
        in_qty in quantity_strategy(),
        in_cost in cost_strategy(),
    ) {
        let blended = compute_cump(old_qty, old_cost, in_qty, in_cost);
        let exact = old_qty * old_cost + in_qty * in_cost;
        let replayed = stock_value(old_qty + in_qty, blended);
        prop_assert!(
            (replayed - exact).abs() <= EPSILON,
            "value drifted: replayed {} vs exact {}",
            replayed,
            exact
        );
    }

    #[test]
    fn blending_in_two_steps_tracks_the_exact_weighted_average(
        q1 in quantity_strategy(),
        c1 in cost_strategy(),
        q2 in quantity_strategy(),
        c2 in cost_strategy(),
        q3 in quantity_strategy(),
        c3 in cost_strategy(),
    ) {
        let first = compute_cump(q1, c1, q2, c2);
        let stepwise = compute_cump(q1 + q2, first, q3, c3);

        let exact = (q1 * c1 + q2 * c2 + q3 * c3) / (q1 + q2 + q3);
        prop_assert!(
            (stepwise - exact).abs() <= EPSILON,
            "stepwise {} vs exact {}",
            stepwise,
            exact
        );
    }
}

// Property: degenerate receipts
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn first_receipt_into_empty_stock_takes_the_receipt_cost(
        in_qty in quantity_strategy(),
        in_cost in cost_strategy(),
    ) {
        let blended = compute_cump(Decimal::ZERO, Decimal::ZERO, in_qty, in_cost);
        prop_assert_eq!(blended, in_cost);
    }

    #[test]
    fn zero_total_quantity_falls_back_to_incoming_cost(in_cost in cost_strategy()) {
        let blended = compute_cump(Decimal::ZERO, dec!(123.45), Decimal::ZERO, in_cost);
        prop_assert_eq!(blended, in_cost);
    }

    #[test]
    fn equal_costs_blend_to_the_same_cost(
        old_qty in quantity_strategy(),
        in_qty in quantity_strategy(),
        cost in cost_strategy(),
    ) {
        let blended = compute_cump(old_qty, cost, in_qty, cost);
        prop_assert_eq!(blended, cost);
    }
}

// Property: stock valuation algebra
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn stock_value_is_linear_in_quantity(
        q1 in quantity_strategy(),
        q2 in quantity_strategy(),
        cost in cost_strategy(),
    ) {
        let summed = stock_value(q1, cost) + stock_value(q2, cost);
        prop_assert_eq!(stock_value(q1 + q2, cost), summed);
    }

    #[test]
    fn zero_quantity_values_to_zero(cost in cost_strategy()) {
        prop_assert_eq!(stock_value(Decimal::ZERO, cost), Decimal::ZERO);
    }
}

// Property: material requirements
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn required_quantity_floor_is_the_wasteless_draw(
        qpu in quantity_strategy(),
        waste in waste_factor_strategy(),
        planned in quantity_strategy(),
    ) {
        let required = required_quantity(qpu, waste, planned);
        prop_assert!(
            required >= qpu * planned,
            "waste factor {} shrank the requirement: {} < {}",
            waste,
            required,
            qpu * planned
        );
    }

    #[test]
    fn required_quantity_grows_with_the_plan(
        qpu in quantity_strategy(),
        waste in waste_factor_strategy(),
        planned in quantity_strategy(),
        extra in quantity_strategy(),
    ) {
        let smaller = required_quantity(qpu, waste, planned);
        let larger = required_quantity(qpu, waste, planned + extra);
        prop_assert!(larger > smaller);
    }

    #[test]
    fn shortage_and_can_consume_agree(
        qpu in quantity_strategy(),
        waste in waste_factor_strategy(),
        planned in quantity_strategy(),
        available in quantity_strategy(),
        cost in cost_strategy(),
    ) {
        let line = bom_line_fixture(qpu, waste);
        let item = item_fixture(available, cost);
        let requirement = line_requirement(&line, &item, planned);

        prop_assert!(requirement.shortage >= Decimal::ZERO);
        prop_assert_eq!(
            requirement.shortage,
            (requirement.required - available).max(Decimal::ZERO)
        );
        prop_assert_eq!(requirement.can_consume, requirement.shortage.is_zero());
        prop_assert_eq!(requirement.total_cost, requirement.required * cost);
    }
}
