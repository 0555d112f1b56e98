// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{DiscountType, PaymentPlan, TaxMode};

/// Derived amounts for one quote. Values are kept unrounded; rounding is a
/// display concern only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteTotals {
    pub discount_amount: f64,
    pub base_amount: f64,
    pub tax_amount: f64,
    pub total: f64,
}

impl QuoteTotals {
    pub fn compute(
        subtotal: f64,
        discount: f64,
        discount_type: DiscountType,
        tax_rate: f64,
        tax_mode: TaxMode,
    ) -> Self {
        let subtotal = sanitize(subtotal);
        let discount = sanitize(discount);
        let tax_rate = sanitize(tax_rate);

        let discount_amount = match discount_type {
            DiscountType::Percent => subtotal * discount.clamp(0.0, 100.0) / 100.0,
            DiscountType::Amount => discount.min(subtotal),
        };
        let base_amount = subtotal - discount_amount;

        let (tax_amount, total) = match tax_mode {
            TaxMode::Exclusive => {
                let tax_amount = base_amount * tax_rate / 100.0;
                (tax_amount, base_amount + tax_amount)
            }
            // Inclusive rates back the tax out of the charged amount; a zero
            // rate must not divide by zero.
            TaxMode::Inclusive => {
                let tax_amount = if tax_rate == 0.0 {
                    0.0
                } else {
                    base_amount * (tax_rate / (100.0 + tax_rate))
                };
                (tax_amount, base_amount)
            }
        };

        Self {
            discount_amount,
            base_amount,
            tax_amount,
            total,
        }
    }
}

/// One scheduled payment. `index` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Installment {
    pub index: u8,
    pub percent: f64,
    pub amount: f64,
}

/// Splits an unrounded total per the payment plan. The last installment is
/// the remainder, so the amounts always sum to the total exactly.
pub fn split_installments(total: f64, plan: PaymentPlan) -> Vec<Installment> {
    match plan {
        PaymentPlan::Single => vec![Installment {
            index: 1,
            percent: 100.0,
            amount: total,
        }],
        PaymentPlan::Split { .. } => {
            let first_percent = plan.first_percent();
            let first_amount = total * first_percent / 100.0;
            vec![
                Installment {
                    index: 1,
                    percent: first_percent,
                    amount: first_amount,
                },
                Installment {
                    index: 2,
                    percent: 100.0 - first_percent,
                    amount: total - first_amount,
                },
            ]
        }
    }
}

/// Half-up rounding to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Renders an amount with thousands grouping and exactly two decimals,
/// e.g. `1138.5` -> `"1,138.50"`.
pub fn format_money(value: f64) -> String {
    let cents = (round2(value).abs() * 100.0).round() as i64;
    let sign = if round2(value) < 0.0 { "-" } else { "" };
    format!(
        "{sign}{}.{:02}",
        group_thousands(cents / 100),
        cents % 100
    )
}

fn group_thousands(mut whole: i64) -> String {
    let mut groups = Vec::new();
    loop {
        if whole < 1000 {
            groups.push(whole.to_string());
            break;
        }
        groups.push(format!("{:03}", whole % 1000));
        whole /= 1000;
    }
    groups.reverse();
    groups.join(",")
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::{QuoteTotals, format_money, round2, split_installments};
    use crate::model::{DiscountType, PaymentPlan, TaxMode};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn exclusive_tax_with_amount_discount() {
        let totals = QuoteTotals::compute(
            1000.0,
            10.0,
            DiscountType::Amount,
            15.0,
            TaxMode::Exclusive,
        );
        assert!(close(totals.discount_amount, 10.0));
        assert!(close(totals.base_amount, 990.0));
        assert!(close(totals.tax_amount, 148.5));
        assert!(close(totals.total, 1138.5));
    }

    #[test]
    fn inclusive_tax_backs_out_of_base() {
        let totals = QuoteTotals::compute(
            1000.0,
            10.0,
            DiscountType::Percent,
            15.0,
            TaxMode::Inclusive,
        );
        assert!(close(totals.discount_amount, 100.0));
        assert!(close(totals.base_amount, 900.0));
        assert!(close(totals.tax_amount, 900.0 * 15.0 / 115.0));
        assert!(close(totals.total, 900.0));
        assert_eq!(format_money(totals.tax_amount), "117.39");
    }

    #[test]
    fn zero_inclusive_rate_yields_zero_tax() {
        let totals =
            QuoteTotals::compute(500.0, 0.0, DiscountType::Amount, 0.0, TaxMode::Inclusive);
        assert!(close(totals.tax_amount, 0.0));
        assert!(close(totals.total, 500.0));
    }

    #[test]
    fn percent_discount_clamps_to_hundred() {
        let totals = QuoteTotals::compute(
            200.0,
            150.0,
            DiscountType::Percent,
            15.0,
            TaxMode::Exclusive,
        );
        assert!(close(totals.discount_amount, 200.0));
        assert!(close(totals.total, 0.0));
    }

    #[test]
    fn amount_discount_caps_at_subtotal() {
        let totals = QuoteTotals::compute(
            100.0,
            250.0,
            DiscountType::Amount,
            15.0,
            TaxMode::Exclusive,
        );
        assert!(close(totals.discount_amount, 100.0));
        assert!(close(totals.base_amount, 0.0));
        assert!(close(totals.total, 0.0));
    }

    #[test]
    fn garbage_inputs_collapse_to_zero() {
        let totals = QuoteTotals::compute(
            f64::NAN,
            f64::INFINITY,
            DiscountType::Amount,
            -5.0,
            TaxMode::Exclusive,
        );
        assert!(close(totals.total, 0.0));
        assert!(close(totals.tax_amount, 0.0));
    }

    #[test]
    fn compute_is_idempotent_over_inputs() {
        let a = QuoteTotals::compute(750.5, 5.0, DiscountType::Percent, 15.0, TaxMode::Exclusive);
        let b = QuoteTotals::compute(750.5, 5.0, DiscountType::Percent, 15.0, TaxMode::Exclusive);
        assert_eq!(a, b);
    }

    #[test]
    fn even_split_halves_the_total() {
        let parts = split_installments(
            1138.5,
            PaymentPlan::Split {
                first_percent: 50.0,
            },
        );
        assert_eq!(parts.len(), 2);
        assert!(close(parts[0].amount, 569.25));
        assert!(close(parts[1].amount, 569.25));
        assert!(close(parts[0].percent, 50.0));
    }

    #[test]
    fn single_plan_is_one_full_installment() {
        let parts = split_installments(900.0, PaymentPlan::Single);
        assert_eq!(parts.len(), 1);
        assert!(close(parts[0].amount, 900.0));
        assert!(close(parts[0].percent, 100.0));
    }

    #[test]
    fn split_amounts_always_sum_to_total() {
        for percent in [1.0, 13.7, 33.33, 50.0, 66.0, 99.0] {
            for total in [0.0, 10.01, 999.99, 1138.5, 123456.78] {
                let parts = split_installments(
                    total,
                    PaymentPlan::Split {
                        first_percent: percent,
                    },
                );
                let sum: f64 = parts.iter().map(|p| p.amount).sum();
                assert!(close(sum, total), "percent={percent} total={total}");
            }
        }
    }

    #[test]
    fn out_of_range_split_percent_is_clamped() {
        let parts = split_installments(
            100.0,
            PaymentPlan::Split {
                first_percent: 0.0,
            },
        );
        assert!(close(parts[0].percent, 1.0));
        let parts = split_installments(
            100.0,
            PaymentPlan::Split {
                first_percent: 120.0,
            },
        );
        assert!(close(parts[0].percent, 99.0));
    }

    #[test]
    fn money_formatting_groups_thousands() {
        assert_eq!(format_money(1138.5), "1,138.50");
        assert_eq!(format_money(0.0), "0.00");
        assert_eq!(format_money(1234567.891), "1,234,567.89");
        assert_eq!(format_money(-42.0), "-42.00");
        assert_eq!(format_money(999.999), "1,000.00");
    }

    #[test]
    fn round2_is_half_up() {
        assert_eq!(round2(117.391304), 117.39);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
    }
}
