//! Debt lifecycle tests
//!
//! Covers the receivable/payable rules shared by sales and purchases:
//! - status derived from total and paid amounts
//! - installments never overpay
//! - cancelled lines shrink the debt and hand back any overpayment
//! - voiding returns everything paid so far

use proptest::prelude::*;
use shared::{
    needs_flatten_payment, Debt, DebtPayment, DebtPaymentRequest, DebtReferenceType,
    DebtRequest, DebtStatus, DomainError, Money, NewDebt, NewDebtPayment,
    DEBT_PAYMENT_DELETE_WINDOW_MILLIS, DEFAULT_DEBT_TERM_MILLIS,
};

fn money(units: i64) -> Money {
    Money::from(units)
}

fn debt(total: i64, paid: i64) -> Debt {
    Debt {
        id: 1,
        reference_type: DebtReferenceType::Sale,
        reference_code: "SALE-20240305060708".to_string(),
        branch_id: 1,
        total_amount: money(total),
        paid_amount: money(paid),
        due_date: 0,
        status: DebtStatus::derive(money(total), money(paid)),
        created_at: 0,
        updated_at: 0,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_status_derivation() {
        assert_eq!(DebtStatus::derive(money(100), money(0)), DebtStatus::Pending);
        assert_eq!(DebtStatus::derive(money(100), money(40)), DebtStatus::Pending);
        assert_eq!(DebtStatus::derive(money(100), money(100)), DebtStatus::Paid);
        assert_eq!(DebtStatus::derive(money(0), money(0)), DebtStatus::Void);
    }

    #[test]
    fn test_payment_settles_debt() {
        let mut d = debt(100, 30);
        d.apply_payment(money(70)).unwrap();
        assert_eq!(d.paid_amount, money(100));
        assert_eq!(d.status, DebtStatus::Paid);
        assert!(d.remaining().is_zero());
    }

    #[test]
    fn test_overpayment_is_refused() {
        let mut d = debt(100, 30);
        let err = d.apply_payment(money(71)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(d.paid_amount, money(30));
    }

    #[test]
    fn test_paid_debt_takes_no_more_payments() {
        let mut d = debt(100, 100);
        assert!(matches!(
            d.apply_payment(money(1)),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn test_void_debt_takes_no_payments() {
        let mut d = debt(100, 20);
        d.void();
        assert!(matches!(
            d.apply_payment(money(1)),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn test_shrink_below_paid_refunds_difference() {
        // Debt of 100 with 60 paid loses a 50 line: 10 goes back.
        let mut d = debt(100, 60);
        let refund = d.shrink_total(money(50));
        assert_eq!(refund, money(10));
        assert_eq!(d.total_amount, money(50));
        assert_eq!(d.paid_amount, money(50));
        assert_eq!(d.status, DebtStatus::Paid);
    }

    #[test]
    fn test_shrink_above_paid_keeps_debt_open() {
        let mut d = debt(100, 20);
        let refund = d.shrink_total(money(50));
        assert!(refund.is_zero());
        assert_eq!(d.status, DebtStatus::Pending);
        assert_eq!(d.remaining(), money(30));
    }

    #[test]
    fn test_void_returns_everything_paid() {
        let mut d = debt(100, 45);
        assert_eq!(d.void(), money(45));
        assert_eq!(d.status, DebtStatus::Void);
        assert!(d.total_amount.is_zero());
        assert!(d.paid_amount.is_zero());
    }

    #[test]
    fn test_revert_more_than_paid_is_conflict() {
        let mut d = debt(100, 10);
        assert!(matches!(
            d.revert_payment(money(20)),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn test_open_counts_down_payments_and_defaults_due_date() {
        let request = DebtRequest {
            due_date: None,
            debt_payments: Some(vec![
                DebtPaymentRequest {
                    amount: money(10),
                    note: None,
                },
                DebtPaymentRequest {
                    amount: money(15),
                    note: None,
                },
            ]),
        };
        let now = 1_000;
        let new_debt =
            NewDebt::open(DebtReferenceType::Purchase, "PURCHASE-1", 2, money(80), &request, now)
                .unwrap();
        assert_eq!(new_debt.paid_amount, money(25));
        assert_eq!(new_debt.status, DebtStatus::Pending);
        assert_eq!(new_debt.due_date, now + DEFAULT_DEBT_TERM_MILLIS);
    }

    #[test]
    fn test_open_rejects_down_payment_above_total() {
        let request = DebtRequest {
            due_date: None,
            debt_payments: Some(vec![DebtPaymentRequest {
                amount: money(81),
                note: None,
            }]),
        };
        assert!(
            NewDebt::open(DebtReferenceType::Sale, "SALE-1", 1, money(80), &request, 0).is_err()
        );
    }

    #[test]
    fn test_refund_rows_are_negative() {
        let refund = NewDebtPayment::refund(1, money(30), "sale cancelled", 0);
        assert!(refund.amount.is_negative());
        assert_eq!(refund.amount.abs(), money(30));
    }

    #[test]
    fn test_flatten_only_on_transition_to_paid() {
        let mut d = debt(100, 60);
        d.shrink_total(money(40));
        assert!(needs_flatten_payment(DebtStatus::Pending, &d));
        assert!(!needs_flatten_payment(DebtStatus::Paid, &d));

        let mut open = debt(100, 10);
        open.shrink_total(money(40));
        assert!(!needs_flatten_payment(DebtStatus::Pending, &open));
    }

    #[test]
    fn test_payment_deletable_within_the_hour_only() {
        let payment = DebtPayment {
            id: 9,
            debt_id: 1,
            amount: money(20),
            payment_date: 0,
            note: None,
            created_at: 0,
        };
        assert!(payment.ensure_deletable(DEBT_PAYMENT_DELETE_WINDOW_MILLIS - 1).is_ok());
        assert!(matches!(
            payment.ensure_deletable(DEBT_PAYMENT_DELETE_WINDOW_MILLIS),
            Err(DomainError::Forbidden(_))
        ));

        let refund = DebtPayment {
            amount: money(-20),
            ..payment
        };
        assert!(matches!(refund.ensure_deletable(0), Err(DomainError::Forbidden(_))));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Any sequence of installments keeps 0 <= paid <= total and a derived status.
    #[test]
    fn prop_installments_never_overpay(
        total in 1..10_000i64,
        payments in prop::collection::vec(1..5_000i64, 0..20),
    ) {
        let mut d = debt(total, 0);
        for amount in payments {
            let before = d.paid_amount;
            match d.apply_payment(money(amount)) {
                Ok(()) => prop_assert_eq!(d.paid_amount, before + money(amount)),
                Err(_) => prop_assert_eq!(d.paid_amount, before),
            }
            prop_assert!(!d.paid_amount.is_negative());
            prop_assert!(d.paid_amount <= d.total_amount);
            prop_assert_eq!(d.status, DebtStatus::derive(d.total_amount, d.paid_amount));
        }
    }

    /// Shrinking conserves money: what stays paid plus the refund equals what was paid.
    #[test]
    fn prop_shrink_conserves_paid_amount(
        total in 1..10_000i64,
        paid_share in 0..=100i64,
        cancel_share in 0..=100i64,
    ) {
        let paid = total * paid_share / 100;
        let cancel = total * cancel_share / 100;
        let mut d = debt(total, paid);

        let refund = d.shrink_total(money(cancel));

        prop_assert_eq!(d.paid_amount + refund, money(paid));
        prop_assert!(d.paid_amount <= d.total_amount);
        prop_assert!(!refund.is_negative());
        prop_assert_eq!(d.total_amount, money(total - cancel));
    }

    /// Voiding hands back exactly what had been paid.
    #[test]
    fn prop_void_refunds_paid(total in 1..10_000i64, paid_share in 0..=100i64) {
        let paid = total * paid_share / 100;
        let mut d = debt(total, paid);
        prop_assert_eq!(d.void(), money(paid));
        prop_assert_eq!(d.status, DebtStatus::Void);
    }
}
