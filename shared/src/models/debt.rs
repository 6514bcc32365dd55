//! Debts bound to a sale (receivable) or a purchase (payable)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{DomainError, DomainResult};
use crate::money::Money;
use crate::validation::validate_positive_amount;
use crate::types::{UnixDate, MILLIS_PER_DAY, MILLIS_PER_HOUR};

/// Default due date offset when a debt request omits one.
pub const DEFAULT_DEBT_TERM_MILLIS: i64 = 7 * MILLIS_PER_DAY;

/// Debt payments can be deleted only this long after they were recorded.
pub const DEBT_PAYMENT_DELETE_WINDOW_MILLIS: i64 = MILLIS_PER_HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebtReferenceType {
    Sale,
    Purchase,
}

impl DebtReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtReferenceType::Sale => "SALE",
            DebtReferenceType::Purchase => "PURCHASE",
        }
    }
}

impl fmt::Display for DebtReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DebtReferenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SALE" => Ok(DebtReferenceType::Sale),
            "PURCHASE" => Ok(DebtReferenceType::Purchase),
            other => Err(format!("unknown debt reference type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebtStatus {
    Pending,
    Paid,
    Void,
}

impl DebtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtStatus::Pending => "PENDING",
            DebtStatus::Paid => "PAID",
            DebtStatus::Void => "VOID",
        }
    }

    /// Status implied by the amounts.
    pub fn derive(total_amount: Money, paid_amount: Money) -> DebtStatus {
        if total_amount.is_zero() && paid_amount.is_zero() {
            DebtStatus::Void
        } else if paid_amount >= total_amount {
            DebtStatus::Paid
        } else {
            DebtStatus::Pending
        }
    }
}

impl fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DebtStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(DebtStatus::Pending),
            "PAID" => Ok(DebtStatus::Paid),
            "VOID" => Ok(DebtStatus::Void),
            other => Err(format!("unknown debt status '{}'", other)),
        }
    }
}

/// Residual unpaid amount of one sale or purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub id: i64,
    pub reference_type: DebtReferenceType,
    pub reference_code: String,
    pub branch_id: i64,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub due_date: i64,
    pub status: DebtStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Debt {
    pub fn refresh_status(&mut self) {
        self.status = DebtStatus::derive(self.total_amount, self.paid_amount);
    }

    pub fn remaining(&self) -> Money {
        self.total_amount.saturating_sub(self.paid_amount)
    }

    /// Accept an installment against the debt.
    pub fn apply_payment(&mut self, amount: Money) -> DomainResult<()> {
        if !amount.is_positive() {
            return Err(DomainError::Validation(
                "payment amount must be greater than 0".to_string(),
            ));
        }
        match self.status {
            DebtStatus::Void => {
                return Err(DomainError::Conflict("debt is void".to_string()));
            }
            DebtStatus::Paid => {
                return Err(DomainError::Conflict("debt is already paid".to_string()));
            }
            DebtStatus::Pending => {}
        }
        if amount > self.remaining() {
            return Err(DomainError::Validation(format!(
                "payment {} exceeds remaining debt {}",
                amount,
                self.remaining()
            )));
        }
        self.paid_amount += amount;
        self.refresh_status();
        Ok(())
    }

    /// Take back a previously applied installment.
    pub fn revert_payment(&mut self, amount: Money) -> DomainResult<()> {
        if self.status == DebtStatus::Void {
            return Err(DomainError::Conflict("debt is void".to_string()));
        }
        if amount > self.paid_amount {
            return Err(DomainError::Conflict(
                "payment was already refunded by a cancellation".to_string(),
            ));
        }
        self.paid_amount -= amount;
        self.refresh_status();
        Ok(())
    }

    /// Shrink the total after a cancelled line; returns the overpaid amount that has
    /// to be refunded (zero when the debt still covers what was paid).
    pub fn shrink_total(&mut self, cancel_amount: Money) -> Money {
        self.total_amount = self.total_amount.saturating_sub(cancel_amount);
        let refund = self.paid_amount.saturating_sub(self.total_amount);
        if refund.is_positive() {
            self.paid_amount = self.total_amount;
        }
        self.refresh_status();
        refund
    }

    /// Void the debt; returns what had been paid so far.
    pub fn void(&mut self) -> Money {
        let refund = self.paid_amount;
        self.total_amount = Money::ZERO;
        self.paid_amount = Money::ZERO;
        self.status = DebtStatus::Void;
        refund
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDebt {
    pub reference_type: DebtReferenceType,
    pub reference_code: String,
    pub branch_id: i64,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub due_date: i64,
    pub status: DebtStatus,
    pub created_at: i64,
}

impl NewDebt {
    /// Debt opened at create time with its down payments already counted.
    pub fn open(
        reference_type: DebtReferenceType,
        reference_code: &str,
        branch_id: i64,
        total_amount: Money,
        request: &DebtRequest,
        now: i64,
    ) -> DomainResult<NewDebt> {
        let paid_amount = request.down_payment()?;
        if paid_amount > total_amount {
            return Err(DomainError::Validation(format!(
                "debt payments {} exceed total price {}",
                paid_amount, total_amount
            )));
        }
        Ok(NewDebt {
            reference_type,
            reference_code: reference_code.to_string(),
            branch_id,
            total_amount,
            paid_amount,
            due_date: request
                .due_date
                .map(|d| d.millis())
                .unwrap_or(now + DEFAULT_DEBT_TERM_MILLIS),
            status: DebtStatus::derive(total_amount, paid_amount),
            created_at: now,
        })
    }
}

/// One installment. A negative amount is a refund written by a cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtPayment {
    pub id: i64,
    pub debt_id: i64,
    pub amount: Money,
    pub payment_date: i64,
    pub note: Option<String>,
    pub created_at: i64,
}

impl DebtPayment {
    pub fn is_refund(&self) -> bool {
        self.amount.is_negative()
    }

    pub fn ensure_deletable(&self, now: i64) -> DomainResult<()> {
        if self.is_refund() {
            return Err(DomainError::Forbidden(
                "refund entries cannot be deleted".to_string(),
            ));
        }
        if now - self.created_at >= DEBT_PAYMENT_DELETE_WINDOW_MILLIS {
            return Err(DomainError::Forbidden(
                "debt cannot be deleted after 1 hours".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDebtPayment {
    pub debt_id: i64,
    pub amount: Money,
    pub payment_date: i64,
    pub note: Option<String>,
    pub created_at: i64,
}

impl NewDebtPayment {
    /// Compensating entry that takes `amount` back out of `paid_amount`.
    pub fn refund(debt_id: i64, amount: Money, reason: &str, now: i64) -> NewDebtPayment {
        NewDebtPayment {
            debt_id,
            amount: Money::ZERO - amount,
            payment_date: now,
            note: Some(format!("refund: {}", reason)),
            created_at: now,
        }
    }
}

/// Debt part of a sale or purchase create request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebtRequest {
    pub due_date: Option<UnixDate>,
    pub debt_payments: Option<Vec<DebtPaymentRequest>>,
}

impl DebtRequest {
    pub fn payments(&self) -> &[DebtPaymentRequest] {
        self.debt_payments.as_deref().unwrap_or(&[])
    }

    pub fn down_payment(&self) -> DomainResult<Money> {
        Money::checked_sum(self.payments().iter().map(|p| p.amount))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtPaymentRequest {
    pub amount: Money,
    pub note: Option<String>,
}

/// Body of `POST /debts/{id}/payments`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDebtPaymentRequest {
    #[validate(custom = "validate_positive_amount")]
    pub amount: Money,
    pub payment_date: Option<UnixDate>,
    #[validate(length(max = 255))]
    pub note: Option<String>,
}

/// A line of the sale or purchase a debt belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtLineItem {
    pub size_id: i64,
    pub product_name: String,
    pub size_name: String,
    pub qty: i64,
    pub price: Money,
    pub is_cancelled: bool,
}

/// Debt with its payments and the lines of its reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtDetail {
    #[serde(flatten)]
    pub debt: Debt,
    pub payments: Vec<DebtPayment>,
    pub items: Vec<DebtLineItem>,
}
