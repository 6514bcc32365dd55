//! Pieces shared by sales and purchases: status, payment methods and settlement

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::models::DebtRequest;
use crate::money::Money;
use crate::types::MILLIS_PER_DAY;

/// Sales and purchases can be cancelled only this long after creation.
pub const CANCEL_WINDOW_MILLIS: i64 = MILLIS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Completed,
    Cancelled,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Completed => "COMPLETED",
            TradeStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(TradeStatus::Completed),
            "CANCELLED" => Ok(TradeStatus::Cancelled),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Debit,
    Transfer,
    Qris,
    Ewallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Debit => "DEBIT",
            PaymentMethod::Transfer => "TRANSFER",
            PaymentMethod::Qris => "QRIS",
            PaymentMethod::Ewallet => "EWALLET",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH" => Ok(PaymentMethod::Cash),
            "DEBIT" => Ok(PaymentMethod::Debit),
            "TRANSFER" => Ok(PaymentMethod::Transfer),
            "QRIS" => Ok(PaymentMethod::Qris),
            "EWALLET" => Ok(PaymentMethod::Ewallet),
            other => Err(format!("unknown payment method '{}'", other)),
        }
    }
}

/// A payment line in a create request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub payment_method: PaymentMethod,
    pub amount: Money,
    pub note: Option<String>,
}

/// Payment row about to be written for a sale or purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTradePayment {
    pub payment_method: PaymentMethod,
    pub amount: Money,
    pub note: Option<String>,
    pub created_at: i64,
}

impl NewTradePayment {
    pub fn from_requests(payments: &[PaymentRequest], now: i64) -> Vec<NewTradePayment> {
        payments
            .iter()
            .map(|p| NewTradePayment {
                payment_method: p.payment_method,
                amount: p.amount,
                note: p.note.clone(),
                created_at: now,
            })
            .collect()
    }
}

/// How a sale or purchase is settled at creation.
#[derive(Debug, Clone, Copy)]
pub enum Settlement<'a> {
    Payments(&'a [PaymentRequest]),
    Debt(&'a DebtRequest),
}

impl<'a> Settlement<'a> {
    /// Exactly one of `payments` or `debt` must be present.
    pub fn from_request(
        payments: Option<&'a [PaymentRequest]>,
        debt: Option<&'a DebtRequest>,
    ) -> DomainResult<Settlement<'a>> {
        match (payments, debt) {
            (Some(payments), None) => {
                if payments.is_empty() {
                    return Err(DomainError::BadRequest(
                        "payments must not be empty".to_string(),
                    ));
                }
                for payment in payments {
                    if !payment.amount.is_positive() {
                        return Err(DomainError::Validation(
                            "payment amount must be greater than 0".to_string(),
                        ));
                    }
                    payment.amount.ensure_storable("payment amount")?;
                }
                Ok(Settlement::Payments(payments))
            }
            (None, Some(debt)) => {
                for payment in debt.payments() {
                    if !payment.amount.is_positive() {
                        return Err(DomainError::Validation(
                            "debt payment amount must be greater than 0".to_string(),
                        ));
                    }
                    payment.amount.ensure_storable("debt payment amount")?;
                }
                Ok(Settlement::Debt(debt))
            }
            _ => Err(DomainError::BadRequest(
                "either debt or payments must be provided".to_string(),
            )),
        }
    }
}

/// Payments must cover the whole total; overpayment is accepted as is.
pub fn ensure_payments_cover(payments: &[PaymentRequest], total: Money) -> DomainResult<Money> {
    let paid = Money::checked_sum(payments.iter().map(|p| p.amount))?;
    if paid < total {
        return Err(DomainError::Validation(format!(
            "total payment {} is less than total price {}",
            paid, total
        )));
    }
    Ok(paid)
}

/// Refuse to touch a document older than the cancellation window.
pub fn ensure_within_cancel_window(kind: &str, created_at: i64, now: i64) -> DomainResult<()> {
    if now - created_at >= CANCEL_WINDOW_MILLIS {
        return Err(DomainError::Forbidden(format!(
            "{} cannot be deleted after 24 hours",
            kind
        )));
    }
    Ok(())
}

/// A priced line ready to be written as a sale or purchase detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub size_id: i64,
    pub qty: i64,
    pub price: Money,
}

impl PricedLine {
    pub fn total(&self) -> DomainResult<Money> {
        self.price.checked_times(self.qty)
    }
}

pub fn lines_total(lines: &[PricedLine]) -> DomainResult<Money> {
    lines
        .iter()
        .try_fold(Money::ZERO, |acc, line| acc.checked_add(line.total()?))
}
