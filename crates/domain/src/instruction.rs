//! The payment instruction a saga executes.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::value_objects::{Account, BankRouting, Money, PaymentId, PaymentPriority};

/// Incoming payment request, as accepted at the edge.
///
/// Optional fields get their defaults when the request is turned into an
/// instruction: the payment date defaults to today, the priority to NORMAL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub debtor: Account,
    pub creditor: Account,
    /// Instructed amount in cents.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Business reference; doubles as the saga identity.
    pub reference: String,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<PaymentPriority>,
}

/// Validated, immutable payment instruction.
///
/// Everything a pipeline step needs travels in here; steps never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInstruction {
    pub payment_id: PaymentId,
    /// Unique end-to-end transaction reference carried across systems.
    pub uetr: Uuid,
    pub debtor: Account,
    pub creditor: Account,
    pub amount: Money,
    pub currency: String,
    pub reference: String,
    pub payment_date: NaiveDate,
    pub priority: PaymentPriority,
    pub routing: BankRouting,
}

impl PaymentInstruction {
    /// Builds an instruction from a request, assigning fresh identifiers and
    /// the default domestic routing.
    pub fn from_request(request: PaymentRequest) -> Result<Self, DomainError> {
        let amount = Money::from_cents(request.amount_cents);
        if !amount.is_positive() {
            return Err(DomainError::InvalidAmount(format!(
                "instructed amount must be positive, got {}",
                amount
            )));
        }
        if request.reference.trim().is_empty() {
            return Err(DomainError::InvalidReference(
                "payment reference must not be empty".to_owned(),
            ));
        }
        if request.currency.trim().len() != 3 {
            return Err(DomainError::InvalidCurrency(request.currency));
        }

        Ok(Self {
            payment_id: PaymentId::new(),
            uetr: Uuid::new_v4(),
            debtor: request.debtor,
            creditor: request.creditor,
            amount,
            currency: request.currency.trim().to_uppercase(),
            reference: request.reference.trim().to_owned(),
            payment_date: request
                .payment_date
                .unwrap_or_else(|| Utc::now().date_naive()),
            priority: request.priority.unwrap_or_default(),
            routing: BankRouting::domestic_default(),
        })
    }

    /// Whether debtor and creditor are the same account number.
    pub fn is_self_transfer(&self) -> bool {
        self.debtor.number == self.creditor.number
    }
}
