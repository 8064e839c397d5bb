//! Value objects for the payment domain.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a payment instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new random payment ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a payment ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PaymentId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<PaymentId> for Uuid {
    fn from(id: PaymentId) -> Self {
        id.0
    }
}

/// A named account on one side of a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account holder name.
    pub name: String,
    /// Account number.
    pub number: String,
}

impl Account {
    /// Creates a new account.
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
        }
    }
}

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

/// Processing priority of a payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentPriority {
    #[default]
    Normal,
    High,
}

impl PaymentPriority {
    /// Returns the uppercase wire name of the priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPriority::Normal => "NORMAL",
            PaymentPriority::High => "HIGH",
        }
    }
}

impl std::fmt::Display for PaymentPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Routing details of the processing bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankRouting {
    pub bic: String,
    pub bank_name: String,
    pub bank_address: String,
    pub bank_city: String,
    pub bank_country: String,
}

impl BankRouting {
    /// Routing details of the default domestic processing bank.
    pub fn domestic_default() -> Self {
        Self {
            bic: "LIAM123".to_owned(),
            bank_name: "Liam Bank".to_owned(),
            bank_address: "Main Road".to_owned(),
            bank_city: "Melbourne".to_owned(),
            bank_country: "Australia".to_owned(),
        }
    }
}

/// ISO 20022 payment transaction status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IsoPaymentStatus {
    /// Accepted, technical validation passed.
    Actc,
    /// Accepted, settlement completed.
    Acsc,
    /// Rejected.
    Rjct,
    /// Pending.
    Pdng,
    /// Accepted, customer profile checked.
    Accp,
    /// Partially accepted.
    Part,
    /// Cancelled.
    Canc,
}

impl IsoPaymentStatus {
    /// Returns the four-letter ISO code.
    pub fn as_str(&self) -> &'static str {
        match self {
            IsoPaymentStatus::Actc => "ACTC",
            IsoPaymentStatus::Acsc => "ACSC",
            IsoPaymentStatus::Rjct => "RJCT",
            IsoPaymentStatus::Pdng => "PDNG",
            IsoPaymentStatus::Accp => "ACCP",
            IsoPaymentStatus::Part => "PART",
            IsoPaymentStatus::Canc => "CANC",
        }
    }

    /// Whether the status is an acceptance (anything but rejected/cancelled).
    pub fn is_accepted(&self) -> bool {
        !matches!(self, IsoPaymentStatus::Rjct | IsoPaymentStatus::Canc)
    }
}

impl std::fmt::Display for IsoPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
