//! Payment domain model.
//!
//! Value objects for accounts, money and routing, plus the immutable
//! [`PaymentInstruction`] that a saga executes. Requests are validated once
//! at the edge; everything downstream works with the instruction.

pub mod error;
pub mod instruction;
pub mod value_objects;

pub use error::DomainError;
pub use instruction::{PaymentInstruction, PaymentRequest};
pub use value_objects::{
    Account, BankRouting, IsoPaymentStatus, Money, PaymentId, PaymentPriority,
};
