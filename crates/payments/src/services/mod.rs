//! Collaborator contracts and their in-memory implementations.

pub mod back_office;
pub mod bank;
pub mod gateway;
pub mod ledger;

pub use back_office::{BackOffice, InMemoryBackOffice};
pub use bank::{CrossBorderBank, InMemoryCrossBorderBank};
pub use gateway::{GatewayResponse, InMemoryPaymentGateway, PaymentGateway};
pub use ledger::{Dispatch, InMemoryLedgerDispatcher, LedgerDispatcher};
