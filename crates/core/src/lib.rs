//! `factoring-core`: shared domain building blocks.
//!
//! Identifiers, the domain error model and small value objects used by every other
//! crate in the workspace. No IO lives here.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CompanyId, CustomerId, InvoiceId, InvoiceItemId, ProductId, UserId};
pub use value_object::{CurrencyCode, Money, PaymentMethod, ValueObject, VatRate};
