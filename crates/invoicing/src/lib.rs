//! Invoicing records and the lookup services that serve them.
//!
//! Records here are read-only snapshots owned by external collaborators. Document
//! generation fetches them by id through the traits in [`lookup`] and never
//! mutates them.

pub mod customer;
pub mod directory;
pub mod invoice;
pub mod lookup;
pub mod product;
pub mod user;

pub use customer::{Address, Customer};
pub use directory::{DirectorySeed, InMemoryDirectory, Session};
pub use invoice::{Invoice, InvoiceItem};
pub use lookup::{
    CompanyService, CustomerService, InvoiceItemService, InvoiceService, ProductService,
    UserService,
};
pub use product::Product;
pub use user::{Company, User};
