//! In-memory implementation of every lookup service, for tests and the demo server.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};

use factoring_core::{
    CompanyId, CustomerId, DomainError, DomainResult, Entity, InvoiceId, InvoiceItemId,
    ProductId, UserId,
};

use crate::lookup::{
    CompanyService, CustomerService, InvoiceItemService, InvoiceService, ProductService,
    UserService,
};
use crate::{Company, Customer, Invoice, InvoiceItem, Product, User};

/// Serializable snapshot of a directory (used to seed it from JSON).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySeed {
    pub invoices: Vec<Invoice>,
    pub items: Vec<InvoiceItem>,
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
    pub users: Vec<User>,
    pub companies: Vec<Company>,
    /// User resolved by `current_user()` when no session overrides it.
    pub current_user: Option<UserId>,
}

#[derive(Debug, Default)]
struct Records {
    invoices: HashMap<InvoiceId, Invoice>,
    items: HashMap<InvoiceItemId, InvoiceItem>,
    customers: HashMap<CustomerId, Customer>,
    products: HashMap<ProductId, Product>,
    users: HashMap<UserId, User>,
    companies: HashMap<CompanyId, Company>,
    current_user: Option<UserId>,
}

fn fetch<E: Entity + Clone>(map: &HashMap<E::Id, E>, id: E::Id) -> DomainResult<E> {
    map.get(&id)
        .cloned()
        .ok_or_else(|| DomainError::not_found(E::KIND, id))
}

/// Thread-safe in-memory directory of invoicing records.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<Records>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        let directory = Self::new();
        if let Ok(mut records) = directory.inner.write() {
            records.invoices = seed.invoices.into_iter().map(|r| (r.id, r)).collect();
            records.items = seed.items.into_iter().map(|r| (r.id, r)).collect();
            records.customers = seed.customers.into_iter().map(|r| (r.id, r)).collect();
            records.products = seed.products.into_iter().map(|r| (r.id, r)).collect();
            records.users = seed.users.into_iter().map(|r| (r.id, r)).collect();
            records.companies = seed.companies.into_iter().map(|r| (r.id, r)).collect();
            records.current_user = seed.current_user;
        }
        directory
    }

    /// Parse a JSON [`DirectorySeed`].
    pub fn from_json(json: &str) -> DomainResult<Self> {
        let seed: DirectorySeed = serde_json::from_str(json)
            .map_err(|e| DomainError::validation(format!("invalid directory seed: {e}")))?;
        tracing::debug!(
            invoices = seed.invoices.len(),
            customers = seed.customers.len(),
            "directory seeded"
        );
        Ok(Self::from_seed(seed))
    }

    pub fn insert_invoice(&self, invoice: Invoice) {
        if let Ok(mut records) = self.inner.write() {
            records.invoices.insert(invoice.id, invoice);
        }
    }

    pub fn insert_item(&self, item: InvoiceItem) {
        if let Ok(mut records) = self.inner.write() {
            records.items.insert(item.id, item);
        }
    }

    pub fn insert_customer(&self, customer: Customer) {
        if let Ok(mut records) = self.inner.write() {
            records.customers.insert(customer.id, customer);
        }
    }

    pub fn insert_product(&self, product: Product) {
        if let Ok(mut records) = self.inner.write() {
            records.products.insert(product.id, product);
        }
    }

    pub fn insert_user(&self, user: User) {
        if let Ok(mut records) = self.inner.write() {
            records.users.insert(user.id, user);
        }
    }

    pub fn insert_company(&self, company: Company) {
        if let Ok(mut records) = self.inner.write() {
            records.companies.insert(company.id, company);
        }
    }

    /// Make `user_id` the directory-wide current user.
    pub fn sign_in(&self, user_id: UserId) {
        if let Ok(mut records) = self.inner.write() {
            records.current_user = Some(user_id);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut records) = self.inner.write() {
            records.current_user = None;
        }
    }

    pub fn user(&self, id: UserId) -> DomainResult<User> {
        fetch(&self.read()?.users, id)
    }

    pub fn company_of(&self, user_id: UserId) -> DomainResult<Company> {
        let records = self.read()?;
        let user = fetch(&records.users, user_id)?;
        fetch(&records.companies, user.company_id)
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, Records>> {
        self.inner
            .read()
            .map_err(|_| DomainError::unavailable("directory lock poisoned"))
    }

    fn current_user_id(&self) -> DomainResult<UserId> {
        self.read()?
            .current_user
            .ok_or_else(|| DomainError::not_found("user", "current"))
    }
}

impl InvoiceService for InMemoryDirectory {
    fn invoice(&self, id: InvoiceId) -> DomainResult<Invoice> {
        fetch(&self.read()?.invoices, id)
    }
}

impl CustomerService for InMemoryDirectory {
    fn customer(&self, id: CustomerId) -> DomainResult<Customer> {
        fetch(&self.read()?.customers, id)
    }
}

impl InvoiceItemService for InMemoryDirectory {
    fn item_for_invoice(&self, invoice_id: InvoiceId) -> DomainResult<InvoiceItem> {
        self.read()?
            .items
            .values()
            .filter(|item| item.invoice_id == invoice_id)
            .min_by_key(|item| item.id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(InvoiceItem::KIND, format!("for invoice {invoice_id}")))
    }
}

impl ProductService for InMemoryDirectory {
    fn product(&self, id: ProductId) -> DomainResult<Product> {
        fetch(&self.read()?.products, id)
    }
}

impl UserService for InMemoryDirectory {
    fn current_user(&self) -> DomainResult<User> {
        self.user(self.current_user_id()?)
    }
}

impl CompanyService for InMemoryDirectory {
    fn current_user_company(&self) -> DomainResult<Company> {
        self.company_of(self.current_user_id()?)
    }
}

/// Per-request binding of a directory to an acting user.
#[derive(Debug, Clone)]
pub struct Session {
    directory: Arc<InMemoryDirectory>,
    user_id: UserId,
}

impl Session {
    pub fn new(directory: Arc<InMemoryDirectory>, user_id: UserId) -> Self {
        Self { directory, user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

impl UserService for Session {
    fn current_user(&self) -> DomainResult<User> {
        self.directory.user(self.user_id)
    }
}

impl CompanyService for Session {
    fn current_user_company(&self) -> DomainResult<Company> {
        self.directory.company_of(self.user_id)
    }
}
