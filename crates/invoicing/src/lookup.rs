//! Lookup services consumed by document generation.
//!
//! Each is a synchronous key-based fetch returning the record or
//! [`DomainError::NotFound`](factoring_core::DomainError::NotFound).

use std::sync::Arc;

use factoring_core::{
    CurrencyCode, CustomerId, DomainResult, InvoiceId, PaymentMethod, ProductId,
};

use crate::{Company, Customer, Invoice, InvoiceItem, Product, User};

pub trait InvoiceService: Send + Sync {
    fn invoice(&self, id: InvoiceId) -> DomainResult<Invoice>;

    fn invoice_currency_code(&self, id: InvoiceId) -> DomainResult<CurrencyCode> {
        self.invoice(id).map(|invoice| invoice.currency)
    }

    fn invoice_payment_method(&self, id: InvoiceId) -> DomainResult<PaymentMethod> {
        self.invoice(id).map(|invoice| invoice.payment_method)
    }
}

pub trait CustomerService: Send + Sync {
    fn customer(&self, id: CustomerId) -> DomainResult<Customer>;
}

pub trait InvoiceItemService: Send + Sync {
    /// The line item of an invoice. Generated documents carry a single line.
    fn item_for_invoice(&self, invoice_id: InvoiceId) -> DomainResult<InvoiceItem>;
}

pub trait ProductService: Send + Sync {
    fn product(&self, id: ProductId) -> DomainResult<Product>;
}

pub trait UserService: Send + Sync {
    /// The user on whose behalf the current request runs.
    fn current_user(&self) -> DomainResult<User>;
}

pub trait CompanyService: Send + Sync {
    /// The company of the current user.
    fn current_user_company(&self) -> DomainResult<Company>;
}

impl<S: InvoiceService + ?Sized> InvoiceService for Arc<S> {
    fn invoice(&self, id: InvoiceId) -> DomainResult<Invoice> {
        (**self).invoice(id)
    }

    fn invoice_currency_code(&self, id: InvoiceId) -> DomainResult<CurrencyCode> {
        (**self).invoice_currency_code(id)
    }

    fn invoice_payment_method(&self, id: InvoiceId) -> DomainResult<PaymentMethod> {
        (**self).invoice_payment_method(id)
    }
}

impl<S: CustomerService + ?Sized> CustomerService for Arc<S> {
    fn customer(&self, id: CustomerId) -> DomainResult<Customer> {
        (**self).customer(id)
    }
}

impl<S: InvoiceItemService + ?Sized> InvoiceItemService for Arc<S> {
    fn item_for_invoice(&self, invoice_id: InvoiceId) -> DomainResult<InvoiceItem> {
        (**self).item_for_invoice(invoice_id)
    }
}

impl<S: ProductService + ?Sized> ProductService for Arc<S> {
    fn product(&self, id: ProductId) -> DomainResult<Product> {
        (**self).product(id)
    }
}

impl<S: UserService + ?Sized> UserService for Arc<S> {
    fn current_user(&self) -> DomainResult<User> {
        (**self).current_user()
    }
}

impl<S: CompanyService + ?Sized> CompanyService for Arc<S> {
    fn current_user_company(&self) -> DomainResult<Company> {
        (**self).current_user_company()
    }
}
