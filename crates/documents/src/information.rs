//! Typed placeholder view of one invoice.

use std::collections::{BTreeMap, BTreeSet};

use factoring_core::{CurrencyCode, DomainResult, Money, PaymentMethod};
use factoring_invoicing::{Company, Customer, Invoice, InvoiceItem, Product, User};

use crate::error::TemplateError;

const DATE_FORMAT: &str = "%Y-%m-%d";

macro_rules! placeholders {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Every placeholder a template may reference, with its `${…}` token name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Placeholder {
            $($variant),+
        }

        impl Placeholder {
            pub const ALL: &'static [Placeholder] = &[$(Placeholder::$variant),+];

            /// Token name as written in templates (`${name}`).
            pub fn name(&self) -> &'static str {
                match self {
                    $(Placeholder::$variant => $name),+
                }
            }

            pub fn from_name(name: &str) -> Option<Placeholder> {
                match name {
                    $($name => Some(Placeholder::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

placeholders! {
    InvoiceNumber => "invoiceNumber",
    CreationDate => "creationDate",
    SaleDate => "saleDate",
    PaymentDeadline => "paymentDeadline",
    CurrencyCode => "currencyCode",
    PaymentMethod => "paymentMethod",
    CustomerName => "customerName",
    CustomerCompanyName => "customerCompanyName",
    CustomerNip => "customerNip",
    CustomerAddress => "customerAddress",
    ProductName => "productName",
    ProductPkwiu => "productPkwiu",
    MeasureUnit => "measureUnit",
    Quantity => "quantity",
    NetPrice => "netPrice",
    VatRate => "vatRate",
    NetValue => "netValue",
    VatValue => "vatValue",
    GrossValue => "grossValue",
    AmountToPay => "amountToPay",
    SellerName => "sellerName",
    SellerEmail => "sellerEmail",
    CompanyName => "companyName",
    CompanyNip => "companyNip",
    CompanyRegon => "companyRegon",
    CompanyAddress => "companyAddress",
    AccountNumber => "accountNumber",
}

impl Placeholder {
    /// Bind a template's token names to placeholders, failing on any unknown name.
    pub fn bind_all(names: &BTreeSet<String>) -> Result<BTreeSet<Placeholder>, TemplateError> {
        let mut bound = BTreeSet::new();
        let mut unknown = Vec::new();
        for name in names {
            match Placeholder::from_name(name) {
                Some(placeholder) => {
                    bound.insert(placeholder);
                }
                None => unknown.push(name.clone()),
            }
        }
        if !unknown.is_empty() {
            return Err(TemplateError::UnknownPlaceholders(unknown));
        }
        Ok(bound)
    }
}

impl core::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Placeholder values for one document. Complete by construction: every
/// [`Placeholder`] has a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variables(BTreeMap<Placeholder, String>);

impl Variables {
    pub fn value(&self, placeholder: Placeholder) -> &str {
        self.0.get(&placeholder).map(String::as_str).unwrap_or_default()
    }

    /// Value for a template token name, if it names a placeholder.
    pub fn get(&self, name: &str) -> Option<&str> {
        Placeholder::from_name(name).map(|p| self.value(p))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Placeholder, &str)> {
        self.0.iter().map(|(p, v)| (*p, v.as_str()))
    }
}

/// Everything printed on one invoice document, gathered from the lookup services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceInformation {
    pub invoice: Invoice,
    pub customer: Customer,
    pub item: InvoiceItem,
    pub product: Product,
    pub currency: CurrencyCode,
    pub payment_method: PaymentMethod,
    pub user: User,
    pub company: Company,
}

impl InvoiceInformation {
    pub fn invoice_number(&self) -> &str {
        &self.invoice.invoice_number
    }

    /// Project into placeholder values. Fails only on amount overflow.
    pub fn variables(&self) -> DomainResult<Variables> {
        let gross = self.item.gross_value()?;
        let to_pay = if self.invoice.paid { Money::ZERO } else { gross };
        let money = |amount: Money| format!("{} {}", amount, self.currency);

        let mut values = BTreeMap::new();
        for &placeholder in Placeholder::ALL {
            let value = match placeholder {
                Placeholder::InvoiceNumber => self.invoice.invoice_number.clone(),
                Placeholder::CreationDate => self.invoice.creation_date.format(DATE_FORMAT).to_string(),
                Placeholder::SaleDate => self.invoice.sale_date.format(DATE_FORMAT).to_string(),
                Placeholder::PaymentDeadline => {
                    self.invoice.payment_deadline.format(DATE_FORMAT).to_string()
                }
                Placeholder::CurrencyCode => self.currency.to_string(),
                Placeholder::PaymentMethod => self.payment_method.to_string(),
                Placeholder::CustomerName => self.customer.full_name(),
                Placeholder::CustomerCompanyName => self.customer.company_name.clone(),
                Placeholder::CustomerNip => self.customer.nip.clone(),
                Placeholder::CustomerAddress => self.customer.address.to_string(),
                Placeholder::ProductName => self.product.name.clone(),
                Placeholder::ProductPkwiu => self.product.pkwiu.clone().unwrap_or_default(),
                Placeholder::MeasureUnit => self.product.measure_unit.clone(),
                Placeholder::Quantity => self.item.quantity.to_string(),
                Placeholder::NetPrice => money(self.item.net_price),
                Placeholder::VatRate => self.item.vat_rate.to_string(),
                Placeholder::NetValue => money(self.item.net_value()?),
                Placeholder::VatValue => money(self.item.vat_value()?),
                Placeholder::GrossValue => money(gross),
                Placeholder::AmountToPay => money(to_pay),
                Placeholder::SellerName => self.user.full_name(),
                Placeholder::SellerEmail => self.user.email.clone(),
                Placeholder::CompanyName => self.company.name.clone(),
                Placeholder::CompanyNip => self.company.nip.clone(),
                Placeholder::CompanyRegon => self.company.regon.clone().unwrap_or_default(),
                Placeholder::CompanyAddress => self.company.address.to_string(),
                Placeholder::AccountNumber => self.company.account_number.clone(),
            };
            values.insert(placeholder, value);
        }
        Ok(Variables(values))
    }
}
