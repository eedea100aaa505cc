use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use factoring_core::{
    CurrencyCode, CustomerId, DomainResult, Entity, InvoiceId, InvoiceItemId, Money,
    PaymentMethod, ProductId, VatRate,
};

/// Invoice header as stored by the invoicing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Human-facing number, e.g. `FV/2024/03/017`. Also the barcode payload.
    pub invoice_number: String,
    pub customer_id: CustomerId,
    pub currency: CurrencyCode,
    pub payment_method: PaymentMethod,
    pub creation_date: NaiveDate,
    pub sale_date: NaiveDate,
    pub payment_deadline: NaiveDate,
    #[serde(default)]
    pub paid: bool,
}

impl Entity for Invoice {
    type Id = InvoiceId;
    const KIND: &'static str = "invoice";

    fn id(&self) -> InvoiceId {
        self.id
    }
}

/// Invoice line item.
///
/// Amounts are derived from quantity, unit net price and VAT rate; VAT is computed
/// on the line net value, not per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub invoice_id: InvoiceId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price net of VAT.
    pub net_price: Money,
    pub vat_rate: VatRate,
}

impl InvoiceItem {
    pub fn net_value(&self) -> DomainResult<Money> {
        self.net_price.times(self.quantity)
    }

    pub fn vat_value(&self) -> DomainResult<Money> {
        self.net_value()?.percent(self.vat_rate)
    }

    pub fn gross_value(&self) -> DomainResult<Money> {
        self.net_value()?.checked_add(self.vat_value()?)
    }
}

impl Entity for InvoiceItem {
    type Id = InvoiceItemId;
    const KIND: &'static str = "invoice item";

    fn id(&self) -> InvoiceItemId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: u32, net_minor: u64, vat: u8) -> InvoiceItem {
        InvoiceItem {
            id: InvoiceItemId::new(1).unwrap(),
            invoice_id: InvoiceId::new(1).unwrap(),
            product_id: ProductId::new(1).unwrap(),
            quantity,
            net_price: Money::from_minor(net_minor),
            vat_rate: VatRate::new(vat).unwrap(),
        }
    }

    #[test]
    fn line_values_derive_from_quantity_and_rate() {
        let line = item(3, 10_000, 23);
        assert_eq!(line.net_value().unwrap().to_string(), "300.00");
        assert_eq!(line.vat_value().unwrap().to_string(), "69.00");
        assert_eq!(line.gross_value().unwrap().to_string(), "369.00");
    }

    #[test]
    fn zero_rated_line_has_no_vat() {
        let line = item(2, 1_999, 0);
        assert_eq!(line.vat_value().unwrap(), Money::ZERO);
        assert_eq!(line.gross_value().unwrap(), line.net_value().unwrap());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: gross = net + vat for every representable line.
            #[test]
            fn gross_is_net_plus_vat(quantity in 1u32..10_000, net in 0u64..10_000_000, vat in 0u8..=100) {
                let line = item(quantity, net, vat);
                let gross = line.gross_value().unwrap().minor();
                let expected = line.net_value().unwrap().minor() + line.vat_value().unwrap().minor();
                prop_assert_eq!(gross, expected);
            }
        }
    }
}
