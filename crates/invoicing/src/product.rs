use serde::{Deserialize, Serialize};

use factoring_core::{Entity, Money, ProductId, VatRate};

/// Catalog product referenced by invoice items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Statistical classification code (PKWiU), when the product has one.
    #[serde(default)]
    pub pkwiu: Option<String>,
    pub measure_unit: String,
    /// List price net of VAT; the invoice item may carry a different one.
    pub net_price: Money,
    pub vat_rate: VatRate,
}

impl Entity for Product {
    type Id = ProductId;
    const KIND: &'static str = "product";

    fn id(&self) -> ProductId {
        self.id
    }
}
