use serde::{Deserialize, Serialize};

use factoring_core::{CompanyId, Entity, UserId};

use crate::customer::Address;

/// Application user; the acting user is printed as the issuer of the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company_id: CompanyId,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for User {
    type Id = UserId;
    const KIND: &'static str = "user";

    fn id(&self) -> UserId {
        self.id
    }
}

/// Company of the acting user: the seller on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub nip: String,
    #[serde(default)]
    pub regon: Option<String>,
    pub address: Address,
    /// Bank account the invoice is payable to.
    pub account_number: String,
}

impl Entity for Company {
    type Id = CompanyId;
    const KIND: &'static str = "company";

    fn id(&self) -> CompanyId {
        self.id
    }
}
