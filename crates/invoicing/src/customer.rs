use serde::{Deserialize, Serialize};

use factoring_core::{CustomerId, Entity};

/// Postal address printed on invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub building_number: String,
    #[serde(default)]
    pub apartment_number: Option<String>,
    pub postal_code: String,
    pub city: String,
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.street, self.building_number)?;
        if let Some(apartment) = self.apartment_number.as_deref().filter(|a| !a.is_empty()) {
            write!(f, "/{apartment}")?;
        }
        write!(f, ", {} {}", self.postal_code, self.city)
    }
}

/// Invoice recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    /// Tax identification number.
    pub nip: String,
    pub address: Address,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for Customer {
    type Id = CustomerId;
    const KIND: &'static str = "customer";

    fn id(&self) -> CustomerId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(apartment: Option<&str>) -> Address {
        Address {
            street: "Akademicka".into(),
            building_number: "16".into(),
            apartment_number: apartment.map(str::to_string),
            postal_code: "44-100".into(),
            city: "Gliwice".into(),
        }
    }

    #[test]
    fn address_renders_on_one_line() {
        assert_eq!(address(None).to_string(), "Akademicka 16, 44-100 Gliwice");
        assert_eq!(address(Some("4")).to_string(), "Akademicka 16/4, 44-100 Gliwice");
        assert_eq!(address(Some("")).to_string(), "Akademicka 16, 44-100 Gliwice");
    }
}
