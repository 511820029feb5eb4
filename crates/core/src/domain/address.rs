use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    #[default]
    Home,
    Work,
    Billing,
    Service,
    Other,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Work => "work",
            Self::Billing => "billing",
            Self::Service => "service",
            Self::Other => "other",
        }
    }
}

/// One entry in a customer's ordered address book. At most one entry is the
/// primary correspondence address; [`crate::AddressBook`] owns that invariant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressEntry {
    #[serde(rename = "type")]
    pub address_type: AddressType,
    pub is_primary: bool,
    pub street_address: String,
    pub city: String,
    pub state_province: String,
    pub postal_code: String,
    pub country: String,
}

#[cfg(test)]
mod tests {
    use super::{AddressEntry, AddressType};

    #[test]
    fn serializes_discriminator_under_type_key() {
        let entry = AddressEntry {
            address_type: AddressType::Billing,
            is_primary: true,
            street_address: "14 Piston Way".to_string(),
            city: "Detroit".to_string(),
            state_province: "MI".to_string(),
            postal_code: "48201".to_string(),
            country: "US".to_string(),
        };

        let value = serde_json::to_value(&entry).expect("entry serializes");
        assert_eq!(value["type"], "billing");
        assert_eq!(value["is_primary"], true);
    }
}
