use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::address::AddressEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminator selecting a record's required-field set and business rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    Personal,
    Business,
    Fleet,
}

impl CustomerType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "personal" => Some(Self::Personal),
            "business" => Some(Self::Business),
            "fleet" => Some(Self::Fleet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Business => "business",
            Self::Fleet => "fleet",
        }
    }
}

impl std::fmt::Display for CustomerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetDetails {
    pub vehicle_count: u32,
    pub manager_name: Option<String>,
    pub manager_contact: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketingPreferences {
    pub email_opt_in: bool,
    pub sms_opt_in: bool,
    pub phone_opt_in: bool,
}

/// A customer row as edited in a session. Optional fields stay `None` until
/// the form touches them; `updated_at` is assigned by the backend and never
/// written optimistically.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerRecord {
    pub id: Option<CustomerId>,
    pub organization_id: Option<Uuid>,
    pub customer_type: Option<CustomerType>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub company_name: Option<String>,
    pub business_classification_id: Option<String>,
    pub company_size: Option<String>,
    pub fleet_details: Option<FleetDetails>,
    pub address_book: Vec<AddressEntry>,
    pub marketing_preferences: MarketingPreferences,
    pub customer_since: Option<DateTime<Utc>>,
    pub loyalty_points: i64,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CustomerRecord {
    /// Fresh record for a create-mode session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "first_name" => &self.first_name,
            "last_name" => &self.last_name,
            "email" => &self.email,
            "phone" => &self.phone,
            "street_address" => &self.street_address,
            "city" => &self.city,
            "state_province" => &self.state_province,
            "postal_code" => &self.postal_code,
            "country" => &self.country,
            "timezone" => &self.timezone,
            "company_name" => &self.company_name,
            "business_classification_id" => &self.business_classification_id,
            "company_size" => &self.company_size,
            _ => return None,
        };
        value.as_deref().map(str::trim).filter(|trimmed| !trimmed.is_empty())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}
