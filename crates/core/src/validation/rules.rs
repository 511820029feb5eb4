//! Second-pass, table-driven business rules and the derived lifecycle stage.
//!
//! Rules see the whole record, so a predicate can depend on another field
//! (postal code format follows the selected country). Failures come back as
//! an ordered list, never as a panic or an `Err`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::{CustomerRecord, CustomerType};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub field: String,
    pub message: String,
}

pub struct BusinessRule {
    /// `None` applies the rule to every customer type.
    pub applies_to: Option<CustomerType>,
    pub field: &'static str,
    pub predicate: fn(Option<&str>, &CustomerRecord) -> bool,
    pub message: &'static str,
}

pub struct BusinessRuleEngine {
    rules: Vec<BusinessRule>,
}

impl BusinessRuleEngine {
    pub fn new(rules: Vec<BusinessRule>) -> Self {
        Self { rules }
    }

    /// Evaluates the subset of rules matching the record's type, in table
    /// order. A record without a type has no matching rules.
    pub fn evaluate(&self, record: &CustomerRecord) -> Vec<RuleViolation> {
        let Some(customer_type) = record.customer_type else {
            return Vec::new();
        };

        self.rules
            .iter()
            .filter(|rule| rule.applies_to.map_or(true, |wanted| wanted == customer_type))
            .filter(|rule| !(rule.predicate)(record.field(rule.field), record))
            .map(|rule| RuleViolation {
                field: rule.field.to_string(),
                message: rule.message.to_string(),
            })
            .collect()
    }
}

impl Default for BusinessRuleEngine {
    fn default() -> Self {
        Self::new(standard_rules())
    }
}

pub fn standard_rules() -> Vec<BusinessRule> {
    vec![
        BusinessRule {
            applies_to: None,
            field: "email",
            predicate: |value, _| value.map_or(true, email_is_plausible),
            message: "Email address format is invalid",
        },
        BusinessRule {
            applies_to: None,
            field: "postal_code",
            predicate: |value, record| match (value, record.field("country")) {
                (Some(code), Some(country)) => postal_code_matches_country(code, country),
                _ => true,
            },
            message: "Postal code does not match the country format",
        },
        BusinessRule {
            applies_to: None,
            field: "loyalty_points",
            predicate: |_, record| record.loyalty_points >= 0,
            message: "Loyalty points cannot be negative",
        },
        BusinessRule {
            applies_to: Some(CustomerType::Business),
            field: "company_size",
            predicate: |value, _| {
                value.map_or(true, |size| {
                    matches!(
                        size.to_ascii_lowercase().as_str(),
                        "small" | "medium" | "large" | "enterprise"
                    )
                })
            },
            message: "Company size must be one of small, medium, large, or enterprise",
        },
        BusinessRule {
            applies_to: Some(CustomerType::Fleet),
            field: "fleet_details.manager_contact",
            predicate: |_, record| {
                record
                    .fleet_details
                    .as_ref()
                    .and_then(|details| details.manager_contact.as_deref())
                    .map_or(true, |contact| email_is_plausible(contact) || phone_is_plausible(contact))
            },
            message: "Manager contact must be an email address or phone number",
        },
    ]
}

fn email_is_plausible(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn phone_is_plausible(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let allowed = phone.chars().all(|ch| {
        ch.is_ascii_digit() || matches!(ch, '+' | '-' | '(' | ')' | '.' | ' ')
    });
    allowed && digits >= 7
}

/// Country-conditional postal-code shape check, shared with the address
/// book's per-entry validation.
pub fn postal_code_matches_country(code: &str, country: &str) -> bool {
    let code = code.trim();
    if code.is_empty() {
        return false;
    }

    match country.trim().to_ascii_uppercase().as_str() {
        "US" | "USA" | "UNITED STATES" => us_zip(code),
        "CA" | "CAN" | "CANADA" => canadian_postal(code),
        "GB" | "UK" | "UNITED KINGDOM" => {
            (5..=8).contains(&code.len())
                && code.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == ' ')
        }
        _ => {
            (3..=10).contains(&code.len())
                && code.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '-'))
        }
    }
}

fn us_zip(code: &str) -> bool {
    match code.split_once('-') {
        None => code.len() == 5 && code.chars().all(|ch| ch.is_ascii_digit()),
        Some((zip, plus_four)) => {
            zip.len() == 5
                && plus_four.len() == 4
                && zip.chars().chain(plus_four.chars()).all(|ch| ch.is_ascii_digit())
        }
    }
}

fn canadian_postal(code: &str) -> bool {
    let compact: Vec<char> = code.chars().filter(|ch| *ch != ' ').collect();
    compact.len() == 6
        && compact
            .iter()
            .enumerate()
            .all(|(i, ch)| if i % 2 == 0 { ch.is_ascii_alphabetic() } else { ch.is_ascii_digit() })
}

/// Display-only lifecycle stage. Derived on read, never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    New,
    Onboarding,
    Active,
    Loyal,
    Established,
}

impl LifecycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Onboarding => "onboarding",
            Self::Active => "active",
            Self::Loyal => "loyal",
            Self::Established => "established",
        }
    }
}

const LOYAL_POINT_THRESHOLD: i64 = 1000;

pub fn lifecycle_stage(record: &CustomerRecord, now: DateTime<Utc>) -> LifecycleStage {
    let Some(customer_since) = record.customer_since else {
        return LifecycleStage::New;
    };

    let age_days = (now - customer_since).num_days();
    if age_days < 30 {
        LifecycleStage::Onboarding
    } else if age_days < 90 {
        LifecycleStage::Active
    } else if record.loyalty_points > LOYAL_POINT_THRESHOLD {
        LifecycleStage::Loyal
    } else {
        LifecycleStage::Established
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{lifecycle_stage, postal_code_matches_country, BusinessRuleEngine, LifecycleStage};
    use crate::domain::customer::{CustomerRecord, CustomerType, FleetDetails};

    fn record(customer_type: CustomerType) -> CustomerRecord {
        CustomerRecord {
            customer_type: Some(customer_type),
            country: Some("US".to_string()),
            postal_code: Some("48201".to_string()),
            email: Some("shop@example.com".to_string()),
            ..CustomerRecord::new()
        }
    }

    #[test]
    fn postal_rule_depends_on_the_country_field() {
        let engine = BusinessRuleEngine::default();

        let us = CustomerRecord { postal_code: Some("K1A 0B1".to_string()), ..record(CustomerType::Personal) };
        let violations = engine.evaluate(&us);
        assert!(violations.iter().any(|v| v.field == "postal_code"));

        let ca = CustomerRecord { country: Some("CA".to_string()), ..us };
        assert!(engine.evaluate(&ca).is_empty());
    }

    #[test]
    fn violations_come_back_in_table_order() {
        let broken = CustomerRecord {
            email: Some("not-an-email".to_string()),
            postal_code: Some("xx".to_string()),
            loyalty_points: -5,
            ..record(CustomerType::Personal)
        };

        let violations = BusinessRuleEngine::default().evaluate(&broken);
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "postal_code", "loyalty_points"]);
    }

    #[test]
    fn type_scoped_rules_only_fire_for_their_type() {
        let engine = BusinessRuleEngine::default();

        let personal = CustomerRecord {
            company_size: Some("gigantic".to_string()),
            ..record(CustomerType::Personal)
        };
        assert!(engine.evaluate(&personal).is_empty());

        let business = CustomerRecord {
            company_size: Some("gigantic".to_string()),
            ..record(CustomerType::Business)
        };
        assert!(engine.evaluate(&business).iter().any(|v| v.field == "company_size"));
    }

    #[test]
    fn fleet_manager_contact_accepts_phone_numbers() {
        let engine = BusinessRuleEngine::default();
        let mut fleet = record(CustomerType::Fleet);
        fleet.fleet_details = Some(FleetDetails {
            vehicle_count: 3,
            manager_name: Some("Dispatch".to_string()),
            manager_contact: Some("+1 (313) 555-0188".to_string()),
        });

        assert!(engine.evaluate(&fleet).is_empty());

        if let Some(details) = fleet.fleet_details.as_mut() {
            details.manager_contact = Some("front desk".to_string());
        }
        assert!(engine
            .evaluate(&fleet)
            .iter()
            .any(|v| v.field == "fleet_details.manager_contact"));
    }

    #[test]
    fn postal_shapes_cover_us_canada_and_fallback() {
        assert!(postal_code_matches_country("48201", "US"));
        assert!(postal_code_matches_country("48201-1234", "usa"));
        assert!(!postal_code_matches_country("4820", "US"));
        assert!(postal_code_matches_country("K1A 0B1", "CA"));
        assert!(!postal_code_matches_country("11A 0B1", "CA"));
        assert!(postal_code_matches_country("SW1A 1AA", "GB"));
        assert!(postal_code_matches_country("75008", "FR"));
        assert!(!postal_code_matches_country("", "FR"));
    }

    #[test]
    fn lifecycle_stage_follows_tenure_and_loyalty() {
        let now = Utc::now();
        let mut record = CustomerRecord::new();
        assert_eq!(lifecycle_stage(&record, now), LifecycleStage::New);

        record.customer_since = Some(now - Duration::days(10));
        assert_eq!(lifecycle_stage(&record, now), LifecycleStage::Onboarding);

        record.customer_since = Some(now - Duration::days(45));
        assert_eq!(lifecycle_stage(&record, now), LifecycleStage::Active);

        record.customer_since = Some(now - Duration::days(120));
        assert_eq!(lifecycle_stage(&record, now), LifecycleStage::Established);

        record.loyalty_points = 1001;
        assert_eq!(lifecycle_stage(&record, now), LifecycleStage::Loyal);

        record.loyalty_points = 1000;
        assert_eq!(lifecycle_stage(&record, now), LifecycleStage::Established);
    }
}
