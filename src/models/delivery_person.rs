use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    Active,
    #[default]
    Inactive,
}

impl AvailabilityStatus {
    pub fn is_active(self) -> bool {
        self == AvailabilityStatus::Active
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailabilityStatus::Active => f.write_str("active"),
            AvailabilityStatus::Inactive => f.write_str("inactive"),
        }
    }
}

/// Stored account. The password hash never leaves the server; handlers
/// respond with [`DeliveryPersonView`].
#[derive(Debug, Clone)]
pub struct DeliveryPerson {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: u64,
    pub status: AvailabilityStatus,
    pub is_location_on: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPersonView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: u64,
    pub status: AvailabilityStatus,
    pub is_location_on: bool,
    pub created_at: i64,
}

impl From<&DeliveryPerson> for DeliveryPersonView {
    fn from(person: &DeliveryPerson) -> Self {
        Self {
            id: person.id,
            name: person.name.clone(),
            email: person.email.clone(),
            phone: person.phone,
            status: person.status,
            is_location_on: person.is_location_on,
            created_at: person.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub delivery_person: DeliveryPersonView,
}

/// Phone numbers are stored as integers and must carry exactly 12 digits
/// (country code included).
pub fn is_valid_phone(phone: u64) -> bool {
    (100_000_000_000..=999_999_999_999).contains(&phone)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_needs_exactly_twelve_digits() {
        assert!(is_valid_phone(919876543210));
        assert!(!is_valid_phone(9876543210));
        assert!(!is_valid_phone(9198765432101));
    }

    #[test]
    fn availability_uses_lowercase_on_the_wire() {
        let json = serde_json::to_string(&AvailabilityStatus::Active).unwrap();
        assert_eq!(json, "\"active\"");

        let parsed: AvailabilityStatus = serde_json::from_str("\"inactive\"").unwrap();
        assert_eq!(parsed, AvailabilityStatus::Inactive);
    }
}
