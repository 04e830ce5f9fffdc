use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Network Value Objects
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfficeAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub ward: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub province: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostOffice {
    pub id: Uuid,
    /// Unique, always upper case
    pub office_code: String,
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub operating_hours: String,
    #[serde(default)]
    pub address: OfficeAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipperStatus {
    #[default]
    Idle,
    Delivering,
    Offline,
    OnDuty,
    Active,
}

impl ShipperStatus {
    /// Shippers that can take work right now
    pub fn is_active(&self) -> bool {
        matches!(self, ShipperStatus::OnDuty | ShipperStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipper {
    pub id: Uuid,
    pub shipper_code: String,
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub current_post_office_id: Option<Uuid>,
    pub status: ShipperStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
