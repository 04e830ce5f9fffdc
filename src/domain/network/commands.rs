use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{OfficeAddress, PostOffice, Shipper, ShipperStatus};

// ============================================================================
// Network Commands
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostOfficeForm {
    pub office_code: String,
    pub name: String,
    pub phone_number: String,
    pub operating_hours: String,
    pub address: OfficeAddress,
}

impl PostOfficeForm {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        required([("office_code", &self.office_code), ("name", &self.name)])
    }

    pub fn normalized_code(&self) -> String {
        self.office_code.trim().to_uppercase()
    }

    pub fn into_office(self, id: Uuid, created_at: DateTime<Utc>, now: DateTime<Utc>) -> PostOffice {
        PostOffice {
            id,
            office_code: self.normalized_code(),
            name: self.name.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            operating_hours: self.operating_hours.trim().to_string(),
            address: self.address,
            created_at,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipperForm {
    pub shipper_code: String,
    pub full_name: String,
    pub phone_number: String,
    pub current_post_office_id: Option<Uuid>,
    /// Defaults to `IDLE`
    pub status: Option<ShipperStatus>,
}

impl ShipperForm {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        required([("shipper_code", &self.shipper_code), ("full_name", &self.full_name)])
    }

    pub fn into_shipper(self, id: Uuid, created_at: DateTime<Utc>, now: DateTime<Utc>) -> Shipper {
        Shipper {
            id,
            shipper_code: self.shipper_code.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            current_post_office_id: self.current_post_office_id,
            status: self.status.unwrap_or_default(),
            created_at,
            updated_at: now,
        }
    }
}

fn required<const N: usize>(fields: [(&'static str, &String); N]) -> Vec<&'static str> {
    fields
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
}
