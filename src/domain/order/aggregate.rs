use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::{coerce_number, OrderForm};
use super::value_objects::{ContactInfo, Dimensions, Financials, OrderStatus, Parcel};

// ============================================================================
// Order Record
// ============================================================================
//
// The authoritative order document. Derived fields (financial total, codes)
// are only ever computed here, from a submitted form, so every write path
// produces the same shape.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    // Identity
    pub id: Uuid,
    pub order_code: String,
    pub tracking_code: String,

    // Parties
    #[serde(rename = "sender_info")]
    pub sender: ContactInfo,
    #[serde(rename = "recipient_info")]
    pub recipient: ContactInfo,
    #[serde(default)]
    pub assigned_shipper_code: Option<String>,

    // Contents
    pub parcel: Parcel,
    pub financials: Financials,

    // State
    pub current_status: OrderStatus,
    #[serde(default)]
    pub is_deleted: bool,
    /// Bumped on every write; conditional writes compare it
    #[serde(default)]
    pub version: u64,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a fresh `PENDING_PICKUP` order from a form and a resolved code.
    /// The tracking code falls back to the order code.
    pub fn from_form(id: Uuid, order_code: String, form: &OrderForm, now: DateTime<Utc>) -> Self {
        let tracking_code = form
            .supplied_tracking_code()
            .map(str::to_string)
            .unwrap_or_else(|| order_code.clone());

        Self {
            id,
            order_code,
            tracking_code,
            sender: sender_from(form),
            recipient: recipient_from(form),
            assigned_shipper_code: form.supplied_shipper_code().map(str::to_string),
            parcel: parcel_from(form),
            financials: financials_from(form),
            current_status: OrderStatus::PendingPickup,
            is_deleted: false,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild this order from an edit form. Identity, tracking code and
    /// creation time are kept; a blank code keeps the existing one.
    pub fn rebuilt_from(&self, form: &OrderForm, status: OrderStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            order_code: form
                .supplied_code()
                .map(str::to_string)
                .unwrap_or_else(|| self.order_code.clone()),
            tracking_code: self.tracking_code.clone(),
            sender: sender_from(form),
            recipient: recipient_from(form),
            assigned_shipper_code: form
                .supplied_shipper_code()
                .map(str::to_string)
                .or_else(|| self.assigned_shipper_code.clone()),
            parcel: parcel_from(form),
            financials: financials_from(form),
            current_status: status,
            is_deleted: self.is_deleted,
            version: self.version + 1,
            created_at: self.created_at,
            updated_at: now,
        }
    }

    pub fn with_status(&self, status: OrderStatus, now: DateTime<Utc>) -> Self {
        Self {
            current_status: status,
            version: self.version + 1,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn deleted(&self, now: DateTime<Utc>) -> Self {
        Self {
            is_deleted: true,
            version: self.version + 1,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Case-insensitive match on code, recipient name or recipient phone
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        [&self.order_code, &self.recipient.name, &self.recipient.phone]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

fn sender_from(form: &OrderForm) -> ContactInfo {
    ContactInfo {
        name: form.sender_name.trim().to_string(),
        phone: form.sender_phone.trim().to_string(),
        address: form.sender_address.trim().to_string(),
    }
}

fn recipient_from(form: &OrderForm) -> ContactInfo {
    ContactInfo {
        name: form.recipient_name.trim().to_string(),
        phone: form.recipient_phone.trim().to_string(),
        address: form.recipient_address.trim().to_string(),
    }
}

fn parcel_from(form: &OrderForm) -> Parcel {
    Parcel {
        weight: coerce_number(form.weight.as_ref(), 0.0),
        dimensions: Dimensions {
            l: coerce_number(form.dim_l.as_ref(), 0.0),
            w: coerce_number(form.dim_w.as_ref(), 0.0),
            h: coerce_number(form.dim_h.as_ref(), 0.0),
        },
        contents: form.contents.trim().to_string(),
        is_fragile: form.is_fragile.as_ref().is_some_and(|flag| flag.is_set()),
        declared_value: coerce_number(form.declared_value.as_ref(), 0.0),
        quantity: coerce_number(form.quantity.as_ref(), 1.0),
    }
}

fn financials_from(form: &OrderForm) -> Financials {
    Financials::new(
        coerce_number(form.cod_amount.as_ref(), 0.0),
        coerce_number(form.shipping_fee.as_ref(), 0.0),
        coerce_number(form.insurance_fee.as_ref(), 0.0),
    )
}

// ============================================================================
// Unit Tests
// ============================================================================
