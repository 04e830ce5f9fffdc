use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::OrderStatus;

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

/// A loosely typed numeric form field. Forms submit numbers as text, JSON
/// clients submit them as numbers; anything else is absorbed by `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

/// Numeric coercion policy for order forms.
///
/// Absent input yields `default`. Present but blank, unparsable or
/// non-finite input yields 0. Order creation never fails on a numeric field.
pub fn coerce_number(input: Option<&NumericInput>, default: f64) -> f64 {
    let value = match input {
        None => return default,
        Some(NumericInput::Number(n)) => *n,
        Some(NumericInput::Text(text)) => text.trim().parse::<f64>().unwrap_or(0.0),
        Some(NumericInput::Other(_)) => 0.0,
    };

    if value.is_finite() { value } else { 0.0 }
}

/// Checkbox style flag: `true`, `"on"`, `"true"` and `"1"` are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagInput {
    Bool(bool),
    Text(String),
}

impl FlagInput {
    pub fn is_set(&self) -> bool {
        match self {
            FlagInput::Bool(flag) => *flag,
            FlagInput::Text(text) => {
                matches!(text.trim().to_ascii_lowercase().as_str(), "on" | "true" | "1")
            }
        }
    }
}

/// Submitted order form, used for both creation and full-record edits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderForm {
    pub order_code: Option<String>,
    pub tracking_code: Option<String>,

    pub sender_name: String,
    pub sender_phone: String,
    pub sender_address: String,

    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_address: String,

    pub weight: Option<NumericInput>,
    pub dim_l: Option<NumericInput>,
    pub dim_w: Option<NumericInput>,
    pub dim_h: Option<NumericInput>,
    pub contents: String,
    pub is_fragile: Option<FlagInput>,
    pub declared_value: Option<NumericInput>,
    pub quantity: Option<NumericInput>,

    pub cod_amount: Option<NumericInput>,
    pub shipping_fee: Option<NumericInput>,
    pub insurance_fee: Option<NumericInput>,

    pub assigned_shipper_code: Option<String>,

    /// Requested status on edit; ignored on creation
    pub current_status: Option<String>,
}

impl OrderForm {
    /// Supplied order code, if any non-blank one was submitted
    pub fn supplied_code(&self) -> Option<&str> {
        non_blank(self.order_code.as_deref())
    }

    pub fn supplied_tracking_code(&self) -> Option<&str> {
        non_blank(self.tracking_code.as_deref())
    }

    pub fn supplied_shipper_code(&self) -> Option<&str> {
        non_blank(self.assigned_shipper_code.as_deref())
    }

    /// Identity fields that must be present; numeric fields never are
    pub fn missing_identity_fields(&self) -> Vec<&'static str> {
        [
            ("sender_name", &self.sender_name),
            ("recipient_name", &self.recipient_name),
            ("recipient_phone", &self.recipient_phone),
            ("recipient_address", &self.recipient_address),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Status change request from the quick-patch path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// When the change happened in the field, if reported by the caller
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl TransitionRequest {
    pub fn to(status: OrderStatus) -> Self {
        Self {
            status,
            actor: None,
            location: None,
            occurred_at: None,
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }
}
