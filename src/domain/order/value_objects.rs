use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Order status in the delivery state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingPickup,
    PickedUp,
    InTransit,
    Delivering,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::PendingPickup,
        OrderStatus::PickedUp,
        OrderStatus::InTransit,
        OrderStatus::Delivering,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPickup => "PENDING_PICKUP",
            OrderStatus::PickedUp => "PICKED_UP",
            OrderStatus::InTransit => "IN_TRANSIT",
            OrderStatus::Delivering => "DELIVERING",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Delivered and cancelled orders accept no further mutation
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Sender or recipient contact block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub l: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub weight: f64,
    pub dimensions: Dimensions,
    pub contents: String,
    pub is_fragile: bool,
    pub declared_value: f64,
    pub quantity: f64,
}

impl Default for Parcel {
    fn default() -> Self {
        Self {
            weight: 0.0,
            dimensions: Dimensions::default(),
            contents: String::new(),
            is_fragile: false,
            declared_value: 0.0,
            quantity: 1.0,
        }
    }
}

/// Largest magnitude accepted for a single money component. Three of these
/// still sum to a finite value.
pub const MAX_AMOUNT: f64 = 1e15;

/// Order money amounts. `total_amount` is always the sum of the other three,
/// including after deserialization of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "FinancialsDocument")]
pub struct Financials {
    cod_amount: f64,
    shipping_fee: f64,
    insurance_fee: f64,
    total_amount: f64,
}

impl Financials {
    /// Components are clamped to `-MAX_AMOUNT..=MAX_AMOUNT`; NaN becomes 0
    pub fn new(cod_amount: f64, shipping_fee: f64, insurance_fee: f64) -> Self {
        let cod_amount = bounded_amount(cod_amount);
        let shipping_fee = bounded_amount(shipping_fee);
        let insurance_fee = bounded_amount(insurance_fee);

        Self {
            cod_amount,
            shipping_fee,
            insurance_fee,
            total_amount: cod_amount + shipping_fee + insurance_fee,
        }
    }

    pub fn cod_amount(&self) -> f64 {
        self.cod_amount
    }

    pub fn shipping_fee(&self) -> f64 {
        self.shipping_fee
    }

    pub fn insurance_fee(&self) -> f64 {
        self.insurance_fee
    }

    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }
}

fn bounded_amount(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-MAX_AMOUNT, MAX_AMOUNT)
}

impl Default for Financials {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

#[derive(Deserialize)]
struct FinancialsDocument {
    #[serde(default)]
    cod_amount: f64,
    #[serde(default)]
    shipping_fee: f64,
    #[serde(default)]
    insurance_fee: f64,
}

impl From<FinancialsDocument> for Financials {
    fn from(doc: FinancialsDocument) -> Self {
        Financials::new(doc.cod_amount, doc.shipping_fee, doc.insurance_fee)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
