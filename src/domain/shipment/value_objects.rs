use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::order::{OrderStatus, UnknownStatus};

// ============================================================================
// Shipment Value Objects
// ============================================================================

/// Status recorded in a history entry.
///
/// `Created` is a history-only marker for the moment an order enters the
/// system in `PENDING_PICKUP`. It is never an order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum HistoryStatus {
    Created,
    Order(OrderStatus),
}

impl HistoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryStatus::Created => "CREATED",
            HistoryStatus::Order(status) => status.as_str(),
        }
    }

    /// The order status this entry leaves the order in
    pub fn effective(&self) -> OrderStatus {
        match self {
            HistoryStatus::Created => OrderStatus::PendingPickup,
            HistoryStatus::Order(status) => *status,
        }
    }
}

impl fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HistoryStatus> for String {
    fn from(status: HistoryStatus) -> Self {
        status.as_str().to_string()
    }
}

impl TryFrom<String> for HistoryStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "CREATED" {
            return Ok(HistoryStatus::Created);
        }
        value.parse().map(HistoryStatus::Order)
    }
}

/// One immutable step in a shipment's tracking trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub status: HistoryStatus,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
    /// Order version the entry was recorded for
    #[serde(default)]
    pub order_version: Option<u64>,
}

impl HistoryEntry {
    pub fn new(status: HistoryStatus, description: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status,
            description: description.into(),
            timestamp,
            location: None,
            actor: None,
            order_version: None,
        }
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn for_order_version(mut self, version: u64) -> Self {
        self.order_version = Some(version);
        self
    }
}

/// Human-readable description for a history entry
pub fn describe(status: HistoryStatus, actor: Option<&str>) -> String {
    match (status, actor) {
        (HistoryStatus::Created, _) => "Order created".to_string(),
        (HistoryStatus::Order(OrderStatus::PendingPickup), _) => "Awaiting pickup".to_string(),
        (HistoryStatus::Order(OrderStatus::PickedUp), Some(actor)) => {
            format!("Shipper {} picked up the parcel", actor)
        }
        (HistoryStatus::Order(OrderStatus::PickedUp), None) => "Parcel picked up".to_string(),
        (HistoryStatus::Order(OrderStatus::InTransit), _) => "Parcel in transit".to_string(),
        (HistoryStatus::Order(OrderStatus::Delivering), Some(actor)) => {
            format!("Shipper {} is delivering the parcel", actor)
        }
        (HistoryStatus::Order(OrderStatus::Delivering), None) => "Out for delivery".to_string(),
        (HistoryStatus::Order(OrderStatus::Delivered), _) => "Delivered successfully".to_string(),
        (HistoryStatus::Order(OrderStatus::Cancelled), _) => "Order cancelled".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_status_wire_names() {
        assert_eq!(serde_json::to_string(&HistoryStatus::Created).unwrap(), "\"CREATED\"");
        assert_eq!(
            serde_json::to_string(&HistoryStatus::Order(OrderStatus::InTransit)).unwrap(),
            "\"IN_TRANSIT\""
        );

        let status: HistoryStatus = serde_json::from_str("\"DELIVERING\"").unwrap();
        assert_eq!(status, HistoryStatus::Order(OrderStatus::Delivering));
    }

    #[test]
    fn test_import_vocabulary_not_merged() {
        assert!(serde_json::from_str::<HistoryStatus>("\"WAREHOUSE_IN\"").is_err());
        assert!(serde_json::from_str::<HistoryStatus>("\"DELIVERED_SUCCESS\"").is_err());
    }

    #[test]
    fn test_created_means_pending_pickup() {
        assert_eq!(HistoryStatus::Created.effective(), OrderStatus::PendingPickup);
    }

    #[test]
    fn test_description_mentions_actor() {
        let text = describe(HistoryStatus::Order(OrderStatus::PickedUp), Some("SHP1004"));
        assert!(text.contains("SHP1004"));
        assert_eq!(describe(HistoryStatus::Order(OrderStatus::InTransit), Some("SHP1004")), "Parcel in transit");
    }
}
