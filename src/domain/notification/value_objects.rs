use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::order::{OrderStatus, UnknownStatus};

// ============================================================================
// Notification Value Objects
// ============================================================================

/// Notification type, on the wire as `ORDER_CREATED`, `ORDER_UPDATED`
/// or `ORDER_<status>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum NotificationKind {
    OrderCreated,
    OrderUpdated,
    StatusChanged(OrderStatus),
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::OrderCreated => f.write_str("ORDER_CREATED"),
            NotificationKind::OrderUpdated => f.write_str("ORDER_UPDATED"),
            NotificationKind::StatusChanged(status) => write!(f, "ORDER_{}", status),
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.to_string()
    }
}

impl TryFrom<String> for NotificationKind {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "ORDER_CREATED" => Ok(NotificationKind::OrderCreated),
            "ORDER_UPDATED" => Ok(NotificationKind::OrderUpdated),
            other => other
                .strip_prefix("ORDER_")
                .ok_or_else(|| UnknownStatus(value.clone()))?
                .parse()
                .map(NotificationKind::StatusChanged),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_code: String,
    /// `None` for generic notifications with no addressee
    pub recipient: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl Notification {
    pub fn new(
        order_id: Uuid,
        order_code: impl Into<String>,
        kind: NotificationKind,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            order_code: order_code.into(),
            recipient: None,
            kind,
            message: message.into(),
            timestamp,
            is_read: false,
        }
    }

    pub fn addressed_to(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(NotificationKind::OrderCreated.to_string(), "ORDER_CREATED");
        assert_eq!(
            NotificationKind::StatusChanged(OrderStatus::InTransit).to_string(),
            "ORDER_IN_TRANSIT"
        );
    }

    #[test]
    fn test_kind_parses_back() {
        for kind in [
            NotificationKind::OrderCreated,
            NotificationKind::OrderUpdated,
            NotificationKind::StatusChanged(OrderStatus::PickedUp),
        ] {
            assert_eq!(NotificationKind::try_from(kind.to_string()), Ok(kind));
        }
        assert!(NotificationKind::try_from("STATUS_UPDATED".to_string()).is_err());
    }

    #[test]
    fn test_notification_serializes_type_field() {
        let notification = Notification::new(
            Uuid::new_v4(),
            "VT202501150001",
            NotificationKind::StatusChanged(OrderStatus::PickedUp),
            "Parcel picked up by shipper",
            Utc::now(),
        )
        .addressed_to("SHP1004");

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "ORDER_PICKED_UP");
        assert_eq!(json["recipient"], "SHP1004");
        assert_eq!(json["is_read"], false);
    }
}
