use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::notification::Notification;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::shipment::Shipment;
use crate::lifecycle::LifecycleError;
use crate::store::{
    bounded, NotificationStore, OrderFilter, OrderStore, PageRequest, ShipmentStore, StatusCount, TrackingStore,
    TransactionStore,
};

// ============================================================================
// Tracking Views - Read side
// ============================================================================

pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const MAX_PAGE_SIZE: u64 = 500;
pub const DASHBOARD_RECENT_ORDERS: u64 = 10;

/// Listing parameters as submitted; normalized before use
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    /// Page is at least 1; limit is clamped to `1..=MAX_PAGE_SIZE`
    pub fn page_and_limit(&self) -> (u64, u64) {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(1) as u64;
        let limit = self
            .limit
            .map(|l| l.clamp(1, MAX_PAGE_SIZE as i64) as u64)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        (page, limit)
    }

    pub fn filter(&self) -> Result<OrderFilter, LifecycleError> {
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => Some(
                name.parse::<OrderStatus>()
                    .map_err(|e| LifecycleError::Validation(e.to_string()))?,
            ),
            None => None,
        };

        Ok(OrderFilter {
            query: self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()).map(str::to_string),
            status,
            include_deleted: false,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
    pub data: Vec<Order>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingView {
    pub order: Order,
    pub shipment: Option<Shipment>,
}

/// Operator overview: live order counts, collected COD and the newest orders
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_orders: u64,
    pub orders_by_status: Vec<StatusCount>,
    pub cod_total: f64,
    pub recent_orders: Vec<Order>,
}

pub struct TrackingViews {
    orders: Arc<dyn OrderStore>,
    shipments: Arc<dyn ShipmentStore>,
    notifications: Arc<dyn NotificationStore>,
    transactions: Arc<dyn TransactionStore>,
    timeout: Duration,
}

impl TrackingViews {
    pub fn new<S>(store: Arc<S>, timeout: Duration) -> Self
    where
        S: TrackingStore + 'static,
    {
        Self {
            orders: store.clone(),
            shipments: store.clone(),
            notifications: store.clone(),
            transactions: store,
            timeout,
        }
    }

    /// Newest-first page of live orders
    pub async fn list(&self, query: &ListQuery) -> Result<OrderPage, LifecycleError> {
        let filter = query.filter()?;
        let (page, limit) = query.page_and_limit();

        let total = bounded(self.timeout, self.orders.count_orders(&filter)).await?;
        let request = PageRequest {
            skip: (page - 1).saturating_mul(limit),
            limit,
        };
        let data = bounded(self.timeout, self.orders.list_orders(&filter, request)).await?;

        Ok(OrderPage {
            page,
            limit,
            total,
            pages: total.div_ceil(limit),
            data,
        })
    }

    pub async fn summary(&self) -> Result<Vec<StatusCount>, LifecycleError> {
        Ok(bounded(self.timeout, self.orders.status_summary()).await?)
    }

    /// Order by order code, with its shipment by tracking code
    pub async fn track(&self, code: &str) -> Result<TrackingView, LifecycleError> {
        let code = code.trim();
        let order = match bounded(self.timeout, self.orders.find_order_by_code(code)).await? {
            Some(order) if !order.is_deleted => order,
            _ => return Err(LifecycleError::NotFound(code.to_string())),
        };

        let shipment = match bounded(self.timeout, self.shipments.find_shipment_by_tracking_code(code)).await? {
            Some(shipment) => Some(shipment),
            None => bounded(self.timeout, self.shipments.find_shipment(order.id)).await?,
        };

        Ok(TrackingView { order, shipment })
    }

    pub async fn notifications(&self, order_code: &str) -> Result<Vec<Notification>, LifecycleError> {
        Ok(bounded(self.timeout, self.notifications.notifications_for_order(order_code.trim())).await?)
    }

    /// Sum of completed COD collections
    pub async fn cod_total(&self) -> Result<f64, LifecycleError> {
        Ok(bounded(self.timeout, self.transactions.cod_total()).await?)
    }

    pub async fn dashboard(&self) -> Result<Dashboard, LifecycleError> {
        let live = OrderFilter::default();
        let recent = PageRequest {
            skip: 0,
            limit: DASHBOARD_RECENT_ORDERS,
        };

        let (total_orders, orders_by_status, cod_total, recent_orders) = tokio::try_join!(
            bounded(self.timeout, self.orders.count_orders(&live)),
            bounded(self.timeout, self.orders.status_summary()),
            bounded(self.timeout, self.transactions.cod_total()),
            bounded(self.timeout, self.orders.list_orders(&live, recent)),
        )?;

        Ok(Dashboard {
            total_orders,
            orders_by_status,
            cod_total,
            recent_orders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_and_limit_normalization() {
        let query = ListQuery::default();
        assert_eq!(query.page_and_limit(), (1, DEFAULT_PAGE_SIZE));

        let query = ListQuery {
            page: Some(0),
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(query.page_and_limit(), (1, MAX_PAGE_SIZE));

        let query = ListQuery {
            page: Some(3),
            limit: Some(-5),
            ..Default::default()
        };
        assert_eq!(query.page_and_limit(), (3, 1));
    }

    #[test]
    fn test_filter_rejects_unknown_status() {
        let query = ListQuery {
            status: Some("WAREHOUSE_IN".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.filter(), Err(LifecycleError::Validation(_))));
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let query = ListQuery {
            q: Some("   ".to_string()),
            status: Some("".to_string()),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert!(filter.query.is_none());
        assert!(filter.status.is_none());
        assert!(!filter.include_deleted);
    }
}
