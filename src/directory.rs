use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::network::{PostOffice, PostOfficeForm, Shipper, ShipperForm};
use crate::lifecycle::{Clock, LifecycleError};
use crate::store::{bounded, DirectoryStore};

// ============================================================================
// Network Directory - Post offices and shippers
// ============================================================================
//
// Plain records with one unique code each. Office codes are upper-cased
// before the uniqueness check, so `hcm-q1` and `HCM-Q1` collide.
//
// ============================================================================

/// Shipper with the name of the office they currently work from
#[derive(Debug, Clone, Serialize)]
pub struct ShipperView {
    #[serde(flatten)]
    pub shipper: Shipper,
    pub current_post_office_name: Option<String>,
}

pub struct NetworkDirectory {
    store: Arc<dyn DirectoryStore>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

fn require(missing: Vec<&'static str>) -> Result<(), LifecycleError> {
    if missing.is_empty() {
        return Ok(());
    }
    Err(LifecycleError::Validation(format!(
        "Missing required fields: {}",
        missing.join(", ")
    )))
}

impl NetworkDirectory {
    pub fn new(store: Arc<dyn DirectoryStore>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self { store, clock, timeout }
    }

    // ========================================================================
    // Post Offices
    // ========================================================================

    pub async fn create_post_office(&self, form: PostOfficeForm) -> Result<PostOffice, LifecycleError> {
        require(form.missing_fields())?;

        let now = self.clock.now();
        let office = form.into_office(Uuid::now_v7(), now, now);
        bounded(self.timeout, self.store.insert_post_office(&office)).await?;

        tracing::info!(office_id = %office.id, office_code = %office.office_code, "🏤 Post office created");
        Ok(office)
    }

    pub async fn update_post_office(&self, id: Uuid, form: PostOfficeForm) -> Result<PostOffice, LifecycleError> {
        require(form.missing_fields())?;

        let existing = bounded(self.timeout, self.store.find_post_office(id))
            .await?
            .ok_or(LifecycleError::RecordNotFound { kind: "Post office", id })?;

        let office = form.into_office(id, existing.created_at, self.clock.now());
        if !bounded(self.timeout, self.store.update_post_office(&office)).await? {
            return Err(LifecycleError::RecordNotFound { kind: "Post office", id });
        }

        tracing::debug!(office_id = %id, office_code = %office.office_code, "Post office updated");
        Ok(office)
    }

    pub async fn delete_post_office(&self, id: Uuid) -> Result<(), LifecycleError> {
        if !bounded(self.timeout, self.store.delete_post_office(id)).await? {
            return Err(LifecycleError::RecordNotFound { kind: "Post office", id });
        }
        tracing::info!(office_id = %id, "🗑️ Post office deleted");
        Ok(())
    }

    pub async fn post_offices(&self) -> Result<Vec<PostOffice>, LifecycleError> {
        Ok(bounded(self.timeout, self.store.list_post_offices()).await?)
    }

    // ========================================================================
    // Shippers
    // ========================================================================

    pub async fn create_shipper(&self, form: ShipperForm) -> Result<Shipper, LifecycleError> {
        require(form.missing_fields())?;

        let now = self.clock.now();
        let shipper = form.into_shipper(Uuid::now_v7(), now, now);
        bounded(self.timeout, self.store.insert_shipper(&shipper)).await?;

        tracing::info!(shipper_id = %shipper.id, shipper_code = %shipper.shipper_code, "🛵 Shipper registered");
        Ok(shipper)
    }

    pub async fn update_shipper(&self, id: Uuid, form: ShipperForm) -> Result<Shipper, LifecycleError> {
        require(form.missing_fields())?;

        let existing = bounded(self.timeout, self.store.find_shipper(id))
            .await?
            .ok_or(LifecycleError::RecordNotFound { kind: "Shipper", id })?;

        // status is kept when the form leaves it out
        let form = ShipperForm {
            status: form.status.or(Some(existing.status)),
            ..form
        };
        let shipper = form.into_shipper(id, existing.created_at, self.clock.now());
        if !bounded(self.timeout, self.store.update_shipper(&shipper)).await? {
            return Err(LifecycleError::RecordNotFound { kind: "Shipper", id });
        }

        tracing::debug!(shipper_id = %id, status = ?shipper.status, "Shipper updated");
        Ok(shipper)
    }

    pub async fn delete_shipper(&self, id: Uuid) -> Result<(), LifecycleError> {
        if !bounded(self.timeout, self.store.delete_shipper(id)).await? {
            return Err(LifecycleError::RecordNotFound { kind: "Shipper", id });
        }
        tracing::info!(shipper_id = %id, "🗑️ Shipper removed");
        Ok(())
    }

    pub async fn shippers(&self) -> Result<Vec<Shipper>, LifecycleError> {
        Ok(bounded(self.timeout, self.store.list_shippers()).await?)
    }

    /// Shippers on duty, each with their current office's name
    pub async fn active_shippers(&self) -> Result<Vec<ShipperView>, LifecycleError> {
        let (shippers, offices) = tokio::try_join!(
            bounded(self.timeout, self.store.list_shippers()),
            bounded(self.timeout, self.store.list_post_offices()),
        )?;

        let names: HashMap<Uuid, String> = offices.into_iter().map(|o| (o.id, o.name)).collect();

        Ok(shippers
            .into_iter()
            .filter(|s| s.status.is_active())
            .map(|shipper| ShipperView {
                current_post_office_name: shipper
                    .current_post_office_id
                    .and_then(|id| names.get(&id).cloned()),
                shipper,
            })
            .collect())
    }
}
