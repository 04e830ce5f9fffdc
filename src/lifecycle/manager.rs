use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::domain::order::{Order, OrderForm, OrderStatus, StatusTransitionValidator, TransitionRequest};
use crate::metrics::Metrics;
use crate::store::{bounded, ConditionalWrite, OrderStore};
use super::clock::Clock;
use super::errors::LifecycleError;
use super::hooks::{TransitionEvent, TransitionHook};
use super::sequence::{business_day, SequenceAllocator};
use super::LifecycleSettings;

// ============================================================================
// Order Lifecycle Manager
// ============================================================================
//
// Every order mutation goes through here:
//
// 1. Load the live order (soft-deleted orders count as absent)
// 2. Validate against the transition table
// 3. Conditional write keyed on the status that was validated and the
//    version that was read
// 4. Post-commit hooks (history, notifications, COD ledger), failures
//    logged only
//
// Creation allocates its code before anything is persisted, so a counter
// outage aborts the create with nothing written.
//
// ============================================================================

#[derive(Clone, Copy)]
enum HookCall<'a> {
    Created(&'a Order),
    Transitioned(&'a TransitionEvent),
    Edited(&'a TransitionEvent),
}

impl HookCall<'_> {
    fn order_id(&self) -> Uuid {
        match self {
            HookCall::Created(order) => order.id,
            HookCall::Transitioned(event) | HookCall::Edited(event) => event.order.id,
        }
    }
}

pub struct OrderLifecycleManager {
    orders: Arc<dyn OrderStore>,
    allocator: SequenceAllocator,
    hooks: Vec<Arc<dyn TransitionHook>>,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    settings: LifecycleSettings,
}

impl OrderLifecycleManager {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        allocator: SequenceAllocator,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            orders,
            allocator,
            hooks: Vec::new(),
            clock,
            metrics,
            settings,
        }
    }

    /// Register a post-commit hook; hooks run in registration order
    pub fn with_hook(mut self, hook: Arc<dyn TransitionHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    // ========================================================================
    // Operations
    // ========================================================================

    pub async fn create(&self, form: OrderForm) -> Result<Order, LifecycleError> {
        let started = Instant::now();
        let result = self.create_order(&form).await;
        self.finish("create", started, result)
    }

    pub async fn transition(&self, order_id: Uuid, status: OrderStatus) -> Result<Order, LifecycleError> {
        self.transition_with(order_id, TransitionRequest::to(status)).await
    }

    /// Status change carrying the actor, location and field time of the event
    pub async fn transition_with(&self, order_id: Uuid, request: TransitionRequest) -> Result<Order, LifecycleError> {
        let started = Instant::now();
        let result = self.transition_order(order_id, request).await;
        self.finish("transition", started, result)
    }

    pub async fn edit(&self, order_id: Uuid, form: OrderForm) -> Result<Order, LifecycleError> {
        let started = Instant::now();
        let result = self.edit_order(order_id, &form).await;
        self.finish("edit", started, result)
    }

    pub async fn soft_delete(&self, order_id: Uuid) -> Result<(), LifecycleError> {
        let started = Instant::now();
        let result = self.delete_order(order_id).await;
        self.finish("soft_delete", started, result)
    }

    /// Fetch a live order
    pub async fn get(&self, order_id: Uuid) -> Result<Order, LifecycleError> {
        self.load_live(order_id).await
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn create_order(&self, form: &OrderForm) -> Result<Order, LifecycleError> {
        let missing = form.missing_identity_fields();
        if !missing.is_empty() {
            return Err(LifecycleError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let now = self.clock.now();
        let order_code = match form.supplied_code() {
            Some(code) => code.to_string(),
            None => {
                let day = business_day(now, self.settings.business_utc_offset_hours);
                self.allocator.next_code(day).await?
            }
        };

        let order = Order::from_form(Uuid::now_v7(), order_code, form, now);
        bounded(self.settings.store_timeout, self.orders.insert_order(&order)).await?;

        self.metrics.orders_created.inc();
        tracing::info!(
            order_id = %order.id,
            order_code = %order.order_code,
            tracking_code = %order.tracking_code,
            total_amount = order.financials.total_amount(),
            "✅ Order created"
        );

        self.run_hooks(HookCall::Created(&order)).await;
        Ok(order)
    }

    async fn transition_order(&self, order_id: Uuid, request: TransitionRequest) -> Result<Order, LifecycleError> {
        let order = self.load_live(order_id).await?;
        let previous = order.current_status;
        let requested = request.status;

        if previous == requested {
            tracing::debug!(order_id = %order_id, status = %previous, "Status unchanged, nothing to do");
            return Ok(order);
        }

        if !StatusTransitionValidator::is_allowed(previous, requested) {
            return Err(LifecycleError::InvalidTransition {
                current: previous,
                requested,
            });
        }

        let now = self.clock.now();
        let write = self.orders.update_status(order_id, previous, requested, now);
        let updated = self.committed(order_id, previous, bounded(self.settings.store_timeout, write).await?)?;

        self.metrics.record_transition(previous, requested);
        tracing::info!(
            order_id = %order_id,
            order_code = %updated.order_code,
            from = %previous,
            to = %requested,
            actor = request.actor.as_deref().unwrap_or("-"),
            "✅ Order status changed"
        );

        let event = TransitionEvent {
            order: updated.clone(),
            previous,
            current: requested,
            occurred_at: request.occurred_at.unwrap_or(now),
            actor: request.actor,
            location: request.location,
            entry_id: Uuid::new_v4(),
        };
        self.run_hooks(HookCall::Transitioned(&event)).await;

        Ok(updated)
    }

    async fn edit_order(&self, order_id: Uuid, form: &OrderForm) -> Result<Order, LifecycleError> {
        let order = self.load_live(order_id).await?;
        let previous = order.current_status;

        let requested = match form.current_status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => name
                .parse::<OrderStatus>()
                .map_err(|e| LifecycleError::Validation(e.to_string()))?,
            None => previous,
        };

        if previous.is_terminal() || !StatusTransitionValidator::is_allowed(previous, requested) {
            return Err(LifecycleError::InvalidTransition {
                current: previous,
                requested,
            });
        }

        let missing = form.missing_identity_fields();
        if !missing.is_empty() {
            return Err(LifecycleError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let now = self.clock.now();
        let rebuilt = order.rebuilt_from(form, requested, now);
        let write = self.orders.replace_order(&rebuilt, previous);
        let updated = self.committed(order_id, previous, bounded(self.settings.store_timeout, write).await?)?;

        if previous != requested {
            self.metrics.record_transition(previous, requested);
        }
        tracing::info!(
            order_id = %order_id,
            order_code = %updated.order_code,
            from = %previous,
            to = %requested,
            total_amount = updated.financials.total_amount(),
            "✅ Order edited"
        );

        let event = TransitionEvent {
            order: updated.clone(),
            previous,
            current: requested,
            actor: None,
            location: None,
            occurred_at: now,
            entry_id: Uuid::new_v4(),
        };
        self.run_hooks(HookCall::Edited(&event)).await;

        Ok(updated)
    }

    async fn delete_order(&self, order_id: Uuid) -> Result<(), LifecycleError> {
        let now = self.clock.now();
        let deleted = bounded(self.settings.store_timeout, self.orders.soft_delete(order_id, now)).await?;

        if !deleted {
            return Err(LifecycleError::NotFound(order_id.to_string()));
        }

        tracing::info!(order_id = %order_id, "🗑️ Order soft-deleted");
        Ok(())
    }

    async fn load_live(&self, order_id: Uuid) -> Result<Order, LifecycleError> {
        match bounded(self.settings.store_timeout, self.orders.find_order(order_id)).await? {
            Some(order) if !order.is_deleted => Ok(order),
            _ => Err(LifecycleError::NotFound(order_id.to_string())),
        }
    }

    /// Turn a conditional write outcome into the stored order or an error
    fn committed(&self, order_id: Uuid, expected: OrderStatus, write: ConditionalWrite) -> Result<Order, LifecycleError> {
        match write {
            ConditionalWrite::Applied(order) => Ok(order),
            ConditionalWrite::Stale(actual) => Err(LifecycleError::Conflict {
                expected,
                actual: actual.current_status,
            }),
            ConditionalWrite::Missing => Err(LifecycleError::NotFound(order_id.to_string())),
        }
    }

    async fn run_hooks(&self, call: HookCall<'_>) {
        for hook in &self.hooks {
            let outcome = match call {
                HookCall::Created(order) => hook.after_create(order).await,
                HookCall::Transitioned(event) => hook.after_transition(event).await,
                HookCall::Edited(event) => hook.after_edit(event).await,
            };

            if let Err(e) = outcome {
                self.metrics.record_hook_failure(hook.name());
                tracing::warn!(
                    hook = hook.name(),
                    order_id = %call.order_id(),
                    error = %e,
                    "⚠️ Post-commit hook failed"
                );
            }
        }
    }

    fn finish<T>(&self, operation: &str, started: Instant, result: Result<T, LifecycleError>) -> Result<T, LifecycleError> {
        self.metrics.observe_duration(operation, started);

        if let Err(e) = &result {
            self.metrics.record_rejection(e.reason());
            tracing::debug!(operation = operation, error = %e, "Lifecycle operation rejected");
        }
        result
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
