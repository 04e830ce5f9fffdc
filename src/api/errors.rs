use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::lifecycle::LifecycleError;

impl ResponseError for LifecycleError {
    fn status_code(&self) -> StatusCode {
        match self {
            LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
            LifecycleError::NotFound(_) | LifecycleError::RecordNotFound { .. } => StatusCode::NOT_FOUND,
            LifecycleError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LifecycleError::Conflict { .. } => StatusCode::CONFLICT,
            LifecycleError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Responding with error");
        } else {
            tracing::debug!(error = %self, "Responding with error");
        }

        match self {
            LifecycleError::InvalidTransition { current, requested } => HttpResponse::build(status).json(json!({
                "error": self.to_string(),
                "current": current,
                "requested": requested,
            })),
            LifecycleError::Conflict { expected, actual } => HttpResponse::build(status).json(json!({
                "error": self.to_string(),
                "expected": expected,
                "actual": actual,
            })),
            _ => HttpResponse::build(status).json(json!({ "error": self.to_string() })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use crate::store::StoreError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (LifecycleError::Validation("x".into()), 400),
            (LifecycleError::NotFound("x".into()), 404),
            (LifecycleError::RecordNotFound { kind: "Shipper", id: uuid::Uuid::nil() }, 404),
            (
                LifecycleError::InvalidTransition {
                    current: OrderStatus::PendingPickup,
                    requested: OrderStatus::Delivered,
                },
                422,
            ),
            (
                LifecycleError::Conflict {
                    expected: OrderStatus::PickedUp,
                    actual: OrderStatus::Cancelled,
                },
                409,
            ),
            (LifecycleError::StoreUnavailable(StoreError::Unavailable("down".into())), 503),
        ];

        for (err, code) in cases {
            assert_eq!(err.status_code().as_u16(), code, "{}", err);
            assert_eq!(err.error_response().status().as_u16(), code);
        }
    }
}
