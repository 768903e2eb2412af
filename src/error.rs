use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Courier directory was unreachable during selection; aborts the run.
    #[error("courier selection failed: {0}")]
    SelectionFailure(String),

    /// Every candidate rejected, expired, or was skipped.
    #[error("No available motoboys accepted the delivery")]
    NoCandidateAccepted,

    /// Offer notification could not be delivered; the candidate is treated
    /// as having rejected.
    #[error("offer notification failed: {0}")]
    OfferTransport(String),

    /// A pending offer already exists for this (order, courier) pair.
    #[error("duplicate pending offer for order {order_id} and courier {courier_id}")]
    DuplicateOffer { order_id: Uuid, courier_id: Uuid },

    #[error("store error: {0}")]
    Store(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// Systemic failures abort a dispatch run; anything else fails forward
    /// to the next candidate.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            DispatchError::SelectionFailure(_)
                | DispatchError::Store(_)
                | DispatchError::NotFound(_)
        )
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            DispatchError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            DispatchError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DispatchError::DuplicateOffer { .. } => (StatusCode::CONFLICT, self.to_string()),
            DispatchError::NoCandidateAccepted => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            DispatchError::SelectionFailure(_) | DispatchError::OfferTransport(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            DispatchError::Store(msg) | DispatchError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
