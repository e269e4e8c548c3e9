use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::value_objects::enums::call_statuses::CallStatus;

/// Error surface shared by every use case. Nothing is retried or recovered
/// internally; callers see these as-is and resubmit if they want to.
#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("usage limit exceeded for the active subscription")]
    LimitExceeded,

    #[error("invalid call status transition: {from} -> {to}")]
    InvalidStateTransition { from: CallStatus, to: CallStatus },

    #[error("not enough permissions")]
    Forbidden,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("plan is not active")]
    PlanInactive,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type UseCaseResult<T> = std::result::Result<T, UseCaseError>;

impl UseCaseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UseCaseError::Conflict(_) => StatusCode::CONFLICT,
            UseCaseError::NotFound(_) => StatusCode::NOT_FOUND,
            UseCaseError::LimitExceeded => StatusCode::PAYMENT_REQUIRED,
            UseCaseError::InvalidStateTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            UseCaseError::Forbidden => StatusCode::FORBIDDEN,
            UseCaseError::BadRequest(_) => StatusCode::BAD_REQUEST,
            UseCaseError::PlanInactive => StatusCode::BAD_REQUEST,
            UseCaseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            UseCaseError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            UseCaseError::NotFound("subscription").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            UseCaseError::LimitExceeded.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            UseCaseError::InvalidStateTransition {
                from: CallStatus::Completed,
                to: CallStatus::Connected,
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
