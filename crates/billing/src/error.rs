//! Error types for the plan catalog

use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate
pub type BillingResult<T> = Result<T, BillingError>;

/// Errors produced while listing and validating the plan catalog
#[derive(Debug, Error)]
pub enum BillingError {
    /// A plan returned by Stripe breaks an assumption the catalog relies on.
    /// Always fatal to the whole listing.
    #[error("invalid plan {plan_id:?}: {violation}")]
    InvalidPlan {
        plan_id: String,
        violation: PlanViolation,
    },

    /// The provider listing call failed (network, auth, rate limit, bad response)
    #[error("Stripe transport error: {0}")]
    Transport(String),

    #[error("plan listing canceled")]
    Canceled,

    #[error("plan listing deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BillingError {
    pub(crate) fn invalid_plan(plan_id: &str, violation: PlanViolation) -> Self {
        BillingError::InvalidPlan {
            plan_id: plan_id.to_string(),
            violation,
        }
    }

    /// Whether this error came from validating a plan rather than from the
    /// transport or the caller
    pub fn is_invalid_plan(&self) -> bool {
        matches!(self, BillingError::InvalidPlan { .. })
    }
}

impl From<stripe::StripeError> for BillingError {
    fn from(err: stripe::StripeError) -> Self {
        match err {
            stripe::StripeError::Stripe(request_error) => {
                let message = request_error
                    .message
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string());
                BillingError::Transport(format!(
                    "HTTP {}: {}",
                    request_error.http_status, message
                ))
            }
            other => BillingError::Transport(other.to_string()),
        }
    }
}

/// The specific structural assumption a plan failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanViolation {
    #[error("unexpected empty product name")]
    EmptyProductName,

    #[error("unexpected currency {0:?}")]
    UnexpectedCurrency(String),

    #[error("unexpected plan interval {0:?}")]
    UnexpectedInterval(String),

    #[error("unexpected plan interval count {0}")]
    UnexpectedIntervalCount(u64),

    /// The amount does not fit the 32-bit yearly price
    #[error("price amount {0} out of range for a yearly per-user price")]
    PriceOutOfRange(i64),
}
