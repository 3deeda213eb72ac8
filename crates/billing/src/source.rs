//! Plan source abstraction
//!
//! The catalog never talks to Stripe directly. It pulls plans through a
//! [`PlanSource`], which opens a forward-only [`PlanCursor`] over the
//! provider's listing. [`StripeClient`](crate::client::StripeClient) is the
//! live implementation; the `test` module provides an in-memory one.

use std::collections::HashMap;

use crate::error::BillingResult;

/// Filters applied to a plan listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListPlansParams {
    /// Only return plans marked active in Stripe
    pub active_only: bool,
    /// Inline the associated product instead of returning just its ID
    pub expand_product: bool,
}

impl ListPlansParams {
    /// Active plans with their product expanded, which is what the catalog needs
    pub fn active_with_product() -> Self {
        Self {
            active_only: true,
            expand_product: true,
        }
    }
}

/// Product attached to a plan, as returned by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProduct {
    pub id: String,
    pub name: String,
    pub metadata: HashMap<String, String>,
}

/// One quantity band of a tiered plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPlanTier {
    /// Per-unit amount in cents
    pub unit_amount: i64,
    /// Upper quantity bound; `None` for the final, unbounded tier
    pub up_to: Option<i64>,
}

/// Unvalidated plan record as returned by the billing provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPlan {
    pub id: String,
    pub product: RawProduct,
    /// Lowercase ISO currency code, e.g. "usd"
    pub currency: String,
    /// Billing interval unit: "day", "week", "month" or "year"
    pub interval: String,
    pub interval_count: u64,
    /// Base amount in cents
    pub amount: i64,
    /// "graduated", "volume", or empty for untiered plans
    pub tiers_mode: String,
    pub tiers: Vec<RawPlanTier>,
}

/// Forward-only cursor over a plan listing.
///
/// `Ok(None)` means the listing is exhausted. An `Err` is terminal; callers
/// must not keep pulling after one.
#[allow(async_fn_in_trait)]
pub trait PlanCursor: Send {
    async fn next_plan(&mut self) -> BillingResult<Option<RawPlan>>;
}

/// Capability to list plans from a billing provider.
///
/// Every call to [`list_plans`](PlanSource::list_plans) opens a fresh cursor
/// owned by the caller; cursors are never shared or reused.
#[allow(async_fn_in_trait)]
pub trait PlanSource: Send + Sync {
    type Cursor: PlanCursor;

    async fn list_plans(&self, params: &ListPlansParams) -> BillingResult<Self::Cursor>;
}

/// In-memory plan source for testing.
#[cfg(any(test, feature = "test-billing"))]
pub mod test {
    use super::*;
    use crate::error::BillingError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Build a plan that passes every catalog check.
    pub fn valid_plan(id: &str, amount: i64) -> RawPlan {
        RawPlan {
            id: id.to_string(),
            product: RawProduct {
                id: format!("prod_{}", id),
                name: format!("Plan {}", id),
                metadata: HashMap::new(),
            },
            currency: "usd".to_string(),
            interval: "year".to_string(),
            interval_count: 1,
            amount,
            tiers_mode: String::new(),
            tiers: Vec::new(),
        }
    }

    /// How the mock should misbehave, if at all
    #[derive(Debug, Clone, Default)]
    enum Failure {
        #[default]
        None,
        /// `list_plans` itself fails
        OnList(String),
        /// The cursor fails after yielding this many plans
        AfterPlans(usize, String),
        /// `list_plans` never completes
        Stall,
    }

    /// Mock plan source that serves a fixed listing.
    #[derive(Default)]
    pub struct MockPlanSource {
        plans: Vec<RawPlan>,
        failure: Failure,
        list_calls: AtomicUsize,
        last_params: Mutex<Option<ListPlansParams>>,
    }

    impl MockPlanSource {
        #[must_use]
        pub fn new(plans: Vec<RawPlan>) -> Self {
            Self {
                plans,
                ..Self::default()
            }
        }

        /// Make `list_plans` fail with a transport error.
        #[must_use]
        pub fn failing_on_list(mut self, message: impl Into<String>) -> Self {
            self.failure = Failure::OnList(message.into());
            self
        }

        /// Make the cursor fail after `count` plans have been yielded.
        #[must_use]
        pub fn failing_after(mut self, count: usize, message: impl Into<String>) -> Self {
            self.failure = Failure::AfterPlans(count, message.into());
            self
        }

        /// Make `list_plans` hang forever, simulating a provider that never answers.
        #[must_use]
        pub fn stalled(mut self) -> Self {
            self.failure = Failure::Stall;
            self
        }

        pub fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        pub fn last_params(&self) -> Option<ListPlansParams> {
            self.last_params.lock().ok().and_then(|params| *params)
        }
    }

    /// Cursor handed out by [`MockPlanSource`].
    pub struct MockPlanCursor {
        remaining: VecDeque<RawPlan>,
        yielded: usize,
        fail_after: Option<(usize, String)>,
    }

    impl PlanCursor for MockPlanCursor {
        async fn next_plan(&mut self) -> BillingResult<Option<RawPlan>> {
            if let Some((count, message)) = &self.fail_after {
                if self.yielded == *count {
                    return Err(BillingError::Transport(message.clone()));
                }
            }
            let next = self.remaining.pop_front();
            if next.is_some() {
                self.yielded += 1;
            }
            Ok(next)
        }
    }

    impl PlanSource for MockPlanSource {
        type Cursor = MockPlanCursor;

        async fn list_plans(&self, params: &ListPlansParams) -> BillingResult<MockPlanCursor> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut last) = self.last_params.lock() {
                *last = Some(*params);
            }

            let fail_after = match &self.failure {
                Failure::None => None,
                Failure::OnList(message) => return Err(BillingError::Transport(message.clone())),
                Failure::AfterPlans(count, message) => Some((*count, message.clone())),
                Failure::Stall => std::future::pending().await,
            };

            Ok(MockPlanCursor {
                remaining: self.plans.iter().cloned().collect(),
                yielded: 0,
                fail_after,
            })
        }
    }
}
