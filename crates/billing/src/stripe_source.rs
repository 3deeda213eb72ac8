//! Live plan source backed by the Stripe API
//!
//! Pages through `GET /v1/plans` with the product expanded inline, converting
//! each `stripe::Plan` into a provider-neutral [`RawPlan`].

use std::collections::VecDeque;

use stripe::{Expandable, ListPlans, Plan, PlanId};

use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};
use crate::source::{ListPlansParams, PlanCursor, PlanSource, RawPlan, RawPlanTier, RawProduct};

/// Plans fetched per page; Stripe's maximum
const PAGE_SIZE: u64 = 100;

const EXPAND_PRODUCT: &[&str] = &["data.product"];

/// Cursor over Stripe's plan listing, fetching one page at a time
pub struct StripePlanCursor {
    client: StripeClient,
    params: ListPlansParams,
    buffered: VecDeque<Plan>,
    starting_after: Option<PlanId>,
    has_more: bool,
}

impl StripePlanCursor {
    fn list_request(&self) -> ListPlans<'static> {
        let mut request = ListPlans::new();
        if self.params.active_only {
            request.active = Some(true);
        }
        if self.params.expand_product {
            request.expand = EXPAND_PRODUCT;
        }
        request.limit = Some(PAGE_SIZE);
        request.starting_after = self.starting_after.clone();
        request
    }

    async fn fetch_page(&mut self) -> BillingResult<()> {
        let request = self.list_request();
        let page = tokio::time::timeout(
            self.client.timeout(),
            Plan::list(self.client.inner(), &request),
        )
        .await
        .map_err(|_| {
            BillingError::Transport(format!(
                "Stripe plan listing timed out after {:?}",
                self.client.timeout()
            ))
        })??;

        tracing::debug!(
            plans = page.data.len(),
            has_more = page.has_more,
            "Fetched Stripe plan page"
        );

        self.push_page(page.data, page.has_more);
        Ok(())
    }

    fn push_page(&mut self, plans: Vec<Plan>, has_more: bool) {
        self.has_more = has_more;
        if let Some(last) = plans.last() {
            self.starting_after = Some(last.id.clone());
        }
        self.buffered.extend(plans);
    }
}

impl PlanCursor for StripePlanCursor {
    async fn next_plan(&mut self) -> BillingResult<Option<RawPlan>> {
        if self.buffered.is_empty() && self.has_more {
            self.fetch_page().await?;
        }
        Ok(self.buffered.pop_front().map(raw_plan_from_stripe))
    }
}

impl PlanSource for StripeClient {
    type Cursor = StripePlanCursor;

    async fn list_plans(&self, params: &ListPlansParams) -> BillingResult<StripePlanCursor> {
        let mut cursor = StripePlanCursor {
            client: self.clone(),
            params: *params,
            buffered: VecDeque::new(),
            starting_after: None,
            has_more: true,
        };
        cursor.fetch_page().await?;
        Ok(cursor)
    }
}

/// Convert a Stripe plan into a [`RawPlan`].
///
/// Missing optional fields take Stripe's zero values: an absent amount (tiered
/// plans) becomes 0, and an unexpanded product has an empty name so it fails
/// validation rather than slipping through.
pub fn raw_plan_from_stripe(plan: Plan) -> RawPlan {
    let product = match plan.product {
        Some(Expandable::Object(product)) => RawProduct {
            id: product.id.to_string(),
            name: product.name.unwrap_or_default(),
            metadata: product.metadata.unwrap_or_default(),
        },
        Some(Expandable::Id(id)) => RawProduct {
            id: id.to_string(),
            ..RawProduct::default()
        },
        None => RawProduct::default(),
    };

    RawPlan {
        id: plan.id.to_string(),
        product,
        currency: plan
            .currency
            .map(|currency| currency.to_string())
            .unwrap_or_default(),
        interval: plan
            .interval
            .map(|interval| interval.as_str().to_string())
            .unwrap_or_default(),
        interval_count: plan.interval_count.unwrap_or_default(),
        amount: plan.amount.unwrap_or_default(),
        tiers_mode: plan
            .tiers_mode
            .map(|mode| mode.as_str().to_string())
            .unwrap_or_default(),
        tiers: plan
            .tiers
            .unwrap_or_default()
            .iter()
            .map(|tier| RawPlanTier {
                unit_amount: tier.unit_amount.unwrap_or_default(),
                up_to: tier.up_to,
            })
            .collect(),
    }
}
