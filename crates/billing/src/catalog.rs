//! Product plan catalog
//!
//! Lists every active plan from the billing provider, validates each one and
//! returns them cheapest first. The catalog is all-or-nothing: one bad plan or
//! one failed page fails the whole listing, and nothing is cached between calls.

use crate::context::RequestContext;
use crate::error::BillingResult;
use crate::plans::{map_plan, ProductPlan, ProductPlanFields};
use crate::source::{ListPlansParams, PlanCursor, PlanSource};

/// Brand prefixed to plan names when none is configured
pub const DEFAULT_BRAND: &str = "Sourcegraph";

/// Catalog presentation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Prefix for `name_with_brand`
    pub brand: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            brand: DEFAULT_BRAND.to_string(),
        }
    }
}

impl CatalogConfig {
    /// Load from `CATALOG_BRAND_NAME`, falling back to the default brand
    pub fn from_env() -> Self {
        std::env::var("CATALOG_BRAND_NAME")
            .ok()
            .filter(|brand| !brand.trim().is_empty())
            .map(|brand| Self { brand })
            .unwrap_or_default()
    }
}

/// Catalog of product plans backed by a [`PlanSource`]
pub struct PlanCatalog<S> {
    source: S,
    config: CatalogConfig,
}

impl<S: PlanSource> PlanCatalog<S> {
    pub fn new(source: S, config: CatalogConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// List all active plans, cheapest first.
    ///
    /// Fails with the first invalid plan or transport error encountered,
    /// discarding anything collected so far. Honors the context's cancel
    /// signal and deadline for the whole provider round-trip.
    pub async fn list_active_plans(
        &self,
        ctx: &RequestContext,
    ) -> BillingResult<Vec<ProductPlan>> {
        let result = ctx.run(self.collect_plans()).await;

        match &result {
            Ok(plans) => {
                tracing::info!(plan_count = plans.len(), "Listed active product plans");
            }
            Err(e) if e.is_invalid_plan() => {
                tracing::warn!(error = %e, "Rejected product plan catalog");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list product plans");
            }
        }

        result
    }

    async fn collect_plans(&self) -> BillingResult<Vec<ProductPlan>> {
        let mut cursor = self
            .source
            .list_plans(&ListPlansParams::active_with_product())
            .await?;

        let mut plans = Vec::new();
        while let Some(raw) = cursor.next_plan().await? {
            let plan = map_plan(&raw, &self.config.brand)?;
            tracing::debug!(
                plan_id = %plan.billing_plan_id(),
                price_per_user_per_year = plan.price_per_user_per_year(),
                "Mapped product plan"
            );
            plans.push(plan);
        }

        // Cheapest first; equal prices keep provider order
        plans.sort_by_key(|plan| plan.price_per_user_per_year());
        Ok(plans)
    }
}
