#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! PlexMCP Plan Catalog
//!
//! Normalizes the Stripe plan catalog into the product plans shown to API clients.
//!
//! ## Features
//!
//! - **Plan Validation**: Reject plans that are not yearly, single-interval USD plans
//! - **Plan Mapping**: Stable product plan shape with tiers and minimum seat counts
//! - **Catalog Listing**: All active plans, cheapest first, all-or-nothing
//! - **Cancellation**: Caller-supplied cancel signal and deadline on every listing
//! - **Pluggable Source**: Live Stripe source, in-memory source for tests

pub mod catalog;
pub mod client;
pub mod context;
pub mod error;
pub mod plans;
pub mod source;
pub mod stripe_source;


// Catalog
pub use catalog::{CatalogConfig, PlanCatalog, DEFAULT_BRAND};

// Client
pub use client::{StripeClient, StripeConfig};

// Context
pub use context::{CancelHandle, RequestContext};

// Error
pub use error::{BillingError, BillingResult, PlanViolation};

// Plans
pub use plans::{
    map_plan, product_plan_min_quantity, PlanTierFields, PriceTier, ProductPlan,
    ProductPlanFields, MIN_QUANTITY_METADATA_KEY,
};

// Source
pub use source::{ListPlansParams, PlanCursor, PlanSource, RawPlan, RawPlanTier, RawProduct};

// Stripe Source
pub use stripe_source::{raw_plan_from_stripe, StripePlanCursor};

/// Plan catalog backed by the live Stripe API
pub type StripePlanCatalog = PlanCatalog<StripeClient>;

impl StripePlanCatalog {
    /// Create a catalog from environment variables
    pub fn from_env() -> BillingResult<Self> {
        let stripe = StripeClient::from_env()?;
        Ok(PlanCatalog::new(stripe, CatalogConfig::from_env()))
    }
}
