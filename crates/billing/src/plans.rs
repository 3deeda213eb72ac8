//! Product plans
//!
//! Validates raw Stripe plans and maps them into the [`ProductPlan`] shape
//! served to API clients. A plan that breaks any assumption below is rejected
//! outright; there is no best-effort mapping.
//!
//! ## Assumptions
//!
//! - The product has a non-empty name
//! - Prices are in US dollars
//! - Billing is yearly, exactly one year per interval
//! - The base amount fits a 32-bit per-user yearly price

use serde::Serialize;

use crate::error::{BillingError, BillingResult, PlanViolation};
use crate::source::{RawPlan, RawPlanTier};

/// The only currency plans may be priced in
pub const SUPPORTED_CURRENCY: &str = "usd";

/// The only billing interval unit plans may use
pub const SUPPORTED_INTERVAL: &str = "year";

/// Product metadata key holding the minimum seat count for a plan
pub const MIN_QUANTITY_METADATA_KEY: &str = "minQuantity";

/// Read-only view of a product plan, as consumed by the API layer
pub trait ProductPlanFields {
    fn product_plan_id(&self) -> &str;
    fn billing_plan_id(&self) -> &str;
    fn name(&self) -> &str;
    fn name_with_brand(&self) -> &str;
    fn price_per_user_per_year(&self) -> i32;
    fn min_quantity(&self) -> Option<i32>;
    fn tiers_mode(&self) -> &str;
    fn plan_tiers(&self) -> &[PriceTier];
}

/// Read-only view of one price tier
pub trait PlanTierFields {
    fn unit_amount(&self) -> i64;
    fn up_to(&self) -> Option<i64>;
}

/// One quantity band within a tiered plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTier {
    unit_amount: i64,
    up_to: Option<i64>,
}

impl From<&RawPlanTier> for PriceTier {
    fn from(tier: &RawPlanTier) -> Self {
        Self {
            unit_amount: tier.unit_amount,
            up_to: tier.up_to,
        }
    }
}

impl PlanTierFields for PriceTier {
    fn unit_amount(&self) -> i64 {
        self.unit_amount
    }

    fn up_to(&self) -> Option<i64> {
        self.up_to
    }
}

/// A validated plan, ready to present to API clients.
///
/// Built once per raw plan during catalog assembly and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPlan {
    #[serde(rename = "billingPlanID")]
    billing_plan_id: String,
    #[serde(rename = "productPlanID")]
    product_plan_id: String,
    name: String,
    name_with_brand: String,
    price_per_user_per_year: i32,
    min_quantity: Option<i32>,
    tiers_mode: String,
    plan_tiers: Vec<PriceTier>,
}

impl ProductPlanFields for ProductPlan {
    fn product_plan_id(&self) -> &str {
        &self.product_plan_id
    }

    fn billing_plan_id(&self) -> &str {
        &self.billing_plan_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn name_with_brand(&self) -> &str {
        &self.name_with_brand
    }

    fn price_per_user_per_year(&self) -> i32 {
        self.price_per_user_per_year
    }

    fn min_quantity(&self) -> Option<i32> {
        self.min_quantity
    }

    fn tiers_mode(&self) -> &str {
        &self.tiers_mode
    }

    fn plan_tiers(&self) -> &[PriceTier] {
        &self.plan_tiers
    }
}

/// Validate a raw plan and map it into a [`ProductPlan`].
///
/// Checks run in a fixed order and the first failure wins, so the same input
/// always produces the same result.
pub fn map_plan(plan: &RawPlan, brand: &str) -> BillingResult<ProductPlan> {
    if plan.product.name.is_empty() {
        return Err(BillingError::invalid_plan(
            &plan.id,
            PlanViolation::EmptyProductName,
        ));
    }
    if plan.currency != SUPPORTED_CURRENCY {
        return Err(BillingError::invalid_plan(
            &plan.id,
            PlanViolation::UnexpectedCurrency(plan.currency.clone()),
        ));
    }
    if plan.interval != SUPPORTED_INTERVAL {
        return Err(BillingError::invalid_plan(
            &plan.id,
            PlanViolation::UnexpectedInterval(plan.interval.clone()),
        ));
    }
    if plan.interval_count != 1 {
        return Err(BillingError::invalid_plan(
            &plan.id,
            PlanViolation::UnexpectedIntervalCount(plan.interval_count),
        ));
    }

    // Negative amounts are rejected too: a price is never below zero
    let price_per_user_per_year = i32::try_from(plan.amount)
        .ok()
        .filter(|amount| *amount >= 0)
        .ok_or_else(|| {
            BillingError::invalid_plan(&plan.id, PlanViolation::PriceOutOfRange(plan.amount))
        })?;

    Ok(ProductPlan {
        billing_plan_id: plan.id.clone(),
        product_plan_id: plan.product.id.clone(),
        name: plan.product.name.clone(),
        name_with_brand: brand_name(brand, &plan.product.name),
        price_per_user_per_year,
        min_quantity: product_plan_min_quantity(plan),
        tiers_mode: plan.tiers_mode.clone(),
        plan_tiers: plan.tiers.iter().map(PriceTier::from).collect(),
    })
}

/// The plan's product `minQuantity` metadata value, or `None` if it is missing
/// or not an integer.
pub fn product_plan_min_quantity(plan: &RawPlan) -> Option<i32> {
    plan.product
        .metadata
        .get(MIN_QUANTITY_METADATA_KEY)
        .and_then(|value| value.parse::<i32>().ok())
}

fn brand_name(brand: &str, name: &str) -> String {
    if brand.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", brand, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::test::valid_plan;

    fn assert_invalid(plan: &RawPlan, expected: PlanViolation) {
        let err = map_plan(plan, "Sourcegraph").unwrap_err();
        assert!(
            err.to_string().contains(&plan.id),
            "error should name the plan: {}",
            err
        );
        match err {
            BillingError::InvalidPlan { plan_id, violation } => {
                assert_eq!(plan_id, plan.id);
                assert_eq!(violation, expected);
            }
            other => panic!("expected InvalidPlan, got {:?}", other),
        }
    }

    #[test]
    fn test_maps_valid_plan() {
        let mut raw = valid_plan("plan_team", 19_900);
        raw.product.name = "Team".to_string();
        raw.product.id = "prod_team".to_string();

        let plan = map_plan(&raw, "Sourcegraph").unwrap();
        assert_eq!(plan.billing_plan_id(), "plan_team");
        assert_eq!(plan.product_plan_id(), "prod_team");
        assert_eq!(plan.name(), "Team");
        assert_eq!(plan.name_with_brand(), "Sourcegraph Team");
        assert_eq!(plan.price_per_user_per_year(), 19_900);
        assert_eq!(plan.min_quantity(), None);
        assert_eq!(plan.tiers_mode(), "");
        assert!(plan.plan_tiers().is_empty());
    }

    #[test]
    fn test_empty_brand_leaves_name_alone() {
        let plan = map_plan(&valid_plan("plan_a", 100), "").unwrap();
        assert_eq!(plan.name_with_brand(), plan.name());
    }

    #[test]
    fn test_rejects_empty_product_name() {
        let mut raw = valid_plan("plan_nameless", 100);
        raw.product.name = String::new();
        assert_invalid(&raw, PlanViolation::EmptyProductName);
    }

    #[test]
    fn test_rejects_non_usd_currency() {
        for currency in ["eur", "gbp", "USD", ""] {
            let mut raw = valid_plan("plan_fx", 100);
            raw.currency = currency.to_string();
            assert_invalid(&raw, PlanViolation::UnexpectedCurrency(currency.to_string()));
        }
    }

    #[test]
    fn test_rejects_non_yearly_interval() {
        for interval in ["month", "week", "day"] {
            let mut raw = valid_plan("plan_monthly", 100);
            raw.interval = interval.to_string();
            assert_invalid(&raw, PlanViolation::UnexpectedInterval(interval.to_string()));
        }
    }

    #[test]
    fn test_rejects_multi_year_interval() {
        for count in [0, 2, 3] {
            let mut raw = valid_plan("plan_multi_year", 100);
            raw.interval_count = count;
            assert_invalid(&raw, PlanViolation::UnexpectedIntervalCount(count));
        }
    }

    #[test]
    fn test_checks_run_in_order() {
        // Every field is wrong; the product name check comes first
        let mut raw = valid_plan("plan_broken", 100);
        raw.product.name = String::new();
        raw.currency = "eur".to_string();
        raw.interval = "month".to_string();
        raw.interval_count = 3;
        assert_invalid(&raw, PlanViolation::EmptyProductName);

        raw.product.name = "Broken".to_string();
        assert_invalid(&raw, PlanViolation::UnexpectedCurrency("eur".to_string()));

        raw.currency = "usd".to_string();
        assert_invalid(&raw, PlanViolation::UnexpectedInterval("month".to_string()));
    }

    #[test]
    fn test_rejects_price_that_overflows_i32() {
        let amount = i64::from(i32::MAX) + 1;
        assert_invalid(&valid_plan("plan_huge", amount), PlanViolation::PriceOutOfRange(amount));
    }

    #[test]
    fn test_rejects_negative_price() {
        assert_invalid(&valid_plan("plan_negative", -1), PlanViolation::PriceOutOfRange(-1));
    }

    #[test]
    fn test_accepts_price_at_i32_bounds() {
        let max = map_plan(&valid_plan("plan_max", i64::from(i32::MAX)), "").unwrap();
        assert_eq!(max.price_per_user_per_year(), i32::MAX);

        let free = map_plan(&valid_plan("plan_free", 0), "").unwrap();
        assert_eq!(free.price_per_user_per_year(), 0);
    }

    #[test]
    fn test_tiers_copied_in_order() {
        let mut raw = valid_plan("plan_tiered", 0);
        raw.tiers_mode = "graduated".to_string();
        raw.tiers = vec![
            RawPlanTier {
                unit_amount: 5_000,
                up_to: Some(10),
            },
            RawPlanTier {
                unit_amount: 4_000,
                up_to: Some(100),
            },
            RawPlanTier {
                unit_amount: 3_000,
                up_to: None,
            },
        ];

        let plan = map_plan(&raw, "").unwrap();
        assert_eq!(plan.tiers_mode(), "graduated");
        assert_eq!(plan.plan_tiers().len(), raw.tiers.len());
        for (tier, raw_tier) in plan.plan_tiers().iter().zip(&raw.tiers) {
            assert_eq!(tier.unit_amount(), raw_tier.unit_amount);
            assert_eq!(tier.up_to(), raw_tier.up_to);
        }
    }

    #[test]
    fn test_tiers_not_checked_for_consistency() {
        // Descending bounds are passed through untouched
        let mut raw = valid_plan("plan_odd_tiers", 0);
        raw.tiers_mode = "volume".to_string();
        raw.tiers = vec![
            RawPlanTier {
                unit_amount: 100,
                up_to: Some(50),
            },
            RawPlanTier {
                unit_amount: 200,
                up_to: Some(5),
            },
        ];

        let plan = map_plan(&raw, "").unwrap();
        assert_eq!(plan.plan_tiers()[1].up_to(), Some(5));
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let mut raw = valid_plan("plan_enterprise", 49_900);
        raw.product.metadata.insert("minQuantity".to_string(), "25".to_string());
        raw.tiers = vec![RawPlanTier {
            unit_amount: 49_900,
            up_to: None,
        }];

        assert_eq!(map_plan(&raw, "Sourcegraph").unwrap(), map_plan(&raw, "Sourcegraph").unwrap());
    }

    #[test]
    fn test_min_quantity_parsed_from_metadata() {
        let mut raw = valid_plan("plan_min", 100);
        raw.product.metadata.insert("minQuantity".to_string(), "5".to_string());
        assert_eq!(product_plan_min_quantity(&raw), Some(5));
        assert_eq!(map_plan(&raw, "").unwrap().min_quantity(), Some(5));
    }

    #[test]
    fn test_min_quantity_absent_when_not_integer() {
        for value in ["abc", "", "5.5", " 5", "99999999999"] {
            let mut raw = valid_plan("plan_min", 100);
            raw.product.metadata.insert("minQuantity".to_string(), value.to_string());
            assert_eq!(product_plan_min_quantity(&raw), None, "value {:?}", value);
        }
    }

    #[test]
    fn test_min_quantity_absent_without_key() {
        let mut raw = valid_plan("plan_min", 100);
        raw.product.metadata.insert("maxQuantity".to_string(), "5".to_string());
        assert_eq!(product_plan_min_quantity(&raw), None);
    }

    #[test]
    fn test_serializes_with_api_field_names() {
        let mut raw = valid_plan("plan_json", 2_900);
        raw.product.metadata.insert("minQuantity".to_string(), "3".to_string());
        raw.tiers = vec![RawPlanTier {
            unit_amount: 2_900,
            up_to: None,
        }];

        let json = serde_json::to_value(map_plan(&raw, "Sourcegraph").unwrap()).unwrap();
        assert_eq!(json["billingPlanID"], "plan_json");
        assert_eq!(json["productPlanID"], "prod_plan_json");
        assert_eq!(json["nameWithBrand"], "Sourcegraph Plan plan_json");
        assert_eq!(json["pricePerUserPerYear"], 2_900);
        assert_eq!(json["minQuantity"], 3);
        assert_eq!(json["planTiers"][0]["unitAmount"], 2_900);
        assert!(json["planTiers"][0]["upTo"].is_null());
    }
}
