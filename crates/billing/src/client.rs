//! Stripe client configuration
//!
//! The client is built explicitly from a [`StripeConfig`] and passed to the
//! catalog; nothing reads global Stripe state.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{BillingError, BillingResult};

/// Default timeout applied to each Stripe request
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Stripe configuration
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    /// Override of the Stripe API base URL, e.g. for stripe-mock
    pub api_base: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> BillingResult<Self> {
        let secret_key = secret_key.into();
        validate_secret_key(&secret_key)?;
        Ok(Self {
            secret_key: SecretString::from(secret_key),
            api_base: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Load configuration from environment variables
    ///
    /// - `STRIPE_SECRET_KEY` (required)
    /// - `STRIPE_API_BASE` (optional)
    /// - `STRIPE_TIMEOUT_SECS` (optional, default 30)
    pub fn from_env() -> BillingResult<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| BillingError::Config("STRIPE_SECRET_KEY not set".to_string()))?;

        let mut config = Self::new(secret_key)?;
        config.api_base = std::env::var("STRIPE_API_BASE")
            .ok()
            .filter(|base| !base.is_empty());

        if let Ok(raw) = std::env::var("STRIPE_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| {
                BillingError::Config(format!("STRIPE_TIMEOUT_SECS is not a number: {}", raw))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn is_test_mode(&self) -> bool {
        let key = self.secret_key.expose_secret();
        key.starts_with("sk_test_") || key.starts_with("rk_test_")
    }
}

fn validate_secret_key(key: &str) -> BillingResult<()> {
    if key.is_empty() {
        return Err(BillingError::Config(
            "Stripe secret key cannot be empty".to_string(),
        ));
    }
    let valid_prefixes = ["sk_test_", "sk_live_", "rk_test_", "rk_live_"];
    if !valid_prefixes.iter().any(|prefix| key.starts_with(prefix)) {
        return Err(BillingError::Config(
            "Stripe secret key must start with sk_test_, sk_live_, rk_test_, or rk_live_"
                .to_string(),
        ));
    }
    Ok(())
}

/// Stripe client wrapper
#[derive(Clone)]
pub struct StripeClient {
    client: stripe::Client,
    config: StripeConfig,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        let secret = config.secret_key.expose_secret();
        let client = match &config.api_base {
            Some(base) => stripe::Client::from_url(base.as_str(), secret),
            None => stripe::Client::new(secret),
        };
        Self { client, config }
    }

    pub fn from_env() -> BillingResult<Self> {
        Ok(Self::new(StripeConfig::from_env()?))
    }

    /// Get the inner Stripe client
    pub fn inner(&self) -> &stripe::Client {
        &self.client
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }
}
