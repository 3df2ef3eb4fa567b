//! Subscription billing collaborator.
//!
//! Billing runs in hosted functions next to the persistence backend. This
//! module holds the plan catalogue, the [`BillingClient`] seam, and an HTTP
//! adapter that invokes the functions on behalf of the signed-in user.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::auth::Session;
use crate::error::{BillingError, Error, Result};

/// Days a subscription is paused for when the caller does not say.
pub const DEFAULT_PAUSE_DAYS: u32 = 30;

const CHECK_SUBSCRIPTION: &str = "check-subscription";
const CREATE_CHECKOUT: &str = "create-checkout";
const CUSTOMER_PORTAL: &str = "customer-portal";
const PAUSE_SUBSCRIPTION: &str = "pause-subscription";

/// How a plan is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    /// Recurring monthly charge.
    Subscription,
    /// One-off payment.
    Payment,
}

/// A purchasable plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Personal use.
    Individual,
    /// Small teams.
    Business,
    /// Large organizations.
    Enterprise,
    /// Single payment, no renewal.
    Lifetime,
}

impl Plan {
    /// Every plan, in listing order.
    pub const ALL: [Self; 4] = [
        Self::Individual,
        Self::Business,
        Self::Enterprise,
        Self::Lifetime,
    ];

    /// Price identifier understood by the checkout function.
    #[must_use]
    pub const fn price_id(self) -> &'static str {
        match self {
            Self::Individual => "price_individual",
            Self::Business => "price_business",
            Self::Enterprise => "price_enterprise",
            Self::Lifetime => "price_lifetime",
        }
    }

    /// Tier name reported back by the subscription check.
    #[must_use]
    pub const fn tier_name(self) -> &'static str {
        match self {
            Self::Individual => "Individual",
            Self::Business => "Business",
            Self::Enterprise => "Enterprise",
            Self::Lifetime => "Lifetime",
        }
    }

    /// Monthly price as listed, if the plan is listed with one.
    #[must_use]
    pub const fn monthly_price(self) -> Option<&'static str> {
        match self {
            Self::Individual => Some("$12"),
            Self::Business => Some("$20"),
            Self::Enterprise => Some("$40"),
            Self::Lifetime => None,
        }
    }

    /// Short pitch.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Individual => "Perfect for personal use",
            Self::Business => "Ideal for small teams",
            Self::Enterprise => "For large organizations",
            Self::Lifetime => "Pay once, keep it forever",
        }
    }

    /// Feature bullet points.
    #[must_use]
    pub const fn features(self) -> &'static [&'static str] {
        match self {
            Self::Individual => &[
                "Up to 10 playlists",
                "Basic customization",
                "Standard support",
                "Access to public playlists",
            ],
            Self::Business => &[
                "Unlimited playlists",
                "Advanced customization",
                "Priority support",
                "Analytics dashboard",
                "Team collaboration",
            ],
            Self::Enterprise => &[
                "Everything in Business",
                "Custom branding",
                "API access",
                "24/7 phone support",
                "SLA guarantee",
            ],
            Self::Lifetime => &["Everything in Business", "No recurring charges"],
        }
    }

    /// How checkout charges this plan.
    #[must_use]
    pub const fn checkout_mode(self) -> CheckoutMode {
        match self {
            Self::Lifetime => CheckoutMode::Payment,
            _ => CheckoutMode::Subscription,
        }
    }

    /// Plan for a price identifier.
    #[must_use]
    pub fn from_price_id(price_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.price_id() == price_id)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tier_name())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.tier_name().eq_ignore_ascii_case(s) || p.price_id() == s)
            .ok_or_else(|| {
                format!("unknown plan '{s}' (expected individual, business, enterprise or lifetime)")
            })
    }
}

/// What the customer portal should open on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortalAction {
    /// General subscription management.
    #[default]
    Manage,
    /// Plan change page.
    Downgrade,
}

/// Subscription state of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    /// Whether an active subscription exists.
    pub subscribed: bool,
    /// Tier name, when subscribed.
    #[serde(default)]
    pub subscription_tier: Option<String>,
    /// End of the current billing period.
    #[serde(default)]
    pub subscription_end: Option<DateTime<Utc>>,
    /// Start of the current billing period.
    #[serde(default)]
    pub current_period_start: Option<DateTime<Utc>>,
    /// Collection resumes at this time while paused.
    #[serde(default)]
    pub pause_until: Option<DateTime<Utc>>,
}

impl SubscriptionInfo {
    /// Tier label to display; unnamed active subscriptions show as "Premium".
    #[must_use]
    pub fn tier_label(&self) -> &str {
        self.subscription_tier.as_deref().unwrap_or("Premium")
    }

    /// Whether billing is currently paused.
    #[must_use]
    pub fn is_paused(&self, now: DateTime<Utc>) -> bool {
        self.pause_until.is_some_and(|until| until > now)
    }
}

/// Hosted checkout page to send the user to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Checkout URL.
    pub url: String,
}

/// Hosted customer portal page to send the user to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalSession {
    /// Portal URL.
    pub url: String,
}

/// Result of pausing a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseConfirmation {
    /// Whether the pause was applied.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// When billing resumes.
    #[serde(rename = "resumeDate")]
    pub resume_date: DateTime<Utc>,
}

/// Billing operations for the signed-in user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BillingClient: Send + Sync {
    /// Current subscription state.
    async fn check_subscription(&self) -> Result<SubscriptionInfo>;

    /// Start a hosted checkout for `plan`.
    async fn create_checkout(&self, plan: Plan) -> Result<CheckoutSession>;

    /// Open the hosted customer portal.
    async fn open_customer_portal(&self, action: PortalAction) -> Result<PortalSession>;

    /// Pause billing for `days` days.
    async fn pause_subscription(&self, days: u32) -> Result<PauseConfirmation>;
}

/// [`BillingClient`] invoking hosted functions over HTTP.
pub struct HttpBillingClient {
    client: Client,
    functions_url: String,
    anon_key: String,
    session: Arc<dyn Session>,
}

impl fmt::Debug for HttpBillingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBillingClient")
            .field("functions_url", &self.functions_url)
            .finish_non_exhaustive()
    }
}

impl HttpBillingClient {
    /// Create a client for the functions under `functions_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        functions_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout: Duration,
        session: Arc<dyn Session>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            functions_url: functions_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session,
        })
    }

    async fn invoke<T: DeserializeOwned>(&self, function: &str, body: Value) -> Result<T> {
        let token = self
            .session
            .access_token()
            .ok_or(BillingError::NotAuthenticated)?;
        let url = format!("{}/{function}", self.functions_url);
        debug!("Invoking billing function {}", function);

        let request_error = |e: reqwest::Error| BillingError::Request {
            function: function.to_string(),
            reason: e.to_string(),
        };
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status();
        let payload: Value = response.json().await.map_err(request_error)?;

        // Functions report failures as `{"error": "..."}`, usually with a 500.
        if let Some(message) = payload.get("error").and_then(Value::as_str) {
            warn!("Billing function {} reported: {}", function, message);
            return Err(BillingError::Remote {
                function: function.to_string(),
                message: message.to_string(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(BillingError::Remote {
                function: function.to_string(),
                message: format!("status {status}"),
            }
            .into());
        }

        serde_json::from_value(payload)
            .map_err(|e| BillingError::Decode(format!("{function}: {e}")).into())
    }
}

#[async_trait]
impl BillingClient for HttpBillingClient {
    async fn check_subscription(&self) -> Result<SubscriptionInfo> {
        self.invoke(CHECK_SUBSCRIPTION, json!({})).await
    }

    async fn create_checkout(&self, plan: Plan) -> Result<CheckoutSession> {
        let session: CheckoutSession = self
            .invoke(CREATE_CHECKOUT, json!({ "priceId": plan.price_id() }))
            .await?;
        info!("Checkout for {} plan created", plan);
        Ok(session)
    }

    async fn open_customer_portal(&self, action: PortalAction) -> Result<PortalSession> {
        let body = match action {
            PortalAction::Manage => json!({}),
            PortalAction::Downgrade => json!({ "action": "downgrade" }),
        };
        self.invoke(CUSTOMER_PORTAL, body).await
    }

    async fn pause_subscription(&self, days: u32) -> Result<PauseConfirmation> {
        let confirmation: PauseConfirmation = self
            .invoke(PAUSE_SUBSCRIPTION, json!({ "pauseDuration": days }))
            .await?;
        info!("Subscription paused until {}", confirmation.resume_date);
        Ok(confirmation)
    }
}
