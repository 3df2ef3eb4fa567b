//! Subscription and plan commands.

use std::fmt::Write as _;

use chrono::Utc;
use loopshare_core::billing::{CheckoutMode, DEFAULT_PAUSE_DAYS, Plan, PortalAction};
use tracing::info;

use super::error::{CommandResult, map_err};
use super::state::AppState;

/// Describe every plan.
pub fn plans() -> CommandResult {
    let mut out = String::new();
    for (i, plan) in Plan::ALL.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        let price = plan
            .monthly_price()
            .map_or_else(|| "one-off payment".to_string(), |p| format!("{p}/month"));
        let _ = write!(out, "{plan} ({price}): {}", plan.description());
        for feature in plan.features() {
            let _ = write!(out, "\n  - {feature}");
        }
    }
    Ok(out)
}

/// Show the signed-in user's subscription.
pub async fn status(state: &AppState) -> CommandResult {
    let info = state
        .billing()
        .map_err(map_err)?
        .check_subscription()
        .await
        .map_err(map_err)?;

    if !info.subscribed {
        return Ok("No active subscription. Run `loopshare plans` to compare plans.".to_string());
    }

    let mut out = format!("Subscribed: {} plan", info.tier_label());
    if let Some(end) = info.subscription_end {
        let _ = write!(out, "\nNext billing date: {}", end.format("%Y-%m-%d"));
    }
    if let Some(until) = info.pause_until.filter(|_| info.is_paused(Utc::now())) {
        let _ = write!(out, "\nPaused until: {}", until.format("%Y-%m-%d"));
    }
    Ok(out)
}

/// Start a checkout for `plan` and print the page to open.
pub async fn checkout(state: &AppState, plan: Plan) -> CommandResult {
    let session = state
        .billing()
        .map_err(map_err)?
        .create_checkout(plan)
        .await
        .map_err(map_err)?;
    info!("Checkout started for {} plan", plan);
    let charge = match plan.checkout_mode() {
        CheckoutMode::Subscription => "start your monthly subscription",
        CheckoutMode::Payment => "complete your one-off payment",
    };
    Ok(format!("Open this page to {charge}:\n{}", session.url))
}

/// Print the customer portal page.
pub async fn portal(state: &AppState, downgrade: bool) -> CommandResult {
    let action = if downgrade {
        PortalAction::Downgrade
    } else {
        PortalAction::Manage
    };
    let session = state
        .billing()
        .map_err(map_err)?
        .open_customer_portal(action)
        .await
        .map_err(map_err)?;
    Ok(format!("Manage your subscription here:\n{}", session.url))
}

/// Pause billing for `days` days (30 when not given).
pub async fn pause(state: &AppState, days: Option<u32>) -> CommandResult {
    let confirmation = state
        .billing()
        .map_err(map_err)?
        .pause_subscription(days.unwrap_or(DEFAULT_PAUSE_DAYS))
        .await
        .map_err(map_err)?;
    Ok(format!(
        "{}. Billing resumes on {}.",
        confirmation.message,
        confirmation.resume_date.format("%Y-%m-%d")
    ))
}
