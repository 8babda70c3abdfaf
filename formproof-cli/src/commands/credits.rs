//! Credential commands - issue, inspect, debit and disable access tokens

use anyhow::Result;
use colored::Colorize;
use formproof_lib::service::{IssueRequest, PresentedCredential};

use super::{explain, Context};
use crate::ui;

pub async fn issue(ctx: &Context, tx_id: &str, notify: Option<String>) -> Result<()> {
    ctx.config.require_receiving_address()?;
    let service = ctx.service()?;

    let spinner = ui::spinner("Verifying payment...");
    let result = service
        .issue(&IssueRequest {
            tx_id: tx_id.to_string(),
            notify,
        })
        .await;
    spinner.finish_and_clear();
    let issued = result.map_err(explain)?;

    ui::success("Access token issued");
    ui::key_value("Token", &issued.access_token.bold().to_string());
    ui::key_value("Credits", &issued.total_credits.to_string());
    ui::key_value("Paid", &issued.paid_amount.to_string());
    if let Some(confirmations) = issued.confirmations {
        ui::key_value("Confirmations", &confirmations.to_string());
    }
    ui::warning("Keep this token secret; it is the only way to spend the credits");

    Ok(())
}

pub async fn status(ctx: &Context, token: &str) -> Result<()> {
    let service = ctx.service()?;
    let status = service
        .status(&PresentedCredential::body(token))
        .await
        .map_err(explain)?;

    ui::header("Access Token");
    ui::key_value(
        "Balance",
        &ui::balance(status.remaining_credits, status.total_credits),
    );
    ui::key_value(
        "State",
        &if status.active {
            "active".green().to_string()
        } else {
            "disabled".red().to_string()
        },
    );
    ui::key_value(
        "Created",
        &status.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    ui::key_value(
        "Last used",
        &status
            .last_used_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string()),
    );

    if ctx.verbose {
        ui::separator();
        ui::json(&serde_json::to_value(&status)?);
    }

    Ok(())
}

pub async fn consume(ctx: &Context, token: &str, credits: u64) -> Result<()> {
    let service = ctx.service()?;
    let remaining = service
        .ledger()
        .consume(token, credits)
        .await
        .map_err(explain)?;

    ui::success(&format!("Debited {} credit(s)", credits));
    ui::key_value("Remaining", &remaining.to_string());
    Ok(())
}

pub async fn disable(ctx: &Context, token: &str) -> Result<()> {
    let service = ctx.service()?;
    service.ledger().disable(token).await.map_err(explain)?;

    ui::success("Access token disabled");
    ui::info("The balance stays readable with 'formproof status'");
    Ok(())
}
