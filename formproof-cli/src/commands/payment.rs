//! Verify-payment command - check a transaction without issuing credits

use anyhow::Result;
use colored::Colorize;
use formproof_lib::payment::{EsploraLedger, PaymentVerifier};
use formproof_lib::NotaryError;
use std::sync::Arc;

use super::{explain, Context};
use crate::ui;

pub async fn verify(ctx: &Context, tx_id: &str) -> Result<()> {
    let address = ctx.config.require_receiving_address()?.to_string();
    let ledger = Arc::new(EsploraLedger::new(ctx.config.esplora.clone())?);
    let verifier = PaymentVerifier::new(
        ledger,
        ctx.config.payment.clone(),
        ctx.config.credits.minimum_payment,
        ctx.config.timeouts.ledger(),
    );

    let spinner = ui::spinner(&format!("Looking up {} ...", tx_id));
    let result = verifier.verify(tx_id).await;
    spinner.finish_and_clear();

    let payment = result.map_err(|e| explain(NotaryError::from(e)))?;

    ui::header("Payment");
    ui::key_value("Transaction", &payment.tx_id);
    ui::key_value("Paid to", &address);
    ui::key_value("Amount", &payment.paid_amount.to_string());
    ui::key_value(
        "Confirmations",
        &match payment.confirmations {
            Some(0) => "pending".yellow().to_string(),
            Some(n) => n.to_string(),
            None => "unknown".dimmed().to_string(),
        },
    );
    ui::key_value(
        "Credits",
        &ctx.config.credits.credits_for(&payment.paid_amount).to_string(),
    );
    ui::success("Payment accepted");

    Ok(())
}
