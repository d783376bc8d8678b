//! Donation command.

use anyhow::{anyhow, Context as _, Result};

use hope_commerce::donations::{self, DonationRequest, GENERIC_DONATION_FAILURE};
use hope_commerce::Money;

use super::DonateArgs;
use crate::context::Context;
use crate::output::status_badge;

/// Run the donate command.
pub async fn run(args: DonateArgs, ctx: &Context) -> Result<()> {
    let amount = Money::parse(&args.amount).context("Please enter a valid amount")?;
    let request = DonationRequest::new(amount)
        .with_type(args.donation_type)
        .with_payment_method(args.payment_method);

    request.validate()?;

    let api = ctx.api()?;
    let spinner = ctx.output.spinner("Processing donation...");
    let result = donations::submit_donation(&api, &request).await;
    spinner.finish_and_clear();

    let donation = result.map_err(|e| anyhow!(e.user_message(GENERIC_DONATION_FAILURE)))?;

    if ctx.output.is_json() {
        ctx.output.json(&donation);
        return Ok(());
    }

    ctx.output
        .success(&format!("Thank you for your donation of {}!", donation.amount));
    ctx.output.kv("Type", request.donation_type.as_str());
    ctx.output.kv("Payment", &request.payment_method);
    if let Some(status) = &donation.status {
        ctx.output.kv("Status", &status_badge(status));
    }

    Ok(())
}
