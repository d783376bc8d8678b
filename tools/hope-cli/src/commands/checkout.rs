//! Checkout command.

use anyhow::{anyhow, bail, Result};
use dialoguer::Confirm;

use hope_commerce::checkout::GENERIC_CHECKOUT_FAILURE;

use super::CheckoutArgs;
use crate::context::Context;
use crate::output::status_badge;

/// Run the checkout command.
pub async fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let cache = ctx.cache()?;
    let mut cart = ctx.cart(&cache)?;

    if cart.is_empty() {
        bail!("Your cart is empty");
    }

    let total = cart.total()?;
    ctx.output.header("Checkout");
    ctx.output.kv("Items", &cart.item_count().to_string());
    ctx.output.kv("Total", &total.to_string());
    if let Some(address) = &args.shipping_address {
        ctx.output.kv("Ship to", address);
    }

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Place order for {}?", total))
            .default(true)
            .interact()?;

        if !confirmed {
            ctx.output.warn("Checkout cancelled");
            return Ok(());
        }
    }

    let mut flow = ctx.checkout(ctx.api()?, &cache);
    let spinner = ctx.output.spinner("Placing order...");
    let result = flow.submit(&mut cart, args.shipping_address).await;
    spinner.finish_and_clear();

    let order = match result {
        Ok(order) => order,
        Err(e) => {
            tracing::debug!(error = %e, "checkout failed");
            let message = flow
                .last_error()
                .map(str::to_string)
                .unwrap_or_else(|| e.user_message(GENERIC_CHECKOUT_FAILURE));
            ctx.output
                .info("Your cart was kept. Run checkout again to retry.");
            return Err(anyhow!(message));
        }
    };

    if ctx.output.is_json() {
        ctx.output.json(&order);
        return Ok(());
    }

    ctx.output
        .success(&format!("Order #{} placed successfully", order.id));
    ctx.output.kv("Total", &order.total_amount.to_string());
    ctx.output.kv("Status", &status_badge(order.status.as_str()));
    if let Some(address) = &order.shipping_address {
        ctx.output.kv("Ship to", address);
    }
    if let Some(receipt) = order.jobs.as_ref().and_then(|j| j.receipt.as_deref()) {
        ctx.output.kv("Receipt job", receipt);
    }

    Ok(())
}
