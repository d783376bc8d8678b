//! Cart commands.

use anyhow::{bail, Result};
use dialoguer::Confirm;
use serde::Serialize;

use hope_commerce::cart::{CartItem, CartStore};
use hope_commerce::catalog::{self, GENERIC_CATALOG_FAILURE};
use hope_commerce::{ItemId, Money};

use super::{CartArgs, CartCommand};
use crate::context::Context;
use crate::output::Table;

/// Run the cart command.
pub async fn run(args: CartArgs, ctx: &Context) -> Result<()> {
    let cache = ctx.cache()?;
    let mut cart = ctx.cart(&cache)?;

    match args.command {
        CartCommand::Show => show(&cart, ctx),
        CartCommand::Add { item, quantity } => add(&mut cart, item, quantity, ctx).await,
        CartCommand::Update { item, quantity } => {
            if cart.get(item).is_none() {
                bail!("Item {} is not in the cart", item);
            }
            cart.update_quantity(item, quantity)?;
            if quantity <= 0 {
                ctx.output.success(&format!("Removed item {}", item));
            } else {
                ctx.output
                    .success(&format!("Set item {} to quantity {}", item, quantity));
            }
            show(&cart, ctx)
        }
        CartCommand::Remove { item } => {
            if cart.get(item).is_none() {
                ctx.output.warn(&format!("Item {} is not in the cart", item));
                return Ok(());
            }
            cart.remove_item(item)?;
            ctx.output.success(&format!("Removed item {}", item));
            show(&cart, ctx)
        }
        CartCommand::Clear { yes } => clear(&mut cart, yes, ctx),
    }
}

#[derive(Serialize)]
struct CartSummary<'a> {
    items: &'a [CartItem],
    item_count: i64,
    total: Money,
}

fn show(cart: &CartStore, ctx: &Context) -> Result<()> {
    let total = cart.total()?;

    if ctx.output.is_json() {
        ctx.output.json(&CartSummary {
            items: cart.items(),
            item_count: cart.item_count(),
            total,
        });
        return Ok(());
    }

    ctx.output.header("Shopping Cart");
    if cart.is_empty() {
        ctx.output.info("Your cart is empty");
        return Ok(());
    }

    let mut table = Table::new(&["ID", "NAME", "PRICE", "QTY", "SUBTOTAL"]);
    for item in cart.items() {
        table.row(vec![
            item.id.to_string(),
            item.name.clone(),
            item.price.to_string(),
            item.quantity.to_string(),
            item.line_total()?.to_string(),
        ]);
    }
    ctx.output.table(&table);

    println!();
    ctx.output.kv("Items", &cart.item_count().to_string());
    ctx.output.kv("Total", &total.to_string());
    Ok(())
}

async fn add(cart: &mut CartStore, id: ItemId, quantity: i64, ctx: &Context) -> Result<()> {
    let api = ctx.api()?;
    let products = catalog::list_items(&api, None)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message(GENERIC_CATALOG_FAILURE)))?;

    let Some(product) = products.iter().find(|p| p.id == id) else {
        bail!("No product with id {}", id);
    };

    let item = CartItem::from_inventory(product)?;
    let name = item.name.clone();
    cart.add_item(item, quantity)?;

    ctx.output
        .success(&format!("Added {} x {} to cart", quantity, name));
    show(cart, ctx)
}

fn clear(cart: &mut CartStore, yes: bool, ctx: &Context) -> Result<()> {
    if cart.is_empty() {
        ctx.output.info("Your cart is already empty");
        return Ok(());
    }

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove all {} items from the cart?", cart.item_count()))
            .default(false)
            .interact()?;

        if !confirmed {
            ctx.output.warn("Cart left unchanged");
            return Ok(());
        }
    }

    cart.clear_cart()?;
    ctx.output.success("Cart cleared");
    Ok(())
}
