//! Product catalog commands.

use anyhow::{Context as _, Result};

use hope_commerce::catalog::{self, NewInventoryItem, GENERIC_CATALOG_FAILURE, GENERIC_CREATE_ITEM_FAILURE};
use hope_commerce::Money;

use super::{ProductsArgs, ProductsCommand};
use crate::context::Context;
use crate::output::{stock_label, Table};

/// Run the products command.
pub async fn run(args: ProductsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ProductsCommand::List { category } => list(category.as_deref(), ctx).await,
        ProductsCommand::Create {
            name,
            price,
            quantity,
            description,
            category,
            sku,
        } => {
            let price = Money::parse(&price).context("Invalid price")?;
            let mut item = NewInventoryItem::new(name, price, quantity);
            item.description = description;
            item.category = category;
            item.sku = sku;
            create(item, ctx).await
        }
    }
}

async fn list(category: Option<&str>, ctx: &Context) -> Result<()> {
    let api = ctx.api()?;
    let items = catalog::list_items(&api, category)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message(GENERIC_CATALOG_FAILURE)))?;

    if ctx.output.is_json() {
        ctx.output.json(&items);
        return Ok(());
    }

    match category {
        Some(c) => ctx.output.header(&format!("Products in {}", c)),
        None => ctx.output.header("Products"),
    }

    if items.is_empty() {
        ctx.output.info("No products found");
        return Ok(());
    }

    let mut table = Table::new(&["ID", "NAME", "PRICE", "STOCK", "CATEGORY"]);
    for item in &items {
        table.row(vec![
            item.id.to_string(),
            item.name.clone(),
            item.price.to_string(),
            stock_label(item.quantity),
            item.category.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    ctx.output.table(&table);

    Ok(())
}

async fn create(item: NewInventoryItem, ctx: &Context) -> Result<()> {
    let api = ctx.api()?;
    let created = catalog::create_item(&api, &item)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message(GENERIC_CREATE_ITEM_FAILURE)))?;

    if ctx.output.is_json() {
        ctx.output.json(&created);
        return Ok(());
    }

    ctx.output
        .success(&format!("Created product #{}: {}", created.id, created.name));
    ctx.output.kv("Price", &created.price.to_string());
    ctx.output.kv("Stock", &created.quantity.to_string());
    Ok(())
}
