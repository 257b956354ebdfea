//! Cart and checkout commands

use super::shop::Shop;
use crate::cart::{render_line, render_total, CartController};
use crate::cli::args::{CartAction, CartArgs, CheckoutArgs, OutputFormat};
use crate::config::Config;
use crate::db::{CartItem, FormData};
use crate::error::{ShopError, ShopResult};
use crate::ui::{self, UiContext};
use serde::Serialize;

/// Execute the cart command
pub async fn execute(args: CartArgs, config: &Config) -> ShopResult<()> {
    let ctx = UiContext::detect();
    let shop = Shop::open(config).await?;
    let cart = CartController::new(shop.records(), &config.sync.checkout_tag);

    match args.action {
        Some(CartAction::Add { name, price }) => {
            let item = cart.add_to_cart(&name, price).await?;
            ui::step_ok_detail(&ctx, &format!("Added {}", item.name), &render_line(&item));
            Ok(())
        }
        Some(CartAction::Remove { name }) => {
            cart.remove_item(&name).await?;
            ui::step_ok(&ctx, &format!("Removed {}", name));
            Ok(())
        }
        Some(CartAction::Show { format }) => show_cart(&cart, format).await,
        None => show_cart(&cart, OutputFormat::Table).await,
    }
}

async fn show_cart(cart: &CartController, format: OutputFormat) -> ShopResult<()> {
    let items = cart.items().await?;

    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("Cart is empty.");
                return Ok(());
            }
            for line in cart.render().await? {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            #[serde(rename_all = "camelCase")]
            struct CartJson<'a> {
                cart_items: &'a [CartItem],
                total_price: f64,
            }

            let json = CartJson {
                cart_items: &items,
                total_price: cart.total().await?,
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Plain => {
            for item in &items {
                println!("{}", item.name);
            }
        }
    }

    Ok(())
}

/// Execute the checkout command
pub async fn checkout(args: CheckoutArgs, config: &Config) -> ShopResult<()> {
    let ctx = UiContext::detect();
    let shop = Shop::open(config).await?;
    let cart = CartController::new(shop.records(), &config.sync.checkout_tag);

    if cart.items().await?.is_empty() {
        return Err(ShopError::EmptyCart);
    }

    ui::intro(&ctx, "Checkout");
    let form = FormData {
        name: field(&ctx, "Name", args.name, "--name").await?,
        email: field(&ctx, "Email", args.email, "--email").await?,
        address: field(&ctx, "Address", args.address, "--address").await?,
        phone_number: field(&ctx, "Phone number", args.phone, "--phone").await?,
    };

    let (id, submission) = cart.submit_order(form).await?;
    ui::step_ok_detail(
        &ctx,
        &format!("Order {} submitted", id),
        &submission.reference.to_string(),
    );
    ui::key_value(&ctx, "Items", &submission.cart_items.len().to_string());
    ui::key_value(&ctx, "Total", &render_total(submission.total_price));
    ui::outro_success(
        &ctx,
        &format!("Background sync '{}' registered", config.sync.checkout_tag),
    );

    Ok(())
}

/// A flag value, or a prompt when the flag was not given
async fn field(ctx: &UiContext, label: &str, value: Option<String>, flag: &str) -> ShopResult<String> {
    match value {
        Some(value) => Ok(value),
        None => ui::input(ctx, label, None, flag).await,
    }
}
