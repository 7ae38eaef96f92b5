//! Storefront browsing actions.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::{account, shop, ActionContext};
use crate::client::HttpRequest;
use crate::errors::ActionError;
use crate::outcome::{classify, ActionOutcome};

/// Browse the category page filtered by a random subset of the known tags.
pub async fn filter_by_tags(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let tags = shop::fetch_tags(ctx).await?;
    if tags.is_empty() {
        return Err(ActionError::EmptyCollection {
            endpoint: "/tags".to_string(),
            what: "tags",
        });
    }

    let count = ctx.rng.gen_range(1..=tags.len());
    let chosen: Vec<&str> = tags
        .choose_multiple(&mut *ctx.rng, count)
        .map(String::as_str)
        .collect();

    let path = format!("/category.html?tags={}", chosen.join("&"));
    let response = ctx.http.send(HttpRequest::get(path)).await?;
    classify(&response.endpoint, response.status, &[], None)
}

/// Open the detail page of a random catalogue item.
pub async fn view_item(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let item = shop::random_item(ctx).await?;
    let response = ctx
        .http
        .send(HttpRequest::get(format!("/detail.html?id={}", item.id)))
        .await?;
    classify(&response.endpoint, response.status, &[], None)
}

/// Add a random item with a random quantity to the cart.
pub async fn add_to_cart(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    shop::add_random_item(ctx, None).await?;
    Ok(ActionOutcome::Success)
}

/// Remove one random item from the cart. An empty cart is a no-op.
pub async fn remove_cart_item(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let items = shop::fetch_cart(ctx).await?;
    let Some(item) = items.choose(&mut *ctx.rng) else {
        debug!(user_id = ctx.session.user_id(), "Cart is empty, nothing to remove");
        return Ok(ActionOutcome::Success);
    };

    let response = ctx
        .http
        .send(HttpRequest::delete(format!("/cart/{}", item.item_id)).named("/cart/[id]"))
        .await?;
    if response.is_success() && ctx.session.cart_item_id() == Some(item.item_id.as_str()) {
        ctx.session.take_cart_item_id();
    }
    classify(&response.endpoint, response.status, &[], None)
}

/// Place an order for whatever is in the cart.
///
/// Logs in first when needed. A 406 is accepted only when the cart total is
/// above the configured threshold.
pub async fn checkout(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    account::ensure_logged_in(ctx).await?;
    account::create_card(ctx).await?;
    account::create_address(ctx).await?;

    let response = ctx.http.send(HttpRequest::post("/orders")).await?;
    let rules = ctx.policy.checkout();

    let basket_total = if rules.iter().any(|r| r.status() == response.status) {
        match shop::fetch_cart(ctx).await {
            Ok(items) => Some(shop::basket_total(&items)),
            Err(e) => {
                debug!(
                    user_id = ctx.session.user_id(),
                    error = %e,
                    "Could not read cart total after refused order"
                );
                None
            }
        }
    } else {
        None
    };

    classify(&response.endpoint, response.status, &rules, basket_total)
}
