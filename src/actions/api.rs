//! Direct REST API actions: cart, catalogue, orders and users.
//!
//! Operations on a resource by id use the id held in the session and create
//! the resource first when the session has none.

use serde::Serialize;
use tracing::debug;

use super::{account, shop, ActionContext};
use crate::client::HttpRequest;
use crate::errors::ActionError;
use crate::fake_data::{generate_password, Profile};
use crate::outcome::{classify, ActionOutcome};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewCustomer<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    username: &'a str,
    password: &'a str,
}

/// Replace the session's identity with a freshly generated one.
fn fresh_identity(ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
    let profile = Profile::generate(&mut *ctx.rng);
    let password = generate_password(&mut *ctx.rng);
    ctx.session.regenerate_identity(profile, password)?;
    Ok(())
}

async fn delete_by_id(
    ctx: &mut ActionContext<'_>,
    collection: &str,
    id: &str,
) -> Result<ActionOutcome, ActionError> {
    let request = HttpRequest::delete(format!("/{}/{}", collection, id))
        .named(format!("/{}/[id]", collection));
    let response = ctx.http.send(request).await?;
    classify(&response.endpoint, response.status, &[], None)
}

async fn get_by_id(
    ctx: &mut ActionContext<'_>,
    collection: &str,
    id: &str,
) -> Result<ActionOutcome, ActionError> {
    let request = HttpRequest::get(format!("/{}/{}", collection, id))
        .named(format!("/{}/[id]", collection));
    let response = ctx.http.send(request).await?;
    classify(&response.endpoint, response.status, &[], None)
}

fn missing_id(endpoint: &str) -> ActionError {
    ActionError::MissingField {
        endpoint: endpoint.to_string(),
        field: "id",
    }
}

// === Cart ===

pub async fn delete_cart(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let response = ctx.http.send(HttpRequest::delete("/cart")).await?;
    if response.is_success() {
        ctx.session.take_cart_item_id();
    }
    classify(&response.endpoint, response.status, &[], None)
}

pub async fn post_cart(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    shop::add_random_item(ctx, None).await?;
    Ok(ActionOutcome::Success)
}

/// Add an item, then delete exactly that item.
pub async fn delete_cart_item(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    shop::add_random_item(ctx, None).await?;
    let item_id = ctx
        .session
        .take_cart_item_id()
        .ok_or_else(|| missing_id("/cart"))?;
    delete_by_id(ctx, "cart", &item_id).await
}

// === Catalogue ===

pub async fn get_catalogue_image(
    ctx: &mut ActionContext<'_>,
) -> Result<ActionOutcome, ActionError> {
    let item = shop::random_item(ctx).await?;
    let url = shop::choose(&item.image_url, &mut *ctx.rng, "/catalogue", "image urls")?;
    let response = ctx
        .http
        .send(HttpRequest::get(url.as_str()).named("/catalogue/images"))
        .await?;
    classify(&response.endpoint, response.status, &[], None)
}

// === Orders ===

/// Log in, place an order, then list orders.
///
/// The listing is sent even when placing the order failed; the first failure wins.
pub async fn get_orders(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let placed = post_orders(ctx).await;
    if let Err(ref e) = placed {
        debug!(
            user_id = ctx.session.user_id(),
            error = %e,
            "Order placement failed, listing orders anyway"
        );
    }

    let response = ctx.http.send(HttpRequest::get("/orders")).await;
    let listed = response.and_then(|r| classify(&r.endpoint, r.status, &[], None));

    match (placed, listed) {
        (Err(e), _) => Err(e),
        (Ok(_), Err(e)) => Err(e),
        (Ok(placed), Ok(ActionOutcome::Success)) => Ok(placed),
        (Ok(_), Ok(listed)) => Ok(listed),
    }
}

/// Log in, add a card, an address and one cart item, then order. A 406 is always accepted.
pub async fn post_orders(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    account::ensure_logged_in(ctx).await?;
    account::create_card(ctx).await?;
    account::create_address(ctx).await?;
    shop::add_random_item(ctx, Some(1)).await?;

    let response = ctx.http.send(HttpRequest::post("/orders")).await?;
    classify(
        &response.endpoint,
        response.status,
        &ctx.policy.api_order(),
        None,
    )
}

// === Users ===

pub async fn get_customer(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let customer_id = match ctx.session.customer_id().map(str::to_string) {
        Some(id) => id,
        None => account::register(ctx).await?,
    };
    get_by_id(ctx, "customers", &customer_id).await
}

pub async fn get_card(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let card_id = match ctx.session.card_id().map(str::to_string) {
        Some(id) => id,
        None => account::create_card(ctx)
            .await?
            .ok_or_else(|| missing_id("/cards"))?,
    };
    get_by_id(ctx, "cards", &card_id).await
}

/// Create an unrelated customer; the session's own identity is untouched.
pub async fn post_customer(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let profile = Profile::generate(&mut *ctx.rng);
    let password = generate_password(&mut *ctx.rng);
    let request = HttpRequest::post("/customers").with_json(&NewCustomer {
        first_name: &profile.first_name,
        last_name: &profile.last_name,
        email: &profile.email,
        username: &profile.username,
        password: &password,
    });

    let response = ctx.http.send(request).await?;
    classify(&response.endpoint, response.status, &[], None)
}

pub async fn post_address(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    account::ensure_logged_in(ctx).await?;
    account::create_address(ctx).await?;
    Ok(ActionOutcome::Success)
}

pub async fn post_card(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    account::ensure_logged_in(ctx).await?;
    account::create_card(ctx).await?;
    Ok(ActionOutcome::Success)
}

/// Delete the customer this session registered, registering one first if needed.
///
/// The session state is left as it was; only the deleted id is forgotten.
pub async fn delete_customer(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let customer_id = match ctx.session.customer_id().map(str::to_string) {
        Some(id) => id,
        None => account::register(ctx).await?,
    };

    let outcome = delete_by_id(ctx, "customers", &customer_id).await?;
    if outcome.is_success() {
        ctx.session.take_customer_id();
        debug!(
            user_id = ctx.session.user_id(),
            customer_id = %customer_id,
            "Deleted customer"
        );
    }
    Ok(outcome)
}

pub async fn delete_address(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let address_id = match ctx.session.take_address_id() {
        Some(id) => id,
        None => {
            account::create_address(ctx).await?;
            ctx.session
                .take_address_id()
                .ok_or_else(|| missing_id("/addresses"))?
        }
    };
    delete_by_id(ctx, "addresses", &address_id).await
}

pub async fn delete_card(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let card_id = match ctx.session.take_card_id() {
        Some(id) => id,
        None => {
            account::create_card(ctx).await?;
            ctx.session
                .take_card_id()
                .ok_or_else(|| missing_id("/cards"))?
        }
    };
    delete_by_id(ctx, "cards", &card_id).await
}

/// Register a brand new identity.
pub async fn post_register(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    fresh_identity(ctx)?;
    account::register(ctx).await?;
    Ok(ActionOutcome::Success)
}

/// Log in as a brand new identity, which registers it on the way.
pub async fn post_login(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    fresh_identity(ctx)?;
    account::login(ctx).await?;
    Ok(ActionOutcome::Success)
}
