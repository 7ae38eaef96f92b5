//! Catalogue and cart helpers used by both the web and the API actions.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ActionContext;
use crate::client::HttpRequest;
use crate::errors::ActionError;

/// One entry of `GET /catalogue`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueItem {
    pub id: String,
    #[serde(default)]
    pub image_url: Vec<String>,
    #[serde(default)]
    pub price: f64,
}

/// One entry of `GET /cart`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: f64,
}

#[derive(Debug, Default, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AddToCart<'a> {
    id: &'a str,
    quantity: u32,
}

/// Sum of unit price times quantity over the cart.
pub fn basket_total(items: &[CartItem]) -> f64 {
    items.iter().map(|i| i.unit_price * i.quantity).sum()
}

/// Pick one element uniformly, failing when there is nothing to pick.
pub fn choose<'a, T, R: Rng + ?Sized>(
    items: &'a [T],
    rng: &mut R,
    endpoint: &str,
    what: &'static str,
) -> Result<&'a T, ActionError> {
    items.choose(rng).ok_or_else(|| ActionError::EmptyCollection {
        endpoint: endpoint.to_string(),
        what,
    })
}

pub async fn fetch_catalogue(ctx: &mut ActionContext<'_>) -> Result<Vec<CatalogueItem>, ActionError> {
    let response = ctx
        .http
        .send(HttpRequest::get("/catalogue"))
        .await?
        .require_success()?;
    response.json()
}

pub async fn fetch_cart(ctx: &mut ActionContext<'_>) -> Result<Vec<CartItem>, ActionError> {
    let response = ctx
        .http
        .send(HttpRequest::get("/cart"))
        .await?
        .require_success()?;
    response.json()
}

pub async fn fetch_tags(ctx: &mut ActionContext<'_>) -> Result<Vec<String>, ActionError> {
    let response = ctx
        .http
        .send(HttpRequest::get("/tags"))
        .await?
        .require_success()?;
    let list: TagList = response.json()?;
    Ok(list.tags)
}

/// Pick a random catalogue item.
pub async fn random_item(ctx: &mut ActionContext<'_>) -> Result<CatalogueItem, ActionError> {
    let catalogue = fetch_catalogue(ctx).await?;
    choose(&catalogue, &mut *ctx.rng, "/catalogue", "catalogue items").cloned()
}

/// Put a random catalogue item into the cart and remember its id.
///
/// `quantity` of `None` draws a quantity in 1..=100.
pub async fn add_random_item(
    ctx: &mut ActionContext<'_>,
    quantity: Option<u32>,
) -> Result<String, ActionError> {
    let item = random_item(ctx).await?;
    let quantity = quantity.unwrap_or_else(|| ctx.rng.gen_range(1..=100));

    ctx.http
        .send(HttpRequest::post("/cart").with_json(&AddToCart {
            id: &item.id,
            quantity,
        }))
        .await?
        .require_success()?;

    ctx.session.set_cart_item_id(item.id.clone());
    Ok(item.id)
}
