//! Leaf actions executed by virtual users.
//!
//! Every action issues one or more sequential HTTP calls, threading ids from
//! earlier responses into later requests through the [`SessionContext`].
//! [`execute`] is the action boundary: errors stop at it, get logged and
//! come back as [`ActionOutcome::Failed`].

pub mod account;
pub mod api;
pub mod faults;
pub mod shop;
pub mod web;

use rand::rngs::StdRng;
use std::fmt;
use tracing::{debug, warn};

use crate::client::{HttpClient, HttpRequest};
use crate::errors::{ActionError, SessionError};
use crate::outcome::{classify, ActionOutcome, TolerancePolicy};
use crate::session::SessionContext;

/// Everything an action may touch while it runs.
pub struct ActionContext<'a> {
    pub http: &'a dyn HttpClient,
    pub session: &'a mut SessionContext,
    pub policy: &'a TolerancePolicy,
    pub rng: &'a mut StdRng,
}

/// Every leaf action known to the task trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Storefront pages
    Index,
    Login,
    Catalogue,
    FilterByTags,
    ViewItem,
    AddToCart,
    ViewBasket,
    RemoveCartItem,
    CreateCard,
    CreateAddress,
    Checkout,

    // Cart API
    GetCart,
    DeleteCart,
    PostCart,
    DeleteCartItem,

    // Catalogue API
    GetCatalogue,
    GetTags,
    GetCatalogueImage,

    // Orders API
    GetOrders,
    PostOrders,

    // Users API
    GetCustomer,
    GetCard,
    GetCustomers,
    GetAddresses,
    GetCards,
    PostCustomer,
    PostAddress,
    PostCard,
    DeleteCustomer,
    DeleteAddress,
    DeleteCard,
    PostRegister,
    PostLogin,

    // Expected failures
    LoginFail,
    CheckoutFail,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Index => "index",
            Action::Login => "login",
            Action::Catalogue => "catalogue",
            Action::FilterByTags => "filter",
            Action::ViewItem => "item",
            Action::AddToCart => "order",
            Action::ViewBasket => "cart",
            Action::RemoveCartItem => "delete_item",
            Action::CreateCard => "create_card",
            Action::CreateAddress => "create_address",
            Action::Checkout => "checkout",
            Action::GetCart => "get_cart",
            Action::DeleteCart => "delete_cart",
            Action::PostCart => "post_cart",
            Action::DeleteCartItem => "delete_cart_item",
            Action::GetCatalogue => "get_catalogue",
            Action::GetTags => "get_tags",
            Action::GetCatalogueImage => "get_catalogue_images",
            Action::GetOrders => "get_orders",
            Action::PostOrders => "post_orders",
            Action::GetCustomer => "get_customer_id",
            Action::GetCard => "get_cards_id",
            Action::GetCustomers => "get_customers",
            Action::GetAddresses => "get_addresses",
            Action::GetCards => "get_cards",
            Action::PostCustomer => "post_customers",
            Action::PostAddress => "post_addresses",
            Action::PostCard => "post_cards",
            Action::DeleteCustomer => "delete_customer",
            Action::DeleteAddress => "delete_addresses",
            Action::DeleteCard => "delete_cards",
            Action::PostRegister => "post_register",
            Action::PostLogin => "post_login",
            Action::LoginFail => "login_fail",
            Action::CheckoutFail => "checkout_fail",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run one action and classify its outcome. Never returns an error.
pub async fn execute(action: Action, ctx: &mut ActionContext<'_>) -> ActionOutcome {
    if ctx.session.is_terminated() {
        return ActionOutcome::Failed(SessionError::Terminated.into());
    }

    let result = match action {
        Action::Index => get_page(ctx, "/").await,
        Action::Login => account::login(ctx).await.map(|_| ActionOutcome::Success),
        Action::Catalogue => get_page(ctx, "/category.html").await,
        Action::FilterByTags => web::filter_by_tags(ctx).await,
        Action::ViewItem => web::view_item(ctx).await,
        Action::AddToCart => web::add_to_cart(ctx).await,
        Action::ViewBasket => get_page(ctx, "/basket.html").await,
        Action::RemoveCartItem => web::remove_cart_item(ctx).await,
        Action::CreateCard => account::create_card(ctx).await.map(|_| ActionOutcome::Success),
        Action::CreateAddress => account::create_address(ctx)
            .await
            .map(|_| ActionOutcome::Success),
        Action::Checkout => web::checkout(ctx).await,

        Action::GetCart => get_page(ctx, "/cart").await,
        Action::DeleteCart => api::delete_cart(ctx).await,
        Action::PostCart => api::post_cart(ctx).await,
        Action::DeleteCartItem => api::delete_cart_item(ctx).await,

        Action::GetCatalogue => get_page(ctx, "/catalogue").await,
        Action::GetTags => get_page(ctx, "/tags").await,
        Action::GetCatalogueImage => api::get_catalogue_image(ctx).await,

        Action::GetOrders => api::get_orders(ctx).await,
        Action::PostOrders => api::post_orders(ctx).await,

        Action::GetCustomer => api::get_customer(ctx).await,
        Action::GetCard => api::get_card(ctx).await,
        Action::GetCustomers => get_page(ctx, "/customers").await,
        Action::GetAddresses => get_page(ctx, "/addresses").await,
        Action::GetCards => get_page(ctx, "/cards").await,
        Action::PostCustomer => api::post_customer(ctx).await,
        Action::PostAddress => api::post_address(ctx).await,
        Action::PostCard => api::post_card(ctx).await,
        Action::DeleteCustomer => api::delete_customer(ctx).await,
        Action::DeleteAddress => api::delete_address(ctx).await,
        Action::DeleteCard => api::delete_card(ctx).await,
        Action::PostRegister => api::post_register(ctx).await,
        Action::PostLogin => api::post_login(ctx).await,

        Action::LoginFail => faults::login_fail(ctx).await,
        Action::CheckoutFail => faults::checkout_fail(ctx).await,
    };

    let outcome = ActionOutcome::from(result);
    match &outcome {
        ActionOutcome::Failed(err) => warn!(
            user_id = ctx.session.user_id(),
            action = %action,
            error = %err,
            error_category = err.category().label(),
            "Action failed"
        ),
        ActionOutcome::Tolerated { status, reason } => debug!(
            user_id = ctx.session.user_id(),
            action = %action,
            status,
            reason,
            "Action returned a tolerated status"
        ),
        ActionOutcome::Success => debug!(
            user_id = ctx.session.user_id(),
            action = %action,
            state = %ctx.session.state(),
            "Action succeeded"
        ),
    }

    outcome
}

/// Single GET whose only success criterion is a 2xx status.
pub(crate) async fn get_page(
    ctx: &mut ActionContext<'_>,
    path: &str,
) -> Result<ActionOutcome, ActionError> {
    let response = ctx.http.send(HttpRequest::get(path)).await?;
    classify(&response.endpoint, response.status, &[], None)
}
