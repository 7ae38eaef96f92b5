//! Account operations shared by several profiles: register, login and the
//! payment card / address resources.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ActionContext;
use crate::client::HttpRequest;
use crate::errors::ActionError;
use crate::fake_data::{PaymentCard, PostalAddress};
use crate::session::SessionState;

pub const LOGIN_COOKIE: &str = "logged_in";

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// `{"id": ...}` as returned by the create endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct Created {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CustomerList {
    #[serde(rename = "_embedded", default)]
    embedded: EmbeddedCustomers,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddedCustomers {
    #[serde(default)]
    customer: Vec<CustomerSummary>,
}

#[derive(Debug, Deserialize)]
struct CustomerSummary {
    #[serde(default)]
    username: String,
}

/// `Authorization` header value for HTTP basic auth.
pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{}:{}", username, password)))
}

/// Register the session's profile and record the returned customer id.
pub async fn register(ctx: &mut ActionContext<'_>) -> Result<String, ActionError> {
    let request = {
        let (profile, password) = ctx.session.credentials()?;
        HttpRequest::post("/register").with_json(&RegisterRequest {
            username: &profile.username,
            first_name: &profile.first_name,
            last_name: &profile.last_name,
            email: &profile.email,
            password,
        })
    };

    let response = ctx.http.send(request).await?.require_success()?;
    let created: Created = response.json()?;
    let customer_id = created.id.ok_or_else(|| ActionError::MissingField {
        endpoint: response.endpoint.clone(),
        field: "id",
    })?;

    ctx.session.mark_registered(customer_id.clone())?;
    debug!(
        user_id = ctx.session.user_id(),
        customer_id = %customer_id,
        "Registered customer"
    );
    Ok(customer_id)
}

/// Log in, registering the profile first if the server does not know it.
pub async fn login(ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
    let username = ctx.session.credentials()?.0.username.clone();

    let response = ctx
        .http
        .send(HttpRequest::get("/customers"))
        .await?
        .require_success()?;
    let customers: CustomerList = response.json()?;
    let known = customers
        .embedded
        .customer
        .iter()
        .any(|c| c.username == username);

    if !known {
        register(ctx).await?;
    }

    let authorization = {
        let (profile, password) = ctx.session.credentials()?;
        basic_auth(&profile.username, password)
    };
    let response = ctx
        .http
        .send(HttpRequest::get("/login").with_header("Authorization", authorization))
        .await?
        .require_success()?;

    let cookie = response.cookie(LOGIN_COOKIE).map(str::to_string);
    ctx.session.mark_authenticated(cookie)?;
    debug!(
        user_id = ctx.session.user_id(),
        username = %username,
        registered_first = !known,
        "Logged in"
    );
    Ok(())
}

/// Run [`login`] unless the session is already authenticated.
pub async fn ensure_logged_in(ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
    if ctx.session.state() == SessionState::Authenticated {
        return Ok(());
    }
    login(ctx).await
}

/// `POST /cards` with a generated card. Returns the new card id if the server sent one.
pub async fn create_card(ctx: &mut ActionContext<'_>) -> Result<Option<String>, ActionError> {
    let card = PaymentCard::generate(&mut *ctx.rng);
    let response = ctx
        .http
        .send(HttpRequest::post("/cards").with_json(&card))
        .await?
        .require_success()?;

    let id = created_id(&response.body);
    if let Some(ref id) = id {
        ctx.session.set_card_id(id.clone());
    }
    Ok(id)
}

/// `POST /addresses` with a generated address. Returns the new address id if the server sent one.
pub async fn create_address(ctx: &mut ActionContext<'_>) -> Result<Option<String>, ActionError> {
    let address = PostalAddress::generate(&mut *ctx.rng);
    let response = ctx
        .http
        .send(HttpRequest::post("/addresses").with_json(&address))
        .await?
        .require_success()?;

    let id = created_id(&response.body);
    if let Some(ref id) = id {
        ctx.session.set_address_id(id.clone());
    }
    Ok(id)
}

// Card and address creation only need a 2xx; the body is optional.
fn created_id(body: &str) -> Option<String> {
    serde_json::from_str::<Created>(body).ok().and_then(|c| c.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(basic_auth("alice", "pw"), "Basic YWxpY2U6cHc=");
        assert_eq!(
            basic_auth("wrong_user", "no_pass"),
            "Basic d3JvbmdfdXNlcjpub19wYXNz"
        );
    }

    #[test]
    fn test_customer_list_parsing() {
        let body = r#"{"_embedded": {"customer": [{"username": "alice"}, {"id": "2"}]}}"#;
        let list: CustomerList = serde_json::from_str(body).unwrap();
        assert_eq!(list.embedded.customer.len(), 2);
        assert_eq!(list.embedded.customer[0].username, "alice");
        assert_eq!(list.embedded.customer[1].username, "");

        let empty: CustomerList = serde_json::from_str("{}").unwrap();
        assert!(empty.embedded.customer.is_empty());
    }

    #[test]
    fn test_created_id() {
        assert_eq!(created_id(r#"{"id": "57a98d98"}"#), Some("57a98d98".to_string()));
        assert_eq!(created_id("{}"), None);
        assert_eq!(created_id(""), None);
    }
}
