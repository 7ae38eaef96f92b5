//! Requests that are meant to be rejected by the target.

use super::account::basic_auth;
use super::ActionContext;
use crate::client::HttpRequest;
use crate::errors::ActionError;
use crate::outcome::{classify, ActionOutcome};

const BAD_USERNAME: &str = "wrong_user";
const BAD_PASSWORD: &str = "no_pass";

/// Log in with credentials that do not exist. 401 is the expected answer.
pub async fn login_fail(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let request = HttpRequest::get("/login")
        .with_header("Authorization", basic_auth(BAD_USERNAME, BAD_PASSWORD));
    let response = ctx.http.send(request).await?;
    classify(
        &response.endpoint,
        response.status,
        &ctx.policy.bad_login(),
        None,
    )
}

/// Place an order with an empty body. 500 is the expected answer.
pub async fn checkout_fail(ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
    let request = HttpRequest::post("/orders").with_json(&serde_json::json!({}));
    let response = ctx.http.send(request).await?;
    classify(
        &response.endpoint,
        response.status,
        &ctx.policy.empty_checkout(),
        None,
    )
}
