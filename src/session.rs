//! Per-virtual-user session state.
//!
//! Each virtual user owns exactly one [`SessionContext`]. It is passed by
//! `&mut` into every action, so state written by one task is visible to later
//! tasks of the same user and never to any other user.

use std::fmt;
use std::time::{Duration, Instant};

use crate::errors::SessionError;
use crate::fake_data::Profile;

/// Lifecycle of a simulated user's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, no identity generated yet.
    Uninitialized,

    /// Profile generated, unknown to the server.
    Active,

    /// The server holds a customer record for this profile.
    Registered,

    /// Login succeeded; the cookie jar carries the session.
    Authenticated,

    /// The user stopped; nothing else is dispatched.
    Terminated,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Active => "active",
            SessionState::Registered => "registered",
            SessionState::Authenticated => "authenticated",
            SessionState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mutable state threaded through the HTTP calls of one virtual user.
#[derive(Debug, Clone)]
pub struct SessionContext {
    user_id: usize,
    state: SessionState,
    profile: Option<Profile>,
    password: Option<String>,
    auth_cookie: Option<String>,
    customer_id: Option<String>,
    card_id: Option<String>,
    address_id: Option<String>,
    cart_item_id: Option<String>,
    started_at: Option<Instant>,
}

impl SessionContext {
    /// Create an uninitialized session for the given virtual user.
    pub fn new(user_id: usize) -> Self {
        Self {
            user_id,
            state: SessionState::Uninitialized,
            profile: None,
            password: None,
            auth_cookie: None,
            customer_id: None,
            card_id: None,
            address_id: None,
            cart_item_id: None,
            started_at: None,
        }
    }

    /// Give the session its identity: UNINITIALIZED -> ACTIVE.
    pub fn start(&mut self, profile: Profile, password: String) -> Result<(), SessionError> {
        match self.state {
            SessionState::Uninitialized => {
                self.profile = Some(profile);
                self.password = Some(password);
                self.started_at = Some(Instant::now());
                self.state = SessionState::Active;
                Ok(())
            }
            SessionState::Terminated => Err(SessionError::Terminated),
            _ => Err(SessionError::AlreadyStarted),
        }
    }

    /// Swap in a brand new identity for the same virtual user.
    ///
    /// Server-side ids belong to the old identity and are dropped; the session
    /// returns to ACTIVE.
    pub fn regenerate_identity(
        &mut self,
        profile: Profile,
        password: String,
    ) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.profile = Some(profile);
        self.password = Some(password);
        self.auth_cookie = None;
        self.customer_id = None;
        self.card_id = None;
        self.address_id = None;
        self.cart_item_id = None;
        self.state = SessionState::Active;
        Ok(())
    }

    /// Record the customer id returned by `/register`.
    ///
    /// ACTIVE -> REGISTERED. A later registration replaces the id but never
    /// downgrades an authenticated session.
    pub fn mark_registered(&mut self, customer_id: String) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.customer_id = Some(customer_id);
        if self.state == SessionState::Active {
            self.state = SessionState::Registered;
        }
        Ok(())
    }

    /// Any running state -> AUTHENTICATED.
    pub fn mark_authenticated(&mut self, cookie: Option<String>) -> Result<(), SessionError> {
        self.ensure_running()?;
        if cookie.is_some() {
            self.auth_cookie = cookie;
        }
        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// End the session. Idempotent.
    pub fn terminate(&mut self) {
        self.state = SessionState::Terminated;
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Uninitialized => Err(SessionError::NotStarted),
            SessionState::Terminated => Err(SessionError::Terminated),
            _ => Ok(()),
        }
    }

    pub fn user_id(&self) -> usize {
        self.user_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Profile and password of a started session.
    pub fn credentials(&self) -> Result<(&Profile, &str), SessionError> {
        self.ensure_running()?;
        match (&self.profile, &self.password) {
            (Some(profile), Some(password)) => Ok((profile, password.as_str())),
            _ => Err(SessionError::NotStarted),
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn auth_cookie(&self) -> Option<&str> {
        self.auth_cookie.as_deref()
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    /// Forget the customer id, e.g. after the record was deleted server-side.
    pub fn take_customer_id(&mut self) -> Option<String> {
        self.customer_id.take()
    }

    pub fn card_id(&self) -> Option<&str> {
        self.card_id.as_deref()
    }

    pub fn set_card_id(&mut self, id: String) {
        self.card_id = Some(id);
    }

    pub fn take_card_id(&mut self) -> Option<String> {
        self.card_id.take()
    }

    pub fn address_id(&self) -> Option<&str> {
        self.address_id.as_deref()
    }

    pub fn set_address_id(&mut self, id: String) {
        self.address_id = Some(id);
    }

    pub fn take_address_id(&mut self) -> Option<String> {
        self.address_id.take()
    }

    pub fn cart_item_id(&self) -> Option<&str> {
        self.cart_item_id.as_deref()
    }

    pub fn set_cart_item_id(&mut self, id: String) {
        self.cart_item_id = Some(id);
    }

    pub fn take_cart_item_id(&mut self) -> Option<String> {
        self.cart_item_id.take()
    }

    /// Time since `start`, zero before the session started.
    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }
}
