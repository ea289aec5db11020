use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};
use moka::future::Cache;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, trace, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::schemas::AppState;

/// The signed-in user as remembered by the session. Never carries the password hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub authorised: bool,
}

/// Server-side session storage keyed by an opaque random token.
///
/// Entries expire a fixed time after login, which is also the cookie's Max-Age.
#[derive(Clone, Debug)]
pub struct SessionStore {
    sessions: Cache<String, Principal>,
    cookie_name: String,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(cookie_name: impl Into<String>, ttl: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(ttl)
            .build();
        Self {
            sessions,
            cookie_name: cookie_name.into(),
            ttl,
        }
    }

    /// Starts a session for `principal` and returns its token.
    pub async fn create(&self, principal: Principal) -> String {
        let token = Uuid::new_v4().simple().to_string();
        debug!(user_id = principal.id, "Session created");
        self.sessions.insert(token.clone(), principal).await;
        token
    }

    pub async fn get(&self, token: &str) -> Option<Principal> {
        self.sessions.get(token).await
    }

    pub async fn remove(&self, token: &str) {
        self.sessions.invalidate(token).await;
    }

    /// `Set-Cookie` value carrying `token`.
    pub fn cookie(&self, token: &str) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.cookie_name,
            token,
            self.ttl.as_secs()
        )
    }

    /// `Set-Cookie` value that makes the browser drop the session cookie.
    pub fn clear_cookie(&self) -> String {
        format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", self.cookie_name)
    }

    /// Session token from the request's `Cookie` headers, if present.
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, token)| token.to_string())
            .filter(|token| !token.is_empty())
    }

    /// Resolves the request's session, if it has a live one.
    pub async fn principal(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = self.token_from_headers(headers)?;
        let principal = self.get(&token).await;
        if principal.is_none() {
            trace!("Session cookie present but session expired or unknown");
        }
        principal
    }
}

/// Extractor for routes that require a signed-in user.
///
/// Without a live session the request is redirected to `/login`.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Principal);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match state.sessions.principal(&parts.headers).await {
            Some(principal) => Ok(CurrentUser(principal)),
            None => {
                debug!(path = %parts.uri.path(), "Unauthenticated request redirected to login");
                Err(AppError::Unauthenticated)
            }
        }
    }
}

/// Message shown to signed-in users without author rights.
pub const AUTHOR_ONLY: &str = "Only authorised users can access the author page.";

/// Extractor for the blog author area: signed in and flagged as authorised.
///
/// The flag is re-read from the store so that granting or revoking access
/// takes effect without a new login.
#[derive(Clone, Debug)]
pub struct Author(pub Principal);

#[axum::async_trait]
impl FromRequestParts<AppState> for Author {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(principal) = CurrentUser::from_request_parts(parts, state).await?;
        let authorised = store::users::find_by_id(state.store.conn(), principal.id)
            .await?
            .map(|user| user.authorised)
            .unwrap_or(false);
        if !authorised {
            warn!(user_id = principal.id, "Author area denied");
            return Err(AppError::forbidden(AUTHOR_ONLY));
        }
        Ok(Author(Principal {
            authorised,
            ..principal
        }))
    }
}
