use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Json, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use store::{users::NewUser, StoreError};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{check_credentials_blocking, hash_password_blocking};
use crate::error::AppError;
use crate::schemas::AppState;
use crate::session::Principal;

pub const ALL_FIELDS_REQUIRED: &str = "All fields are required.";
pub const EMAIL_IN_USE: &str = "Email is already in use.";
pub const BAD_CREDENTIALS: &str = "Incorrect email or password.";

/// Registration form view-model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterPage {
    /// Course names offered in the course picker
    pub courses: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct RegisterForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 256))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub course: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
}

/// Login form view-model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginPage {
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Emails are compared trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn course_names(state: &AppState) -> Result<Vec<String>, AppError> {
    let courses = store::courses::all(state.store.conn()).await?;
    Ok(courses.into_iter().map(|c| c.course_name).collect())
}

async fn register_error(state: &AppState, message: impl Into<String>) -> Result<Response, AppError> {
    let page = RegisterPage {
        courses: course_names(state).await?,
        error: Some(message.into()),
    };
    Ok(Json(page).into_response())
}

/// Registration form
#[utoipa::path(
    get,
    path = "/register",
    tag = "auth",
    responses((status = 200, description = "Registration form", body = RegisterPage))
)]
#[instrument(skip(state))]
pub async fn register_page(State(state): State<AppState>) -> Result<Json<RegisterPage>, AppError> {
    Ok(Json(RegisterPage {
        courses: course_names(&state).await?,
        error: None,
    }))
}

/// Create an account
///
/// Every rejection re-renders the form with a message and leaves the store untouched.
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered, redirect to /login"),
        (status = 200, description = "Form re-rendered with an error", body = RegisterPage)
    )
)]
#[instrument(skip(state, form))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Result<Response, AppError> {
    trace!("Registration attempt");
    let email = normalize_email(&form.email);
    let blank = [&form.name, &form.password, &email, &form.course, &form.description]
        .iter()
        .any(|value| value.trim().is_empty());
    if blank || form.validate().is_err() {
        debug!("Registration rejected: missing or oversized field");
        return register_error(&state, ALL_FIELDS_REQUIRED).await;
    }

    let domain = state.settings.registration.email_domain.to_lowercase();
    if !email.ends_with(&domain) {
        debug!("Registration rejected: email outside {}", domain);
        return register_error(&state, format!("Please use a SIM email address with {}", domain)).await;
    }

    if store::users::email_exists(state.store.conn(), &email).await? {
        debug!("Registration rejected: email already registered");
        return register_error(&state, EMAIL_IN_USE).await;
    }

    let new_user = NewUser {
        email,
        name: form.name.trim().to_string(),
        password_hash: hash_password_blocking(form.password).await?,
        course: form.course,
        description: form.description,
    };
    match store::users::create(state.store.conn(), new_user).await {
        Ok(user) => {
            info!(user_id = user.id, "Account registered");
            Ok(Redirect::to("/login").into_response())
        }
        Err(StoreError::Duplicate(_)) => {
            warn!("Email registered concurrently");
            register_error(&state, EMAIL_IN_USE).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Login form
#[utoipa::path(
    get,
    path = "/login",
    tag = "auth",
    responses((status = 200, description = "Login form", body = LoginPage))
)]
pub async fn login_page() -> Json<LoginPage> {
    Json(LoginPage { error: None })
}

/// Sign in and start a session
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in, session cookie set, redirect to /"),
        (status = 200, description = "Form re-rendered with an error", body = LoginPage)
    )
)]
#[instrument(skip(state, form))]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response, AppError> {
    let email = normalize_email(&form.email);
    let account = store::users::find_by_email(state.store.conn(), &email).await?;
    let stored_hash = account.as_ref().map(|user| user.password_hash.clone());
    let verified = check_credentials_blocking(form.password, stored_hash).await?;
    let user = match account {
        Some(user) if verified => user,
        _ => {
            debug!("Login rejected");
            return Ok(Json(LoginPage {
                error: Some(BAD_CREDENTIALS.to_string()),
            })
            .into_response());
        }
    };

    let principal = Principal {
        id: user.id,
        email: user.email,
        name: user.name,
        authorised: user.authorised,
    };
    let token = state.sessions.create(principal).await;
    info!(user_id = user.id, "User signed in");
    Ok(([(SET_COOKIE, state.sessions.cookie(&token))], Redirect::to("/")).into_response())
}

/// Sign out
#[utoipa::path(
    get,
    path = "/logout",
    tag = "auth",
    responses((status = 303, description = "Session dropped, redirect to /"))
)]
#[instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Response {
    if let Some(token) = state.sessions.token_from_headers(&headers) {
        state.sessions.remove(&token).await;
        debug!("Session removed");
    }
    ([(SET_COOKIE, state.sessions.clear_cookie())], Redirect::to("/")).into_response()
}
