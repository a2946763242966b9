//! Registration, login, refresh and logout handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use duet_auth::PasswordHasher;
use duet_common::{Error, Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::cookie::RefreshCookie;
use crate::api::middleware::AccountsState;
use crate::domain::entities::{normalize_email, PublicUser, User};

/// Request for registering an account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

/// Request for logging in
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Optional body for refresh when the cookie is unavailable
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

async fn hash_blocking(hasher: PasswordHasher, password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| Error::Internal(format!("hashing task failed: {e}")))?
}

async fn verify_blocking(
    hasher: PasswordHasher,
    password: String,
    hash: Option<String>,
) -> Result<bool> {
    tokio::task::spawn_blocking(move || hasher.verify_or_decoy(&password, hash.as_deref()))
        .await
        .map_err(|e| Error::Internal(format!("verification task failed: {e}")))
}

/// Register a new account
pub async fn register(
    State(state): State<AccountsState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>)> {
    let email = normalize_email(&req.email);

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(Error::AlreadyExists("User already exists".to_string()));
    }

    let password_hash = hash_blocking(state.hasher.clone(), req.password).await?;
    let user = User::new(&email, &req.name, password_hash)?;

    let created = state.users.create(&user).await.map_err(|e| {
        if e.is_unique_violation() {
            Error::AlreadyExists("User already exists".to_string())
        } else {
            e.into()
        }
    })?;

    tracing::info!(user_id = %created.id, "User registered");
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Exchange credentials for an access token and a refresh cookie
pub async fn login(
    State(state): State<AccountsState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    let email = normalize_email(&req.email);

    // Unknown emails still pay for a verify
    let user = state.users.find_by_email(&email).await?;
    let matches = verify_blocking(
        state.hasher.clone(),
        req.password,
        user.as_ref().map(|u| u.password_hash.clone()),
    )
    .await?;

    let user = match user {
        Some(user) if matches => user,
        _ => {
            tracing::debug!("Login rejected");
            return Err(Error::InvalidCredentials);
        }
    };

    let pair = state.tokens.issue_pair(user.id)?;
    let cookie = state
        .cookie
        .issue(&pair.refresh_token, pair.refresh_ttl_secs)?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            access_token: pair.access_token,
            user: user.into(),
        }),
    ))
}

/// Rotate the refresh token and mint a new access token
pub async fn refresh(
    State(state): State<AccountsState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let token = RefreshCookie::read(&jar)
        .or_else(|| {
            serde_json::from_slice::<RefreshRequest>(&body)
                .ok()
                .map(|r| r.refresh_token)
        })
        .ok_or_else(|| Error::Authentication("Refresh token required".to_string()))?;

    let user_id = state.tokens.verify_refresh(&token)?;

    // The account must still exist
    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(Error::Authentication("Invalid or expired token".to_string()));
    }

    let pair = state.tokens.issue_pair(user_id)?;
    let cookie = state
        .cookie
        .issue(&pair.refresh_token, pair.refresh_ttl_secs)?;

    tracing::debug!(user_id = %user_id, "Refresh token rotated");
    Ok((
        [(SET_COOKIE, cookie)],
        Json(RefreshResponse {
            access_token: pair.access_token,
        }),
    ))
}

/// Clear the refresh cookie. Issued tokens stay valid until they expire.
pub async fn logout(State(state): State<AccountsState>) -> Result<impl IntoResponse> {
    let cookie = state.cookie.clear()?;
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]))
}
