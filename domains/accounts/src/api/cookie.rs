//! Refresh token cookie

use axum::http::HeaderValue;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use duet_common::{Error, Result};

pub const REFRESH_COOKIE_NAME: &str = "refreshToken";
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// Builds `Set-Cookie` values for the refresh token.
///
/// HttpOnly and scoped to the auth routes so the token never reaches
/// scripts or the rest of the API.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshCookie {
    pub secure: bool,
}

impl RefreshCookie {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn issue(&self, token: &str, max_age_secs: i64) -> Result<HeaderValue> {
        self.header(token, max_age_secs)
    }

    pub fn clear(&self) -> Result<HeaderValue> {
        self.header("", 0)
    }

    /// Read the refresh token from the request cookies
    pub fn read(jar: &CookieJar) -> Option<String> {
        jar.get(REFRESH_COOKIE_NAME)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn header(&self, value: &str, max_age_secs: i64) -> Result<HeaderValue> {
        let cookie = Cookie::build((REFRESH_COOKIE_NAME, value))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .path(REFRESH_COOKIE_PATH)
            .max_age(time::Duration::seconds(max_age_secs))
            .build();
        HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| Error::Internal(format!("invalid cookie header: {e}")))
    }
}
