//! Session cookie parsing and `Set-Cookie` construction.

use cookie::{Cookie, SameSite, time::Duration};

use super::models::{Session, TokenPair, UserId};

/// Short-lived access credential.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// Long-lived credential exchanged for new access tokens.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
/// Signed-in user id.
pub const USER_ID_COOKIE: &str = "id";

/// Attributes applied to every session cookie the server writes.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub secure: bool,
    pub domain: Option<String>,
    pub access_max_age_secs: i64,
    pub refresh_max_age_secs: i64,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            secure: false,
            domain: None,
            access_max_age_secs: 60 * 60 * 24,
            refresh_max_age_secs: 60 * 60 * 24 * 30,
        }
    }
}

impl Session {
    /// Read the identity cookies out of a raw `Cookie` request header.
    ///
    /// Unparseable pairs and empty values are ignored.
    pub fn from_cookie_header(header: Option<&str>) -> Self {
        let mut session = Session::default();
        let Some(raw) = header else {
            return session;
        };

        for cookie in Cookie::split_parse(raw).flatten() {
            let value = cookie.value().trim();
            if value.is_empty() {
                continue;
            }
            match cookie.name() {
                ACCESS_TOKEN_COOKIE => session.access_token = Some(value.to_string()),
                REFRESH_TOKEN_COOKIE => session.refresh_token = Some(value.to_string()),
                USER_ID_COOKIE => session.user_id = Some(value.to_string()),
                _ => {}
            }
        }

        session
    }
}

impl CookiePolicy {
    fn build(&self, name: &'static str, value: String, max_age_secs: i64) -> String {
        let mut cookie = Cookie::build((name, value))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(Duration::seconds(max_age_secs))
            .build();

        if self.secure {
            cookie.set_secure(true);
        }
        if let Some(ref domain) = self.domain {
            cookie.set_domain(domain.clone());
        }

        cookie.to_string()
    }

    /// Cookies written after a successful login.
    pub fn login_cookies(&self, user_id: &UserId, tokens: &TokenPair) -> Vec<String> {
        let mut cookies = vec![
            self.build(USER_ID_COOKIE, user_id.clone(), self.refresh_max_age_secs),
            self.build(
                ACCESS_TOKEN_COOKIE,
                tokens.access_token.clone(),
                self.access_max_age_secs,
            ),
        ];
        if let Some(ref refresh) = tokens.refresh_token {
            cookies.push(self.build(
                REFRESH_TOKEN_COOKIE,
                refresh.clone(),
                self.refresh_max_age_secs,
            ));
        }
        cookies
    }

    /// Cookies written when a proxied call exchanged its refresh token.
    pub fn refreshed_cookies(&self, tokens: &TokenPair) -> Vec<String> {
        let mut cookies = vec![self.build(
            ACCESS_TOKEN_COOKIE,
            tokens.access_token.clone(),
            self.access_max_age_secs,
        )];
        if let Some(ref refresh) = tokens.refresh_token {
            cookies.push(self.build(
                REFRESH_TOKEN_COOKIE,
                refresh.clone(),
                self.refresh_max_age_secs,
            ));
        }
        cookies
    }

    /// Expired cookies that remove the whole session from the browser.
    pub fn cleared_cookies(&self) -> Vec<String> {
        [USER_ID_COOKIE, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE]
            .into_iter()
            .map(|name| self.build(name, String::new(), 0))
            .collect()
    }
}
