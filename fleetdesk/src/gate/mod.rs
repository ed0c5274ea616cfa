//! Request gate for dashboard pages.
//!
//! A stateless decision taken for every page request before it is served:
//! - paths without a locale prefix are redirected to the negotiated locale
//! - pages other than the auth pages require a session, else the browser is
//!   sent to the login page
//! - a signed-in browser asking for the registration page is sent home
//!
//! ## Example
//!
//! ```
//! use fleetdesk::gate::{Gate, GateDecision};
//! use fleetdesk::session::Session;
//!
//! let gate = Gate::new(vec!["en".to_string(), "ar".to_string()], "en".to_string());
//! let decision = gate.evaluate("/cars", None, &Session::default(), Some("ar-EG"));
//! assert_eq!(decision, GateDecision::Redirect("/ar/login".to_string()));
//! ```

pub mod locale;

use crate::session::Session;

/// Pages reachable without a session, relative to the locale prefix.
pub const AUTH_PATHS: [&str; 5] = [
    "/login",
    "/register",
    "/forgot-password",
    "/verify-code",
    "/reset-password",
];

const REGISTER_PATH: &str = "/register";
const LOGIN_PATH: &str = "/login";

/// Prefixes the gate never applies to.
const BYPASS_PREFIXES: [&str; 5] = ["/api/", "/ws/", "/_assets/", "/health", "/favicon.ico"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// Locale and auth routing rules.
#[derive(Debug, Clone)]
pub struct Gate {
    supported_locales: Vec<String>,
    default_locale: String,
}

impl Gate {
    /// Create a gate. `default_locale` is expected to be one of
    /// `supported_locales`; configuration validation enforces it.
    pub fn new(supported_locales: Vec<String>, default_locale: String) -> Self {
        Self {
            supported_locales,
            default_locale,
        }
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Decide what to do with a page request.
    ///
    /// `query` is the raw query string without `?` and is carried over on
    /// locale redirects.
    pub fn evaluate(
        &self,
        path: &str,
        query: Option<&str>,
        session: &Session,
        accept_language: Option<&str>,
    ) -> GateDecision {
        if BYPASS_PREFIXES.iter().any(|p| path.starts_with(p)) {
            return GateDecision::Allow;
        }

        let (locale, rest, prefixed) = match self.split_locale(path) {
            Some((locale, rest)) => (locale, rest, true),
            None => (
                locale::negotiate(accept_language, &self.supported_locales, &self.default_locale),
                path,
                false,
            ),
        };

        let is_auth_page = AUTH_PATHS.iter().any(|p| matches_page(rest, p));

        if !is_auth_page && !session.is_present() {
            return GateDecision::Redirect(format!("/{}{}", locale, LOGIN_PATH));
        }

        if matches_page(rest, REGISTER_PATH) && session.is_present() {
            return GateDecision::Redirect(format!("/{}", locale));
        }

        if !prefixed {
            let rest = if rest == "/" { "" } else { rest };
            let target = match query.filter(|q| !q.is_empty()) {
                Some(q) => format!("/{}{}?{}", locale, rest, q),
                None => format!("/{}{}", locale, rest),
            };
            return GateDecision::Redirect(target);
        }

        GateDecision::Allow
    }

    /// Split `/<locale>/rest` into the supported locale and `/rest`.
    fn split_locale<'a>(&'a self, path: &'a str) -> Option<(&'a str, &'a str)> {
        let trimmed = path.strip_prefix('/')?;
        let (segment, rest) = match trimmed.find('/') {
            Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
            None => (trimmed, "/"),
        };

        self.supported_locales
            .iter()
            .find(|l| l.as_str() == segment)
            .map(|l| (l.as_str(), rest))
    }
}

/// `/login` matches `/login` and `/login/...` but not `/login-help`.
fn matches_page(rest: &str, page: &str) -> bool {
    rest.strip_prefix(page)
        .is_some_and(|tail| tail.is_empty() || tail.starts_with('/'))
}
