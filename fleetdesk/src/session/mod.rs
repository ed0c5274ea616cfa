//! Browser session handling.
//!
//! A session is the triple of cookies written at login: the user id, a
//! short-lived access token and a long-lived refresh token. This module reads
//! them from request headers and builds the `Set-Cookie` values written at
//! login, after a transparent token refresh, and at logout.

pub mod cookies;
pub mod models;

pub use cookies::{ACCESS_TOKEN_COOKIE, CookiePolicy, REFRESH_TOKEN_COOKIE, USER_ID_COOKIE};
pub use models::{
    Company, CompanyType, LoginGrant, Role, Session, TokenPair, UserId, UserProfile,
};
