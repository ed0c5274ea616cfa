//! Backend endpoint paths and the CRUD resources the dashboard manages.

use std::fmt;

use super::errors::{BackendError, BackendResult};

pub const LOGIN: &str = "/auth/login";
pub const LOGOUT: &str = "/auth/logout";
pub const REFRESH_TOKEN: &str = "/auth/refresh-token";
pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
pub const VERIFY_CODE: &str = "/auth/verify-code";
pub const RESET_PASSWORD: &str = "/auth/reset-password";
pub const DASHBOARD_STATISTICS: &str = "/statistics/dashboard";
pub const FILE_UPLOAD: &str = "/files/upload";

/// Records managed through the generic CRUD proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Drivers,
    Companies,
    Cars,
    Trips,
    TripOffers,
    BankAccounts,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Users,
        Resource::Drivers,
        Resource::Companies,
        Resource::Cars,
        Resource::Trips,
        Resource::TripOffers,
        Resource::BankAccounts,
    ];

    /// URL segment used by both the proxy routes and the backend.
    pub fn slug(self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Drivers => "drivers",
            Resource::Companies => "companies",
            Resource::Cars => "cars",
            Resource::Trips => "trips",
            Resource::TripOffers => "trip-offers",
            Resource::BankAccounts => "bank-accounts",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.slug() == slug)
    }

    pub fn collection_path(self) -> String {
        format!("/{}", self.slug())
    }

    /// Path of one record. `id` must be a single plain path segment.
    pub fn item_path(self, id: &str) -> BackendResult<String> {
        Ok(format!("/{}/{}", self.slug(), path_segment(id)?))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Negotiation step on a trip offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferAction {
    Accept,
    Reject,
    Counter,
}

impl OfferAction {
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "accept" => Some(OfferAction::Accept),
            "reject" => Some(OfferAction::Reject),
            "counter" => Some(OfferAction::Counter),
            _ => None,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            OfferAction::Accept => "accept",
            OfferAction::Reject => "reject",
            OfferAction::Counter => "counter",
        }
    }

    pub fn path(self, offer_id: &str) -> BackendResult<String> {
        Ok(format!(
            "{}/{}",
            Resource::TripOffers.item_path(offer_id)?,
            self.slug()
        ))
    }
}

/// Accept `id` only if it stays one segment of the backend path.
///
/// Route captures arrive percent-decoded, so `/`, `?`, `#` or a dot segment
/// would otherwise change which backend endpoint is called.
pub fn path_segment(id: &str) -> BackendResult<&str> {
    let plain = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'));

    if id.is_empty() || id == "." || id == ".." || !plain {
        return Err(BackendError::InvalidPath(id.to_string()));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_round_trip_for_every_resource() {
        for resource in Resource::ALL {
            assert_eq!(Resource::from_slug(resource.slug()), Some(resource));
        }
        assert_eq!(Resource::from_slug("invoices"), None);
    }

    #[test]
    fn test_paths() {
        assert_eq!(Resource::BankAccounts.collection_path(), "/bank-accounts");
        assert_eq!(Resource::Cars.item_path("12").unwrap(), "/cars/12");
        assert_eq!(
            OfferAction::Counter.path("9").unwrap(),
            "/trip-offers/9/counter"
        );
        assert_eq!(OfferAction::from_slug("withdraw"), None);
    }

    #[test]
    fn test_ids_must_stay_one_segment() {
        assert_eq!(
            Resource::Users.item_path("3f2c9a1e-7b4d-4c1a-9e0f-2a6b8c4d5e6f").unwrap(),
            "/users/3f2c9a1e-7b4d-4c1a-9e0f-2a6b8c4d5e6f"
        );

        for id in ["1?owner=all", "../users/9", "..", ".", "", "4#frag", "a b", "5%2F6"] {
            let err = Resource::Cars.item_path(id).unwrap_err();
            assert!(matches!(err, BackendError::InvalidPath(_)), "{:?}", id);
            assert_eq!(err.status_code(), 400);
        }
        assert!(OfferAction::Accept.path("../../users").is_err());
    }
}
