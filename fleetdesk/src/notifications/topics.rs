//! Topic derivation from the signed-in user's role and company.

use crate::session::{CompanyType, UserProfile};

pub const TOPIC_PREFIX: &str = "notifications";
pub const ALL_TOPIC: &str = "notifications/all";
pub const ADMINS_TOPIC: &str = "notifications/admins";
pub const CAR_COMPANY_ADMINS_TOPIC: &str = "notifications/car-company-admins";
pub const DRIVER_COMPANY_ADMINS_TOPIC: &str = "notifications/driver-company-admins";

/// Topics a user should receive notifications on.
///
/// The global topic and the user's own topic are always present; the rest
/// depend on the platform role and the company type.
pub fn topics_for(user: &UserProfile) -> Vec<String> {
    let mut topics = vec![
        ALL_TOPIC.to_string(),
        format!("{}/user/{}", TOPIC_PREFIX, user.id),
    ];

    if user.role.is_platform_admin() {
        topics.push(ADMINS_TOPIC.to_string());
    }

    if let Some(company) = &user.company {
        let company_topic = format!("{}/company/{}", TOPIC_PREFIX, company.id);
        match company.kind {
            CompanyType::Cars => {
                topics.push(CAR_COMPANY_ADMINS_TOPIC.to_string());
                topics.push(company_topic);
            }
            CompanyType::Drivers => {
                topics.push(DRIVER_COMPANY_ADMINS_TOPIC.to_string());
                topics.push(company_topic);
            }
            CompanyType::Other(_) => {}
        }
    }

    topics
}
