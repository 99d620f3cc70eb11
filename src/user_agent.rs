//! User-Agent string shared by data and session requests.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/couch-session-auth";

/// Default User-Agent for every request sent through [`HttpClient`](crate::http::HttpClient).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("couch-session-auth/{version} (+{PROJECT_UA_URL})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_version_and_project_url() {
        let ua = default_user_agent();
        assert!(ua.contains(PROJECT_UA_URL), "UA must contain project URL: {ua}");
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("couch-session-auth/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
            "UA must contain crate version"
        );
    }
}
