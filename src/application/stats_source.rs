// Source trait for dashboard statistics
use crate::domain::chart::GrowthPoint;
use crate::domain::stats::DashboardStats;
use async_trait::async_trait;

/// Failures of a background fetch. All of them end up as a notification;
/// none propagate past the controller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("Access denied - insufficient privileges")]
    AccessDenied,

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Server returned error: {0}")]
    Rejected(String),

    #[error("Request timed out")]
    TimedOut,
}

impl FetchError {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => FetchError::SessionExpired,
            403 => FetchError::AccessDenied,
            other => FetchError::Status(other),
        }
    }

    /// Session and permission failures are fixed by reloading, not by waiting.
    pub fn needs_reload(&self) -> bool {
        matches!(self, FetchError::SessionExpired | FetchError::AccessDenied)
    }

    /// Text shown to the user. `context` names the operation that failed.
    pub fn user_message(&self, context: &str) -> String {
        if self.needs_reload() {
            format!("{}. Reload the page to continue.", self)
        } else {
            format!("{}: {}", context, self)
        }
    }
}

#[async_trait]
pub trait StatsSource: Send + Sync {
    /// `action=refreshStats`
    async fn refresh_stats(&self) -> Result<DashboardStats, FetchError>;

    /// `action=getUserGrowth&period=<period>`
    async fn user_growth(&self, period: &str) -> Result<Vec<GrowthPoint>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(FetchError::from_status(401), FetchError::SessionExpired);
        assert_eq!(FetchError::from_status(403), FetchError::AccessDenied);
        assert_eq!(FetchError::from_status(502), FetchError::Status(502));
    }

    #[test]
    fn test_user_message_distinguishes_session_failures() {
        let generic = FetchError::Status(500).user_message("Failed to refresh dashboard");
        assert_eq!(generic, "Failed to refresh dashboard: HTTP error! status: 500");

        let session = FetchError::SessionExpired.user_message("Failed to refresh dashboard");
        assert!(session.starts_with("Session expired"));
        assert!(session.contains("Reload the page"));
    }
}
