//! Session probe in front of every protected screen

use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::models::User;
use crate::nav::{Navigator, Route};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GuardState {
    #[default]
    Loading,
    Authorized(User),
    /// Sent to the login screen
    Redirected,
    /// The probe failed for a reason other than authentication
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct Guard {
    pub state: GuardState,
}

impl Guard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            GuardState::Authorized(user) => Some(user),
            _ => None,
        }
    }

    pub const fn is_authorized(&self) -> bool {
        matches!(self.state, GuardState::Authorized(_))
    }

    /// Apply the result of `GET /auth/me/`
    ///
    /// `SessionExpired` means the client already navigated to login while
    /// giving up on the refresh; a bare 401 (anonymous probe) still needs it.
    pub fn apply(&mut self, result: Result<User, ApiError>, nav: &dyn Navigator) {
        self.state = match result {
            Ok(user) => {
                debug!(user = %user.display_name(), "session valid");
                GuardState::Authorized(user)
            }
            Err(ApiError::SessionExpired) => GuardState::Redirected,
            Err(err) if err.status() == Some(401) => {
                nav.navigate(Route::Login);
                GuardState::Redirected
            }
            Err(err) => {
                warn!(error = %err, "session probe failed");
                GuardState::Failed(err.user_message("Could not reach the server"))
            }
        };
    }

    pub async fn check(&mut self, api: &ApiClient) {
        self.state = GuardState::Loading;
        let result = api.me().await;
        self.apply(result, api.navigator().as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{client, json_response, ok};
    use crate::api::{Method, REFRESH_PATH};
    use crate::nav::RecordingNavigator;
    use serde_json::json;

    #[tokio::test]
    async fn test_authorized() {
        let (api, mock, nav) = client();
        mock.on(Method::Get, "/auth/me/", ok(json!({"email": "a@b.co"})));
        let mut guard = Guard::new();

        guard.check(&api).await;

        assert!(guard.is_authorized());
        assert_eq!(guard.user().and_then(|u| u.email.as_deref()), Some("a@b.co"));
        assert!(nav.routes().is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_redirects_once() {
        let (api, mock, nav) = client();
        mock.on(Method::Get, "/auth/me/", json_response(401, json!({})));
        mock.on(Method::Post, REFRESH_PATH, json_response(401, json!({})));
        let mut guard = Guard::new();

        guard.check(&api).await;

        assert_eq!(guard.state, GuardState::Redirected);
        assert_eq!(nav.routes(), vec![Route::Login]);
    }

    #[test]
    fn test_bare_unauthorized_navigates() {
        let nav = RecordingNavigator::new();
        let mut guard = Guard::new();
        guard.apply(
            Err(ApiError::Status {
                status: 401,
                body: json!({}),
            }),
            &nav,
        );
        assert_eq!(guard.state, GuardState::Redirected);
        assert_eq!(nav.last(), Some(Route::Login));
    }

    #[tokio::test]
    async fn test_server_error_does_not_navigate() {
        let (api, mock, nav) = client();
        mock.on(Method::Get, "/auth/me/", json_response(500, json!({"detail": "boom"})));
        let mut guard = Guard::new();

        guard.check(&api).await;

        assert_eq!(guard.state, GuardState::Failed("boom".into()));
        assert!(nav.routes().is_empty());
    }
}
