//! Dashboard shell: current user, tabs and logout

use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::models::User;
use crate::nav::{Navigator, Route};

/// Dashboard sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardTab {
    #[default]
    Compose,
    Pending,
    Scheduled,
    Sent,
    Failed,
    Channels,
    Media,
    Chat,
    Profile,
}

impl DashboardTab {
    pub const fn all() -> &'static [Self] {
        &[
            Self::Compose,
            Self::Pending,
            Self::Scheduled,
            Self::Sent,
            Self::Failed,
            Self::Channels,
            Self::Media,
            Self::Chat,
            Self::Profile,
        ]
    }

    pub const fn title(&self) -> &'static str {
        match self {
            Self::Compose => "Compose",
            Self::Pending => "Pending",
            Self::Scheduled => "Scheduled",
            Self::Sent => "Sent",
            Self::Failed => "Failed",
            Self::Channels => "Channels",
            Self::Media => "Media",
            Self::Chat => "AI Chat",
            Self::Profile => "Profile",
        }
    }

    pub fn index(&self) -> usize {
        Self::all().iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::all().get(index).copied()
    }

    pub fn next(&self) -> Self {
        let all = Self::all();
        all[(self.index() + 1) % all.len()]
    }

    pub fn prev(&self) -> Self {
        let all = Self::all();
        all[(self.index() + all.len() - 1) % all.len()]
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub tab: DashboardTab,
    pub user: Option<User>,
    pub error: Option<String>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unverified accounts are sent to email verification first
    pub fn apply_user(&mut self, result: Result<User, ApiError>, nav: &dyn Navigator) {
        match result {
            Ok(user) => {
                if user.needs_verification() {
                    nav.navigate(Route::VerifyEmail {
                        email: user.email.clone(),
                    });
                }
                self.error = None;
                self.user = Some(user);
            }
            Err(err) => {
                self.error = Some(err.user_message("Could not load your account"));
            }
        }
    }

    pub async fn load(&mut self, api: &ApiClient) {
        let result = api.me().await;
        self.apply_user(result, api.navigator().as_ref());
    }

    pub fn greeting(&self) -> String {
        self.user
            .as_ref()
            .map_or_else(|| "Welcome".to_string(), |u| format!("Welcome, {}", u.display_name()))
    }

    /// The server call may fail; the user ends up on the login screen anyway
    pub fn finish_logout(&mut self, result: Result<(), ApiError>, nav: &dyn Navigator) {
        if let Err(err) = result {
            warn!(error = %err, "logout request failed");
        }
        info!("logged out");
        self.user = None;
        nav.navigate(Route::Login);
    }

    pub async fn logout(&mut self, api: &ApiClient) {
        let result = api.logout().await;
        self.finish_logout(result, api.navigator().as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, json_response, ok};
    use serde_json::json;

    #[test]
    fn test_tab_cycle_wraps() {
        assert_eq!(DashboardTab::Profile.next(), DashboardTab::Compose);
        assert_eq!(DashboardTab::Compose.prev(), DashboardTab::Profile);
        assert_eq!(DashboardTab::from_index(7), Some(DashboardTab::Chat));
        assert_eq!(DashboardTab::from_index(9), None);
    }

    #[tokio::test]
    async fn test_unverified_user_goes_to_verification() {
        let (api, mock, nav) = client();
        mock.on(
            Method::Get,
            "/auth/me/",
            ok(json!({"email": "a@b.co", "is_verified": false})),
        );
        let mut view = DashboardView::new();

        view.load(&api).await;

        assert_eq!(
            nav.last(),
            Some(Route::VerifyEmail {
                email: Some("a@b.co".into())
            })
        );
    }

    #[tokio::test]
    async fn test_missing_flag_is_not_unverified() {
        let (api, mock, nav) = client();
        mock.on(Method::Get, "/auth/me/", ok(json!({"first_name": "Sara"})));
        let mut view = DashboardView::new();

        view.load(&api).await;

        assert!(nav.routes().is_empty());
        assert_eq!(view.greeting(), "Welcome, Sara");
    }

    #[tokio::test]
    async fn test_logout_navigates_even_on_failure() {
        let (api, mock, nav) = client();
        mock.on(Method::Post, "/auth/logout/", json_response(500, json!({})));
        let mut view = DashboardView::new();

        view.logout(&api).await;

        assert_eq!(mock.calls(Method::Post, "/auth/logout/"), 1);
        assert_eq!(nav.last(), Some(Route::Login));
    }
}
