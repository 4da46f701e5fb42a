//! Change the password of the signed-in user

use super::{Field, Form, FormState, gate};
use crate::api::ApiClient;
use crate::api::auth::ChangePasswordRequest;
use crate::error::ApiError;
use crate::models::ServerMessage;
use crate::nav::{Navigator, Route};
use crate::validation::{FieldErrors, check_required};

#[derive(Debug, Clone, Default)]
pub struct ChangePasswordView {
    pub old_password: String,
    pub new_password: String,
    pub state: FormState,
}

impl ChangePasswordView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both fields are required; the server judges the new password
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_required("old_password", &self.old_password, "Current password", &mut errors);
        check_required("new_password", &self.new_password, "New password", &mut errors);
        errors
    }

    pub fn begin_submit(&mut self) -> Option<ChangePasswordRequest> {
        let errors = self.validate();
        gate(&mut self.state, errors).then(|| ChangePasswordRequest {
            old_password: self.old_password.clone(),
            new_password: self.new_password.clone(),
        })
    }

    /// Inputs are cleared on success so the secrets do not linger
    pub fn finish_submit(&mut self, result: Result<ServerMessage, ApiError>, nav: &dyn Navigator) {
        self.state = match result {
            Ok(reply) => {
                self.old_password.clear();
                self.new_password.clear();
                nav.navigate(Route::Dashboard);
                FormState::Success(reply.or("Password changed"))
            }
            Err(err) => FormState::GeneralError(err.user_message("Error changing password")),
        };
    }

    pub async fn submit(&mut self, api: &ApiClient) {
        let Some(request) = self.begin_submit() else {
            return;
        };
        let result = api.change_password(&request).await;
        self.finish_submit(result, api.navigator().as_ref());
    }
}

impl Form for ChangePasswordView {
    fn title(&self) -> &'static str {
        "Change password"
    }

    fn fields(&self) -> Vec<Field> {
        vec![
            Field::password("old_password", "Current password"),
            Field::password("new_password", "New password"),
        ]
    }

    fn value(&self, field: &str) -> &str {
        match field {
            "old_password" => &self.old_password,
            "new_password" => &self.new_password,
            _ => "",
        }
    }

    fn value_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "old_password" => Some(&mut self.old_password),
            "new_password" => Some(&mut self.new_password),
            _ => None,
        }
    }

    fn state(&self) -> &FormState {
        &self.state
    }
}
