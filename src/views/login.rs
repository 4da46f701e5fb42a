//! Email and password login

use super::{Field, Form, FormState, gate};
use crate::api::ApiClient;
use crate::api::auth::LoginRequest;
use crate::error::ApiError;
use crate::models::ServerMessage;
use crate::nav::{Navigator, Route};
use crate::validation::{FieldErrors, check_email, check_password};

const FIELDS: &[Field] = &[Field::email(), Field::password("password", "Password")];

#[derive(Debug, Clone, Default)]
pub struct LoginView {
    pub email: String,
    pub password: String,
    pub state: FormState,
}

/// The backend tells unverified users apart only through its message
fn asks_for_verification(message: &str) -> bool {
    message.to_lowercase().contains("verif") || message.contains("وریفای")
}

impl LoginView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_email(&self.email, &mut errors);
        check_password("password", &self.password, &mut errors);
        errors
    }

    pub fn begin_submit(&mut self) -> Option<LoginRequest> {
        let errors = self.validate();
        gate(&mut self.state, errors).then(|| LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }

    pub fn finish_submit(&mut self, result: Result<ServerMessage, ApiError>, nav: &dyn Navigator) {
        let err = match result {
            Ok(reply) => {
                self.state = FormState::Success(reply.or("Logged in"));
                nav.navigate(Route::Dashboard);
                return;
            }
            Err(err) => err,
        };

        self.state = match err.status() {
            Some(401) => {
                let message = err.user_message("Login failed");
                if asks_for_verification(&message) {
                    nav.navigate(Route::VerifyEmail {
                        email: Some(self.email.trim().to_string()),
                    });
                    FormState::Success(message)
                } else {
                    FormState::GeneralError(message)
                }
            }
            Some(400) => FormState::GeneralError("Wrong email or password".to_string()),
            Some(429) => FormState::GeneralError(err.to_string()),
            _ => FormState::GeneralError("Something went wrong, please try again".to_string()),
        };
    }

    pub async fn submit(&mut self, api: &ApiClient) {
        let Some(request) = self.begin_submit() else {
            return;
        };
        let result = api.login(&request).await;
        self.finish_submit(result, api.navigator().as_ref());
    }
}

impl Form for LoginView {
    fn title(&self) -> &'static str {
        "Log in"
    }

    fn fields(&self) -> Vec<Field> {
        FIELDS.to_vec()
    }

    fn value(&self, field: &str) -> &str {
        match field {
            "email" => &self.email,
            "password" => &self.password,
            _ => "",
        }
    }

    fn value_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "email" => Some(&mut self.email),
            "password" => Some(&mut self.password),
            _ => None,
        }
    }

    fn state(&self) -> &FormState {
        &self.state
    }
}
