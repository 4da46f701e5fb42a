//! Forgotten password: request a code, then set a new password

use super::{Field, Form, FormState, gate};
use crate::api::ApiClient;
use crate::api::auth::{OtpPurpose, OtpRequest, ResetPasswordRequest};
use crate::error::ApiError;
use crate::models::ServerMessage;
use crate::nav::{Navigator, Route};
use crate::validation::{
    FieldErrors, MIN_PASSWORD_LEN, PERSIAN_HINT, PasswordStrength, Strength, StrengthPolicy,
    check_email, check_required, contains_persian, password_strength,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResetStep {
    #[default]
    Request,
    Reset,
}

#[derive(Debug, Clone)]
pub enum ResetCall {
    Request(OtpRequest),
    Reset(ResetPasswordRequest),
}

#[derive(Debug, Clone, Default)]
pub struct ResetPasswordView {
    pub step: ResetStep,
    pub email: String,
    pub otp: String,
    pub new_password: String,
    pub confirm_password: String,
    pub state: FormState,
}

impl ResetPasswordView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strength(&self) -> Option<PasswordStrength> {
        password_strength(&self.new_password, StrengthPolicy::Reset)
    }

    fn is_strong(&self) -> bool {
        self.strength()
            .is_some_and(|s| s.strength == Strength::Strong)
    }

    /// Whether the reset button is enabled
    pub fn can_submit(&self) -> bool {
        match self.step {
            ResetStep::Request => !self.state.is_submitting(),
            ResetStep::Reset => {
                !self.state.is_submitting()
                    && self.new_password.chars().count() >= MIN_PASSWORD_LEN
                    && self.confirm_password == self.new_password
                    && self.is_strong()
            }
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match self.step {
            ResetStep::Request => check_email(&self.email, &mut errors),
            ResetStep::Reset => {
                check_required("otp", &self.otp, "Code", &mut errors);
                if !self.is_strong() {
                    errors.insert("new_password".into(), "Password must be very strong".into());
                } else if self.new_password != self.confirm_password {
                    errors.insert("confirm_password".into(), "Passwords do not match".into());
                } else if contains_persian(&self.new_password) {
                    errors.insert("new_password".into(), PERSIAN_HINT.into());
                }
            }
        }
        errors
    }

    pub fn begin_submit(&mut self) -> Option<ResetCall> {
        let errors = self.validate();
        if !gate(&mut self.state, errors) {
            return None;
        }
        Some(match self.step {
            ResetStep::Request => ResetCall::Request(OtpRequest::new(&self.email, OtpPurpose::Reset)),
            ResetStep::Reset => ResetCall::Reset(ResetPasswordRequest {
                email: self.email.trim().to_string(),
                otp: self.otp.trim().to_string(),
                new_password: self.new_password.clone(),
            }),
        })
    }

    pub fn finish_submit(&mut self, result: Result<ServerMessage, ApiError>, nav: &dyn Navigator) {
        self.state = match (self.step, result) {
            (ResetStep::Request, Ok(reply)) => {
                self.step = ResetStep::Reset;
                FormState::Success(reply.or("A recovery code was sent to your email"))
            }
            (ResetStep::Reset, Ok(reply)) => {
                nav.navigate(Route::Login);
                FormState::Success(reply.or("Password changed"))
            }
            (ResetStep::Request, Err(err)) => FormState::GeneralError(
                err.user_message("Could not send the recovery code, please try again"),
            ),
            (ResetStep::Reset, Err(err)) => FormState::GeneralError(
                err.user_message("Could not change the password, please try again"),
            ),
        };
    }

    pub async fn submit(&mut self, api: &ApiClient) {
        let result = match self.begin_submit() {
            None => return,
            Some(ResetCall::Request(request)) => api.request_otp(&request).await,
            Some(ResetCall::Reset(request)) => api.reset_password(&request).await,
        };
        self.finish_submit(result, api.navigator().as_ref());
    }
}

impl Form for ResetPasswordView {
    fn title(&self) -> &'static str {
        "Reset password"
    }

    fn fields(&self) -> Vec<Field> {
        match self.step {
            ResetStep::Request => vec![Field::email()],
            ResetStep::Reset => vec![
                Field::text("otp", "Code"),
                Field::password("new_password", "New password"),
                Field::password("confirm_password", "Repeat new password"),
            ],
        }
    }

    fn value(&self, field: &str) -> &str {
        match field {
            "email" => &self.email,
            "otp" => &self.otp,
            "new_password" => &self.new_password,
            "confirm_password" => &self.confirm_password,
            _ => "",
        }
    }

    fn value_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "email" => Some(&mut self.email),
            "otp" => Some(&mut self.otp),
            "new_password" => Some(&mut self.new_password),
            "confirm_password" => Some(&mut self.confirm_password),
            _ => None,
        }
    }

    fn state(&self) -> &FormState {
        &self.state
    }

    fn hint(&self) -> Option<String> {
        if self.step == ResetStep::Request {
            return None;
        }
        self.strength()
            .map(|s| format!("Strength: {} ({}%)", s.strength.label(), s.score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, ok};
    use serde_json::json;

    fn at_reset(password: &str, confirm: &str) -> ResetPasswordView {
        ResetPasswordView {
            step: ResetStep::Reset,
            email: "a@b.co".into(),
            otp: "123456".into(),
            new_password: password.into(),
            confirm_password: confirm.into(),
            ..ResetPasswordView::default()
        }
    }

    #[test]
    fn test_medium_password_cannot_submit() {
        let view = at_reset("abcDEF12", "abcDEF12");
        assert_eq!(view.strength().unwrap().score, 50);
        assert!(!view.can_submit());
        assert!(view.validate().contains_key("new_password"));
    }

    #[test]
    fn test_strong_matching_password_can_submit() {
        let view = at_reset("abcDEF12!", "abcDEF12!");
        assert!(view.can_submit());
        assert!(view.validate().is_empty());

        let mismatch = at_reset("abcDEF12!", "abcDEF12?");
        assert!(!mismatch.can_submit());
        assert!(mismatch.validate().contains_key("confirm_password"));
    }

    #[tokio::test]
    async fn test_full_flow() {
        let (api, mock, nav) = client();
        mock.on(Method::Post, "/auth/request-reset-otp/", ok(json!({"msg": "sent"})));
        mock.on(Method::Post, "/auth/reset-password/", ok(json!({"msg": "changed"})));
        let mut view = ResetPasswordView {
            email: "a@b.co".into(),
            ..ResetPasswordView::default()
        };

        view.submit(&api).await;
        assert_eq!(view.step, ResetStep::Reset);

        view.otp = "111222".into();
        view.new_password = "Str0ng!pass".into();
        view.confirm_password = "Str0ng!pass".into();
        view.submit(&api).await;

        let sent = mock.last(Method::Post, "/auth/reset-password/").unwrap();
        assert_eq!(
            sent.json(),
            json!({"email": "a@b.co", "otp": "111222", "new_password": "Str0ng!pass"})
        );
        assert_eq!(nav.last(), Some(Route::Login));
    }
}
