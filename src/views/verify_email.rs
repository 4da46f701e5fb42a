//! Email verification with a six-digit code

use super::otp_login::OtpStep;
use super::{Field, Form, FormState, gate};
use crate::api::ApiClient;
use crate::api::auth::{OtpPurpose, OtpRequest, OtpVerify};
use crate::error::ApiError;
use crate::models::ServerMessage;
use crate::nav::{Navigator, Route};
use crate::validation::{FieldErrors, check_email, is_valid_otp};

#[derive(Debug, Clone)]
pub enum VerifyCall {
    Request(OtpRequest),
    Verify(OtpVerify),
}

#[derive(Debug, Clone, Default)]
pub struct VerifyEmailView {
    pub step: OtpStep,
    pub email: String,
    pub otp: String,
    pub state: FormState,
}

impl VerifyEmailView {
    /// Start with the address the login screen was using, if any
    pub fn new(email: Option<String>) -> Self {
        Self {
            email: email.unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match self.step {
            OtpStep::Request => check_email(&self.email, &mut errors),
            OtpStep::Verify => {
                if !is_valid_otp(self.otp.trim()) {
                    errors.insert("otp".into(), "The code must be 6 digits".into());
                }
            }
        }
        errors
    }

    pub fn begin_submit(&mut self) -> Option<VerifyCall> {
        let errors = self.validate();
        if !gate(&mut self.state, errors) {
            return None;
        }
        Some(match self.step {
            OtpStep::Request => {
                VerifyCall::Request(OtpRequest::new(&self.email, OtpPurpose::Verify))
            }
            OtpStep::Verify => VerifyCall::Verify(OtpVerify {
                email: self.email.trim().to_string(),
                otp: self.otp.trim().to_string(),
                purpose: Some(OtpPurpose::Verify),
            }),
        })
    }

    /// Any 2xx on the request step moves on to code entry
    pub fn finish_submit(&mut self, result: Result<ServerMessage, ApiError>, nav: &dyn Navigator) {
        self.state = match (self.step, result) {
            (OtpStep::Request, Ok(reply)) => {
                self.step = OtpStep::Verify;
                FormState::Success(reply.or("Verification code sent"))
            }
            (OtpStep::Verify, Ok(reply)) => {
                nav.navigate(Route::Dashboard);
                FormState::Success(reply.or("Email verified"))
            }
            (OtpStep::Request, Err(err)) => {
                FormState::GeneralError(err.user_message("Could not send the verification code"))
            }
            (OtpStep::Verify, Err(err)) => {
                FormState::GeneralError(err.user_message("Could not verify the code"))
            }
        };
    }

    pub fn resend(&mut self) {
        self.step = OtpStep::Request;
        self.otp.clear();
        self.state = FormState::Idle;
    }

    pub async fn submit(&mut self, api: &ApiClient) {
        let result = match self.begin_submit() {
            None => return,
            Some(VerifyCall::Request(request)) => api.request_otp(&request).await,
            Some(VerifyCall::Verify(request)) => api.verify_otp(&request).await,
        };
        self.finish_submit(result, api.navigator().as_ref());
    }
}

impl Form for VerifyEmailView {
    fn title(&self) -> &'static str {
        "Verify your email"
    }

    fn fields(&self) -> Vec<Field> {
        match self.step {
            OtpStep::Request => vec![Field::email()],
            OtpStep::Verify => vec![Field::text("otp", "6-digit code")],
        }
    }

    fn value(&self, field: &str) -> &str {
        match field {
            "email" => &self.email,
            "otp" => &self.otp,
            _ => "",
        }
    }

    fn value_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "email" => Some(&mut self.email),
            "otp" => Some(&mut self.otp),
            _ => None,
        }
    }

    fn state(&self) -> &FormState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, ok};
    use serde_json::json;

    #[tokio::test]
    async fn test_request_then_verify() {
        let (api, mock, nav) = client();
        mock.on(Method::Post, "/auth/request-otp/", ok(json!({"msg": "code sent"})));
        mock.on(Method::Post, "/auth/verify-otp/", ok(json!({"msg": "verified"})));
        let mut view = VerifyEmailView::new(Some("a@b.co".into()));

        view.submit(&api).await;
        assert_eq!(view.step, OtpStep::Verify);

        view.otp = "654321".into();
        view.submit(&api).await;

        let sent = mock.last(Method::Post, "/auth/verify-otp/").unwrap();
        assert_eq!(
            sent.json(),
            json!({"email": "a@b.co", "otp": "654321", "purpose": "verify"})
        );
        assert_eq!(nav.last(), Some(Route::Dashboard));
    }

    #[tokio::test]
    async fn test_short_code_blocked_locally() {
        let (api, mock, _) = client();
        let mut view = VerifyEmailView {
            step: OtpStep::Verify,
            email: "a@b.co".into(),
            otp: "123".into(),
            ..VerifyEmailView::default()
        };

        view.submit(&api).await;

        assert!(view.state.field_error("otp").is_some());
        assert_eq!(mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_any_success_advances_even_without_message() {
        let (api, mock, _) = client();
        mock.on(Method::Post, "/auth/request-otp/", ok(json!({})));
        let mut view = VerifyEmailView::new(Some("a@b.co".into()));

        view.submit(&api).await;

        assert_eq!(view.step, OtpStep::Verify);
        assert_eq!(view.state, FormState::Success("Verification code sent".into()));
    }
}
