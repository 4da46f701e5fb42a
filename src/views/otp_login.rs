//! Passwordless login with an emailed code

use super::{Field, Form, FormState, gate};
use crate::api::ApiClient;
use crate::api::auth::{OtpPurpose, OtpRequest, OtpVerify};
use crate::error::ApiError;
use crate::models::ServerMessage;
use crate::nav::{Navigator, Route};
use crate::validation::{FieldErrors, check_email, check_required};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OtpStep {
    #[default]
    Request,
    Verify,
}

/// Network call for the current step
#[derive(Debug, Clone)]
pub enum OtpCall {
    Request(OtpRequest),
    Login(OtpVerify),
}

#[derive(Debug, Clone, Default)]
pub struct OtpLoginView {
    pub step: OtpStep,
    pub email: String,
    pub otp: String,
    pub state: FormState,
}

impl OtpLoginView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match self.step {
            OtpStep::Request => check_email(&self.email, &mut errors),
            OtpStep::Verify => check_required("otp", &self.otp, "Code", &mut errors),
        }
        errors
    }

    pub fn begin_submit(&mut self) -> Option<OtpCall> {
        let errors = self.validate();
        if !gate(&mut self.state, errors) {
            return None;
        }
        Some(match self.step {
            OtpStep::Request => OtpCall::Request(OtpRequest::new(&self.email, OtpPurpose::Login)),
            OtpStep::Verify => OtpCall::Login(OtpVerify {
                email: self.email.trim().to_string(),
                otp: self.otp.trim().to_string(),
                purpose: None,
            }),
        })
    }

    pub fn finish_submit(&mut self, result: Result<ServerMessage, ApiError>, nav: &dyn Navigator) {
        self.state = match (self.step, result) {
            (OtpStep::Request, Ok(reply)) => {
                self.step = OtpStep::Verify;
                FormState::Success(reply.or("Login code sent to your email"))
            }
            (OtpStep::Verify, Ok(reply)) => {
                nav.navigate(Route::Dashboard);
                FormState::Success(reply.or("Logged in"))
            }
            (OtpStep::Request, Err(err)) => {
                FormState::GeneralError(err.user_message("Could not send the login code"))
            }
            (OtpStep::Verify, Err(err)) => FormState::GeneralError(err.user_message("Login failed")),
        };
    }

    /// Back to the request step to get a fresh code
    pub fn resend(&mut self) {
        self.step = OtpStep::Request;
        self.otp.clear();
        self.state = FormState::Idle;
    }

    pub async fn submit(&mut self, api: &ApiClient) {
        let result = match self.begin_submit() {
            None => return,
            Some(OtpCall::Request(request)) => api.request_otp(&request).await,
            Some(OtpCall::Login(request)) => api.login_with_otp(&request).await,
        };
        self.finish_submit(result, api.navigator().as_ref());
    }
}

impl Form for OtpLoginView {
    fn title(&self) -> &'static str {
        "Log in with a code"
    }

    fn fields(&self) -> Vec<Field> {
        match self.step {
            OtpStep::Request => vec![Field::email()],
            OtpStep::Verify => vec![Field::text("otp", "Code")],
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

    fn hint(&self) -> Option<String> {
        (self.step == OtpStep::Verify).then(|| format!("Code sent to {}", self.email.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, json_response, ok};
    use serde_json::json;

    #[tokio::test]
    async fn test_two_step_login() {
        let (api, mock, nav) = client();
        mock.on(Method::Post, "/auth/request-login-otp/", ok(json!({"msg": "sent"})));
        mock.on(Method::Post, "/auth/login-with-otp/", ok(json!({"msg": "welcome"})));
        let mut view = OtpLoginView {
            email: "a@b.co".into(),
            ..OtpLoginView::default()
        };

        view.submit(&api).await;
        assert_eq!(view.step, OtpStep::Verify);
        assert_eq!(view.state, FormState::Success("sent".into()));

        view.otp = "123456".into();
        view.submit(&api).await;

        assert_eq!(nav.routes(), vec![Route::Dashboard]);
        let sent = mock.last(Method::Post, "/auth/login-with-otp/").unwrap();
        assert_eq!(sent.json(), json!({"email": "a@b.co", "otp": "123456"}));
        let requested = mock.last(Method::Post, "/auth/request-login-otp/").unwrap();
        assert_eq!(requested.json()["purpose"], "login");
    }

    #[tokio::test]
    async fn test_request_failure_stays_on_step() {
        let (api, mock, _) = client();
        mock.on(
            Method::Post,
            "/auth/request-login-otp/",
            json_response(404, json!({"msg": "no such user"})),
        );
        let mut view = OtpLoginView {
            email: "a@b.co".into(),
            ..OtpLoginView::default()
        };

        view.submit(&api).await;

        assert_eq!(view.step, OtpStep::Request);
        assert_eq!(view.state, FormState::GeneralError("no such user".into()));
    }

    #[test]
    fn test_resend_returns_to_request() {
        let mut view = OtpLoginView {
            step: OtpStep::Verify,
            otp: "12".into(),
            ..OtpLoginView::default()
        };
        view.resend();
        assert_eq!(view.step, OtpStep::Request);
        assert!(view.otp.is_empty());
    }
}
