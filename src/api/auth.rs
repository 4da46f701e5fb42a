//! Authentication and account endpoints

use serde::Serialize;

use super::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{ProfileUpdate, ServerMessage, User};

/// What a one-time code is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpPurpose {
    Verify,
    Login,
    Reset,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Code request; the reset endpoint takes the email alone
#[derive(Debug, Clone, Serialize)]
pub struct OtpRequest {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<OtpPurpose>,
}

impl OtpRequest {
    pub fn new(email: &str, purpose: OtpPurpose) -> Self {
        Self {
            email: email.trim().to_string(),
            purpose: (purpose != OtpPurpose::Reset).then_some(purpose),
        }
    }

    fn path(&self) -> &'static str {
        match self.purpose {
            Some(OtpPurpose::Verify) => "/auth/request-otp/",
            Some(OtpPurpose::Login) => "/auth/request-login-otp/",
            Some(OtpPurpose::Reset) | None => "/auth/request-reset-otp/",
        }
    }
}

/// Code submission; only email verification names its purpose
#[derive(Debug, Clone, Serialize)]
pub struct OtpVerify {
    pub email: String,
    pub otp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<OtpPurpose>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl ApiClient {
    /// Probe the session; also used by the route guard
    pub async fn me(&self) -> Result<User, ApiError> {
        self.get("/auth/me/").await
    }

    /// Password login; the backend answers with session cookies
    pub async fn login(&self, request: &LoginRequest) -> Result<ServerMessage, ApiError> {
        let request = ApiRequest::post("/auth/login/").json(request)?.anonymous();
        self.fetch_or_default(request).await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.execute(ApiRequest::post("/auth/logout/")).await
    }

    /// Ask for a code by email; the endpoint depends on the purpose
    pub async fn request_otp(&self, request: &OtpRequest) -> Result<ServerMessage, ApiError> {
        let request = ApiRequest::post(request.path()).json(request)?.anonymous();
        self.fetch_or_default(request).await
    }

    /// Confirm the email address with a `verify` code
    pub async fn verify_otp(&self, request: &OtpVerify) -> Result<ServerMessage, ApiError> {
        let request = ApiRequest::post("/auth/verify-otp/").json(request)?.anonymous();
        self.fetch_or_default(request).await
    }

    /// Exchange a `login` code for session cookies
    pub async fn login_with_otp(&self, request: &OtpVerify) -> Result<ServerMessage, ApiError> {
        let request = ApiRequest::post("/auth/login-with-otp/").json(request)?.anonymous();
        self.fetch_or_default(request).await
    }

    pub async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<ServerMessage, ApiError> {
        let request = ApiRequest::post("/auth/reset-password/").json(request)?.anonymous();
        self.fetch_or_default(request).await
    }

    pub async fn change_password(
        &self,
        request: &ChangePasswordRequest,
    ) -> Result<ServerMessage, ApiError> {
        let request = ApiRequest::post("/auth/change-password/").json(request)?;
        self.fetch_or_default(request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<ServerMessage, ApiError> {
        let request = ApiRequest::post("/users/register/").json(request)?.anonymous();
        self.fetch_or_default(request).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<ServerMessage, ApiError> {
        let request = ApiRequest::put("/auth/update-profile/").json(update)?;
        self.fetch_or_default(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, json_response, ok};
    use serde_json::json;

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let (api, mock, _) = client();
        mock.on(Method::Post, "/auth/login/", ok(json!({"msg": "Login successful"})));

        let reply = api
            .login(&LoginRequest {
                email: "a@b.co".into(),
                password: "secret123".into(),
            })
            .await
            .unwrap();

        assert_eq!(reply.text(), Some("Login successful"));
        let sent = mock.last(Method::Post, "/auth/login/").unwrap();
        assert_eq!(sent.json(), json!({"email": "a@b.co", "password": "secret123"}));
    }

    #[tokio::test]
    async fn test_request_otp_routes_by_purpose() {
        let (api, mock, _) = client();
        for purpose in [OtpPurpose::Verify, OtpPurpose::Login, OtpPurpose::Reset] {
            api.request_otp(&OtpRequest::new("a@b.co", purpose)).await.ok();
        }
        assert_eq!(mock.calls(Method::Post, "/auth/request-otp/"), 1);
        assert_eq!(mock.calls(Method::Post, "/auth/request-login-otp/"), 1);
        assert_eq!(mock.calls(Method::Post, "/auth/request-reset-otp/"), 1);
        let sent = mock.last(Method::Post, "/auth/request-login-otp/").unwrap();
        assert_eq!(sent.json()["purpose"], "login");
        let reset = mock.last(Method::Post, "/auth/request-reset-otp/").unwrap();
        assert_eq!(reset.json(), json!({"email": "a@b.co"}));
    }

    #[tokio::test]
    async fn test_empty_success_body_is_default_message() {
        let (api, mock, _) = client();
        mock.on(
            Method::Post,
            "/auth/change-password/",
            crate::api::RawResponse {
                status: 204,
                ..Default::default()
            },
        );
        let reply = api
            .change_password(&ChangePasswordRequest {
                old_password: "a".into(),
                new_password: "b".into(),
            })
            .await
            .unwrap();
        assert_eq!(reply.text(), None);
    }

    #[tokio::test]
    async fn test_register_field_errors_surface() {
        let (api, mock, _) = client();
        mock.on(
            Method::Post,
            "/users/register/",
            json_response(400, json!({"email": ["user with this email already exists."]})),
        );
        let err = api.register(&RegisterRequest::default()).await.unwrap_err();
        assert!(err.field_error("email").is_some());
    }
}
