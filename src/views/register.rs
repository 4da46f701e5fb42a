//! Account registration

use super::{Field, Form, FormState, gate};
use crate::api::ApiClient;
use crate::api::auth::RegisterRequest;
use crate::error::ApiError;
use crate::models::ServerMessage;
use crate::nav::{Navigator, Route};
use crate::validation::{
    FieldErrors, PERSIAN_HINT, PasswordStrength, StrengthPolicy, check_email, check_password,
    check_required, contains_persian, is_valid_phone, password_strength,
};

const FIELDS: &[&str] = &[
    "first_name",
    "last_name",
    "phone",
    "email",
    "password",
    "password2",
];

#[derive(Debug, Clone, Default)]
pub struct RegisterView {
    pub form: RegisterRequest,
    pub state: FormState,
}

impl RegisterView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live meter; informational only, submit is not gated on it
    pub fn strength(&self) -> Option<PasswordStrength> {
        password_strength(&self.form.password, StrengthPolicy::Register)
    }

    pub fn validate(&self) -> FieldErrors {
        let form = &self.form;
        let mut errors = FieldErrors::new();

        check_required("first_name", &form.first_name, "First name", &mut errors);
        check_required("last_name", &form.last_name, "Last name", &mut errors);

        if form.phone.trim().is_empty() {
            errors.insert("phone".into(), "Phone number is required".into());
        } else if !is_valid_phone(form.phone.trim()) {
            errors.insert(
                "phone".into(),
                "Phone number is not valid (e.g. 09123456789)".into(),
            );
        }

        check_email(&form.email, &mut errors);
        check_password("password", &form.password, &mut errors);

        if form.password != form.password2 {
            errors.insert("password2".into(), "Passwords do not match".into());
        } else if contains_persian(&form.password2) {
            errors.insert("password2".into(), PERSIAN_HINT.into());
        }

        errors
    }

    pub fn begin_submit(&mut self) -> Option<RegisterRequest> {
        let errors = self.validate();
        gate(&mut self.state, errors).then(|| RegisterRequest {
            first_name: self.form.first_name.trim().to_string(),
            last_name: self.form.last_name.trim().to_string(),
            phone: self.form.phone.trim().to_string(),
            email: self.form.email.trim().to_string(),
            ..self.form.clone()
        })
    }

    pub fn finish_submit(&mut self, result: Result<ServerMessage, ApiError>, nav: &dyn Navigator) {
        self.state = match result {
            Ok(reply) => {
                nav.navigate(Route::Login);
                FormState::Success(reply.or("Registration complete"))
            }
            Err(err) => FormState::from_error(&err, FIELDS, "Registration failed"),
        };
    }

    pub async fn submit(&mut self, api: &ApiClient) {
        let Some(request) = self.begin_submit() else {
            return;
        };
        let result = api.register(&request).await;
        self.finish_submit(result, api.navigator().as_ref());
    }
}

impl Form for RegisterView {
    fn title(&self) -> &'static str {
        "Create an account"
    }

    fn fields(&self) -> Vec<Field> {
        vec![
            Field::text("first_name", "First name"),
            Field::text("last_name", "Last name"),
            Field::text("phone", "Phone"),
            Field::email(),
            Field::password("password", "Password"),
            Field::password("password2", "Repeat password"),
        ]
    }

    fn value(&self, field: &str) -> &str {
        match field {
            "first_name" => &self.form.first_name,
            "last_name" => &self.form.last_name,
            "phone" => &self.form.phone,
            "email" => &self.form.email,
            "password" => &self.form.password,
            "password2" => &self.form.password2,
            _ => "",
        }
    }

    fn value_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "first_name" => Some(&mut self.form.first_name),
            "last_name" => Some(&mut self.form.last_name),
            "phone" => Some(&mut self.form.phone),
            "email" => Some(&mut self.form.email),
            "password" => Some(&mut self.form.password),
            "password2" => Some(&mut self.form.password2),
            _ => None,
        }
    }

    fn state(&self) -> &FormState {
        &self.state
    }

    fn hint(&self) -> Option<String> {
        self.strength()
            .map(|s| format!("Strength: {} ({}%)", s.strength.label(), s.score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, json_response, ok};
    use serde_json::json;

    fn valid() -> RegisterView {
        RegisterView {
            form: RegisterRequest {
                first_name: "Sara".into(),
                last_name: "Ahmadi".into(),
                phone: "09121234567".into(),
                email: "sara@example.com".into(),
                password: "weakpass".into(),
                password2: "weakpass".into(),
            },
            ..RegisterView::default()
        }
    }

    #[test]
    fn test_each_rule_reports_its_field() {
        let mut view = valid();
        view.form.first_name.clear();
        view.form.phone = "0912".into();
        view.form.password2 = "different".into();

        let errors = view.validate();

        assert!(errors.contains_key("first_name"));
        assert!(errors.contains_key("phone"));
        assert!(errors.contains_key("password2"));
        assert!(!errors.contains_key("email"));
    }

    #[tokio::test]
    async fn test_weak_password_still_submits() {
        let (api, mock, nav) = client();
        mock.on(Method::Post, "/users/register/", ok(json!({"msg": "registered"})));
        let mut view = valid();
        assert_eq!(
            view.strength().map(|s| s.strength),
            Some(crate::validation::Strength::Weak)
        );

        view.submit(&api).await;

        assert_eq!(view.state, FormState::Success("registered".into()));
        assert_eq!(nav.last(), Some(Route::Login));
    }

    #[tokio::test]
    async fn test_server_field_errors_map_back() {
        let (api, mock, _) = client();
        mock.on(
            Method::Post,
            "/users/register/",
            json_response(400, json!({"phone": ["already used"], "email": ["taken"]})),
        );
        let mut view = valid();

        view.submit(&api).await;

        assert_eq!(view.state.field_error("phone"), Some("already used"));
        assert_eq!(view.state.field_error("email"), Some("taken"));
    }

    #[tokio::test]
    async fn test_server_message_without_fields() {
        let (api, mock, _) = client();
        mock.on(
            Method::Post,
            "/users/register/",
            json_response(400, json!({"reason": "registration closed"})),
        );
        let mut view = valid();

        view.submit(&api).await;

        assert_eq!(view.state, FormState::GeneralError("registration closed".into()));
    }
}
