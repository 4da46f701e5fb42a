//! View-models behind every screen
//!
//! Each view owns its state and talks to the backend only through
//! [`ApiClient`](crate::api::ApiClient). Submissions are split in two so
//! the TUI can run the network part on its worker task:
//!
//! 1. `begin_submit()` validates and returns the payload, or records field
//!    errors and returns `None` without touching the network.
//! 2. `finish_submit(result, ..)` applies the server's answer.
//!
//! `submit(&api)` runs both in place and is what tests and the CLI use.

pub mod change_password;
pub mod channels;
pub mod chat;
pub mod composer;
pub mod dashboard;
pub mod gallery;
pub mod guard;
pub mod login;
pub mod otp_login;
pub mod profile;
pub mod register;
pub mod reset_password;
pub mod status;
pub mod throttle;
pub mod verify_email;

use crate::error::ApiError;
use crate::validation::{self, FieldErrors, PERSIAN_HINT};

pub use change_password::ChangePasswordView;
pub use channels::ChannelsView;
pub use chat::ChatView;
pub use composer::ComposerView;
pub use dashboard::{DashboardTab, DashboardView};
pub use gallery::GalleryView;
pub use guard::{Guard, GuardState};
pub use login::LoginView;
pub use otp_login::OtpLoginView;
pub use profile::ProfileView;
pub use register::RegisterView;
pub use reset_password::ResetPasswordView;
pub use status::{StatusKind, StatusView};
pub use throttle::ThrottleView;
pub use verify_email::VerifyEmailView;

/// Key under which non-field errors are stored
pub const GENERAL: &str = "general";

/// Lifecycle of a form submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormState {
    #[default]
    Idle,
    Submitting,
    Success(String),
    FieldErrors(FieldErrors),
    GeneralError(String),
}

impl FormState {
    pub const fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        match self {
            Self::FieldErrors(errors) => errors.get(field).map(String::as_str),
            _ => None,
        }
    }

    /// Banner text: success, general error, or the `general` field error
    pub fn banner(&self) -> Option<(&str, bool)> {
        match self {
            Self::Success(msg) => Some((msg, false)),
            Self::GeneralError(msg) => Some((msg, true)),
            Self::FieldErrors(errors) => errors.get(GENERAL).map(|msg| (msg.as_str(), true)),
            _ => None,
        }
    }

    /// Map a server failure onto a form: per-field errors when the body
    /// names any of `fields`, otherwise the server message or `fallback`
    pub fn from_error(err: &ApiError, fields: &[&str], fallback: &str) -> Self {
        let mapped: FieldErrors = err
            .field_errors()
            .into_iter()
            .filter(|(field, _)| fields.contains(&field.as_str()))
            .collect();
        if mapped.is_empty() {
            Self::GeneralError(err.user_message(fallback))
        } else {
            Self::FieldErrors(mapped)
        }
    }
}

/// One editable input as the generic form renderer sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub label: &'static str,
    /// Rendered as bullets
    pub secret: bool,
    /// Persian keystrokes are rejected
    pub ascii_only: bool,
}

impl Field {
    pub const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            secret: false,
            ascii_only: false,
        }
    }

    pub const fn email() -> Self {
        Self {
            name: "email",
            label: "Email",
            secret: false,
            ascii_only: true,
        }
    }

    pub const fn password(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            secret: true,
            ascii_only: true,
        }
    }
}

/// Common surface of the text forms, used by the TUI to draw and edit them
pub trait Form {
    fn title(&self) -> &'static str;

    /// Inputs shown in the current step
    fn fields(&self) -> Vec<Field>;

    fn value(&self, field: &str) -> &str;

    fn value_mut(&mut self, field: &str) -> Option<&mut String>;

    fn state(&self) -> &FormState;

    /// Extra line under the inputs (strength meter, step hint)
    fn hint(&self) -> Option<String> {
        None
    }

    /// Type one character; Persian input in ASCII fields is refused
    fn type_char(&mut self, field: &str, c: char) -> Result<(), &'static str> {
        let ascii_only = self
            .fields()
            .iter()
            .any(|f| f.name == field && f.ascii_only);
        if ascii_only && !validation::accept_key(c) {
            return Err(PERSIAN_HINT);
        }
        if let Some(value) = self.value_mut(field) {
            value.push(c);
        }
        Ok(())
    }

    fn backspace(&mut self, field: &str) {
        if let Some(value) = self.value_mut(field) {
            value.pop();
        }
    }
}

/// Store `errors` as the form state, or return true when there are none
pub(crate) fn gate(state: &mut FormState, errors: FieldErrors) -> bool {
    if errors.is_empty() {
        *state = FormState::Submitting;
        true
    } else {
        *state = FormState::FieldErrors(errors);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_error_maps_known_fields_only() {
        let err = ApiError::Status {
            status: 400,
            body: json!({"phone": ["invalid"], "unknown": ["x"]}),
        };
        let state = FormState::from_error(&err, &["phone", "email"], "failed");
        assert_eq!(state.field_error("phone"), Some("invalid"));
        assert_eq!(state.field_error("unknown"), None);
    }

    #[test]
    fn test_from_error_falls_back_to_message() {
        let err = ApiError::Status {
            status: 500,
            body: json!(null),
        };
        assert_eq!(
            FormState::from_error(&err, &["email"], "try again"),
            FormState::GeneralError("try again".into())
        );
    }

    #[test]
    fn test_gate() {
        let mut state = FormState::Idle;
        assert!(gate(&mut state, FieldErrors::new()));
        assert!(state.is_submitting());

        let mut errors = FieldErrors::new();
        errors.insert(GENERAL.into(), "nope".into());
        assert!(!gate(&mut state, errors));
        assert_eq!(state.banner(), Some(("nope", true)));
    }
}
