//! Profile editing

use super::{Field, Form, FormState, gate};
use crate::api::ApiClient;
use crate::error::ApiError;
use crate::models::{ProfileUpdate, ServerMessage, User};
use crate::validation::{FieldErrors, check_email, check_required, is_valid_phone};

const FIELDS: &[&str] = &["first_name", "last_name", "phone", "email"];

#[derive(Debug, Clone, Default)]
pub struct ProfileView {
    pub user: Option<User>,
    /// Values as loaded; `cancel()` goes back to these
    loaded: ProfileUpdate,
    pub form: ProfileUpdate,
    pub editing: bool,
    pub state: FormState,
}

impl ProfileView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user(&mut self, user: User) {
        self.loaded = ProfileUpdate::from(&user);
        self.form = self.loaded.clone();
        self.user = Some(user);
        self.editing = false;
    }

    pub async fn load(&mut self, api: &ApiClient) {
        match api.me().await {
            Ok(user) => {
                self.set_user(user);
                self.state = FormState::Idle;
            }
            Err(err) => {
                self.state = FormState::GeneralError(err.user_message("Could not load the profile"));
            }
        }
    }

    pub const fn edit(&mut self) {
        self.editing = true;
    }

    /// Drop unsaved edits
    pub fn cancel(&mut self) {
        self.form = self.loaded.clone();
        self.editing = false;
        self.state = FormState::Idle;
    }

    pub fn is_dirty(&self) -> bool {
        self.form != self.loaded
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_required("first_name", &self.form.first_name, "First name", &mut errors);
        check_required("last_name", &self.form.last_name, "Last name", &mut errors);
        if !is_valid_phone(self.form.phone.trim()) {
            errors.insert(
                "phone".into(),
                "Phone number is not valid (e.g. 09123456789)".into(),
            );
        }
        check_email(&self.form.email, &mut errors);
        errors
    }

    pub fn begin_submit(&mut self) -> Option<ProfileUpdate> {
        let errors = self.validate();
        gate(&mut self.state, errors).then(|| ProfileUpdate {
            first_name: self.form.first_name.trim().to_string(),
            last_name: self.form.last_name.trim().to_string(),
            phone: self.form.phone.trim().to_string(),
            email: self.form.email.trim().to_string(),
        })
    }

    pub fn finish_submit(&mut self, sent: ProfileUpdate, result: Result<ServerMessage, ApiError>) {
        self.state = match result {
            Ok(reply) => {
                if let Some(user) = self.user.as_mut() {
                    user.first_name = Some(sent.first_name.clone());
                    user.last_name = Some(sent.last_name.clone());
                    user.phone = Some(sent.phone.clone());
                    user.email = Some(sent.email.clone());
                }
                self.loaded = sent.clone();
                self.form = sent;
                self.editing = false;
                FormState::Success(reply.or("Profile updated"))
            }
            Err(err) => FormState::from_error(&err, FIELDS, "Could not update the profile"),
        };
    }

    pub async fn submit(&mut self, api: &ApiClient) {
        let Some(update) = self.begin_submit() else {
            return;
        };
        let result = api.update_profile(&update).await;
        self.finish_submit(update, result);
    }
}

impl Form for ProfileView {
    fn title(&self) -> &'static str {
        "Profile"
    }

    fn fields(&self) -> Vec<Field> {
        vec![
            Field::text("first_name", "First name"),
            Field::text("last_name", "Last name"),
            Field::text("phone", "Phone"),
            Field::email(),
        ]
    }

    fn value(&self, field: &str) -> &str {
        match field {
            "first_name" => &self.form.first_name,
            "last_name" => &self.form.last_name,
            "phone" => &self.form.phone,
            "email" => &self.form.email,
            _ => "",
        }
    }

    fn value_mut(&mut self, field: &str) -> Option<&mut String> {
        if !self.editing {
            return None;
        }
        match field {
            "first_name" => Some(&mut self.form.first_name),
            "last_name" => Some(&mut self.form.last_name),
            "phone" => Some(&mut self.form.phone),
            "email" => Some(&mut self.form.email),
            _ => None,
        }
    }

    fn state(&self) -> &FormState {
        &self.state
    }

    fn hint(&self) -> Option<String> {
        if self.editing {
            Some("Enter to save, Esc to cancel".to_string())
        } else {
            Some("Press e to edit".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, json_response, ok};
    use serde_json::json;

    fn me() -> serde_json::Value {
        json!({
            "id": 1,
            "first_name": "Sara",
            "last_name": "Ahmadi",
            "phone": "09121234567",
            "email": "sara@example.com",
            "is_verified": true
        })
    }

    #[tokio::test]
    async fn test_load_edit_cancel() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/auth/me/", ok(me()));
        let mut view = ProfileView::new();

        view.load(&api).await;
        assert_eq!(view.form.first_name, "Sara");

        view.edit();
        view.type_char("first_name", 'h').unwrap();
        assert!(view.is_dirty());

        view.cancel();
        assert_eq!(view.form.first_name, "Sara");
        assert!(!view.editing);
    }

    #[tokio::test]
    async fn test_save_puts_all_fields() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/auth/me/", ok(me()));
        mock.on(Method::Put, "/auth/update-profile/", ok(json!({"msg": "saved"})));
        let mut view = ProfileView::new();
        view.load(&api).await;
        view.edit();
        view.form.last_name = " Karimi ".into();

        view.submit(&api).await;

        let sent = mock.last(Method::Put, "/auth/update-profile/").unwrap();
        assert_eq!(sent.json()["last_name"], "Karimi");
        assert_eq!(sent.json()["email"], "sara@example.com");
        assert_eq!(view.state, FormState::Success("saved".into()));
        assert!(!view.is_dirty());
        assert_eq!(
            view.user.as_ref().and_then(|u| u.last_name.as_deref()),
            Some("Karimi")
        );
    }

    #[tokio::test]
    async fn test_server_field_error() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/auth/me/", ok(me()));
        mock.on(
            Method::Put,
            "/auth/update-profile/",
            json_response(400, json!({"phone": ["already used"]})),
        );
        let mut view = ProfileView::new();
        view.load(&api).await;

        view.submit(&api).await;

        assert_eq!(view.state.field_error("phone"), Some("already used"));
    }

    #[test]
    fn test_read_only_until_edit() {
        let mut view = ProfileView::new();
        view.type_char("first_name", 'x').unwrap();
        assert!(view.form.first_name.is_empty());
    }
}
