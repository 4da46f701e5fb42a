//! AI chat: sessions, thread and saved prompts
//!
//! Every change of the active session bumps a generation counter. Thread
//! loads and replies carry the generation they were started under and are
//! dropped if the user has moved on by the time they land.

use tracing::{debug, warn};
use uuid::Uuid;

use super::{Field, Form, FormState, gate};
use crate::api::ApiClient;
use crate::api::chat::PromptDraft;
use crate::error::ApiError;
use crate::models::{ChatMessage, ChatReply, ChatSession, MessageRole, SavedPrompt};
use crate::validation::{FieldErrors, check_required};

/// Characters of the first message used to title a new session
pub const TITLE_CHARS: usize = 30;

/// Bubble shown when a send fails
pub const SEND_FAILED: &str = "Sorry, something went wrong sending your message. Please try again.";

/// Title for a session started by sending `message`
pub fn session_title(message: &str) -> String {
    let head: String = message.chars().take(TITLE_CHARS).collect();
    format!("{head}...")
}

/// Everything the worker needs to deliver one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendPlan {
    pub generation: u64,
    pub session: Option<Uuid>,
    /// Set when a session has to be created first
    pub new_title: Option<String>,
    pub message: String,
}

#[derive(Debug)]
pub enum SendOutcome {
    /// No session could be created, nothing was sent
    SessionFailed(ApiError),
    Replied {
        created: Option<ChatSession>,
        result: Result<ChatReply, ApiError>,
    },
}

impl SendPlan {
    pub async fn run(&self, api: &ApiClient) -> SendOutcome {
        let (session, created) = match (&self.session, &self.new_title) {
            (Some(id), _) => (Some(*id), None),
            (None, Some(title)) => match api.create_chat_session(title).await {
                Ok(session) => (Some(session.id), Some(session)),
                Err(err) => return SendOutcome::SessionFailed(err),
            },
            (None, None) => (None, None),
        };
        let result = api.send_chat_message(session, &self.message).await;
        SendOutcome::Replied { created, result }
    }
}

/// Add or edit form for a saved prompt
#[derive(Debug, Clone, Default)]
pub struct PromptEditor {
    pub id: Option<Uuid>,
    pub draft: PromptDraft,
    pub state: FormState,
}

impl PromptEditor {
    pub fn edit(prompt: &SavedPrompt) -> Self {
        Self {
            id: Some(prompt.id),
            draft: PromptDraft {
                title: prompt.title.clone(),
                content: prompt.content.clone(),
            },
            state: FormState::Idle,
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_required("title", &self.draft.title, "Title", &mut errors);
        check_required("content", &self.draft.content, "Prompt", &mut errors);
        errors
    }
}

impl Form for PromptEditor {
    fn title(&self) -> &'static str {
        if self.id.is_some() {
            "Edit prompt"
        } else {
            "New prompt"
        }
    }

    fn fields(&self) -> Vec<Field> {
        vec![Field::text("title", "Title"), Field::text("content", "Prompt")]
    }

    fn value(&self, field: &str) -> &str {
        match field {
            "title" => &self.draft.title,
            "content" => &self.draft.content,
            _ => "",
        }
    }

    fn value_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "title" => Some(&mut self.draft.title),
            "content" => Some(&mut self.draft.content),
            _ => None,
        }
    }

    fn state(&self) -> &FormState {
        &self.state
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatView {
    pub sessions: Vec<ChatSession>,
    pub current: Option<Uuid>,
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub sending: bool,
    pub error: Option<String>,
    pub session_cursor: usize,
    pub prompts: Vec<SavedPrompt>,
    pub prompt_cursor: usize,
    pub prompt_editor: Option<PromptEditor>,
    generation: u64,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        let id = self.current?;
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Switch to a session; returns the generation its thread load belongs to
    pub fn select(&mut self, id: Uuid) -> u64 {
        self.generation += 1;
        self.current = Some(id);
        self.messages.clear();
        self.error = None;
        if let Some(pos) = self.sessions.iter().position(|s| s.id == id) {
            self.session_cursor = pos;
        }
        self.generation
    }

    /// Forget the active session; the next send starts a new one
    pub fn start_fresh(&mut self) {
        self.generation += 1;
        self.current = None;
        self.messages.clear();
        self.error = None;
    }

    /// Store the list; returns the session to open when none is active
    pub fn apply_sessions(&mut self, result: Result<Vec<ChatSession>, ApiError>) -> Option<Uuid> {
        match result {
            Ok(sessions) => {
                self.sessions = sessions;
                self.session_cursor = self.session_cursor.min(self.sessions.len().saturating_sub(1));
                if self.current.is_none() {
                    self.sessions.first().map(|s| s.id)
                } else {
                    None
                }
            }
            Err(err) => {
                self.error = Some(err.user_message("Could not load your chats"));
                None
            }
        }
    }

    pub fn apply_thread(&mut self, generation: u64, result: Result<Vec<ChatMessage>, ApiError>) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale thread");
            return;
        }
        match result {
            Ok(messages) => self.messages = messages,
            Err(err) => self.error = Some(err.user_message("Could not load the messages")),
        }
    }

    pub async fn load_thread(&mut self, api: &ApiClient, id: Uuid) {
        let generation = self.select(id);
        let result = api.chat_messages(id).await;
        self.apply_thread(generation, result);
    }

    /// Fetch sessions and open the first one when nothing is active
    pub async fn load(&mut self, api: &ApiClient) {
        let result = api.chat_sessions().await;
        if let Some(first) = self.apply_sessions(result) {
            self.load_thread(api, first).await;
        }
    }

    pub fn apply_created(&mut self, result: Result<ChatSession, ApiError>) {
        match result {
            Ok(session) => {
                let id = session.id;
                self.sessions.insert(0, session);
                self.select(id);
            }
            Err(err) => self.error = Some(err.user_message("Could not start a new chat")),
        }
    }

    pub async fn new_session(&mut self, api: &ApiClient, title: &str) {
        let result = api.create_chat_session(title).await;
        self.apply_created(result);
    }

    /// Validate, show the user bubble and hand back what to send
    ///
    /// Returns `None` for blank input or while a send is in flight.
    pub fn begin_send(&mut self) -> Option<SendPlan> {
        let message = self.input.trim().to_string();
        if message.is_empty() || self.sending {
            return None;
        }
        let plan = SendPlan {
            generation: self.generation,
            session: self.current,
            new_title: self.current.is_none().then(|| session_title(&message)),
            message,
        };
        self.messages
            .push(ChatMessage::local(MessageRole::User, plan.message.clone()));
        self.input.clear();
        self.sending = true;
        self.error = None;
        Some(plan)
    }

    pub fn finish_send(&mut self, plan: &SendPlan, outcome: SendOutcome) {
        self.sending = false;
        let stale = plan.generation != self.generation;

        match outcome {
            SendOutcome::SessionFailed(err) => {
                warn!(error = %err, "could not create chat session");
                if !stale {
                    self.messages.pop();
                    self.input.clone_from(&plan.message);
                    self.error = Some(err.user_message("Could not start a new chat"));
                }
            }
            SendOutcome::Replied { created, result } => {
                if let Some(session) = created {
                    let id = session.id;
                    self.sessions.insert(0, session);
                    if !stale && self.current.is_none() {
                        self.current = Some(id);
                        self.session_cursor = 0;
                    }
                }
                if stale {
                    debug!(generation = plan.generation, "dropping stale reply");
                    return;
                }
                match result {
                    Ok(reply) => self.messages.push(reply.ai_message),
                    Err(err) => {
                        self.error = Some(err.user_message("Could not send the message"));
                        self.messages
                            .push(ChatMessage::local(MessageRole::System, SEND_FAILED));
                    }
                }
            }
        }
    }

    pub async fn send(&mut self, api: &ApiClient) {
        let Some(plan) = self.begin_send() else {
            return;
        };
        let outcome = plan.run(api).await;
        self.finish_send(&plan, outcome);
    }

    pub fn finish_delete_session(&mut self, id: Uuid, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                self.sessions.retain(|s| s.id != id);
                self.session_cursor = self.session_cursor.min(self.sessions.len().saturating_sub(1));
                if self.current == Some(id) {
                    self.start_fresh();
                }
            }
            Err(err) => self.error = Some(err.user_message("Could not delete the chat")),
        }
    }

    pub async fn delete_session(&mut self, api: &ApiClient, id: Uuid) {
        let result = api.delete_chat_session(id).await;
        self.finish_delete_session(id, result);
    }

    pub fn apply_prompts(&mut self, result: Result<Vec<SavedPrompt>, ApiError>) {
        match result {
            Ok(prompts) => {
                self.prompts = prompts;
                self.prompt_cursor = self.prompt_cursor.min(self.prompts.len().saturating_sub(1));
            }
            Err(err) => self.error = Some(err.user_message("Could not load prompts")),
        }
    }

    pub async fn load_prompts(&mut self, api: &ApiClient) {
        let result = api.prompts().await;
        self.apply_prompts(result);
    }

    /// Append a saved prompt to the compose input
    pub fn insert_prompt(&mut self, index: usize) {
        let Some(prompt) = self.prompts.get(index) else {
            return;
        };
        if !self.input.is_empty() && !self.input.ends_with(char::is_whitespace) {
            self.input.push(' ');
        }
        self.input.push_str(&prompt.content);
    }

    pub fn open_prompt_editor(&mut self, index: Option<usize>) {
        self.prompt_editor = match index {
            Some(i) => self.prompts.get(i).map(PromptEditor::edit),
            None => Some(PromptEditor::default()),
        };
    }

    pub fn begin_save_prompt(&mut self) -> Option<(Option<Uuid>, PromptDraft)> {
        let editor = self.prompt_editor.as_mut()?;
        let errors = editor.validate();
        gate(&mut editor.state, errors).then(|| {
            (
                editor.id,
                PromptDraft {
                    title: editor.draft.title.trim().to_string(),
                    content: editor.draft.content.trim().to_string(),
                },
            )
        })
    }

    pub fn finish_save_prompt(&mut self, result: Result<SavedPrompt, ApiError>) {
        match result {
            Ok(prompt) => {
                match self.prompts.iter_mut().find(|p| p.id == prompt.id) {
                    Some(existing) => *existing = prompt,
                    None => self.prompts.insert(0, prompt),
                }
                self.prompt_editor = None;
            }
            Err(err) => {
                if let Some(editor) = self.prompt_editor.as_mut() {
                    editor.state = FormState::GeneralError(err.user_message("Could not save the prompt"));
                }
            }
        }
    }

    pub async fn save_prompt(&mut self, api: &ApiClient) {
        let Some((id, draft)) = self.begin_save_prompt() else {
            return;
        };
        let result = match id {
            Some(id) => api.update_prompt(id, &draft).await,
            None => api.create_prompt(&draft).await,
        };
        self.finish_save_prompt(result);
    }

    pub fn finish_delete_prompt(&mut self, id: Uuid, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                self.prompts.retain(|p| p.id != id);
                self.prompt_cursor = self.prompt_cursor.min(self.prompts.len().saturating_sub(1));
            }
            Err(err) => self.error = Some(err.user_message("Could not delete the prompt")),
        }
    }

    pub async fn delete_prompt(&mut self, api: &ApiClient, id: Uuid) {
        let result = api.delete_prompt(id).await;
        self.finish_delete_prompt(id, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, json_response, ok};
    use serde_json::{Value, json};

    const S1: &str = "7f0c5a8e-4a43-4d8e-9a53-0c8f8b1e2d10";
    const S2: &str = "8f0c5a8e-4a43-4d8e-9a53-0c8f8b1e2d10";
    const P1: &str = "9f0c5a8e-4a43-4d8e-9a53-0c8f8b1e2d10";

    fn id(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    fn envelope(data: Value) -> Value {
        json!({"success": true, "data": data, "message": "ok"})
    }

    fn reply(text: &str) -> Value {
        envelope(json!({
            "session_id": S1,
            "ai_message": {"role": "assistant", "content": text}
        }))
    }

    #[test]
    fn test_session_title_truncates_by_chars() {
        let long = "سلام ".repeat(10);
        let title = session_title(&long);
        assert_eq!(title.chars().count(), TITLE_CHARS + 3);
        assert!(title.ends_with("..."));
        assert_eq!(session_title("hi"), "hi...");
    }

    #[tokio::test]
    async fn test_load_opens_first_session() {
        let (api, mock, _) = client();
        mock.on(
            Method::Get,
            "/chat/sessions/",
            ok(envelope(json!([{"id": S1, "title": "one"}, {"id": S2, "title": "two"}]))),
        );
        mock.on(
            Method::Get,
            &format!("/chat/sessions/{S1}/messages/"),
            ok(envelope(json!([{"role": "user", "content": "hi"}]))),
        );
        let mut view = ChatView::new();

        view.load(&api).await;

        assert_eq!(view.current, Some(id(S1)));
        assert_eq!(view.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_first_send_creates_titled_session() {
        let (api, mock, _) = client();
        mock.on(Method::Post, "/chat/sessions/", ok(envelope(json!({"id": S1, "title": "x"}))));
        mock.on(Method::Post, "/chat/chat/", ok(reply("hello there")));
        let mut view = ChatView::new();
        view.input = "a question that is clearly longer than thirty chars".into();

        view.send(&api).await;

        let created = mock.last(Method::Post, "/chat/sessions/").unwrap();
        assert_eq!(created.json()["title"], "a question that is clearly lon...");
        let sent = mock.last(Method::Post, "/chat/chat/").unwrap();
        assert_eq!(sent.json()["session_id"], S1);
        assert_eq!(view.current, Some(id(S1)));
        let roles: Vec<_> = view.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
        assert!(!view.sending);
    }

    #[tokio::test]
    async fn test_failed_send_adds_system_bubble() {
        let (api, mock, _) = client();
        mock.on(
            Method::Post,
            "/chat/chat/",
            json_response(500, json!({"success": false, "message": "model offline"})),
        );
        let mut view = ChatView::new();
        view.select(id(S1));
        view.input = "hi".into();

        view.send(&api).await;

        assert_eq!(view.error.as_deref(), Some("model offline"));
        assert_eq!(view.messages.last().map(|m| m.role), Some(MessageRole::System));
        assert_eq!(view.messages.len(), 2);
    }

    #[test]
    fn test_in_flight_guard_and_blank_input() {
        let mut view = ChatView::new();
        view.input = "   ".into();
        assert!(view.begin_send().is_none());

        view.input = "one".into();
        assert!(view.begin_send().is_some());
        view.input = "two".into();
        assert!(view.begin_send().is_none());
        assert_eq!(view.input, "two");
    }

    #[test]
    fn test_stale_reply_is_dropped() {
        let mut view = ChatView::new();
        view.select(id(S1));
        view.input = "hi".into();
        let plan = view.begin_send().unwrap();

        view.select(id(S2));
        let reply: ChatReply = serde_json::from_value(json!({
            "ai_message": {"role": "assistant", "content": "late"}
        }))
        .unwrap();
        view.finish_send(
            &plan,
            SendOutcome::Replied {
                created: None,
                result: Ok(reply),
            },
        );

        assert!(view.messages.is_empty());
        assert!(!view.sending);
    }

    #[test]
    fn test_stale_thread_is_dropped() {
        let mut view = ChatView::new();
        let old = view.select(id(S1));
        view.select(id(S2));
        view.apply_thread(old, Ok(vec![ChatMessage::local(MessageRole::User, "old")]));
        assert!(view.messages.is_empty());
    }

    #[tokio::test]
    async fn test_session_failure_restores_input() {
        let (api, mock, _) = client();
        mock.on(Method::Post, "/chat/sessions/", json_response(500, json!({})));
        let mut view = ChatView::new();
        view.input = "hello".into();

        view.send(&api).await;

        assert_eq!(view.input, "hello");
        assert!(view.messages.is_empty());
        assert_eq!(mock.calls(Method::Post, "/chat/chat/"), 0);
    }

    #[tokio::test]
    async fn test_prompt_crud_and_insert() {
        let (api, mock, _) = client();
        mock.on(
            Method::Post,
            "/chat/prompts/",
            ok(json!({"id": P1, "title": "tone", "content": "Write it formally."})),
        );
        mock.on(Method::Delete, &format!("/chat/prompts/{P1}/"), json_response(204, json!(null)));
        let mut view = ChatView::new();

        view.open_prompt_editor(None);
        if let Some(editor) = view.prompt_editor.as_mut() {
            editor.draft.title = "tone".into();
            editor.draft.content = "Write it formally.".into();
        }
        view.save_prompt(&api).await;
        assert_eq!(view.prompts.len(), 1);
        assert!(view.prompt_editor.is_none());

        view.input = "Summarize this".into();
        view.insert_prompt(0);
        assert_eq!(view.input, "Summarize this Write it formally.");

        view.delete_prompt(&api, id(P1)).await;
        assert!(view.prompts.is_empty());
    }

    #[tokio::test]
    async fn test_deleting_active_session_starts_fresh() {
        let (api, mock, _) = client();
        mock.on(Method::Delete, &format!("/chat/sessions/{S1}/"), json_response(204, json!(null)));
        let mut view = ChatView::new();
        view.sessions = vec![ChatSession {
            id: id(S1),
            title: "one".into(),
            created_at: None,
            updated_at: None,
        }];
        let before = view.select(id(S1));

        view.delete_session(&api, id(S1)).await;

        assert!(view.current.is_none());
        assert!(view.sessions.is_empty());
        assert!(view.generation() > before);
    }
}
