//! Event handling

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use super::async_ops::AsyncCommand;
use super::state::{AppState, Mode, PathPurpose, Screen};
use crate::views::guard::GuardState;
use crate::views::status::PostAction;
use crate::views::{DashboardTab, Form, StatusKind};

/// What a key did to a form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormKey {
    Submit,
    Cancel,
    Handled,
    /// Keystroke refused, with the hint to show
    Rejected(&'static str),
    Ignored,
}

/// Shared editing keys for every text form
fn edit_form(form: &mut dyn Form, focus: &mut usize, key: KeyEvent) -> FormKey {
    let fields = form.fields();
    if fields.is_empty() {
        return FormKey::Ignored;
    }
    *focus = (*focus).min(fields.len() - 1);
    let name = fields[*focus].name;

    match key.code {
        KeyCode::Esc => FormKey::Cancel,
        KeyCode::Enter => FormKey::Submit,
        KeyCode::Tab | KeyCode::Down => {
            *focus = (*focus + 1) % fields.len();
            FormKey::Handled
        }
        KeyCode::BackTab | KeyCode::Up => {
            *focus = (*focus + fields.len() - 1) % fields.len();
            FormKey::Handled
        }
        KeyCode::Backspace => {
            form.backspace(name);
            FormKey::Handled
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            match form.type_char(name, c) {
                Ok(()) => FormKey::Handled,
                Err(hint) => FormKey::Rejected(hint),
            }
        }
        _ => FormKey::Ignored,
    }
}

fn ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char(k) if k == c)
}

/// Handle key events, returning an optional async command
pub fn handle_key(state: &mut AppState, key: KeyEvent) -> Option<AsyncCommand> {
    // Global shortcuts
    if ctrl(&key, 'c') {
        state.should_quit = true;
        return None;
    }
    if ctrl(&key, 't') {
        state.next_theme();
        return None;
    }
    if key.code == KeyCode::F(1) {
        state.mode = if state.mode == Mode::Help {
            Mode::Normal
        } else {
            Mode::Help
        };
        return None;
    }

    match state.mode {
        Mode::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?')) {
                state.mode = Mode::Normal;
            }
            return None;
        }
        Mode::PathPrompt(purpose) => return handle_path_key(state, purpose, key),
        Mode::Picker => return handle_picker_key(state, key),
        Mode::ChangePassword => return handle_change_password_key(state, key),
        Mode::Normal => {}
    }

    match state.screen {
        Screen::Login => handle_login_key(state, key),
        Screen::Register => {
            let outcome = edit_form(&mut state.register, &mut state.focus, key);
            match form_outcome(state, outcome) {
                FormKey::Submit => state.register.begin_submit().map(AsyncCommand::Register),
                FormKey::Cancel => back_to_login(state),
                _ => None,
            }
        }
        Screen::OtpLogin => {
            if ctrl(&key, 'r') {
                state.otp_login.resend();
                state.focus = 0;
                return None;
            }
            let outcome = edit_form(&mut state.otp_login, &mut state.focus, key);
            match form_outcome(state, outcome) {
                FormKey::Submit => {
                    let call = state.otp_login.begin_submit();
                    state.focus = 0;
                    call.map(AsyncCommand::Otp)
                }
                FormKey::Cancel => back_to_login(state),
                _ => None,
            }
        }
        Screen::VerifyEmail => {
            if ctrl(&key, 'r') {
                state.verify_email.resend();
                state.focus = 0;
                return None;
            }
            let outcome = edit_form(&mut state.verify_email, &mut state.focus, key);
            match form_outcome(state, outcome) {
                FormKey::Submit => {
                    let call = state.verify_email.begin_submit();
                    state.focus = 0;
                    call.map(AsyncCommand::Verify)
                }
                FormKey::Cancel => back_to_login(state),
                _ => None,
            }
        }
        Screen::ResetPassword => {
            let outcome = edit_form(&mut state.reset_password, &mut state.focus, key);
            match form_outcome(state, outcome) {
                FormKey::Submit => {
                    let call = state.reset_password.begin_submit();
                    state.focus = 0;
                    call.map(AsyncCommand::Reset)
                }
                FormKey::Cancel => back_to_login(state),
                _ => None,
            }
        }
        Screen::Throttle => {
            if key.code == KeyCode::Char('q') {
                state.should_quit = true;
            }
            None
        }
        Screen::Dashboard => handle_dashboard_key(state, key),
    }
}

/// Show the hint of a refused keystroke
fn form_outcome(state: &mut AppState, outcome: FormKey) -> FormKey {
    if let FormKey::Rejected(hint) = outcome {
        state.set_status(format!("⚠ {hint}"));
    }
    outcome
}

fn back_to_login(state: &mut AppState) -> Option<AsyncCommand> {
    state.show(Screen::Login);
    None
}

fn handle_login_key(state: &mut AppState, key: KeyEvent) -> Option<AsyncCommand> {
    if ctrl(&key, 'r') {
        state.show(Screen::Register);
        return None;
    }
    if ctrl(&key, 'o') {
        state.show(Screen::OtpLogin);
        return None;
    }
    if ctrl(&key, 'f') {
        state.show(Screen::ResetPassword);
        return None;
    }
    if ctrl(&key, 'v') {
        state.show(Screen::VerifyEmail);
        return None;
    }
    let outcome = edit_form(&mut state.login, &mut state.focus, key);
    match form_outcome(state, outcome) {
        FormKey::Submit => state.login.begin_submit().map(AsyncCommand::Login),
        _ => None,
    }
}

fn handle_path_key(state: &mut AppState, purpose: PathPurpose, key: KeyEvent) -> Option<AsyncCommand> {
    match key.code {
        KeyCode::Esc => {
            state.mode = Mode::Normal;
            state.path_input.clear();
            None
        }
        KeyCode::Enter => {
            let path = state.path_input.trim().to_string();
            state.path_input.clear();
            state.mode = Mode::Normal;
            if path.is_empty() {
                return None;
            }
            let path = expand_home(&path);
            match purpose {
                PathPurpose::Attach => {
                    state.set_status("Reading file...");
                    Some(AsyncCommand::Attach(path))
                }
                PathPurpose::Upload => {
                    state.set_status("Uploading...");
                    Some(AsyncCommand::UploadMedia(path))
                }
            }
        }
        KeyCode::Backspace => {
            state.path_input.pop();
            None
        }
        KeyCode::Char(c) => {
            state.path_input.push(c);
            None
        }
        _ => None,
    }
}

/// `~/x` relative to the home directory
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn handle_picker_key(state: &mut AppState, key: KeyEvent) -> Option<AsyncCommand> {
    match key.code {
        KeyCode::Esc => state.mode = Mode::Normal,
        KeyCode::Down | KeyCode::Char('j') => state.gallery.cursor_next(),
        KeyCode::Up | KeyCode::Char('k') => state.gallery.cursor_prev(),
        KeyCode::Char(' ') => state.gallery.toggle_current(),
        KeyCode::Enter => match state.gallery.confirm() {
            Some(items) => {
                state.set_status(format!("✓ {} file(s) attached", items.len()));
                state.composer.set_gallery_media(items);
                state.mode = Mode::Normal;
            }
            None => state.set_status("⚠ Select at least one file"),
        },
        _ => {}
    }
    None
}

fn handle_change_password_key(state: &mut AppState, key: KeyEvent) -> Option<AsyncCommand> {
    let outcome = edit_form(&mut state.change_password, &mut state.focus, key);
    match form_outcome(state, outcome) {
        FormKey::Submit => state
            .change_password
            .begin_submit()
            .map(AsyncCommand::ChangePassword),
        FormKey::Cancel => {
            state.mode = Mode::Normal;
            None
        }
        _ => None,
    }
}

fn handle_dashboard_key(state: &mut AppState, key: KeyEvent) -> Option<AsyncCommand> {
    match &state.guard.state {
        GuardState::Authorized(_) => {}
        GuardState::Failed(_) if key.code == KeyCode::Char('r') => {
            return Some(AsyncCommand::CheckSession);
        }
        _ => {
            if key.code == KeyCode::Char('q') {
                state.should_quit = true;
            }
            return None;
        }
    }

    if ctrl(&key, 'n') {
        return state.open_tab(state.dashboard.tab.next());
    }
    if ctrl(&key, 'p') {
        return state.open_tab(state.dashboard.tab.prev());
    }
    if ctrl(&key, 'l') {
        state.set_status("Logging out...");
        return Some(AsyncCommand::Logout);
    }

    match state.dashboard.tab {
        DashboardTab::Compose => handle_compose_key(state, key),
        DashboardTab::Pending => handle_status_key(state, StatusKind::Pending, key),
        DashboardTab::Scheduled => handle_status_key(state, StatusKind::Scheduled, key),
        DashboardTab::Sent => handle_status_key(state, StatusKind::Sent, key),
        DashboardTab::Failed => handle_status_key(state, StatusKind::Failed, key),
        DashboardTab::Channels => handle_channels_key(state, key),
        DashboardTab::Media => handle_media_key(state, key),
        DashboardTab::Chat => handle_chat_key(state, key),
        DashboardTab::Profile => handle_profile_key(state, key),
    }
}

/// Tab switching shared by the list tabs
fn handle_tab_switch(state: &mut AppState, key: KeyEvent) -> Option<AsyncCommand> {
    match key.code {
        KeyCode::Tab => state.open_tab(state.dashboard.tab.next()),
        KeyCode::BackTab => state.open_tab(state.dashboard.tab.prev()),
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            DashboardTab::from_index(index).and_then(|tab| state.open_tab(tab))
        }
        KeyCode::Char('q') => {
            state.should_quit = true;
            None
        }
        KeyCode::Char('?') => {
            state.mode = Mode::Help;
            None
        }
        KeyCode::Esc => {
            state.clear_status();
            None
        }
        _ => None,
    }
}

/// Composer focus: 0 text, 1 schedule, 2 channel picker
const COMPOSE_FOCUS: usize = 3;

fn handle_compose_key(state: &mut AppState, key: KeyEvent) -> Option<AsyncCommand> {
    if ctrl(&key, 's') {
        let parts = state.composer.begin_submit()?;
        state.set_status("Sending post...");
        return Some(AsyncCommand::CreatePost(parts));
    }
    if ctrl(&key, 'g') {
        let ids = state.composer.media.gallery_ids();
        state.gallery.open(&ids);
        state.gallery.loading = true;
        state.mode = Mode::Picker;
        return Some(AsyncCommand::LoadMedia);
    }
    if ctrl(&key, 'a') {
        state.mode = Mode::PathPrompt(PathPurpose::Attach);
        return None;
    }
    if ctrl(&key, 'x') {
        state.composer.toggle_media();
        return None;
    }
    if ctrl(&key, 'd') {
        let last = state.composer.media.len().checked_sub(1)?;
        state.composer.remove_media(last);
        return None;
    }

    match key.code {
        KeyCode::Tab => {
            state.focus = (state.focus + 1) % COMPOSE_FOCUS;
            return None;
        }
        KeyCode::BackTab => {
            state.focus = (state.focus + COMPOSE_FOCUS - 1) % COMPOSE_FOCUS;
            return None;
        }
        _ => {}
    }

    match state.focus {
        0 => match key.code {
            KeyCode::Enter => state.composer.content.push('\n'),
            KeyCode::Backspace => state.composer.backspace("content"),
            KeyCode::Char(c) => {
                let _ = state.composer.type_char("content", c);
            }
            _ => {}
        },
        1 => match key.code {
            KeyCode::Enter => {
                let parts = state.composer.begin_submit()?;
                state.set_status("Sending post...");
                return Some(AsyncCommand::CreatePost(parts));
            }
            KeyCode::Backspace => state.composer.backspace("schedule"),
            KeyCode::Char(c) => {
                let _ = state.composer.type_char("schedule", c);
            }
            _ => {}
        },
        _ => {
            let count = state.channels.channels.len();
            match key.code {
                KeyCode::Down | KeyCode::Char('j') if count > 0 => {
                    state.channel_cursor = (state.channel_cursor + 1).min(count - 1);
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    state.channel_cursor = state.channel_cursor.saturating_sub(1);
                }
                KeyCode::Char(' ') | KeyCode::Enter => {
                    if let Some(channel) = state.channels.channels.get(state.channel_cursor) {
                        state.composer.toggle_channel(channel.id);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

fn handle_status_key(state: &mut AppState, kind: StatusKind, key: KeyEvent) -> Option<AsyncCommand> {
    let view = state.status_view_mut(kind);

    if view.pending.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let (action, id) = view.confirm()?;
                return Some(AsyncCommand::PostAction { kind, action, id });
            }
            KeyCode::Char('n') | KeyCode::Esc => view.cancel_pending(),
            _ => {}
        }
        return None;
    }

    let action = match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            view.select_next();
            return None;
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view.select_prev();
            return None;
        }
        KeyCode::Right | KeyCode::Char('l' | ']') => {
            return view.next_page().then(|| state.load_posts(kind));
        }
        KeyCode::Left | KeyCode::Char('h' | '[') => {
            return view.prev_page().then(|| state.load_posts(kind));
        }
        KeyCode::Char('r') => return Some(state.load_posts(kind)),
        KeyCode::Char('o') => {
            let url = view
                .selected_post()
                .and_then(|p| p.attachments.iter().find_map(|a| a.url()))
                .map(str::to_string);
            if let Some(url) = url {
                if let Err(err) = open::that(&url) {
                    warn!(error = %err, url = %url, "could not open attachment");
                }
                state.set_status("✓ Opened in browser");
            }
            return None;
        }
        KeyCode::Char('R') => PostAction::Retry,
        KeyCode::Char('c') => PostAction::Cancel,
        KeyCode::Char('d') => PostAction::Delete,
        _ => return handle_tab_switch(state, key),
    };

    if !kind.actions().contains(&action) {
        state.set_status(format!("⚠ Cannot {} {}", action.label(), kind.title().to_lowercase()));
        return None;
    }
    let (action, id) = state.status_view_mut(kind).request(action)?;
    Some(AsyncCommand::PostAction { kind, action, id })
}

fn handle_channels_key(state: &mut AppState, key: KeyEvent) -> Option<AsyncCommand> {
    if let Some(editor) = state.channels.editor.as_mut() {
        if key.code == KeyCode::Tab {
            editor.toggle_platform();
            return None;
        }
        let outcome = edit_form(editor, &mut state.focus, key);
        return match form_outcome(state, outcome) {
            FormKey::Submit => {
                let (id, draft) = state.channels.editor.as_mut()?.begin_submit()?;
                Some(AsyncCommand::SaveChannel { id, draft })
            }
            FormKey::Cancel => {
                state.channels.close_editor();
                None
            }
            _ => None,
        };
    }

    if state.channels.pending_delete.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let id = state.channels.pending_delete.take()?;
                return Some(AsyncCommand::DeleteChannel(id));
            }
            KeyCode::Char('n') | KeyCode::Esc => state.channels.cancel_delete(),
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Down | KeyCode::Char('j') => state.channels.select_next(),
        KeyCode::Up | KeyCode::Char('k') => state.channels.select_prev(),
        KeyCode::Char('a') => {
            state.focus = 0;
            state.channels.open_create();
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            state.focus = 0;
            state.channels.open_edit();
        }
        KeyCode::Char('d') => state.channels.request_delete(),
        KeyCode::Char('r') => return state.tab_load(DashboardTab::Channels),
        _ => return handle_tab_switch(state, key),
    }
    None
}

fn handle_media_key(state: &mut AppState, key: KeyEvent) -> Option<AsyncCommand> {
    if state.gallery.pending_delete.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let id = state.gallery.pending_delete.take()?;
                return Some(AsyncCommand::DeleteMedia(id));
            }
            KeyCode::Char('n') | KeyCode::Esc => state.gallery.cancel_delete(),
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Down | KeyCode::Char('j') => state.gallery.cursor_next(),
        KeyCode::Up | KeyCode::Char('k') => state.gallery.cursor_prev(),
        KeyCode::Char('u') => {
            if state.gallery.upload.is_some() {
                state.set_status("⚠ An upload is already running");
            } else {
                state.mode = Mode::PathPrompt(PathPurpose::Upload);
            }
        }
        KeyCode::Char('d') => state.gallery.request_delete(),
        KeyCode::Char('o') => {
            if let Some(url) = state.gallery.current().and_then(|m| m.file_url.clone()) {
                if let Err(err) = open::that(&url) {
                    warn!(error = %err, url = %url, "could not open media");
                }
            }
        }
        KeyCode::Char('r') => return state.tab_load(DashboardTab::Media),
        _ => return handle_tab_switch(state, key),
    }
    None
}

fn handle_chat_key(state: &mut AppState, key: KeyEvent) -> Option<AsyncCommand> {
    if let Some(editor) = state.chat.prompt_editor.as_mut() {
        let outcome = edit_form(editor, &mut state.focus, key);
        return match form_outcome(state, outcome) {
            FormKey::Submit => {
                let (id, draft) = state.chat.begin_save_prompt()?;
                Some(AsyncCommand::SavePrompt { id, draft })
            }
            FormKey::Cancel => {
                state.chat.prompt_editor = None;
                None
            }
            _ => None,
        };
    }

    if ctrl(&key, 'a') || ctrl(&key, 'w') {
        state.focus = 0;
        let index = ctrl(&key, 'w').then_some(state.chat.prompt_cursor);
        state.chat.open_prompt_editor(index);
        return None;
    }
    if matches!(key.code, KeyCode::Tab | KeyCode::BackTab | KeyCode::Esc) {
        return handle_tab_switch(state, key);
    }

    let chat = &mut state.chat;
    if ctrl(&key, 'e') {
        chat.start_fresh();
        return None;
    }
    if ctrl(&key, 'x') {
        return chat.current.map(AsyncCommand::DeleteChatSession);
    }
    if ctrl(&key, 'y') {
        let index = chat.prompt_cursor;
        chat.insert_prompt(index);
        return None;
    }
    if ctrl(&key, 'd') {
        return chat
            .prompts
            .get(chat.prompt_cursor)
            .map(|p| AsyncCommand::DeletePrompt(p.id));
    }

    match key.code {
        KeyCode::Enter => chat.begin_send().map(AsyncCommand::SendChat),
        KeyCode::Up | KeyCode::Down => {
            if chat.sessions.is_empty() {
                return None;
            }
            let last = chat.sessions.len() - 1;
            let cursor = if key.code == KeyCode::Up {
                chat.session_cursor.saturating_sub(1)
            } else {
                (chat.session_cursor + 1).min(last)
            };
            let id = chat.sessions[cursor].id;
            if chat.current == Some(id) {
                return None;
            }
            let generation = chat.select(id);
            Some(AsyncCommand::LoadThread { generation, id })
        }
        KeyCode::PageUp => {
            chat.prompt_cursor = chat.prompt_cursor.saturating_sub(1);
            None
        }
        KeyCode::PageDown => {
            if !chat.prompts.is_empty() {
                chat.prompt_cursor = (chat.prompt_cursor + 1).min(chat.prompts.len() - 1);
            }
            None
        }
        KeyCode::Backspace => {
            chat.input.pop();
            None
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            chat.input.push(c);
            None
        }
        _ => None,
    }
}

fn handle_profile_key(state: &mut AppState, key: KeyEvent) -> Option<AsyncCommand> {
    if state.profile.editing {
        let outcome = edit_form(&mut state.profile, &mut state.focus, key);
        return match form_outcome(state, outcome) {
            FormKey::Submit => state.profile.begin_submit().map(AsyncCommand::UpdateProfile),
            FormKey::Cancel => {
                state.profile.cancel();
                None
            }
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('e') => {
            state.focus = 0;
            state.profile.edit();
            None
        }
        KeyCode::Char('p') => {
            state.focus = 0;
            state.change_password = crate::views::ChangePasswordView::new();
            state.mode = Mode::ChangePassword;
            None
        }
        _ => handle_tab_switch(state, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ChannelCache;
    use crate::config::Config;
    use crate::models::User;
    use crate::views::guard::GuardState;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn control(c: char) -> KeyEvent {
        KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..key(KeyCode::Char(c))
        }
    }

    fn state() -> AppState {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        AppState::new(Config::default(), tx, Arc::new(ChannelCache::new()))
    }

    fn type_text(state: &mut AppState, text: &str) {
        for c in text.chars() {
            handle_key(state, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_login_form_submits_after_typing() {
        let mut state = state();
        state.screen = Screen::Login;

        type_text(&mut state, "a@b.co");
        handle_key(&mut state, key(KeyCode::Tab));
        type_text(&mut state, "secret123");
        let cmd = handle_key(&mut state, key(KeyCode::Enter));

        assert!(matches!(cmd, Some(AsyncCommand::Login(_))));
        assert_eq!(state.login.email, "a@b.co");
    }

    #[test]
    fn test_persian_key_in_email_shows_hint() {
        let mut state = state();
        state.screen = Screen::Login;

        handle_key(&mut state, key(KeyCode::Char('س')));

        assert!(state.login.email.is_empty());
        assert!(state.status.contains("English"));
    }

    #[test]
    fn test_compose_without_channel_sends_nothing() {
        let mut state = state();
        state.guard.state = GuardState::Authorized(User::default());
        type_text(&mut state, "hello");

        assert!(handle_key(&mut state, control('s')).is_none());
        assert_eq!(state.composer.content, "hello");
        assert!(state.composer.state.field_error("channels").is_some());
    }

    #[test]
    fn test_unauthorized_dashboard_ignores_keys() {
        let mut state = state();
        assert!(handle_key(&mut state, control('n')).is_none());
        assert_eq!(state.dashboard.tab, DashboardTab::Compose);
    }

    #[test]
    fn test_number_keys_jump_between_list_tabs() {
        let mut state = state();
        state.guard.state = GuardState::Authorized(User::default());
        state.dashboard.tab = DashboardTab::Channels;

        let cmd = handle_key(&mut state, key(KeyCode::Char('5')));

        assert_eq!(state.dashboard.tab, DashboardTab::Failed);
        assert!(matches!(cmd, Some(AsyncCommand::LoadPosts { .. })));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/tmp/a.png"), PathBuf::from("/tmp/a.png"));
    }
}
