//! TUI Application module

mod async_ops;
mod events;
mod state;
mod ui;

pub use state::{AppState, Mode, Screen};

use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};

use crate::cache::ChannelCache;
use crate::config::Config;
use crate::nav::Route;
use crate::session::Session;
use crate::views::FormState;

use async_ops::{AsyncCommand, AsyncHandle, AsyncResult, UploadTarget, spawn_worker};

/// Run the TUI application
pub fn run() -> Result<()> {
    let rt = Runtime::new()?;
    let config = Config::load()?;

    // Session expiry and auth flows navigate through this channel
    let (route_tx, route_rx) = mpsc::unbounded_channel::<Route>();
    let session = Arc::new(Session::open(&config, Arc::new(route_tx.clone()))?);
    let cache = Arc::new(ChannelCache::new());

    let async_handle = rt.block_on(async { spawn_worker(session.clone(), cache.clone()) });

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut state = AppState::new(config, route_tx, cache);
    info!(base_url = %session.base_url(), "tui started");

    let result = run_app(&mut terminal, &mut state, async_handle, route_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = session.persist() {
        warn!(error = %err, "could not save the session");
    }
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    mut async_handle: AsyncHandle,
    mut route_rx: UnboundedReceiver<Route>,
) -> Result<()> {
    let startup = state.startup();
    send_all(state, &async_handle, startup);

    loop {
        // Routes first, so results land on the screen they were meant for
        while let Ok(route) = route_rx.try_recv() {
            let cmds = state.navigate(route);
            send_all(state, &async_handle, cmds);
        }

        while let Ok(result) = async_handle.result_rx.try_recv() {
            let cmds = handle_async_result(state, result);
            send_all(state, &async_handle, cmds);
        }

        terminal.draw(|frame| ui::render(frame, state))?;

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && let Some(cmd) = events::handle_key(state, key)
        {
            send_all(state, &async_handle, vec![cmd]);
        }

        if let Some(cmd) = state.tick() {
            send_all(state, &async_handle, vec![cmd]);
        }

        if state.should_quit {
            let _ = async_handle.cmd_tx.blocking_send(AsyncCommand::Shutdown);
            break;
        }
    }

    state.config.save()?;

    Ok(())
}

fn send_all(state: &mut AppState, handle: &AsyncHandle, cmds: Vec<AsyncCommand>) {
    for cmd in cmds {
        state.loading = true;
        if handle.cmd_tx.blocking_send(cmd).is_err() {
            warn!("async worker stopped");
            state.set_status("⚠ Background worker stopped; restart the app");
        }
    }
}

/// Banner of a finished form, mirrored in the status bar
fn status_from(state: &mut AppState, form: &FormState) {
    match form.banner() {
        Some((msg, false)) => state.set_status(format!("✓ {msg}")),
        Some((msg, true)) => state.set_status(format!("⚠ {msg}")),
        None => {}
    }
}

/// Apply a worker answer; returns follow-up commands
fn handle_async_result(state: &mut AppState, result: AsyncResult) -> Vec<AsyncCommand> {
    if !matches!(
        result,
        AsyncResult::Progress { .. } | AsyncResult::UploadStarted(_)
    ) {
        state.loading = false;
    }

    match result {
        AsyncResult::Session(result) => {
            state.clear_status();
            let user = result.as_ref().ok().cloned();
            state.guard.apply(result, &state.nav);
            let Some(user) = user else {
                return Vec::new();
            };
            state.profile.set_user(user.clone());
            state.dashboard.apply_user(Ok(user), &state.nav);
            state.tab_load(state.dashboard.tab).into_iter().collect()
        }
        AsyncResult::LoggedIn(result) => {
            state.login.finish_submit(result, &state.nav);
            Vec::new()
        }
        AsyncResult::Registered(result) => {
            state.register.finish_submit(result, &state.nav);
            let form = state.register.state.clone();
            status_from(state, &form);
            Vec::new()
        }
        AsyncResult::Otp(result) => {
            state.otp_login.finish_submit(result, &state.nav);
            Vec::new()
        }
        AsyncResult::Verified(result) => {
            state.verify_email.finish_submit(result, &state.nav);
            Vec::new()
        }
        AsyncResult::Reset(result) => {
            state.reset_password.finish_submit(result, &state.nav);
            Vec::new()
        }
        AsyncResult::PasswordChanged(result) => {
            state.change_password.finish_submit(result, &state.nav);
            let form = state.change_password.state.clone();
            status_from(state, &form);
            Vec::new()
        }
        AsyncResult::ProfileUpdated { sent, result } => {
            state.profile.finish_submit(sent, result);
            if let Some(user) = &state.profile.user {
                state.dashboard.user = Some(user.clone());
            }
            let form = state.profile.state.clone();
            status_from(state, &form);
            Vec::new()
        }
        AsyncResult::LoggedOut(result) => {
            state.dashboard.finish_logout(result, &state.nav);
            Vec::new()
        }

        AsyncResult::Channels(result) => {
            state.channels.apply_list(result, &state.cache);
            let count = state.channels.channels.len();
            state.channel_cursor = state.channel_cursor.min(count.saturating_sub(1));
            Vec::new()
        }
        AsyncResult::ChannelSaved(result) => {
            state.channels.finish_save(result, &state.cache);
            Vec::new()
        }
        AsyncResult::ChannelDeleted { id, result } => {
            state.channels.finish_delete(id, result, &state.cache);
            Vec::new()
        }

        AsyncResult::Posts { kind, result } => {
            state.status_view_mut(kind).apply_page(result);
            Vec::new()
        }
        AsyncResult::PostActionDone {
            kind,
            action,
            id,
            result,
        } => {
            let view = state.status_view_mut(kind);
            view.finish_action(action, id, result);
            if let Some(notice) = view.notice.clone() {
                state.set_status(notice);
            }
            Vec::new()
        }
        AsyncResult::PostCreated(result) => {
            state.composer.finish_submit(result);
            let form = state.composer.state.clone();
            status_from(state, &form);
            Vec::new()
        }
        AsyncResult::Attached(result) => {
            match result {
                Ok(file) => {
                    state.set_status(format!("✓ Attached {}", file.file_name));
                    state.composer.add_file(file);
                }
                Err(err) => state.set_status(format!("⚠ {}", err.user_message("Could not read the file"))),
            }
            Vec::new()
        }

        AsyncResult::Media { list, storage } => {
            state.gallery.apply_list(list);
            state.gallery.apply_storage(storage);
            Vec::new()
        }
        AsyncResult::UploadStarted(file) => {
            state.gallery.begin_upload(&file);
            Vec::new()
        }
        AsyncResult::Progress {
            target: UploadTarget::Gallery,
            sent,
            total,
        } => {
            state.gallery.set_progress(sent, total);
            Vec::new()
        }
        AsyncResult::Progress {
            target: UploadTarget::Post,
            sent,
            total,
        } => {
            let percent = sent.saturating_mul(100).checked_div(total).unwrap_or(100);
            state.set_status(format!("Uploading post... {percent}%"));
            Vec::new()
        }
        AsyncResult::MediaUploaded(result) => {
            let uploaded = result.is_ok();
            state.gallery.finish_upload(result);
            if uploaded {
                state.set_status("✓ Upload complete");
                state.gallery.loading = true;
                vec![AsyncCommand::LoadMedia]
            } else {
                Vec::new()
            }
        }
        AsyncResult::MediaDeleted { id, result } => {
            state.gallery.finish_delete(id, result);
            Vec::new()
        }

        AsyncResult::ChatSessions(result) => match state.chat.apply_sessions(result) {
            Some(id) => {
                let generation = state.chat.select(id);
                vec![AsyncCommand::LoadThread { generation, id }]
            }
            None => Vec::new(),
        },
        AsyncResult::Thread { generation, result } => {
            state.chat.apply_thread(generation, result);
            Vec::new()
        }
        AsyncResult::ChatReplied { plan, outcome } => {
            state.chat.finish_send(&plan, outcome);
            Vec::new()
        }
        AsyncResult::ChatSessionDeleted { id, result } => {
            state.chat.finish_delete_session(id, result);
            Vec::new()
        }
        AsyncResult::Prompts(result) => {
            state.chat.apply_prompts(result);
            Vec::new()
        }
        AsyncResult::PromptSaved(result) => {
            state.chat.finish_save_prompt(result);
            Vec::new()
        }
        AsyncResult::PromptDeleted { id, result } => {
            state.chat.finish_delete_prompt(id, result);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::User;
    use crate::views::DashboardTab;
    use serde_json::json;

    fn state() -> (AppState, UnboundedReceiver<Route>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            AppState::new(Config::default(), tx, Arc::new(ChannelCache::new())),
            rx,
        )
    }

    fn verified_user() -> User {
        serde_json::from_value(json!({
            "id": 1,
            "email": "a@b.co",
            "first_name": "Sara",
            "is_verified": true
        }))
        .unwrap()
    }

    #[test]
    fn test_session_result_loads_current_tab() {
        let (mut state, mut rx) = state();
        state.dashboard.tab = DashboardTab::Media;

        let cmds = handle_async_result(&mut state, AsyncResult::Session(Ok(verified_user())));

        assert!(state.guard.is_authorized());
        assert!(state.profile.user.is_some());
        assert!(matches!(cmds.as_slice(), [AsyncCommand::LoadMedia]));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_anonymous_session_goes_to_login() {
        let (mut state, mut rx) = state();
        let err = ApiError::Status {
            status: 401,
            body: json!({"detail": "Authentication credentials were not provided."}),
        };

        let cmds = handle_async_result(&mut state, AsyncResult::Session(Err(err)));

        assert!(cmds.is_empty());
        assert!(matches!(rx.try_recv(), Ok(Route::Login)));
    }

    #[test]
    fn test_post_upload_progress_shows_in_status() {
        let (mut state, _rx) = state();
        handle_async_result(
            &mut state,
            AsyncResult::Progress {
                target: UploadTarget::Post,
                sent: 50,
                total: 200,
            },
        );
        assert_eq!(state.status, "Uploading post... 25%");
    }
}
