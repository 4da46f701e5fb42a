//! UI rendering for the TUI

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};
use unicode_width::UnicodeWidthStr;

use super::state::{AppState, Mode, PathPurpose, Screen};
use crate::models::MessageRole;
use crate::theme::ThemeColors;
use crate::views::status::PostAction;
use crate::views::{DashboardTab, Form, GuardState, StatusKind};

/// App icon
const ICON: &str = "📮";

/// Spinner animation frames
const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Main render function
pub fn render(frame: &mut Frame, state: &AppState) {
    let colors = state.theme.colors();

    let area = frame.area();
    let bg_block = Block::default().style(Style::default().bg(colors.bg));
    frame.render_widget(bg_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header(frame, state, &colors, chunks[0]);
    match state.screen {
        Screen::Dashboard => render_dashboard(frame, state, &colors, chunks[1]),
        Screen::Throttle => render_throttle(frame, state, &colors, chunks[1]),
        _ => render_auth(frame, state, &colors, chunks[1]),
    }
    render_status_bar(frame, state, &colors, chunks[2]);

    match state.mode {
        Mode::Help => render_help_popup(frame, &colors),
        Mode::PathPrompt(purpose) => render_path_prompt(frame, state, &colors, purpose),
        Mode::Picker => render_picker(frame, state, &colors),
        Mode::ChangePassword => {
            let popup = centered_rect(60, 60, frame.area());
            frame.render_widget(Clear, popup);
            render_form(frame, &colors, &state.change_password, state.focus, popup);
        }
        Mode::Normal => {}
    }
}

fn rounded(colors: &ThemeColors) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(colors.block())
}

fn render_header(frame: &mut Frame, state: &AppState, colors: &ThemeColors, area: Rect) {
    let block = rounded(colors)
        .title(format!(" {ICON} Chapar "))
        .title_style(colors.logo());

    if state.screen != Screen::Dashboard || !state.guard.is_authorized() {
        let title = match state.screen {
            Screen::Login => "Log in",
            Screen::Register => "Create account",
            Screen::OtpLogin => "Log in with a code",
            Screen::VerifyEmail => "Verify email",
            Screen::ResetPassword => "Reset password",
            Screen::Throttle => "Slow down",
            Screen::Dashboard => "Dashboard",
        };
        let header = Paragraph::new(Line::styled(format!(" {title}"), colors.text_primary())).block(block);
        frame.render_widget(header, area);
        return;
    }

    let titles: Vec<Line> = DashboardTab::all()
        .iter()
        .enumerate()
        .map(|(i, tab)| Line::from(format!("{} {}", i + 1, tab.title())))
        .collect();

    let tabs = Tabs::new(titles)
        .block(block.title_top(
            Line::styled(format!(" {} ", state.dashboard.greeting()), colors.text_muted())
                .alignment(Alignment::Right),
        ))
        .select(state.dashboard.tab.index())
        .style(colors.tab())
        .highlight_style(colors.tab_active())
        .divider(Span::styled(" │ ", colors.text_muted()));

    frame.render_widget(tabs, area);
}

/// Draw any form: banner, one box per field, hint underneath
fn render_form(frame: &mut Frame, colors: &ThemeColors, form: &dyn Form, focus: usize, area: Rect) {
    let block = rounded(colors)
        .border_style(colors.block_focus())
        .title(format!(" {} ", form.title()))
        .title_style(colors.text_primary())
        .style(Style::default().bg(colors.bg));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let fields = form.fields();
    let mut constraints = vec![Constraint::Length(2)];
    constraints.extend(fields.iter().map(|_| Constraint::Length(3)));
    constraints.push(Constraint::Min(0));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(1)
        .constraints(constraints)
        .split(inner);

    let banner = match form.state().banner() {
        Some((msg, false)) => Line::styled(format!("✓ {msg}"), colors.text_success()),
        Some((msg, true)) => Line::styled(format!("⚠ {msg}"), colors.text_error()),
        None if form.state().is_submitting() => Line::styled("Sending...", colors.text_muted()),
        None => Line::default(),
    };
    frame.render_widget(Paragraph::new(banner).wrap(Wrap { trim: true }), chunks[0]);

    for (i, field) in fields.iter().enumerate() {
        let area = chunks[i + 1];
        let value = form.value(field.name);
        let shown = if field.secret {
            "•".repeat(value.chars().count())
        } else {
            value.to_string()
        };
        let focused = i == focus;
        let error = form.state().field_error(field.name);

        let mut block = rounded(colors)
            .border_style(if focused { colors.block_focus() } else { colors.block() })
            .title(Span::styled(
                format!(" {} ", field.label),
                if error.is_some() { colors.text_error() } else { colors.text_muted() },
            ));
        if let Some(err) = error {
            block = block.title_bottom(Line::styled(format!(" {err} "), colors.text_error()));
        }

        let width = u16::try_from(shown.width()).unwrap_or(u16::MAX);
        frame.render_widget(Paragraph::new(shown).style(colors.text()).block(block), area);
        if focused {
            let x = area.x.saturating_add(1).saturating_add(width);
            frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
        }
    }

    if let Some(hint) = form.hint() {
        let hint = Paragraph::new(hint)
            .style(colors.text_muted())
            .wrap(Wrap { trim: true });
        frame.render_widget(hint, chunks[fields.len() + 1]);
    }
}

fn render_auth(frame: &mut Frame, state: &AppState, colors: &ThemeColors, area: Rect) {
    let form: &dyn Form = match state.screen {
        Screen::Register => &state.register,
        Screen::OtpLogin => &state.otp_login,
        Screen::VerifyEmail => &state.verify_email,
        Screen::ResetPassword => &state.reset_password,
        _ => &state.login,
    };
    let keys: &[(&str, &str)] = match state.screen {
        Screen::Register | Screen::ResetPassword => &[("Enter", "continue"), ("Esc", "back")],
        Screen::OtpLogin | Screen::VerifyEmail => {
            &[("Enter", "continue"), ("Ctrl+R", "new code"), ("Esc", "back")]
        }
        _ => &[
            ("Enter", "log in"),
            ("Ctrl+R", "register"),
            ("Ctrl+O", "code login"),
            ("Ctrl+F", "forgot password"),
            ("Ctrl+V", "verify email"),
        ],
    };

    let height = u16::try_from(form.fields().len() * 3 + 7).unwrap_or(u16::MAX);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(60),
            Constraint::Percentage(20),
        ])
        .split(chunks[1]);

    render_form(frame, colors, form, state.focus, columns[1]);
    frame.render_widget(
        Paragraph::new(key_line(colors, keys)).alignment(Alignment::Center),
        chunks[2],
    );
}

fn key_line<'a>(colors: &ThemeColors, keys: &[(&'a str, &'a str)]) -> Line<'a> {
    let mut spans = Vec::with_capacity(keys.len() * 2);
    for (key, action) in keys {
        spans.push(Span::styled(*key, colors.key_hint()));
        spans.push(Span::styled(format!(": {action}  "), colors.text_muted()));
    }
    Line::from(spans)
}

fn render_throttle(frame: &mut Frame, state: &AppState, colors: &ThemeColors, area: Rect) {
    let popup = centered_rect(60, 40, area);
    let block = rounded(colors)
        .title(" ⏳ Too many requests ")
        .title_style(colors.text_warning());
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(3), Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let text = Paragraph::new(vec![
        Line::styled("The server asked us to wait before trying again.", colors.text()),
        Line::styled(
            format!("You can continue in {}", state.throttle.remaining()),
            colors.text_muted(),
        ),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    frame.render_widget(text, chunks[0]);

    let gauge = Gauge::default()
        .gauge_style(colors.gauge(false))
        .percent(state.throttle.percent().min(100))
        .label(state.throttle.remaining());
    frame.render_widget(gauge, chunks[1]);
}

fn render_dashboard(frame: &mut Frame, state: &AppState, colors: &ThemeColors, area: Rect) {
    let message = match &state.guard.state {
        GuardState::Authorized(_) => None,
        GuardState::Loading => Some(Line::styled("Checking your session...", colors.text_muted())),
        GuardState::Redirected => Some(Line::styled("Redirecting to login...", colors.text_muted())),
        GuardState::Failed(err) => Some(Line::from(vec![
            Span::styled(format!("⚠ {err}  "), colors.text_error()),
            Span::styled("r", colors.key_hint()),
            Span::styled(": retry", colors.text_muted()),
        ])),
    };
    if let Some(message) = message {
        let paragraph = Paragraph::new(message).alignment(Alignment::Center);
        frame.render_widget(paragraph, centered_rect(80, 20, area));
        return;
    }

    match state.dashboard.tab {
        DashboardTab::Compose => render_compose(frame, state, colors, area),
        DashboardTab::Pending => render_status_list(frame, state, colors, StatusKind::Pending, area),
        DashboardTab::Scheduled => {
            render_status_list(frame, state, colors, StatusKind::Scheduled, area);
        }
        DashboardTab::Sent => render_status_list(frame, state, colors, StatusKind::Sent, area),
        DashboardTab::Failed => render_status_list(frame, state, colors, StatusKind::Failed, area),
        DashboardTab::Channels => render_channels(frame, state, colors, area),
        DashboardTab::Media => render_media(frame, state, colors, area),
        DashboardTab::Chat => render_chat(frame, state, colors, area),
        DashboardTab::Profile => render_profile(frame, state, colors, area),
    }
}

fn render_compose(frame: &mut Frame, state: &AppState, colors: &ThemeColors, area: Rect) {
    let composer = &state.composer;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Banner
            Constraint::Min(5),    // Text
            Constraint::Length(3), // Schedule
            Constraint::Length(1), // Schedule preview
            Constraint::Length(5), // Media
        ])
        .split(columns[0]);

    let banner = match composer.state.banner() {
        Some((msg, false)) => Line::styled(format!(" ✓ {msg}"), colors.text_success()),
        Some((msg, true)) => Line::styled(format!(" ⚠ {msg}"), colors.text_error()),
        None if composer.state.is_submitting() => Line::styled(" Sending...", colors.text_muted()),
        None => Line::default(),
    };
    frame.render_widget(Paragraph::new(banner), left[0]);

    let field_block = |title: String, field: &str, focused: bool| {
        let mut block = rounded(colors)
            .border_style(if focused { colors.block_focus() } else { colors.block() })
            .title(Span::styled(title, colors.text_muted()));
        if let Some(err) = composer.state.field_error(field) {
            block = block.title_bottom(Line::styled(format!(" {err} "), colors.text_error()));
        }
        block
    };

    let count = composer.content.chars().count();
    let text = Paragraph::new(composer.content.as_str())
        .style(colors.text())
        .wrap(Wrap { trim: false })
        .block(field_block(format!(" Text ({count}) "), "content", state.focus == 0));
    frame.render_widget(text, left[1]);

    let schedule = Paragraph::new(composer.schedule.as_str())
        .style(colors.text())
        .block(field_block(
            " Send at (YYYY-MM-DD HH:MM, +2h, empty = now) ".to_string(),
            "schedule",
            state.focus == 1,
        ));
    frame.render_widget(schedule, left[2]);
    if state.focus == 1 {
        let width = u16::try_from(composer.schedule.width()).unwrap_or(0);
        frame.set_cursor_position((left[2].x + 1 + width, left[2].y + 1));
    }

    if let Some(preview) = composer.hint() {
        frame.render_widget(
            Paragraph::new(Line::styled(format!(" {preview}"), colors.text_muted())),
            left[3],
        );
    }

    let media_title = if composer.has_media {
        format!(" Media ({}) ", composer.media.len())
    } else {
        " Media: off ".to_string()
    };
    let media_lines: Vec<Line> = if composer.has_media && composer.media.is_empty() {
        vec![Line::styled("Ctrl+G gallery · Ctrl+A file from disk", colors.text_muted())]
    } else {
        composer
            .media
            .labels()
            .into_iter()
            .map(|label| Line::styled(label, colors.text()))
            .collect()
    };
    frame.render_widget(
        Paragraph::new(media_lines).block(field_block(media_title, "media", false)),
        left[4],
    );

    // Channel picker
    let items: Vec<ListItem> = state
        .channels
        .channels
        .iter()
        .map(|channel| {
            let mark = if composer.is_selected(channel.id) { "[x]" } else { "[ ]" };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{mark} "), colors.text_primary()),
                Span::styled(channel.label(), colors.platform(channel.platform)),
            ]))
        })
        .collect();
    let mut list_state = ListState::default();
    if state.focus == 2 {
        list_state.select(Some(state.channel_cursor));
    }
    let empty = items.is_empty();
    let list = List::new(items)
        .block(field_block(" Channels (Space) ".to_string(), "channels", state.focus == 2))
        .highlight_style(colors.selected());
    frame.render_stateful_widget(list, columns[1], &mut list_state);
    if empty {
        let hint = if state.channels.loading { "Loading..." } else { "No channels yet" };
        frame.render_widget(
            Paragraph::new(Line::styled(hint, colors.text_muted())).alignment(Alignment::Center),
            centered_rect(90, 20, columns[1]),
        );
    }
}

fn render_status_list(
    frame: &mut Frame,
    state: &AppState,
    colors: &ThemeColors,
    kind: StatusKind,
    area: Rect,
) {
    let view = state.status_view(kind);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let items: Vec<ListItem> = view
        .posts
        .iter()
        .map(|post| {
            let first_line = post.text().lines().next().unwrap_or_default().to_string();
            let when = post
                .scheduled_time_display()
                .map(|at| match post.time_until() {
                    Some(left) if kind == StatusKind::Scheduled => format!("{at} (in {left})"),
                    _ => at,
                })
                .or_else(|| post.sent_at.map(|t| t.format("%Y-%m-%d %H:%M").to_string()))
                .unwrap_or_default();
            let mut lines = vec![
                Line::from(vec![
                    Span::styled(format!("{} ", post.status.emoji()), colors.status(post.status)),
                    Span::styled(format!("#{} ", post.id), colors.text_muted()),
                    Span::styled(first_line, colors.text()),
                ]),
                Line::from(vec![
                    Span::styled("   → ", colors.text_muted()),
                    Span::styled(state.cache.labels(&post.channels).join(", "), colors.text_primary()),
                    Span::styled(format!("  {when}"), colors.text_muted()),
                    Span::styled(
                        if post.attachments.is_empty() {
                            String::new()
                        } else {
                            format!("  📎 {}", post.attachments.len())
                        },
                        colors.text_muted(),
                    ),
                ]),
            ];
            if let Some(err) = &post.error_message {
                lines.push(Line::styled(format!("   ⚠ {err}"), colors.text_error()));
            }
            ListItem::new(lines)
        })
        .collect();

    let title = format!(" {} ", kind.title());
    let block = rounded(colors).title(title).title_style(colors.text_primary());
    if items.is_empty() {
        let msg = if view.loading {
            Line::styled("Loading...", colors.text_muted())
        } else if let Some(err) = &view.error {
            Line::styled(format!("⚠ {err}"), colors.text_error())
        } else {
            Line::styled("Nothing here", colors.text_muted())
        };
        frame.render_widget(Paragraph::new(msg).alignment(Alignment::Center).block(block), chunks[0]);
    } else {
        let mut list_state = ListState::default().with_selected(Some(view.selected));
        let list = List::new(items)
            .block(block)
            .highlight_style(colors.selected())
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, chunks[0], &mut list_state);
    }

    let footer = if let Some((action, id)) = view.pending {
        Line::from(vec![
            Span::styled(format!(" {} post #{id}? ", action.label()), colors.text_warning()),
            Span::styled("y", colors.key_hint()),
            Span::styled("/", colors.text_muted()),
            Span::styled("n", colors.key_hint()),
        ])
    } else {
        let mut spans = vec![Span::styled(
            format!(" Page {}/{}  ", view.page, view.total_pages.max(1)),
            colors.text_muted(),
        )];
        if view.hidden > 0 {
            let other = match kind {
                StatusKind::Scheduled => "pending",
                _ => "scheduled",
            };
            spans.push(Span::styled(
                format!("({} {other} on this page)  ", view.hidden),
                colors.text_muted(),
            ));
        }
        spans.extend(key_line(colors, &[("←/→", "page"), ("r", "reload"), ("o", "open")]).spans);
        for action in kind.actions() {
            let key = match action {
                PostAction::Retry => "R",
                PostAction::Cancel => "c",
                PostAction::Delete => "d",
            };
            spans.push(Span::styled(key, colors.key_hint()));
            spans.push(Span::styled(format!(": {}  ", action.label()), colors.text_muted()));
        }
        Line::from(spans)
    };
    frame.render_widget(Paragraph::new(footer), chunks[1]);
}

fn render_channels(frame: &mut Frame, state: &AppState, colors: &ThemeColors, area: Rect) {
    let view = &state.channels;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let items: Vec<ListItem> = view
        .channels
        .iter()
        .map(|channel| {
            let mut spans = vec![
                Span::styled(channel.label(), colors.platform(channel.platform)),
                if channel.is_verified {
                    Span::styled("  ✓ verified", colors.text_success())
                } else {
                    Span::styled("  ✗ unverified", colors.text_warning())
                },
            ];
            if let Some(reason) = &channel.failed_reason {
                spans.push(Span::styled(format!("  {reason}"), colors.text_error()));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let block = rounded(colors).title(" Channels ").title_style(colors.text_primary());
    if items.is_empty() {
        let msg = match (&view.error, view.loading) {
            (_, true) => Line::styled("Loading...", colors.text_muted()),
            (Some(err), _) => Line::styled(format!("⚠ {err}"), colors.text_error()),
            _ => Line::styled("No channels yet, press a to add one", colors.text_muted()),
        };
        frame.render_widget(Paragraph::new(msg).alignment(Alignment::Center).block(block), chunks[0]);
    } else {
        let mut list_state = ListState::default().with_selected(Some(view.selected));
        let list = List::new(items)
            .block(block)
            .highlight_style(colors.selected())
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, chunks[0], &mut list_state);
    }

    let footer = match view.pending_delete {
        Some(id) => {
            let name = view
                .channels
                .iter()
                .find(|c| c.id == id)
                .map_or_else(|| format!("#{id}"), |c| c.name.clone());
            Line::from(vec![
                Span::styled(format!(" Delete channel {name}? "), colors.text_warning()),
                Span::styled("y", colors.key_hint()),
                Span::styled("/", colors.text_muted()),
                Span::styled("n", colors.key_hint()),
            ])
        }
        None => key_line(colors, &[("a", "add"), ("e", "edit"), ("d", "delete"), ("r", "reload")]),
    };
    frame.render_widget(Paragraph::new(footer), chunks[1]);

    if let Some(editor) = &view.editor {
        let popup = centered_rect(60, 60, area);
        frame.render_widget(Clear, popup);
        render_form(frame, colors, editor, state.focus, popup);
    }
}

fn render_media(frame: &mut Frame, state: &AppState, colors: &ThemeColors, area: Rect) {
    let gallery = &state.gallery;
    let upload_height = if gallery.upload.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(upload_height),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    if let Some(storage) = &gallery.storage {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = storage.percent().round().clamp(0.0, 100.0) as u16;
        let gauge = Gauge::default()
            .block(rounded(colors).title(" Storage "))
            .gauge_style(colors.gauge(gallery.storage_danger()))
            .percent(percent)
            .label(format!(
                "{:.1} / {:.1} MB ({percent}%)",
                storage.used_space_mb, storage.total_space_mb
            ));
        frame.render_widget(gauge, chunks[0]);
    } else {
        frame.render_widget(
            Paragraph::new(Line::styled("Storage: -", colors.text_muted())).block(rounded(colors)),
            chunks[0],
        );
    }

    if let Some(upload) = &gallery.upload {
        let gauge = Gauge::default()
            .block(rounded(colors).title(format!(" Uploading {} ", upload.file_name)))
            .gauge_style(colors.gauge(false))
            .percent(upload.percent());
        frame.render_widget(gauge, chunks[1]);
    }

    render_media_list(frame, state, colors, chunks[2], false);

    let footer = match gallery.pending_delete {
        Some(id) => Line::from(vec![
            Span::styled(format!(" Delete media #{id}? "), colors.text_warning()),
            Span::styled("y", colors.key_hint()),
            Span::styled("/", colors.text_muted()),
            Span::styled("n", colors.key_hint()),
        ]),
        None => key_line(colors, &[("u", "upload"), ("d", "delete"), ("o", "open"), ("r", "reload")]),
    };
    frame.render_widget(Paragraph::new(footer), chunks[3]);
}

fn render_media_list(frame: &mut Frame, state: &AppState, colors: &ThemeColors, area: Rect, picking: bool) {
    let gallery = &state.gallery;
    let items: Vec<ListItem> = gallery
        .items
        .iter()
        .map(|item| {
            let mut spans = Vec::new();
            if picking {
                let mark = if gallery.is_selected(item.id) { "[x] " } else { "[ ] " };
                spans.push(Span::styled(mark, colors.text_primary()));
            }
            spans.push(Span::styled(
                format!("{} {}", item.media_type.emoji(), item.title),
                colors.text(),
            ));
            spans.push(Span::styled(format!("  {}", item.size_display()), colors.text_muted()));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = if picking {
        format!(" Pick media ({} selected) ", gallery.selection.len())
    } else {
        " Media ".to_string()
    };
    let block = rounded(colors)
        .title(title)
        .title_style(colors.text_primary())
        .style(Style::default().bg(colors.bg));

    if items.is_empty() {
        let msg = match (&gallery.error, gallery.loading) {
            (_, true) => Line::styled("Loading...", colors.text_muted()),
            (Some(err), _) => Line::styled(format!("⚠ {err}"), colors.text_error()),
            _ => Line::styled("No media yet", colors.text_muted()),
        };
        frame.render_widget(Paragraph::new(msg).alignment(Alignment::Center).block(block), area);
        return;
    }

    let mut list_state = ListState::default().with_selected(Some(gallery.cursor));
    let list = List::new(items)
        .block(block)
        .highlight_style(colors.selected())
        .highlight_symbol("▶ ");
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_picker(frame: &mut Frame, state: &AppState, colors: &ThemeColors) {
    let popup = centered_rect(60, 70, frame.area());
    frame.render_widget(Clear, popup);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(popup);
    render_media_list(frame, state, colors, chunks[0], true);
    frame.render_widget(
        Paragraph::new(key_line(colors, &[("Space", "toggle"), ("Enter", "attach"), ("Esc", "cancel")]))
            .style(Style::default().bg(colors.bg_secondary)),
        chunks[1],
    );
}

fn render_chat(frame: &mut Frame, state: &AppState, colors: &ThemeColors, area: Rect) {
    let chat = &state.chat;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
        .split(area);
    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[0]);
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3), Constraint::Length(1)])
        .split(columns[1]);

    // Sessions
    let sessions: Vec<ListItem> = chat
        .sessions
        .iter()
        .map(|s| {
            let style = if chat.current == Some(s.id) {
                colors.text_primary().add_modifier(Modifier::BOLD)
            } else {
                colors.text()
            };
            ListItem::new(Line::styled(s.title.clone(), style))
        })
        .collect();
    let mut session_state = ListState::default();
    if !sessions.is_empty() {
        session_state.select(Some(chat.session_cursor));
    }
    frame.render_stateful_widget(
        List::new(sessions)
            .block(rounded(colors).title(" Chats "))
            .highlight_style(colors.selected()),
        sidebar[0],
        &mut session_state,
    );

    // Saved prompts
    let prompts: Vec<ListItem> = chat
        .prompts
        .iter()
        .map(|p| ListItem::new(Line::styled(p.title.clone(), colors.text())))
        .collect();
    let mut prompt_state = ListState::default();
    if !prompts.is_empty() {
        prompt_state.select(Some(chat.prompt_cursor));
    }
    frame.render_stateful_widget(
        List::new(prompts)
            .block(rounded(colors).title(" Prompts "))
            .highlight_style(colors.selected())
            .highlight_symbol("› "),
        sidebar[1],
        &mut prompt_state,
    );

    // Thread
    let width = usize::from(main[0].width.saturating_sub(4)).max(10);
    let mut lines: Vec<Line> = Vec::new();
    for message in &chat.messages {
        let alignment = if message.role == MessageRole::User {
            Alignment::Right
        } else {
            Alignment::Left
        };
        lines.push(Line::styled(message.role.label(), colors.bubble(message.role)).alignment(alignment));
        for row in textwrap::wrap(&message.content, width * 3 / 4) {
            lines.push(Line::styled(row.into_owned(), colors.text()).alignment(alignment));
        }
        lines.push(Line::default());
    }
    if chat.sending {
        let spin = SPINNER[(state.current_tick() / 2) as usize % SPINNER.len()];
        lines.push(Line::styled(format!("{spin} thinking..."), colors.text_muted()));
    }
    if lines.is_empty() {
        lines.push(Line::styled("Start a new conversation", colors.text_muted()));
    }
    let visible = usize::from(main[0].height.saturating_sub(2));
    let scroll = u16::try_from(lines.len().saturating_sub(visible)).unwrap_or(u16::MAX);
    let title = chat
        .current_session()
        .map_or_else(|| " New chat ".to_string(), |s| format!(" {} ", s.title));
    let mut block = rounded(colors).title(title).title_style(colors.text_primary());
    if let Some(err) = &chat.error {
        block = block.title_bottom(Line::styled(format!(" ⚠ {err} "), colors.text_error()));
    }
    frame.render_widget(Paragraph::new(lines).block(block).scroll((scroll, 0)), main[0]);

    // Input
    let input = Paragraph::new(chat.input.as_str())
        .style(colors.text())
        .block(rounded(colors).border_style(colors.block_focus()).title(" Message "));
    frame.render_widget(input, main[1]);
    if chat.prompt_editor.is_none() {
        let x = u16::try_from(chat.input.width()).unwrap_or(0);
        let x = (main[1].x + 1 + x).min(main[1].right().saturating_sub(2));
        frame.set_cursor_position((x, main[1].y + 1));
    }

    frame.render_widget(
        Paragraph::new(key_line(
            colors,
            &[
                ("Enter", "send"),
                ("↑/↓", "chats"),
                ("Ctrl+E", "new"),
                ("Ctrl+X", "delete"),
                ("PgUp/PgDn", "prompts"),
                ("Ctrl+Y", "insert"),
                ("Ctrl+A/W/D", "add/edit/delete prompt"),
            ],
        )),
        main[2],
    );

    if let Some(editor) = &chat.prompt_editor {
        let popup = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup);
        render_form(frame, colors, editor, state.focus, popup);
    }
}

fn render_profile(frame: &mut Frame, state: &AppState, colors: &ThemeColors, area: Rect) {
    let profile = &state.profile;
    let popup = centered_rect(60, 80, area);
    if profile.editing {
        render_form(frame, colors, profile, state.focus, popup);
        return;
    }

    let Some(user) = &profile.user else {
        frame.render_widget(
            Paragraph::new(Line::styled("Loading...", colors.text_muted())).alignment(Alignment::Center),
            popup,
        );
        return;
    };

    let row = |label: &'static str, value: Option<&str>| {
        Line::from(vec![
            Span::styled(format!("  {label:<12}"), colors.text_muted()),
            Span::styled(value.unwrap_or("-").to_string(), colors.text()),
        ])
    };
    let verified = match user.is_verified {
        Some(true) => Span::styled("✓ verified", colors.text_success()),
        Some(false) => Span::styled("✗ not verified", colors.text_warning()),
        None => Span::styled("-", colors.text_muted()),
    };
    let mut lines = vec![
        Line::default(),
        row("First name", user.first_name.as_deref()),
        row("Last name", user.last_name.as_deref()),
        row("Phone", user.phone.as_deref()),
        row("Email", user.email.as_deref()),
        Line::from(vec![Span::styled(format!("  {:<12}", "Status"), colors.text_muted()), verified]),
        Line::default(),
    ];
    if let Some((msg, is_error)) = profile.state.banner() {
        let style = if is_error { colors.text_error() } else { colors.text_success() };
        lines.push(Line::styled(format!("  {msg}"), style));
        lines.push(Line::default());
    }
    lines.push(key_line(colors, &[("e", "edit"), ("p", "change password"), ("Ctrl+L", "log out")]));

    let block = rounded(colors)
        .title(format!(" {} ", user.display_name()))
        .title_style(colors.text_primary());
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn render_status_bar(frame: &mut Frame, state: &AppState, colors: &ThemeColors, area: Rect) {
    let loading_indicator = if state.loading {
        let frame_idx = (state.current_tick() / 2) as usize % SPINNER.len();
        format!("{} ", SPINNER[frame_idx])
    } else {
        String::new()
    };

    let mut content = vec![
        Span::styled(" ", Style::default()),
        Span::styled(loading_indicator, colors.text_primary()),
    ];
    if state.status.is_empty() {
        let keys: &[(&str, &str)] = if state.screen == Screen::Dashboard {
            &[
                ("Tab/1-9", "tabs"),
                ("F1", "help"),
                ("Ctrl+T", "theme"),
                ("Ctrl+L", "log out"),
                ("Ctrl+C", "quit"),
            ]
        } else {
            &[("F1", "help"), ("Ctrl+T", "theme"), ("Ctrl+C", "quit")]
        };
        content.extend(key_line(colors, keys).spans);
    } else {
        let style = if state.status.starts_with('⚠') {
            colors.text_error()
        } else {
            colors.text()
        };
        content.push(Span::styled(state.status.as_str(), style));
    }

    let status = Paragraph::new(Line::from(content)).style(Style::default().bg(colors.bg_secondary));
    frame.render_widget(status, area);
}

fn render_path_prompt(frame: &mut Frame, state: &AppState, colors: &ThemeColors, purpose: PathPurpose) {
    let area = frame.area();
    let popup = Rect {
        height: 3.min(area.height),
        ..centered_rect(60, 10, area)
    };
    let title = match purpose {
        PathPurpose::Attach => " Attach file (path) ",
        PathPurpose::Upload => " Upload to gallery (path) ",
    };
    frame.render_widget(Clear, popup);
    let input = Paragraph::new(state.path_input.as_str())
        .style(colors.text())
        .block(
            rounded(colors)
                .border_style(colors.block_focus())
                .title(title)
                .title_bottom(Line::styled(" Enter: ok  Esc: cancel ", colors.text_muted()))
                .style(Style::default().bg(colors.bg_secondary)),
        );
    frame.render_widget(input, popup);
    let x = u16::try_from(state.path_input.width()).unwrap_or(0);
    frame.set_cursor_position(((popup.x + 1 + x).min(popup.right().saturating_sub(2)), popup.y + 1));
}

fn render_help_popup(frame: &mut Frame, colors: &ThemeColors) {
    let popup_area = centered_rect(60, 80, frame.area());

    let bg_block = Block::default().style(Style::default().bg(colors.bg_secondary));
    frame.render_widget(Clear, popup_area);
    frame.render_widget(bg_block, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            format!("  {title}"),
            colors.text_primary().add_modifier(Modifier::BOLD),
        ))
    };
    let entry = |key: &'static str, action: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {key:<17}"), colors.key_hint()),
            Span::styled(action, colors.text()),
        ])
    };

    let help_content = vec![
        Line::default(),
        section("Everywhere"),
        entry("F1", "Toggle this help"),
        entry("Ctrl+T", "Next theme"),
        entry("Ctrl+C", "Quit"),
        Line::default(),
        section("Dashboard"),
        entry("Tab / 1-9", "Switch tabs"),
        entry("Ctrl+N / Ctrl+P", "Next / previous tab"),
        entry("Ctrl+L", "Log out"),
        Line::default(),
        section("Compose"),
        entry("Tab", "Text, schedule, channels"),
        entry("Space", "Toggle channel"),
        entry("Ctrl+X", "Toggle media"),
        entry("Ctrl+G", "Pick from gallery"),
        entry("Ctrl+A / Ctrl+D", "Attach file / drop last"),
        entry("Ctrl+S", "Send or schedule"),
        Line::default(),
        section("Lists"),
        entry("j/k", "Move"),
        entry("←/→", "Page"),
        entry("R / c / d", "Retry / cancel / delete post"),
        entry("a / e / d", "Add / edit / delete channel"),
        entry("u", "Upload media"),
        entry("o", "Open in browser"),
        entry("r", "Reload"),
    ];

    let help = Paragraph::new(help_content).block(
        rounded(colors)
            .border_style(colors.block_focus())
            .title(" Help ")
            .title_style(colors.logo()),
    );

    frame.render_widget(help, popup_area);
}

/// Helper function to create a centered rect
const fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_width = r.width * percent_x / 100;
    let popup_height = r.height * percent_y / 100;
    Rect {
        x: r.x + (r.width.saturating_sub(popup_width)) / 2,
        y: r.y + (r.height.saturating_sub(popup_height)) / 2,
        width: popup_width,
        height: popup_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ChannelCache;
    use crate::config::Config;
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;

    fn draw(state: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_centered_rect() {
        let r = centered_rect(50, 50, Rect::new(0, 0, 100, 40));
        assert_eq!(r, Rect::new(25, 10, 50, 20));
    }

    #[test]
    fn test_login_screen_renders_form() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut state = AppState::new(Config::default(), tx, Arc::new(ChannelCache::new()));
        state.screen = Screen::Login;
        state.login.password = "abc".into();

        let screen = draw(&state);
        assert!(screen.contains("Email"));
        assert!(screen.contains("•••"));
        assert!(!screen.contains("abc"));
    }
}
