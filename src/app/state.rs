//! Application state

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use super::async_ops::AsyncCommand;
use crate::cache::ChannelCache;
use crate::config::Config;
use crate::nav::Route;
use crate::theme::Theme;
use crate::views::{
    ChangePasswordView, ChannelsView, ChatView, ComposerView, DashboardTab, DashboardView,
    GalleryView, Guard, LoginView, OtpLoginView, ProfileView, RegisterView, ResetPasswordView,
    StatusKind, StatusView, ThrottleView, VerifyEmailView,
};

/// Top-level screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Login,
    Register,
    OtpLogin,
    VerifyEmail,
    ResetPassword,
    Throttle,
    Dashboard,
}

/// What a typed path is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPurpose {
    /// Attach to the draft, sent with the post
    Attach,
    /// Upload into the media gallery
    Upload,
}

/// Current input mode on top of the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Help,
    /// Typing a local file path
    PathPrompt(PathPurpose),
    /// Gallery opened from the composer to pick attachments
    Picker,
    ChangePassword,
}

/// Main application state
pub struct AppState {
    pub config: Config,
    pub should_quit: bool,
    pub theme: Theme,
    pub screen: Screen,
    pub mode: Mode,

    /// Focused input of whichever form is active
    pub focus: usize,
    /// Text of the path prompt
    pub path_input: String,
    /// Cursor in the composer's channel picker
    pub channel_cursor: usize,

    pub guard: Guard,
    pub login: LoginView,
    pub register: RegisterView,
    pub otp_login: OtpLoginView,
    pub verify_email: VerifyEmailView,
    pub reset_password: ResetPasswordView,
    pub throttle: ThrottleView,
    /// Where the throttle screen returns to
    pub throttled_from: Screen,

    pub dashboard: DashboardView,
    pub composer: ComposerView,
    pub statuses: Vec<StatusView>,
    pub channels: ChannelsView,
    pub gallery: GalleryView,
    pub chat: ChatView,
    pub profile: ProfileView,
    pub change_password: ChangePasswordView,

    pub cache: Arc<ChannelCache>,
    /// Sends routes to our own event loop
    pub nav: UnboundedSender<Route>,

    /// Status message
    pub status: String,
    /// Loading indicator
    pub loading: bool,
    tick: u64,
    last_second: Instant,
}

impl AppState {
    pub fn new(config: Config, nav: UnboundedSender<Route>, cache: Arc<ChannelCache>) -> Self {
        let theme = config.theme;
        let page_size = config.page_size();
        Self {
            config,
            should_quit: false,
            theme,
            screen: Screen::Dashboard,
            mode: Mode::Normal,
            focus: 0,
            path_input: String::new(),
            channel_cursor: 0,
            guard: Guard::new(),
            login: LoginView::new(),
            register: RegisterView::new(),
            otp_login: OtpLoginView::new(),
            verify_email: VerifyEmailView::default(),
            reset_password: ResetPasswordView::new(),
            throttle: ThrottleView::default(),
            throttled_from: Screen::Dashboard,
            dashboard: DashboardView::new(),
            composer: ComposerView::new(),
            statuses: Self::status_views(page_size),
            channels: ChannelsView::new(),
            gallery: GalleryView::new(),
            chat: ChatView::new(),
            profile: ProfileView::new(),
            change_password: ChangePasswordView::new(),
            cache,
            nav,
            status: String::new(),
            loading: false,
            tick: 0,
            last_second: Instant::now(),
        }
    }

    fn status_views(page_size: u64) -> Vec<StatusView> {
        StatusKind::all()
            .iter()
            .map(|kind| StatusView::new(*kind).with_page_size(page_size))
            .collect()
    }

    /// Commands to run once the loop starts: probe the session
    pub fn startup(&mut self) -> Vec<AsyncCommand> {
        self.loading = true;
        self.set_status("Checking session...");
        vec![AsyncCommand::CheckSession]
    }

    /// Hard navigation: the target screen starts from fresh state
    pub fn navigate(&mut self, route: Route) -> Vec<AsyncCommand> {
        info!(route = route.name(), from = ?self.screen, "screen change");
        self.mode = Mode::Normal;
        self.focus = 0;
        self.loading = false;
        match route {
            Route::Login => {
                self.reset_dashboard();
                self.reset_auth_forms();
                self.cache.clear();
                self.screen = Screen::Login;
                Vec::new()
            }
            Route::Throttle { wait_secs } => {
                if self.screen != Screen::Throttle {
                    self.throttled_from = self.screen;
                }
                self.reset_dashboard();
                self.reset_auth_forms();
                self.throttle = ThrottleView::new(wait_secs);
                self.last_second = Instant::now();
                self.screen = Screen::Throttle;
                Vec::new()
            }
            Route::VerifyEmail { email } => {
                self.verify_email = VerifyEmailView::new(email);
                self.screen = Screen::VerifyEmail;
                Vec::new()
            }
            Route::Dashboard => {
                self.reset_dashboard();
                self.screen = Screen::Dashboard;
                self.startup()
            }
        }
    }

    /// Drop everything the previous user could have seen
    fn reset_dashboard(&mut self) {
        self.guard = Guard::new();
        self.dashboard = DashboardView::new();
        self.composer = ComposerView::new();
        self.statuses = Self::status_views(self.config.page_size());
        self.channels = ChannelsView::new();
        self.gallery = GalleryView::new();
        self.chat = ChatView::new();
        self.profile = ProfileView::new();
        self.change_password = ChangePasswordView::new();
        self.channel_cursor = 0;
    }

    fn reset_auth_forms(&mut self) {
        self.login = LoginView::new();
        self.register = RegisterView::new();
        self.otp_login = OtpLoginView::new();
        self.verify_email = VerifyEmailView::new(None);
        self.reset_password = ResetPasswordView::new();
    }

    /// Open a screen reachable from the login form
    pub fn show(&mut self, screen: Screen) {
        match screen {
            Screen::Register => self.register = RegisterView::new(),
            Screen::OtpLogin => self.otp_login = OtpLoginView::new(),
            Screen::ResetPassword => self.reset_password = ResetPasswordView::new(),
            Screen::VerifyEmail => self.verify_email = VerifyEmailView::new(None),
            _ => {}
        }
        self.screen = screen;
        self.mode = Mode::Normal;
        self.focus = 0;
    }

    /// Switch dashboard tab and load what it shows
    pub fn open_tab(&mut self, tab: DashboardTab) -> Option<AsyncCommand> {
        self.dashboard.tab = tab;
        self.mode = Mode::Normal;
        self.focus = 0;
        self.tab_load(tab)
    }

    /// Fetch for a tab; lists are refreshed every time they are shown
    pub fn tab_load(&mut self, tab: DashboardTab) -> Option<AsyncCommand> {
        let kind = match tab {
            DashboardTab::Compose | DashboardTab::Channels => {
                self.channels.loading = true;
                return Some(AsyncCommand::LoadChannels);
            }
            DashboardTab::Media => {
                self.gallery.loading = true;
                return Some(AsyncCommand::LoadMedia);
            }
            DashboardTab::Chat => return Some(AsyncCommand::LoadChat),
            DashboardTab::Profile => return None,
            DashboardTab::Pending => StatusKind::Pending,
            DashboardTab::Scheduled => StatusKind::Scheduled,
            DashboardTab::Sent => StatusKind::Sent,
            DashboardTab::Failed => StatusKind::Failed,
        };
        Some(self.load_posts(kind))
    }

    pub fn load_posts(&mut self, kind: StatusKind) -> AsyncCommand {
        let view = self.status_view_mut(kind);
        view.loading = true;
        AsyncCommand::LoadPosts {
            kind,
            query: view.query(),
        }
    }

    pub fn status_view(&self, kind: StatusKind) -> &StatusView {
        let index = Self::status_index(kind);
        &self.statuses[index]
    }

    pub fn status_view_mut(&mut self, kind: StatusKind) -> &mut StatusView {
        let index = Self::status_index(kind);
        &mut self.statuses[index]
    }

    fn status_index(kind: StatusKind) -> usize {
        StatusKind::all()
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default()
    }

    /// Advance animations and the throttle countdown
    ///
    /// The screen we return to starts over, so going back to the dashboard
    /// probes the session again and reloads from there.
    pub fn tick(&mut self) -> Option<AsyncCommand> {
        self.tick = self.tick.wrapping_add(1);
        if self.screen != Screen::Throttle || self.last_second.elapsed() < Duration::from_secs(1) {
            return None;
        }
        self.last_second += Duration::from_secs(1);
        if !self.throttle.tick() {
            return None;
        }
        info!("throttle wait over");
        self.screen = self.throttled_from;
        if self.screen == Screen::Dashboard {
            self.loading = true;
            Some(AsyncCommand::CheckSession)
        } else {
            None
        }
    }

    /// Get current tick (for animations)
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Set status message
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = msg.into();
    }

    /// Clear status message
    pub fn clear_status(&mut self) {
        self.status.clear();
    }

    /// Cycle to the next theme and remember it
    pub fn next_theme(&mut self) {
        self.theme = self.theme.next();
        self.config.theme = self.theme;
        self.set_status(format!("Theme: {}", self.theme.name()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, User};

    fn state() -> (AppState, tokio::sync::mpsc::UnboundedReceiver<Route>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (
            AppState::new(Config::default(), tx, Arc::new(ChannelCache::new())),
            rx,
        )
    }

    #[test]
    fn test_login_route_drops_dashboard_state() {
        let (mut state, _rx) = state();
        state.composer.content = "draft".into();
        state.dashboard.user = Some(User::default());
        state.mode = Mode::Help;

        state.navigate(Route::Login);

        assert_eq!(state.screen, Screen::Login);
        assert_eq!(state.mode, Mode::Normal);
        assert!(state.composer.content.is_empty());
        assert!(state.dashboard.user.is_none());
    }

    #[test]
    fn test_dashboard_route_probes_session() {
        let (mut state, _rx) = state();
        state.screen = Screen::Login;

        let cmds = state.navigate(Route::Dashboard);

        assert_eq!(state.screen, Screen::Dashboard);
        assert!(matches!(cmds.as_slice(), [AsyncCommand::CheckSession]));
    }

    #[test]
    fn test_throttle_returns_to_previous_screen() {
        let (mut state, _rx) = state();
        state.screen = Screen::Register;
        state.navigate(Route::Throttle { wait_secs: Some(1) });
        assert_eq!(state.screen, Screen::Throttle);

        state.last_second = Instant::now() - Duration::from_secs(2);
        assert!(state.tick().is_none());
        assert_eq!(state.screen, Screen::Register);
    }

    #[test]
    fn test_throttle_discards_drafts_and_rechecks_session() {
        let (mut state, _rx) = state();
        state.composer.content = "half written".into();
        state.chat.input = "question".into();
        state.login.email = "a@b.co".into();

        state.navigate(Route::Throttle { wait_secs: Some(1) });

        assert!(state.composer.content.is_empty());
        assert!(state.chat.input.is_empty());
        assert!(state.login.email.is_empty());
        assert_eq!(state.throttled_from, Screen::Dashboard);

        state.last_second = Instant::now() - Duration::from_secs(2);
        assert!(matches!(state.tick(), Some(AsyncCommand::CheckSession)));
        assert_eq!(state.screen, Screen::Dashboard);
    }

    #[test]
    fn test_login_route_clears_channel_cache() {
        let (mut state, _rx) = state();
        let channels: Vec<Channel> = serde_json::from_value(serde_json::json!([
            {"id": 7, "name": "old account", "username": "@o", "platform": "bale"}
        ]))
        .unwrap();
        state.cache.prime(&channels);

        state.navigate(Route::Login);

        assert_eq!(state.cache.labels(&[7]), vec!["#7".to_string()]);
    }

    #[test]
    fn test_status_tabs_load_their_own_list() {
        let (mut state, _rx) = state();
        let cmd = state.open_tab(DashboardTab::Failed);
        assert!(matches!(
            cmd,
            Some(AsyncCommand::LoadPosts { kind: StatusKind::Failed, .. })
        ));
        assert!(state.status_view(StatusKind::Failed).loading);
        assert_eq!(state.dashboard.tab, DashboardTab::Failed);
    }
}
