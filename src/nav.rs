//! Screen routes and the navigation seam used by the API client

use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

/// Screens the client can be sent to without the current view asking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Login form; all in-memory view state is dropped
    Login,
    /// Rate-limit warning with the server's suggested wait
    Throttle { wait_secs: Option<u64> },
    /// Email verification, optionally prefilled with a server message
    VerifyEmail { email: Option<String> },
    /// Main dashboard after a successful login
    Dashboard,
}

impl Route {
    /// Short name for logs and the status bar
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Throttle { .. } => "throttle",
            Self::VerifyEmail { .. } => "verify-email",
            Self::Dashboard => "dashboard",
        }
    }
}

/// Something that can move the user to another screen
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Used by one-shot CLI commands, which report the typed error instead
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: Route) {
        info!(route = route.name(), "navigation ignored outside the TUI");
    }
}

/// The TUI listens on the receiving end and swaps screens
impl Navigator for UnboundedSender<Route> {
    fn navigate(&self, route: Route) {
        info!(route = route.name(), "navigating");
        // Receiver is gone only while the app is shutting down
        let _ = self.send(route);
    }
}

/// Keeps every route it was asked to visit
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes visited so far, oldest first
    pub fn routes(&self) -> Vec<Route> {
        self.routes
            .lock()
            .map(|routes| routes.clone())
            .unwrap_or_default()
    }

    /// Most recent route
    pub fn last(&self) -> Option<Route> {
        self.routes().pop()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route);
        }
    }
}
