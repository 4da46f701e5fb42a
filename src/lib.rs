//! # Chapar 📮
//!
//! A terminal client for the Chapar post-scheduling service.
//!
//! ## Overview
//!
//! Chapar talks to a Django backend that publishes posts to Telegram and
//! Bale channels. From the terminal you can write a post once, send it to
//! several channels now or later, follow it through the pending, scheduled,
//! sent and failed lists, manage channels and a media gallery, and ask the
//! built-in AI assistant for help with the copy.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          App                                │
//! │   Event loop, async worker, screens drawn with ratatui      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │      Views      │ │     Session     │ │     Config      │
//! │                 │ │                 │ │                 │
//! │ • Form state    │ │ • Cookie jar    │ │ • Load/Save     │
//! │ • Validation    │ │ • Vault on disk │ │ • Backend URL   │
//! │ • Lists, chat   │ │ • Navigation    │ │ • Theme         │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │                   │
//!          └─────────┬─────────┘
//!                    ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          API                                │
//! │  Token refresh, 429 throttling, multipart with progress     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`]: HTTP client for the backend's REST endpoints
//! - [`app`]: TUI application state and event loop
//! - [`cache`]: Channel lookups shared by the status lists
//! - [`config`]: Configuration management
//! - [`models`]: Data models (Post, Channel, Media, Chat, User)
//! - [`nav`]: Routes and the navigation seam
//! - [`session`]: Cookie persistence between runs
//! - [`theme`]: Theme support via ratatui-themes
//! - [`views`]: View-models behind every screen
//!
//! ## Example
//!
//! ```no_run
//! use chapar::app;
//!
//! fn main() -> anyhow::Result<()> {
//!     app::run()
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/chapar/0.1.0")]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::unused_async)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::use_self)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::similar_names)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::wrong_self_convention)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::new_without_default)]

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod nav;
pub mod paths;
pub mod schedule;
pub mod session;
pub mod theme;
pub mod validation;
pub mod vault;
pub mod views;

// Re-export main types for convenience
pub use api::ApiClient;
pub use app::AppState;
pub use config::Config;
pub use error::ApiError;
pub use models::{Channel, MediaAsset, Post, PostStatus, User};
pub use session::Session;
pub use theme::{Theme, ThemeColors};

// Re-export theme types from ratatui-themes crate
pub use ratatui_themes::{ThemeName, ThemePalette};

/// ASCII logo for the application
pub const LOGO: &str = r"
   ________
  / ____/ /_  ____ _____  ____ ______
 / /   / __ \/ __ `/ __ \/ __ `/ ___/
/ /___/ / / / /_/ / /_/ / /_/ / /
\____/_/ /_/\__,_/ .___/\__,_/_/
                /_/
";

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
