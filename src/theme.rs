//! Terminal color schemes
//!
//! Palettes come from `ratatui-themes`; [`ThemeColors`] derives the styles
//! the screens actually use from one of them.

use ratatui::style::{Color, Modifier, Style};
use ratatui_themes::{ThemeName, ThemePalette};
use serde::{Deserialize, Serialize};

use crate::models::{MessageRole, Platform, PostStatus};

/// Theme selected in the config file, stored by slug
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme(pub ThemeName);

impl Theme {
    #[must_use]
    pub fn next(&self) -> Self {
        Self(self.0.next())
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0.display_name()
    }

    #[must_use]
    pub fn colors(&self) -> ThemeColors {
        ThemeColors::from_palette(self.0.palette())
    }
}

impl From<ThemeName> for Theme {
    fn from(name: ThemeName) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Colors for every UI element
#[derive(Debug, Clone)]
pub struct ThemeColors {
    pub bg: Color,
    /// Panels and chat bubbles
    pub bg_secondary: Color,
    pub fg: Color,
    pub fg_muted: Color,

    pub primary: Color,
    pub secondary: Color,

    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,

    pub border: Color,
    pub border_focus: Color,
    pub selection: Color,

    /// Telegram brand blue
    pub telegram: Color,
    /// Bale brand green
    pub bale: Color,
}

impl ThemeColors {
    #[must_use]
    pub fn from_palette(p: ThemePalette) -> Self {
        Self {
            bg: p.bg,
            bg_secondary: Self::lighten(p.bg, 12),
            fg: p.fg,
            fg_muted: p.muted,

            primary: p.accent,
            secondary: p.secondary,

            success: p.success,
            warning: p.warning,
            error: p.error,
            info: p.info,

            border: p.muted,
            border_focus: p.accent,
            selection: p.selection,

            telegram: Color::Rgb(36, 161, 222), // #24A1DE
            bale: Color::Rgb(0, 168, 132),      // #00A884
        }
    }

    fn lighten(color: Color, amount: u8) -> Color {
        match color {
            Color::Rgb(r, g, b) => Color::Rgb(
                r.saturating_add(amount),
                g.saturating_add(amount),
                b.saturating_add(amount),
            ),
            other => other,
        }
    }

    #[must_use]
    pub fn text(&self) -> Style {
        Style::default().fg(self.fg)
    }

    #[must_use]
    pub fn text_muted(&self) -> Style {
        Style::default().fg(self.fg_muted)
    }

    #[must_use]
    pub fn text_primary(&self) -> Style {
        Style::default().fg(self.primary)
    }

    #[must_use]
    pub fn text_success(&self) -> Style {
        Style::default().fg(self.success)
    }

    #[must_use]
    pub fn text_warning(&self) -> Style {
        Style::default().fg(self.warning)
    }

    #[must_use]
    pub fn text_error(&self) -> Style {
        Style::default().fg(self.error)
    }

    #[must_use]
    pub fn block(&self) -> Style {
        Style::default().fg(self.border)
    }

    #[must_use]
    pub fn block_focus(&self) -> Style {
        Style::default().fg(self.border_focus)
    }

    #[must_use]
    pub fn selected(&self) -> Style {
        Style::default()
            .bg(self.selection)
            .fg(self.fg)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn tab(&self) -> Style {
        Style::default().fg(self.fg_muted)
    }

    #[must_use]
    pub fn tab_active(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    /// Shortcut letters in the footer
    #[must_use]
    pub fn key_hint(&self) -> Style {
        Style::default()
            .fg(self.secondary)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn logo(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn platform(&self, platform: Platform) -> Style {
        match platform {
            Platform::Telegram => Style::default().fg(self.telegram),
            Platform::Bale => Style::default().fg(self.bale),
        }
    }

    #[must_use]
    pub fn status(&self, status: PostStatus) -> Style {
        match status {
            PostStatus::Sent => self.text_success(),
            PostStatus::Failed => self.text_error(),
            PostStatus::Pending | PostStatus::Sending => self.text_warning(),
            PostStatus::Cancelled | PostStatus::Unknown => self.text_muted(),
        }
    }

    /// Header line of a chat bubble
    #[must_use]
    pub fn bubble(&self, role: MessageRole) -> Style {
        match role {
            MessageRole::User => self.text_primary().add_modifier(Modifier::BOLD),
            MessageRole::Assistant => Style::default()
                .fg(self.info)
                .add_modifier(Modifier::BOLD),
            MessageRole::System => self.text_error(),
        }
    }

    /// Quota gauge, red once past the danger threshold
    #[must_use]
    pub fn gauge(&self, danger: bool) -> Style {
        let fg = if danger { self.error } else { self.success };
        Style::default().fg(fg).bg(self.bg_secondary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lighten_saturates() {
        assert_eq!(
            ThemeColors::lighten(Color::Rgb(250, 0, 10), 12),
            Color::Rgb(255, 12, 22)
        );
        assert_eq!(ThemeColors::lighten(Color::Red, 12), Color::Red);
    }

    #[test]
    fn test_theme_roundtrips_through_toml() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            theme: Theme,
        }
        let theme = Theme::default().next();
        let text = toml::to_string(&Wrapper { theme }).unwrap();
        let back: Wrapper = toml::from_str(&text).unwrap();
        assert_eq!(back.theme, theme);
    }

    #[test]
    fn test_failed_status_uses_error_color() {
        let colors = Theme::default().colors();
        assert_eq!(colors.status(PostStatus::Failed).fg, Some(colors.error));
        assert_eq!(colors.gauge(true).fg, Some(colors.error));
    }
}
