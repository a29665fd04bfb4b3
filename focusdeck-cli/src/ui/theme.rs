//! UI theme: palette tokens and style helpers.

use ratatui::style::{Color, Modifier, Style};

/// Color palette tokens for the theme
#[derive(Clone, Debug)]
pub struct Palette {
    /// Panel border color
    pub panel_border: Color,
    /// Primary text color
    pub text: Color,
    /// Dimmed text (secondary info)
    pub text_dim: Color,
    /// Muted text (tertiary info, disabled)
    pub text_muted: Color,
    /// Accent color (highlights, focus)
    pub accent: Color,
    pub success: Color,
    pub warn: Color,
    pub error: Color,
    /// Selection background
    pub selection_bg: Color,
    /// Selection foreground
    pub selection_fg: Color,
    /// Key hint text
    pub key_hint: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            panel_border: Color::Rgb(60, 60, 60),
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            text_muted: Color::Rgb(100, 100, 100),
            accent: Color::Rgb(79, 193, 255),
            success: Color::Rgb(78, 201, 176),
            warn: Color::Rgb(220, 180, 100),
            error: Color::Rgb(244, 135, 113),
            selection_bg: Color::Rgb(38, 79, 120),
            selection_fg: Color::White,
            key_hint: Color::Rgb(206, 145, 120),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Theme {
    pub palette: Palette,
}

impl Theme {
    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.palette.accent)
        } else {
            Style::default().fg(self.palette.panel_border)
        }
    }

    pub fn title_style(&self, focused: bool) -> Style {
        if focused {
            Style::default()
                .fg(self.palette.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.palette.text_dim)
        }
    }

    /// Selected row; unfocused panels keep a dimmer highlight.
    pub fn selection_style(&self, focused: bool) -> Style {
        if focused {
            Style::default()
                .bg(self.palette.selection_bg)
                .fg(self.palette.selection_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        }
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.palette.text)
    }

    pub fn text_muted_style(&self) -> Style {
        Style::default().fg(self.palette.text_muted)
    }

    pub fn key_hint_style(&self) -> Style {
        Style::default().fg(self.palette.key_hint)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.palette.success)
    }

    pub fn warn_style(&self) -> Style {
        Style::default().fg(self.palette.warn)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.palette.error)
    }

    /// Colors a unified-diff line.
    pub fn diff_line_style(&self, line: &str) -> Style {
        if line.starts_with("+++") || line.starts_with("---") {
            self.text_style().add_modifier(Modifier::BOLD)
        } else if line.starts_with('+') {
            self.success_style()
        } else if line.starts_with('-') {
            self.error_style()
        } else if line.starts_with("@@") {
            Style::default().fg(self.palette.accent)
        } else {
            self.text_style()
        }
    }
}

static DEFAULT_THEME: std::sync::OnceLock<Theme> = std::sync::OnceLock::new();

pub fn theme() -> &'static Theme {
    DEFAULT_THEME.get_or_init(Theme::default)
}

/// Shorthands over the default theme.
pub mod styles {
    use super::*;

    pub fn border(focused: bool) -> Style {
        theme().border_style(focused)
    }

    pub fn title(focused: bool) -> Style {
        theme().title_style(focused)
    }

    pub fn selection(focused: bool) -> Style {
        theme().selection_style(focused)
    }

    pub fn text() -> Style {
        theme().text_style()
    }

    pub fn text_muted() -> Style {
        theme().text_muted_style()
    }

    pub fn key_hint() -> Style {
        theme().key_hint_style()
    }

    pub fn success() -> Style {
        theme().success_style()
    }

    pub fn warn() -> Style {
        theme().warn_style()
    }

    pub fn error() -> Style {
        theme().error_style()
    }

    pub fn diff_line(line: &str) -> Style {
        theme().diff_line_style(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_line_styles() {
        let t = Theme::default();
        assert_eq!(t.diff_line_style("+added"), t.success_style());
        assert_eq!(t.diff_line_style("-removed"), t.error_style());
        assert_ne!(t.diff_line_style("+++ b/file"), t.success_style());
        assert_eq!(t.diff_line_style(" context"), t.text_style());
    }
}
