//! UI Theme - colour palette and style helpers
//!
//! The theme is built once at startup from the configured [`ThemeName`] and
//! passed by reference into every render function.

use ratatui::style::{Color, Modifier, Style};

use logbook_core::config::ThemeName;
use logbook_core::lifecycle::{Severity, WorkloadStatus};

use crate::keymap::Mode;

/// Color palette tokens for the theme
#[derive(Clone, Debug)]
pub struct Palette {
    /// Panel border color
    pub panel_border: Color,
    /// Primary text color
    pub text: Color,
    /// Dimmed text (secondary info)
    pub text_dim: Color,
    /// Muted text (tertiary info)
    pub text_muted: Color,
    /// Accent color (focus, active tab)
    pub accent: Color,
    /// Workloads that are up or done
    pub success: Color,
    /// Workloads on their way up or down
    pub warn: Color,
    /// Failed or unknown workloads
    pub error: Color,
    /// Selection background
    pub selection_bg: Color,
    /// Selection foreground
    pub selection_fg: Color,
    /// Search match background
    pub match_bg: Color,
    /// Active search match background
    pub active_match_bg: Color,
    /// Foreground drawn on top of match backgrounds
    pub match_fg: Color,
    /// Status bar background
    pub bar_bg: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    /// Muted dark theme
    pub fn dark() -> Self {
        Self {
            panel_border: Color::Rgb(60, 60, 60),
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            text_muted: Color::Rgb(100, 100, 100),
            accent: Color::Rgb(79, 193, 255),      // Light blue
            success: Color::Rgb(78, 201, 176),     // Teal green
            warn: Color::Rgb(220, 180, 100),       // Amber
            error: Color::Rgb(244, 135, 113),      // Coral red
            selection_bg: Color::Rgb(38, 79, 120), // Dark blue
            selection_fg: Color::White,
            match_bg: Color::Rgb(97, 81, 36),
            active_match_bg: Color::Rgb(220, 180, 100),
            match_fg: Color::Rgb(20, 20, 20),
            bar_bg: Color::Rgb(37, 37, 38),
        }
    }

    /// High contrast theme variant
    pub fn high_contrast() -> Self {
        Self {
            panel_border: Color::White,
            text: Color::White,
            text_dim: Color::Rgb(200, 200, 200),
            text_muted: Color::Rgb(150, 150, 150),
            accent: Color::Cyan,
            success: Color::Green,
            warn: Color::Yellow,
            error: Color::Red,
            selection_bg: Color::Blue,
            selection_fg: Color::White,
            match_bg: Color::Yellow,
            active_match_bg: Color::Magenta,
            match_fg: Color::Black,
            bar_bg: Color::Black,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Theme {
    pub palette: Palette,
}

impl Theme {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn from_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::new(Palette::dark()),
            ThemeName::HighContrast => Self::new(Palette::high_contrast()),
        }
    }

    // ========== StyleKit Helper Functions ==========

    /// Style for a workload status
    pub fn status_style(&self, status: WorkloadStatus) -> Style {
        let color = match status.severity() {
            Severity::Active => self.palette.success,
            Severity::Pending => self.palette.warn,
            Severity::Error => self.palette.error,
        };
        Style::default().fg(color)
    }

    /// Icon for a workload status
    pub fn status_icon(&self, status: WorkloadStatus) -> &'static str {
        match status {
            WorkloadStatus::Running => "●",
            WorkloadStatus::Succeeded => "◌",
            WorkloadStatus::Pending | WorkloadStatus::Initializing => "◐",
            WorkloadStatus::Terminating => "○",
            WorkloadStatus::Failed => "✗",
            WorkloadStatus::Unknown => "?",
        }
    }

    /// Style for container tabs
    pub fn tab_style(&self, active: bool) -> Style {
        if active {
            Style::default()
                .fg(self.palette.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.palette.text_dim)
        }
    }

    /// Badge shown at the left of the status bar
    pub fn mode_style(&self, mode: Mode) -> Style {
        let bg = match mode {
            Mode::Normal => self.palette.accent,
            Mode::Follow => self.palette.success,
            Mode::SearchInput => self.palette.warn,
        };
        Style::default()
            .bg(bg)
            .fg(self.palette.match_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn bar_style(&self) -> Style {
        Style::default().bg(self.palette.bar_bg).fg(self.palette.text_dim)
    }

    pub fn match_style(&self, active: bool) -> Style {
        let bg = if active {
            self.palette.active_match_bg
        } else {
            self.palette.match_bg
        };
        let style = Style::default().bg(bg).fg(self.palette.match_fg);
        if active {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    /// Style for subtle borders
    pub fn subtle_border_style(&self) -> Style {
        Style::default().fg(self.palette.panel_border)
    }

    /// Style for selected items
    pub fn selection_style(&self) -> Style {
        Style::default()
            .bg(self.palette.selection_bg)
            .fg(self.palette.selection_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.palette.text)
    }

    pub fn text_muted_style(&self) -> Style {
        Style::default().fg(self.palette.text_muted)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.palette.accent)
    }

    pub fn warn_style(&self) -> Style {
        Style::default().fg(self.palette.warn)
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.palette.text)
            .add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_colours_follow_severity() {
        let theme = Theme::from_name(ThemeName::HighContrast);
        assert_eq!(
            theme.status_style(WorkloadStatus::Running).fg,
            Some(Color::Green)
        );
        assert_eq!(
            theme.status_style(WorkloadStatus::Initializing).fg,
            Some(Color::Yellow)
        );
        assert_eq!(theme.status_style(WorkloadStatus::Unknown).fg, Some(Color::Red));
    }

    #[test]
    fn test_active_match_stands_out() {
        let theme = Theme::default();
        assert_ne!(theme.match_style(true), theme.match_style(false));
    }
}
