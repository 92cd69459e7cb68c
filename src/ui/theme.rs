use ratatui::style::{Color, Modifier, Style};

/// Light/dark colour scheme toggled from the keyboard.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Lowercase name used in status messages.
    pub fn name(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub(crate) fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                background: Color::White,
                text: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Blue,
                highlight: Color::LightBlue,
                error: Color::Red,
                success: Color::Green,
            },
            Theme::Dark => Palette {
                background: Color::Black,
                text: Color::White,
                muted: Color::Gray,
                accent: Color::Cyan,
                highlight: Color::DarkGray,
                error: Color::LightRed,
                success: Color::LightGreen,
            },
        }
    }
}

/// Concrete colours for one theme.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Palette {
    pub(crate) background: Color,
    pub(crate) text: Color,
    pub(crate) muted: Color,
    pub(crate) accent: Color,
    pub(crate) highlight: Color,
    pub(crate) error: Color,
    pub(crate) success: Color,
}

impl Palette {
    /// Plain text on the theme background. Every other style builds on it.
    pub(crate) fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    /// Labels and secondary text.
    pub(crate) fn muted(&self) -> Style {
        self.base().fg(self.muted)
    }

    pub(crate) fn accent(&self) -> Style {
        self.base().fg(self.accent)
    }

    /// Key names in the footer hints.
    pub(crate) fn key(&self) -> Style {
        self.accent().add_modifier(Modifier::BOLD)
    }

    pub(crate) fn error(&self) -> Style {
        self.base().fg(self.error)
    }

    pub(crate) fn success(&self) -> Style {
        self.base().fg(self.success)
    }

    /// Highlighted table row or menu entry.
    pub(crate) fn selected(&self) -> Style {
        Style::default()
            .fg(self.text)
            .bg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }
}
