use owo_colors::Style;
use std::sync::OnceLock;
use crate::decision::{DecisionStatus, DecisionType};

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for decision output, keyed by what is being shown
#[derive(Debug, Clone)]
pub struct Theme {
    pub heading: Style,
    pub id: Style,
    pub label: Style,
    pub failure: Style,
    pub caution: Style,
    product: Style,
    process: Style,
    constraint: Style,
    learning: Style,
    active: Style,
    superseded: Style,
    retracted: Style,
}

impl Theme {
    /// Colored when stdout is a terminal, plain otherwise
    pub fn detect() -> Self {
        Self::new(console::Term::stdout().is_term())
    }

    pub fn new(colored: bool) -> Self {
        let pick = |style: Style| if colored { style } else { Style::new() };
        Self {
            heading: pick(Style::new().cyan().bold()),
            id: pick(Style::new().bright_blue().bold()),
            label: pick(Style::new().white().dimmed()),
            failure: pick(Style::new().red().bold()),
            caution: pick(Style::new().yellow().bold()),
            product: pick(Style::new().magenta()),
            process: pick(Style::new().blue()),
            constraint: pick(Style::new().yellow()),
            learning: pick(Style::new().cyan()),
            active: pick(Style::new().green().bold()),
            superseded: pick(Style::new().bright_black()),
            retracted: pick(Style::new().red()),
        }
    }

    pub fn kind(&self, kind: DecisionType) -> Style {
        match kind {
            DecisionType::Product => self.product,
            DecisionType::Process => self.process,
            DecisionType::Constraint => self.constraint,
            DecisionType::Learning => self.learning,
        }
    }

    pub fn status(&self, status: DecisionStatus) -> Style {
        match status {
            DecisionStatus::Active => self.active,
            DecisionStatus::Superseded => self.superseded,
            DecisionStatus::Retracted => self.retracted,
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_plain_theme_adds_no_escapes() {
        let plain = Theme::new(false);
        let rendered = "constraint".style(plain.kind(DecisionType::Constraint)).to_string();
        assert_eq!(rendered, "constraint");
        assert_eq!("DEC-0001".style(plain.id).to_string(), "DEC-0001");
    }

    #[test]
    fn test_colored_theme_styles_status() {
        let colored = Theme::new(true);
        let rendered = "active".style(colored.status(DecisionStatus::Active)).to_string();
        assert!(rendered.contains("\x1b["));
        assert!(rendered.contains("active"));
    }
}
