//! Custom theme for cliclack prompts

use cliclack::ThemeState;
use console::Style;

/// Coffee shop theme: warm yellow bars, green on submit
#[derive(Debug, Clone, Default)]
pub struct ShopTheme;

impl cliclack::Theme for ShopTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().yellow(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().yellow().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().yellow(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green(),
        }
    }
}

/// Install the theme for every prompt in this process
pub fn init_theme() {
    cliclack::set_theme(ShopTheme);
}
