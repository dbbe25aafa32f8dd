use ratatui::style::Style;

#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    pub text_primary: Style,
    pub text_muted: Style,
    pub accent: Style,
    pub heading: Style,
    pub link: Style,
    pub code_inline: Style,
    pub code_block: Style,
    /// Applied on top of elements carrying `data-copied="true"`.
    pub copied: Style,
    pub popover_border: Style,
}

impl Default for Theme {
    fn default() -> Self {
        use ratatui::style::Stylize;

        Self {
            text_primary: Style::default(),
            text_muted: Style::default().dark_gray(),
            accent: Style::default().cyan(),
            heading: Style::default().cyan().bold(),
            link: Style::default().blue().underlined(),
            code_inline: Style::default().cyan(),
            code_block: Style::default().cyan(),
            copied: Style::default().green(),
            popover_border: Style::default().dark_gray(),
        }
    }
}

impl Theme {
    /// Returns a copy of this theme with `base` patched under the primary text style.
    pub fn with_text_base(mut self, base: Style) -> Self {
        self.text_primary = base.patch(self.text_primary);
        self
    }
}
