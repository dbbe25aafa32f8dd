use ratatui::style::Style;
use ratatui::style::Stylize;

use crate::tooltip::Placement;

/// Default number of characters shown before a description is cut off.
pub const DESCRIPTION_MAX_PREVIEW_CHARACTERS: usize = 350;

/// Text color family of the rendered markdown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TextVariant {
    /// The terminal's default foreground.
    #[default]
    Black,
    White,
    Grey,
}

impl TextVariant {
    pub fn class_name(self) -> &'static str {
        match self {
            TextVariant::Black => "black",
            TextVariant::White => "white",
            TextVariant::Grey => "grey",
        }
    }

    pub fn base_style(self) -> Style {
        match self {
            TextVariant::Black => Style::default(),
            TextVariant::White => Style::default().white(),
            TextVariant::Grey => Style::default().gray(),
        }
    }
}

/// Hover popover showing the untruncated content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TooltipOptions {
    pub enabled: bool,
    pub placement: Placement,
    /// Outer width of the popover, borders included.
    pub max_width: u16,
    /// Outer height of the popover, borders included.
    pub max_height: u16,
}

impl Default for TooltipOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            placement: Placement::Top,
            max_width: 60,
            max_height: 16,
        }
    }
}

impl TooltipOptions {
    pub fn enabled(placement: Placement) -> Self {
        Self {
            enabled: true,
            placement,
            ..Self::default()
        }
    }

    pub fn with_max_size(mut self, max_width: u16, max_height: u16) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PreviewerOptions {
    /// Extra class stored on the root node next to `rich-text-editor-container`.
    pub container_class: String,
    pub truncation_enabled: bool,
    pub text_variant: TextVariant,
    pub show_toggle_button: bool,
    /// Character count kept when the content is collapsed.
    pub truncation_limit: usize,
    pub tooltip: Option<TooltipOptions>,
}

impl Default for PreviewerOptions {
    fn default() -> Self {
        Self {
            container_class: String::new(),
            truncation_enabled: true,
            text_variant: TextVariant::default(),
            show_toggle_button: true,
            truncation_limit: DESCRIPTION_MAX_PREVIEW_CHARACTERS,
            tooltip: None,
        }
    }
}

impl PreviewerOptions {
    pub fn with_container_class(mut self, class: impl Into<String>) -> Self {
        self.container_class = class.into();
        self
    }

    pub fn with_truncation(mut self, enabled: bool) -> Self {
        self.truncation_enabled = enabled;
        self
    }

    pub fn with_truncation_limit(mut self, limit: usize) -> Self {
        self.truncation_limit = limit;
        self
    }

    pub fn with_text_variant(mut self, variant: TextVariant) -> Self {
        self.text_variant = variant;
        self
    }

    pub fn with_toggle_button(mut self, show: bool) -> Self {
        self.show_toggle_button = show;
        self
    }

    pub fn with_tooltip(mut self, tooltip: TooltipOptions) -> Self {
        self.tooltip = Some(tooltip);
        self
    }

    pub(crate) fn tooltip_enabled(&self) -> bool {
        self.tooltip.is_some_and(|t| t.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_description_preview() {
        let opts = PreviewerOptions::default();
        assert!(opts.truncation_enabled);
        assert!(opts.show_toggle_button);
        assert_eq!(opts.truncation_limit, 350);
        assert_eq!(opts.text_variant, TextVariant::Black);
        assert!(!opts.tooltip_enabled());
    }

    #[test]
    fn disabled_tooltip_options_do_not_enable_the_popover() {
        let opts = PreviewerOptions::default().with_tooltip(TooltipOptions::default());
        assert!(!opts.tooltip_enabled());
        let opts = opts.with_tooltip(TooltipOptions::enabled(Placement::Bottom));
        assert!(opts.tooltip_enabled());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn options_load_from_partial_config() {
        let json = r#"{ "truncation_limit": 80, "text_variant": "grey",
                        "tooltip": { "enabled": true, "placement": "bottom_left" } }"#;
        let opts: PreviewerOptions = serde_json::from_str(json).unwrap();
        assert_eq!(opts.truncation_limit, 80);
        assert_eq!(opts.text_variant, TextVariant::Grey);
        assert!(opts.show_toggle_button);
        let tooltip = opts.tooltip.unwrap();
        assert_eq!(tooltip.placement, Placement::BottomLeft);
        assert_eq!(tooltip.max_width, 60);
    }
}
