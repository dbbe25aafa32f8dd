//! UI labels.

use std::collections::HashMap;

/// A label shown by the previewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LabelKey {
    /// Toggle label while collapsed.
    More,
    /// Toggle label while expanded.
    Less,
    /// Code block copy marker.
    Copy,
    /// Code block copy marker right after a successful copy.
    Copied,
}

impl LabelKey {
    pub const ALL: [LabelKey; 4] = [LabelKey::More, LabelKey::Less, LabelKey::Copy, LabelKey::Copied];

    /// Translation key used in locale files.
    pub fn id(self) -> &'static str {
        match self {
            LabelKey::More => "label.more-lowercase",
            LabelKey::Less => "label.less-lowercase",
            LabelKey::Copy => "label.copy-lowercase",
            LabelKey::Copied => "label.copied-lowercase",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }
}

/// Resolves labels for the current locale.
pub trait Localizer {
    fn label(&self, key: LabelKey) -> &str;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnglishLabels;

impl Localizer for EnglishLabels {
    fn label(&self, key: LabelKey) -> &str {
        match key {
            LabelKey::More => "more",
            LabelKey::Less => "less",
            LabelKey::Copy => "copy",
            LabelKey::Copied => "copied",
        }
    }
}

/// Per-locale label tables with an active locale.
///
/// Lookups try the exact locale (`pt-BR`), then its language (`pt`), then English.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Catalog {
    locale: String,
    tables: HashMap<String, HashMap<LabelKey, String>>,
}

impl Catalog {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            tables: HashMap::new(),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
    }

    pub fn insert(&mut self, locale: &str, key: LabelKey, text: impl Into<String>) {
        self.tables
            .entry(locale.to_string())
            .or_default()
            .insert(key, text.into());
    }

    pub fn with_table<S: Into<String>>(
        mut self,
        locale: &str,
        entries: impl IntoIterator<Item = (LabelKey, S)>,
    ) -> Self {
        for (key, text) in entries {
            self.insert(locale, key, text);
        }
        self
    }

    /// Loads `label.*` ids (as found in locale files); unknown ids are skipped.
    pub fn with_ids<'a>(
        mut self,
        locale: &str,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        for (id, text) in entries {
            if let Some(key) = LabelKey::from_id(id) {
                self.insert(locale, key, text);
            }
        }
        self
    }

    fn lookup(&self, locale: &str, key: LabelKey) -> Option<&str> {
        self.tables.get(locale)?.get(&key).map(String::as_str)
    }
}

impl Localizer for Catalog {
    fn label(&self, key: LabelKey) -> &str {
        let language = self.locale.split(['-', '_']).next().unwrap_or_default();
        self.lookup(&self.locale, key)
            .or_else(|| self.lookup(language, key))
            .unwrap_or_else(|| EnglishLabels.label(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_is_the_default() {
        assert_eq!(EnglishLabels.label(LabelKey::More), "more");
        assert_eq!(Catalog::default().label(LabelKey::Less), "less");
    }

    #[test]
    fn falls_back_from_region_to_language_to_english() {
        let catalog = Catalog::new("pt-BR")
            .with_table("pt", [(LabelKey::More, "mais")])
            .with_table("pt-BR", [(LabelKey::Less, "menos")]);
        assert_eq!(catalog.label(LabelKey::Less), "menos");
        assert_eq!(catalog.label(LabelKey::More), "mais");
        assert_eq!(catalog.label(LabelKey::Copy), "copy");
    }

    #[test]
    fn loads_translation_ids() {
        let mut catalog = Catalog::new("en").with_ids(
            "fr",
            [
                ("label.more-lowercase", "plus"),
                ("label.less-lowercase", "moins"),
                ("label.unrelated", "x"),
            ],
        );
        assert_eq!(catalog.label(LabelKey::More), "more");
        catalog.set_locale("fr");
        assert_eq!(catalog.label(LabelKey::More), "plus");
        assert_eq!(catalog.label(LabelKey::Less), "moins");
    }
}
