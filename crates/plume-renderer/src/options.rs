//! Render options resolved at setup time.

/// Immutable rendering configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderOptions {
    /// Escape `& < > "` in text content.
    pub html_escaping: bool,
    /// Render soft line breaks as `<br>`.
    pub breaks: bool,
    /// Recognize raw HTML in the source and emit it verbatim.
    pub raw_html: bool,
    /// Use XHTML-style self-closing tags (`<br />`).
    pub xhtml_out: bool,
    /// Class prefix for fenced code languages.
    pub lang_prefix: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            html_escaping: true,
            breaks: false,
            raw_html: false,
            xhtml_out: false,
            lang_prefix: "language-".to_owned(),
        }
    }
}

impl RenderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_breaks(mut self, enabled: bool) -> Self {
        self.breaks = enabled;
        self
    }

    #[must_use]
    pub fn with_raw_html(mut self, enabled: bool) -> Self {
        self.raw_html = enabled;
        self
    }

    #[must_use]
    pub fn with_html_escaping(mut self, enabled: bool) -> Self {
        self.html_escaping = enabled;
        self
    }

    #[must_use]
    pub fn with_xhtml_out(mut self, enabled: bool) -> Self {
        self.xhtml_out = enabled;
        self
    }

    #[must_use]
    pub fn with_lang_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.lang_prefix = prefix.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RenderOptions::default();
        assert!(options.html_escaping);
        assert!(!options.breaks);
        assert!(!options.raw_html);
        assert_eq!(options.lang_prefix, "language-");
    }

    #[test]
    fn test_builder() {
        let options = RenderOptions::new()
            .with_breaks(true)
            .with_raw_html(true)
            .with_lang_prefix("lang-");
        assert!(options.breaks);
        assert!(options.raw_html);
        assert_eq!(options.lang_prefix, "lang-");
    }
}
