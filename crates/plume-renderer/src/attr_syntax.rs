//! Curly attribute syntax: `{#id .class key="value"}`.
//!
//! Parsing lives in the core so that any plugin attaching attributes (the
//! attrs plugin, div containers) reads the syntax identically.

use indexmap::IndexMap;

use crate::token::Attrs;

/// Parsed attribute list.
///
/// # Example
///
/// ```
/// use plume_renderer::attr_syntax::AttrSyntax;
///
/// let attrs = AttrSyntax::parse(r#"#my-id .foo .bar lang="en""#);
/// assert_eq!(attrs.id.as_deref(), Some("my-id"));
/// assert_eq!(attrs.classes, vec!["foo", "bar"]);
/// assert_eq!(attrs.get("lang"), Some("en"));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttrSyntax {
    /// `#id` (the last one wins).
    pub id: Option<String>,
    /// `.class` entries in order of appearance, without duplicates.
    pub classes: Vec<String>,
    /// `key=value` pairs in order of first appearance (the last value wins).
    pub pairs: IndexMap<String, String>,
}

impl AttrSyntax {
    /// Parse the text between the delimiters.
    ///
    /// Unrecognized or malformed entries are skipped.
    #[must_use]
    pub fn parse(inner: &str) -> Self {
        let mut attrs = Self::default();
        let mut remaining = inner.trim();

        while !remaining.is_empty() {
            if let Some(rest) = remaining.strip_prefix('#') {
                let end = rest.find(is_name_end).unwrap_or(rest.len());
                if end > 0 {
                    attrs.id = Some(rest[..end].to_owned());
                }
                remaining = &rest[end..];
            } else if let Some(rest) = remaining.strip_prefix('.') {
                let end = rest.find(is_name_end).unwrap_or(rest.len());
                let class = &rest[..end];
                if !class.is_empty() && !attrs.classes.iter().any(|c| c == class) {
                    attrs.classes.push(class.to_owned());
                }
                remaining = &rest[end..];
            } else if let Some((key, value, rest)) = parse_key_value(remaining) {
                attrs.pairs.insert(key.to_owned(), value);
                remaining = rest;
            } else {
                // Skip the unrecognized entry up to the next whitespace.
                let end = remaining
                    .find(char::is_whitespace)
                    .unwrap_or(remaining.len());
                remaining = &remaining[end..];
            }
            remaining = remaining.trim_start();
        }

        attrs
    }

    /// Check whether nothing was recognized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.classes.is_empty() && self.pairs.is_empty()
    }

    /// Get a key-value attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    /// Merge into a token's attributes.
    ///
    /// `id` and pairs overwrite, classes are appended without duplicates.
    /// When `allowed` is given, only the listed attribute names are merged
    /// (`id` and `class` included).
    pub fn merge_into(&self, target: &mut Attrs, allowed: Option<&[String]>) {
        let permitted = |name: &str| allowed.is_none_or(|list| list.iter().any(|a| a == name));

        if let Some(id) = &self.id
            && permitted("id")
        {
            target.set("id", id.clone());
        }
        if permitted("class") {
            for class in &self.classes {
                target.add_class(class);
            }
        }
        for (key, value) in &self.pairs {
            if !permitted(key) {
                continue;
            }
            if key == "class" {
                for class in value.split_whitespace() {
                    target.add_class(class);
                }
            } else {
                target.set(key.clone(), value.clone());
            }
        }
    }
}

/// Delimiters around an attribute list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub left: String,
    pub right: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            left: "{".to_owned(),
            right: "}".to_owned(),
        }
    }
}

impl Delimiters {
    /// Find an attribute list closing the end of `text`.
    ///
    /// Returns the byte offset where the list starts and the parsed
    /// attributes. Trailing whitespace after the list is allowed. Lists with
    /// no recognized entry are not matched, so literal braces survive.
    #[must_use]
    pub fn find_trailing(&self, text: &str) -> Option<(usize, AttrSyntax)> {
        let trimmed = text.trim_end();
        if self.left.is_empty() || !trimmed.ends_with(&*self.right) {
            return None;
        }
        for (start, _) in trimmed.rmatch_indices(&*self.left) {
            if let Some(len) = self.list_len(&trimmed[start..])
                && start + len == trimmed.len()
            {
                let inner = &trimmed[start + self.left.len()..start + len - self.right.len()];
                let attrs = AttrSyntax::parse(inner);
                return (!attrs.is_empty()).then_some((start, attrs));
            }
        }
        None
    }

    /// Parse an attribute list at the very start of `text`.
    ///
    /// Returns the parsed attributes and the number of bytes consumed.
    #[must_use]
    pub fn find_leading(&self, text: &str) -> Option<(AttrSyntax, usize)> {
        let len = self.list_len(text)?;
        let inner = &text[self.left.len()..len - self.right.len()];
        let attrs = AttrSyntax::parse(inner);
        (!attrs.is_empty()).then_some((attrs, len))
    }

    /// Byte length of the attribute list starting at `s`, if it closes on
    /// the same line. Quoted values may contain the right delimiter.
    fn list_len(&self, s: &str) -> Option<usize> {
        let body = s.strip_prefix(&*self.left)?;
        let mut quote: Option<char> = None;
        for (i, c) in body.char_indices() {
            if c == '\n' {
                return None;
            }
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '"' || c == '\'' => quote = Some(c),
                None if body[i..].starts_with(&*self.right) => {
                    return Some(self.left.len() + i + self.right.len());
                }
                None => {}
            }
        }
        None
    }
}

fn is_name_end(c: char) -> bool {
    c.is_whitespace() || c == '.' || c == '#'
}

/// Parse `key="value"`, `key='value'` or `key=value` at the start of `s`.
fn parse_key_value(s: &str) -> Option<(&str, String, &str)> {
    let key_end = s.find(|c: char| c == '=' || c.is_whitespace())?;
    if !s[key_end..].starts_with('=') {
        return None;
    }
    let key = &s[..key_end];
    if key.is_empty() || !key.chars().all(is_attr_name_char) {
        return None;
    }

    let after_eq = &s[key_end + 1..];
    for quote in ['"', '\''] {
        if let Some(stripped) = after_eq.strip_prefix(quote) {
            let end_quote = stripped.find(quote)?;
            return Some((key, stripped[..end_quote].to_owned(), &stripped[end_quote + 1..]));
        }
    }

    let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
    Some((key, after_eq[..end].to_owned(), &after_eq[end..]))
}

fn is_attr_name_char(c: char) -> bool {
    !c.is_control() && !matches!(c, '"' | '\'' | '<' | '>' | '/' | '=' | '{' | '}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let attrs = AttrSyntax::parse("");
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_id_last_wins() {
        let attrs = AttrSyntax::parse("#first #second");
        assert_eq!(attrs.id.as_deref(), Some("second"));
    }

    #[test]
    fn test_classes_dedup_in_order() {
        let attrs = AttrSyntax::parse(".foo .bar .foo .baz");
        assert_eq!(attrs.classes, vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_compact_classes() {
        let attrs = AttrSyntax::parse("#id.foo.bar");
        assert_eq!(attrs.id.as_deref(), Some("id"));
        assert_eq!(attrs.classes, vec!["foo", "bar"]);
    }

    #[test]
    fn test_key_values() {
        let attrs = AttrSyntax::parse(r#"lang="en" width=560 title='Hello World' lang=fr"#);
        assert_eq!(attrs.get("lang"), Some("fr"));
        assert_eq!(attrs.get("width"), Some("560"));
        assert_eq!(attrs.get("title"), Some("Hello World"));
        let keys: Vec<_> = attrs.pairs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["lang", "width", "title"]);
    }

    #[test]
    fn test_value_with_spaces() {
        let attrs = AttrSyntax::parse(r#"title="value with spaces""#);
        assert_eq!(attrs.get("title"), Some("value with spaces"));
    }

    #[test]
    fn test_empty_quoted_value() {
        let attrs = AttrSyntax::parse(r#"alt="""#);
        assert_eq!(attrs.get("alt"), Some(""));
    }

    #[test]
    fn test_unrecognized_entries_ignored() {
        let attrs = AttrSyntax::parse(r#"bare, =x "quoted" .ok"#);
        assert_eq!(attrs.classes, vec!["ok"]);
        assert!(attrs.pairs.is_empty());
        assert_eq!(attrs.id, None);
    }

    #[test]
    fn test_unterminated_quote_ignored() {
        let attrs = AttrSyntax::parse(r#"title="open .cls"#);
        assert!(attrs.get("title").is_none());
    }

    #[test]
    fn test_merge_into() {
        let mut target = Attrs::new();
        target.set("class", "existing");
        AttrSyntax::parse(r#"#x .a .existing data-k=v class="b a""#).merge_into(&mut target, None);
        assert_eq!(target.get("id"), Some("x"));
        assert_eq!(target.get("class"), Some("existing a b"));
        assert_eq!(target.get("data-k"), Some("v"));
    }

    #[test]
    fn test_merge_with_allow_list() {
        let mut target = Attrs::new();
        let allowed = vec!["id".to_owned(), "target".to_owned()];
        AttrSyntax::parse("#x .a target=_blank onclick=evil").merge_into(&mut target, Some(&allowed));
        assert_eq!(target.get("id"), Some("x"));
        assert_eq!(target.get("target"), Some("_blank"));
        assert!(!target.contains("class"));
        assert!(!target.contains("onclick"));
    }

    #[test]
    fn test_find_trailing() {
        let delims = Delimiters::default();
        let (start, attrs) = delims.find_trailing("Heading {#custom-id}").unwrap();
        assert_eq!(start, 8);
        assert_eq!(attrs.id.as_deref(), Some("custom-id"));
    }

    #[test]
    fn test_find_trailing_with_brace_in_quotes() {
        let delims = Delimiters::default();
        let (start, attrs) = delims.find_trailing(r#"text {title="a}b"}"#).unwrap();
        assert_eq!(start, 5);
        assert_eq!(attrs.get("title"), Some("a}b"));
    }

    #[test]
    fn test_find_trailing_rejects_plain_braces() {
        let delims = Delimiters::default();
        assert!(delims.find_trailing("set {a, b}").is_none());
        assert!(delims.find_trailing("no braces").is_none());
        assert!(delims.find_trailing("open {#id").is_none());
    }

    #[test]
    fn test_find_leading() {
        let delims = Delimiters::default();
        let (attrs, len) = delims.find_leading("{.big} rest").unwrap();
        assert_eq!(len, 6);
        assert_eq!(attrs.classes, vec!["big"]);
        assert!(delims.find_leading(" {.big}").is_none());
    }

    #[test]
    fn test_custom_delimiters() {
        let delims = Delimiters {
            left: "{{".to_owned(),
            right: "}}".to_owned(),
        };
        let (start, attrs) = delims.find_trailing("Title {{.x}}").unwrap();
        assert_eq!(start, 6);
        assert_eq!(attrs.classes, vec!["x"]);
        assert!(delims.find_trailing("Title {.x}").is_none());
    }
}
