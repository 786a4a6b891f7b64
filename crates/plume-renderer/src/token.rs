//! Token stream produced by tokenization and consumed by rendering.
//!
//! Tokens live in an arena ([`TokenStream`]) and reference each other by
//! [`TokenId`]. The top-level block sequence is flat, markdown-it style:
//! containers appear as an `Open` token, their content, and a matching
//! `Close` token. Every block-level `inline` token owns a `children` list
//! holding the inline tokens of its content.

use std::borrow::Cow;

use indexmap::IndexMap;

/// Index of a token inside a [`TokenStream`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(usize);

impl TokenId {
    /// Position of the token in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Tokenization phase a token (or rule) belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Whole-stream passes that run after block and inline tokenization.
    Core,
    /// Block-level structure (headings, paragraphs, lists, containers).
    Block,
    /// Spans inside a block's text content.
    Inline,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Core => "core",
            Self::Block => "block",
            Self::Inline => "inline",
        })
    }
}

/// How a token participates in element nesting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nesting {
    /// Opens an element; a matching `Close` follows in the same list.
    Open,
    /// Closes the most recent unmatched `Open` of the same kind.
    Close,
    /// Complete element (or leaf content) with no separate closer.
    SelfClosing,
}

/// Ordered attribute mapping.
///
/// Keys are unique; insertion order is preserved so rendered output is
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attrs(IndexMap<String, String>);

impl Attrs {
    /// Create an empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, overwriting any previous value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get an attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Remove an attribute, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.shift_remove(key)
    }

    /// Append a class to the space-separated `class` attribute.
    ///
    /// Classes already present are not repeated.
    pub fn add_class(&mut self, class: &str) {
        if class.is_empty() {
            return;
        }
        match self.0.get_mut("class") {
            Some(existing) => {
                if existing.split_whitespace().any(|c| c == class) {
                    return;
                }
                if !existing.is_empty() {
                    existing.push(' ');
                }
                existing.push_str(class);
            }
            None => {
                self.0.insert("class".to_owned(), class.to_owned());
            }
        }
    }

    /// Check whether an attribute is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attrs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

/// A typed unit of parsed structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Token type, e.g. `heading`, `paragraph`, `text`, `mark`.
    ///
    /// Render rules are resolved by this name.
    pub kind: Cow<'static, str>,
    /// Phase that produced the token.
    pub phase: Phase,
    /// HTML tag emitted by the default render rule (may be empty).
    pub tag: Cow<'static, str>,
    pub nesting: Nesting,
    pub attrs: Attrs,
    /// Raw text of leaf tokens.
    pub content: String,
    /// Source markup that produced the token (`##`, `==`, `*`).
    pub markup: String,
    /// Info string of fences and containers.
    pub info: String,
    /// Inline children (only on `inline`, `image` and similar tokens).
    pub children: Vec<TokenId>,
    /// Token whose `children` list contains this token.
    pub parent: Option<TokenId>,
    /// Nesting depth within its list.
    pub level: usize,
    /// Block-level token (rendered with a trailing newline after closers).
    pub block: bool,
    /// Skip the element itself when rendering (tight list paragraphs).
    pub hidden: bool,
    /// Content is raw HTML to be emitted verbatim when permitted.
    pub raw: bool,
    /// Source line range `[start, end)` for block tokens.
    pub map: Option<(usize, usize)>,
}

impl Token {
    /// Create a token with empty content.
    #[must_use]
    pub fn new(
        kind: impl Into<Cow<'static, str>>,
        tag: impl Into<Cow<'static, str>>,
        nesting: Nesting,
        phase: Phase,
    ) -> Self {
        Self {
            kind: kind.into(),
            phase,
            tag: tag.into(),
            nesting,
            attrs: Attrs::new(),
            content: String::new(),
            markup: String::new(),
            info: String::new(),
            children: Vec::new(),
            parent: None,
            level: 0,
            block: phase == Phase::Block,
            hidden: false,
            raw: false,
            map: None,
        }
    }

    /// Set the content, builder-style.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the markup, builder-style.
    #[must_use]
    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = markup.into();
        self
    }
}

/// Arena of tokens plus the top-level block sequence.
#[derive(Clone, Debug, Default)]
pub struct TokenStream {
    arena: Vec<Token>,
    blocks: Vec<TokenId>,
}

impl TokenStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a token in the arena without attaching it anywhere.
    pub fn alloc(&mut self, token: Token) -> TokenId {
        let id = TokenId(self.arena.len());
        self.arena.push(token);
        id
    }

    /// Append a token to the top-level block sequence.
    pub fn push_block(&mut self, token: Token) -> TokenId {
        let id = self.alloc(token);
        self.blocks.push(id);
        id
    }

    /// Append a token to the children of `parent`.
    pub fn push_child(&mut self, parent: TokenId, mut token: Token) -> TokenId {
        token.parent = Some(parent);
        let id = self.alloc(token);
        self.arena[parent.0].children.push(id);
        id
    }

    /// Top-level block sequence.
    #[must_use]
    pub fn blocks(&self) -> &[TokenId] {
        &self.blocks
    }

    /// Mutable top-level block sequence (for core passes that drop tokens).
    pub fn blocks_mut(&mut self) -> &mut Vec<TokenId> {
        &mut self.blocks
    }

    /// Number of block tokens currently in the top-level sequence.
    #[must_use]
    pub fn block_len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn get(&self, id: TokenId) -> &Token {
        &self.arena[id.0]
    }

    pub fn get_mut(&mut self, id: TokenId) -> &mut Token {
        &mut self.arena[id.0]
    }

    /// Children of a token.
    #[must_use]
    pub fn children(&self, id: TokenId) -> &[TokenId] {
        &self.arena[id.0].children
    }

    /// Replace the children list of a token.
    pub fn set_children(&mut self, id: TokenId, children: Vec<TokenId>) {
        for &child in &children {
            self.arena[child.0].parent = Some(id);
        }
        self.arena[id.0].children = children;
    }

    /// Find the `Open` token matching the `Close` token at `close_pos` in `list`.
    ///
    /// Walks backwards counting nesting of the same kind.
    #[must_use]
    pub fn find_opener(&self, list: &[TokenId], close_pos: usize) -> Option<usize> {
        let kind = &self.get(list[close_pos]).kind;
        let mut depth = 0usize;
        for pos in (0..close_pos).rev() {
            let token = self.get(list[pos]);
            if token.kind != *kind {
                continue;
            }
            match token.nesting {
                Nesting::Close => depth += 1,
                Nesting::Open if depth == 0 => return Some(pos),
                Nesting::Open => depth -= 1,
                Nesting::SelfClosing => {}
            }
        }
        None
    }

    /// Iterate every token id in the arena.
    pub fn ids(&self) -> impl Iterator<Item = TokenId> {
        (0..self.arena.len()).map(TokenId)
    }

    /// Check that every `Open` in `list` has a matching `Close` at the same level.
    #[must_use]
    pub fn is_balanced(&self, list: &[TokenId]) -> bool {
        let mut stack: Vec<&str> = Vec::new();
        for &id in list {
            let token = self.get(id);
            match token.nesting {
                Nesting::Open => stack.push(&token.kind),
                Nesting::Close => {
                    if stack.pop() != Some(&*token.kind) {
                        return false;
                    }
                }
                Nesting::SelfClosing => {}
            }
        }
        stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attrs_preserve_insertion_order() {
        let mut attrs = Attrs::new();
        attrs.set("id", "a");
        attrs.set("data-x", "1");
        attrs.set("id", "b");
        let pairs: Vec<_> = attrs.iter().collect();
        assert_eq!(pairs, vec![("id", "b"), ("data-x", "1")]);
    }

    #[test]
    fn test_add_class_dedup() {
        let mut attrs = Attrs::new();
        attrs.add_class("foo");
        attrs.add_class("bar");
        attrs.add_class("foo");
        assert_eq!(attrs.get("class"), Some("foo bar"));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut attrs: Attrs = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        attrs.remove("b");
        let keys: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_push_child_sets_parent() {
        let mut stream = TokenStream::new();
        let inline = stream.push_block(Token::new("inline", "", Nesting::SelfClosing, Phase::Block));
        let text = stream.push_child(
            inline,
            Token::new("text", "", Nesting::SelfClosing, Phase::Inline).with_content("hi"),
        );
        assert_eq!(stream.get(text).parent, Some(inline));
        assert_eq!(stream.children(inline), &[text]);
        assert_eq!(stream.blocks(), &[inline]);
    }

    #[test]
    fn test_find_opener_nested() {
        let mut stream = TokenStream::new();
        let ids: Vec<_> = [
            ("em", Nesting::Open),
            ("em", Nesting::Open),
            ("em", Nesting::Close),
            ("em", Nesting::Close),
        ]
        .into_iter()
        .map(|(k, n)| stream.alloc(Token::new(k, "em", n, Phase::Inline)))
        .collect();
        assert_eq!(stream.find_opener(&ids, 3), Some(0));
        assert_eq!(stream.find_opener(&ids, 2), Some(1));
        assert!(stream.is_balanced(&ids));
        assert!(!stream.is_balanced(&ids[..3]));
    }
}
