//! Div containers: `::: name` … `:::`.

use plume_renderer::{
    BlockRule, BlockState, MAX_BLOCK_NESTING, MarkdownEngine, Nesting, Plugin, RegistryError,
    detect_fence,
};

/// Minimum number of colons in a div fence.
const MIN_MARKERS: usize = 3;

/// The `div` plugin.
///
/// Bare words after the opening fence become classes; `#id` and `.class`
/// are accepted too. A div closes at a bare fence at least as long as its
/// opener, so divs nest either with longer outer fences or by pairing
/// openers with closers:
///
/// ```
/// use plume_plugins::DivPlugin;
/// use plume_renderer::MarkdownEngine;
///
/// let engine = MarkdownEngine::new().with_plugin(DivPlugin)?;
/// assert_eq!(
///     engine.render("::: warning\nCareful.\n:::"),
///     "<div class=\"warning\">\n<p>Careful.</p>\n</div>\n"
/// );
/// # Ok::<(), plume_renderer::RegistryError>(())
/// ```
///
/// An opener without a closing fence is left as paragraph text and reported
/// as a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct DivPlugin;

impl Plugin for DivPlugin {
    fn name(&self) -> &str {
        "div"
    }

    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
        engine.block_mut().before("fence", Box::new(DivRule))
    }
}

/// Parsed `:::` line: marker count and the trimmed text after it.
fn parse_fence(line: &str) -> Option<(usize, &str)> {
    if line.len() - line.trim_start().len() >= 4 {
        return None;
    }
    let trimmed = line.trim();
    let count = trimmed.len() - trimmed.trim_start_matches(':').len();
    (count >= MIN_MARKERS).then(|| (count, trimmed[count..].trim_start()))
}

/// Code fence state, so `:::` inside fenced code is not a div fence.
struct CodeFence {
    marker: char,
    len: usize,
}

impl CodeFence {
    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        detect_fence(trimmed).is_some_and(|(marker, len)| {
            marker == self.marker && len >= self.len && trimmed[len..].trim().is_empty()
        })
    }
}

struct DivRule;

impl DivRule {
    /// Line index of the fence closing the div opened at `start`.
    fn find_close(state: &BlockState<'_, '_>, start: usize, markers: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut code: Option<CodeFence> = None;
        for n in start + 1..state.line_max {
            let line = state.line_str(n);
            if let Some(fence) = &code {
                if fence.closes(line) {
                    code = None;
                }
                continue;
            }
            if line.len() - line.trim_start().len() < 4
                && let Some((marker, len)) = detect_fence(line.trim_start())
            {
                code = Some(CodeFence { marker, len });
                continue;
            }
            let Some((count, info)) = parse_fence(line) else {
                continue;
            };
            if !info.is_empty() {
                depth += 1;
            } else if depth > 0 {
                depth -= 1;
            } else if count >= markers {
                return Some(n);
            }
        }
        None
    }
}

impl BlockRule for DivRule {
    fn name(&self) -> &str {
        "div"
    }

    fn interrupts_paragraph(&self) -> bool {
        true
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool {
        let start = state.line;
        let Some((markers, info)) = parse_fence(state.line_str(start)) else {
            return false;
        };
        if info.is_empty() {
            return false;
        }
        let Some(close) = Self::find_close(state, start, markers) else {
            if !silent {
                tracing::trace!(line = start, "Unterminated div; keeping it as text");
                state.env.warn(format!(
                    "unterminated div `{info}` at line {}",
                    state.absolute_line(start) + 1
                ));
            }
            return false;
        };
        if silent {
            return true;
        }
        if state.depth >= MAX_BLOCK_NESTING {
            return false;
        }

        let open = state.push("div", "div", Nesting::Open);
        let token = state.token_mut(open);
        token.info = info.to_owned();
        token.markup = ":".repeat(markers);
        apply_names(&mut token.attrs, info);
        state.set_map(open, start, close + 1);

        let inner = (start + 1..close)
            .map(|n| state.line_str(n))
            .collect::<Vec<_>>()
            .join("\n");
        state.tokenize_nested(&inner, start + 1);

        let close_id = state.push("div", "div", Nesting::Close);
        state.token_mut(close_id).markup = ":".repeat(markers);
        state.line = close + 1;
        true
    }
}

/// Turn the words of a div info string into `id`/`class` attributes.
///
/// Stops at the first word opening an attribute list, which is left for the
/// attrs plugin.
fn apply_names(attrs: &mut plume_renderer::Attrs, info: &str) {
    for word in info.split_whitespace() {
        if word.starts_with('{') {
            break;
        }
        if let Some(id) = word.strip_prefix('#') {
            if !id.is_empty() {
                attrs.set("id", id);
            }
        } else {
            attrs.add_class(word.strip_prefix('.').unwrap_or(word));
        }
    }
}
