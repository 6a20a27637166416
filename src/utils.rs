//! Text helpers for Telegram delivery: Markdown to HTML conversion, message
//! splitting and safe truncation.
//!
//! Patterns are declared with `lazy_regex!`, so they are validated at compile
//! time and built on first use.

// lazy_regex! statics are once_cell based
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;
use unicode_segmentation::UnicodeSegmentation;

const FENCE: &str = "```";

/// Fenced code block with optional language: ```lang\ncode```
static RE_CODE_BLOCK_FENCE: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"```(\w+)?\n([\s\S]*?)```");

/// Markdown heading line: ## Title
static RE_HEADING: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?m)^#{1,6}[ \t]+(.+)$");

/// List item at the start of a line: `* ` or `- `
static RE_BULLET: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?m)^[ \t]*[*-][ \t]+");

/// Bold: **text**
static RE_BOLD: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\*\*([^*\n]+?)\*\*");

/// Italic: *text*, not touching whitespace on the inside
static RE_ITALIC: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\*([^*\s][^*\n]*?)\*");

/// Inline code: `code`
static RE_INLINE_CODE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"`([^`\n]+)`");

/// 3+ consecutive newlines
static RE_MULTI_NEWLINE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\n{3,}");

/// Converts Markdown as produced by the model into Telegram HTML.
///
/// All text is HTML-escaped first, so the result only contains tags this
/// function emits. Fenced code blocks are left untouched apart from escaping.
///
/// # Examples
///
/// ```
/// use deepseek_summarizer::utils::format_text;
/// let formatted = format_text("**Bold** and *italic* with `code` & 1 < 2");
/// assert_eq!(
///     formatted,
///     "<b>Bold</b> and <i>italic</i> with <code>code</code> &amp; 1 &lt; 2"
/// );
/// ```
#[must_use]
pub fn format_text(text: &str) -> String {
    let mut html = String::with_capacity(text.len());
    let mut last = 0;

    for caps in RE_CODE_BLOCK_FENCE.captures_iter(text) {
        let (Some(block), Some(code)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        html.push_str(&format_inline(&text[last..block.start()]));
        let code = html_escape::encode_text(code.as_str().trim_end());
        match caps.get(1) {
            Some(lang) => html.push_str(&format!(
                "<pre><code class=\"language-{}\">{code}</code></pre>",
                lang.as_str()
            )),
            None => html.push_str(&format!("<pre>{code}</pre>")),
        }
        last = block.end();
    }
    html.push_str(&format_inline(&text[last..]));

    RE_MULTI_NEWLINE
        .replace_all(&html, "\n\n")
        .trim()
        .to_string()
}

fn format_inline(segment: &str) -> String {
    let escaped = html_escape::encode_text(segment);
    let lines = RE_HEADING.replace_all(&escaped, "<b>$1</b>");
    let lines = RE_BULLET.replace_all(&lines, "• ");

    // Emphasis never reaches into inline code spans
    let mut html = String::with_capacity(lines.len());
    let mut last = 0;
    for caps in RE_INLINE_CODE.captures_iter(&lines) {
        let (Some(span), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        html.push_str(&format_emphasis(&lines[last..span.start()]));
        html.push_str("<code>");
        html.push_str(code.as_str());
        html.push_str("</code>");
        last = span.end();
    }
    html.push_str(&format_emphasis(&lines[last..]));
    html
}

fn format_emphasis(text: &str) -> String {
    let html = RE_BOLD.replace_all(text, "<b>$1</b>");
    RE_ITALIC.replace_all(&html, "<i>$1</i>").into_owned()
}

/// Splits a message into parts of at most `max_chars` characters.
///
/// Parts break on line boundaries where possible. A part that ends inside a
/// fenced code block is closed with a fence and the next part reopens it.
/// Lines longer than a part are cut between grapheme clusters.
///
/// # Examples
///
/// ```
/// use deepseek_summarizer::utils::split_long_message;
/// let long_msg = "A very long message...\n".repeat(300);
/// let parts = split_long_message(&long_msg, 4000);
/// assert!(parts.len() > 1);
/// ```
#[must_use]
pub fn split_long_message(message: &str, max_chars: usize) -> Vec<String> {
    if message.trim().is_empty() {
        return Vec::new();
    }
    if message.chars().count() <= max_chars {
        return vec![message.to_string()];
    }

    // Leave room for a reopening fence at the start and a closing one at the end
    let budget = max_chars.saturating_sub(2 * (FENCE.len() + 1)).max(1);
    let mut parts = Parts::default();
    for line in message.lines() {
        for piece in wrap_line(line, budget) {
            parts.push_line(&piece, budget);
        }
        if line.trim_start().starts_with(FENCE) {
            parts.in_fence = !parts.in_fence;
        }
    }
    parts.finish()
}

#[derive(Default)]
struct Parts {
    done: Vec<String>,
    current: String,
    chars: usize,
    lines: usize,
    in_fence: bool,
}

impl Parts {
    fn push_line(&mut self, line: &str, budget: usize) {
        let len = line.chars().count() + 1;
        if self.lines > 0 && self.chars + len > budget {
            self.flush();
        }
        self.current.push_str(line);
        self.current.push('\n');
        self.chars += len;
        self.lines += 1;
    }

    fn flush(&mut self) {
        let mut part = std::mem::take(&mut self.current);
        if self.in_fence {
            part.push_str(FENCE);
        }
        self.done.push(part.trim_end().to_string());
        self.chars = 0;
        self.lines = 0;
        if self.in_fence {
            self.current.push_str(FENCE);
            self.current.push('\n');
            self.chars = FENCE.len() + 1;
        }
    }

    fn finish(mut self) -> Vec<String> {
        if self.lines > 0 {
            self.flush();
        }
        self.done
    }
}

fn wrap_line(line: &str, budget: usize) -> Vec<String> {
    if line.chars().count() < budget {
        return vec![line.to_string()];
    }
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut chars = 0;
    // One slot per piece stays free for the newline
    for grapheme in line.graphemes(true) {
        let len = grapheme.chars().count();
        if chars > 0 && chars + len >= budget {
            pieces.push(std::mem::take(&mut piece));
            chars = 0;
        }
        piece.push_str(grapheme);
        chars += len;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use deepseek_summarizer::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}
