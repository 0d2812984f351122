//! Bidi Direction Estimation and Formatting
//!
//! Estimation is a word count: each whitespace-separated token whose first
//! strong character is RTL votes RTL, every other token with a strong LTR
//! character votes LTR. URLs and numerals only count as a weak LTR signal.
//!
//! Formatters are pure functions of their global direction, so one instance
//! per direction is cached for the lifetime of a [`BidiFormatters`].

use regex::Regex;
use std::borrow::Cow;
use std::sync::{LazyLock, OnceLock};

use crate::content::{ContentKind, Dir, SanitizedContent, Stringable};

/// Left-to-right embedding.
pub const LRE: &str = "\u{202A}";
/// Right-to-left embedding.
pub const RLE: &str = "\u{202B}";
/// Pop directional formatting.
pub const PDF: &str = "\u{202C}";
/// Left-to-right mark.
pub const LRM: &str = "\u{200E}";
/// Right-to-left mark.
pub const RLM: &str = "\u{200F}";

/// Share of strong tokens that must be RTL, exclusive, for RTL overall.
pub const RTL_ESTIMATION_THRESHOLD: f64 = 0.40;

// Practical approximation of the strong ranges, not the full Unicode
// bidi classes.
const LTR_CHARS: &str = r"A-Za-z\x{C0}-\x{D6}\x{D8}-\x{F6}\x{F8}-\x{2B8}\x{300}-\x{590}\x{800}-\x{1FFF}\x{200E}\x{2C00}-\x{FB1C}\x{FE00}-\x{FE6F}\x{FEFD}-\x{FFFF}";
const RTL_CHARS: &str = r"\x{591}-\x{7FF}\x{200F}\x{FB1D}-\x{FDFF}\x{FE70}-\x{FEFC}";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("bidi pattern should compile")
}

static HTML_SKIP: LazyLock<Regex> = LazyLock::new(|| compile(r"<[^>]*>|&[^;]+;"));
static HAS_NUMERALS: LazyLock<Regex> = LazyLock::new(|| compile(r"\d"));
static IS_REQUIRED_LTR: LazyLock<Regex> = LazyLock::new(|| compile(r"^https?://"));
static HAS_LTR_CHAR: LazyLock<Regex> = LazyLock::new(|| compile(&format!("[{LTR_CHARS}]")));

// First strong character is RTL.
static RTL_DIR_CHECK: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!("^[^{LTR_CHARS}]*[{RTL_CHARS}]")));

// Last strong character is LTR / RTL.
static LTR_EXIT_DIR_CHECK: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!("[{LTR_CHARS}][^{RTL_CHARS}]*$")));
static RTL_EXIT_DIR_CHECK: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!("[{RTL_CHARS}][^{LTR_CHARS}]*$")));

fn strip_html_if_needed(text: &str, is_html: bool) -> Cow<'_, str> {
    if is_html {
        HTML_SKIP.replace_all(text, "")
    } else {
        Cow::Borrowed(text)
    }
}

fn ends_with_ltr(text: &str, is_html: bool) -> bool {
    LTR_EXIT_DIR_CHECK.is_match(&strip_html_if_needed(text, is_html))
}

fn ends_with_rtl(text: &str, is_html: bool) -> bool {
    RTL_EXIT_DIR_CHECK.is_match(&strip_html_if_needed(text, is_html))
}

/// Estimates the overall direction of `text`. With `is_html`, tags and
/// character references are dropped before counting.
pub fn estimate_direction(text: &str, is_html: bool) -> Dir {
    let mut rtl_count = 0u32;
    let mut total_count = 0u32;
    let mut has_weakly_ltr = false;

    for token in strip_html_if_needed(text, is_html).split_whitespace() {
        if RTL_DIR_CHECK.is_match(token) {
            rtl_count += 1;
            total_count += 1;
        } else if IS_REQUIRED_LTR.is_match(token) {
            has_weakly_ltr = true;
        } else if HAS_LTR_CHAR.is_match(token) {
            total_count += 1;
        } else if HAS_NUMERALS.is_match(token) {
            has_weakly_ltr = true;
        }
    }

    if total_count == 0 {
        return if has_weakly_ltr { Dir::Ltr } else { Dir::Neutral };
    }
    if f64::from(rtl_count) / f64::from(total_count) > RTL_ESTIMATION_THRESHOLD {
        Dir::Rtl
    } else {
        Dir::Ltr
    }
}

fn is_content_html<V: Stringable + ?Sized>(value: &V) -> bool {
    value.content_kind() == Some(ContentKind::Html)
}

/// Direction of `value`: the known direction if it carries one, otherwise
/// estimated. HTML content is always estimated markup-aware.
pub fn text_dir<V: Stringable + ?Sized>(value: &V, is_html: bool) -> Dir {
    if let Some(dir) = value.content_dir() {
        return dir;
    }
    let is_html = is_html || is_content_html(value);
    estimate_direction(&value.to_display_string(), is_html)
}

/// Formats content for insertion into a context of a fixed direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidiFormatter {
    direction: Dir,
}

impl BidiFormatter {
    pub fn new(direction: Dir) -> Self {
        Self { direction }
    }

    pub fn direction(&self) -> Dir {
        self.direction
    }

    fn opposes(&self, content_dir: Dir) -> bool {
        !content_dir.is_neutral() && content_dir != self.direction
    }

    /// `dir="rtl"` / `dir="ltr"` when `content_dir` differs from the
    /// formatter direction and is not neutral, else empty.
    pub fn attr(&self, content_dir: Dir) -> &'static str {
        if !self.opposes(content_dir) {
            return "";
        }
        match content_dir {
            Dir::Rtl => r#"dir="rtl""#,
            _ => r#"dir="ltr""#,
        }
    }

    /// A mark matching the formatter direction when the content's overall
    /// or exit direction opposes it, so following neutral characters are
    /// not pulled into the content's run.
    pub fn mark_after(&self, content_dir: Dir, text: &str, is_html: bool) -> &'static str {
        let is_ltr = self.direction == Dir::Ltr;
        let is_rtl = self.direction == Dir::Rtl;

        if content_dir.as_i8() * self.direction.as_i8() < 0
            || (is_ltr && ends_with_rtl(text, is_html))
            || (is_rtl && ends_with_ltr(text, is_html))
        {
            if is_ltr {
                LRM
            } else {
                RLM
            }
        } else {
            ""
        }
    }

    pub fn span_wrap(&self, content_dir: Dir, text: &str) -> String {
        let mark = self.mark_after(content_dir, text, true);
        if self.opposes(content_dir) {
            format!("<span {}>{}</span>{}", self.attr(content_dir), text, mark)
        } else {
            format!("{}{}", text, mark)
        }
    }

    pub fn unicode_wrap(&self, content_dir: Dir, text: &str, is_html: bool) -> String {
        let mark = self.mark_after(content_dir, text, is_html);
        if self.opposes(content_dir) {
            let embed = if content_dir == Dir::Rtl { RLE } else { LRE };
            format!("{}{}{}{}", embed, text, PDF, mark)
        } else {
            format!("{}{}", text, mark)
        }
    }
}

/// Lazily built formatter per global direction.
#[derive(Debug)]
pub struct BidiFormatters {
    slots: [OnceLock<BidiFormatter>; 3],
}

impl BidiFormatters {
    pub fn new() -> Self {
        Self {
            slots: [OnceLock::new(), OnceLock::new(), OnceLock::new()],
        }
    }

    pub fn get(&self, global_dir: Dir) -> &BidiFormatter {
        let slot = &self.slots[(global_dir.as_i8() + 1) as usize];
        slot.get_or_init(|| BidiFormatter::new(global_dir))
    }

    /// Directionality attribute for `value` in a `global_dir` context.
    pub fn dir_attr<V: Stringable + ?Sized>(
        &self,
        global_dir: Dir,
        value: &V,
        is_html: bool,
    ) -> SanitizedContent {
        let content_dir = text_dir(value, is_html);
        SanitizedContent::new(self.get(global_dir).attr(content_dir), ContentKind::Attributes)
    }

    pub fn mark_after<V: Stringable + ?Sized>(
        &self,
        global_dir: Dir,
        value: &V,
        is_html: bool,
    ) -> String {
        let is_html = is_html || is_content_html(value);
        let content_dir = text_dir(value, is_html);
        self.get(global_dir)
            .mark_after(content_dir, &value.to_display_string(), is_html)
            .to_string()
    }

    /// Wraps `value` in a `dir` span when its direction opposes the
    /// context. Always treated as HTML.
    pub fn span_wrap<V: Stringable + ?Sized>(&self, global_dir: Dir, value: &V) -> String {
        let content_dir = text_dir(value, true);
        self.get(global_dir)
            .span_wrap(content_dir, &value.to_display_string())
    }

    /// Brackets `value` with embedding characters when its direction
    /// opposes the context. HTML and JS string content keep their kind;
    /// plain text comes back as unsanitized text.
    pub fn unicode_wrap<V: Stringable + ?Sized>(&self, global_dir: Dir, value: &V) -> SanitizedContent {
        let is_html = is_content_html(value);
        let content_dir = text_dir(value, is_html);
        let formatter = self.get(global_dir);
        let wrapped = formatter.unicode_wrap(content_dir, &value.to_display_string(), is_html);

        match value.content_kind() {
            Some(kind @ (ContentKind::Html | ContentKind::JsStrChars)) => {
                SanitizedContent::with_dir(wrapped, kind, formatter.direction())
            }
            _ => SanitizedContent::new(wrapped, ContentKind::Text),
        }
    }
}

impl Default for BidiFormatters {
    fn default() -> Self {
        Self::new()
    }
}

/// CSS edge where text in direction `dir` starts.
pub fn bidi_start_edge(dir: Dir) -> &'static str {
    if dir == Dir::Rtl {
        "right"
    } else {
        "left"
    }
}

pub fn bidi_end_edge(dir: Dir) -> &'static str {
    if dir == Dir::Rtl {
        "left"
    } else {
        "right"
    }
}

pub fn bidi_mark(dir: Dir) -> &'static str {
    if dir == Dir::Rtl {
        RLM
    } else {
        LRM
    }
}
