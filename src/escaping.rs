//! Escaper Tables - Context-Sensitive Output Encoding
//!
//! Each context pairs one character-class matcher (the dangerous set) with
//! one substitution table shared by its context family. Output is produced
//! in a single linear scan. Escaping is not idempotent: re-escaping
//! over-encodes, it never under-encodes.

use regex::{Captures, Regex};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

use crate::content::Stringable;

/// Sorted by character so lookups can binary search.
type EscapeTable = &'static [(char, &'static str)];

static HTML_ESCAPES: EscapeTable = &[
    ('\0', "&#0;"),
    ('\t', "&#9;"),
    ('\n', "&#10;"),
    ('\u{0b}', "&#11;"),
    ('\u{0c}', "&#12;"),
    ('\r', "&#13;"),
    (' ', "&#32;"),
    ('"', "&quot;"),
    ('&', "&amp;"),
    ('\'', "&#39;"),
    ('-', "&#45;"),
    ('/', "&#47;"),
    ('<', "&lt;"),
    ('=', "&#61;"),
    ('>', "&gt;"),
    ('`', "&#96;"),
    ('\u{85}', "&#133;"),
    ('\u{a0}', "&#160;"),
    ('\u{2028}', "&#8232;"),
    ('\u{2029}', "&#8233;"),
];

static JS_ESCAPES: EscapeTable = &[
    ('\0', r"\x00"),
    ('\u{08}', r"\x08"),
    ('\t', r"\t"),
    ('\n', r"\n"),
    ('\u{0b}', r"\x0b"),
    ('\u{0c}', r"\f"),
    ('\r', r"\r"),
    ('"', r"\x22"),
    ('$', r"\x24"),
    ('&', r"\x26"),
    ('\'', r"\x27"),
    ('(', r"\x28"),
    (')', r"\x29"),
    ('*', r"\x2a"),
    ('+', r"\x2b"),
    (',', r"\x2c"),
    ('-', r"\x2d"),
    ('.', r"\x2e"),
    ('/', r"\/"),
    (':', r"\x3a"),
    ('<', r"\x3c"),
    ('=', r"\x3d"),
    ('>', r"\x3e"),
    ('?', r"\x3f"),
    ('[', r"\x5b"),
    ('\\', r"\\"),
    (']', r"\x5d"),
    ('^', r"\x5e"),
    ('{', r"\x7b"),
    ('|', r"\x7c"),
    ('}', r"\x7d"),
    ('\u{85}', r"\x85"),
    ('\u{2028}', r"\u2028"),
    ('\u{2029}', r"\u2029"),
];

static CSS_ESCAPES: EscapeTable = &[
    ('\0', r"\0 "),
    ('\u{08}', r"\8 "),
    ('\t', r"\9 "),
    ('\n', r"\a "),
    ('\u{0b}', r"\b "),
    ('\u{0c}', r"\c "),
    ('\r', r"\d "),
    ('"', r"\22 "),
    ('&', r"\26 "),
    ('\'', r"\27 "),
    ('(', r"\28 "),
    (')', r"\29 "),
    ('*', r"\2a "),
    ('/', r"\2f "),
    (':', r"\3a "),
    (';', r"\3b "),
    ('<', r"\3c "),
    ('=', r"\3d "),
    ('>', r"\3e "),
    ('@', r"\40 "),
    ('\\', r"\5c "),
    ('{', r"\7b "),
    ('}', r"\7d "),
    ('\u{85}', r"\85 "),
    ('\u{a0}', r"\a0 "),
    ('\u{2028}', r"\2028 "),
    ('\u{2029}', r"\2029 "),
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("escaper pattern should compile")
}

static ESCAPE_HTML_MATCHER: LazyLock<Regex> = LazyLock::new(|| compile(r"[\x00\x22\x26\x27\x3c\x3e]"));

static NORMALIZE_HTML_MATCHER: LazyLock<Regex> = LazyLock::new(|| compile(r"[\x00\x22\x27\x3c\x3e]"));

static ESCAPE_HTML_NOSPACE_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"[\x00\x09-\x0d\x20\x22\x26\x27\x2d\x2f\x3c-\x3e\x60\x{85}\x{a0}\x{2028}\x{2029}]")
});

static NORMALIZE_HTML_NOSPACE_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"[\x00\x09-\x0d\x20\x22\x27\x2d\x2f\x3c-\x3e\x60\x{85}\x{a0}\x{2028}\x{2029}]")
});

static ESCAPE_JS_STRING_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"[\x00\x08-\x0d\x22\x26\x27\x2f\x3c-\x3e\x5b-\x5d\x7b\x7d\x{85}\x{2028}\x{2029}]")
});

static ESCAPE_JS_REGEX_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"[\x00\x08-\x0d\x22\x24\x26-\x2f\x3a\x3c-\x3f\x5b-\x5e\x7b-\x7d\x{85}\x{2028}\x{2029}]")
});

static ESCAPE_CSS_STRING_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"[\x00\x08-\x0d\x22\x26-\x2a\x2f\x3a-\x3e\x40\x5c\x7b\x7d\x{85}\x{a0}\x{2028}\x{2029}]")
});

// Controls, space, quotes, parens, angle brackets, backslash, braces, DEL,
// extra newlines, and the full-width forms of URI reserved characters.
static NORMALIZE_URI_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"[\x00-\x20\x22\x27-\x29\x3c\x3e\x5c\x7b\x7d\x7f\x{85}\x{a0}\x{2028}\x{2029}",
        r"\x{ff01}\x{ff03}\x{ff04}\x{ff06}-\x{ff0c}\x{ff0f}\x{ff1a}\x{ff1b}\x{ff1d}\x{ff1f}",
        r"\x{ff20}\x{ff3b}\x{ff3d}]",
    ))
});

// Everything outside the RFC 3986 unreserved set.
static ESCAPE_URI_MATCHER: LazyLock<Regex> = LazyLock::new(|| compile(r"[^A-Za-z0-9\-._~]"));

#[derive(Clone, Copy)]
enum Substitution {
    Table(EscapeTable),
    PercentEncode,
}

impl Substitution {
    fn replacement(self, ch: char) -> String {
        match self {
            Substitution::Table(table) => match table.binary_search_by_key(&ch, |&(c, _)| c) {
                Ok(idx) => table[idx].1.to_string(),
                Err(_) => ch.to_string(),
            },
            Substitution::PercentEncode => percent_encode_char(ch),
        }
    }
}

/// Uppercase `%XX` escapes of the character's UTF-8 bytes.
pub fn percent_encode_char(ch: char) -> String {
    let mut buf = [0u8; 4];
    ch.encode_utf8(&mut buf)
        .bytes()
        .map(|b| format!("%{:02X}", b))
        .collect()
}

fn substitute(matcher: &Regex, substitution: Substitution, value: &str) -> String {
    matcher
        .replace_all(value, |caps: &Captures<'_>| {
            caps[0]
                .chars()
                .map(|ch| substitution.replacement(ch))
                .collect::<String>()
        })
        .into_owned()
}

/// Output contexts an escaper can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscapeContext {
    Html,
    HtmlNospace,
    NormalizeHtml,
    NormalizeHtmlNospace,
    JsString,
    JsRegex,
    CssString,
    UriComponent,
    NormalizeUri,
}

impl EscapeContext {
    pub const ALL: [EscapeContext; 9] = [
        EscapeContext::Html,
        EscapeContext::HtmlNospace,
        EscapeContext::NormalizeHtml,
        EscapeContext::NormalizeHtmlNospace,
        EscapeContext::JsString,
        EscapeContext::JsRegex,
        EscapeContext::CssString,
        EscapeContext::UriComponent,
        EscapeContext::NormalizeUri,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EscapeContext::Html => "html",
            EscapeContext::HtmlNospace => "html-nospace",
            EscapeContext::NormalizeHtml => "normalize-html",
            EscapeContext::NormalizeHtmlNospace => "normalize-html-nospace",
            EscapeContext::JsString => "js-string",
            EscapeContext::JsRegex => "js-regex",
            EscapeContext::CssString => "css-string",
            EscapeContext::UriComponent => "uri-component",
            EscapeContext::NormalizeUri => "normalize-uri",
        }
    }

    fn matcher(self) -> &'static Regex {
        match self {
            EscapeContext::Html => &ESCAPE_HTML_MATCHER,
            EscapeContext::HtmlNospace => &ESCAPE_HTML_NOSPACE_MATCHER,
            EscapeContext::NormalizeHtml => &NORMALIZE_HTML_MATCHER,
            EscapeContext::NormalizeHtmlNospace => &NORMALIZE_HTML_NOSPACE_MATCHER,
            EscapeContext::JsString => &ESCAPE_JS_STRING_MATCHER,
            EscapeContext::JsRegex => &ESCAPE_JS_REGEX_MATCHER,
            EscapeContext::CssString => &ESCAPE_CSS_STRING_MATCHER,
            EscapeContext::UriComponent => &ESCAPE_URI_MATCHER,
            EscapeContext::NormalizeUri => &NORMALIZE_URI_MATCHER,
        }
    }

    fn substitution(self) -> Substitution {
        match self {
            EscapeContext::Html
            | EscapeContext::HtmlNospace
            | EscapeContext::NormalizeHtml
            | EscapeContext::NormalizeHtmlNospace => Substitution::Table(HTML_ESCAPES),
            EscapeContext::JsString | EscapeContext::JsRegex => Substitution::Table(JS_ESCAPES),
            EscapeContext::CssString => Substitution::Table(CSS_ESCAPES),
            EscapeContext::UriComponent | EscapeContext::NormalizeUri => {
                Substitution::PercentEncode
            }
        }
    }
}

impl fmt::Display for EscapeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown context: {0}")]
pub struct UnknownContext(pub String);

impl FromStr for EscapeContext {
    type Err = UnknownContext;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EscapeContext::ALL
            .into_iter()
            .find(|ctx| ctx.name() == s)
            .ok_or_else(|| UnknownContext(s.to_string()))
    }
}

/// Stringifies `value` and escapes it for `context`. Total: never fails.
pub fn escape<V: Stringable + ?Sized>(context: EscapeContext, value: &V) -> String {
    substitute(
        context.matcher(),
        context.substitution(),
        &value.to_display_string(),
    )
}

/// Escapes for HTML PCDATA and quoted attribute values.
pub fn escape_html<V: Stringable + ?Sized>(value: &V) -> String {
    escape(EscapeContext::Html, value)
}

/// Like [`escape_html`] but leaves `&` alone so existing entities survive.
pub fn normalize_html<V: Stringable + ?Sized>(value: &V) -> String {
    escape(EscapeContext::NormalizeHtml, value)
}

/// Escapes for unquoted attribute values, where whitespace, `-`, `/`, `=`
/// and backticks would otherwise end or extend the value.
pub fn escape_html_nospace<V: Stringable + ?Sized>(value: &V) -> String {
    escape(EscapeContext::HtmlNospace, value)
}

pub fn normalize_html_nospace<V: Stringable + ?Sized>(value: &V) -> String {
    escape(EscapeContext::NormalizeHtmlNospace, value)
}

/// Escapes for the body of a JS string literal, including `</script>`
/// breakout.
pub fn escape_js_string<V: Stringable + ?Sized>(value: &V) -> String {
    escape(EscapeContext::JsString, value)
}

/// Escapes for the body of a JS regular expression literal.
pub fn escape_js_regex<V: Stringable + ?Sized>(value: &V) -> String {
    escape(EscapeContext::JsRegex, value)
}

/// Escapes for the body of a quoted CSS string.
pub fn escape_css_string<V: Stringable + ?Sized>(value: &V) -> String {
    escape(EscapeContext::CssString, value)
}

/// Percent-encodes everything except unreserved URI characters.
pub fn escape_uri<V: Stringable + ?Sized>(value: &V) -> String {
    escape(EscapeContext::UriComponent, value)
}

/// Percent-encodes characters that could break out of a URI embedded in
/// HTML, CSS or JS, without touching URI delimiters.
pub fn normalize_uri<V: Stringable + ?Sized>(value: &V) -> String {
    escape(EscapeContext::NormalizeUri, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sorted(table: EscapeTable) {
        for pair in table.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{:?} before {:?}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn test_tables_sorted() {
        assert_sorted(HTML_ESCAPES);
        assert_sorted(JS_ESCAPES);
        assert_sorted(CSS_ESCAPES);
    }

    #[test]
    fn test_every_matched_char_uses_its_table_entry() {
        for ctx in EscapeContext::ALL {
            let Substitution::Table(table) = ctx.substitution() else {
                continue;
            };
            for ch in '\0'..='\u{3000}' {
                let input = ch.to_string();
                let output = escape(ctx, input.as_str());
                if ctx.matcher().is_match(&input) {
                    let entry = table.binary_search_by_key(&ch, |&(c, _)| c);
                    assert!(entry.is_ok(), "{ctx}: {ch:?} has no table entry");
                    if let Ok(idx) = entry {
                        assert_eq!(output, table[idx].1, "{ctx}: {ch:?}");
                    }
                } else {
                    assert_eq!(output, input, "{ctx}: {ch:?}");
                }
            }
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("a-b c/d"), "a-b c/d");
        assert_eq!(escape_html("\0"), "&#0;");
    }

    #[test]
    fn test_normalize_html_keeps_entities() {
        assert_eq!(normalize_html("&lt;<"), "&lt;&lt;");
        assert_eq!(normalize_html_nospace("a &amp; b"), "a&#32;&amp;&#32;b");
    }

    #[test]
    fn test_escape_html_nospace() {
        assert_eq!(
            escape_html_nospace("a b\t-/=`"),
            "a&#32;b&#9;&#45;&#47;&#61;&#96;"
        );
        assert_eq!(escape_html_nospace("\u{a0}\u{2028}"), "&#160;&#8232;");
    }

    #[test]
    fn test_escape_js_string() {
        assert_eq!(escape_js_string("</script>"), r"\x3c\/script\x3e");
        assert_eq!(escape_js_string("it's \"q\"\n"), r#"it\x27s \x22q\x22\n"#);
        assert_eq!(escape_js_string("a.b(c)"), "a.b(c)");
        assert_eq!(escape_js_string("\u{2028}"), r"\u2028");
    }

    #[test]
    fn test_escape_js_regex_adds_regex_specials() {
        assert_eq!(escape_js_regex("a.b(c)"), r"a\x2eb\x28c\x29");
        assert_eq!(escape_js_regex("$^|?*+"), r"\x24\x5e\x7c\x3f\x2a\x2b");
        assert_eq!(escape_js_regex("a,b-c:d"), r"a\x2cb\x2dc\x3ad");
    }

    #[test]
    fn test_escape_css_string() {
        assert_eq!(escape_css_string("a@b\\c"), r"a\40 b\5c c");
        assert_eq!(escape_css_string("</style>"), r"\3c \2f style\3e ");
        assert_eq!(escape_css_string("x;y"), r"x\3b y");
        assert_eq!(escape_css_string("plain-word_1"), "plain-word_1");
    }

    #[test]
    fn test_escape_uri() {
        assert_eq!(escape_uri("a b&c=d/é"), "a%20b%26c%3Dd%2F%C3%A9");
        assert_eq!(escape_uri("AZaz09-._~"), "AZaz09-._~");
    }

    #[test]
    fn test_normalize_uri() {
        assert_eq!(normalize_uri("/a b?c=(d)"), "/a%20b?c=%28d%29");
        assert_eq!(normalize_uri("\u{ff1a}"), "%EF%BC%9A");
        assert_eq!(normalize_uri("\u{7f}\u{85}"), "%7F%C2%85");
        assert_eq!(normalize_uri("http://x/?a=1&b=2#f"), "http://x/?a=1&b=2#f");
    }

    #[test]
    fn test_escape_stringifies_non_strings() {
        assert_eq!(escape_html(&42i64), "42");
        assert_eq!(escape_html(&true), "true");
        assert_eq!(escape_html(&1.5f64), "1.5");
    }

    #[test]
    fn test_context_names_roundtrip() {
        for ctx in EscapeContext::ALL {
            assert_eq!(ctx.name().parse::<EscapeContext>(), Ok(ctx));
        }
        assert!("nope".parse::<EscapeContext>().is_err());
    }

    #[test]
    fn test_escaping_overencodes_when_repeated() {
        let once = escape_html("<");
        assert_eq!(escape_html(&once), "&amp;lt;");
    }
}
