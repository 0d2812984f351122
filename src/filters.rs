//! Filter System - Rule/Sentinel Separation
//!
//! Rules decide whether a value is a fully-formed, non-dangerous construct.
//! Rejection never raises: the value is replaced in place by the rule's
//! fixed sentinel, so one bad value cannot abort a render.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

use crate::content::Stringable;
use crate::escaping::{normalize_uri, UnknownContext};

/// Generic rejection output for attributes, element names and CSS.
pub const INNOCUOUS_OUTPUT: &str = "zSoyz";

/// Rejection output for URI filters.
pub const INVALID_URI: &str = "about:invalid#zSoyz";

/// Rejection output for image data URIs; still a well-formed image URI.
pub const INVALID_IMAGE_DATA_URI: &str = "data:image/gif;base64,zSoyz";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("filter pattern should compile")
}

/// Filter rule trait - accepts or rejects a stringified value
pub trait FilterRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn accepts(&self, value: &str) -> bool;
    fn sentinel(&self) -> &'static str;

    /// Applied only to accepted values.
    fn finish(&self, value: &str) -> String {
        value.to_string()
    }
}

/// A whitelist pattern, optionally guarded by a deny pattern that must not
/// match anywhere it is anchored.
pub struct PatternRule {
    name: &'static str,
    deny: Option<&'static LazyLock<Regex>>,
    allow: &'static LazyLock<Regex>,
    sentinel: &'static str,
    normalizes_uri: bool,
}

impl FilterRule for PatternRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn accepts(&self, value: &str) -> bool {
        let denied = self.deny.is_some_and(|deny| deny.is_match(value));
        !denied && self.allow.is_match(value)
    }

    fn sentinel(&self) -> &'static str {
        self.sentinel
    }

    fn finish(&self, value: &str) -> String {
        if self.normalizes_uri {
            normalize_uri(value)
        } else {
            value.to_string()
        }
    }
}

// --- Current tables ---

// Bans `expression(...)` and `binding` prefixes, and any `/` or `*` that
// would open or close a comment.
static CSS_VALUE_DENY: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^-*(?:expression|(?:moz-)?binding)|//|/\*|\*/"));

static CSS_VALUE_ALLOW: LazyLock<Regex> = LazyLock::new(|| {
    let functions = "calc|cubic-bezier|drop-shadow|hsl|hsla|hue-rotate|invert|linear-gradient\
                     |max|min|rgb|rgba|rotate|rotateZ|translate|translate3d|translateX\
                     |translateY|var";
    let arg = r"(?:[/*]?[\- \t,+.!#%_0-9a-zA-Z]+)";
    compile(&format!(
        concat!(
            r"(?i)^(?:(?:",
            // Identifier, class or ID literal, hex color.
            r"[.#]?-?[_a-z0-9\-]+(?:-[_a-z0-9\-]+)*-?",
            // Allow-listed function call with one level of nesting.
            r"|(?:{f})\((?:{a}*|(?:{f})\({a}*\))+\)",
            // Quantity.
            r"|[\-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:e-?[0-9]+)?(?:[a-z]{{1,4}}|%)?",
            // Lone division or multiplication operator.
            r"|[/*]",
            r"|!important",
            r")(?:\s*[, ]\s*|\z))*\z",
        ),
        f = functions,
        a = arg,
    ))
});

static NORMALIZE_URI_DENY: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)^javascript:"));

// A scheme, or no scheme: no `:` or `&` before the first `/`, `?` or `#`.
static NORMALIZE_URI_ALLOW: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^(?:[a-z0-9+.\-]+:|[^&:/?#]*(?:[/?#]|\z))"));

static NORMALIZE_MEDIA_URI_ALLOW: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"(?i)^[^&:/?#]*(?:[/?#]|\z)",
        r"|^https?:",
        r"|^ftp:",
        r"|^data:image/[a-z0-9+\-]+;base64,[a-z0-9+/]+=*\z",
        r"|^blob:",
    ))
});

static IMAGE_DATA_URI_ALLOW: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)^data:image/(?:bmp|gif|jpe?g|png|tiff|webp|x-icon);base64,[a-z0-9+/]+=*\z")
});

static SIP_URI_ALLOW: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^sip:[0-9a-z;=\-+._!~*' /():&$#?@,]+\z"));

static SMS_URI_ALLOW: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^sms:[0-9a-z;=\-+._!~*' /():&$#?@,]+\z"));

static TEL_URI_ALLOW: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^tel:(?:[0-9a-z;=\-+._!~*' /():&$#?@,]|%23|%2C|%3B)+\z"));

static HTML_ATTRIBUTES_DENY: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"(?i)^(?:on|src|(?:action|archive|background|cite|classid|codebase|content|data",
        r"|dsync|href|http-equiv|longdesc|style|usemap)\s*$)",
    ))
});

static HTML_NAME_ALLOW: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)^[a-z0-9_$:\-]*\z"));

static HTML_ELEMENT_NAME_DENY: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"(?i)^(?:base|iframe|link|noframes|noscript|object|script|style|textarea|title",
        r"|xmp)",
    ))
});

static CSP_NONCE_ALLOW: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[a-zA-Z0-9+/_\-]+={0,2}\z"));

pub static FILTER_CSS_VALUE: PatternRule = PatternRule {
    name: "filter_css_value",
    deny: Some(&CSS_VALUE_DENY),
    allow: &CSS_VALUE_ALLOW,
    sentinel: INNOCUOUS_OUTPUT,
    normalizes_uri: false,
};

pub static FILTER_NORMALIZE_URI: PatternRule = PatternRule {
    name: "filter_normalize_uri",
    deny: Some(&NORMALIZE_URI_DENY),
    allow: &NORMALIZE_URI_ALLOW,
    sentinel: INVALID_URI,
    normalizes_uri: true,
};

pub static FILTER_NORMALIZE_MEDIA_URI: PatternRule = PatternRule {
    name: "filter_normalize_media_uri",
    deny: None,
    allow: &NORMALIZE_MEDIA_URI_ALLOW,
    sentinel: INVALID_URI,
    normalizes_uri: true,
};

pub static FILTER_IMAGE_DATA_URI: PatternRule = PatternRule {
    name: "filter_image_data_uri",
    deny: None,
    allow: &IMAGE_DATA_URI_ALLOW,
    sentinel: INVALID_IMAGE_DATA_URI,
    normalizes_uri: false,
};

pub static FILTER_SIP_URI: PatternRule = PatternRule {
    name: "filter_sip_uri",
    deny: None,
    allow: &SIP_URI_ALLOW,
    sentinel: INVALID_URI,
    normalizes_uri: false,
};

pub static FILTER_SMS_URI: PatternRule = PatternRule {
    name: "filter_sms_uri",
    deny: None,
    allow: &SMS_URI_ALLOW,
    sentinel: INVALID_URI,
    normalizes_uri: false,
};

pub static FILTER_TEL_URI: PatternRule = PatternRule {
    name: "filter_tel_uri",
    deny: None,
    allow: &TEL_URI_ALLOW,
    sentinel: INVALID_URI,
    normalizes_uri: false,
};

pub static FILTER_HTML_ATTRIBUTES: PatternRule = PatternRule {
    name: "filter_html_attributes",
    deny: Some(&HTML_ATTRIBUTES_DENY),
    allow: &HTML_NAME_ALLOW,
    sentinel: INNOCUOUS_OUTPUT,
    normalizes_uri: false,
};

pub static FILTER_HTML_ELEMENT_NAME: PatternRule = PatternRule {
    name: "filter_html_element_name",
    deny: Some(&HTML_ELEMENT_NAME_DENY),
    allow: &HTML_NAME_ALLOW,
    sentinel: INNOCUOUS_OUTPUT,
    normalizes_uri: false,
};

pub static FILTER_CSP_NONCE_VALUE: PatternRule = PatternRule {
    name: "filter_csp_nonce_value",
    deny: None,
    allow: &CSP_NONCE_ALLOW,
    sentinel: INNOCUOUS_OUTPUT,
    normalizes_uri: false,
};

/// Older, stricter table generation. Kept apart from the current tables;
/// only reachable through [`TableGeneration::Legacy`] or directly.
pub mod legacy {
    use super::*;

    /// The legacy URI sentinel is a bare fragment.
    pub const INVALID_URI: &str = "#zSoyz";

    static CSS_VALUE_DENY: LazyLock<Regex> =
        LazyLock::new(|| compile(r"(?i)^-*(?:expression|(?:moz-)?binding)"));

    static CSS_VALUE_ALLOW: LazyLock<Regex> = LazyLock::new(|| {
        compile(concat!(
            r"(?i)^(?:[.#]?-?[_a-z0-9\-]+(?:-[_a-z0-9\-]+)*-?",
            r"|-?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[a-z]{1,2}|%)?",
            r"|!important",
            r"|)\z",
        ))
    });

    static NORMALIZE_URI_ALLOW: LazyLock<Regex> =
        LazyLock::new(|| compile(r"(?i)^(?:(?:https?|mailto):|[^&:/?#]*(?:[/?#]|\z))"));

    static HTML_ATTRIBUTES_DENY: LazyLock<Regex> = LazyLock::new(|| {
        compile(concat!(
            r"(?i)^(?:style|on|action|archive|background|cite|classid|codebase|data|dsync",
            r"|href|longdesc|src|usemap)",
        ))
    });

    static HTML_ELEMENT_NAME_DENY: LazyLock<Regex> =
        LazyLock::new(|| compile(r"(?i)^(?:script|style|title|textarea|xmp|no)"));

    pub static FILTER_CSS_VALUE: PatternRule = PatternRule {
        name: "legacy_filter_css_value",
        deny: Some(&CSS_VALUE_DENY),
        allow: &CSS_VALUE_ALLOW,
        sentinel: INNOCUOUS_OUTPUT,
        normalizes_uri: false,
    };

    pub static FILTER_NORMALIZE_URI: PatternRule = PatternRule {
        name: "legacy_filter_normalize_uri",
        deny: None,
        allow: &NORMALIZE_URI_ALLOW,
        sentinel: INVALID_URI,
        normalizes_uri: true,
    };

    pub static FILTER_HTML_ATTRIBUTES: PatternRule = PatternRule {
        name: "legacy_filter_html_attributes",
        deny: Some(&HTML_ATTRIBUTES_DENY),
        allow: &HTML_NAME_ALLOW,
        sentinel: INNOCUOUS_OUTPUT,
        normalizes_uri: false,
    };

    pub static FILTER_HTML_ELEMENT_NAME: PatternRule = PatternRule {
        name: "legacy_filter_html_element_name",
        deny: Some(&HTML_ELEMENT_NAME_DENY),
        allow: &HTML_NAME_ALLOW,
        sentinel: INNOCUOUS_OUTPUT,
        normalizes_uri: false,
    };

    pub fn filter_css_value<V: Stringable + ?Sized>(value: &V) -> String {
        apply_rule(&FILTER_CSS_VALUE, value)
    }

    pub fn filter_normalize_uri<V: Stringable + ?Sized>(value: &V) -> String {
        apply_rule(&FILTER_NORMALIZE_URI, value)
    }

    pub fn filter_html_attributes<V: Stringable + ?Sized>(value: &V) -> String {
        apply_rule(&FILTER_HTML_ATTRIBUTES, value)
    }

    pub fn filter_html_element_name<V: Stringable + ?Sized>(value: &V) -> String {
        apply_rule(&FILTER_HTML_ELEMENT_NAME, value)
    }
}

/// Which generation of filter tables to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableGeneration {
    #[default]
    Current,
    Legacy,
}

/// Output contexts guarded by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterContext {
    CssValue,
    NormalizeUri,
    NormalizeMediaUri,
    ImageDataUri,
    SipUri,
    SmsUri,
    TelUri,
    HtmlAttributes,
    HtmlElementName,
    CspNonceValue,
}

impl FilterContext {
    pub const ALL: [FilterContext; 10] = [
        FilterContext::CssValue,
        FilterContext::NormalizeUri,
        FilterContext::NormalizeMediaUri,
        FilterContext::ImageDataUri,
        FilterContext::SipUri,
        FilterContext::SmsUri,
        FilterContext::TelUri,
        FilterContext::HtmlAttributes,
        FilterContext::HtmlElementName,
        FilterContext::CspNonceValue,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterContext::CssValue => "css-value",
            FilterContext::NormalizeUri => "normalize-uri",
            FilterContext::NormalizeMediaUri => "normalize-media-uri",
            FilterContext::ImageDataUri => "image-data-uri",
            FilterContext::SipUri => "sip-uri",
            FilterContext::SmsUri => "sms-uri",
            FilterContext::TelUri => "tel-uri",
            FilterContext::HtmlAttributes => "html-attributes",
            FilterContext::HtmlElementName => "html-element-name",
            FilterContext::CspNonceValue => "csp-nonce-value",
        }
    }

    /// The rule guarding this context in the given table generation.
    /// Contexts the legacy tables never covered share the current rule.
    pub fn rule(self, generation: TableGeneration) -> &'static PatternRule {
        match (self, generation) {
            (FilterContext::CssValue, TableGeneration::Legacy) => &legacy::FILTER_CSS_VALUE,
            (FilterContext::NormalizeUri, TableGeneration::Legacy) => {
                &legacy::FILTER_NORMALIZE_URI
            }
            (FilterContext::HtmlAttributes, TableGeneration::Legacy) => {
                &legacy::FILTER_HTML_ATTRIBUTES
            }
            (FilterContext::HtmlElementName, TableGeneration::Legacy) => {
                &legacy::FILTER_HTML_ELEMENT_NAME
            }
            (FilterContext::CssValue, _) => &FILTER_CSS_VALUE,
            (FilterContext::NormalizeUri, _) => &FILTER_NORMALIZE_URI,
            (FilterContext::NormalizeMediaUri, _) => &FILTER_NORMALIZE_MEDIA_URI,
            (FilterContext::ImageDataUri, _) => &FILTER_IMAGE_DATA_URI,
            (FilterContext::SipUri, _) => &FILTER_SIP_URI,
            (FilterContext::SmsUri, _) => &FILTER_SMS_URI,
            (FilterContext::TelUri, _) => &FILTER_TEL_URI,
            (FilterContext::HtmlAttributes, _) => &FILTER_HTML_ATTRIBUTES,
            (FilterContext::HtmlElementName, _) => &FILTER_HTML_ELEMENT_NAME,
            (FilterContext::CspNonceValue, _) => &FILTER_CSP_NONCE_VALUE,
        }
    }
}

impl fmt::Display for FilterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterContext {
    type Err = UnknownContext;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterContext::ALL
            .into_iter()
            .find(|ctx| ctx.name() == s)
            .ok_or_else(|| UnknownContext(s.to_string()))
    }
}

/// Result of running one filter over one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Accepted(String),
    Rejected {
        filter: &'static str,
        sentinel: &'static str,
    },
}

impl FilterOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, FilterOutcome::Rejected { .. })
    }

    pub fn into_output(self) -> String {
        match self {
            FilterOutcome::Accepted(output) => output,
            FilterOutcome::Rejected { sentinel, .. } => sentinel.to_string(),
        }
    }
}

/// Runs `rule` over the stringified value, recording which way it went.
pub fn evaluate<V: Stringable + ?Sized>(rule: &dyn FilterRule, value: &V) -> FilterOutcome {
    let value = value.to_display_string();
    if rule.accepts(&value) {
        FilterOutcome::Accepted(rule.finish(&value))
    } else {
        debug!(filter = rule.name(), len = value.len(), "Filter rejected value");
        FilterOutcome::Rejected {
            filter: rule.name(),
            sentinel: rule.sentinel(),
        }
    }
}

pub fn apply_rule<V: Stringable + ?Sized>(rule: &dyn FilterRule, value: &V) -> String {
    evaluate(rule, value).into_output()
}

/// Filters with the given table generation. Total: returns either the
/// (possibly normalized) value or the context's sentinel.
pub fn filter_with<V: Stringable + ?Sized>(
    generation: TableGeneration,
    context: FilterContext,
    value: &V,
) -> String {
    apply_rule(context.rule(generation), value)
}

/// Filters with the current tables.
pub fn filter<V: Stringable + ?Sized>(context: FilterContext, value: &V) -> String {
    filter_with(TableGeneration::Current, context, value)
}

pub fn filter_css_value<V: Stringable + ?Sized>(value: &V) -> String {
    apply_rule(&FILTER_CSS_VALUE, value)
}

/// Rejects `javascript:` and masked schemes, then normalizes.
pub fn filter_normalize_uri<V: Stringable + ?Sized>(value: &V) -> String {
    apply_rule(&FILTER_NORMALIZE_URI, value)
}

/// Allows only schemes safe for media sources, then normalizes.
pub fn filter_normalize_media_uri<V: Stringable + ?Sized>(value: &V) -> String {
    apply_rule(&FILTER_NORMALIZE_MEDIA_URI, value)
}

pub fn filter_image_data_uri<V: Stringable + ?Sized>(value: &V) -> String {
    apply_rule(&FILTER_IMAGE_DATA_URI, value)
}

pub fn filter_sip_uri<V: Stringable + ?Sized>(value: &V) -> String {
    apply_rule(&FILTER_SIP_URI, value)
}

pub fn filter_sms_uri<V: Stringable + ?Sized>(value: &V) -> String {
    apply_rule(&FILTER_SMS_URI, value)
}

pub fn filter_tel_uri<V: Stringable + ?Sized>(value: &V) -> String {
    apply_rule(&FILTER_TEL_URI, value)
}

pub fn filter_html_attributes<V: Stringable + ?Sized>(value: &V) -> String {
    apply_rule(&FILTER_HTML_ATTRIBUTES, value)
}

pub fn filter_html_element_name<V: Stringable + ?Sized>(value: &V) -> String {
    apply_rule(&FILTER_HTML_ELEMENT_NAME, value)
}

pub fn filter_csp_nonce_value<V: Stringable + ?Sized>(value: &V) -> String {
    apply_rule(&FILTER_CSP_NONCE_VALUE, value)
}

// --- Tag matching for downstream rich-text sanitizers ---

/// Loose matcher for tags, doctypes and simple comments. Group 1 holds the
/// tag name when there is one.
pub static HTML_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"<(?:!|/?([a-zA-Z][a-zA-Z0-9:\-]*))(?:[^>'"]|"[^"]*"|'[^']*')*>"#)
});

/// Inert inline tags a sanitizer may keep.
pub const SAFE_TAG_WHITELIST: &[&str] = &["b", "br", "em", "i", "s", "strong", "sub", "sup", "u"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag<'a> {
    pub span: Range<usize>,
    /// `None` for doctypes and comments.
    pub name: Option<&'a str>,
}

impl HtmlTag<'_> {
    pub fn is_closing(&self, text: &str) -> bool {
        text[self.span.clone()].starts_with("</")
    }
}

/// All tag-like spans in `text`, in order.
pub fn html_tags(text: &str) -> impl Iterator<Item = HtmlTag<'_>> {
    HTML_TAG_REGEX.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(HtmlTag {
            span: whole.range(),
            name: caps.get(1).map(|m| m.as_str()),
        })
    })
}

pub fn is_safe_tag(name: &str) -> bool {
    SAFE_TAG_WHITELIST
        .iter()
        .any(|tag| tag.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_value_accepts_tokens() {
        for ok in [
            "1px",
            "#fff",
            "red",
            "a, b",
            "-2.5e3em",
            "!important",
            "calc(1px + 2px)",
            "rgb(1,2,3)",
            "translateX(calc(1px))",
            "min(1px, var(x))",
            "calc(100% / 3)",
            "",
        ] {
            assert_eq!(filter_css_value(ok), ok, "{ok}");
        }
    }

    #[test]
    fn test_css_value_rejects_dangerous() {
        for bad in [
            "expression(alert(1))",
            "-moz-binding",
            "--binding",
            "url(x)",
            "a//b",
            "1px/*x*/",
            "calc(1px//2)",
            "*/",
            "a;b",
            "color:red",
        ] {
            assert_eq!(filter_css_value(bad), INNOCUOUS_OUTPUT, "{bad}");
        }
    }

    #[test]
    fn test_normalize_uri_filter() {
        assert_eq!(filter_normalize_uri("javascript:alert(1)"), INVALID_URI);
        assert_eq!(filter_normalize_uri("JavaScript:alert(1)"), INVALID_URI);
        assert_eq!(filter_normalize_uri("/a/b?c=1"), "/a/b?c=1");
        assert_eq!(filter_normalize_uri("https://x.com/a b"), "https://x.com/a%20b");
        assert_eq!(filter_normalize_uri("data:text/html,x"), "data:text/html,x");
        assert_eq!(filter_normalize_uri("javascript&#58;x"), INVALID_URI);
        assert_eq!(filter_normalize_uri("foo&lt;bar/baz"), INVALID_URI);
    }

    #[test]
    fn test_normalize_media_uri_filter() {
        assert_eq!(filter_normalize_media_uri("http://x/y.png"), "http://x/y.png");
        assert_eq!(filter_normalize_media_uri("blob:abc"), "blob:abc");
        assert_eq!(
            filter_normalize_media_uri("data:image/png;base64,AAAA=="),
            "data:image/png;base64,AAAA=="
        );
        assert_eq!(filter_normalize_media_uri("data:text/html;base64,AAAA"), INVALID_URI);
        assert_eq!(filter_normalize_media_uri("javascript:x"), INVALID_URI);
    }

    #[test]
    fn test_image_data_uri_filter() {
        assert_eq!(
            filter_image_data_uri("data:image/jpeg;base64,/9j/4AAQ"),
            "data:image/jpeg;base64,/9j/4AAQ"
        );
        assert_eq!(
            filter_image_data_uri("data:image/svg+xml;base64,PHN2Zz4="),
            INVALID_IMAGE_DATA_URI
        );
        assert_eq!(filter_image_data_uri("http://x/y.gif"), INVALID_IMAGE_DATA_URI);
    }

    #[test]
    fn test_sip_sms_tel_filters() {
        assert_eq!(filter_sip_uri("sip:alice@example.com"), "sip:alice@example.com");
        assert_eq!(filter_sip_uri("sip:"), INVALID_URI);
        assert_eq!(filter_sms_uri("sms:+1-555-0100"), "sms:+1-555-0100");
        assert_eq!(filter_sms_uri("sms:<x>"), INVALID_URI);
        assert_eq!(filter_tel_uri("tel:+1%23555"), "tel:+1%23555");
        assert_eq!(filter_tel_uri("tel:+1%20555"), INVALID_URI);
        assert_eq!(filter_tel_uri("javascript:1"), INVALID_URI);
    }

    #[test]
    fn test_html_attribute_filter() {
        assert_eq!(filter_html_attributes("title"), "title");
        assert_eq!(filter_html_attributes("data-foo"), "data-foo");
        assert_eq!(filter_html_attributes("data"), INNOCUOUS_OUTPUT);
        assert_eq!(filter_html_attributes("onclick"), INNOCUOUS_OUTPUT);
        assert_eq!(filter_html_attributes("SRCSET"), INNOCUOUS_OUTPUT);
        assert_eq!(filter_html_attributes("href"), INNOCUOUS_OUTPUT);
        assert_eq!(filter_html_attributes("a b"), INNOCUOUS_OUTPUT);
    }

    #[test]
    fn test_html_element_name_filter() {
        assert_eq!(filter_html_element_name("div"), "div");
        assert_eq!(filter_html_element_name("SCRIPT"), INNOCUOUS_OUTPUT);
        assert_eq!(filter_html_element_name("iframe"), INNOCUOUS_OUTPUT);
        assert_eq!(filter_html_element_name("nav"), "nav");
        assert_eq!(filter_html_element_name("a>"), INNOCUOUS_OUTPUT);
    }

    #[test]
    fn test_csp_nonce_filter() {
        assert_eq!(filter_csp_nonce_value("abc123+/_-=="), "abc123+/_-==");
        assert_eq!(filter_csp_nonce_value("abc==="), INNOCUOUS_OUTPUT);
        assert_eq!(filter_csp_nonce_value("a\"b"), INNOCUOUS_OUTPUT);
        assert_eq!(filter_csp_nonce_value(""), INNOCUOUS_OUTPUT);
    }

    #[test]
    fn test_legacy_tables_differ() {
        assert_eq!(legacy::filter_css_value("calc(1px)"), INNOCUOUS_OUTPUT);
        assert_eq!(legacy::filter_css_value("10px"), "10px");
        assert_eq!(legacy::filter_css_value("1.5rem"), INNOCUOUS_OUTPUT);
        assert_eq!(filter_css_value("1.5rem"), "1.5rem");
        assert_eq!(legacy::filter_normalize_uri("ftp://x"), legacy::INVALID_URI);
        assert_eq!(legacy::filter_normalize_uri("mailto:a@b"), "mailto:a@b");
        assert_eq!(legacy::filter_html_attributes("database"), INNOCUOUS_OUTPUT);
        assert_eq!(filter_html_attributes("database"), "database");
        assert_eq!(legacy::filter_html_element_name("nav"), "nav");
        assert_eq!(legacy::filter_html_element_name("noscript"), INNOCUOUS_OUTPUT);
        assert_eq!(legacy::filter_html_element_name("iframe"), "iframe");
    }

    #[test]
    fn test_filter_with_dispatch() {
        let v = "ftp://x";
        assert_eq!(filter_with(TableGeneration::Current, FilterContext::NormalizeUri, v), v);
        assert_eq!(
            filter_with(TableGeneration::Legacy, FilterContext::NormalizeUri, v),
            legacy::INVALID_URI
        );
        assert_eq!(
            filter_with(TableGeneration::Legacy, FilterContext::TelUri, "tel:1"),
            "tel:1"
        );
    }

    #[test]
    fn test_filter_outcome_reports_rejection() {
        let outcome = evaluate(&FILTER_HTML_ELEMENT_NAME, "script");
        assert!(outcome.is_rejected());
        assert_eq!(
            outcome,
            FilterOutcome::Rejected {
                filter: "filter_html_element_name",
                sentinel: INNOCUOUS_OUTPUT
            }
        );
        assert_eq!(evaluate(&FILTER_HTML_ELEMENT_NAME, "p").into_output(), "p");
    }

    #[test]
    fn test_filter_context_names_roundtrip() {
        for ctx in FilterContext::ALL {
            assert_eq!(ctx.name().parse::<FilterContext>(), Ok(ctx));
        }
    }

    #[test]
    fn test_html_tags() {
        let text = r#"<b>x</b><!-- c --><a href="a>b">y</a>"#;
        let tags: Vec<_> = html_tags(text).collect();
        let names: Vec<_> = tags.iter().map(|t| t.name).collect();
        assert_eq!(names, vec![Some("b"), Some("b"), None, Some("a"), Some("a")]);
        assert!(tags[1].is_closing(text));
        assert_eq!(&text[tags[3].span.clone()], r#"<a href="a>b">"#);
    }

    #[test]
    fn test_safe_tags() {
        assert!(is_safe_tag("em"));
        assert!(is_safe_tag("BR"));
        assert!(!is_safe_tag("script"));
        assert!(!is_safe_tag("span"));
    }
}
