//! Sanitized Value Model
//!
//! A string plus what is already known about it: the content kind that
//! governs which escaping rules have been applied, and an optional known
//! direction that lets bidi logic skip estimation.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Declares what escaping/estimation rules already apply to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentKind {
    Text,
    Html,
    Js,
    JsStrChars,
    Css,
    Uri,
    TrustedResourceUri,
    Attributes,
}

/// Text directionality, signed so that products and signs drive decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dir {
    Ltr,
    Rtl,
    Neutral,
}

impl Dir {
    pub fn as_i8(self) -> i8 {
        match self {
            Dir::Ltr => 1,
            Dir::Rtl => -1,
            Dir::Neutral => 0,
        }
    }

    /// Maps any integer onto a direction by its sign.
    pub fn from_sign(value: i64) -> Self {
        match value.signum() {
            1 => Dir::Ltr,
            -1 => Dir::Rtl,
            _ => Dir::Neutral,
        }
    }

    pub fn is_neutral(self) -> bool {
        self == Dir::Neutral
    }
}

impl Default for Dir {
    fn default() -> Self {
        Self::Neutral
    }
}

/// Capability shared by every value the rendering layer can print.
///
/// Escapers and filters only need the display string. Bidi helpers also ask
/// for the declared kind and a known direction, which plain values lack.
pub trait Stringable {
    fn to_display_string(&self) -> Cow<'_, str>;

    fn content_kind(&self) -> Option<ContentKind> {
        None
    }

    fn content_dir(&self) -> Option<Dir> {
        None
    }
}

impl Stringable for str {
    fn to_display_string(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl Stringable for String {
    fn to_display_string(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl Stringable for bool {
    fn to_display_string(&self) -> Cow<'_, str> {
        Cow::Borrowed(if *self { "true" } else { "false" })
    }
}

impl Stringable for i64 {
    fn to_display_string(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

impl Stringable for f64 {
    fn to_display_string(&self) -> Cow<'_, str> {
        Cow::Owned(number_to_string(*self))
    }
}

/// Formats a float the way the template language prints numbers:
/// integral values drop the fraction, infinities are spelled out.
pub(crate) fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let spelled = if value > 0.0 { "Infinity" } else { "-Infinity" };
        spelled.to_string()
    } else if value == 0.0 {
        // Covers -0.0 as well.
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Immutable string tagged with its content kind and, optionally, its
/// known direction. Transforms always build a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedContent {
    text: String,
    kind: ContentKind,
    #[serde(default)]
    dir: Option<Dir>,
}

impl SanitizedContent {
    pub fn new(text: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            text: text.into(),
            kind,
            dir: None,
        }
    }

    pub fn with_dir(text: impl Into<String>, kind: ContentKind, dir: Dir) -> Self {
        Self {
            text: text.into(),
            kind,
            dir: Some(dir),
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self::new(text, ContentKind::Html)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn dir(&self) -> Option<Dir> {
        self.dir
    }

    pub fn is_kind(&self, kind: ContentKind) -> bool {
        self.kind == kind
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl Stringable for SanitizedContent {
    fn to_display_string(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.text.as_str())
    }

    fn content_kind(&self) -> Option<ContentKind> {
        Some(self.kind)
    }

    fn content_dir(&self) -> Option<Dir> {
        self.dir
    }
}

impl fmt::Display for SanitizedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Joins two attribute values, dropping the delimiter when either is empty.
pub fn concat_attribute_values(left: &str, right: &str, delimiter: &str) -> String {
    if left.is_empty() {
        return right.to_string();
    }
    if right.is_empty() {
        return left.to_string();
    }
    format!("{}{}{}", left, delimiter, right)
}

/// Joins two CSS declaration lists into one CSS value.
pub fn concat_css_values<L, R>(left: &L, right: &R) -> SanitizedContent
where
    L: Stringable + ?Sized,
    R: Stringable + ?Sized,
{
    let joined = concat_attribute_values(
        &left.to_display_string(),
        &right.to_display_string(),
        ";",
    );
    SanitizedContent::new(joined, ContentKind::Css)
}
