//! TemplateRT Core - Render-Time Safety Runtime
//!
//! # The Five Duties (Non-Negotiable)
//! 1. Escaping Is Total
//! 2. Rejection Yields a Sentinel, Never an Error
//! 3. Direction Is Estimated, Never Guessed
//! 4. One Delegate Per Priority
//! 5. Coercion Follows the Template Language

pub mod content;
pub mod escaping;
pub mod filters;
pub mod bidi;
pub mod delegates;
pub mod coercion;
pub mod config;
pub mod runtime;

pub use content::{ContentKind, Dir, SanitizedContent, Stringable};
pub use escaping::{escape, EscapeContext, UnknownContext};
pub use filters::{
    filter, filter_with, FilterContext, FilterOutcome, TableGeneration, INNOCUOUS_OUTPUT,
    INVALID_IMAGE_DATA_URI, INVALID_URI,
};
pub use bidi::{estimate_direction, text_dir, BidiFormatter, BidiFormatters};
pub use delegates::{DelegateError, DelegateRegistry, TemplateFn};
pub use coercion::CoercionValue;
pub use config::{ConfigError, RuntimeConfig};
pub use runtime::{RenderRuntime, RuntimeError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
