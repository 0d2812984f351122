//! Render Runtime - Single Entry Point
//!
//! Owns everything a render needs that is not a pure function: the
//! configuration, the delegate registry and the bidi formatter cache.
//! Generated template code receives one of these instead of reaching for
//! process-wide state, so every test can start from a fresh runtime.

use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::bidi::BidiFormatters;
use crate::config::{ConfigError, RuntimeConfig};
use crate::content::{Dir, SanitizedContent, Stringable};
use crate::delegates::{DelegateError, DelegateRegistry, TemplateFn};
use crate::escaping::{self, EscapeContext};
use crate::filters::{self, FilterContext, FilterOutcome};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static FILTER_REJECTION_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_filter_rejection_count() -> u32 {
    FILTER_REJECTION_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_filter_rejection_count() {
    FILTER_REJECTION_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Delegate(#[from] DelegateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The runtime handed to generated template code.
#[derive(Debug)]
pub struct RenderRuntime {
    config: RuntimeConfig,
    delegates: DelegateRegistry,
    bidi: BidiFormatters,
}

impl RenderRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            delegates: DelegateRegistry::new(),
            bidi: BidiFormatters::new(),
        }
    }

    pub fn from_config_path(path: &Path) -> Result<Self, RuntimeError> {
        Ok(Self::new(RuntimeConfig::load_from_path(path)?))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn delegates(&self) -> &DelegateRegistry {
        &self.delegates
    }

    pub fn global_dir(&self) -> Dir {
        self.config.global_dir()
    }

    // --- Delegates ---

    /// Fails fast when another implementation already holds `priority`.
    pub fn register_delegate(
        &self,
        template_id: &str,
        variant: &str,
        priority: i64,
        implementation: TemplateFn,
        implementation_name: &str,
    ) -> Result<(), RuntimeError> {
        self.delegates
            .register(template_id, variant, priority, implementation, implementation_name)?;
        Ok(())
    }

    pub fn resolve_delegate(
        &self,
        template_id: &str,
        variant: &str,
        allow_empty_default: bool,
    ) -> Result<TemplateFn, RuntimeError> {
        Ok(self.delegates.resolve(template_id, variant, allow_empty_default)?)
    }

    /// Resolves and renders a delegate call.
    pub fn call_delegate(
        &self,
        template_id: &str,
        variant: &str,
        allow_empty_default: bool,
        data: &Value,
        injected_data: &Value,
    ) -> Result<String, RuntimeError> {
        let template = self.resolve_delegate(template_id, variant, allow_empty_default)?;
        Ok(template(data, injected_data))
    }

    /// Like [`Self::call_delegate`], with the configured empty-default policy.
    pub fn call_delegate_default(
        &self,
        template_id: &str,
        variant: &str,
        data: &Value,
        injected_data: &Value,
    ) -> Result<String, RuntimeError> {
        self.call_delegate(
            template_id,
            variant,
            self.config.allow_empty_default,
            data,
            injected_data,
        )
    }

    // --- Escaping and filtering ---

    pub fn escape<V: Stringable + ?Sized>(&self, context: EscapeContext, value: &V) -> String {
        escaping::escape(context, value)
    }

    /// Filters with the configured table generation. Never fails.
    pub fn filter<V: Stringable + ?Sized>(&self, context: FilterContext, value: &V) -> String {
        self.evaluate_filter(context, value).into_output()
    }

    pub fn evaluate_filter<V: Stringable + ?Sized>(
        &self,
        context: FilterContext,
        value: &V,
    ) -> FilterOutcome {
        let outcome = filters::evaluate(context.rule(self.config.filter_tables), value);

        #[cfg(feature = "test-hooks")]
        if outcome.is_rejected() {
            FILTER_REJECTION_COUNT.fetch_add(1, Ordering::SeqCst);
        }

        outcome
    }

    // --- Bidi, in the configured page direction ---

    pub fn dir_attr<V: Stringable + ?Sized>(&self, value: &V, is_html: bool) -> SanitizedContent {
        self.bidi.dir_attr(self.global_dir(), value, is_html)
    }

    pub fn mark_after<V: Stringable + ?Sized>(&self, value: &V, is_html: bool) -> String {
        self.bidi.mark_after(self.global_dir(), value, is_html)
    }

    pub fn span_wrap<V: Stringable + ?Sized>(&self, value: &V) -> String {
        self.bidi.span_wrap(self.global_dir(), value)
    }

    pub fn unicode_wrap<V: Stringable + ?Sized>(&self, value: &V) -> SanitizedContent {
        self.bidi.unicode_wrap(self.global_dir(), value)
    }

    /// The formatter cache, for formatting against an explicit page direction.
    pub fn bidi(&self) -> &BidiFormatters {
        &self.bidi
    }
}

impl Default for RenderRuntime {
    fn default() -> Self {
        debug!("Creating render runtime with default config");
        Self::new(RuntimeConfig::default())
    }
}
