//! Delegate Registry - Priority Resolution
//!
//! A delegate is an overridable template implementation keyed by template id
//! and variant. For each key only the highest-priority registration is kept.
//! Two different implementations claiming the same priority for one key is
//! a configuration error, reported at registration time.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

/// A renderable template: `(data, injected_data) -> output`.
pub type TemplateFn = Arc<dyn Fn(&Value, &Value) -> String + Send + Sync>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DelegateError {
    #[error("Encountered two active delegates with the same priority ({template_id}:{variant}:{priority}).")]
    PriorityConflict {
        template_id: String,
        variant: String,
        priority: i64,
    },

    #[error("Found no active impl for delegate call to \"{}\" (and delcall does not set allowemptydefault=\"true\").", display_key(.template_id, .variant))]
    NotFound { template_id: String, variant: String },
}

fn display_key(template_id: &str, variant: &str) -> String {
    if variant.is_empty() {
        template_id.to_string()
    } else {
        format!("{}:{}", template_id, variant)
    }
}

/// `(template_id, variant)`; the empty variant is the default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DelegateKey {
    pub template_id: String,
    pub variant: String,
}

impl DelegateKey {
    pub fn new(template_id: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            variant: variant.into(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.variant.is_empty()
    }

    fn default_variant(&self) -> Self {
        Self::new(self.template_id.clone(), "")
    }
}

impl fmt::Display for DelegateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_key(&self.template_id, &self.variant))
    }
}

#[derive(Clone)]
pub struct DelegateEntry {
    pub priority: i64,
    pub implementation: TemplateFn,
    pub implementation_name: String,
}

impl fmt::Debug for DelegateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateEntry")
            .field("priority", &self.priority)
            .field("implementation_name", &self.implementation_name)
            .finish_non_exhaustive()
    }
}

/// Template that renders nothing, used when an empty default is allowed.
pub fn empty_template() -> TemplateFn {
    Arc::new(|_: &Value, _: &Value| String::new())
}

/// Registry of active delegates.
///
/// Registration takes the write lock; resolution only reads. Every mutation
/// is a single map insert, so a poisoned lock still holds a consistent map.
#[derive(Default)]
pub struct DelegateRegistry {
    entries: RwLock<HashMap<DelegateKey, DelegateEntry>>,
}

impl DelegateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `implementation` for `(template_id, variant)` at `priority`.
    ///
    /// Replaces the current entry only when `priority` is strictly higher.
    /// Re-registering the same implementation name at the same priority is
    /// a no-op.
    pub fn register(
        &self,
        template_id: &str,
        variant: &str,
        priority: i64,
        implementation: TemplateFn,
        implementation_name: &str,
    ) -> Result<(), DelegateError> {
        let key = DelegateKey::new(template_id, variant);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(current) = entries.get(&key) {
            if priority < current.priority {
                debug!(
                    key = %key,
                    priority,
                    current = current.priority,
                    "Ignoring lower-priority delegate"
                );
                return Ok(());
            }
            if priority == current.priority {
                if current.implementation_name == implementation_name {
                    return Ok(());
                }
                warn!(
                    key = %key,
                    priority,
                    existing = %current.implementation_name,
                    incoming = %implementation_name,
                    "Delegate priority conflict"
                );
                return Err(DelegateError::PriorityConflict {
                    template_id: key.template_id,
                    variant: key.variant,
                    priority,
                });
            }
        }

        debug!(key = %key, priority, implementation = %implementation_name, "Registered delegate");
        entries.insert(
            key,
            DelegateEntry {
                priority,
                implementation,
                implementation_name: implementation_name.to_string(),
            },
        );
        Ok(())
    }

    /// Finds the active implementation, falling back to the default variant
    /// and then, if allowed, to [`empty_template`].
    pub fn resolve(
        &self,
        template_id: &str,
        variant: &str,
        allow_empty_default: bool,
    ) -> Result<TemplateFn, DelegateError> {
        let key = DelegateKey::new(template_id, variant);
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = entries.get(&key) {
            return Ok(Arc::clone(&entry.implementation));
        }
        if !key.is_default() {
            if let Some(entry) = entries.get(&key.default_variant()) {
                debug!(key = %key, "Falling back to default delegate variant");
                return Ok(Arc::clone(&entry.implementation));
            }
        }
        if allow_empty_default {
            debug!(key = %key, "Using empty delegate");
            return Ok(empty_template());
        }

        Err(DelegateError::NotFound {
            template_id: key.template_id,
            variant: key.variant,
        })
    }

    /// Name of the implementation currently registered for the exact key.
    pub fn active_implementation(&self, template_id: &str, variant: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&DelegateKey::new(template_id, variant))
            .map(|entry| entry.implementation_name.clone())
    }

    pub fn contains(&self, template_id: &str, variant: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(&DelegateKey::new(template_id, variant))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DelegateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_map().entries(entries.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(output: &'static str) -> TemplateFn {
        Arc::new(move |_: &Value, _: &Value| output.to_string())
    }

    fn render(template: &TemplateFn) -> String {
        template(&Value::Null, &Value::Null)
    }

    #[test]
    fn test_higher_priority_wins() {
        let registry = DelegateRegistry::new();
        registry.register("t", "", 1, constant("A"), "a").unwrap();
        registry.register("t", "", 2, constant("B"), "b").unwrap();
        assert_eq!(render(&registry.resolve("t", "", false).unwrap()), "B");
    }

    #[test]
    fn test_lower_priority_is_ignored() {
        let registry = DelegateRegistry::new();
        registry.register("t", "", 5, constant("A"), "a").unwrap();
        registry.register("t", "", 1, constant("B"), "b").unwrap();
        assert_eq!(render(&registry.resolve("t", "", false).unwrap()), "A");
        assert_eq!(registry.active_implementation("t", ""), Some("a".to_string()));
    }

    #[test]
    fn test_same_priority_conflict() {
        let registry = DelegateRegistry::new();
        registry.register("t", "mobile", 2, constant("A"), "a").unwrap();
        let err = registry
            .register("t", "mobile", 2, constant("B"), "b")
            .unwrap_err();
        assert_eq!(
            err,
            DelegateError::PriorityConflict {
                template_id: "t".into(),
                variant: "mobile".into(),
                priority: 2
            }
        );
        assert_eq!(
            err.to_string(),
            "Encountered two active delegates with the same priority (t:mobile:2)."
        );
        // The first registration stays active.
        assert_eq!(render(&registry.resolve("t", "mobile", false).unwrap()), "A");
    }

    #[test]
    fn test_same_name_same_priority_is_idempotent() {
        let registry = DelegateRegistry::new();
        registry.register("t", "", 2, constant("A"), "a").unwrap();
        registry.register("t", "", 2, constant("A2"), "a").unwrap();
        assert_eq!(render(&registry.resolve("t", "", false).unwrap()), "A");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_variant_falls_back_to_default() {
        let registry = DelegateRegistry::new();
        registry.register("t", "", 0, constant("default"), "d").unwrap();
        registry.register("t", "dark", 0, constant("dark"), "k").unwrap();
        assert_eq!(render(&registry.resolve("t", "dark", false).unwrap()), "dark");
        assert_eq!(render(&registry.resolve("t", "light", false).unwrap()), "default");
    }

    #[test]
    fn test_default_does_not_fall_back_to_variant() {
        let registry = DelegateRegistry::new();
        registry.register("t", "dark", 0, constant("dark"), "k").unwrap();
        assert!(registry.resolve("t", "", false).is_err());
    }

    #[test]
    fn test_unresolved_with_empty_default() {
        let registry = DelegateRegistry::new();
        let template = registry.resolve("missing", "v", true).unwrap();
        assert_eq!(template(&json!({"a": 1}), &json!({})), "");
    }

    #[test]
    fn test_unresolved_without_default_names_key() {
        let registry = DelegateRegistry::new();
        let err = registry.resolve("missing", "v", false).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Found no active impl for delegate call to \"missing:v\" \
             (and delcall does not set allowemptydefault=\"true\")."
        );
        let err = registry.resolve("missing", "", false).err().unwrap();
        assert!(err.to_string().contains("\"missing\""));
    }

    #[test]
    fn test_template_receives_data() {
        let registry = DelegateRegistry::new();
        let greet: TemplateFn = Arc::new(|data: &Value, ij: &Value| {
            format!("{} {}", ij["greeting"].as_str().unwrap_or(""), data["name"].as_str().unwrap_or(""))
        });
        registry.register("greet", "", 0, greet, "greet_impl").unwrap();
        let template = registry.resolve("greet", "", false).unwrap();
        assert_eq!(template(&json!({"name": "Ada"}), &json!({"greeting": "Hi"})), "Hi Ada");
        assert!(registry.contains("greet", ""));
        assert!(!registry.is_empty());
    }
}
