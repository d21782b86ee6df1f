//! Named template storage.
//!
//! Render calls whose input carries no token delimiter treat the input as a
//! template name and look it up here; a miss falls back to rendering the
//! input literally.

use std::collections::HashMap;
use std::sync::Mutex;

/// Thread-safe store of named template sources.
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: Mutex<HashMap<String, String>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a template under `name`, replacing any previous source.
    pub fn set(&self, name: impl Into<String>, source: impl Into<String>) {
        self.lock().insert(name.into(), source.into());
    }

    /// Stores every entry of `templates`.
    pub fn set_many<I, K, V>(&self, templates: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut guard = self.lock();
        for (name, source) in templates {
            guard.insert(name.into(), source.into());
        }
    }

    /// Removes the template stored under `name`.
    pub fn remove(&self, name: &str) {
        self.lock().remove(name);
    }

    /// Drops every stored template.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Returns a clone of the source stored under `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.templates.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let cache = TemplateCache::new();
        cache.set("greeting", "Hello [name]");
        assert_eq!(cache.get("greeting").as_deref(), Some("Hello [name]"));
        assert!(cache.contains("greeting"));
        assert!(!cache.contains("missing"));
    }

    #[test]
    fn test_set_many() {
        let cache = TemplateCache::new();
        cache.set_many([("a", "1"), ("b", "2")]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b").as_deref(), Some("2"));
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = TemplateCache::new();
        cache.set_many([("a", "1"), ("b", "2")]);
        cache.remove("a");
        assert!(!cache.contains("a"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
