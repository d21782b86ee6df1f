//! Observable state container.
//!
//! [`Observable`] wraps a value tree and notifies registered listeners after
//! every write, so hosts can re-render the fragments that depend on the
//! changed path. Listeners run synchronously on the writing thread, outside
//! the data lock.

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

type Listener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Shared state with change notification.
#[derive(Default)]
pub struct Observable {
    data: Mutex<Value>,
    listeners: Mutex<Vec<Listener>>,
}

impl Observable {
    /// Empty mapping root.
    pub fn new() -> Self {
        Self::with_data(Value::Object(Map::new()))
    }

    /// Wraps an existing value tree.
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Mutex::new(data),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Registers a listener invoked after every [`set`](Self::set) with the
    /// written path and the new value.
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Arc::new(listener));
    }

    /// Writes `value` at the dot-separated `path`, creating intermediate
    /// mappings as needed, then notifies listeners.
    pub fn set(&self, path: &str, value: Value) {
        {
            let mut data = self.data.lock().unwrap_or_else(|p| p.into_inner());
            let mut current = &mut *data;
            let mut parts = path.split('.').peekable();
            while let Some(part) = parts.next() {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                let map = match current.as_object_mut() {
                    Some(map) => map,
                    None => return,
                };
                if parts.peek().is_none() {
                    map.insert(part.to_string(), value.clone());
                    break;
                }
                current = map
                    .entry(part.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
            }
        }
        // Listeners run outside both locks, so a listener may read or write
        // the observable again.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        for listener in &listeners {
            listener(path, &value);
        }
    }

    /// Reads a clone of the value at the dot-separated `path`.
    pub fn get(&self, path: &str) -> Option<Value> {
        let data = self.data.lock().unwrap_or_else(|p| p.into_inner());
        let mut current = &*data;
        for part in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    /// A clone of the whole tree, suitable for passing to a render call.
    pub fn snapshot(&self) -> Value {
        self.data.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_set_and_get() {
        let state = Observable::new();
        state.set("name", json!("Ada"));
        assert_eq!(state.get("name"), Some(json!("Ada")));
        assert_eq!(state.get("missing"), None);
    }

    #[test]
    fn test_set_creates_intermediate_mappings() {
        let state = Observable::new();
        state.set("user.address.city", json!("Paris"));
        assert_eq!(state.get("user.address.city"), Some(json!("Paris")));
        assert_eq!(
            state.snapshot(),
            json!({"user": {"address": {"city": "Paris"}}})
        );
    }

    #[test]
    fn test_get_indexes_sequences() {
        let state = Observable::with_data(json!({"items": ["a", "b"]}));
        assert_eq!(state.get("items.1"), Some(json!("b")));
    }

    #[test]
    fn test_listeners_fire_on_every_write() {
        let state = Observable::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        state.on_change(move |path, value| {
            assert_eq!(path, "count");
            assert_eq!(value, &json!(1));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        state.set("count", json!(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_write_back() {
        let state = Arc::new(Observable::new());
        let inner = Arc::clone(&state);
        state.on_change(move |path, _| {
            if path == "a" {
                inner.set("b", json!(2));
            }
        });
        state.set("a", json!(1));
        assert_eq!(state.get("b"), Some(json!(2)));
    }
}
