//! Per-iteration context storage.
//!
//! Each rendered loop iteration is assigned a generated id and its local
//! data is kept here, so later passes (event dispatch, partial re-renders)
//! can recover the data a fragment was rendered from.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

/// Registry of iteration-scoped render data, keyed by generated context id.
#[derive(Debug, Default)]
pub struct LocalContexts {
    entries: Mutex<HashMap<String, Value>>,
}

impl LocalContexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under `id`, replacing any previous entry.
    pub fn register(&self, id: impl Into<String>, data: Value) {
        self.lock().insert(id.into(), data);
    }

    /// Returns a clone of the data registered under `id`.
    pub fn lookup(&self, id: &str) -> Option<Value> {
        self.lock().get(id).cloned()
    }

    /// Drops every registered context.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}
