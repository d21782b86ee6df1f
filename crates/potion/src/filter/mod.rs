//! Named, chainable value transformations.
//!
//! A filter name maps to an ordered list of implementations. Registration
//! takes a priority; implementations run in ascending priority order (ties
//! keep insertion order — the sort is stable). Applying an unregistered name
//! returns the payload unchanged, which is what makes the engine's hook
//! points (`init`, `templateBefore`, `template`, `templateAfter`, `loopData`,
//! `loop`, `loopEnd`) free when a host has not opted in.
//!
//! # Payload semantics
//!
//! The payload is an `Option<Value>`: `None` models an absent input (a hook
//! invoked with nothing to transform). Each implementation returns a
//! [`Filtered`] outcome; see its variants for how the payload evolves. An
//! absent payload stays absent only while every implementation declines to
//! produce a value.
//!
//! # Example
//!
//! ```rust
//! use potion::{FilterArgs, FilterRegistry, Filtered};
//! use serde_json::{json, Value};
//!
//! let registry = FilterRegistry::new();
//! registry
//!     .register("shout", 0, |payload, _args| {
//!         Ok(match payload {
//!             Some(Value::String(s)) => Filtered::Value(Value::String(format!("{}!", s))),
//!             _ => Filtered::Pass,
//!         })
//!     })
//!     .unwrap();
//!
//! let data = json!({});
//! let args = FilterArgs { data: &data, template: "", args: &[] };
//! let out = registry.apply("shout", Some(json!("hi")), &args).unwrap();
//! assert_eq!(out, Some(json!("hi!")));
//! ```

pub mod builtin;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::RenderError;

/// Context passed to every filter invocation.
pub struct FilterArgs<'a> {
    /// The data object for the current render scope.
    pub data: &'a Value,
    /// The template text the token came from.
    pub template: &'a str,
    /// Static arguments from the token pipeline (or hook extras).
    pub args: &'a [Value],
}

/// Outcome of one filter implementation.
pub enum Filtered {
    /// Replace the payload with a new value.
    Value(Value),
    /// Keep the payload unchanged (type-guard pass-through).
    Pass,
    /// Reset the payload to the empty string. If the chain started with no
    /// payload and none has been produced yet, the payload stays absent.
    Empty,
    /// Replace the payload and stop the chain.
    Final(Value),
}

type FilterFn =
    Arc<dyn Fn(Option<&Value>, &FilterArgs) -> Result<Filtered, RenderError> + Send + Sync>;

/// Registry mapping filter names to priority-ordered implementation lists.
#[derive(Default)]
pub struct FilterRegistry {
    filters: Mutex<HashMap<String, Vec<(FilterFn, i32)>>>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an implementation under `name` with the given priority.
    ///
    /// Implementations for one name are kept sorted ascending by priority;
    /// equal priorities preserve registration order.
    pub fn register<F>(&self, name: &str, priority: i32, f: F) -> Result<(), RenderError>
    where
        F: Fn(Option<&Value>, &FilterArgs) -> Result<Filtered, RenderError>
            + Send
            + Sync
            + 'static,
    {
        if name.is_empty() {
            return Err(RenderError::InvalidArgument(
                "filter name must be a non-empty string".to_string(),
            ));
        }
        let mut filters = self
            .filters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let fns = filters.entry(name.to_string()).or_default();
        fns.push((Arc::new(f), priority));
        fns.sort_by_key(|(_, priority)| *priority);
        Ok(())
    }

    /// Whether any implementation is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.filters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    /// Applies every implementation registered under `name` left-to-right.
    ///
    /// Unregistered names return the payload unchanged. Errors from an
    /// implementation propagate to the caller.
    pub fn apply(
        &self,
        name: &str,
        payload: Option<Value>,
        args: &FilterArgs,
    ) -> Result<Option<Value>, RenderError> {
        // Clone the implementation list out of the lock: a filter may apply
        // other filters (loop hooks do), and the mutex is not re-entrant.
        let fns = {
            let filters = self
                .filters
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match filters.get(name) {
                Some(fns) => fns.clone(),
                None => return Ok(payload),
            }
        };

        let started_absent = payload.is_none();
        let mut result = payload;
        for (f, _) in &fns {
            match f(result.as_ref(), args)? {
                Filtered::Value(value) => result = Some(value),
                Filtered::Pass => {}
                Filtered::Empty => {
                    if !(started_absent && result.is_none()) {
                        result = Some(Value::String(String::new()));
                    }
                }
                Filtered::Final(value) => {
                    result = Some(value);
                    break;
                }
            }
        }
        Ok(result)
    }
}
