//! # Potion - Lightweight Text Substitution Engine
//!
//! `potion` renders templates by substituting delimited tokens with values
//! from a data tree, running each token through a chain of named filters.
//! Blocks expand conditionally over booleans and iterate over sequences and
//! mappings, and every iteration registers its local data under a generated
//! id so hosts can wire rendered fragments back to the data they came from.
//!
//! Tokenization lives in the companion `potion-parser` crate; this crate
//! adds the filter registry with its default catalog, the substitution
//! engine, named-template caching, and an observable state container for
//! re-render-on-change hosts.
//!
//! ## Core Concepts
//!
//! - [`Potion`]: The engine. Holds the tokenizer, filters, template cache
//!   and iteration contexts; rendering takes `&self` and is thread-safe.
//! - [`FilterRegistry`]: Named, priority-ordered value transformations.
//!   Token pipelines (`{{ name | uppercase | truncate: 3 }}`) and the
//!   engine's hook points both resolve through it.
//! - [`TemplateCache`]: Named template sources; inputs without delimiters
//!   are treated as names and looked up here.
//! - [`LocalContexts`]: Iteration data registered per rendered loop pass.
//! - [`Observable`]: A value tree with change listeners, for hosts that
//!   re-render when state is written.
//!
//! ## Quick Start
//!
//! ```rust
//! use potion::Potion;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Page {
//!     title: String,
//!     items: Vec<String>,
//! }
//!
//! let potion = Potion::new().unwrap();
//! let page = Page {
//!     title: "news".into(),
//!     items: vec!["a".into(), "b".into()],
//! };
//!
//! let out = potion
//!     .render("{{ title | uppercase }}: {{items}}{{_value}};{{/items}}", &page)
//!     .unwrap();
//! assert_eq!(out, "NEWS: a;b;");
//! ```
//!
//! ## Custom Filters
//!
//! ```rust
//! use potion::{Filtered, Potion};
//! use serde_json::{json, Value};
//!
//! let potion = Potion::new().unwrap();
//! potion
//!     .register_filter("first_word", |payload, _args| {
//!         Ok(match payload {
//!             Some(Value::String(s)) => Filtered::Value(Value::String(
//!                 s.split_whitespace().next().unwrap_or("").to_string(),
//!             )),
//!             _ => Filtered::Pass,
//!         })
//!     })
//!     .unwrap();
//!
//! let out = potion
//!     .render("{{ greeting | first_word }}", &json!({"greeting": "hi there"}))
//!     .unwrap();
//! assert_eq!(out, "hi");
//! ```

mod cache;
mod context;
pub mod dom;
mod engine;
mod error;
pub mod filter;
mod reactive;
mod value;

pub use cache::TemplateCache;
pub use context::LocalContexts;
pub use engine::Potion;
pub use error::RenderError;
pub use filter::{FilterArgs, FilterRegistry, Filtered};
pub use reactive::Observable;

pub use potion_parser::{
    base_key, Arg, Flag, Segment, Settings, Token, TokenSpec, Tokenizer, DEFAULT_END,
    DEFAULT_START,
};
