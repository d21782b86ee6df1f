//! The substitution engine.
//!
//! [`Potion`] ties the pieces together: tokenize a template, resolve each
//! token through the filter registry, expand boolean blocks and loops, and
//! run the hook filters around every render pass.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use potion_parser::{base_key, Arg, Flag, Segment, Settings, Token, TokenSpec, Tokenizer};

use crate::cache::TemplateCache;
use crate::context::LocalContexts;
use crate::dom::TRACKING_ATTR;
use crate::error::RenderError;
use crate::filter::builtin::register_builtin_filters;
use crate::filter::{FilterArgs, FilterRegistry, Filtered};
use crate::value::{format_value, number_value};

/// Monotonic source for iteration context ids, shared across engines so ids
/// stay unique within a process.
static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Opening markup tag at the very start of a trimmed fragment.
static LEADING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([A-Za-z][A-Za-z0-9-]*)").expect("leading tag pattern"));

/// Template engine with tokenizer, filter registry, named-template cache and
/// iteration context storage. Rendering takes `&self` and every structure is
/// internally synchronized, so one engine can be shared across threads.
pub struct Potion {
    tokenizer: Tokenizer,
    filters: FilterRegistry,
    templates: TemplateCache,
    contexts: LocalContexts,
    initialized: AtomicBool,
}

impl Potion {
    /// Engine with the default `{{ }}` delimiters and the builtin filters.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_settings(Settings::default())
    }

    /// Engine with custom delimiter settings and the builtin filters.
    pub fn with_settings(settings: Settings) -> Result<Self, RenderError> {
        let tokenizer = Tokenizer::new(settings)?;
        let filters = FilterRegistry::new();
        register_builtin_filters(&filters)?;
        Ok(Self {
            tokenizer,
            filters,
            templates: TemplateCache::new(),
            contexts: LocalContexts::new(),
            initialized: AtomicBool::new(false),
        })
    }

    /// Registers a filter with priority 0.
    pub fn register_filter<F>(&self, name: &str, f: F) -> Result<(), RenderError>
    where
        F: Fn(Option<&Value>, &FilterArgs) -> Result<Filtered, RenderError>
            + Send
            + Sync
            + 'static,
    {
        self.filters.register(name, 0, f)
    }

    /// Registers a filter with an explicit priority. Lower priorities run
    /// first; ties run in registration order.
    pub fn register_filter_with_priority<F>(
        &self,
        name: &str,
        priority: i32,
        f: F,
    ) -> Result<(), RenderError>
    where
        F: Fn(Option<&Value>, &FilterArgs) -> Result<Filtered, RenderError>
            + Send
            + Sync
            + 'static,
    {
        self.filters.register(name, priority, f)
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    pub fn contexts(&self) -> &LocalContexts {
        &self.contexts
    }

    /// Delimiter settings the engine was built with.
    pub fn settings(&self) -> &Settings {
        self.tokenizer.settings()
    }

    /// Renders `template` against any serializable data.
    ///
    /// When the input carries no opening delimiter it is treated as a
    /// template name and looked up in the cache; a miss renders the input
    /// literally.
    pub fn render<T: Serialize>(&self, template: &str, data: &T) -> Result<String, RenderError> {
        let value = serde_json::to_value(data)?;
        self.render_value(template, &value)
    }

    /// [`render`](Self::render) for data already in value form.
    pub fn render_value(&self, template: &str, data: &Value) -> Result<String, RenderError> {
        self.ensure_init(data)?;
        let mut source = self.apply_text_hook("templateBefore", template.to_string(), data)?;
        if !source.contains(&self.settings().start) {
            if let Some(named) = self.templates.get(&source) {
                source = named;
            }
        }
        let source = self.apply_text_hook("template", source, data)?;
        let segments = self.tokenizer.tokenize(&source);
        let rendered = self.substitute(&segments, data)?;
        self.apply_text_hook("templateAfter", rendered, data)
    }

    /// Renders the cached template stored under `name`. Unlike
    /// [`render`](Self::render), a missing name is an error.
    pub fn render_named<T: Serialize>(&self, name: &str, data: &T) -> Result<String, RenderError> {
        let source = self
            .templates
            .get(name)
            .ok_or_else(|| RenderError::TemplateNotFound(name.to_string()))?;
        self.render(&source, data)
    }

    /// Drops the tokenizer's segment cache.
    pub fn clear_parse_cache(&self) {
        self.tokenizer.clear_cache();
    }

    fn ensure_init(&self, data: &Value) -> Result<(), RenderError> {
        if !self.initialized.swap(true, Ordering::SeqCst) {
            let args = FilterArgs {
                data,
                template: "",
                args: &[],
            };
            self.filters.apply("init", None, &args)?;
        }
        Ok(())
    }

    /// Runs a string-in, string-out hook filter over `text`.
    fn apply_text_hook(
        &self,
        name: &str,
        text: String,
        data: &Value,
    ) -> Result<String, RenderError> {
        if !self.filters.contains(name) {
            return Ok(text);
        }
        let args = FilterArgs {
            data,
            template: &text,
            args: &[],
        };
        match self
            .filters
            .apply(name, Some(Value::String(text.clone())), &args)?
        {
            Some(Value::String(out)) => Ok(out),
            Some(other) => Ok(format_value(&other)),
            None => Ok(String::new()),
        }
    }

    fn substitute(&self, segments: &[Segment], data: &Value) -> Result<String, RenderError> {
        let mut out = String::new();
        let mut cursor = 0;
        while cursor < segments.len() {
            match &segments[cursor] {
                Segment::Static(text) => {
                    out.push_str(text);
                    cursor += 1;
                }
                Segment::Token(token) => {
                    cursor = self.substitute_token(segments, cursor, token, data, &mut out)?;
                }
            }
        }
        Ok(out)
    }

    /// Handles the token at `index` and returns the cursor position of the
    /// next unconsumed segment.
    fn substitute_token(
        &self,
        segments: &[Segment],
        index: usize,
        token: &Token,
        data: &Value,
        out: &mut String,
    ) -> Result<usize, RenderError> {
        // A closer reached by the cursor has no matching opener; drop it.
        if token.flag == Flag::Close {
            return Ok(index + 1);
        }

        let spec = TokenSpec::parse(&token.name);
        let value = self.resolve_pipeline(&spec, token, data)?;
        let closer = find_closer(segments, index, &spec.base_key);

        if token.flag == Flag::Negate || matches!(value, Some(Value::Bool(_))) {
            let mut condition = is_truthy(value.as_ref());
            if token.flag == Flag::Negate {
                condition = !condition;
            }
            let end = closer.ok_or_else(|| RenderError::UnclosedBlock(token.name.clone()))?;
            if condition {
                out.push_str(&self.substitute(&segments[index + 1..end], data)?);
            }
            return Ok(end + 1);
        }

        match value {
            Some(Value::Array(items)) if closer.is_some() => {
                let end = closer.unwrap_or(index);
                let entries = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (number_value(i as f64), item))
                    .collect();
                out.push_str(&self.render_loop(&segments[index + 1..end], entries, data)?);
                Ok(end + 1)
            }
            Some(Value::Object(map)) => {
                let end = closer.ok_or_else(|| RenderError::UnclosedBlock(token.name.clone()))?;
                let entries = map
                    .into_iter()
                    .map(|(key, item)| (Value::String(key), item))
                    .collect();
                out.push_str(&self.render_loop(&segments[index + 1..end], entries, data)?);
                Ok(end + 1)
            }
            // Scalars (and sequences with no block to expand into) splice as
            // text. When a closer exists the block content is discarded.
            Some(scalar) => {
                out.push_str(&format_value(&scalar));
                Ok(closer.map(|end| end + 1).unwrap_or(index + 1))
            }
            None => Ok(closer.map(|end| end + 1).unwrap_or(index + 1)),
        }
    }

    /// Resolves a token's base key and runs its pipeline stages. A missing
    /// path is recovered as an absent value so one bad token cannot fail a
    /// whole render.
    fn resolve_pipeline(
        &self,
        spec: &TokenSpec,
        token: &Token,
        data: &Value,
    ) -> Result<Option<Value>, RenderError> {
        let template = token.literal();
        let seed = Some(Value::String(spec.base_key.clone()));
        let base_args = FilterArgs {
            data,
            template,
            args: &[],
        };
        let mut value = self.recover_missing(self.filters.apply("token", seed, &base_args))?;

        for stage in &spec.stages {
            let args: Vec<Value> = stage.args.iter().map(arg_value).collect();
            let stage_args = FilterArgs {
                data,
                template,
                args: &args,
            };
            value = self.recover_missing(self.filters.apply(&stage.name, value, &stage_args))?;
        }
        Ok(value)
    }

    fn recover_missing(
        &self,
        result: Result<Option<Value>, RenderError>,
    ) -> Result<Option<Value>, RenderError> {
        match result {
            Err(err @ RenderError::NotFound { .. }) => {
                log::warn!("{}", err);
                Ok(None)
            }
            other => other,
        }
    }

    /// Renders a block once per entry. Each pass gets a local context built
    /// from the entry (item properties first, then `_key` and `_value`),
    /// registers it under a fresh id, and tags the fragment's leading markup
    /// tag with that id.
    fn render_loop(
        &self,
        inner: &[Segment],
        entries: Vec<(Value, Value)>,
        data: &Value,
    ) -> Result<String, RenderError> {
        let inner_literal: String = inner.iter().map(Segment::literal).collect();
        let mut out = String::new();

        for (key, item) in entries {
            let mut context = Map::new();
            if let Value::Object(props) = &item {
                context.extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            context.insert("_key".to_string(), key);
            context.insert("_value".to_string(), item);

            let hook_args = FilterArgs {
                data,
                template: &inner_literal,
                args: &[],
            };
            let local = self
                .filters
                .apply("loopData", Some(Value::Object(context)), &hook_args)?
                .unwrap_or(Value::Null);

            let rendered = self.substitute(inner, &local)?;
            let trimmed = rendered.trim();

            let id = format!("potion_{}", NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed) + 1);
            self.contexts.register(&id, local);
            let tagged = inject_tracking_key(trimmed, &id);

            out.push_str(&self.apply_text_hook("loop", tagged, data)?);
        }

        self.apply_text_hook("loopEnd", out, data)
    }
}

/// Index of the closing token matching the opener at `start`. Closers match
/// on base key alone, so blocks of the same key do not nest.
fn find_closer(segments: &[Segment], start: usize, key: &str) -> Option<usize> {
    segments[start + 1..]
        .iter()
        .position(|segment| match segment {
            Segment::Token(token) => token.flag == Flag::Close && base_key(&token.name) == key,
            Segment::Static(_) => false,
        })
        .map(|offset| start + 1 + offset)
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn arg_value(arg: &Arg) -> Value {
    match arg {
        Arg::Str(s) => Value::String(s.clone()),
        Arg::Num(n) => number_value(*n),
        Arg::Bool(b) => Value::Bool(*b),
    }
}

/// Injects the tracking attribute into a fragment's leading markup tag.
/// Fragments that do not start with a tag are returned unchanged.
fn inject_tracking_key(fragment: &str, id: &str) -> String {
    match LEADING_TAG.find(fragment) {
        Some(m) => format!(
            "{} {}=\"{}\"{}",
            m.as_str(),
            TRACKING_ATTR,
            id,
            &fragment[m.end()..]
        ),
        None => fragment.to_string(),
    }
}
