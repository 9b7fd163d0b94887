//! Record handlers
//!
//! A `Handler` decides whether a level is enabled and turns records into
//! output. Handlers are immutable: `with_attrs` and `with_group` return a new
//! handler that shares whatever output state the original owns.

use crate::error::Result;
use crate::level::{Level, LevelValue};
use crate::record::{Attr, Record, Value};
use std::fmt;
use std::sync::Arc;

/// Record sink
pub trait Handler: Send + Sync {
    /// Cheap pre-check, called before the record is built
    fn enabled(&self, level: Level) -> bool;

    /// Emit one record. Only called when `enabled` returned true.
    fn handle(&self, record: &Record) -> Result<()>;

    /// Handler whose output also carries `attrs`
    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn Handler>;

    /// Handler that qualifies subsequent attributes with group `name`
    fn with_group(&self, name: &str) -> Arc<dyn Handler>;
}

/// Attribute rewrite hook: receives the enclosing group path and the
/// attribute, returns the replacement or `None` to drop it.
pub type ReplaceAttr = Arc<dyn Fn(&[String], Attr) -> Option<Attr> + Send + Sync>;

/// Mutator applied to a copy of the registry's default handler options
pub type HandlerOption = Box<dyn FnOnce(&mut HandlerOptions) + Send>;

/// Per-sink options
#[derive(Clone, Default)]
pub struct HandlerOptions {
    /// Static floor inside the sink, independent of the channel's level cell
    pub level: Option<Level>,
    /// Annotate records with their call site
    pub add_source: bool,
    pub replace_attr: Option<ReplaceAttr>,
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("level", &self.level)
            .field("add_source", &self.add_source)
            .field("replace_attr", &self.replace_attr.is_some())
            .finish()
    }
}

impl HandlerOptions {
    /// Whether `level` clears the static floor
    #[inline]
    pub fn admits(&self, level: Level) -> bool {
        self.level.map_or(true, |floor| level >= floor)
    }

    /// Run the rewrite hook, if any
    pub fn replace(&self, groups: &[String], attr: Attr) -> Option<Attr> {
        match &self.replace_attr {
            Some(replace) => replace(groups, attr),
            None => Some(attr),
        }
    }
}

/// Annotate records with their call site
pub fn with_source(add_source: bool) -> HandlerOption {
    Box::new(move |opts| opts.add_source = add_source)
}

/// Pin a static floor inside the sink. Unrecognized values pin INFO.
pub fn with_level(value: impl Into<LevelValue>) -> HandlerOption {
    let level = value.into().parse().unwrap_or(Level::INFO);
    Box::new(move |opts| opts.level = Some(level))
}

/// Install an attribute rewrite hook
pub fn with_replace_attr<F>(replace: F) -> HandlerOption
where
    F: Fn(&[String], Attr) -> Option<Attr> + Send + Sync + 'static,
{
    let replace: ReplaceAttr = Arc::new(replace);
    Box::new(move |opts| opts.replace_attr = Some(replace))
}

/// Options plus the attributes and groups accumulated through
/// `with_attrs`/`with_group`. Shared by the built-in sinks.
#[derive(Clone, Default, Debug)]
pub struct HandlerState {
    pub options: HandlerOptions,
    attrs: Vec<Attr>,
    groups: Vec<String>,
}

impl HandlerState {
    pub fn new(options: HandlerOptions) -> Self {
        Self {
            options,
            attrs: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_attrs(&self, attrs: Vec<Attr>) -> Self {
        let mut next = self.clone();
        insert_at(&mut next.attrs, &self.groups, attrs);
        next
    }

    /// An empty name leaves the state unchanged
    pub fn with_group(&self, name: &str) -> Self {
        let mut next = self.clone();
        if !name.is_empty() {
            next.groups.push(name.to_string());
        }
        next
    }

    /// Built-in field (`time`, `level`, `msg`, `source`) after the rewrite hook
    pub fn builtin(&self, key: &str, value: Value) -> Option<Attr> {
        self.options.replace(&[], Attr::new(key, value))
    }

    /// Accumulated attributes plus the record's, nested under the open
    /// groups, rewritten, with empty groups dropped and unnamed groups inlined
    pub fn resolve(&self, record_attrs: &[Attr]) -> Vec<Attr> {
        let mut merged = self.attrs.clone();
        insert_at(&mut merged, &self.groups, record_attrs.to_vec());
        let mut path = Vec::new();
        resolve_list(merged, &mut path, &self.options)
    }
}

fn insert_at(list: &mut Vec<Attr>, path: &[String], attrs: Vec<Attr>) {
    if attrs.is_empty() {
        return;
    }
    let Some((head, rest)) = path.split_first() else {
        list.extend(attrs);
        return;
    };

    let idx = match list.iter().rposition(|a| a.key == *head && a.is_group()) {
        Some(idx) => idx,
        None => {
            list.push(Attr::new(head.clone(), Value::Group(Vec::new())));
            list.len() - 1
        }
    };
    if let Value::Group(members) = &mut list[idx].value {
        insert_at(members, rest, attrs);
    }
}

fn resolve_list(attrs: Vec<Attr>, path: &mut Vec<String>, options: &HandlerOptions) -> Vec<Attr> {
    let mut out = Vec::with_capacity(attrs.len());
    for attr in attrs {
        match attr.value {
            Value::Group(members) if attr.key.is_empty() => {
                out.extend(resolve_list(members, path, options));
            }
            Value::Group(members) => {
                path.push(attr.key.clone());
                let inner = resolve_list(members, path, options);
                path.pop();
                if !inner.is_empty() {
                    out.push(Attr::new(attr.key, Value::Group(inner)));
                }
            }
            value => {
                let attr = Attr { key: attr.key, value };
                if let Some(attr) = options.replace(path, attr) {
                    if !attr.key.is_empty() {
                        out.push(attr);
                    }
                }
            }
        }
    }
    out
}
