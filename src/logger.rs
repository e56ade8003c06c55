//! This module implements the logger hierarchy.
//!
//! Loggers are nodes in a dot-segmented name tree held by a
//! `LoggerRegistry`. A logger resolves its effective level by walking to
//! the nearest ancestor with an explicit level, and its effective appenders
//! as the ancestors' appenders followed by its own, unless additivity is
//! disabled. Effective appenders are cached per node and invalidated for a
//! whole subtree whenever the appender set or additivity changes.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;

use crate::appender::Appender;
use crate::event::LoggingEvent;
use crate::level::Level;

/// Reserved name of the root logger.
pub const ROOT_LOGGER_NAME: &str = "root";

/// A value which can be passed as a log call parameter.
///
/// Strings and numbers format as themselves; arbitrary serializable values
/// can be passed through the [`Json`] wrapper.
pub trait LogArgument {
    /// Formats the value for inclusion in a log message.
    fn format_argument(&self) -> String;
}

impl<T: LogArgument + ?Sized> LogArgument for &T {
    fn format_argument(&self) -> String {
        (**self).format_argument()
    }
}

impl LogArgument for str {
    fn format_argument(&self) -> String {
        self.to_string()
    }
}

impl LogArgument for String {
    fn format_argument(&self) -> String {
        self.clone()
    }
}

impl LogArgument for bool {
    fn format_argument(&self) -> String {
        self.to_string()
    }
}

impl LogArgument for serde_json::Value {
    fn format_argument(&self) -> String {
        self.to_string()
    }
}

macro_rules! impl_log_argument_for_numbers {
    ($($ty:ty),*) => {
        $(impl LogArgument for $ty {
            fn format_argument(&self) -> String {
                self.to_string()
            }
        })*
    };
}

impl_log_argument_for_numbers!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, usize, isize, f32, f64);

/// Wrapper formatting any serializable value as JSON.
///
/// Serialization errors degrade to the error text instead of failing the
/// log call.
pub struct Json<'a, T: Serialize>(pub &'a T);

impl<'a, T: Serialize> LogArgument for Json<'a, T> {
    fn format_argument(&self) -> String {
        serde_json::to_string(self.0).unwrap_or_else(|e| e.to_string())
    }
}

struct LoggerNode {
    name: String,
    parent: Option<usize>,
    /// Children are tracked for cache-invalidation fan-out only.
    children: Vec<usize>,
    explicit_level: Option<Level>,
    additive: bool,
    own_appenders: Vec<Arc<dyn Appender>>,
    effective_cache: Option<Vec<Arc<dyn Appender>>>,
}

impl LoggerNode {
    fn new(name: String, parent: Option<usize>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            explicit_level: None,
            additive: true,
            own_appenders: Vec::new(),
            effective_cache: None,
        }
    }
}

struct RegistryInner {
    nodes: Vec<LoggerNode>,
    by_name: HashMap<String, usize>,
}

impl RegistryInner {
    fn with_root(root_level: Level) -> Self {
        let mut root = LoggerNode::new(ROOT_LOGGER_NAME.to_string(), None);
        root.explicit_level = Some(root_level);
        Self {
            nodes: vec![root],
            by_name: HashMap::from([(ROOT_LOGGER_NAME.to_string(), 0)]),
        }
    }

    /// Returns the node id for `name`, creating the node and any missing
    /// ancestors on the way.
    fn ensure(&mut self, name: &str) -> usize {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let parent = match name.rsplit_once('.') {
            Some((ancestor, _)) => self.ensure(ancestor),
            None => 0,
        };
        let id = self.nodes.len();
        self.nodes.push(LoggerNode::new(name.to_string(), Some(parent)));
        self.nodes[parent].children.push(id);
        self.by_name.insert(name.to_string(), id);
        id
    }

    fn invalidate_subtree(&mut self, id: usize) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            self.nodes[current].effective_cache = None;
            pending.extend(&self.nodes[current].children);
        }
    }

    fn effective_appenders(&mut self, id: usize) -> Vec<Arc<dyn Appender>> {
        if let Some(cache) = &self.nodes[id].effective_cache {
            return cache.clone();
        }
        let mut result = match (self.nodes[id].additive, self.nodes[id].parent) {
            (true, Some(parent)) => self.effective_appenders(parent),
            _ => Vec::new(),
        };
        result.extend(self.nodes[id].own_appenders.iter().cloned());
        self.nodes[id].effective_cache = Some(result.clone());
        result
    }

    fn effective_level(&self, id: usize) -> Level {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            if let Some(level) = node.explicit_level {
                return level;
            }
            current = node.parent;
        }
        // Unreachable: the root always carries an explicit level.
        Level::Off
    }
}

/// The process-wide registry of loggers.
///
/// `get_logger` returns a handle onto the same node for the same name every
/// call. The root node is created at construction with a mandatory explicit
/// level; `reset` restores the freshly-constructed state for test
/// isolation.
pub struct LoggerRegistry {
    inner: Mutex<RegistryInner>,
    root_level: Level,
}

impl LoggerRegistry {
    /// Creates a registry whose root logger has the given explicit level.
    pub fn new(root_level: Level) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(RegistryInner::with_root(root_level)),
            root_level,
        })
    }

    /// Discards all loggers and appender attachments, recreating the root.
    pub fn reset(&self) {
        *self.inner.lock().unwrap() = RegistryInner::with_root(self.root_level);
    }

    /// Returns the root logger.
    pub fn root(self: &Arc<Self>) -> Logger {
        Logger {
            registry: self.clone(),
            id: 0,
            name: ROOT_LOGGER_NAME.to_string(),
        }
    }

    /// Returns the logger with the given dot-segmented name, creating it
    /// (and its ancestors) if needed. The reserved name `root` and the
    /// empty string denote the root logger.
    pub fn get_logger(self: &Arc<Self>, name: &str) -> Logger {
        if name.is_empty() || name == ROOT_LOGGER_NAME {
            return self.root();
        }
        let id = self.inner.lock().unwrap().ensure(name);
        Logger {
            registry: self.clone(),
            id,
            name: name.to_string(),
        }
    }

    fn add_appender(&self, id: usize, appender: Arc<dyn Appender>) {
        let name = {
            let mut inner = self.inner.lock().unwrap();
            let node = &mut inner.nodes[id];
            if node
                .own_appenders
                .iter()
                .any(|existing| Arc::ptr_eq(existing, &appender))
            {
                return;
            }
            node.own_appenders.push(appender.clone());
            let name = node.name.clone();
            inner.invalidate_subtree(id);
            name
        };
        appender.set_added_to_logger(&name);
    }

    fn remove_appender(&self, id: usize, appender: &Arc<dyn Appender>) {
        let removed = {
            let mut inner = self.inner.lock().unwrap();
            let node = &mut inner.nodes[id];
            let before = node.own_appenders.len();
            node.own_appenders
                .retain(|existing| !Arc::ptr_eq(existing, appender));
            if node.own_appenders.len() == before {
                return;
            }
            let name = node.name.clone();
            inner.invalidate_subtree(id);
            name
        };
        appender.set_removed_from_logger(&removed);
    }

    /// Detaches every own appender of the given kind, returning them.
    pub(crate) fn remove_appenders_named(
        &self,
        id: usize,
        kind: &str,
    ) -> Vec<Arc<dyn Appender>> {
        let (removed, name) = {
            let mut inner = self.inner.lock().unwrap();
            let node = &mut inner.nodes[id];
            let (removed, kept): (Vec<_>, Vec<_>) = node
                .own_appenders
                .drain(..)
                .partition(|a| a.name() == kind);
            node.own_appenders = kept;
            if removed.is_empty() {
                return Vec::new();
            }
            let name = node.name.clone();
            inner.invalidate_subtree(id);
            (removed, name)
        };
        for appender in &removed {
            appender.set_removed_from_logger(&name);
        }
        removed
    }

    fn call_appenders(&self, id: usize, event: &LoggingEvent) {
        // Resolve under the lock, deliver outside it.
        let appenders = self.inner.lock().unwrap().effective_appenders(id);
        for appender in appenders {
            appender.do_append(event);
        }
    }
}

/// A named handle onto a logger node.
#[derive(Clone)]
pub struct Logger {
    registry: Arc<LoggerRegistry>,
    id: usize,
    name: String,
}

impl Logger {
    /// Returns the logger's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the explicit level of this logger.
    pub fn set_log_level(&self, level: Level) {
        self.registry.inner.lock().unwrap().nodes[self.id].explicit_level = Some(level);
    }

    /// Returns the nearest explicit level walking from this logger toward
    /// the root.
    pub fn effective_level(&self) -> Level {
        self.registry.inner.lock().unwrap().effective_level(self.id)
    }

    /// Enables or disables inheriting the ancestors' appenders. The
    /// effective-appender cache of this logger and all its descendants is
    /// invalidated only if the value actually changed.
    pub fn set_additivity(&self, additive: bool) {
        let mut inner = self.registry.inner.lock().unwrap();
        if inner.nodes[self.id].additive == additive {
            return;
        }
        inner.nodes[self.id].additive = additive;
        inner.invalidate_subtree(self.id);
    }

    /// Attaches an appender to this logger. Adding the same appender twice
    /// is a no-op.
    pub fn add_appender(&self, appender: Arc<dyn Appender>) {
        self.registry.add_appender(self.id, appender);
    }

    /// Detaches an appender from this logger.
    pub fn remove_appender(&self, appender: &Arc<dyn Appender>) {
        self.registry.remove_appender(self.id, appender);
    }

    /// Returns the appenders this logger delivers to: the ancestors'
    /// effective appenders (unless additivity is disabled) followed by this
    /// logger's own, in insertion order.
    pub fn effective_appenders(&self) -> Vec<Arc<dyn Appender>> {
        self.registry.inner.lock().unwrap().effective_appenders(self.id)
    }

    /// Returns whether a call at `level` would pass this logger's
    /// effective level.
    pub fn is_enabled_for(&self, level: Level) -> bool {
        level >= self.effective_level()
    }

    pub fn is_trace_enabled(&self) -> bool {
        self.is_enabled_for(Level::Trace)
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.is_enabled_for(Level::Debug)
    }

    pub fn is_info_enabled(&self) -> bool {
        self.is_enabled_for(Level::Info)
    }

    pub fn is_warn_enabled(&self) -> bool {
        self.is_enabled_for(Level::Warn)
    }

    pub fn is_error_enabled(&self) -> bool {
        self.is_enabled_for(Level::Error)
    }

    /// Logs a message.
    ///
    /// # Arguments
    ///
    /// * `level` - Severity of the message.
    /// * `method_name` - Name of the calling method; stored as the first
    ///   message part.
    /// * `params` - Additional parameters, formatted via [`LogArgument`].
    /// * `exception` - Optional error logged alongside the message.
    pub fn log(
        &self,
        level: Level,
        method_name: &str,
        params: &[&dyn LogArgument],
        exception: Option<&dyn std::error::Error>,
    ) {
        if !self.is_enabled_for(level) {
            return;
        }
        let parts = params.iter().map(|p| p.format_argument()).collect();
        self.emit(level, method_name, parts, exception.map(|e| e.to_string()));
    }

    /// Logs a message at level TRACE.
    pub fn trace(&self, method_name: &str, params: &[&dyn LogArgument]) {
        self.log(Level::Trace, method_name, params, None);
    }

    /// Logs a message at level DEBUG.
    pub fn debug(&self, method_name: &str, params: &[&dyn LogArgument]) {
        self.log(Level::Debug, method_name, params, None);
    }

    /// Logs a message at level INFO.
    pub fn info(&self, method_name: &str, params: &[&dyn LogArgument]) {
        self.log(Level::Info, method_name, params, None);
    }

    /// Logs a message at level WARN.
    pub fn warn(&self, method_name: &str, params: &[&dyn LogArgument]) {
        self.log(Level::Warn, method_name, params, None);
    }

    /// Logs a message at level ERROR.
    pub fn error(&self, method_name: &str, params: &[&dyn LogArgument]) {
        self.log(Level::Error, method_name, params, None);
    }

    /// Logs a message at level FATAL.
    pub fn fatal(&self, method_name: &str, params: &[&dyn LogArgument]) {
        self.log(Level::Fatal, method_name, params, None);
    }

    /// Logs the entry into a method.
    ///
    /// The method name and an `entry` marker are logged at level INFO; the
    /// parameters are included only if DEBUG is also enabled, so call sites
    /// can instrument method boundaries at negligible cost.
    pub fn entry(&self, method_name: &str, params: &[&dyn LogArgument]) {
        self.boundary("entry", method_name, params);
    }

    /// Logs the exit of a method; the counterpart of [`Logger::entry`].
    pub fn exit(&self, method_name: &str, params: &[&dyn LogArgument]) {
        self.boundary("exit", method_name, params);
    }

    fn boundary(&self, marker: &str, method_name: &str, params: &[&dyn LogArgument]) {
        if !self.is_info_enabled() {
            return;
        }
        let mut parts = vec![marker.to_string()];
        if self.is_debug_enabled() {
            parts.extend(params.iter().map(|p| p.format_argument()));
        }
        self.emit(Level::Info, method_name, parts, None);
    }

    fn emit(&self, level: Level, method_name: &str, parts: Vec<String>, exception: Option<String>) {
        let mut message_parts = Vec::with_capacity(parts.len() + 1);
        message_parts.push(method_name.to_string());
        message_parts.extend(parts);
        let event = LoggingEvent::new(
            Utc::now(),
            level,
            Some(self.name.clone()),
            message_parts,
            exception,
        );
        self.registry.call_appenders(self.id, &event);
    }
}
