//! Named logger tree with per-logger handlers, levels and propagation.
//!
//! This is the dispatch side that capture sessions attach to. Loggers are
//! addressed by hierarchical name; both `.` and `::` separate segments so
//! dotted names (`app.db`) and tracing targets (`app::db`) share one tree.
//!
//! Dispatch rules for a record emitted on logger `L`:
//! - drop it if `L` is disabled or the record is below `L`'s effective level
//! - walk from `L` toward the root, gathering each logger's handlers, and
//!   stop after the first logger whose `propagate` flag is off
//! - invoke every gathered handler at most once, skipping handlers whose own
//!   level is above the record's

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::capture::CaptureRegistry;

use super::level::Level;
use super::record::Record;

/// Name of the root logger.
pub const ROOT: &str = "root";

/// Level the root logger starts with.
pub const DEFAULT_ROOT_LEVEL: Level = Level::Warn;

/// A destination for dispatched records.
pub trait Handler: Send + Sync {
    fn handle(&self, record: &Record);

    /// Minimum level this handler accepts; `None` accepts everything.
    fn level(&self) -> Option<Level> {
        None
    }
}

/// Shared handler reference. Identity is pointer identity.
pub type HandlerRef = Arc<dyn Handler>;

/// Whether two handler references point at the same handler.
#[must_use]
pub fn same_handler(a: &HandlerRef, b: &HandlerRef) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

/// Complete mutable state of one logger.
///
/// Snapshotting and writing this back restores a logger exactly.
#[derive(Clone)]
pub struct LoggerState {
    pub handlers: Vec<HandlerRef>,
    /// Explicit level; `None` inherits from the nearest ancestor.
    pub level: Option<Level>,
    pub propagate: bool,
    pub disabled: bool,
}

impl Default for LoggerState {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            level: None,
            propagate: true,
            disabled: false,
        }
    }
}

impl fmt::Debug for LoggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerState")
            .field("handlers", &self.handlers.len())
            .field("level", &self.level)
            .field("propagate", &self.propagate)
            .field("disabled", &self.disabled)
            .finish()
    }
}

/// Map `""` and `"root"` to the root logger, leave other names alone.
#[must_use]
pub const fn canonical_name(name: &str) -> &str {
    if name.is_empty() { ROOT } else { name }
}

/// Name of the parent logger, or `None` for the root.
#[must_use]
pub fn parent_name(name: &str) -> Option<&str> {
    let name = canonical_name(name);
    if name == ROOT {
        return None;
    }
    match name.rfind('.').max(name.rfind("::")) {
        Some(idx) if idx > 0 => Some(&name[..idx]),
        _ => Some(ROOT),
    }
}

/// The logger itself followed by each ancestor up to and including root.
pub fn lineage(name: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(canonical_name(name)), |&current| parent_name(current))
}

#[derive(Debug)]
struct Tree {
    loggers: HashMap<String, LoggerState>,
}

impl Tree {
    fn new() -> Self {
        let mut loggers = HashMap::new();
        loggers.insert(
            ROOT.to_string(),
            LoggerState {
                level: Some(DEFAULT_ROOT_LEVEL),
                ..LoggerState::default()
            },
        );
        Self { loggers }
    }

    fn entry(&mut self, name: &str) -> &mut LoggerState {
        self.loggers
            .entry(canonical_name(name).to_string())
            .or_default()
    }

    fn effective_level(&self, name: &str) -> Level {
        lineage(name)
            .find_map(|current| self.loggers.get(current).and_then(|state| state.level))
            .unwrap_or(Level::Trace)
    }

    fn route(&self, record: &Record) -> Vec<HandlerRef> {
        let origin = canonical_name(&record.name);
        if self.loggers.get(origin).is_some_and(|state| state.disabled) {
            return Vec::new();
        }
        if record.level < self.effective_level(origin) {
            return Vec::new();
        }

        let mut selected: Vec<HandlerRef> = Vec::new();
        for current in lineage(origin) {
            let Some(state) = self.loggers.get(current) else {
                continue;
            };
            for handler in &state.handlers {
                if handler.level().is_some_and(|min| record.level < min) {
                    continue;
                }
                if !selected.iter().any(|seen| same_handler(seen, handler)) {
                    selected.push(Arc::clone(handler));
                }
            }
            if !state.propagate {
                break;
            }
        }
        selected
    }
}

/// Shared handle to a logger tree.
///
/// Cloning is cheap; clones address the same tree. Each hierarchy carries
/// the [`CaptureRegistry`] its capture sessions register with by default.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    tree: Arc<Mutex<Tree>>,
    registry: CaptureRegistry,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl Hierarchy {
    /// Fresh tree containing only the root logger at [`DEFAULT_ROOT_LEVEL`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: Arc::new(Mutex::new(Tree::new())),
            registry: CaptureRegistry::new(),
        }
    }

    /// Replace the registry sessions built against this hierarchy use.
    #[must_use]
    pub fn with_registry(mut self, registry: CaptureRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &CaptureRegistry {
        &self.registry
    }

    /// Get (creating on first use) the logger with the given name.
    #[must_use]
    pub fn logger(&self, name: &str) -> Logger {
        let name = canonical_name(name).to_string();
        self.lock().entry(&name);
        Logger {
            name,
            hierarchy: self.clone(),
        }
    }

    #[must_use]
    pub fn root(&self) -> Logger {
        self.logger(ROOT)
    }

    /// Dispatch a record to every handler it reaches.
    ///
    /// Handlers run after the tree lock is released, so a handler may
    /// itself inspect or reconfigure the hierarchy.
    pub fn handle(&self, record: &Record) {
        let handlers = self.lock().route(record);
        for handler in handlers {
            handler.handle(record);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_state<T>(&self, name: &str, f: impl FnOnce(&mut LoggerState) -> T) -> T {
        let mut tree = self.lock();
        f(tree.entry(name))
    }
}

/// Handle to one named logger in a [`Hierarchy`].
#[derive(Debug, Clone)]
pub struct Logger {
    name: String,
    hierarchy: Hierarchy,
}

impl Logger {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicitly configured level, if any.
    #[must_use]
    pub fn level(&self) -> Option<Level> {
        self.hierarchy.with_state(&self.name, |state| state.level)
    }

    pub fn set_level(&self, level: Option<Level>) {
        self.hierarchy
            .with_state(&self.name, |state| state.level = level);
    }

    /// Level that actually gates records on this logger.
    #[must_use]
    pub fn effective_level(&self) -> Level {
        self.hierarchy.lock().effective_level(&self.name)
    }

    #[must_use]
    pub fn handlers(&self) -> Vec<HandlerRef> {
        self.hierarchy
            .with_state(&self.name, |state| state.handlers.clone())
    }

    /// Attach a handler. Attaching the same handler twice is a no-op.
    pub fn add_handler(&self, handler: HandlerRef) {
        self.hierarchy.with_state(&self.name, |state| {
            if !state.handlers.iter().any(|h| same_handler(h, &handler)) {
                state.handlers.push(handler);
            }
        });
    }

    pub fn remove_handler(&self, handler: &HandlerRef) {
        self.hierarchy.with_state(&self.name, |state| {
            state.handlers.retain(|h| !same_handler(h, handler));
        });
    }

    pub fn set_handlers(&self, handlers: Vec<HandlerRef>) {
        self.hierarchy
            .with_state(&self.name, |state| state.handlers = handlers);
    }

    #[must_use]
    pub fn propagate(&self) -> bool {
        self.hierarchy.with_state(&self.name, |state| state.propagate)
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.hierarchy
            .with_state(&self.name, |state| state.propagate = propagate);
    }

    #[must_use]
    pub fn disabled(&self) -> bool {
        self.hierarchy.with_state(&self.name, |state| state.disabled)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.hierarchy
            .with_state(&self.name, |state| state.disabled = disabled);
    }

    /// Snapshot the logger's full state.
    #[must_use]
    pub fn state(&self) -> LoggerState {
        self.hierarchy.with_state(&self.name, |state| state.clone())
    }

    /// Write a snapshot back verbatim.
    pub fn restore(&self, snapshot: LoggerState) {
        self.hierarchy
            .with_state(&self.name, |state| *state = snapshot);
    }

    /// Apply changes to the logger's state under a single lock.
    pub fn update(&self, f: impl FnOnce(&mut LoggerState)) {
        self.hierarchy.with_state(&self.name, f);
    }

    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.hierarchy
            .handle(&Record::new(self.name.clone(), level, message));
    }

    /// Log with an attached error.
    pub fn log_error(
        &self,
        level: Level,
        message: impl Into<String>,
        error: &(dyn std::error::Error + 'static),
    ) {
        let record = Record::new(self.name.clone(), level, message).with_error(error);
        self.hierarchy.handle(&record);
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(Level::Trace, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }
}
