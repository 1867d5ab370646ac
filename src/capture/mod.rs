//! Capture sessions.
//!
//! A [`LogCapture`] attaches a collecting handler to one or more loggers of a
//! [`Hierarchy`], buffers every record that reaches it and offers checks over
//! the buffer.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logcapture::{Hierarchy, Level, LogCapture};
//!
//! let hierarchy = Hierarchy::new();
//! let capture = LogCapture::builder(&hierarchy).level(Level::Info).build();
//!
//! let root = hierarchy.root();
//! root.debug("junk");
//! root.info("x");
//! root.error("y");
//!
//! capture.check([("root", "INFO", "x"), ("root", "ERROR", "y")]);
//! ```
//!
//! # Install and uninstall
//!
//! Installing snapshots each target logger's state, sets its level to the
//! capture level and attaches the collector. Without `propagate` the
//! collector replaces the logger's handlers and propagation is switched off,
//! silencing normal output; with it the collector is added next to the
//! existing handlers. Uninstalling writes the snapshots back verbatim.
//!
//! Installing an installed session and uninstalling one that is not
//! installed are no-ops. Two sessions installed on the same logger must be
//! uninstalled in reverse order for the logger to end up as it started.

mod compare;
mod registry;
mod scope;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::{Handler, HandlerRef, Hierarchy, Level, Logger, LoggerState, Record, ROOT};
use crate::core::hierarchy::{canonical_name, same_handler};
use crate::error::{CaptureError, Result};

pub use compare::{Entries, Entry, SequenceDiff, find_present};
pub use registry::CaptureRegistry;
pub use scope::{ActiveCapture, log_capture, with_log_capture};

/// Text rendered for a session that captured nothing.
pub const NO_LOGGING: &str = "No logging captured";

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-unique identity of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capture-{}", self.0)
    }
}

/// Settings for a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Loggers to capture. Empty means the root logger.
    pub names: Vec<String>,
    /// Minimum level captured.
    pub level: Level,
    /// Install as soon as the session is built.
    pub install: bool,
    /// Keep the loggers' normal handlers and propagation while capturing.
    pub propagate: bool,
    /// Records at or above this level must be checked before a scoped
    /// capture ends.
    pub ensure_checks_above: Option<Level>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            level: Level::Trace,
            install: true,
            propagate: false,
            ensure_checks_above: None,
        }
    }
}

impl CaptureOptions {
    /// Target names with the root default applied and duplicates removed.
    #[must_use]
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = Vec::with_capacity(self.names.len().max(1));
        for name in &self.names {
            let name = canonical_name(name);
            if !targets.iter().any(|seen| seen == name) {
                targets.push(name.to_string());
            }
        }
        if targets.is_empty() {
            targets.push(ROOT.to_string());
        }
        targets
    }
}

/// Builder for [`LogCapture`].
#[derive(Debug, Clone)]
#[must_use]
pub struct CaptureBuilder {
    hierarchy: Hierarchy,
    registry: Option<CaptureRegistry>,
    options: CaptureOptions,
}

impl CaptureBuilder {
    /// Add one logger to capture.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.names.push(name.into());
        self
    }

    /// Add several loggers to capture.
    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.names.extend(names.into_iter().map(Into::into));
        self
    }

    pub const fn level(mut self, level: Level) -> Self {
        self.options.level = level;
        self
    }

    pub const fn install(mut self, install: bool) -> Self {
        self.options.install = install;
        self
    }

    pub const fn propagate(mut self, propagate: bool) -> Self {
        self.options.propagate = propagate;
        self
    }

    pub const fn ensure_checks_above(mut self, level: Level) -> Self {
        self.options.ensure_checks_above = Some(level);
        self
    }

    /// Register with this registry instead of the hierarchy's own.
    pub fn registry(mut self, registry: &CaptureRegistry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    pub fn options(mut self, options: CaptureOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn build(self) -> LogCapture {
        let registry = self
            .registry
            .unwrap_or_else(|| self.hierarchy.registry().clone());
        LogCapture::with_registry(&self.hierarchy, registry, self.options)
    }
}

#[derive(Debug)]
struct Captured {
    record: Record,
    checked: bool,
}

/// Handler appending every record it receives to the session buffer.
#[derive(Debug)]
struct Collector {
    level: Level,
    records: Mutex<Vec<Captured>>,
}

impl Handler for Collector {
    fn handle(&self, record: &Record) {
        lock(&self.records).push(Captured {
            record: record.clone(),
            checked: false,
        });
    }

    fn level(&self) -> Option<Level> {
        Some(self.level)
    }
}

/// Shared state of one session, reachable from both the [`LogCapture`]
/// handle and the registry.
pub(crate) struct Session {
    id: SessionId,
    hierarchy: Hierarchy,
    registry: CaptureRegistry,
    targets: Vec<String>,
    options: CaptureOptions,
    collector: Arc<Collector>,
    /// `Some` while installed: each target logger with its prior state.
    saved: Mutex<Option<Vec<(Logger, LoggerState)>>>,
}

impl Session {
    fn install(self: &Arc<Self>) {
        let mut saved = lock(&self.saved);
        if saved.is_some() {
            tracing::trace!(session = %self.id, "Capture already installed");
            return;
        }

        let collector: HandlerRef = self.collector.clone();
        let mut snapshots = Vec::with_capacity(self.targets.len());
        for name in &self.targets {
            let logger = self.hierarchy.logger(name);
            let prior = logger.state();
            logger.update(|state| {
                state.level = Some(self.options.level);
                state.disabled = false;
                if self.options.propagate {
                    if !state.handlers.iter().any(|h| same_handler(h, &collector)) {
                        state.handlers.push(Arc::clone(&collector));
                    }
                } else {
                    state.handlers = vec![Arc::clone(&collector)];
                    state.propagate = false;
                }
            });
            snapshots.push((logger, prior));
        }
        *saved = Some(snapshots);
        drop(saved);

        self.registry.register(Arc::clone(self));
        tracing::debug!(
            session = %self.id,
            loggers = ?self.targets,
            level = %self.options.level,
            propagate = self.options.propagate,
            "Log capture installed"
        );
    }

    pub(crate) fn uninstall(&self) {
        let Some(snapshots) = lock(&self.saved).take() else {
            tracing::trace!(session = %self.id, "Capture not installed");
            return;
        };
        for (logger, prior) in snapshots.into_iter().rev() {
            logger.restore(prior);
        }
        self.registry.deregister(self.id);
        tracing::debug!(session = %self.id, "Log capture uninstalled");
    }

    fn is_installed(&self) -> bool {
        lock(&self.saved).is_some()
    }
}

/// A capture session.
///
/// Dropping the session uninstalls it.
pub struct LogCapture {
    session: Arc<Session>,
}

impl LogCapture {
    /// Start building a session against `hierarchy`.
    pub fn builder(hierarchy: &Hierarchy) -> CaptureBuilder {
        CaptureBuilder {
            hierarchy: hierarchy.clone(),
            registry: None,
            options: CaptureOptions::default(),
        }
    }

    /// Build a session registering with the hierarchy's registry.
    #[must_use]
    pub fn new(hierarchy: &Hierarchy, options: CaptureOptions) -> Self {
        Self::with_registry(hierarchy, hierarchy.registry().clone(), options)
    }

    /// Build a session registering with `registry`.
    #[must_use]
    pub fn with_registry(
        hierarchy: &Hierarchy,
        registry: CaptureRegistry,
        options: CaptureOptions,
    ) -> Self {
        let session = Arc::new(Session {
            id: SessionId::next(),
            hierarchy: hierarchy.clone(),
            registry,
            targets: options.targets(),
            collector: Arc::new(Collector {
                level: options.level,
                records: Mutex::new(Vec::new()),
            }),
            options,
            saved: Mutex::new(None),
        });
        if session.options.install {
            session.install();
        }
        Self { session }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.session.id
    }

    /// Loggers this session attaches to.
    #[must_use]
    pub fn targets(&self) -> &[String] {
        &self.session.targets
    }

    #[must_use]
    pub fn options(&self) -> &CaptureOptions {
        &self.session.options
    }

    /// Attach to the target loggers. No-op when already installed.
    pub fn install(&self) {
        self.session.install();
    }

    /// Detach and restore the target loggers. No-op when not installed.
    pub fn uninstall(&self) {
        self.session.uninstall();
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.session.is_installed()
    }

    /// Install (if needed) for the lifetime of the returned guard.
    pub fn enter(&self) -> ActiveCapture<'_> {
        ActiveCapture::new(self)
    }

    /// Captured records in emission order.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        lock(&self.session.collector.records)
            .iter()
            .map(|captured| captured.record.clone())
            .collect()
    }

    /// Captured records projected to `(name, LEVEL, message)`.
    #[must_use]
    pub fn actual(&self) -> Vec<Entry> {
        lock(&self.session.collector.records)
            .iter()
            .map(|captured| Entry::from(&captured.record))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.session.collector.records).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything captured so far.
    pub fn clear(&self) {
        lock(&self.session.collector.records).clear();
    }

    /// Compare the captured sequence with `expected`, element by element.
    ///
    /// On success every captured record counts as checked.
    ///
    /// # Errors
    ///
    /// [`CaptureError::Mismatch`] when length, content or order differ.
    pub fn compare<I, E>(&self, expected: I) -> Result<()>
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        let expected: Vec<Entry> = expected.into_iter().map(Into::into).collect();
        let mut records = lock(&self.session.collector.records);
        let actual: Vec<Entry> = records.iter().map(|c| Entry::from(&c.record)).collect();
        let diff = SequenceDiff::between(&expected, &actual);
        if diff.is_none() {
            for captured in records.iter_mut() {
                captured.checked = true;
            }
        }
        drop(records);
        diff.map_or(Ok(()), |diff| Err(CaptureError::Mismatch(Box::new(diff))))
    }

    /// Assert the captured sequence equals `expected`.
    ///
    /// # Panics
    ///
    /// With the same/expected/actual breakdown when the sequences differ.
    #[track_caller]
    pub fn check<I, E>(&self, expected: I)
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        if let Err(err) = self.compare(expected) {
            panic!("{err}");
        }
    }

    /// Look for `expected` among the captured entries.
    ///
    /// Matched records count as checked.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NotPresent`] listing the entries not found.
    pub fn compare_present<I, E>(&self, expected: I, order_matters: bool) -> Result<()>
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        let expected: Vec<Entry> = expected.into_iter().map(Into::into).collect();
        let mut records = lock(&self.session.collector.records);
        let actual: Vec<Entry> = records.iter().map(|c| Entry::from(&c.record)).collect();
        let found = find_present(&expected, &actual, order_matters);
        if let Ok(matched) = &found {
            for &idx in matched {
                records[idx].checked = true;
            }
        }
        drop(records);
        found
            .map(|_| ())
            .map_err(|missing| CaptureError::NotPresent {
                missing: Entries(missing),
                actual: Entries(actual),
            })
    }

    /// Assert every entry of `expected` was captured.
    ///
    /// # Panics
    ///
    /// Listing the missing entries and everything captured.
    #[track_caller]
    pub fn check_present<I, E>(&self, expected: I, order_matters: bool)
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        if let Err(err) = self.compare_present(expected, order_matters) {
            panic!("{err}");
        }
    }

    pub fn mark_all_checked(&self) {
        for captured in lock(&self.session.collector.records).iter_mut() {
            captured.checked = true;
        }
    }

    /// Fail if any record at or above `level` has not been checked.
    ///
    /// # Errors
    ///
    /// [`CaptureError::Unchecked`] listing those records.
    pub fn ensure_checked(&self, level: Level) -> Result<()> {
        let unchecked: Vec<Entry> = lock(&self.session.collector.records)
            .iter()
            .filter(|captured| !captured.checked && captured.record.level >= level)
            .map(|captured| Entry::from(&captured.record))
            .collect();
        if unchecked.is_empty() {
            Ok(())
        } else {
            Err(CaptureError::Unchecked {
                threshold: level,
                entries: Entries(unchecked),
            })
        }
    }

    /// Captured records as a JSON array.
    ///
    /// # Errors
    ///
    /// When a record fails to serialize.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.records())
    }
}

impl Drop for LogCapture {
    fn drop(&mut self) {
        self.session.uninstall();
    }
}

impl fmt::Debug for LogCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogCapture")
            .field("id", &self.session.id)
            .field("targets", &self.session.targets)
            .field("installed", &self.is_installed())
            .field("records", &self.len())
            .finish()
    }
}

impl fmt::Display for LogCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let records = self.records();
        if records.is_empty() {
            return f.write_str(NO_LOGGING);
        }
        for (idx, record) in records.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{} {}", record.name, record.level)?;
            for line in record.message.split('\n') {
                write!(f, "\n  {line}")?;
            }
        }
        Ok(())
    }
}
