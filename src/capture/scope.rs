//! Scoped capture: a guard for blocks and a wrapper for functions.
//!
//! Both uninstall on every exit path, including unwinding. When the session
//! was built with `ensure_checks_above`, a normal exit also asserts that no
//! record at or above that level went unchecked.

use std::ops::Deref;

use super::{CaptureBuilder, LogCapture};

/// Guard returned by [`LogCapture::enter`].
///
/// Derefs to the session; uninstalls it when dropped.
#[must_use = "the capture is uninstalled as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ActiveCapture<'a> {
    capture: &'a LogCapture,
}

impl<'a> ActiveCapture<'a> {
    pub(crate) fn new(capture: &'a LogCapture) -> Self {
        capture.install();
        Self { capture }
    }
}

impl Deref for ActiveCapture<'_> {
    type Target = LogCapture;

    fn deref(&self) -> &Self::Target {
        self.capture
    }
}

impl Drop for ActiveCapture<'_> {
    fn drop(&mut self) {
        self.capture.uninstall();
        if std::thread::panicking() {
            return;
        }
        if let Some(level) = self.capture.options().ensure_checks_above
            && let Err(err) = self.capture.ensure_checked(level)
        {
            panic!("{err}");
        }
    }
}

/// Wrap `f` so each call runs inside a fresh capture built from `builder`.
///
/// The session is passed to `f` as an extra argument and uninstalled when
/// `f` returns or panics. The wrapper can be called any number of times.
pub fn log_capture<A, R, F>(builder: CaptureBuilder, f: F) -> impl Fn(A) -> R
where
    F: Fn(A, &LogCapture) -> R,
{
    move |arg| run_captured(builder.clone(), |capture| f(arg, capture))
}

/// Run `f` inside a fresh capture built from `builder`.
pub fn with_log_capture<R, F>(builder: CaptureBuilder, f: F) -> R
where
    F: FnOnce(&LogCapture) -> R,
{
    run_captured(builder, f)
}

fn run_captured<R>(builder: CaptureBuilder, f: impl FnOnce(&LogCapture) -> R) -> R {
    let capture = builder.build();
    let active = capture.enter();
    let result = f(&active);
    drop(active);
    result
}
