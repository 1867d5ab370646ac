//! Guard and wrapper forms of a capture.

use std::panic::{AssertUnwindSafe, catch_unwind};

use logcapture::{Hierarchy, Level, LogCapture, log_capture, with_log_capture};

#[test]
fn test_enter_installs_and_exit_uninstalls() {
    let hierarchy = Hierarchy::new();
    let capture = LogCapture::builder(&hierarchy).install(false).build();

    {
        let active = capture.enter();
        assert!(active.is_installed());
        hierarchy.root().info("inside");
    }
    assert!(!capture.is_installed());
    hierarchy.root().error("outside");

    capture.check([("root", "INFO", "inside")]);
}

#[test]
fn test_session_can_be_entered_twice() {
    let hierarchy = Hierarchy::new();
    let capture = LogCapture::builder(&hierarchy).install(false).build();

    {
        let _active = capture.enter();
        hierarchy.root().warn("first");
    }
    {
        let _active = capture.enter();
        hierarchy.root().warn("second");
    }

    capture.check([("root", "WARN", "first"), ("root", "WARN", "second")]);
}

#[test]
fn test_enter_uninstalls_when_block_panics() {
    let hierarchy = Hierarchy::new();
    let capture = LogCapture::builder(&hierarchy).install(false).build();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let active = capture.enter();
        hierarchy.root().error("before panic");
        assert!(active.is_empty(), "block failed");
    }));

    assert!(outcome.is_err());
    assert!(!capture.is_installed());
    assert!(hierarchy.registry().is_empty());
    assert_eq!(hierarchy.root().level(), Some(Level::Warn));
    capture.check([("root", "ERROR", "before panic")]);
}

#[test]
fn test_wrapper_passes_session_and_argument() {
    let hierarchy = Hierarchy::new();
    let logger = hierarchy.logger("job");

    let run = log_capture(
        LogCapture::builder(&hierarchy).name("job"),
        |count: usize, capture: &LogCapture| {
            for i in 0..count {
                logger.info(format!("step {i}"));
            }
            capture.check([("job", "INFO", "step 0"), ("job", "INFO", "step 1")]);
            capture.len()
        },
    );

    assert_eq!(run(2), 2);
    assert!(hierarchy.registry().is_empty());
}

#[test]
fn test_wrapper_uninstalls_on_panic() {
    let hierarchy = Hierarchy::new();
    let builder = LogCapture::builder(&hierarchy);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        with_log_capture(builder, |capture| {
            hierarchy.root().warn("logged");
            assert!(capture.is_empty(), "test body failed");
        });
    }));

    assert!(outcome.is_err());
    assert!(hierarchy.registry().is_empty());
    assert!(hierarchy.root().handlers().is_empty());
}

#[test]
fn test_with_log_capture_returns_body_result() {
    let hierarchy = Hierarchy::new();
    let captured = with_log_capture(LogCapture::builder(&hierarchy), |capture| {
        hierarchy.root().warn("hello");
        capture.actual()
    });

    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].message, "hello");
}

#[test]
#[should_panic(expected = "not asserted WARN or above logging")]
fn test_unchecked_records_fail_scope() {
    let hierarchy = Hierarchy::new();
    with_log_capture(
        LogCapture::builder(&hierarchy).ensure_checks_above(Level::Warn),
        |_capture| {
            hierarchy.root().error("nobody looked at this");
        },
    );
}

#[test]
fn test_checked_records_pass_scope() {
    let hierarchy = Hierarchy::new();
    with_log_capture(
        LogCapture::builder(&hierarchy).ensure_checks_above(Level::Warn),
        |capture| {
            hierarchy.root().info("below threshold");
            hierarchy.root().error("asserted");
            capture.check_present([("root", "ERROR", "asserted")], true);
        },
    );
}

#[test]
fn test_wrapper_can_run_repeatedly_with_fresh_sessions() {
    let hierarchy = Hierarchy::new();
    let logger = hierarchy.logger("worker");

    let run = log_capture(
        LogCapture::builder(&hierarchy).name("worker"),
        |job: u32, capture: &LogCapture| {
            logger.warn(format!("running {job}"));
            capture.check([("worker", "WARN", format!("running {job}"))]);
            capture.id()
        },
    );

    let first = run(1);
    let second = run(2);

    assert_ne!(first, second);
    assert!(hierarchy.registry().is_empty());
    assert!(hierarchy.logger("worker").handlers().is_empty());
}
