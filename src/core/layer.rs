//! Bridge from `tracing` events into a [`Hierarchy`].

use std::fmt::Debug;

use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};

use super::hierarchy::Hierarchy;
use super::level::Level;
use super::record::{ErrorInfo, Record};

/// Events under this target belong to the crate's own diagnostics and are
/// never routed into a hierarchy.
pub const SELF_TARGET: &str = "logcapture";

/// Whether a tracing target is one of this crate's own modules.
#[must_use]
pub fn is_self_target(target: &str) -> bool {
    target
        .strip_prefix(SELF_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// Tracing layer that turns every event into a [`Record`] and hands it to
/// the hierarchy for dispatch.
#[derive(Debug, Clone)]
pub struct HierarchyLayer {
    hierarchy: Hierarchy,
}

impl HierarchyLayer {
    #[must_use]
    pub const fn new(hierarchy: Hierarchy) -> Self {
        Self { hierarchy }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for HierarchyLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_self_target(metadata.target()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut record = Record::new(
            metadata.target(),
            Level::from_tracing_level(*metadata.level()),
            visitor.message,
        );
        record.fields = visitor.fields;
        record.error = visitor.error;
        record.file = metadata.file().map(str::to_string);
        record.line = metadata.line();

        self.hierarchy.handle(&record);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
    error: Option<ErrorInfo>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        let name = field.name();
        if name == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push((name.to_string(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        let name = field.name();
        if name == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((name.to_string(), value.to_string()));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        let info = ErrorInfo::from_error(value);
        self.fields.push((field.name().to_string(), info.message.clone()));
        if self.error.is_none() {
            self.error = Some(info);
        }
    }
}

impl Hierarchy {
    /// A tracing layer dispatching events into this hierarchy.
    #[must_use]
    pub fn layer(&self) -> HierarchyLayer {
        HierarchyLayer::new(self.clone())
    }

    /// Make this hierarchy the current thread's default tracing subscriber.
    ///
    /// Events stop flowing into the hierarchy when the guard is dropped.
    #[must_use = "dropping the guard immediately restores the previous subscriber"]
    pub fn set_default(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.layer());
        tracing::subscriber::set_default(subscriber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_target_matching() {
        assert!(is_self_target("logcapture"));
        assert!(is_self_target("logcapture::capture"));
        assert!(!is_self_target("logcapture_extra"));
        assert!(!is_self_target("app::logcapture"));
    }
}
