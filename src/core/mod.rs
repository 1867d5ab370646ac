//! Logger tree, records and the tracing bridge.

pub mod hierarchy;
pub mod layer;
pub mod level;
pub mod logging;
pub mod record;

pub use hierarchy::{Handler, HandlerRef, Hierarchy, Logger, LoggerState, ROOT};
pub use layer::HierarchyLayer;
pub use level::Level;
pub use logging::{LogFormat, StreamConfig, StreamHandler};
pub use record::{ErrorInfo, Record};
