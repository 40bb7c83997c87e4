//! Tracing layer writing events into registry loggers.
//!
//! ```ignore
//! use daylog_core::{DaylogLayer, LogConfig, Registry};
//! use tracing_subscriber::prelude::*;
//!
//! let registry = Registry::new(LogConfig::builder().root("./logs").build());
//! tracing_subscriber::registry()
//!     .with(DaylogLayer::new(registry.clone()))
//!     .with(tracing_subscriber::fmt::layer())
//!     .init();
//! ```

use std::fmt::Write as FmtWrite;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::call_site::CallSite;
use crate::level::Level;
use crate::registry::Registry;

/// Our own diagnostics are never fed back into the loggers.
const OWN_TARGET: &str = "daylog_core";

#[derive(Debug, Clone)]
enum Route {
    /// Logger named after the first segment of the event target
    ByTarget,
    Fixed(String),
}

/// A tracing Layer that hands events to [`Registry`] loggers.
#[derive(Debug, Clone)]
pub struct DaylogLayer {
    registry: Registry,
    route: Route,
}

impl DaylogLayer {
    /// Route each event to the logger named after its target crate.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            route: Route::ByTarget,
        }
    }

    /// Route every event to the logger `name`.
    pub fn to_logger(registry: Registry, name: impl Into<String>) -> Self {
        Self {
            registry,
            route: Route::Fixed(name.into()),
        }
    }

    fn logger_name<'a>(&'a self, target: &'a str) -> &'a str {
        match &self.route {
            Route::Fixed(name) => name.as_str(),
            Route::ByTarget => target.split("::").next().unwrap_or(target),
        }
    }
}

impl<S> Layer<S> for DaylogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if target.starts_with(OWN_TARGET) {
            return;
        }

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let mut message = visitor.finish();

        if let Some(scope) = ctx.event_scope(event) {
            let spans: Vec<&str> = scope.from_root().map(|span| span.name()).collect();
            if !spans.is_empty() {
                message = format!("{}: {}", spans.join(" > "), message);
            }
        }

        let site = CallSite::new(
            metadata.file().unwrap_or("unknown"),
            metadata.module_path().unwrap_or(target),
            metadata.line().unwrap_or(0),
        );
        self.registry
            .get(self.logger_name(target))
            .event(Level::from(metadata.level()), site)
            .log(&message);
    }
}

/// Renders `message key=value key=value`.
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_owned()
        } else {
            self.message + &self.fields
        }
    }
}

impl Visit for LineVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        let _ = write!(self.fields, " {}={}", field.name(), value);
    }
}
