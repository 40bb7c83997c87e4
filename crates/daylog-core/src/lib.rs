//! Daylog Core Library
//!
//! Named, day-rotated file loggers for long-running processes.
//!
//! ## Overview
//!
//! Every logger writes to its own file `{root}/{YYYY-MM-DD}_{tag}_{name}.log`,
//! starting a new file at midnight. Lines produced before a log root is known
//! are buffered and flushed into the first file. On top of that:
//!
//! - **Repeated-message compression**: identical messages logged in a burst
//!   collapse to a single placeholder symbol per occurrence
//! - **Stack signatures**: lines at or above a level carry a short id that
//!   refers to a `STACK:` definition line written once per file
//! - **Daily size budget**: once the day's files exceed it, all loggers stop
//!   until usage drops again
//! - **Error mirroring**: error lines are copied into the shared `Error` logger
//!
//! ## Quick Start
//!
//! ```ignore
//! use daylog_core::{log_info, Level, LogConfig, Registry};
//!
//! let registry = Registry::new(
//!     LogConfig::builder()
//!         .root("./logs")
//!         .app_tag("sim")
//!         .daily_budget(200 * 1024 * 1024)
//!         .build(),
//! );
//!
//! let net = registry.get("net");
//! log_info!(net, "connected to {} peers", 3);
//! net.event(Level::Error, daylog_core::call_site!())
//!     .error(&err)
//!     .log("sync failed");
//! ```

pub mod cache;
pub mod call_site;
pub mod clock;
pub mod config;
pub mod error;
pub mod governor;
mod guard;
pub mod layer;
pub mod level;
pub mod logger;
mod macros;
pub mod maintenance;
pub mod pending;
pub mod registry;
pub mod sink;

// Re-exports
pub use cache::{Frame, StackWalker};
pub use call_site::{CallSite, Field};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LogConfig, LogConfigBuilder, Settings};
pub use error::{LogError, LogResult};
pub use layer::DaylogLayer;
pub use level::Level;
pub use logger::{ContextLogger, Event, Logger, WorkerContext, DEFAULT_LINE_LENGTH};
pub use maintenance::CleanReport;
pub use registry::{global, install, normalize_name, Registry, COMMON, ERROR, UNHANDLED};
