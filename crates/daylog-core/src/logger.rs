//! Named loggers.
//!
//! A [`Logger`] owns one day-rotated file, a pending buffer for lines produced
//! before the log root is known, and two caches: placeholder symbols for
//! repeated messages and ids for stack signatures. Every public call is
//! infallible; write problems end up in the file's failure report.
//!
//! Line layout:
//! ```text
//! ERR 21.01.2026 14:30:45.123 (THRD=3):              [0000]  [F:net.rs, M:app::net, L:42] poll failed EX: timeout
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Local};
use parking_lot::{Mutex, RwLock};

use crate::cache::message::{Compression, MessageCache};
use crate::cache::stack::{self, BacktraceWalker, StackMarker, StackSignatureCache, StackWalker};
use crate::call_site::{current_thread_id, CallSite, Field};
use crate::governor::{Admission, SIZE_LIMIT_NOTICE};
use crate::guard;
use crate::level::Level;
use crate::pending::PendingBuffer;
use crate::registry::{Runtime, Shared, ERROR};
use crate::sink::{self, FileSink, TIME_FORMAT};

/// Line length after which [`Logger::append`] starts a new line by default.
pub const DEFAULT_LINE_LENGTH: usize = 100;

const STACK_OFF: u8 = u8::MAX;

fn encode_stack_level(level: Option<Level>) -> u8 {
    level.map_or(STACK_OFF, |level| level as u8)
}

/// Attached error text of a line.
#[derive(Clone, Copy)]
enum Failure<'a> {
    Message(&'a str),
    Error(&'a (dyn std::error::Error + 'a)),
}

#[derive(Clone, Copy)]
struct Record<'a> {
    level: Level,
    site: Option<CallSite<'a>>,
    since: Option<DateTime<Local>>,
    failure: Option<Failure<'a>>,
    message: &'a str,
}

struct WriteState {
    sink: FileSink,
    pending: PendingBuffer,
    /// Characters appended to the current in-progress line
    append_count: usize,
    /// The last write was an append without a line terminator
    line_open: bool,
    /// Custom header text for the next header, produced outside the lock
    header: Option<String>,
}

/// A named, independently configured log stream.
pub struct Logger {
    name: String,
    runtime: Arc<Runtime>,
    registry: Weak<Shared>,
    min_level: AtomicU8,
    stack_level: AtomicU8,
    thread_affinity: AtomicBool,
    enabled: AtomicBool,
    ignored: RwLock<Vec<String>>,
    walker: RwLock<Arc<dyn StackWalker>>,
    state: Mutex<WriteState>,
    messages: Mutex<MessageCache>,
    stacks: Mutex<StackSignatureCache>,
}

impl Logger {
    pub(crate) fn new(name: String, runtime: Arc<Runtime>, registry: Weak<Shared>) -> Self {
        let tunables = runtime.config.tunables().clone();
        let state = WriteState {
            sink: FileSink::new(name.clone()),
            pending: PendingBuffer::new(tunables.pending_capacity),
            append_count: 0,
            line_open: false,
            header: None,
        };
        let messages = MessageCache::new(
            tunables.alphabet,
            tunables.repeat_window,
            tunables.removal_window,
        );

        Self {
            name,
            runtime,
            registry,
            min_level: AtomicU8::new(Level::Trace as u8),
            stack_level: AtomicU8::new(encode_stack_level(tunables.stack_level)),
            thread_affinity: AtomicBool::new(tunables.thread_affinity),
            enabled: AtomicBool::new(true),
            ignored: RwLock::new(stack::DEFAULT_IGNORED.iter().map(|p| p.to_string()).collect()),
            walker: RwLock::new(Arc::new(BacktraceWalker)),
            state: Mutex::new(state),
            messages: Mutex::new(messages),
            stacks: Mutex::new(StackSignatureCache::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the shared logger errors are mirrored into.
    pub fn is_error_logger(&self) -> bool {
        self.name.eq_ignore_ascii_case(ERROR)
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn min_level(&self) -> Level {
        Level::from_u8(self.min_level.load(Ordering::Relaxed))
    }

    pub fn set_min_level(&self, level: Level) {
        self.min_level.store(level as u8, Ordering::Relaxed);
    }

    /// Level from which lines carry a stack signature; `None` disables them.
    pub fn stack_level(&self) -> Option<Level> {
        match self.stack_level.load(Ordering::Relaxed) {
            STACK_OFF => None,
            raw => Some(Level::from_u8(raw)),
        }
    }

    pub fn set_stack_level(&self, level: Option<Level>) {
        self.stack_level
            .store(encode_stack_level(level), Ordering::Relaxed);
    }

    pub fn thread_affinity(&self) -> bool {
        self.thread_affinity.load(Ordering::Relaxed)
    }

    pub fn set_thread_affinity(&self, enabled: bool) {
        self.thread_affinity.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Leave frames whose symbol starts with `prefix` out of stack signatures.
    pub fn ignore_origin(&self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        let mut ignored = self.ignored.write();
        if !ignored.contains(&prefix) {
            ignored.push(prefix);
        }
    }

    pub fn set_stack_walker(&self, walker: Arc<dyn StackWalker>) {
        *self.walker.write() = walker;
    }

    /// Whether a line at `level` would be written.
    pub fn accepts(&self, level: Level) -> bool {
        level >= self.min_level().max(self.runtime.config.min_level())
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Lines waiting for a log root.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// File of the current day, once a write has resolved it.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.state.lock().sink.path().map(PathBuf::from)
    }

    /// Failed writes not yet reported in the file.
    pub fn failure_count(&self) -> u32 {
        self.state.lock().sink.failures()
    }

    /// Write the header again before the next line.
    pub fn reset_header(&self) {
        self.state.lock().sink.reset_header();
    }

    // ------------------------------------------------------------------
    // Logging
    // ------------------------------------------------------------------

    pub fn trace(&self, message: &str, site: CallSite<'_>) {
        self.event(Level::Trace, site).log(message);
    }

    pub fn info(&self, message: &str, site: CallSite<'_>) {
        self.event(Level::Info, site).log(message);
    }

    pub fn warn(&self, message: &str, site: CallSite<'_>) {
        self.event(Level::Warning, site).log(message);
    }

    /// Error lines are also mirrored into the shared `Error` logger.
    pub fn error(&self, message: &str, site: CallSite<'_>) {
        self.event(Level::Error, site).log(message);
    }

    /// Build a line with an elapsed-time annotation or attached error.
    pub fn event<'a>(&'a self, level: Level, site: CallSite<'a>) -> Event<'a> {
        Event::new(self, None, level, site)
    }

    /// Trace with placeholder compression keyed by the message text.
    pub fn trace_optimized(&self, level: Level, message: &str, site: CallSite<'_>) {
        self.optimized(None, level, message, message, site);
    }

    /// Trace with placeholder compression keyed by `key`.
    pub fn trace_optimized_keyed(&self, level: Level, key: &str, message: &str, site: CallSite<'_>) {
        self.optimized(None, level, key, message, site);
    }

    /// Continue the current line with `message`.
    ///
    /// The first call of a line is fully formatted and starts with `prefix`;
    /// later calls add raw text until `max_line_length` characters have been
    /// appended.
    pub fn append(&self, message: &str, prefix: &str, max_line_length: usize) {
        self.appended(None, None, message, prefix, max_line_length);
    }

    pub fn append_since(
        &self,
        start: DateTime<Local>,
        message: &str,
        prefix: &str,
        max_line_length: usize,
    ) {
        self.appended(None, Some(start), message, prefix, max_line_length);
    }

    /// View of this logger whose calls are first forwarded to the context's logger.
    pub fn in_context<'a>(&'a self, context: &'a WorkerContext) -> ContextLogger<'a> {
        ContextLogger {
            logger: self,
            context,
        }
    }

    // ------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------

    fn redirect<'c>(&self, context: Option<&'c WorkerContext>) -> Option<&'c Arc<Logger>> {
        if !self.thread_affinity() {
            return None;
        }
        let target = context?.current()?;
        (!std::ptr::eq(Arc::as_ptr(target), self)).then_some(target)
    }

    fn error_logger(&self) -> Option<Arc<Logger>> {
        if self.is_error_logger() {
            return None;
        }
        self.registry.upgrade().map(|shared| shared.get(ERROR))
    }

    fn dispatch(&self, record: &Record<'_>, context: Option<&WorkerContext>, wait: Option<StdDuration>) {
        if !self.accepts(record.level) {
            return;
        }
        if let Some(target) = self.redirect(context) {
            target.handle(record, false, wait);
        }
        self.handle(record, true, wait);
    }

    fn handle(&self, record: &Record<'_>, mirror: bool, wait: Option<StdDuration>) {
        if !self.accepts(record.level) {
            return;
        }

        let now = self.runtime.clock.now();
        // Rendered outside the lock: Display of an attached error may panic.
        let head = render_head(record.level, record.site, record.since, now);
        let body = render_body(record);

        self.emit(now, wait, |this, state| {
            this.write_rendered(state, now, record.level, &head, &body);
        });

        if mirror && record.level == Level::Error {
            if let Some(errors) = self.error_logger() {
                errors.handle(record, false, wait);
            }
        }
    }

    fn optimized(
        &self,
        context: Option<&WorkerContext>,
        level: Level,
        key: &str,
        message: &str,
        site: CallSite<'_>,
    ) {
        if !self.accepts(level) {
            return;
        }
        if self.runtime.config.optimizations_disabled() {
            let record = Record {
                level,
                site: Some(site),
                since: None,
                failure: None,
                message,
            };
            self.dispatch(&record, context, None);
            return;
        }

        if let Some(target) = self.redirect(context) {
            target.optimized_local(level, key, message, site, false);
        }
        self.optimized_local(level, key, message, site, true);
    }

    fn optimized_local(&self, level: Level, key: &str, message: &str, site: CallSite<'_>, mirror: bool) {
        if !self.accepts(level) {
            return;
        }

        let now = self.runtime.clock.now();
        self.emit(now, None, |this, state| {
            // Looked up after the roll so a new file never sees a stale symbol.
            let compression = this.messages.lock().lookup(key, message, now);
            match compression {
                Compression::Full(text) => {
                    let record = Record {
                        level,
                        site: Some(site),
                        since: None,
                        failure: None,
                        message: &text,
                    };
                    let head = render_head(level, record.site, None, now);
                    let body = render_body(&record);
                    this.write_rendered(state, now, level, &head, &body);
                }
                Compression::Placeholder(symbol) => {
                    let mut buf = [0u8; 4];
                    let symbol = symbol.encode_utf8(&mut buf);
                    this.append_locked(state, now, None, symbol, "", DEFAULT_LINE_LENGTH);
                }
            }
        });

        if mirror && level == Level::Error {
            if let Some(errors) = self.error_logger() {
                errors.optimized_local(level, key, message, site, false);
            }
        }
    }

    fn appended(
        &self,
        context: Option<&WorkerContext>,
        since: Option<DateTime<Local>>,
        message: &str,
        prefix: &str,
        max_line_length: usize,
    ) {
        if !self.accepts(Level::Info) {
            return;
        }
        if let Some(target) = self.redirect(context) {
            target.append_local(since, message, prefix, max_line_length);
        }
        self.append_local(since, message, prefix, max_line_length);
    }

    fn append_local(
        &self,
        since: Option<DateTime<Local>>,
        message: &str,
        prefix: &str,
        max_line_length: usize,
    ) {
        if !self.accepts(Level::Info) {
            return;
        }
        let now = self.runtime.clock.now();
        self.emit(now, None, |this, state| {
            this.append_locked(state, now, since, message, prefix, max_line_length);
        });
    }

    // ------------------------------------------------------------------
    // Write path (runs under the write lock)
    // ------------------------------------------------------------------

    fn emit<F>(&self, now: DateTime<Local>, wait: Option<StdDuration>, write: F)
    where
        F: FnOnce(&Self, &mut WriteState),
    {
        if !self.runtime.config.is_enabled() || !self.is_enabled() {
            return;
        }
        let header = self.custom_header(now, wait);

        let overflowed = {
            let mut state = match wait {
                None => self.state.lock(),
                Some(timeout) => match self.state.try_lock_for(timeout) {
                    Some(state) => state,
                    None => return,
                },
            };
            state.header = header;

            let overflowed = match self.runtime.governor.admit(&self.runtime.config, now) {
                Admission::Blocked => return,
                Admission::Open { overflowed } => overflowed,
            };

            self.roll(&mut *state, now);
            write(self, &mut *state);
            overflowed
        };

        if overflowed {
            self.suppress(now);
        }
    }

    /// Custom header text when the next write will lead with a header.
    ///
    /// The generator runs without the write lock held, so it may log into
    /// this logger; those lines wait in the pending buffer until the header
    /// is out.
    fn custom_header(&self, now: DateTime<Local>, wait: Option<StdDuration>) -> Option<String> {
        let custom = self.runtime.config.header()?;
        if guard::active() {
            return None;
        }
        let root = self.runtime.config.root()?;
        let due = match wait {
            None => self.state.lock().sink.header_due(&root, now),
            Some(timeout) => self.state.try_lock_for(timeout)?.sink.header_due(&root, now),
        };
        due.then(|| sink::custom_header(&custom, &self.name))
    }

    fn roll(&self, state: &mut WriteState, now: DateTime<Local>) {
        let config = &self.runtime.config;
        let Some(root) = config.root() else {
            return;
        };
        let fresh = state.sink.roll(&root, &config.app_tag(), now);
        // Pending lines carry their own definitions into the new file.
        if fresh && state.pending.is_empty() {
            self.stacks.lock().clear();
            self.messages.lock().clear();
        }
    }

    fn stack_marker(&self, level: Level) -> Option<StackMarker> {
        let threshold = self.stack_level()?;
        if level < threshold {
            return None;
        }
        let walker = self.walker.read().clone();
        let signature = stack::capture(walker.as_ref(), &self.ignored.read());
        Some(self.stacks.lock().resolve(&signature))
    }

    fn buffering(&self, state: &WriteState) -> bool {
        self.runtime.config.root().is_none() || state.sink.path().is_none()
    }

    fn write_rendered(&self, state: &mut WriteState, now: DateTime<Local>, level: Level, head: &str, body: &str) {
        // Definitions could be evicted from the pending buffer while their ids stay cached.
        let marker = if self.buffering(state) {
            None
        } else {
            self.stack_marker(level)
        };
        match marker {
            Some(marker) => {
                if let Some(definition) = marker.definition.as_deref() {
                    self.write_line(state, now, definition, false);
                }
                self.write_line(state, now, &format!("{}[{}]  {}", head, marker.id, body), false);
            }
            None => self.write_line(state, now, &format!("{}{}", head, body), false),
        }
    }

    fn append_locked(
        &self,
        state: &mut WriteState,
        now: DateTime<Local>,
        since: Option<DateTime<Local>>,
        message: &str,
        prefix: &str,
        max_line_length: usize,
    ) {
        let new_line = state.append_count == 0;
        state.append_count += message.chars().count();
        if state.append_count >= max_line_length {
            state.append_count = 0;
        }

        if new_line {
            let lead = if state.line_open { "\n" } else { "" };
            let head = render_head(Level::Info, None, since, now);
            self.write_line(state, now, &format!("{}{}{}{}", lead, head, prefix, message), true);
        } else {
            self.write_line(state, now, message, true);
        }
    }

    fn write_line(&self, state: &mut WriteState, now: DateTime<Local>, text: &str, append: bool) {
        let mut data = String::with_capacity(text.len() + 2);
        if state.line_open && !append {
            data.push('\n');
        }
        data.push_str(text);
        if !append {
            data.push('\n');
            state.append_count = 0;
        }
        state.line_open = append;

        // Lines logged by the header generator must follow the header.
        let in_header = guard::active() && !state.sink.header_written();
        if self.buffering(state) || in_header {
            state.pending.push(data);
            return;
        }

        let WriteState {
            sink: file,
            pending,
            header,
            ..
        } = state;
        let name = self.name.as_str();
        let custom = header.as_deref();
        // Failures are kept in the sink and reported on the next good write.
        let _ = file.append(&data, pending, |path| sink::header_block(name, path, now, custom));
        if file.header_written() {
            *header = None;
        }
    }

    fn suppress(&self, now: DateTime<Local>) {
        tracing::warn!(
            logger = %self.name,
            budget = self.runtime.config.daily_budget(),
            "daily log size budget exceeded, suppressing logs"
        );

        let loggers = self
            .registry
            .upgrade()
            .map(|shared| shared.snapshot())
            .unwrap_or_default();
        if loggers.is_empty() {
            self.notice(now, SIZE_LIMIT_NOTICE);
        }
        for logger in loggers {
            logger.notice(now, SIZE_LIMIT_NOTICE);
        }

        self.runtime.governor.engage();
    }

    fn notice(&self, now: DateTime<Local>, text: &str) {
        self.emit(now, None, |this, state| this.write_line(state, now, text, false));
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("min_level", &self.min_level())
            .field("stack_level", &self.stack_level())
            .field("thread_affinity", &self.thread_affinity())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

fn render_head(
    level: Level,
    site: Option<CallSite<'_>>,
    since: Option<DateTime<Local>>,
    now: DateTime<Local>,
) -> String {
    let thread = site.map_or_else(current_thread_id, |site| site.thread());
    let thread = format!(
        " (THRD={}){}",
        thread,
        if since.is_some() { "," } else { ":" }
    );
    let elapsed = since
        .map(|start| format!("({}ms):", (now - start).num_milliseconds()))
        .unwrap_or_default();
    format!(
        "{} {}{:<14}{:<10}",
        level.tag(),
        now.format(TIME_FORMAT),
        thread,
        elapsed
    )
}

fn render_body(record: &Record<'_>) -> String {
    let mut body = String::with_capacity(record.message.len() + 48);
    if let Some(site) = record.site {
        body.push_str(&site.render(&[Field::File, Field::Method, Field::Line]));
        body.push(' ');
    }
    body.push_str(record.message);
    if let Some(failure) = record.failure {
        body.push_str(&render_failure(failure));
    }
    body
}

fn render_failure(failure: Failure<'_>) -> String {
    match failure {
        Failure::Message(text) => format!(" EX: {}", text),
        Failure::Error(error) => guard::contain(|| {
            let mut text = format!(" EX: \n{}", error);
            let mut source = error.source();
            while let Some(cause) = source {
                text.push_str(&format!("\n  caused by: {}", cause));
                source = cause.source();
            }
            text
        })
        .unwrap_or_else(|payload| format!(" EX: UNKNOWN EX: {}", sink::panic_text(payload.as_ref()))),
    }
}

/// A line under construction. Nothing is written until [`Event::log`].
#[must_use = "an event does nothing until `log` is called"]
pub struct Event<'a> {
    logger: &'a Logger,
    context: Option<&'a WorkerContext>,
    level: Level,
    site: CallSite<'a>,
    since: Option<DateTime<Local>>,
    failure: Option<Failure<'a>>,
    wait: Option<StdDuration>,
}

impl<'a> Event<'a> {
    fn new(logger: &'a Logger, context: Option<&'a WorkerContext>, level: Level, site: CallSite<'a>) -> Self {
        Self {
            logger,
            context,
            level,
            site,
            since: None,
            failure: None,
            wait: None,
        }
    }

    /// Annotate the line with the milliseconds elapsed since `start`.
    pub fn since(mut self, start: DateTime<Local>) -> Self {
        self.since = Some(start);
        self
    }

    /// Attach an error; its source chain is rendered after the message.
    pub fn error(mut self, error: &'a (dyn std::error::Error + 'a)) -> Self {
        self.failure = Some(Failure::Error(error));
        self
    }

    /// Attach an error message.
    pub fn error_message(mut self, text: &'a str) -> Self {
        self.failure = Some(Failure::Message(text));
        self
    }

    /// Give up if the write lock is not free within `timeout`.
    pub(crate) fn wait_at_most(mut self, timeout: StdDuration) -> Self {
        self.wait = Some(timeout);
        self
    }

    pub fn log(self, message: &str) {
        let record = Record {
            level: self.level,
            site: Some(self.site),
            since: self.since,
            failure: self.failure,
            message,
        };
        self.logger.dispatch(&record, self.context, self.wait);
    }
}

/// The "current" logger of a worker. Calls made through
/// [`Logger::in_context`] are copied to it before being handled locally.
#[derive(Debug, Clone, Default)]
pub struct WorkerContext {
    current: Option<Arc<Logger>>,
}

impl WorkerContext {
    pub fn new(current: Arc<Logger>) -> Self {
        Self {
            current: Some(current),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Arc<Logger>> {
        self.current.as_ref()
    }

    pub fn set_current(&mut self, current: Option<Arc<Logger>>) {
        self.current = current;
    }
}

/// A logger bound to a [`WorkerContext`].
#[derive(Debug, Clone, Copy)]
pub struct ContextLogger<'a> {
    logger: &'a Logger,
    context: &'a WorkerContext,
}

impl<'a> ContextLogger<'a> {
    pub fn logger(&self) -> &'a Logger {
        self.logger
    }

    pub fn trace(&self, message: &str, site: CallSite<'_>) {
        self.event(Level::Trace, site).log(message);
    }

    pub fn info(&self, message: &str, site: CallSite<'_>) {
        self.event(Level::Info, site).log(message);
    }

    pub fn warn(&self, message: &str, site: CallSite<'_>) {
        self.event(Level::Warning, site).log(message);
    }

    pub fn error(&self, message: &str, site: CallSite<'_>) {
        self.event(Level::Error, site).log(message);
    }

    pub fn event<'b>(&'b self, level: Level, site: CallSite<'b>) -> Event<'b> {
        Event::new(self.logger, Some(self.context), level, site)
    }

    pub fn trace_optimized(&self, level: Level, message: &str, site: CallSite<'_>) {
        self.logger
            .optimized(Some(self.context), level, message, message, site);
    }

    pub fn trace_optimized_keyed(&self, level: Level, key: &str, message: &str, site: CallSite<'_>) {
        self.logger
            .optimized(Some(self.context), level, key, message, site);
    }

    pub fn append(&self, message: &str, prefix: &str, max_line_length: usize) {
        self.logger
            .appended(Some(self.context), None, message, prefix, max_line_length);
    }

    pub fn append_since(
        &self,
        start: DateTime<Local>,
        message: &str,
        prefix: &str,
        max_line_length: usize,
    ) {
        self.logger
            .appended(Some(self.context), Some(start), message, prefix, max_line_length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 21, 14, 30, 45).unwrap()
    }

    #[test]
    fn test_head_layout() {
        let site = CallSite::new("src/net.rs", "app::net", 42).with_thread(3);
        let head = render_head(Level::Error, Some(site), None, at());
        assert_eq!(head, "ERR 21.01.2026 14:30:45.000 (THRD=3):              ");
    }

    #[test]
    fn test_head_with_elapsed_time() {
        let site = CallSite::new("src/net.rs", "app::net", 42).with_thread(3);
        let start = at() - chrono::Duration::milliseconds(250);
        let head = render_head(Level::Info, Some(site), Some(start), at());
        assert_eq!(head, "INF 21.01.2026 14:30:45.000 (THRD=3),    (250ms):  ");
    }

    #[test]
    fn test_body_with_error_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("poll failed")
            }
        }
        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let error = Outer(std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout"));
        let record = Record {
            level: Level::Error,
            site: Some(CallSite::new("src/net.rs", "app::net", 42)),
            since: None,
            failure: Some(Failure::Error(&error)),
            message: "giving up",
        };

        assert_eq!(
            render_body(&record),
            "[F:net.rs, M:app::net, L:42] giving up EX: \npoll failed\n  caused by: timeout"
        );
    }

    #[test]
    fn test_panicking_display_falls_back() {
        #[derive(Debug)]
        struct Broken;
        impl fmt::Display for Broken {
            fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
                panic!("display exploded")
            }
        }
        impl std::error::Error for Broken {}

        assert_eq!(
            render_failure(Failure::Error(&Broken)),
            " EX: UNKNOWN EX: display exploded"
        );
    }
}
