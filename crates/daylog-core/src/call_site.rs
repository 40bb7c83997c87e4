//! Call-site metadata attached to formatted lines.

use std::fmt;
use std::path::Path;

/// Selectable parts of a [`CallSite`] rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Thread,
    File,
    Method,
    Line,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Thread, Field::File, Field::Method, Field::Line];
}

/// Where a log call came from.
///
/// The caller supplies file, method and line (see [`call_site!`](crate::call_site));
/// the thread is captured when the value is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite<'a> {
    file: &'a str,
    method: &'a str,
    line: u32,
    thread: u64,
}

impl<'a> CallSite<'a> {
    pub fn new(file: &'a str, method: &'a str, line: u32) -> Self {
        Self {
            file,
            method,
            line,
            thread: current_thread_id(),
        }
    }

    /// Override the captured thread id.
    pub fn with_thread(mut self, thread: u64) -> Self {
        self.thread = thread;
        self
    }

    pub fn file(&self) -> &'a str {
        self.file
    }

    /// File name without its directories.
    pub fn short_file(&self) -> &'a str {
        Path::new(self.file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.file)
    }

    pub fn method(&self) -> &'a str {
        self.method
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn thread(&self) -> u64 {
        self.thread
    }

    /// Render the selected fields as `[TRD:1, F:main.rs, M:run, L:10]`.
    ///
    /// Fields always appear in that order; an empty selection renders all of them.
    pub fn render(&self, fields: &[Field]) -> String {
        let selected = if fields.is_empty() { &Field::ALL[..] } else { fields };
        let parts: Vec<String> = Field::ALL
            .iter()
            .filter(|field| selected.contains(field))
            .map(|field| match field {
                Field::Thread => format!("TRD:{}", self.thread),
                Field::File => format!("F:{}", self.short_file()),
                Field::Method => format!("M:{}", self.method),
                Field::Line => format!("L:{}", self.line),
            })
            .collect();
        format!("[{}]", parts.join(", "))
    }
}

impl fmt::Display for CallSite<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&Field::ALL))
    }
}

/// Numeric id of the current thread.
pub fn current_thread_id() -> u64 {
    // ThreadId debug output is `ThreadId(N)`.
    let raw = format!("{:?}", std::thread::current().id());
    raw.trim_start_matches("ThreadId(")
        .trim_end_matches(')')
        .parse()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_all_fields() {
        let site = CallSite::new("src/net/poll.rs", "poll_once", 42).with_thread(7);
        assert_eq!(site.to_string(), "[TRD:7, F:poll.rs, M:poll_once, L:42]");
    }

    #[test]
    fn test_render_subset_keeps_order() {
        let site = CallSite::new("src/net/poll.rs", "poll_once", 42).with_thread(7);
        assert_eq!(
            site.render(&[Field::Line, Field::File, Field::Method]),
            "[F:poll.rs, M:poll_once, L:42]"
        );
    }

    #[test]
    fn test_thread_is_captured() {
        let here = current_thread_id();
        let site = CallSite::new("a.rs", "m", 1);
        assert_eq!(site.thread(), here);

        let other = std::thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(other, here);
    }
}
