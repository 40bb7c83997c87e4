//! Short stack signatures and their per-file ids.
//!
//! A signature summarises the active call stack as `/file:method:line`
//! segments, outermost first, with consecutive frames of one file merged
//! (`/main.rs:main:10,run:42`). Each distinct signature gets a 4-hex-digit id;
//! the definition is written once per file and later lines carry only the id.

use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::path::Path;

use crate::guard;

/// Frames that never belong in a signature.
pub const DEFAULT_IGNORED: &[&str] = &[
    "daylog_core::",
    "std::",
    "core::",
    "alloc::",
    "test::",
    "__rust",
    "<std::",
    "<core::",
    "<alloc::",
    "<daylog_core::",
];

/// Signature used when the stack could not be walked.
pub const FAILED_SIGNATURE: &str = "/EXCEPTION";

/// One resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Demangled symbol path, e.g. `app::net::poll`
    pub symbol: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Frame {
    pub fn new(symbol: impl Into<String>, file: Option<&str>, line: Option<u32>) -> Self {
        Self {
            symbol: symbol.into(),
            file: file.map(str::to_owned),
            line,
        }
    }

    fn method(&self) -> &str {
        self.symbol
            .rsplit("::")
            .find(|segment| !segment.starts_with('{'))
            .unwrap_or(&self.symbol)
    }
}

/// Produces the frames of the current call stack, innermost first.
pub trait StackWalker: Send + Sync {
    fn frames(&self) -> Vec<Frame>;
}

/// Walks the real stack with [`std::backtrace::Backtrace`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BacktraceWalker;

impl StackWalker for BacktraceWalker {
    fn frames(&self) -> Vec<Frame> {
        parse_backtrace(&Backtrace::force_capture().to_string())
    }
}

/// Frames from the textual form of a captured backtrace.
pub fn parse_backtrace(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    for raw in text.lines() {
        let line = raw.trim_start();
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (file, number) = split_location(location);
                frame.file = Some(file.to_owned());
                frame.line = number;
            }
        } else if let Some((index, symbol)) = line.split_once(": ") {
            if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) {
                frames.push(Frame::new(strip_hash(symbol.trim()), None, None));
            }
        }
    }
    frames
}

// `path/to/file.rs:LINE:COL`
fn split_location(location: &str) -> (&str, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let column = parts.next();
    let line = parts.next();
    match (parts.next(), line, column) {
        (Some(file), Some(line), Some(_)) => (file, line.parse().ok()),
        _ => (location, None),
    }
}

fn strip_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::h") {
        Some((head, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => {
            head
        }
        _ => symbol,
    }
}

/// Build the signature of `frames` (innermost first), skipping frames whose
/// symbol starts with one of `ignored`.
pub fn signature(frames: &[Frame], ignored: &[String]) -> String {
    let mut segments: Vec<(Option<&str>, Vec<String>)> = Vec::new();

    for frame in frames.iter().rev() {
        if ignored
            .iter()
            .any(|prefix| frame.symbol.starts_with(prefix.as_str()))
        {
            continue;
        }
        // C runtime frames: no source and no module path.
        if frame.file.is_none() && !frame.symbol.contains("::") {
            continue;
        }

        match frame.file.as_deref() {
            Some(path) => {
                let file = Path::new(path)
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or(path);
                let info = format!("{}:{}", frame.method(), frame.line.unwrap_or(0));
                match segments.last_mut() {
                    Some((Some(last), infos)) if *last == file => infos.push(info),
                    _ => segments.push((Some(file), vec![info])),
                }
            }
            None => segments.push((None, vec![frame.symbol.clone()])),
        }
    }

    segments
        .into_iter()
        .map(|(file, infos)| match file {
            Some(file) => format!("/{}:{}", file, infos.join(",")),
            None => format!("/{}", infos.join(",")),
        })
        .collect()
}

/// Walk the stack with `walker`, falling back to [`FAILED_SIGNATURE`] when it panics.
pub fn capture(walker: &dyn StackWalker, ignored: &[String]) -> String {
    guard::contain(|| signature(&walker.frames(), ignored))
        .unwrap_or_else(|_| FAILED_SIGNATURE.to_owned())
}

/// A stack marker for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackMarker {
    /// Four hex digits, e.g. `000A`
    pub id: String,
    /// `STACK: [id]=signature` when the signature is new in this file
    pub definition: Option<String>,
}

/// Signature to dense sequential id, cleared whenever a new file starts.
#[derive(Debug, Default, Clone)]
pub struct StackSignatureCache {
    ids: HashMap<String, u32>,
}

impl StackSignatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, signature: &str) -> StackMarker {
        if let Some(id) = self.ids.get(signature) {
            return StackMarker {
                id: format!("{:04X}", id),
                definition: None,
            };
        }

        let id = self.ids.len() as u32;
        self.ids.insert(signature.to_owned(), id);
        let id = format!("{:04X}", id);
        StackMarker {
            definition: Some(format!("STACK: [{}]={}", id, signature)),
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignored() -> Vec<String> {
        DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_signature_merges_consecutive_files() {
        // Innermost first, as a walker reports them.
        let frames = vec![
            Frame::new("daylog_core::logger::Logger::error", Some("src/logger.rs"), Some(90)),
            Frame::new("app::net::poll", Some("/src/app/net.rs"), Some(42)),
            Frame::new("app::net::run", Some("/src/app/net.rs"), Some(17)),
            Frame::new("app::main", Some("/src/app/main.rs"), Some(5)),
            Frame::new("std::rt::lang_start", Some("rt.rs"), Some(1)),
        ];

        assert_eq!(
            signature(&frames, &ignored()),
            "/main.rs:main:5/net.rs:run:17,poll:42"
        );
    }

    #[test]
    fn test_signature_without_file_info() {
        let frames = vec![
            Frame::new("app::worker", None, None),
            Frame::new("start_thread", None, None),
        ];
        assert_eq!(signature(&frames, &ignored()), "/app::worker");
    }

    #[test]
    fn test_closure_frames_use_enclosing_method() {
        let frames = vec![Frame::new("app::spawn::{{closure}}", Some("spawn.rs"), Some(3))];
        assert_eq!(signature(&frames, &ignored()), "/spawn.rs:spawn:3");
    }

    #[test]
    fn test_trait_impl_frames_are_kept() {
        let frames = vec![
            Frame::new("<daylog_core::layer::DaylogLayer as Layer>::on_event", Some("layer.rs"), Some(95)),
            Frame::new("<app::net::Poller as app::Task>::run", Some("src/net.rs"), Some(30)),
            Frame::new("<alloc::boxed::Box<F> as core::ops::FnOnce<A>>::call_once", Some("boxed.rs"), Some(1)),
            Frame::new("app::main", Some("src/main.rs"), Some(5)),
        ];
        assert_eq!(
            signature(&frames, &ignored()),
            "/main.rs:main:5/net.rs:run:30"
        );
    }

    #[test]
    fn test_parse_backtrace_text() {
        let text = "   0: app::net::poll::h0123456789abcdef\n             at ./src/net.rs:42:9\n   1: app::main\n             at ./src/main.rs:5:5\n   2: __libc_start_main\n";
        let frames = parse_backtrace(text);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], Frame::new("app::net::poll", Some("./src/net.rs"), Some(42)));
        assert_eq!(frames[1].line, Some(5));
        assert_eq!(frames[2].file, None);
    }

    #[test]
    fn test_cache_assigns_dense_ids() {
        let mut cache = StackSignatureCache::new();

        let first = cache.resolve("/main.rs:main:5");
        assert_eq!(first.id, "0000");
        assert_eq!(
            first.definition.as_deref(),
            Some("STACK: [0000]=/main.rs:main:5")
        );

        let second = cache.resolve("/main.rs:main:9");
        assert_eq!(second.id, "0001");

        let again = cache.resolve("/main.rs:main:5");
        assert_eq!(again.id, "0000");
        assert!(again.definition.is_none());

        cache.clear();
        assert_eq!(cache.resolve("/main.rs:main:9").id, "0000");
    }

    struct Exploding;

    impl StackWalker for Exploding {
        fn frames(&self) -> Vec<Frame> {
            panic!("no frames today")
        }
    }

    #[test]
    fn test_capture_falls_back_on_panic() {
        assert_eq!(capture(&Exploding, &ignored()), FAILED_SIGNATURE);
    }
}
