//! Per-logger caches: repeated-message placeholders and stack signature ids.

pub mod message;
pub mod stack;

pub use message::{Compression, MessageCache};
pub use stack::{BacktraceWalker, Frame, StackMarker, StackSignatureCache, StackWalker};
