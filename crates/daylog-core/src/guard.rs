//! Containment of caller-supplied code run on behalf of a logger.
//!
//! Header generators, `Display` of attached errors and stack walkers are run
//! through [`contain`]. Panics raised in there are caught and replaced by
//! fallback text, so the panic hook must not report them as unhandled.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

thread_local! {
    static DEPTH: Cell<u32> = const { Cell::new(0) };
}

struct Scope;

impl Scope {
    fn enter() -> Self {
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        Scope
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Run `f`, catching any panic it raises.
pub(crate) fn contain<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    let _scope = Scope::enter();
    panic::catch_unwind(AssertUnwindSafe(f))
}

/// Whether the current thread is inside [`contain`].
pub(crate) fn active() -> bool {
    DEPTH.with(Cell::get) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_tracks_nesting_and_panics() {
        assert!(!active());

        let inner = contain(|| {
            assert!(active());
            contain(|| assert!(active())).is_ok() && active()
        });
        assert_eq!(inner.ok(), Some(true));
        assert!(!active());

        assert!(contain(|| panic!("caught")).is_err());
        assert!(!active());
    }
}
