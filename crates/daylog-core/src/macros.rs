//! Call-site capturing macros.

/// The [`CallSite`](crate::CallSite) of the invocation.
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite::new(file!(), module_path!(), line!())
    };
}

/// `log_trace!(logger, "polled {} peers", n)`
#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $($arg:tt)+) => {
        $logger.trace(&format!($($arg)+), $crate::call_site!())
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.info(&format!($($arg)+), $crate::call_site!())
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => {
        $logger.warn(&format!($($arg)+), $crate::call_site!())
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $logger.error(&format!($($arg)+), $crate::call_site!())
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_call_site_points_here() {
        let site = crate::call_site!();
        assert_eq!(site.short_file(), "macros.rs");
        assert_eq!(site.method(), "daylog_core::macros::tests");
        assert!(site.line() > 0);
    }
}
